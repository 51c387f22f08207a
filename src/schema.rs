//
// Copyright (c) The lyb Core Contributors
//
// SPDX-License-Identifier: MIT
//

//! YANG schema data.

use std::convert::TryFrom;

use num_derive::FromPrimitive;

use crate::context::{Context, ModuleId, SchemaNodeId};
use crate::error::{Error, Result};
use crate::iter::{Ancestors, NodeIterable, Siblings, Traverse};

/// YANG module handle bound to a [`Context`].
#[derive(Clone, Debug)]
pub struct SchemaModule<'a> {
    context: &'a Context,
    id: ModuleId,
}

/// Generic YANG schema node.
#[derive(Clone, Debug)]
pub struct SchemaNode<'a> {
    context: &'a Context,
    id: SchemaNodeId,
}

/// YANG schema node kind.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SchemaNodeKind {
    Container,
    Case,
    Choice,
    Leaf,
    LeafList,
    List,
    AnyData,
    AnyXml,
    Uses,
    Rpc,
    Input,
    Output,
    Action,
    Notification,
}

/// YANG data value type.
#[derive(Copy, Clone, Debug, PartialEq, FromPrimitive)]
pub enum DataValueType {
    Unknown = 0,
    Binary = 1,
    Uint8 = 2,
    Uint16 = 3,
    Uint32 = 4,
    Uint64 = 5,
    String = 6,
    Bits = 7,
    Bool = 8,
    Dec64 = 9,
    Empty = 10,
    Enum = 11,
    IdentityRef = 12,
    InstanceId = 13,
    LeafRef = 14,
    Union = 15,
    Int8 = 16,
    Int16 = 17,
    Int32 = 18,
    Int64 = 19,
}

/// YANG data value.
#[derive(Clone, Debug, PartialEq)]
pub enum DataValue {
    Uint8(u8),
    Uint16(u16),
    Uint32(u32),
    Uint64(u64),
    Bool(bool),
    Empty,
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    /// Scaled decimal64 value (the raw integer, `value / 10^fraction-digits`
    /// being the represented number).
    Dec64(i64),
    Other(String),
}

/// YANG leaf(-list) type descriptor.
///
/// Only the pieces the binary codec needs are modeled: the base type plus
/// the per-base detail that determines the wire encoding (enum order, bit
/// positions, leafref target, decimal64 scaling).
#[derive(Clone, Debug)]
pub struct LeafType {
    pub(crate) base: DataValueType,
    pub(crate) enums: Vec<String>,
    pub(crate) bits: Vec<String>,
    pub(crate) leafref_target: Option<SchemaNodeId>,
    pub(crate) fraction_digits: u8,
    pub(crate) user_defined: bool,
}

#[derive(Debug)]
pub(crate) struct SchemaNodeData {
    pub module: ModuleId,
    pub parent: Option<SchemaNodeId>,
    pub next_sibling: Option<SchemaNodeId>,
    pub first_child: Option<SchemaNodeId>,
    pub last_child: Option<SchemaNodeId>,
    pub name: String,
    pub kind: SchemaNodeKind,
    pub leaf_type: Option<LeafType>,
}

// ===== impl SchemaModule =====

impl<'a> SchemaModule<'a> {
    pub(crate) fn new(context: &'a Context, id: ModuleId) -> SchemaModule<'a> {
        SchemaModule { context, id }
    }

    pub(crate) fn id(&self) -> ModuleId {
        self.id
    }

    /// Name of the module.
    pub fn name(&self) -> &'a str {
        &self.context.module(self.id).name
    }

    /// Revision of the module.
    pub fn revision(&self) -> Option<&'a str> {
        self.context.module(self.id).revision.as_deref()
    }

    /// Namespace of the module.
    pub fn namespace(&self) -> &'a str {
        &self.context.module(self.id).namespace
    }

    /// Return true if the module is implemented, not just imported.
    pub fn is_implemented(&self) -> bool {
        self.context.module(self.id).implemented
    }

    /// Returns an iterator over the top-level schema nodes of the module.
    pub fn top_nodes(&self) -> Siblings<SchemaNode<'a>> {
        let first = self
            .context
            .module(self.id)
            .first_node
            .map(|id| SchemaNode::new(self.context, id));
        Siblings::new(first)
    }
}

impl PartialEq for SchemaModule<'_> {
    fn eq(&self, other: &SchemaModule<'_>) -> bool {
        std::ptr::eq(self.context, other.context) && self.id == other.id
    }
}

// ===== impl SchemaNode =====

impl<'a> SchemaNode<'a> {
    pub(crate) fn new(context: &'a Context, id: SchemaNodeId) -> SchemaNode<'a> {
        SchemaNode { context, id }
    }

    /// Handle of this node in its context.
    pub fn id(&self) -> SchemaNodeId {
        self.id
    }

    /// Schema node name.
    pub fn name(&self) -> &'a str {
        &self.context.snode(self.id).name
    }

    /// Schema node kind.
    pub fn kind(&self) -> SchemaNodeKind {
        self.context.snode(self.id).kind
    }

    /// Module that defines this node (for augment-added nodes, the
    /// augmenting module).
    pub fn module(&self) -> SchemaModule<'a> {
        SchemaModule::new(self.context, self.context.snode(self.id).module)
    }

    /// Type of the leaf or leaf-list node.
    pub fn leaf_type(&self) -> Option<&'a LeafType> {
        self.context.snode(self.id).leaf_type.as_ref()
    }

    /// Returns the parent node, if any.
    pub fn parent(&self) -> Option<SchemaNode<'a>> {
        self.context
            .snode(self.id)
            .parent
            .map(|id| SchemaNode::new(self.context, id))
    }

    /// Returns the next sibling node, if any.
    pub fn next_sibling(&self) -> Option<SchemaNode<'a>> {
        self.context
            .snode(self.id)
            .next_sibling
            .map(|id| SchemaNode::new(self.context, id))
    }

    /// Returns the first child node, if any.
    pub fn first_child(&self) -> Option<SchemaNode<'a>> {
        self.context
            .snode(self.id)
            .first_child
            .map(|id| SchemaNode::new(self.context, id))
    }

    /// Returns an iterator over the children of the node.
    pub fn children(&self) -> Siblings<SchemaNode<'a>> {
        Siblings::new(self.first_child())
    }

    /// Returns an iterator over this node and its following siblings.
    pub fn siblings(&self) -> Siblings<SchemaNode<'a>> {
        Siblings::new(Some(self.clone()))
    }

    /// Returns an iterator over this node and its ancestors.
    pub fn ancestors(&self) -> Ancestors<SchemaNode<'a>> {
        Ancestors::new(Some(self.clone()))
    }

    /// Returns an iterator over all elements in the subtree (depth-first).
    pub fn traverse(&self) -> Traverse<SchemaNode<'a>> {
        Traverse::new(self.clone())
    }

    /// The input child of an RPC or action node.
    pub fn input(&self) -> Option<SchemaNode<'a>> {
        self.children().find(|c| c.kind() == SchemaNodeKind::Input)
    }

    /// The output child of an RPC or action node.
    pub fn output(&self) -> Option<SchemaNode<'a>> {
        self.children().find(|c| c.kind() == SchemaNodeKind::Output)
    }

    /// Schema path of the node, with the module prefix printed whenever the
    /// module changes along the path.
    pub fn path(&self) -> String {
        let mut parts = self
            .ancestors()
            .map(|snode| {
                let prefix = match snode.parent() {
                    Some(parent) if parent.module() == snode.module() => None,
                    _ => Some(snode.module().name().to_string()),
                };
                match prefix {
                    Some(prefix) => format!("{}:{}", prefix, snode.name()),
                    None => snode.name().to_string(),
                }
            })
            .collect::<Vec<_>>();
        parts.reverse();
        format!("/{}", parts.join("/"))
    }
}

impl PartialEq for SchemaNode<'_> {
    fn eq(&self, other: &SchemaNode<'_>) -> bool {
        std::ptr::eq(self.context, other.context) && self.id == other.id
    }
}

impl<'a> NodeIterable for SchemaNode<'a> {
    fn parent(&self) -> Option<SchemaNode<'a>> {
        self.parent()
    }

    fn next_sibling(&self) -> Option<SchemaNode<'a>> {
        self.next_sibling()
    }

    fn first_child(&self) -> Option<SchemaNode<'a>> {
        self.first_child()
    }
}

// ===== impl LeafType =====

impl LeafType {
    /// Plain type with no extra detail (ints, string, boolean, binary, ...).
    pub fn new(base: DataValueType) -> LeafType {
        LeafType {
            base,
            enums: Vec::new(),
            bits: Vec::new(),
            leafref_target: None,
            fraction_digits: 0,
            user_defined: false,
        }
    }

    /// Enumeration type; `names` in definition order.
    pub fn enumeration<I, S>(names: I) -> LeafType
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        LeafType {
            enums: names.into_iter().map(Into::into).collect(),
            ..LeafType::new(DataValueType::Enum)
        }
    }

    /// Bits type; `names` in position order.
    pub fn bits<I, S>(names: I) -> LeafType
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        LeafType {
            bits: names.into_iter().map(Into::into).collect(),
            ..LeafType::new(DataValueType::Bits)
        }
    }

    /// Leafref type pointing at the given leaf schema node.
    pub fn leafref(target: SchemaNodeId) -> LeafType {
        LeafType {
            leafref_target: Some(target),
            ..LeafType::new(DataValueType::LeafRef)
        }
    }

    /// Decimal64 type with the given number of fraction digits.
    pub fn dec64(fraction_digits: u8) -> LeafType {
        LeafType {
            fraction_digits,
            ..LeafType::new(DataValueType::Dec64)
        }
    }

    /// Mark the type as derived through a user type plugin; its values are
    /// serialized in canonical string form.
    pub fn user(mut self) -> LeafType {
        self.user_defined = true;
        self
    }

    /// Base type of the leaf type.
    pub fn base(&self) -> DataValueType {
        self.base
    }
}

// ===== schema node construction =====

impl Context {
    /// Create a container schema node.
    pub fn new_container(
        &mut self,
        module: ModuleId,
        parent: Option<SchemaNodeId>,
        name: &str,
    ) -> Result<SchemaNodeId> {
        self.add_snode(module, parent, name, SchemaNodeKind::Container, None)
    }

    /// Create a list schema node.
    pub fn new_list(
        &mut self,
        module: ModuleId,
        parent: Option<SchemaNodeId>,
        name: &str,
    ) -> Result<SchemaNodeId> {
        self.add_snode(module, parent, name, SchemaNodeKind::List, None)
    }

    /// Create a leaf schema node.
    pub fn new_leaf(
        &mut self,
        module: ModuleId,
        parent: Option<SchemaNodeId>,
        name: &str,
        ltype: LeafType,
    ) -> Result<SchemaNodeId> {
        self.add_snode(module, parent, name, SchemaNodeKind::Leaf, Some(ltype))
    }

    /// Create a leaf-list schema node.
    pub fn new_leaf_list(
        &mut self,
        module: ModuleId,
        parent: Option<SchemaNodeId>,
        name: &str,
        ltype: LeafType,
    ) -> Result<SchemaNodeId> {
        self.add_snode(
            module,
            parent,
            name,
            SchemaNodeKind::LeafList,
            Some(ltype),
        )
    }

    /// Create a choice schema node.
    pub fn new_choice(
        &mut self,
        module: ModuleId,
        parent: Option<SchemaNodeId>,
        name: &str,
    ) -> Result<SchemaNodeId> {
        self.add_snode(module, parent, name, SchemaNodeKind::Choice, None)
    }

    /// Create a case schema node under a choice.
    pub fn new_case(
        &mut self,
        module: ModuleId,
        parent: SchemaNodeId,
        name: &str,
    ) -> Result<SchemaNodeId> {
        self.add_snode(module, Some(parent), name, SchemaNodeKind::Case, None)
    }

    /// Create a uses instantiation node. Its children are the expanded
    /// grouping contents.
    pub fn new_uses(
        &mut self,
        module: ModuleId,
        parent: Option<SchemaNodeId>,
        name: &str,
    ) -> Result<SchemaNodeId> {
        self.add_snode(module, parent, name, SchemaNodeKind::Uses, None)
    }

    /// Create an RPC schema node together with its input and output
    /// children.
    pub fn new_rpc(
        &mut self,
        module: ModuleId,
        name: &str,
    ) -> Result<SchemaNodeId> {
        let rpc = self.add_snode(module, None, name, SchemaNodeKind::Rpc, None)?;
        self.add_snode(module, Some(rpc), "input", SchemaNodeKind::Input, None)?;
        self.add_snode(module, Some(rpc), "output", SchemaNodeKind::Output, None)?;
        Ok(rpc)
    }

    /// Create an action schema node (an RPC tied to a data node) together
    /// with its input and output children.
    pub fn new_action(
        &mut self,
        module: ModuleId,
        parent: SchemaNodeId,
        name: &str,
    ) -> Result<SchemaNodeId> {
        let act =
            self.add_snode(module, Some(parent), name, SchemaNodeKind::Action, None)?;
        self.add_snode(module, Some(act), "input", SchemaNodeKind::Input, None)?;
        self.add_snode(module, Some(act), "output", SchemaNodeKind::Output, None)?;
        Ok(act)
    }

    /// Create a notification schema node.
    pub fn new_notification(
        &mut self,
        module: ModuleId,
        parent: Option<SchemaNodeId>,
        name: &str,
    ) -> Result<SchemaNodeId> {
        self.add_snode(module, parent, name, SchemaNodeKind::Notification, None)
    }

    /// Create an anydata schema node.
    pub fn new_anydata(
        &mut self,
        module: ModuleId,
        parent: Option<SchemaNodeId>,
        name: &str,
    ) -> Result<SchemaNodeId> {
        self.add_snode(module, parent, name, SchemaNodeKind::AnyData, None)
    }

    /// Create an anyxml schema node.
    pub fn new_anyxml(
        &mut self,
        module: ModuleId,
        parent: Option<SchemaNodeId>,
        name: &str,
    ) -> Result<SchemaNodeId> {
        self.add_snode(module, parent, name, SchemaNodeKind::AnyXml, None)
    }

    /// Input child of an RPC/action node.
    pub fn rpc_input(&self, rpc: SchemaNodeId) -> Result<SchemaNodeId> {
        self.rpc_branch(rpc, SchemaNodeKind::Input)
    }

    /// Output child of an RPC/action node.
    pub fn rpc_output(&self, rpc: SchemaNodeId) -> Result<SchemaNodeId> {
        self.rpc_branch(rpc, SchemaNodeKind::Output)
    }

    fn rpc_branch(
        &self,
        rpc: SchemaNodeId,
        kind: SchemaNodeKind,
    ) -> Result<SchemaNodeId> {
        self.check_snode(rpc)?;
        let mut child = self.snode(rpc).first_child;
        while let Some(id) = child {
            if self.snode(id).kind == kind {
                return Ok(id);
            }
            child = self.snode(id).next_sibling;
        }
        Err(Error::invalid_argument("node has no input/output branch"))
    }

    fn add_snode(
        &mut self,
        module: ModuleId,
        parent: Option<SchemaNodeId>,
        name: &str,
        kind: SchemaNodeKind,
        leaf_type: Option<LeafType>,
    ) -> Result<SchemaNodeId> {
        self.check_module(module)?;
        if name.is_empty() {
            return Err(Error::invalid_argument("empty schema node name"));
        }
        if let Some(parent) = parent {
            self.check_snode(parent)?;
            match self.snode(parent).kind {
                SchemaNodeKind::Leaf
                | SchemaNodeKind::LeafList
                | SchemaNodeKind::AnyData
                | SchemaNodeKind::AnyXml => {
                    return Err(Error::invalid_argument(
                        "parent schema node cannot have children",
                    ));
                }
                _ => (),
            }
        }

        // Reject duplicate siblings; they could never be told apart on the
        // wire.
        let mut sibling = match parent {
            Some(parent) => self.snode(parent).first_child,
            None => self.module(module).first_node,
        };
        while let Some(id) = sibling {
            let snode = self.snode(id);
            if snode.module == module && snode.name == name {
                return Err(Error::invalid_argument(format!(
                    "duplicate schema node \"{}\"",
                    name
                )));
            }
            sibling = snode.next_sibling;
        }

        self.snodes.push(SchemaNodeData {
            module,
            parent,
            next_sibling: None,
            first_child: None,
            last_child: None,
            name: name.to_string(),
            kind,
            leaf_type,
        });
        let id = SchemaNodeId(self.snodes.len() as u32 - 1);

        // Link as the last sibling.
        match parent {
            Some(parent) => {
                let last = self.snodes[parent.0 as usize].last_child;
                match last {
                    Some(last) => {
                        self.snodes[last.0 as usize].next_sibling = Some(id)
                    }
                    None => self.snodes[parent.0 as usize].first_child = Some(id),
                }
                self.snodes[parent.0 as usize].last_child = Some(id);
            }
            None => {
                let last = self.modules[module.0 as usize].last_node;
                match last {
                    Some(last) => {
                        self.snodes[last.0 as usize].next_sibling = Some(id)
                    }
                    None => {
                        self.modules[module.0 as usize].first_node = Some(id)
                    }
                }
                self.modules[module.0 as usize].last_node = Some(id);
            }
        }

        Ok(id)
    }
}

// ===== data-sibling traversal =====

/// Schema node kinds that never appear in instance data and are transparent
/// to data-sibling enumeration.
pub(crate) fn is_structural(kind: SchemaNodeKind) -> bool {
    matches!(
        kind,
        SchemaNodeKind::Uses
            | SchemaNodeKind::Choice
            | SchemaNodeKind::Case
            | SchemaNodeKind::Input
            | SchemaNodeKind::Output
    )
}

/// Nearest non-structural ancestor of a schema node.
pub(crate) fn data_parent(
    ctx: &Context,
    snode: SchemaNodeId,
) -> Option<SchemaNodeId> {
    let mut parent = ctx.snode(snode).parent;
    while let Some(p) = parent {
        if !is_structural(ctx.snode(p).kind) {
            return Some(p);
        }
        parent = ctx.snode(p).parent;
    }
    None
}

/// Next data-visible schema node after `last` among the data children of
/// `parent` (or the top level of `module` when `parent` is `None`),
/// descending into and climbing out of structural nodes transparently.
pub(crate) fn next_data_node(
    ctx: &Context,
    last: Option<SchemaNodeId>,
    parent: Option<SchemaNodeId>,
    module: ModuleId,
) -> Option<SchemaNodeId> {
    let mut next = match last {
        None => match parent {
            Some(p) => ctx.snode(p).first_child,
            None => ctx.module(module).first_node,
        },
        Some(last) => sibling_or_out(ctx, last, parent),
    };
    while let Some(n) = next {
        if !is_structural(ctx.snode(n).kind) {
            return Some(n);
        }
        next = match ctx.snode(n).first_child {
            Some(child) => Some(child),
            None => sibling_or_out(ctx, n, parent),
        };
    }
    None
}

// Next sibling of `node`, climbing out of structural wrappers up to (not
// including) the `boundary` parent.
fn sibling_or_out(
    ctx: &Context,
    node: SchemaNodeId,
    boundary: Option<SchemaNodeId>,
) -> Option<SchemaNodeId> {
    let mut cur = node;
    loop {
        if let Some(sibling) = ctx.snode(cur).next_sibling {
            return Some(sibling);
        }
        match ctx.snode(cur).parent {
            parent if parent == boundary => return None,
            Some(parent) if is_structural(ctx.snode(parent).kind) => {
                cur = parent
            }
            _ => return None,
        }
    }
}

// ===== value handling =====

const LEAFREF_DEPTH_MAX: usize = 32;

/// Follow leafref target chains down to the effective type used on the
/// wire.
pub(crate) fn resolve_leaf_type<'a>(
    ctx: &'a Context,
    mut ltype: &'a LeafType,
) -> Result<&'a LeafType> {
    let mut depth = 0;
    while ltype.base == DataValueType::LeafRef {
        depth += 1;
        if depth > LEAFREF_DEPTH_MAX {
            return Err(Error::internal("circular leafref chain"));
        }
        let target = ltype
            .leafref_target
            .ok_or_else(|| Error::internal("leafref without target"))?;
        ctx.check_snode(target)?;
        ltype = ctx
            .snode(target)
            .leaf_type
            .as_ref()
            .ok_or_else(|| Error::internal("leafref target is not a leaf"))?;
    }
    Ok(ltype)
}

/// Parse a value in string form according to the given leaf type.
pub(crate) fn parse_value(
    ctx: &Context,
    ltype: &LeafType,
    s: &str,
) -> Result<DataValue> {
    let ltype = resolve_leaf_type(ctx, ltype)?;
    let value = match ltype.base {
        DataValueType::Uint8 => DataValue::Uint8(parse_int(s)?),
        DataValueType::Uint16 => DataValue::Uint16(parse_int(s)?),
        DataValueType::Uint32 => DataValue::Uint32(parse_int(s)?),
        DataValueType::Uint64 => DataValue::Uint64(parse_int(s)?),
        DataValueType::Int8 => DataValue::Int8(parse_int(s)?),
        DataValueType::Int16 => DataValue::Int16(parse_int(s)?),
        DataValueType::Int32 => DataValue::Int32(parse_int(s)?),
        DataValueType::Int64 => DataValue::Int64(parse_int(s)?),
        DataValueType::Bool => match s {
            "true" => DataValue::Bool(true),
            "false" => DataValue::Bool(false),
            _ => {
                return Err(Error::invalid_argument(format!(
                    "invalid boolean \"{}\"",
                    s
                )))
            }
        },
        DataValueType::Empty => {
            if !s.is_empty() {
                return Err(Error::invalid_argument(
                    "empty type takes no value",
                ));
            }
            DataValue::Empty
        }
        DataValueType::Dec64 => {
            DataValue::Dec64(parse_dec64(s, ltype.fraction_digits)?)
        }
        DataValueType::Enum => {
            if !ltype.enums.iter().any(|e| e == s) {
                return Err(Error::invalid_argument(format!(
                    "invalid enum value \"{}\"",
                    s
                )));
            }
            DataValue::Other(s.to_string())
        }
        DataValueType::Bits => {
            DataValue::Other(canonicalize_bits(ltype, s)?)
        }
        _ => DataValue::Other(s.to_string()),
    };
    Ok(value)
}

/// Canonical string form of a typed value.
pub(crate) fn canonical_value(
    ctx: &Context,
    ltype: &LeafType,
    value: &DataValue,
) -> Result<String> {
    let ltype = resolve_leaf_type(ctx, ltype)?;
    check_value_type(ltype, value)?;
    let canonical = match value {
        DataValue::Uint8(v) => v.to_string(),
        DataValue::Uint16(v) => v.to_string(),
        DataValue::Uint32(v) => v.to_string(),
        DataValue::Uint64(v) => v.to_string(),
        DataValue::Int8(v) => v.to_string(),
        DataValue::Int16(v) => v.to_string(),
        DataValue::Int32(v) => v.to_string(),
        DataValue::Int64(v) => v.to_string(),
        DataValue::Bool(v) => v.to_string(),
        DataValue::Empty => String::new(),
        DataValue::Dec64(v) => format_dec64(*v, ltype.fraction_digits),
        DataValue::Other(s) => match ltype.base {
            DataValueType::Bits => canonicalize_bits(ltype, s)?,
            _ => s.clone(),
        },
    };
    Ok(canonical)
}

// Variant/base-type agreement; mismatches are API misuse.
fn check_value_type(ltype: &LeafType, value: &DataValue) -> Result<()> {
    let ok = match ltype.base {
        DataValueType::Uint8 => matches!(value, DataValue::Uint8(_)),
        DataValueType::Uint16 => matches!(value, DataValue::Uint16(_)),
        DataValueType::Uint32 => matches!(value, DataValue::Uint32(_)),
        DataValueType::Uint64 => matches!(value, DataValue::Uint64(_)),
        DataValueType::Int8 => matches!(value, DataValue::Int8(_)),
        DataValueType::Int16 => matches!(value, DataValue::Int16(_)),
        DataValueType::Int32 => matches!(value, DataValue::Int32(_)),
        DataValueType::Int64 => matches!(value, DataValue::Int64(_)),
        DataValueType::Bool => matches!(value, DataValue::Bool(_)),
        DataValueType::Empty => matches!(value, DataValue::Empty),
        DataValueType::Dec64 => matches!(value, DataValue::Dec64(_)),
        DataValueType::Enum => match value {
            DataValue::Other(s) => ltype.enums.iter().any(|e| e == s),
            _ => false,
        },
        _ => matches!(value, DataValue::Other(_)),
    };
    if ok {
        Ok(())
    } else {
        Err(Error::invalid_argument(format!(
            "value {:?} does not match leaf type {:?}",
            value, ltype.base
        )))
    }
}

fn parse_int<T: std::str::FromStr>(s: &str) -> Result<T> {
    s.parse().map_err(|_| {
        Error::invalid_argument(format!("invalid integer \"{}\"", s))
    })
}

// Canonical bits form: member names in bit-position order, deduplicated.
pub(crate) fn canonicalize_bits(ltype: &LeafType, s: &str) -> Result<String> {
    let mut set = vec![false; ltype.bits.len()];
    for name in s.split_whitespace() {
        match ltype.bits.iter().position(|b| b == name) {
            Some(pos) => set[pos] = true,
            None => {
                return Err(Error::invalid_argument(format!(
                    "unknown bit \"{}\"",
                    name
                )))
            }
        }
    }
    let names = ltype
        .bits
        .iter()
        .zip(&set)
        .filter(|(_, set)| **set)
        .map(|(name, _)| name.as_str())
        .collect::<Vec<_>>();
    Ok(names.join(" "))
}

fn parse_dec64(s: &str, fraction_digits: u8) -> Result<i64> {
    let err = || Error::invalid_argument(format!("invalid decimal64 \"{}\"", s));
    let (negative, body) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s),
    };
    let (int_part, frac_part) = match body.split_once('.') {
        Some((int_part, frac_part)) => (int_part, frac_part),
        None => (body, ""),
    };
    if int_part.is_empty() && frac_part.is_empty() {
        return Err(err());
    }
    if !int_part.bytes().all(|b| b.is_ascii_digit())
        || !frac_part.bytes().all(|b| b.is_ascii_digit())
        || frac_part.len() > fraction_digits as usize
    {
        return Err(err());
    }

    let scale = 10u64.pow(fraction_digits as u32);
    let int: u64 = if int_part.is_empty() {
        0
    } else {
        int_part.parse().map_err(|_| err())?
    };
    let frac: u64 = if frac_part.is_empty() {
        0
    } else {
        let parsed: u64 = frac_part.parse().map_err(|_| err())?;
        parsed * 10u64.pow((fraction_digits as usize - frac_part.len()) as u32)
    };
    let magnitude = int
        .checked_mul(scale)
        .and_then(|v| v.checked_add(frac))
        .ok_or_else(err)?;

    if negative {
        0i64.checked_sub_unsigned(magnitude).ok_or_else(err)
    } else {
        i64::try_from(magnitude).map_err(|_| err())
    }
}

pub(crate) fn format_dec64(value: i64, fraction_digits: u8) -> String {
    if fraction_digits == 0 {
        return value.to_string();
    }
    let scale = 10u128.pow(fraction_digits as u32);
    let magnitude = value.unsigned_abs() as u128;
    let sign = if value < 0 { "-" } else { "" };
    let mut frac = format!(
        "{:0width$}",
        magnitude % scale,
        width = fraction_digits as usize
    );
    while frac.len() > 1 && frac.ends_with('0') {
        frac.pop();
    }
    format!("{}{}.{}", sign, magnitude / scale, frac)
}
