//
// Copyright (c) The lyb Core Contributors
//
// SPDX-License-Identifier: MIT
//

//! YANG instance data.

use std::io::Write;

use bitflags::bitflags;
use num_derive::FromPrimitive;

use crate::context::{Context, ModuleId, SchemaNodeId};
use crate::error::{Error, Result};
use crate::iter::{Ancestors, MetadataList, NodeIterable, Siblings, Traverse};
use crate::parser_lyb;
use crate::printer::Out;
use crate::printer_lyb;
use crate::schema::{
    self, DataValue, SchemaNode, SchemaNodeKind,
};

/// Handle to a node stored in a [`DataTree`].
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct DataNodeId(pub(crate) u32);

/// YANG data tree.
///
/// Data nodes live in a flat arena addressed by [`DataNodeId`] handles; the
/// tree borrows the schema [`Context`] it was built against.
#[derive(Debug)]
pub struct DataTree<'a> {
    pub(crate) context: &'a Context,
    pub(crate) nodes: Vec<DataNodeData<'a>>,
    pub(crate) first_top: Option<DataNodeId>,
    pub(crate) last_top: Option<DataNodeId>,
}

/// YANG data node reference.
#[derive(Clone, Debug)]
pub struct DataNodeRef<'a> {
    tree: &'a DataTree<'a>,
    id: DataNodeId,
}

/// The structure provides information about metadata of a data element.
/// Such attributes must map to annotations as specified in RFC 7952.
#[derive(Clone, Debug)]
pub struct Metadata<'a> {
    tree: &'a DataTree<'a>,
    node: DataNodeId,
    index: usize,
}

/// Kind of an anydata/anyxml value, as stored on the wire.
#[derive(Copy, Clone, Debug, PartialEq, FromPrimitive)]
pub enum AnyDataKind {
    /// Constant string.
    ConstString = 0x00,
    /// JSON-encoded subtree.
    Json = 0x02,
    /// Memory chunk with serialized XML.
    SubXml = 0x08,
    /// XML document; canonicalized to a constant string when serialized.
    Xml = 0x20,
    /// Nested data tree, serialized as a complete embedded stream.
    DataTree = 0x40,
    /// Opaque pre-serialized binary subtree.
    Lyb = 0x80,
}

/// Value of an anydata/anyxml node.
#[derive(Debug)]
pub enum AnyDataValue<'a> {
    ConstString(String),
    Json(String),
    SubXml(String),
    Xml(String),
    DataTree(Box<DataTree<'a>>),
    Lyb(Vec<u8>),
}

#[derive(Debug)]
pub(crate) struct DataNodeData<'a> {
    pub schema: SchemaNodeId,
    pub parent: Option<DataNodeId>,
    pub next_sibling: Option<DataNodeId>,
    pub first_child: Option<DataNodeId>,
    pub last_child: Option<DataNodeId>,
    pub value: DataNodeValue<'a>,
    pub meta: Vec<MetaData>,
    pub dflt: bool,
}

#[derive(Debug)]
pub(crate) enum DataNodeValue<'a> {
    Inner,
    Term {
        value: DataValue,
        canonical: String,
        unresolved: bool,
    },
    Any(AnyDataValue<'a>),
}

#[derive(Debug)]
pub(crate) struct MetaData {
    pub module: ModuleId,
    pub name: String,
    pub value: DataValue,
    pub canonical: String,
}

bitflags! {
    /// Data printer options.
    #[derive(Clone, Copy)]
    pub struct DataPrinterFlags: u32 {
        /// Flag for printing also the (following) sibling nodes of the data
        /// node.
        const WITH_SIBLINGS = 0x01;
        /// The tree is an RPC/action invocation; output-branch nodes are
        /// not printed.
        const RPC = 0x02;
        /// The tree is an RPC/action reply; input-branch nodes are not
        /// printed.
        const RPC_REPLY = 0x04;
    }
}

bitflags! {
    /// Data parser options.
    #[derive(Clone, Copy)]
    pub struct DataParserFlags: u32 {
        /// Instead of silently ignoring registry entries of modules missing
        /// from the context, raise an error.
        const STRICT = 0x01;
        /// The tree is an RPC/action invocation.
        const RPC = 0x02;
        /// The tree is an RPC/action reply.
        const RPC_REPLY = 0x04;
    }
}

/// Methods common to data trees and data node references.
pub trait Data<'a> {
    #[doc(hidden)]
    fn tree(&self) -> &DataTree<'a>;

    #[doc(hidden)]
    fn print_root(&self) -> Option<DataNodeId>;

    #[doc(hidden)]
    fn context(&self) -> &'a Context {
        self.tree().context
    }

    /// Serialize the data (sub)tree in the LYB format into a writer (a file,
    /// a socket, any `std::io::Write` sink).
    fn print_writer<W: Write>(
        &self,
        writer: &mut W,
        options: DataPrinterFlags,
    ) -> Result<()> {
        let root = self
            .print_root()
            .ok_or_else(|| Error::invalid_argument("empty data tree"))?;
        let mut out = Out::new_writer(writer);
        printer_lyb::print_data(&mut out, self.tree(), root, options)
    }

    /// Serialize the data (sub)tree in the LYB format to a bytes vector.
    fn print_bytes(&self, options: DataPrinterFlags) -> Result<Vec<u8>> {
        let root = self
            .print_root()
            .ok_or_else(|| Error::invalid_argument("empty data tree"))?;
        let mut out = Out::new_memory();
        printer_lyb::print_data(&mut out, self.tree(), root, options)?;
        Ok(out.into_memory())
    }

    /// Serialize the data (sub)tree in the LYB format through a user
    /// callback. The callback returns the number of bytes it consumed;
    /// consuming less than offered is a hard failure.
    fn print_clb<F>(&self, mut clb: F, options: DataPrinterFlags) -> Result<()>
    where
        F: FnMut(&[u8]) -> std::io::Result<usize>,
    {
        let root = self
            .print_root()
            .ok_or_else(|| Error::invalid_argument("empty data tree"))?;
        let mut out = Out::new_callback(&mut clb);
        printer_lyb::print_data(&mut out, self.tree(), root, options)
    }
}

// ===== impl DataTree =====

impl<'a> DataTree<'a> {
    /// Create an empty data tree.
    pub fn new(context: &'a Context) -> DataTree<'a> {
        DataTree {
            context,
            nodes: Vec::new(),
            first_top: None,
            last_top: None,
        }
    }

    /// Parse a LYB-encoded data tree. The context must contain every module
    /// the data was serialized against.
    pub fn parse_lyb(
        context: &'a Context,
        data: &[u8],
        options: DataParserFlags,
    ) -> Result<DataTree<'a>> {
        parser_lyb::parse_data(context, data, options)
    }

    /// Returns an iterator over the top-level nodes of the tree.
    pub fn roots(&self) -> Siblings<DataNodeRef<'_>> {
        Siblings::new(self.first_top.map(|id| self.node_ref(id)))
    }

    /// Returns an iterator over all nodes of the tree (depth-first).
    pub fn traverse(&self) -> impl Iterator<Item = DataNodeRef<'_>> {
        self.roots().flat_map(|root| root.traverse())
    }

    /// Returns a reference to the node with the given handle.
    pub fn node_ref(&self, id: DataNodeId) -> DataNodeRef<'_> {
        DataNodeRef { tree: self, id }
    }

    /// Create an interior data node (container, list, RPC, action or
    /// notification instance).
    pub fn new_inner(
        &mut self,
        parent: Option<DataNodeId>,
        snode: SchemaNodeId,
    ) -> Result<DataNodeId> {
        self.context.check_snode(snode)?;
        match self.context.snode(snode).kind {
            SchemaNodeKind::Container
            | SchemaNodeKind::List
            | SchemaNodeKind::Rpc
            | SchemaNodeKind::Action
            | SchemaNodeKind::Notification => (),
            kind => {
                return Err(Error::invalid_argument(format!(
                    "{:?} is not an interior node kind",
                    kind
                )))
            }
        }
        self.add_node(parent, snode, DataNodeValue::Inner)
    }

    /// Create a leaf or leaf-list data node from a typed value.
    pub fn new_term(
        &mut self,
        parent: Option<DataNodeId>,
        snode: SchemaNodeId,
        value: DataValue,
    ) -> Result<DataNodeId> {
        let ltype = self.term_type(snode)?;
        let canonical =
            schema::canonical_value(self.context, &ltype, &value)?;
        self.add_node(
            parent,
            snode,
            DataNodeValue::Term {
                value,
                canonical,
                unresolved: false,
            },
        )
    }

    /// Create a leaf or leaf-list data node from a value in string form.
    pub fn new_term_str(
        &mut self,
        parent: Option<DataNodeId>,
        snode: SchemaNodeId,
        value: &str,
    ) -> Result<DataNodeId> {
        let ltype = self.term_type(snode)?;
        let value = schema::parse_value(self.context, &ltype, value)?;
        self.new_term(parent, snode, value)
    }

    /// Create a leaf or leaf-list data node whose value could not be
    /// resolved (e.g. a leafref with a missing target). The raw string form
    /// is kept.
    pub fn new_term_unresolved(
        &mut self,
        parent: Option<DataNodeId>,
        snode: SchemaNodeId,
        value: &str,
    ) -> Result<DataNodeId> {
        self.term_type(snode)?;
        self.add_node(
            parent,
            snode,
            DataNodeValue::Term {
                value: DataValue::Other(value.to_string()),
                canonical: value.to_string(),
                unresolved: true,
            },
        )
    }

    /// Create an anydata/anyxml data node.
    pub fn new_any(
        &mut self,
        parent: Option<DataNodeId>,
        snode: SchemaNodeId,
        value: AnyDataValue<'a>,
    ) -> Result<DataNodeId> {
        self.context.check_snode(snode)?;
        match self.context.snode(snode).kind {
            SchemaNodeKind::AnyData | SchemaNodeKind::AnyXml => (),
            kind => {
                return Err(Error::invalid_argument(format!(
                    "{:?} is not an anydata node kind",
                    kind
                )))
            }
        }
        if let AnyDataValue::DataTree(tree) = &value {
            if !std::ptr::eq(tree.context, self.context) {
                return Err(Error::invalid_argument(
                    "nested data tree uses a different context",
                ));
            }
            if tree.first_top.is_none() {
                return Err(Error::invalid_argument(
                    "nested data tree is empty",
                ));
            }
        }
        self.add_node(parent, snode, DataNodeValue::Any(value))
    }

    /// Attach a metadata attribute to a node. The annotation must have been
    /// defined in the given module.
    pub fn new_meta(
        &mut self,
        node: DataNodeId,
        module: ModuleId,
        name: &str,
        value: DataValue,
    ) -> Result<()> {
        self.check_node(node)?;
        self.context.check_module(module)?;
        let vtype = self
            .context
            .module(module)
            .annotations
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.vtype.clone())
            .ok_or_else(|| {
                Error::not_found(format!("annotation \"{}\" not found", name))
            })?;
        let canonical = schema::canonical_value(self.context, &vtype, &value)?;
        self.nodes[node.0 as usize].meta.push(MetaData {
            module,
            name: name.to_string(),
            value,
            canonical,
        });
        Ok(())
    }

    /// Set or clear the default-value flag of a node.
    pub fn set_default(&mut self, node: DataNodeId, dflt: bool) -> Result<()> {
        self.check_node(node)?;
        self.nodes[node.0 as usize].dflt = dflt;
        Ok(())
    }

    /// Create a new node (and all its non-existing parents) based on a
    /// simplified absolute data path: `/module:node/node2/...`, where a
    /// module prefix is required on the first segment and on every module
    /// change. Interior nodes are reused when they already exist, except
    /// lists, which always get a fresh instance (predicates are not
    /// supported). The value applies to the final segment when it is a leaf
    /// or leaf-list.
    pub fn new_path(
        &mut self,
        path: &str,
        value: Option<&str>,
    ) -> Result<DataNodeId> {
        let path = path
            .strip_prefix('/')
            .ok_or_else(|| Error::invalid_argument("path must be absolute"))?;

        let mut module: Option<ModuleId> = None;
        let mut parent: Option<DataNodeId> = None;
        let mut parent_schema: Option<SchemaNodeId> = None;
        let mut node = None;

        let segments = path.split('/').collect::<Vec<_>>();
        for (seg_i, segment) in segments.iter().enumerate() {
            let (name, module_id) = match segment.split_once(':') {
                Some((prefix, name)) => {
                    let module = self
                        .context
                        .get_module(prefix, None)
                        .ok_or_else(|| {
                            Error::not_found(format!(
                                "module \"{}\" not found",
                                prefix
                            ))
                        })?
                        .id();
                    (name, module)
                }
                None => match module {
                    Some(module) => (*segment, module),
                    None => {
                        return Err(Error::invalid_argument(
                            "first path segment must carry a module prefix",
                        ))
                    }
                },
            };
            module = Some(module_id);

            // Resolve the schema node among the data children.
            let snode = self
                .find_data_child_schema(parent_schema, module_id, name)
                .ok_or_else(|| {
                    Error::not_found(format!(
                        "schema node \"{}\" not found",
                        name
                    ))
                })?;

            let last = seg_i == segments.len() - 1;
            let kind = self.context.snode(snode).kind;
            node = Some(match kind {
                SchemaNodeKind::Leaf | SchemaNodeKind::LeafList => {
                    if !last {
                        return Err(Error::invalid_argument(
                            "leaf node in the middle of a path",
                        ));
                    }
                    self.new_term_str(parent, snode, value.unwrap_or(""))?
                }
                SchemaNodeKind::List => self.new_inner(parent, snode)?,
                _ => match self.find_child(parent, snode) {
                    Some(existing) => existing,
                    None => self.new_inner(parent, snode)?,
                },
            });
            parent = node;
            parent_schema = Some(snode);
        }

        node.ok_or_else(|| Error::invalid_argument("empty path"))
    }

    /// Search the tree for the first node matching the provided simplified
    /// path (same syntax as [`DataTree::new_path`]).
    pub fn find_path(&self, path: &str) -> Result<DataNodeRef<'_>> {
        let path = path
            .strip_prefix('/')
            .ok_or_else(|| Error::invalid_argument("path must be absolute"))?;

        let mut module: Option<ModuleId> = None;
        let mut node: Option<DataNodeId> = None;
        for segment in path.split('/') {
            let (name, module_id) = match segment.split_once(':') {
                Some((prefix, name)) => {
                    let module = self
                        .context
                        .get_module(prefix, None)
                        .ok_or_else(|| {
                            Error::not_found(format!(
                                "module \"{}\" not found",
                                prefix
                            ))
                        })?
                        .id();
                    (name, module)
                }
                None => match module {
                    Some(module) => (segment, module),
                    None => {
                        return Err(Error::invalid_argument(
                            "first path segment must carry a module prefix",
                        ))
                    }
                },
            };
            module = Some(module_id);

            let mut child = match node {
                Some(node) => self.nodes[node.0 as usize].first_child,
                None => self.first_top,
            };
            node = loop {
                match child {
                    Some(id) => {
                        let snode =
                            self.context.snode(self.nodes[id.0 as usize].schema);
                        if snode.name == name && snode.module == module_id {
                            break Some(id);
                        }
                        child = self.nodes[id.0 as usize].next_sibling;
                    }
                    None => break None,
                }
            };
            if node.is_none() {
                return Err(Error::not_found(format!(
                    "node \"{}\" not found",
                    segment
                )));
            }
        }

        node.map(|id| self.node_ref(id))
            .ok_or_else(|| Error::invalid_argument("empty path"))
    }

    fn term_type(&self, snode: SchemaNodeId) -> Result<schema::LeafType> {
        self.context.check_snode(snode)?;
        let sdata = self.context.snode(snode);
        match sdata.kind {
            SchemaNodeKind::Leaf | SchemaNodeKind::LeafList => (),
            kind => {
                return Err(Error::invalid_argument(format!(
                    "{:?} is not a leaf node kind",
                    kind
                )))
            }
        }
        sdata
            .leaf_type
            .clone()
            .ok_or_else(|| Error::internal("leaf node without a type"))
    }

    // Schema child lookup among the data-visible children, hopping over
    // structural nodes.
    fn find_data_child_schema(
        &self,
        parent: Option<SchemaNodeId>,
        module: ModuleId,
        name: &str,
    ) -> Option<SchemaNodeId> {
        let mut last = None;
        loop {
            last = schema::next_data_node(self.context, last, parent, module);
            match last {
                Some(id) => {
                    let snode = self.context.snode(id);
                    if snode.name == name && snode.module == module {
                        return Some(id);
                    }
                }
                None => return None,
            }
        }
    }

    fn find_child(
        &self,
        parent: Option<DataNodeId>,
        snode: SchemaNodeId,
    ) -> Option<DataNodeId> {
        let mut child = match parent {
            Some(parent) => self.nodes[parent.0 as usize].first_child,
            None => self.first_top,
        };
        while let Some(id) = child {
            if self.nodes[id.0 as usize].schema == snode {
                return Some(id);
            }
            child = self.nodes[id.0 as usize].next_sibling;
        }
        None
    }

    fn add_node(
        &mut self,
        parent: Option<DataNodeId>,
        snode: SchemaNodeId,
        value: DataNodeValue<'a>,
    ) -> Result<DataNodeId> {
        // The schema parent (hopping over structural nodes) must match the
        // parent data node's schema.
        let expected = schema::data_parent(self.context, snode);
        let actual = match parent {
            Some(parent) => {
                self.check_node(parent)?;
                Some(self.nodes[parent.0 as usize].schema)
            }
            None => None,
        };
        if expected != actual {
            return Err(Error::invalid_argument(
                "data node parent does not match the schema",
            ));
        }

        self.nodes.push(DataNodeData {
            schema: snode,
            parent,
            next_sibling: None,
            first_child: None,
            last_child: None,
            value,
            meta: Vec::new(),
            dflt: false,
        });
        let id = DataNodeId(self.nodes.len() as u32 - 1);

        match parent {
            Some(parent) => {
                let last = self.nodes[parent.0 as usize].last_child;
                match last {
                    Some(last) => {
                        self.nodes[last.0 as usize].next_sibling = Some(id)
                    }
                    None => self.nodes[parent.0 as usize].first_child = Some(id),
                }
                self.nodes[parent.0 as usize].last_child = Some(id);
            }
            None => {
                match self.last_top {
                    Some(last) => {
                        self.nodes[last.0 as usize].next_sibling = Some(id)
                    }
                    None => self.first_top = Some(id),
                }
                self.last_top = Some(id);
            }
        }

        Ok(id)
    }

    fn check_node(&self, node: DataNodeId) -> Result<()> {
        if (node.0 as usize) < self.nodes.len() {
            Ok(())
        } else {
            Err(Error::invalid_argument("unknown data node"))
        }
    }

    pub(crate) fn node_data(&self, id: DataNodeId) -> &DataNodeData<'a> {
        &self.nodes[id.0 as usize]
    }
}

impl<'a> Data<'a> for DataTree<'a> {
    fn tree(&self) -> &DataTree<'a> {
        self
    }

    fn print_root(&self) -> Option<DataNodeId> {
        self.first_top
    }
}

// ===== impl DataNodeRef =====

impl<'a> DataNodeRef<'a> {
    /// Handle of this node in its tree.
    pub fn id(&self) -> DataNodeId {
        self.id
    }

    /// Schema definition of this node.
    pub fn schema(&self) -> SchemaNode<'a> {
        SchemaNode::new(self.tree.context, self.tree.node_data(self.id).schema)
    }

    /// Returns the parent node, if any.
    pub fn parent(&self) -> Option<DataNodeRef<'a>> {
        self.tree
            .node_data(self.id)
            .parent
            .map(|id| DataNodeRef {
                tree: self.tree,
                id,
            })
    }

    /// Returns the next sibling node, if any.
    pub fn next_sibling(&self) -> Option<DataNodeRef<'a>> {
        self.tree
            .node_data(self.id)
            .next_sibling
            .map(|id| DataNodeRef {
                tree: self.tree,
                id,
            })
    }

    /// Returns the first child node, if any.
    pub fn first_child(&self) -> Option<DataNodeRef<'a>> {
        self.tree
            .node_data(self.id)
            .first_child
            .map(|id| DataNodeRef {
                tree: self.tree,
                id,
            })
    }

    /// Returns an iterator over the children of the node.
    pub fn children(&self) -> Siblings<DataNodeRef<'a>> {
        Siblings::new(self.first_child())
    }

    /// Returns an iterator over this node and its following siblings.
    pub fn siblings(&self) -> Siblings<DataNodeRef<'a>> {
        Siblings::new(Some(self.clone()))
    }

    /// Returns an iterator over this node and its ancestors.
    pub fn ancestors(&self) -> Ancestors<DataNodeRef<'a>> {
        Ancestors::new(Some(self.clone()))
    }

    /// Returns an iterator over the subtree of this node (depth-first).
    pub fn traverse(&self) -> Traverse<DataNodeRef<'a>> {
        Traverse::new(self.clone())
    }

    /// Typed value of a leaf or leaf-list node.
    pub fn value(&self) -> Option<&'a DataValue> {
        match &self.tree.node_data(self.id).value {
            DataNodeValue::Term { value, .. } => Some(value),
            _ => None,
        }
    }

    /// Canonical string form of a leaf or leaf-list value.
    pub fn value_canonical(&self) -> Option<&'a str> {
        match &self.tree.node_data(self.id).value {
            DataNodeValue::Term { canonical, .. } => Some(canonical),
            _ => None,
        }
    }

    /// Value of an anydata/anyxml node.
    pub fn any_value(&self) -> Option<&'a AnyDataValue<'a>> {
        match &self.tree.node_data(self.id).value {
            DataNodeValue::Any(value) => Some(value),
            _ => None,
        }
    }

    /// Whether the node carries its default value.
    pub fn is_default(&self) -> bool {
        self.tree.node_data(self.id).dflt
    }

    /// Whether a term value failed resolution and is kept in raw string
    /// form.
    pub fn is_unresolved(&self) -> bool {
        matches!(
            self.tree.node_data(self.id).value,
            DataNodeValue::Term {
                unresolved: true,
                ..
            }
        )
    }

    /// Returns an iterator over the metadata attributes of the node.
    pub fn meta(&self) -> MetadataList<'a> {
        MetadataList::new(Metadata::first(self.tree, self.id))
    }

    /// Data path of the node, with the module prefix printed whenever the
    /// module changes along the path.
    pub fn path(&self) -> String {
        let mut parts = self
            .ancestors()
            .map(|dnode| {
                let snode = dnode.schema();
                let prefix = match dnode.parent() {
                    Some(parent)
                        if parent.schema().module() == snode.module() =>
                    {
                        None
                    }
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

impl PartialEq for DataNodeRef<'_> {
    fn eq(&self, other: &DataNodeRef<'_>) -> bool {
        std::ptr::eq(self.tree, other.tree) && self.id == other.id
    }
}

impl<'a> NodeIterable for DataNodeRef<'a> {
    fn parent(&self) -> Option<DataNodeRef<'a>> {
        self.parent()
    }

    fn next_sibling(&self) -> Option<DataNodeRef<'a>> {
        self.next_sibling()
    }

    fn first_child(&self) -> Option<DataNodeRef<'a>> {
        self.first_child()
    }
}

impl<'a> Data<'a> for DataNodeRef<'a> {
    fn tree(&self) -> &DataTree<'a> {
        self.tree
    }

    fn print_root(&self) -> Option<DataNodeId> {
        Some(self.id)
    }
}

// ===== impl Metadata =====

impl<'a> Metadata<'a> {
    fn first(tree: &'a DataTree<'a>, node: DataNodeId) -> Option<Metadata<'a>> {
        if tree.node_data(node).meta.is_empty() {
            None
        } else {
            Some(Metadata {
                tree,
                node,
                index: 0,
            })
        }
    }

    fn data(&self) -> &'a MetaData {
        &self.tree.node_data(self.node).meta[self.index]
    }

    /// Annotation name.
    pub fn name(&self) -> &'a str {
        &self.data().name
    }

    /// Module the annotation is defined in.
    pub fn module(&self) -> crate::schema::SchemaModule<'a> {
        crate::schema::SchemaModule::new(self.tree.context, self.data().module)
    }

    /// Typed metadata value.
    pub fn value(&self) -> &'a DataValue {
        &self.data().value
    }

    /// Canonical string form of the metadata value.
    pub fn value_canonical(&self) -> &'a str {
        &self.data().canonical
    }

    /// Next metadata attribute of the same node.
    pub fn next(&self) -> Option<Metadata<'a>> {
        let index = self.index + 1;
        if index < self.tree.node_data(self.node).meta.len() {
            Some(Metadata {
                tree: self.tree,
                node: self.node,
                index,
            })
        } else {
            None
        }
    }
}
