//
// Copyright (c) The lyb Core Contributors
//
// SPDX-License-Identifier: MIT
//

//! LYB parser for YANG data trees.
//!
//! The reader mirrors the writer chunk for chunk: a subtree starts with a
//! meta header, a chunk whose size field equals [`LYB_SIZE_MAX`] is always
//! followed by a continuation header, and header reservations made
//! strictly inside a chunk are counted in that chunk's header so whole
//! subtrees can be skipped without understanding them.

use std::collections::HashMap;

use byteorder::{ByteOrder, LittleEndian};
use num_traits::FromPrimitive;

use crate::context::{Context, ModuleId, SchemaNodeId};
use crate::data::{
    AnyDataKind, AnyDataValue, DataNodeId, DataParserFlags, DataTree,
};
use crate::error::{Error, Result};
use crate::lyb::{
    first_data_child, hash_collision_id, pack_revision, LybMode, SiblingTable,
    LYB_HASH_BITS, LYB_META_BYTES, LYB_SIZE_MAX,
};
use crate::schema::{self, DataValueType, LeafType, SchemaNodeKind};

const LYB_VALUE_DFLT: u8 = 0x80;
const LYB_VALUE_UNRES: u8 = 0x20;
const LYB_VALUE_TYPE_MASK: u8 = 0x1f;

struct ReadChunk {
    left: usize,
    continues: bool,
}

struct LybParser<'a, 'b> {
    ctx: &'a Context,
    data: &'b [u8],
    offset: usize,
    entries: Vec<ReadChunk>,
    sib_hts: HashMap<SchemaNodeId, SiblingTable>,
    mode: LybMode,
    strict: bool,
}

/// Parse a complete LYB stream into a data tree.
pub(crate) fn parse_data<'a>(
    ctx: &'a Context,
    data: &[u8],
    options: DataParserFlags,
) -> Result<DataTree<'a>> {
    let mode = parser_mode(options)?;
    let strict = options.contains(DataParserFlags::STRICT);
    let (tree, consumed) = parse_stream(ctx, data, mode, strict)?;
    if consumed != data.len() {
        return Err(Error::invalid_data("trailing bytes after the data tree"));
    }
    Ok(tree)
}

// Parse one embedded or top-level stream, returning the tree and the
// number of bytes consumed.
fn parse_stream<'a>(
    ctx: &'a Context,
    data: &[u8],
    mode: LybMode,
    strict: bool,
) -> Result<(DataTree<'a>, usize)> {
    let mut parser = LybParser {
        ctx,
        data,
        offset: 0,
        entries: Vec::new(),
        sib_hts: HashMap::new(),
        mode,
        strict,
    };
    let mut tree = DataTree::new(ctx);

    parser.parse_header()?;
    parser.parse_data_models()?;

    let mut prev_mod: Option<ModuleId> = None;
    let mut top_anchor: Option<SchemaNodeId> = None;
    loop {
        if parser.peek_byte()? == 0 {
            // Ending zero byte.
            parser.offset += 1;
            break;
        }
        parser.parse_subtree(
            &mut tree,
            None,
            &mut top_anchor,
            Some(&mut prev_mod),
        )?;
    }

    Ok((tree, parser.offset))
}

fn parser_mode(options: DataParserFlags) -> Result<LybMode> {
    let rpc = options.contains(DataParserFlags::RPC);
    let reply = options.contains(DataParserFlags::RPC_REPLY);
    match (rpc, reply) {
        (true, true) => Err(Error::invalid_argument(
            "RPC and RPC_REPLY are mutually exclusive",
        )),
        (true, false) => Ok(LybMode::Rpc),
        (false, true) => Ok(LybMode::RpcReply),
        (false, false) => Ok(LybMode::Normal),
    }
}

impl<'a, 'b> LybParser<'a, 'b> {
    // ===== raw stream access =====

    fn read_raw(&mut self, count: usize) -> Result<&'b [u8]> {
        let end = self.offset.checked_add(count).filter(|&e| e <= self.data.len());
        match end {
            Some(end) => {
                let bytes = &self.data[self.offset..end];
                self.offset = end;
                Ok(bytes)
            }
            None => Err(Error::invalid_data("unexpected end of data")),
        }
    }

    fn peek_byte(&self) -> Result<u8> {
        self.data
            .get(self.offset)
            .copied()
            .ok_or_else(|| Error::invalid_data("unexpected end of data"))
    }

    fn read_meta_raw(&mut self) -> Result<(usize, usize)> {
        let bytes = self.read_raw(LYB_META_BYTES)?;
        Ok((bytes[0] as usize, bytes[1] as usize))
    }

    // ===== chunk-aware reading =====

    fn start_subtree(&mut self) -> Result<()> {
        let (size, _) = self.read_meta_raw()?;
        self.entries.push(ReadChunk {
            left: size,
            continues: size == LYB_SIZE_MAX,
        });
        Ok(())
    }

    // Counterpart of the writer's framed write: drains chunks innermost
    // first and pulls in continuation headers as chunks empty.
    fn read_framed(&mut self, count: usize) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(count);
        let mut remaining = count;
        loop {
            let mut to_read = remaining;
            let mut empty_chunk: Option<usize> = None;
            for (i, entry) in self.entries.iter().enumerate() {
                if entry.continues {
                    if entry.left <= to_read {
                        to_read = entry.left;
                        empty_chunk = Some(i);
                    }
                } else if entry.left < to_read {
                    // A final chunk cannot supply more than it holds.
                    return Err(Error::invalid_data("chunk underrun"));
                }
            }
            if empty_chunk.is_none() && remaining == 0 {
                break;
            }

            if to_read > 0 {
                let bytes = self.read_raw(to_read)?;
                out.extend_from_slice(bytes);
                for entry in &mut self.entries {
                    entry.left -= to_read;
                }
                remaining -= to_read;
            }

            if let Some(i) = empty_chunk {
                let (size, _) = self.read_meta_raw()?;
                let entry = &mut self.entries[i];
                entry.left = size;
                entry.continues = size == LYB_SIZE_MAX;
            }
        }
        Ok(out)
    }

    fn read_byte(&mut self) -> Result<u8> {
        let bytes = self.read_framed(1)?;
        Ok(bytes[0])
    }

    fn read_u16(&mut self) -> Result<u16> {
        let bytes = self.read_framed(2)?;
        Ok(LittleEndian::read_u16(&bytes))
    }

    // Whether the innermost open subtree still has payload, reading
    // continuation headers through empty full chunks.
    fn subtree_has_more(&mut self) -> Result<bool> {
        loop {
            let top = self
                .entries
                .last()
                .ok_or_else(|| Error::internal("no open subtree"))?;
            if top.left > 0 {
                return Ok(true);
            }
            if !top.continues {
                return Ok(false);
            }
            let (size, _) = self.read_meta_raw()?;
            let top = self
                .entries
                .last_mut()
                .ok_or_else(|| Error::internal("no open subtree"))?;
            top.left = size;
            top.continues = size == LYB_SIZE_MAX;
        }
    }

    fn stop_subtree(&mut self) -> Result<()> {
        if self.subtree_has_more()? {
            return Err(Error::invalid_data("subtree not fully consumed"));
        }
        self.entries
            .pop()
            .map(|_| ())
            .ok_or_else(|| Error::internal("no open subtree"))
    }

    // Remaining payload of the innermost subtree; how length-less strings
    // are delimited.
    fn read_to_subtree_end(&mut self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        while self.subtree_has_more()? {
            let left = self
                .entries
                .last()
                .map(|entry| entry.left)
                .ok_or_else(|| Error::internal("no open subtree"))?;
            let bytes = self.read_framed(left)?;
            out.extend_from_slice(&bytes);
        }
        Ok(out)
    }

    fn read_string_framed(&mut self, count: usize) -> Result<String> {
        let bytes = self.read_framed(count)?;
        String::from_utf8(bytes)
            .map_err(|_| Error::invalid_data("invalid UTF-8 string"))
    }

    // ===== stream sections =====

    fn parse_header(&mut self) -> Result<()> {
        let header = self.read_raw(1)?[0];
        if header != 0 {
            return Err(Error::invalid_data(format!(
                "unsupported LYB version/flags 0x{:02x}",
                header
            )));
        }
        Ok(())
    }

    fn parse_data_models(&mut self) -> Result<()> {
        let count = self.read_u16()?;
        for _ in 0..count {
            let (name, revision) = self.read_model()?;
            if self.resolve_model(&name, revision).is_none() {
                if self.strict {
                    return Err(Error::not_found(format!(
                        "module \"{}\" not found in the context",
                        name
                    )));
                }
                log::debug!(
                    "module \"{}\" from the model registry not found, \
                     ignoring",
                    name
                );
            }
        }
        Ok(())
    }

    fn read_model(&mut self) -> Result<(String, u16)> {
        let name_len = self.read_u16()? as usize;
        let name = self.read_string_framed(name_len)?;
        let revision = self.read_u16()?;
        Ok((name, revision))
    }

    fn resolve_model(&self, name: &str, revision: u16) -> Option<ModuleId> {
        (0..self.ctx.modules.len())
            .map(|idx| ModuleId(idx as u32))
            .find(|&module| {
                let mdata = self.ctx.module(module);
                mdata.name == name
                    && pack_revision(mdata.revision.as_deref()) == revision
            })
    }

    fn parse_model(&mut self) -> Result<ModuleId> {
        let (name, revision) = self.read_model()?;
        self.resolve_model(&name, revision).ok_or_else(|| {
            Error::not_found(format!(
                "module \"{}\" not found in the context",
                name
            ))
        })
    }

    // ===== subtree parsing =====

    fn parse_subtree(
        &mut self,
        tree: &mut DataTree<'a>,
        parent: Option<DataNodeId>,
        sibling_anchor: &mut Option<SchemaNodeId>,
        prev_mod: Option<&mut Option<ModuleId>>,
    ) -> Result<()> {
        let ctx = self.ctx;
        self.start_subtree()?;

        // Top-level subtrees carry their module info first.
        let top_module = match prev_mod {
            Some(prev_mod) => {
                let module = self.parse_model()?;
                // Do not reuse sibling hash tables from different modules.
                if *prev_mod != Some(module) {
                    *sibling_anchor = None;
                    *prev_mod = Some(module);
                }
                Some(module)
            }
            None => None,
        };

        let snode =
            self.parse_schema_hash(tree, parent, sibling_anchor, top_module)?;

        // Attributes.
        let attr_count = self.read_byte()?;
        let mut attrs = Vec::new();
        for _ in 0..attr_count {
            if let Some(attr) = self.parse_attribute()? {
                attrs.push(attr);
            }
        }

        // Node content.
        let kind = ctx.snode(snode).kind;
        let node = match kind {
            SchemaNodeKind::Container
            | SchemaNodeKind::List
            | SchemaNodeKind::Notification
            | SchemaNodeKind::Rpc
            | SchemaNodeKind::Action => {
                let node = tree.new_inner(parent, snode)?;
                let mut child_anchor: Option<SchemaNodeId> = None;
                while self.subtree_has_more()? {
                    self.parse_subtree(
                        tree,
                        Some(node),
                        &mut child_anchor,
                        None,
                    )?;
                }
                node
            }
            SchemaNodeKind::Leaf | SchemaNodeKind::LeafList => {
                let ltype =
                    ctx.snode(snode).leaf_type.as_ref().ok_or_else(|| {
                        Error::internal("leaf node without a type")
                    })?;
                let (canonical, dflt, unresolved) = self.parse_value(ltype)?;
                let node = if unresolved {
                    tree.new_term_unresolved(parent, snode, &canonical)?
                } else {
                    tree.new_term_str(parent, snode, &canonical)?
                };
                if dflt {
                    tree.set_default(node, true)?;
                }
                node
            }
            SchemaNodeKind::AnyData | SchemaNodeKind::AnyXml => {
                let value = self.parse_anydata()?;
                tree.new_any(parent, snode, value)?
            }
            _ => {
                return Err(Error::invalid_data(
                    "structural schema node referenced by data",
                ))
            }
        };

        for (module, name, value) in attrs {
            tree.new_meta(node, module, &name, value)?;
        }

        self.stop_subtree()
    }

    fn parse_schema_hash(
        &mut self,
        tree: &DataTree<'a>,
        parent: Option<DataNodeId>,
        sibling_anchor: &mut Option<SchemaNodeId>,
        top_module: Option<ModuleId>,
    ) -> Result<SchemaNodeId> {
        let ctx = self.ctx;

        let anchor = match *sibling_anchor {
            Some(anchor) => anchor,
            None => {
                let anchor = match (parent, top_module) {
                    (Some(parent), _) => {
                        let psnode = tree.node_data(parent).schema;
                        let module = ctx.snode(psnode).module;
                        first_data_child(ctx, Some(psnode), module, self.mode)
                    }
                    (None, Some(module)) => {
                        first_data_child(ctx, None, module, self.mode)
                    }
                    (None, None) => None,
                }
                .ok_or_else(|| {
                    Error::invalid_data("no data nodes expected here")
                })?;
                if !self.sib_hts.contains_key(&anchor) {
                    let table = SiblingTable::build(ctx, anchor, self.mode)?;
                    self.sib_hts.insert(anchor, table);
                }
                *sibling_anchor = Some(anchor);
                anchor
            }
        };

        let hash = self.read_byte()?;
        if hash == 0 {
            return Err(Error::invalid_data("zero schema node hash"));
        }
        let collision_id = hash_collision_id(hash);
        if collision_id >= LYB_HASH_BITS {
            return Err(Error::invalid_data("invalid schema node hash"));
        }
        // Continuation hashes h_0..h_{k-1} of a colliding tag.
        let continuation = self.read_framed(collision_id as usize)?;

        let table = self
            .sib_hts
            .get(&anchor)
            .ok_or_else(|| Error::internal("missing sibling hash table"))?;
        table.resolve(ctx, hash, &continuation).ok_or_else(|| {
            Error::invalid_data("schema node hash does not match any sibling")
        })
    }

    // Returns `None` when an unknown annotation is skipped (lenient mode).
    #[allow(clippy::type_complexity)]
    fn parse_attribute(
        &mut self,
    ) -> Result<Option<(ModuleId, String, schema::DataValue)>> {
        let ctx = self.ctx;
        self.start_subtree()?;

        let module = self.parse_model()?;
        let name_len = self.read_u16()? as usize;
        let name = self.read_string_framed(name_len)?;

        let vtype = ctx
            .module(module)
            .annotations
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.vtype.clone());
        let vtype = match vtype {
            Some(vtype) => vtype,
            None => {
                if self.strict {
                    return Err(Error::not_found(format!(
                        "annotation \"{}\" not found",
                        name
                    )));
                }
                log::debug!("skipping unknown annotation \"{}\"", name);
                self.read_to_subtree_end()?;
                self.stop_subtree()?;
                return Ok(None);
            }
        };

        let (canonical, _, _) = self.parse_value(&vtype)?;
        let value = schema::parse_value(ctx, &vtype, &canonical)?;

        self.stop_subtree()?;
        Ok(Some((module, name, value)))
    }

    // Decode a value payload back to canonical string form, plus the
    // default and unresolved flags of the type byte.
    fn parse_value(&mut self, ltype: &LeafType) -> Result<(String, bool, bool)> {
        let ctx = self.ctx;
        let byte = self.read_byte()?;
        let dflt = byte & LYB_VALUE_DFLT != 0;
        let unresolved = byte & LYB_VALUE_UNRES != 0;
        let code = DataValueType::from_u8(byte & LYB_VALUE_TYPE_MASK)
            .ok_or_else(|| {
                Error::unsupported(format!(
                    "unsupported value type code {}",
                    byte & LYB_VALUE_TYPE_MASK
                ))
            })?;

        if unresolved {
            let bytes = self.read_to_subtree_end()?;
            let canonical = String::from_utf8(bytes)
                .map_err(|_| Error::invalid_data("invalid UTF-8 string"))?;
            return Ok((canonical, dflt, true));
        }

        let eff = schema::resolve_leaf_type(ctx, ltype)?;
        let expected = if ltype.user_defined
            || eff.base == DataValueType::Union
        {
            DataValueType::String
        } else {
            eff.base
        };
        if code != expected {
            return Err(Error::invalid_data(format!(
                "value type {:?} does not match the schema type {:?}",
                code, expected
            )));
        }

        let canonical = match code {
            DataValueType::Binary
            | DataValueType::InstanceId
            | DataValueType::String
            | DataValueType::Union
            | DataValueType::IdentityRef
            | DataValueType::Unknown => {
                let bytes = self.read_to_subtree_end()?;
                String::from_utf8(bytes).map_err(|_| {
                    Error::invalid_data("invalid UTF-8 string")
                })?
            }
            DataValueType::Bits => {
                let count = (eff.bits.len() + 7) / 8;
                let bytes = self.read_framed(count)?;
                let names = eff
                    .bits
                    .iter()
                    .enumerate()
                    .filter(|(pos, _)| {
                        bytes[pos / 8] & (1 << (pos % 8)) != 0
                    })
                    .map(|(_, name)| name.as_str())
                    .collect::<Vec<_>>();
                names.join(" ")
            }
            DataValueType::Bool => match self.read_byte()? {
                0 => "false".to_string(),
                1 => "true".to_string(),
                _ => {
                    return Err(Error::invalid_data("invalid boolean value"))
                }
            },
            DataValueType::Empty => String::new(),
            DataValueType::Enum => {
                let index =
                    self.read_number(eff.enums.len() as u64)? as usize;
                eff.enums
                    .get(index)
                    .cloned()
                    .ok_or_else(|| {
                        Error::invalid_data("enum index out of range")
                    })?
            }
            DataValueType::Int8 => {
                (self.read_number(u8::MAX as u64)? as u8 as i8).to_string()
            }
            DataValueType::Uint8 => {
                (self.read_number(u8::MAX as u64)? as u8).to_string()
            }
            DataValueType::Int16 => {
                (self.read_number(u16::MAX as u64)? as u16 as i16).to_string()
            }
            DataValueType::Uint16 => {
                (self.read_number(u16::MAX as u64)? as u16).to_string()
            }
            DataValueType::Int32 => {
                (self.read_number(u32::MAX as u64)? as u32 as i32).to_string()
            }
            DataValueType::Uint32 => {
                (self.read_number(u32::MAX as u64)? as u32).to_string()
            }
            DataValueType::Int64 => {
                (self.read_number(u64::MAX)? as i64).to_string()
            }
            DataValueType::Uint64 => self.read_number(u64::MAX)?.to_string(),
            DataValueType::Dec64 => {
                let scaled = self.read_number(u64::MAX)? as i64;
                schema::format_dec64(scaled, eff.fraction_digits)
            }
            DataValueType::LeafRef => {
                return Err(Error::invalid_data(
                    "leafref cannot appear on the wire",
                ))
            }
        };

        Ok((canonical, dflt, false))
    }

    // Read a minimum-width little-endian number whose width is defined by
    // the schema-known maximum.
    fn read_number(&mut self, max: u64) -> Result<u64> {
        let max_bits = (64 - max.leading_zeros()) as usize;
        let max_bytes = max_bits / 8 + usize::from(max_bits % 8 != 0);
        let bytes = self.read_framed(max_bytes)?;
        let mut buf = [0u8; 8];
        buf[..bytes.len()].copy_from_slice(&bytes);
        Ok(u64::from_le_bytes(buf))
    }

    fn parse_anydata(&mut self) -> Result<AnyDataValue<'a>> {
        let byte = self.read_byte()?;
        let kind = AnyDataKind::from_u8(byte).ok_or_else(|| {
            Error::unsupported(format!(
                "unsupported anydata value kind 0x{:02x}",
                byte
            ))
        })?;

        let value = match kind {
            AnyDataKind::DataTree => {
                // A complete embedded stream, read outside the chunk
                // accounting of the enclosing subtree.
                let (tree, consumed) = parse_stream(
                    self.ctx,
                    &self.data[self.offset..],
                    LybMode::Normal,
                    self.strict,
                )?;
                self.offset += consumed;
                AnyDataValue::DataTree(Box::new(tree))
            }
            AnyDataKind::Lyb => {
                let len = self.read_u16()? as usize;
                AnyDataValue::Lyb(self.read_framed(len)?)
            }
            AnyDataKind::ConstString => {
                AnyDataValue::ConstString(self.read_anydata_string()?)
            }
            AnyDataKind::Json => {
                AnyDataValue::Json(self.read_anydata_string()?)
            }
            AnyDataKind::SubXml => {
                AnyDataValue::SubXml(self.read_anydata_string()?)
            }
            AnyDataKind::Xml => {
                AnyDataValue::Xml(self.read_anydata_string()?)
            }
        };
        Ok(value)
    }

    fn read_anydata_string(&mut self) -> Result<String> {
        let bytes = self.read_to_subtree_end()?;
        String::from_utf8(bytes)
            .map_err(|_| Error::invalid_data("invalid UTF-8 string"))
    }
}

/// Total length of the LYB stream at the start of `data`, computed by
/// walking the stream framing alone, without a schema context.
///
/// Subtrees carrying an embedded stream (an anydata node holding a nested
/// data tree) are not covered by the chunk accounting and are not
/// supported here.
pub fn lyb_data_length(data: &[u8]) -> Result<usize> {
    let mut offset = 0;

    let need = |offset: usize, count: usize| {
        if offset + count <= data.len() {
            Ok(())
        } else {
            Err(Error::invalid_data("unexpected end of data"))
        }
    };

    // Header byte.
    need(offset, 1)?;
    offset += 1;

    // Model registry.
    need(offset, 2)?;
    let count = LittleEndian::read_u16(&data[offset..]) as usize;
    offset += 2;
    for _ in 0..count {
        need(offset, 2)?;
        let name_len = LittleEndian::read_u16(&data[offset..]) as usize;
        offset += 2 + name_len;
        need(offset, 2)?;
        offset += 2;
    }

    // Subtrees, each a chain of chunks; the inner chunk count tells how
    // many embedded headers pad the chunk's span.
    loop {
        need(offset, 1)?;
        if data[offset] == 0 {
            return Ok(offset + 1);
        }
        loop {
            need(offset, LYB_META_BYTES)?;
            let size = data[offset] as usize;
            let inner_chunks = data[offset + 1] as usize;
            offset += LYB_META_BYTES;
            need(offset, size + inner_chunks * LYB_META_BYTES)?;
            offset += size + inner_chunks * LYB_META_BYTES;
            if size < LYB_SIZE_MAX {
                break;
            }
        }
    }
}
