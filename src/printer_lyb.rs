//
// Copyright (c) The lyb Core Contributors
//
// SPDX-License-Identifier: MIT
//

//! LYB printer for YANG data trees.
//!
//! The stream is a forest of length-prefixed subtrees. Because a subtree's
//! size is unknown until it has been fully written, every subtree is
//! framed into chunks of at most [`LYB_SIZE_MAX`] payload bytes whose meta
//! headers are reserved up front and patched once the chunk is complete. A
//! chunk that fills up rolls over into a continuation chunk; the header of
//! every chunk also counts the headers reserved strictly inside its span,
//! which lets a reader skip a subtree it cannot interpret.

use std::collections::HashMap;

use byteorder::{ByteOrder, LittleEndian};

use crate::context::{Context, ModuleId, SchemaNodeId};
use crate::data::{
    AnyDataKind, AnyDataValue, DataNodeId, DataNodeValue, DataPrinterFlags,
    DataTree,
};
use crate::error::{Error, Result};
use crate::lyb::{
    first_data_sibling, hash_collision_id, pack_revision, rpc_branch_skipped,
    schema_hash, LybMode, SiblingTable, LYB_HASH_COLLISION_ID, LYB_INCHUNK_MAX,
    LYB_META_BYTES, LYB_SIZE_MAX,
};
use crate::printer::Out;
use crate::schema::{self, DataValue, DataValueType, LeafType, SchemaNodeKind};

// Flag bits of the leaf value type byte (`ABCDDDDD` layout; the low five
// bits carry the base type code).
const LYB_VALUE_DFLT: u8 = 0x80;
const LYB_VALUE_USER: u8 = 0x40;
const LYB_VALUE_UNRES: u8 = 0x20;
const LYB_VALUE_TYPE_MASK: u8 = 0x1f;

struct ChunkEntry {
    written: usize,
    position: usize,
    inner_chunks: usize,
}

struct LybState<'a> {
    ctx: &'a Context,
    mode: LybMode,
    entries: Vec<ChunkEntry>,
    // Sibling hash tables memoized per first-sibling anchor.
    sib_hts: HashMap<SchemaNodeId, SiblingTable>,
}

/// Serialize the subtree rooted at `root` (plus its following siblings
/// with `WITH_SIBLINGS`) into `out`.
pub(crate) fn print_data(
    out: &mut Out<'_>,
    tree: &DataTree<'_>,
    root: DataNodeId,
    options: DataPrinterFlags,
) -> Result<()> {
    let mode = printer_mode(options)?;
    let mut lybs = LybState {
        ctx: tree.context,
        mode,
        entries: Vec::new(),
        sib_hts: HashMap::new(),
    };

    // LYB header: reserved version/flags byte.
    out.write(&[0])?;

    // All used models.
    lybs.print_data_models(out, tree, root)?;

    let mut node = Some(root);
    let mut prev_mod: Option<ModuleId> = None;
    let mut top_anchor: Option<SchemaNodeId> = None;
    while let Some(id) = node {
        // Do not reuse sibling hash tables from different modules.
        let module = lybs.ctx.snode(tree.node_data(id).schema).module;
        if prev_mod != Some(module) {
            top_anchor = None;
            prev_mod = Some(module);
        }

        lybs.print_subtree(out, tree, id, &mut top_anchor, true)?;

        if !options.contains(DataPrinterFlags::WITH_SIBLINGS) {
            break;
        }
        node = tree.node_data(id).next_sibling;
    }

    // Ending zero byte.
    lybs.write(out, &[0])
}

fn printer_mode(options: DataPrinterFlags) -> Result<LybMode> {
    let rpc = options.contains(DataPrinterFlags::RPC);
    let reply = options.contains(DataPrinterFlags::RPC_REPLY);
    match (rpc, reply) {
        (true, true) => Err(Error::invalid_argument(
            "RPC and RPC_REPLY are mutually exclusive",
        )),
        (true, false) => Ok(LybMode::Rpc),
        (false, true) => Ok(LybMode::RpcReply),
        (false, false) => Ok(LybMode::Normal),
    }
}

fn chunk_meta(written: usize, inner_chunks: usize) -> [u8; LYB_META_BYTES] {
    [written as u8, inner_chunks as u8]
}

impl<'a> LybState<'a> {
    // The single path payload bytes take to the sink; splits the write
    // across chunk boundaries and rolls full chunks over.
    fn write(&mut self, out: &mut Out<'_>, mut buf: &[u8]) -> Result<()> {
        while !buf.is_empty() {
            let mut to_write = buf.len();
            let mut full_chunk: Option<usize> = None;
            for (i, entry) in self.entries.iter().enumerate() {
                // The innermost chunks must be resolved first, so inner
                // full chunks replace outer ones.
                if entry.written + to_write >= LYB_SIZE_MAX {
                    to_write = LYB_SIZE_MAX - entry.written;
                    full_chunk = Some(i);
                }
            }

            out.write(&buf[..to_write])?;
            for entry in &mut self.entries {
                entry.written += to_write;
            }
            buf = &buf[to_write..];

            if let Some(full) = full_chunk {
                self.rollover(out, full)?;
            }
        }

        // Chunks that filled up exactly as the write drained roll over
        // right away, in the same innermost-first order the reader
        // resolves them.
        loop {
            let full = self
                .entries
                .iter()
                .rposition(|entry| entry.written == LYB_SIZE_MAX);
            match full {
                Some(index) => self.rollover(out, index)?,
                None => break,
            }
        }
        Ok(())
    }

    // Close the chunk of entry `index` and start its continuation chunk.
    fn rollover(&mut self, out: &mut Out<'_>, index: usize) -> Result<()> {
        let entry = &self.entries[index];
        let meta = chunk_meta(entry.written, entry.inner_chunks);
        out.patch(entry.position, &meta)?;

        let entry = &mut self.entries[index];
        entry.written = 0;
        entry.inner_chunks = 0;
        entry.position = out.reserve(LYB_META_BYTES)?;

        // The continuation header is another inner chunk of every outer
        // entry.
        for i in 0..index {
            self.bump_inner_chunks(i)?;
        }
        Ok(())
    }

    fn bump_inner_chunks(&mut self, index: usize) -> Result<()> {
        if self.entries[index].inner_chunks == LYB_INCHUNK_MAX {
            log::error!("internal: inner chunk count overflow");
            return Err(Error::internal("inner chunk count overflow"));
        }
        self.entries[index].inner_chunks += 1;
        Ok(())
    }

    fn start_subtree(&mut self, out: &mut Out<'_>) -> Result<()> {
        let position = out.reserve(LYB_META_BYTES)?;
        self.entries.push(ChunkEntry {
            written: 0,
            position,
            inner_chunks: 0,
        });
        for i in 0..self.entries.len() - 1 {
            self.bump_inner_chunks(i)?;
        }
        Ok(())
    }

    fn stop_subtree(&mut self, out: &mut Out<'_>) -> Result<()> {
        if self.entries.is_empty() {
            return Err(Error::internal("no open subtree"));
        }
        // A chunk that filled up exactly when its subtree ends still gets
        // its continuation header, keeping the reader's "full chunk means
        // more follows" rule total.
        let top = self.entries.len() - 1;
        if self.entries[top].written == LYB_SIZE_MAX {
            self.rollover(out, top)?;
        }

        match self.entries.pop() {
            Some(entry) => out.patch(
                entry.position,
                &chunk_meta(entry.written, entry.inner_chunks),
            ),
            None => Err(Error::internal("no open subtree")),
        }
    }

    // Write `num` on the smallest number of bytes `max` fits in.
    fn write_number(
        &mut self,
        out: &mut Out<'_>,
        num: u64,
        max: u64,
    ) -> Result<()> {
        let max_bits = (64 - max.leading_zeros()) as usize;
        let max_bytes = max_bits / 8 + usize::from(max_bits % 8 != 0);
        let bytes = num.to_le_bytes();
        self.write(out, &bytes[..max_bytes])
    }

    fn write_string(
        &mut self,
        out: &mut Out<'_>,
        s: &[u8],
        with_length: bool,
    ) -> Result<()> {
        if s.len() > u16::MAX as usize {
            log::error!(
                "internal: maximum supported string length is {} bytes",
                u16::MAX
            );
            return Err(Error::internal("string too long"));
        }
        if with_length {
            let mut len = [0; 2];
            LittleEndian::write_u16(&mut len, s.len() as u16);
            self.write(out, &len)?;
        }
        self.write(out, s)
    }

    fn print_model(&mut self, out: &mut Out<'_>, module: ModuleId) -> Result<()> {
        let ctx = self.ctx;
        let mdata = ctx.module(module);

        // Model name length and model name.
        self.write_string(out, mdata.name.as_bytes(), true)?;

        // Model revision packed on 2 bytes.
        let mut revision = [0; 2];
        LittleEndian::write_u16(
            &mut revision,
            pack_revision(mdata.revision.as_deref()),
        );
        self.write(out, &revision)
    }

    fn print_data_models(
        &mut self,
        out: &mut Out<'_>,
        tree: &DataTree<'_>,
        root: DataNodeId,
    ) -> Result<()> {
        let ctx = self.ctx;
        let mut models: Vec<ModuleId> = Vec::new();

        // First, collect the modules of all top-level data nodes.
        let mut node = Some(root);
        while let Some(id) = node {
            let module = ctx.snode(tree.node_data(id).schema).module;
            if !models.contains(&module) {
                models.push(module);
            }
            node = tree.node_data(id).next_sibling;
        }

        // Then add all implemented modules augmenting or deviating the used
        // models, in a single pass in context order.
        for idx in 0..ctx.modules.len() {
            let module = ModuleId(idx as u32);
            let mdata = ctx.module(module);
            if !mdata.implemented {
                continue;
            }

            let references = |nodes: &[SchemaNodeId]| {
                nodes
                    .iter()
                    .any(|&node| models.contains(&ctx.snode(node).module))
            };
            let hit = references(&mdata.deviations)
                || references(&mdata.augments)
                || mdata.submodules.iter().any(|&sid| {
                    let sdata = &ctx.submodules[sid.0 as usize];
                    references(&sdata.deviations) || references(&sdata.augments)
                });
            if hit && !models.contains(&module) {
                models.push(module);
            }
        }

        if models.len() > u16::MAX as usize {
            return Err(Error::internal("too many modules"));
        }
        let mut count = [0; 2];
        LittleEndian::write_u16(&mut count, models.len() as u16);
        self.write(out, &count)?;

        for module in models {
            self.print_model(out, module)?;
        }
        Ok(())
    }

    fn print_schema_hash(
        &mut self,
        out: &mut Out<'_>,
        snode: SchemaNodeId,
        sibling_anchor: &mut Option<SchemaNodeId>,
    ) -> Result<()> {
        let ctx = self.ctx;

        // Create the whole sibling hash table if not already memoized.
        let anchor = match *sibling_anchor {
            Some(anchor) => anchor,
            None => {
                let anchor = first_data_sibling(ctx, snode, self.mode)
                    .ok_or_else(|| {
                        Error::internal("schema node has no data siblings")
                    })?;
                if !self.sib_hts.contains_key(&anchor) {
                    let table = SiblingTable::build(ctx, anchor, self.mode)?;
                    self.sib_hts.insert(anchor, table);
                }
                *sibling_anchor = Some(anchor);
                anchor
            }
        };

        let hash = self
            .sib_hts
            .get(&anchor)
            .ok_or_else(|| Error::internal("missing sibling hash table"))?
            .find_hash(ctx, snode)?;

        self.write(out, &[hash])?;

        // A collision-id-0 hash stands alone; everything else also carries
        // the lower-id hashes so the reader can tell colliding siblings
        // apart.
        if hash & LYB_HASH_COLLISION_ID == 0 {
            for id in 0..hash_collision_id(hash) {
                let hash = schema_hash(ctx, snode, id);
                if hash == 0 {
                    log::error!("internal: zero schema node hash");
                    return Err(Error::internal("zero schema node hash"));
                }
                self.write(out, &[hash])?;
            }
        }
        Ok(())
    }

    fn print_attributes(
        &mut self,
        out: &mut Out<'_>,
        tree: &DataTree<'_>,
        node: DataNodeId,
    ) -> Result<()> {
        let ctx = self.ctx;
        let meta = &tree.node_data(node).meta;
        if meta.len() > u8::MAX as usize {
            log::error!(
                "internal: maximum supported number of data node attributes \
                 is {}",
                u8::MAX
            );
            return Err(Error::internal("too many attributes"));
        }

        // Number of attributes on 1 byte.
        self.write(out, &[meta.len() as u8])?;

        for attr in meta {
            // Each attribute is a subtree.
            self.start_subtree(out)?;

            self.print_model(out, attr.module)?;

            // Annotation name with length.
            self.write_string(out, attr.name.as_bytes(), true)?;

            let vtype = ctx
                .module(attr.module)
                .annotations
                .iter()
                .find(|a| a.name == attr.name)
                .map(|a| &a.vtype)
                .ok_or_else(|| {
                    Error::internal("attribute without annotation definition")
                })?;
            self.print_value(out, vtype, &attr.value, &attr.canonical, false, false)?;

            self.stop_subtree(out)?;
        }
        Ok(())
    }

    fn print_value(
        &mut self,
        out: &mut Out<'_>,
        ltype: &LeafType,
        value: &DataValue,
        canonical: &str,
        dflt: bool,
        unresolved: bool,
    ) -> Result<()> {
        let ctx = self.ctx;
        let mut byte = 0;
        if dflt {
            byte |= LYB_VALUE_DFLT;
        }
        if ltype.user_defined {
            byte |= LYB_VALUE_USER;
        }
        if unresolved {
            byte |= LYB_VALUE_UNRES;
        }

        // Unions, user types and unresolved values travel in canonical
        // string form; resolved leafrefs as their target type.
        let mut eff = ltype;
        let vtype = if unresolved
            || ltype.user_defined
            || ltype.base == DataValueType::Union
        {
            DataValueType::String
        } else if ltype.base == DataValueType::LeafRef {
            eff = schema::resolve_leaf_type(ctx, ltype)?;
            eff.base
        } else {
            ltype.base
        };

        byte |= (vtype as u8) & LYB_VALUE_TYPE_MASK;
        self.write(out, &[byte])?;

        match vtype {
            DataValueType::Binary
            | DataValueType::InstanceId
            | DataValueType::String
            | DataValueType::Union
            | DataValueType::IdentityRef
            | DataValueType::Unknown => {
                // The enclosing chunk framing delimits the string.
                self.write_string(out, canonical.as_bytes(), false)
            }
            DataValueType::Bits => {
                // Little-endian bit packing, LSB-first within each byte.
                let mut bytes = vec![0u8; (eff.bits.len() + 7) / 8];
                for name in canonical.split_whitespace() {
                    let pos = eff
                        .bits
                        .iter()
                        .position(|bit| bit == name)
                        .ok_or_else(|| {
                            Error::internal("bit value not in the schema")
                        })?;
                    bytes[pos / 8] |= 1 << (pos % 8);
                }
                self.write(out, &bytes)
            }
            DataValueType::Bool => {
                let byte = match value {
                    DataValue::Bool(true) => 1,
                    DataValue::Bool(false) => 0,
                    _ => return Err(Error::internal("boolean value expected")),
                };
                self.write(out, &[byte])
            }
            DataValueType::Empty => Ok(()),
            DataValueType::Enum => {
                // Enum index in definition order, on as few bytes as the
                // enum count allows.
                let index = eff
                    .enums
                    .iter()
                    .position(|e| e == canonical)
                    .ok_or_else(|| {
                        Error::internal("enum value not in the schema")
                    })?;
                self.write_number(out, index as u64, eff.enums.len() as u64)
            }
            DataValueType::Int8 | DataValueType::Uint8 => {
                self.write_number(out, value_bits(value)?, u8::MAX as u64)
            }
            DataValueType::Int16 | DataValueType::Uint16 => {
                self.write_number(out, value_bits(value)?, u16::MAX as u64)
            }
            DataValueType::Int32 | DataValueType::Uint32 => {
                self.write_number(out, value_bits(value)?, u32::MAX as u64)
            }
            DataValueType::Dec64
            | DataValueType::Int64
            | DataValueType::Uint64 => {
                self.write_number(out, value_bits(value)?, u64::MAX)
            }
            DataValueType::LeafRef => {
                Err(Error::internal("unresolved leafref type"))
            }
        }
    }

    fn print_anydata(
        &mut self,
        out: &mut Out<'_>,
        value: &AnyDataValue<'_>,
    ) -> Result<()> {
        // XML content is canonicalized to a constant string.
        let kind = match value {
            AnyDataValue::ConstString(_) | AnyDataValue::Xml(_) => {
                AnyDataKind::ConstString
            }
            AnyDataValue::Json(_) => AnyDataKind::Json,
            AnyDataValue::SubXml(_) => AnyDataKind::SubXml,
            AnyDataValue::DataTree(_) => AnyDataKind::DataTree,
            AnyDataValue::Lyb(_) => AnyDataKind::Lyb,
        };

        // First byte is the value kind.
        self.write(out, &[kind as u8])?;

        // Followed by the content.
        match value {
            AnyDataValue::DataTree(tree) => {
                // A complete embedded stream with its own framing; it is
                // not accounted against the enclosing chunks.
                let root = tree.first_top.ok_or_else(|| {
                    Error::internal("empty nested data tree")
                })?;
                print_data(out, tree, root, DataPrinterFlags::WITH_SIBLINGS)
            }
            AnyDataValue::Lyb(data) => self.write_string(out, data, true),
            AnyDataValue::ConstString(s)
            | AnyDataValue::Xml(s)
            | AnyDataValue::Json(s)
            | AnyDataValue::SubXml(s) => {
                self.write_string(out, s.as_bytes(), false)
            }
        }
    }

    fn print_subtree(
        &mut self,
        out: &mut Out<'_>,
        tree: &DataTree<'_>,
        node: DataNodeId,
        sibling_anchor: &mut Option<SchemaNodeId>,
        top_level: bool,
    ) -> Result<()> {
        let ctx = self.ctx;
        let ndata = tree.node_data(node);
        let snode = ndata.schema;

        // Skip nodes from the RPC branch that is not being printed.
        if rpc_branch_skipped(ctx, snode, self.mode) {
            return Ok(());
        }

        // Register a new subtree.
        self.start_subtree(out)?;

        if top_level {
            // Write the model info first.
            self.print_model(out, ctx.snode(snode).module)?;
        }

        self.print_schema_hash(out, snode, sibling_anchor)?;

        self.print_attributes(out, tree, node)?;

        // Write the node content.
        let kind = ctx.snode(snode).kind;
        match kind {
            SchemaNodeKind::Container
            | SchemaNodeKind::List
            | SchemaNodeKind::Notification
            | SchemaNodeKind::Rpc
            | SchemaNodeKind::Action => (),
            SchemaNodeKind::Leaf | SchemaNodeKind::LeafList => {
                let ltype =
                    ctx.snode(snode).leaf_type.as_ref().ok_or_else(|| {
                        Error::internal("leaf node without a type")
                    })?;
                match &ndata.value {
                    DataNodeValue::Term {
                        value,
                        canonical,
                        unresolved,
                    } => self.print_value(
                        out,
                        ltype,
                        value,
                        canonical,
                        ndata.dflt,
                        *unresolved,
                    )?,
                    _ => {
                        return Err(Error::internal(
                            "leaf data node without a value",
                        ))
                    }
                }
            }
            SchemaNodeKind::AnyData | SchemaNodeKind::AnyXml => {
                match &ndata.value {
                    DataNodeValue::Any(value) => {
                        self.print_anydata(out, value)?
                    }
                    _ => {
                        return Err(Error::internal(
                            "anydata node without a value",
                        ))
                    }
                }
            }
            _ => {
                log::error!(
                    "internal: structural schema node \"{}\" in data tree",
                    ctx.snode(snode).name
                );
                return Err(Error::internal("structural schema node in data"));
            }
        }

        // Recursively write all the descendants.
        if matches!(
            kind,
            SchemaNodeKind::Container
                | SchemaNodeKind::List
                | SchemaNodeKind::Notification
                | SchemaNodeKind::Rpc
                | SchemaNodeKind::Action
        ) {
            let mut child_anchor: Option<SchemaNodeId> = None;
            let mut child = ndata.first_child;
            while let Some(id) = child {
                self.print_subtree(out, tree, id, &mut child_anchor, false)?;
                child = tree.node_data(id).next_sibling;
            }
        }

        // Finish this subtree.
        self.stop_subtree(out)
    }
}

fn value_bits(value: &DataValue) -> Result<u64> {
    let bits = match value {
        DataValue::Uint8(v) => *v as u64,
        DataValue::Uint16(v) => *v as u64,
        DataValue::Uint32(v) => *v as u64,
        DataValue::Uint64(v) => *v,
        DataValue::Int8(v) => *v as u8 as u64,
        DataValue::Int16(v) => *v as u16 as u64,
        DataValue::Int32(v) => *v as u32 as u64,
        DataValue::Int64(v) => *v as u64,
        DataValue::Dec64(v) => *v as u64,
        _ => return Err(Error::internal("numeric value expected")),
    };
    Ok(bits)
}
