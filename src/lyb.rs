//
// Copyright (c) The lyb Core Contributors
//
// SPDX-License-Identifier: MIT
//

//! Pieces of the LYB format shared between the printer and the parser:
//! framing constants, the schema-node hash family and per-parent sibling
//! hash tables, and module revision packing.

use std::collections::HashMap;

use crate::context::{Context, ModuleId, SchemaNodeId};
use crate::error::{Error, Result};
use crate::schema::{self, SchemaNodeKind};

/// Number of bytes of the chunk size field.
pub(crate) const LYB_SIZE_BYTES: usize = 1;
/// Maximum size of a single chunk payload.
pub(crate) const LYB_SIZE_MAX: usize = u8::MAX as usize;
/// Number of bytes of the inner chunk count field.
pub(crate) const LYB_INCHUNK_BYTES: usize = 1;
/// Maximum number of header reservations inside one chunk.
pub(crate) const LYB_INCHUNK_MAX: usize = u8::MAX as usize;
/// Size of a chunk meta header (size + inner chunk count).
pub(crate) const LYB_META_BYTES: usize = LYB_SIZE_BYTES + LYB_INCHUNK_BYTES;

/// Hash of a schema node among its data siblings.
pub(crate) type LybHash = u8;

/// Number of collision ids in the hash family.
pub(crate) const LYB_HASH_BITS: u8 = 8;
/// Payload mask of a collision-id-0 hash.
pub(crate) const LYB_HASH_MASK: u8 = 0x7f;
/// Marker bit of a collision-id-0 hash.
pub(crate) const LYB_HASH_COLLISION_ID: u8 = 0x80;

/// Which branch of RPC/action subtrees is being serialized.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum LybMode {
    Normal,
    Rpc,
    RpcReply,
}

// Jenkins one-at-a-time, fed piecewise; a `None` key finalizes.
fn hash_multi(mut hash: u32, key: Option<&[u8]>) -> u32 {
    match key {
        Some(key) => {
            for &byte in key {
                hash = hash.wrapping_add(byte as u32);
                hash = hash.wrapping_add(hash << 10);
                hash ^= hash >> 6;
            }
        }
        None => {
            hash = hash.wrapping_add(hash << 3);
            hash ^= hash >> 11;
            hash = hash.wrapping_add(hash << 15);
        }
    }
    hash
}

/// Hash of a schema node under the given collision id.
///
/// The result carries the collision id in unary in its high bits: bit
/// `7 - id` is set and all higher bits are clear, leaving `7 - id` low bits
/// of hash payload. The marker bit makes the result non-zero for every
/// valid collision id; ids past the family size yield 0.
pub(crate) fn schema_hash(
    ctx: &Context,
    snode: SchemaNodeId,
    collision_id: u8,
) -> LybHash {
    if collision_id >= LYB_HASH_BITS {
        return 0;
    }
    let sdata = ctx.snode(snode);
    let mod_name = ctx.module(sdata.module).name.as_bytes();

    let mut full = hash_multi(0, Some(mod_name));
    full = hash_multi(full, Some(sdata.name.as_bytes()));
    if collision_id > 0 {
        // Differentiate the hash sequence by re-feeding a module name
        // prefix one byte longer per collision id (capped at the name
        // length, where only the narrowing mask keeps changing).
        let ext_len = (collision_id as usize).min(mod_name.len());
        full = hash_multi(full, Some(&mod_name[..ext_len]));
    }
    let full = hash_multi(full, None);

    ((full as u8) & (LYB_HASH_MASK >> collision_id))
        | (LYB_HASH_COLLISION_ID >> collision_id)
}

/// Collision id encoded in the high bits of a hash byte.
pub(crate) fn hash_collision_id(hash: LybHash) -> u8 {
    hash.leading_zeros() as u8
}

/// Whether a node sits in the RPC branch that the current mode leaves out
/// (output branch of an invocation, input branch of a reply).
pub(crate) fn rpc_branch_skipped(
    ctx: &Context,
    snode: SchemaNodeId,
    mode: LybMode,
) -> bool {
    if mode == LybMode::Normal {
        return false;
    }
    let mut parent = ctx.snode(snode).parent;
    while let Some(p) = parent {
        match ctx.snode(p).kind {
            SchemaNodeKind::Uses
            | SchemaNodeKind::Case
            | SchemaNodeKind::Choice => parent = ctx.snode(p).parent,
            kind => {
                return match mode {
                    LybMode::Rpc => kind == SchemaNodeKind::Output,
                    LybMode::RpcReply => kind == SchemaNodeKind::Input,
                    LybMode::Normal => false,
                }
            }
        }
    }
    false
}

/// First member of the data-sibling set a node belongs to, honoring the
/// RPC mode filter. This is the anchor under which the set's hash table is
/// memoized.
pub(crate) fn first_data_sibling(
    ctx: &Context,
    snode: SchemaNodeId,
    mode: LybMode,
) -> Option<SchemaNodeId> {
    let parent = schema::data_parent(ctx, snode);
    let module = ctx.snode(snode).module;
    first_data_child(ctx, parent, module, mode)
}

/// First data child of a schema parent (or of a module's top level),
/// honoring the RPC mode filter.
pub(crate) fn first_data_child(
    ctx: &Context,
    parent: Option<SchemaNodeId>,
    module: ModuleId,
    mode: LybMode,
) -> Option<SchemaNodeId> {
    let mut first = schema::next_data_node(ctx, None, parent, module);
    while let Some(sibling) = first {
        if !rpc_branch_skipped(ctx, sibling, mode) {
            return Some(sibling);
        }
        first = schema::next_data_node(ctx, Some(sibling), parent, module);
    }
    None
}

/// Per-parent sibling hash table.
///
/// Keyed by the hash byte each node was inserted under; a bucket can hold
/// several nodes provided their hash sequences differ at some lower
/// collision id, so lookups disambiguate by node identity.
#[derive(Debug)]
pub(crate) struct SiblingTable {
    slots: HashMap<LybHash, Vec<SchemaNodeId>>,
}

impl SiblingTable {
    /// Build the hash table for the data-sibling set anchored at
    /// `first_sibling`, assigning each sibling the smallest usable
    /// collision id.
    pub fn build(
        ctx: &Context,
        first_sibling: SchemaNodeId,
        mode: LybMode,
    ) -> Result<SiblingTable> {
        let mut table = SiblingTable {
            slots: HashMap::new(),
        };

        let parent = schema::data_parent(ctx, first_sibling);
        let module = ctx.snode(first_sibling).module;
        let mut sibling = schema::next_data_node(ctx, None, parent, module);
        while let Some(s) = sibling {
            if !rpc_branch_skipped(ctx, s, mode) {
                table.insert(ctx, s)?;
            }
            sibling = schema::next_data_node(ctx, Some(s), parent, module);
        }

        Ok(table)
    }

    fn insert(&mut self, ctx: &Context, snode: SchemaNodeId) -> Result<()> {
        for i in 0..LYB_HASH_BITS {
            // The hash sequence up to the candidate id must not fully
            // collide with a sibling already inserted with a lower last
            // collision id.
            let mut collides = false;
            for j in (0..i).rev() {
                if self.sequence_collides(ctx, snode, j, i) {
                    collides = true;
                    break;
                }
            }
            if collides {
                continue;
            }

            let hash = schema_hash(ctx, snode, i);
            if hash == 0 {
                log::error!("internal: zero schema node hash");
                return Err(Error::internal("zero schema node hash"));
            }
            match self.slots.get(&hash) {
                None => {
                    self.slots.insert(hash, vec![snode]);
                    return Ok(());
                }
                Some(_) => {
                    // The slot is taken by nodes with the same last
                    // collision id; sharing it is fine as long as the full
                    // sequences differ somewhere.
                    if !self.sequence_collides(ctx, snode, i, i) {
                        self.slots.entry(hash).or_default().push(snode);
                        return Ok(());
                    }
                }
            }
        }

        log::error!(
            "internal: no usable hash for schema node \"{}\"",
            ctx.snode(snode).name
        );
        Err(Error::internal("schema node hash collision ids exhausted"))
    }

    // Whether the hash sequence (h_0..h_depth) of `snode` fully collides
    // with some node inserted with last collision id `col_id`.
    fn sequence_collides(
        &self,
        ctx: &Context,
        snode: SchemaNodeId,
        col_id: u8,
        depth: u8,
    ) -> bool {
        let key = schema_hash(ctx, snode, col_id);
        match self.slots.get(&key) {
            Some(bucket) => bucket.iter().any(|&other| {
                (0..=depth).all(|j| {
                    schema_hash(ctx, snode, j) == schema_hash(ctx, other, j)
                })
            }),
            None => false,
        }
    }

    /// Smallest-collision-id hash that identifies `snode` in the table.
    pub fn find_hash(
        &self,
        ctx: &Context,
        snode: SchemaNodeId,
    ) -> Result<LybHash> {
        for i in 0..LYB_HASH_BITS {
            let hash = schema_hash(ctx, snode, i);
            if hash == 0 {
                log::error!("internal: zero schema node hash");
                return Err(Error::internal("zero schema node hash"));
            }
            if let Some(bucket) = self.slots.get(&hash) {
                if bucket.contains(&snode) {
                    return Ok(hash);
                }
            }
        }
        log::error!(
            "internal: schema node \"{}\" not hashed among its siblings",
            ctx.snode(snode).name
        );
        Err(Error::internal("schema node missing from sibling hash table"))
    }

    /// Resolve a hash byte read from the wire, plus its continuation bytes
    /// `(h_0..h_{k-1})`, back to a schema node.
    pub fn resolve(
        &self,
        ctx: &Context,
        hash: LybHash,
        continuation: &[LybHash],
    ) -> Option<SchemaNodeId> {
        let bucket = self.slots.get(&hash)?;
        bucket
            .iter()
            .copied()
            .find(|&snode| {
                continuation.iter().enumerate().all(|(j, &h)| {
                    schema_hash(ctx, snode, j as u8) == h
                })
            })
    }
}

/// Pack a `YYYY-MM-DD` revision date into 16 bits as `yyyyyyymmmmddddd`
/// (7-bit year offset from 2000, 4-bit month, 5-bit day). An absent
/// revision packs to zero.
pub(crate) fn pack_revision(revision: Option<&str>) -> u16 {
    let rev = match revision {
        Some(rev) => rev,
        None => return 0,
    };
    let year: i32 = rev.get(0..4).and_then(|s| s.parse().ok()).unwrap_or(0);
    let month: u16 = rev.get(5..7).and_then(|s| s.parse().ok()).unwrap_or(0);
    let day: u16 = rev.get(8..10).and_then(|s| s.parse().ok()).unwrap_or(0);

    (((year - 2000) as u16) << 9) | (month << 5) | day
}
