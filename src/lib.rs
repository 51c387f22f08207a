//
// Copyright (c) The lyb Core Contributors
//
// SPDX-License-Identifier: MIT
//

//! Native Rust implementation of the LYB binary format for YANG-modeled
//! data trees.
//!
//! LYB is the compact, streamable binary alternative to XML/JSON
//! serialization of YANG instance data, as introduced by [libyang]. The
//! encoding is not self-describing: writer and reader must share the same
//! schema context, which is what keeps the format small — a schema node is
//! usually identified by a single hash byte among its siblings.
//!
//! [libyang]: https://github.com/CESNET/libyang
//!
//! ## Design Goals
//! * Bit-exact, deterministic serialization driven by the schema context
//! * Strictly forward-writable streams: subtree sizes are bounded by
//!   chunking, never by buffering whole subtrees
//! * Leverage Rust's ownership system to detect API misuse problems at
//!   compile time
//! * Automatic resource management
//!
//! ## Example
//!
//! ```
//! use lyb::context::Context;
//! use lyb::data::{Data, DataParserFlags, DataPrinterFlags, DataTree};
//! use lyb::schema::{DataValueType, LeafType};
//!
//! let mut ctx = Context::new();
//! let module = ctx.new_module("example", None, "urn:example").unwrap();
//! let cont = ctx.new_container(module, None, "state").unwrap();
//! ctx.new_leaf(
//!     module,
//!     Some(cont),
//!     "counter",
//!     LeafType::new(DataValueType::Uint32),
//! )
//! .unwrap();
//!
//! let mut dtree = DataTree::new(&ctx);
//! dtree.new_path("/example:state/counter", Some("42")).unwrap();
//!
//! let bytes = dtree.print_bytes(DataPrinterFlags::empty()).unwrap();
//! let dtree2 =
//!     DataTree::parse_lyb(&ctx, &bytes, DataParserFlags::empty()).unwrap();
//! assert_eq!(
//!     dtree2.find_path("/example:state/counter").unwrap().value_canonical(),
//!     Some("42"),
//! );
//! ```

mod error;
mod lyb;
mod parser_lyb;
mod printer;
mod printer_lyb;

pub mod context;
pub mod data;
pub mod iter;
pub mod schema;

pub use crate::error::{Error, ErrorCode, Result};
pub use crate::parser_lyb::lyb_data_length;
