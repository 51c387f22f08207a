//
// Copyright (c) The lyb Core Contributors
//
// SPDX-License-Identifier: MIT
//

//! Generic output sink for the binary printer.
//!
//! The printer needs three operations: append bytes, reserve a slot of
//! known size whose content is not known yet, and patch a reserved slot
//! once it is. A memory sink supports patching directly. Writer and
//! callback sinks are not seekable, so everything from the first
//! outstanding reserved slot onwards is staged in an internal buffer and
//! flushed once the last outstanding slot has been patched.

use std::io::Write;

use crate::error::{Error, Result};

pub(crate) struct Out<'a> {
    target: OutTarget<'a>,
    // Total bytes accepted so far; doubles as the absolute offset of the
    // next byte.
    printed: usize,
    hold: Vec<u8>,
    hold_start: usize,
    holes: usize,
}

enum OutTarget<'a> {
    Memory(Vec<u8>),
    Writer(&'a mut dyn Write),
    Callback(&'a mut dyn FnMut(&[u8]) -> std::io::Result<usize>),
}

impl<'a> Out<'a> {
    pub fn new_memory() -> Out<'static> {
        Out::new(OutTarget::Memory(Vec::new()))
    }

    pub fn new_writer(writer: &'a mut dyn Write) -> Out<'a> {
        Out::new(OutTarget::Writer(writer))
    }

    pub fn new_callback(
        clb: &'a mut dyn FnMut(&[u8]) -> std::io::Result<usize>,
    ) -> Out<'a> {
        Out::new(OutTarget::Callback(clb))
    }

    fn new(target: OutTarget<'_>) -> Out<'_> {
        Out {
            target,
            printed: 0,
            hold: Vec::new(),
            hold_start: 0,
            holes: 0,
        }
    }

    /// Append bytes to the stream.
    pub fn write(&mut self, bytes: &[u8]) -> Result<()> {
        self.printed += bytes.len();
        if let OutTarget::Memory(buf) = &mut self.target {
            buf.extend_from_slice(bytes);
            return Ok(());
        }
        if self.holes > 0 {
            self.hold.extend_from_slice(bytes);
            return Ok(());
        }
        self.write_through(bytes)
    }

    /// Append `count` bytes of yet-unknown content, returning the absolute
    /// offset of the reserved slot.
    pub fn reserve(&mut self, count: usize) -> Result<usize> {
        let position = self.printed;
        self.printed += count;
        match &mut self.target {
            OutTarget::Memory(buf) => {
                let len = buf.len();
                buf.resize(len + count, 0);
            }
            _ => {
                if self.holes == 0 {
                    self.hold_start = position;
                }
                let len = self.hold.len();
                self.hold.resize(len + count, 0);
                self.holes += 1;
            }
        }
        Ok(position)
    }

    /// Overwrite a previously reserved slot.
    pub fn patch(&mut self, position: usize, bytes: &[u8]) -> Result<()> {
        match &mut self.target {
            OutTarget::Memory(buf) => {
                let slot = buf
                    .get_mut(position..position + bytes.len())
                    .ok_or_else(|| {
                        Error::internal("patch outside the written stream")
                    })?;
                slot.copy_from_slice(bytes);
                Ok(())
            }
            _ => {
                if self.holes == 0 || position < self.hold_start {
                    return Err(Error::internal(
                        "patch outside the staging buffer",
                    ));
                }
                let start = position - self.hold_start;
                let slot = self
                    .hold
                    .get_mut(start..start + bytes.len())
                    .ok_or_else(|| {
                        Error::internal("patch outside the staging buffer")
                    })?;
                slot.copy_from_slice(bytes);
                self.holes -= 1;
                if self.holes == 0 {
                    let hold = std::mem::take(&mut self.hold);
                    self.write_through(&hold)?;
                }
                Ok(())
            }
        }
    }

    /// Consume a memory sink, returning the written stream.
    pub fn into_memory(self) -> Vec<u8> {
        match self.target {
            OutTarget::Memory(buf) => buf,
            _ => unreachable!("not a memory sink"),
        }
    }

    fn write_through(&mut self, bytes: &[u8]) -> Result<()> {
        match &mut self.target {
            OutTarget::Memory(buf) => {
                buf.extend_from_slice(bytes);
                Ok(())
            }
            OutTarget::Writer(writer) => {
                writer.write_all(bytes).map_err(Error::from)
            }
            OutTarget::Callback(clb) => {
                let mut rest = bytes;
                while !rest.is_empty() {
                    let n = clb(rest).map_err(Error::from)?;
                    if n == 0 || n > rest.len() {
                        return Err(Error::from(std::io::Error::new(
                            std::io::ErrorKind::WriteZero,
                            "short write",
                        )));
                    }
                    rest = &rest[n..];
                }
                Ok(())
            }
        }
    }
}
