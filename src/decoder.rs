// Copyright (C) 2025 FZI Forschungszentrum Informatik
// SPDX-License-Identifier: Apache-2.0
//! Trace decoder
//!
//! This module provides the [`Decoder`], which reads macro-instruction
//! records from a byte stream and cracks each of them into one or more
//! normalized [`Piece`]s.
//!
//! A macro-instruction packs all architectural effects of one instruction:
//! every output register (and every 64 bit half of a wide vector/FP output),
//! every memory word of a wide load or store and the implicit base-register
//! update of post-increment addressing. Cracking unpacks those effects into
//! individual pieces, each with at most one output, emitted in a fixed
//! order with the synthetic base-update piece always last.
//!
//! # Example
//!
//! ```no_run
//! use cbp_trace::decoder::Decoder;
//! use cbp_trace::source::Source;
//!
//! let source = Source::open("trace.cbp.xz")?;
//! for piece in Decoder::new(source) {
//!     let piece = piece?;
//!     println!("{:0x}", piece.pc);
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod error;
mod raw;

#[cfg(test)]
mod tests;

pub use error::Error;

use std::io::{self, Read};

use crate::record::{Bank, Branch, Category, MemAccess, Operand, Piece};

/// Emit a progress diagnostic every this many records
const PROGRESS_INTERVAL: u64 = 5_000_000;

/// A decoder for macro-instruction trace streams
///
/// The decoder owns its byte source exclusively and reads it strictly
/// forward, one record at a time; the resulting sequence of [`Piece`]s is
/// lazy, finite and not restartable. [`next_piece`][Self::next_piece]
/// returns `Ok(None)` exactly when the source is exhausted at a record
/// boundary. A stream that ends mid-record, and any malformed record, is a
/// fatal [`Error`]; the [`Iterator`] implementation yields it once and is
/// fused afterwards.
pub struct Decoder<R> {
    source: R,
    raw: raw::Macro,
    /// Records fully read so far; index of the in-flight record while reading
    records: u64,
    total_pieces: u16,
    mem_pieces: u16,
    emitted: u16,
    /// Output register list cursor
    reg_cursor: usize,
    /// Output value list cursor
    ///
    /// Kept separately from the register cursor: an extended-bank register
    /// consumes two consecutive values across two pieces before the register
    /// cursor moves on.
    val_cursor: usize,
    /// Run length of consecutively emitted extended-bank outputs
    ext_run: u8,
    size_factor: u64,
    poisoned: bool,
}

impl<R: Read> Decoder<R> {
    /// Create a decoder reading from the given source
    pub fn new(source: R) -> Self {
        Self {
            source,
            raw: raw::Macro::new(),
            records: 0,
            total_pieces: 0,
            mem_pieces: 0,
            emitted: 0,
            reg_cursor: 0,
            val_cursor: 0,
            ext_run: 0,
            size_factor: 0,
            poisoned: false,
        }
    }

    /// Retrieve the number of records fully read so far
    pub fn records(&self) -> u64 {
        self.records
    }

    /// Decode the next piece
    ///
    /// Returns `Ok(None)` on a clean end of stream. Any error is fatal for
    /// the remainder of the stream; pieces decoded earlier remain valid.
    pub fn next_piece(&mut self) -> Result<Option<Piece>, Error> {
        if self.emitted < self.total_pieces {
            return Ok(Some(self.emit()));
        }
        if self.read_record()? {
            Ok(Some(self.emit()))
        } else {
            Ok(None)
        }
    }

    /// Read one macro-instruction record into the reusable buffer
    ///
    /// Returns `false` on a clean end of stream.
    fn read_record(&mut self) -> Result<bool, Error> {
        self.raw.reset();
        self.total_pieces = 0;
        self.mem_pieces = 0;
        self.emitted = 0;
        self.reg_cursor = 0;
        self.val_cursor = 0;
        self.ext_run = 0;
        self.size_factor = 1;

        let record = self.records;

        let Some(pc) = self.read_leading_u64()? else {
            return Ok(false);
        };
        self.raw.pc = pc;
        self.raw.next_pc = pc.wrapping_add(4);

        let tag = self.read_u8()?;
        let category =
            Category::try_from(tag).map_err(|tag| Error::UnknownCategory { record, tag })?;
        self.raw.category = category;

        if category.is_mem() {
            self.raw.eff_addr = self.read_u64()?;
            self.raw.mem_size = self.read_u8()?;
            self.raw.base_update = self.read_u8()? != 0;
            if category == Category::Store {
                self.raw.has_reg_offset = self.read_u8()? != 0;
            }
        }

        if category.is_branch() {
            self.raw.taken = self.read_u8()? != 0;
            if !category.is_cond_branch() && !self.raw.taken {
                return Err(Error::NotTakenBranch { record, category });
            }
            if self.raw.taken {
                self.raw.next_pc = self.read_u64()?;
            }
        }

        let num_inputs = self.read_u8()?;
        for _ in 0..num_inputs {
            let reg = self.read_u8()?;
            self.raw.in_regs.push(reg);
        }

        let num_outputs = self.read_u8()?;
        for _ in 0..num_outputs {
            let reg = self.read_u8()?;
            self.raw.out_regs.push(reg);
        }

        self.total_pieces = if num_outputs > 0 {
            num_outputs.into()
        } else {
            1
        };

        self.raw.detect_base_update();

        // One value per output register, a second one for every extended
        // register's high half. The base-update register's value is stashed
        // and moved to the very end so its synthetic piece is emitted last.
        let mut base_pos = None;
        let mut base_value = u64::MAX;
        for i in 0..self.raw.out_regs.len() {
            let reg = self.raw.out_regs[i];
            let value = self.read_u64()?;
            if self.raw.base_update_reg == Some(reg) {
                base_pos = Some(i);
                base_value = value;
            } else {
                self.raw.out_values.push(value);
                if !Bank::of(reg).is_integer() {
                    let hi = self.read_u64()?;
                    self.raw.out_values.push(hi);
                    if hi != 0 {
                        self.total_pieces += 1;
                    }
                }
            }
        }

        if let Some(base) = self.raw.base_update_reg {
            if self.raw.out_regs.len() > 1 {
                if let Some(pos) = base_pos {
                    self.raw.out_regs.remove(pos);
                    self.raw.out_regs.push(base);
                }
            }
            self.raw.out_values.push(base_value);
        }

        let base_piece = u16::from(self.raw.base_update_reg.is_some());
        match category {
            Category::Store => {
                let value_regs =
                    self.raw.in_regs.len() as i64 - 1 - i64::from(self.raw.has_reg_offset);
                let true_values = if value_regs > 0 { value_regs as u64 } else { 1 };
                if u64::from(self.raw.mem_size) % true_values != 0 {
                    return Err(Error::IndivisibleStore {
                        record,
                        mem_size: self.raw.mem_size,
                        value_regs: true_values as u8,
                    });
                }
                self.mem_pieces = true_values as u16;
                self.total_pieces = self.mem_pieces + base_piece;
                self.size_factor = u64::from(self.raw.mem_size) / u64::from(self.mem_pieces);
            }
            Category::Load => {
                self.mem_pieces = self.total_pieces - base_piece;
                if self.mem_pieces == 0 {
                    return Err(Error::EmptyLoad { record });
                }
                self.size_factor = u64::from(self.raw.mem_size) / u64::from(self.mem_pieces);
            }
            _ => {
                self.mem_pieces = 0;
                self.size_factor = 0;
            }
        }

        self.records += 1;
        if self.records % PROGRESS_INTERVAL == 0 {
            tracing::info!("{} records decoded", self.records);
        }
        Ok(true)
    }

    /// Emit the next piece of the current record
    fn emit(&mut self) -> Piece {
        let m = &self.raw;

        // The synthetic base-update pseudo-op is the single trailing piece
        // after all memory pieces of a post-increment load/store.
        let synthetic = m.category.is_mem()
            && self.emitted >= 1
            && self.mem_pieces == self.emitted
            && self.mem_pieces + 1 == self.total_pieces;

        let category = if synthetic { Category::Alu } else { m.category };
        let branch = category.is_branch().then(|| Branch {
            taken: m.taken,
            target: m.next_pc,
        });

        let mut inputs = [None; 3];
        if synthetic {
            if let Some(base) = m.base_update_reg {
                inputs[0] = Some(Operand::input(base));
            }
        } else if m.category == Category::Store {
            // A: address base, B: register offset if present, last slot: the
            // value register belonging to this piece, if the store has one.
            if let Some(&base) = m.in_regs.first() {
                inputs[0] = Some(Operand::input(base));
            }
            let val_off = 1 + usize::from(m.has_reg_offset) + usize::from(self.emitted);
            if m.has_reg_offset {
                if let Some(&offset) = m.in_regs.get(1) {
                    inputs[1] = Some(Operand::input(offset));
                }
                if let Some(&data) = m.in_regs.get(val_off) {
                    inputs[2] = Some(Operand::input(data));
                }
            } else if let Some(&data) = m.in_regs.get(val_off) {
                inputs[1] = Some(Operand::input(data));
            }
        } else {
            for (slot, &reg) in inputs.iter_mut().zip(&m.in_regs) {
                *slot = Some(Operand::input(reg));
            }
        }

        let output = if synthetic {
            m.base_update_reg
                .zip(m.out_values.last())
                .map(|(base, &value)| Operand::output(base, value))
        } else if m.category != Category::Store && !m.out_regs.is_empty() {
            let slot = m
                .out_regs
                .get(self.reg_cursor)
                .zip(m.out_values.get(self.val_cursor))
                .map(|(&reg, &value)| Operand::output(reg, value));
            match &slot {
                Some(op) if !op.bank.is_integer() => self.ext_run += 1,
                _ => self.ext_run = 0,
            }
            slot
        } else {
            self.ext_run = 0;
            None
        };

        let mem = (!synthetic && m.category.is_mem()).then(|| MemAccess {
            addr: m
                .eff_addr
                .wrapping_add(u64::from(self.emitted) * self.size_factor),
            size: self.size_factor.max(1),
        });

        self.emitted += 1;
        let is_last_piece = self.emitted == self.total_pieces;

        // Advance the cursors. An extended-bank register at the cursor keeps
        // the register cursor in place until an even run length pairs its
        // low and high half across two consecutive pieces.
        let extended_at_cursor = m
            .out_regs
            .get(self.reg_cursor)
            .is_some_and(|&reg| !Bank::of(reg).is_integer());
        self.val_cursor += 1;
        if !extended_at_cursor || self.ext_run % 2 == 0 {
            self.reg_cursor += 1;
        }

        Piece {
            category,
            pc: m.pc,
            branch,
            mem,
            inputs,
            output,
            is_last_piece,
        }
    }

    /// Read the first field of a record, allowing a clean end of stream
    fn read_leading_u64(&mut self) -> Result<Option<u64>, Error> {
        let mut buf = [0u8; 8];
        match self.fill(&mut buf)? {
            0 => Ok(None),
            8 => Ok(Some(u64::from_le_bytes(buf))),
            _ => Err(Error::Truncated {
                record: self.records,
            }),
        }
    }

    fn read_u64(&mut self) -> Result<u64, Error> {
        let mut buf = [0u8; 8];
        if self.fill(&mut buf)? != 8 {
            return Err(Error::Truncated {
                record: self.records,
            });
        }
        Ok(u64::from_le_bytes(buf))
    }

    fn read_u8(&mut self) -> Result<u8, Error> {
        let mut buf = [0u8; 1];
        if self.fill(&mut buf)? != 1 {
            return Err(Error::Truncated {
                record: self.records,
            });
        }
        Ok(buf[0])
    }

    /// Fill `buf`, stopping short only at end of stream
    fn fill(&mut self, buf: &mut [u8]) -> Result<usize, Error> {
        let mut copied = 0;
        while copied < buf.len() {
            match self.source.read(&mut buf[copied..]) {
                Ok(0) => break,
                Ok(n) => copied += n,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => {
                    return Err(Error::Io {
                        record: self.records,
                        source: err,
                    });
                }
            }
        }
        Ok(copied)
    }
}

impl<R: Read> Iterator for Decoder<R> {
    type Item = Result<Piece, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.poisoned {
            return None;
        }
        match self.next_piece() {
            Ok(piece) => piece.map(Ok),
            Err(err) => {
                self.poisoned = true;
                Some(Err(err))
            }
        }
    }
}
