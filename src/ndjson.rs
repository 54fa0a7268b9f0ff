// Copyright (C) 2025 FZI Forschungszentrum Informatik
// SPDX-License-Identifier: Apache-2.0
//! NDJSON encoding and decoding of [`Piece`]s
//!
//! One JSON object per line, with hex-string values and a fixed key order:
//! `pc`, `type`, the memory fields for load/store pieces, the branch fields
//! for branch pieces and the populated operand slots `A` to `D`.
//!
//! The wire format does not carry piece boundaries; pieces read back through
//! the [`Reader`] have `is_last_piece` cleared.


use std::io::{self, BufRead, Read};

use serde::{Deserialize, Serialize};

use crate::record::{Bank, Branch, Category, MemAccess, Operand, Piece};

/// 64 bit value carried as a `0x`-prefixed, zero-padded hex string
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
struct Hex64(u64);

impl Serialize for Hex64 {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("0x{:016x}", self.0))
    }
}

impl<'de> Deserialize<'de> for Hex64 {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        use serde::de::Error;

        let raw = String::deserialize(deserializer)?;
        let digits = raw
            .strip_prefix("0x")
            .or_else(|| raw.strip_prefix("0X"))
            .unwrap_or(&raw);
        u64::from_str_radix(digits, 16)
            .map(Hex64)
            .map_err(D::Error::custom)
    }
}

#[derive(Serialize, Deserialize)]
struct WireOperand {
    /// 1 for the integer bank, 2 for the extended bank
    bank: u8,
    idx: u8,
    val: Hex64,
}

/// One NDJSON line, in emission key order
#[derive(Serialize, Deserialize)]
struct Wire {
    pc: Hex64,
    #[serde(rename = "type")]
    kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    ea: Option<Hex64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    taken: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    target: Option<Hex64>,
    #[serde(rename = "A", skip_serializing_if = "Option::is_none")]
    a: Option<WireOperand>,
    #[serde(rename = "B", skip_serializing_if = "Option::is_none")]
    b: Option<WireOperand>,
    #[serde(rename = "C", skip_serializing_if = "Option::is_none")]
    c: Option<WireOperand>,
    #[serde(rename = "D", skip_serializing_if = "Option::is_none")]
    d: Option<WireOperand>,
}

impl From<&Piece> for Wire {
    fn from(piece: &Piece) -> Self {
        let operand = |op: &Option<Operand>| {
            op.as_ref().map(|op| WireOperand {
                bank: if op.bank.is_integer() { 1 } else { 2 },
                idx: op.index,
                val: Hex64(op.value),
            })
        };
        Self {
            pc: Hex64(piece.pc),
            kind: piece.category.name().into(),
            ea: piece.mem.as_ref().map(|m| Hex64(m.addr)),
            size: piece.mem.as_ref().map(|m| m.size),
            taken: piece.branch.as_ref().map(|b| b.taken),
            target: piece.branch.as_ref().map(|b| Hex64(b.target)),
            a: operand(&piece.inputs[0]),
            b: operand(&piece.inputs[1]),
            c: operand(&piece.inputs[2]),
            d: operand(&piece.output),
        }
    }
}

impl Wire {
    fn into_piece(self) -> Option<Piece> {
        let category = Category::from_name(&self.kind)?;
        let branch = category.is_branch().then(|| Branch {
            taken: self.taken.unwrap_or(false),
            target: self.target.map(|t| t.0).unwrap_or_default(),
        });
        let mem = category.is_mem().then(|| MemAccess {
            addr: self.ea.map(|a| a.0).unwrap_or_default(),
            size: self.size.unwrap_or_default(),
        });
        let operand = |wire: Option<WireOperand>| {
            wire.map(|wire| Operand {
                bank: if wire.bank == 1 {
                    Bank::Integer
                } else {
                    Bank::Extended
                },
                index: wire.idx,
                value: wire.val.0,
            })
        };
        Some(Piece {
            category,
            pc: self.pc.0,
            branch,
            mem,
            inputs: [operand(self.a), operand(self.b), operand(self.c)],
            output: operand(self.d),
            is_last_piece: false,
        })
    }
}

/// Render a piece as one NDJSON line, without the trailing newline
pub fn line(piece: &Piece) -> serde_json::Result<String> {
    serde_json::to_string(&Wire::from(piece))
}

/// Parse one NDJSON line back into a [`Piece`]
///
/// Returns `None` for lines that are not valid NDJSON records, including
/// records with an unknown category name.
pub fn parse_line(line: &str) -> Option<Piece> {
    serde_json::from_str::<Wire>(line).ok()?.into_piece()
}

/// A reader decoding NDJSON lines from a byte stream
///
/// Unparseable lines are skipped; I/O errors of the underlying stream are
/// passed through.
pub struct Reader<R> {
    lines: io::Lines<io::BufReader<R>>,
}

impl<R: Read> Reader<R> {
    /// Create a reader over the given byte stream
    pub fn new(source: R) -> Self {
        Self {
            lines: io::BufReader::new(source).lines(),
        }
    }
}

impl<R: Read> Iterator for Reader<R> {
    type Item = io::Result<Piece>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.lines.next()? {
                Ok(line) => {
                    if let Some(piece) = parse_line(&line) {
                        return Some(Ok(piece));
                    }
                }
                Err(err) => return Some(Err(err)),
            }
        }
    }
}
