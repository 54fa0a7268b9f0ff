// Copyright (C) 2025 FZI Forschungszentrum Informatik
// SPDX-License-Identifier: Apache-2.0
//! Plain-text encoding of [`Piece`]s
//!
//! Renders one bracketed line per piece, in the trace kit's established
//! shape. The type label collapses categories the kit's text form never
//! distinguished: everything that is not a load, store or plain branch is
//! rendered as `aluOp`.


use std::fmt;

use crate::record::{Category, Operand, Piece};

/// Retrieve the collapsed type label of a piece
fn type_name(piece: &Piece) -> &'static str {
    match piece.category {
        Category::Load => "loadOp",
        Category::Store => "stOp",
        Category::CondBranch => "condBrOp",
        Category::UncondDirectBranch => "uncondDirBrOp",
        Category::UncondIndirectBranch => "uncondIndBrOp",
        _ => "aluOp",
    }
}

/// [`Display`][fmt::Display] adapter rendering a piece as one text line
pub struct Line<'a>(pub &'a Piece);

impl fmt::Display for Line<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let piece = self.0;

        write!(f, "[PC: 0x{:x} type: {}", piece.pc, type_name(piece))?;

        if let Some(mem) = &piece.mem {
            write!(f, " ea: 0x{:x} size: {}", mem.addr, mem.size)?;
        }

        if let Some(branch) = &piece.branch {
            write!(
                f,
                " ( tkn:{} tar: 0x{:x})  ",
                u8::from(branch.taken),
                branch.target
            )?;
        }

        fn operand(f: &mut fmt::Formatter<'_>, op: &Operand) -> fmt::Result {
            write!(
                f,
                "(int: {}, idx: {} val: {:x})  ",
                u8::from(op.bank.is_integer()),
                op.index,
                op.value
            )
        }

        for (label, input) in ["1st", "2nd", "3rd"].iter().zip(&piece.inputs) {
            if let Some(input) = input {
                write!(f, " {label} input:  ")?;
                operand(f, input)?;
            }
        }

        if let Some(output) = &piece.output {
            write!(f, " output:  ")?;
            operand(f, output)?;
        }

        write!(f, " ]")
    }
}

/// Render a piece as one text line
pub fn line(piece: &Piece) -> String {
    Line(piece).to_string()
}
