// Copyright (C) 2025 FZI Forschungszentrum Informatik
// SPDX-License-Identifier: Apache-2.0
//! Assembly-listing encoding of [`Piece`]s
//!
//! Renders each piece as one RISC-V flavoured listing line with the decoded
//! metadata carried in a trailing `//` comment. The listing is not meant to
//! reassemble into the traced program: operand indices beyond the encoding
//! range are capped and effective addresses only appear in the metadata.

#[cfg(test)]
mod tests;

use crate::record::{Category, Operand, Piece};

/// Column the `//` metadata comment is aligned to
const COMMENT_COLUMN: usize = 24;

/// Indentation of every listing line
const INDENT: usize = 4;

/// Listing preamble emitted before the first line
pub const PREAMBLE: &str = ".section .text\n.global _start\n\n_start:\n";

/// Cap a register index at the top of the integer encoding range
fn cap(index: u8) -> u8 {
    index.min(31)
}

/// Destination register name
///
/// Index 64 (the condition code register) maps to `x31`; index 0 maps to
/// `x1` so the listing is not vulnerable to `nop` optimizations.
fn rd_name(index: u8) -> String {
    match index {
        64 => "x31".into(),
        0 => "x1".into(),
        index => format!("x{}", cap(index)),
    }
}

/// Source register name
fn rx_name(index: u8) -> String {
    format!("x{}", cap(index))
}

fn hex_uc(value: u64) -> String {
    format!("{value:X}")
}

fn hex_uc_pref(value: u64) -> String {
    format!("0x{value:X}")
}

fn signed_delta(pc: u64, target: u64) -> i64 {
    target.wrapping_sub(pc) as i64
}

fn mask_bits(value: u64, bits: u32) -> u64 {
    if bits >= 64 {
        value
    } else {
        value & ((1u64 << bits) - 1)
    }
}

fn fits_signed_bits(value: i64, bits: u32) -> bool {
    let min = -(1i64 << (bits - 1));
    let max = (1i64 << (bits - 1)) - 1;
    (min..=max).contains(&value)
}

fn meta_pc(pc: u64) -> String {
    format!("//PC:{}", hex_uc(pc))
}

/// Operand metadata, e.g. `  RD:64 V:6` or `  R1:10 V:deadbeef`
fn reg_meta(tag: &str, operand: &Operand) -> String {
    format!("  {tag}:{} V:{:x}", operand.index, operand.value)
}

/// Inputs of a piece, in slot order
fn inputs(piece: &Piece) -> Vec<&Operand> {
    piece.inputs.iter().flatten().collect()
}

fn taken(piece: &Piece) -> bool {
    piece.branch.as_ref().is_some_and(|b| b.taken)
}

fn target(piece: &Piece) -> u64 {
    piece.branch.as_ref().map(|b| b.target).unwrap_or_default()
}

fn format_alu(piece: &Piece) -> String {
    let inputs = inputs(piece);
    match (&piece.output, inputs.as_slice()) {
        (None, []) => format!("fence.i          {}", meta_pc(piece.pc)),
        (None, [r1]) => format!(
            "add x1,{}        {}{}",
            rx_name(r1.index),
            meta_pc(piece.pc),
            reg_meta("R1", r1)
        ),
        (Some(rd), [r1]) => format!(
            "add {},{}      {}{}{}",
            rd_name(rd.index),
            rx_name(r1.index),
            meta_pc(piece.pc),
            reg_meta("RD", rd),
            reg_meta("R1", r1)
        ),
        (Some(rd), [r1, r2]) => format!(
            "add {},{},{}   {}{}{}{}",
            rd_name(rd.index),
            rx_name(r1.index),
            rx_name(r2.index),
            meta_pc(piece.pc),
            reg_meta("RD", rd),
            reg_meta("R1", r1),
            reg_meta("R2", r2)
        ),
        (Some(rd), [r1, r2, r3]) => format!(
            "fsl {},{},{},{} {}{}{}{}{}",
            rd_name(rd.index),
            rx_name(r1.index),
            rx_name(r2.index),
            rx_name(r3.index),
            meta_pc(piece.pc),
            reg_meta("RD", rd),
            reg_meta("R1", r1),
            reg_meta("R2", r2),
            reg_meta("R3", r3)
        ),
        _ => format!(
            "fence.i          {}  // unhandled aluOp arity",
            meta_pc(piece.pc)
        ),
    }
}

fn format_call_direct(piece: &Piece) -> String {
    let rd = piece
        .output
        .as_ref()
        .map(|o| rd_name(o.index))
        .unwrap_or_else(|| "x1".into());
    let delta = signed_delta(piece.pc, target(piece));
    let fits = fits_signed_bits(delta, 20);
    let off = if fits {
        hex_uc_pref(delta as u64)
    } else {
        "0x0".into()
    };
    let mut line = format!(
        "jal {rd}, {off}     {}  TAR:{} OFF:{} TKN:{}",
        meta_pc(piece.pc),
        hex_uc(target(piece)),
        if fits { hex_uc(delta as u64) } else { "0".into() },
        u8::from(taken(piece))
    );
    if !fits {
        line.push_str(" TOO_LRG_OFF");
    }
    if let Some(rd) = &piece.output {
        line.push_str(&reg_meta("RD", rd));
    }
    line
}

fn format_call_indirect(piece: &Piece) -> String {
    let inputs = inputs(piece);
    let rd = piece
        .output
        .as_ref()
        .map(|o| rd_name(o.index))
        .unwrap_or_else(|| "x1".into());
    let rs = inputs
        .first()
        .map(|r| rx_name(r.index))
        .unwrap_or_else(|| "x0".into());
    let mut line = format!(
        "jalr {rd}, {rs}, 0 {}  TAR:{} OFF:0x0 TKN:{}",
        meta_pc(piece.pc),
        hex_uc(target(piece)),
        u8::from(taken(piece))
    );
    if let Some(rd) = &piece.output {
        line.push_str(&reg_meta("RD", rd));
    }
    if let Some(r1) = inputs.first() {
        line.push_str(&reg_meta("R1", r1));
    }
    line
}

fn format_cond_branch(piece: &Piece) -> String {
    let taken = taken(piece);
    let delta = signed_delta(piece.pc, target(piece));
    let fits = fits_signed_bits(delta, 12);
    let off = if taken {
        if fits {
            hex_uc_pref(delta as u64)
        } else {
            "0x0".into()
        }
    } else {
        "0".into()
    };
    let insn = if taken { "BEQ x0,x0," } else { "BNE x0,x0," };
    let mut line = format!(
        "{insn}{off}  {}  TAR:{} OFF:{} TKN:{}",
        meta_pc(piece.pc),
        hex_uc(target(piece)),
        if taken && fits {
            hex_uc(delta as u64)
        } else {
            "0".into()
        },
        u8::from(taken)
    );
    if let Some(r1) = inputs(piece).first() {
        line.push_str(&reg_meta("R1", r1));
    }
    if taken && !fits {
        line.push_str(" TOO_LRG_OFF");
    }
    line
}

fn format_load(piece: &Piece) -> String {
    let (ea, size) = piece.mem.as_ref().map(|m| (m.addr, m.size)).unwrap_or((0, 0));
    let mnemonic = match size {
        1 => "lbu",
        2 => "lhu",
        4 => "lwu",
        _ => "ld",
    };
    // The listed access is a placeholder; the decoded EA only appears in the
    // metadata.
    let mut line = format!(
        "{mnemonic}  x0, 0(x0) //PC:{}  EA:{} SZ:{size}",
        hex_uc(piece.pc),
        hex_uc(ea)
    );
    if let Some(rd) = &piece.output {
        line.push_str(&reg_meta("RD", rd));
    }
    if let Some(r1) = inputs(piece).first() {
        line.push_str(&reg_meta("R1", r1));
    }
    line
}

fn format_return(piece: &Piece) -> String {
    let inputs = inputs(piece);
    let rs = inputs
        .first()
        .map(|r| rx_name(r.index))
        .unwrap_or_else(|| "x1".into());
    let mut line = format!(
        "jalr x0, {rs}, 0 //PC:{}  TAR:{}",
        hex_uc(piece.pc),
        hex_uc(target(piece))
    );
    if let Some(r1) = inputs.first() {
        line.push_str(&reg_meta("R1", r1));
    }
    line
}

fn format_slow_alu(piece: &Piece) -> String {
    format!("divu x0,x0,x0  //PC:{}", hex_uc(piece.pc))
}

fn format_store(piece: &Piece) -> String {
    let (ea, size) = piece.mem.as_ref().map(|m| (m.addr, m.size)).unwrap_or((0, 0));
    let mnemonic = match size {
        1 => "stb",
        2 => "sth",
        4 => "stw",
        _ => "std",
    };
    let inputs = inputs(piece);
    let rs1 = inputs
        .first()
        .map(|r| rx_name(r.index))
        .unwrap_or_else(|| "x0".into());
    let rs2 = inputs
        .get(1)
        .map(|r| rx_name(r.index))
        .unwrap_or_else(|| "x0".into());
    let mut line = format!(
        "{mnemonic} {rs2},0({rs1}) // PC:{} EA:{} SIZE:{size}",
        hex_uc(piece.pc),
        hex_uc(ea)
    );
    if let Some(r1) = inputs.first() {
        line.push_str(&reg_meta("R1", r1));
    }
    if let Some(r2) = inputs.get(1) {
        line.push_str(&reg_meta("R2", r2));
    }
    line
}

fn format_uncond_direct(piece: &Piece) -> String {
    let delta = signed_delta(piece.pc, target(piece));
    let fits = fits_signed_bits(delta, 20);
    let off = if fits {
        hex_uc_pref(delta as u64)
    } else {
        "0x0".into()
    };
    let mut line = format!(
        "jal x0,{off} //PC:{}  TAR:{} OFF:{} TKN:{}",
        hex_uc(piece.pc),
        hex_uc(target(piece)),
        if fits { hex_uc(delta as u64) } else { "0".into() },
        u8::from(taken(piece))
    );
    if !fits {
        line.push_str(" TOO_LRG_OFF");
    }
    line
}

fn format_uncond_indirect(piece: &Piece) -> String {
    let delta = signed_delta(piece.pc, target(piece));
    let masked = mask_bits(delta as u64, 12);
    let rs = inputs(piece)
        .first()
        .map(|r| rx_name(r.index))
        .unwrap_or_else(|| "x0".into());
    format!(
        "jalr x0,{rs},0x{} //PC:{}  TAR:{} OFF:{} TKN:{}",
        hex_uc(masked),
        hex_uc(piece.pc),
        hex_uc(target(piece)),
        hex_uc(masked),
        u8::from(taken(piece))
    )
}

/// Format a piece's raw listing line, metadata unaligned
fn format_line(piece: &Piece) -> String {
    match piece.category {
        Category::Alu => format_alu(piece),
        Category::CallDirect => format_call_direct(piece),
        Category::CallIndirect => format_call_indirect(piece),
        Category::CondBranch => format_cond_branch(piece),
        Category::Fp => format!("//PC:{}  // fpOp (no mapping yet)", hex_uc(piece.pc)),
        Category::Load => format_load(piece),
        Category::Return => format_return(piece),
        Category::SlowAlu => format_slow_alu(piece),
        Category::Store => format_store(piece),
        Category::UncondDirectBranch => format_uncond_direct(piece),
        Category::UncondIndirectBranch => format_uncond_indirect(piece),
        Category::Undefined => format!("//PC:{}  // UNKNOWN op", hex_uc(piece.pc)),
    }
}

/// Indent a raw line and align its `//` metadata comment
fn align(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len() + INDENT);
    for _ in 0..INDENT {
        out.push(' ');
    }

    let Some(pos) = raw.find("//") else {
        out.push_str(raw);
        return out;
    };

    let left = raw[..pos].trim_end();
    let comment = &raw[pos..];
    out.push_str(left);

    let pad = COMMENT_COLUMN.saturating_sub(INDENT + left.len()).max(1);
    for _ in 0..pad {
        out.push(' ');
    }
    out.push_str(comment);
    out
}

/// Render a piece as one aligned listing line
pub fn line(piece: &Piece) -> String {
    align(&format_line(piece))
}

/// Render a whole listing from an iterator of pieces
///
/// Convenience used by tests; the conversion drivers stream line by line.
pub fn listing<'a>(pieces: impl IntoIterator<Item = &'a Piece>) -> String {
    let mut out = String::from(PREAMBLE);
    for piece in pieces {
        out.push_str(&line(piece));
        out.push('\n');
    }
    out
}
