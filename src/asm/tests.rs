// Copyright (C) 2025 FZI Forschungszentrum Informatik
// SPDX-License-Identifier: Apache-2.0
//! Assembly encoder tests

use super::*;

use crate::record::{Branch, MemAccess, Piece};

fn piece(category: Category) -> Piece {
    Piece {
        category,
        pc: 0x1000,
        branch: None,
        mem: None,
        inputs: [None, None, None],
        output: None,
        is_last_piece: true,
    }
}

#[test]
fn alu_two_inputs_with_destination() {
    let piece = Piece {
        inputs: [Some(Operand::input(5)), Some(Operand::input(6)), None],
        output: Some(Operand::output(7, 0x2a)),
        ..piece(Category::Alu)
    };
    assert_eq!(
        line(&piece),
        "    add x7,x5,x6        //PC:1000  RD:7 V:2a  R1:5 V:deadbeef  R2:6 V:deadbeef",
    );
}

#[test]
fn alu_without_operands() {
    assert_eq!(
        line(&piece(Category::Alu)),
        "    fence.i             //PC:1000"
    );
}

#[test]
fn destination_naming_rules() {
    // RD 64 maps to x31, RD 0 maps to x1, inputs are capped at x31
    let rd64 = Piece {
        inputs: [Some(Operand::input(70)), None, None],
        output: Some(Operand::output(64, 0x6)),
        ..piece(Category::Alu)
    };
    let rendered = line(&rd64);
    assert!(rendered.contains("add x31,x31"), "{rendered}");
    assert!(rendered.contains("  RD:64 V:6"), "{rendered}");
    assert!(rendered.contains("  R1:70 V:deadbeef"), "{rendered}");

    let rd0 = Piece {
        inputs: [Some(Operand::input(2)), None, None],
        output: Some(Operand::output(0, 0x1)),
        ..piece(Category::Alu)
    };
    assert!(line(&rd0).contains("add x1,x2"));
}

#[test]
fn load_line() {
    let piece = Piece {
        mem: Some(MemAccess {
            addr: 0x6000,
            size: 8,
        }),
        inputs: [Some(Operand::input(3)), None, None],
        output: Some(Operand::output(7, 0x42)),
        ..piece(Category::Load)
    };
    assert_eq!(
        line(&piece),
        "    ld  x0, 0(x0)       //PC:1000  EA:6000 SZ:8  RD:7 V:42  R1:3 V:deadbeef",
    );
}

#[test]
fn store_line() {
    let piece = Piece {
        mem: Some(MemAccess {
            addr: 0x5000,
            size: 4,
        }),
        inputs: [Some(Operand::input(5)), Some(Operand::input(9)), None],
        ..piece(Category::Store)
    };
    assert_eq!(
        line(&piece),
        "    stw x9,0(x5)        // PC:1000 EA:5000 SIZE:4  R1:5 V:deadbeef  R2:9 V:deadbeef",
    );
}

#[test]
fn taken_conditional_branch() {
    let piece = Piece {
        branch: Some(Branch {
            taken: true,
            target: 0x1400,
        }),
        inputs: [Some(Operand::input(4)), None, None],
        ..piece(Category::CondBranch)
    };
    assert_eq!(
        line(&piece),
        "    BEQ x0,x0,0x400     //PC:1000  TAR:1400 OFF:400 TKN:1  R1:4 V:deadbeef",
    );
}

#[test]
fn not_taken_conditional_branch() {
    let piece = Piece {
        branch: Some(Branch {
            taken: false,
            target: 0x1004,
        }),
        ..piece(Category::CondBranch)
    };
    assert_eq!(
        line(&piece),
        "    BNE x0,x0,0         //PC:1000  TAR:1004 OFF:0 TKN:0",
    );
}

#[test]
fn oversized_branch_offset_is_marked() {
    let piece = Piece {
        branch: Some(Branch {
            taken: true,
            target: 0x800000,
        }),
        ..piece(Category::CondBranch)
    };
    let rendered = line(&piece);
    assert!(rendered.contains("BEQ x0,x0,0x0"), "{rendered}");
    assert!(rendered.ends_with("TOO_LRG_OFF"), "{rendered}");
}

#[test]
fn direct_call() {
    let piece = Piece {
        branch: Some(Branch {
            taken: true,
            target: 0x1400,
        }),
        output: Some(Operand::output(1, 0x1004)),
        ..piece(Category::CallDirect)
    };
    assert_eq!(
        line(&piece),
        "    jal x1, 0x400       //PC:1000  TAR:1400 OFF:400 TKN:1  RD:1 V:1004",
    );
}

#[test]
fn indirect_jump_masks_offset() {
    let piece = Piece {
        branch: Some(Branch {
            taken: true,
            target: 0x0f7c,
        }),
        inputs: [Some(Operand::input(6)), None, None],
        ..piece(Category::UncondIndirectBranch)
    };
    // delta -0x84, masked to 12 bits
    assert_eq!(
        line(&piece),
        "    jalr x0,x6,0xF7C    //PC:1000  TAR:F7C OFF:F7C TKN:1",
    );
}

#[test]
fn return_line() {
    let piece = Piece {
        branch: Some(Branch {
            taken: true,
            target: 0x1234,
        }),
        inputs: [Some(Operand::input(1)), None, None],
        ..piece(Category::Return)
    };
    assert_eq!(
        line(&piece),
        "    jalr x0, x1, 0      //PC:1000  TAR:1234  R1:1 V:deadbeef",
    );
}

#[test]
fn listing_carries_preamble() {
    let pieces = [piece(Category::SlowAlu)];
    let listing = listing(&pieces);
    assert!(listing.starts_with(".section .text\n.global _start\n\n_start:\n"));
    assert!(listing.ends_with("    divu x0,x0,x0       //PC:1000\n"));
}
