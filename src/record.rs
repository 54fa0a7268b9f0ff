// Copyright (C) 2025 FZI Forschungszentrum Informatik
// SPDX-License-Identifier: Apache-2.0
//! Normalized instruction records
//!
//! This module defines the data model shared between the [decoder][crate::decoder]
//! and the output encoders: the [`Piece`] a macro-instruction is cracked into,
//! its [`Operand`] slots and the [`Bank`]/[`Category`] classifications used
//! throughout the crate.

use std::fmt;


/// First register index belonging to the vector/FP register file
pub const EXTENDED_BASE: u8 = 32;

/// Register index of the condition code register
pub const CC_INDEX: u8 = 64;

/// Register index of the architectural zero register
pub const ZERO_INDEX: u8 = 65;

/// Placeholder for operand values the trace format does not record
///
/// The trace only carries values for output registers. Input operand slots are
/// still populated with their register identity, but their `value` field is
/// always this marker. Consumers must not interpret it as decoded data.
pub const UNKNOWN_VALUE: u64 = 0xdead_beef;

/// Register bank an operand lives in
///
/// The trace encodes register operands as a flat 8 bit index space. Indices
/// `0..32` are the integer register file, `32..64` the vector/FP file and the
/// two special indices [`CC_INDEX`] and [`ZERO_INDEX`] are classified as
/// integer as well. [`Extended`][Self::Extended] registers are the ones whose
/// output values may span two 64 bit halves.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Bank {
    Integer,
    Extended,
}

impl Bank {
    /// Classify a raw register index
    pub fn of(index: u8) -> Self {
        if index < EXTENDED_BASE || index == CC_INDEX || index == ZERO_INDEX {
            Self::Integer
        } else {
            Self::Extended
        }
    }

    /// Whether this is the integer bank
    pub fn is_integer(self) -> bool {
        self == Self::Integer
    }
}

/// Operation category of a macro-instruction or piece
///
/// The discriminants are the tag values used in the binary trace format.
#[repr(u8)]
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Category {
    Alu = 0,
    Load = 1,
    Store = 2,
    CondBranch = 3,
    UncondDirectBranch = 4,
    UncondIndirectBranch = 5,
    Fp = 6,
    SlowAlu = 7,
    Undefined = 8,
    CallDirect = 9,
    CallIndirect = 10,
    Return = 11,
}

impl Category {
    /// Whether this category accesses memory
    pub fn is_mem(self) -> bool {
        matches!(self, Self::Load | Self::Store)
    }

    /// Whether this category alters control flow
    ///
    /// Calls and returns count as branches, both for the `taken`/target fields
    /// in the trace format and for the output encoders.
    pub fn is_branch(self) -> bool {
        matches!(
            self,
            Self::CondBranch
                | Self::UncondDirectBranch
                | Self::UncondIndirectBranch
                | Self::CallDirect
                | Self::CallIndirect
                | Self::Return
        )
    }

    /// Whether this category is a conditional branch
    pub fn is_cond_branch(self) -> bool {
        self == Self::CondBranch
    }

    /// Retrieve the category's wire name
    ///
    /// These are the names used by the NDJSON encoding.
    pub fn name(self) -> &'static str {
        match self {
            Self::Alu => "aluOp",
            Self::Load => "loadOp",
            Self::Store => "stOp",
            Self::CondBranch => "condBrOp",
            Self::UncondDirectBranch => "uncondDirBrOp",
            Self::UncondIndirectBranch => "uncondIndBrOp",
            Self::Fp => "fpOp",
            Self::SlowAlu => "slowAluOp",
            Self::Undefined => "undefOp",
            Self::CallDirect => "callDirBrOp",
            Self::CallIndirect => "callIndBrOp",
            Self::Return => "retBrOp",
        }
    }

    /// Look a category up by its wire name
    ///
    /// Accepts the names produced by [`name`][Self::name] as well as the
    /// `storeOp` alias found in older NDJSON dumps.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "aluOp" => Some(Self::Alu),
            "loadOp" => Some(Self::Load),
            "stOp" | "storeOp" => Some(Self::Store),
            "condBrOp" => Some(Self::CondBranch),
            "uncondDirBrOp" => Some(Self::UncondDirectBranch),
            "uncondIndBrOp" => Some(Self::UncondIndirectBranch),
            "fpOp" => Some(Self::Fp),
            "slowAluOp" => Some(Self::SlowAlu),
            "undefOp" => Some(Self::Undefined),
            "callDirBrOp" => Some(Self::CallDirect),
            "callIndBrOp" => Some(Self::CallIndirect),
            "retBrOp" => Some(Self::Return),
            _ => None,
        }
    }
}

impl TryFrom<u8> for Category {
    type Error = u8;

    fn try_from(tag: u8) -> Result<Self, Self::Error> {
        match tag {
            0 => Ok(Self::Alu),
            1 => Ok(Self::Load),
            2 => Ok(Self::Store),
            3 => Ok(Self::CondBranch),
            4 => Ok(Self::UncondDirectBranch),
            5 => Ok(Self::UncondIndirectBranch),
            6 => Ok(Self::Fp),
            7 => Ok(Self::SlowAlu),
            8 => Ok(Self::Undefined),
            9 => Ok(Self::CallDirect),
            10 => Ok(Self::CallIndirect),
            11 => Ok(Self::Return),
            err => Err(err),
        }
    }
}

impl From<Category> for u8 {
    fn from(category: Category) -> Self {
        category as u8
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single register operand slot
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Operand {
    /// Bank the register belongs to
    pub bank: Bank,
    /// Raw register index as encoded in the trace
    pub index: u8,
    /// Operand value
    ///
    /// Real decoded data for output slots, [`UNKNOWN_VALUE`] for input slots.
    pub value: u64,
}

impl Operand {
    /// Create an input operand carrying the [`UNKNOWN_VALUE`] marker
    pub fn input(index: u8) -> Self {
        Self {
            bank: Bank::of(index),
            index,
            value: UNKNOWN_VALUE,
        }
    }

    /// Create an output operand carrying a decoded value
    pub fn output(index: u8, value: u64) -> Self {
        Self {
            bank: Bank::of(index),
            index,
            value,
        }
    }
}

/// Control flow information of a branch piece
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Branch {
    /// Whether the branch was taken
    pub taken: bool,
    /// Address of the next retired instruction
    ///
    /// For a not-taken conditional branch this is the fall-through address.
    pub target: u64,
}

/// Memory access of a load or store piece
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct MemAccess {
    /// Effective address of this piece's access
    pub addr: u64,
    /// Access width in bytes
    pub size: u64,
}

/// One normalized decode unit
///
/// A macro-instruction cracks into one or more pieces, e.g. one per output
/// register or one per memory word of a wide store. All pieces of one
/// macro-instruction share `pc` and `branch`; exactly the last one carries
/// `is_last_piece`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Piece {
    /// Operation category
    ///
    /// The synthetic base-update piece of a post-increment load/store is
    /// reported as [`Category::Alu`].
    pub category: Category,
    /// Program counter of the originating macro-instruction
    pub pc: u64,
    /// Control flow information, populated exactly for branch categories
    pub branch: Option<Branch>,
    /// Memory access, populated exactly for load/store pieces
    pub mem: Option<MemAccess>,
    /// Input operand slots A, B and C
    pub inputs: [Option<Operand>; 3],
    /// Output operand slot D
    pub output: Option<Operand>,
    /// Whether this is the final piece of its macro-instruction
    pub is_last_piece: bool,
}

impl Piece {
    /// Whether this piece is a load
    pub fn is_load(&self) -> bool {
        self.category == Category::Load
    }

    /// Whether this piece is a store
    pub fn is_store(&self) -> bool {
        self.category == Category::Store
    }
}
