// Copyright (C) 2025 FZI Forschungszentrum Informatik
// SPDX-License-Identifier: Apache-2.0
//! Decoder-specific error types

use std::fmt;
use std::io;

use crate::record::Category;

/// Decode errors
///
/// All of these are fatal for the remainder of the stream: no piece is
/// emitted for the offending macro-instruction and the decoder will not
/// resynchronize. The `record` field is the zero-based index of the
/// offending record.
#[derive(Debug)]
pub enum Error {
    /// The underlying reader failed mid-record
    Io { record: u64, source: io::Error },
    /// The stream ended in the middle of a record
    Truncated { record: u64 },
    /// The category tag is not known to us
    UnknownCategory { record: u64, tag: u8 },
    /// A non-conditional branch was marked not taken
    NotTakenBranch { record: u64, category: Category },
    /// A store's access size is not divisible by its value register count
    IndivisibleStore {
        record: u64,
        mem_size: u8,
        value_regs: u8,
    },
    /// A load decomposed into zero memory pieces
    EmptyLoad { record: u64 },
}

impl Error {
    /// Retrieve the zero-based index of the offending record
    pub fn record(&self) -> u64 {
        match self {
            Self::Io { record, .. }
            | Self::Truncated { record }
            | Self::UnknownCategory { record, .. }
            | Self::NotTakenBranch { record, .. }
            | Self::IndivisibleStore { record, .. }
            | Self::EmptyLoad { record } => *record,
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { record, source } => write!(f, "Read error in record {record}: {source}"),
            Self::Truncated { record } => write!(f, "Record {record} is truncated"),
            Self::UnknownCategory { record, tag } => {
                write!(f, "Unknown category tag {tag} in record {record}")
            }
            Self::NotTakenBranch { record, category } => {
                write!(f, "Not-taken {category} in record {record}")
            }
            Self::IndivisibleStore {
                record,
                mem_size,
                value_regs,
            } => write!(
                f,
                "Store size {mem_size} not divisible by {value_regs} value registers in record {record}"
            ),
            Self::EmptyLoad { record } => {
                write!(f, "Load with zero memory pieces in record {record}")
            }
        }
    }
}
