// Copyright (C) 2025 FZI Forschungszentrum Informatik
// SPDX-License-Identifier: Apache-2.0
//! Conversion error types

use std::fmt;
use std::io;

use super::BaseFormat;
use crate::{decoder, source};

/// Errors running a conversion
#[derive(Debug)]
pub enum Error {
    /// No route exists between the two formats
    Route(BaseFormat, Option<BaseFormat>),
    /// The input could not be opened
    Source(source::Error),
    /// The binary trace is malformed
    Decode(decoder::Error),
    /// A piece could not be rendered as NDJSON
    Encode(serde_json::Error),
    /// Writing the output failed
    Io(io::Error),
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Route(..) => None,
            Self::Source(err) => Some(err),
            Self::Decode(err) => Some(err),
            Self::Encode(err) => Some(err),
            Self::Io(err) => Some(err),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Route(input, Some(output)) => {
                write!(f, "No conversion route from {input} to {output}")
            }
            Self::Route(input, None) => {
                write!(f, "No conversion route from {input} to stdout")
            }
            Self::Source(err) => err.fmt(f),
            Self::Decode(err) => err.fmt(f),
            Self::Encode(err) => write!(f, "Could not encode NDJSON: {err}"),
            Self::Io(err) => write!(f, "Could not write output: {err}"),
        }
    }
}

impl From<source::Error> for Error {
    fn from(err: source::Error) -> Self {
        Self::Source(err)
    }
}

impl From<decoder::Error> for Error {
    fn from(err: decoder::Error) -> Self {
        Self::Decode(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Encode(err)
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Self::Io(err)
    }
}
