// Copyright (C) 2025 FZI Forschungszentrum Informatik
// SPDX-License-Identifier: Apache-2.0
//! Source-specific error types

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Errors opening a [`Source`][super::Source]
///
/// Open failures are the only errors a source reports through its `Result`s.
/// Mid-stream corruption is surfaced as a diagnostic followed by an early
/// end of stream instead; see the [module level][super] documentation.
#[derive(Debug)]
pub enum Error {
    /// The input could not be opened or probed
    Open(PathBuf, io::Error),
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Open(_, err) => Some(err),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open(path, err) => write!(f, "Could not open {}: {err}", path.display()),
        }
    }
}
