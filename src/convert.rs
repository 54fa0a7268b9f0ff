// Copyright (C) 2025 FZI Forschungszentrum Informatik
// SPDX-License-Identifier: Apache-2.0
//! Conversion planning and drivers
//!
//! This module decides what a conversion does based on the involved file
//! names and runs the conversion pipelines. File names are classified by
//! suffix, case-insensitively and compression-suffix first: `trace.cbp.gz`
//! is a gzipped binary trace, `out.jsonl.zst` a zstd-compressed NDJSON
//! stream. A missing or unrecognized base extension means binary trace.
//!
//! Note that the classification feeds routing and the [sink][crate::sink]
//! only; the [`Source`] detects its input wrapping from content, so a
//! mislabeled input still decodes.

pub mod error;


pub use error::Error;

use std::fmt;
use std::path::{Path, PathBuf};

use crate::decoder::Decoder;
use crate::ndjson;
use crate::sink::Sink;
use crate::source::Source;
use crate::{asm, text};

/// Compression applied to a file, as encoded in its name
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum Compression {
    #[default]
    None,
    Gzip,
    Xz,
    Bzip2,
    Zstd,
}

/// Base format of a file, as encoded in its name
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum BaseFormat {
    /// Binary trace (`.cbp` or no recognized extension)
    CbpBinary,
    /// Text form (`.txt`)
    CbpText,
    /// Line-delimited JSON (`.jsonl`, `.json`)
    Ndjson,
    /// Assembly listing (`.asm`, output only)
    Asm,
    /// STF trace (`.stf`, output only, no route yet)
    Stf,
    /// Memory hex image (`.memh`, output only, no route yet)
    Memh,
}

impl fmt::Display for BaseFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::CbpBinary => "CBP_BIN",
            Self::CbpText => "CBP_TEXT",
            Self::Ndjson => "NDJSON",
            Self::Asm => "ASM",
            Self::Stf => "STF",
            Self::Memh => "MEMH",
        };
        f.write_str(name)
    }
}

/// A file classified by its name
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FileSpec {
    pub path: PathBuf,
    pub format: BaseFormat,
    pub compression: Compression,
}

impl FileSpec {
    /// Classify a path by its suffixes
    pub fn parse<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        let mut stem = path.to_string_lossy().into_owned();
        let compression = strip_compression(&mut stem);
        let format = strip_base(&mut stem);
        Self {
            path: path.into(),
            format,
            compression,
        }
    }
}

/// Strip `suffix` off the end of `stem`, ASCII-case-insensitively
fn strip_suffix_ci(stem: &mut String, suffix: &str) -> bool {
    let Some(start) = stem.len().checked_sub(suffix.len()) else {
        return false;
    };
    if stem.as_bytes()[start..].eq_ignore_ascii_case(suffix.as_bytes()) {
        stem.truncate(start);
        true
    } else {
        false
    }
}

fn strip_compression(stem: &mut String) -> Compression {
    if strip_suffix_ci(stem, ".gz") {
        Compression::Gzip
    } else if strip_suffix_ci(stem, ".xz") {
        Compression::Xz
    } else if strip_suffix_ci(stem, ".bz2") {
        Compression::Bzip2
    } else if strip_suffix_ci(stem, ".zst") {
        Compression::Zstd
    } else {
        Compression::None
    }
}

fn strip_base(stem: &mut String) -> BaseFormat {
    if strip_suffix_ci(stem, ".cbp") {
        BaseFormat::CbpBinary
    } else if strip_suffix_ci(stem, ".txt") {
        BaseFormat::CbpText
    } else if strip_suffix_ci(stem, ".jsonl") || strip_suffix_ci(stem, ".json") {
        BaseFormat::Ndjson
    } else if strip_suffix_ci(stem, ".asm") {
        BaseFormat::Asm
    } else if strip_suffix_ci(stem, ".stf") {
        BaseFormat::Stf
    } else if strip_suffix_ci(stem, ".memh") {
        BaseFormat::Memh
    } else {
        BaseFormat::CbpBinary
    }
}

/// A planned conversion
#[derive(Clone, Debug)]
pub struct Plan {
    pub input: FileSpec,
    /// Output file; `None` means stdout
    pub output: Option<FileSpec>,
    /// Stop after this many pieces; `0` means unlimited
    pub limit: u64,
    /// Open the input in raw-only mode
    pub raw: bool,
}

impl Plan {
    /// Resolve the conversion route for this plan
    pub fn route(&self) -> Result<Route, Error> {
        let output = self.output.as_ref().map(|o| o.format);
        match (self.input.format, output) {
            (BaseFormat::Ndjson, None | Some(BaseFormat::CbpText)) => Ok(Route::NdjsonToText),
            (BaseFormat::CbpBinary, None | Some(BaseFormat::Ndjson)) => Ok(Route::BinaryToNdjson),
            (BaseFormat::CbpBinary, Some(BaseFormat::CbpText)) => Ok(Route::BinaryToText),
            (BaseFormat::CbpBinary, Some(BaseFormat::Asm)) => Ok(Route::BinaryToAsm),
            (input, output) => Err(Error::Route(input, output)),
        }
    }
}

/// A supported conversion route
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Route {
    BinaryToNdjson,
    BinaryToText,
    BinaryToAsm,
    NdjsonToText,
}

impl Route {
    /// Label used in the per-run summary
    pub fn emitted_label(self) -> &'static str {
        match self {
            Self::BinaryToNdjson => "NDJSON lines emitted",
            Self::BinaryToText | Self::NdjsonToText => "Text lines emitted",
            Self::BinaryToAsm => "Assembly lines emitted",
        }
    }
}

/// Run a planned conversion, returning the number of emitted lines
pub fn convert(plan: &Plan) -> Result<u64, Error> {
    match plan.route()? {
        Route::BinaryToNdjson => binary_to_ndjson(plan),
        Route::BinaryToText => binary_to_text(plan),
        Route::BinaryToAsm => binary_to_asm(plan),
        Route::NdjsonToText => ndjson_to_text(plan),
    }
}

fn open_binary_source(plan: &Plan) -> Result<Source, Error> {
    let path = &plan.input.path;
    let source = if plan.raw {
        Source::open_raw(path)
    } else {
        Source::open(path)
    };
    Ok(source?)
}

fn open_sink(plan: &Plan) -> Result<Sink, Error> {
    match &plan.output {
        Some(spec) => Ok(Sink::create(&spec.path)?),
        None => Ok(Sink::stdout()),
    }
}

fn binary_to_ndjson(plan: &Plan) -> Result<u64, Error> {
    let mut decoder = Decoder::new(open_binary_source(plan)?);
    let mut sink = open_sink(plan)?;

    let mut emitted = 0;
    while plan.limit == 0 || emitted < plan.limit {
        let Some(piece) = decoder.next_piece()? else {
            break;
        };
        sink.write_line(&ndjson::line(&piece)?)?;
        emitted += 1;
    }
    sink.finish()?;
    Ok(emitted)
}

fn binary_to_text(plan: &Plan) -> Result<u64, Error> {
    let mut decoder = Decoder::new(open_binary_source(plan)?);
    let mut sink = open_sink(plan)?;

    let mut emitted = 0;
    while plan.limit == 0 || emitted < plan.limit {
        let Some(piece) = decoder.next_piece()? else {
            break;
        };
        sink.write_line(&text::line(&piece))?;
        emitted += 1;
    }
    sink.finish()?;
    Ok(emitted)
}

fn binary_to_asm(plan: &Plan) -> Result<u64, Error> {
    let mut decoder = Decoder::new(open_binary_source(plan)?);
    let mut sink = open_sink(plan)?;

    for line in asm::PREAMBLE.lines() {
        sink.write_line(line)?;
    }

    let mut emitted = 0;
    while plan.limit == 0 || emitted < plan.limit {
        let Some(piece) = decoder.next_piece()? else {
            break;
        };
        sink.write_line(&asm::line(&piece))?;
        emitted += 1;
    }
    sink.finish()?;
    Ok(emitted)
}

fn ndjson_to_text(plan: &Plan) -> Result<u64, Error> {
    // NDJSON input is a plain compressed text stream; never probe it for
    // container structure.
    let source = Source::open_raw(&plan.input.path)?;
    let mut reader = ndjson::Reader::new(source);
    let mut sink = open_sink(plan)?;

    let mut emitted = 0;
    while plan.limit == 0 || emitted < plan.limit {
        let Some(piece) = reader.next() else {
            break;
        };
        sink.write_line(&text::line(&piece.map_err(Error::Io)?))?;
        emitted += 1;
    }
    sink.finish()?;
    Ok(emitted)
}
