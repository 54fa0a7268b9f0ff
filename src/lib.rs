// Copyright (C) 2025 FZI Forschungszentrum Informatik
// SPDX-License-Identifier: Apache-2.0

//! # Decoder and transcoder for CBP branch-prediction instruction traces
//!
//! This crate decodes the binary macro-instruction trace format produced by
//! the CBP trace generator and re-emits every decoded instruction piece in a
//! normalized form, ready for consumption by the bundled output encoders
//! (plain [text], [assembly listing][asm], [NDJSON][ndjson]).
//!
//! The trace format packs instructions compactly: register operands are
//! listed by count, wide outputs are split across multiple decoded pieces
//! and post-increment addressing side effects are implicit and synthesized
//! as trailing pseudo-operations during decode. See [decoder] for the
//! cracking rules and [record] for the normalized data model.
//!
//! Trace files may be raw, compressed (gzip, xz, bzip2, zstd) or wrapped in
//! a tar container; the [source] module presents any of these as one
//! continuous byte stream, detected from content.
//!
//! # Example
//!
//! The following decodes a trace and prints one text line per piece.
//!
//! ```no_run
//! use cbp_trace::decoder::Decoder;
//! use cbp_trace::source::Source;
//! use cbp_trace::text;
//!
//! let source = Source::open("trace.cbp.gz")?;
//! for piece in Decoder::new(source) {
//!     println!("{}", text::line(&piece?));
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod asm;
pub mod convert;
pub mod decoder;
pub mod ndjson;
pub mod record;
pub mod sink;
pub mod source;
pub mod text;

pub use decoder::Decoder;
pub use record::Piece;
pub use source::Source;
