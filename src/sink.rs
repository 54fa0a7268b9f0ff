// Copyright (C) 2025 FZI Forschungszentrum Informatik
// SPDX-License-Identifier: Apache-2.0
//! Line-oriented output sinks
//!
//! A [`Sink`] writes text lines to stdout, a plain file, a compressed file
//! or a (optionally compressed) tar container, selected by the output file
//! name. Container output carries a single entry named `trace.jsonl` and is
//! staged through an unnamed temporary file, because the entry size must be
//! known before the entry header can be written.


use std::fs::File;
use std::io::{self, Seek, SeekFrom, Write};
use std::path::Path;

use bzip2::write::BzEncoder;
use flate2::write::GzEncoder;
use xz2::write::XzEncoder;

use crate::convert::Compression;

/// Name of the single entry written into container output
const CONTAINER_ENTRY: &str = "trace.jsonl";

fn has_suffix(name: &str, suffix: &str) -> bool {
    name.len() >= suffix.len() && name.as_bytes()[name.len() - suffix.len()..]
        .eq_ignore_ascii_case(suffix.as_bytes())
}

fn is_container(name: &str) -> bool {
    [".tar", ".tar.gz", ".tar.xz", ".tar.bz2", ".tar.zst"]
        .iter()
        .any(|suffix| has_suffix(name, suffix))
}

fn compression_of(name: &str) -> Compression {
    if has_suffix(name, ".gz") {
        Compression::Gzip
    } else if has_suffix(name, ".xz") {
        Compression::Xz
    } else if has_suffix(name, ".bz2") {
        Compression::Bzip2
    } else if has_suffix(name, ".zst") {
        Compression::Zstd
    } else {
        Compression::None
    }
}

/// A compression filter over some writer
enum Encoder<W: Write> {
    Plain(W),
    Gzip(GzEncoder<W>),
    Xz(XzEncoder<W>),
    Bzip2(BzEncoder<W>),
    Zstd(zstd::stream::write::Encoder<'static, W>),
}

impl<W: Write> Encoder<W> {
    fn new(compression: Compression, writer: W) -> io::Result<Self> {
        let res = match compression {
            Compression::None => Self::Plain(writer),
            Compression::Gzip => {
                Self::Gzip(GzEncoder::new(writer, flate2::Compression::default()))
            }
            Compression::Xz => Self::Xz(XzEncoder::new(writer, 6)),
            Compression::Bzip2 => {
                Self::Bzip2(BzEncoder::new(writer, bzip2::Compression::default()))
            }
            Compression::Zstd => Self::Zstd(zstd::stream::write::Encoder::new(writer, 0)?),
        };
        Ok(res)
    }

    fn finish(self) -> io::Result<W> {
        match self {
            Self::Plain(writer) => Ok(writer),
            Self::Gzip(encoder) => encoder.finish(),
            Self::Xz(encoder) => encoder.finish(),
            Self::Bzip2(encoder) => encoder.finish(),
            Self::Zstd(encoder) => encoder.finish(),
        }
    }
}

impl<W: Write> Write for Encoder<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Self::Plain(inner) => inner.write(buf),
            Self::Gzip(inner) => inner.write(buf),
            Self::Xz(inner) => inner.write(buf),
            Self::Bzip2(inner) => inner.write(buf),
            Self::Zstd(inner) => inner.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Self::Plain(inner) => inner.flush(),
            Self::Gzip(inner) => inner.flush(),
            Self::Xz(inner) => inner.flush(),
            Self::Bzip2(inner) => inner.flush(),
            Self::Zstd(inner) => inner.flush(),
        }
    }
}

enum Output {
    Stdout(io::Stdout),
    Direct(Encoder<io::BufWriter<File>>),
    Container {
        builder: tar::Builder<Encoder<io::BufWriter<File>>>,
        staging: File,
    },
}

/// A line-oriented output sink
///
/// All owned resources, including the container staging file, are released
/// on [`finish`][Self::finish] or drop; dropping an unfinished container
/// sink finalizes it best-effort.
pub struct Sink {
    output: Option<Output>,
}

impl Sink {
    /// Create a sink writing to the given path
    ///
    /// The wrapping is selected by suffix: `.tar` and `.tar.{gz,xz,bz2,zst}`
    /// produce a container, a bare compression suffix a compressed stream,
    /// anything else a plain file.
    pub fn create<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let path = path.as_ref();
        let name = path.to_string_lossy();
        let file = io::BufWriter::new(File::create(path)?);

        let output = if is_container(&name) {
            Output::Container {
                builder: tar::Builder::new(Encoder::new(compression_of(&name), file)?),
                staging: tempfile::tempfile()?,
            }
        } else {
            Output::Direct(Encoder::new(compression_of(&name), file)?)
        };
        Ok(Self {
            output: Some(output),
        })
    }

    /// Create a sink writing to stdout
    pub fn stdout() -> Self {
        Self {
            output: Some(Output::Stdout(io::stdout())),
        }
    }

    /// Append one line, adding the newline
    pub fn write_line(&mut self, line: &str) -> io::Result<()> {
        let Some(output) = self.output.as_mut() else {
            return Err(io::Error::other("sink is already finished"));
        };
        match output {
            Output::Stdout(stdout) => writeln!(stdout, "{line}"),
            Output::Direct(encoder) => {
                encoder.write_all(line.as_bytes())?;
                encoder.write_all(b"\n")
            }
            Output::Container { staging, .. } => {
                staging.write_all(line.as_bytes())?;
                staging.write_all(b"\n")
            }
        }
    }

    /// Finalize the output
    ///
    /// For container output this writes the entry header and copies the
    /// staged content into the container.
    pub fn finish(mut self) -> io::Result<()> {
        self.close()
    }

    fn close(&mut self) -> io::Result<()> {
        match self.output.take() {
            None => Ok(()),
            Some(Output::Stdout(mut stdout)) => stdout.flush(),
            Some(Output::Direct(encoder)) => encoder.finish()?.flush(),
            Some(Output::Container {
                mut builder,
                mut staging,
            }) => {
                staging.flush()?;
                let size = staging.seek(SeekFrom::End(0))?;
                staging.seek(SeekFrom::Start(0))?;

                let mut header = tar::Header::new_ustar();
                header.set_size(size);
                header.set_mode(0o644);
                builder.append_data(&mut header, CONTAINER_ENTRY, &mut staging)?;
                builder.into_inner()?.finish()?.flush()
            }
        }
    }
}

impl Drop for Sink {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            tracing::warn!("could not finalize output: {err}");
        }
    }
}
