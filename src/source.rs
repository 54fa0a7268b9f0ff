// Copyright (C) 2025 FZI Forschungszentrum Informatik
// SPDX-License-Identifier: Apache-2.0
//! Byte stream sources
//!
//! A [`Source`] presents a trace file as one continuous decoded byte stream,
//! independently of how the file is wrapped: plain bytes, a compression
//! filter (gzip, xz, bzip2 or zstd), a tar container or a compressed tar
//! container. Wrapping is detected from the content, never from the file
//! name, so callers do not need to know which wrapping is in effect.
//!
//! Detection is a best-effort optimization: in the default mode a failure to
//! set up container decoding degrades to [raw-only][Source::open_raw]
//! behaviour instead of reporting an error. Mid-stream corruption is
//! reported once through a diagnostic and then surfaces as an early end of
//! stream.
//!
//! # Example
//!
//! ```no_run
//! use std::io::Read;
//!
//! use cbp_trace::source::Source;
//!
//! let mut source = Source::open("trace.cbp.gz")?;
//! let mut buf = [0u8; 8];
//! while !source.at_end() {
//!     let n = source.read(&mut buf)?;
//!     // ...
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod detect;
pub mod error;


pub use error::Error;

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

use bzip2::read::BzDecoder;
use flate2::read::MultiGzDecoder;
use xz2::read::XzDecoder;

use detect::Filter;

/// Probed bytes chained back in front of the remaining file
type Input = io::Chain<io::Cursor<Vec<u8>>, io::BufReader<File>>;

/// The closed set of stream backends
///
/// Selected once at open time; no runtime re-detection happens afterwards.
enum Reader {
    /// Raw-only mode: the (optionally filtered) stream as-is
    Direct(Filtered),
    /// Auto mode, no container found: filtered stream with the probed
    /// leading block chained back in
    Probed(io::Chain<io::Cursor<Vec<u8>>, Filtered>),
    /// Auto mode, container found: all entries staged into a spill file
    Staged(io::BufReader<File>),
}

impl Read for Reader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Self::Direct(inner) => inner.read(buf),
            Self::Probed(inner) => inner.read(buf),
            Self::Staged(inner) => inner.read(buf),
        }
    }
}

/// A decompression filter applied over the raw file
enum Filtered {
    Plain(Input),
    Gzip(MultiGzDecoder<Input>),
    Xz(XzDecoder<Input>),
    Bzip2(BzDecoder<Input>),
    Zstd(zstd::stream::read::Decoder<'static, io::BufReader<Input>>),
}

impl Filtered {
    fn new(filter: Filter, input: Input) -> io::Result<Self> {
        let res = match filter {
            Filter::None => Self::Plain(input),
            Filter::Gzip => Self::Gzip(MultiGzDecoder::new(input)),
            Filter::Xz => Self::Xz(XzDecoder::new(input)),
            Filter::Bzip2 => Self::Bzip2(BzDecoder::new(input)),
            Filter::Zstd => Self::Zstd(zstd::stream::read::Decoder::new(input)?),
        };
        Ok(res)
    }
}

impl Read for Filtered {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Self::Plain(inner) => inner.read(buf),
            Self::Gzip(inner) => inner.read(buf),
            Self::Xz(inner) => inner.read(buf),
            Self::Bzip2(inner) => inner.read(buf),
            Self::Zstd(inner) => inner.read(buf),
        }
    }
}

/// A byte stream source over a raw, compressed and/or tar-wrapped file
///
/// See the [module level][self] documentation for details. The underlying
/// file handle, decompression contexts and the container spill file (if any)
/// are owned by the `Source` and released on drop, on every path.
pub struct Source {
    reader: Reader,
    at_end: bool,
}

impl Source {
    /// Open a source with full format auto-detection
    ///
    /// Detects a compression filter and, on the decompressed stream, a tar
    /// container. The decoded content of all regular container entries is
    /// presented as one concatenated stream. If container detection cannot
    /// be set up, the source silently degrades to raw-only behaviour.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        Self::open_with(path.as_ref(), false)
    }

    /// Open a source in raw-only mode
    ///
    /// The content is treated as a single (optionally compression-filtered)
    /// byte stream and is never probed for container structure. Use this
    /// when the content is known to be e.g. a plain compressed text stream.
    pub fn open_raw<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        Self::open_with(path.as_ref(), true)
    }

    fn open_with(path: &Path, raw_only: bool) -> Result<Self, Error> {
        let open_err = |e| Error::Open(path.into(), e);

        let file = File::open(path).map_err(open_err)?;
        let mut file = io::BufReader::new(file);

        let mut magic = [0u8; detect::FILTER_PROBE_LEN];
        let got = detect::read_full(&mut file, &mut magic).map_err(open_err)?;
        let filter = detect::filter(&magic[..got]);

        let input = io::Cursor::new(magic[..got].to_vec()).chain(file);
        let mut filtered = Filtered::new(filter, input).map_err(open_err)?;

        if raw_only {
            return Ok(Self {
                reader: Reader::Direct(filtered),
                at_end: false,
            });
        }

        let mut block = [0u8; detect::TAR_BLOCK_LEN];
        let got = match detect::read_full(&mut filtered, &mut block) {
            Ok(got) => got,
            // Detection is best-effort: a stream we cannot even probe is
            // handed to the consumer undecoded and fails there, if at all.
            Err(err) => {
                tracing::debug!("container probe failed, retrying raw-only: {err}");
                return Self::open_with(path, true);
            }
        };

        if detect::is_tar_header(&block[..got]) {
            match Self::stage_container(&block[..got], filtered) {
                Ok(spill) => {
                    return Ok(Self {
                        reader: Reader::Staged(io::BufReader::new(spill)),
                        at_end: false,
                    });
                }
                Err(err) => {
                    tracing::debug!("container staging failed, retrying raw-only: {err}");
                    return Self::open_with(path, true);
                }
            }
        }

        let reader = Reader::Probed(io::Cursor::new(block[..got].to_vec()).chain(filtered));
        Ok(Self {
            reader,
            at_end: false,
        })
    }

    /// Stage the decoded content of all container entries into a spill file
    ///
    /// Entries are concatenated in container order; non-file entries are
    /// skipped. A failure before the first entry is delivered is a setup
    /// failure and bubbles up so the caller can fall back to raw-only mode.
    /// A failure mid-entry ends the stream early with a diagnostic, keeping
    /// what was already staged.
    fn stage_container(probed: &[u8], rest: Filtered) -> io::Result<File> {
        let mut spill = tempfile::tempfile()?;
        let mut archive = tar::Archive::new(io::Cursor::new(probed.to_vec()).chain(rest));

        let mut staged = 0u64;
        for entry in archive.entries()? {
            let mut entry = match entry {
                Ok(entry) => entry,
                Err(err) if staged == 0 => return Err(err),
                Err(err) => {
                    tracing::warn!("trace container ends early: {err}");
                    break;
                }
            };
            if !entry.header().entry_type().is_file() {
                continue;
            }
            match io::copy(&mut entry, &mut spill) {
                Ok(n) => staged += n,
                Err(err) => {
                    tracing::warn!("trace container entry ends early: {err}");
                    break;
                }
            }
        }

        spill.seek(SeekFrom::Start(0))?;
        Ok(spill)
    }

    /// Whether the stream is exhausted
    ///
    /// Once this returns `true`, [`read`][Read::read] only ever returns `0`.
    pub fn at_end(&self) -> bool {
        self.at_end
    }
}

impl Read for Source {
    /// Read up to `buf.len()` bytes
    ///
    /// Short reads happen only at the end of the stream: exhausting an
    /// internal data block triggers a blocking fetch of the next one. A
    /// corrupt compressed block mid-stream is reported once as a diagnostic
    /// and then treated as end of stream.
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.at_end || buf.is_empty() {
            return Ok(0);
        }

        let mut copied = 0;
        while copied < buf.len() {
            match self.reader.read(&mut buf[copied..]) {
                Ok(0) => {
                    self.at_end = true;
                    break;
                }
                Ok(n) => copied += n,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => {
                    tracing::warn!("trace stream ends early: {err}");
                    self.at_end = true;
                    break;
                }
            }
        }
        Ok(copied)
    }
}
