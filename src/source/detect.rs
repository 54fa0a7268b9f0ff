// Copyright (C) 2025 FZI Forschungszentrum Informatik
// SPDX-License-Identifier: Apache-2.0
//! Content-based format detection

use std::io::{self, Read};

/// Number of leading bytes needed to identify any supported filter
pub(super) const FILTER_PROBE_LEN: usize = 6;

/// Size of a tar header block
pub(super) const TAR_BLOCK_LEN: usize = 512;

/// Offset of the `ustar` magic within a tar header block
const TAR_MAGIC_OFFSET: usize = 257;

/// A supported compression filter
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(super) enum Filter {
    None,
    Gzip,
    Xz,
    Bzip2,
    Zstd,
}

/// Identify the compression filter from the stream's leading bytes
pub(super) fn filter(magic: &[u8]) -> Filter {
    if magic.starts_with(&[0x1f, 0x8b]) {
        Filter::Gzip
    } else if magic.starts_with(&[0xfd, 0x37, 0x7a, 0x58, 0x5a, 0x00]) {
        Filter::Xz
    } else if magic.starts_with(b"BZh") {
        Filter::Bzip2
    } else if magic.starts_with(&[0x28, 0xb5, 0x2f, 0xfd]) {
        Filter::Zstd
    } else {
        Filter::None
    }
}

/// Whether the given block is a POSIX/GNU tar header block
///
/// Checks the `ustar` magic, which covers both the POSIX (`ustar\0`) and the
/// GNU (`ustar `) flavour.
pub(super) fn is_tar_header(block: &[u8]) -> bool {
    block
        .get(TAR_MAGIC_OFFSET..TAR_MAGIC_OFFSET + 5)
        .is_some_and(|magic| magic == b"ustar")
}

/// Fill `buf` from `reader`, stopping short only at end of stream
pub(super) fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut copied = 0;
    while copied < buf.len() {
        match reader.read(&mut buf[copied..]) {
            Ok(0) => break,
            Ok(n) => copied += n,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(err),
        }
    }
    Ok(copied)
}
