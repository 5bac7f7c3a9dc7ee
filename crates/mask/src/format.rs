//! Chunk framing for the mask backing file.
//!
//! ```text
//! [count: u32 LE][crc32: u32 LE][mask: u16 LE] × count
//! ```
//!
//! `count` is the number of masks in the chunk; the CRC32 covers the mask
//! bytes. Chunks are appended back-to-back, one per spill, so the loader can
//! walk the file without an index: read a header, read `count * 2` body
//! bytes, repeat. Clean EOF at a header is the end of the stream.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use crc32fast::Hasher as Crc32;
use std::io::{self, Read, Write};

use crate::{Mask, MaskError};

/// Encoded size of one mask.
pub const MASK_BYTES: usize = 2;

/// Size of the per-chunk header: `count` (u32) + `crc32` (u32).
pub const CHUNK_HEADER_BYTES: usize = 8;

/// Safety cap on masks per chunk (64 MiB of body). A larger count in a
/// header is treated as corruption.
const MAX_CHUNK_MASKS: u32 = 32 * 1024 * 1024;

/// Serializes `masks` as one chunk and appends it to `w`.
///
/// `buf` is a reusable scratch buffer, cleared but not shrunk between calls.
/// The whole frame is written with a single `write_all`.
pub(crate) fn write_chunk<W: Write>(
    w: &mut W,
    masks: &[Mask],
    buf: &mut Vec<u8>,
) -> io::Result<()> {
    if masks.len() as u64 > MAX_CHUNK_MASKS as u64 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "mask chunk too large",
        ));
    }

    buf.clear();

    // Reserve the 8-byte header (count + crc), filled after the body.
    buf.extend_from_slice(&[0u8; CHUNK_HEADER_BYTES]);
    for m in masks {
        buf.write_u16::<LittleEndian>(m.to_bits())?;
    }

    let body = &buf[CHUNK_HEADER_BYTES..];
    let mut hasher = Crc32::new();
    hasher.update(body);
    let crc = hasher.finalize();

    buf[0..4].copy_from_slice(&(masks.len() as u32).to_le_bytes());
    buf[4..8].copy_from_slice(&crc.to_le_bytes());

    w.write_all(buf)
}

/// Loads the next chunk from `r` into `out`, replacing its contents.
///
/// Returns `Ok(false)` on clean EOF (no more chunks); `out` is left
/// untouched in that case. A zero/absurd count, a truncated header or body,
/// or a CRC mismatch is [`MaskError::Corrupt`]. The backing file is written
/// whole by the same process, so a short chunk is corruption rather than a
/// crash artifact to be tolerated.
pub(crate) fn read_chunk<R: Read>(r: &mut R, out: &mut Vec<Mask>) -> Result<bool, MaskError> {
    let count = match r.read_u32::<LittleEndian>() {
        Ok(v) => v,
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(false),
        Err(e) => return Err(MaskError::Io(e)),
    };
    if count == 0 || count > MAX_CHUNK_MASKS {
        return Err(MaskError::Corrupt);
    }

    let crc = match r.read_u32::<LittleEndian>() {
        Ok(v) => v,
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Err(MaskError::Corrupt),
        Err(e) => return Err(MaskError::Io(e)),
    };

    let mut body = vec![0u8; count as usize * MASK_BYTES];
    match r.read_exact(&mut body) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Err(MaskError::Corrupt),
        Err(e) => return Err(MaskError::Io(e)),
    }

    let mut hasher = Crc32::new();
    hasher.update(&body);
    if hasher.finalize() != crc {
        return Err(MaskError::Corrupt);
    }

    out.clear();
    out.reserve(count as usize);
    let mut br = &body[..];
    for _ in 0..count {
        out.push(Mask::from_bits(br.read_u16::<LittleEndian>()?));
    }

    Ok(true)
}
