//! # Mask — row provenance for multi-way merges
//!
//! When compaction merges several sorted row sources into one output, the
//! key-column pass records *where each emitted row came from* so that later
//! passes (e.g. copying non-key columns) can replay the exact same decisions
//! without re-running the merge. One [`Mask`] is recorded per output row:
//! which source produced it, and whether it was aggregated with duplicates.
//!
//! [`MaskBuffer`] is the sequential writer/reader for that stream. It keeps
//! masks in memory while the stream is small and transparently spills to a
//! backing file once a configured byte budget is exceeded; readers see the
//! same sequence either way.
//!
//! ## Mask encoding (16 bits)
//!
//! ```text
//! ┌─────────────┬──────────────────────────────┐
//! │ bit 15      │ bits 14..0                   │
//! │ aggregated  │ source ordinal (0..=0x7FFF)  │
//! └─────────────┴──────────────────────────────┘
//! ```
//!
//! ## Backing file chunk format
//!
//! ```text
//! [count: u32 LE][crc32: u32 LE][mask: u16 LE] × count
//! ```
//!
//! Each spill appends one chunk; chunk sizes are whatever accumulated between
//! spills. The CRC32 covers the mask bytes and is verified on every load.
//! All integers are little-endian.
//!
//! ## Example
//!
//! ```rust,no_run
//! use mask::{Mask, MaskBuffer};
//!
//! let mut buf = MaskBuffer::new(0, "/tmp", 1024 * 1024);
//! buf.write(&[Mask::from_source(0), Mask::new(1, true)]).unwrap();
//! buf.flush().unwrap();
//!
//! buf.flip().unwrap();
//! while buf.has_remaining().unwrap() {
//!     let m = buf.current();
//!     // materialize one output row from source `m.source_ordinal()`
//!     buf.advance();
//! }
//! ```

mod buffer;
mod format;
mod mask;

pub use buffer::MaskBuffer;
pub use format::{CHUNK_HEADER_BYTES, MASK_BYTES};
pub use mask::{Mask, MAX_SOURCE_ORDINAL};

use std::io;
use thiserror::Error;

/// Errors surfaced by [`MaskBuffer`] operations.
#[derive(Debug, Error)]
pub enum MaskError {
    /// An underlying I/O error on the backing file.
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    /// A chunk's framing was malformed or its CRC did not match. The stream
    /// is unreadable from that point; no recovery is attempted since the
    /// backing file is a private, same-process artifact.
    #[error("corrupt mask chunk")]
    Corrupt,

    /// An operation was called in the wrong mode, e.g. `write` after `flip`.
    /// These are caller protocol violations, not runtime data errors.
    #[error("invalid state: {0}")]
    InvalidState(&'static str),
}

#[cfg(test)]
mod tests;
