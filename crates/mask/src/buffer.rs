use std::fs::{File, OpenOptions};
use std::io::{Seek, SeekFrom};
use std::path::{Path, PathBuf};

use config::Config;

use crate::format::{read_chunk, write_chunk, MASK_BYTES};
use crate::{Mask, MaskError};

/// Write-or-read mode of a [`MaskBuffer`].
///
/// A buffer starts in `Writing`, is sealed by `flush`, and becomes `Reading`
/// on the first `flip`. It never goes back; making the mode explicit lets
/// every operation cheaply reject calls from the wrong side of the protocol.
enum State {
    Writing {
        /// Masks accumulated since the last spill.
        buf: Vec<Mask>,
        /// Backing file, created lazily on the first spill. `None` while the
        /// whole stream still fits in memory.
        file: Option<File>,
        /// Set by `flush`; no further writes are accepted.
        sealed: bool,
    },
    Reading {
        /// The currently loaded chunk, or the entire stream when it never
        /// spilled.
        masks: Vec<Mask>,
        /// Index of the mask the read cursor points at, within `masks`.
        cursor: usize,
        /// `Some` when the stream spilled. The file position sits at the next
        /// chunk header; `has_remaining` reads from it sequentially.
        file: Option<File>,
    },
}

/// Append-only writer plus replayable sequential reader for a stream of
/// [`Mask`] values, one per output row of a merge task.
///
/// # Write path
///
/// [`write`](MaskBuffer::write) appends batches to an in-memory buffer. When
/// the buffer's encoded size exceeds the byte budget, the *entire* buffer is
/// serialized as one chunk and appended to the backing file, which is created
/// on first spill under the storage directory, named from the buffer id so
/// concurrent merge tasks never collide. [`flush`](MaskBuffer::flush) seals
/// the stream, appending any spilled tail as a final chunk.
///
/// # Read path
///
/// [`flip`](MaskBuffer::flip) rewinds to the logical beginning. It is repeatable,
/// so the stream can be replayed in full any number of times. The reader
/// holds one chunk in memory at a time; [`has_remaining`](MaskBuffer::has_remaining)
/// loads the next chunk when the current one is exhausted (the only read-side
/// I/O point). Callers that never spilled read straight from the retained
/// write buffer; the two cases are indistinguishable through this API except
/// for [`has_same_source`](MaskBuffer::has_same_source) conservatism.
///
/// # Concurrency
///
/// Single-writer, then single-reader, non-overlapping in time. No internal
/// locking; one instance is owned exclusively by one merge task.
///
/// # Teardown
///
/// The backing file (if any) is removed on drop, on all exit paths including
/// early abort. A failed removal is a leaked temp file, not a correctness
/// problem.
pub struct MaskBuffer {
    /// Distinguishes the backing files of concurrent merge tasks.
    id: u32,
    /// Full path of the (lazily created) backing file.
    path: PathBuf,
    /// Spill threshold for the write buffer, in encoded bytes.
    max_memory_bytes: usize,
    state: State,
    /// Reusable scratch for chunk serialization; cleared, never shrunk.
    scratch: Vec<u8>,
}

impl MaskBuffer {
    /// Creates an empty buffer in write mode.
    ///
    /// No I/O happens here — the backing file under `dir` is only created if
    /// the stream ever spills. `max_memory_bytes` is the spill threshold for
    /// the write buffer (2 bytes per mask); it is fixed for the lifetime of
    /// the buffer and never re-chunks already-spilled data.
    pub fn new<P: AsRef<Path>>(id: u32, dir: P, max_memory_bytes: usize) -> Self {
        let path = dir.as_ref().join(format!("mask-{id:08}.msk"));
        Self {
            id,
            path,
            max_memory_bytes,
            state: State::Writing {
                buf: Vec::new(),
                file: None,
                sealed: false,
            },
            scratch: Vec::new(),
        }
    }

    /// Creates a buffer under the configured storage root with the configured
    /// memory budget.
    pub fn with_config(id: u32, config: &Config) -> Self {
        Self::new(id, &config.storage_root, config.max_mask_buffer_bytes)
    }

    /// The buffer id this instance was created with.
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Path of the backing file. The file only exists once a spill occurred.
    pub fn backing_path(&self) -> &Path {
        &self.path
    }

    /// Appends `masks`, in order, to the stream.
    ///
    /// If the write buffer's encoded size exceeds the budget afterwards, the
    /// whole buffer (not just this batch) is spilled as one chunk. This spill
    /// boundary is also the chunk boundary the reader later loads at.
    ///
    /// # Errors
    ///
    /// [`MaskError::InvalidState`] once the buffer was flushed or flipped;
    /// [`MaskError::Io`] if creating or appending to the backing file fails.
    pub fn write(&mut self, masks: &[Mask]) -> Result<(), MaskError> {
        let State::Writing { buf, file, sealed } = &mut self.state else {
            return Err(MaskError::InvalidState("write after flip"));
        };
        if *sealed {
            return Err(MaskError::InvalidState("write after flush"));
        }

        buf.extend_from_slice(masks);

        if buf.len() * MASK_BYTES > self.max_memory_bytes {
            if file.is_none() {
                *file = Some(
                    OpenOptions::new()
                        .create(true)
                        .append(true)
                        .read(true)
                        .open(&self.path)?,
                );
            }
            if let Some(f) = file {
                write_chunk(f, buf, &mut self.scratch)?;
                buf.clear();
            }
        }

        Ok(())
    }

    /// Seals the stream after the last `write`. Call exactly once.
    ///
    /// If any spill occurred, the remaining tail is appended as a final
    /// chunk; otherwise the whole stream simply stays resident in memory.
    ///
    /// # Errors
    ///
    /// [`MaskError::InvalidState`] on a second `flush` or after `flip`;
    /// [`MaskError::Io`] if appending the tail chunk fails.
    pub fn flush(&mut self) -> Result<(), MaskError> {
        let State::Writing { buf, file, sealed } = &mut self.state else {
            return Err(MaskError::InvalidState("flush after flip"));
        };
        if *sealed {
            return Err(MaskError::InvalidState("flush called twice"));
        }

        if let Some(f) = file {
            if !buf.is_empty() {
                write_chunk(f, buf, &mut self.scratch)?;
                buf.clear();
            }
        }
        *sealed = true;

        Ok(())
    }

    /// Rewinds the reader to the logical beginning of the stream.
    ///
    /// May be called repeatedly; each call is a full reset supporting an
    /// independent complete replay. For a spilled stream this seeks the
    /// backing file to offset 0 and eagerly loads the first chunk; a
    /// memory-resident stream just points the cursor at index 0.
    ///
    /// # Errors
    ///
    /// [`MaskError::InvalidState`] before `flush`; [`MaskError::Io`] /
    /// [`MaskError::Corrupt`] if loading the first chunk fails.
    pub fn flip(&mut self) -> Result<(), MaskError> {
        if let State::Writing { buf, file, sealed } = &mut self.state {
            if !*sealed {
                return Err(MaskError::InvalidState("flip before flush"));
            }
            // One-way transition. A never-spilled stream carries its write
            // buffer over as the (only) loaded chunk; a spilled one starts
            // with an empty chunk cache and loads from the file below.
            let masks = std::mem::take(buf);
            let file = file.take();
            self.state = State::Reading {
                masks,
                cursor: 0,
                file,
            };
        }

        if let State::Reading {
            masks,
            cursor,
            file,
        } = &mut self.state
        {
            *cursor = 0;
            if let Some(f) = file {
                f.seek(SeekFrom::Start(0))?;
                if !read_chunk(f, masks)? {
                    masks.clear();
                }
            }
        }

        Ok(())
    }

    /// Returns whether the cursor points at a valid mask.
    ///
    /// When the loaded chunk is exhausted and the stream is file-backed, this
    /// loads the next chunk (replacing the current one and resetting the
    /// in-chunk cursor) before answering. This is the only
    /// operation that performs read-side I/O. Calling it repeatedly without
    /// an intervening [`advance`](MaskBuffer::advance) is side-effect free.
    ///
    /// # Errors
    ///
    /// [`MaskError::InvalidState`] before `flip`; [`MaskError::Io`] /
    /// [`MaskError::Corrupt`] if loading the next chunk fails.
    pub fn has_remaining(&mut self) -> Result<bool, MaskError> {
        let State::Reading {
            masks,
            cursor,
            file,
        } = &mut self.state
        else {
            return Err(MaskError::InvalidState("has_remaining before flip"));
        };

        if *cursor < masks.len() {
            return Ok(true);
        }
        if let Some(f) = file {
            if read_chunk(f, masks)? {
                *cursor = 0;
                return Ok(!masks.is_empty());
            }
        }

        Ok(false)
    }

    /// Returns the mask at the cursor without moving it.
    ///
    /// # Panics
    ///
    /// Panics if the stream is exhausted or still in write mode. Callers must
    /// check `has_remaining()` immediately before each call.
    pub fn current(&self) -> Mask {
        match &self.state {
            State::Reading { masks, cursor, .. } => masks[*cursor],
            State::Writing { .. } => panic!("current() called before flip()"),
        }
    }

    /// Moves the cursor forward by one position within the loaded chunk.
    ///
    /// Never performs I/O — the next `has_remaining()` call does any chunk
    /// loading. Each `advance` must follow a successful
    /// `has_remaining() == true`.
    ///
    /// # Panics
    ///
    /// Panics if the buffer is still in write mode.
    pub fn advance(&mut self) {
        match &mut self.state {
            State::Reading { cursor, .. } => *cursor += 1,
            State::Writing { .. } => panic!("advance() called before flip()"),
        }
    }

    /// Returns whether the `count` masks starting at the cursor are all
    /// resident in the loaded chunk *and* all report `source_ordinal`.
    ///
    /// Strictly zero I/O: if the lookahead would cross into data not yet
    /// loaded from disk (or run past the end of a memory-resident stream),
    /// the answer is `false` even when loading would have confirmed a match.
    /// Callers use this purely as a batching hint: `true` means "safe to
    /// copy `count` rows from this source without further checks"; `false`
    /// proves nothing about the sources.
    pub fn has_same_source(&self, source_ordinal: u16, count: usize) -> bool {
        let State::Reading { masks, cursor, .. } = &self.state else {
            return false;
        };
        if masks.len().saturating_sub(*cursor) < count {
            return false;
        }
        masks[*cursor..*cursor + count]
            .iter()
            .all(|m| m.source_ordinal() == source_ordinal)
    }
}

impl std::fmt::Debug for MaskBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (mode, spilled) = match &self.state {
            State::Writing { file, .. } => ("writing", file.is_some()),
            State::Reading { file, .. } => ("reading", file.is_some()),
        };
        f.debug_struct("MaskBuffer")
            .field("id", &self.id)
            .field("path", &self.path)
            .field("max_memory_bytes", &self.max_memory_bytes)
            .field("mode", &mode)
            .field("spilled", &spilled)
            .finish()
    }
}

impl Drop for MaskBuffer {
    fn drop(&mut self) {
        let spilled = match &self.state {
            State::Writing { file, .. } => file.is_some(),
            State::Reading { file, .. } => file.is_some(),
        };
        if spilled {
            let _ = std::fs::remove_file(&self.path);
        }
    }
}
