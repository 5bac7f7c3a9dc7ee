/// Top bit of the encoding: set when the row was aggregated.
const AGG_FLAG_BIT: u16 = 0x8000;

/// Largest representable source ordinal (low 15 bits all set).
pub const MAX_SOURCE_ORDINAL: u16 = 0x7FFF;

/// Compact provenance record for one output row of a multi-way merge.
///
/// Packs a source ordinal (which input, by position) and an aggregation flag
/// (was this row merged from duplicates?) into 16 bits. `Mask` is a plain
/// value that is copied into sequences and has no ownership relationships.
///
/// The packing invariant (flag in bit 15, ordinal in bits 14..0) is
/// maintained by the setters; the raw encoding is only reachable through
/// [`from_bits`](Mask::from_bits) / [`to_bits`](Mask::to_bits).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mask {
    bits: u16,
}

impl Mask {
    /// Creates a mask with both fields set explicitly.
    ///
    /// # Panics
    ///
    /// Panics if `source_ordinal` exceeds [`MAX_SOURCE_ORDINAL`]. Out-of-range
    /// ordinals are rejected rather than truncated; a truncated ordinal would
    /// silently misattribute rows to another source.
    pub fn new(source_ordinal: u16, aggregated: bool) -> Self {
        assert!(
            source_ordinal <= MAX_SOURCE_ORDINAL,
            "source ordinal out of range: {source_ordinal:#x}"
        );
        let mut bits = source_ordinal;
        if aggregated {
            bits |= AGG_FLAG_BIT;
        }
        Self { bits }
    }

    /// Creates a non-aggregated mask for `source_ordinal`.
    ///
    /// # Panics
    ///
    /// Panics if `source_ordinal` exceeds [`MAX_SOURCE_ORDINAL`].
    pub fn from_source(source_ordinal: u16) -> Self {
        Self::new(source_ordinal, false)
    }

    /// Reconstructs a mask from its raw 16-bit encoding.
    pub fn from_bits(bits: u16) -> Self {
        Self { bits }
    }

    /// Returns the raw 16-bit encoding.
    pub fn to_bits(self) -> u16 {
        self.bits
    }

    /// Which input source (by position) produced the row.
    pub fn source_ordinal(self) -> u16 {
        self.bits & !AGG_FLAG_BIT
    }

    /// Whether the row was produced by aggregating multiple input rows.
    pub fn aggregated(self) -> bool {
        self.bits & AGG_FLAG_BIT != 0
    }

    /// Overwrites the source ordinal, preserving the aggregation flag.
    ///
    /// # Panics
    ///
    /// Panics if `source_ordinal` exceeds [`MAX_SOURCE_ORDINAL`].
    pub fn set_source_ordinal(&mut self, source_ordinal: u16) {
        assert!(
            source_ordinal <= MAX_SOURCE_ORDINAL,
            "source ordinal out of range: {source_ordinal:#x}"
        );
        self.bits = (self.bits & AGG_FLAG_BIT) | source_ordinal;
    }

    /// Sets or clears the aggregation flag, preserving the ordinal.
    pub fn set_aggregated(&mut self, aggregated: bool) {
        if aggregated {
            self.bits |= AGG_FLAG_BIT;
        } else {
            self.bits &= !AGG_FLAG_BIT;
        }
    }
}
