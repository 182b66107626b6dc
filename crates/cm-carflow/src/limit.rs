//! Inner field size ceiling.
//!
//! The `data` column can carry megabytes per cell.  The reader itself grows
//! its buffers on demand, so the only ceiling is the one set here: requested
//! at the platform maximum and stepped down by a factor of ten until the
//! platform accepts it (a single allocation may not exceed `isize::MAX`).
//! Cells above the ceiling skip their row instead of failing the stream.

/// Largest single allocation the platform accepts.
pub const PLATFORM_CEILING: usize = isize::MAX as usize;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct FieldSizeLimit {
    bytes: usize,
}

impl FieldSizeLimit {
    /// An explicit ceiling, in bytes.
    pub const fn new(bytes: usize) -> Self {
        Self { bytes }
    }

    /// The platform maximum, stepped down until accepted.
    pub fn relaxed() -> Self {
        Self::negotiate(usize::MAX, PLATFORM_CEILING)
    }

    /// Start at `requested` and divide by ten until it fits under `ceiling`.
    pub fn negotiate(requested: usize, ceiling: usize) -> Self {
        let mut bytes = requested;
        while bytes > ceiling {
            bytes /= 10;
        }
        Self { bytes }
    }

    #[inline]
    pub fn bytes(self) -> usize {
        self.bytes
    }

    #[inline]
    pub fn admits(self, len: usize) -> bool {
        len <= self.bytes
    }
}

impl Default for FieldSizeLimit {
    fn default() -> Self {
        Self::relaxed()
    }
}
