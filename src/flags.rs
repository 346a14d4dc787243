// ── Portable open flags ───────────────────────────────────────────────────────
//
// Bit values are private to this crate and never reach the OS directly; each
// platform module maps them onto its native representation.

use bitflags::bitflags;

bitflags! {
    /// What an open should do.
    ///
    /// `READ` and `WRITE` are mutually exclusive unless `READ_WRITE` is
    /// requested; an empty access set opens read-only.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct OpenFlags: u32 {
        const READ       = 1 << 0;
        const WRITE      = 1 << 1;
        const READ_WRITE = 1 << 2;
        const CREATE     = 1 << 3;
        const TRUNCATE   = 1 << 4;
        const APPEND     = 1 << 5;
        const EXCLUSIVE  = 1 << 6;
        /// Binary (untranslated) I/O.  No effect where the OS has no text mode.
        const BINARY     = 1 << 7;
    }
}

impl OpenFlags {
    /// `true` if the descriptor will be readable.
    pub fn is_readable(self) -> bool {
        self.contains(Self::READ_WRITE) || !self.contains(Self::WRITE)
    }

    /// `true` if the descriptor will be writable.
    pub fn is_writable(self) -> bool {
        self.intersects(Self::WRITE | Self::READ_WRITE)
    }

    /// Promote to read-write, dropping the single-direction bits.
    pub(crate) fn into_read_write(self) -> Self {
        (self - (Self::READ | Self::WRITE)) | Self::READ_WRITE
    }
}
