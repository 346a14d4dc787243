// ── Wide/narrow descriptor opener ─────────────────────────────────────────────
//
// The OS-independent half of the Windows opener: derive access rights and a
// creation disposition from `OpenFlags`, convert the UTF-8 path to UTF-16,
// and decide between the wide primitive and the narrow (ANSI code page)
// fallback.  The primitives themselves sit behind `NativeCreate` so the
// fallback policy can be exercised on any host.

// Only the Windows platform module drives this in production.
#![cfg_attr(not(windows), allow(dead_code))]

use std::{ffi::CString, io};

use crate::{
    config::RdWrAccess,
    error::{OpenError, Result},
    flags::OpenFlags,
};

// ── Access rights ─────────────────────────────────────────────────────────────

/// Rights requested from the OS, before mapping to native bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Access {
    pub(crate) read: bool,
    pub(crate) write: bool,
    /// Writes must land at end-of-file.  Never set together with a
    /// truncating open, which needs full write rights; `Stream` seeks to
    /// the end itself in append modes.
    pub(crate) append: bool,
}

pub(crate) fn derive_access(flags: OpenFlags, rdwr: RdWrAccess) -> Access {
    let (read, write) = if flags.contains(OpenFlags::READ_WRITE) {
        match rdwr {
            RdWrAccess::ReadWrite => (true, true),
            RdWrAccess::LegacyReadOnly => (true, false),
        }
    } else if flags.contains(OpenFlags::WRITE) {
        (false, true)
    } else {
        (true, false)
    };
    Access {
        read,
        write,
        append: write
            && flags.contains(OpenFlags::APPEND)
            && !flags.contains(OpenFlags::TRUNCATE),
    }
}

// ── Creation disposition ──────────────────────────────────────────────────────

/// Whether the open creates, truncates, or requires an existing file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Disposition {
    /// Create, or truncate an existing file.
    CreateAlways,
    /// Create; fail if the file exists.
    CreateNew,
    /// Truncate; fail if the file does not exist.
    TruncateExisting,
    /// Open, creating the file if missing.
    OpenAlways,
    /// Open; fail if the file does not exist.
    OpenExisting,
}

/// Precedence: create+truncate, create+exclusive, truncate, create, none.
pub(crate) fn derive_disposition(flags: OpenFlags) -> Disposition {
    let create = flags.contains(OpenFlags::CREATE);
    let truncate = flags.contains(OpenFlags::TRUNCATE);
    let exclusive = flags.contains(OpenFlags::EXCLUSIVE);

    if create && truncate {
        Disposition::CreateAlways
    } else if create && exclusive {
        Disposition::CreateNew
    } else if truncate {
        Disposition::TruncateExisting
    } else if create {
        Disposition::OpenAlways
    } else {
        Disposition::OpenExisting
    }
}

// ── UTF-8 → UTF-16 ────────────────────────────────────────────────────────────

/// Convert a UTF-8 path to a NUL-terminated UTF-16 buffer of exact size.
///
/// Returns `Ok(None)` when `path` is not valid UTF-8 (the caller falls back to
/// the narrow primitive) and `Err(OutOfMemory)` if the buffer cannot be
/// reserved.
pub(crate) fn to_wide(path: &[u8]) -> Result<Option<Vec<u16>>> {
    let Ok(text) = std::str::from_utf8(path) else {
        return Ok(None);
    };

    let units = text.encode_utf16().count() + 1;
    let mut wide = Vec::new();
    wide.try_reserve_exact(units)
        .map_err(|_| OpenError::OutOfMemory)?;
    wide.extend(text.encode_utf16());
    wide.push(0);
    Ok(Some(wide))
}

// ── Native primitives ─────────────────────────────────────────────────────────

/// The two file-creation primitives of a wide/narrow OS API.
pub(crate) trait NativeCreate {
    type Handle;

    /// Open through the wide-character API.  `path` is NUL-terminated.
    fn create_wide(
        &self,
        path: &[u16],
        access: Access,
        disposition: Disposition,
    ) -> io::Result<Self::Handle>;

    /// Open through the narrow API, which reads `path` in the legacy code page.
    fn create_narrow(
        &self,
        path: &CString,
        access: Access,
        disposition: Disposition,
    ) -> io::Result<Self::Handle>;
}

/// Open `path`, preferring the wide primitive.
///
/// The narrow primitive is tried once when the path is not valid UTF-8, or
/// when the wide open failed and `CREATE` was not requested.  A failed wide
/// open with `CREATE` is returned as is.
pub(crate) fn open_wide_then_narrow<N: NativeCreate>(
    native: &N,
    path: &[u8],
    flags: OpenFlags,
    rdwr: RdWrAccess,
) -> Result<N::Handle> {
    let access = derive_access(flags, rdwr);
    let disposition = derive_disposition(flags);

    match to_wide(path)? {
        Some(wide) => match native.create_wide(&wide, access, disposition) {
            Ok(handle) => return Ok(handle),
            Err(e) if flags.contains(OpenFlags::CREATE) => return Err(OpenError::Os(e)),
            Err(e) => log::trace!("wide open failed ({e}), retrying in the ANSI code page"),
        },
        None => log::trace!("path is not valid UTF-8, opening in the ANSI code page"),
    }

    let narrow = CString::new(path).map_err(|_| OpenError::InvalidPath)?;
    native
        .create_narrow(&narrow, access, disposition)
        .map_err(OpenError::Os)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
