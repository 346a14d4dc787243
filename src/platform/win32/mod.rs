// ── Win32 platform implementation ─────────────────────────────────────────────
//
// One of exactly two modules in the crate where `unsafe` code is permitted
// (the other is `platform::unix`).  Every `unsafe` block MUST carry a
// `// SAFETY:` comment that states:
//   • which invariant makes the operation sound, and
//   • what the caller is responsible for maintaining.
//
// The narrow Win32 API reads paths in the ANSI code page, not UTF-8, so the
// path is converted to UTF-16 and opened with `CreateFileW`.  The fallback
// policy lives in `crate::opener`; this file only supplies the primitives.

#![allow(unsafe_code)]

use std::{
    ffi::CString,
    io,
    os::windows::io::{AsHandle, AsRawHandle, BorrowedHandle, FromRawHandle, HandleOrInvalid, OwnedHandle},
};

use windows::{
    core::{PCSTR, PCWSTR},
    Win32::{
        Foundation::{
            GetHandleInformation, SetHandleInformation, GENERIC_READ, GENERIC_WRITE, HANDLE,
            HANDLE_FLAGS, HANDLE_FLAG_INHERIT,
        },
        Storage::FileSystem::{
            CreateFileA, CreateFileW, CREATE_ALWAYS, CREATE_NEW, FILE_ATTRIBUTE_NORMAL,
            FILE_CREATION_DISPOSITION, FILE_GENERIC_WRITE, FILE_SHARE_DELETE, FILE_SHARE_MODE,
            FILE_SHARE_READ, FILE_SHARE_WRITE, FILE_WRITE_DATA, OPEN_ALWAYS, OPEN_EXISTING,
            TRUNCATE_EXISTING,
        },
    },
};

use crate::{
    config::OpenConfig,
    error::Result,
    flags::OpenFlags,
    hygiene::Hygiene,
    opener::{open_wide_then_narrow, Access, Disposition, NativeCreate},
};

/// `ERROR_INVALID_HANDLE`.
const ERROR_INVALID_HANDLE: i32 = 6;

/// HRESULT facility carrying a plain Win32 error code.
const FACILITY_WIN32: i32 = 7;

// ── Flag mapping ──────────────────────────────────────────────────────────────

/// This layer never locks other openers out.
const SHARE_ALL: FILE_SHARE_MODE =
    FILE_SHARE_MODE(FILE_SHARE_READ.0 | FILE_SHARE_WRITE.0 | FILE_SHARE_DELETE.0);

fn access_mask(access: Access) -> u32 {
    let mut mask = 0;
    if access.read {
        mask |= GENERIC_READ.0;
    }
    if access.write {
        // Without FILE_WRITE_DATA every write is forced to end-of-file.
        mask |= if access.append {
            FILE_GENERIC_WRITE.0 & !FILE_WRITE_DATA.0
        } else {
            GENERIC_WRITE.0
        };
    }
    mask
}

fn disposition(d: Disposition) -> FILE_CREATION_DISPOSITION {
    match d {
        Disposition::CreateAlways => CREATE_ALWAYS,
        Disposition::CreateNew => CREATE_NEW,
        Disposition::TruncateExisting => TRUNCATE_EXISTING,
        Disposition::OpenAlways => OPEN_ALWAYS,
        Disposition::OpenExisting => OPEN_EXISTING,
    }
}

/// Convert a windows-crate error back to the Win32 code `GetLastError()` gave.
fn io_error(e: windows::core::Error) -> io::Error {
    let hr = e.code().0;
    if (hr >> 16) & 0x1FFF == FACILITY_WIN32 {
        io::Error::from_raw_os_error(hr & 0xFFFF)
    } else {
        io::Error::other(e)
    }
}

/// Take ownership of a handle returned by `CreateFile*`.
fn adopt(handle: HANDLE) -> io::Result<OwnedHandle> {
    // SAFETY: `handle` came straight from CreateFile* and has no other owner.
    // An INVALID_HANDLE_VALUE is rejected by `try_from` without being closed.
    let handle = unsafe { HandleOrInvalid::from_raw_handle(handle.0) };
    OwnedHandle::try_from(handle).map_err(|_| io::Error::from_raw_os_error(ERROR_INVALID_HANDLE))
}

// ── Primitives ────────────────────────────────────────────────────────────────

struct Win32Files;

impl NativeCreate for Win32Files {
    type Handle = OwnedHandle;

    fn create_wide(
        &self,
        path: &[u16],
        access: Access,
        d: Disposition,
    ) -> io::Result<OwnedHandle> {
        // SAFETY: `path` is a NUL-terminated UTF-16 buffer that outlives the
        // call.  No security attributes are passed, so the new handle is not
        // inheritable.
        let handle = unsafe {
            CreateFileW(
                PCWSTR(path.as_ptr()),
                access_mask(access),
                SHARE_ALL,
                None,
                disposition(d),
                FILE_ATTRIBUTE_NORMAL,
                HANDLE::default(),
            )
        }
        .map_err(io_error)?;
        adopt(handle)
    }

    fn create_narrow(
        &self,
        path: &CString,
        access: Access,
        d: Disposition,
    ) -> io::Result<OwnedHandle> {
        // SAFETY: as `create_wide`; `path` is NUL-terminated.
        let handle = unsafe {
            CreateFileA(
                PCSTR(path.as_ptr().cast()),
                access_mask(access),
                SHARE_ALL,
                None,
                disposition(d),
                FILE_ATTRIBUTE_NORMAL,
                HANDLE::default(),
            )
        }
        .map_err(io_error)?;
        adopt(handle)
    }
}

// ── Open ──────────────────────────────────────────────────────────────────────

/// Windows has no permission bits, so `_mode` is unused.
pub(crate) fn open(
    path: &[u8],
    flags: OpenFlags,
    _mode: u32,
    config: &OpenConfig,
) -> Result<(OwnedHandle, Hygiene)> {
    let handle = open_wide_then_narrow(&Win32Files, path, flags, config.rdwr_access)?;
    let hygiene = Hygiene::from_result(ensure_not_inherited(handle.as_handle()));
    Ok((handle, hygiene))
}

/// Windows' close-on-exec: clear `HANDLE_FLAG_INHERIT` if it is set.
fn ensure_not_inherited(handle: BorrowedHandle<'_>) -> io::Result<()> {
    let raw = HANDLE(handle.as_raw_handle());
    let mut current = 0u32;

    // SAFETY: `raw` is a live handle borrowed for the duration of the call;
    // `current` is a valid out-pointer.
    unsafe { GetHandleInformation(raw, &mut current) }.map_err(io_error)?;
    if current & HANDLE_FLAG_INHERIT.0 == 0 {
        return Ok(());
    }

    // SAFETY: as above; only the inherit bit is touched.
    unsafe { SetHandleInformation(raw, HANDLE_FLAG_INHERIT.0, HANDLE_FLAGS(0)) }
        .map_err(io_error)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_write_mask_has_both_rights() {
        let mask = access_mask(Access { read: true, write: true, append: false });
        assert_eq!(mask, GENERIC_READ.0 | GENERIC_WRITE.0);
    }

    #[test]
    fn append_mask_lacks_write_data() {
        let mask = access_mask(Access { read: false, write: true, append: true });
        assert_eq!(mask & FILE_WRITE_DATA.0, 0);
        assert_ne!(mask, 0);
    }

    #[test]
    fn truncate_with_append_requests_generic_write() {
        let flags = OpenFlags::WRITE | OpenFlags::TRUNCATE | OpenFlags::APPEND;
        let access = crate::opener::derive_access(flags, crate::config::RdWrAccess::ReadWrite);
        assert_eq!(crate::opener::derive_disposition(flags), Disposition::TruncateExisting);
        assert_eq!(access_mask(access), GENERIC_WRITE.0);
    }

    #[test]
    fn truncate_with_append_opens_existing_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("rewrite.log");
        std::fs::write(&path, b"old contents").expect("seed");
        let utf8 = path.to_str().expect("utf-8 path").as_bytes().to_vec();
        let flags = OpenFlags::WRITE | OpenFlags::TRUNCATE | OpenFlags::APPEND;
        let (handle, _) = open(&utf8, flags, 0, &OpenConfig::default()).expect("open");
        drop(handle);
        assert_eq!(std::fs::read(&path).expect("read"), b"");
    }

    #[test]
    fn unicode_name_opens_through_wide_api() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("naïve-日本.txt");
        let utf8 = path.to_str().expect("utf-8 path").as_bytes().to_vec();
        let flags = OpenFlags::WRITE | OpenFlags::CREATE | OpenFlags::TRUNCATE;
        let (handle, hygiene) = open(&utf8, flags, 0, &OpenConfig::default()).expect("open");
        assert!(matches!(hygiene, Hygiene::Sealed));
        drop(handle);
        assert!(path.exists());
    }
}
