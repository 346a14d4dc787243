// ── Unix platform implementation ──────────────────────────────────────────────
//
// One of exactly two modules in the crate where `unsafe` code is permitted
// (the other is `platform::win32`).  Every `unsafe` block MUST carry a
// `// SAFETY:` comment.
//
// Paths go to `open(2)` byte for byte: Unix filenames are already UTF-8 (or
// opaque bytes), so no conversion happens here.

#![allow(unsafe_code)]

use std::{
    ffi::CString,
    io,
    os::fd::{AsFd, AsRawFd, BorrowedFd, FromRawFd, OwnedFd},
};

use crate::{
    config::OpenConfig,
    error::{OpenError, Result},
    flags::OpenFlags,
    hygiene::Hygiene,
};

/// Map portable flags onto `open(2)` flags.  `BINARY` has no Unix meaning.
fn native_flags(flags: OpenFlags) -> libc::c_int {
    let mut native = if flags.contains(OpenFlags::READ_WRITE) {
        libc::O_RDWR
    } else if flags.contains(OpenFlags::WRITE) {
        libc::O_WRONLY
    } else {
        libc::O_RDONLY
    };

    for (flag, bit) in [
        (OpenFlags::CREATE, libc::O_CREAT),
        (OpenFlags::TRUNCATE, libc::O_TRUNC),
        (OpenFlags::APPEND, libc::O_APPEND),
        (OpenFlags::EXCLUSIVE, libc::O_EXCL),
    ] {
        if flags.contains(flag) {
            native |= bit;
        }
    }
    native
}

pub(crate) fn open(
    path: &[u8],
    flags: OpenFlags,
    mode: u32,
    _config: &OpenConfig,
) -> Result<(OwnedFd, Hygiene)> {
    let path = CString::new(path).map_err(|_| OpenError::InvalidPath)?;
    let native = native_flags(flags) | libc::O_CLOEXEC;

    // SAFETY: `path` is NUL-terminated and outlives the call.  The mode is
    // passed as `c_uint`, the promoted type `open(2)` reads its variadic
    // argument as.
    let fd = unsafe { libc::open(path.as_ptr(), native, mode as libc::c_uint) };
    if fd == -1 {
        return Err(OpenError::Os(io::Error::last_os_error()));
    }

    // SAFETY: `fd` was just returned by a successful open and is owned by
    // nobody else.
    let fd = unsafe { OwnedFd::from_raw_fd(fd) };
    let hygiene = Hygiene::from_result(ensure_cloexec(fd.as_fd()));
    Ok((fd, hygiene))
}

/// Make sure `FD_CLOEXEC` is set, setting it if the kernel ignored
/// `O_CLOEXEC`.
fn ensure_cloexec(fd: BorrowedFd<'_>) -> io::Result<()> {
    let raw = fd.as_raw_fd();

    // SAFETY: `raw` is a live descriptor borrowed for the duration of the call.
    let current = unsafe { libc::fcntl(raw, libc::F_GETFD) };
    if current == -1 {
        return Err(io::Error::last_os_error());
    }
    if current & libc::FD_CLOEXEC != 0 {
        return Ok(());
    }

    // SAFETY: as above; F_SETFD only touches the descriptor flags.
    if unsafe { libc::fcntl(raw, libc::F_SETFD, current | libc::FD_CLOEXEC) } == -1 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::os::unix::fs::PermissionsExt;

    use super::*;

    fn is_cloexec(fd: BorrowedFd<'_>) -> bool {
        // SAFETY: `fd` is live for the duration of the call.
        let flags = unsafe { libc::fcntl(fd.as_raw_fd(), libc::F_GETFD) };
        assert_ne!(flags, -1);
        flags & libc::FD_CLOEXEC != 0
    }

    #[test]
    fn access_bits_map_to_open_modes() {
        assert_eq!(native_flags(OpenFlags::empty()) & libc::O_ACCMODE, libc::O_RDONLY);
        assert_eq!(native_flags(OpenFlags::READ) & libc::O_ACCMODE, libc::O_RDONLY);
        assert_eq!(native_flags(OpenFlags::WRITE) & libc::O_ACCMODE, libc::O_WRONLY);
        assert_eq!(native_flags(OpenFlags::READ_WRITE) & libc::O_ACCMODE, libc::O_RDWR);
    }

    #[test]
    fn creation_bits_map_one_to_one() {
        let all = OpenFlags::WRITE
            | OpenFlags::CREATE
            | OpenFlags::TRUNCATE
            | OpenFlags::APPEND
            | OpenFlags::EXCLUSIVE
            | OpenFlags::BINARY;
        let native = native_flags(all);
        for bit in [libc::O_CREAT, libc::O_TRUNC, libc::O_APPEND, libc::O_EXCL] {
            assert_ne!(native & bit, 0);
        }
        assert_eq!(native_flags(OpenFlags::WRITE) & libc::O_CREAT, 0);
    }

    #[test]
    fn opened_descriptor_is_cloexec() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("cloexec.txt");
        let flags = OpenFlags::WRITE | OpenFlags::CREATE;
        let (fd, hygiene) = open(
            path.as_os_str().as_encoded_bytes(),
            flags,
            0o644,
            &OpenConfig::default(),
        )
        .expect("open");
        assert!(matches!(hygiene, Hygiene::Sealed));
        assert!(is_cloexec(fd.as_fd()));
    }

    #[test]
    fn ensure_cloexec_repairs_inheritable_descriptor() {
        let file = tempfile::tempfile().expect("tempfile");
        // SAFETY: dup(2) of a live descriptor; the result is owned below.
        let dup = unsafe { libc::dup(file.as_raw_fd()) };
        assert_ne!(dup, -1);
        // SAFETY: `dup` is a fresh descriptor nobody else owns.
        let dup = unsafe { OwnedFd::from_raw_fd(dup) };
        assert!(!is_cloexec(dup.as_fd()), "dup(2) clears FD_CLOEXEC");

        ensure_cloexec(dup.as_fd()).expect("set cloexec");
        assert!(is_cloexec(dup.as_fd()));
    }

    #[test]
    fn missing_file_is_not_found() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("absent.txt");
        let err = open(
            path.as_os_str().as_encoded_bytes(),
            OpenFlags::READ,
            0,
            &OpenConfig::default(),
        )
        .expect_err("missing");
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
        assert_eq!(err.raw_os_error(), Some(libc::ENOENT));
    }

    #[test]
    fn exclusive_create_fails_on_existing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("taken.txt");
        std::fs::write(&path, b"x").expect("write");
        let err = open(
            path.as_os_str().as_encoded_bytes(),
            OpenFlags::WRITE | OpenFlags::CREATE | OpenFlags::EXCLUSIVE,
            0o644,
            &OpenConfig::default(),
        )
        .expect_err("exists");
        assert_eq!(err.kind(), io::ErrorKind::AlreadyExists);
    }

    #[test]
    fn creation_mode_is_applied() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("private.txt");
        open(
            path.as_os_str().as_encoded_bytes(),
            OpenFlags::WRITE | OpenFlags::CREATE,
            0o600,
            &OpenConfig::default(),
        )
        .expect("open");
        let mode = std::fs::metadata(&path).expect("stat").permissions().mode();
        // umask can only remove bits.
        assert_eq!(mode & 0o777 & !0o600, 0);
    }
}
