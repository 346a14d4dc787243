// ── Platform abstraction layer ────────────────────────────────────────────────
//
// One `open` per OS family, chosen at build time.  No `unsafe` lives here;
// all FFI is confined to the `unix` and `win32` sub-modules and never leaks
// outward.
//
//   open(path, flags, mode, config) -> (Descriptor, Hygiene)
//
// `path` has already been checked for interior NUL bytes.

#[cfg(unix)]
mod unix;
#[cfg(windows)]
mod win32;

#[cfg(unix)]
pub(crate) use unix::open;
#[cfg(windows)]
pub(crate) use win32::open;

/// An open file descriptor owned by the caller.  Dropping it closes the file.
#[cfg(unix)]
pub type Descriptor = std::os::fd::OwnedFd;

/// An open file handle owned by the caller.  Dropping it closes the file.
#[cfg(windows)]
pub type Descriptor = std::os::windows::io::OwnedHandle;
