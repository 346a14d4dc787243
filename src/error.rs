// ── Central error type ────────────────────────────────────────────────────────
//
// Every fallible operation in the crate returns `error::Result<T>`.  The
// process-wide "last error" of the C world becomes an explicit value here;
// `raw_os_error()` still reports the code a C caller would have found there.

use std::{fmt, io};

/// POSIX `EINVAL`, reported for malformed modes and paths on every platform.
const EINVAL: i32 = 22;
/// POSIX `ENOMEM`, reported when the wide path buffer cannot be reserved.
const ENOMEM: i32 = 12;

/// Every error an open can produce.
#[derive(Debug)]
pub enum OpenError {
    /// The mode string did not start with `r`, `w` or `a`, or carried a
    /// modifier other than `+` and `b`.  No OS call was made.
    InvalidMode {
        /// The rejected mode string, verbatim.
        mode: String,
    },

    /// The path contained an interior NUL byte and cannot be passed to the OS.
    InvalidPath,

    /// The UTF-16 path buffer could not be allocated.
    OutOfMemory,

    /// The operating system refused the open (not found, permission, exists, …).
    Os(io::Error),
}

impl OpenError {
    /// The errno / Win32 code a C caller would have seen.
    pub fn raw_os_error(&self) -> Option<i32> {
        match self {
            Self::InvalidMode { .. } | Self::InvalidPath => Some(EINVAL),
            Self::OutOfMemory => Some(ENOMEM),
            Self::Os(e) => e.raw_os_error(),
        }
    }

    /// The matching `io::ErrorKind`.
    pub fn kind(&self) -> io::ErrorKind {
        match self {
            Self::InvalidMode { .. } | Self::InvalidPath => io::ErrorKind::InvalidInput,
            Self::OutOfMemory => io::ErrorKind::OutOfMemory,
            Self::Os(e) => e.kind(),
        }
    }

    /// `true` for the invalid-argument family.
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Self::InvalidMode { .. } | Self::InvalidPath)
    }
}

impl fmt::Display for OpenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidMode { mode } => write!(f, "invalid open mode {mode:?}"),
            Self::InvalidPath => f.write_str("path contains an interior NUL byte"),
            Self::OutOfMemory => f.write_str("out of memory while converting path"),
            Self::Os(e) => write!(f, "open failed: {e}"),
        }
    }
}

impl std::error::Error for OpenError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Os(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for OpenError {
    fn from(e: io::Error) -> Self {
        Self::Os(e)
    }
}

// Lets `?` lift an OpenError into plain `io::Result` code.
impl From<OpenError> for io::Error {
    fn from(e: OpenError) -> Self {
        match e {
            OpenError::Os(inner) => inner,
            other => io::Error::new(other.kind(), other.to_string()),
        }
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, OpenError>;

// ── Tests ─────────────────────────────────────────────────────────────────────
