// ── Safety policy ────────────────────────────────────────────────────────────
// Unsafe code is forbidden everywhere except:
//   • `platform::unix`  – libc FFI
//   • `platform::win32` – Win32 FFI
// Each unsafe block in those modules MUST carry a `// SAFETY:` comment.
#![deny(unsafe_code)]

//! UTF-8 file opening with descriptor hygiene.
//!
//! Two guarantees the raw OS calls do not give on their own:
//!
//! * UTF-8 paths work unmodified, including on Windows where the narrow API
//!   expects the ANSI code page.
//! * Every descriptor is close-on-exec (non-inheritable on Windows), so it is
//!   not leaked into spawned child processes.
//!
//! ```no_run
//! use std::io::Write;
//!
//! let mut log = utf8open::fopen_utf8("журнал.txt", "a")?;
//! log.write_all(b"started\n")?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod config;
mod error;
mod flags;
mod hygiene;
mod opener;
mod platform;
mod stream;

pub use config::{OpenConfig, RdWrAccess, DEFAULT_CREATION_MODE};
pub use error::{OpenError, Result};
pub use flags::OpenFlags;
pub use hygiene::{HygieneLog, LogFacade};
pub use platform::Descriptor;
pub use stream::{Stream, StreamMode};

// ── Opener ────────────────────────────────────────────────────────────────────

/// Opens files with a given configuration and hygiene log.
///
/// The free functions [`open`] and [`fopen_utf8`] use `Opener::default()`.
pub struct Opener {
    config: OpenConfig,
    log: Box<dyn HygieneLog>,
}

impl Default for Opener {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Opener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Opener").field("config", &self.config).finish_non_exhaustive()
    }
}

impl Opener {
    pub fn new() -> Self {
        Self {
            config: OpenConfig::default(),
            log: Box::new(LogFacade),
        }
    }

    pub fn with_config(mut self, config: OpenConfig) -> Self {
        self.config = config;
        self
    }

    /// Route close-on-exec failures to `log` instead of the `log` crate.
    pub fn with_log(mut self, log: impl HygieneLog + 'static) -> Self {
        self.log = Box::new(log);
        self
    }

    pub fn config(&self) -> &OpenConfig {
        &self.config
    }

    /// Open `path` with `flags`, returning a close-on-exec descriptor.
    ///
    /// `creation_mode` is consulted only when `flags` contains `CREATE`; if
    /// it is `None` the configured default (0o666) applies.  If close-on-exec
    /// cannot be set, the open still succeeds and the failure goes to the
    /// hygiene log.
    pub fn open(
        &self,
        path: impl AsRef<[u8]>,
        flags: OpenFlags,
        creation_mode: Option<u32>,
    ) -> Result<Descriptor> {
        let path = path.as_ref();
        if path.contains(&0) {
            return Err(OpenError::InvalidPath);
        }

        let mode = if flags.contains(OpenFlags::CREATE) {
            creation_mode.unwrap_or(self.config.default_creation_mode)
        } else {
            0
        };

        let opened = platform::open(path, flags, mode, &self.config)?;
        Ok(hygiene::settle(path, opened, self.log.as_ref()))
    }

    /// Open `path` as a buffered stream according to an `fopen` mode string.
    ///
    /// A malformed mode fails with [`OpenError::InvalidMode`] before any OS
    /// call is made.
    pub fn fopen(&self, path: impl AsRef<[u8]>, mode: &str) -> Result<Stream> {
        let mode = StreamMode::parse(mode)?;
        let descriptor = self.open(path, mode.flags(), Some(self.config.default_creation_mode))?;
        Ok(Stream::from_descriptor(descriptor, mode))
    }
}

// ── Free functions ────────────────────────────────────────────────────────────

/// [`Opener::open`] with the default configuration.
pub fn open(path: impl AsRef<[u8]>, flags: OpenFlags, creation_mode: Option<u32>) -> Result<Descriptor> {
    Opener::new().open(path, flags, creation_mode)
}

/// [`Opener::fopen`] with the default configuration.
pub fn fopen_utf8(path: impl AsRef<[u8]>, mode: &str) -> Result<Stream> {
    Opener::new().fopen(path, mode)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
