// ── Descriptor hygiene ────────────────────────────────────────────────────────
//
// A freshly opened descriptor must not leak into child processes.  The open
// asks for close-on-exec atomically; the platform then confirms it and sets it
// after the fact if the kernel ignored the request.  Failing to set it never
// fails the open: the outcome is reported to a `HygieneLog` and the
// descriptor is returned anyway.

use std::io;

/// Whether the descriptor ended up close-on-exec.
#[derive(Debug)]
pub(crate) enum Hygiene {
    Sealed,
    /// The descriptor is open but may be inherited by children.
    Degraded(io::Error),
}

impl Hygiene {
    pub(crate) fn from_result(result: io::Result<()>) -> Self {
        match result {
            Ok(()) => Self::Sealed,
            Err(e) => Self::Degraded(e),
        }
    }
}

/// Receives non-fatal hygiene failures.
pub trait HygieneLog: Send + Sync {
    /// `path` is the path as given to the open; `err` is why close-on-exec
    /// could not be set.
    fn cloexec_degraded(&self, path: &[u8], err: &io::Error);
}

/// Default [`HygieneLog`]: a debug record through the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogFacade;

impl HygieneLog for LogFacade {
    fn cloexec_degraded(&self, path: &[u8], err: &io::Error) {
        log::debug!(
            "Failed to set close on exec for {:?}: {err}",
            String::from_utf8_lossy(path)
        );
    }
}

/// Collapse an open outcome to the descriptor, reporting degradation.
pub(crate) fn settle<D>(path: &[u8], opened: (D, Hygiene), sink: &dyn HygieneLog) -> D {
    let (descriptor, hygiene) = opened;
    if let Hygiene::Degraded(err) = hygiene {
        sink.cloexec_degraded(path, &err);
    }
    descriptor
}

// ── Tests ─────────────────────────────────────────────────────────────────────
