// ── Opener configuration ──────────────────────────────────────────────────────
//
// Optional JSON configuration.  Every field has a default so that partial
// documents, or documents written before a field existed, still parse.

use std::{fs, io, path::Path};

use serde::{Deserialize, Serialize};

/// Permission bits used when creating a file and no explicit mode is given.
pub const DEFAULT_CREATION_MODE: u32 = 0o666;

/// Rights granted to a `READ_WRITE` open by the wide/narrow (Windows) opener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RdWrAccess {
    /// Read and write rights.
    #[default]
    ReadWrite,
    /// Read rights only, as older releases computed for read-write opens.
    /// Writes through such a handle fail with access denied.
    LegacyReadOnly,
}

/// Tunables for [`crate::Opener`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenConfig {
    /// Used when `CREATE` is set and the caller passes no mode.
    #[serde(default = "default_creation_mode")]
    pub default_creation_mode: u32,
    #[serde(default)]
    pub rdwr_access: RdWrAccess,
}

fn default_creation_mode() -> u32 {
    DEFAULT_CREATION_MODE
}

impl Default for OpenConfig {
    fn default() -> Self {
        Self {
            default_creation_mode: DEFAULT_CREATION_MODE,
            rdwr_access: RdWrAccess::default(),
        }
    }
}

impl OpenConfig {
    /// Parse a configuration from JSON text.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Render as pretty-printed JSON, the format `load` reads.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Read and parse a JSON configuration file.
    pub fn load(path: impl AsRef<Path>) -> io::Result<Self> {
        let data = fs::read(path)?;
        serde_json::from_slice(&data).map_err(io::Error::other)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
