//! File backed credential lookup.
//!
//! The file maps a secret path to a username/password pair:
//!
//! ```toml
//! [credentials001]
//! username = "admin"
//! password = "admin123"
//!
//! ["urn:uuid:1419d68a-1dd2-11b2-a105-f0a9b8c9d0e1"]
//! username = "lobby"
//! password = "s3cret"
//! ```

use std::collections::HashMap;
use std::path::Path;

use camscout_common::error::SecretError;
use camscout_common::identify::{Credentials, SecretProvider};

/// Loaded once, then only read, so it can be shared by every identification in flight.
#[derive(Debug, Default, Clone)]
pub struct CredentialStore {
    entries: HashMap<String, Credentials>,
}

impl CredentialStore {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SecretError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| SecretError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&content).map_err(|message| SecretError::Parse {
            path: path.display().to_string(),
            message,
        })
    }

    fn from_toml(content: &str) -> Result<Self, String> {
        let entries: HashMap<String, Credentials> =
            toml::from_str(content).map_err(|e| e.to_string())?;
        Ok(Self { entries })
    }

    pub fn from_map(entries: HashMap<String, Credentials>) -> Self {
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl SecretProvider for CredentialStore {
    fn credentials(&self, secret_path: &str) -> Result<Credentials, SecretError> {
        self.entries
            .get(secret_path)
            .cloned()
            .ok_or_else(|| SecretError::NotFound(secret_path.to_string()))
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
