//! Outbound ports used while identifying a device.

use async_trait::async_trait;

use crate::error::{IdentifyError, SecretError};
use crate::models::{DeviceInformation, ProtocolMap};

/// Retrieves descriptive metadata from a device.
///
/// Implementations read everything they need (address, port, auth mode, secret path) from
/// the protocol properties and must be safe to call from many probes at once.
#[async_trait]
pub trait DeviceInformationProvider: Send + Sync {
    async fn device_information(
        &self,
        protocols: &ProtocolMap,
    ) -> Result<DeviceInformation, IdentifyError>;
}

#[derive(Clone, PartialEq, Eq, serde::Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Read-only credential lookup keyed by secret path.
pub trait SecretProvider: Send + Sync {
    fn credentials(&self, secret_path: &str) -> Result<Credentials, SecretError>;
}
