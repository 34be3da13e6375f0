//! # Device Models
//!
//! The data that flows from a raw probe response to the record handed back to the
//! device inventory.
//!
//! * [`OnvifDevice`]: a decoded WS-Discovery match (XAddr + endpoint reference).
//! * [`ProtocolProperties`]: the per-protocol key/value bag persisted with a device.
//! * [`DiscoveredDevice`]: the final, named record.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Name under which ONVIF properties are stored in a [`ProtocolMap`].
pub const ONVIF_PROTOCOL: &str = "Onvif";

pub const ADDRESS: &str = "Address";
pub const PORT: &str = "Port";
pub const AUTH_MODE: &str = "AuthMode";
pub const SECRET_PATH: &str = "SecretPath";
pub const ENDPOINT_REF_ADDRESS: &str = "EndpointRefAddress";
pub const MANUFACTURER: &str = "Manufacturer";
pub const MODEL: &str = "Model";
pub const FIRMWARE_VERSION: &str = "FirmwareVersion";
pub const SERIAL_NUMBER: &str = "SerialNumber";
pub const HARDWARE_ID: &str = "HardwareId";

pub const AUTO_DISCOVERY_LABEL: &str = "auto-discovery";

/// A device as announced in a WS-Discovery `ProbeMatch`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OnvifDevice {
    /// First service address from `XAddrs`, e.g. `http://10.0.0.5/onvif/device_service`.
    pub xaddr: String,
    /// `EndpointReference/Address`, usually `urn:uuid:...`. May be empty for broken firmware.
    pub endpoint_ref_address: String,
}

impl OnvifDevice {
    pub fn new(xaddr: impl Into<String>, endpoint_ref_address: impl Into<String>) -> Self {
        Self {
            xaddr: xaddr.into(),
            endpoint_ref_address: endpoint_ref_address.into(),
        }
    }

    /// Splits the XAddr into host and port.
    ///
    /// Accepts both full URLs and bare `host[:port]`. The port defaults to the scheme's
    /// well-known port (80 unless the scheme is `https`).
    pub fn address_and_port(&self) -> (String, String) {
        let (scheme, rest) = match self.xaddr.split_once("://") {
            Some((scheme, rest)) => (scheme, rest),
            None => ("http", self.xaddr.as_str()),
        };
        let authority = rest.split(['/', '?', '#']).next().unwrap_or_default();
        let authority = authority.rsplit('@').next().unwrap_or(authority);
        let default_port = if scheme.eq_ignore_ascii_case("https") { "443" } else { "80" };

        // Bracketed IPv6 literal
        if let Some(stripped) = authority.strip_prefix('[') {
            if let Some((host, tail)) = stripped.split_once(']') {
                let port = tail.strip_prefix(':').filter(|p| !p.is_empty());
                return (host.to_string(), port.unwrap_or(default_port).to_string());
            }
        }

        match authority.split_once(':') {
            Some((host, port)) if !port.is_empty() => (host.to_string(), port.to_string()),
            Some((host, _)) => (host.to_string(), default_port.to_string()),
            None => (authority.to_string(), default_port.to_string()),
        }
    }
}

/// How the identification client authenticates against a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMode {
    /// Anonymous requests.
    None,
    /// WS-Security UsernameToken with a password digest.
    #[default]
    UsernameToken,
    /// HTTP Digest authentication, answered when the device challenges the request.
    Digest,
    /// UsernameToken in the envelope, plus HTTP Digest when challenged.
    Both,
}

impl AuthMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthMode::None => "none",
            AuthMode::UsernameToken => "usernametoken",
            AuthMode::Digest => "digest",
            AuthMode::Both => "both",
        }
    }

    pub fn uses_username_token(&self) -> bool {
        matches!(self, AuthMode::UsernameToken | AuthMode::Both)
    }

    pub fn uses_http_digest(&self) -> bool {
        matches!(self, AuthMode::Digest | AuthMode::Both)
    }
}

impl fmt::Display for AuthMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuthMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(AuthMode::None),
            "usernametoken" => Ok(AuthMode::UsernameToken),
            "digest" => Ok(AuthMode::Digest),
            "both" => Ok(AuthMode::Both),
            _ => Err(ConfigError::UnknownValue {
                what: "auth mode",
                value: s.to_string(),
            }),
        }
    }
}

/// Property bag of one protocol. Ordered so records print and serialize deterministically.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProtocolProperties(BTreeMap<String, String>);

impl ProtocolProperties {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        self.0.insert(key.to_string(), value.into());
    }

    pub fn with(mut self, key: &str, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Protocol name -> properties, as stored on a device.
pub type ProtocolMap = BTreeMap<String, ProtocolProperties>;

/// Descriptive metadata returned by `GetDeviceInformation`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceInformation {
    pub manufacturer: String,
    pub model: String,
    pub firmware_version: String,
    pub serial_number: String,
    pub hardware_id: String,
}

/// The record handed back to the device inventory, one per valid probe match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiscoveredDevice {
    pub name: String,
    pub protocols: ProtocolMap,
    pub description: String,
    pub labels: Vec<String>,
}

impl DiscoveredDevice {
    pub fn onvif_properties(&self) -> Option<&ProtocolProperties> {
        self.protocols.get(ONVIF_PROTOCOL)
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
