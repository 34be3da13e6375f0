//! # Protocol Discovery Contract
//!
//! The capability set a discovery protocol exposes to the scanner. The scanner owns host
//! enumeration, dialing and concurrency; a protocol only decides which ports are worth
//! probing, what to do with an open connection and how to turn what it found into a
//! [`DiscoveredDevice`].

use std::time::Duration;

use async_trait::async_trait;
use tracing::Span;

use crate::error::{ConvertError, ProbeError};
use crate::models::{DiscoveredDevice, OnvifDevice};
use crate::network::transport::Connection;

/// Per-scan parameters passed to every hook.
#[derive(Debug, Clone)]
pub struct ScanParams {
    /// Upper bound for a single probe attempt, write and read loop included.
    pub timeout: Duration,
    /// Span all probe logging is recorded under.
    pub span: Span,
}

impl ScanParams {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            span: Span::current(),
        }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }
}

/// Protocol specific data attached to a probe result.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ProbePayload {
    Onvif(OnvifDevice),
}

impl ProbePayload {
    pub fn kind(&self) -> &'static str {
        match self {
            ProbePayload::Onvif(_) => "onvif",
        }
    }

    /// Stable identity of the device behind the payload, if it announced one.
    ///
    /// For ONVIF this is the trimmed endpoint reference, which stays the same across
    /// ports, XAddrs and discovery modes.
    pub fn device_key(&self) -> Option<&str> {
        match self {
            ProbePayload::Onvif(device) => {
                let key = device.endpoint_ref_address.trim();
                (!key.is_empty()).then_some(key)
            }
        }
    }
}

/// One device found behind a dialed host:port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResult {
    pub host: String,
    pub port: u16,
    pub data: ProbePayload,
}

#[async_trait]
pub trait ProtocolDiscovery: Send + Sync {
    /// Human readable protocol name, used in logs and descriptions.
    fn name(&self) -> &'static str;

    /// Returns the ports of `host` that should actually be probed.
    ///
    /// An empty result skips the host entirely. This is the hook for not rediscovering
    /// devices that are already known.
    fn probe_filter(&self, host: &str, ports: &[u16]) -> Vec<u16>;

    /// Verifies whether there are devices at the other end of `conn`.
    ///
    /// A silent endpoint yields `Ok(vec![])`.
    async fn on_connection_dialed(
        &self,
        host: &str,
        port: u16,
        conn: Connection,
        params: &ScanParams,
    ) -> Result<Vec<ProbeResult>, ProbeError>;

    /// Transforms a raw probe result into a named device record.
    async fn convert_probe_result(
        &self,
        probe_result: ProbeResult,
        params: &ScanParams,
    ) -> Result<DiscoveredDevice, ConvertError>;
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
