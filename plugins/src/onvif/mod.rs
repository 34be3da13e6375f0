//! # ONVIF Discovery
//!
//! WS-Discovery based discovery of ONVIF network video transmitters.
//!
//! * [`probe`]: one unicast probe and the deadline bounded read loop.
//! * [`identify`]: `GetDeviceInformation` with the per-device credential fallback.
//! * [`device`]: naming, description and labels of the final record.

pub mod device;
pub mod identify;
pub mod probe;

#[cfg(test)]
pub(crate) mod testing;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{Instrument, debug};

use camscout_common::discovery::{ProbePayload, ProbeResult, ProtocolDiscovery, ScanParams};
use camscout_common::error::{ConvertError, ProbeError};
use camscout_common::identify::DeviceInformationProvider;
use camscout_common::models::{DiscoveredDevice, ONVIF_PROTOCOL};
use camscout_common::network::transport::Connection;

pub use device::OnvifSettings;

type PortFilter = dyn Fn(&str, &[u16]) -> Vec<u16> + Send + Sync;

pub struct OnvifProtocolDiscovery {
    info_provider: Arc<dyn DeviceInformationProvider>,
    settings: OnvifSettings,
    port_filter: Option<Box<PortFilter>>,
}

impl OnvifProtocolDiscovery {
    pub fn new(info_provider: Arc<dyn DeviceInformationProvider>, settings: OnvifSettings) -> Self {
        Self {
            info_provider,
            settings,
            port_filter: None,
        }
    }

    /// Replaces the default pass-through port filter, e.g. to skip hosts already in the
    /// inventory.
    pub fn with_probe_filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&str, &[u16]) -> Vec<u16> + Send + Sync + 'static,
    {
        self.port_filter = Some(Box::new(filter));
        self
    }

    pub fn settings(&self) -> &OnvifSettings {
        &self.settings
    }
}

#[async_trait]
impl ProtocolDiscovery for OnvifProtocolDiscovery {
    fn name(&self) -> &'static str {
        ONVIF_PROTOCOL
    }

    fn probe_filter(&self, host: &str, ports: &[u16]) -> Vec<u16> {
        match &self.port_filter {
            Some(filter) => filter(host, ports),
            None => ports.to_vec(),
        }
    }

    async fn on_connection_dialed(
        &self,
        host: &str,
        port: u16,
        conn: Connection,
        params: &ScanParams,
    ) -> Result<Vec<ProbeResult>, ProbeError> {
        let packet_conn = match conn {
            Connection::Packet(packet_conn) => packet_conn,
            Connection::Stream(_) => {
                let err = ProbeError::UnsupportedTransport {
                    protocol: ONVIF_PROTOCOL,
                };
                debug!("{host}:{port}: {err}");
                return Err(err);
            }
        };

        let devices = probe::execute_raw_probe(packet_conn.as_ref(), params)
            .instrument(params.span.clone())
            .await
            .inspect_err(|e| debug!("{host}:{port}: {e}"))?;

        Ok(devices
            .into_iter()
            .map(|device| ProbeResult {
                host: host.to_string(),
                port,
                data: ProbePayload::Onvif(device),
            })
            .collect())
    }

    async fn convert_probe_result(
        &self,
        probe_result: ProbeResult,
        params: &ScanParams,
    ) -> Result<DiscoveredDevice, ConvertError> {
        let device = match probe_result.data {
            ProbePayload::Onvif(device) => device,
            other => {
                return Err(ConvertError::UnexpectedPayload {
                    expected: ONVIF_PROTOCOL,
                    actual: other.kind(),
                });
            }
        };

        device::create_discovered_device(self.info_provider.as_ref(), &self.settings, device)
            .instrument(params.span.clone())
            .await
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
