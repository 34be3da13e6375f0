//! # Camera Discovery Service
//!
//! Implements the "find cameras" use case.
//!
//! Probing is delegated to the [`scanner`](crate::scanner) and the multicast helper; turning
//! what they found into named records is delegated to the [`ProtocolDiscovery`]
//! implementation. This service only sequences the two and merges the outcome.

use std::collections::HashSet;
use std::sync::Arc;

use anyhow::Context;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use camscout_common::config::{Config, DiscoveryMode};
use camscout_common::discovery::{ProbeResult, ProtocolDiscovery, ScanParams};
use camscout_common::identify::SecretProvider;
use camscout_common::models::DiscoveredDevice;
use camscout_common::network::range::IpCollection;
use camscout_plugins::onvif::{OnvifProtocolDiscovery, OnvifSettings};

use crate::identify::OnvifInformationClient;
use crate::network::multicast;
use crate::scanner::{self, ProgressCallback, ScanOptions};
use crate::secrets::CredentialStore;

/// Application service for camera discovery.
///
/// Depends on the protocol only through the [`ProtocolDiscovery`] trait object, so other
/// discovery protocols plug in without touching the scan logic.
pub struct DiscoveryService {
    protocol: Arc<dyn ProtocolDiscovery>,
    mode: DiscoveryMode,
    options: ScanOptions,
}

impl DiscoveryService {
    pub fn new(
        protocol: Arc<dyn ProtocolDiscovery>,
        mode: DiscoveryMode,
        options: ScanOptions,
    ) -> Self {
        Self {
            protocol,
            mode,
            options,
        }
    }

    /// Wires the ONVIF protocol, the identification client and the credential store from
    /// `config`.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let secrets: Arc<dyn SecretProvider> = match &config.credentials_file {
            Some(path) => {
                let store = CredentialStore::from_file(path)?;
                debug!("Loaded {} credential entries from {}", store.len(), path.display());
                Arc::new(store)
            }
            None => Arc::new(CredentialStore::default()),
        };

        let client = OnvifInformationClient::new(secrets, config.probe_timeout())
            .context("Failed to build the device information HTTP client")?;
        let onvif = OnvifProtocolDiscovery::new(
            Arc::new(client),
            OnvifSettings {
                default_auth_mode: config.default_auth_mode,
                default_secret_path: config.default_secret_path.clone(),
            },
        );

        Ok(Self::new(Arc::new(onvif), config.mode, ScanOptions::from(config)))
    }

    pub fn mode(&self) -> DiscoveryMode {
        self.mode
    }

    pub fn options(&self) -> &ScanOptions {
        &self.options
    }

    /// Runs a full discovery pass.
    ///
    /// 1. **Probing**: unicast sweep over `targets` and/or one multicast probe.
    /// 2. **Merge**: probe results announcing the same device are collapsed, first one
    ///    wins, so every device is identified once.
    /// 3. **Conversion**: every remaining result becomes a record; results that cannot be
    ///    attributed to a device are logged and dropped. Records sharing a name are merged.
    pub async fn perform_discovery(
        &self,
        targets: IpCollection,
        on_found: Option<ProgressCallback>,
    ) -> anyhow::Result<Vec<DiscoveredDevice>> {
        let mut results: Vec<ProbeResult> = Vec::new();

        if self.mode.includes_netscan() {
            info!(
                "Probing {} hosts on ports {:?} for {} devices",
                targets.len(),
                self.options.ports,
                self.protocol.name()
            );
            let found =
                scanner::netscan(self.protocol.clone(), targets, &self.options, on_found).await;
            results.extend(found);
        }

        if self.mode.includes_multicast() {
            let group = self.options.multicast_group;
            let probed =
                multicast::probe_group(self.protocol.as_ref(), group, self.options.timeout).await;
            match probed {
                Ok(found) => results.extend(found),
                Err(e) if self.mode.includes_netscan() => warn!("{e:#}"),
                Err(e) => return Err(e),
            }
        }

        let devices = self.convert_all(dedup_by_device(results)).await;
        Ok(dedup_by_name(devices))
    }

    async fn convert_all(&self, results: Vec<ProbeResult>) -> Vec<DiscoveredDevice> {
        let semaphore = Arc::new(Semaphore::new(self.options.max_concurrency.max(1)));
        let mut tasks: JoinSet<(usize, Option<DiscoveredDevice>)> = JoinSet::new();

        for (index, result) in results.into_iter().enumerate() {
            let Ok(permit) = semaphore.clone().acquire_owned().await else {
                break;
            };
            let protocol = self.protocol.clone();
            let params = ScanParams::new(self.options.timeout);

            tasks.spawn(async move {
                let _permit = permit;
                let host = result.host.clone();
                match protocol.convert_probe_result(result, &params).await {
                    Ok(device) => (index, Some(device)),
                    Err(e) => {
                        warn!("Skipping probe result from {host}: {e}");
                        (index, None)
                    }
                }
            });
        }

        let mut converted: Vec<(usize, DiscoveredDevice)> = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, Some(device))) => converted.push((index, device)),
                Ok((_, None)) => {}
                Err(e) => error!("Conversion task failed: {e}"),
            }
        }
        converted.sort_by_key(|(index, _)| *index);
        converted.into_iter().map(|(_, device)| device).collect()
    }
}

/// Keeps the first result per device key. Results without a key pass through so the
/// protocol can reject them during conversion.
fn dedup_by_device(results: Vec<ProbeResult>) -> Vec<ProbeResult> {
    let mut seen: HashSet<String> = HashSet::new();
    results
        .into_iter()
        .filter(|result| match result.data.device_key() {
            Some(key) => seen.insert(key.to_string()),
            None => true,
        })
        .collect()
}

fn dedup_by_name(devices: Vec<DiscoveredDevice>) -> Vec<DiscoveredDevice> {
    let mut seen: HashSet<String> = HashSet::new();
    devices
        .into_iter()
        .filter(|device| seen.insert(device.name.clone()))
        .collect()
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
