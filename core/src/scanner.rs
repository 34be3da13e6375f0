//! Unicast sweep: dial every target host:port and hand the connection to the protocol.
//!
//! The scanner owns enumeration, dialing and the concurrency bound. What counts as a
//! device is entirely up to the [`ProtocolDiscovery`] implementation.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio::task::{JoinError, JoinSet};
use tracing::{debug, debug_span, error};

use camscout_common::config::Config;
use camscout_common::discovery::{ProbeResult, ProtocolDiscovery, ScanParams};
use camscout_common::network::range::IpCollection;
use camscout_common::network::transport::Connection;

use crate::network::{dial, multicast};

/// Called with the running number of probe results found so far.
pub type ProgressCallback = Arc<dyn Fn(usize) + Send + Sync>;

#[derive(Debug, Clone)]
pub struct ScanOptions {
    pub ports: Vec<u16>,
    pub timeout: Duration,
    pub max_concurrency: usize,
    pub multicast_group: SocketAddr,
}

impl From<&Config> for ScanOptions {
    fn from(config: &Config) -> Self {
        Self {
            ports: config.ports.clone(),
            timeout: config.probe_timeout(),
            max_concurrency: config.max_concurrency,
            multicast_group: multicast::default_group(),
        }
    }
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

/// Probes every host of `targets` on the ports the protocol keeps after filtering.
///
/// Failed dials and failed probes are logged and skipped. Results come back in target
/// order, whatever order the probes finished in.
pub async fn netscan(
    protocol: Arc<dyn ProtocolDiscovery>,
    targets: IpCollection,
    options: &ScanOptions,
    on_found: Option<ProgressCallback>,
) -> Vec<ProbeResult> {
    let limit = options.max_concurrency.max(1);
    let found = Arc::new(AtomicUsize::new(0));
    let mut tasks: JoinSet<(usize, Vec<ProbeResult>)> = JoinSet::new();
    let mut collected: Vec<(usize, Vec<ProbeResult>)> = Vec::new();
    let mut slot: usize = 0;

    for ip in targets {
        let host = ip.to_string();
        for port in protocol.probe_filter(&host, &options.ports) {
            // At most `limit` probes in flight; a finished one frees its slot.
            if tasks.len() >= limit {
                if let Some(joined) = tasks.join_next().await {
                    keep_results(&mut collected, joined);
                }
            }

            let protocol = protocol.clone();
            let found = found.clone();
            let on_found = on_found.clone();
            let timeout = options.timeout;
            let host = host.clone();
            let index = slot;
            slot += 1;

            tasks.spawn(async move {
                let results = probe_one(protocol.as_ref(), ip, &host, port, timeout).await;
                if !results.is_empty() {
                    let total = found.fetch_add(results.len(), Ordering::Relaxed) + results.len();
                    if let Some(cb) = on_found {
                        cb(total);
                    }
                }
                (index, results)
            });
        }
    }

    while let Some(joined) = tasks.join_next().await {
        keep_results(&mut collected, joined);
    }
    collected.sort_by_key(|(index, _)| *index);
    collected.into_iter().flat_map(|(_, results)| results).collect()
}

fn keep_results(
    collected: &mut Vec<(usize, Vec<ProbeResult>)>,
    joined: Result<(usize, Vec<ProbeResult>), JoinError>,
) {
    match joined {
        Ok((_, results)) if results.is_empty() => {}
        Ok(entry) => collected.push(entry),
        Err(e) => error!("Probe task failed: {e}"),
    }
}

async fn probe_one(
    protocol: &dyn ProtocolDiscovery,
    ip: IpAddr,
    host: &str,
    port: u16,
    timeout: Duration,
) -> Vec<ProbeResult> {
    let addr = SocketAddr::new(ip, port);
    let socket = match dial::dial_udp(addr).await {
        Ok(socket) => socket,
        Err(e) => {
            debug!("{addr}: failed to dial: {e}");
            return Vec::new();
        }
    };

    let params = ScanParams::new(timeout).with_span(debug_span!("probe", %addr));
    match protocol
        .on_connection_dialed(host, port, Connection::packet(socket), &params)
        .await
    {
        Ok(results) => results,
        Err(e) => {
            debug!("{} probe of {addr} failed: {e}", protocol.name());
            Vec::new()
        }
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
