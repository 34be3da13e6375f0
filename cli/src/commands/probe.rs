use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use anyhow::Context;
use colored::*;

use camscout_common::config::DEFAULT_PROBE_TIMEOUT;
use camscout_common::discovery::ScanParams;
use camscout_core::network::dial;
use camscout_plugins::onvif::probe;

use crate::terminal::{colors, print};

/// Raw probe without identification, handy to check a single camera's WS-Discovery answer.
pub async fn probe(
    ip: IpAddr,
    port: u16,
    timeout: Option<Duration>,
    quiet: u8,
) -> anyhow::Result<()> {
    let addr = SocketAddr::new(ip, port);
    let socket = dial::dial_udp(addr)
        .await
        .with_context(|| format!("Failed to dial {addr}"))?;
    let params = ScanParams::new(timeout.unwrap_or(DEFAULT_PROBE_TIMEOUT));

    let devices = probe::execute_raw_probe(&socket, &params).await?;

    print::header(&format!("probe matches from {addr}"), quiet);
    if devices.is_empty() {
        print::no_results(quiet);
        return Ok(());
    }
    for (idx, device) in devices.iter().enumerate() {
        let endpoint_ref = if device.endpoint_ref_address.is_empty() {
            "<empty endpoint reference>"
        } else {
            device.endpoint_ref_address.as_str()
        };
        print::tree_head(idx, endpoint_ref);
        print::as_tree_one_level(vec![(
            "XAddr".to_string(),
            device.xaddr.color(colors::ADDRESS),
        )]);
    }
    Ok(())
}
