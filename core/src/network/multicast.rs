//! WS-Discovery over the multicast group instead of per-host unicast.

use std::io;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use tokio::net::UdpSocket;
use tracing::debug_span;

use camscout_common::config::WS_DISCOVERY_PORT;
use camscout_common::discovery::{ProbePayload, ProbeResult, ProtocolDiscovery, ScanParams};
use camscout_common::network::transport::{Connection, PacketConn};

pub const WS_DISCOVERY_GROUP_V4: Ipv4Addr = Ipv4Addr::new(239, 255, 255, 250);

pub fn default_group() -> SocketAddr {
    SocketAddr::V4(SocketAddrV4::new(WS_DISCOVERY_GROUP_V4, WS_DISCOVERY_PORT))
}

/// Unconnected socket that sends to the group and accepts answers from anyone.
pub struct MulticastConn {
    socket: UdpSocket,
    group: SocketAddr,
}

impl MulticastConn {
    pub async fn bind(group: SocketAddr) -> io::Result<Self> {
        let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)).await?;
        // Discovery stays on the local segment
        socket.set_multicast_ttl_v4(1)?;
        Ok(Self { socket, group })
    }
}

#[async_trait]
impl PacketConn for MulticastConn {
    async fn send(&self, payload: &[u8]) -> io::Result<usize> {
        self.socket.send_to(payload, self.group).await
    }

    async fn recv_from(&self, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)> {
        self.socket.recv_from(buf).await
    }

    fn remote_addr(&self) -> io::Result<SocketAddr> {
        Ok(self.group)
    }
}

/// Sends one probe to `group` and attributes every answer to the host in its XAddr.
pub async fn probe_group(
    protocol: &dyn ProtocolDiscovery,
    group: SocketAddr,
    timeout: Duration,
) -> anyhow::Result<Vec<ProbeResult>> {
    let conn = MulticastConn::bind(group)
        .await
        .context("Failed to open multicast discovery socket")?;
    let params = ScanParams::new(timeout).with_span(debug_span!("multicast", %group));

    let results = protocol
        .on_connection_dialed(
            &group.ip().to_string(),
            group.port(),
            Connection::packet(conn),
            &params,
        )
        .await
        .with_context(|| format!("Multicast probe to {group} failed"))?;

    Ok(results.into_iter().map(attribute_to_responder).collect())
}

fn attribute_to_responder(mut result: ProbeResult) -> ProbeResult {
    if let ProbePayload::Onvif(device) = &result.data {
        result.host = device.address_and_port().0;
    }
    result
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
