//! Raw unicast WS-Discovery probe over an already dialed packet connection.

use std::io;
use std::net::SocketAddr;

use tokio::time::{Instant, timeout_at};
use tracing::{debug, trace};
use uuid::Uuid;

use camscout_common::discovery::ScanParams;
use camscout_common::error::ProbeError;
use camscout_common::models::OnvifDevice;
use camscout_common::network::transport::PacketConn;
use camscout_protocols::wsdiscovery;

/// Largest datagram kept per read; longer responses are truncated.
pub const BUF_SIZE: usize = 8192;

/// Sends one probe and decodes everything that answers before the deadline.
///
/// A silent endpoint or an endpoint that only sent unrelated SOAP yields `Ok(vec![])`.
pub async fn execute_raw_probe(
    conn: &dyn PacketConn,
    params: &ScanParams,
) -> Result<Vec<OnvifDevice>, ProbeError> {
    let addr: SocketAddr = conn.remote_addr().map_err(ProbeError::PeerAddr)?;
    let probe: String = wsdiscovery::build_onvif_probe(&Uuid::new_v4().to_string());

    let deadline: Instant = Instant::now()
        .checked_add(params.timeout)
        .ok_or(ProbeError::Deadline {
            addr,
            timeout: params.timeout,
        })?;

    match timeout_at(deadline, conn.send(probe.as_bytes())).await {
        Ok(Ok(_)) => {}
        Ok(Err(source)) => return Err(ProbeError::Write { addr, source }),
        Err(_elapsed) => return Err(ProbeError::WriteTimeout { addr }),
    }

    let responses: Vec<String> = read_responses(conn, deadline).await;
    if responses.is_empty() {
        // Trace only: on a UDP sweep nearly every host ends up here.
        trace!("{addr}: No Response");
        return Ok(Vec::new());
    }
    for (i, resp) in responses.iter().enumerate() {
        debug!("{addr}: Response {} of {}: {resp}", i + 1, responses.len());
    }

    let devices = wsdiscovery::devices_from_probe_responses(&responses)?;
    if devices.is_empty() {
        debug!("{addr}: no devices matched from probe response");
    }
    Ok(devices)
}

/// Reads datagrams until `deadline` or the first non-timeout error, in arrival order.
pub async fn read_responses(conn: &dyn PacketConn, deadline: Instant) -> Vec<String> {
    let mut responses: Vec<String> = Vec::new();
    let mut buf = vec![0u8; BUF_SIZE];

    loop {
        match timeout_at(deadline, conn.recv_from(&mut buf)).await {
            Err(_elapsed) => break,
            Ok(Err(e)) if is_timeout(&e) => break,
            Ok(Err(e)) => {
                debug!("Unexpected error occurred while reading ws-discovery responses: {e}");
                break;
            }
            Ok(Ok((n, _from))) => {
                responses.push(String::from_utf8_lossy(&buf[..n]).into_owned());
            }
        }
    }

    responses
}

fn is_timeout(e: &io::Error) -> bool {
    matches!(e.kind(), io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock)
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
