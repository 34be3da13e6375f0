//! Scripted fakes shared by the plugin's unit tests.

use std::collections::{HashMap, VecDeque};
use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use camscout_common::error::IdentifyError;
use camscout_common::identify::DeviceInformationProvider;
use camscout_common::models::{DeviceInformation, ONVIF_PROTOCOL, ProtocolMap, SECRET_PATH};
use camscout_common::network::transport::PacketConn;

pub(crate) enum Step {
    /// Deliver a datagram after the delay.
    Reply(Duration, String),
    /// Fail the read after the delay.
    Fail(Duration, io::ErrorKind),
}

/// A packet connection that replays a fixed script, then goes silent.
pub(crate) struct ScriptedConn {
    steps: Mutex<VecDeque<Step>>,
    sent: Mutex<Vec<String>>,
    fail_writes: bool,
    addr: SocketAddr,
}

impl ScriptedConn {
    pub(crate) fn new(steps: Vec<Step>) -> Self {
        Self {
            steps: Mutex::new(steps.into()),
            sent: Mutex::new(Vec::new()),
            fail_writes: false,
            addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 5)), 3702),
        }
    }

    pub(crate) fn failing_writes(mut self) -> Self {
        self.fail_writes = true;
        self
    }

    pub(crate) fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl PacketConn for ScriptedConn {
    async fn send(&self, payload: &[u8]) -> io::Result<usize> {
        if self.fail_writes {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "socket closed"));
        }
        self.sent
            .lock()
            .unwrap()
            .push(String::from_utf8_lossy(payload).into_owned());
        Ok(payload.len())
    }

    async fn recv_from(&self, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)> {
        let step = self.steps.lock().unwrap().pop_front();
        match step {
            None => std::future::pending().await,
            Some(Step::Reply(delay, body)) => {
                tokio::time::sleep(delay).await;
                let n = body.len().min(buf.len());
                buf[..n].copy_from_slice(&body.as_bytes()[..n]);
                Ok((n, self.addr))
            }
            Some(Step::Fail(delay, kind)) => {
                tokio::time::sleep(delay).await;
                Err(io::Error::from(kind))
            }
        }
    }

    fn remote_addr(&self) -> io::Result<SocketAddr> {
        Ok(self.addr)
    }
}

/// Identification backend that only answers for known secret paths.
pub(crate) struct FakeInformationProvider {
    by_secret_path: HashMap<String, DeviceInformation>,
    calls: Mutex<Vec<String>>,
}

impl FakeInformationProvider {
    pub(crate) fn new() -> Self {
        Self {
            by_secret_path: HashMap::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn answering(mut self, secret_path: &str, info: DeviceInformation) -> Self {
        self.by_secret_path.insert(secret_path.to_string(), info);
        self
    }

    /// Secret paths used, in call order.
    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl DeviceInformationProvider for FakeInformationProvider {
    async fn device_information(
        &self,
        protocols: &ProtocolMap,
    ) -> Result<DeviceInformation, IdentifyError> {
        let secret_path = protocols
            .get(ONVIF_PROTOCOL)
            .and_then(|p| p.get(SECRET_PATH))
            .ok_or(IdentifyError::MissingProperty(SECRET_PATH))?
            .to_string();
        self.calls.lock().unwrap().push(secret_path.clone());

        self.by_secret_path
            .get(&secret_path)
            .cloned()
            .ok_or_else(|| IdentifyError::Fault("Sender not Authorized".to_string()))
    }
}

pub(crate) fn acme_cam() -> DeviceInformation {
    DeviceInformation {
        manufacturer: "Acme Corp".to_string(),
        model: "Cam 1".to_string(),
        firmware_version: "1.0.4".to_string(),
        serial_number: "SN-0001".to_string(),
        hardware_id: "HW-1".to_string(),
    }
}

pub(crate) fn probe_match(endpoint_ref: &str, xaddr: &str) -> String {
    format!(
        concat!(
            r#"<s:Envelope xmlns:s="http://www.w3.org/2003/05/soap-envelope" "#,
            r#"xmlns:a="http://schemas.xmlsoap.org/ws/2004/08/addressing" "#,
            r#"xmlns:d="http://schemas.xmlsoap.org/ws/2005/04/discovery">"#,
            r#"<s:Body><d:ProbeMatches><d:ProbeMatch>"#,
            r#"<a:EndpointReference><a:Address>{}</a:Address></a:EndpointReference>"#,
            r#"<d:XAddrs>{}</d:XAddrs>"#,
            r#"</d:ProbeMatch></d:ProbeMatches></s:Body></s:Envelope>"#,
        ),
        endpoint_ref, xaddr
    )
}
