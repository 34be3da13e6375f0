//! In-process stand-ins for a camera: a WS-Discovery responder and a device service.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream, UdpSocket};

use camscout_protocols::httpdigest::DigestChallenge;

pub fn probe_match(endpoint_ref: &str, xaddr: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<SOAP-ENV:Envelope xmlns:SOAP-ENV="http://www.w3.org/2003/05/soap-envelope"
    xmlns:wsa="http://schemas.xmlsoap.org/ws/2004/08/addressing"
    xmlns:d="http://schemas.xmlsoap.org/ws/2005/04/discovery"
    xmlns:dn="http://www.onvif.org/ver10/network/wsdl">
  <SOAP-ENV:Body>
    <d:ProbeMatches>
      <d:ProbeMatch>
        <wsa:EndpointReference><wsa:Address>{endpoint_ref}</wsa:Address></wsa:EndpointReference>
        <d:Types>dn:NetworkVideoTransmitter</d:Types>
        <d:XAddrs>{xaddr}</d:XAddrs>
        <d:MetadataVersion>1</d:MetadataVersion>
      </d:ProbeMatch>
    </d:ProbeMatches>
  </SOAP-ENV:Body>
</SOAP-ENV:Envelope>"#
    )
}

/// Answers every ONVIF probe with the configured datagrams.
pub struct DiscoveryResponder {
    pub addr: SocketAddr,
    probes: Arc<Mutex<Vec<String>>>,
}

impl DiscoveryResponder {
    pub async fn start(replies: Vec<String>) -> Self {
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = socket.local_addr().unwrap();
        let probes = Arc::new(Mutex::new(Vec::new()));
        let seen = probes.clone();

        tokio::spawn(async move {
            let mut buf = vec![0u8; 8192];
            while let Ok((n, from)) = socket.recv_from(&mut buf).await {
                let probe = String::from_utf8_lossy(&buf[..n]).into_owned();
                let wants_cameras = probe.contains("NetworkVideoTransmitter");
                seen.lock().unwrap().push(probe);
                if !wants_cameras {
                    continue;
                }
                for reply in &replies {
                    let _ = socket.send_to(reply.as_bytes(), from).await;
                }
            }
        });

        Self { addr, probes }
    }

    pub fn probes(&self) -> Vec<String> {
        self.probes.lock().unwrap().clone()
    }
}

const DEVICE_INFORMATION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<SOAP-ENV:Envelope xmlns:SOAP-ENV="http://www.w3.org/2003/05/soap-envelope"
    xmlns:tds="http://www.onvif.org/ver10/device/wsdl">
  <SOAP-ENV:Body>
    <tds:GetDeviceInformationResponse>
      <tds:Manufacturer>Acme Corp</tds:Manufacturer>
      <tds:Model>Cam 1</tds:Model>
      <tds:FirmwareVersion>1.0.4</tds:FirmwareVersion>
      <tds:SerialNumber>SN-0001</tds:SerialNumber>
      <tds:HardwareId>HW-1</tds:HardwareId>
    </tds:GetDeviceInformationResponse>
  </SOAP-ENV:Body>
</SOAP-ENV:Envelope>"#;

const NOT_AUTHORIZED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<SOAP-ENV:Envelope xmlns:SOAP-ENV="http://www.w3.org/2003/05/soap-envelope">
  <SOAP-ENV:Body>
    <SOAP-ENV:Fault>
      <SOAP-ENV:Code><SOAP-ENV:Value>SOAP-ENV:Sender</SOAP-ENV:Value></SOAP-ENV:Code>
      <SOAP-ENV:Reason><SOAP-ENV:Text xml:lang="en">Sender not Authorized</SOAP-ENV:Text></SOAP-ENV:Reason>
    </SOAP-ENV:Fault>
  </SOAP-ENV:Body>
</SOAP-ENV:Envelope>"#;

/// Minimal ONVIF device service: answers `GetDeviceInformation` for one username only.
pub struct DeviceService {
    pub addr: SocketAddr,
    requests: Arc<Mutex<Vec<String>>>,
}

impl DeviceService {
    /// `accepted_user: None` accepts anonymous requests too.
    pub async fn start(accepted_user: Option<&'static str>) -> Self {
        Self::start_rejecting_first(accepted_user, 0).await
    }

    /// Like [`DeviceService::start`], but refuses the first `rejected` requests whatever
    /// credentials they carry.
    pub async fn start_rejecting_first(
        accepted_user: Option<&'static str>,
        rejected: usize,
    ) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let seen = requests.clone();
        let answered = Arc::new(AtomicUsize::new(0));

        tokio::spawn(async move {
            while let Ok((mut stream, _)) = listener.accept().await {
                let seen = seen.clone();
                let answered = answered.clone();
                tokio::spawn(async move {
                    let Ok((_, body)) = read_request(&mut stream).await else {
                        return;
                    };
                    let refused = answered.fetch_add(1, Ordering::SeqCst) < rejected;
                    let authorized = match accepted_user {
                        Some(user) => {
                            body.contains(&format!("<wsse:Username>{user}</wsse:Username>"))
                        }
                        None => true,
                    };
                    seen.lock().unwrap().push(body);

                    let (status, reply) = if authorized && !refused {
                        ("200 OK", DEVICE_INFORMATION)
                    } else {
                        ("400 Bad Request", NOT_AUTHORIZED)
                    };
                    let _ = write_response(&mut stream, status, "", reply).await;
                });
            }
        });

        Self { addr, requests }
    }

    pub fn xaddr(&self) -> String {
        format!("http://{}/onvif/device_service", self.addr)
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

/// Reads one request, returning its head (request line and headers) and its body.
async fn read_request(stream: &mut TcpStream) -> std::io::Result<(String, String)> {
    let mut buf: Vec<u8> = Vec::new();
    let mut chunk = [0u8; 4096];

    loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Ok((String::new(), String::from_utf8_lossy(&buf).into_owned()));
        }
        buf.extend_from_slice(&chunk[..n]);

        let Some(head_end) = buf.windows(4).position(|w| w == b"\r\n\r\n") else {
            continue;
        };
        let head = String::from_utf8_lossy(&buf[..head_end]).into_owned();
        let content_length = header(&head, "content-length")
            .and_then(|value| value.parse::<usize>().ok())
            .unwrap_or(0);

        let body_start = head_end + 4;
        if buf.len() >= body_start + content_length {
            let body = &buf[body_start..body_start + content_length];
            return Ok((head, String::from_utf8_lossy(body).into_owned()));
        }
    }
}

fn header<'a>(head: &'a str, name: &str) -> Option<&'a str> {
    head.lines().find_map(|line| {
        let (key, value) = line.split_once(':')?;
        key.trim().eq_ignore_ascii_case(name).then_some(value.trim())
    })
}

/// `headers` are extra header lines, each terminated by `\r\n`.
async fn write_response(
    stream: &mut TcpStream,
    status: &str,
    headers: &str,
    body: &str,
) -> std::io::Result<()> {
    let response = format!(
        concat!(
            "HTTP/1.1 {status}\r\n{headers}",
            "Content-Type: application/soap+xml; charset=utf-8\r\n",
            "Content-Length: {length}\r\n",
            "Connection: close\r\n\r\n{body}",
        ),
        status = status,
        headers = headers,
        length = body.len(),
        body = body,
    );
    stream.write_all(response.as_bytes()).await?;
    stream.shutdown().await
}

/// HTTP endpoint that answers every request with the same status and body.
pub async fn fixed_http_responder(status: &'static str, body: &'static str) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut stream, _)) = listener.accept().await {
            tokio::spawn(async move {
                if read_request(&mut stream).await.is_ok() {
                    let _ = write_response(&mut stream, status, "", body).await;
                }
            });
        }
    });

    addr
}

const DIGEST_CHALLENGE: &str = r#"Digest realm="camscout-test", qop="auth", nonce="5f2a9c""#;

/// Device service behind HTTP Digest: unauthenticated requests get a `401` challenge, and
/// only a correct answer for `username`/`password` is served.
pub async fn digest_device_service(
    username: &'static str,
    password: &'static str,
) -> DeviceService {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let requests = Arc::new(Mutex::new(Vec::new()));
    let seen = requests.clone();

    tokio::spawn(async move {
        while let Ok((mut stream, _)) = listener.accept().await {
            let seen = seen.clone();
            tokio::spawn(async move {
                let Ok((head, body)) = read_request(&mut stream).await else {
                    return;
                };
                let answer = header(&head, "authorization").map(str::to_string);
                seen.lock().unwrap().push(body);

                let authorized =
                    answer.is_some_and(|answer| digest_matches(&answer, username, password));
                let _ = if authorized {
                    write_response(&mut stream, "200 OK", "", DEVICE_INFORMATION).await
                } else {
                    let challenge = format!("WWW-Authenticate: {DIGEST_CHALLENGE}\r\n");
                    write_response(&mut stream, "401 Unauthorized", &challenge, "").await
                };
            });
        }
    });

    DeviceService { addr, requests }
}

fn digest_matches(answer: &str, username: &str, password: &str) -> bool {
    let field = |name: &str| {
        let start = answer.find(&format!("{name}="))? + name.len() + 1;
        let value = answer[start..].trim_start_matches('"');
        value.split(['"', ',']).next().map(str::to_string)
    };
    let (Some(cnonce), Some(response)) = (field("cnonce"), field("response")) else {
        return false;
    };

    let challenge = DigestChallenge::parse(DIGEST_CHALLENGE).unwrap();
    let expected = challenge.authorization_with(
        username,
        password,
        "POST",
        "/onvif/device_service",
        &cnonce,
        1,
    );
    expected.contains(&format!(r#"response="{response}""#))
}
