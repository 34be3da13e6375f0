//! ONVIF device management: the `GetDeviceInformation` call.
//!
//! Only the request envelope (optionally signed with a WS-Security UsernameToken) and the
//! response parser live here; sending it is up to the caller.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use quick_xml::Reader;
use quick_xml::escape::escape;
use quick_xml::events::Event;
use sha1::{Digest, Sha1};

use camscout_common::error::IdentifyError;
use camscout_common::models::DeviceInformation;

pub const DEVICE_SERVICE_PATH: &str = "/onvif/device_service";
pub const SOAP_CONTENT_TYPE: &str = "application/soap+xml; charset=utf-8";

const WSSE_NS: &str =
    "http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-wssecurity-secext-1.0.xsd";
const WSU_NS: &str =
    "http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-wssecurity-utility-1.0.xsd";
const PASSWORD_DIGEST: &str = "http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-username-token-profile-1.0#PasswordDigest";
const BASE64_BINARY: &str = "http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-soap-message-security-1.0#Base64Binary";

/// WS-Security UsernameToken with `PasswordDigest = Base64(SHA1(nonce + created + password))`.
#[derive(Debug, Clone)]
pub struct UsernameToken {
    pub username: String,
    pub nonce: [u8; 16],
    pub created: String,
    pub digest: String,
}

impl UsernameToken {
    /// Fresh token with a random nonce, created now.
    pub fn new(username: &str, password: &str) -> Self {
        let nonce: [u8; 16] = rand::random();
        let created = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string();
        Self::with_nonce(username, password, nonce, created)
    }

    pub fn with_nonce(username: &str, password: &str, nonce: [u8; 16], created: String) -> Self {
        let mut hasher = Sha1::new();
        hasher.update(nonce);
        hasher.update(created.as_bytes());
        hasher.update(password.as_bytes());
        let digest = BASE64.encode(hasher.finalize());

        Self {
            username: username.to_string(),
            nonce,
            created,
            digest,
        }
    }

    pub fn to_header(&self) -> String {
        format!(
            concat!(
                r#"<wsse:Security soap-env:mustUnderstand="1" xmlns:wsse="{wsse}" xmlns:wsu="{wsu}">"#,
                r#"<wsse:UsernameToken>"#,
                r#"<wsse:Username>{user}</wsse:Username>"#,
                r#"<wsse:Password Type="{pd}">{digest}</wsse:Password>"#,
                r#"<wsse:Nonce EncodingType="{b64}">{nonce}</wsse:Nonce>"#,
                r#"<wsu:Created>{created}</wsu:Created>"#,
                r#"</wsse:UsernameToken>"#,
                r#"</wsse:Security>"#,
            ),
            wsse = WSSE_NS,
            wsu = WSU_NS,
            user = escape(&self.username),
            pd = PASSWORD_DIGEST,
            digest = self.digest,
            b64 = BASE64_BINARY,
            nonce = BASE64.encode(self.nonce),
            created = self.created,
        )
    }
}

pub fn get_device_information_request(token: Option<&UsernameToken>) -> String {
    let header = token.map(UsernameToken::to_header).unwrap_or_default();
    format!(
        concat!(
            r#"<?xml version="1.0" encoding="UTF-8"?>"#,
            r#"<soap-env:Envelope xmlns:soap-env="http://www.w3.org/2003/05/soap-envelope">"#,
            r#"<soap-env:Header>{header}</soap-env:Header>"#,
            r#"<soap-env:Body>"#,
            r#"<GetDeviceInformation xmlns="http://www.onvif.org/ver10/device/wsdl"/>"#,
            r#"</soap-env:Body>"#,
            r#"</soap-env:Envelope>"#,
        ),
        header = header,
    )
}

/// Parses a `GetDeviceInformationResponse`, turning SOAP faults into [`IdentifyError::Fault`].
pub fn parse_device_information(xml: &str) -> Result<DeviceInformation, IdentifyError> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut info = DeviceInformation::default();
    let mut path: Vec<String> = Vec::new();
    let mut in_response = false;
    let mut saw_response = false;
    let mut fault: Option<String> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).to_string();
                match name.as_str() {
                    "GetDeviceInformationResponse" => {
                        in_response = true;
                        saw_response = true;
                    }
                    "Fault" => fault = Some(String::new()),
                    _ => {}
                }
                path.push(name);
            }
            Ok(Event::Empty(e)) => {
                if e.local_name().as_ref() == b"GetDeviceInformationResponse" {
                    saw_response = true;
                }
            }
            Ok(Event::End(_)) => {
                if path.pop().as_deref() == Some("GetDeviceInformationResponse") {
                    in_response = false;
                }
            }
            Ok(Event::Text(t)) => {
                let text = t
                    .unescape()
                    .map_err(|e| IdentifyError::Response(e.to_string()))?;
                let leaf = path.last().map(String::as_str);

                if let Some(reason) = fault.as_mut() {
                    // SOAP 1.2 Reason/Text or SOAP 1.1 faultstring
                    if matches!(leaf, Some("Text") | Some("faultstring")) && reason.is_empty() {
                        reason.push_str(&text);
                    }
                    continue;
                }
                if !in_response {
                    continue;
                }
                let slot = match leaf {
                    Some("Manufacturer") => &mut info.manufacturer,
                    Some("Model") => &mut info.model,
                    Some("FirmwareVersion") => &mut info.firmware_version,
                    Some("SerialNumber") => &mut info.serial_number,
                    Some("HardwareId") => &mut info.hardware_id,
                    _ => continue,
                };
                slot.push_str(&text);
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(IdentifyError::Response(format!(
                    "at byte {}: {e}",
                    reader.buffer_position()
                )));
            }
            _ => {}
        }
    }

    if let Some(reason) = fault {
        let reason = if reason.is_empty() { "unknown fault".to_string() } else { reason };
        return Err(IdentifyError::Fault(reason));
    }
    if !saw_response {
        return Err(IdentifyError::Response(
            "missing GetDeviceInformationResponse".to_string(),
        ));
    }
    Ok(info)
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
