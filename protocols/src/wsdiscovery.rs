//! WS-Discovery (2005/04) probe encoding and probe-match decoding.

use std::collections::{BTreeMap, HashSet};

use quick_xml::Reader;
use quick_xml::escape::escape;
use quick_xml::events::Event;
use tracing::debug;
use url::Url;

use camscout_common::error::DecodeError;
use camscout_common::models::OnvifDevice;

pub const SOAP_ENVELOPE_NS: &str = "http://www.w3.org/2003/05/soap-envelope";
pub const ADDRESSING_NS: &str = "http://schemas.xmlsoap.org/ws/2004/08/addressing";
pub const DISCOVERY_NS: &str = "http://schemas.xmlsoap.org/ws/2005/04/discovery";
pub const ONVIF_NETWORK_NS: &str = "http://www.onvif.org/ver10/network/wsdl";

const PROBE_ACTION: &str = "http://schemas.xmlsoap.org/ws/2005/04/discovery/Probe";
const DISCOVERY_TO: &str = "urn:schemas-xmlsoap-org:ws:2005:04:discovery";

/// Builds a SOAP 1.2 `Probe` envelope.
///
/// `namespaces` are declared on the envelope so `types` can use their prefixes, e.g.
/// `dn` -> [`ONVIF_NETWORK_NS`] with type `dn:NetworkVideoTransmitter`.
pub fn build_probe_message(
    message_id: &str,
    scopes: &[&str],
    types: &[&str],
    namespaces: &BTreeMap<&str, &str>,
) -> String {
    let extra_ns: String = namespaces
        .iter()
        .map(|(prefix, ns)| format!(r#" xmlns:{}="{}""#, prefix, escape(*ns)))
        .collect();

    let mut body = String::new();
    if !types.is_empty() {
        body.push_str(&format!("<d:Types>{}</d:Types>", escape(&types.join(" "))));
    }
    if !scopes.is_empty() {
        body.push_str(&format!("<d:Scopes>{}</d:Scopes>", escape(&scopes.join(" "))));
    }

    format!(
        concat!(
            r#"<?xml version="1.0" encoding="UTF-8"?>"#,
            r#"<soap-env:Envelope xmlns:soap-env="{env}" xmlns:a="{addr}" xmlns:d="{disc}"{extra}>"#,
            r#"<soap-env:Header>"#,
            r#"<a:Action soap-env:mustUnderstand="1">{action}</a:Action>"#,
            r#"<a:MessageID>uuid:{id}</a:MessageID>"#,
            r#"<a:To soap-env:mustUnderstand="1">{to}</a:To>"#,
            r#"</soap-env:Header>"#,
            r#"<soap-env:Body><d:Probe>{body}</d:Probe></soap-env:Body>"#,
            r#"</soap-env:Envelope>"#,
        ),
        env = SOAP_ENVELOPE_NS,
        addr = ADDRESSING_NS,
        disc = DISCOVERY_NS,
        extra = extra_ns,
        action = PROBE_ACTION,
        id = escape(message_id),
        to = DISCOVERY_TO,
        body = body,
    )
}

/// Probe for ONVIF network video transmitters.
pub fn build_onvif_probe(message_id: &str) -> String {
    let namespaces = BTreeMap::from([("dn", ONVIF_NETWORK_NS)]);
    build_probe_message(message_id, &[], &["dn:NetworkVideoTransmitter"], &namespaces)
}

#[derive(Debug, Default)]
struct ProbeMatch {
    endpoint_ref: String,
    xaddrs: String,
}

/// Decodes every `ProbeMatch` of a batch of probe responses.
///
/// One device may answer several times, so matches are deduplicated by the host:port of
/// their first XAddr. Any response that is not well-formed XML fails the whole batch.
pub fn devices_from_probe_responses<S: AsRef<str>>(
    responses: &[S],
) -> Result<Vec<OnvifDevice>, DecodeError> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut devices: Vec<OnvifDevice> = Vec::new();

    for (index, response) in responses.iter().enumerate() {
        let matches = parse_probe_matches(response.as_ref())
            .map_err(|message| DecodeError::Malformed { index, message })?;

        for probe_match in matches {
            let Some(xaddr) = probe_match.xaddrs.split_whitespace().next() else {
                debug!("ProbeMatch without XAddrs from {}", probe_match.endpoint_ref);
                continue;
            };
            let Some(host) = xaddr_host(xaddr) else {
                debug!("ProbeMatch with unusable XAddr '{xaddr}'");
                continue;
            };
            if !seen.insert(host) {
                continue;
            }
            devices.push(OnvifDevice::new(xaddr, probe_match.endpoint_ref.trim()));
        }
    }

    Ok(devices)
}

fn xaddr_host(xaddr: &str) -> Option<String> {
    let url = Url::parse(xaddr).ok()?;
    let host = url.host_str()?;
    match url.port_or_known_default() {
        Some(port) => Some(format!("{host}:{port}")),
        None => Some(host.to_string()),
    }
}

fn parse_probe_matches(xml: &str) -> Result<Vec<ProbeMatch>, String> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut path: Vec<String> = Vec::new();
    let mut matches: Vec<ProbeMatch> = Vec::new();
    let mut current: Option<ProbeMatch> = None;
    let mut saw_root = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).to_string();
                if name == "ProbeMatch" {
                    current = Some(ProbeMatch::default());
                }
                path.push(name);
                saw_root = true;
            }
            Ok(Event::Empty(_)) => saw_root = true,
            Ok(Event::End(_)) => {
                if path.pop().as_deref() == Some("ProbeMatch") {
                    matches.extend(current.take());
                }
            }
            Ok(Event::Text(t)) => {
                let Some(probe_match) = current.as_mut() else {
                    continue;
                };
                let text = t.unescape().map_err(|e| e.to_string())?;
                let parent = path.len().checked_sub(2).map(|i| path[i].as_str());
                match (parent, path.last().map(String::as_str)) {
                    (Some("EndpointReference"), Some("Address")) => {
                        probe_match.endpoint_ref.push_str(&text)
                    }
                    (_, Some("XAddrs")) => probe_match.xaddrs.push_str(&text),
                    _ => {}
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(format!("at byte {}: {e}", reader.buffer_position())),
            _ => {}
        }
    }

    if !saw_root {
        return Err("no root element".to_string());
    }
    if let Some(open) = path.last() {
        return Err(format!("unexpected end of document inside <{open}>"));
    }
    Ok(matches)
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
