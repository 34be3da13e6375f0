//! # Scan Targets
//!
//! Parses what the operator typed into the set of hosts to probe:
//! * a single address (`192.168.1.5`, `::1`),
//! * an IPv4 range (`192.168.1.1-100`, `10.0.0.1-10.0.1.20`),
//! * a CIDR block (`192.168.1.0/24`),
//! * `lan`, the private network of the best local interface,
//! * any comma separated mix of the above.

use std::net::{IpAddr, Ipv4Addr};
use std::str::FromStr;

use tracing::{info, warn};

use crate::network::interface;
use crate::network::range::{self, IpCollection, Ipv4Range};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Target {
    Lan,
    Host { target_addr: IpAddr },
    Range { ipv4_range: Ipv4Range },
    Multi { targets: Vec<Target> },
}

impl FromStr for Target {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();

        if s.eq_ignore_ascii_case("lan") {
            return Ok(Target::Lan);
        }
        if s.contains(',') {
            return parse_commas(s);
        }
        if let Ok(target_addr) = s.parse::<IpAddr>() {
            return Ok(Target::Host { target_addr });
        }
        if let Some((start, end)) = s.split_once('-') {
            return parse_ip_range(start, end);
        }
        if let Some((ip, prefix)) = s.split_once('/') {
            return parse_cidr(ip, prefix);
        }

        Err(format!("invalid target: {s}"))
    }
}

impl Target {
    /// Expands the target into concrete addresses.
    pub fn to_collection(self) -> anyhow::Result<IpCollection> {
        let mut collection = IpCollection::new();
        resolve(self, &mut collection)?;
        info!("{} target address(es) parsed", collection.len());
        Ok(collection)
    }
}

fn resolve(target: Target, collection: &mut IpCollection) -> anyhow::Result<()> {
    match target {
        Target::Lan => {
            let Some(net) = interface::get_lan_network()? else {
                anyhow::bail!("the LAN interface has no private IPv4 network");
            };
            let first = u32::from(net.network()).saturating_add(1);
            let last = u32::from(net.broadcast()).saturating_sub(1);
            if first <= last {
                collection.add_range(Ipv4Range::new(Ipv4Addr::from(first), Ipv4Addr::from(last)));
            } else {
                warn!("Network too small to strip broadcast, scanning full range.");
                collection.add_range(Ipv4Range::new(net.network(), net.broadcast()));
            }
        }
        Target::Host { target_addr } => collection.add_single(target_addr),
        Target::Range { ipv4_range } => collection.add_range(ipv4_range),
        Target::Multi { targets } => {
            for target in targets {
                resolve(target, collection)?;
            }
        }
    }
    Ok(())
}

fn parse_commas(s: &str) -> Result<Target, String> {
    let targets = s
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| Target::from_str(part).map_err(|e| format!("'{part}': {e}")))
        .collect::<Result<Vec<Target>, String>>()?;

    Ok(Target::Multi { targets })
}

fn parse_ip_range(start: &str, end: &str) -> Result<Target, String> {
    let start_addr = start
        .parse::<Ipv4Addr>()
        .map_err(|e| format!("invalid range start '{start}': {e}"))?;
    let end_addr = parse_range_end(end, start_addr)?;

    if u32::from(end_addr) < u32::from(start_addr) {
        return Err(format!("range end {end_addr} lies before {start_addr}"));
    }
    Ok(Target::Range {
        ipv4_range: Ipv4Range::new(start_addr, end_addr),
    })
}

/// `50` after `192.168.1.1` means `192.168.1.50`; trailing octets replace the start's.
fn parse_range_end(end: &str, start: Ipv4Addr) -> Result<Ipv4Addr, String> {
    if let Ok(full) = end.parse::<Ipv4Addr>() {
        return Ok(full);
    }

    let partial = end
        .split('.')
        .map(str::parse::<u8>)
        .collect::<Result<Vec<u8>, _>>()
        .map_err(|e| format!("invalid range end '{end}': {e}"))?;
    if partial.is_empty() || partial.len() > 4 {
        return Err(format!("invalid range end '{end}'"));
    }

    let mut octets = start.octets();
    octets[4 - partial.len()..].copy_from_slice(&partial);
    Ok(Ipv4Addr::from(octets))
}

fn parse_cidr(ip: &str, prefix: &str) -> Result<Target, String> {
    let ip = ip
        .parse::<Ipv4Addr>()
        .map_err(|e| format!("invalid CIDR address '{ip}': {e}"))?;
    let prefix = prefix
        .parse::<u8>()
        .map_err(|e| format!("invalid CIDR prefix '{prefix}': {e}"))?;
    let ipv4_range = range::cidr_range(ip, prefix).map_err(|e| e.to_string())?;

    Ok(Target::Range { ipv4_range })
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
