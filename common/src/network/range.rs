use std::collections::BTreeSet;
use std::net::{IpAddr, Ipv4Addr};
use std::ops::RangeInclusive;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ipv4Range {
    pub start_addr: Ipv4Addr,
    pub end_addr: Ipv4Addr,
}

impl Ipv4Range {
    pub fn new(start_addr: Ipv4Addr, end_addr: Ipv4Addr) -> Self {
        Self {
            start_addr,
            end_addr,
        }
    }

    pub fn to_iter(&self) -> impl Iterator<Item = IpAddr> + use<> {
        let start: u32 = self.start_addr.into();
        let end: u32 = self.end_addr.into();
        (start..=end).map(|ip| IpAddr::V4(Ipv4Addr::from(ip)))
    }

    pub fn len(&self) -> usize {
        let start: u32 = self.start_addr.into();
        let end: u32 = self.end_addr.into();
        if end < start { 0 } else { (end - start) as usize + 1 }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub fn cidr_range(ip: Ipv4Addr, prefix: u8) -> anyhow::Result<Ipv4Range> {
    let network = pnet::ipnetwork::Ipv4Network::new(ip, prefix)?;
    let start = network.network();
    let end = network.broadcast();

    Ok(Ipv4Range::new(start, end))
}

/// The set of hosts a scan walks through.
#[derive(Debug, Clone, Default)]
pub struct IpCollection {
    pub singles: BTreeSet<IpAddr>,
    pub ranges: Vec<Ipv4Range>,
}

impl IpCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_single(&mut self, addr: IpAddr) {
        self.singles.insert(addr);
    }

    pub fn add_range(&mut self, range: Ipv4Range) {
        self.ranges.push(range);
    }

    /// Number of addresses, overlapping entries counted once.
    ///
    /// Computed from the merged spans, never by walking the addresses.
    pub fn len(&self) -> usize {
        let v4: u64 = self
            .merged_v4_spans()
            .iter()
            .map(|&(start, end)| u64::from(end - start) + 1)
            .sum();
        let v6 = self.singles.iter().filter(|addr| addr.is_ipv6()).count() as u64;
        usize::try_from(v4 + v6).unwrap_or(usize::MAX)
    }

    pub fn is_empty(&self) -> bool {
        self.singles.is_empty() && self.ranges.iter().all(Ipv4Range::is_empty)
    }

    /// Every address exactly once, in ascending order. Addresses are produced lazily.
    pub fn iter(&self) -> IpIter {
        IpIter {
            spans: self.merged_v4_spans().into_iter(),
            current: None,
            v6: self
                .singles
                .iter()
                .filter(|addr| addr.is_ipv6())
                .copied()
                .collect::<Vec<_>>()
                .into_iter(),
        }
    }

    /// IPv4 singles and ranges as sorted, disjoint, non-adjacent `[start, end]` spans.
    fn merged_v4_spans(&self) -> Vec<(u32, u32)> {
        let mut spans: Vec<(u32, u32)> = self
            .ranges
            .iter()
            .filter(|range| !range.is_empty())
            .map(|range| (u32::from(range.start_addr), u32::from(range.end_addr)))
            .chain(self.singles.iter().filter_map(|addr| match addr {
                IpAddr::V4(v4) => Some((u32::from(*v4), u32::from(*v4))),
                IpAddr::V6(_) => None,
            }))
            .collect();
        spans.sort_unstable();

        let mut merged: Vec<(u32, u32)> = Vec::with_capacity(spans.len());
        for (start, end) in spans {
            match merged.last_mut() {
                Some(last) if start <= last.1.saturating_add(1) => last.1 = last.1.max(end),
                _ => merged.push((start, end)),
            }
        }
        merged
    }
}

/// Lazy walk over an [`IpCollection`]: IPv4 spans first, then IPv6 singles.
#[derive(Debug, Clone)]
pub struct IpIter {
    spans: std::vec::IntoIter<(u32, u32)>,
    current: Option<RangeInclusive<u32>>,
    v6: std::vec::IntoIter<IpAddr>,
}

impl Iterator for IpIter {
    type Item = IpAddr;

    fn next(&mut self) -> Option<IpAddr> {
        loop {
            if let Some(ip) = self.current.as_mut().and_then(Iterator::next) {
                return Some(IpAddr::V4(Ipv4Addr::from(ip)));
            }
            match self.spans.next() {
                Some((start, end)) => self.current = Some(start..=end),
                None => break,
            }
        }
        self.v6.next()
    }
}

impl IntoIterator for IpCollection {
    type Item = IpAddr;
    type IntoIter = IpIter;

    fn into_iter(self) -> IpIter {
        self.iter()
    }
}

impl IntoIterator for &IpCollection {
    type Item = IpAddr;
    type IntoIter = IpIter;

    fn into_iter(self) -> IpIter {
        self.iter()
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
