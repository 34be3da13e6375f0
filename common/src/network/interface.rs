use pnet::datalink::{self, NetworkInterface};
use pnet::ipnetwork::{IpNetwork, Ipv4Network};

/// Finds the private IPv4 network of the best LAN interface.
///
/// Wired interfaces win over wireless ones; loopback, point-to-point and down interfaces
/// are ignored.
pub fn get_lan_network() -> anyhow::Result<Option<Ipv4Network>> {
    let mut candidates: Vec<NetworkInterface> = datalink::interfaces()
        .into_iter()
        .filter(is_viable_lan_interface)
        .collect();

    if candidates.is_empty() {
        anyhow::bail!("No interfaces available for LAN discovery");
    }

    candidates.sort_by_key(|intf| (is_wireless(intf), intf.index));
    Ok(candidates.iter().find_map(private_ipv4_net))
}

fn is_viable_lan_interface(intf: &NetworkInterface) -> bool {
    intf.is_up()
        && !intf.is_loopback()
        && !intf.is_point_to_point()
        && intf.is_broadcast()
        && private_ipv4_net(intf).is_some()
}

fn private_ipv4_net(intf: &NetworkInterface) -> Option<Ipv4Network> {
    intf.ips.iter().find_map(|net| match net {
        IpNetwork::V4(v4) if v4.ip().is_private() => Some(*v4),
        _ => None,
    })
}

// Naming heuristic; good enough to prefer eth*/en* over wl*.
fn is_wireless(intf: &NetworkInterface) -> bool {
    intf.name.starts_with("wl") || intf.name.starts_with("wifi")
}
