use ipnet::IpNet;
use rustc_hash::FxHashMap;
use std::net::IpAddr;
use tokio::time::Instant;

/// Immutable origin -> subnets mapping built by one refresh cycle.
///
/// A snapshot is never modified after construction; a refresh builds a new
/// one and swaps it in whole.
#[derive(Debug)]
pub struct Snapshot {
    subnets: FxHashMap<Box<str>, Vec<IpNet>>,
    refreshed_at: Instant,
}

impl Snapshot {
    pub fn new(subnets: FxHashMap<Box<str>, Vec<IpNet>>, refreshed_at: Instant) -> Self {
        Self {
            subnets,
            refreshed_at,
        }
    }

    /// Returns the first origin with a subnet containing `ip`.
    ///
    /// Origin iteration order is unspecified, so an address listed under
    /// several origins may resolve to any of them.
    pub fn lookup(&self, ip: IpAddr) -> Option<&str> {
        let ip = unmap(ip);
        self.subnets
            .iter()
            .find(|(_, nets)| nets.iter().any(|net| net.contains(&ip)))
            .map(|(origin, _)| &**origin)
    }

    pub fn subnets(&self) -> Vec<IpNet> {
        self.subnets.values().flatten().copied().collect()
    }

    pub fn origin_counts(&self) -> Vec<(&str, usize)> {
        let mut counts: Vec<_> = self
            .subnets
            .iter()
            .map(|(origin, nets)| (&**origin, nets.len()))
            .collect();
        counts.sort();
        counts
    }

    /// Total subnet count across origins, duplicates included.
    pub fn len(&self) -> usize {
        self.subnets.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn refreshed_at(&self) -> Instant {
        self.refreshed_at
    }
}

// `::ffff:a.b.c.d` is matched as the embedded IPv4 address.
fn unmap(ip: IpAddr) -> IpAddr {
    match ip {
        IpAddr::V6(v6) => v6.to_ipv4_mapped().map(IpAddr::V4).unwrap_or(ip),
        IpAddr::V4(_) => ip,
    }
}
