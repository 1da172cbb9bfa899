use std::fmt;
use std::net::{IpAddr, Ipv4Addr};
use std::str::FromStr;

use ipnet::Ipv4Net;
use tracing::warn;

use crate::error::InputError;

pub const FASTLY_CIDRS: &[&str] = &[
    "103.244.50.0/24", "103.245.222.0/23", "103.245.224.0/24",
    "104.156.80.0/20", "146.75.0.0/16", "151.101.0.0/16",
    "157.52.64.0/18", "167.82.0.0/17", "167.82.128.0/20",
    "167.82.160.0/20", "167.82.224.0/20", "172.111.64.0/18",
    "185.31.16.0/22", "199.232.0.0/16", "199.27.72.0/21",
    "23.235.32.0/20", "43.249.72.0/22",
];

pub const CLOUDFLARE_CIDRS: &[&str] = &[
    "103.21.244.0/22", "103.22.200.0/22", "103.31.4.0/22",
    "104.16.0.0/13", "104.24.0.0/14", "108.162.192.0/18",
    "131.0.72.0/22", "141.101.64.0/18", "162.158.0.0/15",
    "172.64.0.0/13", "173.245.48.0/20", "188.114.96.0/20",
    "190.93.240.0/20", "197.234.240.0/22", "198.41.128.0/17",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolKind {
    Fastly,
    Cloudflare,
    Bunny,
}

impl PoolKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PoolKind::Fastly => "fastly",
            PoolKind::Cloudflare => "cloudflare",
            PoolKind::Bunny => "bunny",
        }
    }

    /// Static CIDR table for the pool; bunny has none and is fetched instead.
    pub fn cidrs(&self) -> Option<&'static [&'static str]> {
        match self {
            PoolKind::Fastly => Some(FASTLY_CIDRS),
            PoolKind::Cloudflare => Some(CLOUDFLARE_CIDRS),
            PoolKind::Bunny => None,
        }
    }
}

impl fmt::Display for PoolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PoolKind {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "fastly" => Ok(PoolKind::Fastly),
            "cloudflare" => Ok(PoolKind::Cloudflare),
            "bunny" => Ok(PoolKind::Bunny),
            _ => Err(InputError::UnknownPool(s.trim().to_string())),
        }
    }
}

/// Candidate addresses to sample from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddressPool {
    /// Blocks weighted by their size.
    Cidr(Vec<Ipv4Net>),
    /// Literal addresses, no weighting.
    List(Vec<Ipv4Addr>),
}

impl AddressPool {
    pub fn from_cidrs(cidrs: &[&str]) -> Result<Self, InputError> {
        let nets = cidrs
            .iter()
            .map(|c| c.parse::<Ipv4Net>().map_err(|_| InputError::InvalidCidr(c.to_string())))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(AddressPool::Cidr(nets))
    }

    pub fn from_strings(entries: Vec<String>) -> Self {
        let mut addrs = Vec::with_capacity(entries.len());
        for entry in entries {
            match entry.trim().parse::<IpAddr>() {
                Ok(IpAddr::V4(ip)) => addrs.push(ip),
                Ok(IpAddr::V6(ip)) => warn!("skipping IPv6 address {}", ip),
                Err(_) => warn!("skipping malformed address {:?}", entry),
            }
        }
        AddressPool::List(addrs)
    }

    pub fn len(&self) -> usize {
        match self {
            AddressPool::Cidr(nets) => nets.len(),
            AddressPool::List(addrs) => addrs.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Number of addresses covered by a block, /0 included.
pub fn block_size(net: &Ipv4Net) -> u64 {
    1u64 << (32 - u32::from(net.prefix_len()))
}
