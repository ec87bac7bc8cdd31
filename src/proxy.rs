//! Reverse-proxy trust for resolving the client address of a request.
//!
//! With no proxy the socket peer is the client. Behind Cloudflare the
//! `CF-Connecting-IP` header is honoured only when the peer is one of
//! Cloudflare's published edge ranges.

use crate::error::KahoError;
use axum::http::HeaderMap;
use std::net::IpAddr;
use std::str::FromStr;
use std::time::Duration;

const CLOUDFLARE_IPV4_URL: &str = "https://www.cloudflare.com/ips-v4";
const CLOUDFLARE_IPV6_URL: &str = "https://www.cloudflare.com/ips-v6";
const CLOUDFLARE_CLIENT_HEADER: &str = "cf-connecting-ip";
const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProxyMode {
    None,
    Cloudflare,
}

impl FromStr for ProxyMode {
    type Err = KahoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(ProxyMode::None),
            "cloudflare" => Ok(ProxyMode::Cloudflare),
            other => Err(KahoError::Config(format!("unsupported proxy mode {other:?}"))),
        }
    }
}

/// CIDR block such as `173.245.48.0/20`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IpRange {
    network: IpAddr,
    prefix: u8,
}

impl IpRange {
    pub fn contains(&self, ip: IpAddr) -> bool {
        match (self.network, ip) {
            (IpAddr::V4(network), IpAddr::V4(ip)) => {
                let mask = u32::MAX.checked_shl(32 - u32::from(self.prefix)).unwrap_or(0);
                u32::from(network) & mask == u32::from(ip) & mask
            }
            (IpAddr::V6(network), IpAddr::V6(ip)) => {
                let mask = u128::MAX.checked_shl(128 - u32::from(self.prefix)).unwrap_or(0);
                u128::from(network) & mask == u128::from(ip) & mask
            }
            _ => false,
        }
    }
}

impl FromStr for IpRange {
    type Err = KahoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || KahoError::Config(format!("invalid CIDR range {s:?}"));
        let (network, prefix) = s.trim().split_once('/').ok_or_else(invalid)?;
        let network: IpAddr = network.parse().map_err(|_| invalid())?;
        let prefix: u8 = prefix.parse().map_err(|_| invalid())?;
        let max = if network.is_ipv4() { 32 } else { 128 };
        if prefix > max {
            return Err(invalid());
        }
        Ok(Self { network, prefix })
    }
}

/// Proxies whose forwarded client address is believed.
#[derive(Debug, Clone, Default)]
pub struct TrustedProxies {
    ranges: Vec<IpRange>,
}

impl TrustedProxies {
    /// Trust nobody; the socket peer is always the client.
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn from_ranges(ranges: Vec<IpRange>) -> Self {
        Self { ranges }
    }

    /// Parse a newline separated list of CIDR blocks, ignoring blank lines.
    pub fn parse_ranges(text: &str) -> Result<Vec<IpRange>, KahoError> {
        text.lines()
            .filter(|line| !line.trim().is_empty())
            .map(str::parse)
            .collect()
    }

    /// Fetch Cloudflare's published IPv4 and IPv6 edge ranges.
    pub async fn cloudflare() -> Result<Self, KahoError> {
        let client = reqwest::Client::builder().timeout(FETCH_TIMEOUT).build()?;

        let mut ranges = Vec::new();
        for url in [CLOUDFLARE_IPV4_URL, CLOUDFLARE_IPV6_URL] {
            let body = client
                .get(url)
                .send()
                .await?
                .error_for_status()?
                .text()
                .await?;
            ranges.extend(Self::parse_ranges(&body)?);
        }

        Ok(Self::from_ranges(ranges))
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn trusts(&self, peer: IpAddr) -> bool {
        self.ranges.iter().any(|range| range.contains(peer))
    }

    /// Client address for a request received from `peer`.
    pub fn client_ip(&self, peer: IpAddr, headers: &HeaderMap) -> IpAddr {
        if !self.trusts(peer) {
            return peer;
        }

        headers
            .get(CLOUDFLARE_CLIENT_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse().ok())
            .unwrap_or(peer)
    }
}
