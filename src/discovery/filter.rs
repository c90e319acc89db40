//! Scope restriction for discovered addresses

use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use ipnet::IpNet;

use crate::error::Error;

/// Which discovered addresses the manager will consider
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AddressFilter {
    /// Every address
    #[default]
    Any,
    /// Addresses whose text starts with the prefix (e.g. `"10."`)
    Prefix(String),
    /// IP addresses inside a subnet (e.g. `10.0.0.0/8`)
    Subnet(IpNet),
}

impl AddressFilter {
    /// Check whether an address is in scope
    pub fn permits(&self, address: &str) -> bool {
        match self {
            AddressFilter::Any => true,
            AddressFilter::Prefix(prefix) => address.starts_with(prefix.as_str()),
            AddressFilter::Subnet(net) => address
                .parse::<IpAddr>()
                .is_ok_and(|ip| net.contains(&ip)),
        }
    }
}

impl FromStr for AddressFilter {
    type Err = Error;

    /// `""` or `"*"` for any address, CIDR notation for a subnet, anything
    /// else is a literal prefix
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();

        if s.is_empty() || s == "*" {
            return Ok(AddressFilter::Any);
        }

        if s.contains('/') {
            return s
                .parse::<IpNet>()
                .map(|net| AddressFilter::Subnet(net.trunc()))
                .map_err(|e| Error::InvalidFilter(format!("{s}: {e}")));
        }

        Ok(AddressFilter::Prefix(s.to_string()))
    }
}

impl fmt::Display for AddressFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddressFilter::Any => write!(f, "*"),
            AddressFilter::Prefix(prefix) => write!(f, "{prefix}"),
            AddressFilter::Subnet(net) => write!(f, "{net}"),
        }
    }
}
