//! Device discovery
//!
//! The discovery protocol itself (e.g. WS-Discovery) is an external
//! collaborator behind the [`Discovery`] trait. This module holds the trait,
//! a fixed-list implementation, the address scope filter, and a helper for
//! pulling the host out of announced service URLs.

pub mod filter;

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use url::Url;

use crate::error::DiscoveryError;

pub use filter::AddressFilter;

/// Enumerates candidate device addresses on the local segment
#[async_trait]
pub trait Discovery: Send + Sync {
    /// Run one search, waiting up to `timeout` for announcements
    async fn discover(&self, timeout: Duration) -> Result<HashSet<String>, DiscoveryError>;
}

/// Discovery that always answers with the same addresses
#[derive(Debug, Clone, Default)]
pub struct StaticDiscovery {
    addresses: HashSet<String>,
}

impl StaticDiscovery {
    pub fn new<I, S>(addresses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            addresses: addresses.into_iter().map(Into::into).collect(),
        }
    }
}

#[async_trait]
impl Discovery for StaticDiscovery {
    async fn discover(&self, _timeout: Duration) -> Result<HashSet<String>, DiscoveryError> {
        Ok(self.addresses.clone())
    }
}

/// Host part of an announced service URL
///
/// `http://10.0.0.5:80/onvif/device_service` gives `10.0.0.5`. IPv6 hosts
/// come back without brackets. Returns `None` for unparsable URLs and URLs
/// without a host.
pub fn host_from_service_url(service_url: &str) -> Option<String> {
    let url = Url::parse(service_url.trim()).ok()?;

    match url.host()? {
        url::Host::Domain(domain) => Some(domain.to_string()),
        url::Host::Ipv4(ip) => Some(ip.to_string()),
        url::Host::Ipv6(ip) => Some(ip.to_string()),
    }
}

/// Distinct hosts of a batch of announced service URLs
pub fn hosts_from_service_urls<'a, I>(service_urls: I) -> HashSet<String>
where
    I: IntoIterator<Item = &'a str>,
{
    service_urls
        .into_iter()
        .filter_map(host_from_service_url)
        .collect()
}
