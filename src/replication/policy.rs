//! Inbound receipt policy: which requests are granted and which entries are kept.

use crate::index::hash::UrlHash;
use crate::index::metadata::UrlMetadataEntry;

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::net::{Ipv4Addr, Ipv6Addr};
use thiserror::Error;
use url::{Host, Url};

/// 2009-01-01T00:00:00Z in Unix milliseconds. Entries not fresher than this are stale.
pub const FRESHNESS_CUTOFF_MS: u64 = 1_230_768_000_000;

/// Largest entry count a single transfer may declare.
pub const DEFAULT_MAX_TRANSFER_ENTRIES: usize = 1000;

const LOCAL_SUFFIXES: [&str; 4] = [".localhost", ".local", ".lan", ".internal"];

/// Why a single inbound entry was blocked.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EntryError {
    #[error("malformed entry: {0}")]
    Malformed(String),
    #[error("stale entry (fresh_ms = {fresh_ms})")]
    Stale { fresh_ms: u64 },
    #[error("host '{host}' is blacklisted")]
    Blacklisted { host: String },
    #[error("url '{url}' is outside the accepted domain")]
    OutOfDomain { url: String },
}

/// Host patterns that are never accepted from peers.
#[derive(Debug, Clone, Default)]
pub struct Blacklist {
    patterns: Vec<Regex>,
}

impl Blacklist {
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self, regex::Error> {
        let patterns = patterns
            .iter()
            .map(|p| Regex::new(p.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn is_listed(&self, url: &Url) -> bool {
        match url.host_str() {
            Some(host) => self.patterns.iter().any(|p| p.is_match(host)),
            None => false,
        }
    }
}

/// Which part of the address space this node indexes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DomainScope {
    /// Public internet hosts only.
    #[default]
    Global,
    /// Intranet hosts only.
    Local,
    Any,
}

impl DomainScope {
    pub fn accepts(&self, url: &Url) -> bool {
        match self {
            DomainScope::Any => true,
            DomainScope::Global => is_local_host(url) == Some(false),
            DomainScope::Local => is_local_host(url) == Some(true),
        }
    }
}

/// `None` when the URL has no host at all.
fn is_local_host(url: &Url) -> Option<bool> {
    let local = match url.host()? {
        Host::Domain(name) => {
            let name = name.to_ascii_lowercase();
            name == "localhost" || LOCAL_SUFFIXES.iter().any(|s| name.ends_with(s))
        }
        Host::Ipv4(ip) => is_local_v4(&ip),
        Host::Ipv6(ip) => is_local_v6(&ip),
    };
    Some(local)
}

fn is_local_v4(ip: &Ipv4Addr) -> bool {
    ip.is_loopback() || ip.is_private() || ip.is_link_local() || ip.is_unspecified()
}

fn is_local_v6(ip: &Ipv6Addr) -> bool {
    if let Some(v4) = ip.to_ipv4_mapped() {
        return is_local_v4(&v4);
    }
    let first = ip.segments()[0];
    ip.is_loopback() || ip.is_unspecified() || (first & 0xfe00) == 0xfc00 || (first & 0xffc0) == 0xfe80
}

/// Node-level switches for inbound DHT transfers.
#[derive(Debug, Clone)]
pub struct ReceivePolicy {
    pub allow_receive: bool,
    pub blacklist_on_receive: bool,
    pub robinson: bool,
    pub domain_scope: DomainScope,
    pub blacklist: Blacklist,
    /// Requests declaring more entries are refused before any entry work.
    pub max_entries: usize,
}

impl Default for ReceivePolicy {
    fn default() -> Self {
        Self {
            allow_receive: true,
            blacklist_on_receive: true,
            robinson: false,
            domain_scope: DomainScope::Global,
            blacklist: Blacklist::default(),
            max_entries: DEFAULT_MAX_TRANSFER_ENTRIES,
        }
    }
}

impl ReceivePolicy {
    /// Whether inbound transfers are accepted at all.
    pub fn grants_receive(&self) -> bool {
        self.allow_receive && !self.robinson
    }

    /// Decodes one serialized entry and runs the per-entry checks in order:
    /// well-formed, fresh, not blacklisted, inside the domain scope.
    pub fn check_entry(&self, raw: &str) -> Result<UrlMetadataEntry, EntryError> {
        let entry: UrlMetadataEntry =
            serde_json::from_str(raw).map_err(|e| EntryError::Malformed(e.to_string()))?;

        let url = Url::parse(&entry.url)
            .map_err(|e| EntryError::Malformed(format!("bad url '{}': {}", entry.url, e)))?;
        if UrlHash::of_url(&url) != entry.hash {
            return Err(EntryError::Malformed(format!(
                "hash {} does not match url '{}'",
                entry.hash, entry.url
            )));
        }

        if entry.fresh_ms <= FRESHNESS_CUTOFF_MS {
            return Err(EntryError::Stale {
                fresh_ms: entry.fresh_ms,
            });
        }

        if self.blacklist_on_receive && self.blacklist.is_listed(&url) {
            return Err(EntryError::Blacklisted {
                host: url.host_str().unwrap_or_default().to_string(),
            });
        }

        if !self.domain_scope.accepts(&url) {
            return Err(EntryError::OutOfDomain { url: entry.url });
        }

        Ok(entry)
    }
}
