//! DHT Transfer Protocol
//!
//! Endpoints and DTOs a remote peer uses to push URL metadata into this node.
//! Entries travel as individually serialized strings so one bad entry never
//! spoils the decoding of the whole request.

use crate::peers::types::PeerHash;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// --- API Endpoints ---

/// Inbound push of URL metadata entries.
pub const ENDPOINT_TRANSFER_URLS: &str = "/dht/transfer_urls";
/// Recent accepted transfers, newest last.
pub const ENDPOINT_TRANSFERS: &str = "/dht/transfers";
/// Known peers and their contribution counters.
pub const ENDPOINT_PEERS: &str = "/dht/peers";

// --- Data Transfer Objects ---

/// A batch of URL metadata entries pushed by a remote peer.
///
/// Entries are keyed `url0` .. `url{urlc - 1}`; each value is one JSON encoded
/// `UrlMetadataEntry`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferUrlsRequest {
    /// Sender identity.
    pub iam: PeerHash,
    /// Identity the sender believes it is talking to.
    pub youare: PeerHash,
    /// Network the sender belongs to.
    pub network: String,
    /// Shared network secret, when the network requires one.
    #[serde(default)]
    pub key: Option<String>,
    /// Declared number of entries.
    pub urlc: usize,
    #[serde(flatten)]
    pub entries: BTreeMap<String, String>,
}

impl TransferUrlsRequest {
    pub fn new(iam: PeerHash, youare: PeerHash, network: impl Into<String>) -> Self {
        Self {
            iam,
            youare,
            network: network.into(),
            key: None,
            urlc: 0,
            entries: BTreeMap::new(),
        }
    }

    /// Appends one serialized entry and bumps the declared count.
    pub fn push_entry(&mut self, entry: impl Into<String>) {
        self.entries.insert(entry_key(self.urlc), entry.into());
        self.urlc += 1;
    }

    /// The `i`-th declared entry, if the sender included it.
    pub fn entry(&self, i: usize) -> Option<&str> {
        self.entries.get(&entry_key(i)).map(String::as_str)
    }
}

fn entry_key(i: usize) -> String {
    format!("url{}", i)
}

/// Outcome of a transfer as seen by the sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReceiveStatus {
    #[serde(rename = "ok")]
    Ok,
    #[serde(rename = "wrong_target")]
    WrongTarget,
    #[serde(rename = "error_not_granted")]
    NotGranted,
    #[serde(rename = "error_too_many_entries")]
    TooManyEntries,
    #[serde(rename = "not_authenticated")]
    NotAuthenticated,
    #[serde(rename = "error_internal")]
    Internal,
}

impl ReceiveStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReceiveStatus::Ok => "ok",
            ReceiveStatus::WrongTarget => "wrong_target",
            ReceiveStatus::NotGranted => "error_not_granted",
            ReceiveStatus::TooManyEntries => "error_too_many_entries",
            ReceiveStatus::NotAuthenticated => "not_authenticated",
            ReceiveStatus::Internal => "error_internal",
        }
    }
}

/// Reply to a [`TransferUrlsRequest`]. `double` is the duplicate count in decimal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferUrlsResponse {
    pub result: ReceiveStatus,
    pub double: String,
}

impl TransferUrlsResponse {
    pub fn rejected(result: ReceiveStatus) -> Self {
        Self {
            result,
            double: "0".to_string(),
        }
    }
}
