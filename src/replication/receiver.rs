//! Inbound DHT Transfer
//!
//! [`IndexReceiver::receive_entries`] stores the URL metadata a remote peer pushed
//! to this node.
//!
//! ## Request Handling
//! 1. **Target check**: the declared recipient must be this node, else `wrong_target`.
//! 2. **Grant check**: receipt must be allowed and the node not in robinson mode,
//!    else `error_not_granted`.
//! 3. **Size check**: the declared entry count must not exceed the policy maximum,
//!    else `error_too_many_entries`. This bounds the time the store lock is held.
//! 4. **Entries**: each entry is decoded and checked on its own; a rejected entry
//!    counts as blocked and never aborts the batch.
//! 5. **Duplicates**: entries that were accepted but did not grow the store were
//!    already known. The store size is sampled under the URL store's writer lock
//!    so concurrent transfers are not attributed to this request.

use super::auth::Authenticated;
use super::policy::{EntryError, ReceivePolicy};
use super::protocol::{ReceiveStatus, TransferUrlsRequest, TransferUrlsResponse};
use super::transfer_log::{EventOrigin, TransferLog};
use crate::index::segment::Segment;
use crate::peers::registry::PeerRegistry;

use serde::Serialize;
use std::sync::Arc;

/// Counts produced by one transfer request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReceiveOutcome {
    pub status: ReceiveStatus,
    pub accepted: usize,
    pub blocked: usize,
    pub duplicates: usize,
}

impl ReceiveOutcome {
    fn rejected(status: ReceiveStatus) -> Self {
        Self {
            status,
            accepted: 0,
            blocked: 0,
            duplicates: 0,
        }
    }

    pub fn to_response(&self) -> TransferUrlsResponse {
        TransferUrlsResponse {
            result: self.status,
            double: self.duplicates.to_string(),
        }
    }
}

pub struct IndexReceiver {
    policy: ReceivePolicy,
    segment: Arc<Segment>,
    peers: Arc<PeerRegistry>,
    transfers: Arc<TransferLog>,
}

impl IndexReceiver {
    pub fn new(
        policy: ReceivePolicy,
        segment: Arc<Segment>,
        peers: Arc<PeerRegistry>,
        transfers: Arc<TransferLog>,
    ) -> Self {
        Self {
            policy,
            segment,
            peers,
            transfers,
        }
    }

    pub fn policy(&self) -> &ReceivePolicy {
        &self.policy
    }

    pub fn peers(&self) -> &PeerRegistry {
        &self.peers
    }

    pub fn transfers(&self) -> &TransferLog {
        &self.transfers
    }

    pub fn receive_entries(&self, request: &Authenticated<TransferUrlsRequest>) -> ReceiveOutcome {
        if &request.youare != self.peers.local_hash() {
            tracing::info!(
                "Rejected transfer from {}: addressed to {}, not to us",
                request.iam,
                request.youare
            );
            return ReceiveOutcome::rejected(ReceiveStatus::WrongTarget);
        }

        if !self.policy.grants_receive() {
            tracing::info!(
                "Rejected transfer from {}: receipt not granted (allow_receive={}, robinson={})",
                request.iam,
                self.policy.allow_receive,
                self.policy.robinson
            );
            return ReceiveOutcome::rejected(ReceiveStatus::NotGranted);
        }

        if request.urlc > self.policy.max_entries {
            tracing::warn!(
                "Rejected transfer from {}: {} entries declared, limit is {}",
                request.iam,
                request.urlc,
                self.policy.max_entries
            );
            return ReceiveOutcome::rejected(ReceiveStatus::TooManyEntries);
        }

        let mut accepted = 0usize;
        let mut blocked = 0usize;

        let batch = self.segment.urls().batch();
        let size_before = batch.size();

        for i in 0..request.urlc {
            let checked = match request.entry(i) {
                Some(raw) => self.policy.check_entry(raw),
                None => Err(EntryError::Malformed(format!("entry url{} is missing", i))),
            };

            let entry = match checked {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::debug!("Blocked entry {} from {}: {}", i, request.iam, e);
                    blocked += 1;
                    continue;
                }
            };

            let (url_hash, url) = (entry.hash, entry.url.clone());
            match batch.store(entry) {
                Ok(()) => {
                    accepted += 1;
                    self.transfers
                        .record(EventOrigin::DhtPush, url_hash, &url, &request.iam);
                }
                Err(e) => {
                    tracing::error!("Could not store entry {} ({}): {}", url_hash, url, e);
                }
            }
        }

        let size_after = batch.size();
        drop(batch);

        let duplicates = accepted.saturating_sub(size_after.saturating_sub(size_before));
        if duplicates > 0 {
            tracing::warn!(
                "Transfer from {} carried {} duplicate entries out of {} accepted",
                request.iam,
                duplicates,
                accepted
            );
        }

        self.peers
            .get_or_register(&request.iam)
            .increment_received_urls(accepted as u64);

        tracing::info!(
            "Received {} urls from {}: {} accepted, {} blocked, {} duplicates",
            request.urlc,
            request.iam,
            accepted,
            blocked,
            duplicates
        );

        ReceiveOutcome {
            status: ReceiveStatus::Ok,
            accepted,
            blocked,
            duplicates,
        }
    }
}
