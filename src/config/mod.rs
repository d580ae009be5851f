//! Node configuration from command-line flags and `PEER_SEARCH_*` environment variables.

use crate::index::segmented::DEFAULT_RAM_LIMIT;
use crate::indexing::pipeline::PipelineConfig;
use crate::peers::types::PeerHash;
use crate::replication::policy::{
    Blacklist, DEFAULT_MAX_TRANSFER_ENTRIES, DomainScope, ReceivePolicy,
};

use clap::{ArgAction, Parser};
use std::net::SocketAddr;

#[derive(Parser, Debug, Clone)]
#[command(name = "peer-search-node", about = "Peer-to-peer web search node")]
pub struct NodeConfig {
    /// HTTP listen address
    #[arg(long, env = "PEER_SEARCH_BIND", default_value = "127.0.0.1:8090")]
    pub bind: SocketAddr,

    /// Own peer hash; a random one is generated when absent
    #[arg(long, env = "PEER_SEARCH_PEER_HASH")]
    pub peer_hash: Option<String>,

    /// Name of the search network this node belongs to
    #[arg(long, env = "PEER_SEARCH_NETWORK", default_value = "freeworld")]
    pub network: String,

    /// Shared secret peers must present
    #[arg(long, env = "PEER_SEARCH_NETWORK_SECRET")]
    pub network_secret: Option<String>,

    /// Accept index transfers from other peers
    #[arg(long, env = "PEER_SEARCH_ALLOW_RECEIVE", default_value_t = true, action = ArgAction::Set)]
    pub allow_receive: bool,

    /// Drop received entries whose host is blacklisted
    #[arg(long, env = "PEER_SEARCH_BLACKLIST_ON_RECEIVE", default_value_t = true, action = ArgAction::Set)]
    pub blacklist_on_receive: bool,

    /// Run as a robinson peer that never accepts remote index data
    #[arg(long, env = "PEER_SEARCH_ROBINSON", default_value_t = false, action = ArgAction::Set)]
    pub robinson: bool,

    /// Address space this node indexes
    #[arg(long, env = "PEER_SEARCH_DOMAIN_SCOPE", value_enum, default_value_t = DomainScope::Global)]
    pub domain_scope: DomainScope,

    /// Host pattern (regex) to refuse; repeat the flag or separate patterns with commas
    #[arg(long = "blacklist", env = "PEER_SEARCH_BLACKLIST", value_delimiter = ',')]
    pub blacklist: Vec<String>,

    /// Largest entry count a peer may declare in one transfer
    #[arg(long, env = "PEER_SEARCH_MAX_TRANSFER_ENTRIES", default_value_t = DEFAULT_MAX_TRANSFER_ENTRIES)]
    pub max_transfer_entries: usize,

    /// Bound of every pipeline stage queue
    #[arg(long, env = "PEER_SEARCH_QUEUE_CAPACITY", default_value_t = 64)]
    pub queue_capacity: usize,

    /// Workers per pipeline stage
    #[arg(long, env = "PEER_SEARCH_WORKERS", default_value_t = 2)]
    pub workers: usize,

    /// Words buffered in RAM before the index freezes a segment
    #[arg(long, env = "PEER_SEARCH_RAM_LIMIT", default_value_t = DEFAULT_RAM_LIMIT)]
    pub ram_limit: usize,

    /// Maximum number of URL metadata entries; unlimited when absent
    #[arg(long, env = "PEER_SEARCH_URL_CAPACITY")]
    pub url_capacity: Option<usize>,
}

impl NodeConfig {
    pub fn local_peer(&self) -> PeerHash {
        match &self.peer_hash {
            Some(hash) => PeerHash(hash.clone()),
            None => PeerHash::new(),
        }
    }

    pub fn receive_policy(&self) -> Result<ReceivePolicy, regex::Error> {
        Ok(ReceivePolicy {
            allow_receive: self.allow_receive,
            blacklist_on_receive: self.blacklist_on_receive,
            robinson: self.robinson,
            domain_scope: self.domain_scope,
            blacklist: Blacklist::new(&self.blacklist)?,
            max_entries: self.max_transfer_entries,
        })
    }

    pub fn pipeline(&self) -> PipelineConfig {
        PipelineConfig {
            workers: self.workers,
            queue_capacity: self.queue_capacity,
        }
    }
}

#[cfg(test)]
mod tests;
