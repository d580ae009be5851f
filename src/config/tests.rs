//! Config Module Tests
//!
//! ## Test Scopes
//! - **Defaults**: values a node runs with when nothing is set.
//! - **Receive policy**: flags that shape inbound transfers.

#[cfg(test)]
mod tests {
    use crate::config::NodeConfig;
    use crate::peers::types::PeerHash;
    use crate::replication::policy::{DEFAULT_MAX_TRANSFER_ENTRIES, DomainScope};
    use clap::Parser;

    // ============================================================
    // DEFAULTS
    // ============================================================

    #[test]
    fn test_defaults() {
        let config = NodeConfig::try_parse_from(["peer-search-node"]).unwrap();

        assert!(config.allow_receive);
        assert!(config.blacklist_on_receive);
        assert!(!config.robinson);
        assert_eq!(config.domain_scope, DomainScope::Global);
        assert_eq!(config.max_transfer_entries, DEFAULT_MAX_TRANSFER_ENTRIES);
        assert_eq!(config.pipeline().queue_capacity, 64);
        assert_eq!(config.pipeline().workers, 2);
        assert!(config.url_capacity.is_none());
    }

    // ============================================================
    // RECEIVE POLICY
    // ============================================================

    #[test]
    fn test_flags_build_receive_policy() {
        let config = NodeConfig::try_parse_from([
            "peer-search-node",
            "--peer-hash",
            "abcdefabcdef",
            "--robinson",
            "true",
            "--domain-scope",
            "local",
            "--max-transfer-entries",
            "50",
            "--blacklist",
            "^ads\\.",
            "--blacklist",
            "tracker",
        ])
        .unwrap();

        let policy = config.receive_policy().unwrap();

        assert_eq!(config.local_peer(), PeerHash::from("abcdefabcdef"));
        assert!(!policy.grants_receive());
        assert_eq!(policy.domain_scope, DomainScope::Local);
        assert_eq!(policy.max_entries, 50);
        assert_eq!(policy.blacklist.len(), 2);
    }

    #[test]
    fn test_comma_separated_blacklist_yields_one_pattern_each() {
        let config = NodeConfig::try_parse_from([
            "peer-search-node",
            "--blacklist",
            "^ads\\.,tracker,spam\\.example$",
        ])
        .unwrap();

        assert_eq!(
            config.blacklist,
            vec!["^ads\\.", "tracker", "spam\\.example$"]
        );
        assert_eq!(config.receive_policy().unwrap().blacklist.len(), 3);
    }

    #[test]
    fn test_bad_blacklist_pattern_is_an_error() {
        let config =
            NodeConfig::try_parse_from(["peer-search-node", "--blacklist", "(unclosed"]).unwrap();

        assert!(config.receive_policy().is_err());
    }
}
