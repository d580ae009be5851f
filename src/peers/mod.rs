//! Remote peer identities and their contribution counters.

pub mod registry;
pub mod types;
