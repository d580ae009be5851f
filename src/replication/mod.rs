//! DHT Replication (Inbound)
//!
//! Lets remote peers push URL metadata into the local index.
//!
//! ## Submodules
//! - **`protocol`**: endpoints and wire DTOs.
//! - **`auth`**: network membership check producing `Authenticated` requests.
//! - **`policy`**: grant switches and per-entry acceptance rules.
//! - **`receiver`**: the transfer handler with duplicate accounting.
//! - **`transfer_log`**: recent accepted transfers for observability.
//! - **`handlers`**: axum endpoints.

pub mod auth;
pub mod handlers;
pub mod policy;
pub mod protocol;
pub mod receiver;
pub mod transfer_log;
