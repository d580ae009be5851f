//! Sender authentication for inbound transfers.
//!
//! Handlers receive a raw request, but the receiver only accepts an
//! [`Authenticated`] wrapper, which can only be produced by [`NetworkAuth`].

use super::protocol::TransferUrlsRequest;

use std::ops::Deref;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("peer belongs to network '{got}', expected '{expected}'")]
    WrongNetwork { expected: String, got: String },
    #[error("missing network key")]
    MissingKey,
    #[error("network key does not match")]
    BadKey,
}

/// Requests that carry network credentials.
pub trait NetworkCredentials {
    fn network(&self) -> &str;
    fn key(&self) -> Option<&str>;
}

impl NetworkCredentials for TransferUrlsRequest {
    fn network(&self) -> &str {
        &self.network
    }

    fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }
}

/// A request whose credentials have been checked.
#[derive(Debug, Clone)]
pub struct Authenticated<T> {
    inner: T,
}

impl<T> Authenticated<T> {
    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl<T> Deref for Authenticated<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.inner
    }
}

/// Checks that a peer belongs to this node's network.
#[derive(Debug, Clone)]
pub struct NetworkAuth {
    network: String,
    secret: Option<String>,
}

impl NetworkAuth {
    pub fn new(network: impl Into<String>, secret: Option<String>) -> Self {
        Self {
            network: network.into(),
            secret,
        }
    }

    pub fn network(&self) -> &str {
        &self.network
    }

    pub fn authenticate<T: NetworkCredentials>(
        &self,
        request: T,
    ) -> Result<Authenticated<T>, AuthError> {
        if request.network() != self.network {
            return Err(AuthError::WrongNetwork {
                expected: self.network.clone(),
                got: request.network().to_string(),
            });
        }

        if let Some(secret) = &self.secret {
            match request.key() {
                None => return Err(AuthError::MissingKey),
                Some(key) if key != secret => return Err(AuthError::BadKey),
                Some(_) => {}
            }
        }

        Ok(Authenticated { inner: request })
    }
}
