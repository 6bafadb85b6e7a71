//! Error taxonomy shared across the client.

use thiserror::Error;

/// Failures a client operation can surface.
///
/// `Validation` and `NotFound` are local and never involve the network;
/// `Transport` and `Backend` come out of the gateway. Display output is
/// what the user sees, so `Backend` prefers the server-supplied detail.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// Input rejected before any network call.
    #[error("{0}")]
    Validation(String),

    /// Connectivity, timeout, or response-decoding failure.
    #[error("request failed: {0}")]
    Transport(String),

    /// Non-2xx response from the backend.
    #[error("{}", display_backend(.status, .detail))]
    Backend {
        status: u16,
        detail: Option<String>,
    },

    /// Operation targeted an account no longer in the local registry.
    #[error("unknown account: {0}")]
    NotFound(String),
}

impl ClientError {
    pub fn backend(status: u16, detail: Option<String>) -> Self {
        let detail = detail.filter(|d| !d.trim().is_empty());
        ClientError::Backend { status, detail }
    }

    pub fn transport(err: impl std::fmt::Display) -> Self {
        ClientError::Transport(err.to_string())
    }
}

fn display_backend(status: &u16, detail: &Option<String>) -> String {
    match detail {
        Some(d) => d.clone(),
        None => format!("backend returned HTTP {status}"),
    }
}
