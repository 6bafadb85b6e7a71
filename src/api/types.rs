//! Wire types for the backend REST surface.

use serde::{Deserialize, Serialize};

use crate::models::AccountStatus;

/// Response to a create-account request.
#[derive(Debug, Clone, Deserialize)]
pub struct CreatedAccount {
    pub name: String,
}

/// Response to a credential verification request.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct VerifyOutcome {
    pub valid: bool,
    #[serde(default)]
    pub error: Option<String>,
}

/// Body of a status update request.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct StatusUpdate {
    pub status: AccountStatus,
}

/// Error body the backend attaches to non-2xx responses.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub detail: Option<String>,
}
