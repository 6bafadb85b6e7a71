//! Follower account records and the poll-refreshed snapshots around them.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::credentials::{Env, Exchange};

/// Copy state of a single follower account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    Active,
    Paused,
}

impl AccountStatus {
    /// The state a toggle moves to.
    pub fn toggled(self) -> Self {
        match self {
            AccountStatus::Active => AccountStatus::Paused,
            AccountStatus::Paused => AccountStatus::Active,
        }
    }

    /// Label of the action that would leave this state.
    pub fn action_label(self) -> &'static str {
        match self {
            AccountStatus::Active => "Pause",
            AccountStatus::Paused => "Resume",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AccountStatus::Active => "active",
            AccountStatus::Paused => "paused",
        }
    }
}

impl std::fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A follower account as the backend reports it.
///
/// The record is server-owned: the client caches it, never fabricates
/// one, and mutates `status` only after a confirmed toggle request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FollowerAccount {
    pub name: String,
    pub exchange: Exchange,
    pub env: Env,
    pub status: AccountStatus,
}

/// Asset symbol to amount, as returned by the balance endpoint.
///
/// An absent snapshot means "not yet fetched"; an empty or all-zero map
/// is a real answer and is kept distinct from it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BalanceSnapshot(pub HashMap<String, Decimal>);

impl BalanceSnapshot {
    pub fn asset(&self, symbol: &str) -> Option<Decimal> {
        self.0.get(symbol).copied()
    }

    /// Empty, or every amount zero. Freshly created accounts report this
    /// until the backend has pulled their first balance.
    pub fn is_unfunded(&self) -> bool {
        self.0.values().all(|v| v.is_zero())
    }
}

/// Outcome of the most recent copy attempt for one account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CopyResult {
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
}

/// Global on/off state of the mirroring process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalCopyState {
    pub running: bool,
    #[serde(default)]
    pub leader: Option<String>,
}
