//! In-memory registry of follower accounts and their live view state.
//!
//! The registry is the single mutable store behind the account table.
//! `replace_all` is the only bulk add/remove; everything else merges
//! into existing entries and treats unknown names as no-ops, because an
//! account may be deleted between a poll dispatch and its response.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::models::{AccountStatus, BalanceSnapshot, CopyResult, FollowerAccount};

/// Latest balance knowledge for one account.
///
/// `snapshot` is the last successfully fetched value and survives later
/// fetch failures; `error` marks whether the most recent fetch failed.
/// A `None` snapshot means the balance was never fetched at all.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BalanceView {
    pub snapshot: Option<BalanceSnapshot>,
    pub error: Option<String>,
}

/// One registry entry: the server-owned record plus derived view state.
#[derive(Debug, Clone)]
pub struct AccountEntry {
    pub account: FollowerAccount,
    pub balance: BalanceView,
    pub result: Option<CopyResult>,
    /// Message from the last failed user action on this account.
    pub action_error: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
    balance_tick: u64,
    result_tick: u64,
}

impl AccountEntry {
    fn new(account: FollowerAccount) -> Self {
        Self {
            account,
            balance: BalanceView::default(),
            result: None,
            action_error: None,
            updated_at: None,
            balance_tick: 0,
            result_tick: 0,
        }
    }

    /// Error to show for this account: a failed action wins over a
    /// reported copy failure.
    pub fn display_error(&self) -> Option<&str> {
        if let Some(err) = &self.action_error {
            return Some(err);
        }
        match &self.result {
            Some(r) if !r.success => r.error.as_deref(),
            _ => None,
        }
    }
}

/// Authoritative local copy of the follower account list.
#[derive(Debug, Default)]
pub struct AccountRegistry {
    entries: BTreeMap<String, AccountEntry>,
    load_error: Option<String>,
}

impl AccountRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild the registry from the server's account list.
    ///
    /// Balance and result views carry over for names that survive, so a
    /// reload between poll ticks does not blank live data. Names absent
    /// from the new list are dropped; a duplicated name in the payload
    /// collapses to its last occurrence.
    pub fn replace_all(&mut self, accounts: Vec<FollowerAccount>) {
        let mut old = std::mem::take(&mut self.entries);
        for account in accounts {
            let entry = match old.remove(&account.name) {
                Some(mut existing) => {
                    existing.account = account;
                    existing
                }
                None => AccountEntry::new(account),
            };
            self.entries.insert(entry.account.name.clone(), entry);
        }
        self.load_error = None;
    }

    /// Put the registry into an explicit load-error state. Existing
    /// entries stay visible, flagged stale by the error.
    pub fn mark_load_failed(&mut self, error: impl Into<String>) {
        self.load_error = Some(error.into());
    }

    pub fn load_error(&self) -> Option<&str> {
        self.load_error.as_deref()
    }

    /// Merge a balance fetch outcome from poll tick `tick`.
    ///
    /// Unknown names are no-ops. A tick older than the last one applied
    /// for this account is discarded so a straggling response can never
    /// overwrite fresher data. Failures keep the previous snapshot and
    /// set the error marker.
    pub fn apply_balance(
        &mut self,
        name: &str,
        tick: u64,
        outcome: Result<BalanceSnapshot, String>,
    ) {
        let Some(entry) = self.entries.get_mut(name) else {
            debug!(name = %name, "Balance for unknown account dropped");
            return;
        };
        if tick < entry.balance_tick {
            debug!(name = %name, tick, last = entry.balance_tick, "Stale balance dropped");
            return;
        }
        entry.balance_tick = tick;
        match outcome {
            Ok(snapshot) => {
                entry.balance.snapshot = Some(snapshot);
                entry.balance.error = None;
            }
            Err(message) => entry.balance.error = Some(message),
        }
        entry.updated_at = Some(Utc::now());
    }

    /// Merge a copy result from poll tick `tick`. Same no-op and
    /// staleness rules as balances. Absence of a result for a name is
    /// handled by simply not calling this, leaving the prior value.
    pub fn apply_result(&mut self, name: &str, tick: u64, result: CopyResult) {
        let Some(entry) = self.entries.get_mut(name) else {
            debug!(name = %name, "Result for unknown account dropped");
            return;
        };
        if tick < entry.result_tick {
            debug!(name = %name, tick, last = entry.result_tick, "Stale result dropped");
            return;
        }
        entry.result_tick = tick;
        entry.result = Some(result);
        entry.updated_at = Some(Utc::now());
    }

    /// Record a confirmed status change. Used only after the backend
    /// acknowledged the toggle; returns false for unknown names.
    pub fn apply_status(&mut self, name: &str, status: AccountStatus) -> bool {
        match self.entries.get_mut(name) {
            Some(entry) => {
                entry.account.status = status;
                true
            }
            None => false,
        }
    }

    pub fn set_action_error(&mut self, name: &str, message: impl Into<String>) {
        if let Some(entry) = self.entries.get_mut(name) {
            entry.action_error = Some(message.into());
        }
    }

    pub fn clear_action_error(&mut self, name: &str) {
        if let Some(entry) = self.entries.get_mut(name) {
            entry.action_error = None;
        }
    }

    pub fn get(&self, name: &str) -> Option<&AccountEntry> {
        self.entries.get(name)
    }

    pub fn status_of(&self, name: &str) -> Option<AccountStatus> {
        self.entries.get(name).map(|e| e.account.status)
    }

    pub fn names(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    pub fn entries(&self) -> impl Iterator<Item = &AccountEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
