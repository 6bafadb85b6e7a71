//! Data models for credentials, accounts, balances, and copy results.

mod account;
mod credentials;

pub use account::{AccountStatus, BalanceSnapshot, CopyResult, FollowerAccount, GlobalCopyState};
pub use credentials::{
    CredentialForm, Env, Exchange, FollowerCredential, LeaderConfig, NewFollowerAccount,
};
