//! In-memory gateway fake for exercising the reconciler and coordinator.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::api::{BackendGateway, CreatedAccount, VerifyOutcome};
use crate::error::ClientError;
use crate::models::{
    AccountStatus, BalanceSnapshot, CopyResult, Env, Exchange, FollowerAccount,
    FollowerCredential, GlobalCopyState, LeaderConfig, NewFollowerAccount,
};

pub fn account(name: &str, status: AccountStatus) -> FollowerAccount {
    FollowerAccount {
        name: name.to_string(),
        exchange: Exchange::Binance,
        env: Env::Live,
        status,
    }
}

/// Scriptable `BackendGateway` that records every call it receives.
///
/// Unconfigured balances come back as empty snapshots, which is also
/// what the backend reports for a freshly created account.
pub struct FakeGateway {
    accounts: Mutex<Vec<FollowerAccount>>,
    balances: Mutex<HashMap<String, Result<BalanceSnapshot, ClientError>>>,
    results: Mutex<HashMap<String, CopyResult>>,
    copy_state: Mutex<GlobalCopyState>,
    verify_outcome: Mutex<Result<VerifyOutcome, ClientError>>,
    list_error: Mutex<Option<ClientError>>,
    results_error: Mutex<Option<ClientError>>,
    status_error: Mutex<Option<ClientError>>,
    status_update_error: Mutex<Option<ClientError>>,
    leader_error: Mutex<Option<ClientError>>,
    create_error: Mutex<Option<ClientError>>,
    calls: Mutex<Vec<String>>,
}

impl Default for FakeGateway {
    fn default() -> Self {
        Self {
            accounts: Mutex::new(Vec::new()),
            balances: Mutex::new(HashMap::new()),
            results: Mutex::new(HashMap::new()),
            copy_state: Mutex::new(GlobalCopyState {
                running: false,
                leader: None,
            }),
            verify_outcome: Mutex::new(Ok(VerifyOutcome {
                valid: true,
                error: None,
            })),
            list_error: Mutex::new(None),
            results_error: Mutex::new(None),
            status_error: Mutex::new(None),
            status_update_error: Mutex::new(None),
            leader_error: Mutex::new(None),
            create_error: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
        }
    }
}

impl FakeGateway {
    pub fn set_accounts(&self, accounts: Vec<FollowerAccount>) {
        *self.accounts.lock().unwrap() = accounts;
    }

    pub fn set_balance(&self, name: &str, outcome: Result<BalanceSnapshot, ClientError>) {
        self.balances.lock().unwrap().insert(name.to_string(), outcome);
    }

    pub fn set_results(&self, results: HashMap<String, CopyResult>) {
        *self.results.lock().unwrap() = results;
    }

    pub fn fail_results(&self, error: ClientError) {
        *self.results_error.lock().unwrap() = Some(error);
    }

    pub fn fail_list(&self, error: ClientError) {
        *self.list_error.lock().unwrap() = Some(error);
    }

    pub fn fail_status(&self, error: ClientError) {
        *self.status_error.lock().unwrap() = Some(error);
    }

    pub fn fail_status_update(&self, error: ClientError) {
        *self.status_update_error.lock().unwrap() = Some(error);
    }

    pub fn fail_leader(&self, error: ClientError) {
        *self.leader_error.lock().unwrap() = Some(error);
    }

    pub fn fail_create(&self, error: ClientError) {
        *self.create_error.lock().unwrap() = Some(error);
    }

    pub fn set_verify(&self, outcome: Result<VerifyOutcome, ClientError>) {
        *self.verify_outcome.lock().unwrap() = outcome;
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, op: &str) {
        self.calls.lock().unwrap().push(op.to_string());
    }

    /// Failure knobs are one-shot: consumed by the next matching call.
    fn take(slot: &Mutex<Option<ClientError>>) -> Option<ClientError> {
        slot.lock().unwrap().take()
    }
}

#[async_trait]
impl BackendGateway for FakeGateway {
    async fn copy_status(&self) -> Result<GlobalCopyState, ClientError> {
        self.record("copy_status");
        if let Some(err) = Self::take(&self.status_error) {
            return Err(err);
        }
        Ok(self.copy_state.lock().unwrap().clone())
    }

    async fn set_leader(&self, config: &LeaderConfig) -> Result<(), ClientError> {
        self.record("set_leader");
        if let Some(err) = Self::take(&self.leader_error) {
            return Err(err);
        }
        self.copy_state.lock().unwrap().leader = Some(config.api_key.clone());
        Ok(())
    }

    async fn start_copy(&self) -> Result<(), ClientError> {
        self.record("start_copy");
        self.copy_state.lock().unwrap().running = true;
        Ok(())
    }

    async fn stop_copy(&self) -> Result<(), ClientError> {
        self.record("stop_copy");
        self.copy_state.lock().unwrap().running = false;
        Ok(())
    }

    async fn list_accounts(&self) -> Result<Vec<FollowerAccount>, ClientError> {
        self.record("list_accounts");
        if let Some(err) = Self::take(&self.list_error) {
            return Err(err);
        }
        Ok(self.accounts.lock().unwrap().clone())
    }

    async fn create_follower_account(
        &self,
        account: &NewFollowerAccount,
    ) -> Result<CreatedAccount, ClientError> {
        self.record("create_follower_account");
        if let Some(err) = Self::take(&self.create_error) {
            return Err(err);
        }
        let (exchange, env) = match &account.credential {
            FollowerCredential::Binance { env, .. } => (Exchange::Binance, *env),
            FollowerCredential::Bitget { env, .. } => (Exchange::Bitget, *env),
        };
        self.accounts.lock().unwrap().push(FollowerAccount {
            name: account.name.clone(),
            exchange,
            env,
            status: AccountStatus::Active,
        });
        Ok(CreatedAccount {
            name: account.name.clone(),
        })
    }

    async fn delete_follower_account(&self, name: &str) -> Result<(), ClientError> {
        self.record("delete_follower_account");
        let mut accounts = self.accounts.lock().unwrap();
        let before = accounts.len();
        accounts.retain(|a| a.name != name);
        if accounts.len() == before {
            return Err(ClientError::backend(404, Some("account not found".into())));
        }
        Ok(())
    }

    async fn verify_credentials(
        &self,
        _credential: &FollowerCredential,
    ) -> Result<VerifyOutcome, ClientError> {
        self.record("verify_credentials");
        self.verify_outcome.lock().unwrap().clone()
    }

    async fn fetch_balance(&self, name: &str) -> Result<BalanceSnapshot, ClientError> {
        self.record("fetch_balance");
        match self.balances.lock().unwrap().get(name) {
            Some(outcome) => outcome.clone(),
            None => Ok(BalanceSnapshot::default()),
        }
    }

    async fn fetch_copy_results(&self) -> Result<HashMap<String, CopyResult>, ClientError> {
        self.record("fetch_copy_results");
        if let Some(err) = Self::take(&self.results_error) {
            return Err(err);
        }
        Ok(self.results.lock().unwrap().clone())
    }

    async fn update_account_status(
        &self,
        name: &str,
        status: AccountStatus,
    ) -> Result<(), ClientError> {
        self.record("update_account_status");
        if let Some(err) = Self::take(&self.status_update_error) {
            return Err(err);
        }
        let mut accounts = self.accounts.lock().unwrap();
        match accounts.iter_mut().find(|a| a.name == name) {
            Some(account) => {
                account.status = status;
                Ok(())
            }
            None => Err(ClientError::backend(404, Some("account not found".into()))),
        }
    }
}
