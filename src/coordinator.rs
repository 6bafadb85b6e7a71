//! Mediates user-triggered mutations against the backend.
//!
//! Updates are pessimistic throughout: local state changes only after
//! the backend confirms, and a failed call leaves everything it did not
//! confirm untouched.

use std::sync::Arc;

use tracing::{info, warn};

use crate::api::{BackendGateway, VerifyOutcome};
use crate::error::ClientError;
use crate::models::{AccountStatus, CredentialForm, LeaderConfig};
use crate::reconciler::StatusReconciler;
use crate::state::ClientState;

/// Advisory shown when a freshly created account has no balance yet.
/// Non-fatal: the backend simply has not pulled the first balance.
pub const BALANCE_PENDING_ADVISORY: &str = "balance not yet available";

/// Drives start/stop, leader, and follower-account actions.
pub struct ActionCoordinator {
    gateway: Arc<dyn BackendGateway>,
    state: ClientState,
    reconciler: Arc<StatusReconciler>,
}

impl ActionCoordinator {
    pub fn new(
        gateway: Arc<dyn BackendGateway>,
        state: ClientState,
        reconciler: Arc<StatusReconciler>,
    ) -> Self {
        Self {
            gateway,
            state,
            reconciler,
        }
    }

    /// Replace the registry with the server's current account list.
    pub async fn load_accounts(&self) -> Result<(), ClientError> {
        match self.gateway.list_accounts().await {
            Ok(accounts) => {
                info!(count = accounts.len(), "Loaded follower accounts");
                self.state.registry.write().await.replace_all(accounts);
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Account list load failed");
                self.state
                    .registry
                    .write()
                    .await
                    .mark_load_failed(e.to_string());
                Err(e)
            }
        }
    }

    /// Refresh the global copy state. Failures set the view's error
    /// marker and keep the last known value on screen.
    pub async fn refresh_global(&self) {
        match self.gateway.copy_status().await {
            Ok(state) => self.state.global.write().await.apply(state),
            Err(e) => {
                warn!(error = %e, "Copy status refresh failed");
                self.state.global.write().await.mark_failed(e.to_string());
            }
        }
    }

    pub async fn start_copy(&self) -> Result<(), ClientError> {
        self.gateway.start_copy().await?;
        info!("Copying started");
        self.refresh_global().await;
        Ok(())
    }

    pub async fn stop_copy(&self) -> Result<(), ClientError> {
        self.gateway.stop_copy().await?;
        info!("Copying stopped");
        self.refresh_global().await;
        Ok(())
    }

    /// Save leader credentials. On success the caller's secret is
    /// cleared in place so it never outlives the one send that needs it.
    pub async fn set_leader(&self, config: &mut LeaderConfig) -> Result<(), ClientError> {
        let payload = config.trimmed();
        payload.validate()?;

        self.gateway.set_leader(&payload).await?;
        config.api_secret.clear();
        info!(env = %payload.env, "Leader credentials saved");

        self.refresh_global().await;
        Ok(())
    }

    /// Dry-run credential check. A rejection from the backend is a
    /// verification verdict, not a client failure.
    pub async fn verify_follower(
        &self,
        form: &CredentialForm,
    ) -> Result<VerifyOutcome, ClientError> {
        let credential = form.to_credential()?;
        match self.gateway.verify_credentials(&credential).await {
            Ok(outcome) => Ok(outcome),
            Err(ClientError::Backend {
                status: 400,
                detail,
            }) => Ok(VerifyOutcome {
                valid: false,
                error: detail,
            }),
            Err(e) => Err(e),
        }
    }

    /// Create a follower account, reload the list, refresh its live
    /// data, and probe the new account's balance once. An unfunded (or
    /// not yet fetchable) balance yields the non-fatal advisory.
    pub async fn create_follower(
        &self,
        form: &CredentialForm,
    ) -> Result<Option<&'static str>, ClientError> {
        let account = form.to_new_account()?;
        let created = self.gateway.create_follower_account(&account).await?;
        info!(name = %created.name, "Follower account created");

        if self.load_accounts().await.is_err() {
            warn!(name = %created.name, "Account list reload after create failed");
        }
        self.reconciler.poll_once().await;

        let advisory = match self.gateway.fetch_balance(&created.name).await {
            Ok(balance) if balance.is_unfunded() => Some(BALANCE_PENDING_ADVISORY),
            Ok(_) => None,
            Err(e) => {
                warn!(name = %created.name, error = %e, "Initial balance probe failed");
                Some(BALANCE_PENDING_ADVISORY)
            }
        };
        Ok(advisory)
    }

    pub async fn delete_follower(&self, name: &str) -> Result<(), ClientError> {
        self.gateway.delete_follower_account(name).await?;
        info!(name = %name, "Follower account deleted");

        if self.load_accounts().await.is_err() {
            warn!(name = %name, "Account list reload after delete failed");
        }
        Ok(())
    }

    /// Flip one account between active and paused.
    ///
    /// The registry is consulted first: a vanished account fails locally
    /// without a network call. On confirmed success the local status
    /// flips and any stale action error clears; on failure nothing moves
    /// and the message is recorded against the account. No retry.
    pub async fn toggle(&self, name: &str) -> Result<AccountStatus, ClientError> {
        let current = self
            .state
            .registry
            .read()
            .await
            .status_of(name)
            .ok_or_else(|| ClientError::NotFound(name.to_string()))?;
        let target = current.toggled();

        match self.gateway.update_account_status(name, target).await {
            Ok(()) => {
                let mut registry = self.state.registry.write().await;
                registry.apply_status(name, target);
                registry.clear_action_error(name);
                info!(name = %name, status = %target, "Account status updated");
                Ok(target)
            }
            Err(e) => {
                warn!(name = %name, error = %e, "Status toggle failed");
                self.state
                    .registry
                    .write()
                    .await
                    .set_action_error(name, e.to_string());
                Err(e)
            }
        }
    }
}
