//! Polling loop that keeps balances and copy results current.
//!
//! Every tick gets a monotonically increasing sequence number that the
//! registry uses to discard straggling responses from older ticks.
//! Ticks are serialized through an async mutex, so a slow tick and the
//! next timer fire (or a coordinator-triggered refresh) never interleave
//! their merges.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::sync::Mutex;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, warn};

use crate::api::BackendGateway;
use crate::state::SharedRegistry;

/// Timer-driven refresher for per-account balances and copy results.
pub struct StatusReconciler {
    gateway: Arc<dyn BackendGateway>,
    registry: SharedRegistry,
    period: Duration,
    tick_seq: AtomicU64,
    tick_gate: Mutex<()>,
    shutdown: Arc<AtomicBool>,
}

impl StatusReconciler {
    pub fn new(gateway: Arc<dyn BackendGateway>, registry: SharedRegistry, period: Duration) -> Self {
        Self {
            gateway,
            registry,
            period,
            tick_seq: AtomicU64::new(0),
            tick_gate: Mutex::new(()),
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Flag for external shutdown control.
    pub fn shutdown_signal(&self) -> Arc<AtomicBool> {
        self.shutdown.clone()
    }

    /// Run until the shutdown flag is set. Poll failures are contained
    /// per account and per tick; nothing here ends the loop early.
    pub async fn run(&self) {
        let mut ticker = interval(self.period);
        // A tick that overruns the period delays the next one instead of
        // bursting, keeping ticks strictly sequential.
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        while !self.shutdown.load(Ordering::SeqCst) {
            ticker.tick().await;
            if self.shutdown.load(Ordering::SeqCst) {
                break;
            }
            self.poll_once().await;
        }
        debug!("Reconciler stopped");
    }

    /// One full refresh cycle: balances for every known account fetched
    /// concurrently, then the results map once, all merged under the
    /// tick's sequence number.
    ///
    /// Public so user actions can force a refresh; the gate keeps such a
    /// call from overlapping a timer tick.
    pub async fn poll_once(&self) {
        let _gate = self.tick_gate.lock().await;
        let tick = self.tick_seq.fetch_add(1, Ordering::SeqCst) + 1;

        let names = self.registry.read().await.names();
        debug!(tick, accounts = names.len(), "Poll tick");

        self.refresh_balances(tick, &names).await;
        self.refresh_results(tick).await;
    }

    /// Sequence number of the last started tick.
    pub fn current_tick(&self) -> u64 {
        self.tick_seq.load(Ordering::SeqCst)
    }

    async fn refresh_balances(&self, tick: u64, names: &[String]) {
        let fetches = names.iter().map(|name| {
            let gateway = self.gateway.clone();
            async move {
                let outcome = gateway.fetch_balance(name).await;
                (name.clone(), outcome)
            }
        });

        let outcomes = join_all(fetches).await;

        let mut registry = self.registry.write().await;
        for (name, outcome) in outcomes {
            match outcome {
                Ok(snapshot) => registry.apply_balance(&name, tick, Ok(snapshot)),
                Err(e) => {
                    warn!(name = %name, error = %e, "Balance fetch failed");
                    registry.apply_balance(&name, tick, Err(e.to_string()));
                }
            }
        }
    }

    async fn refresh_results(&self, tick: u64) {
        match self.gateway.fetch_copy_results().await {
            Ok(results) => {
                let mut registry = self.registry.write().await;
                for (name, result) in results {
                    registry.apply_result(&name, tick, result);
                }
            }
            // Accounts keep their previous result; the next tick retries.
            Err(e) => warn!(error = %e, "Copy results fetch failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AccountStatus, BalanceSnapshot, CopyResult};
    use crate::registry::AccountRegistry;
    use crate::testutil::{account, FakeGateway};
    use rust_decimal_macros::dec;
    use std::collections::HashMap;
    use tokio::sync::RwLock;

    fn usdt(amount: rust_decimal::Decimal) -> BalanceSnapshot {
        BalanceSnapshot(HashMap::from([("USDT".to_string(), amount)]))
    }

    fn registry_with(accounts: Vec<&str>) -> SharedRegistry {
        let mut registry = AccountRegistry::new();
        registry.replace_all(
            accounts
                .into_iter()
                .map(|n| account(n, AccountStatus::Active))
                .collect(),
        );
        Arc::new(RwLock::new(registry))
    }

    #[tokio::test]
    async fn test_poll_merges_balances_and_results() {
        let gateway = Arc::new(FakeGateway::default());
        gateway.set_balance("a", Ok(usdt(dec!(10))));
        gateway.set_balance("b", Ok(usdt(dec!(20))));
        gateway.set_results(HashMap::from([(
            "a".to_string(),
            CopyResult {
                success: true,
                error: None,
            },
        )]));

        let registry = registry_with(vec!["a", "b"]);
        let reconciler = StatusReconciler::new(gateway, registry.clone(), Duration::from_secs(5));
        reconciler.poll_once().await;

        let registry = registry.read().await;
        assert_eq!(
            registry.get("a").unwrap().balance.snapshot,
            Some(usdt(dec!(10)))
        );
        assert!(registry.get("a").unwrap().result.as_ref().unwrap().success);
        // No result entry for "b" means no result yet, not a failure.
        assert!(registry.get("b").unwrap().result.is_none());
    }

    #[tokio::test]
    async fn test_one_account_failure_does_not_poison_others() {
        let gateway = Arc::new(FakeGateway::default());
        gateway.set_balance("a", Err(crate::error::ClientError::Transport("timeout".into())));
        gateway.set_balance("b", Ok(usdt(dec!(7))));

        let registry = registry_with(vec!["a", "b"]);
        let reconciler = StatusReconciler::new(gateway.clone(), registry.clone(), Duration::from_secs(5));

        // Seed a known-good value for "a", then fail it.
        gateway.set_balance("a", Ok(usdt(dec!(1))));
        reconciler.poll_once().await;
        gateway.set_balance("a", Err(crate::error::ClientError::Transport("timeout".into())));
        reconciler.poll_once().await;

        let registry = registry.read().await;
        let a = registry.get("a").unwrap();
        assert_eq!(a.balance.snapshot, Some(usdt(dec!(1))));
        assert!(a.balance.error.is_some());

        let b = registry.get("b").unwrap();
        assert_eq!(b.balance.snapshot, Some(usdt(dec!(7))));
        assert!(b.balance.error.is_none());
    }

    #[tokio::test]
    async fn test_results_failure_keeps_previous_results() {
        let gateway = Arc::new(FakeGateway::default());
        gateway.set_balance("a", Ok(usdt(dec!(1))));
        gateway.set_results(HashMap::from([(
            "a".to_string(),
            CopyResult {
                success: false,
                error: Some("insufficient margin".into()),
            },
        )]));

        let registry = registry_with(vec!["a"]);
        let reconciler = StatusReconciler::new(gateway.clone(), registry.clone(), Duration::from_secs(5));
        reconciler.poll_once().await;

        gateway.fail_results(crate::error::ClientError::Transport("down".into()));
        reconciler.poll_once().await;

        let registry = registry.read().await;
        let result = registry.get("a").unwrap().result.clone().unwrap();
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("insufficient margin"));
    }

    #[tokio::test]
    async fn test_tick_sequence_increments_per_poll() {
        let gateway = Arc::new(FakeGateway::default());
        let registry = registry_with(vec![]);
        let reconciler = StatusReconciler::new(gateway, registry, Duration::from_secs(5));

        assert_eq!(reconciler.current_tick(), 0);
        reconciler.poll_once().await;
        reconciler.poll_once().await;
        assert_eq!(reconciler.current_tick(), 2);
    }

    #[tokio::test]
    async fn test_account_deleted_mid_tick_is_ignored() {
        let gateway = Arc::new(FakeGateway::default());
        gateway.set_balance("a", Ok(usdt(dec!(3))));
        gateway.set_results(HashMap::from([(
            "gone".to_string(),
            CopyResult {
                success: true,
                error: None,
            },
        )]));

        // "gone" is in the results payload but not in the registry.
        let registry = registry_with(vec!["a"]);
        let reconciler = StatusReconciler::new(gateway, registry.clone(), Duration::from_secs(5));
        reconciler.poll_once().await;

        let registry = registry.read().await;
        assert_eq!(registry.len(), 1);
        assert!(registry.get("gone").is_none());
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown_flag() {
        let gateway = Arc::new(FakeGateway::default());
        let registry = registry_with(vec![]);
        let reconciler = Arc::new(StatusReconciler::new(
            gateway,
            registry,
            Duration::from_millis(10),
        ));

        let shutdown = reconciler.shutdown_signal();
        let handle = tokio::spawn({
            let reconciler = reconciler.clone();
            async move { reconciler.run().await }
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        shutdown.store(true, Ordering::SeqCst);
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("reconciler should stop promptly")
            .unwrap();

        assert!(reconciler.current_tick() >= 1);
    }
}
