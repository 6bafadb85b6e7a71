//! copyctl: command-line control surface for a copy-trading backend.
//!
//! One leader account, many follower accounts: this tool saves leader
//! credentials, manages followers, starts/stops mirroring, and keeps a
//! live view of balances and copy results.

mod api;
mod config;
mod coordinator;
mod error;
mod models;
mod reconciler;
mod registry;
mod state;
#[cfg(test)]
mod testutil;

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use crate::api::{BackendGateway, HttpGateway};
use crate::config::ClientConfig;
use crate::coordinator::ActionCoordinator;
use crate::models::{CredentialForm, Env, Exchange, LeaderConfig};
use crate::reconciler::StatusReconciler;
use crate::registry::AccountEntry;
use crate::state::ClientState;

/// Copy-trading control CLI.
#[derive(Parser)]
#[command(name = "copyctl")]
#[command(about = "Control a leader/follower copy-trading backend", long_about = None)]
struct Cli {
    /// Backend base URL
    #[arg(long, env = "COPYCTL_API_URL", default_value = "http://127.0.0.1:8000")]
    api_url: String,

    /// Bearer token attached to every request
    #[arg(long, env = "COPYCTL_API_TOKEN", hide_env_values = true, default_value = "")]
    api_token: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show global copy status and the follower account table
    Status,

    /// Save leader account credentials
    SetLeader {
        /// Exchange environment
        #[arg(long, value_enum, default_value_t = Env::Live)]
        env: Env,

        /// Leader API key
        #[arg(long)]
        api_key: String,

        /// Leader API secret
        #[arg(long, env = "COPYCTL_LEADER_SECRET", hide_env_values = true)]
        api_secret: String,
    },

    /// Start mirroring leader trades
    Start,

    /// Stop mirroring leader trades
    Stop,

    /// Add a follower account
    Add {
        /// Unique account name
        name: String,

        #[arg(long, value_enum)]
        exchange: Exchange,

        #[arg(long, value_enum, default_value_t = Env::Live)]
        env: Env,

        #[arg(long)]
        api_key: String,

        #[arg(long)]
        api_secret: String,

        /// API passphrase (required for bitget)
        #[arg(long, default_value = "")]
        passphrase: String,
    },

    /// Check follower credentials against the exchange without saving
    Verify {
        #[arg(long, value_enum)]
        exchange: Exchange,

        #[arg(long, value_enum, default_value_t = Env::Live)]
        env: Env,

        #[arg(long)]
        api_key: String,

        #[arg(long)]
        api_secret: String,

        /// API passphrase (required for bitget)
        #[arg(long, default_value = "")]
        passphrase: String,
    },

    /// Delete a follower account
    Remove {
        /// Account name
        name: String,
    },

    /// Pause an active account, or resume a paused one
    Toggle {
        /// Account name
        name: String,
    },

    /// Continuously refresh balances and copy results
    Watch {
        /// Refresh period in seconds
        #[arg(short, long, default_value_t = config::DEFAULT_POLL_INTERVAL_SECS)]
        interval: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // Setup logging
    let log_level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "error" => Level::ERROR,
        _ => Level::WARN,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let poll_interval = match &cli.command {
        Commands::Watch { interval } => Duration::from_secs((*interval).max(1)),
        _ => Duration::from_secs(config::DEFAULT_POLL_INTERVAL_SECS),
    };
    let client_config =
        ClientConfig::new(cli.api_url, cli.api_token).with_poll_interval(poll_interval);

    let gateway: Arc<dyn BackendGateway> = Arc::new(HttpGateway::new(&client_config)?);
    let state = ClientState::new();
    let reconciler = Arc::new(StatusReconciler::new(
        gateway.clone(),
        state.registry.clone(),
        client_config.poll_interval,
    ));
    let coordinator = ActionCoordinator::new(gateway, state.clone(), reconciler.clone());

    match cli.command {
        Commands::Status => {
            coordinator.refresh_global().await;
            if coordinator.load_accounts().await.is_ok() {
                reconciler.poll_once().await;
            }
            print_dashboard(&state).await;
        }

        Commands::SetLeader {
            env,
            api_key,
            api_secret,
        } => {
            let mut leader = LeaderConfig::new(env, api_key, api_secret);
            coordinator.set_leader(&mut leader).await?;
            println!("Leader credentials saved ({} / {}).", leader.exchange, leader.env);
        }

        Commands::Start => {
            coordinator.start_copy().await?;
            print_global(&state).await;
        }

        Commands::Stop => {
            coordinator.stop_copy().await?;
            print_global(&state).await;
        }

        Commands::Add {
            name,
            exchange,
            env,
            api_key,
            api_secret,
            passphrase,
        } => {
            let form = CredentialForm {
                name: name.clone(),
                exchange: exchange.as_str().to_string(),
                env: env.as_str().to_string(),
                api_key,
                api_secret,
                passphrase,
            };

            match coordinator.create_follower(&form).await? {
                Some(advisory) => println!("Account '{name}' created ({advisory})."),
                None => println!("Account '{name}' created."),
            }
            print_dashboard(&state).await;
        }

        Commands::Verify {
            exchange,
            env,
            api_key,
            api_secret,
            passphrase,
        } => {
            let form = CredentialForm {
                name: String::new(),
                exchange: exchange.as_str().to_string(),
                env: env.as_str().to_string(),
                api_key,
                api_secret,
                passphrase,
            };

            let outcome = coordinator.verify_follower(&form).await?;
            if outcome.valid {
                println!("Credentials valid.");
            } else {
                println!("Invalid: {}", outcome.error.unwrap_or_default());
            }
        }

        Commands::Remove { name } => {
            coordinator.delete_follower(&name).await?;
            println!("Account '{name}' deleted.");
        }

        Commands::Toggle { name } => {
            coordinator.load_accounts().await?;
            let status = coordinator.toggle(&name).await?;
            println!(
                "Account '{name}' is now {status} ({} available).",
                status.action_label()
            );
        }

        Commands::Watch { interval } => {
            info!(interval = interval, "Starting watch mode");

            coordinator.refresh_global().await;
            if coordinator.load_accounts().await.is_ok() {
                reconciler.poll_once().await;
            }

            println!("Polling every {interval}s. Press Ctrl+C to stop.\n");
            print_dashboard(&state).await;

            let shutdown = reconciler.shutdown_signal();
            let runner = tokio::spawn({
                let reconciler = reconciler.clone();
                async move { reconciler.run().await }
            });

            let mut render = tokio::time::interval(client_config.poll_interval);
            render.tick().await;
            loop {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {
                        println!("\nStopping...");
                        shutdown.store(true, Ordering::SeqCst);
                        break;
                    }
                    _ = render.tick() => {
                        println!("[{}]", chrono::Local::now().format("%H:%M:%S"));
                        print_dashboard(&state).await;
                    }
                }
            }
            runner.await.ok();
        }
    }

    Ok(())
}

/// Print the global copy state line.
async fn print_global(state: &ClientState) {
    let global = state.global.read().await;
    match (&global.copy, &global.error) {
        (_, Some(err)) => println!("Copy status: Error ({err})"),
        (Some(copy), None) => {
            println!(
                "Copy status: {}",
                if copy.running { "Running" } else { "Stopped" }
            );
            println!(
                "Leader:      {}",
                copy.leader.as_deref().unwrap_or("(not set)")
            );
        }
        (None, None) => println!("Copy status: (unknown)"),
    }
}

/// Render the follower account table.
async fn print_dashboard(state: &ClientState) {
    print_global(state).await;

    let registry = state.registry.read().await;
    if let Some(err) = registry.load_error() {
        println!("Account list error: {err}");
    }
    if registry.is_empty() {
        println!("No follower accounts.");
        return;
    }

    println!(
        "\n{:<16} {:<8} {:<5} {:<7} {:>14} {:>14} {:<8} {}",
        "NAME", "EXCHANGE", "ENV", "STATUS", "USDT", "BTC", "RESULT", "ERROR"
    );
    println!("{}", "-".repeat(96));

    let mut stale = false;
    for entry in registry.entries() {
        let (usdt, btc) = balance_cells(entry, &mut stale);
        let result = match &entry.result {
            None => "-",
            Some(r) if r.success => "Success",
            Some(_) => "Fail",
        };

        println!(
            "{:<16} {:<8} {:<5} {:<7} {:>14} {:>14} {:<8} {}",
            entry.account.name,
            entry.account.exchange,
            entry.account.env,
            entry.account.status,
            usdt,
            btc,
            result,
            entry.display_error().unwrap_or("")
        );
    }

    if stale {
        println!("* last known value; the latest balance fetch failed");
    }

    if let Some(ts) = registry.entries().filter_map(|e| e.updated_at).max() {
        println!(
            "Last refresh: {}",
            ts.with_timezone(&chrono::Local).format("%H:%M:%S")
        );
    }
}

/// Balance columns: `-` until first fetched, asset amounts after, and a
/// star marker on values whose latest fetch failed.
fn balance_cells(entry: &AccountEntry, stale: &mut bool) -> (String, String) {
    use rust_decimal::Decimal;

    match (&entry.balance.snapshot, &entry.balance.error) {
        (None, None) => ("-".to_string(), "-".to_string()),
        (None, Some(_)) => ("Err".to_string(), "Err".to_string()),
        (Some(snapshot), error) => {
            let usdt = snapshot.asset("USDT").unwrap_or(Decimal::ZERO);
            let btc = snapshot.asset("BTC").unwrap_or(Decimal::ZERO);
            if error.is_some() {
                *stale = true;
                (format!("{usdt:.2}*"), format!("{btc:.6}*"))
            } else {
                (format!("{usdt:.2}"), format!("{btc:.6}"))
            }
        }
    }
}
