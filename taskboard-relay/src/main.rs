//! `Taskboard` Relay Server -- real-time collaborative kanban board.
//!
//! An axum WebSocket server that holds the canonical board state, applies
//! task mutations from connected viewers, and fans the results out to
//! everyone. Board state is persisted as JSON documents and reloaded at
//! startup.
//!
//! # Usage
//!
//! ```bash
//! # Run on default address 0.0.0.0:5000
//! cargo run --bin taskboard-relay
//!
//! # Run on custom address
//! cargo run --bin taskboard-relay -- --bind 127.0.0.1:8080
//!
//! # Or via environment variable
//! TASKBOARD_ADDR=127.0.0.1:8080 cargo run --bin taskboard-relay
//! ```

use std::sync::Arc;

use clap::Parser;
use taskboard_relay::activity::ActivityLog;
use taskboard_relay::board::BoardStore;
use taskboard_relay::config::{RelayCliArgs, RelayConfig};
use taskboard_relay::persist::Persister;
use taskboard_relay::relay::{self, BoardState, RelayState};

#[tokio::main]
async fn main() {
    let cli = RelayCliArgs::parse();

    // Load config from CLI args + config file + env vars + defaults.
    let config = match RelayConfig::load(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading configuration: {e}");
            std::process::exit(1);
        }
    };

    // Initialize tracing with the resolved log level.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    tracing::info!(
        addr = %config.bind_addr,
        data_dir = %config.data_dir.display(),
        "starting taskboard relay server"
    );

    let persister = Persister::new(&config.data_dir);
    let (tasks, activity) = persister.load();
    tracing::info!(
        tasks = tasks.len(),
        activity = activity.len(),
        "loaded persisted board state"
    );

    let board = BoardState {
        tasks: BoardStore::from_tasks(tasks),
        activity: ActivityLog::from_records(activity, config.max_activity),
    };
    let state = Arc::new(RelayState::with_config(board, persister));

    match relay::start_server_with_state(&config.bind_addr, state).await {
        Ok((bound_addr, handle)) => {
            tracing::info!(addr = %bound_addr, "relay server listening");
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "relay server task failed");
            }
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to start relay server");
            std::process::exit(1);
        }
    }
}
