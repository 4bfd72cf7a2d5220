//! `beacon-emit` -- publish notifications from the command line.
//!
//! ```text
//! beacon-emit emit <info|warn|error> <event_type> [payload]
//! beacon-emit demo
//! ```
//!
//! Builds a [`Notifier`] from the environment and either emits a single
//! notification or runs the proxy walkthrough (`demo`).
//!
//! # Environment variables
//!
//! | Variable                 | Default         | Description                              |
//! |--------------------------|-----------------|------------------------------------------|
//! | `NOTIFIER_STRATEGY`      | `logging`       | `noop`, `logging`, `amqp`, `topic`       |
//! | `NOTIFIER_PUBLISHER_ID`  | `beacon`        | Publisher stamped into every envelope    |
//! | `AMQP_HOST` / `AMQP_PORT`| `localhost` / `5672` | Broker endpoint                     |
//! | `AMQP_RETRY_BACKOFF`     | `1`             | Base reconnect delay, seconds            |
//! | `AMQP_MAX_RETRIES`       | `0`             | Reconnect attempts, `0` = unbounded      |
//!
//! See `NotifierConfig::from_env` for the full list. Broker strategies need
//! the `amqp` feature.

use std::sync::Arc;

use beacon_emit::args::{Cli, Command};
use beacon_emit::demo;
use beacon_events::{Notifier, NotifierConfig, Notify, Transports};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "beacon_emit=info,beacon_events=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let config = NotifierConfig::from_env().unwrap_or_else(|e| {
        tracing::error!(error = %e, "Invalid notifier configuration");
        std::process::exit(1);
    });

    let notifier = Notifier::from_config(&config, Transports::default())
        .await
        .unwrap_or_else(|e| {
            tracing::error!(error = %e, "Failed to build notifier");
            std::process::exit(1);
        });
    let notifier = Arc::new(notifier);

    tracing::info!(
        strategy = config.strategy.name(),
        publisher_id = %config.publisher_id,
        "Starting beacon-emit",
    );

    let outcome = match cli.command {
        Command::Emit {
            priority,
            event_type,
            payload,
        } => notifier
            .emit(priority, &event_type, payload)
            .await
            .map_err(|e| e.to_string()),
        Command::Demo => demo::run(notifier.clone())
            .await
            .map(|_| ())
            .map_err(|e| e.to_string()),
    };

    notifier.close().await;

    if let Err(e) = outcome {
        tracing::error!(error = %e, "Notification failed");
        std::process::exit(1);
    }
}
