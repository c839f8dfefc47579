// SPDX-License-Identifier: AGPL-3.0-only
// Copyright Authors of scorecast

use futures::future::select_all;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal::unix::SignalKind;
use tokio::sync::RwLock;
use tokio::{signal, spawn};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Common state for components
#[derive(Clone)]
pub struct AppRuntime {
    pub config: Arc<AppConfig>,
    pub metrics_registry: Arc<RwLock<prometheus_client::registry::Registry>>,
    pub cancellation_token: CancellationToken,
}

impl AppRuntime {
    pub fn new(config: AppConfig, cancellation_token: CancellationToken) -> Self {
        Self {
            config: Arc::new(config),
            metrics_registry: Arc::new(RwLock::new(Default::default())),
            cancellation_token,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "snake_case")]
pub struct AppConfig {
    #[serde(default)]
    pub source: SourceConfig,
    /// The spotlight configuration. This is parsed by the spotlight component to avoid having
    /// to model it in this crate.
    #[serde(default = "empty_table")]
    pub spotlight: toml::Value,
}

fn empty_table() -> toml::Value {
    toml::Value::Table(Default::default())
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            source: SourceConfig::default(),
            spotlight: empty_table(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(rename_all = "snake_case")]
pub struct SourceConfig {
    /// Newline delimited JSON file with raw contest updates
    pub events_file: Option<PathBuf>,
    /// Delay between two replayed events in milliseconds
    #[serde(default)]
    pub replay_delay_ms: u64,
}

pub fn create_shutdown_cancellation_token() -> CancellationToken {
    let cancellation_token = CancellationToken::new();
    let signal_cancellation_token = cancellation_token.clone();

    spawn(async move {
        let mut signals: Vec<signal::unix::Signal> = [
            signal::unix::signal(SignalKind::terminate()),
            signal::unix::signal(SignalKind::interrupt()),
        ]
        .into_iter()
        .filter_map(|maybe_signal| match maybe_signal {
            Ok(signal) => Some(signal),
            Err(error) => {
                error! {
                    ?error,
                    "unable to listen for shutdown signal"
                }
                None
            }
        })
        .collect();

        if signals.is_empty() {
            return;
        }
        let signal_futures = signals.iter_mut().map(|signal| signal.recv().boxed());
        select_all(signal_futures).await;

        info!("shutdown signal received");
        signal_cancellation_token.cancel();
    });
    cancellation_token
}
