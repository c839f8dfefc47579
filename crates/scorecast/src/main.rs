// SPDX-License-Identifier: AGPL-3.0-only
// Copyright Authors of scorecast

use crate::args::{Args, Commands};
use clap::Parser;
use color_eyre::eyre;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

mod args;
mod rules;
#[cfg(feature = "server")]
mod server;

/// Logs go to stderr, stdout is reserved for command output.
fn init_tracing(default_filter: &str) {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    color_eyre::install()?;
    let args = Args::parse();

    match args.command {
        #[cfg(feature = "server")]
        Commands::Server(args) => {
            init_tracing(&args.runtime.log_filter);
            server::main(args).await
        }
        Commands::Rules(args) => {
            init_tracing("warn");
            rules::main(args).await
        }
    }
}
