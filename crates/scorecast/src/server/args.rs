use clap::ArgAction;
use clap_derive::{Args, Parser};
use scorecast_common::server::args::RuntimeArgs;
use std::path::PathBuf;

/// Live contest state for competitive programming broadcasts
#[derive(Parser, Debug)]
#[command(version, about)]
pub(crate) struct Args {
    #[command(flatten, next_help_heading = "Runtime options")]
    pub runtime: RuntimeArgs,

    #[command(flatten, next_help_heading = "Component selection options")]
    pub components: Components,

    #[command(flatten, next_help_heading = "Event source options")]
    pub source: SourceArgs,

    #[command(flatten, next_help_heading = "Output feed options")]
    pub feed: FeedArgs,

    #[command(flatten, next_help_heading = "OpenMetrics exporter options")]
    pub openmetrics: OpenMetricsConfig,

    #[command(flatten, next_help_heading = "Tuning configuration options")]
    pub tuning: scorecast_tuning::config::Config,

    #[cfg(feature = "scoreboard")]
    #[command(flatten, next_help_heading = "Scoreboard configuration options")]
    pub scoreboard: scorecast_scoreboard::config::Config,

    #[cfg(feature = "queue")]
    #[command(flatten, next_help_heading = "Queue configuration options")]
    pub queue: scorecast_queue::config::Config,

    #[cfg(feature = "spotlight")]
    #[command(flatten, next_help_heading = "Spotlight configuration options")]
    pub spotlight: scorecast_spotlight::config::Config,
}

/// Components
#[derive(Args, Debug)]
#[group()]
pub(crate) struct Components {
    /// Enable the scoreboard component
    #[cfg(feature = "scoreboard")]
    #[arg(env, long, action = ArgAction::Set, default_value_t = true)]
    pub enable_scoreboard: bool,

    /// Enable the run queue component
    #[cfg(feature = "queue")]
    #[arg(env, long, action = ArgAction::Set, default_value_t = true)]
    pub enable_queue: bool,

    /// Enable the team spotlight component
    #[cfg(feature = "spotlight")]
    #[arg(env, long, action = ArgAction::Set, default_value_t = true)]
    pub enable_spotlight: bool,

    /// Feature the runs named by analytics messages in the queue
    #[cfg(feature = "queue")]
    #[arg(env, long, action = ArgAction::Set, default_value_t = true)]
    pub enable_analytics: bool,

    /// Write every output event to the feed
    #[arg(env, long, action = ArgAction::Set, default_value_t = true)]
    pub enable_feed: bool,
}

#[derive(Args, Debug)]
#[group(skip)]
pub(crate) struct SourceArgs {
    /// Newline delimited JSON file with raw contest updates, overrides the config file
    #[arg(env, long)]
    pub events_file: Option<PathBuf>,

    /// Delay between two replayed events in milliseconds, overrides the config file
    #[arg(env, long)]
    pub replay_delay_ms: Option<u64>,

    /// The number of tuned updates buffered for slow components. A component which falls
    /// further behind catches up from the current tuning state
    #[arg(env, long, default_value_t = 100000)]
    pub tuned_update_capacity: usize,
}

#[derive(Args, Debug)]
#[group(skip)]
pub(crate) struct FeedArgs {
    /// Write the feed to this file instead of stdout
    #[arg(env, long)]
    pub feed_file: Option<PathBuf>,
}

#[derive(Args, Debug)]
#[group(skip)]
pub(crate) struct OpenMetricsConfig {
    /// The address the OpenMetrics exporter listens on, disabled when not set
    #[arg(env, long)]
    pub openmetrics_listen: Option<String>,
}
