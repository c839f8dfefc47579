use clap_derive::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(version, about)]
#[group(skip)]
pub struct Config {
    /// The tuning rules document, either a list of rules or legacy advanced properties
    #[arg(env, long)]
    pub tuning_rules_file: Option<PathBuf>,

    /// How often the rules document is checked for changes, in milliseconds
    #[arg(env, long, default_value_t = 1000)]
    pub tuning_poll_interval_ms: u64,
}
