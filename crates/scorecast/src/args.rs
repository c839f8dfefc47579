use clap_derive::{Parser, Subcommand};

/// Live contest state for competitive programming broadcasts
#[derive(Parser, Debug)]
#[command(version, about)]
#[command(propagate_version = true)]
pub(crate) struct Args {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub(crate) enum Commands {
    /// Run the server components
    #[cfg(feature = "server")]
    Server(crate::server::args::Args),
    /// Normalize a tuning rules document or apply it to a contest info
    Rules(crate::rules::Args),
}
