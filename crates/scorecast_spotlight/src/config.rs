use clap_derive::Parser;
use serde::{Deserialize, Serialize};

#[derive(Parser, Debug, Clone)]
#[command(version, about)]
#[group(skip)]
pub struct Config {
    /// How often the top of the scoreboard is pushed into the spotlight, in seconds
    #[arg(env, long, default_value_t = 60)]
    pub spotlight_push_interval_seconds: u64,

    /// The lowest scoreboard rank which still receives a placement accent
    #[arg(env, long, default_value_t = 10)]
    pub spotlight_lowest_rank: u32,

    /// Runs submitted longer ago than this are not interesting anymore, in seconds
    #[arg(env, long, default_value_t = 60)]
    pub spotlight_run_window_seconds: u64,

    /// How long the consumer waits when no team is queued, in milliseconds
    #[arg(env, long, default_value_t = 1000)]
    pub spotlight_poll_interval_ms: u64,
}

/// The scoring weights, read from the `[spotlight]` table of the application config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct SpotlightWeights {
    pub first_to_solve_run_score: f64,
    pub accepted_run_score: f64,
    pub judged_run_score: f64,
    pub not_judged_run_score: f64,
    pub rank_score: f64,
    pub social_event_score: f64,
}

impl Default for SpotlightWeights {
    fn default() -> Self {
        Self {
            first_to_solve_run_score: 5.0,
            accepted_run_score: 3.0,
            judged_run_score: 1.0,
            not_judged_run_score: 0.5,
            rank_score: 2.0,
            social_event_score: 2.0,
        }
    }
}
