use clap_derive::Parser;

#[derive(Parser, Debug, Clone)]
#[command(version, about)]
#[group(skip)]
pub struct Config {
    /// How often expired runs are evicted from the queue, in milliseconds
    #[arg(env, long, default_value_t = 1000)]
    pub queue_tick_interval_ms: u64,

    /// The number of queue events buffered for slow subscribers
    #[arg(env, long, default_value_t = 100000)]
    pub queue_publish_capacity: usize,

    /// For how long after the first run the runs are queued at their own submission time
    #[arg(env, long, default_value_t = 60)]
    pub queue_replay_grace_seconds: u64,
}
