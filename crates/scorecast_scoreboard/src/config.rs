use clap_derive::Parser;
use scorecast_common::models::OptimismLevel;

#[derive(Parser, Debug, Clone)]
#[command(version, about)]
#[group(skip)]
pub struct Config {
    /// The optimism levels to maintain standings for, separated by commas
    #[arg(env, long, value_enum, value_delimiter = ',', default_value = "normal")]
    pub scoreboard_optimism_levels: Vec<OptimismLevel>,
}
