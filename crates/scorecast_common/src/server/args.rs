#[derive(clap::Args, Debug)]
#[group(skip)]
pub struct RuntimeArgs {
    /// The path to the application configuration file
    #[arg(env, long, default_value = "config.toml", value_name = "CONFIG_FILE")]
    pub config_file: String,

    /// The tracing filter directive, overridden by RUST_LOG when set
    #[arg(env, long, default_value = "info")]
    pub log_filter: String,
}
