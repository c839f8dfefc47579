use crate::server::source::NdjsonSource;
use color_eyre::eyre;
use color_eyre::eyre::Context;
use scorecast_common::server::runtime::{create_shutdown_cancellation_token, AppConfig, AppRuntime};
use scorecast_common::tuned;
use std::io::ErrorKind;
use std::path::Path;
use std::time::Duration;
use tokio::io::AsyncWrite;
use tokio::task::JoinSet;
use tracing::{info, warn};

#[cfg(feature = "queue")]
mod analytics;
pub(crate) mod args;
mod feed;
mod metrics;
mod source;

async fn read_app_config<P: AsRef<Path>>(path: P) -> eyre::Result<AppConfig> {
    let path = path.as_ref();
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(error) if error.kind() == ErrorKind::NotFound => {
            info!("no configuration file at {path:?}, using the defaults");
            return Ok(AppConfig::default());
        }
        Err(error) => {
            return Err(error).with_context(|| format!("unable to read the config file {path:?}"))
        }
    };
    toml::from_str(&content).context("unable to parse the config file")
}

async fn open_feed(path: Option<&Path>) -> eyre::Result<Box<dyn AsyncWrite + Unpin + Send>> {
    Ok(match path {
        Some(path) => Box::new(
            tokio::fs::File::create(path)
                .await
                .with_context(|| format!("unable to create the feed file {path:?}"))?,
        ),
        None => Box::new(tokio::io::stdout()),
    })
}

pub(crate) async fn main(args: args::Args) -> eyre::Result<()> {
    let app_config = read_app_config(&args.runtime.config_file).await?;

    let events_file = args
        .source
        .events_file
        .clone()
        .or_else(|| app_config.source.events_file.clone());
    let replay_delay = Duration::from_millis(
        args.source
            .replay_delay_ms
            .unwrap_or(app_config.source.replay_delay_ms),
    );

    let cancellation_token = create_shutdown_cancellation_token();
    let runtime = AppRuntime::new(app_config, cancellation_token);

    let (raw_tx, raw_rx) = flume::unbounded();
    let (tuned_updates, tuned_publisher) = tuned::channel(args.source.tuned_update_capacity);
    let mut feed_streams = vec![feed::info_stream(tuned_updates.subscribe())];

    info!("starting components");
    let mut set = JoinSet::new();

    #[cfg(feature = "scoreboard")]
    #[cfg_attr(not(feature = "spotlight"), allow(unused_variables))]
    let scoreboards = if args.components.enable_scoreboard {
        let (outputs, receivers) =
            scorecast_scoreboard::channels(&args.scoreboard.scoreboard_optimism_levels);
        set.spawn(scorecast_scoreboard::main(
            runtime.clone(),
            args.scoreboard,
            tuned_updates.subscribe(),
            outputs,
        ));
        for (level, receiver) in &receivers {
            feed_streams.push(feed::scoreboard_stream(*level, receiver.clone()));
        }
        receivers
    } else {
        Default::default()
    };

    #[cfg(feature = "queue")]
    if args.components.enable_queue {
        let (queue, inputs) = scorecast_queue::channel(args.queue.queue_publish_capacity);
        set.spawn(scorecast_queue::main(
            runtime.clone(),
            args.queue,
            tuned_updates.subscribe(),
            inputs,
        ));
        feed_streams.push(feed::queue_stream(&queue));
        if args.components.enable_analytics {
            set.spawn(analytics::main(runtime.clone(), tuned_updates.subscribe(), queue));
        }
    }

    #[cfg(feature = "spotlight")]
    if args.components.enable_spotlight {
        use scorecast_common::models::OptimismLevel;

        // Placement accents follow the normal standings when they are computed
        let scoreboard = scoreboards
            .get(&OptimismLevel::Normal)
            .or_else(|| scoreboards.values().next())
            .cloned();
        if scoreboard.is_none() {
            warn!("no scoreboard is computed, the spotlight will not use placements");
        }
        let (spotlight, inputs) = scorecast_spotlight::channel(Duration::from_millis(
            args.spotlight.spotlight_poll_interval_ms,
        ));
        set.spawn(scorecast_spotlight::main(
            runtime.clone(),
            args.spotlight,
            tuned_updates.subscribe(),
            scoreboard,
            inputs,
        ));
        feed_streams.push(feed::spotlight_stream(spotlight));
    }

    if args.components.enable_feed {
        let writer = open_feed(args.feed.feed_file.as_deref()).await?;
        set.spawn(feed::main(runtime.clone(), feed_streams, writer));
    }

    if let Some(listen) = args.openmetrics.openmetrics_listen {
        set.spawn(metrics::run_metrics_server(runtime.clone(), listen));
    }

    // Every consumer has subscribed by now, the publisher moves into the tuning service
    set.spawn(scorecast_tuning::main(
        runtime.clone(),
        args.tuning,
        raw_rx,
        tuned_publisher,
    ));

    match events_file {
        Some(path) => {
            let source = NdjsonSource::open(&path, replay_delay).await?;
            set.spawn(source::main(runtime.clone(), source, raw_tx));
        }
        None => {
            warn!("no events file configured, the contest state stays empty");
            drop(raw_tx);
        }
    }

    while let Some(res) = set.join_next().await {
        // Propagate error
        res??;
    }

    Ok(())
}
