// SPDX-License-Identifier: AGPL-3.0-only
// Copyright Authors of scorecast

pub mod config;
pub mod handle;
mod metrics;
pub mod state;

pub use crate::handle::{channel, FeaturedRunInfo, QueueError, QueueHandle, QueueInputs};
pub use crate::state::{QueueEvent, QueueState};

use crate::config::Config;
use crate::handle::FeaturedRequest;
use crate::metrics::{EventLabels, FeaturedLabels, QueueMetrics};
use chrono::Utc;
use color_eyre::eyre::Result;
use futures::stream::{select_all, StreamExt};
use scorecast_common::models::ContestUpdate;
use scorecast_common::publish::drain_join_requests;
use scorecast_common::server::runtime::AppRuntime;
use scorecast_common::tuned::TunedReceiver;
use std::ops::DerefMut;
use std::time::Duration;
use tokio::select;
use tokio::time::{self, MissedTickBehavior};
use tokio_stream::wrappers::IntervalStream;
use tracing::{debug, info};

/// Everything that can make the queue change, merged into a single ordered stream.
enum QueueTrigger {
    Clean,
    Update(ContestUpdate),
    Subscribe,
    Featured(FeaturedRequest),
}

fn outcome<T>(result: &Result<T, QueueError>) -> String {
    match result {
        Ok(_) => "ok",
        Err(QueueError::UnknownRun(_)) => "unknown_run",
        Err(QueueError::Closed) => "closed",
    }
    .to_string()
}

fn handle_featured(state: &mut QueueState, request: FeaturedRequest, metrics: &QueueMetrics) {
    let now = Utc::now();
    match request {
        FeaturedRequest::MakeFeatured {
            run_id,
            media,
            reply,
        } => {
            let result = state.make_featured(&run_id, media, now);
            metrics
                .featured_requests
                .get_or_create(&FeaturedLabels {
                    action: "make_featured".to_string(),
                    outcome: outcome(&result),
                })
                .inc();
            if reply.send(result).is_err() {
                debug!("the featured run requester went away");
            }
        }
        FeaturedRequest::MakeNotFeatured { run_id, reply } => {
            let result = state.make_not_featured(&run_id);
            metrics
                .featured_requests
                .get_or_create(&FeaturedLabels {
                    action: "make_not_featured".to_string(),
                    outcome: outcome(&result),
                })
                .inc();
            if reply.send(result).is_err() {
                debug!("the featured run requester went away");
            }
        }
    }
}

pub async fn main(
    runtime: AppRuntime,
    config: Config,
    tuned_updates: TunedReceiver,
    inputs: QueueInputs,
) -> Result<()> {
    info!("starting queue service");

    let metrics = QueueMetrics::default();
    metrics.register(runtime.metrics_registry.write().await.deref_mut());

    let QueueInputs {
        hub,
        join_requests,
        featured_requests,
    } = inputs;

    let mut interval = time::interval(Duration::from_millis(config.queue_tick_interval_ms));
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let clean_stream = IntervalStream::new(interval).map(|_| QueueTrigger::Clean);
    let updates_stream = tuned_updates.into_stream().map(QueueTrigger::Update);
    let subscribe_stream = join_requests
        .clone()
        .into_stream()
        .map(|_| QueueTrigger::Subscribe);
    let featured_stream = featured_requests.into_stream().map(QueueTrigger::Featured);

    let mut triggers = select_all(vec![
        clean_stream.boxed(),
        updates_stream.boxed(),
        subscribe_stream.boxed(),
        featured_stream.boxed(),
    ]);

    let mut state = QueueState::new(Duration::from_secs(config.queue_replay_grace_seconds));

    loop {
        let trigger = select! {
            biased;
            _ = runtime.cancellation_token.cancelled() => return Ok(()),
            trigger = triggers.next() => trigger,
        };
        let Some(trigger) = trigger else {
            debug!("all queue inputs have ended");
            runtime.cancellation_token.cancelled().await;
            return Ok(());
        };

        match trigger {
            QueueTrigger::Clean => state.evict_expired(Utc::now()),
            QueueTrigger::Update(ContestUpdate::Info(info)) => state.set_info(info),
            QueueTrigger::Update(ContestUpdate::Run(run)) => state.on_run(run, Utc::now()),
            QueueTrigger::Update(_) => {}
            QueueTrigger::Subscribe => {
                // Joins which arrived together are answered by one snapshot
                drain_join_requests(&join_requests);
                hub.publish(state.snapshot());
                metrics
                    .events
                    .get_or_create(&EventLabels {
                        kind: "snapshot".to_string(),
                    })
                    .inc();
            }
            QueueTrigger::Featured(request) => handle_featured(&mut state, request, &metrics),
        }
        state.enforce_limit();

        for event in state.take_events() {
            metrics
                .events
                .get_or_create(&EventLabels {
                    kind: event.kind().to_string(),
                })
                .inc();
            hub.publish(event);
        }
        metrics.size.set(state.len() as i64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::tests::{judged, running};
    use scorecast_common::models::{Media, QueueSettings, RunId, RunInfo};
    use scorecast_common::server::runtime::AppConfig;
    use scorecast_common::tuned;
    use std::collections::BTreeMap;
    use tokio_util::sync::CancellationToken;

    fn replay(state: &mut BTreeMap<RunId, RunInfo>, event: QueueEvent) {
        match event {
            QueueEvent::Snapshot { runs } => {
                *state = runs.into_iter().map(|run| (run.id.clone(), run)).collect();
            }
            QueueEvent::Add { run } | QueueEvent::Modify { run } => {
                state.insert(run.id.clone(), run);
            }
            QueueEvent::Remove { run } => {
                state.remove(&run.id);
            }
        }
    }

    #[tokio::test]
    async fn should_serve_snapshot_then_diffs_and_featured_requests() {
        let cancellation_token = CancellationToken::new();
        let runtime = AppRuntime::new(AppConfig::default(), cancellation_token.clone());
        let config = Config {
            queue_tick_interval_ms: 1000,
            queue_publish_capacity: 1000,
            queue_replay_grace_seconds: 60,
        };
        let (tuned_updates, tuned_tx) = tuned::channel(64);
        let tuned_rx = tuned_updates.subscribe();
        let (handle, inputs) = channel(config.queue_publish_capacity);
        let service = tokio::spawn(main(runtime, config, tuned_rx, inputs));

        let settings = QueueSettings {
            max_queue_size: 2,
            ..QueueSettings::default()
        };
        tuned_tx.publish(ContestUpdate::Info(running(settings)));
        let mut subscription = handle.subscribe();
        let now_secs = (Utc::now() - crate::state::tests::start()).num_seconds() as u64;
        for index in 0..3 {
            let run = judged(&format!("r{index}"), now_secs + index, false);
            tuned_tx.publish(ContestUpdate::Run(run));
        }

        let first = subscription.recv().await.unwrap();
        assert!(matches!(first, QueueEvent::Snapshot { .. }));
        let mut replayed = BTreeMap::new();
        replay(&mut replayed, first);
        while !replayed.contains_key(&RunId::from("r2"))
            || replayed.contains_key(&RunId::from("r0"))
        {
            replay(&mut replayed, subscription.recv().await.unwrap());
        }
        let ids: Vec<&str> = replayed.keys().map(RunId::as_str).collect();
        assert_eq!(ids, vec!["r1", "r2"]);

        let media = Media::Image {
            url: "http://photo".to_string(),
        };
        let featured = handle
            .make_featured(RunId::from("r2"), media.clone())
            .await
            .unwrap();
        assert!(featured.expires_at > Utc::now());
        assert_eq!(
            handle.make_featured(RunId::from("nope"), media.clone()).await,
            Err(QueueError::UnknownRun(RunId::from("nope")))
        );
        loop {
            let event = subscription.recv().await.unwrap();
            if let QueueEvent::Modify { run } = event {
                assert_eq!(run.id, RunId::from("r2"));
                assert_eq!(run.featured_run_media, Some(media.clone()));
                break;
            }
        }

        let mut late = handle.subscribe();
        let QueueEvent::Snapshot { runs } = late.recv().await.unwrap() else {
            panic!("the first event must be a snapshot");
        };
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[1].featured_run_media, Some(media));

        cancellation_token.cancel();
        service.await.unwrap().unwrap();
    }
}
