// SPDX-License-Identifier: AGPL-3.0-only
// Copyright Authors of scorecast

pub mod config;
mod metrics;
pub mod state;

pub use crate::state::{KeyTeam, SpotlightCause, TeamAccent};

use crate::config::{Config, SpotlightWeights};
use crate::metrics::{AccentLabels, SpotlightMetrics};
use crate::state::{RunTracker, SpotlightState};
use chrono::Utc;
use color_eyre::eyre::{Context, Result};
use futures::stream::{select_all, unfold, Stream, StreamExt};
use scorecast_common::models::{ContestInfo, ContestUpdate, TeamId};
use scorecast_common::server::runtime::AppRuntime;
use scorecast_common::tuned::TunedReceiver;
use scorecast_scoreboard::ScoreboardReceiver;
use serde::{Deserialize, Serialize};
use std::ops::DerefMut;
use std::sync::Arc;
use std::time::Duration;
use tokio::select;
use tokio::sync::Mutex;
use tokio::time::{self, MissedTickBehavior};
use tokio_stream::wrappers::IntervalStream;
use tracing::{debug, info};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SpotlightError {
    #[error("the spotlight service is not running")]
    Closed,
}

/// A request to raise the interest in a team by hand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddScoreRequest {
    pub team_id: TeamId,
    pub score: f64,
}

/// The part of the service the handle consumes from.
struct Shared {
    state: Mutex<SpotlightState>,
    metrics: SpotlightMetrics,
}

/// A cloneable handle for taking teams out of the spotlight and adding scores by hand.
#[derive(Clone)]
pub struct SpotlightHandle {
    shared: Arc<Shared>,
    score_requests: flume::Sender<AddScoreRequest>,
    poll_interval: Duration,
}

/// Everything the spotlight service loop receives besides its update streams.
pub struct SpotlightInputs {
    shared: Arc<Shared>,
    score_requests: flume::Receiver<AddScoreRequest>,
}

pub fn channel(poll_interval: Duration) -> (SpotlightHandle, SpotlightInputs) {
    let shared = Arc::new(Shared {
        state: Mutex::new(SpotlightState::default()),
        metrics: SpotlightMetrics::default(),
    });
    let (score_tx, score_rx) = flume::unbounded();
    (
        SpotlightHandle {
            shared: shared.clone(),
            score_requests: score_tx,
            poll_interval,
        },
        SpotlightInputs {
            shared,
            score_requests: score_rx,
        },
    )
}

impl SpotlightHandle {
    pub async fn add_score(&self, team_id: TeamId, score: f64) -> Result<(), SpotlightError> {
        self.score_requests
            .send_async(AddScoreRequest { team_id, score })
            .await
            .map_err(|_| SpotlightError::Closed)
    }

    /// Takes the most interesting team out of the spotlight, resetting its score. Waits while
    /// no team is queued.
    pub async fn next(&self) -> Result<KeyTeam, SpotlightError> {
        loop {
            let popped = {
                let mut state = self.shared.state.lock().await;
                let popped = state.pop();
                self.shared.metrics.queued_teams.set(state.len() as i64);
                popped
            };
            if let Some(key_team) = popped {
                self.shared.metrics.emissions.inc();
                return Ok(key_team);
            }
            if self.score_requests.is_disconnected() {
                return Err(SpotlightError::Closed);
            }
            time::sleep(self.poll_interval).await;
        }
    }

    /// The endless sequence of selected teams. Ends when the service stops.
    pub fn flow(self) -> impl Stream<Item = KeyTeam> {
        unfold(self, |handle| async move {
            handle.next().await.ok().map(|key_team| (key_team, handle))
        })
    }
}

enum SpotlightTrigger {
    ScoreboardPush,
    Update(ContestUpdate),
    AddScore(AddScoreRequest),
}

/// The teams to show because of their current standing.
fn scoreboard_places(scoreboard: &ScoreboardReceiver, lowest_rank: u32) -> Vec<(TeamId, u32)> {
    let Some(scoreboard) = scoreboard.borrow().clone() else {
        return vec![];
    };
    scoreboard
        .ranked()
        .filter(|(_, rank)| (1..=lowest_rank).contains(rank))
        .map(|(team_id, rank)| (team_id.clone(), rank))
        .collect()
}

pub async fn main(
    runtime: AppRuntime,
    config: Config,
    tuned_updates: TunedReceiver,
    scoreboard: Option<ScoreboardReceiver>,
    inputs: SpotlightInputs,
) -> Result<()> {
    info!("starting spotlight service");

    let weights: SpotlightWeights = runtime
        .config
        .spotlight
        .clone()
        .try_into()
        .context("unable to parse the spotlight config")?;

    let SpotlightInputs {
        shared,
        score_requests,
    } = inputs;
    shared
        .metrics
        .register(runtime.metrics_registry.write().await.deref_mut());

    let push_interval = Duration::from_secs(config.spotlight_push_interval_seconds);
    let mut interval = time::interval_at(time::Instant::now() + push_interval, push_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let push_stream = IntervalStream::new(interval).map(|_| SpotlightTrigger::ScoreboardPush);
    let updates_stream = tuned_updates.into_stream().map(SpotlightTrigger::Update);
    let score_stream = score_requests.into_stream().map(SpotlightTrigger::AddScore);

    let mut triggers = select_all(vec![
        push_stream.boxed(),
        updates_stream.boxed(),
        score_stream.boxed(),
    ]);

    let mut info: Option<Arc<ContestInfo>> = None;
    let mut runs = RunTracker::new(Duration::from_secs(config.spotlight_run_window_seconds));

    loop {
        let trigger = select! {
            biased;
            _ = runtime.cancellation_token.cancelled() => return Ok(()),
            trigger = triggers.next() => trigger,
        };
        let Some(trigger) = trigger else {
            debug!("all spotlight inputs have ended");
            runtime.cancellation_token.cancelled().await;
            return Ok(());
        };

        let accents: Vec<(TeamId, TeamAccent)> = match trigger {
            SpotlightTrigger::ScoreboardPush => match &scoreboard {
                Some(scoreboard) => scoreboard_places(scoreboard, config.spotlight_lowest_rank)
                    .into_iter()
                    .map(|(team_id, rank)| {
                        let accent = TeamAccent::ScoreboardPlace {
                            rank,
                            lowest_rank: config.spotlight_lowest_rank,
                        };
                        (team_id, accent)
                    })
                    .collect(),
                None => vec![],
            },
            SpotlightTrigger::Update(ContestUpdate::Info(update)) => {
                info = Some(update);
                vec![]
            }
            SpotlightTrigger::Update(ContestUpdate::Run(run)) => {
                let Some(info) = info.as_ref() else {
                    continue;
                };
                if runs.should_count(&run, info.current_contest_time(Utc::now())) {
                    vec![(run.team_id.clone(), TeamAccent::Run(run))]
                } else {
                    vec![]
                }
            }
            SpotlightTrigger::Update(ContestUpdate::Social(event)) => event
                .team_ids
                .into_iter()
                .map(|team_id| (team_id, TeamAccent::Social))
                .collect(),
            SpotlightTrigger::Update(ContestUpdate::Analytics(_)) => vec![],
            SpotlightTrigger::AddScore(request) => {
                vec![(request.team_id, TeamAccent::ExternalScore(request.score))]
            }
        };
        if accents.is_empty() {
            continue;
        }

        let mut state = shared.state.lock().await;
        for (team_id, accent) in &accents {
            state.add_accent(team_id, accent, &weights);
            shared
                .metrics
                .accents
                .get_or_create(&AccentLabels {
                    kind: accent.kind().to_string(),
                })
                .inc();
        }
        shared.metrics.queued_teams.set(state.len() as i64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::tests::{run, verdict};
    use chrono::Duration as ChronoDuration;
    use scorecast_common::models::{ContestStatus, RunId, SocialEvent, Verdict};
    use scorecast_common::server::runtime::AppConfig;
    use scorecast_common::tuned;
    use tokio_util::sync::CancellationToken;

    fn config() -> Config {
        Config {
            spotlight_push_interval_seconds: 60,
            spotlight_lowest_rank: 10,
            spotlight_run_window_seconds: 60,
            spotlight_poll_interval_ms: 10,
        }
    }

    fn running_for(minutes: i64) -> Arc<ContestInfo> {
        Arc::new(ContestInfo {
            status: ContestStatus::Running {
                started_at: Utc::now() - ChronoDuration::minutes(minutes),
                frozen_at: None,
            },
            ..ContestInfo::default()
        })
    }

    #[tokio::test]
    async fn should_select_teams_by_accumulated_interest() {
        let cancellation_token = CancellationToken::new();
        let runtime = AppRuntime::new(AppConfig::default(), cancellation_token.clone());
        let config = config();
        let (tuned_updates, tuned_tx) = tuned::channel(64);
        let tuned_rx = tuned_updates.subscribe();
        let (handle, inputs) = channel(Duration::from_millis(config.spotlight_poll_interval_ms));
        let service = tokio::spawn(main(runtime, config, tuned_rx, None, inputs));

        tuned_tx.publish(ContestUpdate::Info(running_for(10)));
        // Submitted half a minute ago, so inside the run window
        let fts = run("r1", "t2", 570, verdict(Verdict::Accepted, true));
        tuned_tx.publish(ContestUpdate::Run(fts));
        // Far outside the run window
        let old = run("r2", "t3", 10, verdict(Verdict::Accepted, true));
        tuned_tx.publish(ContestUpdate::Run(old));
        tuned_tx.publish(ContestUpdate::Social(SocialEvent {
            team_ids: vec![TeamId::from("t1")],
            message: "what a solve".to_string(),
        }));

        let first = handle.next().await.unwrap();
        assert_eq!(first.team_id, TeamId::from("t2"));
        assert_eq!(
            first.cause,
            SpotlightCause::Run {
                run_id: RunId::from("r1")
            }
        );
        let second = handle.next().await.unwrap();
        assert_eq!(second.team_id, TeamId::from("t1"));
        assert_eq!(second.cause, SpotlightCause::ScoreSum);

        handle.add_score(TeamId::from("t3"), 1.0).await.unwrap();
        assert_eq!(handle.next().await.unwrap().team_id, TeamId::from("t3"));

        cancellation_token.cancel();
        service.await.unwrap().unwrap();
        assert_eq!(handle.next().await, Err(SpotlightError::Closed));
    }

    #[tokio::test]
    async fn should_reject_invalid_weights() {
        let mut app_config = AppConfig::default();
        app_config.spotlight = toml::from_str("rank_score = \"high\"").unwrap();
        let runtime = AppRuntime::new(app_config, CancellationToken::new());
        let (tuned_updates, _tuned_tx) = tuned::channel(1);
        let tuned_rx = tuned_updates.subscribe();
        let (_handle, inputs) = channel(Duration::from_millis(10));
        assert!(main(runtime, config(), tuned_rx, None, inputs).await.is_err());
    }
}
