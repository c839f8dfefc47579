// SPDX-License-Identifier: AGPL-3.0-only
// Copyright Authors of scorecast

pub mod awards;
pub mod calculator;
pub mod config;
mod metrics;
pub mod penalty;
pub mod ranking;

use crate::config::Config;
use crate::metrics::{LevelLabels, ScoreboardMetrics};
use color_eyre::eyre::Result;
use scorecast_common::models::{
    ContestInfo, ContestResultType, ContestUpdate, OptimismLevel, RunId, RunInfo, Scoreboard,
};
use scorecast_common::server::runtime::AppRuntime;
use scorecast_common::tuned::TunedReceiver;
use std::collections::BTreeMap;
use std::ops::DerefMut;
use std::sync::Arc;
use tokio::select;
use tokio::sync::watch;
use tracing::{debug, info};

/// The latest standings of one optimism level. Empty until the first contest info arrives.
pub type ScoreboardSender = watch::Sender<Option<Arc<Scoreboard>>>;
pub type ScoreboardReceiver = watch::Receiver<Option<Arc<Scoreboard>>>;

/// Creates one latest-value channel per optimism level.
pub fn channels(
    levels: &[OptimismLevel],
) -> (
    BTreeMap<OptimismLevel, ScoreboardSender>,
    BTreeMap<OptimismLevel, ScoreboardReceiver>,
) {
    levels
        .iter()
        .map(|level| {
            let (sender, receiver) = watch::channel(None);
            ((*level, sender), (*level, receiver))
        })
        .unzip()
}

/// Whether replacing `previous` with `run` can change the standings. Progress reports of a run
/// which is still being judged do not.
fn affects_standings(previous: Option<&RunInfo>, run: &RunInfo) -> bool {
    let Some(previous) = previous else {
        return true;
    };
    if previous.is_judged() || run.is_judged() {
        return previous != run;
    }
    previous.team_id != run.team_id
        || previous.problem_id != run.problem_id
        || previous.time != run.time
        || previous.is_hidden != run.is_hidden
}

/// The inputs of the standings: the latest tuned info and every run seen so far.
#[derive(Default)]
pub struct ScoreboardState {
    info: Option<Arc<ContestInfo>>,
    runs: BTreeMap<RunId, RunInfo>,
}

impl ScoreboardState {
    /// Records an update. Returns whether the standings have to be recomputed.
    pub fn accept(&mut self, update: ContestUpdate) -> bool {
        match update {
            ContestUpdate::Info(info) => {
                if self.info.as_ref() == Some(&info) {
                    return false;
                }
                self.info = Some(info);
                true
            }
            ContestUpdate::Run(run) => {
                let affects = affects_standings(self.runs.get(&run.id), &run);
                self.runs.insert(run.id.clone(), run);
                affects && self.info.is_some()
            }
            ContestUpdate::Analytics(_) | ContestUpdate::Social(_) => false,
        }
    }

    pub fn calculate(&self, level: OptimismLevel) -> Option<Scoreboard> {
        let info = self.info.as_deref()?;
        let rows = calculator::calculate_rows(info, &self.runs, level);
        let ranking = ranking::rank(info, &rows);
        let awards = awards::assign(info, &ranking, &rows);
        Some(Scoreboard {
            order: ranking.order,
            ranks: ranking.ranks,
            rows,
            awards,
        })
    }

    pub fn result_type(&self) -> Option<ContestResultType> {
        self.info.as_ref().map(|info| info.result_type)
    }
}

fn publish(
    state: &ScoreboardState,
    outputs: &BTreeMap<OptimismLevel, ScoreboardSender>,
    metrics: &ScoreboardMetrics,
) {
    // Optimism only matters for ICPC, IOI standings are computed once for every level
    let reuse = state.result_type() == Some(ContestResultType::Ioi);
    let mut shared: Option<Arc<Scoreboard>> = None;
    for (level, sender) in outputs {
        let scoreboard = match shared.clone().filter(|_| reuse) {
            Some(scoreboard) => scoreboard,
            None => {
                let Some(scoreboard) = state.calculate(*level) else {
                    return;
                };
                let scoreboard = Arc::new(scoreboard);
                shared = Some(scoreboard.clone());
                scoreboard
            }
        };
        sender.send_replace(Some(scoreboard));
        metrics
            .recomputes
            .get_or_create(&LevelLabels {
                level: level.to_string(),
            })
            .inc();
    }
}

pub async fn main(
    runtime: AppRuntime,
    config: Config,
    mut tuned_updates: TunedReceiver,
    outputs: BTreeMap<OptimismLevel, ScoreboardSender>,
) -> Result<()> {
    info! {
        levels = ?config.scoreboard_optimism_levels,
        "starting scoreboard service"
    }

    let metrics = ScoreboardMetrics::default();
    metrics.register(runtime.metrics_registry.write().await.deref_mut());

    let mut state = ScoreboardState::default();

    loop {
        let update = select! {
            biased;
            _ = runtime.cancellation_token.cancelled() => return Ok(()),
            update = tuned_updates.recv() => update,
        };
        let Some(update) = update else {
            debug!("the tuned update stream has ended");
            runtime.cancellation_token.cancelled().await;
            return Ok(());
        };
        let mut dirty = state.accept(update);

        // Everything which is already queued is folded into a single recompute
        while let Some(update) = tuned_updates.try_recv() {
            dirty |= state.accept(update);
        }
        metrics.lagged_updates.inc_by(tuned_updates.take_skipped());

        if dirty {
            publish(&state, &outputs, &metrics);
        } else {
            metrics.skipped_updates.inc();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculator::tests::{contest, pending, run, verdict};
    use scorecast_common::models::{RunResult, TeamId, Verdict};
    use scorecast_common::server::runtime::AppConfig;
    use scorecast_common::tuned::{self, TunedSnapshot};
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;

    #[test]
    fn should_publish_nothing_before_first_info() {
        let mut state = ScoreboardState::default();
        assert!(!state.accept(ContestUpdate::Run(run("r1", "t1", "A", 1, pending()))));
        assert!(state.calculate(OptimismLevel::Normal).is_none());

        assert!(state.accept(ContestUpdate::Info(Arc::new(contest(&["t1"])))));
        let scoreboard = state.calculate(OptimismLevel::Normal).unwrap();
        assert_eq!(scoreboard.order, vec![TeamId::from("t1")]);
    }

    #[test]
    fn should_skip_unchanged_in_progress_updates() {
        let mut state = ScoreboardState::default();
        state.accept(ContestUpdate::Info(Arc::new(contest(&["t1"]))));

        assert!(state.accept(ContestUpdate::Run(run("r1", "t1", "A", 1, pending()))));
        let progressed = run("r1", "t1", "A", 1, RunResult::InProgress { tested_part: 0.5 });
        assert!(!state.accept(ContestUpdate::Run(progressed)));
        assert!(state.accept(ContestUpdate::Run(run(
            "r1",
            "t1",
            "A",
            1,
            verdict(Verdict::Accepted)
        ))));
        assert!(!state.accept(ContestUpdate::Run(run(
            "r1",
            "t1",
            "A",
            1,
            verdict(Verdict::Accepted)
        ))));
    }

    #[tokio::test]
    async fn should_publish_every_level() {
        let cancellation_token = CancellationToken::new();
        let runtime = AppRuntime::new(AppConfig::default(), cancellation_token.clone());
        let (tuned_updates, tuned_tx) = tuned::channel(16);
        let tuned_rx = tuned_updates.subscribe();
        let levels = vec![OptimismLevel::Normal, OptimismLevel::Optimistic];
        let (outputs, mut receivers) = channels(&levels);
        let config = Config {
            scoreboard_optimism_levels: levels,
        };
        let service = tokio::spawn(main(runtime, config, tuned_rx, outputs));

        tuned_tx.publish(ContestUpdate::Info(Arc::new(contest(&["t1", "t2"]))));
        tuned_tx.publish(ContestUpdate::Run(run("r1", "t2", "A", 3, pending())));

        let optimistic = receivers.get_mut(&OptimismLevel::Optimistic).unwrap();
        let scoreboard = tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                optimistic.changed().await.unwrap();
                let scoreboard = optimistic.borrow_and_update().clone().unwrap();
                if scoreboard.rows[&TeamId::from("t2")].total_score > 0.0 {
                    return scoreboard;
                }
            }
        })
        .await
        .unwrap();
        assert_eq!(scoreboard.order[0], TeamId::from("t2"));

        let normal = receivers[&OptimismLevel::Normal].borrow().clone().unwrap();
        assert_eq!(normal.rows[&TeamId::from("t2")].total_score, 0.0);

        cancellation_token.cancel();
        service.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn should_match_full_recompute_after_lagging() {
        let cancellation_token = CancellationToken::new();
        let runtime = AppRuntime::new(AppConfig::default(), cancellation_token.clone());
        let (tuned_updates, tuned_tx) = tuned::channel(4);
        let tuned_rx = tuned_updates.subscribe();
        let (outputs, mut receivers) = channels(&[OptimismLevel::Normal]);

        let teams: Vec<String> = (0..20).map(|index| format!("t{index}")).collect();
        let team_ids: Vec<&str> = teams.iter().map(String::as_str).collect();
        let mut updates = vec![ContestUpdate::Info(Arc::new(contest(&team_ids)))];
        for (index, team) in teams.iter().enumerate() {
            let id = format!("r{index}");
            let minute = index as u64 + 1;
            updates.push(ContestUpdate::Run(run(&id, team, "A", minute, pending())));
            let result = if index % 3 == 0 {
                verdict(Verdict::WrongAnswer)
            } else {
                verdict(Verdict::Accepted)
            };
            updates.push(ContestUpdate::Run(run(&id, team, "A", minute, result)));
        }

        let mut expected = ScoreboardState::default();
        let mut latest_runs = BTreeMap::new();
        for update in &updates {
            expected.accept(update.clone());
            if let ContestUpdate::Run(run) = update {
                latest_runs.insert(run.id.clone(), run.clone());
            }
        }
        let expected = expected.calculate(OptimismLevel::Normal).unwrap();

        // Everything is published before the service reads anything, far beyond the capacity
        for update in updates {
            tuned_tx.publish(update);
        }
        let config = Config {
            scoreboard_optimism_levels: vec![OptimismLevel::Normal],
        };
        let service = tokio::spawn(main(runtime, config, tuned_rx, outputs));

        // The service fell behind and asks for the current state
        let request = tuned_tx.next_resync().await.unwrap();
        request.answer(TunedSnapshot {
            info: Some(Arc::new(contest(&team_ids))),
            runs: latest_runs.into_values().collect(),
        });

        let normal = receivers.get_mut(&OptimismLevel::Normal).unwrap();
        let scoreboard = tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                let current = normal.borrow_and_update().clone();
                if let Some(scoreboard) = current.filter(|scoreboard| **scoreboard == expected) {
                    return scoreboard;
                }
                normal.changed().await.unwrap();
            }
        })
        .await
        .unwrap();
        assert_eq!(scoreboard.order.len(), 20);

        cancellation_token.cancel();
        service.await.unwrap().unwrap();
    }
}
