// SPDX-License-Identifier: AGPL-3.0-only
// Copyright Authors of scorecast

pub mod config;
pub mod legacy;
pub mod loader;
mod metrics;
pub mod regexes;
pub mod rules;
pub mod template;
mod time_format;

use crate::config::Config;
use crate::loader::RulesWatcher;
use crate::metrics::TuningMetrics;
use crate::rules::TuningRule;
use color_eyre::eyre::Result;
use scorecast_common::models::{ContestInfo, ContestUpdate, RunId, RunInfo, TeamId};
use scorecast_common::server::runtime::AppRuntime;
use scorecast_common::tuned::{TunedPublisher, TunedSnapshot};
use std::collections::{BTreeMap, BTreeSet};
use std::ops::DerefMut;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio::{select, time};
use tracing::{debug, info, warn};

/// The state of the tuning service: the raw info, the active rules, the latest state of every
/// run and the teams which have submitted at least once.
#[derive(Default)]
pub struct Tuner {
    rules: Vec<TuningRule>,
    raw_info: Option<Arc<ContestInfo>>,
    runs: BTreeMap<RunId, RunInfo>,
    submitted_teams: BTreeSet<TeamId>,
    published: Option<Arc<ContestInfo>>,
    dirty: bool,
}

impl Tuner {
    pub fn set_rules(&mut self, rules: Vec<TuningRule>) {
        self.rules = rules;
        self.dirty = true;
    }

    /// Records a raw update and returns the update which should be passed through unchanged.
    pub fn accept(&mut self, update: ContestUpdate) -> Option<ContestUpdate> {
        match update {
            ContestUpdate::Info(info) => {
                self.raw_info = Some(info);
                self.dirty = true;
                None
            }
            ContestUpdate::Run(run) => {
                let hides_no_shows = self
                    .published
                    .as_ref()
                    .is_some_and(|info| !info.show_teams_without_submissions);
                if self.submitted_teams.insert(run.team_id.clone()) && hides_no_shows {
                    self.dirty = true;
                }
                self.runs.insert(run.id.clone(), run.clone());
                Some(ContestUpdate::Run(run))
            }
            other => Some(other),
        }
    }

    /// Applies the rules when anything changed. Returns the tuned info if it differs from the
    /// previously published one.
    pub fn recompute(&mut self) -> Option<Arc<ContestInfo>> {
        if !std::mem::take(&mut self.dirty) {
            return None;
        }
        let raw_info = self.raw_info.as_ref()?;
        let tuned = rules::apply(
            &self.rules,
            ContestInfo::clone(raw_info),
            &self.submitted_teams,
        );
        if self.published.as_deref() == Some(&tuned) {
            return None;
        }
        let tuned = Arc::new(tuned);
        self.published = Some(tuned.clone());
        Some(tuned)
    }

    /// Everything a consumer needs to catch up: the published info and every run.
    pub fn snapshot(&self) -> TunedSnapshot {
        TunedSnapshot {
            info: self.published.clone(),
            runs: self.runs.values().cloned().collect(),
        }
    }
}

pub async fn main(
    runtime: AppRuntime,
    config: Config,
    raw_updates: flume::Receiver<ContestUpdate>,
    tuned_updates: TunedPublisher,
) -> Result<()> {
    info!("starting tuning service");

    let metrics = TuningMetrics::default();
    metrics.register(runtime.metrics_registry.write().await.deref_mut());

    let mut watcher = config.tuning_rules_file.map(RulesWatcher::new);
    let mut interval = time::interval(Duration::from_millis(config.tuning_poll_interval_ms));
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut tuner = Tuner::default();
    let mut raw_open = true;

    loop {
        select! {
            biased;
            _ = runtime.cancellation_token.cancelled() => return Ok(()),
            _ = interval.tick() => {
                let Some(watcher) = watcher.as_mut() else {
                    continue;
                };
                match watcher.poll().await {
                    Ok(Some(rules)) => {
                        info! {
                            path = ?watcher.path(),
                            count = rules.len(),
                            "loaded tuning rules"
                        }
                        metrics.rules.set(rules.len() as i64);
                        tuner.set_rules(rules);
                    }
                    Ok(None) => {}
                    Err(error) => {
                        warn! {
                            ?error,
                            "unable to load the tuning rules, keeping the previous ones"
                        }
                        metrics.reload_errors.inc();
                    }
                }
            }
            Some(request) = tuned_updates.next_resync() => {
                // Rules or info changes which are not published yet follow as live updates
                request.answer(tuner.snapshot());
                continue;
            }
            update = raw_updates.recv_async(), if raw_open => match update {
                Ok(update) => {
                    if let Some(update) = tuner.accept(update) {
                        tuned_updates.publish(update);
                    }
                }
                Err(_) => {
                    debug!("the raw update stream has ended");
                    raw_open = false;
                }
            }
        }

        if let Some(info) = tuner.recompute() {
            metrics.recomputes.inc();
            tuned_updates.publish(ContestUpdate::Info(info));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::parse_rules;
    use scorecast_common::models::{ProblemId, RunResult, TeamInfo, Verdict};
    use scorecast_common::server::runtime::AppConfig;
    use scorecast_common::tuned;
    use tokio_util::sync::CancellationToken;

    fn raw_info() -> ContestUpdate {
        ContestUpdate::Info(Arc::new(ContestInfo {
            teams: vec![TeamInfo::new("t1", "Alpha"), TeamInfo::new("t2", "Beta")],
            ..ContestInfo::default()
        }))
    }

    fn run(team: &str) -> ContestUpdate {
        ContestUpdate::Run(RunInfo {
            id: RunId::from(format!("{team}-run")),
            result: RunResult::Icpc {
                verdict: Verdict::WrongAnswer,
                is_first_to_solve_run: false,
            },
            problem_id: ProblemId::from("A"),
            team_id: TeamId::from(team),
            time: Duration::from_secs(60),
            language_id: None,
            featured_run_media: None,
            is_hidden: false,
        })
    }

    fn hidden(info: &ContestInfo) -> Vec<bool> {
        info.teams.iter().map(|team| team.is_hidden).collect()
    }

    #[test]
    fn should_publish_nothing_before_first_info() {
        let mut tuner = Tuner::default();
        tuner.set_rules(vec![]);
        assert!(tuner.accept(run("t1")).is_some());
        assert!(tuner.recompute().is_none());
    }

    #[test]
    fn should_reveal_teams_once_they_submit() {
        let mut tuner = Tuner::default();
        tuner.set_rules(
            parse_rules(
                r#"[{"type": "overrideScoreboardSettings", "showTeamsWithoutSubmissions": false}]"#,
            )
            .unwrap(),
        );
        assert!(tuner.accept(raw_info()).is_none());
        let info = tuner.recompute().unwrap();
        assert_eq!(hidden(&info), vec![true, true]);

        tuner.accept(run("t2"));
        let info = tuner.recompute().unwrap();
        assert_eq!(hidden(&info), vec![true, false]);

        // A second run of the same team changes nothing
        tuner.accept(run("t2"));
        assert!(tuner.recompute().is_none());
    }

    #[test]
    fn should_not_republish_identical_info() {
        let mut tuner = Tuner::default();
        tuner.accept(raw_info());
        assert!(tuner.recompute().is_some());

        tuner.accept(raw_info());
        assert!(tuner.recompute().is_none());

        tuner.set_rules(
            parse_rules(r#"[{"type": "overrideContestSettings", "name": "Tuned"}]"#).unwrap(),
        );
        assert_eq!(tuner.recompute().unwrap().name, "Tuned");
    }

    #[test]
    fn should_snapshot_published_info_and_latest_runs() {
        let mut tuner = Tuner::default();
        tuner.accept(run("t1"));
        assert_eq!(tuner.snapshot().info, None);

        tuner.accept(raw_info());
        let info = tuner.recompute().unwrap();
        let ContestUpdate::Run(mut judged) = run("t1") else {
            unreachable!()
        };
        judged.result = RunResult::Icpc {
            verdict: Verdict::Accepted,
            is_first_to_solve_run: true,
        };
        tuner.accept(ContestUpdate::Run(judged.clone()));
        tuner.accept(run("t2"));

        let snapshot = tuner.snapshot();
        assert_eq!(snapshot.info, Some(info));
        assert_eq!(snapshot.runs.len(), 2);
        assert_eq!(snapshot.runs[0], judged);
    }

    #[tokio::test]
    async fn should_catch_up_lagging_receiver() {
        let cancellation_token = CancellationToken::new();
        let runtime = AppRuntime::new(AppConfig::default(), cancellation_token.clone());
        let config = Config {
            tuning_rules_file: None,
            tuning_poll_interval_ms: 1000,
        };
        let (updates, publisher) = tuned::channel(2);
        let mut receiver = updates.subscribe();
        let (raw_tx, raw_rx) = flume::unbounded();
        raw_tx.send(raw_info()).unwrap();
        let teams: Vec<String> = (0..40).map(|index| format!("t{index}")).collect();
        for team in &teams {
            raw_tx.send(run(team)).unwrap();
        }
        let service = tokio::spawn(main(runtime, config, raw_rx, publisher));

        let mut seen_info = false;
        let mut seen_runs = BTreeSet::new();
        tokio::time::timeout(Duration::from_secs(5), async {
            while !seen_info || seen_runs.len() < teams.len() {
                match receiver.recv().await.unwrap() {
                    ContestUpdate::Info(_) => seen_info = true,
                    ContestUpdate::Run(run) => {
                        seen_runs.insert(run.id);
                    }
                    _ => {}
                }
            }
        })
        .await
        .unwrap();

        cancellation_token.cancel();
        service.await.unwrap().unwrap();
    }
}
