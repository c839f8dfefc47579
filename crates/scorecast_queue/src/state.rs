use crate::handle::{FeaturedRunInfo, QueueError};
use chrono::{DateTime, Utc};
use scorecast_common::models::{ContestInfo, Media, QueueSettings, RunId, RunInfo, RunResult};
use scorecast_common::publish::SnapshotEvent;
use scorecast_common::utils::time::instant_at;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum QueueEvent {
    /// The whole queue ordered by submission time.
    Snapshot { runs: Vec<RunInfo> },
    Add { run: RunInfo },
    Modify { run: RunInfo },
    Remove { run: RunInfo },
}

impl QueueEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            QueueEvent::Snapshot { .. } => "snapshot",
            QueueEvent::Add { .. } => "add",
            QueueEvent::Modify { .. } => "modify",
            QueueEvent::Remove { .. } => "remove",
        }
    }
}

impl SnapshotEvent for QueueEvent {
    fn is_snapshot(&self) -> bool {
        matches!(self, QueueEvent::Snapshot { .. })
    }
}

struct FeaturedRun {
    run_id: RunId,
    media: Media,
}

fn is_in_progress(run: &RunInfo) -> bool {
    matches!(run.result, RunResult::InProgress { .. })
}

fn time_in_queue(run: &RunInfo, settings: &QueueSettings) -> Duration {
    if run.featured_run_media.is_some() {
        settings.featured_run_wait_time
    } else if run.is_first_to_solve() {
        settings.first_to_solve_wait_time
    } else if is_in_progress(run) {
        settings.in_progress_run_wait_time
    } else {
        settings.wait_time
    }
}

/// The queue of recent runs. Every mutation records the resulting diff events, which are
/// collected with [QueueState::take_events].
pub struct QueueState {
    info: Option<Arc<ContestInfo>>,
    runs: BTreeMap<RunId, RunInfo>,
    /// The latest state of every run seen which is not queued right now
    removed_runs: BTreeMap<RunId, RunInfo>,
    last_update_time: BTreeMap<RunId, Duration>,
    featured: Option<FeaturedRun>,
    first_event_time: Option<Duration>,
    replay_grace: Duration,
    events: Vec<QueueEvent>,
}

impl QueueState {
    pub fn new(replay_grace: Duration) -> Self {
        Self {
            info: None,
            runs: BTreeMap::new(),
            removed_runs: BTreeMap::new(),
            last_update_time: BTreeMap::new(),
            featured: None,
            first_event_time: None,
            replay_grace,
            events: Vec::new(),
        }
    }

    pub fn take_events(&mut self) -> Vec<QueueEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn len(&self) -> usize {
        self.runs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    pub fn contains(&self, run_id: &RunId) -> bool {
        self.runs.contains_key(run_id)
    }

    pub fn snapshot(&self) -> QueueEvent {
        let mut runs: Vec<RunInfo> = self.runs.values().cloned().collect();
        runs.sort_by(|a, b| a.time.cmp(&b.time).then_with(|| a.id.cmp(&b.id)));
        QueueEvent::Snapshot { runs }
    }

    pub fn set_info(&mut self, info: Arc<ContestInfo>) {
        self.info = Some(info);
    }

    /// The info once the contest has started. Runs are ignored before that.
    fn started_info(&self) -> Option<Arc<ContestInfo>> {
        self.info
            .as_ref()
            .filter(|info| !info.status.is_before())
            .cloned()
    }

    fn featured_media(&self, run_id: &RunId) -> Option<Media> {
        self.featured
            .as_ref()
            .filter(|featured| &featured.run_id == run_id)
            .map(|featured| featured.media.clone())
    }

    /// Queues or updates `run`, keeping the featured media in sync with the queue state.
    fn upsert(&mut self, mut run: RunInfo) {
        run.featured_run_media = self.featured_media(&run.id);
        self.events.push(if self.runs.contains_key(&run.id) {
            QueueEvent::Modify { run: run.clone() }
        } else {
            QueueEvent::Add { run: run.clone() }
        });
        self.removed_runs.remove(&run.id);
        self.runs.insert(run.id.clone(), run);
    }

    fn remove(&mut self, run_id: &RunId) {
        let Some(mut run) = self.runs.remove(run_id) else {
            return;
        };
        if self.featured_media(run_id).is_some() {
            self.featured = None;
            run.featured_run_media = None;
        }
        self.events.push(QueueEvent::Remove { run: run.clone() });
        self.removed_runs.insert(run.id.clone(), run);
    }

    /// Drops the featured media of a run which is no longer featured.
    fn unfeature(&mut self, run_id: &RunId) {
        if let Some(run) = self.runs.get(run_id).cloned() {
            self.upsert(run);
        } else if let Some(run) = self.removed_runs.get_mut(run_id) {
            run.featured_run_media = None;
        }
    }

    /// Whether `run` is exactly the latest known state of that run. Updates replayed after a
    /// resync are repeats.
    fn is_repeat(&self, run: &RunInfo) -> bool {
        self.known_run(&run.id).is_some_and(|known| {
            let featured_run_media = run.featured_run_media.clone();
            RunInfo {
                featured_run_media,
                ..known
            } == *run
        })
    }

    pub fn on_run(&mut self, run: RunInfo, now: DateTime<Utc>) {
        let Some(info) = self.started_info() else {
            debug! {
                run = %run.id,
                "ignoring a run before the contest has started"
            }
            return;
        };
        if self.is_repeat(&run) {
            debug! {
                run = %run.id,
                "ignoring a repeated run update"
            }
            return;
        }
        let contest_time = info.current_contest_time(now);
        let first_event_time = *self.first_event_time.get_or_insert(contest_time);
        // Runs replayed right after startup keep their own time so they do not flood the queue
        let update_time = if contest_time > first_event_time + self.replay_grace {
            contest_time
        } else {
            run.time
        };
        self.last_update_time.insert(run.id.clone(), update_time);

        if run.is_hidden {
            if self.runs.contains_key(&run.id) {
                self.remove(&run.id);
            }
            self.removed_runs.insert(run.id.clone(), run);
            return;
        }

        let settings = &info.queue_settings;
        let should_update = if self.runs.contains_key(&run.id) {
            true
        } else if is_in_progress(&run)
            && self.runs.values().filter(|run| is_in_progress(run)).count()
                >= settings.max_untested_run
        {
            false
        } else {
            contest_time < update_time + time_in_queue(&run, settings)
        };

        if should_update {
            self.upsert(run);
        } else {
            self.removed_runs.insert(run.id.clone(), run);
        }
    }

    /// Removes every run which outlived its time in queue. Featured runs stay.
    pub fn evict_expired(&mut self, now: DateTime<Utc>) {
        let Some(info) = self.info.clone() else {
            return;
        };
        let contest_time = info.current_contest_time(now);
        let expired: Vec<RunId> = self
            .runs
            .values()
            .filter(|run| run.featured_run_media.is_none())
            .filter(|run| {
                let last_update = self
                    .last_update_time
                    .get(&run.id)
                    .copied()
                    .unwrap_or(run.time);
                contest_time >= last_update + time_in_queue(run, &info.queue_settings)
            })
            .map(|run| run.id.clone())
            .collect();
        for run_id in expired {
            self.remove(&run_id);
        }
    }

    /// Evicts the oldest ordinary runs while the queue is over its size limit. Runs which are
    /// still being judged stay until they get a verdict.
    pub fn enforce_limit(&mut self) {
        let Some(info) = self.info.clone() else {
            return;
        };
        while self.runs.len() > info.queue_settings.max_queue_size {
            let oldest = self
                .runs
                .values()
                .filter(|run| !run.is_first_to_solve() && run.featured_run_media.is_none())
                .filter(|run| !is_in_progress(run))
                .min_by_key(|run| {
                    (
                        self.last_update_time.get(&run.id).copied().unwrap_or(run.time),
                        run.time,
                    )
                })
                .map(|run| run.id.clone());
            match oldest {
                Some(run_id) => self.remove(&run_id),
                None => break,
            }
        }
    }

    fn known_run(&self, run_id: &RunId) -> Option<RunInfo> {
        self.runs
            .get(run_id)
            .or_else(|| self.removed_runs.get(run_id))
            .cloned()
    }

    pub fn make_featured(
        &mut self,
        run_id: &RunId,
        media: Media,
        now: DateTime<Utc>,
    ) -> Result<FeaturedRunInfo, QueueError> {
        let (Some(run), Some(info)) = (self.known_run(run_id), self.info.clone()) else {
            warn! {
                run = %run_id,
                "there is no such run to make featured"
            };
            return Err(QueueError::UnknownRun(run_id.clone()));
        };

        if let Some(previous) = self.featured.take() {
            self.unfeature(&previous.run_id);
        }
        self.featured = Some(FeaturedRun {
            run_id: run_id.clone(),
            media: media.clone(),
        });
        self.upsert(run);
        self.last_update_time
            .insert(run_id.clone(), info.current_contest_time(now));

        Ok(FeaturedRunInfo {
            expires_at: instant_at(now, info.queue_settings.featured_run_wait_time),
            media,
        })
    }

    pub fn make_not_featured(&mut self, run_id: &RunId) -> Result<(), QueueError> {
        if self.known_run(run_id).is_none() {
            warn! {
                run = %run_id,
                "there is no such run to make not featured"
            };
            return Err(QueueError::UnknownRun(run_id.clone()));
        }
        if self.featured_media(run_id).is_some() {
            self.featured = None;
            self.unfeature(run_id);
        }
        Ok(())
    }
}
