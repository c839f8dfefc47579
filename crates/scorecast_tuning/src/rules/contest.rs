use super::merge_maps;
use crate::time_format;
use chrono::{DateTime, Utc};
use scorecast_common::models::{ContestInfo, ContestStatus, PenaltyRoundingMode, TeamId};
use scorecast_common::utils::serde::option_duration_secs;
use scorecast_common::utils::time::instant_at;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;
use tracing::info;

/// Overrides the basic contest settings. Timing changes are applied inside the current status:
/// a start time moves the scheduled or actual start, a freeze time moves an existing freeze
/// instant and a hold time is only kept before the start.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OverrideContestSettings {
    pub name: Option<String>,
    #[serde(with = "time_format")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(rename = "contestLengthSeconds", with = "option_duration_secs")]
    pub contest_length: Option<Duration>,
    #[serde(rename = "freezeTimeSeconds", with = "option_duration_secs")]
    pub freeze_time: Option<Duration>,
    #[serde(rename = "holdTimeSeconds", with = "option_duration_secs")]
    pub hold_time: Option<Duration>,
    pub custom_fields: Option<BTreeMap<String, Option<String>>>,
}

impl OverrideContestSettings {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    pub(crate) fn apply(&self, mut info: ContestInfo) -> ContestInfo {
        if let Some(name) = &self.name {
            info.name = name.clone();
        }
        if let Some(contest_length) = self.contest_length {
            info.contest_length = contest_length;
        }
        if let Some(freeze_time) = self.freeze_time {
            info.freeze_time = Some(freeze_time);
        }

        let retime = self.start_time.is_some() || self.freeze_time.is_some();
        let frozen = |started_at: DateTime<Utc>, frozen_at: Option<DateTime<Utc>>| {
            match (frozen_at, info.freeze_time) {
                (Some(_), Some(freeze_time)) if retime => Some(instant_at(started_at, freeze_time)),
                (frozen_at, _) => frozen_at,
            }
        };
        let status = match &info.status {
            ContestStatus::Before {
                hold_time,
                scheduled_start_at,
            } => ContestStatus::Before {
                hold_time: self.hold_time.or(*hold_time),
                scheduled_start_at: self.start_time.or(*scheduled_start_at),
            },
            ContestStatus::Running {
                started_at,
                frozen_at,
            } => {
                let started_at = self.start_time.unwrap_or(*started_at);
                ContestStatus::Running {
                    started_at,
                    frozen_at: frozen(started_at, *frozen_at),
                }
            }
            ContestStatus::Over {
                started_at,
                frozen_at,
                finished_at,
            } => {
                let started_at = self.start_time.unwrap_or(*started_at);
                ContestStatus::Over {
                    started_at,
                    frozen_at: frozen(started_at, *frozen_at),
                    finished_at: *finished_at,
                }
            }
            ContestStatus::Finalized {
                started_at,
                finished_at,
            } => ContestStatus::Finalized {
                started_at: self.start_time.unwrap_or(*started_at),
                finished_at: *finished_at,
            },
        };
        if status != info.status {
            info! {
                ?status,
                contest_length = ?info.contest_length,
                "contest status overridden"
            }
            info.status = status;
        }

        info.custom_fields = merge_maps(info.custom_fields, self.custom_fields.as_ref());
        info
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OverrideScoreboardSettings {
    #[serde(rename = "penaltyPerWrongAttemptSeconds", with = "option_duration_secs")]
    pub penalty_per_wrong_attempt: Option<Duration>,
    pub show_teams_without_submissions: Option<bool>,
    pub penalty_rounding_mode: Option<PenaltyRoundingMode>,
}

impl OverrideScoreboardSettings {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    pub(crate) fn apply(
        &self,
        mut info: ContestInfo,
        submitted_teams: &BTreeSet<TeamId>,
    ) -> ContestInfo {
        if let Some(penalty) = self.penalty_per_wrong_attempt {
            info.penalty_per_wrong_attempt = penalty;
        }
        if let Some(show) = self.show_teams_without_submissions {
            info.show_teams_without_submissions = show;
        }
        if let Some(mode) = self.penalty_rounding_mode {
            info.penalty_rounding_mode = mode;
        }
        if !info.show_teams_without_submissions {
            for team in &mut info.teams {
                if !submitted_teams.contains(&team.id) {
                    team.is_hidden = true;
                }
            }
        }
        info
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OverrideQueue {
    #[serde(rename = "waitTimeSeconds", with = "option_duration_secs")]
    pub wait_time: Option<Duration>,
    #[serde(rename = "firstToSolveWaitTimeSeconds", with = "option_duration_secs")]
    pub first_to_solve_wait_time: Option<Duration>,
    #[serde(rename = "featuredRunWaitTimeSeconds", with = "option_duration_secs")]
    pub featured_run_wait_time: Option<Duration>,
    #[serde(rename = "inProgressRunWaitTimeSeconds", with = "option_duration_secs")]
    pub in_progress_run_wait_time: Option<Duration>,
    pub max_queue_size: Option<usize>,
    pub max_untested_run: Option<usize>,
}

impl OverrideQueue {
    pub(crate) fn apply(&self, mut info: ContestInfo) -> ContestInfo {
        let settings = &mut info.queue_settings;
        if let Some(wait_time) = self.wait_time {
            settings.wait_time = wait_time;
        }
        if let Some(wait_time) = self.first_to_solve_wait_time {
            settings.first_to_solve_wait_time = wait_time;
        }
        if let Some(wait_time) = self.featured_run_wait_time {
            settings.featured_run_wait_time = wait_time;
        }
        if let Some(wait_time) = self.in_progress_run_wait_time {
            settings.in_progress_run_wait_time = wait_time;
        }
        if let Some(size) = self.max_queue_size {
            settings.max_queue_size = size;
        }
        if let Some(count) = self.max_untested_run {
            settings.max_untested_run = count;
        }
        info
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::tests::{contest, parse};
    use crate::rules::apply;
    use chrono::TimeZone;

    #[test]
    fn should_move_start_and_freeze_of_running_contest() {
        let started_at = Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap();
        let mut info = contest();
        info.status = ContestStatus::Running {
            started_at,
            frozen_at: Some(started_at + chrono::Duration::hours(4)),
        };
        let rules = parse(
            r#"[{"type": "overrideContestSettings", "startTime": "2024-03-01 11:00:00", "freezeTimeSeconds": 7200, "contestLengthSeconds": 18000}]"#,
        );

        let info = apply(&rules, info, &BTreeSet::new());
        let new_start = Utc.with_ymd_and_hms(2024, 3, 1, 11, 0, 0).unwrap();
        assert_eq!(
            info.status,
            ContestStatus::Running {
                started_at: new_start,
                frozen_at: Some(new_start + chrono::Duration::hours(2)),
            }
        );
        assert_eq!(info.contest_length, Duration::from_secs(18000));
        assert_eq!(info.freeze_time, Some(Duration::from_secs(7200)));
    }

    #[test]
    fn should_set_hold_time_only_before_start() {
        let rules = parse(r#"[{"type": "overrideContestSettings", "holdTimeSeconds": 90}]"#);
        let info = apply(&rules, contest(), &BTreeSet::new());
        assert_eq!(
            info.status,
            ContestStatus::Before {
                hold_time: Some(Duration::from_secs(90)),
                scheduled_start_at: None,
            }
        );
    }

    #[test]
    fn should_hide_teams_without_submissions() {
        let rules = parse(
            r#"[{"type": "overrideScoreboardSettings", "showTeamsWithoutSubmissions": false, "penaltyPerWrongAttemptSeconds": 600}]"#,
        );
        let submitted = BTreeSet::from([TeamId::from("t42")]);
        let info = apply(&rules, contest(), &submitted);

        assert!(info.teams[0].is_hidden);
        assert!(!info.teams[1].is_hidden);
        assert_eq!(info.penalty_per_wrong_attempt, Duration::from_secs(600));
    }

    #[test]
    fn should_override_queue_settings() {
        let rules = parse(
            r#"[{"type": "overrideQueue", "waitTimeSeconds": 30, "maxQueueSize": 3}]"#,
        );
        let info = apply(&rules, contest(), &BTreeSet::new());
        assert_eq!(info.queue_settings.wait_time, Duration::from_secs(30));
        assert_eq!(info.queue_settings.max_queue_size, 3);
        assert_eq!(info.queue_settings.max_untested_run, 5);
    }
}
