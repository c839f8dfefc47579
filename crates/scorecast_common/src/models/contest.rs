// SPDX-License-Identifier: AGPL-3.0-only
// Copyright Authors of scorecast

use super::{GroupId, OrganizationId, ProblemId, TeamId};
use crate::utils::serde::{duration_ms, option_duration_ms};
use crate::utils::time::elapsed_since;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// An immutable snapshot of the contest configuration. Components never mutate a published
/// instance, they replace it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContestInfo {
    pub name: String,
    pub status: ContestStatus,
    #[serde(default)]
    pub result_type: ContestResultType,
    #[serde(rename = "contestLengthMs", with = "duration_ms")]
    pub contest_length: Duration,
    #[serde(rename = "freezeTimeMs", default, with = "option_duration_ms")]
    pub freeze_time: Option<Duration>,
    #[serde(default)]
    pub problems: Vec<ProblemInfo>,
    #[serde(default)]
    pub teams: Vec<TeamInfo>,
    #[serde(default)]
    pub groups: Vec<GroupInfo>,
    #[serde(default)]
    pub organizations: Vec<OrganizationInfo>,
    #[serde(default)]
    pub penalty_rounding_mode: PenaltyRoundingMode,
    #[serde(
        rename = "penaltyPerWrongAttemptMs",
        default = "default_penalty_per_wrong_attempt",
        with = "duration_ms"
    )]
    pub penalty_per_wrong_attempt: Duration,
    #[serde(default = "default_true")]
    pub show_teams_without_submissions: bool,
    #[serde(default)]
    pub awards: AwardsSettings,
    #[serde(default)]
    pub queue_settings: QueueSettings,
    #[serde(default)]
    pub custom_fields: BTreeMap<String, String>,
}

fn default_penalty_per_wrong_attempt() -> Duration {
    Duration::from_secs(20 * 60)
}

fn default_true() -> bool {
    true
}

impl Default for ContestInfo {
    fn default() -> Self {
        Self {
            name: String::new(),
            status: ContestStatus::Before {
                hold_time: None,
                scheduled_start_at: None,
            },
            result_type: ContestResultType::default(),
            contest_length: Duration::from_secs(5 * 60 * 60),
            freeze_time: None,
            problems: vec![],
            teams: vec![],
            groups: vec![],
            organizations: vec![],
            penalty_rounding_mode: PenaltyRoundingMode::default(),
            penalty_per_wrong_attempt: default_penalty_per_wrong_attempt(),
            show_teams_without_submissions: true,
            awards: AwardsSettings::default(),
            queue_settings: QueueSettings::default(),
            custom_fields: BTreeMap::new(),
        }
    }
}

impl ContestInfo {
    pub fn team(&self, id: &TeamId) -> Option<&TeamInfo> {
        self.teams.iter().find(|team| &team.id == id)
    }

    pub fn problem(&self, id: &ProblemId) -> Option<&ProblemInfo> {
        self.problems.iter().find(|problem| &problem.id == id)
    }

    pub fn group(&self, id: &GroupId) -> Option<&GroupInfo> {
        self.groups.iter().find(|group| &group.id == id)
    }

    pub fn organization(&self, id: &OrganizationId) -> Option<&OrganizationInfo> {
        self.organizations.iter().find(|org| &org.id == id)
    }

    /// A team is hidden when it or one of its groups is hidden.
    pub fn is_team_hidden(&self, team: &TeamInfo) -> bool {
        team.is_hidden
            || team
                .groups
                .iter()
                .filter_map(|group| self.group(group))
                .any(|group| group.is_hidden)
    }

    pub fn is_team_out_of_contest(&self, team: &TeamInfo) -> bool {
        team.is_out_of_contest
            || team
                .groups
                .iter()
                .filter_map(|group| self.group(group))
                .any(|group| group.is_out_of_contest)
    }

    /// Problems that take part in the scoreboard, ordered by their ordinal.
    pub fn scoreboard_problems(&self) -> Vec<&ProblemInfo> {
        let mut problems: Vec<&ProblemInfo> =
            self.problems.iter().filter(|p| !p.is_hidden).collect();
        problems.sort_by_key(|p| p.ordinal);
        problems
    }

    pub fn start_time(&self) -> Option<DateTime<Utc>> {
        self.status.start_time()
    }

    /// The contest time at the wall-clock instant `now`.
    pub fn current_contest_time(&self, now: DateTime<Utc>) -> Duration {
        match &self.status {
            ContestStatus::Before { .. } => Duration::ZERO,
            ContestStatus::Running { started_at, .. } => {
                elapsed_since(*started_at, now).min(self.contest_length)
            }
            ContestStatus::Over { .. } | ContestStatus::Finalized { .. } => self.contest_length,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ContestStatus {
    Before {
        #[serde(rename = "holdTimeMs", default, with = "option_duration_ms")]
        hold_time: Option<Duration>,
        #[serde(default)]
        scheduled_start_at: Option<DateTime<Utc>>,
    },
    Running {
        started_at: DateTime<Utc>,
        #[serde(default)]
        frozen_at: Option<DateTime<Utc>>,
    },
    Over {
        started_at: DateTime<Utc>,
        #[serde(default)]
        frozen_at: Option<DateTime<Utc>>,
        #[serde(default)]
        finished_at: Option<DateTime<Utc>>,
    },
    Finalized {
        started_at: DateTime<Utc>,
        #[serde(default)]
        finished_at: Option<DateTime<Utc>>,
    },
}

impl ContestStatus {
    pub fn start_time(&self) -> Option<DateTime<Utc>> {
        match self {
            ContestStatus::Before {
                scheduled_start_at, ..
            } => *scheduled_start_at,
            ContestStatus::Running { started_at, .. }
            | ContestStatus::Over { started_at, .. }
            | ContestStatus::Finalized { started_at, .. } => Some(*started_at),
        }
    }

    pub fn is_before(&self) -> bool {
        matches!(self, ContestStatus::Before { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ContestResultType {
    #[default]
    Icpc,
    Ioi,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamInfo {
    pub id: TeamId,
    pub full_name: String,
    pub display_name: String,
    #[serde(default)]
    pub groups: Vec<GroupId>,
    #[serde(default)]
    pub organization_id: Option<OrganizationId>,
    #[serde(default)]
    pub hash_tag: Option<String>,
    #[serde(default)]
    pub medias: BTreeMap<TeamMediaType, Media>,
    #[serde(default)]
    pub custom_fields: BTreeMap<String, String>,
    #[serde(default)]
    pub is_hidden: bool,
    #[serde(default)]
    pub is_out_of_contest: bool,
    #[serde(default)]
    pub color: Option<String>,
}

impl TeamInfo {
    pub fn new(id: impl Into<TeamId>, name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id: id.into(),
            full_name: name.clone(),
            display_name: name,
            groups: vec![],
            organization_id: None,
            hash_tag: None,
            medias: BTreeMap::new(),
            custom_fields: BTreeMap::new(),
            is_hidden: false,
            is_out_of_contest: false,
            color: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TeamMediaType {
    Camera,
    Screen,
    Record,
    Photo,
    ReactionVideo,
    Achievement,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Media {
    Image { url: String },
    Video { url: String },
    Object { url: String },
    WebRtcProxy { url: String },
    Hls { url: String },
}

impl Media {
    pub fn url(&self) -> &str {
        match self {
            Media::Image { url }
            | Media::Video { url }
            | Media::Object { url }
            | Media::WebRtcProxy { url }
            | Media::Hls { url } => url,
        }
    }

    /// Returns the same kind of media pointing at a rewritten url.
    pub fn map_url(&self, f: impl FnOnce(&str) -> String) -> Media {
        match self {
            Media::Image { url } => Media::Image { url: f(url) },
            Media::Video { url } => Media::Video { url: f(url) },
            Media::Object { url } => Media::Object { url: f(url) },
            Media::WebRtcProxy { url } => Media::WebRtcProxy { url: f(url) },
            Media::Hls { url } => Media::Hls { url: f(url) },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProblemInfo {
    pub id: ProblemId,
    pub display_name: String,
    pub full_name: String,
    #[serde(default)]
    pub ordinal: i32,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub unsolved_color: Option<String>,
    #[serde(default)]
    pub min_score: Option<f64>,
    #[serde(default)]
    pub max_score: Option<f64>,
    #[serde(default)]
    pub score_merge_mode: Option<ScoreMergeMode>,
    #[serde(default = "default_weight")]
    pub weight: u32,
    #[serde(default)]
    pub is_hidden: bool,
}

fn default_weight() -> u32 {
    1
}

impl ProblemInfo {
    pub fn new(id: impl Into<ProblemId>, ordinal: i32) -> Self {
        let id = id.into();
        Self {
            display_name: id.to_string(),
            full_name: id.to_string(),
            id,
            ordinal,
            color: None,
            unsolved_color: None,
            min_score: None,
            max_score: None,
            score_merge_mode: None,
            weight: 1,
            is_hidden: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupInfo {
    pub id: GroupId,
    pub display_name: String,
    #[serde(default)]
    pub is_hidden: bool,
    #[serde(default)]
    pub is_out_of_contest: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationInfo {
    pub id: OrganizationId,
    pub display_name: String,
    pub full_name: String,
    #[serde(default)]
    pub logo: Option<Media>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PenaltyRoundingMode {
    #[default]
    EachSubmissionDownToMinute,
    EachSubmissionUpToMinute,
    SumDownToMinute,
    SumInSeconds,
    Last,
    Zero,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScoreMergeMode {
    /// For each test group, the best result over all runs.
    #[default]
    MaxPerGroup,
    /// The best total over all runs.
    MaxTotal,
    Last,
    /// The last run that passed preliminary testing.
    LastOk,
    Sum,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QueueSettings {
    #[serde(rename = "waitTimeMs", with = "duration_ms")]
    pub wait_time: Duration,
    #[serde(rename = "firstToSolveWaitTimeMs", with = "duration_ms")]
    pub first_to_solve_wait_time: Duration,
    #[serde(rename = "featuredRunWaitTimeMs", with = "duration_ms")]
    pub featured_run_wait_time: Duration,
    #[serde(rename = "inProgressRunWaitTimeMs", with = "duration_ms")]
    pub in_progress_run_wait_time: Duration,
    pub max_queue_size: usize,
    pub max_untested_run: usize,
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            wait_time: Duration::from_secs(60),
            first_to_solve_wait_time: Duration::from_secs(120),
            featured_run_wait_time: Duration::from_secs(60),
            in_progress_run_wait_time: Duration::from_secs(300),
            max_queue_size: 10,
            max_untested_run: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AwardsSettings {
    pub chains: Vec<AwardChain>,
    pub manual: Vec<ManualAward>,
}

/// An ordered list of rank-based awards. A team receives at most the first award of the
/// chain it qualifies for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AwardChain {
    pub awards: Vec<RankBasedAward>,
    #[serde(default)]
    pub groups: Vec<GroupId>,
    #[serde(default)]
    pub excluded_groups: Vec<GroupId>,
    #[serde(default)]
    pub organization_limit: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankBasedAward {
    pub id: String,
    pub citation: String,
    #[serde(default)]
    pub max_rank: Option<u32>,
    /// Teams with a lower score are not eligible. Any non-zero score is required when unset.
    #[serde(default)]
    pub min_score: Option<f64>,
    #[serde(default)]
    pub tiebreak_mode: AwardTiebreakMode,
}

impl RankBasedAward {
    pub fn new(id: impl Into<String>, citation: impl Into<String>, max_rank: u32) -> Self {
        Self {
            id: id.into(),
            citation: citation.into(),
            max_rank: Some(max_rank),
            min_score: None,
            tiebreak_mode: AwardTiebreakMode::All,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AwardTiebreakMode {
    /// Award the whole tied group even when it crosses the cutoff.
    #[default]
    All,
    /// Award nobody from a tied group that crosses the cutoff.
    None,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManualAward {
    pub id: String,
    pub citation: String,
    pub teams: Vec<TeamId>,
}
