use super::TeamId;
use crate::utils::serde::{duration_ms, option_duration_ms};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::time::Duration;

/// Controls how runs which are not judged yet are treated in the standings.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Default,
    Serialize,
    Deserialize,
    clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum OptimismLevel {
    #[default]
    Normal,
    Optimistic,
    Pessimistic,
}

impl fmt::Display for OptimismLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OptimismLevel::Normal => "normal",
            OptimismLevel::Optimistic => "optimistic",
            OptimismLevel::Pessimistic => "pessimistic",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreboardRow {
    pub total_score: f64,
    #[serde(rename = "penaltyMs", with = "duration_ms")]
    pub penalty: Duration,
    #[serde(rename = "lastAcceptedMs", with = "duration_ms")]
    pub last_accepted: Duration,
    pub problem_results: Vec<ProblemResult>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ProblemResult {
    Icpc {
        wrong_attempts: u32,
        pending_attempts: u32,
        is_solved: bool,
        is_first_to_solve: bool,
        #[serde(rename = "lastSubmitTimeMs", default, with = "option_duration_ms")]
        last_submit_time: Option<Duration>,
    },
    Ioi {
        score: Option<f64>,
        is_first_best: bool,
        #[serde(rename = "lastSubmitTimeMs", default, with = "option_duration_ms")]
        last_submit_time: Option<Duration>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Award {
    pub id: String,
    pub citation: String,
    pub teams: BTreeSet<TeamId>,
}

/// A complete, ranked table. Always published as a whole.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scoreboard {
    pub order: Vec<TeamId>,
    /// Parallel to `order`. Zero means the team is not ranked (out of contest).
    pub ranks: Vec<u32>,
    pub rows: BTreeMap<TeamId, ScoreboardRow>,
    pub awards: Vec<Award>,
}

impl Scoreboard {
    /// Teams in standings order together with their rank.
    pub fn ranked(&self) -> impl Iterator<Item = (&TeamId, u32)> {
        self.order.iter().zip(self.ranks.iter().copied())
    }
}
