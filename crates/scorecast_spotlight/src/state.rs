use crate::config::SpotlightWeights;
use scorecast_common::models::{RunId, RunInfo, TeamId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Something that happened to a team and makes it more interesting to show.
#[derive(Debug, Clone, PartialEq)]
pub enum TeamAccent {
    Run(RunInfo),
    ScoreboardPlace { rank: u32, lowest_rank: u32 },
    ExternalScore(f64),
    Social,
}

impl TeamAccent {
    pub fn kind(&self) -> &'static str {
        match self {
            TeamAccent::Run(_) => "run",
            TeamAccent::ScoreboardPlace { .. } => "scoreboard_place",
            TeamAccent::ExternalScore(_) => "external_score",
            TeamAccent::Social => "social",
        }
    }

    pub fn score(&self, weights: &SpotlightWeights) -> f64 {
        match self {
            TeamAccent::Run(run) => {
                let mut score = 0.0;
                if run.is_first_to_solve() {
                    score += weights.first_to_solve_run_score;
                }
                if run.is_judged() && run.is_accepted() {
                    score += weights.accepted_run_score;
                }
                if run.is_judged() {
                    score += weights.judged_run_score;
                } else {
                    score += weights.not_judged_run_score;
                }
                score
            }
            TeamAccent::ScoreboardPlace { rank, lowest_rank } => {
                if *lowest_rank == 0 || *rank == 0 || rank > lowest_rank {
                    return 0.0;
                }
                weights.rank_score * f64::from(lowest_rank + 1 - rank) / f64::from(*lowest_rank)
            }
            TeamAccent::ExternalScore(score) => *score,
            TeamAccent::Social => weights.social_event_score,
        }
    }
}

/// How interesting a run is as the reason for showing its team.
fn interest(run: &RunInfo) -> u8 {
    if run.is_first_to_solve() {
        3
    } else if run.is_judged() && run.is_accepted() {
        2
    } else if run.is_judged() {
        1
    } else {
        0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum SpotlightCause {
    Run { run_id: RunId },
    ScoreSum,
}

/// A team selected for the spotlight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyTeam {
    pub team_id: TeamId,
    pub cause: SpotlightCause,
}

#[derive(Debug, Clone)]
struct TeamState {
    team_id: TeamId,
    score: f64,
    cause: Option<RunInfo>,
}

impl TeamState {
    fn new(team_id: TeamId) -> Self {
        Self {
            team_id,
            score: 0.0,
            cause: None,
        }
    }

    fn add_accent(&mut self, accent: &TeamAccent, weights: &SpotlightWeights) {
        self.score += accent.score(weights);
        if let TeamAccent::Run(run) = accent {
            // On equal interest the run which arrived later wins
            let replace = match &self.cause {
                Some(cause) => interest(cause) <= interest(run),
                None => true,
            };
            if replace {
                self.cause = Some(run.clone());
            }
        }
    }

    fn into_key_team(self) -> KeyTeam {
        KeyTeam {
            team_id: self.team_id,
            cause: match self.cause {
                Some(run) => SpotlightCause::Run { run_id: run.id },
                None => SpotlightCause::ScoreSum,
            },
        }
    }
}

/// The teams with a pending score. Popping a team resets it.
#[derive(Default)]
pub struct SpotlightState {
    teams: BTreeMap<TeamId, TeamState>,
}

impl SpotlightState {
    pub fn add_accent(
        &mut self,
        team_id: &TeamId,
        accent: &TeamAccent,
        weights: &SpotlightWeights,
    ) {
        self.teams
            .entry(team_id.clone())
            .or_insert_with(|| TeamState::new(team_id.clone()))
            .add_accent(accent, weights);
    }

    /// Removes the team with the highest score. Ties go to the lowest team id.
    pub fn pop(&mut self) -> Option<KeyTeam> {
        let team_id = self
            .teams
            .values()
            .max_by(|a, b| {
                a.score
                    .total_cmp(&b.score)
                    .then_with(|| b.team_id.cmp(&a.team_id))
            })
            .map(|team| team.team_id.clone())?;
        self.teams.remove(&team_id).map(TeamState::into_key_team)
    }

    pub fn score(&self, team_id: &TeamId) -> f64 {
        self.teams.get(team_id).map_or(0.0, |team| team.score)
    }

    pub fn len(&self) -> usize {
        self.teams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.teams.is_empty()
    }
}

/// Decides which run updates turn into accents. A run counts once while it is being judged and
/// once more when it becomes judged, as long as it is recent.
pub struct RunTracker {
    window: Duration,
    /// Counted runs still inside the window, with their submission time and whether they were
    /// judged when counted last
    counted: BTreeMap<RunId, (Duration, bool)>,
}

impl RunTracker {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            counted: BTreeMap::new(),
        }
    }

    pub fn should_count(&mut self, run: &RunInfo, contest_time: Duration) -> bool {
        let window = self.window;
        self.counted.retain(|_, (time, _)| *time + window > contest_time);
        if run.is_hidden || run.time + window <= contest_time {
            return false;
        }
        let judged = run.is_judged();
        match self.counted.get(&run.id) {
            Some((_, true)) => false,
            Some((_, false)) if !judged => false,
            _ => {
                self.counted.insert(run.id.clone(), (run.time, judged));
                true
            }
        }
    }

    pub fn len(&self) -> usize {
        self.counted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counted.is_empty()
    }
}
