//! Per-team scoreboard rows and the comparators ordering them.
mod icpc;
mod ioi;

use scorecast_common::models::{
    ContestInfo, ContestResultType, OptimismLevel, ProblemId, RunId, RunInfo, ScoreboardRow,
    TeamId,
};
use std::cmp::Ordering;
use std::collections::BTreeMap;

pub use icpc::icpc_row;
pub use ioi::ioi_row;

/// The visible runs of one team grouped by problem, each group in submission order.
pub type TeamRuns<'a> = BTreeMap<&'a ProblemId, Vec<&'a RunInfo>>;

/// Groups the visible runs by team and problem.
pub fn group_runs(runs: &BTreeMap<RunId, RunInfo>) -> BTreeMap<&TeamId, TeamRuns<'_>> {
    let mut grouped: BTreeMap<&TeamId, TeamRuns<'_>> = BTreeMap::new();
    for run in runs.values().filter(|run| !run.is_hidden) {
        grouped
            .entry(&run.team_id)
            .or_default()
            .entry(&run.problem_id)
            .or_default()
            .push(run);
    }
    for problems in grouped.values_mut() {
        for problem_runs in problems.values_mut() {
            problem_runs.sort_by(|a, b| a.time.cmp(&b.time).then_with(|| a.id.cmp(&b.id)));
        }
    }
    grouped
}

/// Rows for every team which is not hidden. Teams without runs get an empty row.
pub fn calculate_rows(
    info: &ContestInfo,
    runs: &BTreeMap<RunId, RunInfo>,
    level: OptimismLevel,
) -> BTreeMap<TeamId, ScoreboardRow> {
    let grouped = group_runs(runs);
    let no_runs = TeamRuns::new();
    info.teams
        .iter()
        .filter(|team| !info.is_team_hidden(team))
        .map(|team| {
            let team_runs = grouped.get(&team.id).unwrap_or(&no_runs);
            let row = match info.result_type {
                ContestResultType::Icpc => icpc_row(info, team_runs, level),
                ContestResultType::Ioi => ioi_row(info, team_runs),
            };
            (team.id.clone(), row)
        })
        .collect()
}

/// Orders rows from best to worst. Rows comparing equal share a rank.
pub fn compare_rows(
    result_type: ContestResultType,
    a: &ScoreboardRow,
    b: &ScoreboardRow,
) -> Ordering {
    let by_score = b.total_score.total_cmp(&a.total_score);
    match result_type {
        ContestResultType::Icpc => by_score
            .then_with(|| a.penalty.cmp(&b.penalty))
            .then_with(|| a.last_accepted.cmp(&b.last_accepted)),
        ContestResultType::Ioi => by_score,
    }
}
