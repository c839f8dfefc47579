use super::TeamRuns;
use scorecast_common::models::{
    ContestInfo, ProblemInfo, ProblemResult, RunInfo, RunResult, ScoreMergeMode, ScoreboardRow,
};
use std::time::Duration;

/// The merged score of one problem, updated run by run.
#[derive(Default)]
struct MergedScore {
    per_group: Vec<f64>,
    total: Option<f64>,
}

impl MergedScore {
    fn add(&mut self, mode: ScoreMergeMode, score: &[f64], wrong: bool) {
        let sum: f64 = score.iter().sum();
        match mode {
            ScoreMergeMode::MaxPerGroup => {
                if self.per_group.len() < score.len() {
                    self.per_group.resize(score.len(), 0.0);
                }
                for (best, value) in self.per_group.iter_mut().zip(score) {
                    *best = best.max(*value);
                }
                self.total = Some(self.per_group.iter().sum());
            }
            ScoreMergeMode::MaxTotal => {
                self.total = Some(self.total.map_or(sum, |total| total.max(sum)));
            }
            ScoreMergeMode::Last => self.total = Some(sum),
            ScoreMergeMode::LastOk => {
                if !wrong {
                    self.total = Some(sum);
                }
            }
            ScoreMergeMode::Sum => self.total = Some(self.total.unwrap_or(0.0) + sum),
        }
    }
}

fn clamp(problem: &ProblemInfo, score: f64) -> f64 {
    let score = problem.min_score.map_or(score, |min| score.max(min));
    problem.max_score.map_or(score, |max| score.min(max))
}

pub fn ioi_row(info: &ContestInfo, runs: &TeamRuns<'_>) -> ScoreboardRow {
    let mut total_score = 0.0;
    let mut last_accepted = Duration::ZERO;

    let problem_results = info
        .scoreboard_problems()
        .into_iter()
        .map(|problem| {
            let problem_runs: &[&RunInfo] =
                runs.get(&problem.id).map(Vec::as_slice).unwrap_or_default();
            let mode = problem.score_merge_mode.unwrap_or_default();
            let mut merged = MergedScore::default();
            let mut score: Option<f64> = None;
            let mut is_first_best = false;

            for run in problem_runs {
                let RunResult::Ioi {
                    score: groups,
                    wrong_verdict,
                    is_first_best_run,
                    ..
                } = &run.result
                else {
                    continue;
                };
                merged.add(mode, groups, wrong_verdict.is_some());
                let Some(total) = merged.total.map(|total| clamp(problem, total)) else {
                    continue;
                };
                if total > score.unwrap_or(0.0) {
                    last_accepted = last_accepted.max(run.time);
                }
                score = Some(total);
                is_first_best |= *is_first_best_run;
            }

            total_score += score.unwrap_or(0.0);
            ProblemResult::Ioi {
                score,
                is_first_best,
                last_submit_time: problem_runs.last().map(|run| run.time),
            }
        })
        .collect();

    ScoreboardRow {
        total_score,
        penalty: Duration::ZERO,
        last_accepted,
        problem_results,
    }
}
