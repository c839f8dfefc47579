use super::TeamRuns;
use crate::penalty::PenaltyCalculator;
use scorecast_common::models::{
    ContestInfo, OptimismLevel, ProblemResult, RunInfo, RunResult, ScoreboardRow,
};
use std::time::Duration;

/// How a run counts for the standings. Optimistic and pessimistic levels decide the fate of
/// runs which are still being judged, `index` and `count` locate the run among the team's
/// runs on the same problem.
struct Predicates(OptimismLevel);

impl Predicates {
    fn is_last(index: usize, count: usize) -> bool {
        index + 1 == count
    }

    fn is_accepted(&self, run: &RunInfo, index: usize, count: usize) -> bool {
        match self.0 {
            OptimismLevel::Normal | OptimismLevel::Pessimistic => run.is_accepted(),
            OptimismLevel::Optimistic => {
                run.is_accepted() || (!run.is_judged() && Self::is_last(index, count))
            }
        }
    }

    fn is_pending(&self, run: &RunInfo) -> bool {
        match self.0 {
            OptimismLevel::Normal => !run.is_judged(),
            OptimismLevel::Optimistic | OptimismLevel::Pessimistic => false,
        }
    }

    fn is_adding_penalty(&self, run: &RunInfo, index: usize, count: usize) -> bool {
        match self.0 {
            OptimismLevel::Normal => run.is_judged() && adds_penalty(run),
            OptimismLevel::Pessimistic => !run.is_judged() || adds_penalty(run),
            OptimismLevel::Optimistic => {
                adds_penalty(run) || (!run.is_judged() && !Self::is_last(index, count))
            }
        }
    }
}

fn adds_penalty(run: &RunInfo) -> bool {
    match &run.result {
        RunResult::Icpc { verdict, .. } => verdict.is_adding_penalty(),
        _ => false,
    }
}

pub fn icpc_row(info: &ContestInfo, runs: &TeamRuns<'_>, level: OptimismLevel) -> ScoreboardRow {
    let predicates = Predicates(level);
    let mut penalty =
        PenaltyCalculator::new(info.penalty_rounding_mode, info.penalty_per_wrong_attempt);
    let mut solved = 0.0;
    let mut last_accepted = Duration::ZERO;

    let problem_results = info
        .scoreboard_problems()
        .into_iter()
        .map(|problem| {
            let problem_runs = runs.get(&problem.id).map(Vec::as_slice).unwrap_or_default();
            let count = problem_runs.len();
            let accepted_at = problem_runs
                .iter()
                .enumerate()
                .position(|(index, run)| predicates.is_accepted(run, index, count));
            let before_accepted = &problem_runs[..accepted_at.unwrap_or(count)];
            let accepted_run = accepted_at.map(|index| problem_runs[index]);

            let wrong_attempts = before_accepted
                .iter()
                .enumerate()
                .filter(|(index, run)| predicates.is_adding_penalty(run, *index, count))
                .count() as u32;
            let pending_attempts = before_accepted
                .iter()
                .filter(|run| predicates.is_pending(run))
                .count() as u32;

            if let Some(run) = accepted_run {
                solved += f64::from(problem.weight);
                penalty.add_solved_problem(run.time, wrong_attempts);
                last_accepted = last_accepted.max(run.time);
            }

            ProblemResult::Icpc {
                wrong_attempts,
                pending_attempts,
                is_solved: accepted_run.is_some(),
                is_first_to_solve: accepted_run.is_some_and(RunInfo::is_first_to_solve),
                last_submit_time: accepted_run
                    .or_else(|| before_accepted.last().copied())
                    .map(|run| run.time),
            }
        })
        .collect();

    ScoreboardRow {
        total_score: solved,
        penalty: penalty.penalty(),
        last_accepted,
        problem_results,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculator::calculate_rows;
    use crate::calculator::tests::{contest, pending, run, runs, verdict};
    use scorecast_common::models::{TeamId, Verdict};

    fn problem(row: &ScoreboardRow, index: usize) -> (u32, u32, bool) {
        match &row.problem_results[index] {
            ProblemResult::Icpc {
                wrong_attempts,
                pending_attempts,
                is_solved,
                ..
            } => (*wrong_attempts, *pending_attempts, *is_solved),
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[test]
    fn should_count_attempts_before_first_accepted_run_only() {
        let info = contest(&["t1"]);
        let runs = runs(vec![
            run("r1", "t1", "A", 10, verdict(Verdict::WrongAnswer)),
            run("r2", "t1", "A", 12, verdict(Verdict::CompilationError)),
            run("r3", "t1", "A", 15, verdict(Verdict::Accepted)),
            run("r4", "t1", "A", 20, verdict(Verdict::WrongAnswer)),
            run("r5", "t1", "B", 30, verdict(Verdict::TimeLimitExceeded)),
        ]);
        let rows = calculate_rows(&info, &runs, OptimismLevel::Normal);
        let row = &rows[&TeamId::from("t1")];

        assert_eq!(row.total_score, 1.0);
        assert_eq!(row.penalty, Duration::from_secs(35 * 60));
        assert_eq!(row.last_accepted, Duration::from_secs(15 * 60));
        assert_eq!(problem(row, 0), (1, 0, true));
        assert_eq!(problem(row, 1), (1, 0, false));
    }

    #[test]
    fn should_treat_pending_runs_by_optimism_level() {
        let info = contest(&["t1"]);
        let runs = runs(vec![
            run("r1", "t1", "A", 10, pending()),
            run("r2", "t1", "A", 11, pending()),
            run("r3", "t1", "B", 5, verdict(Verdict::Accepted)),
        ]);
        let team = TeamId::from("t1");

        let normal = &calculate_rows(&info, &runs, OptimismLevel::Normal)[&team];
        assert_eq!(normal.total_score, 1.0);
        assert_eq!(problem(normal, 0), (0, 2, false));

        let pessimistic = &calculate_rows(&info, &runs, OptimismLevel::Pessimistic)[&team];
        assert_eq!(pessimistic.total_score, 1.0);
        assert_eq!(problem(pessimistic, 0), (2, 0, false));

        let optimistic = &calculate_rows(&info, &runs, OptimismLevel::Optimistic)[&team];
        assert_eq!(optimistic.total_score, 2.0);
        assert_eq!(problem(optimistic, 0), (1, 0, true));
        assert_eq!(optimistic.penalty, Duration::from_secs((5 + 11 + 20) * 60));
    }

    #[test]
    fn should_keep_scores_ordered_by_optimism() {
        let info = contest(&["t1", "t2", "t3"]);
        let runs = runs(vec![
            run("r1", "t1", "A", 10, pending()),
            run("r2", "t1", "B", 11, verdict(Verdict::WrongAnswer)),
            run("r3", "t2", "A", 12, verdict(Verdict::Accepted)),
            run("r4", "t2", "B", 13, pending()),
            run("r5", "t2", "B", 14, verdict(Verdict::Accepted)),
            run("r6", "t3", "B", 15, verdict(Verdict::Rejected)),
            run("r7", "t3", "B", 16, pending()),
        ]);
        let pessimistic = calculate_rows(&info, &runs, OptimismLevel::Pessimistic);
        let normal = calculate_rows(&info, &runs, OptimismLevel::Normal);
        let optimistic = calculate_rows(&info, &runs, OptimismLevel::Optimistic);

        for team in normal.keys() {
            assert!(pessimistic[team].total_score <= normal[team].total_score);
            assert!(normal[team].total_score <= optimistic[team].total_score);
        }
    }

    #[test]
    fn should_ignore_hidden_runs_and_problems() {
        let mut info = contest(&["t1"]);
        info.problems[1].is_hidden = true;
        let mut hidden = run("r2", "t1", "A", 3, verdict(Verdict::WrongAnswer));
        hidden.is_hidden = true;
        let runs = runs(vec![
            hidden,
            run("r1", "t1", "A", 5, verdict(Verdict::Accepted)),
            run("r3", "t1", "B", 1, verdict(Verdict::Accepted)),
        ]);
        let row = &calculate_rows(&info, &runs, OptimismLevel::Normal)[&TeamId::from("t1")];

        assert_eq!(row.problem_results.len(), 1);
        assert_eq!(row.total_score, 1.0);
        assert_eq!(row.penalty, Duration::from_secs(5 * 60));
    }

    #[test]
    fn should_mark_first_to_solve_and_weight() {
        let mut info = contest(&["t1"]);
        info.problems[0].weight = 3;
        let runs = runs(vec![run(
            "r1",
            "t1",
            "A",
            1,
            RunResult::Icpc {
                verdict: Verdict::Accepted,
                is_first_to_solve_run: true,
            },
        )]);
        let row = &calculate_rows(&info, &runs, OptimismLevel::Normal)[&TeamId::from("t1")];
        assert_eq!(row.total_score, 3.0);
        assert!(matches!(
            row.problem_results[0],
            ProblemResult::Icpc {
                is_first_to_solve: true,
                ..
            }
        ));
    }
}
