use scorecast_common::models::PenaltyRoundingMode;
use scorecast_common::utils::time::{ceil_minutes, floor_minutes};
use std::time::Duration;

/// Accumulates the penalty of a team one solved problem at a time.
pub struct PenaltyCalculator {
    mode: PenaltyRoundingMode,
    per_wrong_attempt: Duration,
    total: Duration,
    last_solve: Duration,
    wrong_attempts: u32,
}

impl PenaltyCalculator {
    pub fn new(mode: PenaltyRoundingMode, per_wrong_attempt: Duration) -> Self {
        Self {
            mode,
            per_wrong_attempt,
            total: Duration::ZERO,
            last_solve: Duration::ZERO,
            wrong_attempts: 0,
        }
    }

    pub fn add_solved_problem(&mut self, time: Duration, wrong_attempts: u32) {
        let wrong = self.per_wrong_attempt * wrong_attempts;
        match self.mode {
            PenaltyRoundingMode::EachSubmissionDownToMinute => {
                self.total += floor_minutes(time) + wrong;
            }
            PenaltyRoundingMode::EachSubmissionUpToMinute => {
                self.total += ceil_minutes(time) + wrong;
            }
            PenaltyRoundingMode::SumDownToMinute | PenaltyRoundingMode::SumInSeconds => {
                self.total += time + wrong;
            }
            PenaltyRoundingMode::Last => {
                self.last_solve = self.last_solve.max(time);
                self.wrong_attempts += wrong_attempts;
            }
            PenaltyRoundingMode::Zero => {}
        }
    }

    pub fn penalty(&self) -> Duration {
        match self.mode {
            PenaltyRoundingMode::EachSubmissionDownToMinute
            | PenaltyRoundingMode::EachSubmissionUpToMinute => self.total,
            PenaltyRoundingMode::SumDownToMinute => floor_minutes(self.total),
            PenaltyRoundingMode::SumInSeconds => Duration::from_secs(self.total.as_secs()),
            PenaltyRoundingMode::Last => {
                self.last_solve + self.per_wrong_attempt * self.wrong_attempts
            }
            PenaltyRoundingMode::Zero => Duration::ZERO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWENTY_MINUTES: Duration = Duration::from_secs(20 * 60);

    fn penalty_minutes(mode: PenaltyRoundingMode, solves: &[(u64, u32)]) -> f64 {
        let mut calculator = PenaltyCalculator::new(mode, TWENTY_MINUTES);
        for (secs, wrong) in solves {
            calculator.add_solved_problem(Duration::from_secs(*secs), *wrong);
        }
        calculator.penalty().as_secs_f64() / 60.0
    }

    #[test]
    fn should_round_single_solve_with_wrong_attempt() {
        let solves = [(62, 1)];
        assert_eq!(
            penalty_minutes(PenaltyRoundingMode::EachSubmissionDownToMinute, &solves),
            21.0
        );
        assert_eq!(penalty_minutes(PenaltyRoundingMode::SumDownToMinute, &solves), 21.0);
        assert_eq!(
            penalty_minutes(PenaltyRoundingMode::EachSubmissionUpToMinute, &solves),
            22.0
        );
    }

    #[test]
    fn should_round_each_solve_or_the_sum() {
        let solves = [(90, 0), (90, 0)];
        assert_eq!(
            penalty_minutes(PenaltyRoundingMode::EachSubmissionDownToMinute, &solves),
            2.0
        );
        assert_eq!(penalty_minutes(PenaltyRoundingMode::SumDownToMinute, &solves), 3.0);
        assert_eq!(
            penalty_minutes(PenaltyRoundingMode::EachSubmissionUpToMinute, &solves),
            4.0
        );
    }

    #[test]
    fn should_keep_seconds_in_sum_in_seconds() {
        let mut calculator =
            PenaltyCalculator::new(PenaltyRoundingMode::SumInSeconds, TWENTY_MINUTES);
        calculator.add_solved_problem(Duration::from_millis(61_700), 0);
        calculator.add_solved_problem(Duration::from_millis(30_600), 1);
        assert_eq!(calculator.penalty(), Duration::from_secs(20 * 60 + 92));
    }

    #[test]
    fn should_use_latest_solve_in_last_mode() {
        let solves = [(600, 1), (300, 2)];
        assert_eq!(penalty_minutes(PenaltyRoundingMode::Last, &solves), 70.0);
        assert_eq!(penalty_minutes(PenaltyRoundingMode::Zero, &solves), 0.0);
    }
}
