use super::{LanguageId, Media, ProblemId, RunId, TeamId};
use crate::utils::serde::duration_ms;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// The current state of a single submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunInfo {
    pub id: RunId,
    pub result: RunResult,
    pub problem_id: ProblemId,
    pub team_id: TeamId,
    /// Submission time relative to the contest start
    #[serde(with = "duration_ms")]
    pub time: Duration,
    #[serde(default)]
    pub language_id: Option<LanguageId>,
    #[serde(default)]
    pub featured_run_media: Option<Media>,
    #[serde(default)]
    pub is_hidden: bool,
}

impl RunInfo {
    pub fn is_judged(&self) -> bool {
        !matches!(self.result, RunResult::InProgress { .. })
    }

    pub fn is_accepted(&self) -> bool {
        match &self.result {
            RunResult::Icpc { verdict, .. } => verdict.is_accepted(),
            RunResult::Ioi { wrong_verdict, .. } => wrong_verdict.is_none(),
            RunResult::InProgress { .. } => false,
        }
    }

    /// First to solve for ICPC, first best run for IOI.
    pub fn is_first_to_solve(&self) -> bool {
        match &self.result {
            RunResult::Icpc {
                is_first_to_solve_run,
                ..
            } => *is_first_to_solve_run,
            RunResult::Ioi {
                is_first_best_run, ..
            } => *is_first_best_run,
            RunResult::InProgress { .. } => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum RunResult {
    InProgress {
        #[serde(default)]
        tested_part: f64,
    },
    Icpc {
        verdict: Verdict,
        #[serde(default)]
        is_first_to_solve_run: bool,
    },
    Ioi {
        /// Score per test group
        score: Vec<f64>,
        #[serde(default)]
        wrong_verdict: Option<Verdict>,
        #[serde(default)]
        difference: f64,
        #[serde(default)]
        score_after: f64,
        #[serde(default)]
        is_first_best_run: bool,
        #[serde(default)]
        is_first_best_team_run: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Verdict {
    #[serde(rename = "AC")]
    Accepted,
    #[serde(rename = "RJ")]
    Rejected,
    #[serde(rename = "FL")]
    Fail,
    #[serde(rename = "CE")]
    CompilationError,
    #[serde(rename = "CE+")]
    CompilationErrorWithPenalty,
    #[serde(rename = "PE")]
    PresentationError,
    #[serde(rename = "RE")]
    RuntimeError,
    #[serde(rename = "TL")]
    TimeLimitExceeded,
    #[serde(rename = "ML")]
    MemoryLimitExceeded,
    #[serde(rename = "OL")]
    OutputLimitExceeded,
    #[serde(rename = "IL")]
    IdlenessLimitExceeded,
    #[serde(rename = "SV")]
    SecurityViolation,
    #[serde(rename = "CH")]
    Challenged,
    #[serde(rename = "WA")]
    WrongAnswer,
    #[serde(rename = "IG")]
    Ignored,
}

impl Verdict {
    pub fn short_name(&self) -> &'static str {
        match self {
            Verdict::Accepted => "AC",
            Verdict::Rejected => "RJ",
            Verdict::Fail => "FL",
            Verdict::CompilationError | Verdict::CompilationErrorWithPenalty => "CE",
            Verdict::PresentationError => "PE",
            Verdict::RuntimeError => "RE",
            Verdict::TimeLimitExceeded => "TL",
            Verdict::MemoryLimitExceeded => "ML",
            Verdict::OutputLimitExceeded => "OL",
            Verdict::IdlenessLimitExceeded => "IL",
            Verdict::SecurityViolation => "SV",
            Verdict::Challenged => "CH",
            Verdict::WrongAnswer => "WA",
            Verdict::Ignored => "IG",
        }
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self, Verdict::Accepted | Verdict::Fail)
    }

    pub fn is_adding_penalty(&self) -> bool {
        !matches!(
            self,
            Verdict::Accepted | Verdict::Fail | Verdict::CompilationError | Verdict::Ignored
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_not_add_penalty_for_compilation_error() {
        assert!(!Verdict::CompilationError.is_adding_penalty());
        assert!(Verdict::CompilationErrorWithPenalty.is_adding_penalty());
        assert_eq!(Verdict::CompilationErrorWithPenalty.short_name(), "CE");
    }

    #[test]
    fn should_deserialize_icpc_run() {
        const RUN_JSON: &str = r#"{"id":"r1","result":{"type":"icpc","verdict":"WA"},"problemId":"A","teamId":"t1","time":62000}"#;

        let run: RunInfo = serde_json::from_str(RUN_JSON).unwrap();
        assert_eq!(run.time, Duration::from_secs(62));
        assert!(run.is_judged());
        assert!(!run.is_accepted());
        assert!(!run.is_first_to_solve());
    }

    #[test]
    fn should_treat_in_progress_run_as_unjudged() {
        const RUN_JSON: &str = r#"{"id":"r2","result":{"type":"inProgress","testedPart":0.5},"problemId":"A","teamId":"t1","time":1000}"#;

        let run: RunInfo = serde_json::from_str(RUN_JSON).unwrap();
        assert!(!run.is_judged());
    }
}
