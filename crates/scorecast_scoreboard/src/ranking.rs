use crate::calculator::compare_rows;
use scorecast_common::models::{ContestInfo, ContestResultType, ScoreboardRow, TeamId, TeamInfo};
use std::cmp::Ordering;
use std::collections::BTreeMap;

pub struct Ranking {
    pub order: Vec<TeamId>,
    /// Parallel to `order`, zero for teams which are out of contest.
    pub ranks: Vec<u32>,
}

/// Splits `items` into runs of consecutive elements which compare equal.
pub(crate) fn tied_groups<T>(
    items: &[T],
    mut compare: impl FnMut(&T, &T) -> Ordering,
) -> Vec<&[T]> {
    let mut groups = Vec::new();
    let mut start = 0;
    for end in 1..=items.len() {
        if end == items.len() || compare(&items[start], &items[end]) != Ordering::Equal {
            groups.push(&items[start..end]);
            start = end;
        }
    }
    groups
}

/// Orders the visible teams and assigns competition ranks. Ties share the rank and the next
/// rank skips the tied positions. Out of contest teams are placed by their row but do not
/// take a rank.
pub fn rank(info: &ContestInfo, rows: &BTreeMap<TeamId, ScoreboardRow>) -> Ranking {
    let mut entries: Vec<(&TeamInfo, &ScoreboardRow)> = info
        .teams
        .iter()
        .filter_map(|team| rows.get(&team.id).map(|row| (team, row)))
        .collect();
    entries.sort_by(|(team_a, row_a), (team_b, row_b)| {
        compare_rows(info.result_type, row_a, row_b)
            .then_with(|| team_a.display_name.cmp(&team_b.display_name))
            .then_with(|| team_a.id.cmp(&team_b.id))
    });

    let mut ranks = Vec::with_capacity(entries.len());
    let mut ranked_before = 0;
    for group in tied_groups(&entries, |a, b| compare_rows(info.result_type, a.1, b.1)) {
        let group_rank = ranked_before + 1;
        for (team, _) in group {
            if info.is_team_out_of_contest(team) {
                ranks.push(0);
            } else {
                ranks.push(group_rank);
                ranked_before += 1;
            }
        }
    }

    Ranking {
        order: entries.iter().map(|(team, _)| team.id.clone()).collect(),
        ranks,
    }
}

/// Whether `a` and `b` are ranked equally.
pub fn is_tied(result_type: ContestResultType, a: &ScoreboardRow, b: &ScoreboardRow) -> bool {
    compare_rows(result_type, a, b) == Ordering::Equal
}
