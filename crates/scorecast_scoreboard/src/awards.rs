use crate::calculator::compare_rows;
use crate::ranking::{tied_groups, Ranking};
use scorecast_common::models::{
    Award, AwardChain, AwardTiebreakMode, ContestInfo, OrganizationId, RankBasedAward,
    ScoreboardRow, TeamId, TeamInfo,
};
use std::collections::{BTreeMap, BTreeSet};

/// Teams ranked in contest which pass the chain filters, in standings order.
fn eligible_teams<'a>(
    info: &'a ContestInfo,
    chain: &AwardChain,
    ranking: &'a Ranking,
) -> Vec<&'a TeamInfo> {
    let mut per_organization: BTreeMap<OrganizationId, usize> = BTreeMap::new();
    ranking
        .order
        .iter()
        .zip(&ranking.ranks)
        .filter(|(_, rank)| **rank > 0)
        .filter_map(|(team, _)| info.team(team))
        .filter(|team| {
            chain.groups.is_empty() || team.groups.iter().any(|group| chain.groups.contains(group))
        })
        .filter(|team| {
            !team
                .groups
                .iter()
                .any(|group| chain.excluded_groups.contains(group))
        })
        .filter(|team| {
            let (Some(limit), Some(organization)) =
                (chain.organization_limit, team.organization_id.as_ref())
            else {
                return true;
            };
            let count = per_organization.entry(organization.clone()).or_default();
            *count += 1;
            *count <= limit
        })
        .collect()
}

fn qualifies(award: &RankBasedAward, row: &ScoreboardRow) -> bool {
    match award.min_score {
        Some(min_score) => row.total_score >= min_score,
        None => row.total_score > 0.0,
    }
}

/// Walks the tied groups of eligible teams from the top. Every award takes whole groups
/// starting at the current position until its rank limit is reached, so a team receives at
/// most one award of the chain.
fn assign_chain(
    info: &ContestInfo,
    chain: &AwardChain,
    ranking: &Ranking,
    rows: &BTreeMap<TeamId, ScoreboardRow>,
) -> Vec<Award> {
    let eligible: Vec<(&TeamInfo, &ScoreboardRow)> = eligible_teams(info, chain, ranking)
        .into_iter()
        .filter_map(|team| rows.get(&team.id).map(|row| (team, row)))
        .collect();
    let groups = tied_groups(&eligible, |a, b| compare_rows(info.result_type, a.1, b.1));

    let mut next_group = groups.iter().peekable();
    let mut position = 1;
    chain
        .awards
        .iter()
        .map(|award| {
            let rank_limit = award.max_rank.unwrap_or(position);
            let mut teams = BTreeSet::new();
            while let Some(group) = next_group.peek() {
                let size = group.len() as u32;
                if position > rank_limit || !qualifies(award, group[0].1) {
                    break;
                }
                if award.tiebreak_mode == AwardTiebreakMode::None
                    && position + size - 1 > rank_limit
                {
                    break;
                }
                teams.extend(group.iter().map(|(team, _)| team.id.clone()));
                position += size;
                next_group.next();
            }
            Award {
                id: award.id.clone(),
                citation: award.citation.clone(),
                teams,
            }
        })
        .collect()
}

pub fn assign(
    info: &ContestInfo,
    ranking: &Ranking,
    rows: &BTreeMap<TeamId, ScoreboardRow>,
) -> Vec<Award> {
    let mut awards: Vec<Award> = info
        .awards
        .chains
        .iter()
        .flat_map(|chain| assign_chain(info, chain, ranking, rows))
        .collect();
    awards.extend(info.awards.manual.iter().map(|award| Award {
        id: award.id.clone(),
        citation: award.citation.clone(),
        teams: award.teams.iter().cloned().collect(),
    }));
    awards
}
