use super::TuningRule;
use scorecast_common::models::{AwardChain, AwardTiebreakMode, GroupId, RankBasedAward};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Medal counts. The medals are cumulative: silver goes to the `silver` places after gold.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MedalSettings {
    pub gold: u32,
    pub silver: u32,
    pub bronze: u32,
    pub min_score: Option<f64>,
    pub tiebreak_mode: AwardTiebreakMode,
}

/// Shortcut for the commonly used award chains.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AddKnownAwards {
    pub medals: Option<MedalSettings>,
    pub champion_title: Option<String>,
    pub groups_champion_titles: Option<BTreeMap<GroupId, String>>,
    pub rank_awards_max_rank: Option<u32>,
}

impl AddKnownAwards {
    pub fn medals(medals: MedalSettings) -> Self {
        Self {
            medals: Some(medals),
            ..Self::default()
        }
    }

    pub(crate) fn desugar(&self) -> Vec<TuningRule> {
        let mut chains = Vec::new();

        if let Some(medals) = &self.medals {
            let medal = |id: &str, citation: &str, max_rank: u32| RankBasedAward {
                id: id.to_string(),
                citation: citation.to_string(),
                max_rank: Some(max_rank),
                min_score: medals.min_score,
                tiebreak_mode: medals.tiebreak_mode,
            };
            let gold = medals.gold;
            let silver = gold + medals.silver;
            let bronze = silver + medals.bronze;
            let awards = [
                (medals.gold > 0).then(|| medal("gold-medal", "Gold Medal", gold)),
                (medals.silver > 0).then(|| medal("silver-medal", "Silver Medal", silver)),
                (medals.bronze > 0).then(|| medal("bronze-medal", "Bronze Medal", bronze)),
            ];
            chains.push(chain(awards.into_iter().flatten().collect(), vec![]));
        }

        if let Some(title) = &self.champion_title {
            chains.push(chain(vec![RankBasedAward::new("winner", title, 1)], vec![]));
        }

        for (group, title) in self.groups_champion_titles.iter().flatten() {
            chains.push(chain(
                vec![RankBasedAward::new(
                    format!("group-winner-{group}"),
                    title,
                    1,
                )],
                vec![group.clone()],
            ));
        }

        if let Some(max_rank) = self.rank_awards_max_rank {
            let awards = (1..=max_rank)
                .map(|rank| {
                    RankBasedAward::new(
                        format!("rank-{rank}"),
                        format!("{} place", ordinal_text(rank)),
                        rank,
                    )
                })
                .collect();
            chains.push(chain(awards, vec![]));
        }

        chains.into_iter().map(TuningRule::AddAwardChain).collect()
    }
}

fn chain(awards: Vec<RankBasedAward>, groups: Vec<GroupId>) -> AwardChain {
    AwardChain {
        awards,
        groups,
        excluded_groups: vec![],
        organization_limit: None,
    }
}

/// `1-st`, `2-nd`, `11-th`, `23-rd`, ...
pub fn ordinal_text(value: u32) -> String {
    let suffix = match (value % 100, value % 10) {
        (11..=13, _) => "th",
        (_, 1) => "st",
        (_, 2) => "nd",
        (_, 3) => "rd",
        _ => "th",
    };
    format!("{value}-{suffix}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::apply;
    use crate::rules::tests::{contest, parse};
    use std::collections::BTreeSet;

    #[test]
    fn should_format_ordinals() {
        assert_eq!(ordinal_text(1), "1-st");
        assert_eq!(ordinal_text(2), "2-nd");
        assert_eq!(ordinal_text(3), "3-rd");
        assert_eq!(ordinal_text(4), "4-th");
        assert_eq!(ordinal_text(11), "11-th");
        assert_eq!(ordinal_text(12), "12-th");
        assert_eq!(ordinal_text(13), "13-th");
        assert_eq!(ordinal_text(21), "21-st");
        assert_eq!(ordinal_text(23), "23-rd");
        assert_eq!(ordinal_text(111), "111-th");
    }

    #[test]
    fn should_add_cumulative_medals() {
        let rules = parse(
            r#"[{"type": "addMedals", "gold": 4, "silver": 0, "bronze": 4, "tiebreakMode": "NONE", "minScore": 1}]"#,
        );
        let info = apply(&rules, contest(), &BTreeSet::new());

        let chain = &info.awards.chains[0];
        let awards: Vec<(&str, Option<u32>)> = chain
            .awards
            .iter()
            .map(|award| (award.id.as_str(), award.max_rank))
            .collect();
        assert_eq!(awards, vec![("gold-medal", Some(4)), ("bronze-medal", Some(8))]);
        assert!(chain
            .awards
            .iter()
            .all(|award| award.tiebreak_mode == AwardTiebreakMode::None
                && award.min_score == Some(1.0)));
    }

    #[test]
    fn should_add_known_awards() {
        let rules = parse(
            r#"[{"type": "addKnownAwards",
                 "championTitle": "Champions",
                 "groupsChampionTitles": {"school": "Best school team"},
                 "rankAwardsMaxRank": 3}]"#,
        );
        let info = apply(&rules, contest(), &BTreeSet::new());
        let chains = &info.awards.chains;

        assert_eq!(chains.len(), 3);
        assert_eq!(chains[0].awards[0].id, "winner");
        assert_eq!(chains[0].awards[0].citation, "Champions");
        assert_eq!(chains[1].awards[0].id, "group-winner-school");
        assert_eq!(chains[1].groups, vec![GroupId::from("school")]);
        let citations: Vec<&str> = chains[2]
            .awards
            .iter()
            .map(|award| award.citation.as_str())
            .collect();
        assert_eq!(citations, vec!["1-st place", "2-nd place", "3-rd place"]);
    }

    #[test]
    fn should_add_manual_award() {
        let rules = parse(
            r#"[{"type": "addManualAward", "id": "best-dressed", "citation": "Best dressed", "teams": ["t1"]}]"#,
        );
        let info = apply(&rules, contest(), &BTreeSet::new());
        assert_eq!(info.awards.manual[0].id, "best-dressed");
    }
}
