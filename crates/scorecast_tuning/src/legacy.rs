// SPDX-License-Identifier: AGPL-3.0-only
// Copyright Authors of scorecast

//! The legacy advanced properties format and its conversion into a rule list.
use crate::regexes::RegexParser;
use crate::rules::{
    AddKnownAwards, GroupOverride, MedalSettings, OrganizationOverride, OverrideContestSettings,
    OverrideGroups, OverrideOrganizations, OverrideProblems, OverrideQueue,
    OverrideScoreboardSettings, OverrideTeamTemplate, OverrideTeams, ProblemOverride,
    TeamOverride, TuningRule,
};
use crate::time_format;
use chrono::{DateTime, Utc};
use scorecast_common::models::{
    AwardChain, GroupId, ManualAward, Media, OrganizationId, PenaltyRoundingMode, ProblemId,
    TeamId, TeamMediaType,
};
use scorecast_common::utils::serde::{option_duration_minutes, option_duration_secs, OrderedMap};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct AdvancedProperties {
    pub contest_name: Option<String>,
    #[serde(with = "time_format")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(rename = "contestLengthSeconds", with = "option_duration_secs")]
    pub contest_length: Option<Duration>,
    #[serde(rename = "freezeTimeSeconds", with = "option_duration_secs")]
    pub freeze_time: Option<Duration>,
    #[serde(rename = "holdTimeSeconds", with = "option_duration_secs")]
    pub hold_time: Option<Duration>,
    pub scoreboard_overrides: Option<ScoreboardOverrides>,
    pub team_name_regexes: Option<TeamRegexOverrides>,
    pub team_id_regexes: Option<TeamRegexOverrides>,
    pub group_overrides: Option<BTreeMap<GroupId, GroupOverride>>,
    pub organization_overrides: Option<BTreeMap<OrganizationId, OrganizationOverride>>,
    pub team_override_template: Option<TeamOverrideTemplate>,
    pub team_overrides: Option<BTreeMap<TeamId, TeamOverride>>,
    pub problem_overrides: Option<BTreeMap<ProblemId, ProblemOverride>>,
    pub awards_settings: Option<AwardsOverrides>,
    pub queue_settings: Option<OverrideQueue>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScoreboardOverrides {
    /// In minutes
    #[serde(with = "option_duration_minutes")]
    pub penalty_per_wrong_attempt: Option<Duration>,
    pub show_teams_without_submissions: Option<bool>,
    pub penalty_rounding_mode: Option<PenaltyRoundingMode>,
}

/// Values extracted from a team string by mutually exclusive regexes.
pub type RegexSet = OrderedMap<String>;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TeamRegexOverrides {
    /// The replacement of the only matching regex becomes the organization id
    pub organization_regex: Option<RegexSet>,
    /// Group id to regex. The group of the first matching regex is added to the team.
    pub group_regex: Option<OrderedMap<String>>,
    pub custom_fields: Option<OrderedMap<RegexSet>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TeamOverrideTemplate {
    pub display_name: Option<String>,
    pub full_name: Option<String>,
    pub hash_tag: Option<String>,
    pub medias: Option<BTreeMap<TeamMediaType, Option<Media>>>,
    pub color: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AwardsOverrides {
    pub champion_title: Option<String>,
    pub groups_champion_titles: BTreeMap<GroupId, String>,
    pub rank_awards_max_rank: u32,
    pub medals: Option<MedalSettings>,
    pub medal_groups: Vec<AwardChain>,
    pub manual: Vec<ManualAward>,
}

/// Rewrites the token names of the legacy format to the current ones.
fn rewrite_tokens(template: &str) -> String {
    template
        .replace("{teamId}", "{team.id}")
        .replace("{orgDisplayName}", "{org.displayName}")
        .replace("{orgFullName}", "{org.fullName}")
}

fn one_rule(pattern: &str, key: &str, value: &str) -> (String, OrderedMap<String>) {
    (
        pattern.to_string(),
        OrderedMap(vec![(key.to_string(), value.to_string())]),
    )
}

impl TeamRegexOverrides {
    fn to_template(&self, from: &str) -> Option<OverrideTeamTemplate> {
        if self.organization_regex.is_none()
            && self.group_regex.is_none()
            && self.custom_fields.is_none()
        {
            return None;
        }
        let mut regexes = Vec::new();

        if let Some(set) = &self.organization_regex {
            let rules = set
                .iter()
                .map(|(pattern, replacement)| one_rule(pattern, "id", replacement))
                .collect();
            regexes.push((
                "org".to_string(),
                RegexParser {
                    from: from.to_string(),
                    rules,
                    exclusive: true,
                },
            ));
        }
        if let Some(groups) = &self.group_regex {
            let rules = groups
                .iter()
                .map(|(group, pattern)| one_rule(pattern, "id", group))
                .collect();
            regexes.push((
                "group".to_string(),
                RegexParser {
                    from: from.to_string(),
                    rules,
                    exclusive: false,
                },
            ));
        }
        let mut custom_fields = BTreeMap::new();
        for (field, set) in self.custom_fields.iter().flat_map(OrderedMap::iter) {
            let block = format!("custom-{field}");
            let rules = set
                .iter()
                .map(|(pattern, replacement)| one_rule(pattern, "value", replacement))
                .collect();
            custom_fields.insert(field.clone(), format!("{{regexes.{block}.value}}"));
            regexes.push((
                block,
                RegexParser {
                    from: from.to_string(),
                    rules,
                    exclusive: true,
                },
            ));
        }

        Some(OverrideTeamTemplate {
            regexes: OrderedMap(regexes),
            organization_id: self
                .organization_regex
                .as_ref()
                .map(|_| "{regexes.org.id}".to_string()),
            extra_groups: self
                .group_regex
                .as_ref()
                .map(|_| vec!["{regexes.group.id}".to_string()]),
            custom_fields: self.custom_fields.as_ref().map(|_| custom_fields),
            ..OverrideTeamTemplate::default()
        })
    }
}

impl AdvancedProperties {
    /// Converts the properties into rules, in the documented precedence order.
    pub fn into_rules(self) -> Vec<TuningRule> {
        let mut rules = Vec::new();

        let contest_settings = OverrideContestSettings {
            name: self.contest_name,
            start_time: self.start_time,
            contest_length: self.contest_length,
            freeze_time: self.freeze_time,
            hold_time: self.hold_time,
            custom_fields: None,
        };
        if !contest_settings.is_empty() {
            rules.push(TuningRule::OverrideContestSettings(contest_settings));
        }

        if let Some(scoreboard) = self.scoreboard_overrides {
            let settings = OverrideScoreboardSettings {
                penalty_per_wrong_attempt: scoreboard.penalty_per_wrong_attempt,
                show_teams_without_submissions: scoreboard.show_teams_without_submissions,
                penalty_rounding_mode: scoreboard.penalty_rounding_mode,
            };
            if !settings.is_empty() {
                rules.push(TuningRule::OverrideScoreboardSettings(settings));
            }
        }

        for (regexes, from) in [
            (&self.team_name_regexes, "{team.fullName}"),
            (&self.team_id_regexes, "{team.id}"),
        ] {
            if let Some(template) = regexes.as_ref().and_then(|r| r.to_template(from)) {
                rules.push(TuningRule::OverrideTeamTemplate(template));
            }
        }

        if let Some(groups) = self.group_overrides {
            if groups.values().any(|group| !group.is_empty()) {
                rules.push(TuningRule::OverrideGroups(OverrideGroups { rules: groups }));
            }
        }
        if let Some(organizations) = self.organization_overrides {
            if organizations.values().any(|org| {
                org.display_name.is_some() || org.full_name.is_some() || org.logo.is_some()
            }) {
                rules.push(TuningRule::OverrideOrganizations(OverrideOrganizations {
                    rules: organizations,
                }));
            }
        }

        // Custom fields go first so that the template can reference them
        if let Some(teams) = &self.team_overrides {
            let custom_fields: BTreeMap<TeamId, TeamOverride> = teams
                .iter()
                .filter_map(|(id, team)| {
                    team.custom_fields.as_ref().map(|fields| {
                        let custom_only = TeamOverride {
                            custom_fields: Some(fields.clone()),
                            ..TeamOverride::default()
                        };
                        (id.clone(), custom_only)
                    })
                })
                .collect();
            if !custom_fields.is_empty() {
                rules.push(TuningRule::OverrideTeams(OverrideTeams {
                    rules: custom_fields,
                }));
            }
        }

        if let Some(template) = self.team_override_template {
            let rewrite = |value: String| rewrite_tokens(&value);
            rules.push(TuningRule::OverrideTeamTemplate(OverrideTeamTemplate {
                display_name: template.display_name.map(rewrite),
                full_name: template.full_name.map(rewrite),
                hash_tag: template.hash_tag.map(rewrite),
                color: template.color.map(rewrite),
                medias: template.medias.map(|medias| {
                    medias
                        .into_iter()
                        .map(|(media_type, media)| {
                            (media_type, media.map(|media| media.map_url(rewrite_tokens)))
                        })
                        .collect()
                }),
                ..OverrideTeamTemplate::default()
            }));
        }

        if let Some(teams) = self.team_overrides {
            rules.push(TuningRule::OverrideTeams(OverrideTeams { rules: teams }));
        }

        if let Some(problems) = self.problem_overrides {
            rules.push(TuningRule::OverrideProblems(OverrideProblems { rules: problems }));
        }

        if let Some(awards) = self.awards_settings {
            let known = AddKnownAwards {
                medals: awards.medals,
                champion_title: awards.champion_title,
                groups_champion_titles: (!awards.groups_champion_titles.is_empty())
                    .then_some(awards.groups_champion_titles),
                rank_awards_max_rank: (awards.rank_awards_max_rank != 0)
                    .then_some(awards.rank_awards_max_rank),
            };
            if known != AddKnownAwards::default() {
                rules.push(TuningRule::AddKnownAwards(known));
            }
            rules.extend(awards.medal_groups.into_iter().map(TuningRule::AddAwardChain));
            rules.extend(awards.manual.into_iter().map(TuningRule::AddManualAward));
        }

        if let Some(queue) = self.queue_settings {
            rules.push(TuningRule::OverrideQueue(queue));
        }
        rules
    }
}
