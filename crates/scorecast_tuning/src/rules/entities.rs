use super::merge_overrides;
use crate::template::Substitutor;
use scorecast_common::models::{
    ContestInfo, GroupId, Media, OrganizationId, ProblemId, ScoreMergeMode,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OrganizationOverride {
    pub display_name: Option<String>,
    pub full_name: Option<String>,
    pub logo: Option<Media>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverrideOrganizations {
    pub rules: BTreeMap<OrganizationId, OrganizationOverride>,
}

impl OverrideOrganizations {
    pub(crate) fn apply(&self, mut info: ContestInfo) -> ContestInfo {
        let organizations = std::mem::take(&mut info.organizations);
        info.organizations = merge_overrides(
            "organization",
            organizations,
            &self.rules,
            |org| &org.id,
            |mut org, org_override| {
                if let Some(display_name) = &org_override.display_name {
                    org.display_name = display_name.clone();
                }
                if let Some(full_name) = &org_override.full_name {
                    org.full_name = full_name.clone();
                }
                if let Some(logo) = &org_override.logo {
                    org.logo = Some(logo.clone());
                }
                org
            },
        );
        info
    }
}

/// Updates every organization in the same way, using `{org.*}` tokens.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OverrideOrganizationTemplate {
    pub display_name: Option<String>,
    pub full_name: Option<String>,
    pub logo: Option<Media>,
}

impl OverrideOrganizationTemplate {
    pub(crate) fn desugar(&self, info: &ContestInfo) -> OverrideOrganizations {
        let no_values = BTreeMap::new();
        let rules = info
            .organizations
            .iter()
            .map(|org| {
                let substitutor = Substitutor::new(None, Some(org), &no_values);
                let org_override = OrganizationOverride {
                    display_name: self.display_name.as_ref().map(|value| substitutor.raw(value)),
                    full_name: self.full_name.as_ref().map(|value| substitutor.raw(value)),
                    logo: self.logo.as_ref().map(|logo| substitutor.media(logo)),
                };
                (org.id.clone(), org_override)
            })
            .collect();
        OverrideOrganizations { rules }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GroupOverride {
    pub display_name: Option<String>,
    pub is_hidden: Option<bool>,
    pub is_out_of_contest: Option<bool>,
}

impl GroupOverride {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverrideGroups {
    pub rules: BTreeMap<GroupId, GroupOverride>,
}

impl OverrideGroups {
    pub(crate) fn apply(&self, mut info: ContestInfo) -> ContestInfo {
        let groups = std::mem::take(&mut info.groups);
        info.groups = merge_overrides(
            "group",
            groups,
            &self.rules,
            |group| &group.id,
            |mut group, group_override| {
                if let Some(display_name) = &group_override.display_name {
                    group.display_name = display_name.clone();
                }
                if let Some(is_hidden) = group_override.is_hidden {
                    group.is_hidden = is_hidden;
                }
                if let Some(is_out_of_contest) = group_override.is_out_of_contest {
                    group.is_out_of_contest = is_out_of_contest;
                }
                group
            },
        );
        info
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProblemOverride {
    pub display_name: Option<String>,
    pub full_name: Option<String>,
    pub color: Option<String>,
    pub unsolved_color: Option<String>,
    pub ordinal: Option<i32>,
    pub min_score: Option<f64>,
    pub max_score: Option<f64>,
    pub score_merge_mode: Option<ScoreMergeMode>,
    pub weight: Option<u32>,
    pub is_hidden: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverrideProblems {
    pub rules: BTreeMap<ProblemId, ProblemOverride>,
}

impl OverrideProblems {
    pub(crate) fn apply(&self, mut info: ContestInfo) -> ContestInfo {
        let problems = std::mem::take(&mut info.problems);
        info.problems = merge_overrides(
            "problem",
            problems,
            &self.rules,
            |problem| &problem.id,
            |mut problem, problem_override| {
                if let Some(display_name) = &problem_override.display_name {
                    problem.display_name = display_name.clone();
                }
                if let Some(full_name) = &problem_override.full_name {
                    problem.full_name = full_name.clone();
                }
                if let Some(color) = &problem_override.color {
                    problem.color = Some(color.clone());
                }
                if let Some(unsolved_color) = &problem_override.unsolved_color {
                    problem.unsolved_color = Some(unsolved_color.clone());
                }
                if let Some(ordinal) = problem_override.ordinal {
                    problem.ordinal = ordinal;
                }
                if let Some(min_score) = problem_override.min_score {
                    problem.min_score = Some(min_score);
                }
                if let Some(max_score) = problem_override.max_score {
                    problem.max_score = Some(max_score);
                }
                if let Some(mode) = problem_override.score_merge_mode {
                    problem.score_merge_mode = Some(mode);
                }
                if let Some(weight) = problem_override.weight {
                    problem.weight = weight;
                }
                if let Some(is_hidden) = problem_override.is_hidden {
                    problem.is_hidden = is_hidden;
                }
                problem
            },
        );
        info
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::apply;
    use crate::rules::tests::{contest, parse};
    use std::collections::BTreeSet;

    #[test]
    fn should_apply_organization_template() {
        let rules = parse(
            r#"[{"type": "overrideOrganizationTemplate",
                 "displayName": "{org.displayName} Univ",
                 "logo": {"type": "image", "url": "http://logos/{org.id}.png"}}]"#,
        );
        let info = apply(&rules, contest(), &BTreeSet::new());
        let org = &info.organizations[0];
        assert_eq!(org.display_name, "ITMO Univ");
        assert_eq!(
            org.logo,
            Some(Media::Image {
                url: "http://logos/itmo.png".to_string()
            })
        );
    }

    #[test]
    fn should_override_problems() {
        let rules = parse(
            r##"[{"type": "overrideProblems", "rules": {
                "B": {"ordinal": -1, "color": "#ff0000", "weight": 2},
                "Z": {"isHidden": true}
            }}]"##,
        );
        let info = apply(&rules, contest(), &BTreeSet::new());

        let order: Vec<&str> = info
            .scoreboard_problems()
            .iter()
            .map(|problem| problem.id.as_str())
            .collect();
        assert_eq!(order, vec!["B", "A"]);
        assert_eq!(info.problems[1].color.as_deref(), Some("#ff0000"));
        assert_eq!(info.problems[1].weight, 2);
        assert_eq!(info.problems.len(), 2);
    }

    #[test]
    fn should_override_groups() {
        let rules = parse(
            r#"[
                {"type": "overrideTeams", "rules": {"t42": {"groups": ["guests"]}}},
                {"type": "overrideGroups", "rules": {"guests": {"isOutOfContest": true, "displayName": "Guests"}}}
            ]"#,
        );
        let info = apply(&rules, contest(), &BTreeSet::new());
        let guests = info.group(&GroupId::from("guests")).unwrap();
        assert!(guests.is_out_of_contest);
        assert_eq!(guests.display_name, "Guests");
    }
}
