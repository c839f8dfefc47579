use super::{merge_maps, merge_overrides};
use crate::regexes::RegexParser;
use crate::template::{has_unresolved_token, Substitutor};
use scorecast_common::models::{
    ContestInfo, GroupId, GroupInfo, Media, OrganizationId, OrganizationInfo, TeamId, TeamInfo,
    TeamMediaType,
};
use scorecast_common::utils::serde::OrderedMap;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// An override of a single team. Missing fields keep the value from the contest system.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TeamOverride {
    #[serde(alias = "name")]
    pub full_name: Option<String>,
    #[serde(alias = "shortName")]
    pub display_name: Option<String>,
    /// Replaces the groups of the team
    pub groups: Option<Vec<GroupId>>,
    /// Adds groups to the team
    pub extra_groups: Option<Vec<GroupId>>,
    pub organization_id: Option<OrganizationId>,
    pub hash_tag: Option<String>,
    /// A `null` media removes the media received from the contest system
    pub medias: Option<BTreeMap<TeamMediaType, Option<Media>>>,
    pub custom_fields: Option<BTreeMap<String, Option<String>>>,
    pub is_hidden: Option<bool>,
    pub is_out_of_contest: Option<bool>,
    pub color: Option<String>,
}

impl TeamOverride {
    fn merge(&self, mut team: TeamInfo) -> TeamInfo {
        if let Some(full_name) = &self.full_name {
            team.full_name = full_name.clone();
        }
        if let Some(display_name) = &self.display_name {
            team.display_name = display_name.clone();
        }
        if let Some(groups) = &self.groups {
            team.groups = groups.clone();
        }
        for group in self.extra_groups.iter().flatten() {
            if !team.groups.contains(group) {
                team.groups.push(group.clone());
            }
        }
        if let Some(organization_id) = &self.organization_id {
            team.organization_id = Some(organization_id.clone());
        }
        if let Some(hash_tag) = &self.hash_tag {
            team.hash_tag = Some(hash_tag.clone());
        }
        team.medias = merge_maps(team.medias, self.medias.as_ref());
        team.custom_fields = merge_maps(team.custom_fields, self.custom_fields.as_ref());
        if let Some(is_hidden) = self.is_hidden {
            team.is_hidden = is_hidden;
        }
        if let Some(is_out_of_contest) = self.is_out_of_contest {
            team.is_out_of_contest = is_out_of_contest;
        }
        if let Some(color) = &self.color {
            team.color = Some(color.clone());
        }
        team
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverrideTeams {
    pub rules: BTreeMap<TeamId, TeamOverride>,
}

impl OverrideTeams {
    pub(crate) fn apply(&self, mut info: ContestInfo) -> ContestInfo {
        let teams = std::mem::take(&mut info.teams);
        info.teams = merge_overrides(
            "team",
            teams,
            &self.rules,
            |team| &team.id,
            |team, team_override| team_override.merge(team),
        );
        auto_create_groups_and_organizations(info)
    }
}

/// Creates the groups and organizations which are referenced by teams but unknown otherwise.
pub(crate) fn auto_create_groups_and_organizations(mut info: ContestInfo) -> ContestInfo {
    let known_groups: BTreeSet<&GroupId> = info.groups.iter().map(|group| &group.id).collect();
    let new_groups: BTreeSet<GroupId> = info
        .teams
        .iter()
        .flat_map(|team| team.groups.iter())
        .filter(|group| !known_groups.contains(group))
        .cloned()
        .collect();

    let known_organizations: BTreeSet<&OrganizationId> =
        info.organizations.iter().map(|org| &org.id).collect();
    let new_organizations: BTreeSet<OrganizationId> = info
        .teams
        .iter()
        .filter_map(|team| team.organization_id.as_ref())
        .filter(|org| !known_organizations.contains(org))
        .cloned()
        .collect();

    if !new_groups.is_empty() || !new_organizations.is_empty() {
        debug! {
            groups = ?new_groups,
            organizations = ?new_organizations,
            "creating groups and organizations referenced by teams"
        }
    }
    info.groups
        .extend(new_groups.into_iter().map(|id| GroupInfo {
            display_name: id.to_string(),
            id,
            is_hidden: false,
            is_out_of_contest: false,
        }));
    info.organizations
        .extend(new_organizations.into_iter().map(|id| OrganizationInfo {
            display_name: id.to_string(),
            full_name: id.to_string(),
            id,
            logo: None,
        }));
    info
}

/// Updates every team in the same way. All strings are templates, see [crate::template].
///
/// The rule is atomic: substitutions observe the teams as they were before the rule.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OverrideTeamTemplate {
    /// Named blocks of values parsed by regexes, exposed as `{regexes.<block>.<key>}`
    pub regexes: OrderedMap<RegexParser>,
    pub full_name: Option<String>,
    pub display_name: Option<String>,
    pub groups: Option<Vec<String>>,
    pub extra_groups: Option<Vec<String>>,
    pub organization_id: Option<String>,
    pub hash_tag: Option<String>,
    pub medias: Option<BTreeMap<TeamMediaType, Option<Media>>>,
    pub custom_fields: Option<BTreeMap<String, String>>,
    pub color: Option<String>,
}

impl OverrideTeamTemplate {
    pub(crate) fn desugar(&self, info: &ContestInfo) -> OverrideTeams {
        let parsers: Vec<_> = self
            .regexes
            .iter()
            .map(|(block, parser)| (block, parser.compile()))
            .collect();

        let rules = info
            .teams
            .iter()
            .map(|team| {
                let organization = team
                    .organization_id
                    .as_ref()
                    .and_then(|id| info.organization(id));
                let mut values = BTreeMap::new();
                for (block, parser) in &parsers {
                    let source =
                        Substitutor::new(Some(team), organization, &values).raw(parser.from);
                    parser.parse(block, &source, &mut values);
                }
                let substitutor = Substitutor::new(Some(team), organization, &values);
                (team.id.clone(), self.team_override(&substitutor))
            })
            .collect();
        OverrideTeams { rules }
    }

    fn team_override(&self, substitutor: &Substitutor) -> TeamOverride {
        let raw = |value: &String| substitutor.raw(value);
        // Ids which still reference something unknown are dropped
        let resolved = |value: &String| {
            let value = substitutor.raw(value);
            (!has_unresolved_token(&value)).then_some(value)
        };

        TeamOverride {
            full_name: self.full_name.as_ref().map(raw),
            display_name: self.display_name.as_ref().map(raw),
            groups: self
                .groups
                .as_ref()
                .map(|groups| groups.iter().filter_map(resolved).map(GroupId::from).collect()),
            extra_groups: self
                .extra_groups
                .as_ref()
                .map(|groups| groups.iter().filter_map(resolved).map(GroupId::from).collect()),
            organization_id: self
                .organization_id
                .as_ref()
                .and_then(resolved)
                .map(OrganizationId::from),
            hash_tag: self.hash_tag.as_ref().map(raw),
            medias: self.medias.as_ref().map(|medias| {
                medias
                    .iter()
                    .map(|(media_type, media)| {
                        (*media_type, media.as_ref().map(|media| substitutor.media(media)))
                    })
                    .collect()
            }),
            custom_fields: self.custom_fields.as_ref().map(|fields| {
                fields
                    .iter()
                    .map(|(key, value)| (key.clone(), Some(raw(value))))
                    .collect()
            }),
            is_hidden: None,
            is_out_of_contest: None,
            color: self.color.as_ref().map(raw),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::apply;
    use crate::rules::tests::{contest, parse};

    #[test]
    fn should_substitute_team_id_in_template() {
        let rules = parse(
            r#"[{"type": "overrideTeamTemplate", "hashTag": "{team.id}-extra", "fullName": "{nope}"}]"#,
        );
        let info = apply(&rules, contest(), &BTreeSet::new());
        assert_eq!(info.teams[1].hash_tag.as_deref(), Some("t42-extra"));
        assert_eq!(info.teams[1].full_name, "{nope}");
    }

    #[test]
    fn should_derive_groups_and_organizations_from_regexes() {
        let rules = parse(
            r#"[{
                "type": "overrideTeamTemplate",
                "regexes": {
                    "id": {"from": "{team.id}", "rules": {"t(\\d)(\\d*)": {"site": "site-$1"}}},
                    "name": {"from": "{regexes.id.site}:{team.displayName}", "rules": {"site-4:(.*)": {"org": "org-$1"}}}
                },
                "extraGroups": ["{regexes.id.site}"],
                "organizationId": "{regexes.name.org}"
            }]"#,
        );
        let info = apply(&rules, contest(), &BTreeSet::new());

        let omega = &info.teams[1];
        assert_eq!(omega.groups, vec![GroupId::from("site-4")]);
        assert_eq!(omega.organization_id, Some(OrganizationId::from("org-Omega")));

        // t1 matches the first block, but not the second one
        let alpha = &info.teams[0];
        assert_eq!(
            alpha.groups,
            vec![GroupId::from("school"), GroupId::from("site-1")]
        );
        assert_eq!(alpha.organization_id, Some(OrganizationId::from("itmo")));

        let groups: Vec<&str> = info.groups.iter().map(|group| group.id.as_str()).collect();
        assert_eq!(groups, vec!["school", "site-1", "site-4"]);
        assert!(info
            .organizations
            .iter()
            .any(|org| org.id.as_str() == "org-Omega" && org.display_name == "org-Omega"));
    }

    #[test]
    fn should_remove_media_overridden_with_null() {
        let mut info = contest();
        info.teams[0].medias.insert(
            TeamMediaType::Camera,
            Media::Video {
                url: "http://old".to_string(),
            },
        );
        let rules = parse(
            r#"[{"type": "overrideTeams", "rules": {"t1": {
                "medias": {"camera": null, "screen": {"type": "video", "url": "http://screens/1"}},
                "extraGroups": ["school", "finalists"]
            }}}]"#,
        );
        let info = apply(&rules, info, &BTreeSet::new());

        let team = &info.teams[0];
        assert_eq!(
            team.medias,
            BTreeMap::from([(
                TeamMediaType::Screen,
                Media::Video {
                    url: "http://screens/1".to_string()
                }
            )])
        );
        assert_eq!(
            team.groups,
            vec![GroupId::from("school"), GroupId::from("finalists")]
        );
    }

    #[test]
    fn should_encode_template_media_urls() {
        let rules = parse(
            r#"[{"type": "overrideTeamTemplate", "medias": {"photo": {"type": "image", "url": "http://photos/{team.displayName}.png"}}}]"#,
        );
        let mut info = contest();
        info.teams[0].display_name = "A B".to_string();
        let info = apply(&rules, info, &BTreeSet::new());
        assert_eq!(
            info.teams[0].medias.get(&TeamMediaType::Photo),
            Some(&Media::Image {
                url: "http://photos/A%20B.png".to_string()
            })
        );
    }
}
