//! `{name}` token substitution used by the template rules.
//!
//! A token is resolved by its namespace: `team.*` and `org.*` read the entity fields,
//! `regexes.<block>.<key>` reads values parsed by regex blocks and any other name is looked up
//! in the team's custom fields. Tokens which cannot be resolved are kept verbatim.
use lazy_static::lazy_static;
use regex::{Captures, Regex};
use scorecast_common::models::{Media, OrganizationInfo, TeamInfo};
use std::collections::BTreeMap;

lazy_static! {
    static ref TOKEN_REGEX: Regex =
        Regex::new(r"\{(!?[a-zA-Z0-9_.-]*)\}").expect("the token pattern is valid");
}

/// Returns true while `value` still contains a token.
pub fn has_unresolved_token(value: &str) -> bool {
    TOKEN_REGEX.is_match(value)
}

/// Percent-encodes `value` for use inside a url. Spaces become `%20`.
pub fn encode_url_parameter(value: &str) -> String {
    form_urlencoded::byte_serialize(value.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}

pub struct Substitutor<'a> {
    team: Option<&'a TeamInfo>,
    organization: Option<&'a OrganizationInfo>,
    regex_values: &'a BTreeMap<String, String>,
}

impl<'a> Substitutor<'a> {
    pub fn new(
        team: Option<&'a TeamInfo>,
        organization: Option<&'a OrganizationInfo>,
        regex_values: &'a BTreeMap<String, String>,
    ) -> Self {
        Self {
            team,
            organization,
            regex_values,
        }
    }

    pub fn resolve(&self, key: &str) -> Option<String> {
        if let Some(field) = key.strip_prefix("team.") {
            let team = self.team?;
            return match field {
                "id" => Some(team.id.to_string()),
                "displayName" => Some(team.display_name.clone()),
                "fullName" => Some(team.full_name.clone()),
                "hashTag" => team.hash_tag.clone(),
                "color" => team.color.clone(),
                _ => None,
            };
        }
        if let Some(field) = key.strip_prefix("org.") {
            let organization = self.organization?;
            return match field {
                "id" => Some(organization.id.to_string()),
                "displayName" => Some(organization.display_name.clone()),
                "fullName" => Some(organization.full_name.clone()),
                _ => None,
            };
        }
        if let Some(name) = key.strip_prefix("regexes.") {
            return self.regex_values.get(name).cloned();
        }
        self.team?.custom_fields.get(key).cloned()
    }

    fn substitute(&self, template: &str, url: bool) -> String {
        TOKEN_REGEX
            .replace_all(template, |captures: &Captures| {
                let token = &captures[1];
                let value = match token.strip_prefix('!') {
                    Some(key) => self.resolve(key),
                    None if url => self.resolve(token).map(|value| encode_url_parameter(&value)),
                    None => self.resolve(token),
                };
                value.unwrap_or_else(|| captures[0].to_string())
            })
            .into_owned()
    }

    /// Substitutes the tokens with their plain values.
    pub fn raw(&self, template: &str) -> String {
        self.substitute(template, false)
    }

    /// Substitutes the tokens with percent-encoded values. Tokens prefixed with `!` are
    /// inserted as is.
    pub fn url(&self, template: &str) -> String {
        self.substitute(template, true)
    }

    pub fn media(&self, media: &Media) -> Media {
        media.map_url(|url| self.url(url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scorecast_common::models::OrganizationId;

    fn team() -> TeamInfo {
        let mut team = TeamInfo::new("t42", "Rust Never Sleeps");
        team.organization_id = Some(OrganizationId::from("itmo"));
        team.custom_fields
            .insert("seat".to_string(), "A/12".to_string());
        team
    }

    fn organization() -> OrganizationInfo {
        OrganizationInfo {
            id: OrganizationId::from("itmo"),
            display_name: "ITMO".to_string(),
            full_name: "ITMO University".to_string(),
            logo: None,
        }
    }

    #[test]
    fn should_substitute_team_fields() {
        let team = team();
        let values = BTreeMap::new();
        let substitutor = Substitutor::new(Some(&team), None, &values);

        assert_eq!(substitutor.raw("{team.id}-extra"), "t42-extra");
        assert_eq!(
            substitutor.raw("{team.displayName} ({seat})"),
            "Rust Never Sleeps (A/12)"
        );
    }

    #[test]
    fn should_keep_unresolved_tokens_verbatim() {
        let team = team();
        let values = BTreeMap::new();
        let substitutor = Substitutor::new(Some(&team), None, &values);

        assert_eq!(substitutor.raw("{nope}"), "{nope}");
        assert_eq!(substitutor.raw("{org.displayName}"), "{org.displayName}");
        assert!(has_unresolved_token(&substitutor.raw("{regexes.site.1}")));
    }

    #[test]
    fn should_resolve_organization_and_regex_values() {
        let team = team();
        let organization = organization();
        let mut values = BTreeMap::new();
        values.insert("site.place".to_string(), "456".to_string());
        let substitutor = Substitutor::new(Some(&team), Some(&organization), &values);

        assert_eq!(
            substitutor.raw("{org.fullName}: {regexes.site.place}"),
            "ITMO University: 456"
        );
    }

    #[test]
    fn should_encode_values_in_urls_unless_marked_raw() {
        let team = team();
        let values = BTreeMap::new();
        let substitutor = Substitutor::new(Some(&team), None, &values);

        assert_eq!(
            substitutor.url("http://cams/{team.displayName}/{seat}"),
            "http://cams/Rust%20Never%20Sleeps/A%2F12"
        );
        assert_eq!(substitutor.url("http://cams/{!seat}"), "http://cams/A/12");
        assert_eq!(
            substitutor.media(&Media::Video {
                url: "http://cams/{team.id}.mp4".to_string()
            }),
            Media::Video {
                url: "http://cams/t42.mp4".to_string()
            }
        );
    }
}
