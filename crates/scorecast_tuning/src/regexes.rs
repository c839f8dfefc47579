use regex::Regex;
use scorecast_common::utils::serde::OrderedMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

/// Parses named values out of a templated source string.
///
/// Each key of `rules` is a regex which must match the whole source, each value maps variable
/// names to replacement strings (`$1`, `${name}`). Numbered and named capture groups are
/// exported as variables too. The regexes are tried in declaration order and the first match
/// wins. An `exclusive` parser behaves like a regex set instead: exactly one regex may match,
/// anything else omits the values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegexParser {
    pub from: String,
    pub rules: OrderedMap<OrderedMap<String>>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub exclusive: bool,
}

fn full_match_regex(pattern: &str) -> Option<Regex> {
    match Regex::new(&format!("^(?:{pattern})$")) {
        Ok(regex) => Some(regex),
        Err(error) => {
            warn! {
                pattern,
                %error,
                "ignoring malformed regex"
            }
            None
        }
    }
}

impl RegexParser {
    /// Compiles the regexes once so that the parser can be evaluated for many teams.
    pub fn compile(&self) -> CompiledParser<'_> {
        CompiledParser {
            from: &self.from,
            exclusive: self.exclusive,
            rules: self
                .rules
                .iter()
                .filter_map(|(pattern, replacements)| {
                    full_match_regex(pattern).map(|regex| (regex, replacements))
                })
                .collect(),
        }
    }
}

pub struct CompiledParser<'a> {
    pub from: &'a str,
    exclusive: bool,
    rules: Vec<(Regex, &'a OrderedMap<String>)>,
}

impl CompiledParser<'_> {
    /// Matches `source` and stores the parsed variables as `<block>.<name>` in `values`.
    pub fn parse(&self, block: &str, source: &str, values: &mut BTreeMap<String, String>) {
        let mut matches = self
            .rules
            .iter()
            .filter_map(|(regex, replacements)| {
                regex
                    .captures(source)
                    .map(|captures| (regex, captures, *replacements))
            });

        let Some((regex, captures, replacements)) = matches.next() else {
            warn! {
                block,
                source,
                "no regex matches the source, the values are omitted"
            }
            return;
        };
        if self.exclusive {
            let ambiguous: Vec<&str> = matches.map(|(regex, ..)| regex.as_str()).collect();
            if !ambiguous.is_empty() {
                warn! {
                    block,
                    source,
                    first = regex.as_str(),
                    ?ambiguous,
                    "multiple regexes match the source, the values are omitted"
                }
                return;
            }
        }

        for (index, group) in captures.iter().enumerate().skip(1) {
            let value = group.map(|group| group.as_str()).unwrap_or_default();
            values.insert(format!("{block}.{index}"), value.to_string());
        }
        for name in regex.capture_names().flatten() {
            let value = captures.name(name).map(|group| group.as_str());
            values.insert(
                format!("{block}.{name}"),
                value.unwrap_or_default().to_string(),
            );
        }
        for (key, replacement) in replacements.iter() {
            let mut expanded = String::new();
            captures.expand(replacement, &mut expanded);
            values.insert(format!("{block}.{key}"), expanded);
        }
    }
}
