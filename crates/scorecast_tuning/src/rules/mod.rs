// SPDX-License-Identifier: AGPL-3.0-only
// Copyright Authors of scorecast

//! Tuning rules fixing up the contest information received from the contest system.
//!
//! Rules are applied strictly in order, each rule consuming the output of the previous one.
//! Shorthand rules are first desugared against the current info into the canonical rules
//! they stand for.
mod awards;
mod contest;
mod entities;
mod teams;

pub use awards::*;
pub use contest::*;
pub use entities::*;
pub use teams::*;

use scorecast_common::models::{AwardChain, ContestInfo, ManualAward, TeamId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Display;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum TuningRule {
    OverrideContestSettings(OverrideContestSettings),
    OverrideScoreboardSettings(OverrideScoreboardSettings),
    OverrideTeams(OverrideTeams),
    OverrideTeamTemplate(OverrideTeamTemplate),
    OverrideOrganizations(OverrideOrganizations),
    OverrideOrganizationTemplate(OverrideOrganizationTemplate),
    OverrideGroups(OverrideGroups),
    OverrideProblems(OverrideProblems),
    AddAwardChain(AwardChain),
    AddManualAward(ManualAward),
    AddKnownAwards(AddKnownAwards),
    AddMedals(MedalSettings),
    OverrideQueue(OverrideQueue),
}

impl TuningRule {
    pub fn kind(&self) -> &'static str {
        match self {
            TuningRule::OverrideContestSettings(_) => "overrideContestSettings",
            TuningRule::OverrideScoreboardSettings(_) => "overrideScoreboardSettings",
            TuningRule::OverrideTeams(_) => "overrideTeams",
            TuningRule::OverrideTeamTemplate(_) => "overrideTeamTemplate",
            TuningRule::OverrideOrganizations(_) => "overrideOrganizations",
            TuningRule::OverrideOrganizationTemplate(_) => "overrideOrganizationTemplate",
            TuningRule::OverrideGroups(_) => "overrideGroups",
            TuningRule::OverrideProblems(_) => "overrideProblems",
            TuningRule::AddAwardChain(_) => "addAwardChain",
            TuningRule::AddManualAward(_) => "addManualAward",
            TuningRule::AddKnownAwards(_) => "addKnownAwards",
            TuningRule::AddMedals(_) => "addMedals",
            TuningRule::OverrideQueue(_) => "overrideQueue",
        }
    }

    /// Expands a shorthand rule into canonical rules relative to `info`. Returns [None] for
    /// rules which are already canonical.
    pub fn desugar(&self, info: &ContestInfo) -> Option<Vec<TuningRule>> {
        match self {
            TuningRule::OverrideTeamTemplate(template) => {
                Some(vec![TuningRule::OverrideTeams(template.desugar(info))])
            }
            TuningRule::OverrideOrganizationTemplate(template) => {
                Some(vec![TuningRule::OverrideOrganizations(template.desugar(info))])
            }
            TuningRule::AddKnownAwards(awards) => Some(awards.desugar()),
            TuningRule::AddMedals(medals) => Some(vec![TuningRule::AddKnownAwards(
                AddKnownAwards::medals(medals.clone()),
            )]),
            _ => None,
        }
    }

    pub fn apply(&self, mut info: ContestInfo, submitted_teams: &BTreeSet<TeamId>) -> ContestInfo {
        if let Some(rules) = self.desugar(&info) {
            return apply(&rules, info, submitted_teams);
        }
        match self {
            TuningRule::OverrideContestSettings(rule) => rule.apply(info),
            TuningRule::OverrideScoreboardSettings(rule) => rule.apply(info, submitted_teams),
            TuningRule::OverrideTeams(rule) => rule.apply(info),
            TuningRule::OverrideOrganizations(rule) => rule.apply(info),
            TuningRule::OverrideGroups(rule) => rule.apply(info),
            TuningRule::OverrideProblems(rule) => rule.apply(info),
            TuningRule::AddAwardChain(chain) => {
                info.awards.chains.push(chain.clone());
                info
            }
            TuningRule::AddManualAward(award) => {
                info.awards.manual.push(award.clone());
                info
            }
            TuningRule::OverrideQueue(rule) => rule.apply(info),
            TuningRule::OverrideTeamTemplate(_)
            | TuningRule::OverrideOrganizationTemplate(_)
            | TuningRule::AddKnownAwards(_)
            | TuningRule::AddMedals(_) => info,
        }
    }
}

/// Applies `rules` in order to `info`.
pub fn apply(
    rules: &[TuningRule],
    info: ContestInfo,
    submitted_teams: &BTreeSet<TeamId>,
) -> ContestInfo {
    rules
        .iter()
        .fold(info, |info, rule| rule.apply(info, submitted_teams))
}

/// Desugars every rule against the info it would see when applied.
pub fn desugar_all(
    rules: &[TuningRule],
    info: ContestInfo,
    submitted_teams: &BTreeSet<TeamId>,
) -> Vec<TuningRule> {
    let mut canonical = Vec::new();
    let mut info = info;
    for rule in rules {
        match rule.desugar(&info) {
            Some(expanded) => {
                let expanded = desugar_all(&expanded, info.clone(), submitted_teams);
                info = apply(&expanded, info, submitted_teams);
                canonical.extend(expanded);
            }
            None => {
                info = rule.apply(info, submitted_teams);
                canonical.push(rule.clone());
            }
        }
    }
    canonical
}

/// Merges `overrides` into the entities with a matching id. Ids without an entity are
/// reported with a single warning.
pub(crate) fn merge_overrides<T, K, O>(
    kind: &'static str,
    entities: Vec<T>,
    overrides: &BTreeMap<K, O>,
    id: impl Fn(&T) -> &K,
    merge: impl Fn(T, &O) -> T,
) -> Vec<T>
where
    K: Ord + Display,
{
    let mut unmatched: BTreeSet<&K> = overrides.keys().collect();
    let merged = entities
        .into_iter()
        .map(|entity| match overrides.get(id(&entity)) {
            Some(entity_override) => {
                unmatched.remove(id(&entity));
                merge(entity, entity_override)
            }
            None => entity,
        })
        .collect();

    if !unmatched.is_empty() {
        let ids: Vec<String> = unmatched.iter().map(|id| id.to_string()).collect();
        warn! {
            kind,
            ?ids,
            "no entity matches the override"
        }
    }
    merged
}

/// Merges a map override into `base`. An explicit `null` removes the key.
pub(crate) fn merge_maps<K: Ord + Clone, V: Clone>(
    mut base: BTreeMap<K, V>,
    overrides: Option<&BTreeMap<K, Option<V>>>,
) -> BTreeMap<K, V> {
    for (key, value) in overrides.into_iter().flatten() {
        match value {
            Some(value) => {
                base.insert(key.clone(), value.clone());
            }
            None => {
                base.remove(key);
            }
        }
    }
    base
}
