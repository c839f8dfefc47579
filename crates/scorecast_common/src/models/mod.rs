// SPDX-License-Identifier: AGPL-3.0-only
// Copyright Authors of scorecast

//! Shared models describing the contest, its runs and the derived standings.
use serde::{Deserialize, Serialize};
use std::fmt;

mod contest;
mod events;
mod run;
mod scoreboard;

pub use contest::*;
pub use events::*;
pub use run::*;
pub use scoreboard::*;

macro_rules! id_type {
    ($($(#[$meta:meta])* $name:ident),* $(,)?) => {
        $(
            $(#[$meta])*
            #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
            #[serde(transparent)]
            pub struct $name(pub String);

            impl $name {
                pub fn new(value: impl Into<String>) -> Self {
                    Self(value.into())
                }

                pub fn as_str(&self) -> &str {
                    &self.0
                }
            }

            impl fmt::Display for $name {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str(&self.0)
                }
            }

            impl From<&str> for $name {
                fn from(value: &str) -> Self {
                    Self(value.to_string())
                }
            }

            impl From<String> for $name {
                fn from(value: String) -> Self {
                    Self(value)
                }
            }
        )*
    };
}

id_type!(
    /// The identifier of a team as given by the contest system.
    TeamId,
    ProblemId,
    GroupId,
    OrganizationId,
    /// A stable run identifier. The run value may change, the id never does.
    RunId,
    LanguageId,
);
