use super::{ContestInfo, Media, RunId, RunInfo, TeamId};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A single event of the contest stream. Raw streams carry the contest system's view, tuned
/// streams carry the info after the tuning rules were applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ContestUpdate {
    Info(Arc<ContestInfo>),
    Run(RunInfo),
    Analytics(AnalyticsMessage),
    Social(SocialEvent),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsMessage {
    pub id: String,
    pub message: String,
    #[serde(default)]
    pub team_ids: Vec<TeamId>,
    #[serde(default)]
    pub run_ids: Vec<RunId>,
    /// When present, the first referenced run is requested to be featured with this media.
    #[serde(default)]
    pub featured_run_media: Option<Media>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SocialEvent {
    #[serde(default)]
    pub team_ids: Vec<TeamId>,
    #[serde(default)]
    pub message: String,
}
