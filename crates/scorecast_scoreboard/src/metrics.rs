use prometheus_client::encoding::EncodeLabelSet;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::registry::Registry;

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub(crate) struct LevelLabels {
    pub level: String,
}

#[derive(Default)]
pub(crate) struct ScoreboardMetrics {
    pub recomputes: Family<LevelLabels, Counter>,
    pub skipped_updates: Counter,
    pub lagged_updates: Counter,
}

impl ScoreboardMetrics {
    pub(crate) fn register(&self, registry: &mut Registry) {
        registry.register(
            "scorecast_scoreboard_recomputes",
            "The number of published scoreboards",
            self.recomputes.clone(),
        );
        registry.register(
            "scorecast_scoreboard_skipped_updates",
            "The number of updates which did not affect the standings",
            self.skipped_updates.clone(),
        );
        registry.register(
            "scorecast_scoreboard_lagged_updates",
            "The number of tuned updates lost because the scoreboard lagged behind",
            self.lagged_updates.clone(),
        );
    }
}
