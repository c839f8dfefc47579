use prometheus_client::encoding::EncodeLabelSet;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::registry::Registry;

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub(crate) struct AccentLabels {
    pub kind: String,
}

#[derive(Default, Clone)]
pub(crate) struct SpotlightMetrics {
    pub accents: Family<AccentLabels, Counter>,
    pub emissions: Counter,
    pub queued_teams: Gauge,
}

impl SpotlightMetrics {
    pub(crate) fn register(&self, registry: &mut Registry) {
        registry.register(
            "scorecast_spotlight_accents",
            "The number of accents added to teams",
            self.accents.clone(),
        );
        registry.register(
            "scorecast_spotlight_emissions",
            "The number of teams taken out of the spotlight",
            self.emissions.clone(),
        );
        registry.register(
            "scorecast_spotlight_queued_teams",
            "The number of teams with a pending score",
            self.queued_teams.clone(),
        );
    }
}
