use prometheus_client::encoding::EncodeLabelSet;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::registry::Registry;

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub(crate) struct EventLabels {
    pub kind: String,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub(crate) struct FeaturedLabels {
    pub action: String,
    pub outcome: String,
}

#[derive(Default)]
pub(crate) struct QueueMetrics {
    pub events: Family<EventLabels, Counter>,
    pub featured_requests: Family<FeaturedLabels, Counter>,
    pub size: Gauge,
}

impl QueueMetrics {
    pub(crate) fn register(&self, registry: &mut Registry) {
        registry.register(
            "scorecast_queue_events",
            "The number of published queue events",
            self.events.clone(),
        );
        registry.register(
            "scorecast_queue_featured_requests",
            "The number of featured run requests",
            self.featured_requests.clone(),
        );
        registry.register(
            "scorecast_queue_size",
            "The number of runs in the queue",
            self.size.clone(),
        );
    }
}
