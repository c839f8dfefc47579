use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::registry::Registry;

#[derive(Default)]
pub(crate) struct TuningMetrics {
    pub recomputes: Counter,
    pub reload_errors: Counter,
    pub rules: Gauge,
}

impl TuningMetrics {
    pub(crate) fn register(&self, registry: &mut Registry) {
        registry.register(
            "scorecast_tuning_recomputes",
            "The number of published tuned contest infos",
            self.recomputes.clone(),
        );
        registry.register(
            "scorecast_tuning_reload_errors",
            "The number of rule documents which failed to load",
            self.reload_errors.clone(),
        );
        registry.register(
            "scorecast_tuning_rules",
            "The number of currently active tuning rules",
            self.rules.clone(),
        );
    }
}
