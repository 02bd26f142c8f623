use std::sync::Arc;

use crate::config::Config;
use crate::engine::lifecycle::RequestLifecycle;
use crate::engine::ratings::RatingAggregator;
use crate::engine::technicians::TechnicianRegistry;
use crate::observability::metrics::Metrics;
use crate::store::{DocumentStore, InstrumentedStore};

pub struct AppState {
    pub requests: RequestLifecycle,
    pub ratings: RatingAggregator,
    pub technicians: TechnicianRegistry,
    pub metrics: Metrics,
}

impl AppState {
    /// Builds the managers around `store`, with store latency recorded in
    /// the returned state's metrics.
    pub fn new(store: Arc<dyn DocumentStore>, config: &Config) -> Self {
        let metrics = Metrics::new();
        let store: Arc<dyn DocumentStore> =
            Arc::new(InstrumentedStore::new(store, metrics.clone()));

        Self {
            requests: RequestLifecycle::new(store.clone(), config.assignment_policy)
                .with_write_verification(config.verify_writes),
            ratings: RatingAggregator::new(store.clone()),
            technicians: TechnicianRegistry::new(store),
            metrics,
        }
    }
}
