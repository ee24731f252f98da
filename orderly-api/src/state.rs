use orderly_order::{OrderMetrics, OrderOrchestrator};

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: OrderOrchestrator,
}

impl AppState {
    pub fn new(orchestrator: OrderOrchestrator) -> Self {
        Self { orchestrator }
    }

    pub fn metrics(&self) -> &OrderMetrics {
        self.orchestrator.metrics()
    }
}
