pub mod batch;
pub mod metrics;
pub mod orchestrator;
pub mod pool;

pub use batch::{BatchJob, BatchSummary, FailedOrder, JobResult};
pub use metrics::OrderMetrics;
pub use orchestrator::{
    OrchestratorDeps, OrchestratorSettings, OrderOrchestrator, OrderWithPayment, StatusUpdate,
};
pub use pool::{process_batch, PoolError, PoolState, WorkerPool};
