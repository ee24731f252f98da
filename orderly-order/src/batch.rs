use std::time::Duration;

use orderly_shared::{NewOrder, OrderId};
use serde::Serialize;

/// One order of a batch, tagged with its position in the request.
#[derive(Debug, Clone)]
pub struct BatchJob {
    pub index: usize,
    pub order: NewOrder,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobResult {
    pub index: usize,
    pub order_id: Option<OrderId>,
    pub error: Option<String>,
}

impl JobResult {
    pub fn succeeded(index: usize, order_id: OrderId) -> Self {
        Self {
            index,
            order_id: Some(order_id),
            error: None,
        }
    }

    pub fn failed(index: usize, error: impl Into<String>) -> Self {
        Self {
            index,
            order_id: None,
            error: Some(error.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedOrder {
    pub index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<OrderId>,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub total_orders: usize,
    pub successful: usize,
    pub failed: usize,
    /// Jobs with no result before the batch deadline.
    pub timed_out: usize,
    pub failed_orders: Vec<FailedOrder>,
    pub processing_time_ms: u64,
}

impl BatchSummary {
    pub fn from_results(total_orders: usize, results: Vec<JobResult>, elapsed: Duration) -> Self {
        let mut successful = 0;
        let mut failed_orders = Vec::new();

        for result in results {
            match result.error {
                None => successful += 1,
                Some(error) => failed_orders.push(FailedOrder {
                    index: result.index,
                    order_id: result.order_id,
                    error,
                }),
            }
        }
        failed_orders.sort_by_key(|f| f.index);

        let failed = failed_orders.len();
        Self {
            total_orders,
            successful,
            failed,
            timed_out: total_orders.saturating_sub(successful + failed),
            failed_orders,
            processing_time_ms: elapsed.as_millis() as u64,
        }
    }
}
