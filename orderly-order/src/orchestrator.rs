//! Order workflows.
//!
//! Inventory, pricing and the repository are on the request path and their
//! failures fail the request. Event publication, notifications and the cache
//! are best-effort: failures are logged and the workflow carries on.
//! Notifications run as detached tasks tracked by the orchestrator so the
//! process can wait for them on shutdown.

use std::sync::Arc;
use std::time::Duration;

use orderly_core::{
    publish_json, CacheAside, CacheComputeError, EventPublisher, InventoryGateway,
    NotificationGateway, OrderError, OrderRepository, OrderResult, PaymentGateway, PaymentHandle,
    PriceLookup, TopicConfig,
};
use orderly_shared::{
    status, NewOrder, Order, OrderCreatedEvent, OrderId, OrderUpdate, StatusChangeEvent,
};
use rust_decimal::Decimal;
use serde::Serialize;
use tokio::time::Instant;
use tokio_util::task::TaskTracker;

use crate::batch::{BatchJob, BatchSummary, JobResult};
use crate::metrics::OrderMetrics;
use crate::pool::process_batch;

/// Collaborators the orchestrator calls into.
pub struct OrchestratorDeps {
    pub repository: Arc<dyn OrderRepository>,
    pub prices: Arc<dyn PriceLookup>,
    pub inventory: Arc<dyn InventoryGateway>,
    pub notifier: Arc<dyn NotificationGateway>,
    pub payments: Arc<dyn PaymentGateway>,
    pub publisher: Arc<dyn EventPublisher>,
    pub cache: CacheAside,
}

#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    pub topic: TopicConfig,
    pub order_ttl: Duration,
    pub batch_workers: usize,
    pub batch_timeout: Duration,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            topic: TopicConfig::default(),
            order_ttl: Duration::from_secs(30 * 60),
            batch_workers: 10,
            batch_timeout: Duration::from_secs(30),
        }
    }
}

/// Order plus the outcome of its payment. Exactly one of `payment` and
/// `payment_error` is set.
#[derive(Debug, Clone, Serialize)]
pub struct OrderWithPayment {
    pub order: Order,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment: Option<PaymentHandle>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusUpdate {
    pub order_id: OrderId,
    pub status: String,
}

#[derive(Clone)]
pub struct OrderOrchestrator {
    repository: Arc<dyn OrderRepository>,
    prices: Arc<dyn PriceLookup>,
    inventory: Arc<dyn InventoryGateway>,
    notifier: Arc<dyn NotificationGateway>,
    payments: Arc<dyn PaymentGateway>,
    publisher: Arc<dyn EventPublisher>,
    cache: CacheAside,
    settings: Arc<OrchestratorSettings>,
    metrics: OrderMetrics,
    background: TaskTracker,
}

impl OrderOrchestrator {
    pub fn new(deps: OrchestratorDeps, settings: OrchestratorSettings, metrics: OrderMetrics) -> Self {
        Self {
            repository: deps.repository,
            prices: deps.prices,
            inventory: deps.inventory,
            notifier: deps.notifier,
            payments: deps.payments,
            publisher: deps.publisher,
            cache: deps.cache,
            settings: Arc::new(settings),
            metrics,
            background: TaskTracker::new(),
        }
    }

    pub fn metrics(&self) -> &OrderMetrics {
        &self.metrics
    }

    /// Check stock, price, persist, then announce the new order.
    pub async fn create_order(&self, request: NewOrder) -> OrderResult<Order> {
        let _timer = self.metrics.start_processing_timer();
        let order = self.place_order(&request).await?;
        self.announce_created(&order).await;
        Ok(order)
    }

    /// Like [`create_order`](Self::create_order) followed by a payment for the
    /// order total. A failed payment still returns the persisted order; the
    /// order is only announced once the payment exists.
    pub async fn create_order_with_payment(
        &self,
        request: NewOrder,
        currency: &str,
    ) -> OrderResult<OrderWithPayment> {
        if currency.trim().is_empty() {
            return Err(OrderError::Validation("currency is required".to_string()));
        }

        let _timer = self.metrics.start_processing_timer();
        let order = self.place_order(&request).await?;

        match self.payments.create_payment(&order, order.total_price, currency).await {
            Ok(payment) => {
                tracing::info!(order_id = order.id, payment_id = payment.payment.id, "Payment created");
                self.announce_created(&order).await;
                Ok(OrderWithPayment {
                    order,
                    payment: Some(payment),
                    payment_error: None,
                })
            }
            Err(e) => {
                tracing::warn!(order_id = order.id, error = %e, "Failed to create payment intent");
                Ok(OrderWithPayment {
                    order,
                    payment: None,
                    payment_error: Some(format!("Failed to create payment intent: {}", e)),
                })
            }
        }
    }

    /// Create every order on a bounded worker pool. Orders created before the
    /// batch deadline are kept even if the batch times out.
    pub async fn batch_create_orders(&self, orders: Vec<NewOrder>) -> BatchSummary {
        let started = Instant::now();
        let total = orders.len();
        let jobs: Vec<BatchJob> = orders
            .into_iter()
            .enumerate()
            .map(|(index, order)| BatchJob { index, order })
            .collect();

        let orchestrator = self.clone();
        let results = process_batch(
            jobs,
            self.settings.batch_workers,
            self.settings.batch_timeout,
            move |job: BatchJob| {
                let orchestrator = orchestrator.clone();
                async move {
                    match orchestrator.create_order(job.order).await {
                        Ok(order) => JobResult::succeeded(job.index, order.id),
                        Err(e) => JobResult::failed(job.index, e.to_string()),
                    }
                }
            },
        )
        .await;

        let summary = BatchSummary::from_results(total, results, started.elapsed());
        tracing::info!(
            total = summary.total_orders,
            successful = summary.successful,
            failed = summary.failed,
            timed_out = summary.timed_out,
            "Batch processed"
        );
        summary
    }

    /// Read through the cache. An unreachable cache falls back to the
    /// repository.
    pub async fn get_order(&self, id: OrderId) -> OrderResult<Order> {
        let key = Order::cache_key(id);
        match self
            .cache
            .get_or_compute(&key, self.settings.order_ttl, || self.fetch_order(id))
            .await
        {
            Ok(order) => Ok(order),
            Err(CacheComputeError::Compute(e)) => Err(e),
            Err(CacheComputeError::Cache(e)) => {
                tracing::warn!(order_id = id, error = %e, "Cache unavailable, reading from repository");
                self.fetch_order(id).await
            }
        }
    }

    pub async fn list_orders(&self) -> OrderResult<Vec<Order>> {
        Ok(self.repository.list_orders().await?)
    }

    pub async fn update_order(&self, id: OrderId, update: OrderUpdate) -> OrderResult<Order> {
        update.validate().map_err(OrderError::Validation)?;

        let current = self.fetch_order(id).await?;
        let updated = self.repository.update_order(id, &update).await?;
        self.metrics.order_updated();
        self.invalidate(id).await;

        if current.status != updated.status {
            self.metrics.status_changed(&current.status, &updated.status);
            self.dispatch_status_change(StatusChangeEvent {
                order_id: id,
                customer_id: updated.customer_id,
                status: updated.status.clone(),
            });
        }
        Ok(updated)
    }

    /// Set the status without any transition rules. Any value is accepted.
    pub async fn update_order_status(&self, id: OrderId, new_status: String) -> OrderResult<StatusUpdate> {
        let current = self.fetch_order(id).await?;
        self.repository.update_status(id, &new_status).await?;
        self.metrics.status_changed(&current.status, &new_status);
        self.invalidate(id).await;
        tracing::info!(order_id = id, from = %current.status, to = %new_status, "Order status updated");

        if current.status != new_status {
            self.dispatch_status_change(StatusChangeEvent {
                order_id: id,
                customer_id: current.customer_id,
                status: new_status.clone(),
            });
        }
        Ok(StatusUpdate {
            order_id: id,
            status: new_status,
        })
    }

    /// Delete the order and notify a cancellation whatever its prior status.
    pub async fn delete_order(&self, id: OrderId) -> OrderResult<()> {
        let current = self.fetch_order(id).await?;
        self.repository.delete_order(id).await?;
        self.metrics.order_deleted(&current.status);
        self.invalidate(id).await;
        tracing::info!(order_id = id, "Order deleted");

        self.dispatch_status_change(StatusChangeEvent {
            order_id: id,
            customer_id: current.customer_id,
            status: status::CANCELLED.to_string(),
        });
        Ok(())
    }

    /// Wait until every notification dispatched so far has finished.
    pub async fn wait_for_background(&self) {
        self.background.close();
        self.background.wait().await;
        self.background.reopen();
    }

    async fn place_order(&self, request: &NewOrder) -> OrderResult<Order> {
        request.validate().map_err(OrderError::Validation)?;

        let availability = self
            .inventory
            .check_availability(request.product_id, request.quantity)
            .await
            .map_err(OrderError::Inventory)?;
        if !availability.available {
            tracing::info!(product_id = request.product_id, quantity = request.quantity, "Product not available");
            return Err(OrderError::Unavailable {
                product_id: request.product_id,
                message: availability.message,
            });
        }

        let total_price = match request.supplied_price() {
            Some(price) => price,
            None => {
                let unit_price = self
                    .prices
                    .unit_price(request.product_id)
                    .await
                    .map_err(OrderError::Pricing)?;
                unit_price
                    .checked_mul(Decimal::from(request.quantity))
                    .ok_or_else(|| {
                        OrderError::Validation(format!(
                            "total price for product {} overflows ({} x {})",
                            request.product_id, unit_price, request.quantity
                        ))
                    })?
            }
        };

        let order = self.repository.insert_order(request, total_price).await?;
        self.metrics.order_created();
        tracing::info!(
            order_id = order.id,
            customer_id = order.customer_id,
            total_price = %order.total_price,
            "Order created"
        );

        if let Err(e) = self
            .cache
            .set(&Order::cache_key(order.id), &order, self.settings.order_ttl)
            .await
        {
            tracing::warn!(order_id = order.id, error = %e, "Failed to cache new order");
        }
        Ok(order)
    }

    async fn fetch_order(&self, id: OrderId) -> OrderResult<Order> {
        self.repository
            .get_order(id)
            .await?
            .ok_or(OrderError::NotFound(id))
    }

    async fn announce_created(&self, order: &Order) {
        let event = OrderCreatedEvent::new(order.clone());
        if let Err(e) = publish_json(self.publisher.as_ref(), &self.settings.topic, &event).await {
            tracing::warn!(order_id = order.id, error = %e, "Failed to publish order created event");
        }

        let notifier = self.notifier.clone();
        let order_id = order.id;
        self.background.spawn(async move {
            if let Err(e) = notifier.notify_order_created(order_id).await {
                tracing::warn!(order_id, service = e.service(), error = %e, "Failed to send order notification");
            }
        });
    }

    fn dispatch_status_change(&self, event: StatusChangeEvent) {
        let notifier = self.notifier.clone();
        self.background.spawn(async move {
            if let Err(e) = notifier.notify_status_changed(&event).await {
                tracing::warn!(
                    order_id = event.order_id,
                    status = %event.status,
                    error = %e,
                    "Failed to send status notification"
                );
            }
        });
    }

    async fn invalidate(&self, id: OrderId) {
        if let Err(e) = self.cache.invalidate(&Order::cache_key(id)).await {
            tracing::warn!(order_id = id, error = %e, "Failed to invalidate cached order");
        }
    }
}
