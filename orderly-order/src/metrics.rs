//! Prometheus metrics for order workflows, held in a dedicated registry.

use orderly_shared::status;
use prometheus::{
    Encoder, Histogram, HistogramOpts, HistogramTimer, IntCounter, IntCounterVec, IntGauge, Opts,
    Registry, TextEncoder,
};

#[derive(Clone)]
pub struct OrderMetrics {
    registry: Registry,
    orders_created: IntCounter,
    orders_updated: IntCounter,
    status_updates: IntCounterVec,
    processing_duration: Histogram,
    active_orders: IntGauge,
}

impl OrderMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let orders_created = IntCounter::new("orders_created_total", "Total number of orders created")?;
        let orders_updated = IntCounter::new("orders_updated_total", "Total number of orders updated")?;
        let status_updates = IntCounterVec::new(
            Opts::new("order_status_updates_total", "Total number of order status updates"),
            &["status"],
        )?;
        let processing_duration = Histogram::with_opts(
            HistogramOpts::new(
                "order_processing_duration_seconds",
                "Time spent creating an order",
            )
            .buckets(vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
        )?;
        let active_orders = IntGauge::new("active_orders", "Number of orders not yet completed or cancelled")?;

        registry.register(Box::new(orders_created.clone()))?;
        registry.register(Box::new(orders_updated.clone()))?;
        registry.register(Box::new(status_updates.clone()))?;
        registry.register(Box::new(processing_duration.clone()))?;
        registry.register(Box::new(active_orders.clone()))?;

        Ok(Self {
            registry,
            orders_created,
            orders_updated,
            status_updates,
            processing_duration,
            active_orders,
        })
    }

    /// Observes the elapsed time when dropped.
    pub fn start_processing_timer(&self) -> HistogramTimer {
        self.processing_duration.start_timer()
    }

    pub fn order_created(&self) {
        self.orders_created.inc();
        self.active_orders.inc();
    }

    pub fn order_updated(&self) {
        self.orders_updated.inc();
    }

    pub fn status_changed(&self, previous: &str, current: &str) {
        self.status_updates.with_label_values(&[current]).inc();
        if !is_closed(previous) && is_closed(current) {
            self.active_orders.dec();
        }
    }

    pub fn order_deleted(&self, status: &str) {
        if !is_closed(status) {
            self.active_orders.dec();
        }
    }

    pub fn active_orders(&self) -> i64 {
        self.active_orders.get()
    }

    /// Text exposition format for scraping.
    pub fn export(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

fn is_closed(value: &str) -> bool {
    value == status::COMPLETED || value == status::CANCELLED
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_active_orders_follow_lifecycle() {
        let metrics = OrderMetrics::new().unwrap();
        metrics.order_created();
        metrics.order_created();
        metrics.status_changed(status::PENDING, status::SHIPPED);
        assert_eq!(metrics.active_orders(), 2);

        metrics.status_changed(status::SHIPPED, status::COMPLETED);
        // Already closed; must not count twice
        metrics.order_deleted(status::COMPLETED);
        assert_eq!(metrics.active_orders(), 1);

        metrics.order_deleted(status::PENDING);
        assert_eq!(metrics.active_orders(), 0);
    }

    #[test]
    fn test_export_includes_labels() {
        let metrics = OrderMetrics::new().unwrap();
        metrics.order_created();
        metrics.status_changed(status::PENDING, status::SHIPPED);

        let text = metrics.export().unwrap();
        assert!(text.contains("orders_created_total 1"));
        assert!(text.contains("order_status_updates_total{status=\"shipped\"} 1"));
    }
}
