#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use orderly_api::AppState;
use orderly_core::{
    CacheAside, CacheError, CacheStore, DependencyError, EventPublisher, InventoryGateway,
    NotificationGateway, OrderRepository, PaymentGateway, PaymentHandle, PaymentRecord,
    PersistenceError, PriceLookup, PublishError, TopicConfig,
};
use orderly_order::{OrchestratorDeps, OrchestratorSettings, OrderMetrics, OrderOrchestrator};
use orderly_shared::{AvailabilityResult, NewOrder, Order, OrderId, OrderUpdate, StatusChangeEvent};
use rust_decimal::Decimal;

#[derive(Default)]
pub struct InMemoryOrders {
    orders: Mutex<BTreeMap<OrderId, Order>>,
    next_id: AtomicI64,
}

#[async_trait]
impl OrderRepository for InMemoryOrders {
    async fn insert_order(&self, order: &NewOrder, total_price: Decimal) -> Result<Order, PersistenceError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let order = order.clone().into_order(id, total_price, Utc::now());
        self.orders.lock().unwrap().insert(id, order.clone());
        Ok(order)
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>, PersistenceError> {
        Ok(self.orders.lock().unwrap().get(&id).cloned())
    }

    async fn list_orders(&self) -> Result<Vec<Order>, PersistenceError> {
        Ok(self.orders.lock().unwrap().values().rev().cloned().collect())
    }

    async fn update_order(&self, id: OrderId, update: &OrderUpdate) -> Result<Order, PersistenceError> {
        let mut orders = self.orders.lock().unwrap();
        let existing = orders.get(&id).ok_or(PersistenceError::NotFound(id))?;
        let updated = update.clone().apply_to(id, existing.created_at);
        orders.insert(id, updated.clone());
        Ok(updated)
    }

    async fn update_status(&self, id: OrderId, status: &str) -> Result<(), PersistenceError> {
        let mut orders = self.orders.lock().unwrap();
        let order = orders.get_mut(&id).ok_or(PersistenceError::NotFound(id))?;
        order.status = status.to_string();
        Ok(())
    }

    async fn delete_order(&self, id: OrderId) -> Result<(), PersistenceError> {
        self.orders
            .lock()
            .unwrap()
            .remove(&id)
            .map(|_| ())
            .ok_or(PersistenceError::NotFound(id))
    }
}

#[derive(Default)]
pub struct StubInventory {
    pub out_of_stock: HashSet<i64>,
    pub failing: AtomicBool,
}

#[async_trait]
impl InventoryGateway for StubInventory {
    async fn check_availability(&self, product_id: i64, _quantity: i32) -> Result<AvailabilityResult, DependencyError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(DependencyError::CircuitOpen {
                service: "inventory-service".into(),
            });
        }
        if self.out_of_stock.contains(&product_id) {
            return Ok(AvailabilityResult::unavailable("Insufficient stock"));
        }
        Ok(AvailabilityResult::available())
    }
}

pub struct FixedPrices;

#[async_trait]
impl PriceLookup for FixedPrices {
    async fn unit_price(&self, _product_id: i64) -> Result<Decimal, DependencyError> {
        Ok(Decimal::new(1000, 2))
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub status_changes: Mutex<Vec<StatusChangeEvent>>,
}

#[async_trait]
impl NotificationGateway for RecordingNotifier {
    async fn notify_order_created(&self, _order_id: OrderId) -> Result<(), DependencyError> {
        Ok(())
    }

    async fn notify_status_changed(&self, event: &StatusChangeEvent) -> Result<(), DependencyError> {
        self.status_changes.lock().unwrap().push(event.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct StubPayments {
    pub failing: AtomicBool,
}

#[async_trait]
impl PaymentGateway for StubPayments {
    async fn create_payment(&self, order: &Order, amount: Decimal, currency: &str) -> Result<PaymentHandle, DependencyError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(DependencyError::Status {
                service: "payment-service".into(),
                status: 500,
            });
        }
        Ok(PaymentHandle {
            payment: PaymentRecord {
                id: 500,
                order_id: order.id,
                customer_id: order.customer_id,
                amount,
                currency: currency.to_string(),
                status: "pending".into(),
                stripe_payment_id: None,
                payment_method: None,
                created_at: None,
                updated_at: None,
            },
            client_secret: Some("pi_secret".into()),
            message: None,
        })
    }
}

pub struct DiscardPublisher;

#[async_trait]
impl EventPublisher for DiscardPublisher {
    async fn publish_bytes(&self, _topic: &TopicConfig, _payload: Vec<u8>) -> Result<(), PublishError> {
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, String>>,
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        Ok(self.entries.lock().unwrap().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str, _ttl: Duration) -> Result<(), CacheError> {
        self.entries.lock().unwrap().insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.entries.lock().unwrap().remove(key);
        Ok(())
    }
}

pub struct TestApp {
    pub state: AppState,
    pub inventory: Arc<StubInventory>,
    pub payments: Arc<StubPayments>,
    pub notifier: Arc<RecordingNotifier>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_inventory(StubInventory::default())
    }

    pub fn with_inventory(inventory: StubInventory) -> Self {
        let inventory = Arc::new(inventory);
        let payments = Arc::new(StubPayments::default());
        let notifier = Arc::new(RecordingNotifier::default());

        let deps = OrchestratorDeps {
            repository: Arc::new(InMemoryOrders::default()),
            prices: Arc::new(FixedPrices),
            inventory: inventory.clone(),
            notifier: notifier.clone(),
            payments: payments.clone(),
            publisher: Arc::new(DiscardPublisher),
            cache: CacheAside::new(Arc::new(MemoryCache::default())),
        };
        let orchestrator = OrderOrchestrator::new(
            deps,
            OrchestratorSettings::default(),
            OrderMetrics::new().unwrap(),
        );

        Self {
            state: AppState::new(orchestrator),
            inventory,
            payments,
            notifier,
        }
    }
}
