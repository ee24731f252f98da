#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use orderly_core::{
    CacheAside, CacheError, CacheStore, DependencyError, EventPublisher, InventoryGateway,
    NotificationGateway, OrderRepository, PaymentGateway, PaymentHandle, PaymentRecord,
    PersistenceError, PriceLookup, PublishError, TopicConfig,
};
use orderly_order::{OrchestratorDeps, OrchestratorSettings, OrderMetrics, OrderOrchestrator};
use orderly_shared::{AvailabilityResult, NewOrder, Order, OrderId, OrderUpdate, StatusChangeEvent};
use rust_decimal::Decimal;

#[derive(Default)]
pub struct FakeRepository {
    orders: Mutex<BTreeMap<OrderId, Order>>,
    next_id: AtomicI64,
    pub inserts: AtomicUsize,
    pub reads: AtomicUsize,
    pub failing: AtomicBool,
}

impl FakeRepository {
    pub fn seed(&self, order: Order) {
        self.orders.lock().unwrap().insert(order.id, order);
    }

    pub fn stored(&self, id: OrderId) -> Option<Order> {
        self.orders.lock().unwrap().get(&id).cloned()
    }

    fn check(&self) -> Result<(), PersistenceError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(PersistenceError::Database("connection reset".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl OrderRepository for FakeRepository {
    async fn insert_order(&self, order: &NewOrder, total_price: Decimal) -> Result<Order, PersistenceError> {
        self.check()?;
        self.inserts.fetch_add(1, Ordering::SeqCst);
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let order = order.clone().into_order(id, total_price, Utc::now());
        self.seed(order.clone());
        Ok(order)
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>, PersistenceError> {
        self.check()?;
        self.reads.fetch_add(1, Ordering::SeqCst);
        Ok(self.stored(id))
    }

    async fn list_orders(&self) -> Result<Vec<Order>, PersistenceError> {
        self.check()?;
        Ok(self.orders.lock().unwrap().values().rev().cloned().collect())
    }

    async fn update_order(&self, id: OrderId, update: &OrderUpdate) -> Result<Order, PersistenceError> {
        self.check()?;
        let mut orders = self.orders.lock().unwrap();
        let existing = orders.get(&id).ok_or(PersistenceError::NotFound(id))?;
        let updated = update.clone().apply_to(id, existing.created_at);
        orders.insert(id, updated.clone());
        Ok(updated)
    }

    async fn update_status(&self, id: OrderId, status: &str) -> Result<(), PersistenceError> {
        self.check()?;
        let mut orders = self.orders.lock().unwrap();
        let order = orders.get_mut(&id).ok_or(PersistenceError::NotFound(id))?;
        order.status = status.to_string();
        Ok(())
    }

    async fn delete_order(&self, id: OrderId) -> Result<(), PersistenceError> {
        self.check()?;
        self.orders
            .lock()
            .unwrap()
            .remove(&id)
            .map(|_| ())
            .ok_or(PersistenceError::NotFound(id))
    }
}

#[derive(Default)]
pub struct FakeInventory {
    pub out_of_stock: HashSet<i64>,
    pub slow: HashMap<i64, Duration>,
    pub failing: AtomicBool,
    pub calls: AtomicUsize,
}

#[async_trait]
impl InventoryGateway for FakeInventory {
    async fn check_availability(&self, product_id: i64, _quantity: i32) -> Result<AvailabilityResult, DependencyError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.slow.get(&product_id) {
            tokio::time::sleep(*delay).await;
        }
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

pub struct FakePrices {
    pub unit_price: Decimal,
    pub failing: AtomicBool,
    pub calls: AtomicUsize,
}

impl Default for FakePrices {
    fn default() -> Self {
        Self {
            unit_price: Decimal::new(1000, 2),
            failing: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl PriceLookup for FakePrices {
    async fn unit_price(&self, _product_id: i64) -> Result<Decimal, DependencyError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(DependencyError::Status {
                service: "product-service".into(),
                status: 500,
            });
        }
        Ok(self.unit_price)
    }
}

#[derive(Default)]
pub struct FakeNotifier {
    pub created: Mutex<Vec<OrderId>>,
    pub status_changes: Mutex<Vec<StatusChangeEvent>>,
    pub failing: AtomicBool,
}

impl FakeNotifier {
    fn check(&self) -> Result<(), DependencyError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(DependencyError::Status {
                service: "notification-service".into(),
                status: 503,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl NotificationGateway for FakeNotifier {
    async fn notify_order_created(&self, order_id: OrderId) -> Result<(), DependencyError> {
        self.created.lock().unwrap().push(order_id);
        self.check()
    }

    async fn notify_status_changed(&self, event: &StatusChangeEvent) -> Result<(), DependencyError> {
        self.status_changes.lock().unwrap().push(event.clone());
        self.check()
    }
}

#[derive(Default)]
pub struct FakePayments {
    pub failing: AtomicBool,
    pub calls: AtomicUsize,
}

#[async_trait]
impl PaymentGateway for FakePayments {
    async fn create_payment(&self, order: &Order, amount: Decimal, currency: &str) -> Result<PaymentHandle, DependencyError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(DependencyError::CircuitOpen {
                service: "payment-service".into(),
            });
        }
        Ok(PaymentHandle {
            payment: PaymentRecord {
                id: 100 + order.id,
                order_id: order.id,
                customer_id: order.customer_id,
                amount,
                currency: currency.to_string(),
                status: "pending".into(),
                stripe_payment_id: Some(format!("pi_{}", order.id)),
                payment_method: None,
                created_at: None,
                updated_at: None,
            },
            client_secret: Some("secret".into()),
            message: None,
        })
    }
}

#[derive(Default)]
pub struct FakePublisher {
    pub events: Mutex<Vec<(TopicConfig, serde_json::Value)>>,
    pub failing: AtomicBool,
}

#[async_trait]
impl EventPublisher for FakePublisher {
    async fn publish_bytes(&self, topic: &TopicConfig, payload: Vec<u8>) -> Result<(), PublishError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(PublishError::Broker {
                topic: topic.exchange.clone(),
                message: "broker down".into(),
            });
        }
        let value = serde_json::from_slice(&payload).map_err(|e| PublishError::Serialization(e.to_string()))?;
        self.events.lock().unwrap().push((topic.clone(), value));
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryCache {
    pub entries: Mutex<HashMap<String, String>>,
    pub down: AtomicBool,
}

impl MemoryCache {
    fn check(&self) -> Result<(), CacheError> {
        if self.down.load(Ordering::SeqCst) {
            return Err(CacheError::Unavailable("connection refused".into()));
        }
        Ok(())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.lock().unwrap().contains_key(key)
    }
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        self.check()?;
        Ok(self.entries.lock().unwrap().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str, _ttl: Duration) -> Result<(), CacheError> {
        self.check()?;
        self.entries.lock().unwrap().insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.check()?;
        self.entries.lock().unwrap().remove(key);
        Ok(())
    }
}

pub struct Harness {
    pub orchestrator: OrderOrchestrator,
    pub repository: Arc<FakeRepository>,
    pub inventory: Arc<FakeInventory>,
    pub prices: Arc<FakePrices>,
    pub notifier: Arc<FakeNotifier>,
    pub payments: Arc<FakePayments>,
    pub publisher: Arc<FakePublisher>,
    pub cache: Arc<MemoryCache>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with(FakeInventory::default(), OrchestratorSettings::default())
    }

    pub fn with(inventory: FakeInventory, settings: OrchestratorSettings) -> Self {
        Self::build(inventory, FakePrices::default(), settings)
    }

    pub fn with_unit_price(unit_price: Decimal) -> Self {
        let prices = FakePrices {
            unit_price,
            ..Default::default()
        };
        Self::build(FakeInventory::default(), prices, OrchestratorSettings::default())
    }

    fn build(inventory: FakeInventory, prices: FakePrices, settings: OrchestratorSettings) -> Self {
        let repository = Arc::new(FakeRepository::default());
        let inventory = Arc::new(inventory);
        let prices = Arc::new(prices);
        let notifier = Arc::new(FakeNotifier::default());
        let payments = Arc::new(FakePayments::default());
        let publisher = Arc::new(FakePublisher::default());
        let cache = Arc::new(MemoryCache::default());

        let deps = OrchestratorDeps {
            repository: repository.clone(),
            prices: prices.clone(),
            inventory: inventory.clone(),
            notifier: notifier.clone(),
            payments: payments.clone(),
            publisher: publisher.clone(),
            cache: CacheAside::new(cache.clone()),
        };
        let metrics = OrderMetrics::new().unwrap();

        Self {
            orchestrator: OrderOrchestrator::new(deps, settings, metrics),
            repository,
            inventory,
            prices,
            notifier,
            payments,
            publisher,
            cache,
        }
    }

    pub fn published(&self) -> usize {
        self.publisher.events.lock().unwrap().len()
    }

    pub fn created_notifications(&self) -> Vec<OrderId> {
        self.notifier.created.lock().unwrap().clone()
    }

    pub fn status_notifications(&self) -> Vec<StatusChangeEvent> {
        self.notifier.status_changes.lock().unwrap().clone()
    }
}
