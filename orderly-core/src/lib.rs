pub mod cache;
pub mod dependency;
pub mod error;
pub mod events;
pub mod payment;
pub mod repository;
pub mod resilience;

pub use cache::{CacheAside, CacheComputeError, CacheStore};
pub use dependency::{InventoryGateway, NotificationGateway, PriceLookup};
pub use error::{
    CacheError, DependencyError, OrderError, Outcome, PersistenceError, PublishError,
};
pub use events::{publish_json, EventPublisher, TopicConfig};
pub use payment::{PaymentGateway, PaymentHandle, PaymentRecord};
pub use repository::OrderRepository;
pub use resilience::{BreakerConfig, CircuitBreaker, CircuitState, ResilienceError, RetryPolicy, TripPolicy};

pub type OrderResult<T> = Result<T, OrderError>;
