pub mod app_config;
pub mod database;
pub mod events;
pub mod order_repo;
pub mod redis_cache;

pub use app_config::Config;
pub use database::DbClient;
pub use events::KafkaEventPublisher;
pub use order_repo::PostgresOrderRepository;
pub use redis_cache::RedisCacheStore;
