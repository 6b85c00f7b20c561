pub mod app_config;
pub mod database;
pub mod idempotency_repo;
pub mod memory;
pub mod redis_repo;
pub mod seat_repo;

pub use database::DbClient;
pub use idempotency_repo::PgIdempotencyStore;
pub use memory::{MemoryCache, MemoryIdempotencyStore, MemoryStore};
pub use redis_repo::RedisClient;
pub use seat_repo::PgStateStore;
