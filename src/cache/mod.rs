pub mod lock;
pub mod redis_store;
pub mod service;
pub mod store;

pub use lock::{LeaderOutcome, LockService};
pub use redis_store::RedisStore;
pub use service::CacheService;
pub use store::{CoordinationStore, MemoryStore, SharedStore};
