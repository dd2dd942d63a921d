//! Event bus adapters.
//!
//! - `InMemoryEventBus` - synchronous in-process bus for tests and
//!   single-process deployments
//! - `RedisEventBus` - cross-process fan-out over Redis pub/sub

mod in_memory;
mod redis;

pub use in_memory::InMemoryEventBus;
pub use redis::RedisEventBus;
