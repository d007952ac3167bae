//! Delivery backplane implementations.

pub mod local;
pub mod redis_relay;

pub use local::LocalBackplane;
#[cfg(feature = "redis-pubsub")]
pub use redis_relay::RedisRelay;
