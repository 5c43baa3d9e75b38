//! Production store implementations.
//!
//! - [`postgres`]: cars, users, orders and reviews in `PostgreSQL` via `sqlx`
//! - [`redis`]: bearer-token sessions in Redis with TTL expiry

pub mod postgres;
pub mod redis;

pub use postgres::{
    PostgresCarRepository, PostgresOrderRepository, PostgresProbe, PostgresReviewRepository,
    PostgresUserRepository,
};
pub use redis::RedisSessionStore;
