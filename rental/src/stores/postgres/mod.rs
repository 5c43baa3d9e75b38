//! `PostgreSQL` repositories.
//!
//! Queries are built at runtime (`sqlx::query_as` and `QueryBuilder`), so
//! the crate builds without a live database. Enumerations are stored as
//! their lowercase literal and money as integer cents.
//!
//! ```no_run
//! use car_rental::stores::postgres::{self, PostgresCarRepository};
//! use sqlx::PgPool;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let pool = PgPool::connect("postgres://localhost/car_rental").await?;
//! postgres::migrate(&pool).await?;
//! let cars = PostgresCarRepository::new(pool);
//! # Ok(())
//! # }
//! ```

mod cars;
mod orders;
mod reviews;
mod users;

pub use cars::PostgresCarRepository;
pub use orders::PostgresOrderRepository;
pub use reviews::PostgresReviewRepository;
pub use users::PostgresUserRepository;

use crate::error::{RentalError, Result};
use crate::server::health::ReadinessProbe;
use crate::types::Money;
use async_trait::async_trait;
use sqlx::PgPool;
use std::str::FromStr;

/// Run the embedded migrations.
///
/// # Errors
///
/// Returns error if a migration fails.
pub async fn migrate(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| RentalError::Database(format!("Migration failed: {e}")))
}

/// Database readiness check.
#[derive(Clone)]
pub struct PostgresProbe {
    pool: PgPool,
}

impl PostgresProbe {
    /// Create a probe over `pool`.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReadinessProbe for PostgresProbe {
    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

fn money_from_cents(cents: i64) -> Result<Money> {
    u64::try_from(cents)
        .map(Money::from_cents)
        .map_err(|_| RentalError::Database(format!("negative amount in database: {cents}")))
}

fn cents(amount: Money) -> Result<i64> {
    i64::try_from(amount.cents())
        .map_err(|_| RentalError::Validation(format!("amount too large: {amount}")))
}

fn parse_literal<T: FromStr>(value: &str, column: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| RentalError::Database(format!("unexpected {column} value: {value}")))
}

/// Map a unique violation to `Conflict(message)`, anything else to `Database`.
fn conflict_on_unique(err: sqlx::Error, message: &str) -> RentalError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            return RentalError::Conflict(message.to_string());
        }
    }
    RentalError::from(err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_money_columns() {
        assert_eq!(money_from_cents(35_000).ok(), Some(Money::from_cents(35_000)));
        assert!(money_from_cents(-1).is_err());
        assert_eq!(cents(Money::from_cents(1)).ok(), Some(1));
        assert!(cents(Money::from_cents(u64::MAX)).is_err());
    }

    #[test]
    fn test_literal_columns() {
        let status: Result<crate::types::OrderStatus> = parse_literal("paid", "status");
        assert_eq!(status.ok(), Some(crate::types::OrderStatus::Paid));
        let status: Result<crate::types::OrderStatus> = parse_literal("refunded", "status");
        assert!(matches!(status, Err(RentalError::Database(_))));
    }

    #[test]
    fn test_non_database_errors_are_not_conflicts() {
        let err = conflict_on_unique(sqlx::Error::RowNotFound, "dup");
        assert!(matches!(err, RentalError::Database(_)));
    }
}
