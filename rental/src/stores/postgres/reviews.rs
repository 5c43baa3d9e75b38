//! `PostgreSQL` review repository.

use super::conflict_on_unique;
use crate::error::Result;
use crate::reviews::{Review, ReviewRepository};
use crate::types::{CarId, ReviewId, UserId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

/// `PostgreSQL` review repository.
///
/// The `(car_id, user_id)` unique index backs the one-review-per-car rule.
#[derive(Clone)]
pub struct PostgresReviewRepository {
    pool: PgPool,
}

impl PostgresReviewRepository {
    /// Create a new repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct ReviewRow {
    id: Uuid,
    car_id: Uuid,
    user_id: Uuid,
    user_name: String,
    user_email: String,
    rating: i16,
    comment: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ReviewRow> for Review {
    fn from(row: ReviewRow) -> Self {
        Self {
            id: ReviewId::from_uuid(row.id),
            car_id: CarId::from_uuid(row.car_id),
            user_id: UserId::from_uuid(row.user_id),
            user_name: row.user_name,
            user_email: row.user_email,
            rating: row.rating,
            comment: row.comment,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[async_trait]
impl ReviewRepository for PostgresReviewRepository {
    async fn insert(&self, review: Review) -> Result<Review> {
        sqlx::query(
            "INSERT INTO reviews \
             (id, car_id, user_id, user_name, user_email, rating, comment, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(review.id.as_uuid())
        .bind(review.car_id.as_uuid())
        .bind(review.user_id.as_uuid())
        .bind(&review.user_name)
        .bind(&review.user_email)
        .bind(review.rating)
        .bind(&review.comment)
        .bind(review.created_at)
        .bind(review.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "Review already exists"))?;

        Ok(review)
    }

    async fn exists(&self, car_id: CarId, user_id: UserId) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM reviews WHERE car_id = $1 AND user_id = $2)",
        )
        .bind(car_id.as_uuid())
        .bind(user_id.as_uuid())
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn list_for_car(&self, car_id: CarId) -> Result<Vec<Review>> {
        let rows = sqlx::query_as::<_, ReviewRow>(
            "SELECT id, car_id, user_id, user_name, user_email, rating, comment, created_at, updated_at \
             FROM reviews WHERE car_id = $1 ORDER BY created_at DESC, id DESC",
        )
        .bind(car_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Review::from).collect())
    }

    async fn ratings_for_car(&self, car_id: CarId) -> Result<Vec<i16>> {
        let ratings = sqlx::query_scalar("SELECT rating FROM reviews WHERE car_id = $1")
            .bind(car_id.as_uuid())
            .fetch_all(&self.pool)
            .await?;
        Ok(ratings)
    }
}
