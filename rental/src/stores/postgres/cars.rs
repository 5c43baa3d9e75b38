//! `PostgreSQL` car repository.

use super::{cents, conflict_on_unique, money_from_cents, parse_literal};
use crate::catalog::{Car, CarFilter, CarPage, CarQuery, CarRepository};
use crate::error::{RentalError, Result};
use crate::reviews::RatingSummary;
use crate::types::CarId;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

const CAR_COLUMNS: &str = "id, brand, model_name, year, transmission, fuel_type, seats, \
     price_per_day_cents, images, description, features, location, is_available, \
     average_rating, total_reviews, mileage, color, license_plate, car_type, \
     created_at, updated_at";

/// `PostgreSQL` car repository.
#[derive(Clone)]
pub struct PostgresCarRepository {
    pool: PgPool,
}

impl PostgresCarRepository {
    /// Create a new repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct CarRow {
    id: Uuid,
    brand: String,
    model_name: String,
    year: i32,
    transmission: String,
    fuel_type: String,
    seats: i32,
    price_per_day_cents: i64,
    images: Vec<String>,
    description: String,
    features: Vec<String>,
    location: String,
    is_available: bool,
    average_rating: f64,
    total_reviews: i32,
    mileage: i32,
    color: String,
    license_plate: String,
    car_type: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<CarRow> for Car {
    type Error = RentalError;

    fn try_from(row: CarRow) -> Result<Self> {
        Ok(Self {
            id: CarId::from_uuid(row.id),
            brand: row.brand,
            model_name: row.model_name,
            year: row.year,
            transmission: parse_literal(&row.transmission, "transmission")?,
            fuel_type: parse_literal(&row.fuel_type, "fuel_type")?,
            seats: row.seats,
            price_per_day: money_from_cents(row.price_per_day_cents)?,
            images: row.images,
            description: row.description,
            features: row.features,
            location: row.location,
            is_available: row.is_available,
            average_rating: row.average_rating,
            total_reviews: row.total_reviews,
            mileage: row.mileage,
            color: row.color,
            license_plate: row.license_plate,
            car_type: parse_literal(&row.car_type, "car_type")?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Append the `WHERE` clause for `filter`.
fn push_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: &CarFilter) -> Result<()> {
    builder.push(" WHERE TRUE");
    if !filter.include_unavailable {
        builder.push(" AND is_available");
    }
    if let Some(car_type) = filter.car_type {
        builder.push(" AND car_type = ").push_bind(car_type.as_str());
    }
    if let Some(transmission) = filter.transmission {
        builder
            .push(" AND transmission = ")
            .push_bind(transmission.as_str());
    }
    if let Some(fuel_type) = filter.fuel_type {
        builder.push(" AND fuel_type = ").push_bind(fuel_type.as_str());
    }
    if let Some(seats) = filter.min_seats {
        builder.push(" AND seats >= ").push_bind(seats);
    }
    if let Some(min) = filter.min_price {
        builder
            .push(" AND price_per_day_cents >= ")
            .push_bind(cents(min)?);
    }
    if let Some(max) = filter.max_price {
        builder
            .push(" AND price_per_day_cents <= ")
            .push_bind(cents(max)?);
    }
    if let Some(location) = &filter.location {
        builder
            .push(" AND strpos(lower(location), ")
            .push_bind(location.clone())
            .push(") > 0");
    }
    Ok(())
}

#[async_trait]
impl CarRepository for PostgresCarRepository {
    async fn find(&self, id: CarId) -> Result<Option<Car>> {
        let row = sqlx::query_as::<_, CarRow>(&format!(
            "SELECT {CAR_COLUMNS} FROM cars WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Car::try_from).transpose()
    }

    async fn search(&self, query: &CarQuery) -> Result<CarPage> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM cars");
        push_filter(&mut count, &query.filter)?;
        let total: i64 = count
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await?;

        let mut select = QueryBuilder::<Postgres>::new(format!("SELECT {CAR_COLUMNS} FROM cars"));
        push_filter(&mut select, &query.filter)?;
        // Column and direction come from closed enums, never from input.
        select
            .push(" ORDER BY ")
            .push(query.sort_by.column())
            .push(" ")
            .push(query.sort_order.as_sql())
            .push(", id ")
            .push(query.sort_order.as_sql())
            .push(" LIMIT ")
            .push_bind(i64::from(query.limit))
            .push(" OFFSET ")
            .push_bind(i64::try_from(query.offset()).unwrap_or(i64::MAX));

        let rows: Vec<CarRow> = select.build_query_as().fetch_all(&self.pool).await?;
        let cars = rows
            .into_iter()
            .map(Car::try_from)
            .collect::<Result<Vec<_>>>()?;

        Ok(CarPage {
            cars,
            total_count: u64::try_from(total).unwrap_or(0),
        })
    }

    async fn insert(&self, mut car: Car) -> Result<Car> {
        car.validate(car.updated_at)?;

        sqlx::query(&format!(
            "INSERT INTO cars ({CAR_COLUMNS}) VALUES \
             ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20, $21)"
        ))
        .bind(car.id.as_uuid())
        .bind(&car.brand)
        .bind(&car.model_name)
        .bind(car.year)
        .bind(car.transmission.as_str())
        .bind(car.fuel_type.as_str())
        .bind(car.seats)
        .bind(cents(car.price_per_day)?)
        .bind(&car.images)
        .bind(&car.description)
        .bind(&car.features)
        .bind(&car.location)
        .bind(car.is_available)
        .bind(car.average_rating)
        .bind(car.total_reviews)
        .bind(car.mileage)
        .bind(&car.color)
        .bind(&car.license_plate)
        .bind(car.car_type.as_str())
        .bind(car.created_at)
        .bind(car.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "A car with this license plate already exists"))?;

        Ok(car)
    }

    async fn update_rating(&self, id: CarId, summary: RatingSummary) -> Result<()> {
        let result = sqlx::query(
            "UPDATE cars SET average_rating = $2, total_reviews = $3, updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(id.as_uuid())
        .bind(summary.average_rating)
        .bind(summary.total_reviews)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RentalError::not_found("Car", id));
        }
        Ok(())
    }
}
