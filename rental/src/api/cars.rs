//! Catalog endpoints.

use crate::catalog::{Car, CarListParams, CarQuery, Pagination};
use crate::error::RentalError;
use crate::server::AppState;
use crate::types::CarId;
use axum::{
    extract::{Path, Query, State},
    Json,
};
use car_rental_web::AppError;
use serde::Serialize;

/// Body of `GET /api/cars`.
#[derive(Debug, Serialize)]
pub struct CarListResponse {
    /// Always `true`
    pub success: bool,
    /// The requested page
    pub data: Vec<Car>,
    /// Paging metadata
    pub pagination: Pagination,
}

/// Body of `GET /api/cars/:id`.
#[derive(Debug, Serialize)]
pub struct CarResponse {
    /// Always `true`
    pub success: bool,
    /// The car
    pub data: Car,
}

/// List cars with filters, sorting and paging.
///
/// ```bash
/// curl 'http://localhost:8080/api/cars?carType=suv&sortBy=pricePerDay&sortOrder=asc&page=2'
/// ```
///
/// # Errors
///
/// Returns 400 for unknown filter values or sort keys, 500 on store failure.
pub async fn list_cars(
    State(state): State<AppState>,
    Query(params): Query<CarListParams>,
) -> Result<Json<CarListResponse>, AppError> {
    let query = CarQuery::try_from(params)?;
    let page = state.cars.search(&query).await?;

    Ok(Json(CarListResponse {
        success: true,
        data: page.cars,
        pagination: Pagination::new(query.page, query.limit, page.total_count),
    }))
}

/// Fetch one car.
///
/// # Errors
///
/// Returns 400 for a malformed id, 404 when the car does not exist.
pub async fn get_car(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<CarResponse>, AppError> {
    let car_id: CarId = id
        .parse()
        .map_err(|_| AppError::bad_request("Invalid car ID"))?;

    let car = state
        .cars
        .find(car_id)
        .await?
        .ok_or_else(|| RentalError::not_found("Car", car_id))?;

    Ok(Json(CarResponse {
        success: true,
        data: car,
    }))
}
