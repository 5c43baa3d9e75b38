//! Catalog query surface: filter, sort and page parameters.
//!
//! Query-string parameters arrive as strings and are parsed here into a
//! typed [`CarQuery`]. The same `CarFilter::matches` / `SortKey` logic backs
//! the in-memory store, while the `PostgreSQL` store turns the query into SQL.

use super::model::Car;
use crate::error::{RentalError, Result};
use crate::types::{CarType, FuelType, Money, Transmission};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::str::FromStr;

/// Default page size.
pub const DEFAULT_LIMIT: u32 = 10;
/// Largest accepted page size.
pub const MAX_LIMIT: u32 = 100;

/// Raw `GET /api/cars` query string.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CarListParams {
    /// Body type, or `all`
    pub car_type: Option<String>,
    /// Case-insensitive substring of the location
    pub location: Option<String>,
    /// Lower price bound (inclusive)
    pub min_price: Option<String>,
    /// Upper price bound (inclusive)
    pub max_price: Option<String>,
    /// Gearbox, or `all`
    pub transmission: Option<String>,
    /// Fuel type, or `all`
    pub fuel_type: Option<String>,
    /// Minimum seat count
    pub seats: Option<String>,
    /// Include cars that are not bookable
    pub show_unavailable: Option<String>,
    /// Sort column
    pub sort_by: Option<String>,
    /// `asc` or `desc`
    pub sort_order: Option<String>,
    /// 1-based page
    pub page: Option<String>,
    /// Page size
    pub limit: Option<String>,
}

/// Filter predicate over cars.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CarFilter {
    /// Body type
    pub car_type: Option<CarType>,
    /// Location substring, lowercase
    pub location: Option<String>,
    /// Lower price bound
    pub min_price: Option<Money>,
    /// Upper price bound
    pub max_price: Option<Money>,
    /// Gearbox
    pub transmission: Option<Transmission>,
    /// Fuel type
    pub fuel_type: Option<FuelType>,
    /// Minimum seats
    pub min_seats: Option<i32>,
    /// Include unavailable cars
    pub include_unavailable: bool,
}

impl CarFilter {
    /// Whether `car` satisfies every set criterion.
    #[must_use]
    pub fn matches(&self, car: &Car) -> bool {
        if !self.include_unavailable && !car.is_available {
            return false;
        }
        if self.car_type.is_some_and(|t| t != car.car_type) {
            return false;
        }
        if self.transmission.is_some_and(|t| t != car.transmission) {
            return false;
        }
        if self.fuel_type.is_some_and(|f| f != car.fuel_type) {
            return false;
        }
        if self.min_seats.is_some_and(|s| car.seats < s) {
            return false;
        }
        if self.min_price.is_some_and(|p| car.price_per_day < p) {
            return false;
        }
        if self.max_price.is_some_and(|p| car.price_per_day > p) {
            return false;
        }
        if let Some(location) = &self.location {
            if !car.location.to_lowercase().contains(location) {
                return false;
            }
        }
        true
    }
}

/// Sortable columns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortKey {
    /// Listing date
    #[default]
    CreatedAt,
    /// Daily price
    PricePerDay,
    /// Review average
    AverageRating,
    /// Model year
    Year,
    /// Seat count
    Seats,
}

impl SortKey {
    /// Column name in the `cars` table.
    #[must_use]
    pub const fn column(&self) -> &'static str {
        match self {
            Self::CreatedAt => "created_at",
            Self::PricePerDay => "price_per_day_cents",
            Self::AverageRating => "average_rating",
            Self::Year => "year",
            Self::Seats => "seats",
        }
    }

    /// Ascending comparison of two cars on this key.
    #[must_use]
    pub fn compare(&self, a: &Car, b: &Car) -> Ordering {
        match self {
            Self::CreatedAt => a.created_at.cmp(&b.created_at),
            Self::PricePerDay => a.price_per_day.cmp(&b.price_per_day),
            Self::AverageRating => a.average_rating.total_cmp(&b.average_rating),
            Self::Year => a.year.cmp(&b.year),
            Self::Seats => a.seats.cmp(&b.seats),
        }
    }
}

impl FromStr for SortKey {
    type Err = RentalError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "createdAt" => Ok(Self::CreatedAt),
            "pricePerDay" => Ok(Self::PricePerDay),
            "averageRating" => Ok(Self::AverageRating),
            "year" => Ok(Self::Year),
            "seats" => Ok(Self::Seats),
            other => Err(RentalError::Validation(format!(
                "Cannot sort by '{other}'"
            ))),
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    /// Smallest first
    Asc,
    /// Largest first
    #[default]
    Desc,
}

impl SortOrder {
    /// SQL keyword.
    #[must_use]
    pub const fn as_sql(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// A parsed catalog query.
#[derive(Debug, Clone, PartialEq)]
pub struct CarQuery {
    /// Filter
    pub filter: CarFilter,
    /// Sort column
    pub sort_by: SortKey,
    /// Sort direction
    pub sort_order: SortOrder,
    /// 1-based page
    pub page: u32,
    /// Page size
    pub limit: u32,
}

impl Default for CarQuery {
    fn default() -> Self {
        Self {
            filter: CarFilter::default(),
            sort_by: SortKey::default(),
            sort_order: SortOrder::default(),
            page: 1,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl CarQuery {
    /// Rows to skip.
    #[must_use]
    pub const fn offset(&self) -> u64 {
        (self.page as u64 - 1) * self.limit as u64
    }

    /// Sort a slice of cars in place. Ties fall back to id for a stable order.
    pub fn sort(&self, cars: &mut [Car]) {
        cars.sort_by(|a, b| {
            let ordering = self
                .sort_by
                .compare(a, b)
                .then_with(|| a.id.as_uuid().cmp(b.id.as_uuid()));
            match self.sort_order {
                SortOrder::Asc => ordering,
                SortOrder::Desc => ordering.reverse(),
            }
        });
    }
}

impl TryFrom<CarListParams> for CarQuery {
    type Error = RentalError;

    fn try_from(params: CarListParams) -> Result<Self> {
        let filter = CarFilter {
            car_type: parse_choice(params.car_type.as_deref(), "carType")?,
            location: non_empty(params.location.as_deref()).map(str::to_lowercase),
            min_price: parse_price(params.min_price.as_deref(), "minPrice")?,
            max_price: parse_price(params.max_price.as_deref(), "maxPrice")?,
            transmission: parse_choice(params.transmission.as_deref(), "transmission")?,
            fuel_type: parse_choice(params.fuel_type.as_deref(), "fuelType")?,
            min_seats: parse_number(params.seats.as_deref(), "seats")?,
            include_unavailable: non_empty(params.show_unavailable.as_deref())
                .is_some_and(|v| v.eq_ignore_ascii_case("true")),
        };

        if let (Some(min), Some(max)) = (filter.min_price, filter.max_price) {
            if min > max {
                return Err(RentalError::Validation(
                    "minPrice cannot exceed maxPrice".to_string(),
                ));
            }
        }

        let sort_by = non_empty(params.sort_by.as_deref())
            .map(str::parse::<SortKey>)
            .transpose()?
            .unwrap_or_default();
        let sort_order = match non_empty(params.sort_order.as_deref()) {
            None | Some("desc") => SortOrder::Desc,
            Some("asc") => SortOrder::Asc,
            Some(_) => {
                return Err(RentalError::Validation(
                    "sortOrder must be 'asc' or 'desc'".to_string(),
                ));
            }
        };

        let page = parse_number::<u32>(params.page.as_deref(), "page")?
            .unwrap_or(1)
            .max(1);
        let limit = parse_number::<u32>(params.limit.as_deref(), "limit")?
            .unwrap_or(DEFAULT_LIMIT)
            .clamp(1, MAX_LIMIT);

        Ok(Self {
            filter,
            sort_by,
            sort_order,
            page,
            limit,
        })
    }
}

/// Pagination block of a listing response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    /// Current page
    pub page: u32,
    /// Page size
    pub limit: u32,
    /// Matching cars across all pages
    pub total_count: u64,
    /// Number of pages
    pub total_pages: u64,
    /// Another page follows
    pub has_next_page: bool,
    /// A page precedes
    pub has_prev_page: bool,
}

impl Pagination {
    /// Compute pagination for `total_count` matches.
    #[must_use]
    pub fn new(page: u32, limit: u32, total_count: u64) -> Self {
        let total_pages = total_count.div_ceil(u64::from(limit.max(1)));
        Self {
            page,
            limit,
            total_count,
            total_pages,
            has_next_page: u64::from(page) < total_pages,
            has_prev_page: page > 1,
        }
    }
}

/// One page of cars.
#[derive(Debug, Clone, PartialEq)]
pub struct CarPage {
    /// Cars on this page
    pub cars: Vec<Car>,
    /// Matches across all pages
    pub total_count: u64,
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn parse_choice<T: FromStr>(value: Option<&str>, name: &str) -> Result<Option<T>> {
    match non_empty(value) {
        None => Ok(None),
        Some(v) if v.eq_ignore_ascii_case("all") => Ok(None),
        Some(v) => v
            .to_lowercase()
            .parse()
            .map(Some)
            .map_err(|_| RentalError::Validation(format!("Invalid {name} '{v}'"))),
    }
}

fn parse_number<T: FromStr>(value: Option<&str>, name: &str) -> Result<Option<T>> {
    non_empty(value)
        .map(|v| {
            v.parse()
                .map_err(|_| RentalError::Validation(format!("{name} must be a number")))
        })
        .transpose()
}

fn parse_price(value: Option<&str>, name: &str) -> Result<Option<Money>> {
    parse_number::<f64>(value, name)?
        .map(|amount| {
            Money::from_major_f64(amount).ok_or_else(|| {
                RentalError::Validation(format!("{name} must be a non-negative number"))
            })
        })
        .transpose()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::mocks::fixtures::car;

    fn params(pairs: &[(&str, &str)]) -> CarListParams {
        let object = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), serde_json::Value::from(*v)))
            .collect();
        serde_json::from_value(serde_json::Value::Object(object)).unwrap()
    }

    #[test]
    fn test_defaults() {
        let query = CarQuery::try_from(CarListParams::default()).unwrap();
        assert_eq!(query, CarQuery::default());
        assert_eq!(query.sort_order, SortOrder::Desc);
        assert!(!query.filter.include_unavailable);
    }

    #[test]
    fn test_limit_and_page_are_clamped() {
        let query = CarQuery::try_from(params(&[("page", "0"), ("limit", "500")])).unwrap();
        assert_eq!(query.page, 1);
        assert_eq!(query.limit, MAX_LIMIT);
        assert_eq!(query.offset(), 0);

        let query = CarQuery::try_from(params(&[("page", "3"), ("limit", "0")])).unwrap();
        assert_eq!(query.limit, 1);
        assert_eq!(query.offset(), 2);
    }

    #[test]
    fn test_filters_parse() {
        let query = CarQuery::try_from(params(&[
            ("carType", "SUV"),
            ("transmission", "all"),
            ("fuelType", "hybrid"),
            ("location", " Berl "),
            ("minPrice", "50"),
            ("maxPrice", "120.5"),
            ("seats", "5"),
            ("showUnavailable", "true"),
            ("sortBy", "pricePerDay"),
            ("sortOrder", "asc"),
        ]))
        .unwrap();

        assert_eq!(query.filter.car_type, Some(CarType::Suv));
        assert_eq!(query.filter.transmission, None);
        assert_eq!(query.filter.fuel_type, Some(FuelType::Hybrid));
        assert_eq!(query.filter.location.as_deref(), Some("berl"));
        assert_eq!(query.filter.max_price, Some(Money::from_cents(12_050)));
        assert_eq!(query.filter.min_seats, Some(5));
        assert!(query.filter.include_unavailable);
        assert_eq!(query.sort_by, SortKey::PricePerDay);
        assert_eq!(query.sort_order, SortOrder::Asc);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(CarQuery::try_from(params(&[("sortBy", "licensePlate")])).is_err());
        assert!(CarQuery::try_from(params(&[("carType", "tank")])).is_err());
        assert!(CarQuery::try_from(params(&[("minPrice", "cheap")])).is_err());
        assert!(CarQuery::try_from(params(&[("minPrice", "200"), ("maxPrice", "100")])).is_err());
        assert!(CarQuery::try_from(params(&[("sortOrder", "sideways")])).is_err());
    }

    #[test]
    fn test_filter_matches() {
        let mut unavailable = car(100);
        unavailable.is_available = false;
        let available = car(100);

        let filter = CarFilter::default();
        assert!(filter.matches(&available));
        assert!(!filter.matches(&unavailable));

        let filter = CarFilter {
            include_unavailable: true,
            location: Some("berlin".to_string()),
            max_price: Some(Money::from_cents(9_999)),
            ..CarFilter::default()
        };
        assert!(!filter.matches(&available));

        let filter = CarFilter {
            location: Some("erl".to_string()),
            min_seats: Some(5),
            ..CarFilter::default()
        };
        assert!(filter.matches(&available));
    }

    #[test]
    fn test_sort_by_price_descending() {
        let mut cars = vec![car(50), car(150), car(100)];
        let query = CarQuery {
            sort_by: SortKey::PricePerDay,
            ..CarQuery::default()
        };
        query.sort(&mut cars);
        let prices: Vec<u64> = cars.iter().map(|c| c.price_per_day.cents() / 100).collect();
        assert_eq!(prices, vec![150, 100, 50]);
    }

    #[test]
    fn test_pagination() {
        let p = Pagination::new(1, 10, 25);
        assert_eq!(p.total_pages, 3);
        assert!(p.has_next_page);
        assert!(!p.has_prev_page);

        let p = Pagination::new(3, 10, 25);
        assert!(!p.has_next_page);
        assert!(p.has_prev_page);

        let p = Pagination::new(1, 10, 0);
        assert_eq!(p.total_pages, 0);
        assert!(!p.has_next_page);
    }
}
