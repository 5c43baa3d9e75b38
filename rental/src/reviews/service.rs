//! Review submission and rating re-aggregation.

use super::model::{Review, ReviewInput};
use super::rating::RatingSummary;
use super::repository::ReviewRepository;
use crate::catalog::CarRepository;
use crate::environment::Clock;
use crate::error::{RentalError, Result};
use crate::identity::Identity;
use crate::metrics;
use crate::types::{CarId, ReviewId};
use std::sync::Arc;

/// Message for a second review of the same car by the same user.
pub const DUPLICATE_REVIEW: &str = "You have already reviewed this car";

/// Review operations.
#[derive(Clone)]
pub struct ReviewService {
    reviews: Arc<dyn ReviewRepository>,
    cars: Arc<dyn CarRepository>,
    clock: Arc<dyn Clock>,
}

impl ReviewService {
    /// Create the service.
    #[must_use]
    pub fn new(
        reviews: Arc<dyn ReviewRepository>,
        cars: Arc<dyn CarRepository>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            reviews,
            cars,
            clock,
        }
    }

    /// Write a review and refresh the car's rating aggregate.
    ///
    /// The aggregate is recomputed from every stored rating of the car.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - The car does not exist → `RentalError::NotFound`
    /// - The author already reviewed this car → `RentalError::Conflict`
    /// - A store call fails
    pub async fn create(&self, author: &Identity, input: ReviewInput) -> Result<(Review, RatingSummary)> {
        if self.cars.find(input.car_id).await?.is_none() {
            return Err(RentalError::not_found("Car", input.car_id));
        }

        if self.reviews.exists(input.car_id, author.user_id).await? {
            return Err(RentalError::Conflict(DUPLICATE_REVIEW.to_string()));
        }

        let now = self.clock.now();
        let review = Review {
            id: ReviewId::new(),
            car_id: input.car_id,
            user_id: author.user_id,
            user_name: author.display_name(),
            user_email: author.email.clone(),
            rating: input.rating,
            comment: input.comment,
            created_at: now,
            updated_at: now,
        };

        // The unique (car, user) constraint catches the race the check above misses.
        let review = self.reviews.insert(review).await.map_err(|e| match e {
            RentalError::Conflict(_) => RentalError::Conflict(DUPLICATE_REVIEW.to_string()),
            other => other,
        })?;

        let summary = self.refresh_rating(review.car_id).await?;

        metrics::record_review_created();
        tracing::info!(
            review_id = %review.id,
            car_id = %review.car_id,
            rating = review.rating,
            average_rating = summary.average_rating,
            total_reviews = summary.total_reviews,
            "Review created"
        );

        Ok((review, summary))
    }

    /// Recompute and store the rating aggregate of a car.
    ///
    /// # Errors
    ///
    /// Returns error if a store call fails.
    pub async fn refresh_rating(&self, car_id: CarId) -> Result<RatingSummary> {
        let ratings = self.reviews.ratings_for_car(car_id).await?;
        let summary = RatingSummary::from_ratings(&ratings);
        self.cars.update_rating(car_id, summary).await?;
        Ok(summary)
    }

    /// Reviews of a car, newest first.
    ///
    /// # Errors
    ///
    /// Returns error if the database query fails.
    pub async fn list_for_car(&self, car_id: CarId) -> Result<Vec<Review>> {
        self.reviews.list_for_car(car_id).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::environment::test_clock;
    use crate::mocks::fixtures::{car, identity};
    use crate::mocks::{MockCarRepository, MockReviewRepository};

    async fn setup() -> (ReviewService, Arc<MockCarRepository>, CarId) {
        let cars = Arc::new(MockCarRepository::new());
        let car = cars.insert(car(100)).await.unwrap();
        let service = ReviewService::new(
            Arc::new(MockReviewRepository::new()),
            cars.clone(),
            Arc::new(test_clock()),
        );
        (service, cars, car.id)
    }

    fn input(car_id: CarId, rating: i16) -> ReviewInput {
        ReviewInput {
            car_id,
            rating,
            comment: "Clean, quiet and on time".to_string(),
        }
    }

    #[tokio::test]
    async fn test_aggregate_follows_reviews() {
        let (service, cars, car_id) = setup().await;

        service.create(&identity("ada"), input(car_id, 5)).await.unwrap();
        let (_, summary) = service.create(&identity("bob"), input(car_id, 4)).await.unwrap();
        assert_eq!(summary.average_rating, 4.5);

        let (_, summary) = service.create(&identity("cy"), input(car_id, 4)).await.unwrap();
        assert_eq!(summary.total_reviews, 3);
        assert_eq!(summary.average_rating, 4.3);

        let stored = cars.find(car_id).await.unwrap().unwrap();
        assert_eq!(stored.total_reviews, 3);
        assert_eq!(stored.average_rating, 4.3);
    }

    #[tokio::test]
    async fn test_duplicate_review_leaves_everything_unchanged() {
        let (service, cars, car_id) = setup().await;
        let ada = identity("ada");

        let (first, _) = service.create(&ada, input(car_id, 5)).await.unwrap();
        let err = service.create(&ada, input(car_id, 1)).await.unwrap_err();
        assert_eq!(err, RentalError::Conflict(DUPLICATE_REVIEW.to_string()));

        let reviews = service.list_for_car(car_id).await.unwrap();
        assert_eq!(reviews, vec![first]);
        let stored = cars.find(car_id).await.unwrap().unwrap();
        assert_eq!(stored.average_rating, 5.0);
        assert_eq!(stored.total_reviews, 1);
    }

    #[tokio::test]
    async fn test_unknown_car() {
        let (service, _, _) = setup().await;
        let err = service
            .create(&identity("ada"), input(CarId::new(), 5))
            .await
            .unwrap_err();
        assert!(matches!(err, RentalError::NotFound { resource: "Car", .. }));
    }

    #[tokio::test]
    async fn test_author_snapshot() {
        let (service, _, car_id) = setup().await;
        let (review, _) = service.create(&identity("ada"), input(car_id, 5)).await.unwrap();
        assert_eq!(review.user_name, "Ada Tester");
        assert_eq!(review.user_email, "ada@example.com");
    }
}
