use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::booking::{Booking, BookingStatus};
use crate::service::{ServiceInfo, ServiceRef};
use crate::{CoreError, CoreResult};

pub const MIN_RATING: i32 = 1;
pub const MAX_RATING: i32 = 5;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: i64,
    pub booking_id: i64,
    pub user_id: i64,
    #[serde(flatten)]
    pub service: ServiceRef,
    pub guide_id: Option<i64>,
    pub rating: i32,
    pub title: Option<String>,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewRequest {
    pub booking_id: i64,
    pub rating: i32,
    pub title: Option<String>,
    pub comment: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewReview {
    pub booking_id: i64,
    pub user_id: i64,
    pub service: ServiceRef,
    pub guide_id: Option<i64>,
    pub rating: i32,
    pub title: Option<String>,
    pub comment: Option<String>,
}

impl NewReview {
    /// Builds the review for a booking the caller owns. Only completed
    /// bookings can be rated.
    pub fn for_booking(request: ReviewRequest, booking: &Booking, service: &ServiceInfo) -> CoreResult<Self> {
        if booking.status != BookingStatus::Completed {
            return Err(CoreError::validation("Only completed bookings can be rated"));
        }
        if !(MIN_RATING..=MAX_RATING).contains(&request.rating) {
            return Err(CoreError::validation(format!(
                "rating must be between {} and {}",
                MIN_RATING, MAX_RATING
            )));
        }

        let clean = |v: Option<String>| v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
        Ok(Self {
            booking_id: booking.id,
            user_id: booking.user_id,
            service: booking.service,
            guide_id: service.guide_id,
            rating: request.rating,
            title: clean(request.title),
            comment: clean(request.comment),
        })
    }
}

/// Error raised by stores when a booking already carries a review.
pub fn already_rated() -> CoreError {
    CoreError::validation("Booking already rated")
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingSummary {
    pub average_rating: Option<f64>,
    pub review_count: u64,
}

impl RatingSummary {
    pub fn from_ratings(ratings: impl IntoIterator<Item = i32>) -> Self {
        let (sum, count) = ratings
            .into_iter()
            .fold((0i64, 0u64), |(sum, count), r| (sum + i64::from(r), count + 1));
        Self {
            average_rating: (count > 0).then(|| sum as f64 / count as f64),
            review_count: count,
        }
    }
}
