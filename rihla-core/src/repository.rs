use async_trait::async_trait;
use rihla_shared::{Page, PageRequest};

use crate::booking::{Booking, BookingChange, BookingDetailsUpdate, BookingFilter, NewBooking, StatusUpdate};
use crate::content::{ContentDraft, ContentEntry, ContentFilter, ContentKind};
use crate::notification::{NewNotification, Notification, NotificationFilter};
use crate::offer::{OfferFilter, SpecialOffer, SpecialOfferDraft};
use crate::review::{NewReview, RatingSummary, Review};
use crate::service::{ServiceInfo, ServiceRef};
use crate::user::User;
use crate::CoreResult;

/// Repository trait for user accounts
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_user(&self, id: i64) -> CoreResult<Option<User>>;
}

/// Resolves booked services to their display name and provider.
#[async_trait]
pub trait ServiceDirectory: Send + Sync {
    async fn describe(&self, service: ServiceRef) -> CoreResult<Option<ServiceInfo>>;

    /// Every service the given user provides (rooms of their hotels, their
    /// cars, the tours they guide, their tourism programs).
    async fn services_of(&self, provider_user_id: i64) -> CoreResult<Vec<ServiceRef>>;
}

/// Repository trait for bookings and their change log
#[async_trait]
pub trait BookingRepository: Send + Sync {
    async fn create_booking(&self, booking: &NewBooking) -> CoreResult<Booking>;

    async fn get_booking(&self, id: i64) -> CoreResult<Option<Booking>>;

    async fn list_bookings(&self, filter: &BookingFilter, page: PageRequest) -> CoreResult<Page<Booking>>;

    async fn update_details(&self, id: i64, update: &BookingDetailsUpdate) -> CoreResult<Booking>;

    /// Applies the new values and appends the change rows atomically.
    async fn apply_status_update(&self, id: i64, update: &StatusUpdate) -> CoreResult<Booking>;

    async fn list_changes(&self, booking_id: i64) -> CoreResult<Vec<BookingChange>>;

    async fn delete_booking(&self, id: i64) -> CoreResult<bool>;
}

/// Repository trait for reviews
#[async_trait]
pub trait ReviewRepository: Send + Sync {
    /// Fails with "Booking already rated" when the booking has a review.
    async fn create_review(&self, review: &NewReview) -> CoreResult<Review>;

    async fn find_by_booking(&self, booking_id: i64) -> CoreResult<Option<Review>>;

    async fn list_reviews(&self, service: Option<ServiceRef>, page: PageRequest) -> CoreResult<Page<Review>>;

    async fn rating_summary(&self, service: Option<ServiceRef>) -> CoreResult<RatingSummary>;
}

/// Repository trait for per-user notifications. Every call is scoped to the
/// owning user; another user's id behaves as if the row did not exist.
#[async_trait]
pub trait NotificationRepository: Send + Sync {
    async fn create_notification(&self, notification: &NewNotification) -> CoreResult<Notification>;

    async fn list_notifications(
        &self,
        user_id: i64,
        filter: &NotificationFilter,
        page: PageRequest,
    ) -> CoreResult<Page<Notification>>;

    async fn unread_count(&self, user_id: i64) -> CoreResult<u64>;

    async fn mark_read(&self, user_id: i64, id: i64) -> CoreResult<Option<Notification>>;

    async fn mark_all_read(&self, user_id: i64) -> CoreResult<u64>;

    async fn delete_notification(&self, user_id: i64, id: i64) -> CoreResult<bool>;
}

/// Repository trait for translatable content
#[async_trait]
pub trait ContentRepository: Send + Sync {
    /// Inserts the parent row and one translation row per language.
    async fn create_entry(&self, draft: &ContentDraft) -> CoreResult<ContentEntry>;

    async fn get_entry(&self, kind: ContentKind, id: i64) -> CoreResult<Option<ContentEntry>>;

    async fn find_by_slug(&self, kind: ContentKind, slug: &str) -> CoreResult<Option<ContentEntry>>;

    async fn slug_taken(&self, kind: ContentKind, slug: &str, exclude_id: Option<i64>) -> CoreResult<bool>;

    /// Saves the parent row and upserts each translation by language.
    async fn update_entry(&self, entry: &ContentEntry) -> CoreResult<ContentEntry>;

    async fn delete_entry(&self, kind: ContentKind, id: i64) -> CoreResult<bool>;

    async fn list_entries(&self, filter: &ContentFilter, page: PageRequest) -> CoreResult<Page<ContentEntry>>;
}

/// Repository trait for special offers
#[async_trait]
pub trait SpecialOfferRepository: Send + Sync {
    async fn create_offer(&self, offer: &SpecialOfferDraft) -> CoreResult<SpecialOffer>;

    async fn get_offer(&self, id: i64) -> CoreResult<Option<SpecialOffer>>;

    async fn update_offer(&self, id: i64, offer: &SpecialOfferDraft) -> CoreResult<SpecialOffer>;

    async fn delete_offer(&self, id: i64) -> CoreResult<bool>;

    async fn list_offers(&self, filter: &OfferFilter, page: PageRequest) -> CoreResult<Page<SpecialOffer>>;
}
