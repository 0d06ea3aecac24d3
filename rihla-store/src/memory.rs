//! In-process store implementing every repository trait. Backs the HTTP
//! tests and local runs without Postgres; listings use the same filter
//! semantics as the SQL repositories.

use async_trait::async_trait;
use chrono::Utc;
use rihla_core::booking::{
    Booking, BookingChange, BookingDetailsUpdate, BookingFilter, BookingStatus, ChangeField, NewBooking,
    PaymentStatus, StatusUpdate,
};
use rihla_core::content::{duplicate_slug, ContentDraft, ContentEntry, ContentFilter, ContentKind};
use rihla_core::notification::{NewNotification, Notification, NotificationFilter};
use rihla_core::offer::{OfferFilter, SpecialOffer, SpecialOfferDraft};
use rihla_core::repository::{
    BookingRepository, ContentRepository, NotificationRepository, ReviewRepository, ServiceDirectory,
    SpecialOfferRepository, UserRepository,
};
use rihla_core::review::{already_rated, NewReview, RatingSummary, Review};
use rihla_core::service::{ServiceInfo, ServiceRef};
use rihla_core::user::{Role, User};
use rihla_core::{CoreError, CoreResult};
use rihla_shared::{Page, PageRequest};
use std::collections::{BTreeMap, HashMap};
use std::io;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
struct Inner {
    next_id: i64,
    users: BTreeMap<i64, User>,
    services: HashMap<ServiceRef, ServiceInfo>,
    bookings: BTreeMap<i64, Booking>,
    changes: Vec<BookingChange>,
    reviews: Vec<Review>,
    notifications: Vec<Notification>,
    entries: BTreeMap<i64, ContentEntry>,
    offers: BTreeMap<i64, SpecialOffer>,
    notifications_down: bool,
}

impl Inner {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Inner>>,
}

/// Newest first, matching `ORDER BY created_at DESC, id DESC`.
fn newest_first<T>(items: impl Iterator<Item = T>, id: impl Fn(&T) -> i64) -> Vec<T> {
    let mut items: Vec<T> = items.collect();
    items.sort_by_key(|item| std::cmp::Reverse(id(item)));
    items
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_user(&self, name: &str, email: &str, role: Role) -> User {
        let mut inner = self.inner.write().await;
        let user = User {
            id: inner.next_id(),
            name: name.to_string(),
            email: email.to_string(),
            phone: None,
            role,
            created_at: Utc::now(),
        };
        inner.users.insert(user.id, user.clone());
        user
    }

    /// Adds a bookable service to the directory.
    pub async fn register_service(&self, service: ServiceRef, name: &str, provider_user_id: Option<i64>) {
        self.register_service_info(
            service,
            ServiceInfo { display_name: name.to_string(), provider_user_id, guide_id: None },
        )
        .await;
    }

    pub async fn register_service_info(&self, service: ServiceRef, info: ServiceInfo) {
        self.inner.write().await.services.insert(service, info);
    }

    /// Makes every notification write fail, to exercise best-effort delivery.
    pub async fn set_notifications_down(&self, down: bool) {
        self.inner.write().await.notifications_down = down;
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn find_user(&self, id: i64) -> CoreResult<Option<User>> {
        Ok(self.inner.read().await.users.get(&id).cloned())
    }
}

#[async_trait]
impl ServiceDirectory for MemoryStore {
    async fn describe(&self, service: ServiceRef) -> CoreResult<Option<ServiceInfo>> {
        Ok(self.inner.read().await.services.get(&service).cloned())
    }

    async fn services_of(&self, provider_user_id: i64) -> CoreResult<Vec<ServiceRef>> {
        let inner = self.inner.read().await;
        let mut services: Vec<ServiceRef> = inner
            .services
            .iter()
            .filter(|(_, info)| info.provider_user_id == Some(provider_user_id))
            .map(|(service, _)| *service)
            .collect();
        services.sort_by_key(|s| (s.service_type().as_str(), s.id()));
        Ok(services)
    }
}

#[async_trait]
impl BookingRepository for MemoryStore {
    async fn create_booking(&self, booking: &NewBooking) -> CoreResult<Booking> {
        let mut inner = self.inner.write().await;
        let now = Utc::now();
        let saved = Booking {
            id: inner.next_id(),
            user_id: booking.user_id,
            service: booking.service,
            start_date: booking.start_date,
            end_date: booking.end_date,
            guests: booking.guests,
            total_price: booking.total_price,
            status: BookingStatus::Pending,
            payment_status: PaymentStatus::Pending,
            contact_name: booking.contact_name.clone(),
            contact_email: booking.contact_email.clone(),
            contact_phone: booking.contact_phone.clone(),
            special_requests: booking.special_requests.clone(),
            notes: None,
            created_at: now,
            updated_at: now,
        };
        inner.bookings.insert(saved.id, saved.clone());
        Ok(saved)
    }

    async fn get_booking(&self, id: i64) -> CoreResult<Option<Booking>> {
        Ok(self.inner.read().await.bookings.get(&id).cloned())
    }

    async fn list_bookings(&self, filter: &BookingFilter, page: PageRequest) -> CoreResult<Page<Booking>> {
        let inner = self.inner.read().await;
        let matching = newest_first(inner.bookings.values().filter(|b| filter.matches(b)).cloned(), |b| b.id);
        Ok(page.slice(matching))
    }

    async fn update_details(&self, id: i64, update: &BookingDetailsUpdate) -> CoreResult<Booking> {
        let mut inner = self.inner.write().await;
        let booking = inner
            .bookings
            .get_mut(&id)
            .ok_or_else(|| CoreError::NotFound(format!("Booking {}", id)))?;
        if let Some(requests) = &update.special_requests {
            booking.special_requests = Some(requests.clone());
        }
        if let Some(phone) = &update.contact_phone {
            booking.contact_phone = Some(phone.clone());
        }
        booking.updated_at = Utc::now();
        Ok(booking.clone())
    }

    async fn apply_status_update(&self, id: i64, update: &StatusUpdate) -> CoreResult<Booking> {
        let mut inner = self.inner.write().await;
        let booking = inner
            .bookings
            .get_mut(&id)
            .ok_or_else(|| CoreError::NotFound(format!("Booking {}", id)))?;

        let expected = update.changes.iter().find(|c| c.field == ChangeField::Status);
        if expected.is_some_and(|c| c.from_value != booking.status.as_str()) {
            return Err(CoreError::Conflict(format!("Booking {} was modified concurrently", id)));
        }

        let now = Utc::now();
        if let Some(status) = update.status {
            booking.status = status;
        }
        if let Some(payment) = update.payment_status {
            booking.payment_status = payment;
        }
        if let Some(notes) = &update.notes {
            booking.notes = Some(notes.clone());
        }
        booking.updated_at = now;
        let updated = booking.clone();

        for change in &update.changes {
            let id_for_change = inner.next_id();
            inner.changes.push(BookingChange {
                id: id_for_change,
                booking_id: id,
                actor_id: change.actor_id,
                field: change.field,
                from_value: change.from_value.clone(),
                to_value: change.to_value.clone(),
                overridden: change.overridden,
                reason: change.reason.clone(),
                created_at: now,
            });
        }
        Ok(updated)
    }

    async fn list_changes(&self, booking_id: i64) -> CoreResult<Vec<BookingChange>> {
        let inner = self.inner.read().await;
        Ok(inner.changes.iter().filter(|c| c.booking_id == booking_id).cloned().collect())
    }

    async fn delete_booking(&self, id: i64) -> CoreResult<bool> {
        let mut inner = self.inner.write().await;
        let removed = inner.bookings.remove(&id).is_some();
        if removed {
            inner.changes.retain(|c| c.booking_id != id);
            inner.reviews.retain(|r| r.booking_id != id);
        }
        Ok(removed)
    }
}

#[async_trait]
impl ReviewRepository for MemoryStore {
    async fn create_review(&self, review: &NewReview) -> CoreResult<Review> {
        let mut inner = self.inner.write().await;
        if inner.reviews.iter().any(|r| r.booking_id == review.booking_id) {
            return Err(already_rated());
        }
        let saved = Review {
            id: inner.next_id(),
            booking_id: review.booking_id,
            user_id: review.user_id,
            service: review.service,
            guide_id: review.guide_id,
            rating: review.rating,
            title: review.title.clone(),
            comment: review.comment.clone(),
            created_at: Utc::now(),
        };
        inner.reviews.push(saved.clone());
        Ok(saved)
    }

    async fn find_by_booking(&self, booking_id: i64) -> CoreResult<Option<Review>> {
        let inner = self.inner.read().await;
        Ok(inner.reviews.iter().find(|r| r.booking_id == booking_id).cloned())
    }

    async fn list_reviews(&self, service: Option<ServiceRef>, page: PageRequest) -> CoreResult<Page<Review>> {
        let inner = self.inner.read().await;
        let matching = newest_first(
            inner.reviews.iter().filter(|r| service.map_or(true, |s| r.service == s)).cloned(),
            |r| r.id,
        );
        Ok(page.slice(matching))
    }

    async fn rating_summary(&self, service: Option<ServiceRef>) -> CoreResult<RatingSummary> {
        let inner = self.inner.read().await;
        Ok(RatingSummary::from_ratings(
            inner
                .reviews
                .iter()
                .filter(|r| service.map_or(true, |s| r.service == s))
                .map(|r| r.rating),
        ))
    }
}

#[async_trait]
impl NotificationRepository for MemoryStore {
    async fn create_notification(&self, notification: &NewNotification) -> CoreResult<Notification> {
        let mut inner = self.inner.write().await;
        if inner.notifications_down {
            return Err(CoreError::storage(io::Error::new(
                io::ErrorKind::ConnectionRefused,
                "notification store unavailable",
            )));
        }
        let saved = Notification {
            id: inner.next_id(),
            user_id: notification.user_id,
            category: notification.category,
            priority: notification.priority,
            title: notification.title.clone(),
            message: notification.message.clone(),
            is_read: false,
            read_at: None,
            related_id: notification.related_id,
            related_type: notification.related_type.clone(),
            created_at: Utc::now(),
        };
        inner.notifications.push(saved.clone());
        Ok(saved)
    }

    async fn list_notifications(
        &self,
        user_id: i64,
        filter: &NotificationFilter,
        page: PageRequest,
    ) -> CoreResult<Page<Notification>> {
        let inner = self.inner.read().await;
        let matching = newest_first(
            inner
                .notifications
                .iter()
                .filter(|n| n.user_id == user_id && filter.matches(n))
                .cloned(),
            |n| n.id,
        );
        Ok(page.slice(matching))
    }

    async fn unread_count(&self, user_id: i64) -> CoreResult<u64> {
        let inner = self.inner.read().await;
        Ok(inner.notifications.iter().filter(|n| n.user_id == user_id && !n.is_read).count() as u64)
    }

    async fn mark_read(&self, user_id: i64, id: i64) -> CoreResult<Option<Notification>> {
        let mut inner = self.inner.write().await;
        let Some(notification) = inner.notifications.iter_mut().find(|n| n.id == id && n.user_id == user_id) else {
            return Ok(None);
        };
        if !notification.is_read {
            notification.is_read = true;
            notification.read_at = Some(Utc::now());
        }
        Ok(Some(notification.clone()))
    }

    async fn mark_all_read(&self, user_id: i64) -> CoreResult<u64> {
        let mut inner = self.inner.write().await;
        let now = Utc::now();
        let mut updated = 0;
        for notification in inner.notifications.iter_mut().filter(|n| n.user_id == user_id && !n.is_read) {
            notification.is_read = true;
            notification.read_at = Some(now);
            updated += 1;
        }
        Ok(updated)
    }

    async fn delete_notification(&self, user_id: i64, id: i64) -> CoreResult<bool> {
        let mut inner = self.inner.write().await;
        let before = inner.notifications.len();
        inner.notifications.retain(|n| !(n.id == id && n.user_id == user_id));
        Ok(inner.notifications.len() < before)
    }
}

#[async_trait]
impl ContentRepository for MemoryStore {
    async fn create_entry(&self, draft: &ContentDraft) -> CoreResult<ContentEntry> {
        let mut inner = self.inner.write().await;
        if inner.entries.values().any(|e| e.kind == draft.kind && e.slug == draft.slug) {
            return Err(duplicate_slug(draft.kind, &draft.slug));
        }
        let now = Utc::now();
        let entry = ContentEntry {
            id: inner.next_id(),
            kind: draft.kind,
            slug: draft.slug.clone(),
            title: draft.text.title.clone(),
            excerpt: draft.text.excerpt.clone(),
            content: draft.text.content.clone(),
            translations: draft.translations.clone(),
            attributes: draft.attributes.clone(),
            published_at: draft.attributes.published.then_some(now),
            created_at: now,
            updated_at: now,
        };
        inner.entries.insert(entry.id, entry.clone());
        Ok(entry)
    }

    async fn get_entry(&self, kind: ContentKind, id: i64) -> CoreResult<Option<ContentEntry>> {
        let inner = self.inner.read().await;
        Ok(inner.entries.get(&id).filter(|e| e.kind == kind).cloned())
    }

    async fn find_by_slug(&self, kind: ContentKind, slug: &str) -> CoreResult<Option<ContentEntry>> {
        let inner = self.inner.read().await;
        Ok(inner.entries.values().find(|e| e.kind == kind && e.slug == slug).cloned())
    }

    async fn slug_taken(&self, kind: ContentKind, slug: &str, exclude_id: Option<i64>) -> CoreResult<bool> {
        let inner = self.inner.read().await;
        Ok(inner
            .entries
            .values()
            .any(|e| e.kind == kind && e.slug == slug && Some(e.id) != exclude_id))
    }

    async fn update_entry(&self, entry: &ContentEntry) -> CoreResult<ContentEntry> {
        let mut inner = self.inner.write().await;
        if inner
            .entries
            .values()
            .any(|e| e.kind == entry.kind && e.slug == entry.slug && e.id != entry.id)
        {
            return Err(duplicate_slug(entry.kind, &entry.slug));
        }
        let stored = inner
            .entries
            .get_mut(&entry.id)
            .filter(|e| e.kind == entry.kind)
            .ok_or_else(|| CoreError::NotFound(format!("{} {}", entry.kind.label(), entry.id)))?;
        *stored = ContentEntry { created_at: stored.created_at, updated_at: Utc::now(), ..entry.clone() };
        Ok(stored.clone())
    }

    async fn delete_entry(&self, kind: ContentKind, id: i64) -> CoreResult<bool> {
        let mut inner = self.inner.write().await;
        if inner.entries.get(&id).is_some_and(|e| e.kind == kind) {
            inner.entries.remove(&id);
            return Ok(true);
        }
        Ok(false)
    }

    async fn list_entries(&self, filter: &ContentFilter, page: PageRequest) -> CoreResult<Page<ContentEntry>> {
        let inner = self.inner.read().await;
        let matching = newest_first(inner.entries.values().filter(|e| filter.matches(e)).cloned(), |e| e.id);
        Ok(page.slice(matching))
    }
}

#[async_trait]
impl SpecialOfferRepository for MemoryStore {
    async fn create_offer(&self, offer: &SpecialOfferDraft) -> CoreResult<SpecialOffer> {
        let mut inner = self.inner.write().await;
        let now = Utc::now();
        let saved = SpecialOffer {
            id: inner.next_id(),
            title: offer.title.clone(),
            description: offer.description.clone(),
            discount_percent: offer.discount_percent,
            service_type: offer.service_type,
            service_id: offer.service_id,
            valid_from: offer.valid_from,
            valid_until: offer.valid_until,
            is_active: offer.is_active,
            created_at: now,
            updated_at: now,
        };
        inner.offers.insert(saved.id, saved.clone());
        Ok(saved)
    }

    async fn get_offer(&self, id: i64) -> CoreResult<Option<SpecialOffer>> {
        Ok(self.inner.read().await.offers.get(&id).cloned())
    }

    async fn update_offer(&self, id: i64, offer: &SpecialOfferDraft) -> CoreResult<SpecialOffer> {
        let mut inner = self.inner.write().await;
        let stored = inner
            .offers
            .get_mut(&id)
            .ok_or_else(|| CoreError::NotFound(format!("Special offer {}", id)))?;
        stored.title = offer.title.clone();
        stored.description = offer.description.clone();
        stored.discount_percent = offer.discount_percent;
        stored.service_type = offer.service_type;
        stored.service_id = offer.service_id;
        stored.valid_from = offer.valid_from;
        stored.valid_until = offer.valid_until;
        stored.is_active = offer.is_active;
        stored.updated_at = Utc::now();
        Ok(stored.clone())
    }

    async fn delete_offer(&self, id: i64) -> CoreResult<bool> {
        Ok(self.inner.write().await.offers.remove(&id).is_some())
    }

    async fn list_offers(&self, filter: &OfferFilter, page: PageRequest) -> CoreResult<Page<SpecialOffer>> {
        let inner = self.inner.read().await;
        let mut matching: Vec<SpecialOffer> = inner.offers.values().filter(|o| filter.matches(o)).cloned().collect();
        matching.sort_by(|a, b| b.valid_from.cmp(&a.valid_from).then(b.id.cmp(&a.id)));
        Ok(page.slice(matching))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rihla_core::booking::NewBookingChange;
    use rihla_shared::Masked;
    use rust_decimal::Decimal;

    fn new_booking(user_id: i64, service: ServiceRef) -> NewBooking {
        let date = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        NewBooking {
            user_id,
            service,
            start_date: date,
            end_date: date,
            guests: 1,
            total_price: Decimal::from(100),
            contact_name: Some("Amina".into()),
            contact_email: Some(Masked("amina@example.com".into())),
            contact_phone: None,
            special_requests: None,
        }
    }

    #[tokio::test]
    async fn test_services_of_provider() {
        let store = MemoryStore::new();
        let owner = store.insert_user("Owner", "owner@example.com", Role::HotelOwner).await;
        store.register_service(ServiceRef::Hotel(1), "Dar Salam - Room 1", Some(owner.id)).await;
        store.register_service(ServiceRef::Hotel(2), "Dar Salam - Room 2", Some(owner.id)).await;
        store.register_service(ServiceRef::Car(9), "Sedan", None).await;

        let services = store.services_of(owner.id).await.unwrap();
        assert_eq!(services, vec![ServiceRef::Hotel(1), ServiceRef::Hotel(2)]);
    }

    #[tokio::test]
    async fn test_status_update_records_changes() {
        let store = MemoryStore::new();
        let booking = store.create_booking(&new_booking(1, ServiceRef::Tour(3))).await.unwrap();

        let update = StatusUpdate {
            status: Some(BookingStatus::Confirmed),
            changes: vec![NewBookingChange {
                actor_id: 2,
                field: ChangeField::Status,
                from_value: "PENDING".into(),
                to_value: "CONFIRMED".into(),
                overridden: false,
                reason: None,
            }],
            ..Default::default()
        };
        let updated = store.apply_status_update(booking.id, &update).await.unwrap();
        assert_eq!(updated.status, BookingStatus::Confirmed);
        assert_eq!(store.list_changes(booking.id).await.unwrap().len(), 1);

        // Replaying the same change is stale now.
        let err = store.apply_status_update(booking.id, &update).await.unwrap_err();
        assert!(matches!(err, CoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_list_bookings_paginates_newest_first() {
        let store = MemoryStore::new();
        for _ in 0..3 {
            store.create_booking(&new_booking(1, ServiceRef::Tour(3))).await.unwrap();
        }
        store.create_booking(&new_booking(2, ServiceRef::Tour(3))).await.unwrap();

        let filter = BookingFilter { user_id: Some(1), ..Default::default() };
        let page = store
            .list_bookings(&filter, PageRequest { page: 1, limit: 2 })
            .await
            .unwrap();
        assert_eq!(page.meta.total, 3);
        assert_eq!(page.meta.pages, 2);
        assert!(page.meta.has_next_page);
        assert!(page.items[0].id > page.items[1].id);
    }

    #[tokio::test]
    async fn test_notifications_scoped_to_owner() {
        let store = MemoryStore::new();
        let n = store
            .create_notification(&NewNotification {
                user_id: 1,
                category: rihla_core::notification::NotificationCategory::System,
                priority: rihla_core::notification::NotificationPriority::Low,
                title: "Hi".into(),
                message: "Welcome".into(),
                related_id: None,
                related_type: None,
            })
            .await
            .unwrap();

        assert!(store.mark_read(2, n.id).await.unwrap().is_none());
        assert!(!store.delete_notification(2, n.id).await.unwrap());
        assert_eq!(store.unread_count(1).await.unwrap(), 1);
        assert_eq!(store.mark_all_read(1).await.unwrap(), 1);
        assert_eq!(store.unread_count(1).await.unwrap(), 0);
    }
}
