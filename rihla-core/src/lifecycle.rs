//! Booking lifecycle: creation, status transitions, customer edits and
//! reviews. Handlers call into here; this is where authorization, the
//! transition table, the change log and notification fan-out meet.

use serde::Deserialize;
use tracing::info;

use crate::booking::{
    Booking, BookingCustomer, BookingDetailsUpdate, BookingStatus, ChangeField, CreateBookingRequest,
    CustomerBookingUpdate, NewBookingChange, PaymentStatus, StatusUpdate,
};
use crate::notification::{self, StatusNotice};
use crate::policy::{can, Action, Resource};
use crate::repository::{BookingRepository, NotificationRepository, ReviewRepository, ServiceDirectory};
use crate::review::{already_rated, NewReview, Review, ReviewRequest};
use crate::service::ServiceInfo;
use crate::user::User;
use crate::{CoreError, CoreResult};
use rihla_shared::Masked;

/// A provider or admin request to move a booking along.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionCommand {
    pub status: Option<BookingStatus>,
    pub payment_status: Option<PaymentStatus>,
    pub notes: Option<String>,
    /// Skips the transition table. Super admins only, and a reason is required.
    #[serde(default, rename = "override")]
    pub force: bool,
    pub reason: Option<String>,
}

pub struct BookingLifecycle<'a> {
    pub bookings: &'a dyn BookingRepository,
    pub directory: &'a dyn ServiceDirectory,
    pub notifications: &'a dyn NotificationRepository,
}

impl<'a> BookingLifecycle<'a> {
    pub fn new(
        bookings: &'a dyn BookingRepository,
        directory: &'a dyn ServiceDirectory,
        notifications: &'a dyn NotificationRepository,
    ) -> Self {
        Self { bookings, directory, notifications }
    }

    pub async fn create(&self, request: CreateBookingRequest, customer: &BookingCustomer) -> CoreResult<Booking> {
        let new_booking = request.validate(customer)?;
        let booking = self.bookings.create_booking(&new_booking).await?;
        let contact = booking.contact_email.clone().unwrap_or_else(|| Masked(String::new()));
        info!(
            "Booking {} created by user {} for {} {} (contact {})",
            booking.id,
            booking.user_id,
            booking.service.service_type(),
            booking.service.id(),
            contact
        );
        Ok(booking)
    }

    async fn service_info(&self, booking: &Booking) -> CoreResult<ServiceInfo> {
        Ok(self
            .directory
            .describe(booking.service)
            .await?
            .unwrap_or_else(|| ServiceInfo::unknown(booking.service)))
    }

    /// Loads a booking the actor is allowed to act on.
    pub async fn load(&self, actor: &User, action: Action, id: i64) -> CoreResult<(Booking, ServiceInfo)> {
        let booking = self
            .bookings
            .get_booking(id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("Booking {}", id)))?;
        let info = self.service_info(&booking).await?;
        if !can(actor, action, resource(&booking, &info)) {
            return Err(CoreError::Forbidden("You are not allowed to access this booking".to_string()));
        }
        Ok((booking, info))
    }

    pub async fn transition(&self, actor: &User, id: i64, command: TransitionCommand) -> CoreResult<Booking> {
        let (booking, info) = self.load(actor, Action::TransitionBooking, id).await?;

        if command.status.is_none() && command.payment_status.is_none() && command.notes.is_none() {
            return Err(CoreError::validation("Nothing to update: provide status, paymentStatus or notes"));
        }
        let reason = command.reason.as_deref().map(str::trim).filter(|r| !r.is_empty()).map(str::to_string);
        if command.force {
            if !can(actor, Action::OverrideBookingStatus, resource(&booking, &info)) {
                return Err(CoreError::Forbidden("Only a super admin can override booking status".to_string()));
            }
            if reason.is_none() {
                return Err(CoreError::validation("reason is required when overriding booking status"));
            }
        }
        if command.payment_status.is_some() && !can(actor, Action::UpdatePaymentStatus, resource(&booking, &info)) {
            return Err(CoreError::Forbidden("Only admins can change payment status".to_string()));
        }

        // Edit forms resubmit the current status alongside payment or notes.
        let status = command.status.filter(|target| {
            command.force
                || *target != booking.status
                || (command.payment_status.is_none() && command.notes.is_none())
        });

        let mut changes = Vec::new();
        if let Some(target) = status {
            if !command.force && !booking.status.can_transition_to(target) {
                return Err(CoreError::InvalidTransition { from: booking.status, to: target });
            }
            changes.push(NewBookingChange {
                actor_id: actor.id,
                field: ChangeField::Status,
                from_value: booking.status.to_string(),
                to_value: target.to_string(),
                overridden: command.force,
                reason: reason.clone(),
            });
        }
        if let Some(payment) = command.payment_status.filter(|p| *p != booking.payment_status) {
            changes.push(NewBookingChange {
                actor_id: actor.id,
                field: ChangeField::PaymentStatus,
                from_value: booking.payment_status.to_string(),
                to_value: payment.to_string(),
                overridden: command.force,
                reason: reason.clone(),
            });
        }

        let notes = command.notes.as_deref().map(str::trim).filter(|n| !n.is_empty()).map(str::to_string);
        let update = StatusUpdate {
            status,
            payment_status: command.payment_status,
            notes: notes.clone(),
            changes,
        };
        let updated = self.bookings.apply_status_update(id, &update).await?;

        if command.force {
            info!("Booking {} status overridden by user {}: {:?}", id, actor.id, reason);
        }
        if let Some(status) = status {
            self.notify(&updated, &info, status, notes).await;
        }
        Ok(updated)
    }

    /// Customers may edit their contact phone and special requests, and may
    /// cancel while the booking is still open.
    pub async fn customer_update(&self, actor: &User, id: i64, update: CustomerBookingUpdate) -> CoreResult<Booking> {
        let (booking, info) = self.load(actor, Action::UpdateOwnBooking, id).await?;

        let cancel = match update.status {
            None => false,
            Some(BookingStatus::Cancelled) if booking.status.can_transition_to(BookingStatus::Cancelled) => true,
            Some(BookingStatus::Cancelled) => {
                return Err(CoreError::InvalidTransition { from: booking.status, to: BookingStatus::Cancelled })
            }
            Some(_) => return Err(CoreError::Forbidden("Customers can only cancel their bookings".to_string())),
        };

        let details = BookingDetailsUpdate {
            special_requests: update.special_requests.map(|s| s.trim().to_string()),
            contact_phone: update.contact_phone.map(|p| Masked(p.trim().to_string())),
        };

        // The guarded cancel goes first so a stale request saves nothing.
        let mut current = booking;
        if cancel {
            let status_update = StatusUpdate {
                status: Some(BookingStatus::Cancelled),
                changes: vec![NewBookingChange {
                    actor_id: actor.id,
                    field: ChangeField::Status,
                    from_value: current.status.to_string(),
                    to_value: BookingStatus::Cancelled.to_string(),
                    overridden: false,
                    reason: Some("Cancelled by customer".to_string()),
                }],
                ..Default::default()
            };
            current = self.bookings.apply_status_update(id, &status_update).await?;
        }
        if !details.is_empty() {
            current = self.bookings.update_details(id, &details).await?;
        }
        if cancel {
            self.notify(&current, &info, BookingStatus::Cancelled, None).await;
        }
        Ok(current)
    }

    pub async fn submit_review(
        &self,
        reviews: &dyn ReviewRepository,
        actor: &User,
        request: ReviewRequest,
    ) -> CoreResult<Review> {
        let (booking, info) = self.load(actor, Action::ReviewBooking, request.booking_id).await?;
        if reviews.find_by_booking(booking.id).await?.is_some() {
            return Err(already_rated());
        }
        let review = NewReview::for_booking(request, &booking, &info)?;
        let saved = reviews.create_review(&review).await?;
        info!("Review {} added for booking {} ({} stars)", saved.id, saved.booking_id, saved.rating);
        Ok(saved)
    }

    async fn notify(&self, booking: &Booking, info: &ServiceInfo, status: BookingStatus, note: Option<String>) {
        let notice = StatusNotice {
            booking_id: booking.id,
            customer_id: booking.user_id,
            provider_user_id: info.provider_user_id,
            status,
            service_name: info.display_name.clone(),
            service_type: booking.service.service_type(),
            note,
        };
        notification::fan_out(self.notifications, &notice).await;
    }
}

fn resource(booking: &Booking, info: &ServiceInfo) -> Resource {
    Resource::Booking { owner_id: booking.user_id, provider_user_id: info.provider_user_id }
}
