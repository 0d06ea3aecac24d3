//! Authorization decisions, in one place.
//!
//! Handlers describe what they are about to do as an [`Action`] on a
//! [`Resource`] and ask [`can`]. No handler compares roles itself.

use crate::user::{Role, User};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    ViewBooking,
    UpdateOwnBooking,
    TransitionBooking,
    OverrideBookingStatus,
    DeleteBooking,
    UpdatePaymentStatus,
    ReviewBooking,
    ViewAdminListings,
    ManageContent,
    ManageOffers,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Booking {
        owner_id: i64,
        provider_user_id: Option<i64>,
    },
    Platform,
}

pub fn can(user: &User, action: Action, resource: Resource) -> bool {
    match (action, resource) {
        (Action::OverrideBookingStatus, _) => user.role == Role::SuperAdmin,
        (
            Action::ViewAdminListings
            | Action::ManageContent
            | Action::ManageOffers
            | Action::DeleteBooking
            | Action::UpdatePaymentStatus,
            _,
        ) => {
            user.is_admin()
        }
        (Action::ViewBooking, Resource::Booking { owner_id, provider_user_id }) => {
            user.is_admin() || user.id == owner_id || is_provider_of(user, provider_user_id)
        }
        (Action::TransitionBooking, Resource::Booking { provider_user_id, .. }) => {
            user.is_admin() || is_provider_of(user, provider_user_id)
        }
        (Action::UpdateOwnBooking | Action::ReviewBooking, Resource::Booking { owner_id, .. }) => user.id == owner_id,
        (Action::ViewBooking | Action::TransitionBooking | Action::UpdateOwnBooking | Action::ReviewBooking, Resource::Platform) => {
            false
        }
    }
}

fn is_provider_of(user: &User, provider_user_id: Option<i64>) -> bool {
    user.role.is_provider() && provider_user_id == Some(user.id)
}
