use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{info, warn};

use crate::booking::BookingStatus;
use crate::repository::NotificationRepository;
use crate::service::ServiceType;
use crate::UnknownVariant;

string_enum! {
    pub enum NotificationCategory {
        Booking => "BOOKING",
        Payment => "PAYMENT",
        Message => "MESSAGE",
        System => "SYSTEM",
        Review => "REVIEW",
        Offer => "OFFER",
    }
}

/// `MEDIUM` is accepted on input as an older spelling of `NORMAL`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationPriority {
    Low,
    #[serde(alias = "MEDIUM")]
    Normal,
    High,
    Urgent,
}

impl NotificationPriority {
    pub fn as_str(self) -> &'static str {
        match self {
            NotificationPriority::Low => "LOW",
            NotificationPriority::Normal => "NORMAL",
            NotificationPriority::High => "HIGH",
            NotificationPriority::Urgent => "URGENT",
        }
    }
}

impl fmt::Display for NotificationPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NotificationPriority {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "LOW" => Ok(NotificationPriority::Low),
            "NORMAL" | "MEDIUM" => Ok(NotificationPriority::Normal),
            "HIGH" => Ok(NotificationPriority::High),
            "URGENT" => Ok(NotificationPriority::Urgent),
            _ => Err(UnknownVariant { kind: "NotificationPriority", value: s.to_string() }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: i64,
    pub user_id: i64,
    pub category: NotificationCategory,
    pub priority: NotificationPriority,
    pub title: String,
    pub message: String,
    pub is_read: bool,
    pub read_at: Option<DateTime<Utc>>,
    /// Weak back-reference; nothing guarantees the target still exists.
    pub related_id: Option<i64>,
    pub related_type: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewNotification {
    pub user_id: i64,
    pub category: NotificationCategory,
    pub priority: NotificationPriority,
    pub title: String,
    pub message: String,
    pub related_id: Option<i64>,
    pub related_type: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NotificationFilter {
    pub unread_only: bool,
    pub category: Option<NotificationCategory>,
}

impl NotificationFilter {
    pub fn matches(&self, notification: &Notification) -> bool {
        (!self.unread_only || !notification.is_read) && self.category.map_or(true, |c| notification.category == c)
    }
}

/// Everything needed to tell both sides of a booking about a status change.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusNotice {
    pub booking_id: i64,
    pub customer_id: i64,
    pub provider_user_id: Option<i64>,
    pub status: BookingStatus,
    pub service_name: String,
    pub service_type: ServiceType,
    pub note: Option<String>,
}

impl StatusNotice {
    fn priority(&self) -> NotificationPriority {
        if self.status == BookingStatus::Confirmed {
            NotificationPriority::High
        } else {
            NotificationPriority::Normal
        }
    }

    fn with_note(&self, message: String) -> String {
        match self.note.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
            Some(note) => format!("{} Note: {}", message, note),
            None => message,
        }
    }

    fn customer_message(&self) -> (String, String) {
        let name = &self.service_name;
        let label = self.service_type.label();
        let (title, message) = match self.status {
            BookingStatus::Pending => (
                "Booking pending",
                format!("Your {} booking for {} is awaiting confirmation.", label, name),
            ),
            BookingStatus::Confirmed => (
                "Booking confirmed",
                format!("Your {} booking for {} has been confirmed.", label, name),
            ),
            BookingStatus::Cancelled => (
                "Booking cancelled",
                format!("Your {} booking for {} has been cancelled.", label, name),
            ),
            BookingStatus::Completed => (
                "Booking completed",
                format!("Your {} booking for {} is complete. Tell us how it went by leaving a review.", label, name),
            ),
        };
        (title.to_string(), self.with_note(message))
    }

    fn provider_message(&self) -> (String, String) {
        let title = format!("Booking #{} {}", self.booking_id, self.status.as_str().to_lowercase());
        let message = format!("Booking #{} for {} is now {}.", self.booking_id, self.service_name, self.status);
        (title, self.with_note(message))
    }

    fn notification(&self, user_id: i64, (title, message): (String, String)) -> NewNotification {
        NewNotification {
            user_id,
            category: NotificationCategory::Booking,
            priority: self.priority(),
            title,
            message,
            related_id: Some(self.booking_id),
            related_type: Some("BOOKING".to_string()),
        }
    }

    /// One notification for the customer, plus one for the provider when known.
    pub fn notifications(&self) -> Vec<NewNotification> {
        let mut out = vec![self.notification(self.customer_id, self.customer_message())];
        if let Some(provider_id) = self.provider_user_id {
            out.push(self.notification(provider_id, self.provider_message()));
        }
        out
    }
}

/// Writes the notifications for a status change.
///
/// Delivery is best-effort: a failed insert is logged and skipped, and the
/// caller's status change stands regardless. Returns how many were written.
pub async fn fan_out(repo: &dyn NotificationRepository, notice: &StatusNotice) -> usize {
    let mut delivered = 0;
    for notification in notice.notifications() {
        match repo.create_notification(&notification).await {
            Ok(_) => delivered += 1,
            Err(e) => warn!(
                "Failed to notify user {} about booking {}: {}",
                notification.user_id, notice.booking_id, e
            ),
        }
    }
    info!("Booking {} is now {}: {} notification(s) sent", notice.booking_id, notice.status, delivered);
    delivered
}
