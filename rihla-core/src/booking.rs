use chrono::{DateTime, NaiveDate, Utc};
use rihla_shared::Masked;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;

use crate::service::{ServiceRef, ServiceType};
use crate::{CoreError, CoreResult};

string_enum! {
    /// Booking status in the lifecycle
    pub enum BookingStatus {
        Pending => "PENDING",
        Confirmed => "CONFIRMED",
        Cancelled => "CANCELLED",
        Completed => "COMPLETED",
    }
}

impl BookingStatus {
    /// The transition table. Cancelled and Completed are terminal.
    pub fn allowed_transitions(self) -> &'static [BookingStatus] {
        match self {
            BookingStatus::Pending => &[BookingStatus::Confirmed, BookingStatus::Cancelled],
            BookingStatus::Confirmed => &[BookingStatus::Completed, BookingStatus::Cancelled],
            BookingStatus::Cancelled | BookingStatus::Completed => &[],
        }
    }

    pub fn can_transition_to(self, next: BookingStatus) -> bool {
        self.allowed_transitions().contains(&next)
    }

    pub fn is_terminal(self) -> bool {
        self.allowed_transitions().is_empty()
    }
}

string_enum! {
    pub enum PaymentStatus {
        Pending => "PENDING",
        Paid => "PAID",
        Refunded => "REFUNDED",
        Failed => "FAILED",
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: i64,
    pub user_id: i64,
    #[serde(flatten)]
    pub service: ServiceRef,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub guests: i32,
    pub total_price: Decimal,
    pub status: BookingStatus,
    pub payment_status: PaymentStatus,
    pub contact_name: Option<String>,
    pub contact_email: Option<Masked<String>>,
    pub contact_phone: Option<Masked<String>>,
    pub special_requests: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The signed-in customer a booking is created for. Contact details default
/// to the session's.
#[derive(Debug, Clone)]
pub struct BookingCustomer {
    pub user_id: i64,
    pub email: String,
    pub name: Option<String>,
}

/// Raw creation payload. Identifiers and prices arrive as numbers or numeric
/// strings depending on the client, so they are kept loose until validated.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingRequest {
    pub service_type: Option<String>,
    pub service_id: Option<Value>,
    pub room_id: Option<Value>,
    pub bundle_id: Option<Value>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub total_amount: Option<Value>,
    pub total_price: Option<Value>,
    pub guests: Option<i32>,
    pub special_requests: Option<String>,
    pub contact_phone: Option<String>,
    pub contact_name: Option<String>,
}

/// A validated booking ready to persist. Always starts PENDING/PENDING.
#[derive(Debug, Clone, PartialEq)]
pub struct NewBooking {
    pub user_id: i64,
    pub service: ServiceRef,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub guests: i32,
    pub total_price: Decimal,
    pub contact_name: Option<String>,
    pub contact_email: Option<Masked<String>>,
    pub contact_phone: Option<Masked<String>>,
    pub special_requests: Option<String>,
}

impl CreateBookingRequest {
    /// Checks run in a fixed order so clients always see the first problem:
    /// service type, service id, price, end date, then date sanity.
    pub fn validate(self, customer: &BookingCustomer) -> CoreResult<NewBooking> {
        let raw_type = non_blank(self.service_type.as_deref())
            .ok_or_else(|| CoreError::validation("serviceType is required"))?;
        let service_type = ServiceType::from_str(raw_type)
            .map_err(|_| CoreError::validation(format!("Invalid serviceType: {}", raw_type)))?;

        let (field, raw_id) = match service_type {
            ServiceType::Hotel => first_present(&[("roomId", &self.room_id), ("serviceId", &self.service_id)]),
            ServiceType::Bundle => first_present(&[("bundleId", &self.bundle_id), ("serviceId", &self.service_id)]),
            _ => first_present(&[("serviceId", &self.service_id)]),
        }
        .ok_or_else(|| CoreError::validation(missing_id_message(service_type)))?;
        let service_id = parse_id(raw_id).ok_or_else(|| CoreError::validation(format!("{} must be numeric", field)))?;
        let service = ServiceRef::new(service_type, service_id);

        let raw_price = first_present(&[("totalAmount", &self.total_amount), ("totalPrice", &self.total_price)])
            .map(|(_, v)| v)
            .ok_or_else(|| CoreError::validation("totalPrice is required"))?;
        let total_price = parse_decimal(raw_price)
            .ok_or_else(|| CoreError::validation("totalPrice must be a number"))?;
        let total_price = amount("totalPrice", total_price)?;

        let raw_start = non_blank(self.start_date.as_deref())
            .ok_or_else(|| CoreError::validation("startDate is required"))?;
        let raw_end = non_blank(self.end_date.as_deref());
        if service_type.requires_end_date() && raw_end.is_none() {
            return Err(CoreError::validation(format!(
                "endDate is required for {} bookings",
                service_type.as_str()
            )));
        }

        let start_date = parse_date(raw_start)
            .ok_or_else(|| CoreError::validation("startDate must be a valid date (YYYY-MM-DD)"))?;
        let end_date = match raw_end {
            Some(raw) => parse_date(raw).ok_or_else(|| CoreError::validation("endDate must be a valid date (YYYY-MM-DD)"))?,
            None => start_date,
        };
        if end_date < start_date {
            return Err(CoreError::validation("endDate must not be before startDate"));
        }

        let guests = self.guests.unwrap_or(1);
        if guests < 1 {
            return Err(CoreError::validation("guests must be at least 1"));
        }

        Ok(NewBooking {
            user_id: customer.user_id,
            service,
            start_date,
            end_date,
            guests,
            total_price,
            contact_name: non_blank(self.contact_name.as_deref())
                .map(str::to_string)
                .or_else(|| customer.name.clone()),
            contact_email: Some(Masked(customer.email.clone())),
            contact_phone: non_blank(self.contact_phone.as_deref()).map(|p| Masked(p.to_string())),
            special_requests: non_blank(self.special_requests.as_deref()).map(str::to_string),
        })
    }
}

fn missing_id_message(service_type: ServiceType) -> String {
    match service_type {
        ServiceType::Hotel => "roomId is required for HOTEL bookings".to_string(),
        ServiceType::Bundle => "bundleId is required for BUNDLE bookings".to_string(),
        _ => "serviceId is required".to_string(),
    }
}

fn first_present<'a>(candidates: &[(&'static str, &'a Option<Value>)]) -> Option<(&'static str, &'a Value)> {
    candidates
        .iter()
        .find_map(|(field, value)| value.as_ref().filter(|v| !v.is_null()).map(|v| (*field, v)))
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn parse_id(value: &Value) -> Option<i64> {
    let id = match value {
        Value::Number(n) => n.as_i64()?,
        Value::String(s) => s.trim().parse::<i64>().ok()?,
        _ => return None,
    };
    (id > 0).then_some(id)
}

/// Rounds to whole cents, half away from zero, as a `NUMERIC(_, 2)` column
/// stores it.
pub fn round_cents(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// A non-negative money amount that fits `NUMERIC(12, 2)`, rounded to cents.
pub fn amount(field: &str, value: Decimal) -> CoreResult<Decimal> {
    if value < Decimal::ZERO {
        return Err(CoreError::validation(format!("{} must not be negative", field)));
    }
    let rounded = round_cents(value);
    if rounded > Decimal::new(999_999_999_999, 2) {
        return Err(CoreError::validation(format!("{} must be below 10000000000", field)));
    }
    Ok(rounded)
}

fn parse_decimal(value: &Value) -> Option<Decimal> {
    let text = match value {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.trim().to_string(),
        _ => return None,
    };
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .ok()
}

/// Accepts `2024-06-01` as well as full RFC 3339 timestamps from date pickers.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive()))
}

/// Fields a customer may change on their own booking.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerBookingUpdate {
    pub status: Option<BookingStatus>,
    pub special_requests: Option<String>,
    pub contact_phone: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BookingDetailsUpdate {
    pub special_requests: Option<String>,
    pub contact_phone: Option<Masked<String>>,
}

impl BookingDetailsUpdate {
    pub fn is_empty(&self) -> bool {
        self.special_requests.is_none() && self.contact_phone.is_none()
    }
}

/// Listing filters shared by the customer, provider and admin views.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BookingFilter {
    pub user_id: Option<i64>,
    /// Restricts to these services; used for provider listings.
    pub services: Option<Vec<ServiceRef>>,
    pub status: Option<BookingStatus>,
    pub service_type: Option<ServiceType>,
    pub payment_status: Option<PaymentStatus>,
    pub search: Option<String>,
}

impl BookingFilter {
    /// In-process equivalent of the SQL WHERE clause built by the store.
    pub fn matches(&self, booking: &Booking) -> bool {
        if self.user_id.is_some_and(|id| booking.user_id != id) {
            return false;
        }
        if let Some(services) = &self.services {
            if !services.contains(&booking.service) {
                return false;
            }
        }
        if self.status.is_some_and(|s| booking.status != s) {
            return false;
        }
        if self.service_type.is_some_and(|t| booking.service.service_type() != t) {
            return false;
        }
        if self.payment_status.is_some_and(|p| booking.payment_status != p) {
            return false;
        }
        match self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            None => true,
            Some(term) => {
                let term = term.to_lowercase();
                let fields = [
                    booking.contact_name.as_deref(),
                    booking.contact_email.as_ref().map(|m| m.expose().as_str()),
                    booking.contact_phone.as_ref().map(|m| m.expose().as_str()),
                    booking.special_requests.as_deref(),
                    booking.notes.as_deref(),
                ];
                fields.iter().flatten().any(|f| f.to_lowercase().contains(&term))
            }
        }
    }
}

string_enum! {
    pub enum ChangeField {
        Status => "STATUS",
        PaymentStatus => "PAYMENT_STATUS",
    }
}

/// Audit record for every status or payment-status mutation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingChange {
    pub id: i64,
    pub booking_id: i64,
    pub actor_id: i64,
    pub field: ChangeField,
    pub from_value: String,
    pub to_value: String,
    pub overridden: bool,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewBookingChange {
    pub actor_id: i64,
    pub field: ChangeField,
    pub from_value: String,
    pub to_value: String,
    pub overridden: bool,
    pub reason: Option<String>,
}

/// One atomic mutation: new values plus the audit rows that describe them.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StatusUpdate {
    pub status: Option<BookingStatus>,
    pub payment_status: Option<PaymentStatus>,
    pub notes: Option<String>,
    pub changes: Vec<NewBookingChange>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn customer() -> BookingCustomer {
        BookingCustomer { user_id: 5, email: "amina@example.com".into(), name: Some("Amina".into()) }
    }

    fn request(body: Value) -> CreateBookingRequest {
        serde_json::from_value(body).unwrap()
    }

    fn error_message(body: Value) -> String {
        match request(body).validate(&customer()) {
            Err(CoreError::Validation(msg)) => msg,
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_tour_defaults_end_date() {
        let booking = request(json!({
            "serviceType": "TOUR",
            "serviceId": 7,
            "startDate": "2024-06-01",
            "totalPrice": 150
        }))
        .validate(&customer())
        .unwrap();

        assert_eq!(booking.service, ServiceRef::Tour(7));
        assert_eq!(booking.end_date, booking.start_date);
        assert_eq!(booking.total_price, Decimal::from(150));
        assert_eq!(booking.guests, 1);
        assert_eq!(booking.contact_email.unwrap().into_inner(), "amina@example.com");
        assert_eq!(booking.contact_name.as_deref(), Some("Amina"));
    }

    #[test]
    fn test_hotel_uses_room_id() {
        let booking = request(json!({
            "serviceType": "hotel",
            "roomId": "12",
            "startDate": "2024-06-01",
            "endDate": "2024-06-04",
            "totalAmount": "420.50"
        }))
        .validate(&customer())
        .unwrap();

        assert_eq!(booking.service, ServiceRef::Hotel(12));
        assert_eq!(booking.total_price, Decimal::from_str("420.50").unwrap());
    }

    #[test]
    fn test_total_amount_wins_over_total_price() {
        let booking = request(json!({
            "serviceType": "CAR",
            "serviceId": 3,
            "startDate": "2024-06-01",
            "endDate": "2024-06-02",
            "totalAmount": 80,
            "totalPrice": 95
        }))
        .validate(&customer())
        .unwrap();
        assert_eq!(booking.total_price, Decimal::from(80));

        let booking = request(json!({
            "serviceType": "CAR",
            "serviceId": 3,
            "startDate": "2024-06-01",
            "endDate": "2024-06-02",
            "totalAmount": null,
            "totalPrice": 95
        }))
        .validate(&customer())
        .unwrap();
        assert_eq!(booking.total_price, Decimal::from(95));
    }

    #[test]
    fn test_validation_order() {
        assert_eq!(error_message(json!({})), "serviceType is required");
        assert_eq!(error_message(json!({"serviceType": "CRUISE"})), "Invalid serviceType: CRUISE");
        assert_eq!(error_message(json!({"serviceType": "TOUR"})), "serviceId is required");
        assert_eq!(
            error_message(json!({"serviceType": "HOTEL", "serviceId": null})),
            "roomId is required for HOTEL bookings"
        );
        assert_eq!(error_message(json!({"serviceType": "TOUR", "serviceId": "abc"})), "serviceId must be numeric");
        assert_eq!(error_message(json!({"serviceType": "TOUR", "serviceId": 7})), "totalPrice is required");
        assert_eq!(
            error_message(json!({"serviceType": "TOUR", "serviceId": 7, "totalPrice": "lots"})),
            "totalPrice must be a number"
        );
        assert_eq!(
            error_message(json!({"serviceType": "TOUR", "serviceId": 7, "totalPrice": -1})),
            "totalPrice must not be negative"
        );
        assert_eq!(
            error_message(json!({"serviceType": "TOUR", "serviceId": 7, "totalPrice": 10})),
            "startDate is required"
        );
    }

    #[test]
    fn test_price_stored_in_cents() {
        let booking = request(json!({
            "serviceType": "TOUR",
            "serviceId": 7,
            "startDate": "2024-06-01",
            "totalPrice": "150.005"
        }))
        .validate(&customer())
        .unwrap();
        assert_eq!(booking.total_price, Decimal::from_str("150.01").unwrap());

        let base = json!({"serviceType": "TOUR", "serviceId": 7, "startDate": "2024-06-01"});
        let mut largest = base.clone();
        largest["totalPrice"] = json!("9999999999.99");
        assert!(request(largest).validate(&customer()).is_ok());

        let mut too_large = base;
        too_large["totalPrice"] = json!(10_000_000_000u64);
        assert_eq!(error_message(too_large), "totalPrice must be below 10000000000");
    }

    #[test]
    fn test_hotel_and_car_require_end_date() {
        for ty in ["HOTEL", "CAR"] {
            let msg = error_message(json!({
                "serviceType": ty,
                "serviceId": 1,
                "startDate": "2024-06-01",
                "totalPrice": 10
            }));
            assert_eq!(msg, format!("endDate is required for {} bookings", ty));
        }
    }

    #[test]
    fn test_date_checks() {
        assert_eq!(
            error_message(json!({"serviceType": "TOUR", "serviceId": 7, "totalPrice": 10, "startDate": "June 1st"})),
            "startDate must be a valid date (YYYY-MM-DD)"
        );
        assert_eq!(
            error_message(json!({
                "serviceType": "CAR", "serviceId": 7, "totalPrice": 10,
                "startDate": "2024-06-05", "endDate": "2024-06-01"
            })),
            "endDate must not be before startDate"
        );
        assert_eq!(
            error_message(json!({
                "serviceType": "TOUR", "serviceId": 7, "totalPrice": 10,
                "startDate": "2024-06-05", "guests": 0
            })),
            "guests must be at least 1"
        );
    }

    #[test]
    fn test_parse_date_accepts_timestamps() {
        assert_eq!(parse_date("2024-06-01T10:00:00Z"), NaiveDate::from_ymd_opt(2024, 6, 1));
        assert_eq!(parse_date("2024-06-01"), NaiveDate::from_ymd_opt(2024, 6, 1));
        assert_eq!(parse_date("01/06/2024"), None);
    }

    #[test]
    fn test_transition_table() {
        use BookingStatus::*;
        assert!(Pending.can_transition_to(Confirmed));
        assert!(Pending.can_transition_to(Cancelled));
        assert!(!Pending.can_transition_to(Completed));
        assert!(Confirmed.can_transition_to(Completed));
        assert!(Confirmed.can_transition_to(Cancelled));
        assert!(!Confirmed.can_transition_to(Pending));
        assert!(!Confirmed.can_transition_to(Confirmed));
        assert!(Cancelled.is_terminal());
        assert!(Completed.is_terminal());
        assert!(!Cancelled.can_transition_to(Pending));
    }
}
