use chrono::{DateTime, Utc};
use serde::Serialize;

string_enum! {
    /// Account roles. Providers own the services customers book.
    pub enum Role {
        Customer => "CUSTOMER",
        Admin => "ADMIN",
        SuperAdmin => "SUPER_ADMIN",
        HotelOwner => "HOTEL_OWNER",
        CarOwner => "CAR_OWNER",
        TourGuide => "TOUR_GUIDE",
    }
}

impl Role {
    pub fn is_admin(self) -> bool {
        matches!(self, Role::Admin | Role::SuperAdmin)
    }

    pub fn is_provider(self) -> bool {
        matches!(self, Role::HotelOwner | Role::CarOwner | Role::TourGuide)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}
