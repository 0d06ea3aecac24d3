use serde::{Deserialize, Serialize};

string_enum! {
    /// What kind of offering a booking refers to.
    pub enum ServiceType {
        Hotel => "HOTEL",
        Car => "CAR",
        Tour => "TOUR",
        Bundle => "BUNDLE",
        Health => "HEALTH",
        Education => "EDUCATION",
        Umrah => "UMRAH",
        Historical => "HISTORICAL",
    }
}

impl ServiceType {
    /// Stays and rentals are priced per period, so they need an end date.
    pub fn requires_end_date(self) -> bool {
        matches!(self, ServiceType::Hotel | ServiceType::Car)
    }

    pub fn label(self) -> &'static str {
        match self {
            ServiceType::Hotel => "hotel",
            ServiceType::Car => "car rental",
            ServiceType::Tour => "tour",
            ServiceType::Bundle => "travel bundle",
            ServiceType::Health => "health tourism",
            ServiceType::Education => "educational tourism",
            ServiceType::Umrah => "umrah",
            ServiceType::Historical => "historical tourism",
        }
    }
}

/// A typed reference to the booked offering. For hotels the id is the room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "serviceType", content = "serviceId", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServiceRef {
    Hotel(i64),
    Car(i64),
    Tour(i64),
    Bundle(i64),
    Health(i64),
    Education(i64),
    Umrah(i64),
    Historical(i64),
}

impl ServiceRef {
    pub fn new(service_type: ServiceType, id: i64) -> Self {
        match service_type {
            ServiceType::Hotel => ServiceRef::Hotel(id),
            ServiceType::Car => ServiceRef::Car(id),
            ServiceType::Tour => ServiceRef::Tour(id),
            ServiceType::Bundle => ServiceRef::Bundle(id),
            ServiceType::Health => ServiceRef::Health(id),
            ServiceType::Education => ServiceRef::Education(id),
            ServiceType::Umrah => ServiceRef::Umrah(id),
            ServiceType::Historical => ServiceRef::Historical(id),
        }
    }

    pub fn service_type(self) -> ServiceType {
        match self {
            ServiceRef::Hotel(_) => ServiceType::Hotel,
            ServiceRef::Car(_) => ServiceType::Car,
            ServiceRef::Tour(_) => ServiceType::Tour,
            ServiceRef::Bundle(_) => ServiceType::Bundle,
            ServiceRef::Health(_) => ServiceType::Health,
            ServiceRef::Education(_) => ServiceType::Education,
            ServiceRef::Umrah(_) => ServiceType::Umrah,
            ServiceRef::Historical(_) => ServiceType::Historical,
        }
    }

    pub fn id(self) -> i64 {
        match self {
            ServiceRef::Hotel(id)
            | ServiceRef::Car(id)
            | ServiceRef::Tour(id)
            | ServiceRef::Bundle(id)
            | ServiceRef::Health(id)
            | ServiceRef::Education(id)
            | ServiceRef::Umrah(id)
            | ServiceRef::Historical(id) => id,
        }
    }
}

/// What the service directory knows about a booked offering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceInfo {
    pub display_name: String,
    pub provider_user_id: Option<i64>,
    /// Set for tours; reviews are attributed to the guide as well.
    pub guide_id: Option<i64>,
}

impl ServiceInfo {
    /// Used when the directory has no row for a reference.
    pub fn unknown(service: ServiceRef) -> Self {
        Self {
            display_name: format!("{} #{}", service.service_type().label(), service.id()),
            provider_user_id: None,
            guide_id: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_ref_round_trip() {
        for ty in ServiceType::ALL {
            let service = ServiceRef::new(*ty, 42);
            assert_eq!(service.service_type(), *ty);
            assert_eq!(service.id(), 42);
        }
    }

    #[test]
    fn test_service_ref_serializes_flat_pair() {
        let json = serde_json::to_value(ServiceRef::Tour(7)).unwrap();
        assert_eq!(json, serde_json::json!({"serviceType": "TOUR", "serviceId": 7}));
    }

    #[test]
    fn test_end_date_requirement() {
        assert!(ServiceType::Hotel.requires_end_date());
        assert!(ServiceType::Car.requires_end_date());
        assert!(!ServiceType::Tour.requires_end_date());
        assert!(!ServiceType::Umrah.requires_end_date());
    }

    #[test]
    fn test_unknown_service_info() {
        let info = ServiceInfo::unknown(ServiceRef::Car(3));
        assert_eq!(info.display_name, "car rental #3");
        assert_eq!(info.provider_user_id, None);
    }
}
