use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::booking::{parse_date, round_cents};
use crate::service::ServiceType;
use crate::{CoreError, CoreResult};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpecialOffer {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub discount_percent: Decimal,
    pub service_type: Option<ServiceType>,
    pub service_id: Option<i64>,
    pub valid_from: NaiveDate,
    pub valid_until: NaiveDate,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SpecialOffer {
    pub fn is_live_on(&self, day: NaiveDate) -> bool {
        self.is_active && self.valid_from <= day && day <= self.valid_until
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpecialOfferRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub discount_percent: Option<Decimal>,
    pub service_type: Option<ServiceType>,
    pub service_id: Option<i64>,
    pub valid_from: Option<String>,
    pub valid_until: Option<String>,
    pub is_active: Option<bool>,
}

/// Complete, validated offer fields, used for both insert and update.
#[derive(Debug, Clone, PartialEq)]
pub struct SpecialOfferDraft {
    pub title: String,
    pub description: String,
    pub discount_percent: Decimal,
    pub service_type: Option<ServiceType>,
    pub service_id: Option<i64>,
    pub valid_from: NaiveDate,
    pub valid_until: NaiveDate,
    pub is_active: bool,
}

impl SpecialOfferDraft {
    pub fn from_request(request: SpecialOfferRequest) -> CoreResult<Self> {
        let title = request
            .title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| CoreError::validation("title is required"))?
            .to_string();
        let discount_percent = request
            .discount_percent
            .ok_or_else(|| CoreError::validation("discountPercent is required"))?;
        let valid_from = required_date("validFrom", request.valid_from.as_deref())?;
        let valid_until = required_date("validUntil", request.valid_until.as_deref())?;

        let draft = Self {
            title,
            description: request.description.unwrap_or_default(),
            discount_percent: round_cents(discount_percent),
            service_type: request.service_type,
            service_id: request.service_id,
            valid_from,
            valid_until,
            is_active: request.is_active.unwrap_or(true),
        };
        draft.validate()?;
        Ok(draft)
    }

    /// Overlays the supplied fields on an existing offer.
    pub fn merge(existing: &SpecialOffer, request: SpecialOfferRequest) -> CoreResult<Self> {
        let title = match request.title.as_deref().map(str::trim) {
            Some("") => return Err(CoreError::validation("title must not be empty")),
            Some(t) => t.to_string(),
            None => existing.title.clone(),
        };
        let valid_from = match request.valid_from.as_deref() {
            Some(raw) => required_date("validFrom", Some(raw))?,
            None => existing.valid_from,
        };
        let valid_until = match request.valid_until.as_deref() {
            Some(raw) => required_date("validUntil", Some(raw))?,
            None => existing.valid_until,
        };

        let draft = Self {
            title,
            description: request.description.unwrap_or_else(|| existing.description.clone()),
            discount_percent: request.discount_percent.map_or(existing.discount_percent, round_cents),
            service_type: request.service_type.or(existing.service_type),
            service_id: request.service_id.or(existing.service_id),
            valid_from,
            valid_until,
            is_active: request.is_active.unwrap_or(existing.is_active),
        };
        draft.validate()?;
        Ok(draft)
    }

    fn validate(&self) -> CoreResult<()> {
        if self.discount_percent < Decimal::ZERO || self.discount_percent > Decimal::ONE_HUNDRED {
            return Err(CoreError::validation("discountPercent must be between 0 and 100"));
        }
        if self.valid_until < self.valid_from {
            return Err(CoreError::validation("validUntil must not be before validFrom"));
        }
        if self.service_id.is_some() && self.service_type.is_none() {
            return Err(CoreError::validation("serviceType is required when serviceId is set"));
        }
        Ok(())
    }
}

fn required_date(field: &str, raw: Option<&str>) -> CoreResult<NaiveDate> {
    let raw = raw
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .ok_or_else(|| CoreError::validation(format!("{} is required", field)))?;
    parse_date(raw).ok_or_else(|| CoreError::validation(format!("{} must be a valid date (YYYY-MM-DD)", field)))
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct OfferFilter {
    pub active: Option<bool>,
    pub service_type: Option<ServiceType>,
    pub search: Option<String>,
    /// Only offers whose validity window contains this day.
    pub live_on: Option<NaiveDate>,
}

impl OfferFilter {
    pub fn matches(&self, offer: &SpecialOffer) -> bool {
        if self.active.is_some_and(|a| offer.is_active != a) {
            return false;
        }
        if self.service_type.is_some() && offer.service_type != self.service_type {
            return false;
        }
        if self.live_on.is_some_and(|day| !offer.is_live_on(day)) {
            return false;
        }
        match self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            None => true,
            Some(term) => {
                let term = term.to_lowercase();
                offer.title.to_lowercase().contains(&term) || offer.description.to_lowercase().contains(&term)
            }
        }
    }
}
