use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rihla_core::offer::{OfferFilter, SpecialOffer, SpecialOfferDraft};
use rihla_core::repository::SpecialOfferRepository;
use rihla_core::service::ServiceType;
use rihla_core::{CoreError, CoreResult};
use rihla_shared::{Page, PageRequest};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::{column, contains_pattern, storage};

const OFFER_COLUMNS: &str = "id, title, description, discount_percent, service_type, service_id, valid_from, \
     valid_until, is_active, created_at, updated_at";

pub struct PgSpecialOfferRepository {
    pub pool: PgPool,
}

#[derive(sqlx::FromRow)]
struct OfferRow {
    id: i64,
    title: String,
    description: String,
    discount_percent: Decimal,
    service_type: Option<String>,
    service_id: Option<i64>,
    valid_from: NaiveDate,
    valid_until: NaiveDate,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl OfferRow {
    fn into_offer(self) -> CoreResult<SpecialOffer> {
        Ok(SpecialOffer {
            id: self.id,
            title: self.title,
            description: self.description,
            discount_percent: self.discount_percent,
            service_type: self.service_type.as_deref().map(column::<ServiceType>).transpose()?,
            service_id: self.service_id,
            valid_from: self.valid_from,
            valid_until: self.valid_until,
            is_active: self.is_active,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

fn push_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &OfferFilter) {
    qb.push(" WHERE TRUE");
    if let Some(active) = filter.active {
        qb.push(" AND is_active = ").push_bind(active);
    }
    if let Some(service_type) = filter.service_type {
        qb.push(" AND service_type = ").push_bind(service_type.as_str());
    }
    if let Some(day) = filter.live_on {
        qb.push(" AND is_active AND valid_from <= ")
            .push_bind(day)
            .push(" AND valid_until >= ")
            .push_bind(day);
    }
    if let Some(term) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let pattern = contains_pattern(term);
        qb.push(" AND (title ILIKE ")
            .push_bind(pattern.clone())
            .push(" ESCAPE '\\' OR description ILIKE ")
            .push_bind(pattern)
            .push(" ESCAPE '\\')");
    }
}

#[async_trait]
impl SpecialOfferRepository for PgSpecialOfferRepository {
    async fn create_offer(&self, offer: &SpecialOfferDraft) -> CoreResult<SpecialOffer> {
        let row = sqlx::query_as::<_, OfferRow>(&format!(
            r#"
            INSERT INTO special_offers (title, description, discount_percent, service_type, service_id,
                                        valid_from, valid_until, is_active)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {}
            "#,
            OFFER_COLUMNS
        ))
        .bind(&offer.title)
        .bind(&offer.description)
        .bind(offer.discount_percent)
        .bind(offer.service_type.map(|t| t.as_str()))
        .bind(offer.service_id)
        .bind(offer.valid_from)
        .bind(offer.valid_until)
        .bind(offer.is_active)
        .fetch_one(&self.pool)
        .await
        .map_err(storage)?;

        row.into_offer()
    }

    async fn get_offer(&self, id: i64) -> CoreResult<Option<SpecialOffer>> {
        let row = sqlx::query_as::<_, OfferRow>(&format!("SELECT {} FROM special_offers WHERE id = $1", OFFER_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage)?;

        row.map(OfferRow::into_offer).transpose()
    }

    async fn update_offer(&self, id: i64, offer: &SpecialOfferDraft) -> CoreResult<SpecialOffer> {
        let row = sqlx::query_as::<_, OfferRow>(&format!(
            r#"
            UPDATE special_offers
            SET title = $2, description = $3, discount_percent = $4, service_type = $5, service_id = $6,
                valid_from = $7, valid_until = $8, is_active = $9, updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            OFFER_COLUMNS
        ))
        .bind(id)
        .bind(&offer.title)
        .bind(&offer.description)
        .bind(offer.discount_percent)
        .bind(offer.service_type.map(|t| t.as_str()))
        .bind(offer.service_id)
        .bind(offer.valid_from)
        .bind(offer.valid_until)
        .bind(offer.is_active)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage)?;

        row.ok_or_else(|| CoreError::NotFound(format!("Special offer {}", id)))?.into_offer()
    }

    async fn delete_offer(&self, id: i64) -> CoreResult<bool> {
        let result = sqlx::query("DELETE FROM special_offers WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(storage)?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_offers(&self, filter: &OfferFilter, page: PageRequest) -> CoreResult<Page<SpecialOffer>> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM special_offers");
        push_filter(&mut count, filter);
        let total = count
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await
            .map_err(storage)?;

        let mut select = QueryBuilder::<Postgres>::new(format!("SELECT {} FROM special_offers", OFFER_COLUMNS));
        push_filter(&mut select, filter);
        select
            .push(" ORDER BY valid_from DESC, id DESC LIMIT ")
            .push_bind(i64::from(page.limit))
            .push(" OFFSET ")
            .push_bind(page.offset() as i64);
        let rows = select
            .build_query_as::<OfferRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(storage)?;

        let items = rows.into_iter().map(OfferRow::into_offer).collect::<CoreResult<Vec<_>>>()?;
        Ok(Page::new(items, total.max(0) as u64, page))
    }
}
