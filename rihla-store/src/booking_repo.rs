use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rihla_core::booking::{
    Booking, BookingChange, BookingDetailsUpdate, BookingFilter, ChangeField, NewBooking, StatusUpdate,
};
use rihla_core::repository::BookingRepository;
use rihla_core::service::{ServiceRef, ServiceType};
use rihla_core::{CoreError, CoreResult};
use rihla_shared::{Masked, Page, PageRequest};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::{column, contains_pattern, storage};

const BOOKING_COLUMNS: &str = "id, user_id, service_type, service_id, start_date, end_date, guests, total_price, \
     status, payment_status, contact_name, contact_email, contact_phone, special_requests, notes, \
     created_at, updated_at";

pub struct PgBookingRepository {
    pub pool: PgPool,
}

#[derive(sqlx::FromRow)]
struct BookingRow {
    id: i64,
    user_id: i64,
    service_type: String,
    service_id: i64,
    start_date: NaiveDate,
    end_date: NaiveDate,
    guests: i32,
    total_price: Decimal,
    status: String,
    payment_status: String,
    contact_name: Option<String>,
    contact_email: Option<String>,
    contact_phone: Option<String>,
    special_requests: Option<String>,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl BookingRow {
    fn into_booking(self) -> CoreResult<Booking> {
        Ok(Booking {
            id: self.id,
            user_id: self.user_id,
            service: ServiceRef::new(column::<ServiceType>(&self.service_type)?, self.service_id),
            start_date: self.start_date,
            end_date: self.end_date,
            guests: self.guests,
            total_price: self.total_price,
            status: column(&self.status)?,
            payment_status: column(&self.payment_status)?,
            contact_name: self.contact_name,
            contact_email: self.contact_email.map(Masked),
            contact_phone: self.contact_phone.map(Masked),
            special_requests: self.special_requests,
            notes: self.notes,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ChangeRow {
    id: i64,
    booking_id: i64,
    actor_id: i64,
    field: String,
    from_value: String,
    to_value: String,
    overridden: bool,
    reason: Option<String>,
    created_at: DateTime<Utc>,
}

impl ChangeRow {
    fn into_change(self) -> CoreResult<BookingChange> {
        Ok(BookingChange {
            id: self.id,
            booking_id: self.booking_id,
            actor_id: self.actor_id,
            field: column(&self.field)?,
            from_value: self.from_value,
            to_value: self.to_value,
            overridden: self.overridden,
            reason: self.reason,
            created_at: self.created_at,
        })
    }
}

/// Appends the WHERE clause for a listing filter.
fn push_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &BookingFilter) {
    qb.push(" WHERE TRUE");
    if let Some(user_id) = filter.user_id {
        qb.push(" AND user_id = ").push_bind(user_id);
    }
    if let Some(services) = &filter.services {
        if services.is_empty() {
            qb.push(" AND FALSE");
        } else {
            qb.push(" AND (service_type, service_id) IN (");
            let mut list = qb.separated(", ");
            for service in services {
                list.push("(")
                    .push_bind_unseparated(service.service_type().as_str())
                    .push_unseparated(", ")
                    .push_bind_unseparated(service.id())
                    .push_unseparated(")");
            }
            qb.push(")");
        }
    }
    if let Some(status) = filter.status {
        qb.push(" AND status = ").push_bind(status.as_str());
    }
    if let Some(service_type) = filter.service_type {
        qb.push(" AND service_type = ").push_bind(service_type.as_str());
    }
    if let Some(payment_status) = filter.payment_status {
        qb.push(" AND payment_status = ").push_bind(payment_status.as_str());
    }
    if let Some(term) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let pattern = contains_pattern(term);
        qb.push(" AND (contact_name ILIKE ")
            .push_bind(pattern.clone())
            .push(" ESCAPE '\\' OR contact_email ILIKE ")
            .push_bind(pattern.clone())
            .push(" ESCAPE '\\' OR contact_phone ILIKE ")
            .push_bind(pattern.clone())
            .push(" ESCAPE '\\' OR special_requests ILIKE ")
            .push_bind(pattern.clone())
            .push(" ESCAPE '\\' OR notes ILIKE ")
            .push_bind(pattern)
            .push(" ESCAPE '\\')");
    }
}

#[async_trait]
impl BookingRepository for PgBookingRepository {
    async fn create_booking(&self, booking: &NewBooking) -> CoreResult<Booking> {
        let row = sqlx::query_as::<_, BookingRow>(&format!(
            r#"
            INSERT INTO bookings (user_id, service_type, service_id, start_date, end_date, guests, total_price,
                                  contact_name, contact_email, contact_phone, special_requests)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {}
            "#,
            BOOKING_COLUMNS
        ))
        .bind(booking.user_id)
        .bind(booking.service.service_type().as_str())
        .bind(booking.service.id())
        .bind(booking.start_date)
        .bind(booking.end_date)
        .bind(booking.guests)
        .bind(booking.total_price)
        .bind(booking.contact_name.as_deref())
        .bind(booking.contact_email.as_ref().map(|m| m.expose().as_str()))
        .bind(booking.contact_phone.as_ref().map(|m| m.expose().as_str()))
        .bind(booking.special_requests.as_deref())
        .fetch_one(&self.pool)
        .await
        .map_err(storage)?;

        row.into_booking()
    }

    async fn get_booking(&self, id: i64) -> CoreResult<Option<Booking>> {
        let row = sqlx::query_as::<_, BookingRow>(&format!("SELECT {} FROM bookings WHERE id = $1", BOOKING_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage)?;

        row.map(BookingRow::into_booking).transpose()
    }

    async fn list_bookings(&self, filter: &BookingFilter, page: PageRequest) -> CoreResult<Page<Booking>> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM bookings");
        push_filter(&mut count, filter);
        let total: i64 = count
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await
            .map_err(storage)?;

        let mut select = QueryBuilder::<Postgres>::new(format!("SELECT {} FROM bookings", BOOKING_COLUMNS));
        push_filter(&mut select, filter);
        select
            .push(" ORDER BY created_at DESC, id DESC LIMIT ")
            .push_bind(i64::from(page.limit))
            .push(" OFFSET ")
            .push_bind(page.offset() as i64);
        let rows = select
            .build_query_as::<BookingRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(storage)?;

        let items = rows.into_iter().map(BookingRow::into_booking).collect::<CoreResult<Vec<_>>>()?;
        Ok(Page::new(items, total.max(0) as u64, page))
    }

    async fn update_details(&self, id: i64, update: &BookingDetailsUpdate) -> CoreResult<Booking> {
        let row = sqlx::query_as::<_, BookingRow>(&format!(
            r#"
            UPDATE bookings
            SET special_requests = COALESCE($2, special_requests),
                contact_phone = COALESCE($3, contact_phone),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            BOOKING_COLUMNS
        ))
        .bind(id)
        .bind(update.special_requests.as_deref())
        .bind(update.contact_phone.as_ref().map(|m| m.expose().as_str()))
        .fetch_optional(&self.pool)
        .await
        .map_err(storage)?;

        row.ok_or_else(|| CoreError::NotFound(format!("Booking {}", id)))?.into_booking()
    }

    async fn apply_status_update(&self, id: i64, update: &StatusUpdate) -> CoreResult<Booking> {
        // The status we validated against; if another writer moved the booking
        // in between, the guarded UPDATE matches nothing.
        let expected_status = update
            .changes
            .iter()
            .find(|c| c.field == ChangeField::Status)
            .map(|c| c.from_value.as_str());

        let mut tx = self.pool.begin().await.map_err(storage)?;

        let row = sqlx::query_as::<_, BookingRow>(&format!(
            r#"
            UPDATE bookings
            SET status = COALESCE($2, status),
                payment_status = COALESCE($3, payment_status),
                notes = COALESCE($4, notes),
                updated_at = NOW()
            WHERE id = $1 AND ($5::TEXT IS NULL OR status = $5)
            RETURNING {}
            "#,
            BOOKING_COLUMNS
        ))
        .bind(id)
        .bind(update.status.map(|s| s.as_str()))
        .bind(update.payment_status.map(|p| p.as_str()))
        .bind(update.notes.as_deref())
        .bind(expected_status)
        .fetch_optional(&mut *tx)
        .await
        .map_err(storage)?;

        let Some(row) = row else {
            return Err(match expected_status {
                Some(_) => CoreError::Conflict(format!("Booking {} was modified concurrently", id)),
                None => CoreError::NotFound(format!("Booking {}", id)),
            });
        };

        for change in &update.changes {
            sqlx::query(
                r#"
                INSERT INTO booking_changes (booking_id, actor_id, field, from_value, to_value, overridden, reason)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(id)
            .bind(change.actor_id)
            .bind(change.field.as_str())
            .bind(&change.from_value)
            .bind(&change.to_value)
            .bind(change.overridden)
            .bind(change.reason.as_deref())
            .execute(&mut *tx)
            .await
            .map_err(storage)?;
        }

        tx.commit().await.map_err(storage)?;
        row.into_booking()
    }

    async fn list_changes(&self, booking_id: i64) -> CoreResult<Vec<BookingChange>> {
        let rows = sqlx::query_as::<_, ChangeRow>(
            r#"
            SELECT id, booking_id, actor_id, field, from_value, to_value, overridden, reason, created_at
            FROM booking_changes
            WHERE booking_id = $1
            ORDER BY created_at, id
            "#,
        )
        .bind(booking_id)
        .fetch_all(&self.pool)
        .await
        .map_err(storage)?;

        rows.into_iter().map(ChangeRow::into_change).collect()
    }

    async fn delete_booking(&self, id: i64) -> CoreResult<bool> {
        let result = sqlx::query("DELETE FROM bookings WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(storage)?;

        Ok(result.rows_affected() > 0)
    }
}
