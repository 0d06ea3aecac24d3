use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rihla_core::repository::ReviewRepository;
use rihla_core::review::{already_rated, NewReview, RatingSummary, Review};
use rihla_core::service::{ServiceRef, ServiceType};
use rihla_core::CoreResult;
use rihla_shared::{Page, PageRequest};
use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::{column, storage};

const REVIEW_COLUMNS: &str =
    "id, booking_id, user_id, service_type, service_id, guide_id, rating, title, comment, created_at";

pub struct PgReviewRepository {
    pub pool: PgPool,
}

#[derive(sqlx::FromRow)]
struct ReviewRow {
    id: i64,
    booking_id: i64,
    user_id: i64,
    service_type: String,
    service_id: i64,
    guide_id: Option<i64>,
    rating: i32,
    title: Option<String>,
    comment: Option<String>,
    created_at: DateTime<Utc>,
}

impl ReviewRow {
    fn into_review(self) -> CoreResult<Review> {
        Ok(Review {
            id: self.id,
            booking_id: self.booking_id,
            user_id: self.user_id,
            service: ServiceRef::new(column::<ServiceType>(&self.service_type)?, self.service_id),
            guide_id: self.guide_id,
            rating: self.rating,
            title: self.title,
            comment: self.comment,
            created_at: self.created_at,
        })
    }
}

fn push_service(qb: &mut QueryBuilder<'_, Postgres>, service: Option<ServiceRef>) {
    if let Some(service) = service {
        qb.push(" WHERE service_type = ")
            .push_bind(service.service_type().as_str())
            .push(" AND service_id = ")
            .push_bind(service.id());
    }
}

#[async_trait]
impl ReviewRepository for PgReviewRepository {
    async fn create_review(&self, review: &NewReview) -> CoreResult<Review> {
        let mut tx = self.pool.begin().await.map_err(storage)?;

        // Serializes concurrent submissions for the same booking.
        sqlx::query("SELECT id FROM bookings WHERE id = $1 FOR UPDATE")
            .bind(review.booking_id)
            .execute(&mut *tx)
            .await
            .map_err(storage)?;

        let inserted = sqlx::query_as::<_, ReviewRow>(&format!(
            r#"
            INSERT INTO reviews (booking_id, user_id, service_type, service_id, guide_id, rating, title, comment)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {}
            "#,
            REVIEW_COLUMNS
        ))
        .bind(review.booking_id)
        .bind(review.user_id)
        .bind(review.service.service_type().as_str())
        .bind(review.service.id())
        .bind(review.guide_id)
        .bind(review.rating)
        .bind(review.title.as_deref())
        .bind(review.comment.as_deref())
        .fetch_one(&mut *tx)
        .await;

        let row = match inserted {
            Ok(row) => row,
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => return Err(already_rated()),
            Err(e) => return Err(storage(e)),
        };

        tx.commit().await.map_err(storage)?;
        row.into_review()
    }

    async fn find_by_booking(&self, booking_id: i64) -> CoreResult<Option<Review>> {
        let row = sqlx::query_as::<_, ReviewRow>(&format!("SELECT {} FROM reviews WHERE booking_id = $1", REVIEW_COLUMNS))
            .bind(booking_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage)?;

        row.map(ReviewRow::into_review).transpose()
    }

    async fn list_reviews(&self, service: Option<ServiceRef>, page: PageRequest) -> CoreResult<Page<Review>> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM reviews");
        push_service(&mut count, service);
        let total = count
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await
            .map_err(storage)?;

        let mut select = QueryBuilder::<Postgres>::new(format!("SELECT {} FROM reviews", REVIEW_COLUMNS));
        push_service(&mut select, service);
        select
            .push(" ORDER BY created_at DESC, id DESC LIMIT ")
            .push_bind(i64::from(page.limit))
            .push(" OFFSET ")
            .push_bind(page.offset() as i64);
        let rows = select
            .build_query_as::<ReviewRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(storage)?;

        let items = rows.into_iter().map(ReviewRow::into_review).collect::<CoreResult<Vec<_>>>()?;
        Ok(Page::new(items, total.max(0) as u64, page))
    }

    async fn rating_summary(&self, service: Option<ServiceRef>) -> CoreResult<RatingSummary> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT AVG(rating)::FLOAT8, COUNT(*) FROM reviews");
        push_service(&mut qb, service);
        let (average, count) = qb
            .build_query_as::<(Option<f64>, i64)>()
            .fetch_one(&self.pool)
            .await
            .map_err(storage)?;

        Ok(RatingSummary { average_rating: average, review_count: count.max(0) as u64 })
    }
}
