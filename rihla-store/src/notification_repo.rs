use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rihla_core::notification::{NewNotification, Notification, NotificationFilter};
use rihla_core::repository::NotificationRepository;
use rihla_core::CoreResult;
use rihla_shared::{Page, PageRequest};
use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::{column, storage};

const NOTIFICATION_COLUMNS: &str =
    "id, user_id, category, priority, title, message, is_read, read_at, related_id, related_type, created_at";

pub struct PgNotificationRepository {
    pub pool: PgPool,
}

#[derive(sqlx::FromRow)]
struct NotificationRow {
    id: i64,
    user_id: i64,
    category: String,
    priority: String,
    title: String,
    message: String,
    is_read: bool,
    read_at: Option<DateTime<Utc>>,
    related_id: Option<i64>,
    related_type: Option<String>,
    created_at: DateTime<Utc>,
}

impl NotificationRow {
    fn into_notification(self) -> CoreResult<Notification> {
        Ok(Notification {
            id: self.id,
            user_id: self.user_id,
            category: column(&self.category)?,
            priority: column(&self.priority)?,
            title: self.title,
            message: self.message,
            is_read: self.is_read,
            read_at: self.read_at,
            related_id: self.related_id,
            related_type: self.related_type,
            created_at: self.created_at,
        })
    }
}

fn push_filter(qb: &mut QueryBuilder<'_, Postgres>, user_id: i64, filter: &NotificationFilter) {
    qb.push(" WHERE user_id = ").push_bind(user_id);
    if filter.unread_only {
        qb.push(" AND NOT is_read");
    }
    if let Some(category) = filter.category {
        qb.push(" AND category = ").push_bind(category.as_str());
    }
}

#[async_trait]
impl NotificationRepository for PgNotificationRepository {
    async fn create_notification(&self, notification: &NewNotification) -> CoreResult<Notification> {
        let row = sqlx::query_as::<_, NotificationRow>(&format!(
            r#"
            INSERT INTO notifications (user_id, category, priority, title, message, related_id, related_type)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {}
            "#,
            NOTIFICATION_COLUMNS
        ))
        .bind(notification.user_id)
        .bind(notification.category.as_str())
        .bind(notification.priority.as_str())
        .bind(&notification.title)
        .bind(&notification.message)
        .bind(notification.related_id)
        .bind(notification.related_type.as_deref())
        .fetch_one(&self.pool)
        .await
        .map_err(storage)?;

        row.into_notification()
    }

    async fn list_notifications(
        &self,
        user_id: i64,
        filter: &NotificationFilter,
        page: PageRequest,
    ) -> CoreResult<Page<Notification>> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM notifications");
        push_filter(&mut count, user_id, filter);
        let total = count
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await
            .map_err(storage)?;

        let mut select = QueryBuilder::<Postgres>::new(format!("SELECT {} FROM notifications", NOTIFICATION_COLUMNS));
        push_filter(&mut select, user_id, filter);
        select
            .push(" ORDER BY created_at DESC, id DESC LIMIT ")
            .push_bind(i64::from(page.limit))
            .push(" OFFSET ")
            .push_bind(page.offset() as i64);
        let rows = select
            .build_query_as::<NotificationRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(storage)?;

        let items = rows
            .into_iter()
            .map(NotificationRow::into_notification)
            .collect::<CoreResult<Vec<_>>>()?;
        Ok(Page::new(items, total.max(0) as u64, page))
    }

    async fn unread_count(&self, user_id: i64) -> CoreResult<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM notifications WHERE user_id = $1 AND NOT is_read")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
            .map_err(storage)?;

        Ok(count.max(0) as u64)
    }

    async fn mark_read(&self, user_id: i64, id: i64) -> CoreResult<Option<Notification>> {
        let row = sqlx::query_as::<_, NotificationRow>(&format!(
            r#"
            UPDATE notifications
            SET is_read = TRUE, read_at = COALESCE(read_at, NOW())
            WHERE id = $1 AND user_id = $2
            RETURNING {}
            "#,
            NOTIFICATION_COLUMNS
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage)?;

        row.map(NotificationRow::into_notification).transpose()
    }

    async fn mark_all_read(&self, user_id: i64) -> CoreResult<u64> {
        let result = sqlx::query("UPDATE notifications SET is_read = TRUE, read_at = NOW() WHERE user_id = $1 AND NOT is_read")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(storage)?;

        Ok(result.rows_affected())
    }

    async fn delete_notification(&self, user_id: i64, id: i64) -> CoreResult<bool> {
        let result = sqlx::query("DELETE FROM notifications WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(storage)?;

        Ok(result.rows_affected() > 0)
    }
}
