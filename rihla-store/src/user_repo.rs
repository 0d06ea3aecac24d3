use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rihla_core::repository::{ServiceDirectory, UserRepository};
use rihla_core::service::{ServiceInfo, ServiceRef, ServiceType};
use rihla_core::user::User;
use rihla_core::CoreResult;
use sqlx::PgPool;

use crate::{column, storage};

pub struct PgUserRepository {
    pub pool: PgPool,
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: i64,
    name: String,
    email: String,
    phone: Option<String>,
    role: String,
    created_at: DateTime<Utc>,
}

impl UserRow {
    fn into_user(self) -> CoreResult<User> {
        Ok(User {
            id: self.id,
            name: self.name,
            email: self.email,
            phone: self.phone,
            role: column(&self.role)?,
            created_at: self.created_at,
        })
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn find_user(&self, id: i64) -> CoreResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, name, email, phone, role, created_at FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage)?;

        row.map(UserRow::into_user).transpose()
    }
}

/// Looks booked services up in the catalog tables.
pub struct PgServiceDirectory {
    pub pool: PgPool,
}

#[derive(sqlx::FromRow)]
struct ServiceRow {
    display_name: String,
    provider_user_id: Option<i64>,
    guide_id: Option<i64>,
}

#[async_trait]
impl ServiceDirectory for PgServiceDirectory {
    async fn describe(&self, service: ServiceRef) -> CoreResult<Option<ServiceInfo>> {
        let query = match service {
            ServiceRef::Hotel(_) => {
                r#"
                SELECT h.name || ' - ' || r.name AS display_name,
                       h.owner_id AS provider_user_id,
                       NULL::BIGINT AS guide_id
                FROM rooms r
                JOIN hotels h ON h.id = r.hotel_id
                WHERE r.id = $1
                "#
            }
            ServiceRef::Car(_) => {
                "SELECT name AS display_name, owner_id AS provider_user_id, NULL::BIGINT AS guide_id FROM cars WHERE id = $1"
            }
            ServiceRef::Tour(_) => {
                r#"
                SELECT t.title AS display_name,
                       g.user_id AS provider_user_id,
                       t.guide_id AS guide_id
                FROM tours t
                LEFT JOIN guides g ON g.id = t.guide_id
                WHERE t.id = $1
                "#
            }
            ServiceRef::Bundle(_) => {
                r#"
                SELECT title AS display_name, NULL::BIGINT AS provider_user_id, NULL::BIGINT AS guide_id
                FROM content_entries
                WHERE id = $1 AND kind = 'BUNDLE'
                "#
            }
            ServiceRef::Health(_) | ServiceRef::Education(_) | ServiceRef::Umrah(_) | ServiceRef::Historical(_) => {
                r#"
                SELECT name AS display_name, provider_id AS provider_user_id, NULL::BIGINT AS guide_id
                FROM tourism_programs
                WHERE id = $1 AND program_type = $2
                "#
            }
        };

        // Program lookups also filter on the program type.
        let mut q = sqlx::query_as::<_, ServiceRow>(query).bind(service.id());
        if query.contains("$2") {
            q = q.bind(service.service_type().as_str());
        }
        let row = q.fetch_optional(&self.pool).await.map_err(storage)?;

        Ok(row.map(|r| ServiceInfo {
            display_name: r.display_name,
            provider_user_id: r.provider_user_id,
            guide_id: r.guide_id,
        }))
    }

    async fn services_of(&self, provider_user_id: i64) -> CoreResult<Vec<ServiceRef>> {
        let rows = sqlx::query_as::<_, (String, i64)>(
            r#"
            SELECT 'HOTEL' AS service_type, r.id AS service_id
            FROM rooms r JOIN hotels h ON h.id = r.hotel_id
            WHERE h.owner_id = $1
            UNION ALL
            SELECT 'CAR', id FROM cars WHERE owner_id = $1
            UNION ALL
            SELECT 'TOUR', t.id
            FROM tours t JOIN guides g ON g.id = t.guide_id
            WHERE g.user_id = $1
            UNION ALL
            SELECT program_type, id FROM tourism_programs WHERE provider_id = $1
            "#,
        )
        .bind(provider_user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(storage)?;

        rows.into_iter()
            .map(|(ty, id)| Ok(ServiceRef::new(column::<ServiceType>(&ty)?, id)))
            .collect()
    }
}
