use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rihla_core::content::{
    duplicate_slug, ContentAttributes, ContentDraft, ContentEntry, ContentFilter, ContentKind,
};
use rihla_core::repository::ContentRepository;
use rihla_core::{CoreError, CoreResult};
use rihla_shared::{Language, LocalizedText, Page, PageRequest, TranslationMap};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, QueryBuilder, Transaction};
use std::collections::HashMap;

use crate::{column, contains_pattern, storage};

const ENTRY_COLUMNS: &str = "id, kind, slug, title, excerpt, content, category, images, tags, published, featured, \
     price, duration_days, published_at, created_at, updated_at";

/// Blog posts, news and bundles. The parent row carries the English text;
/// `content_translations` holds one row per language.
pub struct PgContentRepository {
    pub pool: PgPool,
}

#[derive(sqlx::FromRow)]
struct EntryRow {
    id: i64,
    kind: String,
    slug: String,
    title: String,
    excerpt: String,
    content: String,
    category: Option<String>,
    images: Vec<String>,
    tags: Vec<String>,
    published: bool,
    featured: bool,
    price: Option<Decimal>,
    duration_days: Option<i32>,
    published_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl EntryRow {
    fn into_entry(self, translations: TranslationMap) -> CoreResult<ContentEntry> {
        Ok(ContentEntry {
            id: self.id,
            kind: column(&self.kind)?,
            slug: self.slug,
            title: self.title,
            excerpt: self.excerpt,
            content: self.content,
            translations,
            attributes: ContentAttributes {
                category: self.category,
                images: self.images,
                tags: self.tags,
                published: self.published,
                featured: self.featured,
                price: self.price,
                duration_days: self.duration_days,
            },
            published_at: self.published_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct TranslationRow {
    entry_id: i64,
    language: String,
    title: String,
    excerpt: String,
    content: String,
}

fn slug_conflict(err: sqlx::Error, kind: ContentKind, slug: &str) -> CoreError {
    match err {
        sqlx::Error::Database(db) if db.is_unique_violation() => duplicate_slug(kind, slug),
        other => storage(other),
    }
}

impl PgContentRepository {
    async fn translations_for(&self, ids: &[i64]) -> CoreResult<HashMap<i64, TranslationMap>> {
        let rows = sqlx::query_as::<_, TranslationRow>(
            "SELECT entry_id, language, title, excerpt, content FROM content_translations WHERE entry_id = ANY($1)",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await
        .map_err(storage)?;

        let mut grouped: HashMap<i64, TranslationMap> = HashMap::new();
        for row in rows {
            let language: Language = column(&row.language)?;
            grouped.entry(row.entry_id).or_default().set(
                language,
                LocalizedText { title: row.title, excerpt: row.excerpt, content: row.content },
            );
        }
        Ok(grouped)
    }

    async fn hydrate(&self, row: EntryRow) -> CoreResult<ContentEntry> {
        let mut translations = self.translations_for(&[row.id]).await?;
        let map = translations.remove(&row.id).unwrap_or_default();
        row.into_entry(map)
    }

    async fn upsert_translations(
        tx: &mut Transaction<'_, Postgres>,
        entry_id: i64,
        translations: &TranslationMap,
    ) -> CoreResult<()> {
        for (language, text) in translations.iter() {
            sqlx::query(
                r#"
                INSERT INTO content_translations (entry_id, language, title, excerpt, content)
                VALUES ($1, $2, $3, $4, $5)
                ON CONFLICT (entry_id, language)
                DO UPDATE SET title = EXCLUDED.title, excerpt = EXCLUDED.excerpt, content = EXCLUDED.content
                "#,
            )
            .bind(entry_id)
            .bind(translation_key(language))
            .bind(&text.title)
            .bind(&text.excerpt)
            .bind(&text.content)
            .execute(&mut **tx)
            .await
            .map_err(storage)?;
        }
        Ok(())
    }
}

/// Value stored in `content_translations.language`.
fn translation_key(language: Language) -> &'static str {
    language.as_str()
}

fn push_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &ContentFilter) {
    qb.push(" WHERE TRUE");
    if let Some(kind) = filter.kind {
        qb.push(" AND kind = ").push_bind(kind.as_str());
    }
    if let Some(published) = filter.published {
        qb.push(" AND published = ").push_bind(published);
    }
    if let Some(featured) = filter.featured {
        qb.push(" AND featured = ").push_bind(featured);
    }
    if let Some(category) = &filter.category {
        qb.push(" AND category = ").push_bind(category.clone());
    }
    if let Some(term) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let pattern = contains_pattern(term);
        qb.push(" AND (title ILIKE ")
            .push_bind(pattern.clone())
            .push(" ESCAPE '\\' OR excerpt ILIKE ")
            .push_bind(pattern.clone())
            .push(" ESCAPE '\\' OR content ILIKE ")
            .push_bind(pattern)
            .push(" ESCAPE '\\')");
    }
}

#[async_trait]
impl ContentRepository for PgContentRepository {
    async fn create_entry(&self, draft: &ContentDraft) -> CoreResult<ContentEntry> {
        let mut tx = self.pool.begin().await.map_err(storage)?;
        let attributes = &draft.attributes;

        let row = sqlx::query_as::<_, EntryRow>(&format!(
            r#"
            INSERT INTO content_entries (kind, slug, title, excerpt, content, category, images, tags,
                                         published, featured, price, duration_days, published_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, CASE WHEN $9 THEN NOW() END)
            RETURNING {}
            "#,
            ENTRY_COLUMNS
        ))
        .bind(draft.kind.as_str())
        .bind(&draft.slug)
        .bind(&draft.text.title)
        .bind(&draft.text.excerpt)
        .bind(&draft.text.content)
        .bind(attributes.category.as_deref())
        .bind(&attributes.images)
        .bind(&attributes.tags)
        .bind(attributes.published)
        .bind(attributes.featured)
        .bind(attributes.price)
        .bind(attributes.duration_days)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| slug_conflict(e, draft.kind, &draft.slug))?;

        Self::upsert_translations(&mut tx, row.id, &draft.translations).await?;
        tx.commit().await.map_err(storage)?;

        row.into_entry(draft.translations.clone())
    }

    async fn get_entry(&self, kind: ContentKind, id: i64) -> CoreResult<Option<ContentEntry>> {
        let row = sqlx::query_as::<_, EntryRow>(&format!(
            "SELECT {} FROM content_entries WHERE id = $1 AND kind = $2",
            ENTRY_COLUMNS
        ))
        .bind(id)
        .bind(kind.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(storage)?;

        match row {
            Some(row) => Ok(Some(self.hydrate(row).await?)),
            None => Ok(None),
        }
    }

    async fn find_by_slug(&self, kind: ContentKind, slug: &str) -> CoreResult<Option<ContentEntry>> {
        let row = sqlx::query_as::<_, EntryRow>(&format!(
            "SELECT {} FROM content_entries WHERE slug = $1 AND kind = $2",
            ENTRY_COLUMNS
        ))
        .bind(slug)
        .bind(kind.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(storage)?;

        match row {
            Some(row) => Ok(Some(self.hydrate(row).await?)),
            None => Ok(None),
        }
    }

    async fn slug_taken(&self, kind: ContentKind, slug: &str, exclude_id: Option<i64>) -> CoreResult<bool> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM content_entries WHERE kind = $1 AND slug = $2 AND ($3::BIGINT IS NULL OR id <> $3))",
        )
        .bind(kind.as_str())
        .bind(slug)
        .bind(exclude_id)
        .fetch_one(&self.pool)
        .await
        .map_err(storage)
    }

    async fn update_entry(&self, entry: &ContentEntry) -> CoreResult<ContentEntry> {
        let mut tx = self.pool.begin().await.map_err(storage)?;
        let attributes = &entry.attributes;

        let row = sqlx::query_as::<_, EntryRow>(&format!(
            r#"
            UPDATE content_entries
            SET slug = $3, title = $4, excerpt = $5, content = $6, category = $7, images = $8, tags = $9,
                published = $10, featured = $11, price = $12, duration_days = $13, published_at = $14,
                updated_at = NOW()
            WHERE id = $1 AND kind = $2
            RETURNING {}
            "#,
            ENTRY_COLUMNS
        ))
        .bind(entry.id)
        .bind(entry.kind.as_str())
        .bind(&entry.slug)
        .bind(&entry.title)
        .bind(&entry.excerpt)
        .bind(&entry.content)
        .bind(attributes.category.as_deref())
        .bind(&attributes.images)
        .bind(&attributes.tags)
        .bind(attributes.published)
        .bind(attributes.featured)
        .bind(attributes.price)
        .bind(attributes.duration_days)
        .bind(entry.published_at)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| slug_conflict(e, entry.kind, &entry.slug))?
        .ok_or_else(|| CoreError::NotFound(format!("{} {}", entry.kind.label(), entry.id)))?;

        Self::upsert_translations(&mut tx, row.id, &entry.translations).await?;
        tx.commit().await.map_err(storage)?;

        row.into_entry(entry.translations.clone())
    }

    async fn delete_entry(&self, kind: ContentKind, id: i64) -> CoreResult<bool> {
        let result = sqlx::query("DELETE FROM content_entries WHERE id = $1 AND kind = $2")
            .bind(id)
            .bind(kind.as_str())
            .execute(&self.pool)
            .await
            .map_err(storage)?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_entries(&self, filter: &ContentFilter, page: PageRequest) -> CoreResult<Page<ContentEntry>> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM content_entries");
        push_filter(&mut count, filter);
        let total = count
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await
            .map_err(storage)?;

        let mut select = QueryBuilder::<Postgres>::new(format!("SELECT {} FROM content_entries", ENTRY_COLUMNS));
        push_filter(&mut select, filter);
        select
            .push(" ORDER BY created_at DESC, id DESC LIMIT ")
            .push_bind(i64::from(page.limit))
            .push(" OFFSET ")
            .push_bind(page.offset() as i64);
        let rows = select
            .build_query_as::<EntryRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(storage)?;

        let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
        let mut translations = self.translations_for(&ids).await?;
        let items = rows
            .into_iter()
            .map(|row| {
                let map = translations.remove(&row.id).unwrap_or_default();
                row.into_entry(map)
            })
            .collect::<CoreResult<Vec<_>>>()?;
        Ok(Page::new(items, total.max(0) as u64, page))
    }
}
