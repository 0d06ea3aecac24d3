//! Translatable editorial content: blog posts, tourism news and bundles.
//!
//! All three share one model. The English text is canonical and is copied to
//! the parent row; every language, English included, also has its own row in
//! the translation map.

use chrono::{DateTime, Utc};
use rihla_shared::{Language, LocalizedInput, LocalizedText, TranslationMap};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::booking::{amount, round_cents};
use crate::repository::ContentRepository;
use crate::{CoreError, CoreResult};

string_enum! {
    pub enum ContentKind {
        Blog => "BLOG",
        News => "NEWS",
        Bundle => "BUNDLE",
    }
}

impl ContentKind {
    /// Collection segment under `/api`.
    pub fn path(self) -> &'static str {
        match self {
            ContentKind::Blog => "blogs",
            ContentKind::News => "news",
            ContentKind::Bundle => "bundles",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ContentKind::Blog => "blog",
            ContentKind::News => "news article",
            ContentKind::Bundle => "bundle",
        }
    }
}

/// Non-translatable attributes. `price` and `duration_days` only mean
/// something for bundles.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentAttributes {
    pub category: Option<String>,
    pub images: Vec<String>,
    pub tags: Vec<String>,
    pub published: bool,
    pub featured: bool,
    pub price: Option<Decimal>,
    pub duration_days: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentEntry {
    pub id: i64,
    pub kind: ContentKind,
    pub slug: String,
    pub title: String,
    pub excerpt: String,
    pub content: String,
    pub translations: TranslationMap,
    #[serde(flatten)]
    pub attributes: ContentAttributes,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ContentEntry {
    pub fn localized(&self, language: Language, fallback: Language) -> LocalizedEntry {
        let text = self.translations.localized(language, fallback);
        LocalizedEntry {
            id: self.id,
            kind: self.kind,
            slug: self.slug.clone(),
            language,
            title: text.title,
            excerpt: text.excerpt,
            content: text.content,
            attributes: self.attributes.clone(),
            published_at: self.published_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    /// Copies the English translation onto the canonical columns.
    fn sync_canonical(&mut self) {
        let english = self.translations.get(Language::English).cloned().unwrap_or_default();
        self.title = english.title;
        self.excerpt = english.excerpt;
        self.content = english.content;
    }
}

/// A single-language view of an entry, as served to the public site.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalizedEntry {
    pub id: i64,
    pub kind: ContentKind,
    pub slug: String,
    pub language: Language,
    pub title: String,
    pub excerpt: String,
    pub content: String,
    #[serde(flatten)]
    pub attributes: ContentAttributes,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Create/update payload: per-language text plus shared attributes.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentRequest {
    #[serde(flatten)]
    pub text: LocalizedInput,
    pub category: Option<String>,
    pub images: Option<Vec<String>>,
    pub tags: Option<Vec<String>>,
    pub published: Option<bool>,
    pub featured: Option<bool>,
    pub price: Option<Decimal>,
    pub duration_days: Option<i32>,
}

impl ContentRequest {
    fn validate_attributes(&self) -> CoreResult<()> {
        if let Some(price) = self.price {
            amount("price", price)?;
        }
        if self.duration_days.is_some_and(|d| d < 1) {
            return Err(CoreError::validation("durationDays must be at least 1"));
        }
        Ok(())
    }

    fn apply_attributes(&self, attributes: &mut ContentAttributes) {
        if let Some(category) = &self.category {
            attributes.category = Some(category.trim().to_string()).filter(|c| !c.is_empty());
        }
        if let Some(images) = &self.images {
            attributes.images = images.clone();
        }
        if let Some(tags) = &self.tags {
            attributes.tags = tags.iter().map(|t| t.trim().to_string()).filter(|t| !t.is_empty()).collect();
        }
        if let Some(published) = self.published {
            attributes.published = published;
        }
        if let Some(featured) = self.featured {
            attributes.featured = featured;
        }
        if self.price.is_some() {
            attributes.price = self.price.map(round_cents);
        }
        if self.duration_days.is_some() {
            attributes.duration_days = self.duration_days;
        }
    }
}

/// A validated new entry.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentDraft {
    pub kind: ContentKind,
    pub slug: String,
    pub text: LocalizedText,
    pub translations: TranslationMap,
    pub attributes: ContentAttributes,
}

impl ContentDraft {
    pub fn from_request(kind: ContentKind, request: &ContentRequest) -> CoreResult<Self> {
        let title = request
            .text
            .english_title()
            .ok_or_else(|| CoreError::validation("English title is required"))?;
        request
            .text
            .english_content()
            .ok_or_else(|| CoreError::validation("English content is required"))?;
        request.validate_attributes()?;

        let slug = slug_for(title)?;
        let translations = request.text.to_translation_map();
        let text = translations.get(Language::English).cloned().unwrap_or_default();
        let mut attributes = ContentAttributes::default();
        request.apply_attributes(&mut attributes);

        Ok(Self { kind, slug, text, translations, attributes })
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContentFilter {
    pub kind: Option<ContentKind>,
    pub published: Option<bool>,
    pub featured: Option<bool>,
    pub category: Option<String>,
    pub search: Option<String>,
}

impl ContentFilter {
    pub fn matches(&self, entry: &ContentEntry) -> bool {
        if self.kind.is_some_and(|k| entry.kind != k) {
            return false;
        }
        if self.published.is_some_and(|p| entry.attributes.published != p) {
            return false;
        }
        if self.featured.is_some_and(|f| entry.attributes.featured != f) {
            return false;
        }
        if let Some(category) = &self.category {
            if entry.attributes.category.as_deref() != Some(category.as_str()) {
                return false;
            }
        }
        match self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            None => true,
            Some(term) => {
                let term = term.to_lowercase();
                [&entry.title, &entry.excerpt, &entry.content]
                    .iter()
                    .any(|f| f.to_lowercase().contains(&term))
            }
        }
    }
}

/// Lower-case ASCII words joined by single dashes.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    for ch in title.chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    slug.trim_end_matches('-').to_string()
}

fn slug_for(title: &str) -> CoreResult<String> {
    let slug = slugify(title);
    if slug.is_empty() {
        return Err(CoreError::validation("English title must contain letters or digits"));
    }
    Ok(slug)
}

/// Raised when another entry of the same kind already owns the slug.
pub fn duplicate_slug(kind: ContentKind, slug: &str) -> CoreError {
    CoreError::validation(format!("A {} with slug '{}' already exists", kind.label(), slug))
}

pub async fn create_entry(repo: &dyn ContentRepository, kind: ContentKind, request: &ContentRequest) -> CoreResult<ContentEntry> {
    let draft = ContentDraft::from_request(kind, request)?;
    if repo.slug_taken(kind, &draft.slug, None).await? {
        return Err(duplicate_slug(kind, &draft.slug));
    }
    let entry = repo.create_entry(&draft).await?;
    info!("Created {} {} ({})", kind.label(), entry.id, entry.slug);
    Ok(entry)
}

/// Applies an update. The slug follows the English title, and is only
/// regenerated (and re-checked for uniqueness) when that title changes.
pub async fn update_entry(
    repo: &dyn ContentRepository,
    kind: ContentKind,
    id: i64,
    request: &ContentRequest,
) -> CoreResult<ContentEntry> {
    let mut entry = repo
        .get_entry(kind, id)
        .await?
        .ok_or_else(|| CoreError::NotFound(format!("{} {}", kind.label(), id)))?;
    request.validate_attributes()?;

    if let Some(title) = &request.text.title {
        if title.get(Language::English).map(str::trim).unwrap_or_default().is_empty() {
            return Err(CoreError::validation("English title must not be empty"));
        }
    }
    if let Some(content) = &request.text.content {
        if content.get(Language::English).map(str::trim).unwrap_or_default().is_empty() {
            return Err(CoreError::validation("English content must not be empty"));
        }
    }

    let previous_title = entry.title.clone();
    request.text.apply_to(&mut entry.translations);
    entry.sync_canonical();

    if entry.title != previous_title {
        let slug = slug_for(&entry.title)?;
        if slug != entry.slug {
            if repo.slug_taken(kind, &slug, Some(id)).await? {
                return Err(duplicate_slug(kind, &slug));
            }
            entry.slug = slug;
        }
    }

    let was_published = entry.attributes.published;
    request.apply_attributes(&mut entry.attributes);
    if entry.attributes.published && !was_published && entry.published_at.is_none() {
        entry.published_at = Some(Utc::now());
    }

    let updated = repo.update_entry(&entry).await?;
    info!("Updated {} {} ({})", kind.label(), updated.id, updated.slug);
    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(body: serde_json::Value) -> ContentRequest {
        serde_json::from_value(body).unwrap()
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Top 10 Riads in Marrakech!"), "top-10-riads-in-marrakech");
        assert_eq!(slugify("  --Umrah: A Guide--  "), "umrah-a-guide");
        assert_eq!(slugify("رحلة"), "");
    }

    #[test]
    fn test_draft_from_english_only() {
        let req = request(json!({
            "title": {"en": "Chefchaouen in Spring"},
            "content": {"en": "Blue streets."},
            "category": "destinations",
            "tags": ["north", " "],
            "published": true
        }));
        let draft = ContentDraft::from_request(ContentKind::Blog, &req).unwrap();

        assert_eq!(draft.slug, "chefchaouen-in-spring");
        assert_eq!(draft.text.title, "Chefchaouen in Spring");
        assert_eq!(draft.attributes.tags, vec!["north".to_string()]);
        assert!(draft.attributes.published);
        assert_eq!(draft.translations.get(Language::Arabic).unwrap().title, "");
        assert_eq!(draft.translations.get(Language::French).unwrap().content, "");
    }

    #[test]
    fn test_draft_requires_english() {
        let missing_title = request(json!({"title": {"ar": "عنوان"}, "content": {"en": "x"}}));
        assert!(matches!(
            ContentDraft::from_request(ContentKind::News, &missing_title),
            Err(CoreError::Validation(msg)) if msg == "English title is required"
        ));

        let missing_content = request(json!({"title": {"en": "Title"}}));
        assert!(matches!(
            ContentDraft::from_request(ContentKind::News, &missing_content),
            Err(CoreError::Validation(msg)) if msg == "English content is required"
        ));
    }

    #[test]
    fn test_bundle_attribute_checks() {
        let req = request(json!({"title": {"en": "Desert week"}, "content": {"en": "x"}, "price": -5}));
        assert!(ContentDraft::from_request(ContentKind::Bundle, &req).is_err());

        let req = request(json!({"title": {"en": "Desert week"}, "content": {"en": "x"}, "price": 499.5, "durationDays": 7}));
        let draft = ContentDraft::from_request(ContentKind::Bundle, &req).unwrap();
        assert_eq!(draft.attributes.duration_days, Some(7));

        let mut req = request(json!({"title": {"en": "Desert week"}, "content": {"en": "x"}}));
        req.price = Some(Decimal::from_str_exact("499.555").unwrap());
        let draft = ContentDraft::from_request(ContentKind::Bundle, &req).unwrap();
        assert_eq!(draft.attributes.price, Some(Decimal::new(49956, 2)));

        req.price = Some(Decimal::new(1_000_000_000_000, 2));
        assert!(ContentDraft::from_request(ContentKind::Bundle, &req).is_err());
    }

    #[test]
    fn test_filter_search() {
        let now = Utc::now();
        let entry = ContentEntry {
            id: 1,
            kind: ContentKind::Blog,
            slug: "a".into(),
            title: "Surfing in Taghazout".into(),
            excerpt: String::new(),
            content: "Waves".into(),
            translations: TranslationMap::new(),
            attributes: ContentAttributes { published: true, ..Default::default() },
            published_at: Some(now),
            created_at: now,
            updated_at: now,
        };
        let filter = ContentFilter { search: Some("surf".into()), ..Default::default() };
        assert!(filter.matches(&entry));
        let filter = ContentFilter { kind: Some(ContentKind::News), ..Default::default() };
        assert!(!filter.matches(&entry));
        let filter = ContentFilter { published: Some(false), ..Default::default() };
        assert!(!filter.matches(&entry));
    }
}
