pub mod app_config;
pub mod booking_repo;
pub mod content_repo;
pub mod database;
pub mod memory;
pub mod notification_repo;
pub mod offer_repo;
pub mod review_repo;
pub mod user_repo;

pub use booking_repo::PgBookingRepository;
pub use content_repo::PgContentRepository;
pub use database::DbClient;
pub use memory::MemoryStore;
pub use notification_repo::PgNotificationRepository;
pub use offer_repo::PgSpecialOfferRepository;
pub use review_repo::PgReviewRepository;
pub use user_repo::{PgServiceDirectory, PgUserRepository};

use rihla_core::CoreError;
use std::str::FromStr;

pub(crate) fn storage(err: sqlx::Error) -> CoreError {
    CoreError::storage(err)
}

/// Parses an enum column, treating an unknown value as a storage fault.
pub(crate) fn column<T>(raw: &str) -> Result<T, CoreError>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    T::from_str(raw).map_err(CoreError::storage)
}

/// `%term%` for `ILIKE ... ESCAPE '\'`, with the term's own wildcards
/// matched literally.
pub(crate) fn contains_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for ch in term.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}
