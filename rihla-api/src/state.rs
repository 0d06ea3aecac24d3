use std::sync::Arc;

use rihla_core::lifecycle::BookingLifecycle;
use rihla_core::repository::{
    BookingRepository, ContentRepository, NotificationRepository, ReviewRepository, ServiceDirectory,
    SpecialOfferRepository, UserRepository,
};
use rihla_shared::{Language, PageLimits, PageRequest};
use rihla_store::{
    DbClient, MemoryStore, PgBookingRepository, PgContentRepository, PgNotificationRepository, PgReviewRepository,
    PgServiceDirectory, PgSpecialOfferRepository, PgUserRepository,
};

#[derive(Clone)]
pub struct AuthConfig {
    pub secret: String,
    /// Session token lifetime in seconds.
    pub expiration: u64,
}

#[derive(Clone)]
pub struct ApiSettings {
    pub page_limits: PageLimits,
    pub default_language: Language,
    pub expose_error_details: bool,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            page_limits: PageLimits::default(),
            default_language: Language::English,
            expose_error_details: false,
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserRepository>,
    pub directory: Arc<dyn ServiceDirectory>,
    pub bookings: Arc<dyn BookingRepository>,
    pub reviews: Arc<dyn ReviewRepository>,
    pub notifications: Arc<dyn NotificationRepository>,
    pub content: Arc<dyn ContentRepository>,
    pub offers: Arc<dyn SpecialOfferRepository>,
    pub auth: AuthConfig,
    pub settings: ApiSettings,
}

impl AppState {
    pub fn postgres(db: &DbClient, auth: AuthConfig, settings: ApiSettings) -> Self {
        let pool = db.pool.clone();
        Self {
            users: Arc::new(PgUserRepository { pool: pool.clone() }),
            directory: Arc::new(PgServiceDirectory { pool: pool.clone() }),
            bookings: Arc::new(PgBookingRepository { pool: pool.clone() }),
            reviews: Arc::new(PgReviewRepository { pool: pool.clone() }),
            notifications: Arc::new(PgNotificationRepository { pool: pool.clone() }),
            content: Arc::new(PgContentRepository { pool: pool.clone() }),
            offers: Arc::new(PgSpecialOfferRepository { pool }),
            auth,
            settings,
        }
    }

    pub fn in_memory(store: MemoryStore, auth: AuthConfig, settings: ApiSettings) -> Self {
        let store = Arc::new(store);
        Self {
            users: store.clone(),
            directory: store.clone(),
            bookings: store.clone(),
            reviews: store.clone(),
            notifications: store.clone(),
            content: store.clone(),
            offers: store,
            auth,
            settings,
        }
    }

    pub fn lifecycle(&self) -> BookingLifecycle<'_> {
        BookingLifecycle::new(self.bookings.as_ref(), self.directory.as_ref(), self.notifications.as_ref())
    }

    pub fn page(&self, page: Option<u32>, limit: Option<u32>) -> PageRequest {
        PageRequest::new(page, limit, self.settings.page_limits)
    }
}
