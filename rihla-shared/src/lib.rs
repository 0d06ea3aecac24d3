pub mod i18n;
pub mod pagination;
pub mod pii;

pub use i18n::{Language, LocalizedField, LocalizedInput, LocalizedText, TranslationMap};
pub use pagination::{Page, PageLimits, PageMeta, PageRequest};
pub use pii::Masked;
