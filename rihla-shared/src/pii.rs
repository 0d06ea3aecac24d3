use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Wraps contact details (emails, phone numbers) so they never show up in
/// `Debug`/`Display` output, which is what `tracing` fields pick up.
/// Serialization is transparent: API responses carry the real value.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct Masked<T>(pub T);

impl<T> fmt::Debug for Masked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "********")
    }
}

impl<T> fmt::Display for Masked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "********")
    }
}

impl<T: Serialize> Serialize for Masked<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.0.serialize(serializer)
    }
}

impl<T> Masked<T> {
    pub fn expose(&self) -> &T {
        &self.0
    }

    pub fn into_inner(self) -> T {
        self.0
    }
}

impl From<String> for Masked<String> {
    fn from(value: String) -> Self {
        Masked(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_masked_hides_value_in_debug() {
        let phone = Masked("+212600000000".to_string());
        assert_eq!(format!("{:?}", phone), "********");
        assert_eq!(format!("{}", phone), "********");
    }

    #[test]
    fn test_masked_serializes_real_value() {
        let email = Masked("guest@example.com".to_string());
        assert_eq!(serde_json::to_string(&email).unwrap(), "\"guest@example.com\"");
        let back: Masked<String> = serde_json::from_str("\"guest@example.com\"").unwrap();
        assert_eq!(back.expose(), "guest@example.com");
    }
}
