//! Validated text primitives shared across the workspace.
//!
//! Generated extractions routinely contain blank names, whitespace-only units and similar
//! noise. Optional free-text fields of the canonical record (names, dates, units, notes) are
//! held as [`NonEmptyText`], so "blank" and "missing" collapse to `None` at the boundary.

/// Errors that can occur when creating validated text types.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TextError {
    /// The input text was empty or contained only whitespace
    #[error("Text cannot be empty")]
    Empty,
}

/// A string type that guarantees non-empty content.
///
/// The input is trimmed of leading and trailing whitespace during construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NonEmptyText(String);

impl NonEmptyText {
    /// Creates a new `NonEmptyText` from the given input.
    ///
    /// # Errors
    ///
    /// Returns [`TextError::Empty`] if the trimmed input is empty.
    pub fn new(input: impl AsRef<str>) -> Result<Self, TextError> {
        let trimmed = input.as_ref().trim();
        if trimmed.is_empty() {
            return Err(TextError::Empty);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Like [`NonEmptyText::new`], but maps blank input to `None`.
    ///
    /// Useful for optional free-text fields where "missing" and "blank" mean the same thing.
    pub fn from_optional(input: Option<&str>) -> Option<Self> {
        input.and_then(|s| Self::new(s).ok())
    }

    /// Returns the inner string as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the wrapper and returns the trimmed string.
    pub fn into_string(self) -> String {
        self.0
    }
}

impl std::fmt::Display for NonEmptyText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for NonEmptyText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::str::FromStr for NonEmptyText {
    type Err = TextError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl serde::Serialize for NonEmptyText {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for NonEmptyText {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        NonEmptyText::new(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_surrounding_whitespace() {
        let text = NonEmptyText::new("  Hemoglobin A1c \n").expect("non-empty");
        assert_eq!(text.as_str(), "Hemoglobin A1c");
    }

    #[test]
    fn rejects_blank_input() {
        assert_eq!(NonEmptyText::new("   ").unwrap_err(), TextError::Empty);
        assert_eq!(NonEmptyText::new("").unwrap_err(), TextError::Empty);
    }

    #[test]
    fn from_optional_collapses_blank_to_none() {
        assert!(NonEmptyText::from_optional(None).is_none());
        assert!(NonEmptyText::from_optional(Some(" ")).is_none());
        assert_eq!(
            NonEmptyText::from_optional(Some("fatigue")).map(NonEmptyText::into_string),
            Some("fatigue".to_string())
        );
    }

    #[test]
    fn deserialize_rejects_blank_strings() {
        let err = serde_json::from_str::<NonEmptyText>("\"  \"").expect_err("blank must fail");
        assert!(err.to_string().contains("cannot be empty"));

        let ok: NonEmptyText = serde_json::from_str("\"case_1\"").expect("valid");
        assert_eq!(ok.to_string(), "case_1");
    }
}
