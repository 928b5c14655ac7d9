//! Service settings for the HTTP collaborators.
//!
//! Values come from a lookup function so binaries can resolve them from the process
//! environment once at startup while tests supply a map.

use crate::chat::ChatGenerator;
use crate::loinc::{LoincClient, LoincCredentials};
use crate::snomed::SnomedClient;
use crate::{ClientResult, HttpTerminology};

pub const DEFAULT_MODEL_ID: &str = "us.meta.llama3-3-70b-instruct-v1:0";
pub const DEFAULT_GENERATION_BASE_URL: &str = "http://localhost:8000/v1";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServiceSettings {
    pub model_id: String,
    pub generation_base_url: String,
    pub generation_api_key: Option<String>,
    pub bioportal_api_key: Option<String>,
    pub loinc_user: Option<String>,
    pub loinc_password: Option<String>,
}

impl ServiceSettings {
    /// Read `MODEL_ID`, `GENERATION_BASE_URL`, `GENERATION_API_KEY`, `BIOPORTAL_API_KEY`,
    /// `LOINC_USER` and `LOINC_PASSWORD` through `lookup`. Blank values count as absent.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        Self {
            model_id: get("MODEL_ID").unwrap_or_else(|| DEFAULT_MODEL_ID.to_string()),
            generation_base_url: get("GENERATION_BASE_URL")
                .unwrap_or_else(|| DEFAULT_GENERATION_BASE_URL.to_string()),
            generation_api_key: get("GENERATION_API_KEY"),
            bioportal_api_key: get("BIOPORTAL_API_KEY"),
            loinc_user: get("LOINC_USER"),
            loinc_password: get("LOINC_PASSWORD"),
        }
    }

    /// # Errors
    ///
    /// Returns [`crate::ClientError::Build`] if an HTTP client cannot be created.
    pub fn terminology(&self) -> ClientResult<HttpTerminology> {
        let credentials =
            LoincCredentials::from_parts(self.loinc_user.clone(), self.loinc_password.clone());
        if credentials.is_none() {
            tracing::debug!("LOINC credentials not set; searching anonymously");
        }
        if self.bioportal_api_key.is_none() {
            tracing::warn!("BIOPORTAL_API_KEY not set; SNOMED CT codes will stay unresolved");
        }
        Ok(HttpTerminology::new(
            LoincClient::new(credentials)?,
            SnomedClient::new(self.bioportal_api_key.clone())?,
        ))
    }

    /// # Errors
    ///
    /// Returns [`crate::ClientError::Build`] if the HTTP client cannot be created.
    pub fn generator(&self) -> ClientResult<ChatGenerator> {
        ChatGenerator::new(
            &self.generation_base_url,
            self.model_id.clone(),
            self.generation_api_key.clone(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn blank_and_missing_values_take_defaults() {
        let env: HashMap<&str, &str> = HashMap::from([("MODEL_ID", " "), ("LOINC_USER", "u")]);
        let settings = ServiceSettings::from_lookup(|name| env.get(name).map(|v| v.to_string()));

        assert_eq!(settings.model_id, DEFAULT_MODEL_ID);
        assert_eq!(settings.generation_base_url, DEFAULT_GENERATION_BASE_URL);
        assert_eq!(settings.loinc_user.as_deref(), Some("u"));
        assert_eq!(settings.loinc_password, None);
        assert_eq!(settings.bioportal_api_key, None);
    }

    #[test]
    fn generator_uses_configured_model_and_url() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("MODEL_ID", "llama3"),
            ("GENERATION_BASE_URL", "http://models.local/v1"),
        ]);
        let settings = ServiceSettings::from_lookup(|name| env.get(name).map(|v| v.to_string()));
        let generator = settings.generator().unwrap();

        assert_eq!(generator.model(), "llama3");
        assert_eq!(generator.endpoint(), "http://models.local/v1/chat/completions");
    }
}
