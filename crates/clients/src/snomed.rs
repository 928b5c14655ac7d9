//! BioPortal SNOMED CT search client.

use crate::{http_client, ClientResult};
use fhir_agent_core::{Candidate, SearchError};
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;

pub const BIOPORTAL_SEARCH_URL: &str = "https://data.bioontology.org/search";
const ONTOLOGY: &str = "SNOMEDCT";

#[derive(Debug, Deserialize)]
struct SearchPage {
    #[serde(default)]
    collection: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    #[serde(rename = "@id", default)]
    id: Option<String>,
    #[serde(rename = "prefLabel", default)]
    pref_label: Option<String>,
}

pub struct SnomedClient {
    http: reqwest::blocking::Client,
    url: String,
    api_key: Option<String>,
}

impl SnomedClient {
    /// A blank `api_key` counts as absent; searches then fail with
    /// [`SearchError::MissingCredentials`] without touching the network.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ClientError::Build`] if the HTTP client cannot be created.
    pub fn new(api_key: Option<String>) -> ClientResult<Self> {
        Ok(Self {
            http: http_client()?,
            url: BIOPORTAL_SEARCH_URL.to_string(),
            api_key: api_key.filter(|key| !key.trim().is_empty()),
        })
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Search SNOMED CT for `term`, candidates in service rank order.
    ///
    /// # Errors
    ///
    /// - [`SearchError::MissingCredentials`] without an API key, or when the key is rejected
    /// - [`SearchError::Http`] for transport failures and other non-success statuses
    /// - [`SearchError::Decode`] if the body is not a search page
    pub fn search(&self, term: &str) -> Result<Vec<Candidate>, SearchError> {
        let Some(api_key) = &self.api_key else {
            return Err(SearchError::MissingCredentials);
        };

        let response = self
            .http
            .get(&self.url)
            .query(&[("q", term), ("ontologies", ONTOLOGY), ("apikey", api_key)])
            .send()
            .map_err(|e| SearchError::Http(e.to_string()))?;
        let status = response.status();

        if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
            return Err(SearchError::MissingCredentials);
        }
        if !status.is_success() {
            return Err(SearchError::Http(format!("BioPortal search returned HTTP {status}")));
        }

        let body: Value = response
            .json()
            .map_err(|e| SearchError::Decode(e.to_string()))?;
        let candidates = parse_bioportal_response(&body)?;
        tracing::debug!(term, hits = candidates.len(), "SNOMED CT search");
        Ok(candidates)
    }
}

/// Decode a BioPortal search page. The code is the last path segment of the concept `@id`.
///
/// # Errors
///
/// Returns [`SearchError::Decode`] if the body is not a search page.
pub fn parse_bioportal_response(body: &Value) -> Result<Vec<Candidate>, SearchError> {
    let page = SearchPage::deserialize(body)
        .map_err(|e| SearchError::Decode(format!("BioPortal response: {e}")))?;

    Ok(page
        .collection
        .into_iter()
        .map(|hit| {
            let uri = hit.id.filter(|id| !id.is_empty());
            Candidate {
                code: uri
                    .as_deref()
                    .and_then(|id| id.trim_end_matches('/').rsplit('/').next())
                    .unwrap_or_default()
                    .to_string(),
                display: hit.pref_label.unwrap_or_default(),
                uri,
            }
        })
        .collect())
}
