//! Clinical Tables LOINC search client.
//!
//! The service answers `GET ?terms=<term>` with a positional array:
//! `[total, [code, ...], extra, [[display, ...], ...]]`, where the n-th display row belongs to
//! the n-th code.

use crate::{http_client, ClientResult};
use fhir_agent_core::{Candidate, SearchError};
use reqwest::StatusCode;
use serde_json::Value;

pub const LOINC_SEARCH_URL: &str = "https://clinicaltables.nlm.nih.gov/api/loinc_items/v3/search";

/// Basic-auth credentials for the LOINC service.
#[derive(Clone)]
pub struct LoincCredentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for LoincCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoincCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl LoincCredentials {
    /// Credentials when both parts are present and non-blank.
    pub fn from_parts(username: Option<String>, password: Option<String>) -> Option<Self> {
        match (username, password) {
            (Some(username), Some(password))
                if !username.trim().is_empty() && !password.trim().is_empty() =>
            {
                Some(Self { username, password })
            }
            _ => None,
        }
    }
}

pub struct LoincClient {
    http: reqwest::blocking::Client,
    url: String,
    credentials: Option<LoincCredentials>,
}

impl LoincClient {
    /// # Errors
    ///
    /// Returns [`crate::ClientError::Build`] if the HTTP client cannot be created.
    pub fn new(credentials: Option<LoincCredentials>) -> ClientResult<Self> {
        Ok(Self {
            http: http_client()?,
            url: LOINC_SEARCH_URL.to_string(),
            credentials,
        })
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Search LOINC for `term`, candidates in service rank order.
    ///
    /// # Errors
    ///
    /// - [`SearchError::MissingCredentials`] on HTTP 401/403 when no credentials are configured
    /// - [`SearchError::Http`] for transport failures and other non-success statuses
    /// - [`SearchError::Decode`] if the body is not the expected array
    pub fn search(&self, term: &str) -> Result<Vec<Candidate>, SearchError> {
        let mut request = self.http.get(&self.url).query(&[("terms", term)]);
        if let Some(credentials) = &self.credentials {
            request = request.basic_auth(&credentials.username, Some(&credentials.password));
        }

        let response = request
            .send()
            .map_err(|e| SearchError::Http(e.to_string()))?;
        let status = response.status();

        if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN)
            && self.credentials.is_none()
        {
            return Err(SearchError::MissingCredentials);
        }
        if !status.is_success() {
            return Err(SearchError::Http(format!("LOINC search returned HTTP {status}")));
        }

        let body: Value = response
            .json()
            .map_err(|e| SearchError::Decode(e.to_string()))?;
        let candidates = parse_loinc_response(&body)?;
        tracing::debug!(term, hits = candidates.len(), "LOINC search");
        Ok(candidates)
    }
}

/// Decode a Clinical Tables response into candidates.
///
/// # Errors
///
/// Returns [`SearchError::Decode`] if the body is not a positional array with code and display
/// columns.
pub fn parse_loinc_response(body: &Value) -> Result<Vec<Candidate>, SearchError> {
    let decode = |message: &str| SearchError::Decode(format!("LOINC response {message}"));

    let columns = body.as_array().ok_or_else(|| decode("is not an array"))?;
    let codes = match columns.get(1) {
        Some(Value::Array(codes)) => codes,
        Some(Value::Null) | None => return Ok(Vec::new()),
        Some(_) => return Err(decode("code column is not an array")),
    };
    let displays = match columns.get(3) {
        Some(Value::Array(rows)) => rows.as_slice(),
        Some(Value::Null) | None => &[][..],
        Some(_) => return Err(decode("display column is not an array")),
    };

    Ok(codes
        .iter()
        .enumerate()
        .map(|(index, code)| Candidate {
            code: code.as_str().unwrap_or_default().to_string(),
            display: displays
                .get(index)
                .and_then(|row| match row {
                    Value::Array(cells) => cells.first().and_then(Value::as_str),
                    Value::String(cell) => Some(cell.as_str()),
                    _ => None,
                })
                .unwrap_or_default()
                .to_string(),
            uri: None,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn pairs_codes_with_display_rows() {
        let body = json!([
            2,
            ["2085-9", "18263-4"],
            null,
            [["HDL Cholesterol"], ["HDL Cholesterol/Cholesterol.total"]]
        ]);

        let candidates = parse_loinc_response(&body).unwrap();
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].code, "2085-9");
        assert_eq!(candidates[0].display, "HDL Cholesterol");
        assert_eq!(candidates[1].display, "HDL Cholesterol/Cholesterol.total");
    }

    #[test]
    fn empty_result_is_no_candidates() {
        assert!(parse_loinc_response(&json!([0, [], null, []])).unwrap().is_empty());
    }

    #[test]
    fn missing_display_leaves_it_blank() {
        let candidates = parse_loinc_response(&json!([1, ["2345-7"], null, []])).unwrap();
        assert_eq!(candidates[0].display, "");
    }

    #[test]
    fn malformed_body_is_a_decode_error() {
        assert!(matches!(
            parse_loinc_response(&json!({"error": "bad"})),
            Err(SearchError::Decode(_))
        ));
        assert!(matches!(
            parse_loinc_response(&json!([1, "2345-7"])),
            Err(SearchError::Decode(_))
        ));
    }

    #[test]
    fn credentials_need_both_parts() {
        assert!(LoincCredentials::from_parts(Some("u".into()), None).is_none());
        assert!(LoincCredentials::from_parts(Some("u".into()), Some(" ".into())).is_none());
        let credentials =
            LoincCredentials::from_parts(Some("u".into()), Some("p".into())).unwrap();
        assert!(!format!("{credentials:?}").contains("\"p\""));
    }
}
