//! Blocking HTTP collaborators for the FHIR agent pipeline.
//!
//! - [`LoincClient`]: Clinical Tables LOINC search
//! - [`SnomedClient`]: BioPortal SNOMED CT search
//! - [`HttpTerminology`]: both, behind the core [`TerminologySearch`] seam
//! - [`ChatGenerator`]: OpenAI-compatible chat completions behind [`TextGenerator`]
//! - [`ServiceSettings`]: endpoints and credentials, resolved once by the binaries
//!
//! Response decoding is split into pure functions so it can be tested without a network.
//!
//! [`TextGenerator`]: fhir_agent_core::TextGenerator

pub mod chat;
pub mod loinc;
pub mod settings;
pub mod snomed;

pub use chat::ChatGenerator;
pub use loinc::{LoincClient, LoincCredentials};
pub use settings::ServiceSettings;
pub use snomed::SnomedClient;

use fhir_agent_core::{Candidate, SearchError, TerminologySearch};
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Errors raised while constructing a client.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("failed to build HTTP client: {0}")]
    Build(#[from] reqwest::Error),
}

pub type ClientResult<T> = Result<T, ClientError>;

pub(crate) fn http_client() -> ClientResult<reqwest::blocking::Client> {
    Ok(reqwest::blocking::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .user_agent(concat!("fhir-agent/", env!("CARGO_PKG_VERSION")))
        .build()?)
}

/// LOINC and SNOMED CT lookups over HTTP.
pub struct HttpTerminology {
    loinc: LoincClient,
    snomed: SnomedClient,
}

impl HttpTerminology {
    pub fn new(loinc: LoincClient, snomed: SnomedClient) -> Self {
        Self { loinc, snomed }
    }
}

impl TerminologySearch for HttpTerminology {
    fn search_loinc(&self, term: &str) -> Result<Vec<Candidate>, SearchError> {
        self.loinc.search(term)
    }

    fn search_snomed(&self, term: &str) -> Result<Vec<Candidate>, SearchError> {
        self.snomed.search(term)
    }
}
