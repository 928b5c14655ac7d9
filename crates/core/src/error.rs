use std::path::PathBuf;

/// Failure to locate or parse a JSON value in generated text.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ExtractionError {
    #[error("input is empty")]
    Empty,
    #[error("no JSON value found in input")]
    NotFound,
    #[error("located {kind} candidate does not parse: {message}")]
    Malformed { kind: &'static str, message: String },
}

/// Failure reported by the text-generation collaborator.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum GenerationError {
    #[error("generation service is not configured: {0}")]
    NotConfigured(String),
    #[error("generation request failed: {0}")]
    Request(String),
    #[error("unexpected generation response: {0}")]
    Response(String),
}

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("extraction failed: {0}")]
    Extraction(#[from] ExtractionError),
    #[error("invalid record at {path}: {message}")]
    Validation { path: String, message: String },
    #[error("terminology lookup for {term:?} failed: {message}")]
    Resolution { term: String, message: String },
    #[error("text generation failed: {0}")]
    Generation(#[from] GenerationError),
    #[error("FHIR error: {0}")]
    Fhir(#[from] fhir::FhirError),
    #[error("I/O error on {path}: {source}", path = path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl CoreError {
    pub(crate) fn validation(path: &str, message: impl Into<String>) -> Self {
        let path = if path.is_empty() { "<root>" } else { path };
        Self::Validation {
            path: path.to_string(),
            message: message.into(),
        }
    }

    /// Closure mapping an `io::Error` on `path` into [`CoreError::Io`].
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| Self::Io { path, source }
    }
}

pub type CoreResult<T> = std::result::Result<T, CoreError>;

/// A child resource dropped during reduction because its encounter could not be found.
///
/// Returned as a diagnostic; never raised.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ReferenceError {
    #[error("{resource_type} {resource_id:?} has no encounter reference")]
    Missing {
        resource_type: String,
        resource_id: Option<String>,
    },
    #[error("{resource_type} {resource_id:?} references unknown encounter {encounter_id:?}")]
    Unresolved {
        resource_type: String,
        resource_id: Option<String>,
        encounter_id: String,
    },
}
