//! Terminology code resolution.
//!
//! The resolver asks a [`TerminologySearch`] collaborator for ranked candidates and takes the
//! first one. Failure policy differs per vocabulary:
//! - SNOMED CT: any search error resolves to `None` (logged)
//! - LOINC: missing credentials resolve to `None`; any other error is a
//!   [`CoreError::Resolution`] and aborts the caller
//!
//! Blank terms never reach the collaborator.

use crate::constants::{UNKNOWN_CODE, UNKNOWN_NAME};
use crate::error::{CoreError, CoreResult};
use fhir::{systems, Coding};

/// Code system a term is resolved against.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Vocabulary {
    Loinc,
    SnomedCt,
}

impl Vocabulary {
    pub const fn system(self) -> &'static str {
        match self {
            Self::Loinc => systems::LOINC,
            Self::SnomedCt => systems::SNOMED_CT,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Loinc => "LOINC",
            Self::SnomedCt => "SNOMED CT",
        }
    }
}

/// One search hit, in service rank order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Candidate {
    pub code: String,
    pub display: String,
    pub uri: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum SearchError {
    #[error("terminology service credentials are not configured")]
    MissingCredentials,
    #[error("terminology request failed: {0}")]
    Http(String),
    #[error("terminology response could not be decoded: {0}")]
    Decode(String),
}

/// Blocking terminology search collaborator.
pub trait TerminologySearch: Send + Sync {
    fn search_loinc(&self, term: &str) -> Result<Vec<Candidate>, SearchError>;
    fn search_snomed(&self, term: &str) -> Result<Vec<Candidate>, SearchError>;
}

/// Search collaborator that never finds anything; every term resolves to `unknown`.
#[derive(Clone, Copy, Debug, Default)]
pub struct OfflineTerminology;

impl TerminologySearch for OfflineTerminology {
    fn search_loinc(&self, _term: &str) -> Result<Vec<Candidate>, SearchError> {
        Ok(Vec::new())
    }

    fn search_snomed(&self, _term: &str) -> Result<Vec<Candidate>, SearchError> {
        Ok(Vec::new())
    }
}

/// A code chosen for a term.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedCode {
    pub vocabulary: Vocabulary,
    pub code: String,
    pub display: String,
}

impl ResolvedCode {
    /// Placeholder used when lookup finds nothing: code `unknown`, display = the term, or
    /// `Unknown` for a blank term.
    pub fn unknown(vocabulary: Vocabulary, term: &str) -> Self {
        let term = term.trim();
        Self {
            vocabulary,
            code: UNKNOWN_CODE.to_string(),
            display: if term.is_empty() { UNKNOWN_NAME } else { term }.to_string(),
        }
    }

    pub fn is_unknown(&self) -> bool {
        self.code == UNKNOWN_CODE
    }

    /// `Definition: <url>` annotation text; `None` for unknown codes.
    pub fn definition_note(&self) -> Option<String> {
        if self.is_unknown() {
            return None;
        }
        Some(match self.vocabulary {
            Vocabulary::Loinc => format!("Definition: https://loinc.org/{}/", self.code),
            Vocabulary::SnomedCt => format!("Definition: https://snomed.info/id/{}", self.code),
        })
    }

    pub fn coding(&self) -> Coding {
        Coding::new(self.vocabulary.system(), &self.code, &self.display)
    }
}

/// Rank-one terminology resolver over a search collaborator.
#[derive(Clone, Copy)]
pub struct TerminologyResolver<'a> {
    search: &'a dyn TerminologySearch,
}

impl<'a> TerminologyResolver<'a> {
    pub fn new(search: &'a dyn TerminologySearch) -> Self {
        Self { search }
    }

    /// Resolve `term` to the first-ranked candidate.
    ///
    /// Returns `Ok(None)` for a blank term, an empty result, or a first candidate with an
    /// empty code or display.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Resolution`] for LOINC search failures other than missing
    /// credentials.
    pub fn resolve(&self, term: &str, vocabulary: Vocabulary) -> CoreResult<Option<ResolvedCode>> {
        let term = term.trim();
        if term.is_empty() {
            return Ok(None);
        }

        let result = match vocabulary {
            Vocabulary::Loinc => self.search.search_loinc(term),
            Vocabulary::SnomedCt => self.search.search_snomed(term),
        };

        let candidates = match result {
            Ok(candidates) => candidates,
            Err(SearchError::MissingCredentials) => {
                tracing::warn!(term, vocabulary = vocabulary.as_str(), "terminology credentials missing; code left unresolved");
                return Ok(None);
            }
            Err(err) if vocabulary == Vocabulary::SnomedCt => {
                tracing::warn!(term, error = %err, "SNOMED CT lookup failed; code left unresolved");
                return Ok(None);
            }
            Err(err) => {
                return Err(CoreError::Resolution {
                    term: term.to_string(),
                    message: err.to_string(),
                })
            }
        };

        let Some(first) = candidates.into_iter().next() else {
            tracing::debug!(term, vocabulary = vocabulary.as_str(), "no terminology candidates");
            return Ok(None);
        };

        if first.code.trim().is_empty() || first.display.trim().is_empty() {
            tracing::debug!(term, vocabulary = vocabulary.as_str(), "first candidate incomplete");
            return Ok(None);
        }

        Ok(Some(ResolvedCode {
            vocabulary,
            code: first.code,
            display: first.display,
        }))
    }

    /// [`TerminologyResolver::resolve`], substituting [`ResolvedCode::unknown`] for `None`.
    ///
    /// # Errors
    ///
    /// As [`TerminologyResolver::resolve`].
    pub fn resolve_or_unknown(&self, term: &str, vocabulary: Vocabulary) -> CoreResult<ResolvedCode> {
        Ok(self
            .resolve(term, vocabulary)?
            .unwrap_or_else(|| ResolvedCode::unknown(vocabulary, term)))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Canned search results keyed by term; records every term it is asked for.
    #[derive(Default)]
    pub(crate) struct FakeSearch {
        pub loinc: HashMap<String, Result<Vec<Candidate>, SearchError>>,
        pub snomed: HashMap<String, Result<Vec<Candidate>, SearchError>>,
        pub calls: Mutex<Vec<String>>,
    }

    impl FakeSearch {
        pub(crate) fn with_loinc(mut self, term: &str, code: &str, display: &str) -> Self {
            self.loinc.insert(term.to_string(), Ok(vec![candidate(code, display)]));
            self
        }

        pub(crate) fn with_snomed(mut self, term: &str, code: &str, display: &str) -> Self {
            self.snomed.insert(term.to_string(), Ok(vec![candidate(code, display)]));
            self
        }

        fn lookup(
            &self,
            table: &HashMap<String, Result<Vec<Candidate>, SearchError>>,
            term: &str,
        ) -> Result<Vec<Candidate>, SearchError> {
            if let Ok(mut calls) = self.calls.lock() {
                calls.push(term.to_string());
            }
            table.get(term).cloned().unwrap_or_else(|| Ok(Vec::new()))
        }
    }

    impl TerminologySearch for FakeSearch {
        fn search_loinc(&self, term: &str) -> Result<Vec<Candidate>, SearchError> {
            self.lookup(&self.loinc, term)
        }

        fn search_snomed(&self, term: &str) -> Result<Vec<Candidate>, SearchError> {
            self.lookup(&self.snomed, term)
        }
    }

    pub(crate) fn candidate(code: &str, display: &str) -> Candidate {
        Candidate {
            code: code.to_string(),
            display: display.to_string(),
            uri: None,
        }
    }

    #[test]
    fn picks_the_first_candidate() {
        let mut search = FakeSearch::default();
        search.loinc.insert(
            "HDL cholesterol".into(),
            Ok(vec![
                candidate("2085-9", "HDL Cholesterol"),
                candidate("18263-4", "HDL Cholesterol/Cholesterol.total"),
            ]),
        );
        let resolver = TerminologyResolver::new(&search);

        let resolved = resolver
            .resolve("HDL cholesterol", Vocabulary::Loinc)
            .unwrap()
            .expect("resolved");
        assert_eq!(resolved.code, "2085-9");
        assert_eq!(
            resolved.definition_note().as_deref(),
            Some("Definition: https://loinc.org/2085-9/")
        );
    }

    #[test]
    fn empty_result_resolves_to_none_and_unknown() {
        let search = FakeSearch::default();
        let resolver = TerminologyResolver::new(&search);

        assert_eq!(resolver.resolve("Fatigue", Vocabulary::SnomedCt).unwrap(), None);

        let unknown = resolver
            .resolve_or_unknown("Fatigue", Vocabulary::SnomedCt)
            .unwrap();
        assert_eq!(unknown.code, "unknown");
        assert_eq!(unknown.display, "Fatigue");
        assert_eq!(unknown.definition_note(), None);
    }

    #[test]
    fn incomplete_first_candidate_resolves_to_none() {
        let search = FakeSearch::default().with_snomed("Cough", "49727002", " ");
        let resolver = TerminologyResolver::new(&search);
        assert_eq!(resolver.resolve("Cough", Vocabulary::SnomedCt).unwrap(), None);
    }

    #[test]
    fn failure_policy_differs_per_vocabulary() {
        let mut search = FakeSearch::default();
        search
            .snomed
            .insert("Cough".into(), Err(SearchError::Http("503".into())));
        search
            .loinc
            .insert("Glucose".into(), Err(SearchError::Http("503".into())));
        search
            .loinc
            .insert("Sodium".into(), Err(SearchError::MissingCredentials));
        let resolver = TerminologyResolver::new(&search);

        assert_eq!(resolver.resolve("Cough", Vocabulary::SnomedCt).unwrap(), None);
        assert_eq!(resolver.resolve("Sodium", Vocabulary::Loinc).unwrap(), None);

        match resolver.resolve("Glucose", Vocabulary::Loinc) {
            Err(CoreError::Resolution { term, .. }) => assert_eq!(term, "Glucose"),
            other => panic!("expected Resolution error, got {other:?}"),
        }
    }

    #[test]
    fn blank_terms_never_reach_the_service() {
        let search = FakeSearch::default();
        let resolver = TerminologyResolver::new(&search);

        assert_eq!(resolver.resolve("   ", Vocabulary::Loinc).unwrap(), None);
        assert!(search.calls.lock().unwrap().is_empty());

        let unknown = resolver.resolve_or_unknown("   ", Vocabulary::SnomedCt).unwrap();
        assert!(unknown.is_unknown());
        assert_eq!(unknown.display, "Unknown");
    }

    #[test]
    fn snomed_definition_note_has_no_trailing_slash() {
        let code = ResolvedCode {
            vocabulary: Vocabulary::SnomedCt,
            code: "84229001".into(),
            display: "Fatigue".into(),
        };
        assert_eq!(
            code.definition_note().as_deref(),
            Some("Definition: https://snomed.info/id/84229001")
        );
        assert_eq!(code.coding().system.as_deref(), Some(systems::SNOMED_CT));
    }
}
