//! Case book: clinical narratives grouped by disease.
//!
//! On disk this is a YAML mapping from disease key to a list of `{id, text}` cases. Group order
//! is preserved on load and save.

use crate::error::{CoreError, CoreResult};
use crate::storage::write_atomically;
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use std::path::Path;

/// One narrative to process.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct CaseEntry {
    pub id: String,
    pub text: String,
}

/// Cases of one disease.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CaseGroup {
    pub disease: String,
    pub cases: Vec<CaseEntry>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CaseBook {
    groups: Vec<CaseGroup>,
}

/// Case-book key for a disease name: lower case, spaces as underscores.
pub fn disease_key(disease: &str) -> String {
    disease.trim().to_lowercase().replace(' ', "_")
}

impl CaseBook {
    /// Load a case book.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Io`] if the file cannot be read and [`CoreError::Yaml`] or
    /// [`CoreError::InvalidInput`] if it is not a case book.
    pub fn load(path: &Path) -> CoreResult<Self> {
        let text = std::fs::read_to_string(path).map_err(CoreError::io(path))?;
        Self::parse(&text)
    }

    /// Load a case book, treating a missing file as empty.
    ///
    /// # Errors
    ///
    /// As [`CaseBook::load`] for files that exist.
    pub fn load_or_default(path: &Path) -> CoreResult<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Parse case-book YAML. An empty document is an empty book.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Yaml`] for malformed YAML or cases, and
    /// [`CoreError::InvalidInput`] if the document is not a mapping with string keys.
    pub fn parse(yaml_text: &str) -> CoreResult<Self> {
        let root: Value = serde_yaml::from_str(yaml_text)?;
        let mapping = match root {
            Value::Null => return Ok(Self::default()),
            Value::Mapping(mapping) => mapping,
            _ => {
                return Err(CoreError::InvalidInput(
                    "case book must be a mapping of disease to cases".into(),
                ))
            }
        };

        let mut groups = Vec::with_capacity(mapping.len());
        for (key, cases) in mapping {
            let Value::String(disease) = key else {
                return Err(CoreError::InvalidInput(
                    "case book keys must be disease names".into(),
                ));
            };
            let cases: Option<Vec<CaseEntry>> = serde_yaml::from_value(cases)?;
            groups.push(CaseGroup {
                disease,
                cases: cases.unwrap_or_default(),
            });
        }
        Ok(Self { groups })
    }

    /// Render as YAML, groups in book order.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Yaml`] if serialisation fails.
    pub fn render(&self) -> CoreResult<String> {
        let mut mapping = Mapping::new();
        for group in &self.groups {
            mapping.insert(
                Value::String(group.disease.clone()),
                serde_yaml::to_value(&group.cases)?,
            );
        }
        Ok(serde_yaml::to_string(&mapping)?)
    }

    pub fn groups(&self) -> &[CaseGroup] {
        &self.groups
    }

    /// Total number of cases.
    pub fn len(&self) -> usize {
        self.groups.iter().map(|g| g.cases.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Add a generated narrative under [`disease_key`], with id `case_<n>` where `n` is the
    /// group's new size.
    pub fn push_generated(&mut self, disease: &str, text: &str) -> &CaseEntry {
        let key = disease_key(disease);
        let index = match self.groups.iter().position(|g| g.disease == key) {
            Some(index) => index,
            None => {
                self.groups.push(CaseGroup {
                    disease: key,
                    cases: Vec::new(),
                });
                self.groups.len() - 1
            }
        };

        let cases = &mut self.groups[index].cases;
        cases.push(CaseEntry {
            id: format!("case_{}", cases.len() + 1),
            text: text.to_string(),
        });
        &cases[cases.len() - 1]
    }
}

/// Append a generated narrative to the case book at `path`, returning its case id.
///
/// # Errors
///
/// Returns the load, render or write error.
pub fn append_generated_case(path: &Path, disease: &str, text: &str) -> CoreResult<String> {
    let mut book = CaseBook::load_or_default(path)?;
    let id = book.push_generated(disease, text).id.clone();
    write_atomically(path, &book.render()?)?;
    tracing::info!(disease, case_id = %id, path = %path.display(), "saved generated case");
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOOK: &str = "\
type_2_diabetes:
  - id: case_1
    text: A 52-year-old man reports thirst.
anaemia:
  - id: a1
    text: A 30-year-old woman reports tiredness.
empty_group:
";

    #[test]
    fn parses_groups_in_order() {
        let book = CaseBook::parse(BOOK).unwrap();
        let diseases: Vec<_> = book.groups().iter().map(|g| g.disease.as_str()).collect();
        assert_eq!(diseases, vec!["type_2_diabetes", "anaemia", "empty_group"]);
        assert_eq!(book.len(), 2);
        assert_eq!(book.groups()[1].cases[0].id, "a1");
    }

    #[test]
    fn empty_document_is_an_empty_book() {
        assert!(CaseBook::parse("").unwrap().is_empty());
        assert!(matches!(
            CaseBook::parse("- just\n- a list\n"),
            Err(CoreError::InvalidInput(_))
        ));
    }

    #[test]
    fn generated_cases_are_numbered_per_disease() {
        let mut book = CaseBook::parse(BOOK).unwrap();
        assert_eq!(book.push_generated("Type 2 Diabetes", "x").id, "case_2");
        assert_eq!(book.push_generated("Chronic kidney disease", "y").id, "case_1");
        assert_eq!(
            book.groups().last().map(|g| g.disease.as_str()),
            Some("chronic_kidney_disease")
        );
    }

    #[test]
    fn append_generated_case_round_trips_through_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cases/generated.yaml");

        assert_eq!(append_generated_case(&path, "Anaemia", "first").unwrap(), "case_1");
        assert_eq!(append_generated_case(&path, "Anaemia", "second").unwrap(), "case_2");

        let book = CaseBook::load(&path).unwrap();
        assert_eq!(book.groups().len(), 1);
        assert_eq!(book.groups()[0].cases[1].text, "second");
    }
}
