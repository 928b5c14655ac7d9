//! Batch pipeline.
//!
//! - Case processing: narrative → extraction prompt → JSON repair → record → bundle file
//!   `<output_dir>/<disease>/<caseId>_<patientId>.json`
//! - Case generation: disease → case-generation prompt → appended to the case book
//! - Summary preparation: every bundle below a directory → reduced record → summary entry
//!   appended to `<parsed_dir>/summary.txt`
//!
//! Batch entry points log each per-case failure and carry on; the returned [`RunReport`]
//! counts the outcomes.

use crate::assemble::Assembler;
use crate::cases::{append_generated_case, CaseBook, CaseEntry};
use crate::config::{DiseaseSpec, PipelineConfig, RunMode};
use crate::constants::{SUMMARY_FILENAME, SUMMARY_SEPARATOR};
use crate::error::{CoreError, CoreResult};
use crate::generation::{
    case_generation_prompt, complete, extraction_prompt, ModelSettings, TextGenerator,
};
use crate::json_repair::extract_json_value;
use crate::parse::parse_record;
use crate::record::CanonicalRecord;
use crate::reduce::reduce_bundle_reporting;
use crate::storage::{append_text, find_json_files, write_atomically};
use crate::summary::render_summary;
use crate::terminology::TerminologySearch;
use agent_uuid::ResourceId;
use fhir::Bundle;
use std::path::{Path, PathBuf};

/// Outcome counts of a batch run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunReport {
    pub processed: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl RunReport {
    fn absorb(&mut self, other: RunReport) {
        self.processed += other.processed;
        self.skipped += other.skipped;
        self.failed += other.failed;
    }
}

/// Result of processing one case.
#[derive(Clone, Debug, PartialEq)]
pub enum CaseOutcome {
    Written {
        path: PathBuf,
        patient_id: ResourceId,
        entries: usize,
    },
    /// The model returned nothing for this case.
    Skipped,
}

/// `<caseId>_<patientId>.json`
pub fn bundle_file_name(case_id: &str, patient_id: &ResourceId) -> String {
    format!("{case_id}_{patient_id}.json")
}

/// One `summary.txt` entry.
pub fn summary_entry(disease: &str, case: &str, summary: &str) -> String {
    format!("**Disease:** {disease}\n**Case:** {case}\n**Summary:**\n{summary}\n{SUMMARY_SEPARATOR}\n")
}

/// Runs narratives through extraction and assembly.
pub struct CaseProcessor<'a> {
    generator: &'a dyn TextGenerator,
    search: &'a dyn TerminologySearch,
    settings: ModelSettings,
}

impl<'a> CaseProcessor<'a> {
    pub fn new(
        generator: &'a dyn TextGenerator,
        search: &'a dyn TerminologySearch,
        settings: ModelSettings,
    ) -> Self {
        Self {
            generator,
            search,
            settings,
        }
    }

    /// Extract a canonical record from a narrative; `None` when the model returns nothing.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Generation`], [`CoreError::Extraction`] or
    /// [`CoreError::Validation`].
    pub fn extract(&self, text: &str) -> CoreResult<Option<CanonicalRecord>> {
        let prompt = extraction_prompt(text);
        let Some(completion) = complete(self.generator, &self.settings.extraction(&prompt))?
        else {
            return Ok(None);
        };
        tracing::debug!(completion = %completion, "raw extraction completion");

        let value = extract_json_value(&completion)?;
        Ok(Some(parse_record(&value)?))
    }

    /// Extract, assemble and write one case into `disease_dir`.
    ///
    /// # Errors
    ///
    /// Any extraction, assembly or write error; no file is written on error.
    pub fn process_case(&self, case: &CaseEntry, disease_dir: &Path) -> CoreResult<CaseOutcome> {
        let Some(record) = self.extract(&case.text)? else {
            tracing::warn!(case_id = %case.id, "nothing extracted; case skipped");
            return Ok(CaseOutcome::Skipped);
        };

        let assembled = Assembler::new(self.search).assemble(&record)?;
        let path = disease_dir.join(bundle_file_name(&case.id, &assembled.patient_id));
        write_atomically(&path, &assembled.bundle.render()?)?;

        Ok(CaseOutcome::Written {
            path,
            patient_id: assembled.patient_id,
            entries: assembled.bundle.entry.len(),
        })
    }

    /// Process every case of a case book into `output_dir/<disease>/`.
    pub fn process_book(&self, book: &CaseBook, output_dir: &Path) -> RunReport {
        let mut report = RunReport::default();

        for group in book.groups() {
            let disease_dir = output_dir.join(&group.disease);
            for case in &group.cases {
                tracing::info!(disease = %group.disease, case_id = %case.id, "processing case");
                match self.process_case(case, &disease_dir) {
                    Ok(CaseOutcome::Written { path, entries, .. }) => {
                        tracing::info!(path = %path.display(), entries, "bundle saved");
                        report.processed += 1;
                    }
                    Ok(CaseOutcome::Skipped) => report.skipped += 1,
                    Err(err) => {
                        tracing::error!(
                            disease = %group.disease,
                            case_id = %case.id,
                            error = %err,
                            "case failed"
                        );
                        report.failed += 1;
                    }
                }
            }
        }

        report
    }

    /// Generate narratives for each disease and append them to the case book.
    pub fn generate_cases(&self, diseases: &[DiseaseSpec], cases_file: &Path) -> RunReport {
        let mut report = RunReport::default();

        for disease in diseases {
            let prompt = case_generation_prompt(&disease.name);
            for attempt in 1..=disease.num_generation {
                tracing::info!(disease = %disease.name, attempt, "generating case");
                let outcome = complete(self.generator, &self.settings.case_generation(&prompt))
                    .map_err(CoreError::from)
                    .and_then(|text| match text {
                        Some(text) => {
                            append_generated_case(cases_file, &disease.name, &text).map(Some)
                        }
                        None => Ok(None),
                    });

                match outcome {
                    Ok(Some(_)) => report.processed += 1,
                    Ok(None) => report.skipped += 1,
                    Err(err) => {
                        tracing::error!(disease = %disease.name, error = %err, "case generation failed");
                        report.failed += 1;
                    }
                }
            }
        }

        report
    }
}

/// Summarise one bundle file as a `summary.txt` entry.
///
/// # Errors
///
/// Returns [`CoreError::Io`] or [`CoreError::Fhir`].
pub fn summarise_bundle_file(path: &Path) -> CoreResult<String> {
    let text = std::fs::read_to_string(path).map_err(CoreError::io(path))?;
    let bundle = Bundle::parse(&text)?;
    let reduction = reduce_bundle_reporting(&bundle);
    if !reduction.diagnostics.is_empty() {
        tracing::warn!(
            path = %path.display(),
            dropped = reduction.diagnostics.len(),
            "bundle had resources without a resolvable encounter"
        );
    }

    let disease = path
        .parent()
        .and_then(Path::file_name)
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let case = path
        .file_stem()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    Ok(summary_entry(&disease, &case, &render_summary(&reduction.record)))
}

/// Append a summary entry for every `*.json` bundle below `fhir_directory`.
///
/// # Errors
///
/// Returns [`CoreError::Io`] if the directory cannot be walked or `summary.txt` cannot be
/// written; unreadable bundles are logged and counted as failures.
pub fn prepare_summaries(fhir_directory: &Path, parsed_dir: &Path) -> CoreResult<RunReport> {
    let summary_path = parsed_dir.join(SUMMARY_FILENAME);
    let mut report = RunReport::default();

    for path in find_json_files(fhir_directory)? {
        match summarise_bundle_file(&path) {
            Ok(entry) => {
                append_text(&summary_path, &entry)?;
                tracing::info!(path = %path.display(), "summary saved");
                report.processed += 1;
            }
            Err(err) => {
                tracing::error!(path = %path.display(), error = %err, "bundle summary failed");
                report.failed += 1;
            }
        }
    }

    Ok(report)
}

/// Run the batch pipeline described by `config`.
///
/// # Errors
///
/// Returns configuration-level failures (a missing directory or case book); per-case
/// failures are counted in the report instead.
pub fn run(
    config: &PipelineConfig,
    generator: &dyn TextGenerator,
    search: &dyn TerminologySearch,
    settings: ModelSettings,
) -> CoreResult<RunReport> {
    tracing::info!(mode = %config.mode, "starting pipeline run");
    let processor = CaseProcessor::new(generator, search, settings);
    let mut report = RunReport::default();

    if config.mode == RunMode::RagPreparation {
        let (fhir_directory, parsed_dir) = (
            required(&config.fhir_directory, "fhir_directory")?,
            required(&config.parsed_fhir_dir, "parsed_fhir_dir")?,
        );
        return prepare_summaries(fhir_directory, parsed_dir);
    }

    let cases_file = required(&config.cases_file, "cases_file")?;
    let output_dir = required(&config.output_dir, "output_dir")?;

    if config.mode == RunMode::Generate {
        report.absorb(processor.generate_cases(&config.diseases, cases_file));
    }

    let book = CaseBook::load(cases_file)?;
    report.absorb(processor.process_book(&book, output_dir));

    tracing::info!(
        processed = report.processed,
        skipped = report.skipped,
        failed = report.failed,
        "pipeline run finished"
    );
    Ok(report)
}

fn required<'c>(value: &'c Option<PathBuf>, field: &str) -> CoreResult<&'c Path> {
    value
        .as_deref()
        .ok_or_else(|| CoreError::InvalidInput(format!("configuration is missing {field}")))
}
