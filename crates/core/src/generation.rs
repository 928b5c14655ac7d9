//! Text generation collaborator and prompt templates.
//!
//! Two prompts are used:
//! - extraction: the record schema plus a clinical narrative, answered with record JSON
//! - case generation: a disease name, answered with a synthetic narrative
//!
//! Both are plain string templates; the schema is rendered from [`crate::schema`] so the
//! prompt and the parser can never disagree on key names.

use crate::constants::{
    DEFAULT_GENERATION_TEMPERATURE, DEFAULT_MAX_TOKENS, DEFAULT_PROMPT_TEMPERATURE,
};
use crate::error::GenerationError;
use crate::schema::schema_text;

/// One completion request.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GenerationRequest<'p> {
    pub prompt: &'p str,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// Blocking text-generation collaborator.
///
/// An empty completion is a valid answer meaning "nothing produced"; callers skip the case.
pub trait TextGenerator: Send + Sync {
    fn generate(&self, request: &GenerationRequest<'_>) -> Result<String, GenerationError>;
}

/// Sampling settings for the two prompt kinds.
#[derive(Clone, Debug, PartialEq)]
pub struct ModelSettings {
    pub prompt_temperature: f32,
    pub generation_temperature: f32,
    pub max_tokens: u32,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            prompt_temperature: DEFAULT_PROMPT_TEMPERATURE,
            generation_temperature: DEFAULT_GENERATION_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

impl ModelSettings {
    /// Request for an extraction prompt (low temperature).
    pub fn extraction<'p>(&self, prompt: &'p str) -> GenerationRequest<'p> {
        GenerationRequest {
            prompt,
            temperature: self.prompt_temperature,
            max_tokens: self.max_tokens,
        }
    }

    /// Request for a case-generation prompt (high temperature).
    pub fn case_generation<'p>(&self, prompt: &'p str) -> GenerationRequest<'p> {
        GenerationRequest {
            prompt,
            temperature: self.generation_temperature,
            max_tokens: self.max_tokens,
        }
    }
}

// ============================================================================
// Prompt templates
// ============================================================================

const EXTRACTION_TEMPLATE: &str = "\
You convert free-text clinical notes into structured JSON suitable for building FHIR resources.

Extract the entities described by the schema below. Any entity or field that the text does not \
mention must be null.

Rules:
1. \"encounters\" is an array holding every encounter in the text. Give each its \
\"encounter_date\" when stated; otherwise estimate the year from context or use null. Each \
encounter nests its own \"observation\" (\"laboratory\", \"symptom\", \"vital_sign\") and \
\"medication\" lists; attach every observation and medication to the encounter it happened in.
2. Every list field is an array, even with a single element.
3. Use exactly the keys of the schema. Add no other keys and no commentary.
4. Never leave a field blank; use null instead.

Schema:
{schema}

Clinical text:
{text}

Answer with the JSON object only.
";

const CASE_GENERATION_TEMPLATE: &str = "\
You write realistic synthetic clinical cases with medical accuracy.

Write one case of a patient with early-stage {disease} as plain narrative text: no headings, \
tables, bullet points or markdown.

The narrative covers, in natural prose:
- Patient data: age and name, optionally surname, gender and address, consistent with the usual \
epidemiology of the disease.
- The current encounter: the main complaint, and any of vital signs with values and units, \
symptoms stated as present or absent, laboratory results with values and units, and medications \
with dosage, frequency, reason and adherence.
- Family history where relevant: relatives, their conditions and outcomes.
- Optionally, earlier encounters with exact or relative dates.

Do not name, confirm or hint at {disease}. Give no diagnosis, recommendation or treatment plan. \
Keep findings subtle and consistent with an early presentation, and keep demographics, symptoms \
and results consistent with each other.
";

/// Extraction prompt for a clinical narrative.
pub fn extraction_prompt(text: &str) -> String {
    EXTRACTION_TEMPLATE
        .replace("{schema}", &schema_text())
        .replace("{text}", text)
}

/// Case-generation prompt for a disease.
pub fn case_generation_prompt(disease: &str) -> String {
    CASE_GENERATION_TEMPLATE.replace("{disease}", disease)
}

/// Run a request and treat a blank completion as `None`.
///
/// # Errors
///
/// Propagates the collaborator's [`GenerationError`].
pub fn complete(
    generator: &dyn TextGenerator,
    request: &GenerationRequest<'_>,
) -> Result<Option<String>, GenerationError> {
    let completion = generator.generate(request)?;
    let completion = completion.trim();
    if completion.is_empty() {
        tracing::warn!("empty completion received from model");
        return Ok(None);
    }
    tracing::debug!(chars = completion.len(), "received completion");
    Ok(Some(completion.to_string()))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays canned completions in order and records the requests it saw.
    #[derive(Default)]
    pub(crate) struct ScriptedGenerator {
        pub replies: Mutex<VecDeque<Result<String, GenerationError>>>,
        pub prompts: Mutex<Vec<(String, f32)>>,
    }

    impl ScriptedGenerator {
        pub(crate) fn replying(replies: &[&str]) -> Self {
            Self {
                replies: Mutex::new(replies.iter().map(|r| Ok(r.to_string())).collect()),
                prompts: Mutex::default(),
            }
        }
    }

    impl TextGenerator for ScriptedGenerator {
        fn generate(&self, request: &GenerationRequest<'_>) -> Result<String, GenerationError> {
            if let Ok(mut prompts) = self.prompts.lock() {
                prompts.push((request.prompt.to_string(), request.temperature));
            }
            self.replies
                .lock()
                .ok()
                .and_then(|mut replies| replies.pop_front())
                .unwrap_or_else(|| Ok(String::new()))
        }
    }

    #[test]
    fn extraction_prompt_embeds_schema_and_text() {
        let prompt = extraction_prompt("Jane, 34, reports fatigue.");
        assert!(prompt.contains("\"encounter_date\""));
        assert!(prompt.contains("\"family_history\""));
        assert!(prompt.contains("Clinical text:\nJane, 34, reports fatigue.\n"));
        assert!(!prompt.contains("{schema}"));
    }

    #[test]
    fn case_generation_prompt_names_the_disease() {
        let prompt = case_generation_prompt("Type 2 diabetes");
        assert!(prompt.contains("early-stage Type 2 diabetes"));
        assert!(!prompt.contains("{disease}"));
    }

    #[test]
    fn settings_pick_temperature_per_prompt_kind() {
        let settings = ModelSettings::default();
        assert_eq!(settings.extraction("p").temperature, 0.3);
        assert_eq!(settings.case_generation("p").temperature, 0.9);
        assert_eq!(settings.case_generation("p").max_tokens, 3000);
    }

    #[test]
    fn blank_completion_is_none() {
        let generator = ScriptedGenerator::replying(&["  \n", " A 45-year-old man... "]);
        let settings = ModelSettings::default();

        assert_eq!(complete(&generator, &settings.extraction("x")).unwrap(), None);
        assert_eq!(
            complete(&generator, &settings.extraction("x")).unwrap().as_deref(),
            Some("A 45-year-old man...")
        );
        assert_eq!(generator.prompts.lock().unwrap().len(), 2);
    }
}
