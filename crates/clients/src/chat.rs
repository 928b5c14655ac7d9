//! Chat-completions text generator.
//!
//! Speaks the OpenAI-compatible `POST <base_url>/chat/completions` dialect: one user message in,
//! `choices[0].message.content` out.

use crate::{http_client, ClientResult};
use fhir_agent_core::{GenerationError, GenerationRequest, TextGenerator};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

pub struct ChatGenerator {
    http: reqwest::blocking::Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
}

impl ChatGenerator {
    /// # Errors
    ///
    /// Returns [`crate::ClientError::Build`] if the HTTP client cannot be created.
    pub fn new(
        base_url: &str,
        model: impl Into<String>,
        api_key: Option<String>,
    ) -> ClientResult<Self> {
        Ok(Self {
            http: http_client()?,
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            model: model.into(),
            api_key: api_key.filter(|key| !key.trim().is_empty()),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

impl TextGenerator for ChatGenerator {
    fn generate(&self, request: &GenerationRequest<'_>) -> Result<String, GenerationError> {
        if self.model.trim().is_empty() {
            return Err(GenerationError::NotConfigured("model id is empty".into()));
        }

        let body = ChatRequest {
            model: &self.model,
            messages: [ChatMessage {
                role: "user",
                content: request.prompt,
            }],
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        };

        let mut builder = self.http.post(&self.endpoint).json(&body);
        if let Some(api_key) = &self.api_key {
            builder = builder.bearer_auth(api_key);
        }

        tracing::debug!(model = %self.model, endpoint = %self.endpoint, "chat completion request");
        let response = builder
            .send()
            .map_err(|e| GenerationError::Request(e.to_string()))?;
        let status = response.status();
        let text = response
            .text()
            .map_err(|e| GenerationError::Response(e.to_string()))?;

        if !status.is_success() {
            return Err(GenerationError::Request(format!("HTTP {status}: {text}")));
        }
        parse_chat_response(&text)
    }
}

/// Completion text of a chat-completions response body. A null content is an empty completion.
///
/// # Errors
///
/// Returns [`GenerationError::Response`] if the body is not a chat response or has no choices.
pub fn parse_chat_response(body: &str) -> Result<String, GenerationError> {
    let response: ChatResponse =
        serde_json::from_str(body).map_err(|e| GenerationError::Response(e.to_string()))?;
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| GenerationError::Response("response has no choices".into()))?;
    Ok(choice.message.content.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_first_choice_content() {
        let body = r#"{
            "id": "chatcmpl-1",
            "choices": [
                {"index": 0, "message": {"role": "assistant", "content": "{\"patient\": {}}"}},
                {"index": 1, "message": {"role": "assistant", "content": "ignored"}}
            ]
        }"#;
        assert_eq!(parse_chat_response(body).unwrap(), r#"{"patient": {}}"#);
    }

    #[test]
    fn null_content_is_empty() {
        let body = r#"{"choices": [{"message": {"role": "assistant", "content": null}}]}"#;
        assert_eq!(parse_chat_response(body).unwrap(), "");
    }

    #[test]
    fn no_choices_is_a_response_error() {
        assert!(matches!(
            parse_chat_response(r#"{"choices": []}"#),
            Err(GenerationError::Response(_))
        ));
        assert!(matches!(
            parse_chat_response("<html>bad gateway</html>"),
            Err(GenerationError::Response(_))
        ));
    }

    #[test]
    fn request_body_has_one_user_message() {
        let body = ChatRequest {
            model: "m",
            messages: [ChatMessage {
                role: "user",
                content: "hello",
            }],
            max_tokens: 3000,
            temperature: 0.5,
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["messages"][0]["role"], "user");
        assert_eq!(value["messages"][0]["content"], "hello");
        assert_eq!(value["max_tokens"], 3000);
    }

    #[test]
    fn endpoint_joins_base_url() {
        let generator = ChatGenerator::new("http://localhost:8000/v1/", "m", None).unwrap();
        assert_eq!(generator.endpoint(), "http://localhost:8000/v1/chat/completions");
    }

    #[test]
    fn empty_model_is_not_configured() {
        let generator = ChatGenerator::new("http://localhost:1", " ", None).unwrap();
        let request = GenerationRequest {
            prompt: "x",
            temperature: 0.3,
            max_tokens: 10,
        };
        assert!(matches!(
            generator.generate(&request),
            Err(GenerationError::NotConfigured(_))
        ));
    }
}
