//! Grounded answer generation over retrieved chunks

use crate::config::CompletionConfig;
use crate::embedding_backend::{api_error_message, parse_base_url};
use crate::error::{Error, Result};
use crate::index::SearchHit;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Returned when no chunk clears the similarity threshold
pub const NOT_FOUND_ANSWER: &str =
    "No information related to your question was found in the uploaded documents.";

/// Returned when the completion API produced no usable text
pub const FALLBACK_ANSWER: &str =
    "Sorry, I could not produce an answer for this question. Please rephrase it or contact support.";

/// Separator placed between context chunks
pub const CONTEXT_SEPARATOR: &str = "\n\n---\n\n";

const SYSTEM_PROMPT: &str = "You are an assistant that answers questions using information from documents. \
Answer based on the provided context. \
If the answer is not in the context, say honestly that you do not have that information. \
Do not invent information or speculate beyond what the context contains. \
Keep answers short, concise and easy to understand.";

/// Produces an answer from a question and its supporting context
#[async_trait]
pub trait Answerer: Send + Sync {
    async fn answer(&self, question: &str, context: &[SearchHit], max_tokens: u32) -> Result<String>;

    fn model_name(&self) -> &str;
}

/// Join chunk text in rank order
pub fn format_context(context: &[SearchHit]) -> String {
    context
        .iter()
        .map(|hit| hit.content.as_str())
        .collect::<Vec<_>>()
        .join(CONTEXT_SEPARATOR)
}

fn user_message(question: &str, context: &[SearchHit]) -> String {
    format!(
        "Question: {}\n\nContext:\n{}",
        question,
        format_context(context)
    )
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Answerer backed by an OpenAI-compatible `/chat/completions` endpoint
pub struct OpenAiAnswerer {
    client: Client,
    base_url: Url,
    api_key: Option<String>,
    model: String,
    temperature: f32,
}

impl OpenAiAnswerer {
    pub fn new(config: &CompletionConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: parse_base_url(&config.base_url)?,
            api_key: config.api_key(),
            model: config.model.clone(),
            temperature: config.temperature,
        })
    }
}

#[async_trait]
impl Answerer for OpenAiAnswerer {
    async fn answer(&self, question: &str, context: &[SearchHit], max_tokens: u32) -> Result<String> {
        if context.is_empty() {
            return Ok(NOT_FOUND_ANSWER.to_string());
        }

        let url = self
            .base_url
            .join("chat/completions")
            .map_err(|e| Error::Config(format!("Invalid completion API URL: {}", e)))?;

        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: user_message(question, context),
                },
            ],
            temperature: self.temperature,
            max_tokens,
        };

        debug!(model = %self.model, chunks = context.len(), max_tokens, "Requesting completion");

        let mut builder = self.client.post(url).json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| Error::Completion(format!("Completion request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Completion(format!(
                "Completion API returned {}: {}",
                status,
                api_error_message(&body)
            )));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| Error::Completion(format!("Malformed completion response: {}", e)))?;

        let text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|c| c.trim().to_string())
            .unwrap_or_default();

        if text.is_empty() {
            warn!(model = %self.model, "Completion API returned a blank answer");
            return Ok(FALLBACK_ANSWER.to_string());
        }

        Ok(text)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::ChunkMetadata;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn hit(text: &str) -> SearchHit {
        SearchHit {
            content: text.to_string(),
            metadata: ChunkMetadata {
                filename: "f.txt".to_string(),
                chunk: 0,
                source: "f.txt".to_string(),
                doc_id: Some("d".to_string()),
            },
            distance: 0.1,
            similarity: 0.9,
        }
    }

    fn answerer(base_url: String) -> OpenAiAnswerer {
        OpenAiAnswerer::new(&CompletionConfig {
            base_url,
            api_key_env: "DOCQA_TEST_UNSET_KEY".to_string(),
            ..CompletionConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_format_context() {
        assert_eq!(format_context(&[hit("one"), hit("two")]), "one\n\n---\n\ntwo");
        assert_eq!(format_context(&[]), "");
    }

    #[tokio::test]
    async fn test_empty_context_skips_api() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;

        let answer = answerer(server.uri()).answer("q?", &[], 100).await.unwrap();
        assert_eq!(answer, NOT_FOUND_ANSWER);
    }

    #[tokio::test]
    async fn test_answer_is_trimmed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_partial_json(serde_json::json!({
                "model": "o4-mini",
                "max_tokens": 250
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"index": 0, "message": {"role": "assistant", "content": "  14 days.\n"}}]
            })))
            .mount(&server)
            .await;

        let answer = answerer(server.uri())
            .answer("How long do refunds take?", &[hit("Refunds take 14 days.")], 250)
            .await
            .unwrap();
        assert_eq!(answer, "14 days.");
    }

    #[tokio::test]
    async fn test_blank_completion_falls_back() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"role": "assistant", "content": "   "}}]
            })))
            .mount(&server)
            .await;

        let answer = answerer(server.uri())
            .answer("q?", &[hit("ctx")], 100)
            .await
            .unwrap();
        assert_eq!(answer, FALLBACK_ANSWER);
    }

    #[tokio::test]
    async fn test_api_error_is_completion_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_json(serde_json::json!({
                "error": {"message": "Rate limit reached"}
            })))
            .mount(&server)
            .await;

        let err = answerer(server.uri())
            .answer("q?", &[hit("ctx")], 100)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Completion(_)));
        assert!(err.to_string().contains("Rate limit reached"));
    }
}
