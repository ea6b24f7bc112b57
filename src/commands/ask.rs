//! Ask command implementation

use crate::answer::NOT_FOUND_ANSWER;
use crate::context::AppContext;
use crate::error::{Error, Result};
use serde::Serialize;
use tracing::{debug, info};

/// Ask options; unset fields fall back to the `[query]` config section
#[derive(Debug, Clone, Default)]
pub struct AskOptions {
    pub question: String,
    /// Restrict retrieval to one document
    pub file_id: Option<String>,
    pub top_k: Option<usize>,
    pub similarity_threshold: Option<f32>,
    pub max_tokens: Option<u32>,
}

/// A chunk that supported the answer
#[derive(Debug, Clone, Serialize)]
pub struct AnswerSource {
    pub filename: String,
    pub chunk: usize,
    pub similarity: f32,
}

/// Answer for CLI display
#[derive(Debug, Clone, Serialize)]
pub struct AskResult {
    pub answer: String,
    pub sources: Vec<AnswerSource>,
}

/// Answer a question from the indexed documents
pub async fn cmd_ask(ctx: &AppContext, options: AskOptions) -> Result<AskResult> {
    let question = options.question.trim();
    if question.is_empty() {
        return Err(Error::InvalidRequest("Question must not be empty".to_string()));
    }

    let query = &ctx.config.query;
    let top_k = options.top_k.unwrap_or(query.top_k);
    let threshold = options
        .similarity_threshold
        .unwrap_or(query.similarity_threshold);
    let max_tokens = options.max_tokens.unwrap_or(query.max_tokens);

    if top_k == 0 {
        return Err(Error::InvalidRequest("top_k must be at least 1".to_string()));
    }
    if !(0.0..=1.0).contains(&threshold) {
        return Err(Error::InvalidRequest(
            "similarity_threshold must be between 0.0 and 1.0".to_string(),
        ));
    }
    if max_tokens == 0 {
        return Err(Error::InvalidRequest("max_tokens must be positive".to_string()));
    }

    info!(file_id = ?options.file_id, top_k, threshold, "Answering question");

    let hits = ctx
        .index
        .search_text(question, options.file_id.as_deref(), top_k, threshold)
        .await?;

    if hits.is_empty() {
        debug!("No chunk cleared the similarity threshold");
        return Ok(AskResult {
            answer: NOT_FOUND_ANSWER.to_string(),
            sources: Vec::new(),
        });
    }

    let answer = ctx.answerer.answer(question, &hits, max_tokens).await?;

    let sources = hits
        .iter()
        .map(|h| AnswerSource {
            filename: h.metadata.filename.clone(),
            chunk: h.metadata.chunk,
            similarity: h.similarity,
        })
        .collect();

    Ok(AskResult { answer, sources })
}

/// Print answer to console
pub fn print_answer(result: &AskResult) {
    println!("\n{}\n", result.answer);

    if !result.sources.is_empty() {
        println!("Sources:");
        for s in &result.sources {
            println!(
                "  • {} (chunk {}, similarity {:.3})",
                s.filename, s.chunk, s.similarity
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::{test_context, RecordingAnswerer};
    use crate::commands::cmd_upload;
    use crate::error::ErrorClass;

    fn ask(question: &str) -> AskOptions {
        AskOptions {
            question: question.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_blank_question_rejected() {
        let (ctx, _tmp) = test_context().await;
        let err = cmd_ask(&ctx, ask("   ")).await.unwrap_err();
        assert_eq!(err.class(), ErrorClass::Client);
    }

    #[tokio::test]
    async fn test_invalid_parameters_rejected() {
        let (ctx, _tmp) = test_context().await;
        let mut options = ask("rust?");
        options.similarity_threshold = Some(1.5);
        assert!(matches!(
            cmd_ask(&ctx, options).await,
            Err(Error::InvalidRequest(_))
        ));

        let mut options = ask("rust?");
        options.top_k = Some(0);
        assert!(matches!(
            cmd_ask(&ctx, options).await,
            Err(Error::InvalidRequest(_))
        ));
    }

    #[tokio::test]
    async fn test_low_signal_returns_not_found_without_answerer() {
        let (mut ctx, _tmp) = test_context().await;
        let answerer = RecordingAnswerer::new("unused");
        let calls = answerer.calls();
        ctx.answerer = Box::new(answerer);

        cmd_upload(&ctx, b"python only".to_vec(), "a.txt").await.unwrap();

        // [1,0,0] vs [0,1,0]: distance 2, similarity 1/3
        let result = cmd_ask(&ctx, ask("rust?")).await.unwrap();
        assert_eq!(result.answer, NOT_FOUND_ANSWER);
        assert!(result.sources.is_empty());
        assert_eq!(calls.lock().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_answer_uses_retrieved_context() {
        let (mut ctx, _tmp) = test_context().await;
        let answerer = RecordingAnswerer::new("Rust has ownership.");
        let calls = answerer.calls();
        ctx.answerer = Box::new(answerer);

        let upload = cmd_upload(&ctx, b"rust ownership".to_vec(), "rust.txt")
            .await
            .unwrap();

        let mut options = ask("  Tell me about rust  ");
        options.file_id = Some(upload.file_id.clone());
        options.max_tokens = Some(64);
        let result = cmd_ask(&ctx, options).await.unwrap();

        assert_eq!(result.answer, "Rust has ownership.");
        assert_eq!(result.sources.len(), 1);
        assert_eq!(result.sources[0].filename, "rust.txt");

        let calls = calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "Tell me about rust");
        assert_eq!(calls[0].1, vec!["rust ownership".to_string()]);
        assert_eq!(calls[0].2, 64);
    }

    #[tokio::test]
    async fn test_filter_to_unknown_document_is_not_found_answer() {
        let (ctx, _tmp) = test_context().await;
        cmd_upload(&ctx, b"rust".to_vec(), "a.txt").await.unwrap();

        let mut options = ask("rust?");
        options.file_id = Some("no-such-id".to_string());
        let result = cmd_ask(&ctx, options).await.unwrap();
        assert_eq!(result.answer, NOT_FOUND_ANSWER);
    }
}
