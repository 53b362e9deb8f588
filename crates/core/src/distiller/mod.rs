//! The AI provider: turns extracted text into a distilled summary.

mod llm;

pub use llm::{
    AnthropicClient, CompletionRequest, CompletionResponse, LlmClient, LlmError, LlmUsage,
    OllamaClient,
};

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

/// Instructions given to the model for every summary.
const SUMMARY_SYSTEM_PROMPT: &str = "\
You are a brilliant technical explainer.

Your goal is to extract and reorganize deep knowledge from the provided text, \
then write a dense, complete summary that:

- Compresses the key ideas with clarity and structure
- Covers everything said, but removes repetition and fluff
- Fills in any missing logical gaps using your own knowledge
- Highlights concepts, processes, cause-effect, and structure
- Uses smart language, without overwhelming jargon

The summary should feel like high-level notes written by a domain expert for \
fast learning: every sentence should teach something essential.

Use clear sections, bullet points or headers where helpful. Don't reference \
the original text, just deliver distilled insight.";

/// Default cap on input characters sent to the provider.
pub const DEFAULT_MAX_INPUT_CHARS: usize = 5000;

/// Error type for distillation operations, with provider hints surfaced so
/// the UI can tell an expired key from a throttle from a dead network.
#[derive(Debug, Error)]
pub enum DistillError {
    /// The provider rejected our credentials.
    #[error("provider authentication failed: {0}")]
    Auth(String),

    /// The provider throttled us.
    #[error("provider rate limit hit: {0}")]
    RateLimited(String),

    /// Could not reach the provider at all.
    #[error("provider network error: {0}")]
    Network(String),

    /// Any other provider-side failure.
    #[error("provider error ({status}): {message}")]
    Provider { status: u16, message: String },

    /// The provider answered but the payload was unusable.
    #[error("invalid provider output: {0}")]
    InvalidOutput(String),

    /// No provider configured.
    #[error("no AI provider configured")]
    NotConfigured,
}

impl From<LlmError> for DistillError {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::Http(msg) => DistillError::Network(msg),
            LlmError::Api { status: 401, message } | LlmError::Api { status: 403, message } => {
                DistillError::Auth(message)
            }
            LlmError::Api { status: 429, message } => DistillError::RateLimited(message),
            LlmError::Api { status, message } => DistillError::Provider { status, message },
            LlmError::Json(msg) => DistillError::InvalidOutput(msg),
            LlmError::NotConfigured => DistillError::NotConfigured,
        }
    }
}

/// Trait for summary generation backends.
#[async_trait]
pub trait Distiller: Send + Sync {
    /// Provider name for logging.
    fn provider(&self) -> &str;

    /// Generate a distilled summary of the given text.
    async fn generate_summary(&self, text: &str) -> Result<String, DistillError>;
}

/// Distiller backed by an [`LlmClient`].
pub struct LlmDistiller {
    client: Arc<dyn LlmClient>,
    max_input_chars: usize,
}

impl LlmDistiller {
    pub fn new(client: Arc<dyn LlmClient>) -> Self {
        Self {
            client,
            max_input_chars: DEFAULT_MAX_INPUT_CHARS,
        }
    }

    /// Override the input truncation cap.
    pub fn with_max_input_chars(mut self, max_input_chars: usize) -> Self {
        self.max_input_chars = max_input_chars.max(1);
        self
    }

    /// Truncate input at the cap, cutting on a char boundary.
    fn truncate_input<'a>(&self, text: &'a str) -> &'a str {
        if text.len() <= self.max_input_chars {
            return text;
        }
        let mut end = self.max_input_chars;
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        &text[..end]
    }
}

#[async_trait]
impl Distiller for LlmDistiller {
    fn provider(&self) -> &str {
        self.client.provider()
    }

    async fn generate_summary(&self, text: &str) -> Result<String, DistillError> {
        let input = self.truncate_input(text);
        if input.len() < text.len() {
            debug!(
                original_chars = text.len(),
                sent_chars = input.len(),
                "truncating distiller input"
            );
        }

        let request = CompletionRequest::new(format!("TEXT:\n{}", input))
            .with_system(SUMMARY_SYSTEM_PROMPT);

        let response = self.client.complete(request).await?;
        Ok(response.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoClient;

    #[async_trait]
    impl LlmClient for EchoClient {
        fn provider(&self) -> &str {
            "echo"
        }

        fn model(&self) -> &str {
            "echo-1"
        }

        async fn complete(
            &self,
            request: CompletionRequest,
        ) -> Result<CompletionResponse, LlmError> {
            Ok(CompletionResponse {
                text: request.prompt,
                usage: LlmUsage::default(),
                model: "echo-1".to_string(),
            })
        }
    }

    #[tokio::test]
    async fn test_summary_includes_input() {
        let distiller = LlmDistiller::new(Arc::new(EchoClient));
        let summary = distiller.generate_summary("the content").await.unwrap();
        assert!(summary.contains("the content"));
        assert_eq!(distiller.provider(), "echo");
    }

    #[tokio::test]
    async fn test_input_is_truncated_at_cap() {
        let distiller = LlmDistiller::new(Arc::new(EchoClient)).with_max_input_chars(10);
        let summary = distiller
            .generate_summary(&"x".repeat(100))
            .await
            .unwrap();
        // "TEXT:\n" + 10 chars of input.
        assert_eq!(summary, format!("TEXT:\n{}", "x".repeat(10)));
    }

    #[test]
    fn test_truncation_respects_char_boundaries() {
        let distiller = LlmDistiller::new(Arc::new(EchoClient)).with_max_input_chars(4);
        // 'é' is two bytes; cutting at byte 4 would split the second one.
        let truncated = distiller.truncate_input("aaéé");
        assert!(truncated.len() <= 4);
        assert!(truncated.chars().all(|c| c == 'a' || c == 'é'));
    }

    #[test]
    fn test_llm_error_mapping() {
        assert!(matches!(
            DistillError::from(LlmError::Api {
                status: 401,
                message: "bad key".into()
            }),
            DistillError::Auth(_)
        ));
        assert!(matches!(
            DistillError::from(LlmError::Api {
                status: 429,
                message: "slow down".into()
            }),
            DistillError::RateLimited(_)
        ));
        assert!(matches!(
            DistillError::from(LlmError::Http("refused".into())),
            DistillError::Network(_)
        ));
        assert!(matches!(
            DistillError::from(LlmError::Api {
                status: 500,
                message: "oops".into()
            }),
            DistillError::Provider { status: 500, .. }
        ));
    }
}
