//! Answer generation over `autoagents-llm` chat providers.

use crate::collaborators::Generator;
use crate::error::CoreError;
use async_trait::async_trait;
use autoagents_llm::LLMProvider;
use autoagents_llm::backends::openai::OpenAI;
use autoagents_llm::builder::LLMBuilder;
use autoagents_llm::chat::{ChatMessage, ChatProvider, ChatResponse, ChatRole, MessageType};
use log::{debug, info};
use memlane_config::{GenerationConfig, GenerationProvider};
use std::sync::Arc;

/// Generator backed by any chat-capable LLM provider.
#[derive(Clone)]
pub struct LlmGenerator {
    name: String,
    llm: Arc<dyn LLMProvider>,
}

impl std::fmt::Debug for LlmGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmGenerator")
            .field("name", &self.name)
            .finish()
    }
}

impl LlmGenerator {
    pub fn new(name: impl Into<String>, llm: Arc<dyn LLMProvider>) -> Self {
        Self {
            name: name.into(),
            llm,
        }
    }

    /// Build an OpenAI chat generator.
    pub fn openai(api_key: impl Into<String>, model: &str) -> Result<Self, CoreError> {
        let llm: Arc<dyn LLMProvider> = LLMBuilder::<OpenAI>::new()
            .api_key(api_key.into())
            .model(model.to_string())
            .build()
            .map_err(|err| CoreError::Generation(format!("failed to build OpenAI provider: {err}")))?;
        Ok(Self::new(format!("openai:{model}"), llm))
    }
}

#[async_trait]
impl Generator for LlmGenerator {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate(&self, system_prompt: &str, user_prompt: &str) -> Result<String, CoreError> {
        let messages = vec![
            ChatMessage {
                role: ChatRole::System,
                message_type: MessageType::Text,
                content: system_prompt.to_string(),
            },
            ChatMessage {
                role: ChatRole::User,
                message_type: MessageType::Text,
                content: user_prompt.to_string(),
            },
        ];
        let response = self
            .llm
            .chat_with_tools(&messages, None, None)
            .await
            .map_err(|err| CoreError::Generation(err.to_string()))?;
        let text = response.text().unwrap_or_default();
        if text.trim().is_empty() {
            return Err(CoreError::Generation("empty response".to_string()));
        }
        debug!(
            "generated answer (backend={}, len={})",
            self.name,
            text.len()
        );
        Ok(text)
    }
}

/// Generator selected by config, if its credentials are available.
pub fn generator_from_config(
    config: &GenerationConfig,
) -> Result<Option<Arc<dyn Generator>>, CoreError> {
    match config.provider {
        GenerationProvider::None => Ok(None),
        GenerationProvider::Openai => match std::env::var(&config.api_key_env) {
            Ok(api_key) if !api_key.trim().is_empty() => {
                info!("building answer generator (model={})", config.model);
                let generator = LlmGenerator::openai(api_key, &config.model)?;
                Ok(Some(Arc::new(generator)))
            }
            _ => {
                info!(
                    "generation api key missing; answers use local composition (env={})",
                    config.api_key_env
                );
                Ok(None)
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::{LlmGenerator, generator_from_config};
    use crate::collaborators::Generator;
    use crate::error::CoreError;
    use memlane_config::{GenerationConfig, GenerationProvider};
    use memlane_test_utils::{FailingLLM, FixedLLM};
    use std::sync::Arc;

    /// The provider's text is returned as the answer.
    #[tokio::test]
    async fn returns_provider_text() {
        let generator = LlmGenerator::new("fixed", Arc::new(FixedLLM::new("You ate pasta.")));
        let answer = generator.generate("system", "user").await.expect("answer");
        assert_eq!(answer, "You ate pasta.");
        assert_eq!(generator.name(), "fixed");
    }

    /// System and user prompts are sent as two text messages.
    #[tokio::test]
    async fn sends_system_then_user_message() {
        let llm = FixedLLM::new("ok");
        let messages = llm.last_messages.clone();
        let generator = LlmGenerator::new("recording", Arc::new(llm));
        generator.generate("be kind", "what now?").await.expect("answer");
        let seen = messages.lock();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].content, "be kind");
        assert_eq!(seen[1].content, "what now?");
    }

    /// Blank or missing provider text is treated as a failure.
    #[tokio::test]
    async fn blank_text_is_an_error() {
        let generator = LlmGenerator::new("blank", Arc::new(FixedLLM::new("   ")));
        let err = generator.generate("s", "u").await.unwrap_err();
        assert!(matches!(err, CoreError::Generation(_)));

        let generator = LlmGenerator::new("silent", Arc::new(FixedLLM::silent()));
        assert!(generator.generate("s", "u").await.is_err());
    }

    /// Provider errors surface as generation errors.
    #[tokio::test]
    async fn provider_error_is_mapped() {
        let generator = LlmGenerator::new("failing", Arc::new(FailingLLM::new("quota")));
        let err = generator.generate("s", "u").await.unwrap_err();
        assert!(err.to_string().contains("quota"));
    }

    /// No generator is built when generation is disabled or unkeyed.
    #[test]
    fn config_without_credentials_yields_none() {
        let disabled = GenerationConfig::default();
        assert!(generator_from_config(&disabled).expect("config").is_none());

        let unkeyed = GenerationConfig {
            provider: GenerationProvider::Openai,
            api_key_env: "MEMLANE_TEST_KEY_THAT_IS_NEVER_SET".to_string(),
            ..GenerationConfig::default()
        };
        assert!(generator_from_config(&unkeyed).expect("config").is_none());
    }
}
