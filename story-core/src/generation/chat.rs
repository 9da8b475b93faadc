//! Generation by prompting the chat model directly.

use super::{GenerationBoundary, GenerationError, GenerationRequest};
use crate::config::StoryConfig;
use crate::prompt::{build_prompts, PromptInput};
use async_trait::async_trait;
use openai::{Message, OpenAi, Request, ResponseFormat};

/// Builds the step prompts and asks the model for a JSON step.
#[derive(Debug, Clone)]
pub struct ChatBoundary {
    client: OpenAi,
    max_tokens: Option<usize>,
    temperature: Option<f32>,
}

impl ChatBoundary {
    pub fn new(client: OpenAi) -> Self {
        Self {
            client,
            max_tokens: None,
            temperature: None,
        }
    }

    /// Create a boundary from the OPENAI_API_KEY environment variable.
    pub fn from_env() -> Result<Self, GenerationError> {
        Ok(Self::new(OpenAi::from_env()?))
    }

    /// Apply the model settings of a story configuration.
    pub fn from_config(client: OpenAi, config: &StoryConfig) -> Self {
        let client = match &config.model {
            Some(model) => client.with_model(model.clone()),
            None => client,
        };
        Self {
            client,
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

#[async_trait]
impl GenerationBoundary for ChatBoundary {
    async fn request(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        let profile = request.profile()?;
        let prompts = build_prompts(&PromptInput {
            profile: &profile,
            current_step: request.current_step,
            choice_history: &request.previous_choices,
            visited_steps: &request.visited_steps,
            locale: request.language,
        })?;

        let mut chat = Request::new(vec![Message::user(prompts.user)])
            .with_system(prompts.system)
            .with_response_format(ResponseFormat::JsonObject);
        if let Some(max_tokens) = self.max_tokens {
            chat = chat.with_max_tokens(max_tokens);
        }
        if let Some(temperature) = self.temperature {
            chat = chat.with_temperature(temperature);
        }

        let response = self.client.complete(chat).await?;
        tracing::debug!(
            model = %response.model,
            prompt_tokens = response.usage.prompt_tokens,
            completion_tokens = response.usage.completion_tokens,
            finish_reason = ?response.finish_reason,
            "story step completion"
        );

        let content = response.text().trim();
        if content.is_empty() {
            return Err(GenerationError::EmptyResponse);
        }
        Ok(content.to_string())
    }
}
