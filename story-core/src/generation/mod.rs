//! The generation boundary and the story step client.
//!
//! A [`GenerationBoundary`] turns a [`GenerationRequest`] into a raw step
//! payload: either by prompting the model directly ([`ChatBoundary`]) or by
//! calling a story endpoint over HTTP ([`HttpBoundary`]). The
//! [`StepClient`] sits in front of any boundary, validates what comes back
//! and substitutes the fallback step on any failure, so callers always get a
//! well-formed [`StoryStep`].

mod chat;
mod http;

pub use chat::ChatBoundary;
pub use http::HttpBoundary;

use crate::locale::Locale;
use crate::profile::{UserInfo, UserProfile, ValidationError};
use crate::prompt::PromptError;
use crate::step::{StepError, StoryStep};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Default time allowed for one generation round trip.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Errors from the generation boundary.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("Chat API error: {0}")]
    Api(#[from] openai::Error),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Story endpoint returned status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Generation timed out after {0:?}")]
    Timeout(Duration),

    #[error("Model returned an empty response")]
    EmptyResponse,

    #[error("Invalid step: {0}")]
    InvalidStep(#[from] StepError),

    #[error("Prompt error: {0}")]
    Prompt(#[from] PromptError),

    #[error("Invalid request: {0}")]
    InvalidRequest(#[from] ValidationError),
}

/// Request body for one story step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    pub user_info: UserInfo,
    pub current_step: u8,
    #[serde(default)]
    pub previous_choices: Vec<String>,
    #[serde(default)]
    pub visited_steps: Vec<u8>,
    #[serde(default)]
    pub language: Locale,
}

impl GenerationRequest {
    pub fn new(
        profile: &UserProfile,
        current_step: u8,
        previous_choices: Vec<String>,
        visited_steps: Vec<u8>,
        language: Locale,
    ) -> Self {
        Self {
            user_info: profile.into(),
            current_step,
            previous_choices,
            visited_steps,
            language,
        }
    }

    /// Validate the embedded profile.
    pub fn profile(&self) -> Result<UserProfile, ValidationError> {
        self.user_info.clone().try_into()
    }
}

/// Something that can produce a raw step payload for a request.
#[async_trait]
pub trait GenerationBoundary: Send + Sync {
    async fn request(&self, request: &GenerationRequest) -> Result<String, GenerationError>;
}

/// Fetches validated steps, falling back to a retry step on failure.
#[derive(Clone)]
pub struct StepClient {
    boundary: Arc<dyn GenerationBoundary>,
    timeout: Duration,
}

impl StepClient {
    pub fn new(boundary: Arc<dyn GenerationBoundary>) -> Self {
        Self {
            boundary,
            timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Set how long a single round trip may take.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Fetch and validate a step, reporting failures to the caller.
    pub async fn try_fetch(&self, request: &GenerationRequest) -> Result<StoryStep, GenerationError> {
        let payload = tokio::time::timeout(self.timeout, self.boundary.request(request))
            .await
            .map_err(|_| GenerationError::Timeout(self.timeout))??;

        Ok(StoryStep::from_json(&payload)?)
    }

    /// Fetch a step. Never fails: any error yields [`StoryStep::fallback`].
    pub async fn fetch(&self, request: &GenerationRequest) -> StoryStep {
        match self.try_fetch(request).await {
            Ok(step) => step,
            Err(e) => {
                tracing::warn!(
                    step = request.current_step,
                    language = %request.language,
                    error = %e,
                    "story step generation failed, using fallback"
                );
                StoryStep::fallback(request.language, request.current_step)
            }
        }
    }
}
