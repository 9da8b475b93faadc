//! Story configuration.

use crate::generation::DEFAULT_REQUEST_TIMEOUT;
use crate::locale::Locale;
use crate::machine::DEFAULT_COUNTDOWN_SECS;
use crate::step::STORY_LENGTH;
use std::time::Duration;
use thiserror::Error;

/// Errors from reading configuration overrides.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
}

/// Configuration for a story session.
#[derive(Debug, Clone)]
pub struct StoryConfig {
    /// Model override for the chat boundary.
    pub model: Option<String>,

    /// Maximum tokens per generated step.
    pub max_tokens: Option<usize>,

    /// Sampling temperature.
    pub temperature: Option<f32>,

    /// Language of prompts and fallback text.
    pub locale: Locale,

    /// Seconds on the countdown shown with each step.
    pub countdown_secs: u32,

    /// Visited steps after which the story finishes. `None` never finishes.
    pub step_limit: Option<usize>,

    /// Time allowed for one generation round trip.
    pub request_timeout: Duration,
}

impl Default for StoryConfig {
    fn default() -> Self {
        Self {
            model: None,
            max_tokens: Some(1024),
            temperature: Some(0.8),
            locale: Locale::default(),
            countdown_secs: DEFAULT_COUNTDOWN_SECS,
            step_limit: Some(STORY_LENGTH as usize),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl StoryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the model to use.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Set max tokens for responses.
    pub fn with_max_tokens(mut self, tokens: usize) -> Self {
        self.max_tokens = Some(tokens);
        self
    }

    /// Set temperature for generation.
    pub fn with_temperature(mut self, temp: f32) -> Self {
        self.temperature = Some(temp);
        self
    }

    pub fn with_locale(mut self, locale: Locale) -> Self {
        self.locale = locale;
        self
    }

    pub fn with_countdown_secs(mut self, secs: u32) -> Self {
        self.countdown_secs = secs;
        self
    }

    pub fn with_step_limit(mut self, limit: Option<usize>) -> Self {
        self.step_limit = limit;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Apply `STORY_MODEL`, `STORY_LANGUAGE` and `STORY_COUNTDOWN_SECS` when set.
    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    fn with_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(model) = lookup("STORY_MODEL") {
            self.model = Some(model);
        }
        if let Some(language) = lookup("STORY_LANGUAGE") {
            self.locale = language.parse().map_err(|_| ConfigError::InvalidValue {
                key: "STORY_LANGUAGE",
                value: language.clone(),
            })?;
        }
        if let Some(secs) = lookup("STORY_COUNTDOWN_SECS") {
            self.countdown_secs = secs.parse().map_err(|_| ConfigError::InvalidValue {
                key: "STORY_COUNTDOWN_SECS",
                value: secs.clone(),
            })?;
        }
        Ok(self)
    }
}
