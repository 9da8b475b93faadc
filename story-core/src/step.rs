//! Story steps and the schema generated steps must satisfy.
//!
//! Whatever comes back from the generation boundary is untrusted: it is
//! parsed through [`StoryStep::from_json`] and rejected unless it has
//! exactly the expected shape.

use crate::locale::Locale;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Number of steps a story is written towards.
pub const STORY_LENGTH: u8 = 20;

/// Whether `step` is a step number of the story, 1..=20.
pub fn is_story_step(step: u8) -> bool {
    (1..=STORY_LENGTH).contains(&step)
}

/// Number of choices offered at every step.
pub const CHOICES_PER_STEP: usize = 2;

/// Errors from step validation.
#[derive(Debug, Error)]
pub enum StepError {
    #[error("Malformed step JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Expected 2 choices, got {0}")]
    ChoiceCount(usize),

    #[error("Choice {index} points to step {step}, outside 1..=20")]
    NextStepOutOfRange { index: usize, step: i64 },

    #[error("Unknown animation: {0}")]
    UnknownAnimation(String),

    #[error("Step text is empty")]
    EmptyText,

    #[error("Choice {0} has no text")]
    EmptyChoice(usize),
}

/// Decorative cue shown alongside a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Animation {
    Sun,
    Star,
    Sparkles,
    Cloud,
    Bird,
    Fish,
    Rocket,
    Bike,
}

impl Animation {
    pub const ALL: [Animation; 8] = [
        Animation::Sun,
        Animation::Star,
        Animation::Sparkles,
        Animation::Cloud,
        Animation::Bird,
        Animation::Fish,
        Animation::Rocket,
        Animation::Bike,
    ];

    pub fn token(&self) -> &'static str {
        match self {
            Animation::Sun => "sun",
            Animation::Star => "star",
            Animation::Sparkles => "sparkles",
            Animation::Cloud => "cloud",
            Animation::Bird => "bird",
            Animation::Fish => "fish",
            Animation::Rocket => "rocket",
            Animation::Bike => "bike",
        }
    }
}

impl fmt::Display for Animation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl FromStr for Animation {
    type Err = StepError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Animation::ALL
            .iter()
            .copied()
            .find(|a| a.token() == s)
            .ok_or_else(|| StepError::UnknownAnimation(s.to_string()))
    }
}

/// One of the two ways a reader can continue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    pub text: String,
    #[serde(rename = "nextStep")]
    pub next_step: u8,
}

impl Choice {
    pub fn new(text: impl Into<String>, next_step: u8) -> Self {
        Self {
            text: text.into(),
            next_step,
        }
    }
}

/// A validated story step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawStep")]
pub struct StoryStep {
    pub text: String,
    pub choices: [Choice; CHOICES_PER_STEP],
    pub animation: Animation,
}

impl StoryStep {
    /// Parse and validate a step payload.
    pub fn from_json(payload: &str) -> Result<Self, StepError> {
        let raw: RawStep = serde_json::from_str(payload)?;
        raw.try_into()
    }

    /// Validate an already-decoded JSON value.
    pub fn from_value(value: serde_json::Value) -> Result<Self, StepError> {
        let raw: RawStep = serde_json::from_value(value)?;
        raw.try_into()
    }

    /// The step shown when generation fails.
    ///
    /// Both choices keep the story navigable: one starts over at step 1,
    /// the other asks for `current_step` again.
    pub fn fallback(locale: Locale, current_step: u8) -> Self {
        Self {
            text: locale.apology().to_string(),
            choices: [
                Choice::new(locale.start_over(), 1),
                Choice::new(locale.try_again(), current_step),
            ],
            animation: Animation::Sparkles,
        }
    }

    pub fn choice(&self, index: usize) -> Option<&Choice> {
        self.choices.get(index)
    }
}

/// Step as the model sends it, before any checks.
#[derive(Debug, Deserialize)]
struct RawStep {
    text: String,
    choices: Vec<RawChoice>,
    animation: String,
}

#[derive(Debug, Deserialize)]
struct RawChoice {
    text: String,
    #[serde(rename = "nextStep")]
    next_step: i64,
}

impl TryFrom<RawStep> for StoryStep {
    type Error = StepError;

    fn try_from(raw: RawStep) -> Result<Self, Self::Error> {
        if raw.text.trim().is_empty() {
            return Err(StepError::EmptyText);
        }

        let count = raw.choices.len();
        let choices: [RawChoice; CHOICES_PER_STEP] = raw
            .choices
            .try_into()
            .map_err(|_| StepError::ChoiceCount(count))?;

        let animation: Animation = raw.animation.trim().parse()?;

        let [first, second] = choices;
        Ok(Self {
            text: raw.text,
            choices: [validate_choice(0, first)?, validate_choice(1, second)?],
            animation,
        })
    }
}

fn validate_choice(index: usize, raw: RawChoice) -> Result<Choice, StepError> {
    if raw.text.trim().is_empty() {
        return Err(StepError::EmptyChoice(index));
    }
    if raw.next_step < 1 || raw.next_step > STORY_LENGTH as i64 {
        return Err(StepError::NextStepOutOfRange {
            index,
            step: raw.next_step,
        });
    }
    Ok(Choice::new(raw.text, raw.next_step as u8))
}
