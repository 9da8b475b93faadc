//! Testing utilities for story sessions.
//!
//! This module provides tools for integration testing:
//! - `ScriptedBoundary` for deterministic generation without API calls
//! - `TestHarness` for scripted story scenarios
//! - `sample_step` helpers for building valid steps

use crate::config::StoryConfig;
use crate::generation::{GenerationBoundary, GenerationError, GenerationRequest, StepClient};
use crate::locale::Locale;
use crate::persist::SavedStories;
use crate::profile::{Theme, UserProfile};
use crate::prompt::unvisited_steps;
use crate::session::StorySession;
use crate::step::{Animation, Choice, StoryStep};
use crate::store::MemoryStore;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// A valid step with two choices.
pub fn sample_step(text: impl Into<String>, first: u8, second: u8) -> StoryStep {
    StoryStep {
        text: text.into(),
        choices: [
            Choice::new("I want to go left", first),
            Choice::new("I want to go right", second),
        ],
        animation: Animation::Star,
    }
}

/// The JSON payload of [`sample_step`].
pub fn sample_step_json(text: impl Into<String>, first: u8, second: u8) -> String {
    serde_json::to_string(&sample_step(text, first, second)).unwrap_or_default()
}

/// A scripted reply from the mock boundary.
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Return this raw payload.
    Payload(String),
    /// Fail as if the endpoint answered with this status.
    Status(u16, String),
    /// Fail as if the connection broke.
    Network(String),
    /// Wait, then reply.
    Delayed(Duration, Box<MockReply>),
}

impl MockReply {
    pub fn payload(payload: impl Into<String>) -> Self {
        MockReply::Payload(payload.into())
    }

    /// Reply with [`sample_step_json`].
    pub fn step(text: impl Into<String>, first: u8, second: u8) -> Self {
        MockReply::Payload(sample_step_json(text, first, second))
    }

    pub fn status(status: u16, message: impl Into<String>) -> Self {
        MockReply::Status(status, message.into())
    }

    pub fn network(message: impl Into<String>) -> Self {
        MockReply::Network(message.into())
    }

    pub fn delayed(delay: Duration, reply: MockReply) -> Self {
        MockReply::Delayed(delay, Box::new(reply))
    }
}

/// A generation boundary that replays scripted replies.
///
/// Once the script runs out it answers with a valid step whose choices lead
/// to the first unvisited steps, so long scenarios need no script at all.
#[derive(Debug, Default)]
pub struct ScriptedBoundary {
    replies: Mutex<VecDeque<MockReply>>,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl ScriptedBoundary {
    pub fn new(replies: Vec<MockReply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Add a reply to the end of the script.
    pub fn queue(&self, reply: MockReply) {
        self.replies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(reply);
    }

    /// Every request received so far, oldest first.
    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn last_request(&self) -> Option<GenerationRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .cloned()
    }

    fn next_reply(&self, request: &GenerationRequest) -> MockReply {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());
        self.replies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .unwrap_or_else(|| MockReply::Payload(generated_step(request)))
    }
}

fn generated_step(request: &GenerationRequest) -> String {
    let mut open = unvisited_steps(&request.visited_steps)
        .into_iter()
        .filter(|step| *step != request.current_step);
    let first = open.next().unwrap_or(1);
    let second = open.next().unwrap_or(first);
    sample_step_json(format!("Step {}", request.current_step), first, second)
}

#[async_trait]
impl GenerationBoundary for ScriptedBoundary {
    async fn request(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        let mut reply = self.next_reply(request);
        let mut delay = Duration::ZERO;
        while let MockReply::Delayed(d, inner) = reply {
            delay += d;
            reply = *inner;
        }
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        match reply {
            MockReply::Payload(payload) => Ok(payload),
            MockReply::Status(status, message) => Err(GenerationError::Status { status, message }),
            MockReply::Network(message) => Err(GenerationError::Http(message)),
            MockReply::Delayed(..) => unreachable!("delays are unwrapped above"),
        }
    }
}

/// Test harness for running story scenarios.
pub struct TestHarness {
    /// The scripted boundary behind the session.
    pub boundary: Arc<ScriptedBoundary>,
    /// The session under test.
    pub session: StorySession,
    /// Backing store for saves.
    pub store: Arc<MemoryStore>,
}

impl TestHarness {
    /// Ela, age 7, space theme, English.
    pub fn new() -> Self {
        let profile = UserProfile::new("Ela", 7, Theme::Space).unwrap_or_else(|e| {
            panic!("sample profile must be valid: {e}");
        });
        Self::with_profile(profile, StoryConfig::new().with_locale(Locale::En))
    }

    pub fn with_profile(profile: UserProfile, config: StoryConfig) -> Self {
        let boundary = Arc::new(ScriptedBoundary::default());
        let client = StepClient::new(boundary.clone()).with_timeout(config.request_timeout);
        let session = StorySession::new(profile, client, &config);

        Self {
            boundary,
            session,
            store: Arc::new(MemoryStore::new()),
        }
    }

    /// Queue a valid step.
    pub fn expect_step(&mut self, text: impl Into<String>, first: u8, second: u8) -> &mut Self {
        self.boundary.queue(MockReply::step(text, first, second));
        self
    }

    /// Queue any reply.
    pub fn expect_reply(&mut self, reply: MockReply) -> &mut Self {
        self.boundary.queue(reply);
        self
    }

    pub fn saved_stories(&self) -> SavedStories {
        SavedStories::new(self.store.clone())
    }

    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.boundary.requests()
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(step: u8, visited: Vec<u8>) -> GenerationRequest {
        let profile = UserProfile::new("Ela", 7, Theme::Space).unwrap();
        GenerationRequest::new(&profile, step, vec![], visited, Locale::En)
    }

    #[tokio::test]
    async fn test_script_then_generated() {
        let boundary = ScriptedBoundary::new(vec![MockReply::step("First", 4, 6)]);
        let first = boundary.request(&request(1, vec![])).await.unwrap();
        assert_eq!(StoryStep::from_json(&first).unwrap().text, "First");

        let generated = boundary.request(&request(2, vec![1])).await.unwrap();
        let step = StoryStep::from_json(&generated).unwrap();
        assert_eq!(step.choices[0].next_step, 3);
        assert_eq!(step.choices[1].next_step, 4);
        assert_eq!(boundary.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_network_reply() {
        let boundary = ScriptedBoundary::new(vec![MockReply::network("connection reset")]);
        let err = boundary.request(&request(1, vec![])).await.unwrap_err();
        assert!(matches!(err, GenerationError::Http(_)));
    }

    #[tokio::test]
    async fn test_generated_when_all_visited() {
        let boundary = ScriptedBoundary::default();
        let visited: Vec<u8> = (1..=20).collect();
        let payload = boundary.request(&request(20, visited)).await.unwrap();
        let step = StoryStep::from_json(&payload).unwrap();
        assert_eq!(step.choices[0].next_step, 1);
        assert_eq!(step.choices[1].next_step, 1);
    }
}
