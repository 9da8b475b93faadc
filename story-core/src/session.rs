//! StorySession - the primary public API for playing a story.
//!
//! A session drives a [`StoryMachine`] with a [`StepClient`]: every step
//! request the machine issues is fetched, validated (or replaced by the
//! fallback step) and handed back.

use crate::config::StoryConfig;
use crate::export::StoryExport;
use crate::generation::{GenerationBoundary, StepClient};
use crate::locale::Locale;
use crate::machine::{Advance, MachineError, Phase, Resolution, StepRequest, StoryMachine, Tick};
use crate::persist::{PersistError, SavedStories};
use crate::profile::UserProfile;
use crate::step::StoryStep;
use std::sync::Arc;
use thiserror::Error;

/// Errors from StorySession operations.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Story error: {0}")]
    Machine(#[from] MachineError),

    #[error("Persistence error: {0}")]
    Persist(#[from] PersistError),

    #[error("Step request was superseded")]
    Superseded,
}

/// Outcome of a choice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Turn {
    /// The next step to show.
    Step(StoryStep),
    /// The story reached its step limit.
    Finished,
}

/// A story being played by one reader.
pub struct StorySession {
    profile: UserProfile,
    locale: Locale,
    machine: StoryMachine,
    client: StepClient,
}

impl StorySession {
    pub fn new(profile: UserProfile, client: StepClient, config: &StoryConfig) -> Self {
        Self {
            profile,
            locale: config.locale,
            machine: StoryMachine::from_config(config),
            client,
        }
    }

    /// Create a session over any generation boundary.
    pub fn with_boundary(
        profile: UserProfile,
        boundary: Arc<dyn GenerationBoundary>,
        config: &StoryConfig,
    ) -> Self {
        let client = StepClient::new(boundary).with_timeout(config.request_timeout);
        Self::new(profile, client, config)
    }

    /// Continue the story saved under `name`, if there is one.
    pub async fn resume(
        saved: &SavedStories,
        name: &str,
        client: StepClient,
        config: &StoryConfig,
    ) -> Result<Option<Self>, SessionError> {
        let Some(snapshot) = saved.load(name).await? else {
            return Ok(None);
        };

        let mut machine = StoryMachine::from_config(config);
        let profile = machine.restore(snapshot)?;
        Ok(Some(Self {
            profile,
            locale: config.locale,
            machine,
            client,
        }))
    }

    /// Fetch and present step 1.
    pub async fn begin(&mut self) -> Result<StoryStep, SessionError> {
        let request = self.machine.start(self.profile.clone())?;
        self.fulfil(request).await
    }

    /// Pick choice `index` of the current step and fetch where it leads.
    pub async fn choose(&mut self, index: usize) -> Result<Turn, SessionError> {
        match self.machine.choose(index)? {
            Advance::Request(request) => Ok(Turn::Step(self.fulfil(request).await?)),
            Advance::Finished => Ok(Turn::Finished),
        }
    }

    /// Start over from step 1 with the same profile.
    pub async fn restart(&mut self) -> Result<StoryStep, SessionError> {
        let request = self.machine.restart()?;
        self.fulfil(request).await
    }

    /// Advance the countdown by one second.
    pub fn tick(&mut self) -> Tick {
        self.machine.tick()
    }

    /// Save the presented step under the reader's name.
    pub async fn save(&self, saved: &SavedStories) -> Result<(), SessionError> {
        let snapshot = self.machine.snapshot().ok_or(MachineError::NotPresenting)?;
        saved.save(self.profile.name(), snapshot).await?;
        Ok(())
    }

    /// The story so far, ready to render.
    pub fn export(&self) -> StoryExport {
        StoryExport::new(&self.profile, self.machine.story_texts(), self.locale)
    }

    async fn fulfil(&mut self, request: StepRequest) -> Result<StoryStep, SessionError> {
        let generation = request.to_generation(&self.profile, self.locale);
        let step = self.client.fetch(&generation).await;
        match self.machine.resolve(request.ticket, step.clone()) {
            Resolution::Applied => Ok(step),
            Resolution::Stale => Err(SessionError::Superseded),
        }
    }

    // ===== Accessors =====

    pub fn profile(&self) -> &UserProfile {
        &self.profile
    }

    pub fn locale(&self) -> Locale {
        self.locale
    }

    pub fn machine(&self) -> &StoryMachine {
        &self.machine
    }

    pub fn phase(&self) -> Phase {
        self.machine.phase()
    }

    pub fn current_step(&self) -> Option<&StoryStep> {
        self.machine.current_step()
    }

    pub fn current_step_number(&self) -> u8 {
        self.machine.current_step_number()
    }

    pub fn visited_steps(&self) -> &[u8] {
        self.machine.visited_steps()
    }

    pub fn choice_history(&self) -> &[String] {
        self.machine.choice_history()
    }

    pub fn progress_percent(&self) -> u8 {
        self.machine.progress_percent()
    }

    pub fn remaining_seconds(&self) -> u32 {
        self.machine.remaining_seconds()
    }

    pub fn time_expired(&self) -> bool {
        self.machine.time_expired()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockReply, TestHarness};

    #[tokio::test]
    async fn test_begin_presents_first_step() {
        let mut harness = TestHarness::new();
        harness.expect_step("Ela looked at the stars.", 3, 5);

        let step = harness.session.begin().await.unwrap();
        assert_eq!(step.text, "Ela looked at the stars.");
        assert_eq!(harness.session.phase(), Phase::Presenting);
        assert_eq!(harness.session.current_step_number(), 1);
        assert_eq!(harness.session.progress_percent(), 0);
    }

    #[tokio::test]
    async fn test_begin_twice_is_an_error() {
        let mut harness = TestHarness::new();
        harness.session.begin().await.unwrap();
        assert!(matches!(
            harness.session.begin().await,
            Err(SessionError::Machine(MachineError::AlreadyStarted))
        ));
    }

    #[tokio::test]
    async fn test_fallback_keeps_story_playable() {
        let mut harness = TestHarness::new();
        harness
            .expect_step("Start", 4, 5)
            .expect_reply(MockReply::status(500, "boom"))
            .expect_step("Step four, for real", 6, 7);

        harness.session.begin().await.unwrap();
        let Turn::Step(fallback) = harness.session.choose(0).await.unwrap() else {
            panic!("expected a step");
        };
        assert_eq!(fallback, StoryStep::fallback(Locale::En, 4));

        // "Try Again" asks for step 4 again.
        let Turn::Step(retry) = harness.session.choose(1).await.unwrap() else {
            panic!("expected a step");
        };
        assert_eq!(retry.text, "Step four, for real");
        assert_eq!(harness.session.current_step_number(), 4);
        assert_eq!(harness.session.visited_steps(), &[1, 4]);
    }

    #[tokio::test]
    async fn test_save_requires_a_step() {
        let harness = TestHarness::new();
        let saved = harness.saved_stories();
        assert!(matches!(
            harness.session.save(&saved).await,
            Err(SessionError::Machine(MachineError::NotPresenting))
        ));
    }

    #[tokio::test]
    async fn test_export_includes_current_step() {
        let mut harness = TestHarness::new();
        harness.expect_step("One", 2, 3).expect_step("Two", 4, 5);
        harness.session.begin().await.unwrap();
        harness.session.choose(0).await.unwrap();

        let export = harness.session.export();
        assert_eq!(export.title, "Ela's Big Adventure");
        assert_eq!(export.texts, vec!["One".to_string(), "Two".to_string()]);
    }
}
