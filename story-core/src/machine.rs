//! The story state machine.
//!
//! [`StoryMachine`] performs no I/O. Every transition that needs a new step
//! hands back a [`StepRequest`] tagged with a [`Ticket`]; the caller fetches
//! the step and feeds it back through [`StoryMachine::resolve`]. Only the
//! newest outstanding ticket is ever applied, so a response that arrives
//! after a restart or a newer request is dropped.

use crate::config::StoryConfig;
use crate::generation::GenerationRequest;
use crate::locale::Locale;
use crate::persist::StorySnapshot;
use crate::profile::UserProfile;
use crate::step::{is_story_step, StoryStep, STORY_LENGTH};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Seconds on the countdown shown with each step.
pub const DEFAULT_COUNTDOWN_SECS: u32 = 45;

/// Percentage points earned per visited step.
const PERCENT_PER_STEP: usize = 5;

/// Progress for a number of visited steps, capped at 100.
pub fn progress_percent(visited: usize) -> u8 {
    visited.saturating_mul(PERCENT_PER_STEP).min(100) as u8
}

/// Errors from invalid transitions.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MachineError {
    #[error("No story has been started")]
    NotStarted,

    #[error("A story is already in progress")]
    AlreadyStarted,

    #[error("Waiting for the next step")]
    Busy,

    #[error("No step is being presented")]
    NotPresenting,

    #[error("The story is finished")]
    Finished,

    #[error("Invalid choice index: {0}")]
    InvalidChoice(usize),

    #[error("Saved story is invalid: {0}")]
    InvalidSnapshot(String),
}

// ============================================================================
// Public types
// ============================================================================

/// Where the story currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No story started yet.
    Idle,
    /// A step request is outstanding.
    Loading,
    /// A step is shown and a choice can be made.
    Presenting,
    /// The step limit was reached.
    Finished,
}

/// Identifies one outgoing step request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Ticket(u64);

impl Ticket {
    pub fn value(&self) -> u64 {
        self.0
    }
}

/// A step the caller must fetch and hand back with [`StoryMachine::resolve`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepRequest {
    pub ticket: Ticket,
    pub step_number: u8,
    pub choice_history: Vec<String>,
    pub visited_steps: Vec<u8>,
}

impl StepRequest {
    /// The wire request for this step.
    pub fn to_generation(&self, profile: &UserProfile, locale: Locale) -> GenerationRequest {
        GenerationRequest::new(
            profile,
            self.step_number,
            self.choice_history.clone(),
            self.visited_steps.clone(),
            locale,
        )
    }
}

/// Result of making a choice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advance {
    /// Fetch this step next.
    Request(StepRequest),
    /// The story reached its step limit.
    Finished,
}

/// Result of handing back a fetched step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Applied,
    /// The ticket was superseded; the step was discarded.
    Stale,
}

/// Result of one countdown tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// The countdown is not running.
    Idle,
    /// Seconds left after this tick.
    Running(u32),
    /// The countdown reached zero on this tick.
    Expired,
}

/// Visited step numbers, each recorded once, in first-visit order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VisitedSteps(Vec<u8>);

impl VisitedSteps {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a step. Returns false if it was already visited.
    pub fn insert(&mut self, step: u8) -> bool {
        if self.0.contains(&step) {
            return false;
        }
        self.0.push(step);
        true
    }

    pub fn contains(&self, step: u8) -> bool {
        self.0.contains(&step)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }
}

impl FromIterator<u8> for VisitedSteps {
    fn from_iter<I: IntoIterator<Item = u8>>(iter: I) -> Self {
        let mut visited = Self::new();
        for step in iter {
            visited.insert(step);
        }
        visited
    }
}

/// Per-step countdown, advanced one second per tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Countdown {
    total: u32,
    remaining: u32,
    running: bool,
}

impl Countdown {
    pub fn new(total: u32) -> Self {
        Self {
            total,
            remaining: total,
            running: false,
        }
    }

    /// Refill and start.
    pub fn restart(&mut self) {
        self.remaining = self.total;
        self.running = self.total > 0;
    }

    /// Refill without starting.
    pub fn reset(&mut self) {
        self.remaining = self.total;
        self.running = false;
    }

    pub fn stop(&mut self) {
        self.running = false;
    }

    pub fn tick(&mut self) -> Tick {
        if !self.running {
            return Tick::Idle;
        }
        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            self.running = false;
            Tick::Expired
        } else {
            Tick::Running(self.remaining)
        }
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn is_running(&self) -> bool {
        self.running
    }
}

// ============================================================================
// State machine
// ============================================================================

/// Story progression for one reader.
#[derive(Debug, Clone)]
pub struct StoryMachine {
    profile: Option<UserProfile>,
    phase: Phase,
    current_step: Option<StoryStep>,
    current_step_number: u8,
    visited: VisitedSteps,
    choice_history: Vec<String>,
    countdown: Countdown,
    time_expired: bool,
    progress: u8,
    step_limit: Option<usize>,
    next_ticket: u64,
    pending: Option<Ticket>,
}

impl Default for StoryMachine {
    fn default() -> Self {
        Self::new(DEFAULT_COUNTDOWN_SECS, Some(STORY_LENGTH as usize))
    }
}

impl StoryMachine {
    /// Create a machine with a countdown length and an optional step limit.
    pub fn new(countdown_secs: u32, step_limit: Option<usize>) -> Self {
        Self {
            profile: None,
            phase: Phase::Idle,
            current_step: None,
            current_step_number: 1,
            visited: VisitedSteps::new(),
            choice_history: Vec::new(),
            countdown: Countdown::new(countdown_secs),
            time_expired: false,
            progress: 0,
            step_limit,
            next_ticket: 0,
            pending: None,
        }
    }

    pub fn from_config(config: &StoryConfig) -> Self {
        Self::new(config.countdown_secs, config.step_limit)
    }

    /// Begin a story for `profile` at step 1.
    pub fn start(&mut self, profile: UserProfile) -> Result<StepRequest, MachineError> {
        if self.phase != Phase::Idle {
            return Err(MachineError::AlreadyStarted);
        }
        tracing::debug!(name = profile.name(), theme = %profile.theme(), "story started");
        self.profile = Some(profile);
        Ok(self.issue(1))
    }

    /// Hand back a fetched step.
    pub fn resolve(&mut self, ticket: Ticket, step: StoryStep) -> Resolution {
        if self.phase != Phase::Loading || self.pending != Some(ticket) {
            tracing::debug!(ticket = ticket.value(), "discarding stale step");
            return Resolution::Stale;
        }

        self.pending = None;
        self.current_step = Some(step);
        self.countdown.restart();
        self.time_expired = false;
        self.phase = Phase::Presenting;
        tracing::debug!(step = self.current_step_number, "step presented");
        Resolution::Applied
    }

    /// Pick choice `index` of the current step.
    pub fn choose(&mut self, index: usize) -> Result<Advance, MachineError> {
        match self.phase {
            Phase::Idle => return Err(MachineError::NotStarted),
            Phase::Loading => return Err(MachineError::Busy),
            Phase::Finished => return Err(MachineError::Finished),
            Phase::Presenting => {}
        }

        let step = self.current_step.as_ref().ok_or(MachineError::NotPresenting)?;
        let next_step = step
            .choice(index)
            .ok_or(MachineError::InvalidChoice(index))?
            .next_step;

        self.choice_history.push(step.text.clone());
        self.visited.insert(self.current_step_number);
        self.progress = progress_percent(self.visited.len());
        self.countdown.stop();

        if self.limit_reached() {
            self.phase = Phase::Finished;
            tracing::debug!(visited = self.visited.len(), "story finished");
            return Ok(Advance::Finished);
        }

        Ok(Advance::Request(self.issue(next_step)))
    }

    /// Start the same story over from step 1.
    pub fn restart(&mut self) -> Result<StepRequest, MachineError> {
        if self.profile.is_none() {
            return Err(MachineError::NotStarted);
        }

        self.choice_history.clear();
        self.visited.clear();
        self.progress = 0;
        self.current_step = None;
        self.time_expired = false;
        self.countdown.reset();
        tracing::debug!("story restarted");
        Ok(self.issue(1))
    }

    /// Advance the countdown by one second.
    ///
    /// Expiry only raises [`StoryMachine::time_expired`]; choices stay open.
    pub fn tick(&mut self) -> Tick {
        if self.phase != Phase::Presenting {
            return Tick::Idle;
        }
        let tick = self.countdown.tick();
        if tick == Tick::Expired {
            self.time_expired = true;
        }
        tick
    }

    /// Capture the presented step for saving.
    ///
    /// Returns `None` while a step is loading: the step number already
    /// points at the requested step but the content is still the old one.
    pub fn snapshot(&self) -> Option<StorySnapshot> {
        if !matches!(self.phase, Phase::Presenting | Phase::Finished) {
            return None;
        }
        let profile = self.profile.as_ref()?;
        let step = self.current_step.as_ref()?;
        Some(StorySnapshot::new(
            profile,
            self.current_step_number,
            step.clone(),
            self.visited.as_slice().to_vec(),
            self.choice_history.clone(),
        ))
    }

    /// Continue a saved story. The machine must be idle.
    pub fn restore(&mut self, snapshot: StorySnapshot) -> Result<UserProfile, MachineError> {
        if self.phase != Phase::Idle {
            return Err(MachineError::AlreadyStarted);
        }

        let profile = snapshot
            .profile()
            .map_err(|e| MachineError::InvalidSnapshot(e.to_string()))?;
        if !is_story_step(snapshot.current_step_number) {
            return Err(MachineError::InvalidSnapshot(format!(
                "step {} is outside 1..={STORY_LENGTH}",
                snapshot.current_step_number
            )));
        }
        if let Some(step) = snapshot.visited_steps.iter().find(|&&n| !is_story_step(n)) {
            return Err(MachineError::InvalidSnapshot(format!(
                "visited step {step} is outside 1..={STORY_LENGTH}"
            )));
        }
        self.profile = Some(profile.clone());
        self.current_step_number = snapshot.current_step_number;
        self.current_step = Some(snapshot.current_step);
        self.visited = snapshot.visited_steps.into_iter().collect();
        self.choice_history = snapshot.choice_history;
        self.progress = progress_percent(self.visited.len());
        self.time_expired = false;
        self.pending = None;

        if self.limit_reached() {
            self.phase = Phase::Finished;
        } else {
            self.countdown.restart();
            self.phase = Phase::Presenting;
        }
        Ok(profile)
    }

    // ===== Accessors =====

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn profile(&self) -> Option<&UserProfile> {
        self.profile.as_ref()
    }

    pub fn current_step(&self) -> Option<&StoryStep> {
        self.current_step.as_ref()
    }

    pub fn current_step_number(&self) -> u8 {
        self.current_step_number
    }

    pub fn visited_steps(&self) -> &[u8] {
        self.visited.as_slice()
    }

    pub fn choice_history(&self) -> &[String] {
        &self.choice_history
    }

    pub fn progress_percent(&self) -> u8 {
        self.progress
    }

    pub fn remaining_seconds(&self) -> u32 {
        self.countdown.remaining()
    }

    pub fn is_timer_running(&self) -> bool {
        self.countdown.is_running()
    }

    pub fn time_expired(&self) -> bool {
        self.time_expired
    }

    pub fn pending_ticket(&self) -> Option<Ticket> {
        self.pending
    }

    pub fn step_limit(&self) -> Option<usize> {
        self.step_limit
    }

    /// Narrative of every step shown so far, in order, ending with the
    /// current step.
    pub fn story_texts(&self) -> Vec<String> {
        let mut texts = self.choice_history.clone();
        if let Some(step) = &self.current_step {
            if self.phase != Phase::Finished {
                texts.push(step.text.clone());
            }
        }
        texts
    }

    fn limit_reached(&self) -> bool {
        self.step_limit
            .is_some_and(|limit| self.visited.len() >= limit)
    }

    fn issue(&mut self, step_number: u8) -> StepRequest {
        let ticket = Ticket(self.next_ticket);
        self.next_ticket += 1;
        self.pending = Some(ticket);
        self.phase = Phase::Loading;
        self.current_step_number = step_number;
        self.countdown.stop();

        StepRequest {
            ticket,
            step_number,
            choice_history: self.choice_history.clone(),
            visited_steps: self.visited.as_slice().to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::Theme;
    use crate::testing::sample_step;

    fn profile() -> UserProfile {
        UserProfile::new("Ela", 7, Theme::Space).unwrap()
    }

    fn presenting(countdown: u32) -> StoryMachine {
        let mut machine = StoryMachine::new(countdown, Some(20));
        let req = machine.start(profile()).unwrap();
        machine.resolve(req.ticket, sample_step("Step one", 3, 5));
        machine
    }

    #[test]
    fn test_progress_percent() {
        for n in 0..=40 {
            assert_eq!(progress_percent(n) as usize, (n * 5).min(100));
        }
        assert_eq!(progress_percent(usize::MAX), 100);
    }

    #[test]
    fn test_start_requests_step_one() {
        let mut machine = StoryMachine::default();
        let req = machine.start(profile()).unwrap();
        assert_eq!(req.step_number, 1);
        assert!(req.choice_history.is_empty());
        assert!(req.visited_steps.is_empty());
        assert_eq!(machine.phase(), Phase::Loading);
        assert_eq!(machine.start(profile()), Err(MachineError::AlreadyStarted));
    }

    #[test]
    fn test_resolve_presents_and_starts_countdown() {
        let machine = presenting(45);
        assert_eq!(machine.phase(), Phase::Presenting);
        assert_eq!(machine.remaining_seconds(), 45);
        assert!(machine.is_timer_running());
        assert!(!machine.time_expired());
    }

    #[test]
    fn test_choose_records_history_and_visited() {
        let mut machine = presenting(45);
        let advance = machine.choose(0).unwrap();

        let Advance::Request(req) = advance else {
            panic!("expected a request");
        };
        assert_eq!(req.step_number, 3);
        assert_eq!(req.choice_history, vec!["Step one".to_string()]);
        assert_eq!(req.visited_steps, vec![1]);
        assert_eq!(machine.progress_percent(), 5);
        assert_eq!(machine.phase(), Phase::Loading);
        assert!(!machine.is_timer_running());
    }

    #[test]
    fn test_choose_rejected_outside_presenting() {
        let mut machine = StoryMachine::default();
        assert_eq!(machine.choose(0), Err(MachineError::NotStarted));

        machine.start(profile()).unwrap();
        assert_eq!(machine.choose(0), Err(MachineError::Busy));
    }

    #[test]
    fn test_invalid_choice_index() {
        let mut machine = presenting(45);
        assert_eq!(machine.choose(2), Err(MachineError::InvalidChoice(2)));
        assert_eq!(machine.phase(), Phase::Presenting);
        assert!(machine.choice_history().is_empty());
    }

    #[test]
    fn test_stale_ticket_discarded() {
        let mut machine = StoryMachine::default();
        let first = machine.start(profile()).unwrap();
        let second = machine.restart().unwrap();

        assert_eq!(
            machine.resolve(first.ticket, sample_step("Old", 2, 3)),
            Resolution::Stale
        );
        assert_eq!(machine.phase(), Phase::Loading);
        assert_eq!(
            machine.resolve(second.ticket, sample_step("New", 2, 3)),
            Resolution::Applied
        );
        assert_eq!(machine.current_step().unwrap().text, "New");

        // A ticket cannot be applied twice.
        assert_eq!(
            machine.resolve(second.ticket, sample_step("Again", 2, 3)),
            Resolution::Stale
        );
    }

    #[test]
    fn test_restart_clears_progress() {
        let mut machine = presenting(45);
        let req = match machine.choose(1).unwrap() {
            Advance::Request(req) => req,
            Advance::Finished => panic!("finished early"),
        };
        machine.resolve(req.ticket, sample_step("Step five", 6, 7));
        assert_eq!(machine.progress_percent(), 5);

        let req = machine.restart().unwrap();
        assert_eq!(req.step_number, 1);
        assert!(req.choice_history.is_empty());
        assert!(machine.visited_steps().is_empty());
        assert_eq!(machine.progress_percent(), 0);
        assert_eq!(machine.remaining_seconds(), 45);
    }

    #[test]
    fn test_restart_requires_profile() {
        let mut machine = StoryMachine::default();
        assert_eq!(machine.restart(), Err(MachineError::NotStarted));
    }

    #[test]
    fn test_countdown_expiry_keeps_choices_open() {
        let mut machine = presenting(3);
        assert_eq!(machine.tick(), Tick::Running(2));
        assert_eq!(machine.tick(), Tick::Running(1));
        assert_eq!(machine.tick(), Tick::Expired);
        assert!(machine.time_expired());
        assert_eq!(machine.phase(), Phase::Presenting);
        assert_eq!(machine.tick(), Tick::Idle);

        let req = match machine.choose(0).unwrap() {
            Advance::Request(req) => req,
            Advance::Finished => panic!("finished early"),
        };
        machine.resolve(req.ticket, sample_step("Next", 4, 5));
        assert!(!machine.time_expired());
        assert_eq!(machine.remaining_seconds(), 3);
    }

    #[test]
    fn test_tick_idle_while_loading() {
        let mut machine = StoryMachine::default();
        machine.start(profile()).unwrap();
        assert_eq!(machine.tick(), Tick::Idle);
    }

    #[test]
    fn test_repeated_step_counts_once() {
        let mut machine = presenting(45);
        // Both choices lead back to step 1 and the reader keeps picking it.
        for _ in 0..3 {
            let req = match machine.choose(0).unwrap() {
                Advance::Request(req) => req,
                Advance::Finished => panic!("finished early"),
            };
            machine.resolve(req.ticket, sample_step("Loop", 1, 1));
        }
        assert_eq!(machine.visited_steps(), &[1, 3]);
        assert_eq!(machine.progress_percent(), 10);
        assert_eq!(machine.choice_history().len(), 3);
    }

    #[test]
    fn test_step_limit_finishes() {
        let mut machine = StoryMachine::new(45, Some(2));
        let req = machine.start(profile()).unwrap();
        machine.resolve(req.ticket, sample_step("One", 2, 3));
        let req = match machine.choose(0).unwrap() {
            Advance::Request(req) => req,
            Advance::Finished => panic!("finished early"),
        };
        machine.resolve(req.ticket, sample_step("Two", 3, 4));

        assert_eq!(machine.choose(0), Ok(Advance::Finished));
        assert_eq!(machine.phase(), Phase::Finished);
        assert_eq!(machine.choose(0), Err(MachineError::Finished));
        assert_eq!(machine.story_texts(), vec!["One".to_string(), "Two".to_string()]);
    }

    #[test]
    fn test_unbounded_never_finishes() {
        let mut machine = StoryMachine::new(45, None);
        let req = machine.start(profile()).unwrap();
        machine.resolve(req.ticket, sample_step("Step", 2, 3));
        for n in 2..=25u8 {
            let req = match machine.choose(0).unwrap() {
                Advance::Request(req) => req,
                Advance::Finished => panic!("unbounded story finished"),
            };
            let next = (n % 20) + 1;
            machine.resolve(req.ticket, sample_step("Step", next, next));
        }
        assert_eq!(machine.progress_percent(), 100);
    }

    #[test]
    fn test_snapshot_restore() {
        let mut machine = presenting(45);
        let req = match machine.choose(0).unwrap() {
            Advance::Request(req) => req,
            Advance::Finished => panic!("finished early"),
        };
        machine.resolve(req.ticket, sample_step("Step three", 8, 9));

        let snapshot = machine.snapshot().unwrap();
        let mut resumed = StoryMachine::default();
        let profile = resumed.restore(snapshot).unwrap();

        assert_eq!(profile.name(), "Ela");
        assert_eq!(resumed.phase(), Phase::Presenting);
        assert_eq!(resumed.current_step_number(), 3);
        assert_eq!(resumed.visited_steps(), &[1]);
        assert_eq!(resumed.choice_history(), machine.choice_history());
        assert_eq!(resumed.progress_percent(), 5);
    }

    #[test]
    fn test_no_snapshot_while_loading() {
        let mut machine = presenting(45);
        let req = match machine.choose(0).unwrap() {
            Advance::Request(req) => req,
            Advance::Finished => panic!("finished early"),
        };
        assert_eq!(machine.phase(), Phase::Loading);
        assert!(machine.snapshot().is_none());

        machine.resolve(req.ticket, sample_step("Step three", 8, 9));
        let snapshot = machine.snapshot().unwrap();
        assert_eq!(snapshot.current_step_number, 3);
        assert_eq!(snapshot.current_step.text, "Step three");

        let mut resumed = StoryMachine::default();
        resumed.restore(snapshot).unwrap();
        resumed.choose(0).unwrap();
        assert_eq!(resumed.visited_steps(), &[1, 3]);
        assert_eq!(resumed.choice_history(), &["Step one", "Step three"]);
    }

    #[test]
    fn test_restore_rejects_out_of_range_steps() {
        let mut snapshot = presenting(45).snapshot().unwrap();
        snapshot.current_step_number = 0;
        let mut resumed = StoryMachine::default();
        assert!(matches!(
            resumed.restore(snapshot.clone()),
            Err(MachineError::InvalidSnapshot(_))
        ));
        assert_eq!(resumed.phase(), Phase::Idle);

        snapshot.current_step_number = 21;
        assert!(matches!(
            resumed.restore(snapshot.clone()),
            Err(MachineError::InvalidSnapshot(_))
        ));

        snapshot.current_step_number = 1;
        snapshot.visited_steps = vec![99, 200];
        assert!(matches!(
            resumed.restore(snapshot),
            Err(MachineError::InvalidSnapshot(_))
        ));
        assert_eq!(resumed.progress_percent(), 0);
        assert!(resumed.profile().is_none());
    }

    #[test]
    fn test_visited_steps_keep_first_order() {
        let visited: VisitedSteps = [4, 2, 4, 9, 2].into_iter().collect();
        assert_eq!(visited.as_slice(), &[4, 2, 9]);
        assert!(visited.contains(9));
        assert_eq!(visited.len(), 3);
    }
}
