//! Interactive children's story engine with an AI storyteller.
//!
//! This crate provides:
//! - Age-aware prompt construction in Turkish and English
//! - Strict validation of generated story steps, with a fallback step
//! - A sans-IO story state machine with progress and a countdown
//! - Saved stories, parental settings and achievements over a key-value store
//!
//! # Quick Start
//!
//! ```ignore
//! use story_core::{ChatBoundary, StoryConfig, StorySession, Theme, Turn, UserProfile};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let profile = UserProfile::new("Ela", 7, Theme::Space)?;
//!     let config = StoryConfig::new();
//!     let boundary = Arc::new(ChatBoundary::from_env()?);
//!
//!     let mut session = StorySession::with_boundary(profile, boundary, &config);
//!     let step = session.begin().await?;
//!     println!("{}", step.text);
//!
//!     if let Turn::Step(next) = session.choose(0).await? {
//!         println!("{}", next.text);
//!     }
//!     Ok(())
//! }
//! ```

pub mod achievements;
pub mod config;
pub mod export;
pub mod generation;
pub mod locale;
pub mod machine;
pub mod persist;
pub mod profile;
pub mod prompt;
pub mod session;
pub mod settings;
pub mod step;
pub mod store;
pub mod testing;

// Primary public API
pub use config::StoryConfig;
pub use generation::{
    ChatBoundary, GenerationBoundary, GenerationError, GenerationRequest, HttpBoundary, StepClient,
};
pub use locale::Locale;
pub use machine::{progress_percent, Advance, Phase, StoryMachine, Tick};
pub use persist::{SavedStories, StorySnapshot};
pub use profile::{AgeBand, Theme, UserInfo, UserProfile, ValidationError};
pub use session::{SessionError, StorySession, Turn};
pub use step::{Animation, Choice, StoryStep};
pub use store::{FileStore, KeyValueStore, MemoryStore};
pub use testing::{MockReply, ScriptedBoundary, TestHarness};
