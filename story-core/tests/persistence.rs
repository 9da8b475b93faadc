//! Save/resume tests against the file-backed store.
//!
//! Run with: `cargo test -p story-core --test persistence`

use story_core::generation::StepClient;
use story_core::persist::SavedStories;
use story_core::settings::{ParentalControls, ParentalSettings};
use story_core::store::{FileStore, KeyValueStore};
use story_core::testing::{ScriptedBoundary, TestHarness};
use story_core::{Locale, Phase, StoryConfig, StorySession, Turn};
use std::sync::Arc;
use tempfile::TempDir;

#[tokio::test]
async fn test_save_and_resume_from_disk() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let store = Arc::new(FileStore::new(temp_dir.path()));
    let saved = SavedStories::new(store.clone());

    let mut harness = TestHarness::new();
    harness.expect_step("Ela found a map.", 4, 6).expect_step("The map glowed.", 7, 8);
    harness.session.begin().await.unwrap();
    harness.session.choose(0).await.unwrap();
    harness.session.save(&saved).await.expect("save should succeed");

    assert!(store.path_for("savedStories").exists());

    let config = StoryConfig::new().with_locale(Locale::En);
    let boundary = Arc::new(ScriptedBoundary::default());
    let mut resumed = StorySession::resume(&saved, "Ela", StepClient::new(boundary.clone()), &config)
        .await
        .expect("load should succeed")
        .expect("a saved story");

    assert_eq!(resumed.phase(), Phase::Presenting);
    assert_eq!(resumed.profile().name(), "Ela");
    assert_eq!(resumed.current_step_number(), 4);
    assert_eq!(resumed.current_step().unwrap().text, "The map glowed.");
    assert_eq!(resumed.visited_steps(), &[1]);
    assert_eq!(resumed.progress_percent(), 5);

    // The resumed story continues where it left off.
    let turn = resumed.choose(1).await.unwrap();
    assert!(matches!(turn, Turn::Step(_)));
    let request = boundary.last_request().unwrap();
    assert_eq!(request.current_step, 8);
    assert_eq!(
        request.previous_choices,
        vec!["Ela found a map.", "The map glowed."]
    );
    assert_eq!(request.visited_steps, vec![1, 4]);
}

#[tokio::test]
async fn test_resume_without_save_is_none() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let saved = SavedStories::new(Arc::new(FileStore::new(temp_dir.path())));
    let client = StepClient::new(Arc::new(ScriptedBoundary::default()));

    let resumed = StorySession::resume(&saved, "Nobody", client, &StoryConfig::new())
        .await
        .unwrap();
    assert!(resumed.is_none());
}

#[tokio::test]
async fn test_file_store_missing_key() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let store = FileStore::new(temp_dir.path().join("not-created-yet"));

    assert_eq!(store.get("anything").await.unwrap(), None);
    store.delete("anything").await.unwrap();
    store.set("anything", "{}".to_string()).await.unwrap();
    assert_eq!(store.get("anything").await.unwrap().as_deref(), Some("{}"));
}

#[tokio::test]
async fn test_parental_settings_survive_reload() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let store: Arc<dyn KeyValueStore> = Arc::new(FileStore::new(temp_dir.path()));

    let mut controls = ParentalControls::load(store.clone()).await.unwrap();
    assert!(controls.unlock("0000"));
    controls
        .update(ParentalSettings {
            max_duration_minutes: 15,
            allow_sound_effects: false,
            ..ParentalSettings::default()
        })
        .await
        .unwrap();

    let reloaded = ParentalControls::load(store).await.unwrap();
    assert_eq!(reloaded.settings().max_duration_minutes, 15);
    assert!(!reloaded.settings().allow_sound_effects);
    assert!(!reloaded.is_unlocked());
}
