//! Saved stories.
//!
//! Every saved story lives in one map under the `savedStories` key of a
//! [`KeyValueStore`], keyed by the reader's name. Saving again under the
//! same name replaces the earlier save.

use crate::machine::progress_percent;
use crate::profile::{UserInfo, UserProfile, ValidationError};
use crate::step::StoryStep;
use crate::store::{KeyValueStore, StoreError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

/// Store key holding the saved story map.
pub const SAVED_STORIES_KEY: &str = "savedStories";

/// Current save format version.
const SAVE_VERSION: u32 = 1;

/// Errors from persistence operations.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: u32, found: u32 },
}

/// Everything needed to continue a story later.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorySnapshot {
    /// Save format version for compatibility checking.
    pub version: u32,

    /// When the save was created.
    pub saved_at: String,

    pub user_info: UserInfo,

    /// Number of the presented step.
    pub current_step_number: u8,

    pub current_step: StoryStep,

    pub visited_steps: Vec<u8>,

    /// Narrative of each completed step, oldest first.
    pub choice_history: Vec<String>,

    pub progress_percent: u8,
}

impl StorySnapshot {
    pub fn new(
        profile: &UserProfile,
        current_step_number: u8,
        current_step: StoryStep,
        visited_steps: Vec<u8>,
        choice_history: Vec<String>,
    ) -> Self {
        Self {
            version: SAVE_VERSION,
            saved_at: chrono_now(),
            user_info: profile.into(),
            current_step_number,
            current_step,
            progress_percent: progress_percent(visited_steps.len()),
            visited_steps,
            choice_history,
        }
    }

    /// The saved reader profile, revalidated.
    pub fn profile(&self) -> Result<UserProfile, ValidationError> {
        self.user_info.clone().try_into()
    }

    fn check_version(&self) -> Result<(), PersistError> {
        if self.version != SAVE_VERSION {
            return Err(PersistError::VersionMismatch {
                expected: SAVE_VERSION,
                found: self.version,
            });
        }
        Ok(())
    }
}

/// Saved stories keyed by reader name.
#[derive(Clone)]
pub struct SavedStories {
    store: Arc<dyn KeyValueStore>,
}

impl SavedStories {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Save (or replace) the story stored under `name`.
    pub async fn save(&self, name: &str, snapshot: StorySnapshot) -> Result<(), PersistError> {
        let mut stories = self.read_all().await?;
        stories.insert(name.to_string(), snapshot);
        self.write_all(&stories).await?;
        tracing::debug!(reader = name, count = stories.len(), "story saved");
        Ok(())
    }

    /// Load the story saved under `name`. A missing save is `Ok(None)`.
    pub async fn load(&self, name: &str) -> Result<Option<StorySnapshot>, PersistError> {
        let Some(snapshot) = self.read_all().await?.remove(name) else {
            tracing::debug!(reader = name, "no saved story");
            return Ok(None);
        };
        snapshot.check_version()?;
        Ok(Some(snapshot))
    }

    /// Names with a saved story, sorted.
    pub async fn list(&self) -> Result<Vec<String>, PersistError> {
        Ok(self.read_all().await?.into_keys().collect())
    }

    /// Remove a save. Returns whether one existed.
    pub async fn delete(&self, name: &str) -> Result<bool, PersistError> {
        let mut stories = self.read_all().await?;
        if stories.remove(name).is_none() {
            return Ok(false);
        }
        self.write_all(&stories).await?;
        Ok(true)
    }

    async fn read_all(&self) -> Result<BTreeMap<String, StorySnapshot>, PersistError> {
        match self.store.get(SAVED_STORIES_KEY).await? {
            Some(content) => Ok(serde_json::from_str(&content)?),
            None => Ok(BTreeMap::new()),
        }
    }

    async fn write_all(&self, stories: &BTreeMap<String, StorySnapshot>) -> Result<(), PersistError> {
        let content = serde_json::to_string_pretty(stories)?;
        self.store.set(SAVED_STORIES_KEY, content).await?;
        Ok(())
    }
}

/// Get current timestamp as seconds since the Unix epoch.
pub(crate) fn chrono_now() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};

    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();

    format!("{}", now.as_secs())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::Theme;
    use crate::store::MemoryStore;
    use crate::testing::sample_step;

    fn snapshot(name: &str) -> StorySnapshot {
        let profile = UserProfile::new(name, 7, Theme::Space).unwrap();
        StorySnapshot::new(
            &profile,
            3,
            sample_step("Step three", 4, 5),
            vec![1],
            vec!["Step one".to_string()],
        )
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let saved = SavedStories::new(Arc::new(MemoryStore::new()));
        saved.save("Ela", snapshot("Ela")).await.unwrap();

        let loaded = saved.load("Ela").await.unwrap().unwrap();
        assert_eq!(loaded.current_step_number, 3);
        assert_eq!(loaded.progress_percent, 5);
        assert_eq!(loaded.profile().unwrap().name(), "Ela");
    }

    #[tokio::test]
    async fn test_missing_save_is_none() {
        let saved = SavedStories::new(Arc::new(MemoryStore::new()));
        assert!(saved.load("Nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_and_delete() {
        let saved = SavedStories::new(Arc::new(MemoryStore::new()));
        saved.save("Mert", snapshot("Mert")).await.unwrap();
        saved.save("Ela", snapshot("Ela")).await.unwrap();
        assert_eq!(saved.list().await.unwrap(), vec!["Ela", "Mert"]);

        assert!(saved.delete("Ela").await.unwrap());
        assert!(!saved.delete("Ela").await.unwrap());
        assert_eq!(saved.list().await.unwrap(), vec!["Mert"]);
    }

    #[tokio::test]
    async fn test_version_mismatch() {
        let store = Arc::new(MemoryStore::new());
        let saved = SavedStories::new(store.clone());
        let mut old = snapshot("Ela");
        old.version = 99;
        saved.save("Ela", old).await.unwrap();

        assert!(matches!(
            saved.load("Ela").await,
            Err(PersistError::VersionMismatch { expected: 1, found: 99 })
        ));
    }

    #[tokio::test]
    async fn test_corrupt_map_is_json_error() {
        let store = Arc::new(MemoryStore::new());
        store
            .set(SAVED_STORIES_KEY, "not json".to_string())
            .await
            .unwrap();
        let saved = SavedStories::new(store);
        assert!(matches!(saved.load("Ela").await, Err(PersistError::Json(_))));
    }

    #[test]
    fn test_snapshot_wire_names() {
        let json = serde_json::to_value(snapshot("Ela")).unwrap();
        assert_eq!(json["userInfo"]["name"], "Ela");
        assert_eq!(json["currentStepNumber"], 3);
        assert_eq!(json["visitedSteps"][0], 1);
        assert_eq!(json["progressPercent"], 5);
    }
}
