//! Achievement progress.

use crate::store::{KeyValueStore, StoreError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

/// Store key holding achievement progress.
pub const ACHIEVEMENTS_KEY: &str = "achievements";

#[derive(Debug, Error)]
pub enum AchievementError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AchievementId {
    FirstStory,
    StoryMaster,
    ThemeExplorer,
    LongStory,
    CreativeMind,
}

impl AchievementId {
    pub const ALL: [AchievementId; 5] = [
        AchievementId::FirstStory,
        AchievementId::StoryMaster,
        AchievementId::ThemeExplorer,
        AchievementId::LongStory,
        AchievementId::CreativeMind,
    ];

    /// Progress needed to unlock.
    pub fn target(&self) -> u32 {
        match self {
            AchievementId::FirstStory => 1,
            AchievementId::StoryMaster => 10,
            AchievementId::ThemeExplorer => 5,
            AchievementId::LongStory => 1,
            AchievementId::CreativeMind => 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Achievement {
    pub id: AchievementId,
    pub progress: u32,
    #[serde(rename = "maxProgress")]
    pub target: u32,
    pub is_unlocked: bool,
}

impl Achievement {
    pub fn new(id: AchievementId) -> Self {
        Self {
            id,
            progress: 0,
            target: id.target(),
            is_unlocked: false,
        }
    }

    /// Add progress, capped at the target. Returns true if this unlocked it.
    pub fn record(&mut self, amount: u32) -> bool {
        let was_unlocked = self.is_unlocked;
        self.progress = self.progress.saturating_add(amount).min(self.target);
        self.is_unlocked = self.progress >= self.target;
        self.is_unlocked && !was_unlocked
    }
}

/// All achievements, persisted in a store.
pub struct Achievements {
    store: Arc<dyn KeyValueStore>,
    items: Vec<Achievement>,
}

impl Achievements {
    /// Load stored progress. Achievements missing from the store start at zero.
    pub async fn load(store: Arc<dyn KeyValueStore>) -> Result<Self, AchievementError> {
        let stored: Vec<Achievement> = match store.get(ACHIEVEMENTS_KEY).await? {
            Some(content) => serde_json::from_str(&content)?,
            None => Vec::new(),
        };
        let items = AchievementId::ALL
            .iter()
            .map(|id| {
                stored
                    .iter()
                    .find(|a| a.id == *id)
                    .cloned()
                    .unwrap_or_else(|| Achievement::new(*id))
            })
            .collect();
        Ok(Self { store, items })
    }

    pub fn all(&self) -> &[Achievement] {
        &self.items
    }

    pub fn get(&self, id: AchievementId) -> Option<&Achievement> {
        self.items.iter().find(|a| a.id == id)
    }

    /// Add progress to `id` and persist. Returns true if it just unlocked.
    pub async fn record(&mut self, id: AchievementId, amount: u32) -> Result<bool, AchievementError> {
        let unlocked = self
            .items
            .iter_mut()
            .find(|a| a.id == id)
            .map(|a| a.record(amount))
            .unwrap_or(false);
        if unlocked {
            tracing::info!(achievement = ?id, "achievement unlocked");
        }
        let content = serde_json::to_string(&self.items)?;
        self.store.set(ACHIEVEMENTS_KEY, content).await?;
        Ok(unlocked)
    }
}
