//! Parental settings behind a four digit PIN.
//!
//! Settings are stored under the `parentalSettings` key and can only be
//! changed after [`ParentalControls::unlock`] succeeds. Sessions do not read
//! them yet; a host decides how to apply the limits.

use crate::store::{KeyValueStore, StoreError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

/// Store key holding the settings.
pub const PARENTAL_SETTINGS_KEY: &str = "parentalSettings";

pub const MIN_DURATION_MINUTES: u32 = 5;
pub const MAX_DURATION_MINUTES: u32 = 60;

/// Errors from the parental settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("PIN must be exactly four digits")]
    InvalidPin,

    #[error("Duration must be between 5 and 60 minutes, got {0}")]
    DurationOutOfRange(u32),

    #[error("Settings are locked")]
    Locked,

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A four digit parental PIN.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Pin(String);

impl Pin {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Pin {
    fn default() -> Self {
        Self("0000".to_string())
    }
}

// Never print the digits.
impl fmt::Debug for Pin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Pin(****)")
    }
}

impl FromStr for Pin {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() == 4 && s.chars().all(|c| c.is_ascii_digit()) {
            Ok(Self(s.to_string()))
        } else {
            Err(SettingsError::InvalidPin)
        }
    }
}

impl TryFrom<String> for Pin {
    type Error = SettingsError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Pin> for String {
    fn from(pin: Pin) -> Self {
        pin.0
    }
}

/// What a parent allows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParentalSettings {
    #[serde(rename = "maxDuration")]
    pub max_duration_minutes: u32,
    pub allow_sound_effects: bool,
    pub allow_saving: bool,
    pub allow_theme_change: bool,
    #[serde(rename = "parentalPin")]
    pub pin: Pin,
}

impl Default for ParentalSettings {
    fn default() -> Self {
        Self {
            max_duration_minutes: 30,
            allow_sound_effects: true,
            allow_saving: true,
            allow_theme_change: true,
            pin: Pin::default(),
        }
    }
}

impl ParentalSettings {
    pub fn validate(&self) -> Result<(), SettingsError> {
        if !(MIN_DURATION_MINUTES..=MAX_DURATION_MINUTES).contains(&self.max_duration_minutes) {
            return Err(SettingsError::DurationOutOfRange(self.max_duration_minutes));
        }
        Ok(())
    }
}

/// Loads, guards and stores [`ParentalSettings`].
pub struct ParentalControls {
    store: Arc<dyn KeyValueStore>,
    settings: ParentalSettings,
    unlocked: bool,
}

impl ParentalControls {
    /// Load the stored settings, or the defaults when none are stored.
    pub async fn load(store: Arc<dyn KeyValueStore>) -> Result<Self, SettingsError> {
        let settings = match store.get(PARENTAL_SETTINGS_KEY).await? {
            Some(content) => serde_json::from_str(&content)?,
            None => ParentalSettings::default(),
        };
        Ok(Self {
            store,
            settings,
            unlocked: false,
        })
    }

    pub fn settings(&self) -> &ParentalSettings {
        &self.settings
    }

    pub fn is_unlocked(&self) -> bool {
        self.unlocked
    }

    /// Unlock with `pin`. Returns whether it matched.
    pub fn unlock(&mut self, pin: &str) -> bool {
        self.unlocked = self.settings.pin.as_str() == pin;
        if !self.unlocked {
            tracing::debug!("parental PIN rejected");
        }
        self.unlocked
    }

    pub fn lock(&mut self) {
        self.unlocked = false;
    }

    /// Replace the settings. Requires an unlocked panel.
    pub async fn update(&mut self, settings: ParentalSettings) -> Result<(), SettingsError> {
        if !self.unlocked {
            return Err(SettingsError::Locked);
        }
        settings.validate()?;
        self.settings = settings;
        self.save().await
    }

    /// Set a new PIN. Requires an unlocked panel.
    pub async fn change_pin(&mut self, pin: &str) -> Result<(), SettingsError> {
        if !self.unlocked {
            return Err(SettingsError::Locked);
        }
        self.settings.pin = pin.parse()?;
        self.save().await
    }

    async fn save(&self) -> Result<(), SettingsError> {
        let content = serde_json::to_string(&self.settings)?;
        self.store.set(PARENTAL_SETTINGS_KEY, content).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn test_pin_validation() {
        assert!("1234".parse::<Pin>().is_ok());
        assert!("123".parse::<Pin>().is_err());
        assert!("12345".parse::<Pin>().is_err());
        assert!("12a4".parse::<Pin>().is_err());
        assert!("١٢٣٤".parse::<Pin>().is_err());
        assert_eq!(format!("{:?}", Pin::default()), "Pin(****)");
    }

    #[test]
    fn test_wire_names() {
        let json = serde_json::to_value(ParentalSettings::default()).unwrap();
        assert_eq!(json["maxDuration"], 30);
        assert_eq!(json["allowSoundEffects"], true);
        assert_eq!(json["allowThemeChange"], true);
        assert_eq!(json["parentalPin"], "0000");
    }

    #[tokio::test]
    async fn test_defaults_when_missing() {
        let controls = ParentalControls::load(Arc::new(MemoryStore::new()))
            .await
            .unwrap();
        assert_eq!(controls.settings(), &ParentalSettings::default());
        assert!(!controls.is_unlocked());
    }

    #[tokio::test]
    async fn test_update_requires_unlock() {
        let store = Arc::new(MemoryStore::new());
        let mut controls = ParentalControls::load(store.clone()).await.unwrap();
        let changed = ParentalSettings {
            allow_saving: false,
            ..ParentalSettings::default()
        };

        assert!(matches!(
            controls.update(changed.clone()).await,
            Err(SettingsError::Locked)
        ));
        assert!(!controls.unlock("9999"));
        assert!(controls.unlock("0000"));
        controls.update(changed).await.unwrap();

        let reloaded = ParentalControls::load(store).await.unwrap();
        assert!(!reloaded.settings().allow_saving);
    }

    #[tokio::test]
    async fn test_duration_bounds() {
        let mut controls = ParentalControls::load(Arc::new(MemoryStore::new()))
            .await
            .unwrap();
        controls.unlock("0000");
        let too_long = ParentalSettings {
            max_duration_minutes: 61,
            ..ParentalSettings::default()
        };
        assert!(matches!(
            controls.update(too_long).await,
            Err(SettingsError::DurationOutOfRange(61))
        ));
    }

    #[tokio::test]
    async fn test_change_pin() {
        let store = Arc::new(MemoryStore::new());
        let mut controls = ParentalControls::load(store.clone()).await.unwrap();
        controls.unlock("0000");
        assert!(matches!(
            controls.change_pin("12").await,
            Err(SettingsError::InvalidPin)
        ));
        controls.change_pin("4321").await.unwrap();
        controls.lock();

        let mut reloaded = ParentalControls::load(store).await.unwrap();
        assert!(!reloaded.unlock("0000"));
        assert!(reloaded.unlock("4321"));
    }
}
