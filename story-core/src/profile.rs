//! The child's profile: name, age and story theme.
//!
//! A profile is validated once, when the form is submitted, and never
//! changes for the lifetime of a story session.

use crate::locale::Locale;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Shortest accepted name, in characters.
pub const MIN_NAME_CHARS: usize = 2;

/// Youngest supported reader.
pub const MIN_AGE: u8 = 1;

/// Oldest supported reader.
pub const MAX_AGE: u8 = 12;

/// Errors from profile validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Name must be at least {min} characters")]
    NameTooShort { min: usize },

    #[error("Age must be between 1 and 12, got {0}")]
    AgeOutOfRange(i64),

    #[error("Age is not a number: {0}")]
    AgeNotNumeric(String),

    #[error("Unknown theme: {0}")]
    UnknownTheme(String),
}

/// Story themes offered on the form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Theme {
    #[default]
    Adventure,
    Space,
    Nature,
    Fantasy,
    Ocean,
    Sports,
    Football,
    Basketball,
    Videogames,
    Science,
    History,
    Music,
    Art,
    Cooking,
    Animals,
    Dinosaurs,
    Superheroes,
    Magic,
    Pirates,
    Robots,
    TimeTravel,
    Mythology,
    Detective,
    Circus,
    Jungle,
    Arctic,
    Desert,
    Mountains,
    Farm,
    School,
}

impl Theme {
    pub const ALL: [Theme; 30] = [
        Theme::Adventure,
        Theme::Space,
        Theme::Nature,
        Theme::Fantasy,
        Theme::Ocean,
        Theme::Sports,
        Theme::Football,
        Theme::Basketball,
        Theme::Videogames,
        Theme::Science,
        Theme::History,
        Theme::Music,
        Theme::Art,
        Theme::Cooking,
        Theme::Animals,
        Theme::Dinosaurs,
        Theme::Superheroes,
        Theme::Magic,
        Theme::Pirates,
        Theme::Robots,
        Theme::TimeTravel,
        Theme::Mythology,
        Theme::Detective,
        Theme::Circus,
        Theme::Jungle,
        Theme::Arctic,
        Theme::Desert,
        Theme::Mountains,
        Theme::Farm,
        Theme::School,
    ];

    /// Stable key used on the wire and in storage.
    pub fn key(&self) -> &'static str {
        match self {
            Theme::Adventure => "adventure",
            Theme::Space => "space",
            Theme::Nature => "nature",
            Theme::Fantasy => "fantasy",
            Theme::Ocean => "ocean",
            Theme::Sports => "sports",
            Theme::Football => "football",
            Theme::Basketball => "basketball",
            Theme::Videogames => "videogames",
            Theme::Science => "science",
            Theme::History => "history",
            Theme::Music => "music",
            Theme::Art => "art",
            Theme::Cooking => "cooking",
            Theme::Animals => "animals",
            Theme::Dinosaurs => "dinosaurs",
            Theme::Superheroes => "superheroes",
            Theme::Magic => "magic",
            Theme::Pirates => "pirates",
            Theme::Robots => "robots",
            Theme::TimeTravel => "time_travel",
            Theme::Mythology => "mythology",
            Theme::Detective => "detective",
            Theme::Circus => "circus",
            Theme::Jungle => "jungle",
            Theme::Arctic => "arctic",
            Theme::Desert => "desert",
            Theme::Mountains => "mountains",
            Theme::Farm => "farm",
            Theme::School => "school",
        }
    }

    /// Human-readable theme name, used inside prompts.
    pub fn label(&self, locale: Locale) -> &'static str {
        match locale {
            Locale::En => match self {
                Theme::Adventure => "Adventure",
                Theme::Space => "Space",
                Theme::Nature => "Nature",
                Theme::Fantasy => "Fantasy",
                Theme::Ocean => "Ocean",
                Theme::Sports => "Sports",
                Theme::Football => "Football",
                Theme::Basketball => "Basketball",
                Theme::Videogames => "Video Games",
                Theme::Science => "Science",
                Theme::History => "History",
                Theme::Music => "Music",
                Theme::Art => "Art",
                Theme::Cooking => "Cooking",
                Theme::Animals => "Animals",
                Theme::Dinosaurs => "Dinosaurs",
                Theme::Superheroes => "Superheroes",
                Theme::Magic => "Magic",
                Theme::Pirates => "Pirates",
                Theme::Robots => "Robots",
                Theme::TimeTravel => "Time Travel",
                Theme::Mythology => "Mythology",
                Theme::Detective => "Detective",
                Theme::Circus => "Circus",
                Theme::Jungle => "Jungle",
                Theme::Arctic => "Arctic",
                Theme::Desert => "Desert",
                Theme::Mountains => "Mountains",
                Theme::Farm => "Farm",
                Theme::School => "School",
            },
            Locale::Tr => match self {
                Theme::Adventure => "Macera",
                Theme::Space => "Uzay",
                Theme::Nature => "Doğa",
                Theme::Fantasy => "Fantastik",
                Theme::Ocean => "Okyanus",
                Theme::Sports => "Spor",
                Theme::Football => "Futbol",
                Theme::Basketball => "Basketbol",
                Theme::Videogames => "Bilgisayar Oyunları",
                Theme::Science => "Bilim",
                Theme::History => "Tarih",
                Theme::Music => "Müzik",
                Theme::Art => "Sanat",
                Theme::Cooking => "Yemek",
                Theme::Animals => "Hayvanlar",
                Theme::Dinosaurs => "Dinozorlar",
                Theme::Superheroes => "Süper Kahramanlar",
                Theme::Magic => "Sihir",
                Theme::Pirates => "Korsanlar",
                Theme::Robots => "Robotlar",
                Theme::TimeTravel => "Zaman Yolculuğu",
                Theme::Mythology => "Mitoloji",
                Theme::Detective => "Dedektiflik",
                Theme::Circus => "Sirk",
                Theme::Jungle => "Orman",
                Theme::Arctic => "Kutup",
                Theme::Desert => "Çöl",
                Theme::Mountains => "Dağlar",
                Theme::Farm => "Çiftlik",
                Theme::School => "Okul",
            },
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Theme {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim();
        Theme::ALL
            .iter()
            .copied()
            .find(|t| t.key() == key)
            .ok_or_else(|| ValidationError::UnknownTheme(key.to_string()))
    }
}

/// Reading level derived from the child's age.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgeBand {
    /// Ages 1-6.
    Early,
    /// Ages 7-9.
    Middle,
    /// Ages 10-12.
    Late,
}

impl AgeBand {
    pub fn from_age(age: u8) -> Self {
        match age {
            0..=6 => AgeBand::Early,
            7..=9 => AgeBand::Middle,
            _ => AgeBand::Late,
        }
    }

    /// Inclusive age range of the band.
    pub fn range(&self) -> (u8, u8) {
        match self {
            AgeBand::Early => (1, 6),
            AgeBand::Middle => (7, 9),
            AgeBand::Late => (10, 12),
        }
    }

    /// How the narrator should write for this band.
    pub fn register(&self, locale: Locale) -> &'static str {
        match (self, locale) {
            (AgeBand::Early, Locale::En) => "very simple, short sentences and concrete ideas",
            (AgeBand::Middle, Locale::En) => {
                "slightly longer sentences and a few simple abstract ideas"
            }
            (AgeBand::Late, Locale::En) => "a richer vocabulary and abstract ideas",
            (AgeBand::Early, Locale::Tr) => "çok basit, kısa cümleler ve somut kavramlar",
            (AgeBand::Middle, Locale::Tr) => {
                "biraz daha uzun cümleler ve birkaç basit soyut kavram"
            }
            (AgeBand::Late, Locale::Tr) => "daha zengin bir kelime hazinesi ve soyut kavramlar",
        }
    }
}

/// A validated reader profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "UserInfo", into = "UserInfo")]
pub struct UserProfile {
    name: String,
    age: u8,
    theme: Theme,
}

impl UserProfile {
    /// Validate and build a profile.
    pub fn new(name: impl Into<String>, age: i64, theme: Theme) -> Result<Self, ValidationError> {
        let name = name.into().trim().to_string();
        if name.chars().count() < MIN_NAME_CHARS {
            return Err(ValidationError::NameTooShort {
                min: MIN_NAME_CHARS,
            });
        }

        if age < MIN_AGE as i64 || age > MAX_AGE as i64 {
            return Err(ValidationError::AgeOutOfRange(age));
        }

        Ok(Self {
            name,
            age: age as u8,
            theme,
        })
    }

    /// Validate raw form fields, the way they arrive from a text form.
    pub fn from_form(name: &str, age: &str, theme: &str) -> Result<Self, ValidationError> {
        let age: i64 = age
            .trim()
            .parse()
            .map_err(|_| ValidationError::AgeNotNumeric(age.trim().to_string()))?;
        let theme: Theme = theme.parse()?;
        Self::new(name, age, theme)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn age(&self) -> u8 {
        self.age
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    pub fn age_band(&self) -> AgeBand {
        AgeBand::from_age(self.age)
    }
}

/// Unvalidated profile as it travels on the wire (`userInfo`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    pub name: String,
    pub age: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme: Option<String>,
}

impl TryFrom<UserInfo> for UserProfile {
    type Error = ValidationError;

    fn try_from(info: UserInfo) -> Result<Self, Self::Error> {
        let theme = match info.theme.as_deref() {
            Some(key) => key.parse()?,
            None => Theme::default(),
        };
        UserProfile::new(info.name, info.age, theme)
    }
}

impl From<UserProfile> for UserInfo {
    fn from(profile: UserProfile) -> Self {
        Self {
            name: profile.name,
            age: profile.age as i64,
            theme: Some(profile.theme.key().to_string()),
        }
    }
}

impl From<&UserProfile> for UserInfo {
    fn from(profile: &UserProfile) -> Self {
        profile.clone().into()
    }
}
