//! Supported story languages and the few strings the engine itself needs.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("Unsupported language: {0}")]
pub struct UnsupportedLocale(pub String);

/// Language a story is told in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    Tr,
    En,
}

impl Locale {
    pub fn code(&self) -> &'static str {
        match self {
            Locale::Tr => "tr",
            Locale::En => "en",
        }
    }

    /// Narrative shown when a step could not be generated.
    pub fn apology(&self) -> &'static str {
        match self {
            Locale::Tr => "Üzgünüm, bir hata oluştu. Lütfen tekrar deneyin.",
            Locale::En => "Sorry, an error occurred. Please try again.",
        }
    }

    pub fn start_over(&self) -> &'static str {
        match self {
            Locale::Tr => "Başa Dön",
            Locale::En => "Start Over",
        }
    }

    pub fn try_again(&self) -> &'static str {
        match self {
            Locale::Tr => "Tekrar Dene",
            Locale::En => "Try Again",
        }
    }

    /// Book title for a child's story.
    pub fn story_title(&self, name: &str) -> String {
        match self {
            Locale::Tr => format!("{name}'nin Büyük Macerası"),
            Locale::En => format!("{name}'s Big Adventure"),
        }
    }

    /// Word used in exported file names.
    pub fn story_file_word(&self) -> &'static str {
        match self {
            Locale::Tr => "hikaye",
            Locale::En => "story",
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Locale {
    type Err = UnsupportedLocale;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tr" => Ok(Locale::Tr),
            "en" => Ok(Locale::En),
            other => Err(UnsupportedLocale(other.to_string())),
        }
    }
}
