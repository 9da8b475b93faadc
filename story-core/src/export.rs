//! Exporting a finished or in-progress story as a document.

use crate::locale::Locale;
use crate::profile::UserProfile;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Nothing to export")]
    Empty,

    #[error("Render failed: {0}")]
    Render(String),
}

/// Turns a title and ordered paragraphs into document bytes.
pub trait DocumentRenderer {
    /// File extension without the dot.
    fn extension(&self) -> &'static str;

    fn render(&self, title: &str, texts: &[String]) -> Result<Vec<u8>, ExportError>;
}

/// Plain UTF-8 text: the title, then numbered paragraphs.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextRenderer;

impl DocumentRenderer for TextRenderer {
    fn extension(&self) -> &'static str {
        "txt"
    }

    fn render(&self, title: &str, texts: &[String]) -> Result<Vec<u8>, ExportError> {
        if texts.is_empty() {
            return Err(ExportError::Empty);
        }

        let mut doc = String::new();
        doc.push_str(title);
        doc.push_str("\n\n");
        let body = texts
            .iter()
            .enumerate()
            .map(|(i, text)| format!("{}. {}", i + 1, text))
            .collect::<Vec<_>>()
            .join("\n\n");
        doc.push_str(&body);
        doc.push('\n');
        Ok(doc.into_bytes())
    }
}

/// A story ready to be rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoryExport {
    pub name: String,
    pub title: String,
    pub texts: Vec<String>,
    pub locale: Locale,
}

impl StoryExport {
    pub fn new(profile: &UserProfile, texts: Vec<String>, locale: Locale) -> Self {
        Self {
            name: profile.name().to_string(),
            title: locale.story_title(profile.name()),
            texts,
            locale,
        }
    }

    pub fn render(&self, renderer: &dyn DocumentRenderer) -> Result<Vec<u8>, ExportError> {
        renderer.render(&self.title, &self.texts)
    }

    /// File name for the export, e.g. `Ela_story_2024-05-01.txt`.
    pub fn file_name(&self, renderer: &dyn DocumentRenderer, date: &str) -> String {
        let sanitized = self
            .name
            .chars()
            .map(|c| if c.is_alphanumeric() { c } else { '_' })
            .collect::<String>();
        format!(
            "{sanitized}_{}_{date}.{}",
            self.locale.story_file_word(),
            renderer.extension()
        )
    }
}
