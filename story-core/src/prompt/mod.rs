//! Prompt construction for the storyteller model.
//!
//! Builds the system and user prompts for one story step from the reader's
//! profile, the step being requested, the choice history and the steps
//! already visited. Pure: the same input always yields the same prompts.

use crate::locale::Locale;
use crate::profile::UserProfile;
use crate::step::{is_story_step, Animation, STORY_LENGTH};
use thiserror::Error;

/// Errors from prompt construction.
#[derive(Debug, Error)]
pub enum PromptError {
    #[error("Step {0} is outside 1..=20")]
    StepOutOfRange(u8),
}

/// Everything a step prompt depends on.
#[derive(Debug, Clone, Copy)]
pub struct PromptInput<'a> {
    pub profile: &'a UserProfile,
    pub current_step: u8,
    pub choice_history: &'a [String],
    pub visited_steps: &'a [u8],
    pub locale: Locale,
}

/// The two prompts sent to the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompts {
    pub system: String,
    pub user: String,
}

/// Steps 1..=20 not yet visited, ascending.
pub fn unvisited_steps(visited: &[u8]) -> Vec<u8> {
    (1..=STORY_LENGTH)
        .filter(|step| !visited.contains(step))
        .collect()
}

/// Build the system and user prompts for one step.
pub fn build_prompts(input: &PromptInput<'_>) -> Result<Prompts, PromptError> {
    if !is_story_step(input.current_step) {
        return Err(PromptError::StepOutOfRange(input.current_step));
    }

    Ok(Prompts {
        system: system_prompt(input.locale).to_string(),
        user: match input.locale {
            Locale::En => user_prompt_en(input),
            Locale::Tr => user_prompt_tr(input),
        },
    })
}

/// Static storyteller instructions for a locale.
pub fn system_prompt(locale: Locale) -> &'static str {
    match locale {
        Locale::En => include_str!("prompts/system_en.txt"),
        Locale::Tr => include_str!("prompts/system_tr.txt"),
    }
}

fn animation_tokens() -> String {
    Animation::ALL
        .iter()
        .map(|a| format!("\"{}\"", a.token()))
        .collect::<Vec<_>>()
        .join(", ")
}

fn step_list(steps: &[u8], none: &str) -> String {
    if steps.is_empty() {
        return none.to_string();
    }
    steps
        .iter()
        .map(|s| s.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

fn user_prompt_en(input: &PromptInput<'_>) -> String {
    let profile = input.profile;
    let theme = profile.theme().label(Locale::En);
    let opening = input.current_step == 1;
    let mut prompt = String::new();

    prompt.push_str(&format!(
        "Create an interactive story for a child named {}, who is {} years old, with a theme of {}.\n\n",
        profile.name(),
        profile.age(),
        theme
    ));
    prompt.push_str(&format!(
        "The story should consist of exactly {STORY_LENGTH} steps, each step representing 5% progress.\n\n"
    ));

    if opening {
        prompt.push_str(&format!(
            "This is the first step. Open the story in the {} theme and let {} make their first decision.\n\n",
            theme,
            profile.name()
        ));
    } else {
        prompt.push_str("## Previous choices\n");
        for (i, choice) in input.choice_history.iter().enumerate() {
            prompt.push_str(&format!("Choice {}: {}\n", i + 1, choice));
        }
        prompt.push('\n');
        if let Some(last) = input.choice_history.last() {
            prompt.push_str(&format!(
                "VERY IMPORTANT: The new step must be a direct consequence of the last choice (\"{last}\"). \
                 Never contradict it or any earlier choice.\n\n"
            ));
        }
    }

    prompt.push_str(&format!("Current step: {}\n", input.current_step));
    prompt.push_str(&format!(
        "Unvisited steps: {}\n\n",
        step_list(&unvisited_steps(input.visited_steps), "none")
    ));

    prompt.push_str("For this step, provide:\n");
    prompt.push_str(&format!(
        "1. A short story text (1-2 paragraphs): {}, written for a {}-year-old with {}.\n",
        if opening {
            "a theme-appropriate opening"
        } else {
            "DIRECTLY connected to the last choice"
        },
        profile.age(),
        profile.age_band().register(Locale::En)
    ));
    prompt.push_str(
        "2. Exactly two different choices that lead to unvisited steps, with no number at the start, \
         each ending with \"I want to...\".\n",
    );
    prompt.push_str(&format!(
        "3. One animation type that fits the scene: {}.\n\n",
        animation_tokens()
    ));

    prompt.push_str("Provide the response as a JSON object with exactly these fields:\n");
    prompt.push_str(
        r#"{
  "text": "story text",
  "choices": [
    {"text": "choice (I want to...)", "nextStep": X},
    {"text": "choice (I want to...)", "nextStep": Y}
  ],
  "animation": "animation_type"
}"#,
    );
    prompt
}

fn user_prompt_tr(input: &PromptInput<'_>) -> String {
    let profile = input.profile;
    let theme = profile.theme().label(Locale::Tr);
    let opening = input.current_step == 1;
    let mut prompt = String::new();

    prompt.push_str(&format!(
        "{} adında {} yaşında bir çocuk için {} temalı interaktif bir hikaye oluştur.\n\n",
        profile.name(),
        profile.age(),
        theme
    ));
    prompt.push_str(&format!(
        "Hikaye tam olarak {STORY_LENGTH} adımdan oluşmalı ve her adım %5 ilerleme sağlamalı.\n\n"
    ));

    if opening {
        prompt.push_str(&format!(
            "Bu ilk adım. Hikayeyi {} temasına uygun şekilde başlat ve {} ilk kararını versin.\n\n",
            theme,
            profile.name()
        ));
    } else {
        prompt.push_str("## Önceki seçimler\n");
        for (i, choice) in input.choice_history.iter().enumerate() {
            prompt.push_str(&format!("{}. Seçim: {}\n", i + 1, choice));
        }
        prompt.push('\n');
        if let Some(last) = input.choice_history.last() {
            prompt.push_str(&format!(
                "ÇOK ÖNEMLİ: Yeni adım son seçimin (\"{last}\") doğrudan bir sonucu olmalı. \
                 Bu seçimle ya da önceki herhangi bir seçimle asla çelişme.\n\n"
            ));
        }
    }

    prompt.push_str(&format!("Şu anki adım: {}\n", input.current_step));
    prompt.push_str(&format!(
        "Ziyaret edilmemiş adımlar: {}\n\n",
        step_list(&unvisited_steps(input.visited_steps), "yok")
    ));

    prompt.push_str("Bu adım için şunları ver:\n");
    prompt.push_str(&format!(
        "1. Kısa bir hikaye metni (1-2 paragraf): {}; {} yaşındaki bir çocuk için {} kullan.\n",
        if opening {
            "temaya uygun bir başlangıç"
        } else {
            "son seçimle DOĞRUDAN bağlantılı olmalı"
        },
        profile.age(),
        profile.age_band().register(Locale::Tr)
    ));
    prompt.push_str(
        "2. Ziyaret edilmemiş adımlara yönlendiren, başında numara olmayan ve \
         \"...-mak/-mek istiyorum\" ile biten tam olarak iki farklı seçenek.\n",
    );
    prompt.push_str(&format!(
        "3. Sahneye uygun bir animasyon tipi: {}.\n\n",
        animation_tokens()
    ));

    prompt.push_str("Yanıtı tam olarak şu alanlara sahip bir JSON nesnesi olarak ver:\n");
    prompt.push_str(
        r#"{
  "text": "hikaye metni",
  "choices": [
    {"text": "seçenek (...-mak/-mek istiyorum)", "nextStep": X},
    {"text": "seçenek (...-mak/-mek istiyorum)", "nextStep": Y}
  ],
  "animation": "animasyon_tipi"
}"#,
    );
    prompt
}
