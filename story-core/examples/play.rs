//! Play a story in the terminal.
//!
//! Usage: `cargo run -p story-core --example play -- <name> <age> <theme> [tr|en]`
//!
//! Uses the OpenAI API when OPENAI_API_KEY is set, otherwise plays offline
//! with generated placeholder steps.

use openai::OpenAi;
use std::io::{self, BufRead, Write};
use std::sync::Arc;
use story_core::export::TextRenderer;
use story_core::testing::ScriptedBoundary;
use story_core::{
    ChatBoundary, GenerationBoundary, Locale, StoryConfig, StorySession, StoryStep, Turn,
    UserProfile,
};

fn show(step: &StoryStep, progress: u8) {
    println!("\n[{progress}%] ({})", step.animation);
    println!("{}\n", step.text);
    for (i, choice) in step.choices.iter().enumerate() {
        println!("  {}) {}", i + 1, choice.text);
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let name = args.first().map(String::as_str).unwrap_or("Ela");
    let age = args.get(1).map(String::as_str).unwrap_or("7");
    let theme = args.get(2).map(String::as_str).unwrap_or("space");
    let locale: Locale = args.get(3).map(|s| s.parse()).transpose()?.unwrap_or_default();

    let profile = UserProfile::from_form(name, age, theme)?;
    let config = StoryConfig::new().with_locale(locale).with_env_overrides()?;

    let boundary: Arc<dyn GenerationBoundary> = match OpenAi::from_env() {
        Ok(client) => Arc::new(ChatBoundary::from_config(client, &config)),
        Err(_) => {
            println!("OPENAI_API_KEY not set, playing offline.");
            Arc::new(ScriptedBoundary::default())
        }
    };

    let mut session = StorySession::with_boundary(profile, boundary, &config);
    let step = session.begin().await?;
    show(&step, session.progress_percent());

    let stdin = io::stdin();
    loop {
        print!("\nChoose 1 or 2 (r = restart, q = quit): ");
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }

        let turn = match line.trim() {
            "1" => session.choose(0).await?,
            "2" => session.choose(1).await?,
            "r" => Turn::Step(session.restart().await?),
            "q" => break,
            _ => continue,
        };

        match turn {
            Turn::Step(step) => show(&step, session.progress_percent()),
            Turn::Finished => {
                println!("\nThe end! ({}%)", session.progress_percent());
                break;
            }
        }
    }

    let export = session.export();
    if let Ok(doc) = export.render(&TextRenderer) {
        println!("\n{}", String::from_utf8_lossy(&doc));
    }
    Ok(())
}
