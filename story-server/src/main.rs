use anyhow::Result;
use clap::Parser;
use openai::OpenAi;
use std::net::SocketAddr;
use std::sync::Arc;
use story_core::{ChatBoundary, StoryConfig};
use story_server::{create_router, AppState};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Interactive story step server", long_about = None)]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "3000")]
    port: u16,

    /// Chat model to use (default: gpt-4o-mini)
    #[arg(short, long, env = "STORY_MODEL")]
    model: Option<String>,

    /// Base URL of an OpenAI-compatible API
    #[arg(long)]
    base_url: Option<String>,

    /// Maximum tokens per generated step
    #[arg(long, default_value = "1024")]
    max_tokens: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let mut client = OpenAi::from_env()?;
    if let Some(base_url) = &args.base_url {
        client = client.with_base_url(base_url);
    }

    let mut config = StoryConfig::new().with_max_tokens(args.max_tokens);
    if let Some(model) = &args.model {
        config = config.with_model(model);
    }
    let boundary = ChatBoundary::from_config(client, &config);

    let app = create_router(AppState::new(Arc::new(boundary)));
    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!(
        %addr,
        model = config.model.as_deref().unwrap_or("default"),
        "Starting story server"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("Shutting down");
}
