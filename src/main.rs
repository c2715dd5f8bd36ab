use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::http::HeaderValue;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use chatcal::config::AppConfig;
use chatcal::db;
use chatcal::services::ai::anthropic::AnthropicProvider;
use chatcal::services::ai::ollama::OllamaProvider;
use chatcal::services::ai::LlmProvider;
use chatcal::services::calendar::LocalCalendar;
use chatcal::services::clock::SystemClock;
use chatcal::services::conversation;
use chatcal::state::AppState;

const SWEEP_INTERVAL: Duration = Duration::from_secs(300);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env();
    let timezone = config.timezone();

    let db = Arc::new(Mutex::new(db::init_db(&config.database_url)?));

    let llm: Box<dyn LlmProvider> = match config.llm_provider.as_str() {
        "anthropic" => {
            anyhow::ensure!(
                !config.anthropic_api_key.is_empty(),
                "ANTHROPIC_API_KEY must be set when LLM_PROVIDER=anthropic"
            );
            tracing::info!(model = %config.anthropic_model, "using Anthropic LLM provider");
            Box::new(AnthropicProvider::new(
                config.anthropic_api_key.clone(),
                config.anthropic_model.clone(),
            ))
        }
        _ => {
            tracing::info!(url = %config.ollama_url, model = %config.ollama_model, "using Ollama LLM provider");
            Box::new(OllamaProvider::new(
                config.ollama_url.clone(),
                config.ollama_model.clone(),
            ))
        }
    };

    let state = Arc::new(AppState::new(
        db.clone(),
        config.clone(),
        llm,
        Box::new(LocalCalendar::new(db, timezone)),
        Box::new(SystemClock::new(timezone)),
    ));

    let sweeper = state.clone();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(SWEEP_INTERVAL);
        loop {
            ticker.tick().await;
            if let Err(e) = conversation::sweep_expired(&sweeper) {
                tracing::warn!(error = %e, "failed to sweep expired conversations");
            }
        }
    });

    let cors = if config.cors_origins.is_empty() {
        CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
    } else {
        let origins: Vec<HeaderValue> = config
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any)
    };

    let app = chatcal::build_router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!(
        owner = %config.owner_name,
        timezone = %timezone,
        "starting server on {addr}"
    );

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
