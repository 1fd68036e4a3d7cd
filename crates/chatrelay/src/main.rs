//! # chatrelay
//!
//! Chat relay server binary. Loads settings, wires the `OpenAI` provider into
//! the relay server, and serves until Ctrl-C or SIGTERM.

mod logging;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chatrelay_llm::openai::{OpenAIConfig, OpenAIProvider};
use chatrelay_server::AppState;
use chatrelay_settings::{ChatRelaySettings, UpstreamSettings};
use clap::Parser;

/// Chat relay server.
#[derive(Parser, Debug)]
#[command(name = "chatrelay", about = "Relay streamed chat completions to browser clients")]
struct Cli {
    /// Host to bind (overrides settings).
    #[arg(long)]
    host: Option<String>,

    /// Port to bind, 0 for auto-assign (overrides settings).
    #[arg(long)]
    port: Option<u16>,

    /// Settings file (defaults to `~/.chatrelay/settings.json`).
    #[arg(long, env = "CHATRELAY_CONFIG")]
    config: Option<PathBuf>,

    /// Log filter directive, e.g. `debug` or `chatrelay_server=trace`.
    #[arg(long)]
    log_level: Option<String>,

    /// Skip installing the Prometheus recorder.
    #[arg(long)]
    no_metrics: bool,
}

impl Cli {
    /// Apply command-line overrides on top of loaded settings.
    fn apply(&self, settings: &mut ChatRelaySettings) {
        if let Some(host) = &self.host {
            settings.server.host.clone_from(host);
        }
        if let Some(port) = self.port {
            settings.server.port = port;
        }
        if let Some(level) = &self.log_level {
            settings.logging.level.clone_from(level);
        }
    }
}

/// Map upstream settings onto the provider config.
fn provider_config(upstream: &UpstreamSettings) -> OpenAIConfig {
    OpenAIConfig {
        model: upstream.model.clone(),
        api_key: upstream.api_key.clone(),
        base_url: Some(upstream.base_url.clone()),
        temperature: upstream.temperature,
        max_tokens: upstream.max_tokens,
        request_timeout: (upstream.request_timeout_secs > 0)
            .then(|| Duration::from_secs(upstream.request_timeout_secs)),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env is normal.
    let _ = dotenv::dotenv();

    let cli = Cli::parse();
    let mut settings = match &cli.config {
        Some(path) => chatrelay_settings::load_settings_from_path(path),
        None => chatrelay_settings::load_settings(),
    }
    .context("failed to load settings")?;
    cli.apply(&mut settings);

    logging::init(&settings.logging)?;

    if settings.upstream.api_key.is_none() {
        tracing::warn!("OPENAI_API_KEY is not set; upstream requests will be unauthenticated");
    }

    let provider = Arc::new(OpenAIProvider::new(provider_config(&settings.upstream)));
    let addr = settings.server.bind_addr();
    let settings = Arc::new(settings);

    let mut state = AppState::new(provider, Arc::clone(&settings));
    if !cli.no_metrics {
        let handle = chatrelay_server::metrics::install_recorder()
            .context("failed to install metrics recorder")?;
        state = state.with_metrics(handle);
    }

    let listener = chatrelay_server::bind(&addr)
        .await
        .context("failed to bind server")?;

    chatrelay_server::serve(listener, state, chatrelay_server::shutdown_signal())
        .await
        .context("server exited with an error")?;

    tracing::info!("shutdown complete");
    Ok(())
}
