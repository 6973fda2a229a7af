//! tmdbgw - bearer-protected HTTP gateway in front of the TMDB API.

/// Application configuration (TOML, environment, flags).
mod config;
/// Inbound HTTP server.
mod server;

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tmdbgw_api::auth::BearerAuth;
use tmdbgw_api::tmdb::{TmdbApi, TmdbClient};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::instrument;
use tracing_subscriber::filter::EnvFilter;
#[cfg(not(feature = "otel"))]
use tracing_subscriber::fmt;
#[cfg(feature = "otel")]
use tracing_subscriber::layer::SubscriberExt;
#[cfg(feature = "otel")]
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::{AppConfig, Overrides, bootstrap_token, resolve_config_path};
use crate::server::AppState;

/// CLI argument parser.
#[derive(Parser)]
#[command(about, version)]
struct Cli {
    /// Override config directory.
    #[arg(long, global = true)]
    dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Subcommand to run.
    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP gateway.
    Serve(ServeArgs),
    /// Check TMDB connectivity and the API key.
    Ping(PingArgs),
    /// Print the bearer token, generating one if none is configured.
    Token,
}

/// Upstream flags shared by `serve` and `ping`.
#[derive(Args)]
struct TmdbArgs {
    /// TMDB v3 API key.
    #[arg(long)]
    api_key: Option<String>,

    /// Default response language (e.g. "en-US", "ja-JP").
    #[arg(long)]
    language: Option<String>,

    /// Requests allowed per 10-second window.
    #[arg(long)]
    rate_limit: Option<u32>,
}

/// Arguments for `serve`.
#[derive(Args)]
struct ServeArgs {
    #[command(flatten)]
    tmdb: TmdbArgs,

    /// Bind address.
    #[arg(long)]
    host: Option<String>,

    /// Bind port.
    #[arg(long)]
    port: Option<u16>,

    /// Bearer token (64 hex characters).
    #[arg(long)]
    token: Option<String>,
}

/// Arguments for `ping`.
#[derive(Args)]
struct PingArgs {
    #[command(flatten)]
    tmdb: TmdbArgs,
}

impl Cli {
    fn overrides(&self) -> Overrides {
        let mut overrides = Overrides {
            log_level: self.log_level.clone(),
            ..Overrides::default()
        };
        let tmdb = match &self.command {
            Commands::Serve(args) => {
                overrides.host.clone_from(&args.host);
                overrides.port = args.port;
                overrides.token.clone_from(&args.token);
                Some(&args.tmdb)
            }
            Commands::Ping(args) => Some(&args.tmdb),
            Commands::Token => None,
        };
        if let Some(tmdb) = tmdb {
            overrides.api_key.clone_from(&tmdb.api_key);
            overrides.language.clone_from(&tmdb.language);
            overrides.rate_limit = tmdb.rate_limit;
        }
        overrides
    }
}

/// Merges file, environment and flags into a validated config.
///
/// # Errors
///
/// Returns an error if the file cannot be parsed or a value is invalid.
fn load_config(path: &Path, overrides: &Overrides) -> Result<AppConfig> {
    let mut config = AppConfig::load(path)?;
    config.apply_env(|key| std::env::var(key).ok())?;
    config.apply_overrides(overrides);
    config.validate()?;
    Ok(config)
}

/// Installs the global subscriber. `RUST_LOG` takes precedence over `level`.
fn init_tracing(level: &str) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_ascii_lowercase()));

    #[cfg(not(feature = "otel"))]
    {
        fmt().with_env_filter(env_filter).with_target(false).init();
    }

    #[cfg(feature = "otel")]
    {
        let fmt_layer = tracing_subscriber::fmt::layer().with_target(false);

        let otel_layer = std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT")
            .ok()
            .and_then(|_| {
                let exporter = opentelemetry_otlp::SpanExporter::builder()
                    .with_http()
                    .build()
                    .ok()?;

                let tracer_provider = opentelemetry_sdk::trace::SdkTracerProvider::builder()
                    .with_simple_exporter(exporter)
                    .build();

                let tracer = opentelemetry::trace::TracerProvider::tracer(
                    &tracer_provider,
                    env!("CARGO_PKG_NAME"),
                );
                opentelemetry::global::set_tracer_provider(tracer_provider);

                Some(tracing_opentelemetry::layer().with_tracer(tracer))
            });

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .with(otel_layer)
            .init();
    }
}

/// Builds a TMDB client from the merged config.
///
/// # Errors
///
/// Returns an error if the API key is missing or the client fails to build.
fn build_tmdb_client(config: &AppConfig) -> Result<TmdbClient> {
    let mut builder = TmdbClient::builder()
        .api_key(config.api_key()?)
        .language(&config.tmdb.language)
        .rate_limit(config.tmdb.rate_limit);
    if let Some(base_url) = &config.tmdb.base_url {
        let url = base_url
            .parse::<url::Url>()
            .with_context(|| format!("invalid tmdb.base_url: {base_url}"))?;
        builder = builder.base_url(url);
    }
    builder.build().context("failed to build TMDB client")
}

/// Cancels `shutdown` on Ctrl-C or SIGTERM.
fn spawn_signal_handler(shutdown: CancellationToken) {
    tokio::spawn(async move {
        wait_for_signal().await;
        tracing::info!("Shutdown signal received");
        shutdown.cancel();
    });
}

async fn wait_for_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "Failed to install Ctrl-C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}

/// Runs the `serve` subcommand.
///
/// # Errors
///
/// Returns an error if the TMDB check fails, the token cannot be
/// provisioned, or the listener cannot bind.
#[instrument(skip_all)]
async fn run_serve(config: &AppConfig, config_path: &Path) -> Result<()> {
    let client = Arc::new(build_tmdb_client(config)?);
    let shutdown = CancellationToken::new();
    spawn_signal_handler(shutdown.clone());

    client
        .ping(&shutdown)
        .await
        .context("TMDB API connection check failed")?;
    tracing::info!("TMDB API connection OK");

    let token = match &config.server.token {
        Some(token) => token.clone(),
        None => bootstrap_token(config_path)?,
    };

    let address = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind {address}"))?;
    tracing::info!(
        address = %listener.local_addr().context("failed to read local address")?,
        rate_limit = config.tmdb.rate_limit,
        "Server listening"
    );

    let state = AppState::new(Arc::clone(&client), BearerAuth::new(token), shutdown.clone());
    server::serve(listener, server::router(state), shutdown).await?;

    let stats = client.stats();
    tracing::info!(
        attempts = stats.attempts,
        retries = stats.retries,
        "Server stopped"
    );
    Ok(())
}

/// Runs the `ping` subcommand.
///
/// # Errors
///
/// Returns an error if the TMDB client fails to build or the check fails.
#[instrument(skip_all)]
async fn run_ping(config: &AppConfig) -> Result<()> {
    let client = build_tmdb_client(config)?;
    let shutdown = CancellationToken::new();
    spawn_signal_handler(shutdown.clone());

    client
        .ping(&shutdown)
        .await
        .context("TMDB API connection check failed")?;

    let stats = client.stats();
    tracing::info!(
        attempts = stats.attempts,
        retries = stats.retries,
        "TMDB API connection OK"
    );
    Ok(())
}

/// Runs the `token` subcommand.
///
/// The token goes to `out` regardless of the log level and never through
/// the subscriber.
///
/// # Errors
///
/// Returns an error if the config file cannot be read or written, or `out`
/// fails.
fn run_token(config: &AppConfig, config_path: &Path, out: &mut impl Write) -> Result<()> {
    let token = match &config.server.token {
        Some(token) => token.clone(),
        None => bootstrap_token(config_path)?,
    };
    writeln!(out, "{token}").context("failed to write token")?;
    Ok(())
}

/// Entry point.
///
/// # Errors
///
/// Returns an error if configuration is invalid or the subcommand fails.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config_path = resolve_config_path(cli.dir.as_ref())?;
    let config = load_config(&config_path, &cli.overrides())?;
    init_tracing(&config.logging.level);

    match cli.command {
        Commands::Serve(_) => run_serve(&config, &config_path).await,
        Commands::Ping(_) => run_ping(&config).await,
        Commands::Token => run_token(&config, &config_path, &mut std::io::stdout().lock()),
    }
}
