//! jobtrack: command-line client for the job-tracker API
//!
//! 1. Loads configuration and the persisted session
//! 2. Runs one command, or reads commands from stdin with `shell`
//! 3. Prints results as JSON on stdout; logs go to stderr
//!
//! The refresh cookie lives in the HTTP client's in-memory jar, so token
//! refresh only works for the lifetime of one process. `shell` keeps a single
//! process (and session) across many commands.

mod cli;
mod commands;
mod config;
mod error;
mod metrics;

use anyhow::{Context, Result};
use api_client::{AuthClient, SessionEvent, spawn_refresh_task};
use session::CredentialStore;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::broadcast;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use transport::ReqwestTransport;

use crate::cli::{Command, USAGE};
use crate::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and LOG_LEVEL / RUST_LOG support.
    // stdout carries command output, so logs go to stderr.
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("LOG_LEVEL")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr),
        )
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let invocation = cli::parse(&args)?;

    if invocation.command == Command::Help {
        println!("{USAGE}");
        return Ok(());
    }

    let (config_path, explicit) = Config::resolve_path(invocation.config.as_deref());
    debug!(path = %config_path.display(), explicit, "loading configuration");

    let mut config = if explicit {
        Config::load(&config_path)
    } else {
        Config::load_or_default(&config_path)
    }
    .with_context(|| format!("failed to load config from {}", config_path.display()))?;
    config
        .override_base_url(invocation.api_url.as_deref())
        .context("invalid --api-url")?;

    debug!(
        base_url = %config.api.base_url,
        storage_path = %config.session.storage_path.display(),
        proactive_refresh = config.session.proactive_refresh,
        "configuration loaded"
    );

    // Install Prometheus metrics recorder before any metrics are emitted
    let prometheus = if config.telemetry.print_metrics {
        Some(metrics::install_recorder().context("failed to install Prometheus recorder")?)
    } else {
        None
    };

    let transport = ReqwestTransport::new(config.api.base_url.clone(), config.timeout())
        .context("failed to build HTTP client")?;
    let store = CredentialStore::load(config.session.storage_path.clone())
        .await
        .with_context(|| {
            format!(
                "failed to load session from {}",
                config.session.storage_path.display()
            )
        })?;
    let client = Arc::new(AuthClient::new(Arc::new(transport), Arc::new(store)));
    let mut events = client.subscribe();

    let refresher = config.session.proactive_refresh.then(|| {
        info!(
            interval_secs = config.session.refresh_interval_secs,
            threshold_secs = config.session.refresh_threshold_secs,
            "proactive refresh enabled"
        );
        spawn_refresh_task(
            client.clone(),
            config.refresh_interval(),
            config.refresh_threshold(),
        )
    });

    let result = match invocation.command {
        Command::Shell => run_shell(&client, &config, &mut events).await,
        command => run_once(&client, &config, command, &mut events).await,
    };

    if let Some(task) = refresher {
        task.abort();
    }
    if let Some(handle) = prometheus {
        eprint!("{}", handle.render());
    }

    result
}

async fn run_once(
    client: &AuthClient,
    config: &Config,
    command: Command,
    events: &mut broadcast::Receiver<SessionEvent>,
) -> Result<()> {
    let name = command.name();
    let result = commands::execute(client, config, command).await;
    for notice in drain_events(events) {
        eprintln!("{notice}");
    }

    let value = result.with_context(|| format!("{name} failed"))?;
    println!("{}", render(&value)?);
    Ok(())
}

/// Read commands from stdin until EOF, `exit`, or Ctrl+C. A failing command
/// is reported and the shell carries on.
async fn run_shell(
    client: &AuthClient,
    config: &Config,
    events: &mut broadcast::Receiver<SessionEvent>,
) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        stdout.write_all(b"jobtrack> ").await?;
        stdout.flush().await?;

        let line = tokio::select! {
            line = lines.next_line() => line.context("failed to read stdin")?,
            _ = tokio::signal::ctrl_c() => {
                info!("received SIGINT, leaving shell");
                None
            }
        };
        let Some(line) = line else {
            break;
        };

        let words = match cli::split_line(&line) {
            Ok(words) => words,
            Err(e) => {
                eprintln!("error: {e}");
                continue;
            }
        };
        match words.first().map(String::as_str) {
            None => continue,
            Some("exit" | "quit") => break,
            _ => {}
        }

        let command = match cli::parse_command(&words) {
            Ok(Command::Shell) => {
                eprintln!("error: already in a shell");
                continue;
            }
            Ok(command) => command,
            Err(e) => {
                eprintln!("error: {e}");
                continue;
            }
        };

        if let Err(e) = run_once(client, config, command, events).await {
            eprintln!("error: {e:#}");
        }
    }

    Ok(())
}

/// Human-facing notices for session events received so far.
///
/// `LoginRequired` is where a browser would redirect to the login page; on
/// the command line it becomes a prompt to sign in again.
fn drain_events(events: &mut broadcast::Receiver<SessionEvent>) -> Vec<String> {
    let mut notices = Vec::new();
    loop {
        match events.try_recv() {
            Ok(SessionEvent::LoginRequired { reason }) => notices.push(format!(
                "session expired ({reason}); sign in again with `jobtrack login <email>`"
            )),
            Ok(event) => debug!(event = event.label(), "session event"),
            Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                debug!(skipped, "session events lagged");
            }
            Err(_) => break,
        }
    }
    notices
}

/// Pretty JSON, except bare strings which print as-is.
fn render(value: &serde_json::Value) -> Result<String> {
    match value {
        serde_json::Value::String(text) => Ok(text.clone()),
        other => Ok(serde_json::to_string_pretty(other)?),
    }
}
