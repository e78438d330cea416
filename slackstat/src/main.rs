use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use slack_api::SlackApi;
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use slackstat::config::{AppConfig, ConfigManager, ConfigWarning};
use slackstat::credentials::{CredentialExtractor, SlackCredentialExtractor, mask_secret};
use slackstat::logging::{default_log_dir, init_logging};
use slackstat::monitor::{ApiFactory, MonitorEvent, PollScheduler, SlackApiFactory, UnreadMonitor};
use slackstat::output::{StatusReport, render_report, render_update};
use slackstat::utils::http_client::build_http_client;
use slackstat::{deeplink, panic_hook};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Slack desktop data directory (defaults to the standard install locations)
    #[arg(long, global = true)]
    slack_dir: Option<PathBuf>,

    /// Seconds between polls (10-120)
    #[arg(long, global = true)]
    poll_interval: Option<u64>,

    /// Directory holding config.json
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    /// Directory for log files
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug, Clone)]
enum Command {
    /// Poll continuously and print the summary on every update (default)
    Watch,
    /// Run one poll cycle and print the summary and sidebar sections
    Status {
        /// Output the result in JSON format
        #[arg(long)]
        json: bool,
    },
    /// Extract credentials and verify them with auth.test
    Check,
    /// Open a workspace or conversation in the desktop client
    Open {
        /// Workspace (team) id
        #[arg(long)]
        team: String,
        /// Conversation id to focus
        #[arg(long)]
        channel: Option<String>,
    },
}

impl Cli {
    /// File, then environment, then flags.
    fn resolve_config(&self, warnings: &mut Vec<ConfigWarning>) -> AppConfig {
        let mut config = ConfigManager::new(self.config_dir.as_deref())
            .load(warnings)
            .apply_env(warnings);
        if let Some(dir) = &self.slack_dir {
            config.slack_data_dir = Some(dir.clone());
        }
        if let Some(secs) = self.poll_interval {
            config.poll_interval_seconds = secs;
        }
        if let Some(dir) = &self.log_dir {
            config.log_dir = Some(dir.clone());
        }
        config.normalize()
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let mut config_warnings = Vec::new();
    let config = cli.resolve_config(&mut config_warnings);

    let log_dir = config.log_dir.clone().unwrap_or_else(default_log_dir);
    let (logging, _guard) = init_logging(&log_dir, config.log_filter.as_deref())
        .context("Failed to initialize logging")?;
    panic_hook::install(&log_dir);
    for warning in &config_warnings {
        warning.log();
    }

    let cancel = CancellationToken::new();
    logging.start_retention_cleanup(cancel.child_token());
    debug!(?config, "Resolved configuration");

    let result = match cli.command.clone().unwrap_or(Command::Watch) {
        Command::Watch => watch(&config).await,
        Command::Status { json } => status(&config, json).await,
        Command::Check => check(&config).await,
        Command::Open { team, channel } => open(&team, channel.as_deref()),
    };

    cancel.cancel();
    result
}

fn build_monitor(config: &AppConfig) -> Arc<UnreadMonitor> {
    let extractor = Arc::new(SlackCredentialExtractor::with_keychain(
        config.slack_data_dir.clone(),
    ));
    let factory = Arc::new(SlackApiFactory::new(build_http_client()));
    Arc::new(UnreadMonitor::new(extractor, factory))
}

async fn watch(config: &AppConfig) -> anyhow::Result<()> {
    let monitor = build_monitor(config);
    let mut events = monitor.subscribe();

    let scheduler = PollScheduler::new();
    scheduler.start(monitor.clone(), config.poll_interval());

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, shutting down");
                break;
            }
            event = events.recv() => match event {
                Ok(MonitorEvent::SectionsUpdated { section_count, .. }) => {
                    debug!(sections = section_count, "Sidebar sections updated");
                }
                Ok(event) => {
                    debug!(event = %event.description(), "Monitor event");
                    println!("{}", render_update(&monitor.snapshot(), Utc::now()));
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Dropped monitor events");
                }
                Err(RecvError::Closed) => break,
            }
        }
    }

    scheduler.shutdown().await;
    Ok(())
}

async fn status(config: &AppConfig, json: bool) -> anyhow::Result<()> {
    let monitor = build_monitor(config);
    let snapshot = monitor.poll_once().await;
    let now = Utc::now();

    if json {
        let report = StatusReport::new(&snapshot, now);
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", render_report(&snapshot, now));
    }

    if snapshot.status.is_error() {
        anyhow::bail!("poll failed: {}", snapshot.status);
    }
    Ok(())
}

async fn check(config: &AppConfig) -> anyhow::Result<()> {
    let extractor = SlackCredentialExtractor::with_keychain(config.slack_data_dir.clone());
    let credentials = extractor
        .extract()
        .await
        .context("Failed to extract credentials")?;

    println!("Token:  {}", mask_secret(credentials.token()));
    println!("Cookie: {}", mask_secret(credentials.cookie()));
    for workspace in &credentials.workspaces {
        let active = credentials
            .workspace
            .as_ref()
            .is_some_and(|w| w.id == workspace.id);
        println!(
            "{} {} ({}.slack.com) [{}]",
            if active { "*" } else { " " },
            workspace.name,
            workspace.domain,
            workspace.id
        );
    }

    let api = SlackApiFactory::new(build_http_client())
        .create(&credentials)
        .context("Failed to create API client")?;
    let auth = api.auth_test().await.context("auth.test failed")?;
    println!(
        "Authenticated as {} ({}) on {}",
        auth.user.as_deref().unwrap_or("?"),
        auth.user_id.as_deref().unwrap_or("?"),
        auth.team.as_deref().unwrap_or("?"),
    );
    Ok(())
}

fn open(team: &str, channel: Option<&str>) -> anyhow::Result<()> {
    let url = match channel {
        Some(channel) => deeplink::channel_url(team, channel)?,
        None => deeplink::workspace_url(team)?,
    };
    deeplink::open_url(&url).with_context(|| format!("Failed to open {url}"))?;
    Ok(())
}
