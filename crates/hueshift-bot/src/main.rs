//! Hueshift CLI
//!
//! Runs every configured rotation for one guild until Ctrl+C.

use anyhow::Context;
use clap::Parser;
use hueshift_bot::config::Settings;
use hueshift_bot::feed::{GuildMessages, IntakeFeed};
use hueshift_bot::{App, Services};
use hueshift_remote::{GuildClient, HttpFetcher, OperatorTarget, DEFAULT_API_BASE};
use hueshift_store::ConfigStore;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Rotate a guild's role color, banner and icon
#[derive(Debug, Parser)]
#[command(name = "hueshift", version, about)]
struct Args {
    /// JSON config file
    #[arg(long, default_value = "config.json")]
    config: PathBuf,

    /// Bot token
    #[arg(long, env = "DISCORD_BOT_TOKEN", hide_env_values = true)]
    token: String,

    /// REST API base URL
    #[arg(long, default_value = DEFAULT_API_BASE)]
    api_base: String,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(Args::parse()).await {
        tracing::error!("{:#}", e);
        process::exit(1);
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    let store = ConfigStore::open(&args.config)
        .with_context(|| format!("Failed to load {}", args.config.display()))?;
    let store = Arc::new(store);
    let settings = Settings::load(&store).context("Invalid configuration")?;

    let client = GuildClient::new(
        args.api_base,
        args.token,
        settings.guild_id,
        settings.rgb_role_id,
    )?
    .with_operator(OperatorTarget {
        channel: settings.designated_channel,
        operator: settings.admin,
    });
    let api = Arc::new(client.clone());
    let services = Services {
        applier: api.clone(),
        fetcher: Arc::new(HttpFetcher::new(settings.intake_fetch_timeout)?),
        notifier: api.clone(),
        authorizer: api.clone(),
        moderator: api,
    };

    let poll_interval = settings.poll_interval;
    let app = Arc::new(App::new(settings, store, services).context("Failed to build rotations")?);

    let bot = client
        .current_user()
        .await
        .context("Failed to authenticate with the API")?;
    tracing::info!("Authenticated as {}", bot);

    let mut feed = IntakeFeed::new(
        Arc::new(GuildMessages::new(client, bot)),
        app.watched_channels(),
        poll_interval,
    );
    let history = feed.prime().await;
    app.seed_history(&history);

    app.start_all().await?;
    app.announce_startup().await;

    let cancel = CancellationToken::new();
    let feed_task = tokio::spawn(feed.run(app.clone(), cancel.clone()));

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl+C")?;
    tracing::info!("Shutting down");

    cancel.cancel();
    if let Err(e) = feed_task.await {
        tracing::error!("Intake feed ended abnormally: {}", e);
    }
    app.shutdown().await;
    Ok(())
}
