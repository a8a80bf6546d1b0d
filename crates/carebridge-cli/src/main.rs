//! Carebridge CLI - call the backend through the session-guarded client.

mod commands;
mod output;

use carebridge_config::{init_logging, Config, Paths};
use clap::{Args, Parser, Subcommand};
use reqwest::cookie::Jar;
use session_guard::{ChannelHostBridge, FileIdentityCache, SessionGuardedClient, SharedLocation};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

/// Carebridge CLI - call the Carebridge API with the same session handling
/// the web and mobile front-ends use.
#[derive(Parser)]
#[command(name = "carebridge")]
#[command(about = "Session-guarded HTTP calls against the Carebridge API")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (defaults to ~/.carebridge/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Backend base URL, e.g. http://localhost:5000/api
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Authenticate with a bearer token instead of the session cookie
    #[arg(long, global = true)]
    bearer: Option<String>,

    /// Seed the session cookie jar, e.g. --cookie session=abc --cookie csrfToken=xyz
    #[arg(long = "cookie", value_name = "NAME=VALUE", global = true)]
    cookies: Vec<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    /// Output format (text or json)
    #[arg(short, long, default_value = "text", global = true)]
    format: output::OutputFormat,
}

#[derive(Subcommand)]
enum Commands {
    /// GET a resource
    Get(RequestArgs),
    /// POST to a resource
    Post(RequestArgs),
    /// PUT a resource
    Put(RequestArgs),
    /// PATCH a resource
    Patch(RequestArgs),
    /// DELETE a resource
    Delete(RequestArgs),
    /// Show who is logged in and cache it
    Me,
    /// End the session
    Logout,
}

#[derive(Args, Debug, Default)]
struct RequestArgs {
    /// Path relative to the base URL, e.g. /activities
    path: String,

    /// JSON body (with --file, an object whose fields become text parts)
    #[arg(long)]
    data: Option<String>,

    /// Upload a file as a multipart part
    #[arg(long = "file", value_name = "FIELD=PATH")]
    files: Vec<String>,

    /// Query parameter
    #[arg(short, long = "query", value_name = "KEY=VALUE")]
    query: Vec<String>,

    /// Extra request header
    #[arg(short = 'H', long = "header", value_name = "NAME:VALUE")]
    headers: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let paths = Paths::new()?;
    let mut config = match &cli.config {
        Some(path) => {
            let mut config = Config::load_from_file(path)?;
            config.apply_overrides(|name| std::env::var(name).ok())?;
            config
        }
        None => Config::load(&paths)?,
    };
    if let Some(base_url) = cli.base_url {
        config.client.base_url = base_url;
    }
    if let Some(level) = cli.log_level {
        config.log_level = level;
    }
    if cli.json_logs {
        config.log_json = true;
    }

    init_logging(&config.log_level, config.log_json);
    debug!(base_url = %config.client.base_url, "Configuration loaded");

    let jar = Arc::new(Jar::default());
    commands::seed_cookies(&jar, &config.client.base_url()?, &cli.cookies)?;

    let (bridge, messages) = ChannelHostBridge::channel();
    let location = Arc::new(SharedLocation::new());
    let client = SessionGuardedClient::builder(config.client)
        .cookie_jar(jar)
        .identity_cache(Arc::new(FileIdentityCache::new(paths.identity_file())))
        .host_bridge(Arc::new(bridge))
        .navigator(location.clone())
        .build()?;

    if let Some(token) = cli.bearer {
        client.session().set_bearer_token(token);
    }

    let result = commands::run(&client, cli.command, cli.format).await;
    output::print_session_events(messages, &location);

    if let Err(error) = result {
        output::print_error(&format!("{:#}", error), &cli.format);
        std::process::exit(1);
    }
    Ok(())
}
