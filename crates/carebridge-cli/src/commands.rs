//! Command handlers.

use crate::output::{self, OutputFormat};
use crate::{Commands, RequestArgs};
use anyhow::{anyhow, bail, Context, Result};
use serde_json::Value;
use session_guard::{Body, ClientError, Method, MultipartPart, RequestOptions, SessionGuardedClient};
use reqwest::cookie::Jar;
use std::path::Path;
use url::Url;

pub async fn run(client: &SessionGuardedClient, command: Commands, format: OutputFormat) -> Result<()> {
    match command {
        Commands::Get(args) => request(client, Method::Get, args, &format).await,
        Commands::Post(args) => request(client, Method::Post, args, &format).await,
        Commands::Put(args) => request(client, Method::Put, args, &format).await,
        Commands::Patch(args) => request(client, Method::Patch, args, &format).await,
        Commands::Delete(args) => request(client, Method::Delete, args, &format).await,
        Commands::Me => {
            let record = client.me().await.map_err(describe)?;
            output::print_identity(&record, &format);
            Ok(())
        }
        Commands::Logout => {
            client.logout().await;
            output::print_success("Logged out", &format);
            Ok(())
        }
    }
}

async fn request(
    client: &SessionGuardedClient,
    method: Method,
    args: RequestArgs,
    format: &OutputFormat,
) -> Result<()> {
    let options = build_options(&args)?;
    let response = client
        .request(method, &args.path, options)
        .await
        .map_err(describe)?;
    output::print_response(&response, format);
    Ok(())
}

/// Load `NAME=VALUE` pairs into the jar so an existing browser session
/// (session cookie plus `csrfToken`) can be reused from the command line.
pub fn seed_cookies(jar: &Jar, base_url: &Url, cookies: &[String]) -> Result<()> {
    for cookie in cookies {
        let (name, value) = cookie
            .split_once('=')
            .filter(|(name, _)| !name.trim().is_empty())
            .ok_or_else(|| anyhow!("cookie must be NAME=VALUE, got {:?}", cookie))?;
        jar.add_cookie_str(&format!("{}={}; Path=/", name.trim(), value.trim()), base_url);
    }
    Ok(())
}

/// Attach the server's error text to HTTP failures.
fn describe(error: ClientError) -> anyhow::Error {
    let message = error
        .http_failure()
        .map(|failure| failure.message())
        .filter(|message| !message.trim().is_empty());
    match message {
        Some(message) => anyhow!("{}: {}", error, message),
        None => anyhow::Error::new(error),
    }
}

fn build_options(args: &RequestArgs) -> Result<RequestOptions> {
    let mut options = RequestOptions::new();

    for header in &args.headers {
        let (name, value) = header
            .split_once(':')
            .ok_or_else(|| anyhow!("header must be NAME:VALUE, got {:?}", header))?;
        options = options.header(name.trim(), value.trim());
    }

    for pair in &args.query {
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| anyhow!("query must be KEY=VALUE, got {:?}", pair))?;
        options = options.query(key, value);
    }

    let data = args
        .data
        .as_deref()
        .map(serde_json::from_str::<Value>)
        .transpose()
        .context("--data must be valid JSON")?;

    if args.files.is_empty() {
        if let Some(data) = data {
            options = options.json(data);
        }
        return Ok(options);
    }

    let mut parts = Vec::new();
    match data {
        None => {}
        Some(Value::Object(fields)) => {
            for (name, value) in fields {
                let text = match value {
                    Value::String(text) => text,
                    other => other.to_string(),
                };
                parts.push(MultipartPart::text(name, text));
            }
        }
        Some(_) => bail!("--data must be a JSON object when uploading files"),
    }

    for file in &args.files {
        let (field, path) = file
            .split_once('=')
            .ok_or_else(|| anyhow!("file must be FIELD=PATH, got {:?}", file))?;
        let path = Path::new(path);
        let data = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| field.to_string());
        parts.push(MultipartPart::file(field, file_name, None, data));
    }

    Ok(options.body(Body::Multipart(parts)))
}
