//! Output formatting for the CLI.

use clap::ValueEnum;
use serde_json::{json, Value};
use session_guard::{HostMessage, IdentityRecord, Response, SharedLocation};
use tokio::sync::mpsc::UnboundedReceiver;

/// Output format.
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Print the status line and the unwrapped response data.
pub fn print_response(response: &Response, format: &OutputFormat) {
    let data = response
        .data()
        .unwrap_or_else(|_| Value::String(response.text()));

    match format {
        OutputFormat::Text => {
            println!("{}", response.status());
            if !data.is_null() {
                println!("{}", pretty(&data));
            }
        }
        OutputFormat::Json => {
            let body = json!({ "status": response.status().as_u16(), "data": data });
            println!("{}", pretty(&body));
        }
    }
}

pub fn print_identity(record: &IdentityRecord, format: &OutputFormat) {
    match format {
        OutputFormat::Text => {
            print_row("User", &record.user_id);
            print_row("Email", record.email.as_deref().unwrap_or("-"));
            print_row("Role", record.role.as_deref().unwrap_or("-"));
            print_row("Name", record.display_name.as_deref().unwrap_or("-"));
        }
        OutputFormat::Json => {
            if let Ok(json) = serde_json::to_string_pretty(record) {
                println!("{}", json);
            }
        }
    }
}

/// Print a success message.
pub fn print_success(message: &str, format: &OutputFormat) {
    match format {
        OutputFormat::Text => println!("{}", message),
        OutputFormat::Json => println!("{}", json!({ "status": "success", "message": message })),
    }
}

/// Print an error message.
pub fn print_error(message: &str, format: &OutputFormat) {
    match format {
        OutputFormat::Text => eprintln!("Error: {}", message),
        OutputFormat::Json => eprintln!("{}", json!({ "status": "error", "message": message })),
    }
}

/// Report host messages and the login redirect, if the session ended.
pub fn print_session_events(mut messages: UnboundedReceiver<HostMessage>, location: &SharedLocation) {
    while let Ok(message) = messages.try_recv() {
        let wire = serde_json::to_string(&message).unwrap_or_else(|_| format!("{:?}", message));
        eprintln!("host message: {}", wire);
    }
    if let Some(location) = location.current() {
        eprintln!("redirect: {}", location);
    }
}

fn print_row(label: &str, value: &str) {
    println!("  {:<8} {}", format!("{}:", label), value);
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}
