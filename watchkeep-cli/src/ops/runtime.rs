//! Daemon-level operations: validate, quit, ping, id, alive.

use crate::client::{error_status, Endpoint};
use crate::ops::ui::{print_error, print_header, print_kv, print_success};
use crossterm::style::Stylize;
use reqwest::StatusCode;

pub async fn validate(endpoint: &Endpoint) -> anyhow::Result<()> {
    endpoint
        .post_form("/_runtime", &[("action", "validate")])
        .await?;
    print_success("daemon woken up for validation");
    Ok(())
}

/// Stops the daemon's http server. A 503 reply is the expected answer.
pub async fn quit(endpoint: &Endpoint) -> anyhow::Result<()> {
    match endpoint.post_form("/_runtime", &[("action", "stop")]).await {
        Ok(_) => print_success("http server stopped"),
        Err(e) if error_status(&e) == Some(StatusCode::SERVICE_UNAVAILABLE) => {
            print_success("http server stopped")
        }
        Err(e) => {
            print_error(&e.to_string());
            return Err(e);
        }
    }
    Ok(())
}

pub async fn ping(endpoint: &Endpoint) -> anyhow::Result<()> {
    let reply = endpoint.get("/_ping", &[]).await?.text().await?;
    println!("{reply}");
    Ok(())
}

pub async fn id(endpoint: &Endpoint) -> anyhow::Result<()> {
    let id = endpoint.get("/_getid", &[]).await?.text().await?;
    print_header("watchkeep daemon");
    print_kv("URL", &endpoint.url("/"));
    print_kv("ID", id.trim());
    Ok(())
}

pub async fn alive(endpoint: &Endpoint) -> anyhow::Result<()> {
    match endpoint.get("/_monit", &[]).await {
        Ok(_) => {
            println!("  {}", "● daemon is running".green());
            Ok(())
        }
        Err(e) => {
            println!("  {}", "○ daemon is not running".dark_grey());
            Err(e)
        }
    }
}
