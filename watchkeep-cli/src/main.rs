mod client;
mod ops;

use clap::{Parser, Subcommand};
use client::Endpoint;
use ops::{alive, id, ping, quit, run_action, show_status, validate, OutputFormat};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line client for a running watchkeep daemon.
#[derive(Parser)]
#[command(
    name = "watchkeep",
    author,
    version,
    about = "Control a watchkeep daemon over HTTP"
)]
struct Cli {
    /// Daemon base url
    #[arg(long, env = "WK_URL", default_value = "http://127.0.0.1:2812")]
    url: String,

    /// Basic auth user
    #[arg(long, env = "WK_USER")]
    user: Option<String>,

    /// Basic auth password
    #[arg(long, env = "WK_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Status output format
    #[arg(long, value_enum, default_value = "text")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the status report
    Status {
        /// One line per service
        #[arg(long)]
        summary: bool,
    },
    /// Start services
    Start(Targets),
    /// Stop services
    Stop(Targets),
    /// Restart services
    Restart(Targets),
    /// Enable monitoring
    Monitor(Targets),
    /// Disable monitoring
    Unmonitor(Targets),
    /// Wake the daemon for an immediate check cycle
    Validate,
    /// Stop the daemon's http server
    Quit,
    /// Check that the http server answers
    Ping,
    /// Print the daemon id
    Id,
    /// Check that the daemon process is alive
    Alive,
}

#[derive(clap::Args)]
struct Targets {
    #[arg(required = true)]
    names: Vec<String>,
    /// Opaque token recorded with the request
    #[arg(long)]
    token: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    init_tracing();
    let cli = Cli::parse();
    let endpoint = Endpoint::new(&cli.url, cli.user, cli.password)?;

    match cli.command {
        Commands::Status { summary } => show_status(&endpoint, cli.format, summary).await?,
        Commands::Start(t) => run_action(&endpoint, "start", &t.names, t.token.as_deref()).await?,
        Commands::Stop(t) => run_action(&endpoint, "stop", &t.names, t.token.as_deref()).await?,
        Commands::Restart(t) => {
            run_action(&endpoint, "restart", &t.names, t.token.as_deref()).await?
        }
        Commands::Monitor(t) => {
            run_action(&endpoint, "monitor", &t.names, t.token.as_deref()).await?
        }
        Commands::Unmonitor(t) => {
            run_action(&endpoint, "unmonitor", &t.names, t.token.as_deref()).await?
        }
        Commands::Validate => validate(&endpoint).await?,
        Commands::Quit => quit(&endpoint).await?,
        Commands::Ping => ping(&endpoint).await?,
        Commands::Id => id(&endpoint).await?,
        Commands::Alive => alive(&endpoint).await?,
    }

    Ok(())
}

fn init_tracing() {
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);
    let filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into());
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clap_parses() {
        let cli = Cli::parse_from(["watchkeep", "--format", "xml", "status", "--summary"]);
        assert!(matches!(cli.command, Commands::Status { summary: true }));
        assert!(matches!(cli.format, OutputFormat::Xml));
    }

    #[test]
    fn actions_take_several_names() {
        let cli = Cli::parse_from(["watchkeep", "restart", "nginx", "postgres", "--token", "t"]);
        let Commands::Restart(t) = cli.command else {
            panic!("expected restart");
        };
        assert_eq!(t.names, ["nginx", "postgres"]);
        assert_eq!(t.token.as_deref(), Some("t"));
    }

    #[test]
    fn actions_need_a_name() {
        assert!(Cli::try_parse_from(["watchkeep", "stop"]).is_err());
    }
}
