//! CLI for driving WeChat PC sessions through an automation host.

#![allow(
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::missing_docs_in_private_items
)]

mod session;

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use tracing_subscriber::EnvFilter;
use wechatpc::{OpCode, proto::Direction};

#[derive(Parser)]
#[command(name = "wechatpc", version, about = "Drive WeChat PC sessions over an automation host")]
struct Cli {
    /// WebSocket URL of the automation host.
    #[arg(long, global = true, env = "WECHATPC_URL", default_value = "ws://127.0.0.1:5678")]
    url: String,

    /// Log filter used when `RUST_LOG` is unset (e.g. `debug`, `wechatpc=trace`).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Register accounts and print every host event as a JSON line.
    Listen(session::ListenArgs),

    /// Send one text message and exit.
    SendText(session::SendTextArgs),

    /// List the operation code catalog.
    Codes {
        /// Output format.
        #[arg(long, default_value = "table")]
        format: OutputFormat,
    },

    /// Generate shell completion scripts.
    #[command(hide = true)]
    Completion {
        /// Target shell.
        shell: Shell,
    },
}

/// Output format for listings.
#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
pub(crate) enum OutputFormat {
    /// Human-readable table.
    #[default]
    Table,
    /// Machine-readable JSON.
    Json,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);
    if let Err(e) = cli.dispatch().await {
        eprintln!("wechatpc: {e:#}");
        std::process::exit(1);
    }
}

impl Cli {
    async fn dispatch(self) -> Result<()> {
        match self.command {
            Command::Listen(args) => session::listen(&self.url, args).await,
            Command::SendText(args) => session::send_text(&self.url, &args).await,
            Command::Codes { format } => codes(format),
            Command::Completion { shell } => {
                clap_complete::generate(
                    shell,
                    &mut Self::command(),
                    "wechatpc",
                    &mut std::io::stdout(),
                );
                Ok(())
            }
        }
    }
}

/// Installs the stderr log subscriber. `RUST_LOG` wins over `--log-level`.
fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

const fn direction_label(d: Direction) -> &'static str {
    match d {
        Direction::Command => "client->host",
        Direction::Event => "host->client",
        Direction::Both => "both",
        _ => "unknown",
    }
}

fn codes(format: OutputFormat) -> Result<()> {
    if matches!(format, OutputFormat::Json) {
        let list: Vec<_> = OpCode::ALL
            .iter()
            .map(|op| {
                serde_json::json!({
                    "code": op.code(),
                    "name": op.name(),
                    "direction": direction_label(op.direction()),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&list)?);
        return Ok(());
    }

    println!("{:<6} {:<20} {}", "CODE", "NAME", "DIRECTION");
    for op in OpCode::ALL {
        println!(
            "0x{:02x}  {:<20} {}",
            op.code(),
            op.name(),
            direction_label(op.direction())
        );
    }
    Ok(())
}
