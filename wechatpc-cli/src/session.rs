//! Session commands: listen for events, send a message.

use std::future::{Ready, ready};

use anyhow::{Context, Result};
use wechatpc::{Account, Connection, Event, HandlerError, OpCode};

/// Identifier used when `listen` is given no `--account`. The host replaces
/// it with the real wxid once the login QR code is scanned.
const DEFAULT_PLACEHOLDER: &str = "1234567890ABCDEFGHIJKLMNOPQRSTUV";

/// Arguments for `wechatpc listen`.
#[derive(clap::Args)]
pub struct ListenArgs {
    /// Account identifier to register (repeatable).
    #[arg(short = 'a', long = "account")]
    pub accounts: Vec<String>,

    /// Open a new session for each account before listening.
    #[arg(long)]
    pub open: bool,
}

/// Arguments for `wechatpc send-text`.
#[derive(clap::Args)]
pub struct SendTextArgs {
    /// Sending account identifier.
    #[arg(short = 'a', long = "account")]
    pub account: String,

    /// Recipient wxid (user or room).
    #[arg(long)]
    pub to: String,

    /// Message text.
    pub content: String,
}

/// Prints an event as one JSON line on stdout.
fn print_event(event: Event) -> Ready<Result<(), HandlerError>> {
    let Event {
        account_id,
        op,
        body,
        ..
    } = event;
    let line = serde_json::json!({
        "account": account_id,
        "op": op.name(),
        "code": op.code(),
        "body": body,
    });
    println!("{line}");
    ready(Ok(()))
}

/// Runs the receive loop until the host hangs up or Ctrl-C.
pub async fn listen(url: &str, args: ListenArgs) -> Result<()> {
    let conn = Connection::connect(url).await?;

    let ids = if args.accounts.is_empty() {
        vec![DEFAULT_PLACEHOLDER.to_owned()]
    } else {
        args.accounts
    };
    let events: Vec<OpCode> = OpCode::ALL.into_iter().filter(|op| op.is_event()).collect();
    let accounts: Vec<Account> = ids.iter().map(|id| conn.register_account(id)).collect();
    for account in &accounts {
        account.add_handler(events.clone(), print_event)?;
    }

    let receiver = conn.clone();
    let mut runner = tokio::spawn(async move { receiver.run().await });

    if args.open {
        for account in &accounts {
            account
                .open()
                .await
                .with_context(|| format!("open session {}", account.id()))?;
        }
    }

    let interrupted = tokio::select! {
        res = &mut runner => {
            res.context("receive loop task failed")??;
            false
        }
        sig = tokio::signal::ctrl_c() => {
            sig.context("install Ctrl-C handler")?;
            true
        }
    };
    if interrupted {
        tracing::info!("interrupted, closing connection");
        conn.close().await?;
        runner.await.context("receive loop task failed")??;
    }

    tracing::info!(accounts = ?conn.accounts(), "listener stopped");
    Ok(())
}

/// Sends a single text message and closes the connection.
pub async fn send_text(url: &str, args: &SendTextArgs) -> Result<()> {
    let conn = Connection::connect(url).await?;
    let account = conn.register_account(&args.account);
    account
        .send_text(&args.to, &args.content)
        .await
        .with_context(|| format!("send text as {}", args.account))?;
    conn.close().await?;
    Ok(())
}
