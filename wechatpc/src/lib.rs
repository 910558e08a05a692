//! Client for driving WeChat PC sessions through an automation host.
//!
//! One [`Connection`] carries a WebSocket to the host and multiplexes any
//! number of [`Account`]s over it. Commands go out as JSON envelopes; host
//! events are routed to the handlers each account registered for the
//! event's op code.
//!
//! # Quick start
//!
//! ```no_run
//! use wechatpc::{Connection, Event, HandlerError, OpCode};
//!
//! async fn on_message(event: Event) -> Result<(), HandlerError> {
//!     println!("{}: {}", event.account_id, event.body);
//!     Ok(())
//! }
//!
//! # async fn demo() -> wechatpc::Result<()> {
//! let conn = Connection::connect("ws://127.0.0.1:5678").await?;
//! let account = conn.register_account("1234567890ABCDEFGHIJKLMNOPQRSTUV");
//!
//! account.add_handler(OpCode::MessageReceive, on_message)?;
//!
//! account.open().await?;
//! conn.run().await
//! # }
//! ```
//!
//! # Rebinding
//!
//! A session's real identifier is only known once the host reports a login
//! QR code. [`Account::open`] queues the account's placeholder identifier;
//! each QR-code event takes the oldest queued account and, if the event
//! carries a `wechatId`, renames the account to it. Handlers registered
//! under the placeholder keep working after the rename.

mod account;
mod connection;
mod dispatch;
mod error;
mod rebind;
mod registry;
mod ws;

use std::sync::{Mutex, MutexGuard, PoisonError};

pub use account::{Account, OpCodes};
pub use connection::Connection;
pub use dispatch::Event;
pub use error::{DecodeError, Error, HandlerError, Result};
pub use wechatpc_proto::{self as proto, Command, OpCode};

/// Locks `m`, recovering the data if a previous holder panicked.
pub(crate) fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}
