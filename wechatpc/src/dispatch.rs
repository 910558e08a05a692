//! Inbound dispatch: rebinding check, handler lookup, task scheduling.
//!
//! [`dispatch_frame`] runs synchronously inside the receive loop, so frames
//! are processed strictly in arrival order. Handlers for one event run in a
//! spawned task, one after another in registration order; the loop never
//! waits for them. Tasks spawned for different events may interleave.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use serde::de::DeserializeOwned;
use serde_json::Value;
use wechatpc_proto::OpCode;

use crate::HandlerError;
use crate::rebind::RebindQueue;
use crate::registry::Registry;

/// Type-erased async handler.
pub type Handler =
    Arc<dyn Fn(Event) -> BoxFuture<'static, Result<(), HandlerError>> + Send + Sync>;

/// Event delivered to a handler.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub struct Event {
    /// Account the event was delivered to (after any rebind).
    pub account_id: String,
    /// Event code.
    pub op: OpCode,
    /// Event body as sent by the host.
    pub body: Value,
}

impl Event {
    /// Deserializes the body into `T`.
    pub fn body_as<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        T::deserialize(&self.body)
    }
}

/// Processes one inbound text frame.
///
/// A QR-code event pops the oldest pending placeholder and, when it carries
/// a `wechatId`, renames that account to it. The event is then delivered to
/// its `accountId` (or its `wechatId` if that is the only identifier); an
/// `accountId` naming the placeholder just renamed follows the rename.
///
/// Never fails: malformed frames and events for unknown accounts are
/// logged and dropped.
pub fn dispatch_frame(registry: &Registry, rebind: &RebindQueue, text: &str) {
    let env = match wechatpc_proto::decode(text) {
        Ok(env) => env,
        Err(e) => {
            tracing::warn!(error = %e, "dropping inbound frame");
            return;
        }
    };
    tracing::debug!(
        account = ?env.account_id,
        wechat_id = ?env.wechat_id,
        op = %env.op,
        "received event"
    );

    let mut target = env.target().map(str::to_owned);
    if env.op == OpCode::QrCode
        && let Some(placeholder) = rebind.pop()
    {
        match env.wechat_id.as_deref() {
            Some(real) => {
                if registry.rebind(&placeholder, real).is_some() {
                    tracing::info!(%placeholder, account = real, "account rebound");
                    if target.as_deref() == Some(placeholder.as_str()) {
                        target = Some(real.to_owned());
                    }
                } else {
                    tracing::warn!(%placeholder, "rebind target no longer registered");
                }
            }
            None => tracing::warn!(%placeholder, "qrcode event without wechatId, not rebinding"),
        }
    }

    let (Some(account_id), Some(body)) = (target, env.body) else {
        return;
    };
    let Some(state) = registry.get(&account_id) else {
        tracing::debug!(account = %account_id, "event for unregistered account");
        return;
    };
    let handlers = state.handlers_for(env.op);
    if handlers.is_empty() {
        return;
    }
    spawn_handlers(
        handlers,
        Event {
            account_id,
            op: env.op,
            body,
        },
    );
}

/// Runs `handlers` for `event` in a detached task.
fn spawn_handlers(handlers: Vec<Handler>, event: Event) {
    tokio::spawn(async move {
        for (index, handler) in handlers.iter().enumerate() {
            let call = AssertUnwindSafe(async { handler(event.clone()).await }).catch_unwind();
            match call.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => tracing::error!(
                    account = %event.account_id,
                    op = %event.op,
                    index,
                    error = %e,
                    "handler failed"
                ),
                Err(_) => tracing::error!(
                    account = %event.account_id,
                    op = %event.op,
                    index,
                    "handler panicked"
                ),
            }
        }
    });
}
