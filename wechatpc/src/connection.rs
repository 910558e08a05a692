//! Connection to the automation host.
//!
//! A [`Connection`] is the context object every operation goes through: it
//! owns the socket, the account registry and the rebinding queue. Clones
//! share the same connection, so a clone can be moved into the task running
//! [`Connection::run`] while others issue commands.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use wechatpc_proto::{Command, Empty};

use crate::account::Account;
use crate::dispatch::dispatch_frame;
use crate::rebind::RebindQueue;
use crate::registry::Registry;
use crate::ws::{self, Inbound, WsReader, WsWriter};
use crate::{Error, Result, lock};

/// Handle to the single socket shared by all accounts.
#[derive(Debug, Clone)]
pub struct Connection {
    /// State shared by all clones.
    inner: Arc<Inner>,
}

/// Shared connection state.
#[derive(Debug)]
struct Inner {
    /// URL the socket was opened with.
    url: String,
    /// Serializes writes: concurrent senders go out in lock order.
    writer: tokio::sync::Mutex<Option<WsWriter>>,
    /// Taken by the receive loop; `None` once it has started.
    reader: Mutex<Option<WsReader>>,
    /// Set once the socket is closed by either side.
    closed: AtomicBool,
    /// Accounts by current identifier.
    registry: Registry,
    /// Opens awaiting a QR-code event.
    rebind: RebindQueue,
}

impl Connection {
    /// Opens the socket to the automation host. No retry is attempted.
    pub async fn connect(url: impl Into<String>) -> Result<Self> {
        let target: String = url.into();
        let (writer, reader) = ws::connect(&target)
            .await
            .map_err(|source| Error::Connect {
                url: target.clone(),
                source,
            })?;
        tracing::info!(url = %target, "connected to automation host");
        Ok(Self::from_parts(target, Some(writer), Some(reader)))
    }

    /// A connection with no socket, for exercising registry and dispatch.
    #[cfg(test)]
    pub(crate) fn detached(url: &str) -> Self {
        Self::from_parts(url.to_owned(), None, None)
    }

    /// Wraps already-split socket halves.
    fn from_parts(url: String, writer: Option<WsWriter>, reader: Option<WsReader>) -> Self {
        let closed = writer.is_none();
        Self {
            inner: Arc::new(Inner {
                url,
                writer: tokio::sync::Mutex::new(writer),
                reader: Mutex::new(reader),
                closed: AtomicBool::new(closed),
                registry: Registry::default(),
                rebind: RebindQueue::default(),
            }),
        }
    }

    /// URL this connection was opened with.
    pub fn url(&self) -> &str {
        &self.inner.url
    }

    /// Whether the socket has closed (or was closed locally).
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    /// Returns the handle for `id`, creating it on first use.
    ///
    /// Accounts live as long as the connection; there is no removal.
    pub fn register_account(&self, id: impl AsRef<str>) -> Account {
        let state = self.inner.registry.get_or_insert(id.as_ref());
        Account::new(state, self.clone())
    }

    /// Looks up a registered account by its current identifier.
    pub fn account(&self, id: &str) -> Option<Account> {
        self.inner
            .registry
            .get(id)
            .map(|state| Account::new(state, self.clone()))
    }

    /// Identifiers of all registered accounts, sorted.
    pub fn accounts(&self) -> Vec<String> {
        self.inner.registry.ids()
    }

    /// Number of opened sessions still waiting for a QR-code event.
    pub fn pending_rebinds(&self) -> usize {
        self.inner.rebind.len()
    }

    /// Encodes and writes one envelope.
    ///
    /// Fails with [`Error::NotConnected`] if the socket is absent or closed.
    pub async fn send(&self, account_id: &str, cmd: &Command) -> Result<()> {
        let mut writer = self.inner.writer.lock().await;
        self.write_locked(writer.as_mut(), account_id, cmd).await
    }

    /// Queues `account_id` for rebinding and writes its open command.
    ///
    /// Both happen under the write lock, so the queue order always matches
    /// the order the opens reach the host. The placeholder stays queued if
    /// the write fails.
    pub(crate) async fn send_open(&self, account_id: &str) -> Result<()> {
        let mut writer = self.inner.writer.lock().await;
        self.inner.rebind.push(account_id.to_owned());
        self.write_locked(writer.as_mut(), account_id, &Command::Open(Empty {}))
            .await
    }

    /// Writes one envelope through an already locked writer.
    async fn write_locked(
        &self,
        writer: Option<&mut WsWriter>,
        account_id: &str,
        cmd: &Command,
    ) -> Result<()> {
        if self.is_closed() {
            return Err(Error::NotConnected);
        }
        let frame = wechatpc_proto::encode(account_id, cmd).map_err(Error::Encode)?;
        let Some(w) = writer else {
            return Err(Error::NotConnected);
        };
        tracing::debug!(account = account_id, op = %cmd.op_code(), %frame, "sending");
        w.send_text(frame).await.map_err(|e| {
            if matches!(
                e,
                tokio_tungstenite::tungstenite::Error::ConnectionClosed
                    | tokio_tungstenite::tungstenite::Error::AlreadyClosed
            ) {
                self.inner.closed.store(true, Ordering::Release);
            }
            Error::Send(e)
        })
    }

    /// Sends a close frame. [`Connection::run`] returns once the host
    /// acknowledges or the stream ends.
    pub async fn close(&self) -> Result<()> {
        self.inner.closed.store(true, Ordering::Release);
        let mut writer = self.inner.writer.lock().await;
        match writer.as_mut() {
            Some(w) => w.close().await.map_err(Error::Send),
            None => Ok(()),
        }
    }

    /// Receive loop: decodes each inbound frame and dispatches it until the
    /// socket closes.
    ///
    /// Frame-level failures are logged and skipped. Fails with
    /// [`Error::AlreadyRunning`] if the loop was already entered on this
    /// connection.
    pub async fn run(&self) -> Result<()> {
        let mut reader = lock(&self.inner.reader)
            .take()
            .ok_or(Error::AlreadyRunning)?;

        while let Some(next) = reader.recv().await {
            match next {
                Ok(Inbound::Text(text)) => {
                    tracing::trace!(%text, "inbound frame");
                    dispatch_frame(&self.inner.registry, &self.inner.rebind, &text);
                }
                Ok(Inbound::Other) => {}
                Ok(Inbound::Close { code, reason }) => {
                    tracing::info!(code, %reason, "host closed the connection");
                    break;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "read failed, stopping receive loop");
                    break;
                }
            }
        }

        self.inner.closed.store(true, Ordering::Release);
        *self.inner.writer.lock().await = None;
        tracing::info!(url = %self.inner.url, "receive loop ended");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn detached_connection_refuses_to_send() {
        let conn = Connection::detached("ws://unused");
        assert!(conn.is_closed());
        let r = conn
            .send("A1", &Command::FriendList(wechatpc_proto::Empty {}))
            .await;
        assert!(matches!(r, Err(Error::NotConnected)));
    }

    #[tokio::test]
    async fn failed_open_stays_queued() {
        let conn = Connection::detached("ws://unused");
        let r = conn.send_open("P1").await;
        assert!(matches!(r, Err(Error::NotConnected)));
        assert_eq!(conn.pending_rebinds(), 1);
    }

    #[tokio::test]
    async fn run_cannot_be_entered_without_reader() {
        let conn = Connection::detached("ws://unused");
        assert!(matches!(conn.run().await, Err(Error::AlreadyRunning)));
    }

    #[test]
    fn register_is_get_or_create() {
        let conn = Connection::detached("ws://unused");
        let a = conn.register_account("A1");
        let b = conn.register_account("A1");
        conn.register_account("B2");
        assert_eq!(a.id(), b.id());
        assert_eq!(conn.accounts(), vec!["A1".to_owned(), "B2".to_owned()]);
        assert!(conn.account("A1").is_some());
        assert!(conn.account("C3").is_none());
    }

    #[tokio::test]
    async fn connect_failure_is_reported() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let r = Connection::connect(format!("ws://{addr}")).await;
        assert!(matches!(r, Err(Error::Connect { .. })));
    }
}
