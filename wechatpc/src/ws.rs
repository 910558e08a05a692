//! WebSocket transport to the automation host.
//!
//! Thin wrapper around `tokio-tungstenite` that splits the socket into a
//! writer half (shared by every command sender) and a reader half (owned
//! by the receive loop).

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::{self, Message};

/// Client socket, plain or TLS.
type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

/// Frame read from the host, reduced to what the receive loop cares about.
#[derive(Debug)]
pub enum Inbound {
    /// UTF-8 text frame, one JSON envelope.
    Text(String),
    /// Control or binary frame; carries nothing for the protocol.
    Other,
    /// Host closed the socket.
    Close {
        /// Close code (1005 when the host sent none).
        code: u16,
        /// Close reason.
        reason: String,
    },
}

/// Write half of the socket.
#[derive(Debug)]
pub struct WsWriter {
    /// Outbound half.
    sink: SplitSink<WsStream, Message>,
}

impl WsWriter {
    /// Sends one text frame.
    pub(crate) async fn send_text(&mut self, text: String) -> tungstenite::Result<()> {
        self.sink.send(Message::text(text)).await
    }

    /// Sends a close frame and flushes.
    pub(crate) async fn close(&mut self) -> tungstenite::Result<()> {
        self.sink.close().await
    }
}

/// Read half of the socket.
#[derive(Debug)]
pub struct WsReader {
    /// Inbound half.
    stream: SplitStream<WsStream>,
}

impl WsReader {
    /// Receives the next frame, returning `None` when the stream ends.
    pub(crate) async fn recv(&mut self) -> Option<tungstenite::Result<Inbound>> {
        let msg = match self.stream.next().await? {
            Ok(msg) => msg,
            Err(e) => return Some(Err(e)),
        };
        Some(Ok(match msg {
            Message::Text(text) => Inbound::Text(text.as_str().to_owned()),
            Message::Close(Some(frame)) => Inbound::Close {
                code: frame.code.into(),
                reason: frame.reason.as_str().to_owned(),
            },
            Message::Close(None) => Inbound::Close {
                code: 1005,
                reason: String::new(),
            },
            Message::Binary(_) | Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => {
                Inbound::Other
            }
        }))
    }
}

/// Performs the WebSocket handshake with `url`.
pub async fn connect(url: &str) -> tungstenite::Result<(WsWriter, WsReader)> {
    let (ws, _response) = tokio_tungstenite::connect_async(url).await?;
    let (sink, stream) = ws.split();
    Ok((WsWriter { sink }, WsReader { stream }))
}
