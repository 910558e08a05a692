//! Error types for wechatpc operations.

pub use wechatpc_proto::DecodeError;

/// Alias for `Result<T, wechatpc::Error>`.
pub type Result<T> = std::result::Result<T, Error>;

/// Error a handler may return. It is logged and never propagated.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Errors returned by connection and account operations.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The socket to the automation host could not be opened.
    #[error("connect to {url}: {source}")]
    Connect {
        /// URL that was dialed.
        url: String,
        /// Transport failure.
        #[source]
        source: tokio_tungstenite::tungstenite::Error,
    },

    /// A send was attempted while the socket is absent or closed.
    #[error("not connected to the automation host")]
    NotConnected,

    /// Writing a frame to the socket failed.
    #[error("send failed: {0}")]
    Send(#[source] tokio_tungstenite::tungstenite::Error),

    /// A command could not be serialized into a frame.
    #[error("encode failed: {0}")]
    Encode(#[source] serde_json::Error),

    /// An inbound frame could not be decoded.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// A handler registration was rejected.
    #[error("invalid handler: {0}")]
    InvalidHandler(String),

    /// The receive loop is already running (or has run) on this connection.
    #[error("receive loop already running")]
    AlreadyRunning,
}
