//! JSON text-frame codec.
//!
//! Each WebSocket text frame carries exactly one JSON object:
//! `{"accountId": <string>, "opCode": <integer>, "body": <object>}`.

use serde_json::Value;

use crate::message::{OutFrame, RawFrame};
use crate::{Command, Envelope, OpCode};

/// Reasons an inbound frame is rejected.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum DecodeError {
    /// The frame is not a JSON object of the expected shape.
    #[error("malformed frame: {0}")]
    Json(#[from] serde_json::Error),

    /// The object has no `opCode` field.
    #[error("frame has no opCode")]
    MissingOpCode,

    /// The `opCode` is not an integer in the catalog.
    #[error("unknown opCode {0}")]
    UnknownOpCode(Value),

    /// A command was expected but the op code names an event.
    #[error("{0} is not a command")]
    NotACommand(OpCode),

    /// The frame has no `accountId`.
    #[error("frame has no accountId")]
    MissingAccount,

    /// The body does not match the shape its op code requires.
    #[error("invalid body for {op}: {source}")]
    Body {
        /// Op code whose body failed to parse.
        op: OpCode,
        /// Underlying parse failure.
        source: serde_json::Error,
    },
}

/// Encodes `cmd` addressed to `account_id` as one text frame.
pub fn encode(account_id: &str, cmd: &Command) -> serde_json::Result<String> {
    serde_json::to_string(&OutFrame {
        account_id,
        op_code: cmd.op_code().code(),
        body: cmd,
    })
}

/// Decodes one inbound text frame.
///
/// Only the envelope is validated here; the body stays free-form JSON.
pub fn decode(text: &str) -> Result<Envelope, DecodeError> {
    let raw: RawFrame = serde_json::from_str(text)?;
    let code = raw.op_code.ok_or(DecodeError::MissingOpCode)?;
    let op = code
        .as_u64()
        .and_then(OpCode::from_code)
        .ok_or(DecodeError::UnknownOpCode(code))?;
    Ok(Envelope {
        account_id: raw.account_id,
        wechat_id: raw.wechat_id,
        op,
        body: raw.body,
    })
}

/// Decodes a frame produced by [`encode`] back into its account and command.
///
/// This is the host's view of the wire; the client uses it to verify what
/// it sends.
pub fn decode_command(text: &str) -> Result<(String, Command), DecodeError> {
    let env = decode(text)?;
    let account = env.account_id.ok_or(DecodeError::MissingAccount)?;
    let body = env.body.unwrap_or_else(|| Value::Object(serde_json::Map::new()));
    let cmd = Command::from_parts(env.op, body)
        .ok_or(DecodeError::NotACommand(env.op))?
        .map_err(|source| DecodeError::Body { op: env.op, source })?;
    Ok((account, cmd))
}
