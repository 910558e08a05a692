//! Wire protocol for the wechatpc automation host.
//!
//! Every message is a JSON object sent as one WebSocket text frame:
//! an account identifier, an integer operation code from [`OpCode`], and
//! a body whose shape the op code determines. Outbound bodies are the
//! closed [`Command`] enum; inbound events keep their body as JSON.

mod codec;
mod message;
mod opcode;

pub use codec::{DecodeError, decode, decode_command, encode};
pub use message::{
    Command, Empty, Envelope, FriendAdd, FriendAddFromV1, FriendDelete, FriendRemark,
    FriendVerify, RoomAnnouncement, RoomAtMember, RoomCreate, RoomEditName, RoomMember, RoomRef,
    SendCard, SendFile, SendImage, SendText, SendXml, TransferRecv,
};
pub use opcode::{Direction, OpCode};
