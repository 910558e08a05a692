//! Protocol message types for client↔host communication.

#![allow(clippy::exhaustive_structs)]

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::OpCode;

/// Body of commands that carry no arguments. Serializes as `{}`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Empty {}

/// Body of [`Command::SendText`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendText {
    /// Recipient wxid (user or room).
    pub wxid: String,
    /// Message text.
    pub content: String,
}

/// Body of [`Command::SendImage`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendImage {
    /// Recipient wxid.
    pub wxid: String,
    /// URL the host downloads the image from.
    pub image_url: String,
}

/// Body of [`Command::SendFile`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendFile {
    /// Recipient wxid.
    pub wxid: String,
    /// URL the host downloads the file from.
    pub file_url: String,
}

/// Body of [`Command::SendCard`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendCard {
    /// Recipient wxid.
    pub wxid: String,
    /// Card XML.
    pub xml: String,
}

/// Body of [`Command::SendXml`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendXml {
    /// Host-defined XML message type.
    #[serde(rename = "type")]
    pub xml_type: String,
    /// Recipient wxid.
    pub wxid: String,
    /// Apparent sender wxid.
    pub from_wxid: String,
    /// Thumbnail URL.
    pub image_url: String,
    /// Message XML.
    pub xml: String,
}

/// Body of [`Command::FriendAdd`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FriendAdd {
    /// Target wxid.
    pub wxid: String,
    /// Greeting shown with the request.
    pub message: String,
}

/// Body of [`Command::FriendAddFromV1`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FriendAddFromV1 {
    /// v1 token of the target.
    pub v1: String,
    /// Greeting shown with the request.
    pub message: String,
}

/// Body of [`Command::FriendDelete`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FriendDelete {
    /// Friend to delete.
    pub wxid: String,
}

/// Body of [`Command::FriendVerify`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FriendVerify {
    /// v1 token from the friend request.
    pub v1: String,
    /// v2 token from the friend request.
    pub v2: String,
}

/// Body of [`Command::FriendRemark`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FriendRemark {
    /// Friend wxid.
    pub wxid: String,
    /// New remark.
    pub remark: String,
}

/// Body of [`Command::RoomCreate`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomCreate {
    /// First initial member.
    pub wxid1: String,
    /// Second initial member.
    pub wxid2: String,
}

/// Body of [`Command::RoomEditName`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomEditName {
    /// Room identifier.
    pub room_id: String,
    /// New room name.
    pub room_name: String,
}

/// Body of [`Command::RoomAnnouncement`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomAnnouncement {
    /// Room identifier.
    pub room_id: String,
    /// Announcement text.
    pub announcement: String,
}

/// Body of commands addressing a room only
/// ([`Command::RoomMemberList`], [`Command::RoomQuit`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomRef {
    /// Room identifier.
    pub room_id: String,
}

/// Body of commands addressing one member of a room
/// ([`Command::RoomAddMember`], [`Command::RoomDeleteMember`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomMember {
    /// Room identifier.
    pub room_id: String,
    /// Member wxid.
    pub wxid: String,
}

/// Body of [`Command::RoomAtMember`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomAtMember {
    /// Room identifier.
    pub room_id: String,
    /// Mentioned member.
    pub wxid: String,
    /// Display name used in the mention.
    pub nickname: String,
    /// Message text following the mention.
    pub message: String,
}

/// Body of [`Command::TransferRecv`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferRecv {
    /// Sender of the transfer.
    pub wxid: String,
    /// Host-assigned transfer identifier.
    pub transfer_id: String,
}

/// Command sent from client to host.
///
/// Serializes as its body only; the op code travels in the envelope
/// (see [`Command::op_code`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
#[non_exhaustive]
pub enum Command {
    /// Open a new session.
    Open(Empty),
    /// Quit a session.
    Quit(Empty),
    /// Query login status.
    GetLoginStatus(Empty),
    /// Query login information.
    GetLoginInfo(Empty),
    /// Send a text message.
    SendText(SendText),
    /// Send an image.
    SendImage(SendImage),
    /// Send a file.
    SendFile(SendFile),
    /// Send a contact card.
    SendCard(SendCard),
    /// Send raw XML.
    SendXml(SendXml),
    /// Add a friend by wxid.
    FriendAdd(FriendAdd),
    /// Add a friend from a v1 token.
    FriendAddFromV1(FriendAddFromV1),
    /// Delete a friend.
    FriendDelete(FriendDelete),
    /// Accept a friend request.
    FriendVerify(FriendVerify),
    /// List friends.
    FriendList(Empty),
    /// Set a friend remark.
    FriendRemark(FriendRemark),
    /// Create a room.
    RoomCreate(RoomCreate),
    /// Rename a room.
    RoomEditName(RoomEditName),
    /// Post a room announcement.
    RoomAnnouncement(RoomAnnouncement),
    /// List room members.
    RoomMemberList(RoomRef),
    /// Add a room member.
    RoomAddMember(RoomMember),
    /// Remove a room member.
    RoomDeleteMember(RoomMember),
    /// Mention a room member.
    RoomAtMember(RoomAtMember),
    /// Leave a room.
    RoomQuit(RoomRef),
    /// Accept a transfer.
    TransferRecv(TransferRecv),
}

impl Command {
    /// The fixed op code of this command.
    pub const fn op_code(&self) -> OpCode {
        match self {
            Self::Open(_) => OpCode::Open,
            Self::Quit(_) => OpCode::Quit,
            Self::GetLoginStatus(_) => OpCode::GetLoginStatus,
            Self::GetLoginInfo(_) => OpCode::LoginInfo,
            Self::SendText(_) => OpCode::SendText,
            Self::SendImage(_) => OpCode::SendImage,
            Self::SendFile(_) => OpCode::SendFile,
            Self::SendCard(_) => OpCode::SendCard,
            Self::SendXml(_) => OpCode::SendXml,
            Self::FriendAdd(_) => OpCode::FriendAdd,
            Self::FriendAddFromV1(_) => OpCode::FriendAddFromV1,
            Self::FriendDelete(_) => OpCode::FriendDelete,
            Self::FriendVerify(_) => OpCode::FriendVerify,
            Self::FriendList(_) => OpCode::FriendList,
            Self::FriendRemark(_) => OpCode::FriendRemark,
            Self::RoomCreate(_) => OpCode::RoomCreate,
            Self::RoomEditName(_) => OpCode::RoomEditName,
            Self::RoomAnnouncement(_) => OpCode::RoomAnnouncement,
            Self::RoomMemberList(_) => OpCode::RoomMemberList,
            Self::RoomAddMember(_) => OpCode::RoomAddMember,
            Self::RoomDeleteMember(_) => OpCode::RoomDeleteMember,
            Self::RoomAtMember(_) => OpCode::RoomAtMember,
            Self::RoomQuit(_) => OpCode::RoomQuit,
            Self::TransferRecv(_) => OpCode::TransferRecv,
        }
    }

    /// Rebuilds a command from its op code and JSON body.
    ///
    /// Returns `None` when `op` is not a command code; the inner error
    /// reports a body that does not match the shape `op` requires.
    pub fn from_parts(op: OpCode, body: Value) -> Option<serde_json::Result<Self>> {
        use serde_json::from_value as body_of;

        let cmd = match op {
            OpCode::Open => body_of(body).map(Self::Open),
            OpCode::Quit => body_of(body).map(Self::Quit),
            OpCode::GetLoginStatus => body_of(body).map(Self::GetLoginStatus),
            OpCode::LoginInfo => body_of(body).map(Self::GetLoginInfo),
            OpCode::SendText => body_of(body).map(Self::SendText),
            OpCode::SendImage => body_of(body).map(Self::SendImage),
            OpCode::SendFile => body_of(body).map(Self::SendFile),
            OpCode::SendCard => body_of(body).map(Self::SendCard),
            OpCode::SendXml => body_of(body).map(Self::SendXml),
            OpCode::FriendAdd => body_of(body).map(Self::FriendAdd),
            OpCode::FriendAddFromV1 => body_of(body).map(Self::FriendAddFromV1),
            OpCode::FriendDelete => body_of(body).map(Self::FriendDelete),
            OpCode::FriendVerify => body_of(body).map(Self::FriendVerify),
            OpCode::FriendList => body_of(body).map(Self::FriendList),
            OpCode::FriendRemark => body_of(body).map(Self::FriendRemark),
            OpCode::RoomCreate => body_of(body).map(Self::RoomCreate),
            OpCode::RoomEditName => body_of(body).map(Self::RoomEditName),
            OpCode::RoomAnnouncement => body_of(body).map(Self::RoomAnnouncement),
            OpCode::RoomMemberList => body_of(body).map(Self::RoomMemberList),
            OpCode::RoomAddMember => body_of(body).map(Self::RoomAddMember),
            OpCode::RoomDeleteMember => body_of(body).map(Self::RoomDeleteMember),
            OpCode::RoomAtMember => body_of(body).map(Self::RoomAtMember),
            OpCode::RoomQuit => body_of(body).map(Self::RoomQuit),
            OpCode::TransferRecv => body_of(body).map(Self::TransferRecv),
            OpCode::Ready
            | OpCode::Success
            | OpCode::Failure
            | OpCode::QrCode
            | OpCode::MessageReceive => return None,
        };
        Some(cmd)
    }
}

/// Decoded inbound envelope.
///
/// Host events carry free-form bodies, so the body is kept as JSON and
/// interpreted by the handlers registered for [`Envelope::op`].
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub struct Envelope {
    /// Session the envelope is addressed to, if the host included one.
    pub account_id: Option<String>,
    /// Real WeChat identifier. QR-code events carry it to rename the
    /// oldest pending session.
    pub wechat_id: Option<String>,
    /// Operation code, always present in the catalog.
    pub op: OpCode,
    /// Body, if the host included one.
    pub body: Option<Value>,
}

impl Envelope {
    /// Account the envelope is delivered to: `accountId`, or `wechatId`
    /// when the host sent only that.
    pub fn target(&self) -> Option<&str> {
        self.account_id.as_deref().or(self.wechat_id.as_deref())
    }
}

/// Inbound wire shape, before op code validation.
#[derive(Debug, Deserialize)]
pub struct RawFrame {
    /// `accountId` as sent.
    #[serde(rename = "accountId", default)]
    pub account_id: Option<String>,
    /// `wechatId` as sent.
    #[serde(rename = "wechatId", default)]
    pub wechat_id: Option<String>,
    /// Unvalidated `opCode`.
    #[serde(rename = "opCode", default)]
    pub op_code: Option<Value>,
    /// Free-form body.
    #[serde(default)]
    pub body: Option<Value>,
}

/// Outbound wire shape. Field order is the wire order.
#[derive(Debug, Serialize)]
pub struct OutFrame<'a> {
    /// Sending account.
    #[serde(rename = "accountId")]
    pub account_id: &'a str,
    /// Numeric op code of `body`.
    #[serde(rename = "opCode")]
    pub op_code: u8,
    /// Command body.
    pub body: &'a Command,
}
