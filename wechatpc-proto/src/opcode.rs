//! Operation code catalog.
//!
//! Codes are a stable contract with the automation host: new operations
//! are added with new codes, existing codes never change meaning.

use std::fmt;

/// Which side of the connection originates an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum Direction {
    /// Sent by this client to the host.
    Command,
    /// Sent by the host to this client.
    Event,
    /// Used both as a query command and as the host's reply event.
    Both,
}

/// Integer discriminant selecting the meaning and body shape of an envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[non_exhaustive]
pub enum OpCode {
    /// Host finished starting up and accepts commands.
    Ready,
    /// Generic success reply.
    Success,
    /// Generic failure reply.
    Failure,
    /// Open a new session.
    Open,
    /// Quit (log out of) a session.
    Quit,
    /// Query the login status of a session.
    GetLoginStatus,
    /// Send a text message.
    SendText,
    /// Send an image by URL.
    SendImage,
    /// Send a file by URL.
    SendFile,
    /// Send a contact card.
    SendCard,
    /// Send a raw XML message.
    SendXml,
    /// Add a friend by wxid.
    FriendAdd,
    /// Add a friend from a v1 token.
    FriendAddFromV1,
    /// Delete a friend.
    FriendDelete,
    /// Accept a friend request (v1 + v2 tokens).
    FriendVerify,
    /// List friends.
    FriendList,
    /// Set a friend's remark.
    FriendRemark,
    /// Create a group room.
    RoomCreate,
    /// Rename a group room.
    RoomEditName,
    /// Post a group announcement.
    RoomAnnouncement,
    /// List the members of a group room.
    RoomMemberList,
    /// Add a member to a group room.
    RoomAddMember,
    /// Remove a member from a group room.
    RoomDeleteMember,
    /// Mention a member in a group room.
    RoomAtMember,
    /// Leave a group room.
    RoomQuit,
    /// Accept an incoming transfer.
    TransferRecv,
    /// A login QR code is available. Triggers identity rebinding.
    QrCode,
    /// Login information of the current account.
    LoginInfo,
    /// An inbound chat message was received.
    MessageReceive,
}

impl OpCode {
    /// Every code in the catalog, in ascending numeric order.
    pub const ALL: [Self; 29] = [
        Self::Ready,
        Self::Success,
        Self::Failure,
        Self::Open,
        Self::Quit,
        Self::GetLoginStatus,
        Self::SendText,
        Self::SendImage,
        Self::SendFile,
        Self::SendCard,
        Self::SendXml,
        Self::FriendAdd,
        Self::FriendAddFromV1,
        Self::FriendDelete,
        Self::FriendVerify,
        Self::FriendList,
        Self::FriendRemark,
        Self::RoomCreate,
        Self::RoomEditName,
        Self::RoomAnnouncement,
        Self::RoomMemberList,
        Self::RoomAddMember,
        Self::RoomDeleteMember,
        Self::RoomAtMember,
        Self::RoomQuit,
        Self::TransferRecv,
        Self::QrCode,
        Self::LoginInfo,
        Self::MessageReceive,
    ];

    /// Numeric wire value.
    pub const fn code(self) -> u8 {
        match self {
            Self::Ready => 0x00,
            Self::Success => 0x01,
            Self::Failure => 0x02,
            Self::Open => 0x10,
            Self::Quit => 0x11,
            Self::GetLoginStatus => 0x12,
            Self::SendText => 0x20,
            Self::SendImage => 0x21,
            Self::SendFile => 0x22,
            Self::SendCard => 0x23,
            Self::SendXml => 0x24,
            Self::FriendAdd => 0x30,
            Self::FriendAddFromV1 => 0x31,
            Self::FriendDelete => 0x32,
            Self::FriendVerify => 0x33,
            Self::FriendList => 0x34,
            Self::FriendRemark => 0x35,
            Self::RoomCreate => 0x40,
            Self::RoomEditName => 0x41,
            Self::RoomAnnouncement => 0x42,
            Self::RoomMemberList => 0x43,
            Self::RoomAddMember => 0x44,
            Self::RoomDeleteMember => 0x45,
            Self::RoomAtMember => 0x46,
            Self::RoomQuit => 0x47,
            Self::TransferRecv => 0x50,
            Self::QrCode => 0x90,
            Self::LoginInfo => 0x91,
            Self::MessageReceive => 0x92,
        }
    }

    /// Looks up a wire value in the catalog.
    pub fn from_code(code: u64) -> Option<Self> {
        Self::ALL.into_iter().find(|op| u64::from(op.code()) == code)
    }

    /// Which side originates this operation.
    pub const fn direction(self) -> Direction {
        match self {
            Self::Ready | Self::Success | Self::Failure | Self::QrCode | Self::MessageReceive => {
                Direction::Event
            }
            Self::LoginInfo => Direction::Both,
            _ => Direction::Command,
        }
    }

    /// Whether the host can deliver this code to the client.
    pub const fn is_event(self) -> bool {
        matches!(self.direction(), Direction::Event | Direction::Both)
    }

    /// Whether the client can send this code to the host.
    pub const fn is_command(self) -> bool {
        matches!(self.direction(), Direction::Command | Direction::Both)
    }

    /// Short kebab-case name, used in logs and listings.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Ready => "ready",
            Self::Success => "success",
            Self::Failure => "failure",
            Self::Open => "open",
            Self::Quit => "quit",
            Self::GetLoginStatus => "get-login-status",
            Self::SendText => "send-text",
            Self::SendImage => "send-image",
            Self::SendFile => "send-file",
            Self::SendCard => "send-card",
            Self::SendXml => "send-xml",
            Self::FriendAdd => "friend-add",
            Self::FriendAddFromV1 => "friend-add-from-v1",
            Self::FriendDelete => "friend-delete",
            Self::FriendVerify => "friend-verify",
            Self::FriendList => "friend-list",
            Self::FriendRemark => "friend-remark",
            Self::RoomCreate => "room-create",
            Self::RoomEditName => "room-edit-name",
            Self::RoomAnnouncement => "room-announcement",
            Self::RoomMemberList => "room-member-list",
            Self::RoomAddMember => "room-add-member",
            Self::RoomDeleteMember => "room-delete-member",
            Self::RoomAtMember => "room-at-member",
            Self::RoomQuit => "room-quit",
            Self::TransferRecv => "transfer-recv",
            Self::QrCode => "qrcode",
            Self::LoginInfo => "login-info",
            Self::MessageReceive => "message-receive",
        }
    }
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(0x{:02x})", self.name(), self.code())
    }
}

impl From<OpCode> for u8 {
    fn from(op: OpCode) -> Self {
        op.code()
    }
}
