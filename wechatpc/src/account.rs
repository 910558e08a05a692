//! Account handles: one per remote session.
//!
//! An [`Account`] is a cheap clone of a shared [`AccountState`] plus the
//! connection it sends through. The registry keys the same state by the
//! account's current identifier, so a rebind renames the key without
//! touching registered handlers or in-flight handler tasks.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use futures_util::FutureExt;
use wechatpc_proto::{
    Command, Empty, FriendAdd, FriendAddFromV1, FriendDelete, FriendRemark, FriendVerify, OpCode,
    RoomAnnouncement, RoomAtMember, RoomCreate, RoomEditName, RoomMember, RoomRef, SendCard,
    SendFile, SendImage, SendText, SendXml, TransferRecv,
};

use crate::dispatch::{Event, Handler};
use crate::{Connection, Error, HandlerError, Result, lock};

/// Shared per-session state referenced by both the registry and handles.
pub struct AccountState {
    /// Current identifier; the registry key tracks it.
    id: Mutex<String>,
    /// Handlers per event code, in registration order.
    handlers: Mutex<HashMap<OpCode, Vec<Handler>>>,
}

impl AccountState {
    /// Fresh state with no handlers.
    pub(crate) fn new(id: String) -> Self {
        Self {
            id: Mutex::new(id),
            handlers: Mutex::new(HashMap::new()),
        }
    }

    /// Current identifier (placeholder until rebound).
    pub(crate) fn id(&self) -> String {
        lock(&self.id).clone()
    }

    /// Renames the session. Only the registry calls this, under its lock.
    pub(crate) fn set_id(&self, id: String) {
        *lock(&self.id) = id;
    }

    /// Appends `handler` to the list of every code in `codes`.
    pub(crate) fn add_handler(&self, codes: &[OpCode], handler: &Handler) {
        let mut map = lock(&self.handlers);
        for op in codes {
            map.entry(*op).or_default().push(Arc::clone(handler));
        }
    }

    /// Snapshot of the handlers for `op`, in registration order.
    pub(crate) fn handlers_for(&self, op: OpCode) -> Vec<Handler> {
        lock(&self.handlers).get(&op).cloned().unwrap_or_default()
    }
}

impl fmt::Debug for AccountState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let counts: HashMap<OpCode, usize> = lock(&self.handlers)
            .iter()
            .map(|(op, hs)| (*op, hs.len()))
            .collect();
        f.debug_struct("AccountState")
            .field("id", &self.id())
            .field("handlers", &counts)
            .finish()
    }
}

/// One or more op codes a handler subscribes to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpCodes(
    /// Codes as given, possibly repeated.
    Vec<OpCode>,
);

impl From<OpCode> for OpCodes {
    fn from(op: OpCode) -> Self {
        Self(vec![op])
    }
}

impl From<Vec<OpCode>> for OpCodes {
    fn from(ops: Vec<OpCode>) -> Self {
        Self(ops)
    }
}

impl From<&[OpCode]> for OpCodes {
    fn from(ops: &[OpCode]) -> Self {
        Self(ops.to_vec())
    }
}

impl<const N: usize> From<[OpCode; N]> for OpCodes {
    fn from(ops: [OpCode; N]) -> Self {
        Self(ops.to_vec())
    }
}

/// Client-side handle for one remote session.
///
/// Obtained from [`Connection::register_account`]. Clones share state.
#[derive(Debug, Clone)]
pub struct Account {
    /// Shared with the registry entry.
    state: Arc<AccountState>,
    /// Connection commands are written to.
    conn: Connection,
}

impl Account {
    /// Binds `state` to `conn`.
    pub(crate) const fn new(state: Arc<AccountState>, conn: Connection) -> Self {
        Self { state, conn }
    }

    /// Current identifier. Changes once if a QR-code event rebinds it.
    pub fn id(&self) -> String {
        self.state.id()
    }

    /// Registers an async handler for one or more event codes.
    ///
    /// Handlers for the same code run in registration order, each receiving
    /// the event. A handler's error or panic is logged and does not affect
    /// the others.
    ///
    /// Fails with [`Error::InvalidHandler`] if `codes` is empty or contains
    /// a code the host never sends.
    pub fn add_handler<F, Fut>(&self, codes: impl Into<OpCodes>, handler: F) -> Result<()>
    where
        F: Fn(Event) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<(), HandlerError>> + Send + 'static,
    {
        let OpCodes(mut ops) = codes.into();
        if ops.is_empty() {
            return Err(Error::InvalidHandler("no op codes given".into()));
        }
        if let Some(op) = ops.iter().find(|op| !op.is_event()) {
            return Err(Error::InvalidHandler(format!(
                "{op} is never delivered by the host"
            )));
        }
        ops.sort_unstable();
        ops.dedup();

        let boxed: Handler = Arc::new(move |event: Event| handler(event).boxed());
        self.state.add_handler(&ops, &boxed);
        tracing::debug!(account = %self.id(), codes = ?ops, "handler registered");
        Ok(())
    }

    /// Sends `cmd` stamped with this account's current identifier.
    pub async fn send(&self, cmd: &Command) -> Result<()> {
        self.conn.send(&self.id(), cmd).await
    }

    /// Opens the session on the host.
    ///
    /// The current identifier is queued for rebinding before the command
    /// is written, so the next QR-code event carrying a `wechatId` renames
    /// this account. Queueing and writing share the write lock, so
    /// concurrent opens are queued in wire order. Correlation is still by
    /// arrival order only: if the host answers two opens out of order, the
    /// two accounts end up with each other's identifiers.
    pub async fn open(&self) -> Result<()> {
        self.conn.send_open(&self.id()).await
    }

    /// Quits the session.
    pub async fn close(&self) -> Result<()> {
        self.send(&Command::Quit(Empty {})).await
    }

    /// Logs the session out. Same wire command as [`Account::close`].
    pub async fn logout(&self) -> Result<()> {
        self.close().await
    }

    /// Asks for the login status.
    pub async fn get_login_status(&self) -> Result<()> {
        self.send(&Command::GetLoginStatus(Empty {})).await
    }

    /// Asks for the logged-in account's information.
    pub async fn get_login_info(&self) -> Result<()> {
        self.send(&Command::GetLoginInfo(Empty {})).await
    }

    /// Sends a text message.
    pub async fn send_text(&self, wxid: &str, content: &str) -> Result<()> {
        self.send(&Command::SendText(SendText {
            wxid: wxid.into(),
            content: content.into(),
        }))
        .await
    }

    /// Sends an image the host downloads from `image_url`.
    pub async fn send_image(&self, wxid: &str, image_url: &str) -> Result<()> {
        self.send(&Command::SendImage(SendImage {
            wxid: wxid.into(),
            image_url: image_url.into(),
        }))
        .await
    }

    /// Sends a file the host downloads from `file_url`.
    pub async fn send_file(&self, wxid: &str, file_url: &str) -> Result<()> {
        self.send(&Command::SendFile(SendFile {
            wxid: wxid.into(),
            file_url: file_url.into(),
        }))
        .await
    }

    /// Sends a contact card.
    pub async fn send_card(&self, wxid: &str, xml: &str) -> Result<()> {
        self.send(&Command::SendCard(SendCard {
            wxid: wxid.into(),
            xml: xml.into(),
        }))
        .await
    }

    /// Sends a raw XML message.
    pub async fn send_xml(
        &self,
        xml_type: &str,
        wxid: &str,
        from_wxid: &str,
        image_url: &str,
        xml: &str,
    ) -> Result<()> {
        self.send(&Command::SendXml(SendXml {
            xml_type: xml_type.into(),
            wxid: wxid.into(),
            from_wxid: from_wxid.into(),
            image_url: image_url.into(),
            xml: xml.into(),
        }))
        .await
    }

    /// Sends a friend request by wxid.
    pub async fn add_friend(&self, wxid: &str, message: &str) -> Result<()> {
        self.send(&Command::FriendAdd(FriendAdd {
            wxid: wxid.into(),
            message: message.into(),
        }))
        .await
    }

    /// Sends a friend request from a v1 token.
    pub async fn add_friend_from_v1(&self, v1: &str, message: &str) -> Result<()> {
        self.send(&Command::FriendAddFromV1(FriendAddFromV1 {
            v1: v1.into(),
            message: message.into(),
        }))
        .await
    }

    /// Deletes a friend.
    pub async fn delete_friend(&self, wxid: &str) -> Result<()> {
        self.send(&Command::FriendDelete(FriendDelete { wxid: wxid.into() }))
            .await
    }

    /// Accepts a friend request.
    pub async fn verify_friend(&self, v1: &str, v2: &str) -> Result<()> {
        self.send(&Command::FriendVerify(FriendVerify {
            v1: v1.into(),
            v2: v2.into(),
        }))
        .await
    }

    /// Asks for the friend list.
    pub async fn get_friend_list(&self) -> Result<()> {
        self.send(&Command::FriendList(Empty {})).await
    }

    /// Sets a friend's remark.
    pub async fn set_friend_remark(&self, wxid: &str, remark: &str) -> Result<()> {
        self.send(&Command::FriendRemark(FriendRemark {
            wxid: wxid.into(),
            remark: remark.into(),
        }))
        .await
    }

    /// Creates a room with two initial members.
    pub async fn create_room(&self, wxid1: &str, wxid2: &str) -> Result<()> {
        self.send(&Command::RoomCreate(RoomCreate {
            wxid1: wxid1.into(),
            wxid2: wxid2.into(),
        }))
        .await
    }

    /// Renames a room.
    pub async fn edit_room_name(&self, room_id: &str, room_name: &str) -> Result<()> {
        self.send(&Command::RoomEditName(RoomEditName {
            room_id: room_id.into(),
            room_name: room_name.into(),
        }))
        .await
    }

    /// Posts a room announcement.
    pub async fn set_room_announcement(&self, room_id: &str, announcement: &str) -> Result<()> {
        self.send(&Command::RoomAnnouncement(RoomAnnouncement {
            room_id: room_id.into(),
            announcement: announcement.into(),
        }))
        .await
    }

    /// Asks for a room's member list.
    pub async fn get_room_member_list(&self, room_id: &str) -> Result<()> {
        self.send(&Command::RoomMemberList(RoomRef {
            room_id: room_id.into(),
        }))
        .await
    }

    /// Adds a member to a room.
    pub async fn add_room_member(&self, room_id: &str, wxid: &str) -> Result<()> {
        self.send(&Command::RoomAddMember(RoomMember {
            room_id: room_id.into(),
            wxid: wxid.into(),
        }))
        .await
    }

    /// Removes a member from a room.
    pub async fn delete_room_member(&self, room_id: &str, wxid: &str) -> Result<()> {
        self.send(&Command::RoomDeleteMember(RoomMember {
            room_id: room_id.into(),
            wxid: wxid.into(),
        }))
        .await
    }

    /// Mentions a room member.
    pub async fn at_room_member(
        &self,
        room_id: &str,
        wxid: &str,
        nickname: &str,
        message: &str,
    ) -> Result<()> {
        self.send(&Command::RoomAtMember(RoomAtMember {
            room_id: room_id.into(),
            wxid: wxid.into(),
            nickname: nickname.into(),
            message: message.into(),
        }))
        .await
    }

    /// Leaves a room.
    pub async fn quit_room(&self, room_id: &str) -> Result<()> {
        self.send(&Command::RoomQuit(RoomRef {
            room_id: room_id.into(),
        }))
        .await
    }

    /// Accepts an incoming transfer.
    pub async fn recv_transfer(&self, wxid: &str, transfer_id: &str) -> Result<()> {
        self.send(&Command::TransferRecv(TransferRecv {
            wxid: wxid.into(),
            transfer_id: transfer_id.into(),
        }))
        .await
    }
}
