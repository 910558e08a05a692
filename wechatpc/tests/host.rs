//! End-to-end tests against an in-process fake automation host.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::future::{Ready, ready};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use wechatpc::{Command, Connection, Error, Event, HandlerError, OpCode};

/// Host side of one accepted connection.
struct FakeHost {
    url: String,
    /// Text frames the client sent.
    received: mpsc::UnboundedReceiver<String>,
    /// Frames to push to the client; `None` closes the socket.
    push: mpsc::UnboundedSender<Option<String>>,
}

impl FakeHost {
    async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("ws://{}", listener.local_addr().unwrap());
        let (received_tx, received) = mpsc::unbounded_channel();
        let (push, mut push_rx) = mpsc::unbounded_channel::<Option<String>>();

        tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let ws = tokio_tungstenite::accept_async(tcp).await.unwrap();
            let (mut sink, mut stream) = ws.split();
            loop {
                tokio::select! {
                    msg = stream.next() => match msg {
                        Some(Ok(Message::Text(t))) => {
                            let _ = received_tx.send(t.as_str().to_owned());
                        }
                        Some(Ok(_)) => {}
                        _ => break,
                    },
                    out = push_rx.recv() => match out {
                        Some(Some(text)) => sink.send(Message::text(text)).await.unwrap(),
                        _ => {
                            let _ = sink.close().await;
                            break;
                        }
                    },
                }
            }
        });

        Self {
            url,
            received,
            push,
        }
    }

    fn emit(&self, frame: &str) {
        self.push.send(Some(frame.to_owned())).unwrap();
    }

    fn hang_up(&self) {
        self.push.send(None).unwrap();
    }

    async fn next_frame(&mut self) -> serde_json::Value {
        let text = within(self.received.recv()).await.expect("host stream ended");
        serde_json::from_str(&text).unwrap()
    }
}

async fn within<T>(fut: impl Future<Output = T>) -> T {
    tokio::time::timeout(Duration::from_secs(5), fut)
        .await
        .expect("timed out")
}

fn forward(
    tx: mpsc::UnboundedSender<Event>,
) -> impl Fn(Event) -> Ready<Result<(), HandlerError>> + Send + Sync + 'static {
    move |event| ready(tx.send(event).map_err(|e| HandlerError::from(e.to_string())))
}

fn failing(_: Event) -> Ready<Result<(), HandlerError>> {
    ready(Err(HandlerError::from("rejected")))
}

#[tokio::test]
async fn send_text_reaches_host() {
    let mut host = FakeHost::start().await;
    let conn = Connection::connect(&host.url).await.unwrap();
    let account = conn.register_account("A1");

    account.send_text("wxid_1", "hello").await.unwrap();

    let text = within(host.received.recv()).await.unwrap();
    assert_eq!(
        text,
        r#"{"accountId":"A1","opCode":32,"body":{"wxid":"wxid_1","content":"hello"}}"#
    );
}

#[tokio::test]
async fn sent_commands_decode_on_the_host() {
    let mut host = FakeHost::start().await;
    let conn = Connection::connect(&host.url).await.unwrap();
    let account = conn.register_account("A1");

    account.at_room_member("r@chatroom", "wxid_2", "bob", "hi").await.unwrap();
    account.recv_transfer("wxid_3", "t-1").await.unwrap();
    account.get_friend_list().await.unwrap();

    let text = within(host.received.recv()).await.unwrap();
    let (id, cmd) = wechatpc::proto::decode_command(&text).unwrap();
    assert_eq!(id, "A1");
    assert_eq!(cmd.op_code(), OpCode::RoomAtMember);

    let frame = host.next_frame().await;
    assert_eq!(frame["opCode"], 0x50);
    assert_eq!(frame["body"]["transferId"], "t-1");

    let frame = host.next_frame().await;
    assert_eq!(frame["opCode"], 0x34);
    assert_eq!(frame["body"], serde_json::json!({}));
}

#[tokio::test]
async fn events_reach_registered_handlers() {
    let host = FakeHost::start().await;
    let conn = Connection::connect(&host.url).await.unwrap();
    let account = conn.register_account("A1");
    let (tx, mut rx) = mpsc::unbounded_channel();
    account
        .add_handler(OpCode::MessageReceive, forward(tx))
        .unwrap();

    let runner = tokio::spawn({
        let conn = conn.clone();
        async move { conn.run().await }
    });

    host.emit(r#"{"accountId":"B2","opCode":146,"body":{"content":"not for us"}}"#);
    host.emit(r#"{"accountId":"A1","opCode":146,"body":{"content":"hello"}}"#);

    let event = within(rx.recv()).await.unwrap();
    assert_eq!(event.account_id, "A1");
    assert_eq!(event.op, OpCode::MessageReceive);
    assert_eq!(event.body["content"], "hello");

    host.hang_up();
    within(runner).await.unwrap().unwrap();
}

#[tokio::test]
async fn malformed_frames_do_not_stop_the_loop() {
    let host = FakeHost::start().await;
    let conn = Connection::connect(&host.url).await.unwrap();
    let account = conn.register_account("A1");
    let (tx, mut rx) = mpsc::unbounded_channel();
    account
        .add_handler([OpCode::Success, OpCode::Failure], failing)
        .unwrap();
    account
        .add_handler([OpCode::Success, OpCode::Failure], forward(tx))
        .unwrap();

    let runner = tokio::spawn({
        let conn = conn.clone();
        async move { conn.run().await }
    });

    host.emit("{{{ definitely not json");
    host.emit(r#"{"accountId":"A1","body":{}}"#);
    host.emit(r#"{"accountId":"A1","opCode":77,"body":{}}"#);
    host.emit(r#"{"accountId":"A1","opCode":1,"body":{"ok":true}}"#);
    host.emit(r#"{"accountId":"A1","opCode":2,"body":{"ok":false}}"#);

    let first = within(rx.recv()).await.unwrap();
    let second = within(rx.recv()).await.unwrap();
    assert_eq!(first.op, OpCode::Success);
    assert_eq!(second.op, OpCode::Failure);

    host.hang_up();
    within(runner).await.unwrap().unwrap();
}

#[tokio::test]
async fn open_then_qrcode_rebinds_in_order() {
    let mut host = FakeHost::start().await;
    let conn = Connection::connect(&host.url).await.unwrap();
    let first = conn.register_account("P1");
    let second = conn.register_account("P2");
    let (tx, mut rx) = mpsc::unbounded_channel();
    first
        .add_handler([OpCode::QrCode, OpCode::MessageReceive], forward(tx.clone()))
        .unwrap();
    second
        .add_handler([OpCode::QrCode, OpCode::MessageReceive], forward(tx))
        .unwrap();

    let runner = tokio::spawn({
        let conn = conn.clone();
        async move { conn.run().await }
    });

    first.open().await.unwrap();
    second.open().await.unwrap();
    assert_eq!(conn.pending_rebinds(), 2);

    let open1 = host.next_frame().await;
    let open2 = host.next_frame().await;
    assert_eq!((open1["accountId"].as_str(), open1["opCode"].as_u64()), (Some("P1"), Some(0x10)));
    assert_eq!((open2["accountId"].as_str(), open2["opCode"].as_u64()), (Some("P2"), Some(0x10)));

    host.emit(r#"{"wechatId":"wxid_a","opCode":144,"body":{"url":"qr-a"}}"#);
    host.emit(r#"{"accountId":"noise","opCode":0,"body":{}}"#);
    host.emit(r#"{"wechatId":"wxid_b","opCode":144,"body":{"url":"qr-b"}}"#);

    let qr_a = within(rx.recv()).await.unwrap();
    let qr_b = within(rx.recv()).await.unwrap();
    assert_eq!((qr_a.account_id.as_str(), qr_a.body["url"].as_str()), ("wxid_a", Some("qr-a")));
    assert_eq!((qr_b.account_id.as_str(), qr_b.body["url"].as_str()), ("wxid_b", Some("qr-b")));

    assert_eq!(first.id(), "wxid_a");
    assert_eq!(second.id(), "wxid_b");
    assert_eq!(conn.accounts(), vec!["wxid_a".to_owned(), "wxid_b".to_owned()]);
    assert_eq!(conn.pending_rebinds(), 0);

    // Handlers registered under the placeholder still fire.
    host.emit(r#"{"accountId":"wxid_b","opCode":146,"body":{"content":"hi"}}"#);
    let msg = within(rx.recv()).await.unwrap();
    assert_eq!(msg.account_id, "wxid_b");

    // Commands are stamped with the real identifier from now on.
    first.send_text("wxid_c", "hey").await.unwrap();
    let frame = host.next_frame().await;
    assert_eq!(frame["accountId"], "wxid_a");

    host.hang_up();
    within(runner).await.unwrap().unwrap();
}

#[tokio::test]
async fn concurrent_opens_queue_in_wire_order() {
    let mut host = FakeHost::start().await;
    let conn = Connection::connect(&host.url).await.unwrap();
    let first = conn.register_account("P1");
    let second = conn.register_account("P2");

    let runner = tokio::spawn({
        let conn = conn.clone();
        async move { conn.run().await }
    });

    let (a, b) = tokio::join!(second.open(), first.open());
    a.unwrap();
    b.unwrap();

    let earlier = host.next_frame().await["accountId"].as_str().unwrap().to_owned();
    let later = host.next_frame().await["accountId"].as_str().unwrap().to_owned();

    host.emit(r#"{"wechatId":"wxid_x","opCode":144,"body":{}}"#);
    host.emit(r#"{"wechatId":"wxid_y","opCode":144,"body":{}}"#);
    host.hang_up();
    within(runner).await.unwrap().unwrap();

    let by_placeholder = |p: &str| if p == "P1" { first.id() } else { second.id() };
    assert_eq!(by_placeholder(&earlier), "wxid_x");
    assert_eq!(by_placeholder(&later), "wxid_y");
    assert_eq!(conn.pending_rebinds(), 0);
}

#[tokio::test]
async fn qrcode_echoing_placeholder_still_rebinds() {
    let mut host = FakeHost::start().await;
    let conn = Connection::connect(&host.url).await.unwrap();
    let account = conn.register_account("P1");
    let (tx, mut rx) = mpsc::unbounded_channel();
    account.add_handler(OpCode::QrCode, forward(tx)).unwrap();

    let runner = tokio::spawn({
        let conn = conn.clone();
        async move { conn.run().await }
    });

    account.open().await.unwrap();
    host.next_frame().await;
    host.emit(r#"{"accountId":"P1","wechatId":"wxid_real","opCode":144,"body":{"url":"qr"}}"#);

    let event = within(rx.recv()).await.unwrap();
    assert_eq!(event.account_id, "wxid_real");
    assert_eq!(account.id(), "wxid_real");
    assert_eq!(conn.accounts(), vec!["wxid_real".to_owned()]);

    host.hang_up();
    within(runner).await.unwrap().unwrap();
}

#[tokio::test]
async fn host_close_ends_loop_and_fails_sends() {
    let host = FakeHost::start().await;
    let conn = Connection::connect(&host.url).await.unwrap();
    let account = conn.register_account("A1");

    host.hang_up();
    within(conn.run()).await.unwrap();

    assert!(conn.is_closed());
    assert!(matches!(
        account.send(&Command::FriendList(wechatpc::proto::Empty {})).await,
        Err(Error::NotConnected)
    ));
    assert!(matches!(conn.run().await, Err(Error::AlreadyRunning)));
}

#[tokio::test]
async fn receive_loop_is_exclusive() {
    let host = FakeHost::start().await;
    let conn = Connection::connect(&host.url).await.unwrap();

    let runner = tokio::spawn({
        let conn = conn.clone();
        async move { conn.run().await }
    });
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert!(matches!(conn.run().await, Err(Error::AlreadyRunning)));

    host.hang_up();
    within(runner).await.unwrap().unwrap();
}

#[tokio::test]
async fn local_close_stops_the_loop() {
    let host = FakeHost::start().await;
    let conn = Connection::connect(&host.url).await.unwrap();

    let runner = tokio::spawn({
        let conn = conn.clone();
        async move { conn.run().await }
    });

    conn.close().await.unwrap();
    assert!(conn.is_closed());
    within(runner).await.unwrap().unwrap();
    drop(host);
}
