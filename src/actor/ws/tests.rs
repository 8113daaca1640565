use std::net::{TcpListener, TcpStream};
use std::thread;
use std::time::Duration;

use tokio::sync::mpsc;
use tungstenite::{Message, WebSocket};

use super::*;
use crate::core::Role;

type Client = WebSocket<TcpStream>;

/// Accepted server-side stream plus a thread finishing the client handshake.
fn pair() -> (TcpStream, thread::JoinHandle<Client>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let client = thread::spawn(move || {
        let stream = TcpStream::connect(addr).unwrap();
        stream
            .set_read_timeout(Some(Duration::from_secs(5)))
            .unwrap();
        let url = format!("ws://{addr}/");
        let (ws, _) = tungstenite::client(url.as_str(), stream)
            .map_err(|_| "client handshake failed")
            .unwrap();
        ws
    });
    let (server, _) = listener.accept().unwrap();
    (server, client)
}

fn connect(actor: &WsActor) -> Client {
    let (server, client) = pair();
    actor.add_client(server);
    client.join().unwrap()
}

fn recv(client: &mut Client) -> HotReloadMessage {
    loop {
        let msg = client.read().unwrap();
        if msg.is_text() {
            return HotReloadMessage::from_json(msg.to_text().unwrap()).unwrap();
        }
    }
}

fn actor() -> WsActor {
    let (_tx, rx) = mpsc::channel(1);
    WsActor::new(rx)
}

#[test]
fn test_new_client_sees_pending_error() {
    let actor = actor();
    actor
        .overlay
        .lock()
        .fail(Role::Html, "src/index.html".into(), "unknown tag".into());

    let mut client = connect(&actor);
    assert!(matches!(recv(&mut client), HotReloadMessage::Connected { .. }));
    assert_eq!(
        recv(&mut client),
        HotReloadMessage::error("src/index.html", "unknown tag")
    );
}

#[test]
fn test_broadcast_drops_closed_client() {
    let actor = actor();
    let mut alive = connect(&actor);
    let closed = connect(&actor);
    assert_eq!(actor.clients.lock().len(), 2);
    drop(closed);

    // the first write after the peer closed may still be accepted locally
    for _ in 0..50 {
        actor.send_all(&HotReloadMessage::reload_with_reason("assets"));
        if actor.clients.lock().len() == 1 {
            break;
        }
        thread::sleep(Duration::from_millis(20));
    }
    assert_eq!(actor.clients.lock().len(), 1);

    assert!(matches!(recv(&mut alive), HotReloadMessage::Connected { .. }));
    assert_eq!(
        recv(&mut alive),
        HotReloadMessage::reload_with_reason("assets")
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_recovered_role_leaves_other_overlay() {
    let (tx, rx) = mpsc::channel(8);
    let task = tokio::spawn(WsActor::new(rx).run());

    tx.send(WsMsg::Error {
        role: Role::Html,
        path: "src/index.html".into(),
        error: "unknown tag".into(),
    })
    .await
    .unwrap();
    tx.send(WsMsg::Error {
        role: Role::Css,
        path: "src/assets/scss/app.scss".into(),
        error: "expected \";\"".into(),
    })
    .await
    .unwrap();
    tx.send(WsMsg::ClearError { role: Role::Css }).await.unwrap();

    let (server, client) = tokio::task::spawn_blocking(pair).await.unwrap();
    tx.send(WsMsg::AddClient(server)).await.unwrap();

    let replayed = tokio::task::spawn_blocking(move || {
        let mut client = client.join().unwrap();
        recv(&mut client);
        recv(&mut client)
    })
    .await
    .unwrap();
    assert_eq!(
        replayed,
        HotReloadMessage::error("src/index.html", "unknown tag")
    );

    tx.send(WsMsg::Shutdown).await.unwrap();
    task.await.unwrap();
}
