use tungstenite::protocol::Message;

use super::WsActor;
use crate::reload::HotReloadMessage;

impl WsActor {
    pub(super) fn send_all(&self, msg: &HotReloadMessage) {
        self.broadcast(Message::Text(msg.to_json().into()));
    }

    /// Broadcast a message to all connected clients
    pub(super) fn broadcast(&self, msg: Message) {
        let mut clients = self.clients.lock();
        let count = clients.len();

        if count == 0 {
            crate::debug!("ws"; "no clients connected");
            return;
        }

        clients.retain_mut(|ws| match ws.send(msg.clone()) {
            Ok(_) => true,
            // frame stays buffered and is flushed by the next read or send
            Err(tungstenite::Error::Io(ref e)) if e.kind() == std::io::ErrorKind::WouldBlock => true,
            Err(e) => {
                crate::debug!("ws"; "client disconnected: {}", e);
                false
            }
        });
        crate::debug!("ws"; "broadcast to {} clients", count);
    }
}
