use std::net::TcpStream;
use std::sync::Arc;

use parking_lot::Mutex;
use tungstenite::WebSocket;
use tungstenite::protocol::Message;

use crate::reload::HotReloadMessage;

use super::WsActor;

impl WsActor {
    /// Add a new client connection
    pub(super) fn add_client(&self, stream: TcpStream) {
        // Keep blocking mode during handshake, switch to non-blocking after
        match tungstenite::accept(stream) {
            Ok(mut ws) => {
                let _ = ws.get_ref().set_nonblocking(true);

                let connected_msg = HotReloadMessage::connected();
                if let Err(e) = ws.send(Message::Text(connected_msg.to_json().into())) {
                    crate::log!("ws"; "failed to send connected message: {}", e);
                    return;
                }

                // A client opened while a step is failing sees the overlay too
                let pending = self.overlay.lock().current();
                if let Some(hr_msg) = pending {
                    if let Err(e) = ws.send(Message::Text(hr_msg.to_json().into())) {
                        crate::log!("ws"; "failed to send pending error: {}", e);
                    }
                }

                let mut clients = self.clients.lock();
                crate::debug!("ws"; "client connected (total: {})", clients.len() + 1);
                clients.push(ws);
            }
            Err(e) => {
                crate::log!("ws"; "handshake failed: {}", e);
            }
        }
    }

    /// Background thread draining client frames (non-blocking poll).
    ///
    /// Clients never send anything meaningful; reading keeps ping/close
    /// handling alive and detects disconnects.
    pub(super) fn client_reader_loop(clients: Arc<Mutex<Vec<WebSocket<TcpStream>>>>) {
        loop {
            std::thread::sleep(std::time::Duration::from_millis(100));
            if crate::core::is_shutdown() {
                break;
            }

            clients.lock().retain_mut(|ws| match ws.read() {
                Ok(Message::Close(_)) => false,
                Ok(_) => true,
                Err(tungstenite::Error::Io(ref e)) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    true
                }
                Err(_) => false,
            });
        }
    }
}
