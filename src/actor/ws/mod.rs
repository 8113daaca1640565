//! WebSocket Actor
//!
//! This actor is responsible for:
//! - Managing WebSocket client connections
//! - Broadcasting reload, style and error messages to all clients
//!
//! # Architecture
//!
//! ```text
//! RoleActor --[Event/Error]--> WsActor --[broadcast]--> Clients
//! ```
//!
//! Delivery is at-most-once: a client whose send fails is dropped.

mod client_io;
mod delivery;
mod overlay;
#[cfg(test)]
mod tests;

use std::net::TcpStream;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tungstenite::WebSocket;

use super::messages::WsMsg;
use crate::reload::HotReloadMessage;
use overlay::Overlay;

/// WebSocket Actor - manages client connections and broadcasts
pub struct WsActor {
    /// Channel to receive messages
    rx: mpsc::Receiver<WsMsg>,
    /// Connected clients (shared with the reader thread)
    clients: Arc<Mutex<Vec<WebSocket<TcpStream>>>>,
    /// Failing roles, replayed to clients that connect meanwhile
    overlay: Mutex<Overlay>,
}

impl WsActor {
    /// Create a new WsActor
    pub fn new(rx: mpsc::Receiver<WsMsg>) -> Self {
        Self {
            rx,
            clients: Arc::new(Mutex::new(Vec::new())),
            overlay: Mutex::new(Overlay::default()),
        }
    }

    /// Run the actor event loop
    pub async fn run(mut self) {
        let clients_for_reader = Arc::clone(&self.clients);
        std::thread::spawn(move || Self::client_reader_loop(clients_for_reader));

        while let Some(msg) = self.rx.recv().await {
            match msg {
                WsMsg::Event(event) => {
                    crate::debug!("ws"; "sending update: {}", event.label());
                    self.send_all(&HotReloadMessage::from(event));
                }

                WsMsg::Error { role, path, error } => {
                    let hr_msg = self.overlay.lock().fail(role, path, error);
                    self.send_all(&hr_msg);
                }

                WsMsg::ClearError { role } => {
                    let hr_msg = self.overlay.lock().clear(role);
                    if let Some(hr_msg) = hr_msg {
                        self.send_all(&hr_msg);
                    }
                }

                WsMsg::AddClient(stream) => self.add_client(stream),

                WsMsg::Shutdown => {
                    crate::debug!("ws"; "shutting down");
                    let mut clients = self.clients.lock();
                    for mut ws in clients.drain(..) {
                        let _ = ws.close(None);
                    }
                    break;
                }
            }
        }
    }
}
