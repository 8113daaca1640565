//! WebSocket Server for Live Reload
//!
//! Accepts TCP connections and hands them to the WsActor, which performs the
//! handshake and owns the client from then on.

use std::net::{IpAddr, SocketAddr, TcpListener};

use anyhow::Result;

use crate::actor::messages::WsMsg;

/// Maximum port retry attempts
pub const MAX_PORT_RETRIES: u16 = 10;

/// Start the WebSocket listener. Returns the port actually bound.
pub fn start_ws_server(
    interface: IpAddr,
    base_port: u16,
    ws_tx: tokio::sync::mpsc::Sender<WsMsg>,
) -> Result<u16> {
    let (listener, actual_port) = try_bind_port(interface, base_port, MAX_PORT_RETRIES)?;
    listener.set_nonblocking(true)?;

    // Spawn acceptor thread
    std::thread::spawn(move || {
        loop {
            if crate::core::is_shutdown() {
                break;
            }
            match listener.accept() {
                Ok((stream, addr)) => {
                    crate::debug!("reload"; "client connected: {}", addr);

                    // Set blocking for WebSocket operations
                    let _ = stream.set_nonblocking(false);

                    if ws_tx.blocking_send(WsMsg::AddClient(stream)).is_err() {
                        crate::debug!("reload"; "ws actor gone, stopping listener");
                        break;
                    }
                }
                Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    std::thread::sleep(std::time::Duration::from_millis(100));
                }
                Err(e) => {
                    crate::log!("reload"; "accept error: {}", e);
                    std::thread::sleep(std::time::Duration::from_millis(100));
                }
            }
        }
    });

    Ok(actual_port)
}

/// Try binding to port, retry with incremented port if in use
pub fn try_bind_port(
    interface: IpAddr,
    base_port: u16,
    max_retries: u16,
) -> Result<(TcpListener, u16)> {
    let mut last_error = None;

    for offset in 0..max_retries {
        let port = base_port.saturating_add(offset);
        match TcpListener::bind(SocketAddr::new(interface, port)) {
            Ok(listener) => {
                let actual_port = listener.local_addr()?.port();
                return Ok((listener, actual_port));
            }
            Err(e) => last_error = Some(e),
        }
    }

    Err(anyhow::anyhow!(
        "Failed to bind WebSocket server after {} attempts: {}",
        max_retries,
        last_error.map(|e| e.to_string()).unwrap_or_default()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    const LOCALHOST: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);

    #[test]
    fn test_bind_skips_busy_port() {
        let (held, port) = try_bind_port(LOCALHOST, 0, 1).unwrap();
        let (_next, next_port) = try_bind_port(LOCALHOST, port, MAX_PORT_RETRIES).unwrap();
        assert_ne!(port, next_port);
        drop(held);
    }
}
