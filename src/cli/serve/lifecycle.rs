//! Server lifecycle management.

use crate::{actor::Coordinator, core::register_server, log};
use anyhow::{Result, anyhow};
use crossbeam::channel::{Receiver, Sender};
use std::{
    net::{IpAddr, SocketAddr},
    sync::Arc,
    thread::{self, JoinHandle},
    time::Duration,
};
use tiny_http::Server;

/// Maximum number of port binding attempts.
const MAX_PORT_RETRIES: u16 = 10;

/// Bind to the specified interface and port, with automatic port retry.
pub fn bind_with_retry(interface: IpAddr, base_port: u16) -> Result<(Server, SocketAddr)> {
    let mut last_error = None;

    for offset in 0..MAX_PORT_RETRIES {
        let Some(port) = base_port.checked_add(offset) else {
            break;
        };
        let addr = SocketAddr::new(interface, port);

        match Server::http(addr) {
            Ok(server) => {
                if offset > 0 {
                    log!("serve"; "port {} in use, using {} instead", base_port, port);
                }
                return Ok((server, addr));
            }
            Err(e) => last_error = Some(e),
        }
    }

    Err(anyhow!(
        "failed to bind {} after {} attempts (ports from {}): {}",
        interface,
        MAX_PORT_RETRIES,
        base_port,
        last_error.map(|e| e.to_string()).unwrap_or_default()
    ))
}

/// Register server for graceful shutdown.
///
/// When Ctrl+C is pressed the handler set up in main() unblocks the server
/// and notifies the actors.
pub fn register_server_for_shutdown(server: Arc<Server>, shutdown_tx: Sender<()>) {
    register_server(server, shutdown_tx);
}

/// Run the actor system on its own thread with a small tokio runtime.
pub fn spawn_actors(coordinator: Coordinator, shutdown_rx: Receiver<()>) -> JoinHandle<()> {
    thread::spawn(move || {
        let rt = match tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()
        {
            Ok(rt) => rt,
            Err(e) => {
                log!("actor"; "failed to start runtime: {}", e);
                return;
            }
        };

        rt.block_on(async {
            if let Err(e) = coordinator.with_shutdown_signal(shutdown_rx).run().await {
                log!("actor"; "error: {}", e);
            }
        });
    })
}

/// Wait for actor system to shutdown gracefully (max 3 seconds).
pub fn wait_for_shutdown(handle: Option<JoinHandle<()>>) {
    let Some(handle) = handle else { return };

    for _ in 0..60 {
        if handle.is_finished() {
            let _ = handle.join();
            return;
        }
        thread::sleep(Duration::from_millis(50));
    }
}
