use std::time::Duration;

use crossbeam::channel::Receiver;
use tokio::sync::mpsc;

use crate::actor::fs::{FsActor, RoleSenders};
use crate::actor::messages::{RoleMsg, WsMsg};
use crate::actor::role::RoleActor;
use crate::actor::ws::WsActor;

/// Run all actors concurrently until shutdown is signalled or the watcher
/// stops.
pub(super) async fn run_actors(
    fs: FsActor,
    roles: Vec<RoleActor>,
    ws: WsActor,
    role_txs: RoleSenders,
    ws_tx: mpsc::Sender<WsMsg>,
    shutdown_rx: Option<Receiver<()>>,
) {
    let role_handles: Vec<_> = roles
        .into_iter()
        .map(|actor| tokio::spawn(actor.run()))
        .collect();
    let ws_handle = tokio::spawn(ws.run());
    let mut fs_handle = tokio::spawn(fs.run());

    match shutdown_rx {
        Some(rx) => loop {
            tokio::select! {
                _ = &mut fs_handle => break,
                _ = tokio::time::sleep(Duration::from_millis(100)) => {
                    if rx.try_recv().is_ok() {
                        crate::debug!("actor"; "shutdown signal received");
                        break;
                    }
                }
            }
        },
        None => {
            let _ = fs_handle.await;
        }
    }

    for tx in role_txs.values() {
        let _ = tx.send(RoleMsg::Shutdown).await;
    }
    // role actors finish their in-flight run before stopping
    for handle in role_handles {
        let _ = tokio::time::timeout(Duration::from_secs(2), handle).await;
    }

    let _ = ws_tx.send(WsMsg::Shutdown).await;
    let _ = tokio::time::timeout(Duration::from_millis(500), ws_handle).await;
}
