//! Actor Coordinator - Wires up the Watch Actor System
//!
//! Construction is synchronous and happens before the initial build: the
//! watcher starts buffering events and the WebSocket port is bound, so the
//! dev server can inject the right port from its first response.

mod runtime;

use std::sync::Arc;

use anyhow::Result;
use crossbeam::channel::Receiver;
use rustc_hash::FxHashMap;
use tokio::sync::mpsc;

use super::fs::{FsActor, RoleSenders};
use super::messages::{RoleMsg, WsMsg};
use super::role::RoleActor;
use super::ws::WsActor;
use crate::config::SiteConfig;
use crate::pipeline::BuildRun;

const CHANNEL_BUFFER: usize = 32;

/// Coordinator - wires up and runs the actor system.
pub struct Coordinator {
    fs: FsActor,
    roles: Vec<RoleActor>,
    ws: WsActor,
    role_txs: RoleSenders,
    ws_tx: mpsc::Sender<WsMsg>,
    ws_port: Option<u16>,
    shutdown_rx: Option<Receiver<()>>,
}

impl Coordinator {
    /// Start the watcher and, with live reload, bind the WebSocket listener.
    pub fn new(config: Arc<SiteConfig>, live_reload: bool) -> Result<Self> {
        let (ws_tx, ws_rx) = mpsc::channel::<WsMsg>(CHANNEL_BUFFER);

        let mut role_txs: RoleSenders = FxHashMap::default();
        let mut roles = Vec::new();
        for role in config.enabled_roles() {
            let (tx, rx) = mpsc::channel::<RoleMsg>(CHANNEL_BUFFER);
            role_txs.insert(role, tx);
            roles.push(RoleActor::new(role, rx, ws_tx.clone(), Arc::clone(&config)));
        }

        let fs = FsActor::new(role_txs.clone(), Arc::clone(&config))
            .map_err(|e| anyhow::anyhow!("watcher failed: {}", e))?;
        for path in super::fs::watch_paths(&config) {
            crate::debug!("watch"; "{}", config.root_relative(&path).display());
        }

        let ws_port = if live_reload {
            let port = crate::reload::server::start_ws_server(
                config.serve.interface,
                config.serve.ws_port,
                ws_tx.clone(),
            )?;
            if port != config.serve.ws_port {
                crate::log!("reload"; "port {} in use, using {} instead", config.serve.ws_port, port);
            }
            crate::debug!("reload"; "ws://{}:{}", config.serve.interface, port);
            Some(port)
        } else {
            None
        };

        Ok(Self {
            fs,
            roles,
            ws: WsActor::new(ws_rx),
            role_txs,
            ws_tx,
            ws_port,
            shutdown_rx: None,
        })
    }

    /// Port the WebSocket listener bound, when live reload is on.
    pub fn ws_port(&self) -> Option<u16> {
        self.ws_port
    }

    /// Carry failures of the initial build into watch mode: the roles clear
    /// the overlay on their next success and new clients see it meanwhile.
    pub fn with_initial_build(mut self, run: &BuildRun, config: &SiteConfig) -> Self {
        let failed = run.failed_roles();
        self.roles = self
            .roles
            .into_iter()
            .map(|actor| {
                let failing = failed.contains(&actor.role());
                actor.with_failure(failing)
            })
            .collect();

        for (role, err) in run.failures() {
            let path = err
                .path()
                .map(|p| config.root_relative(p).display().to_string())
                .unwrap_or_else(|| role.to_string());
            let _ = self.ws_tx.try_send(WsMsg::Error {
                role,
                path,
                error: err.detail(),
            });
        }
        self
    }

    /// Set shutdown signal receiver.
    pub fn with_shutdown_signal(mut self, rx: Receiver<()>) -> Self {
        self.shutdown_rx = Some(rx);
        self
    }

    /// Run the actor system until shutdown.
    pub async fn run(self) -> Result<()> {
        crate::debug!("actor"; "start");
        runtime::run_actors(
            self.fs,
            self.roles,
            self.ws,
            self.role_txs,
            self.ws_tx,
            self.shutdown_rx,
        )
        .await;
        crate::debug!("actor"; "stopped");
        Ok(())
    }
}
