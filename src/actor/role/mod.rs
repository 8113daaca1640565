//! Role Actor
//!
//! One actor per enabled role. Runs of one role are strictly ordered; roles
//! run in parallel with each other.
//!
//! ```text
//! RoleMsg::Change ──> RoleState ──start──> spawn_blocking(prune + run_role)
//!                        ▲                          │
//!                        └──────── complete ────────┘──> WsMsg
//! ```

mod state;

#[cfg(test)]
mod tests;

pub use state::{RoleState, Work};

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle};

use super::messages::{RoleMsg, WsMsg};
use crate::config::SiteConfig;
use crate::core::Role;
use crate::logger::{status_error, status_success};
use crate::pipeline::{self, RoleRun, RunError};
use crate::reload::ReloadEvent;

/// Result of one blocking run.
struct Outcome {
    pruned: Result<usize, RunError>,
    run: Option<Result<RoleRun, RunError>>,
    duration: Duration,
}

pub struct RoleActor {
    role: Role,
    rx: mpsc::Receiver<RoleMsg>,
    ws_tx: mpsc::Sender<WsMsg>,
    config: Arc<SiteConfig>,
    state: RoleState,
    /// Last run failed; the next success clears the overlay.
    failing: bool,
}

impl RoleActor {
    pub fn new(
        role: Role,
        rx: mpsc::Receiver<RoleMsg>,
        ws_tx: mpsc::Sender<WsMsg>,
        config: Arc<SiteConfig>,
    ) -> Self {
        Self {
            role,
            rx,
            ws_tx,
            config,
            state: RoleState::default(),
            failing: false,
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    /// Mark the role as failing, e.g. after a failed initial build.
    pub fn with_failure(mut self, failing: bool) -> Self {
        self.failing = failing;
        self
    }

    /// Run the actor event loop
    pub async fn run(mut self) {
        let mut running: Option<JoinHandle<Outcome>> = None;

        loop {
            tokio::select! {
                // queued changes are folded in before a completion is observed
                biased;
                msg = self.rx.recv() => match msg {
                    Some(RoleMsg::Change(work)) => {
                        if let Some(work) = self.state.on_change(work) {
                            running = Some(self.start(work));
                        }
                    }
                    Some(RoleMsg::Shutdown) | None => break,
                },
                joined = join(&mut running) => {
                    running = None;
                    self.report(joined).await;
                    if let Some(work) = self.state.on_complete() {
                        running = Some(self.start(work));
                    }
                }
            }
        }

        // in-flight runs are not cancelled
        if let Some(handle) = running {
            let _ = handle.await;
        }
        crate::debug!("actor"; "{} stopped", self.role);
    }

    fn start(&self, work: Work) -> JoinHandle<Outcome> {
        let config = Arc::clone(&self.config);
        let role = self.role;
        crate::debug!("actor"; "{} start: {:?}", role, work);
        tokio::task::spawn_blocking(move || execute(&config, role, work))
    }

    async fn report(&mut self, joined: Result<Outcome, JoinError>) {
        let outcome = match joined {
            Ok(outcome) => outcome,
            Err(e) => {
                crate::log!("error"; "{} run panicked: {}", self.role, e);
                return;
            }
        };

        let result = outcome
            .pruned
            .and_then(|pruned| outcome.run.transpose().map(|run| (pruned, run)));

        match result {
            Ok((pruned, run)) => {
                let mut events = Vec::new();
                let mut summary = Vec::new();
                if pruned > 0 {
                    summary.push(format!("{pruned} removed"));
                }
                if let Some(run) = run {
                    summary.push(format!("{} written", run.written.len()));
                    events = ReloadEvent::from_run(run, self.config.output_dir());
                }
                if pruned > 0 && events.is_empty() {
                    events.push(ReloadEvent::FullReload {
                        path: self.role.to_string(),
                    });
                }

                status_success(&format!(
                    "{}: {} ({:?})",
                    self.role,
                    summary.join(", "),
                    outcome.duration
                ));

                if std::mem::take(&mut self.failing) {
                    let _ = self.ws_tx.send(WsMsg::ClearError { role: self.role }).await;
                }
                for event in events {
                    let _ = self.ws_tx.send(WsMsg::Event(event)).await;
                }
            }
            Err(err) => {
                self.failing = true;
                let path = err
                    .path()
                    .map(|p| self.config.root_relative(p).display().to_string())
                    .unwrap_or_else(|| self.role.to_string());
                status_error(&format!("{} failed: {}", self.role, path), &err.detail());
                let _ = self
                    .ws_tx
                    .send(WsMsg::Error {
                        role: self.role,
                        path,
                        error: err.detail(),
                    })
                    .await;
            }
        }
    }
}

/// Prune first so a source recreated within the same window is written back.
fn execute(config: &SiteConfig, role: Role, work: Work) -> Outcome {
    let start = Instant::now();
    let removed: Vec<_> = work.removed.into_iter().collect();
    let pruned = if removed.is_empty() {
        Ok(0)
    } else {
        pipeline::prune(config, role, &removed)
    };
    let run = work
        .invalidation
        .map(|invalidation| pipeline::run_role(config, role, &invalidation));
    Outcome {
        pruned,
        run,
        duration: start.elapsed(),
    }
}

/// Await the in-flight run, or never resolve when idle.
async fn join(running: &mut Option<JoinHandle<Outcome>>) -> Result<Outcome, JoinError> {
    match running {
        Some(handle) => handle.await,
        None => std::future::pending().await,
    }
}
