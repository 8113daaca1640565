//! FileSystem Actor
//!
//! Watches the role roots and sends debounced, routed changes to the role
//! actors. The watcher is created before the initial build so no event is
//! lost while it runs.
//!
//! Architecture:
//! ```text
//! Watcher → Debouncer (pure timing) → Router (PathSpec matching) → RoleMsg
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use notify::RecommendedWatcher;
use rustc_hash::FxHashMap;
use tokio::sync::mpsc;

use super::messages::RoleMsg;
use crate::config::SiteConfig;
use crate::core::Role;

// Pure timing and deduplication.
mod debouncer;
// Changed paths -> per-role work.
mod router;
// Watch root collection and re-attach lifecycle.
mod watch_roots;

#[cfg(test)]
mod tests;

use debouncer::Debouncer;
use router::{log_events, route};
use watch_roots::{WatchRoots, collect_watch_roots};

/// How often missing watch roots are retried.
const ROOT_CHECK_INTERVAL: Duration = Duration::from_secs(2);

pub type RoleSenders = FxHashMap<Role, mpsc::Sender<RoleMsg>>;

/// FileSystem Actor - watches for file changes
pub struct FsActor {
    /// Channel to receive notify events (sync -> async bridge)
    notify_rx: std::sync::mpsc::Receiver<notify::Result<notify::Event>>,
    /// Watcher handle (must be kept alive)
    watcher: RecommendedWatcher,
    watch_roots: WatchRoots,
    role_txs: RoleSenders,
    debouncer: Debouncer,
    config: Arc<SiteConfig>,
}

impl FsActor {
    /// Start watching immediately; events buffer until [`FsActor::run`].
    pub fn new(role_txs: RoleSenders, config: Arc<SiteConfig>) -> notify::Result<Self> {
        // notify is sync-only
        let (notify_tx, notify_rx) = std::sync::mpsc::channel();
        let mut watcher = notify::recommended_watcher(move |res| {
            let _ = notify_tx.send(res);
        })?;

        let mut watch_roots = WatchRoots::new(collect_watch_roots(&config));
        watch_roots.attach_existing(&mut watcher)?;

        Ok(Self {
            notify_rx,
            watcher,
            watch_roots,
            role_txs,
            debouncer: Debouncer::new(),
            config,
        })
    }

    /// Run the actor event loop
    pub async fn run(self) {
        let Self {
            notify_rx,
            mut watcher,
            mut watch_roots,
            role_txs,
            mut debouncer,
            config,
        } = self;

        let (async_tx, mut async_rx) = mpsc::channel::<notify::Event>(64);

        std::thread::spawn(move || {
            while let Ok(result) = notify_rx.recv() {
                match result {
                    Ok(event) => {
                        if async_tx.blocking_send(event).is_err() {
                            break; // Receiver dropped
                        }
                    }
                    Err(e) => crate::log!("watch"; "notify error: {}", e),
                }
            }
        });

        let mut root_check = tokio::time::interval(ROOT_CHECK_INTERVAL);

        loop {
            tokio::select! {
                biased;
                event = async_rx.recv() => match event {
                    Some(event) => debouncer.add_event(&event),
                    None => break,
                },
                _ = tokio::time::sleep(debouncer.sleep_duration()) => {
                    if dispatch(&mut debouncer, &role_txs, &config).await.is_err() {
                        break;
                    }
                }
                _ = root_check.tick() => watch_roots.maintain(&mut watcher),
            }
        }
        crate::debug!("watch"; "stopped");
    }
}

/// Route a ready batch to the role actors.
///
/// Returns `Err(())` once a role actor has shut down.
async fn dispatch(
    debouncer: &mut Debouncer,
    role_txs: &RoleSenders,
    config: &SiteConfig,
) -> Result<(), ()> {
    let Some(changes) = debouncer.take_if_ready() else {
        return Ok(());
    };

    log_events(&changes, config);

    for (role, work) in route(changes, config) {
        if let Some(tx) = role_txs.get(&role) {
            tx.send(RoleMsg::Change(work)).await.map_err(|_| ())?;
        }
    }
    Ok(())
}

/// Paths the watcher registers, for startup logging.
pub fn watch_paths(config: &SiteConfig) -> Vec<PathBuf> {
    collect_watch_roots(config)
}
