use std::path::{Path, PathBuf};

use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use rustc_hash::FxHashSet;

use crate::config::SiteConfig;

/// Directories to watch: the glob bases and include dirs of every role.
///
/// Nested roots collapse into their ancestor, and anything inside the output
/// root is dropped so writes never feed back into the watcher.
pub(super) fn collect_watch_roots(config: &SiteConfig) -> Vec<PathBuf> {
    let output = config.output_dir();
    let mut roots: Vec<PathBuf> = config
        .specs
        .iter()
        .flat_map(|spec| spec.watch_roots())
        .filter(|root| !root.starts_with(output))
        .map(Path::to_path_buf)
        .collect();
    roots.sort();
    roots.dedup();
    dedupe_nested(&mut roots);
    roots
}

/// Keep only the outermost of nested roots. Expects sorted input.
fn dedupe_nested(roots: &mut Vec<PathBuf>) {
    let mut kept: Vec<PathBuf> = Vec::with_capacity(roots.len());
    for root in roots.drain(..) {
        if !kept.last().is_some_and(|parent| root.starts_with(parent)) {
            kept.push(root);
        }
    }
    *roots = kept;
}

/// Watch-root consistency manager.
///
/// Roots that do not exist yet (an empty `src/assets/fonts`, say) are
/// attached as soon as they appear; roots that vanish are re-attached when
/// recreated.
pub(super) struct WatchRoots {
    desired: Vec<PathBuf>,
    attached: FxHashSet<PathBuf>,
}

impl WatchRoots {
    pub(super) fn new(paths: Vec<PathBuf>) -> Self {
        Self {
            desired: paths,
            attached: FxHashSet::default(),
        }
    }

    pub(super) fn attach_existing(
        &mut self,
        watcher: &mut RecommendedWatcher,
    ) -> notify::Result<()> {
        for path in self.desired.iter().filter(|p| p.exists()) {
            watcher.watch(path, RecursiveMode::Recursive)?;
            self.attached.insert(path.clone());
            crate::debug!("watch"; "watching {}", path.display());
        }
        Ok(())
    }

    pub(super) fn maintain(&mut self, watcher: &mut RecommendedWatcher) {
        self.attached.retain(|path| path.exists());

        for path in &self.desired {
            if self.attached.contains(path) || !path.exists() {
                continue;
            }
            if watcher.watch(path, RecursiveMode::Recursive).is_ok() {
                self.attached.insert(path.clone());
                crate::debug!("watch"; "attached watch: {}", path.display());
            }
        }
    }
}
