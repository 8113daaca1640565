use std::collections::BTreeMap;
use std::path::PathBuf;

use rustc_hash::FxHashMap;

use super::debouncer::ChangeKind;
use crate::actor::role::Work;
use crate::config::SiteConfig;
use crate::core::Role;
use crate::pipeline::Invalidation;

pub(super) fn log_events(changes: &FxHashMap<PathBuf, ChangeKind>, config: &SiteConfig) {
    for (path, kind) in changes {
        crate::debug!("watch"; "{}: {}", kind.label(), config.root_relative(path).display());
    }
}

/// Map a debounced batch to per-role work.
///
/// For every role whose watch set matches a path:
/// - direct source, removed → prune its outputs
/// - direct source, created or modified → re-run that file
/// - anything else (partial, layout, data file) → re-run the whole role
pub(super) fn route(
    changes: FxHashMap<PathBuf, ChangeKind>,
    config: &SiteConfig,
) -> BTreeMap<Role, Work> {
    let mut routed: BTreeMap<Role, Work> = BTreeMap::new();

    for (path, kind) in changes {
        if path.starts_with(config.output_dir()) {
            continue;
        }
        if path == config.config_path {
            crate::log!("watch"; "{} changed, restart to apply", config.root_relative(&path).display());
            continue;
        }

        for spec in config.specs.iter().filter(|spec| spec.watches(&path)) {
            let direct = spec.source_file(&path).is_some();
            let work = match (direct, kind) {
                (true, ChangeKind::Removed) => Work::remove(path.clone()),
                (true, _) => Work::invalidate(Invalidation::file(path.clone())),
                (false, _) => Work::invalidate(Invalidation::Full),
            };
            routed.entry(spec.role).or_default().merge(work);
        }
    }

    routed
}
