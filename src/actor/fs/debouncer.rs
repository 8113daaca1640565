use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use rustc_hash::FxHashMap;

use crate::utils::path::normalize_path;

/// Quiet window before a batch of changes is routed.
pub(super) const DEBOUNCE_MS: u64 = 100;

/// What happened to a file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum ChangeKind {
    Created,
    Modified,
    Removed,
}

impl ChangeKind {
    pub(super) fn label(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Modified => "modified",
            Self::Removed => "removed",
        }
    }
}

/// Pure debouncer: only handles timing and event deduplication.
pub(super) struct Debouncer {
    /// Path → ChangeKind (dedup is free via HashMap key uniqueness)
    pub(super) changes: FxHashMap<PathBuf, ChangeKind>,
    pub(super) last_event: Option<Instant>,
}

impl Debouncer {
    pub(super) fn new() -> Self {
        Self {
            changes: FxHashMap::default(),
            last_event: None,
        }
    }

    /// Add a notify event, applying dedup rules:
    /// - Remove + Create/Modify → Create/Modify (file was restored)
    /// - Modify + Remove → Remove (file was deleted)
    /// - Create + Remove → nothing (file came and went)
    /// - otherwise the first event wins
    pub(super) fn add_event(&mut self, event: &notify::Event) {
        use notify::EventKind;

        let kind = match event.kind {
            EventKind::Create(_) => ChangeKind::Created,
            EventKind::Remove(_) => ChangeKind::Removed,
            EventKind::Modify(modify) => {
                // metadata-only changes (mtime/chmod) would loop rebuilds
                if matches!(modify, notify::event::ModifyKind::Metadata(_)) {
                    return;
                }
                // renames surface as Modify(Name); existence decides the kind
                if matches!(modify, notify::event::ModifyKind::Name(_)) {
                    return self.add_renamed(&event.paths);
                }
                ChangeKind::Modified
            }
            _ => return,
        };

        crate::debug!("watch"; "raw notify: {:?} {:?}", event.kind, event.paths);
        for path in &event.paths {
            self.record(path, kind);
        }
    }

    fn add_renamed(&mut self, paths: &[PathBuf]) {
        for path in paths {
            let kind = if path.exists() {
                ChangeKind::Created
            } else {
                ChangeKind::Removed
            };
            self.record(path, kind);
        }
    }

    fn record(&mut self, path: &Path, kind: ChangeKind) {
        if is_temp_file(path) {
            return;
        }
        let path = normalize_path(path);

        match self.changes.get(&path).copied() {
            Some(ChangeKind::Removed) if kind != ChangeKind::Removed => {
                crate::debug!("watch"; "restored: {}", path.display());
                self.changes.insert(path, kind);
            }
            Some(ChangeKind::Modified) if kind == ChangeKind::Removed => {
                self.changes.insert(path, ChangeKind::Removed);
            }
            Some(ChangeKind::Created) if kind == ChangeKind::Removed => {
                crate::debug!("watch"; "discard created+removed: {}", path.display());
                self.changes.remove(&path);
            }
            Some(_) => {}
            None => {
                crate::debug!("watch"; "event {}: {}", kind.label(), path.display());
                self.changes.insert(path, kind);
            }
        }
        self.last_event = Some(Instant::now());
    }

    /// Take the batch once the quiet window has elapsed.
    pub(super) fn take_if_ready(&mut self) -> Option<FxHashMap<PathBuf, ChangeKind>> {
        if !self.is_ready() {
            return None;
        }
        self.last_event = None;
        let changes = std::mem::take(&mut self.changes);
        (!changes.is_empty()).then_some(changes)
    }

    /// Quiet window elapsed. A window whose changes cancelled out is still
    /// ready, so it gets reset instead of polled forever.
    pub(super) fn is_ready(&self) -> bool {
        self.last_event
            .is_some_and(|t| t.elapsed() >= Duration::from_millis(DEBOUNCE_MS))
    }

    /// Precise sleep duration until next possible ready time.
    pub(super) fn sleep_duration(&self) -> Duration {
        let Some(last_event) = self.last_event else {
            return Duration::from_secs(86400);
        };
        Duration::from_millis(DEBOUNCE_MS)
            .saturating_sub(last_event.elapsed())
            .max(Duration::from_millis(1))
    }
}

/// Check if path is a temp/backup file (editor artifacts).
fn is_temp_file(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    matches!(ext, "bck" | "bak" | "backup" | "swp" | "swo" | "tmp")
        || name.ends_with('~')
        || name.starts_with('.')
        // vim's 4913 write check file
        || name == "4913"
}
