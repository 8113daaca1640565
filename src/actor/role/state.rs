use std::collections::BTreeSet;
use std::path::PathBuf;

use crate::pipeline::Invalidation;

/// What one step run must cover: outputs to prune, then sources to re-run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Work {
    pub removed: BTreeSet<PathBuf>,
    pub invalidation: Option<Invalidation>,
}

impl Work {
    pub fn invalidate(invalidation: Invalidation) -> Self {
        Self {
            removed: BTreeSet::new(),
            invalidation: Some(invalidation),
        }
    }

    pub fn remove(path: impl Into<PathBuf>) -> Self {
        Self {
            removed: BTreeSet::from([path.into()]),
            invalidation: None,
        }
    }

    pub fn merge(&mut self, other: Work) {
        self.removed.extend(other.removed);
        self.invalidation = match (self.invalidation.take(), other.invalidation) {
            (Some(a), Some(b)) => Some(a.merged(b)),
            (a, b) => a.or(b),
        };
    }

    fn merged(mut self, other: Work) -> Self {
        self.merge(other);
        self
    }

    #[cfg(test)]
    fn is_empty(&self) -> bool {
        self.removed.is_empty() && self.invalidation.is_none()
    }
}

/// Per-role watcher state.
///
/// ```text
///          change                     complete, nothing pending
///   Idle ─────────> Running{None} ──────────────────────────────> Idle
///                    │   ▲
///             change │   │ complete: start pending
///                    ▼   │
///               Running{Some(work)}   (later changes merge in)
/// ```
#[derive(Debug, Default, PartialEq, Eq)]
pub enum RoleState {
    #[default]
    Idle,
    Running {
        pending: Option<Work>,
    },
}

impl RoleState {
    /// Accept a change. Returns the work to start now, if the role was idle.
    pub fn on_change(&mut self, work: Work) -> Option<Work> {
        match self {
            Self::Idle => {
                *self = Self::Running { pending: None };
                Some(work)
            }
            Self::Running { pending } => {
                match pending {
                    Some(queued) => queued.merge(work),
                    None => *pending = Some(work),
                }
                None
            }
        }
    }

    /// A run finished. Returns the trailing work to start immediately, if any.
    pub fn on_complete(&mut self) -> Option<Work> {
        match std::mem::take(self) {
            Self::Running {
                pending: Some(work),
            } => {
                *self = Self::Running { pending: None };
                Some(work)
            }
            _ => None,
        }
    }

    #[cfg(test)]
    fn is_running(&self) -> bool {
        matches!(self, Self::Running { .. })
    }
}
