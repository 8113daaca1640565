//! Scope of one step run.

use std::collections::BTreeSet;
use std::path::PathBuf;

/// What a run must cover.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invalidation {
    /// Every source of the role, e.g. after an include file changed.
    Full,
    /// Specific direct sources.
    Files(BTreeSet<PathBuf>),
}

impl Invalidation {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::Files(BTreeSet::from([path.into()]))
    }

    /// Fold `other` into `self`. `Full` absorbs everything.
    pub fn merge(&mut self, other: Invalidation) {
        match other {
            Self::Full => *self = Self::Full,
            Self::Files(more) => {
                if let Self::Files(files) = self {
                    files.extend(more);
                }
            }
        }
    }

    pub fn merged(mut self, other: Invalidation) -> Self {
        self.merge(other);
        self
    }

    #[cfg(test)]
    const fn is_full(&self) -> bool {
        matches!(self, Self::Full)
    }
}
