use std::path::Path;

use super::rebase::rebase_urls;
use crate::pipeline::RoleRun;

/// Notification payload for connected clients.
///
/// Transient: broadcast once, never retained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReloadEvent {
    /// Reload the whole page. `path` is the URL path of an affected file.
    FullReload { path: String },
    /// Swap one stylesheet in place. Relative `url()`s in `content` are
    /// already rewritten against `url`.
    StyleInject { url: String, content: String },
}

impl ReloadEvent {
    /// Events for a successful run. Runs that wrote nothing produce none.
    pub fn from_run(run: RoleRun, output_root: &Path) -> Vec<Self> {
        if run.written.is_empty() {
            return Vec::new();
        }

        if run.role.injects_styles() && !run.styles.is_empty() {
            return run
                .styles
                .into_iter()
                .map(|sheet| Self::StyleInject {
                    content: rebase_urls(&sheet.content, &sheet.url),
                    url: sheet.url,
                })
                .collect();
        }

        let path = run
            .first_url(output_root)
            .unwrap_or_else(|| run.role.to_string());
        vec![Self::FullReload { path }]
    }

    pub fn label(&self) -> &str {
        match self {
            Self::FullReload { path } => path,
            Self::StyleInject { url, .. } => url,
        }
    }
}
