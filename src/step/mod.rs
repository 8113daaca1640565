//! Transformation steps.
//!
//! Each role has one stateless step mapping source files to staged output
//! files. Steps never touch the destination tree: the caller commits the
//! staged files through [`crate::output::OutputDir`].
//!
//! | Step     | Role     | Tooling                          |
//! |----------|----------|----------------------------------|
//! | `html`   | `html`   | minijinja, serde_yaml            |
//! | `css`    | `css`    | grass, lightningcss              |
//! | `images` | `images` | image (jpeg/png), quick-xml (svg)|
//! | `fonts`  | `fonts`  | byte copy                        |

mod css;
mod fonts;
mod html;
mod images;
mod svg;

pub use css::StyleCompile;
pub use fonts::FontCopy;
pub use html::TemplateRender;
pub use images::ImageOptimize;

use crate::config::SiteConfig;
use crate::core::Role;
pub use crate::utils::glob::SourceFile;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// One output file held in memory between transform and commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedFile {
    /// Path below the role destination directory.
    pub rel: PathBuf,
    pub bytes: Vec<u8>,
}

impl StagedFile {
    pub fn new(rel: impl Into<PathBuf>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            rel: rel.into(),
            bytes: bytes.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum StepError {
    /// Malformed input attributable to the source file.
    #[error("{}: {message}", path.display())]
    Source { path: PathBuf, message: String },

    /// A library failed on otherwise valid input.
    #[error("{}: {tool} failed: {message}", path.display())]
    Tool {
        tool: &'static str,
        path: PathBuf,
        message: String,
    },

    #[error("{}: failed to read", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl StepError {
    pub fn invalid(path: &Path, message: impl ToString) -> Self {
        Self::Source {
            path: path.to_path_buf(),
            message: message.to_string(),
        }
    }

    pub fn tool(tool: &'static str, path: &Path, message: impl ToString) -> Self {
        Self::Tool {
            tool,
            path: path.to_path_buf(),
            message: message.to_string(),
        }
    }

    /// The offending source file.
    pub fn path(&self) -> &Path {
        match self {
            Self::Source { path, .. } | Self::Tool { path, .. } | Self::Io { path, .. } => path,
        }
    }

    /// Message without the path prefix, for the browser overlay.
    pub fn detail(&self) -> String {
        match self {
            Self::Source { message, .. } => message.clone(),
            Self::Tool { tool, message, .. } => format!("{tool}: {message}"),
            Self::Io { source, .. } => source.to_string(),
        }
    }
}

/// Read a source file, mapping failures to [`StepError::Io`].
pub(crate) fn read(path: &Path) -> Result<Vec<u8>, StepError> {
    std::fs::read(path).map_err(|source| StepError::Io {
        path: path.to_path_buf(),
        source,
    })
}

pub(crate) fn read_to_string(path: &Path) -> Result<String, StepError> {
    let bytes = read(path)?;
    String::from_utf8(bytes).map_err(|_| StepError::invalid(path, "not valid UTF-8"))
}

/// Transform contract shared by every step.
///
/// `transform` is pure with respect to the destination tree: given the same
/// sources it returns the same staged files.
pub trait Transform: Send + Sync {
    /// Map source files to staged outputs. Fails on the first bad source.
    fn transform(&self, files: &[SourceFile]) -> Result<Vec<StagedFile>, StepError>;

    /// Destination-relative outputs produced by one source, for pruning.
    fn outputs(&self, file: &SourceFile) -> Vec<PathBuf> {
        vec![file.rel.clone()]
    }
}

/// Build the step for `role` from its config section.
pub fn for_role(config: &SiteConfig, role: Role) -> Box<dyn Transform> {
    match role {
        Role::Html => Box::new(TemplateRender::new(&config.html)),
        Role::Css => Box::new(StyleCompile::new(&config.css)),
        Role::Images => Box::new(ImageOptimize::new(&config.images)),
        Role::Fonts => Box::new(FontCopy),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_error_display() {
        let err = StepError::invalid(Path::new("/s/main.scss"), "expected \";\"");
        assert_eq!(err.to_string(), "/s/main.scss: expected \";\"");
        assert_eq!(err.path(), Path::new("/s/main.scss"));

        let err = StepError::tool("png", Path::new("/s/a.png"), "encoder error");
        assert_eq!(err.detail(), "png: encoder error");
    }

    #[test]
    fn test_read_missing_is_io_error() {
        let err = read(Path::new("/definitely/not/here.txt")).unwrap_err();
        assert!(matches!(err, StepError::Io { .. }));
    }
}
