//! Destination tree management.
//!
//! The output root is owned by the tool. Each role writes only below its own
//! destination directory, so concurrent commits of different roles never
//! touch the same files.
//!
//! ```text
//! clean()            remove everything below the root
//! write(dest, files) create-or-overwrite, per-file report
//! prune(dest, rels)  remove outputs of deleted sources
//! ```

use crate::step::StagedFile;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("failed to clean `{path}`")]
    Clean {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write `{path}`")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to remove `{path}`")]
    Prune {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl OutputError {
    pub fn path(&self) -> &Path {
        match self {
            Self::Clean { path, .. } | Self::Write { path, .. } | Self::Prune { path, .. } => path,
        }
    }
}

/// Outcome of one commit. Earlier writes are never rolled back.
#[derive(Debug, Default)]
pub struct WriteReport {
    pub written: Vec<PathBuf>,
    pub failed: Vec<OutputError>,
}

impl WriteReport {
    #[cfg(test)]
    pub fn is_ok(&self) -> bool {
        self.failed.is_empty()
    }

    /// First failure, if any.
    pub fn into_result(mut self) -> Result<Vec<PathBuf>, OutputError> {
        if self.failed.is_empty() {
            Ok(self.written)
        } else {
            Err(self.failed.remove(0))
        }
    }
}

#[derive(Debug, Clone)]
pub struct OutputDir {
    root: PathBuf,
}

impl OutputDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[cfg(test)]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Remove all contents of the root, leaving it as an empty directory.
    ///
    /// A missing root is created.
    pub fn clean(&self) -> Result<(), OutputError> {
        let clean_err = |path: &Path| {
            let path = path.to_path_buf();
            move |source: io::Error| OutputError::Clean { path, source }
        };

        match fs::read_dir(&self.root) {
            Ok(entries) => {
                for entry in entries {
                    let entry = entry.map_err(clean_err(&self.root))?;
                    let path = entry.path();
                    let is_dir = entry.file_type().map_err(clean_err(&path))?.is_dir();
                    if is_dir {
                        fs::remove_dir_all(&path).map_err(clean_err(&path))?;
                    } else {
                        fs::remove_file(&path).map_err(clean_err(&path))?;
                    }
                }
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                fs::create_dir_all(&self.root).map_err(clean_err(&self.root))
            }
            Err(e) => Err(clean_err(&self.root)(e)),
        }
    }

    /// Write staged files below `dest`, creating parents and overwriting.
    pub fn write(&self, dest: &Path, files: &[StagedFile]) -> WriteReport {
        let mut report = WriteReport::default();
        for file in files {
            let path = dest.join(&file.rel);
            match write_one(&path, &file.rel, &file.bytes) {
                Ok(()) => report.written.push(path),
                Err(source) => report.failed.push(OutputError::Write { path, source }),
            }
        }
        report
    }

    /// Remove outputs below `dest`. Missing files are skipped.
    ///
    /// Directories left empty are removed up to `dest`.
    pub fn prune(&self, dest: &Path, rels: &[PathBuf]) -> Result<usize, OutputError> {
        let mut removed = 0;
        for rel in rels {
            if !is_contained(rel) {
                continue;
            }
            let path = dest.join(rel);
            match fs::remove_file(&path) {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                Err(source) => return Err(OutputError::Prune { path, source }),
            }
            remove_empty_parents(&path, dest);
        }
        Ok(removed)
    }
}

fn write_one(path: &Path, rel: &Path, bytes: &[u8]) -> io::Result<()> {
    if !is_contained(rel) {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "output path escapes its destination",
        ));
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, bytes)
}

/// Relative path made only of normal components.
fn is_contained(rel: &Path) -> bool {
    rel.components().next().is_some()
        && rel.components().all(|c| matches!(c, Component::Normal(_)))
}

fn remove_empty_parents(path: &Path, stop: &Path) {
    let mut current = path.parent();
    while let Some(dir) = current {
        if dir == stop || !dir.starts_with(stop) {
            break;
        }
        let empty = fs::read_dir(dir)
            .map(|mut e| e.next().is_none())
            .unwrap_or(false);
        if !empty || fs::remove_dir(dir).is_err() {
            break;
        }
        current = dir.parent();
    }
}
