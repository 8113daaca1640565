//! Compiled per-role path specification.

use super::section::RoleSection;
use crate::core::Role;
use crate::utils::glob::{GlobError, GlobList, GlobSet, SourceFile};
use std::path::{Path, PathBuf};

/// Source globs, watch globs and destination directory of one role.
///
/// The watch set always covers the source set plus the role's include
/// directories, so every direct source change is also observed.
#[derive(Debug, Clone)]
pub struct PathSpec {
    pub role: Role,
    pub source: GlobSet,
    pub watch: GlobSet,
    pub dest: PathBuf,
}

/// Which half of a role section failed to compile.
#[derive(Debug)]
pub enum SpecError {
    Source(GlobError),
    Watch(GlobError),
}

impl PathSpec {
    pub fn compile(root: &Path, section: &dyn RoleSection) -> Result<Self, SpecError> {
        let source = GlobSet::new(root, section.source()).map_err(SpecError::Source)?;
        if section.watch().is_blank() {
            return Err(SpecError::Watch(GlobError::Empty));
        }
        let patterns = section
            .watch()
            .patterns()
            .into_iter()
            .chain(section.source().patterns())
            .map(String::from)
            .collect();
        let watch = GlobSet::new(root, &GlobList::Many(patterns))
            .map_err(SpecError::Watch)?
            .with_dirs(section.include_dirs());

        Ok(Self {
            role: section.role(),
            source,
            watch,
            dest: section.dest().to_path_buf(),
        })
    }

    /// All entry source files currently on disk.
    pub fn sources(&self) -> Vec<SourceFile> {
        let mut files = self.source.files();
        files.retain(|f| self.role.is_entry(&f.path));
        files
    }

    /// The path as a direct entry source of this role, if it is one.
    ///
    /// Matched non-entries (Sass partials) return `None` and count as
    /// indirect dependencies.
    pub fn source_file(&self, path: &Path) -> Option<SourceFile> {
        if !self.role.is_entry(path) {
            return None;
        }
        self.source.relative(path).map(|rel| SourceFile {
            path: path.to_path_buf(),
            rel,
        })
    }

    pub fn watches(&self, path: &Path) -> bool {
        self.watch.matches(path)
    }

    /// Directories a filesystem watcher must register for this role.
    pub fn watch_roots(&self) -> Vec<&Path> {
        self.watch.bases()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::section::HtmlConfig;

    fn html_spec() -> PathSpec {
        let mut html = HtmlConfig::default();
        html.normalize(Path::new("/site"));
        PathSpec::compile(Path::new("/site"), &html).unwrap()
    }

    #[test]
    fn test_source_is_direct() {
        let spec = html_spec();
        let file = spec.source_file(Path::new("/site/src/about.html")).unwrap();
        assert_eq!(file.rel, PathBuf::from("about.html"));
        assert!(spec.source_file(Path::new("/site/src/partials/nav.html")).is_none());
    }

    #[test]
    fn test_watch_covers_includes() {
        let spec = html_spec();
        assert!(spec.watches(Path::new("/site/src/partials/nav.html")));
        assert!(spec.watches(Path::new("/site/src/data/site.yml")));
        assert!(spec.watches(Path::new("/site/src/about.html")));
        assert!(!spec.watches(Path::new("/site/src/assets/scss/main.scss")));
    }

    #[test]
    fn test_blank_watch_rejected() {
        let mut html = HtmlConfig::default();
        html.watch = "".into();
        assert!(matches!(
            PathSpec::compile(Path::new("/site"), &html),
            Err(SpecError::Watch(GlobError::Empty))
        ));
    }
}
