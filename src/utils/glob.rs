//! Glob sets for role source and watch patterns.
//!
//! Patterns are written relative to the project root and support `*`, `**`,
//! `?`, `[...]` classes and `{a,b}` alternatives. Brace alternatives are
//! expanded up front since [`glob::Pattern`] has no notion of them.
//!
//! Every pattern has a *base*: the literal directory prefix before the first
//! wildcard component. Relative output paths are computed against it:
//!
//! ```text
//! src/assets/images/**/*.png   base = src/assets/images
//! src/assets/images/a/b.png    rel  = a/b.png
//! ```

use glob::{MatchOptions, Pattern, PatternError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

#[derive(Debug, Error)]
pub enum GlobError {
    #[error("glob is empty")]
    Empty,

    #[error("invalid glob `{pattern}`: {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: PatternError,
    },
}

/// One or more glob patterns written as a single config value.
///
/// Accepts either `"src/*.html"` or `["src/*.html", "pages/*.html"]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GlobList {
    One(String),
    Many(Vec<String>),
}

impl GlobList {
    pub fn patterns(&self) -> Vec<&str> {
        match self {
            Self::One(p) => vec![p.as_str()],
            Self::Many(ps) => ps.iter().map(String::as_str).collect(),
        }
    }

    /// True when no non-blank pattern is present.
    pub fn is_blank(&self) -> bool {
        self.patterns().iter().all(|p| p.trim().is_empty())
    }
}

impl From<&str> for GlobList {
    fn from(s: &str) -> Self {
        Self::One(s.to_string())
    }
}

/// A file matched by a glob: absolute path plus path relative to the glob base.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SourceFile {
    pub path: PathBuf,
    pub rel: PathBuf,
}

/// A single brace-free pattern anchored at its base directory.
#[derive(Debug, Clone)]
struct Glob {
    base: PathBuf,
    /// Remainder after the base, matched against the base-relative path.
    /// `None` matches every file below the base.
    rest: Option<Pattern>,
    /// Whether the remainder can match below the first directory level.
    recursive: bool,
}

impl Glob {
    fn new(root: &Path, raw: &str) -> Result<Self, GlobError> {
        let (base, rest) = split_base(raw);
        let rest = Pattern::new(&rest).map_err(|source| GlobError::Pattern {
            pattern: raw.to_string(),
            source,
        })?;
        let recursive = rest.as_str().contains('/') || rest.as_str().contains("**");
        Ok(Self {
            base: super::path::clean(&root.join(base)),
            rest: Some(rest),
            recursive,
        })
    }

    fn relative(&self, path: &Path) -> Option<PathBuf> {
        let rel = path.strip_prefix(&self.base).ok()?;
        let matched = match &self.rest {
            Some(rest) => rest.matches_with(&to_slash(rel)?, MATCH_OPTIONS),
            None => !rel.as_os_str().is_empty(),
        };
        matched.then(|| rel.to_path_buf())
    }
}

/// A compiled set of globs rooted at the project directory.
#[derive(Debug, Clone)]
pub struct GlobSet {
    globs: Vec<Glob>,
}

impl GlobSet {
    /// Compile every pattern (after brace expansion) relative to `root`.
    pub fn new(root: &Path, list: &GlobList) -> Result<Self, GlobError> {
        if list.is_blank() {
            return Err(GlobError::Empty);
        }
        let mut globs = Vec::new();
        for raw in list.patterns() {
            let raw = raw.trim();
            if raw.is_empty() {
                continue;
            }
            for expanded in expand_braces(raw) {
                globs.push(Glob::new(root, &expanded)?);
            }
        }
        Ok(Self { globs })
    }

    /// Add literal directories, matching everything below them.
    pub fn with_dirs<'a>(mut self, dirs: impl IntoIterator<Item = &'a Path>) -> Self {
        for dir in dirs {
            self.globs.push(Glob {
                base: super::path::clean(dir),
                rest: None,
                recursive: true,
            });
        }
        self
    }

    pub fn matches(&self, path: &Path) -> bool {
        self.globs.iter().any(|g| g.relative(path).is_some())
    }

    /// Relative path against the first glob that matches.
    pub fn relative(&self, path: &Path) -> Option<PathBuf> {
        self.globs.iter().find_map(|g| g.relative(path))
    }

    /// Base directories, deduplicated. These are what the watcher registers.
    pub fn bases(&self) -> Vec<&Path> {
        let mut bases: Vec<&Path> = self.globs.iter().map(|g| g.base.as_path()).collect();
        bases.sort();
        bases.dedup();
        bases
    }

    /// Enumerate matching files on disk, sorted by absolute path.
    ///
    /// A file matched by more than one pattern is listed once.
    pub fn files(&self) -> Vec<SourceFile> {
        let mut out = Vec::new();
        for glob in &self.globs {
            let mut found = Vec::new();
            walk(&glob.base, glob.recursive, &mut found);
            out.extend(found.into_iter().filter_map(|path| {
                let rel = glob.relative(&path)?;
                Some(SourceFile { path, rel })
            }));
        }
        out.sort();
        out.dedup_by(|a, b| a.path == b.path);
        out
    }
}

/// Every regular file below `dir`, sorted. Missing directories yield nothing.
pub fn files_in(dir: &Path) -> Vec<PathBuf> {
    let mut out = Vec::new();
    walk(dir, true, &mut out);
    out.sort();
    out
}

/// Collect regular files under `dir`. Missing directories yield nothing.
fn walk(dir: &Path, recursive: bool, out: &mut Vec<PathBuf>) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        let Ok(file_type) = entry.file_type() else {
            continue;
        };
        if file_type.is_dir() {
            if recursive {
                walk(&path, true, out);
            }
        } else if path.is_file() {
            out.push(path);
        }
    }
}

/// Split a pattern into its literal directory prefix and the remainder.
fn split_base(pattern: &str) -> (PathBuf, String) {
    let parts: Vec<&str> = pattern.split('/').collect();
    let first_magic = parts
        .iter()
        .position(|p| p.contains(['*', '?', '[']))
        .unwrap_or(parts.len() - 1);

    let base: PathBuf = parts[..first_magic].iter().collect();
    let rest = parts[first_magic..]
        .iter()
        .map(|p| if p.contains(['*', '?', '[']) { (*p).to_string() } else { Pattern::escape(p) })
        .collect::<Vec<_>>()
        .join("/");
    (base, rest)
}

/// Join normal components with `/`. `None` for non-UTF-8 or non-normal parts.
pub fn to_slash(path: &Path) -> Option<String> {
    let mut parts = Vec::new();
    for component in path.components() {
        match component {
            Component::Normal(s) => parts.push(s.to_str()?),
            _ => return None,
        }
    }
    Some(parts.join("/"))
}

/// Expand `{a,b}` alternatives, including nested ones.
///
/// A brace group without a comma is kept literally.
pub fn expand_braces(pattern: &str) -> Vec<String> {
    let Some(open) = pattern.find('{') else {
        return vec![pattern.to_string()];
    };

    let mut depth = 0usize;
    let mut close = None;
    let mut commas = Vec::new();
    for (i, c) in pattern[open..].char_indices() {
        let i = open + i;
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    close = Some(i);
                    break;
                }
            }
            ',' if depth == 1 => commas.push(i),
            _ => {}
        }
    }

    let Some(close) = close else {
        return vec![pattern.to_string()];
    };

    let (prefix, suffix) = (&pattern[..open], &pattern[close + 1..]);
    if commas.is_empty() {
        let head = &pattern[..=close];
        return expand_braces(suffix)
            .into_iter()
            .map(|tail| format!("{head}{tail}"))
            .collect();
    }

    let mut alternatives = Vec::with_capacity(commas.len() + 1);
    let mut start = open + 1;
    for &comma in &commas {
        alternatives.push(&pattern[start..comma]);
        start = comma + 1;
    }
    alternatives.push(&pattern[start..close]);

    let mut out: Vec<String> = Vec::new();
    for alt in alternatives {
        for expanded in expand_braces(&format!("{prefix}{alt}{suffix}")) {
            if !out.contains(&expanded) {
                out.push(expanded);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"x").unwrap();
    }

    #[test]
    fn test_expand_braces() {
        assert_eq!(expand_braces("a/*.{jpg,png}"), vec!["a/*.jpg", "a/*.png"]);
        assert_eq!(expand_braces("plain/*.html"), vec!["plain/*.html"]);
        assert_eq!(
            expand_braces("{x,y}/{1,2}"),
            vec!["x/1", "x/2", "y/1", "y/2"]
        );
        assert_eq!(expand_braces("a.{b,{c,d}}"), vec!["a.b", "a.c", "a.d"]);
        // unbalanced and comma-less groups stay literal
        assert_eq!(expand_braces("a{b"), vec!["a{b"]);
        assert_eq!(expand_braces("a{b}.{c,d}"), vec!["a{b}.c", "a{b}.d"]);
    }

    #[test]
    fn test_split_base() {
        let (base, rest) = split_base("src/assets/images/**/*.png");
        assert_eq!(base, PathBuf::from("src/assets/images"));
        assert_eq!(rest, "**/*.png");

        let (base, rest) = split_base("src/index.html");
        assert_eq!(base, PathBuf::from("src"));
        assert_eq!(rest, "index.html");

        let (base, rest) = split_base("*.html");
        assert_eq!(base, PathBuf::new());
        assert_eq!(rest, "*.html");
    }

    #[test]
    fn test_single_star_does_not_cross_directories() {
        let root = Path::new("/site");
        let set = GlobSet::new(root, &"src/*.html".into()).unwrap();
        assert!(set.matches(Path::new("/site/src/index.html")));
        assert!(!set.matches(Path::new("/site/src/partials/header.html")));
        assert!(!set.matches(Path::new("/site/src/style.css")));
    }

    #[test]
    fn test_double_star_matches_any_depth() {
        let root = Path::new("/site");
        let set = GlobSet::new(root, &"src/**/*.html".into()).unwrap();
        assert!(set.matches(Path::new("/site/src/index.html")));
        assert!(set.matches(Path::new("/site/src/partials/header.html")));
        assert_eq!(
            set.relative(Path::new("/site/src/a/b/c.html")),
            Some(PathBuf::from("a/b/c.html"))
        );
    }

    #[test]
    fn test_glob_list_many() {
        let root = Path::new("/site");
        let list = GlobList::Many(vec!["a/*.txt".into(), "b/*.md".into()]);
        let set = GlobSet::new(root, &list).unwrap();
        assert!(set.matches(Path::new("/site/a/x.txt")));
        assert!(set.matches(Path::new("/site/b/y.md")));
        assert!(!set.matches(Path::new("/site/a/y.md")));
    }

    #[test]
    fn test_empty_glob_rejected() {
        let root = Path::new("/site");
        assert!(matches!(GlobSet::new(root, &"  ".into()), Err(GlobError::Empty)));
        assert!(matches!(
            GlobSet::new(root, &GlobList::Many(vec![])),
            Err(GlobError::Empty)
        ));
    }

    #[test]
    fn test_invalid_pattern_rejected() {
        let root = Path::new("/site");
        assert!(matches!(
            GlobSet::new(root, &"src/[*.html".into()),
            Err(GlobError::Pattern { .. })
        ));
    }

    #[test]
    fn test_files_enumerates_sorted_and_deduplicated() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        touch(root, "img/b.png");
        touch(root, "img/a.jpg");
        touch(root, "img/nested/c.png");
        touch(root, "img/skip.txt");

        let set = GlobSet::new(root, &"img/**/*.{jpg,png}".into()).unwrap();
        let rels: Vec<_> = set.files().into_iter().map(|f| f.rel).collect();
        assert_eq!(
            rels,
            vec![
                PathBuf::from("a.jpg"),
                PathBuf::from("b.png"),
                PathBuf::from("nested/c.png"),
            ]
        );

        // overlapping patterns list a file once
        let list = GlobList::Many(vec!["img/*.png".into(), "img/**/*.png".into()]);
        let set = GlobSet::new(root, &list).unwrap();
        assert_eq!(set.files().len(), 2);
    }

    #[test]
    fn test_trailing_double_star_walks_subdirectories() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        touch(root, "fonts/top.woff2");
        touch(root, "fonts/inter/inter.woff2");

        let set = GlobSet::new(root, &"fonts/**".into()).unwrap();
        assert!(set.matches(&root.join("fonts/inter/inter.woff2")));
        let rels: Vec<_> = set.files().into_iter().map(|f| f.rel).collect();
        assert_eq!(
            rels,
            vec![PathBuf::from("inter/inter.woff2"), PathBuf::from("top.woff2")]
        );
    }

    #[test]
    fn test_files_missing_base_is_empty() {
        let dir = TempDir::new().unwrap();
        let set = GlobSet::new(dir.path(), &"nope/*.html".into()).unwrap();
        assert!(set.files().is_empty());
    }

    #[test]
    fn test_with_dirs_matches_everything_below() {
        let root = Path::new("/site");
        let set = GlobSet::new(root, &"src/*.html".into())
            .unwrap()
            .with_dirs([Path::new("/site/src/data")]);
        assert!(set.matches(Path::new("/site/src/data/nav.yml")));
        assert!(set.matches(Path::new("/site/src/data/deep/x.json")));
    }

    #[test]
    fn test_bases_deduplicated() {
        let root = Path::new("/site");
        let set = GlobSet::new(root, &"img/**/*.{jpg,png,svg}".into()).unwrap();
        assert_eq!(set.bases(), vec![Path::new("/site/img")]);
    }
}
