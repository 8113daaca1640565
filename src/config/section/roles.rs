//! `[html]`, `[css]`, `[images]` and `[fonts]` sections.
//!
//! Every role section carries the same four keys:
//!
//! ```toml
//! [css]
//! enable = true
//! source = "src/assets/scss/*.scss"       # files a build reads
//! watch = "src/assets/scss/**/*.scss"     # files that trigger a rebuild
//! dest = "dist/assets/css"
//! ```
//!
//! `source` and `watch` accept a single glob or an array of globs.
//! Paths are relative to the project root until [`RoleSection::normalize`].

use crate::config::{ConfigDiagnostics, FieldPath};
use crate::core::Role;
use crate::utils::glob::GlobList;
use crate::utils::path::clean;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Keys shared by every role section.
pub trait RoleSection {
    fn role(&self) -> Role;
    fn enable(&self) -> bool;
    fn source(&self) -> &GlobList;
    fn watch(&self) -> &GlobList;
    fn dest(&self) -> &Path;

    /// Directories outside the watch globs whose changes invalidate the role.
    fn include_dirs(&self) -> Vec<&Path> {
        Vec::new()
    }

    /// Resolve relative paths against the project root.
    fn normalize(&mut self, root: &Path);

    /// Role-specific parameter checks.
    fn validate(&self, _diag: &mut ConfigDiagnostics) {}

    fn field(&self, key: &str) -> FieldPath {
        FieldPath::join(self.role().name(), key)
    }
}

macro_rules! shared_keys {
    ($role:expr) => {
        fn role(&self) -> Role {
            $role
        }
        fn enable(&self) -> bool {
            self.enable
        }
        fn source(&self) -> &GlobList {
            &self.source
        }
        fn watch(&self) -> &GlobList {
            &self.watch
        }
        fn dest(&self) -> &Path {
            &self.dest
        }
    };
}

// ============================================================================
// [html]
// ============================================================================

/// Template pages rendered with layouts, partials, helpers and data.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HtmlConfig {
    pub enable: bool,
    pub source: GlobList,
    pub watch: GlobList,
    pub dest: PathBuf,
    /// Site root, used to compute each page's `root` prefix.
    pub root: PathBuf,
    pub layouts: PathBuf,
    pub partials: PathBuf,
    pub helpers: PathBuf,
    pub data: PathBuf,
}

impl Default for HtmlConfig {
    fn default() -> Self {
        Self {
            enable: true,
            source: "src/*.html".into(),
            watch: "src/**/*.html".into(),
            dest: "dist".into(),
            root: "src".into(),
            layouts: "src/layouts".into(),
            partials: "src/partials".into(),
            helpers: "src/helpers".into(),
            data: "src/data".into(),
        }
    }
}

impl RoleSection for HtmlConfig {
    shared_keys!(Role::Html);

    fn include_dirs(&self) -> Vec<&Path> {
        vec![&self.layouts, &self.partials, &self.helpers, &self.data]
    }

    fn normalize(&mut self, root: &Path) {
        for path in [
            &mut self.dest,
            &mut self.root,
            &mut self.layouts,
            &mut self.partials,
            &mut self.helpers,
            &mut self.data,
        ] {
            *path = clean(&root.join(&*path));
        }
    }
}

// ============================================================================
// [css]
// ============================================================================

/// Sass stylesheets, emitted as formatted and minified CSS.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CssConfig {
    pub enable: bool,
    pub source: GlobList,
    pub watch: GlobList,
    pub dest: PathBuf,
    /// Browserslist queries used for vendor prefixing.
    pub targets: Vec<String>,
}

impl Default for CssConfig {
    fn default() -> Self {
        Self {
            enable: true,
            source: "src/assets/scss/*.scss".into(),
            watch: "src/assets/scss/**/*.scss".into(),
            dest: "dist/assets/css".into(),
            targets: vec!["defaults".into()],
        }
    }
}

impl RoleSection for CssConfig {
    shared_keys!(Role::Css);

    fn normalize(&mut self, root: &Path) {
        self.dest = clean(&root.join(&self.dest));
    }

    fn validate(&self, diag: &mut ConfigDiagnostics) {
        if let Err(err) = lightningcss::targets::Browsers::from_browserslist(&self.targets) {
            diag.error_with_hint(
                self.field("targets"),
                format!("invalid browserslist query: {err}"),
                "e.g. targets = [\"defaults\"] or [\"> 0.5%\", \"last 2 versions\"]",
            );
        }
    }
}

// ============================================================================
// [images]
// ============================================================================

/// Images re-encoded or minified in place, other files copied.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImagesConfig {
    pub enable: bool,
    pub source: GlobList,
    pub watch: GlobList,
    pub dest: PathBuf,
    /// JPEG encoder quality, `1..=100`.
    pub jpeg_quality: u8,
    /// PNG compression effort, `0..=7`.
    pub png_level: u8,
}

const IMAGE_EXTENSIONS: &str = "{jpg,png,svg,gif,ico,webp,webmanifest,xml,json}";

impl Default for ImagesConfig {
    fn default() -> Self {
        let glob = format!("src/assets/images/**/*.{IMAGE_EXTENSIONS}");
        Self {
            enable: true,
            source: GlobList::One(glob.clone()),
            watch: GlobList::One(glob),
            dest: "dist/assets/images".into(),
            jpeg_quality: 80,
            png_level: 5,
        }
    }
}

impl RoleSection for ImagesConfig {
    shared_keys!(Role::Images);

    fn normalize(&mut self, root: &Path) {
        self.dest = clean(&root.join(&self.dest));
    }

    fn validate(&self, diag: &mut ConfigDiagnostics) {
        if !(1..=100).contains(&self.jpeg_quality) {
            diag.error(
                self.field("jpeg_quality"),
                format!("must be between 1 and 100, got {}", self.jpeg_quality),
            );
        }
        if self.png_level > 7 {
            diag.error(
                self.field("png_level"),
                format!("must be between 0 and 7, got {}", self.png_level),
            );
        }
    }
}

// ============================================================================
// [fonts]
// ============================================================================

/// Font files copied byte for byte.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FontsConfig {
    pub enable: bool,
    pub source: GlobList,
    pub watch: GlobList,
    pub dest: PathBuf,
}

impl Default for FontsConfig {
    fn default() -> Self {
        let glob = "src/assets/fonts/**/*.{eot,woff,woff2,ttf,svg}";
        Self {
            enable: true,
            source: glob.into(),
            watch: glob.into(),
            dest: "dist/assets/fonts".into(),
        }
    }
}

impl RoleSection for FontsConfig {
    shared_keys!(Role::Fonts);

    fn normalize(&mut self, root: &Path) {
        self.dest = clean(&root.join(&self.dest));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_parse_config;

    #[test]
    fn test_role_defaults() {
        let config = test_parse_config("");
        assert!(config.html.enable);
        assert_eq!(config.html.source, GlobList::from("src/*.html"));
        assert_eq!(config.css.dest, PathBuf::from("dist/assets/css"));
        assert_eq!(config.images.jpeg_quality, 80);
        assert_eq!(config.images.png_level, 5);
        assert_eq!(config.css.targets, vec!["defaults".to_string()]);
    }

    #[test]
    fn test_glob_list_forms() {
        let config = test_parse_config(
            "[fonts]\nsource = [\"a/*.woff\", \"b/*.woff2\"]\nwatch = \"a/**/*\"",
        );
        assert_eq!(
            config.fonts.source,
            GlobList::Many(vec!["a/*.woff".into(), "b/*.woff2".into()])
        );
        assert_eq!(config.fonts.watch, GlobList::from("a/**/*"));
    }

    #[test]
    fn test_images_parameter_range() {
        let config = test_parse_config("[images]\njpeg_quality = 0\npng_level = 9");
        let mut diag = ConfigDiagnostics::new();
        config.images.validate(&mut diag);
        assert_eq!(diag.len(), 2);
        assert_eq!(diag.errors()[0].field.as_str(), "images.jpeg_quality");
        assert_eq!(diag.errors()[1].field.as_str(), "images.png_level");
    }

    #[test]
    fn test_css_targets_validated() {
        let config = test_parse_config("[css]\ntargets = [\"not a real query !!\"]");
        let mut diag = ConfigDiagnostics::new();
        config.css.validate(&mut diag);
        assert_eq!(diag.len(), 1);

        let mut diag = ConfigDiagnostics::new();
        test_parse_config("").css.validate(&mut diag);
        assert!(diag.is_empty());
    }

    #[test]
    fn test_html_normalize() {
        let mut html = HtmlConfig::default();
        html.normalize(Path::new("/site"));
        assert_eq!(html.dest, PathBuf::from("/site/dist"));
        assert_eq!(html.partials, PathBuf::from("/site/src/partials"));
        assert_eq!(html.include_dirs().len(), 4);
    }
}
