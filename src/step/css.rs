//! Stylesheet step: Sass → prefixed CSS, formatted and minified.
//!
//! ```text
//! main.scss ──grass──> css ──lightningcss(targets)──┬──> main.css
//!                                                  └──> main.min.css
//! _vars.scss  (partial, no output)
//! ```

use super::{SourceFile, StagedFile, StepError, Transform};
use crate::config::CssConfig;
use crate::core::Role;
use lightningcss::stylesheet::{MinifyOptions, ParserOptions, PrinterOptions, StyleSheet};
use lightningcss::targets::{Browsers, Targets};
use rayon::prelude::*;
use std::path::{Path, PathBuf};

pub struct StyleCompile {
    targets: Targets,
}

impl StyleCompile {
    pub fn new(config: &CssConfig) -> Self {
        // queries are validated at config load time
        let browsers = Browsers::from_browserslist(&config.targets).ok().flatten();
        Self {
            targets: Targets {
                browsers,
                ..Targets::default()
            },
        }
    }

    fn compile(&self, path: &Path) -> Result<(String, String), StepError> {
        let options = grass::Options::default().style(grass::OutputStyle::Expanded);
        let css = grass::from_path(path, &options).map_err(|e| StepError::invalid(path, e))?;
        self.finish(path, &css)
    }

    /// Prefix and print plain CSS twice: formatted, then minified.
    fn finish(&self, path: &Path, css: &str) -> Result<(String, String), StepError> {
        let tool_err = |e: &dyn std::fmt::Display| StepError::tool("lightningcss", path, e);

        let parser_options = ParserOptions {
            filename: path.display().to_string(),
            ..ParserOptions::default()
        };
        let mut sheet = StyleSheet::parse(css, parser_options).map_err(|e| tool_err(&e))?;
        sheet
            .minify(MinifyOptions {
                targets: self.targets,
                ..MinifyOptions::default()
            })
            .map_err(|e| tool_err(&e))?;

        let print = |minify| {
            sheet
                .to_css(PrinterOptions {
                    minify,
                    targets: self.targets,
                    ..PrinterOptions::default()
                })
                .map(|out| out.code)
                .map_err(|e| tool_err(&e))
        };
        Ok((print(false)?, print(true)?))
    }
}

/// `a/main.scss` → (`a/main.css`, `a/main.min.css`)
fn output_names(rel: &Path) -> (PathBuf, PathBuf) {
    let stem = rel
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    (
        rel.with_file_name(format!("{stem}.css")),
        rel.with_file_name(format!("{stem}.min.css")),
    )
}

impl Transform for StyleCompile {
    fn transform(&self, files: &[SourceFile]) -> Result<Vec<StagedFile>, StepError> {
        let compiled = files
            .par_iter()
            .filter(|file| Role::Css.is_entry(&file.path))
            .map(|file| {
                let (pretty, minified) = self.compile(&file.path)?;
                let (css_name, min_name) = output_names(&file.rel);
                Ok([
                    StagedFile::new(css_name, pretty),
                    StagedFile::new(min_name, minified),
                ])
            })
            .collect::<Result<Vec<_>, StepError>>()?;
        Ok(compiled.into_iter().flatten().collect())
    }

    fn outputs(&self, file: &SourceFile) -> Vec<PathBuf> {
        let (css_name, min_name) = output_names(&file.rel);
        vec![css_name, min_name]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn step(targets: &[&str]) -> StyleCompile {
        StyleCompile::new(&CssConfig {
            targets: targets.iter().map(|t| t.to_string()).collect(),
            ..CssConfig::default()
        })
    }

    fn source(dir: &Path, rel: &str, content: &str) -> SourceFile {
        let path = dir.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, content).unwrap();
        SourceFile {
            path,
            rel: PathBuf::from(rel),
        }
    }

    #[test]
    fn test_output_names() {
        let (css, min) = output_names(Path::new("themes/dark.scss"));
        assert_eq!(css, PathBuf::from("themes/dark.css"));
        assert_eq!(min, PathBuf::from("themes/dark.min.css"));
    }

    #[test]
    fn test_compiles_pair_and_skips_partials() {
        let dir = TempDir::new().unwrap();
        let partial = source(dir.path(), "_vars.scss", "$accent: #ff0000;\n");
        let main = source(
            dir.path(),
            "main.scss",
            "@import \"vars\";\n/* banner */\n.button {\n  color: $accent;\n  .icon { margin: 0 auto; }\n}\n",
        );

        let staged = step(&["defaults"]).transform(&[partial, main]).unwrap();
        let names: Vec<_> = staged.iter().map(|f| f.rel.clone()).collect();
        assert_eq!(
            names,
            vec![PathBuf::from("main.css"), PathBuf::from("main.min.css")]
        );

        let pretty = String::from_utf8(staged[0].bytes.clone()).unwrap();
        let minified = String::from_utf8(staged[1].bytes.clone()).unwrap();
        assert!(pretty.contains(".button .icon"));
        assert!(!minified.contains("banner"));
        assert!(!minified.contains('\n'));
        assert!(minified.len() <= pretty.len());
    }

    #[test]
    fn test_sass_syntax_error_names_file() {
        let dir = TempDir::new().unwrap();
        let broken = source(dir.path(), "broken.scss", ".a { color: red;\n");

        let err = step(&["defaults"]).transform(&[broken]).unwrap_err();
        assert!(matches!(err, StepError::Source { .. }));
        assert_eq!(err.path(), dir.path().join("broken.scss"));
    }

    #[test]
    fn test_vendor_prefixes_for_targets() {
        let css = ".a { user-select: none; }";
        let (pretty, _) = step(&["safari 13"])
            .finish(Path::new("a.css"), css)
            .unwrap();
        assert!(pretty.contains("-webkit-user-select"));
    }
}
