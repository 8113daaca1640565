//! Template step: pages rendered with minijinja.
//!
//! # Template names
//!
//! | Directory   | Registered as        | Used via                                  |
//! |-------------|----------------------|-------------------------------------------|
//! | `layouts/`  | `layouts/<name>`     | front matter `layout: <name>`             |
//! | `partials/` | `<rel without ext>`  | `{% include "header" %}`                  |
//! | `helpers/`  | `helpers/<name>`     | `{% import "helpers/<name>" as h %}`      |
//!
//! `data/*.{json,yml,yaml}` files become variables named by stem. Pages see
//! data, their front matter keys, then `page` (file stem) and `root`
//! (prefix back to the site root, e.g. `../`).

use super::{SourceFile, StagedFile, StepError, Transform, read_to_string};
use crate::config::HtmlConfig;
use crate::utils::glob::{files_in, to_slash};
use crate::utils::html::escape;
use minijinja::{AutoEscape, Environment, Output, State, Value, context};
use rayon::prelude::*;
use serde_json::{Map, Value as Json};
use std::path::{Path, PathBuf};

const DEFAULT_LAYOUT: &str = "default";
const NO_LAYOUT: &str = "none";

type Vars = Map<String, Json>;

pub struct TemplateRender {
    root: PathBuf,
    layouts: PathBuf,
    partials: PathBuf,
    helpers: PathBuf,
    data: PathBuf,
}

impl TemplateRender {
    pub fn new(config: &HtmlConfig) -> Self {
        Self {
            root: config.root.clone(),
            layouts: config.layouts.clone(),
            partials: config.partials.clone(),
            helpers: config.helpers.clone(),
            data: config.data.clone(),
        }
    }

    /// Environment with every include file registered, plus the data vars.
    ///
    /// Loaded once per run so a changed include is always seen.
    fn load(&self) -> Result<(Environment<'static>, Vars), StepError> {
        let mut env = Environment::new();
        env.set_keep_trailing_newline(true);
        env.set_auto_escape_callback(|_| AutoEscape::Html);
        env.set_formatter(html_formatter);

        for (dir, prefix) in [
            (&self.layouts, Some("layouts")),
            (&self.helpers, Some("helpers")),
            (&self.partials, None),
        ] {
            for path in files_in(dir) {
                let Some(name) = template_name(dir, &path, prefix) else {
                    continue;
                };
                let source = read_to_string(&path)?;
                env.add_template_owned(name, source)
                    .map_err(|e| StepError::invalid(&path, e))?;
            }
        }

        let mut data = Vars::new();
        for path in files_in(&self.data) {
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let value = match path.extension().and_then(|e| e.to_str()) {
                Some("json") => serde_json::from_str(&read_to_string(&path)?)
                    .map_err(|e| StepError::invalid(&path, e))?,
                Some("yml" | "yaml") => serde_yaml::from_str(&read_to_string(&path)?)
                    .map_err(|e| StepError::invalid(&path, e))?,
                _ => continue,
            };
            data.insert(stem.to_string(), value);
        }

        Ok((env, data))
    }

    fn render_page(
        &self,
        env: &Environment<'_>,
        data: &Vars,
        file: &SourceFile,
    ) -> Result<String, StepError> {
        let path = &file.path;
        let source = read_to_string(path)?;
        let (front, body) = match split_front_matter(&source) {
            Split::None => (Vars::new(), source.as_str()),
            Split::Unterminated => {
                return Err(StepError::invalid(path, "front matter is not closed with `---`"));
            }
            Split::Some { yaml, body } => (parse_front_matter(path, yaml)?, body),
        };

        let mut vars = data.clone();
        vars.extend(front);
        let layout = match vars.get("layout") {
            None => Layout::Default,
            Some(Json::Bool(false)) => Layout::None,
            Some(Json::String(name)) if name == NO_LAYOUT => Layout::None,
            Some(Json::String(name)) => Layout::Named(name.clone()),
            Some(other) => {
                return Err(StepError::invalid(
                    path,
                    format!("`layout` must be a string, got {other}"),
                ));
            }
        };
        vars.insert("page".into(), Json::String(page_stem(path)));
        vars.insert("root".into(), Json::String(self.root_prefix(file)));

        let name = to_slash(&file.rel).unwrap_or_else(|| file.rel.display().to_string());
        let rendered = env
            .render_named_str(&name, body, &vars)
            .map_err(|e| StepError::invalid(path, e))?;

        let template = match &layout {
            Layout::None => return Ok(rendered),
            Layout::Default => match env.get_template(&format!("layouts/{DEFAULT_LAYOUT}")) {
                Ok(t) => t,
                // no default layout: pages stand alone
                Err(_) => return Ok(rendered),
            },
            Layout::Named(layout) => env
                .get_template(&format!("layouts/{layout}"))
                .map_err(|_| StepError::invalid(path, format!("layout `{layout}` not found")))?,
        };

        template
            .render(context! {
                body => Value::from_safe_string(rendered),
                ..Value::from_serialize(&vars)
            })
            .map_err(|e| StepError::invalid(path, e))
    }

    /// `../` once per directory between the page and the site root.
    fn root_prefix(&self, file: &SourceFile) -> String {
        let rel = file.path.strip_prefix(&self.root).unwrap_or(&file.rel);
        let depth = rel.components().count().saturating_sub(1);
        "../".repeat(depth)
    }
}

enum Layout {
    Default,
    None,
    Named(String),
}

impl Transform for TemplateRender {
    fn transform(&self, files: &[SourceFile]) -> Result<Vec<StagedFile>, StepError> {
        let (env, data) = self.load()?;
        files
            .par_iter()
            .map(|file| {
                let html = self.render_page(&env, &data, file)?;
                Ok(StagedFile::new(file.rel.clone(), html))
            })
            .collect()
    }
}

/// Escape like Handlebars: `none` prints nothing, `/` is left alone.
fn html_formatter(
    out: &mut Output<'_>,
    _state: &State<'_, '_>,
    value: &Value,
) -> Result<(), minijinja::Error> {
    if value.is_undefined() || value.is_none() {
        return Ok(());
    }
    let text = value.to_string();
    let result = if value.is_safe() {
        out.write_str(&text)
    } else {
        out.write_str(&escape(&text))
    };
    result.map_err(minijinja::Error::from)
}

/// `dir/a/b.html` → `prefix/a/b`
fn template_name(dir: &Path, path: &Path, prefix: Option<&str>) -> Option<String> {
    let rel = path.strip_prefix(dir).ok()?.with_extension("");
    let rel = to_slash(&rel)?;
    Some(match prefix {
        Some(prefix) => format!("{prefix}/{rel}"),
        None => rel,
    })
}

fn page_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn parse_front_matter(path: &Path, yaml: &str) -> Result<Vars, StepError> {
    let value: Json = serde_yaml::from_str(yaml)
        .map_err(|e| StepError::invalid(path, format!("front matter: {e}")))?;
    match value {
        Json::Null => Ok(Vars::new()),
        Json::Object(map) => Ok(map),
        _ => Err(StepError::invalid(path, "front matter must be a mapping")),
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Split<'a> {
    None,
    Unterminated,
    Some { yaml: &'a str, body: &'a str },
}

/// Split `---` fenced YAML from the page body.
fn split_front_matter(source: &str) -> Split<'_> {
    let source = source.strip_prefix('\u{feff}').unwrap_or(source);
    let Some(rest) = source
        .strip_prefix("---\n")
        .or_else(|| source.strip_prefix("---\r\n"))
    else {
        return Split::None;
    };

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end_matches(['\r', '\n']) == "---" {
            return Split::Some {
                yaml: &rest[..offset],
                body: &rest[offset + line.len()..],
            };
        }
        offset += line.len();
    }
    Split::Unterminated
}
