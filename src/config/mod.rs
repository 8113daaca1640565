//! Site configuration management for `sitepipe.toml`.
//!
//! # Module Structure
//!
//! ```text
//! config/
//! ├── section/       # Configuration section definitions
//! │   ├── build      # [build]
//! │   ├── roles      # [html] [css] [images] [fonts]
//! │   └── serve      # [serve]
//! ├── types/         # Utility types
//! │   ├── error      # ConfigError, ConfigDiagnostics
//! │   ├── field      # FieldPath
//! │   └── handle     # Global config handle
//! ├── pathspec.rs    # Compiled role globs
//! └── mod.rs         # SiteConfig (this file)
//! ```
//!
//! A missing config file is not an error: defaults describe the classic
//! `src/` → `dist/` layout.

mod pathspec;
pub mod section;
pub mod types;
mod util;

pub use pathspec::{PathSpec, SpecError};
pub use section::{
    BuildConfig, CssConfig, FontsConfig, HtmlConfig, ImagesConfig, RoleSection, ServeConfig,
};
pub use types::{ConfigDiagnostics, ConfigError, FieldPath, cfg, init_config};

use crate::{
    cli::{Cli, Commands, ServeArgs},
    core::Role,
    log,
    utils::{glob::GlobError, path::normalize_path},
};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};
use util::find_config_file;

/// Config file name searched for when `--config` is not given.
pub const DEFAULT_CONFIG: &str = "sitepipe.toml";

// ============================================================================
// root configuration
// ============================================================================

/// Root configuration structure representing sitepipe.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Absolute path to the config file (internal use only)
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Project root directory - parent of config file (internal use only)
    #[serde(skip)]
    pub root: PathBuf,

    /// Compiled globs of every enabled role (internal use only)
    #[serde(skip)]
    pub specs: Vec<PathSpec>,

    #[serde(default)]
    pub build: BuildConfig,

    #[serde(default)]
    pub html: HtmlConfig,

    #[serde(default)]
    pub css: CssConfig,

    #[serde(default)]
    pub images: ImagesConfig,

    #[serde(default)]
    pub fonts: FontsConfig,

    #[serde(default)]
    pub serve: ServeConfig,
}

impl SiteConfig {
    /// Load configuration from CLI arguments.
    ///
    /// Searches upward from cwd for the config file. The project root is the
    /// config file's parent directory, or cwd when no file exists.
    pub fn load(cli: &Cli) -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to get current working directory")?;

        let (mut config, config_path) = match find_config_file(&cli.config) {
            Some(path) => (Self::from_path(&path)?, path),
            None if cli.config != Path::new(DEFAULT_CONFIG) => {
                return Err(ConfigError::Validation(format!(
                    "config file `{}` not found",
                    cli.config.display()
                ))
                .into());
            }
            None => {
                log!("config"; "{} not found, using defaults", cli.config.display());
                (Self::default(), cwd.join(&cli.config))
            }
        };

        let root = config_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or(cwd);
        config.config_path = config_path;
        config.finalize(&root);
        config.apply_command_options(cli);

        // clean and serve never read sources
        let require_sources = matches!(
            cli.command,
            Commands::Build | Commands::Watch { .. } | Commands::Step { .. }
        );
        config.validate(require_sources)?;

        Ok(config)
    }

    /// Load configuration from file path with unknown field detection.
    fn from_path(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;

        let (config, ignored) = Self::parse_with_ignored(&content)?;

        if !ignored.is_empty() {
            Self::print_unknown_fields_warning(&ignored, path);
        }

        Ok(config)
    }

    /// Parse TOML content, collecting any unknown fields.
    fn parse_with_ignored(content: &str) -> Result<(Self, Vec<String>), ConfigError> {
        let mut ignored = Vec::new();
        let deserializer = toml::Deserializer::new(content);
        let config = serde_ignored::deserialize(deserializer, |path: serde_ignored::Path| {
            ignored.push(path.to_string());
        })?;
        Ok((config, ignored))
    }

    /// Print warning about unknown fields.
    fn print_unknown_fields_warning(fields: &[String], path: &Path) {
        let display_path = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_else(|| path.to_string_lossy());
        eprintln!();
        log!("warning"; "unknown fields in {}:", display_path);
        log!("warning"; "ignoring:");
        for field in fields {
            eprintln!("- {}", field);
        }
        eprintln!();
    }

    /// Get path relative to the site root
    pub fn root_relative(&self, path: impl AsRef<Path>) -> PathBuf {
        path.as_ref()
            .strip_prefix(&self.root)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| path.as_ref().to_path_buf())
    }

    /// Destination root (`[build] output`), absolute after loading.
    pub fn output_dir(&self) -> &Path {
        &self.build.output
    }

    pub fn section(&self, role: Role) -> &dyn RoleSection {
        match role {
            Role::Html => &self.html,
            Role::Css => &self.css,
            Role::Images => &self.images,
            Role::Fonts => &self.fonts,
        }
    }

    fn section_mut(&mut self, role: Role) -> &mut dyn RoleSection {
        match role {
            Role::Html => &mut self.html,
            Role::Css => &mut self.css,
            Role::Images => &mut self.images,
            Role::Fonts => &mut self.fonts,
        }
    }

    /// Compiled globs of an enabled role.
    pub fn spec(&self, role: Role) -> Option<&PathSpec> {
        self.specs.iter().find(|spec| spec.role == role)
    }

    /// Roles with `enable = true`, in build order.
    pub fn enabled_roles(&self) -> impl Iterator<Item = Role> + '_ {
        Role::ALL
            .into_iter()
            .filter(|role| self.section(*role).enable())
    }

    // ========================================================================
    // finalize
    // ========================================================================

    /// Make every path absolute against the project root.
    fn finalize(&mut self, root: &Path) {
        let root = normalize_path(root);
        self.build.output = crate::utils::path::clean(&root.join(&self.build.output));
        for role in Role::ALL {
            self.section_mut(role).normalize(&root);
        }
        self.config_path = normalize_path(&self.config_path);
        self.root = root;
    }

    /// Apply command-specific configuration options.
    fn apply_command_options(&mut self, cli: &Cli) {
        if let Some(serve_args) = cli.serve_args() {
            self.apply_serve_args(serve_args);
        }
    }

    fn apply_serve_args(&mut self, args: &ServeArgs) {
        Self::update_option(&mut self.serve.interface, args.interface.as_ref());
        Self::update_option(&mut self.serve.port, args.port.as_ref());
        Self::update_option(&mut self.serve.live_reload, args.live_reload.as_ref());
    }

    /// Update config option if CLI value is provided.
    fn update_option<T: Clone>(config_option: &mut T, cli_option: Option<&T>) {
        if let Some(option) = cli_option {
            *config_option = option.clone();
        }
    }

    // ========================================================================
    // validation
    // ========================================================================

    /// Validate configuration and compile the role globs.
    ///
    /// Collects all validation errors and returns them at once.
    pub fn validate(&mut self, require_sources: bool) -> Result<(), ConfigError> {
        let mut diag = ConfigDiagnostics::new();
        let output = self.build.output.clone();

        if self.root.starts_with(&output) {
            diag.error_with_hint(
                FieldPath::new("build.output"),
                format!(
                    "output `{}` contains the project root and would be cleaned",
                    output.display()
                ),
                "use a dedicated directory such as \"dist\"",
            );
        }

        if self.serve.ws_port == self.serve.port {
            diag.warn(
                FieldPath::new("serve.ws_port"),
                "same as serve.port, live reload will fall back to a later port",
            );
        }

        let mut specs = Vec::new();
        for role in self.enabled_roles().collect::<Vec<_>>() {
            let section = self.section(role);
            section.validate(&mut diag);

            if !section.dest().starts_with(&output) {
                diag.error_with_hint(
                    section.field("dest"),
                    format!(
                        "destination `{}` is outside the output root `{}`",
                        section.dest().display(),
                        output.display()
                    ),
                    "every destination must live inside [build] output",
                );
            }

            match PathSpec::compile(&self.root, section) {
                Ok(spec) => {
                    if require_sources && spec.sources().is_empty() {
                        diag.error_with_hint(
                            section.field("source"),
                            "matches no files",
                            format!("set `[{role}] enable = false` if the role is unused"),
                        );
                    }
                    specs.push(spec);
                }
                Err(SpecError::Source(err)) => Self::glob_error(&mut diag, section.field("source"), err),
                Err(SpecError::Watch(err)) => Self::glob_error(&mut diag, section.field("watch"), err),
            }
        }

        diag.print_warnings();
        diag.into_result().map_err(ConfigError::Diagnostics)?;
        self.specs = specs;
        Ok(())
    }

    fn glob_error(diag: &mut ConfigDiagnostics, field: FieldPath, err: GlobError) {
        match err {
            GlobError::Empty => diag.error(field, "glob is empty"),
            err => diag.error(field, err.to_string()),
        }
    }
}

// ============================================================================
// Test Helpers (available to all modules via `use crate::config::test_*`)
// ============================================================================

/// Parse config text.
/// Panics if there are unknown fields (to catch config typos in tests).
#[cfg(test)]
pub fn test_parse_config(content: &str) -> SiteConfig {
    let (parsed, ignored) = SiteConfig::parse_with_ignored(content).unwrap();
    assert!(
        ignored.is_empty(),
        "test config has unknown fields: {:?}",
        ignored
    );
    parsed
}

/// Parse and finalize config rooted at `root`, compiling specs without
/// requiring sources to exist.
#[cfg(test)]
pub fn test_site_config(root: &Path, content: &str) -> SiteConfig {
    let mut config = test_parse_config(content);
    config.config_path = root.join("sitepipe.toml");
    config.finalize(root);
    config.validate(false).unwrap();
    config
}

// ============================================================================
// tests
// ============================================================================
