//! Build orchestration.
//!
//! Every step run has three phases:
//!
//! ```text
//! transform   sources ──Transform──> Vec<StagedFile>      (pure)
//! commit      OutputDir::write(dest, staged) ─> WriteReport
//! notify      RoleRun ──> ReloadEvent                     (watch mode only)
//! ```
//!
//! [`build`] cleans the output root, then runs every enabled role in
//! parallel. Roles write to disjoint destinations, so no locking is needed.

mod invalidation;

pub use invalidation::Invalidation;

use crate::config::SiteConfig;
use crate::core::{Role, is_shutdown};
use crate::output::{OutputDir, OutputError};
use crate::step::{self, SourceFile, StagedFile, StepError};
use crate::utils::glob::to_slash;
use crate::{debug, log, logger::ProgressLine};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Step(#[from] StepError),

    #[error(transparent)]
    Output(#[from] OutputError),

    #[error("role `{0}` is disabled")]
    Disabled(Role),

    #[error("interrupted")]
    Interrupted,
}

impl RunError {
    /// Offending file, when one is known.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Step(e) => Some(e.path()),
            Self::Output(e) => Some(e.path()),
            Self::Disabled(_) | Self::Interrupted => None,
        }
    }

    /// Short detail for the browser overlay.
    pub fn detail(&self) -> String {
        match self {
            Self::Step(e) => e.detail(),
            Self::Output(e) => format!("{e}: {}", std::error::Error::source(e).map(ToString::to_string).unwrap_or_default()),
            other => other.to_string(),
        }
    }
}

/// A stylesheet written by a run, addressed by its URL path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stylesheet {
    pub url: String,
    pub content: String,
}

/// Result of one successful step run.
#[derive(Debug, Clone)]
pub struct RoleRun {
    pub role: Role,
    /// Number of source files transformed.
    pub sources: usize,
    pub written: Vec<PathBuf>,
    /// Formatted and minified stylesheets (css role only).
    pub styles: Vec<Stylesheet>,
}

impl RoleRun {
    /// URL path of the first written file.
    pub fn first_url(&self, output_root: &Path) -> Option<String> {
        self.written
            .first()
            .and_then(|path| url_path(output_root, path))
    }
}

/// One step entry of a [`BuildRun`].
#[derive(Debug)]
pub struct StepRecord {
    pub role: Role,
    pub result: Result<RoleRun, RunError>,
    pub duration: Duration,
}

/// Ephemeral record of one `build()` invocation.
#[derive(Debug, Default)]
pub struct BuildRun {
    pub steps: Vec<StepRecord>,
    pub duration: Duration,
}

impl BuildRun {
    pub fn succeeded(&self) -> bool {
        self.steps.iter().all(|s| s.result.is_ok())
    }

    pub fn failures(&self) -> impl Iterator<Item = (Role, &RunError)> {
        self.steps
            .iter()
            .filter_map(|s| s.result.as_ref().err().map(|e| (s.role, e)))
    }

    pub fn failed_roles(&self) -> Vec<Role> {
        self.failures().map(|(role, _)| role).collect()
    }
}

/// Remove everything below the output root.
pub fn clean(config: &SiteConfig) -> Result<(), OutputError> {
    OutputDir::new(config.output_dir()).clean()
}

/// Clean, then run all enabled steps in parallel.
///
/// Clean failures abort the build. Step failures are collected: the other
/// steps still finish and the returned record reports which ones failed.
pub fn build(config: &SiteConfig, quiet: bool) -> Result<BuildRun, OutputError> {
    let start = Instant::now();
    clean(config)?;

    let roles: Vec<Role> = config.enabled_roles().collect();
    let progress = (!quiet).then(|| {
        let counts: Vec<_> = roles
            .iter()
            .map(|&role| (role.name(), config.spec(role).map_or(0, |s| s.sources().len())))
            .collect();
        ProgressLine::new(&counts)
    });

    let steps: Vec<StepRecord> = roles
        .par_iter()
        .map(|&role| {
            let started = Instant::now();
            let result = run_role(config, role, &Invalidation::Full);
            if let (Some(progress), Ok(run)) = (&progress, &result) {
                for _ in 0..run.sources {
                    progress.inc(role.name());
                }
            }
            StepRecord {
                role,
                result,
                duration: started.elapsed(),
            }
        })
        .collect();

    if let Some(progress) = progress {
        progress.finish();
    }

    let run = BuildRun {
        steps,
        duration: start.elapsed(),
    };
    for (role, err) in run.failures() {
        log!("error"; "{role}: {err}");
    }
    for step in &run.steps {
        debug!("build"; "{} finished in {:?}", step.role, step.duration);
    }
    Ok(run)
}

/// Run one role's step for `invalidation`, without cleaning.
///
/// For `Files`, paths that are no longer direct sources (deleted, renamed
/// or no longer matching) are skipped.
pub fn run_role(
    config: &SiteConfig,
    role: Role,
    invalidation: &Invalidation,
) -> Result<RoleRun, RunError> {
    let spec = config.spec(role).ok_or(RunError::Disabled(role))?;
    if is_shutdown() {
        return Err(RunError::Interrupted);
    }

    let files: Vec<SourceFile> = match invalidation {
        Invalidation::Full => spec.sources(),
        Invalidation::Files(paths) => paths
            .iter()
            .filter(|p| p.is_file())
            .filter_map(|p| spec.source_file(p))
            .collect(),
    };

    // transform
    let transform = step::for_role(config, role);
    let staged = transform.transform(&files)?;

    // commit
    let output = OutputDir::new(config.output_dir());
    let written = output.write(&spec.dest, &staged).into_result()?;

    let styles = if role.injects_styles() {
        stylesheets(config.output_dir(), &spec.dest, staged)
    } else {
        Vec::new()
    };

    Ok(RoleRun {
        role,
        sources: files.len(),
        written,
        styles,
    })
}

/// Remove the outputs of deleted direct sources of `role`.
pub fn prune(config: &SiteConfig, role: Role, removed: &[PathBuf]) -> Result<usize, RunError> {
    let spec = config.spec(role).ok_or(RunError::Disabled(role))?;
    let transform = step::for_role(config, role);
    let outputs: Vec<PathBuf> = removed
        .iter()
        .filter_map(|p| spec.source_file(p))
        .flat_map(|file| transform.outputs(&file))
        .collect();
    Ok(OutputDir::new(config.output_dir()).prune(&spec.dest, &outputs)?)
}

fn stylesheets(output_root: &Path, dest: &Path, staged: Vec<StagedFile>) -> Vec<Stylesheet> {
    staged
        .into_iter()
        .filter_map(|file| {
            let url = url_path(output_root, &dest.join(&file.rel))?;
            let content = String::from_utf8(file.bytes).ok()?;
            Some(Stylesheet { url, content })
        })
        .collect()
}

/// `/assets/css/main.css` for `<output>/assets/css/main.css`.
pub fn url_path(output_root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(output_root).ok()?;
    Some(format!("/{}", to_slash(rel)?))
}
