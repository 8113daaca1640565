//! One-shot commands: `build`, `clean` and `step`.

use crate::{
    config::SiteConfig,
    core::Role,
    log,
    pipeline::{self, BuildRun, Invalidation},
};
use anyhow::{Context, Result, bail};

/// Clean, run every enabled step, report.
///
/// Fails if any step failed; the other steps still ran to completion.
pub fn build_site(config: &SiteConfig, quiet: bool) -> Result<BuildRun> {
    let run = pipeline::build(config, quiet).context("failed to clean output directory")?;

    let failed = run.failed_roles();
    if !failed.is_empty() {
        let names: Vec<_> = failed.iter().map(|r| r.name()).collect();
        bail!(
            "{} of {} steps failed: {}",
            failed.len(),
            run.steps.len(),
            names.join(", ")
        );
    }

    if !quiet {
        log!(
            "build"; "{} written to {} in {:.2?}",
            written(&run),
            config.root_relative(config.output_dir()).display(),
            run.duration
        );
    }
    Ok(run)
}

/// Initial build of watch mode: failures are reported, never fatal.
pub fn initial_build(config: &SiteConfig) -> Result<BuildRun> {
    let run = pipeline::build(config, false).context("failed to clean output directory")?;
    if run.succeeded() {
        log!("build"; "{} written in {:.2?}", written(&run), run.duration);
    } else {
        log!("watch"; "initial build failed, watching for fixes");
    }
    Ok(run)
}

pub fn clean_site(config: &SiteConfig) -> Result<()> {
    pipeline::clean(config).context("failed to clean output directory")?;
    log!("clean"; "{}", config.root_relative(config.output_dir()).display());
    Ok(())
}

/// Run a single step without cleaning.
pub fn run_step(config: &SiteConfig, role: Role) -> Result<()> {
    let run = pipeline::run_role(config, role, &Invalidation::Full)
        .with_context(|| format!("{role} step failed"))?;
    log!(role.name(); "{} sources, {} files written", run.sources, run.written.len());
    Ok(())
}

fn written(run: &BuildRun) -> String {
    let count: usize = run
        .steps
        .iter()
        .filter_map(|s| s.result.as_ref().ok())
        .map(|r| r.written.len())
        .sum();
    match count {
        1 => "1 file".to_string(),
        n => format!("{n} files"),
    }
}
