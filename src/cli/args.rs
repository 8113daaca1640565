//! Command-line interface definitions.

use crate::core::Role;
use clap::{ColorChoice, Parser, Subcommand};
use std::path::PathBuf;

/// sitepipe static-site asset pipeline CLI
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Control colored output (auto, always, never)
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Config file path, searched upward from the working directory
    #[arg(short = 'C', long, global = true, default_value = crate::config::DEFAULT_CONFIG, value_hint = clap::ValueHint::FilePath)]
    pub config: PathBuf,

    /// Enable verbose output for debugging
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Clean the output directory, then run every step once
    #[command(visible_alias = "b")]
    Build,

    /// Build once, then rebuild on change and serve with live reload
    #[command(visible_alias = "w")]
    Watch {
        #[command(flatten)]
        serve_args: ServeArgs,
    },

    /// Remove everything in the output directory
    Clean,

    /// Serve the output directory without building or watching
    #[command(visible_alias = "s")]
    Serve {
        #[command(flatten)]
        serve_args: ServeArgs,
    },

    /// Run one step without cleaning the output directory
    Step {
        /// Role to run
        role: Role,
    },
}

/// Dev server arguments shared by `watch` and `serve`.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct ServeArgs {
    /// Network interface to bind (e.g., 127.0.0.1, 0.0.0.0)
    #[arg(short, long)]
    pub interface: Option<std::net::IpAddr>,

    /// Port number to listen on
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Inject the live-reload client into served pages
    #[arg(short, long, action = clap::ArgAction::Set, num_args = 0..=1, default_missing_value = "true", require_equals = false)]
    pub live_reload: Option<bool>,
}

impl Cli {
    pub const fn serve_args(&self) -> Option<&ServeArgs> {
        match &self.command {
            Commands::Watch { serve_args } | Commands::Serve { serve_args } => Some(serve_args),
            _ => None,
        }
    }
}
