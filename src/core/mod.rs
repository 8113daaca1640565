//! Core types shared across the pipeline.
//!
//! - `role` - The four asset roles
//! - `state` - Process-wide serve/shutdown state

mod role;
mod state;

pub use role::Role;
pub use state::{is_shutdown, register_server, setup_shutdown_handler};
