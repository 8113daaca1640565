//! Configuration utility types.
//!
//! | Module   | Purpose                                      |
//! |----------|----------------------------------------------|
//! | `error`  | Configuration error types                    |
//! | `field`  | Field paths used in diagnostics              |
//! | `handle` | Global configuration handle (thread-safe)    |

mod error;
mod field;
pub mod handle;

pub use error::{ConfigDiagnostics, ConfigError};
pub use field::FieldPath;
pub use handle::{cfg, init_config};
