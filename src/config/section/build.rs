//! `[build]` section configuration.
//!
//! ```toml
//! [build]
//! output = "dist"   # destination root, fully owned and cleaned
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Destination root. Everything inside may be removed by `clean`.
    pub output: PathBuf,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            output: "dist".into(),
        }
    }
}
