//! Configuration section definitions.
//!
//! Each module corresponds to sections in `sitepipe.toml`:
//!
//! | Module  | TOML Section                          | Purpose                 |
//! |---------|---------------------------------------|-------------------------|
//! | `build` | `[build]`                             | Destination root        |
//! | `roles` | `[html]` `[css]` `[images]` `[fonts]` | Per-role globs and dest |
//! | `serve` | `[serve]`                             | Development server      |

mod build;
mod roles;
mod serve;

pub use build::BuildConfig;
pub use roles::{CssConfig, FontsConfig, HtmlConfig, ImagesConfig, RoleSection};
pub use serve::ServeConfig;
