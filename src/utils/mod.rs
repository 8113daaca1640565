//! Small helpers with no pipeline state.
//!
//! - [`glob`]: PathSpec glob expansion, matching and enumeration
//! - [`html`]: HTML escaping
//! - [`mime`]: Content-Type detection for the dev server
//! - [`path`]: Filesystem path normalization

pub mod glob;
pub mod html;
pub mod mime;
pub mod path;
