//! Embedded static resources.
//!
//! - `template` - Template types for typed variable injection
//! - `serve` - Dev server resources (hotreload.js)
//!
//! The live-reload client is minified at build time (see `build.rs`) and
//! served from memory, so it never lands in the output directory.

mod template;

pub use template::{Template, TemplateVars};

pub mod serve {
    use super::{Template, TemplateVars};

    /// URL the dev server answers with the live-reload client.
    pub const HOTRELOAD_URL: &str = "/__sitepipe/hotreload.js";

    /// Variables for hotreload.js.
    pub struct HotreloadVars {
        pub ws_port: u16,
    }

    impl TemplateVars for HotreloadVars {
        fn apply(&self, content: &str) -> String {
            content.replace("__SITEPIPE_WS_PORT__", &self.ws_port.to_string())
        }
    }

    /// Hot reload JavaScript with WebSocket port injection.
    pub const HOTRELOAD_JS: Template<HotreloadVars> =
        Template::new(include_str!(concat!(env!("OUT_DIR"), "/hotreload.min.js")));

    /// `<script>` tag referencing the live-reload client.
    pub fn script_tag() -> String {
        format!(r#"<script src="{HOTRELOAD_URL}" defer></script>"#)
    }

}
