//! Live-reload script injection.

use crate::{embed::serve::script_tag, utils::mime::is_html};

/// Inject the reload client if the body is HTML and live reload is on.
pub fn maybe_inject_hotreload(body: Vec<u8>, content_type: &str, live_reload: bool) -> Vec<u8> {
    if live_reload && is_html(content_type) {
        inject_hotreload_script(&body)
    } else {
        body
    }
}

/// Insert the script tag before the last `</body>`, or append it.
fn inject_hotreload_script(content: &[u8]) -> Vec<u8> {
    let script = script_tag();
    let script_bytes = script.as_bytes();

    const PATTERN: &[u8] = b"</body>";
    let pos = content
        .windows(PATTERN.len())
        .rposition(|w| w.eq_ignore_ascii_case(PATTERN))
        .unwrap_or(content.len());

    let mut result = Vec::with_capacity(content.len() + script_bytes.len());
    result.extend_from_slice(&content[..pos]);
    result.extend_from_slice(script_bytes);
    result.extend_from_slice(&content[pos..]);
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::mime::types::{CSS, HTML};

    fn inject(body: &str) -> String {
        String::from_utf8(maybe_inject_hotreload(body.as_bytes().to_vec(), HTML, true)).unwrap()
    }

    #[test]
    fn test_injects_before_last_body_close() {
        let out = inject("<html><body><p>\"</body>\" in text</p></BODY></html>");
        let tag = script_tag();
        assert!(out.ends_with(&format!("{tag}</BODY></html>")));
        assert_eq!(out.matches(&tag).count(), 1);
    }

    #[test]
    fn test_appends_without_body() {
        let out = inject("<p>fragment</p>");
        assert!(out.starts_with("<p>fragment</p>"));
        assert!(out.ends_with(&script_tag()));
    }

    #[test]
    fn test_non_html_and_disabled_untouched() {
        let css = b"body{}".to_vec();
        assert_eq!(maybe_inject_hotreload(css.clone(), CSS, true), css);
        let html = b"<body></body>".to_vec();
        assert_eq!(maybe_inject_hotreload(html.clone(), HTML, false), html);
    }
}
