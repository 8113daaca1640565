//! Relative `url()` rewriting for injected stylesheets.
//!
//! A `<style>` element resolves URLs against the page, a `<link>` against the
//! stylesheet. Injected content is rewritten to root-absolute paths so both
//! resolve to the same file.

/// Rewrite relative `url()` references in `css` against `sheet_url`, the
/// root-absolute URL path the stylesheet is served at.
pub fn rebase_urls(css: &str, sheet_url: &str) -> String {
    let base_dir = sheet_url.rsplit_once('/').map_or("", |(dir, _)| dir);
    // ascii lowercasing keeps byte offsets
    let lower = css.to_ascii_lowercase();

    let mut out = String::with_capacity(css.len());
    let mut pos = 0;
    while let Some(found) = lower[pos..].find("url(") {
        let open = pos + found + "url(".len();
        out.push_str(&css[pos..open]);
        pos = open;
        if let Some((consumed, rewritten)) = rewrite_argument(&css[open..], base_dir) {
            out.push_str(&rewritten);
            pos += consumed;
        }
    }
    out.push_str(&css[pos..]);
    out
}

/// Rewritten argument and the bytes it replaces, or `None` to keep it.
fn rewrite_argument(rest: &str, base_dir: &str) -> Option<(usize, String)> {
    let trimmed = rest.trim_start();
    let lead = rest.len() - trimmed.len();

    let quote = trimmed.chars().next().filter(|c| matches!(c, '"' | '\''));
    let body = match quote {
        Some(q) => &trimmed[q.len_utf8()..],
        None => trimmed,
    };
    let len = match quote {
        Some(q) => body.find(q)?,
        None => body.find(|c: char| c == ')' || c.is_whitespace())?,
    };

    let value = &body[..len];
    if !is_relative(value) {
        return None;
    }

    let quote = quote.map(String::from).unwrap_or_default();
    let consumed = lead + 2 * quote.len() + len;
    let resolved = resolve(base_dir, value);
    Some((consumed, format!("{}{quote}{resolved}{quote}", &rest[..lead])))
}

/// False for empty, root-relative, fragment-only and scheme URLs (`data:`, `https:`).
fn is_relative(url: &str) -> bool {
    if url.is_empty() || url.starts_with(['/', '#']) {
        return false;
    }
    let has_scheme = url.split_once(':').is_some_and(|(scheme, _)| {
        scheme.starts_with(|c: char| c.is_ascii_alphabetic())
            && scheme
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
    });
    !has_scheme
}

/// Join and normalize; `..` stops at the root.
fn resolve(base_dir: &str, url: &str) -> String {
    let (path, suffix) = url.find(['?', '#']).map_or((url, ""), |i| url.split_at(i));

    let mut segments: Vec<&str> = base_dir.split('/').filter(|s| !s.is_empty()).collect();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }
    format!("/{}{suffix}", segments.join("/"))
}
