//! Conservative SVG minification.
//!
//! Drops comments and whitespace-only text between elements. Text inside
//! `<text>`-like elements, `<style>` and `<script>` is kept byte for byte,
//! so no rendering-relevant content changes.

use quick_xml::events::Event;
use quick_xml::{Reader, Writer};

/// Elements whose character data is significant.
const PRESERVE: &[&[u8]] = &[
    b"text", b"tspan", b"textPath", b"title", b"desc", b"style", b"script",
];

pub fn minify(input: &[u8]) -> Result<Vec<u8>, quick_xml::Error> {
    let mut reader = Reader::from_reader(input);
    let mut writer = Writer::new(Vec::with_capacity(input.len()));
    let mut buf = Vec::new();
    let mut preserve_depth = 0usize;

    loop {
        let event = reader.read_event_into(&mut buf)?;
        match event {
            Event::Eof => break,
            Event::Comment(_) => {}
            Event::Text(ref text)
                if preserve_depth == 0 && text.iter().all(u8::is_ascii_whitespace) => {}
            Event::Start(ref start) => {
                if preserve_depth > 0 || PRESERVE.contains(&local(start.name().as_ref())) {
                    preserve_depth += 1;
                }
                writer.write_event(event)?;
            }
            Event::End(_) => {
                preserve_depth = preserve_depth.saturating_sub(1);
                writer.write_event(event)?;
            }
            _ => writer.write_event(event)?,
        }
        buf.clear();
    }

    Ok(writer.into_inner())
}

/// Strip a namespace prefix (`svg:text` → `text`).
fn local(name: &[u8]) -> &[u8] {
    name.iter()
        .position(|&b| b == b':')
        .map_or(name, |i| &name[i + 1..])
}
