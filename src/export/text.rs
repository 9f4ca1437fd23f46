//! Plain-text rendering of a message for the terminal.

use std::fmt::Write as _;

use tracing::debug;

use crate::model::message::Message;
use crate::model::part::MessagePart;

/// Decoded text of the first `text/plain` part, falling back to the first
/// `text/html` part converted to text.
pub fn body_text(message: &Message) -> Option<String> {
    if let Some(text) = message.find_first_plain_text().and_then(decoded) {
        return Some(text);
    }
    message
        .find_first_html()
        .and_then(decoded)
        .map(|html| html_to_text(&html))
}

/// Decoded source of the first `text/html` part.
pub fn body_html(message: &Message) -> Option<String> {
    message.find_first_html().and_then(decoded)
}

fn decoded(part: &MessagePart) -> Option<String> {
    match part.body_text() {
        Ok(text) => Some(text),
        Err(e) => {
            debug!(error = %e, media_type = part.media_type(), "Body not decodable as text");
            None
        }
    }
}

/// Summary headers, body and attachment list as one printable document.
pub fn render_message(message: &Message) -> String {
    let header = message.header();
    let mut out = String::new();

    if let Some(date) = &header.date {
        let _ = writeln!(out, "Date:    {date}");
    }
    if let Some(from) = &header.from {
        let _ = writeln!(out, "From:    {from}");
    }
    if !header.to.is_empty() {
        let _ = writeln!(out, "To:      {}", join(&header.to));
    }
    if !header.cc.is_empty() {
        let _ = writeln!(out, "Cc:      {}", join(&header.cc));
    }
    let _ = writeln!(out, "Subject: {}", header.subject.as_deref().unwrap_or(""));
    let _ = writeln!(out, "\n{}", "-".repeat(72));

    if let Some(text) = body_text(message) {
        out.push('\n');
        out.push_str(text.trim_end());
        out.push('\n');
    }

    let attachments = message.attachments();
    if !attachments.is_empty() {
        let _ = writeln!(out, "\n[Attachments: {} file(s)]", attachments.len());
        for att in &attachments {
            let size = humansize::format_size(att.content_length(), humansize::BINARY);
            let _ = writeln!(
                out,
                "  - {} ({}, {})",
                att.file_name(),
                att.media_type().unwrap_or("unknown"),
                size
            );
        }
    }
    out
}

fn join<T: std::fmt::Display>(items: &[T]) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Convert HTML to plain text for terminal display.
///
/// - Preserves line breaks from `<br>`, `<p>`, `<div>`
/// - Removes scripts and styles
/// - Decodes common HTML entities
pub fn html_to_text(html: &str) -> String {
    let mut text = remove_tag_block(html, "script");
    text = remove_tag_block(&text, "style");

    for tag in ["br", "BR", "br/", "br /"] {
        text = text.replace(&format!("<{tag}>"), "\n");
    }
    for tag in ["p", "div", "tr", "li", "h1", "h2", "h3", "h4", "h5", "h6"] {
        let upper = tag.to_uppercase();
        text = text.replace(&format!("<{tag}>"), "\n");
        text = text.replace(&format!("<{tag} "), "\n<");
        text = text.replace(&format!("<{upper}>"), "\n");
        text = text.replace(&format!("</{tag}>"), "\n");
        text = text.replace(&format!("</{upper}>"), "\n");
    }

    let mut stripped = String::with_capacity(text.len());
    let mut in_tag = false;
    for ch in text.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => stripped.push(ch),
            _ => {}
        }
    }

    for (entity, replacement) in [
        ("&lt;", "<"),
        ("&gt;", ">"),
        ("&quot;", "\""),
        ("&#39;", "'"),
        ("&apos;", "'"),
        ("&nbsp;", " "),
        ("&#160;", " "),
        ("&amp;", "&"),
    ] {
        stripped = stripped.replace(entity, replacement);
    }

    // Collapse runs of blank lines
    let mut prev_was_blank = false;
    let mut cleaned = String::with_capacity(stripped.len());
    for line in stripped.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            if !prev_was_blank {
                cleaned.push('\n');
                prev_was_blank = true;
            }
        } else {
            cleaned.push_str(trimmed);
            cleaned.push('\n');
            prev_was_blank = false;
        }
    }

    cleaned.trim().to_string()
}

/// Remove an entire tag block (e.g. `<script>…</script>`), any case.
fn remove_tag_block(html: &str, tag: &str) -> String {
    let lower = html.to_ascii_lowercase();
    let open = format!("<{tag}");
    let close = format!("</{tag}>");

    let mut result = String::with_capacity(html.len());
    let mut pos = 0;
    while let Some(start) = lower[pos..].find(&open).map(|i| pos + i) {
        result.push_str(&html[pos..start]);
        match lower[start..].find(&close) {
            Some(end) => pos = start + end + close.len(),
            None => return result,
        }
    }
    result.push_str(&html[pos..]);
    result
}
