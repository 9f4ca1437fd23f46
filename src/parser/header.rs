//! RFC 2822 header block extraction: header/body split, unfolding, and
//! tokenizing into an ordered multimap.

use std::borrow::Cow;

use tracing::debug;

use crate::error::{MimeError, Result};
use crate::model::header::HeaderMap;

/// Result of splitting one message (or body part) into headers and body.
#[derive(Debug, Clone)]
pub struct ExtractedHeaders<'a> {
    /// Exact bytes of the header block, without the blank separator line.
    pub raw_headers: &'a [u8],
    /// Unfolded headers.
    pub headers: HeaderMap,
    /// Everything after the blank separator line.
    pub body: &'a [u8],
    /// Offset of `body` within the input.
    pub body_offset: usize,
}

/// Split `raw` into the header block and the body, and tokenize the headers.
///
/// The header block ends at the first empty line (`CRLF CRLF` or `LF LF`) or
/// at the end of input. Input with no separator and not a single colon cannot
/// be read as headers at all and fails with [`MimeError::MalformedHeader`].
pub fn extract_headers(raw: &[u8]) -> Result<ExtractedHeaders<'_>> {
    let (header_end, body_offset) = match find_header_end(raw) {
        Some(bounds) => bounds,
        None => {
            if !raw.is_empty() && !raw.contains(&b':') {
                return Err(MimeError::MalformedHeader(
                    "no header/body separator and no header field found".to_string(),
                ));
            }
            (trim_trailing_newline(raw), raw.len())
        }
    };

    let raw_headers = &raw[..header_end];
    let headers = unfold_headers(&decode_header_bytes(raw_headers));

    Ok(ExtractedHeaders {
        raw_headers,
        headers,
        body: &raw[body_offset..],
        body_offset,
    })
}

/// Find where the header block ends.
///
/// Returns `(end of the last header line, start of the body)`. When the input
/// starts with an empty line both offsets point around that line and the
/// header block is empty.
pub(crate) fn find_header_end(data: &[u8]) -> Option<(usize, usize)> {
    if data.starts_with(b"\r\n") {
        return Some((0, 2));
    }
    if data.starts_with(b"\n") {
        return Some((0, 1));
    }

    let mut i = 0;
    while i < data.len() {
        if data[i] == b'\n' {
            let line_end = if i > 0 && data[i - 1] == b'\r' { i - 1 } else { i };
            let next = &data[i + 1..];
            if next.starts_with(b"\r\n") {
                return Some((line_end, i + 3));
            }
            if next.starts_with(b"\n") {
                return Some((line_end, i + 2));
            }
        }
        i += 1;
    }
    None
}

fn trim_trailing_newline(data: &[u8]) -> usize {
    if data.ends_with(b"\r\n") {
        data.len() - 2
    } else if data.ends_with(b"\n") {
        data.len() - 1
    } else {
        data.len()
    }
}

/// Decode raw header bytes to a string.
///
/// UTF-8 when valid, otherwise ISO-8859-1, which maps every byte to exactly
/// one char so the text re-encodes to the original bytes.
pub fn decode_header_bytes(bytes: &[u8]) -> Cow<'_, str> {
    let bytes = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(bytes);

    match std::str::from_utf8(bytes) {
        Ok(s) => Cow::Borrowed(s),
        Err(_) => encoding_rs::mem::decode_latin1(bytes),
    }
}

/// Unfold headers into an ordered multimap.
///
/// Continuation lines (leading space or tab) join the previous value with a
/// single space. A line whose first colon comes after its first whitespace
/// (or that has no colon) is also treated as a continuation, which keeps
/// malformed producers readable.
pub fn unfold_headers(text: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();

    for line in text.lines() {
        if line.trim().is_empty() {
            continue;
        }
        if line.starts_with(' ') || line.starts_with('\t') {
            if !headers.append_to_last(line.trim()) {
                debug!(line, "Continuation line before any header, skipped");
            }
            continue;
        }

        match header_name_end(line) {
            Some(colon_pos) => {
                let name = line[..colon_pos].trim_end();
                let value = line[colon_pos + 1..].trim();
                headers.push(name, value);
            }
            None => {
                if !headers.append_to_last(line.trim()) {
                    debug!(line, "Header line without a name, skipped");
                }
            }
        }
    }

    headers
}

/// Position of the colon ending the header name, if the line has one before
/// its first whitespace.
fn header_name_end(line: &str) -> Option<usize> {
    let colon = line.find(':')?;
    if colon == 0 {
        return None;
    }
    match line.find(|c: char| c == ' ' || c == '\t') {
        Some(ws) if ws < colon => None,
        _ => Some(colon),
    }
}

/// Content between the first `<` and the following `>`, without the brackets.
///
/// Used for Content-ID and Message-ID. Values without brackets are returned
/// trimmed.
pub fn strip_angle_brackets(s: &str) -> String {
    let trimmed = s.trim();
    if let Some(start) = trimmed.find('<') {
        if let Some(end) = trimmed[start..].find('>') {
            return trimmed[start + 1..start + end].trim().to_string();
        }
    }
    trimmed.trim_matches(|c: char| c == '<' || c == '>').to_string()
}

/// Extract all `<…>` tokens from a string (for the References header).
pub fn extract_all_angle_brackets(s: &str) -> Vec<String> {
    let mut result = Vec::new();
    let mut remaining = s;
    while let Some(start) = remaining.find('<') {
        if let Some(end) = remaining[start..].find('>') {
            result.push(remaining[start + 1..start + end].to_string());
            remaining = &remaining[start + end + 1..];
        } else {
            break;
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_header_end_lf() {
        // "From: a@b.com\n" = 14 bytes, "Subject: Hi\n" = 12 bytes
        let data = b"From: a@b.com\nSubject: Hi\n\nBody\n";
        assert_eq!(find_header_end(data), Some((25, 27)));
    }

    #[test]
    fn test_find_header_end_crlf() {
        let data = b"From: a@b.com\r\nSubject: Hi\r\n\r\nBody\r\n";
        assert_eq!(find_header_end(data), Some((26, 30)));
    }

    #[test]
    fn test_find_header_end_leading_blank_line() {
        assert_eq!(find_header_end(b"\r\nBody"), Some((0, 2)));
        assert_eq!(find_header_end(b"\nBody"), Some((0, 1)));
    }

    #[test]
    fn test_extract_headers_split() {
        let raw = b"Subject: Hi\r\nTo: a@b.com\r\n\r\nHello\r\n";
        let ex = extract_headers(raw).unwrap();
        assert_eq!(ex.raw_headers, b"Subject: Hi\r\nTo: a@b.com");
        assert_eq!(ex.body, b"Hello\r\n");
        assert_eq!(ex.headers.get("subject"), Some("Hi"));
        assert_eq!(ex.headers.get("to"), Some("a@b.com"));
    }

    #[test]
    fn test_extract_headers_only() {
        let raw = b"Subject: Hi\r\nTo: a@b.com\r\n";
        let ex = extract_headers(raw).unwrap();
        assert_eq!(ex.headers.len(), 2);
        assert_eq!(ex.raw_headers, b"Subject: Hi\r\nTo: a@b.com");
        assert!(ex.body.is_empty());
    }

    #[test]
    fn test_extract_headers_no_colon_no_separator_fails() {
        let err = extract_headers(b"just some words\r\nand more").unwrap_err();
        assert!(matches!(err, MimeError::MalformedHeader(_)));
    }

    #[test]
    fn test_extract_headers_empty_input() {
        let ex = extract_headers(b"").unwrap();
        assert!(ex.headers.is_empty());
        assert!(ex.body.is_empty());
    }

    #[test]
    fn test_unfold_headers() {
        let text = "Subject: This is a long\n\tsubject line\nFrom: user@example.com\n";
        let headers = unfold_headers(text);
        assert_eq!(headers.len(), 2);
        assert_eq!(headers.get("subject"), Some("This is a long subject line"));
    }

    #[test]
    fn test_unfold_collapses_fold_whitespace() {
        let text = "Subject: one\r\n   \t  two\r\n";
        let headers = unfold_headers(text);
        assert_eq!(headers.get("subject"), Some("one two"));
    }

    #[test]
    fn test_line_without_colon_is_continuation() {
        let text = "Subject: broken\nproducer wrapped this\nTo: x@y.z\n";
        let headers = unfold_headers(text);
        assert_eq!(
            headers.get("subject"),
            Some("broken producer wrapped this")
        );
        assert_eq!(headers.get("to"), Some("x@y.z"));
    }

    #[test]
    fn test_colon_after_whitespace_is_continuation() {
        let text = "Subject: a\nnot a header: really\n";
        let headers = unfold_headers(text);
        assert_eq!(headers.len(), 1);
        assert_eq!(headers.get("subject"), Some("a not a header: really"));
    }

    #[test]
    fn test_decode_header_bytes_latin1_roundtrip() {
        let raw = b"Subject: caf\xe9";
        let text = decode_header_bytes(raw);
        assert_eq!(text, "Subject: café");
        let back = encoding_rs::mem::encode_latin1_lossy(&text);
        assert_eq!(&back[..], &raw[..]);
    }

    #[test]
    fn test_strip_angle_brackets() {
        assert_eq!(strip_angle_brackets(" <part1@example.com> "), "part1@example.com");
        assert_eq!(strip_angle_brackets("bare@example.com"), "bare@example.com");
    }

    #[test]
    fn test_extract_all_angle_brackets() {
        let refs = extract_all_angle_brackets("<a@b.com> <c@d.com> <e@f.com>");
        assert_eq!(refs, vec!["a@b.com", "c@d.com", "e@f.com"]);
    }
}
