//! MIME tree assembly: header split, multipart splitting and
//! `message/rfc822` nesting.

use tracing::{debug, trace};

use crate::config::ParserConfig;
use crate::error::Result;
use crate::model::header::HeaderMap;
use crate::model::message::Message;
use crate::model::part::{MessagePart, PartBody, PartHeaders};
use crate::parser::header::extract_headers;

/// Default bound on multipart / `message/rfc822` nesting.
pub const DEFAULT_MAX_DEPTH: usize = 32;

/// Parse a raw message with default limits.
///
/// Fails only when the top-level header block cannot be read at all.
/// Malformed structure further down degrades to leaf parts.
pub fn parse_message(raw: &[u8]) -> Result<Message> {
    MessageParser::default().parse(raw)
}

/// Builds [`Message`] trees from raw bytes.
#[derive(Debug, Clone, Copy)]
pub struct MessageParser {
    max_depth: usize,
}

impl Default for MessageParser {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DEPTH)
    }
}

impl MessageParser {
    pub fn new(max_depth: usize) -> Self {
        Self { max_depth }
    }

    pub fn from_config(config: &ParserConfig) -> Self {
        Self::new(config.max_depth)
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn parse(&self, raw: &[u8]) -> Result<Message> {
        self.parse_at(raw, 0)
    }

    fn parse_at(&self, raw: &[u8], depth: usize) -> Result<Message> {
        self.parse_part(raw, depth).map(Message::new)
    }

    fn parse_part(&self, raw: &[u8], depth: usize) -> Result<MessagePart> {
        let extracted = extract_headers(raw)?;
        let header_end = extracted.raw_headers.len();
        let body_start = extracted.body_offset;
        let headers = PartHeaders::from_map(extracted.headers);
        let body = self.parse_body(&headers, extracted.body, depth);

        Ok(MessagePart::new(headers, raw.to_vec(), header_end, body_start, body))
    }

    /// A multipart segment. Segments that cannot be read as headers keep
    /// their whole text as the body.
    fn parse_segment(&self, raw: &[u8], depth: usize) -> MessagePart {
        self.parse_part(raw, depth).unwrap_or_else(|e| {
            debug!(error = %e, depth, "Body part without headers");
            MessagePart::new(
                PartHeaders::from_map(HeaderMap::new()),
                raw.to_vec(),
                0,
                0,
                PartBody::Leaf,
            )
        })
    }

    fn parse_body(&self, headers: &PartHeaders, body: &[u8], depth: usize) -> PartBody {
        let Some(content_type) = headers.content_type.as_ref() else {
            return PartBody::Leaf;
        };

        if content_type.is_multipart() {
            let Some(boundary) = content_type.boundary.as_deref() else {
                debug!(media_type = %content_type.media_type, "Multipart without boundary kept as leaf");
                return PartBody::Leaf;
            };
            if depth >= self.max_depth {
                debug!(depth, "Nesting limit reached, multipart kept as leaf");
                return PartBody::Leaf;
            }
            return match split_multipart(body, boundary) {
                Some(segments) => {
                    trace!(boundary, parts = segments.len(), depth, "Split multipart");
                    PartBody::Multipart(
                        segments
                            .into_iter()
                            .map(|segment| self.parse_segment(segment, depth + 1))
                            .collect(),
                    )
                }
                None => {
                    debug!(boundary, "Boundary never occurs, multipart kept as leaf");
                    PartBody::Leaf
                }
            };
        }

        if content_type.is_message_rfc822() {
            if depth >= self.max_depth {
                debug!(depth, "Nesting limit reached, message/rfc822 kept as leaf");
                return PartBody::Leaf;
            }
            return match self.parse_at(body, depth + 1) {
                Ok(nested) => PartBody::Message(Box::new(nested)),
                Err(e) => {
                    debug!(error = %e, "Embedded message unreadable, kept as leaf");
                    PartBody::Leaf
                }
            };
        }

        PartBody::Leaf
    }
}

/// Split a multipart body at its delimiter lines.
///
/// A delimiter line is `--boundary` (or `--boundary--` for the last one),
/// optionally followed by whitespace. The line break before a delimiter
/// belongs to it. Text before the first delimiter and after the closing one
/// is dropped. Without a closing delimiter the last part runs to the end.
/// Returns `None` when the boundary never occurs.
pub fn split_multipart<'a>(body: &'a [u8], boundary: &str) -> Option<Vec<&'a [u8]>> {
    let delimiter = format!("--{boundary}");
    let delimiter = delimiter.as_bytes();

    let mut parts = Vec::new();
    let mut current: Option<usize> = None;
    let mut seen = false;
    let mut pos = 0;

    while pos < body.len() {
        let line_end = body[pos..]
            .iter()
            .position(|&b| b == b'\n')
            .map_or(body.len(), |i| pos + i);
        let next = (line_end + 1).min(body.len());

        if let Some(rest) = trim_line_end(&body[pos..line_end]).strip_prefix(delimiter) {
            let closing = rest == b"--";
            if rest.is_empty() || closing {
                seen = true;
                if let Some(start) = current.take() {
                    parts.push(&body[start..segment_end(body, start, pos)]);
                }
                if closing {
                    return Some(parts);
                }
                current = Some(next);
            }
        }
        pos = next;
    }

    if let Some(start) = current {
        parts.push(&body[start..]);
    }
    seen.then_some(parts)
}

fn trim_line_end(line: &[u8]) -> &[u8] {
    let end = line
        .iter()
        .rposition(|&b| !matches!(b, b' ' | b'\t' | b'\r'))
        .map_or(0, |i| i + 1);
    &line[..end]
}

/// End of a segment whose next delimiter line starts at `delimiter_start`.
fn segment_end(body: &[u8], start: usize, delimiter_start: usize) -> usize {
    let mut end = delimiter_start;
    if end > start && body[end - 1] == b'\n' {
        end -= 1;
        if end > start && body[end - 1] == b'\r' {
            end -= 1;
        }
    }
    end
}
