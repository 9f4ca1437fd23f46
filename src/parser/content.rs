//! Content-Type and Content-Disposition field parsing (RFC 2045 §5,
//! RFC 2183, RFC 2231).

use percent_encoding::percent_decode_str;
use serde::Serialize;
use tracing::debug;

use crate::parser::charset;
use crate::parser::encoded_word::decode_encoded_words;

/// Parsed `Content-Type` header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContentType {
    /// Lowercased `type/subtype`.
    pub media_type: String,
    pub charset: Option<String>,
    pub boundary: Option<String>,
    /// `format` parameter (`flowed`, `fixed`).
    pub format: Option<String>,
    /// Every parameter in header order, keys lowercased.
    pub parameters: Vec<(String, String)>,
}

impl ContentType {
    /// Parse a Content-Type header value.
    ///
    /// ```
    /// use mimetree::parser::content::ContentType;
    ///
    /// let ct = ContentType::parse("Multipart/Mixed; boundary=\"b1;x\"");
    /// assert_eq!(ct.media_type, "multipart/mixed");
    /// assert_eq!(ct.boundary.as_deref(), Some("b1;x"));
    /// ```
    pub fn parse(value: &str) -> Self {
        let (primary, parameters) = parse_parameters(value);
        let media_type = primary.to_ascii_lowercase();
        let find = |key: &str| lookup(&parameters, key).map(str::to_string);

        Self {
            charset: find("charset").filter(|c| !c.is_empty()),
            boundary: find("boundary").filter(|b| !b.is_empty()),
            format: find("format").map(|f| f.to_ascii_lowercase()),
            media_type,
            parameters,
        }
    }

    /// Value of a parameter, key matched case-insensitively.
    pub fn param(&self, key: &str) -> Option<&str> {
        lookup(&self.parameters, key)
    }

    /// The `name` parameter, with encoded words decoded and tabs removed.
    pub fn name(&self) -> Option<String> {
        self.param("name").map(clean_file_name)
    }

    pub fn is_multipart(&self) -> bool {
        self.media_type.starts_with("multipart/")
    }

    pub fn is_message_rfc822(&self) -> bool {
        self.media_type == "message/rfc822"
    }

    pub fn is_text(&self) -> bool {
        self.media_type.starts_with("text/")
    }
}

/// Parsed `Content-Disposition` header.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ContentDisposition {
    /// Lowercased `inline`, `attachment`, …; `None` when the value is empty.
    pub disposition_type: Option<String>,
    /// The `filename` parameter, encoded words decoded and tabs removed.
    pub filename: Option<String>,
    pub parameters: Vec<(String, String)>,
}

impl ContentDisposition {
    pub fn parse(value: &str) -> Self {
        let (primary, parameters) = parse_parameters(value);
        let disposition_type = Some(primary.to_ascii_lowercase()).filter(|d| !d.is_empty());
        let filename = lookup(&parameters, "filename").map(clean_file_name);

        Self {
            disposition_type,
            filename,
            parameters,
        }
    }

    pub fn param(&self, key: &str) -> Option<&str> {
        lookup(&self.parameters, key)
    }

    pub fn is_inline(&self) -> bool {
        self.disposition_type.as_deref() == Some("inline")
    }

    pub fn is_attachment(&self) -> bool {
        self.disposition_type.as_deref() == Some("attachment")
    }
}

/// File name of a part: Content-Disposition `filename`, then Content-Type
/// `name`, otherwise none.
pub fn resolve_filename(
    disposition: Option<&ContentDisposition>,
    content_type: Option<&ContentType>,
) -> Option<String> {
    disposition
        .and_then(|d| d.filename.clone())
        .or_else(|| content_type.and_then(ContentType::name))
}

/// Split a structured header value into its primary token and parameters.
///
/// Segments are separated by `;` outside quoted strings. Parameter keys are
/// lowercased, quoted values are unquoted with backslash escapes honoured,
/// and RFC 2231 extended or continued parameters are merged into their base
/// key. Segments without `=` are skipped.
pub fn parse_parameters(value: &str) -> (String, Vec<(String, String)>) {
    let mut segments = split_unquoted(value).into_iter();
    let primary = segments.next().unwrap_or_default().trim().to_string();

    let mut raw = Vec::new();
    for segment in segments {
        let segment = segment.trim();
        if segment.is_empty() {
            continue;
        }
        match segment.split_once('=') {
            Some((key, val)) => {
                let key = key.trim().to_ascii_lowercase();
                if key.is_empty() {
                    continue;
                }
                raw.push((key, unquote(val.trim())));
            }
            None => debug!(segment, "Parameter without '=' skipped"),
        }
    }

    (primary, merge_extended(raw))
}

fn lookup<'a>(parameters: &'a [(String, String)], key: &str) -> Option<&'a str> {
    parameters
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(key))
        .map(|(_, v)| v.as_str())
}

fn clean_file_name(value: &str) -> String {
    let decoded = if value.contains("=?") {
        decode_encoded_words(value)
    } else {
        value.to_string()
    };
    decoded.replace('\t', "")
}

/// Split on `;` outside double quotes. Backslash escapes inside quotes are
/// kept for [`unquote`].
fn split_unquoted(value: &str) -> Vec<String> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = value.chars();

    while let Some(c) = chars.next() {
        match c {
            '"' => {
                in_quotes = !in_quotes;
                current.push(c);
            }
            '\\' if in_quotes => {
                current.push(c);
                if let Some(next) = chars.next() {
                    current.push(next);
                }
            }
            ';' if !in_quotes => segments.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    segments.push(current);
    segments
}

/// Remove surrounding quotes and resolve `\x` escapes. Unquoted values are
/// returned as they are; an unterminated quote runs to the end.
fn unquote(value: &str) -> String {
    let Some(inner) = value.strip_prefix('"') else {
        return value.to_string();
    };

    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                if let Some(next) = chars.next() {
                    out.push(next);
                }
            }
            '"' => break,
            _ => out.push(c),
        }
    }
    out
}

/// One RFC 2231 section of a parameter (`key*N` or `key*N*`).
struct Section {
    index: u32,
    extended: bool,
    value: String,
}

/// `name*` → (name, 0, true), `name*2` → (name, 2, false),
/// `name*2*` → (name, 2, true). Plain keys return `None`.
fn split_extended_key(key: &str) -> Option<(&str, u32, bool)> {
    let (base, rest) = key.split_once('*')?;
    if base.is_empty() {
        return None;
    }
    if rest.is_empty() {
        return Some((base, 0, true));
    }
    let (digits, extended) = match rest.strip_suffix('*') {
        Some(digits) => (digits, true),
        None => (rest, false),
    };
    let index = digits.parse().ok()?;
    Some((base, index, extended))
}

fn merge_extended(raw: Vec<(String, String)>) -> Vec<(String, String)> {
    let mut plain: Vec<(String, String)> = Vec::with_capacity(raw.len());
    let mut extended: Vec<(String, Vec<Section>)> = Vec::new();

    for (key, value) in raw {
        match split_extended_key(&key) {
            Some((base, index, is_extended)) => {
                let section = Section {
                    index,
                    extended: is_extended,
                    value,
                };
                match extended.iter_mut().find(|(k, _)| k == base) {
                    Some((_, sections)) => sections.push(section),
                    None => extended.push((base.to_string(), vec![section])),
                }
            }
            None => {
                if !plain.iter().any(|(k, _)| *k == key) {
                    plain.push((key, value));
                }
            }
        }
    }

    for (base, mut sections) in extended {
        sections.sort_by_key(|s| s.index);
        let value = join_sections(&sections);
        match plain.iter_mut().find(|(k, _)| *k == base) {
            Some(slot) => slot.1 = value,
            None => plain.push((base, value)),
        }
    }
    plain
}

/// Concatenate sections in order. The charset named by the first extended
/// section (`charset'language'data`) applies to the whole value.
fn join_sections(sections: &[Section]) -> String {
    let mut charset_name = None;
    let mut bytes = Vec::new();

    for (i, section) in sections.iter().enumerate() {
        if !section.extended {
            bytes.extend_from_slice(section.value.as_bytes());
            continue;
        }
        let mut data = section.value.as_str();
        if i == 0 {
            let mut pieces = section.value.splitn(3, '\'');
            if let (Some(cs), Some(_lang), Some(rest)) = (pieces.next(), pieces.next(), pieces.next()) {
                if !cs.is_empty() {
                    charset_name = Some(cs.to_string());
                }
                data = rest;
            }
        }
        bytes.extend(percent_decode_str(data));
    }

    match charset_name {
        Some(name) => charset::decode(&name, &bytes).unwrap_or_else(|e| {
            debug!(charset = %name, error = %e, "Extended parameter decoded without its charset");
            charset::decode_undeclared(&bytes)
        }),
        None => charset::decode_undeclared(&bytes),
    }
}
