//! Charset name resolution and byte-to-text mapping.

use encoding_rs::Encoding;
use tracing::debug;

use crate::error::{MimeError, Result};

/// Labels seen in real mail that the WHATWG label table does not know.
const ALIASES: &[(&str, &str)] = &[
    ("latin-1", "iso-8859-1"),
    ("ansi", "windows-1252"),
    ("cp-1252", "windows-1252"),
    ("unknown-8bit", "windows-1252"),
    ("x-unknown", "windows-1252"),
    ("ks_c_5601", "euc-kr"),
];

/// Resolve a declared charset name to a decoder.
///
/// Quotes and surrounding whitespace are ignored, matching is
/// case-insensitive. Names with no decoder fail with
/// [`MimeError::UnsupportedCharset`].
pub fn lookup(name: &str) -> Result<&'static Encoding> {
    let label = name.trim().trim_matches('"').trim();
    if let Some(encoding) = Encoding::for_label(label.as_bytes()) {
        return Ok(encoding);
    }
    ALIASES
        .iter()
        .find(|(alias, _)| alias.eq_ignore_ascii_case(label))
        .and_then(|(_, target)| Encoding::for_label(target.as_bytes()))
        .ok_or_else(|| MimeError::UnsupportedCharset(name.to_string()))
}

/// Decode `bytes` in the named charset.
pub fn decode(charset: &str, bytes: &[u8]) -> Result<String> {
    let encoding = lookup(charset)?;
    let (text, actual, had_errors) = encoding.decode(bytes);
    if had_errors {
        debug!(
            charset,
            decoder = actual.name(),
            "Malformed sequences replaced while decoding"
        );
    }
    Ok(text.into_owned())
}

/// Byte-preserving mapping: every byte becomes the char with the same value.
pub fn decode_latin1(bytes: &[u8]) -> String {
    encoding_rs::mem::decode_latin1(bytes).into_owned()
}

/// Inverse of [`decode_latin1`]; chars above U+00FF become `?`.
pub fn encode_latin1(text: &str) -> Vec<u8> {
    if encoding_rs::mem::is_str_latin1(text) {
        return encoding_rs::mem::encode_latin1_lossy(text).into_owned();
    }
    text.chars().map(|c| u8::try_from(c).unwrap_or(b'?')).collect()
}

/// Encode `text` back into `encoding`. Unmappable chars become numeric
/// character references; UTF-16 labels encode as UTF-8.
pub fn encode(encoding: &'static Encoding, text: &str) -> Vec<u8> {
    let (bytes, actual, had_errors) = encoding.encode(text);
    if had_errors {
        debug!(
            encoding = encoding.name(),
            encoder = actual.name(),
            "Unmappable chars replaced while encoding"
        );
    }
    bytes.into_owned()
}

/// Display decoding when no charset was declared: UTF-8 if valid,
/// Windows-1252 otherwise.
pub fn decode_undeclared(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => {
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
            decoded.into_owned()
        }
    }
}
