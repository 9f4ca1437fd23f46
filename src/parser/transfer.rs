//! Content-Transfer-Encoding reversal (RFC 2045 §6) and charset application.

use std::fmt;

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;
use serde::Serialize;

use crate::error::{MimeError, Result};
use crate::parser::charset;

/// Lenient base64 engine: padding optional, trailing bits ignored.
const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

/// Declared Content-Transfer-Encoding of a part.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransferEncoding {
    /// RFC 2045 default when the header is absent.
    #[default]
    SevenBit,
    EightBit,
    Binary,
    QuotedPrintable,
    Base64,
    /// Any token this decoder does not know; the body passes through.
    Unknown,
}

impl TransferEncoding {
    /// Parse a Content-Transfer-Encoding header value.
    ///
    /// Matching ignores case, surrounding whitespace, quotes and any
    /// trailing parameters or comments.
    pub fn parse(value: &str) -> Self {
        let token = value
            .split(|c: char| c == ';' || c == '(')
            .next()
            .unwrap_or("")
            .trim()
            .trim_matches('"')
            .to_ascii_lowercase();
        match token.as_str() {
            "" | "7bit" => Self::SevenBit,
            "8bit" => Self::EightBit,
            "binary" => Self::Binary,
            "quoted-printable" => Self::QuotedPrintable,
            "base64" => Self::Base64,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SevenBit => "7bit",
            Self::EightBit => "8bit",
            Self::Binary => "binary",
            Self::QuotedPrintable => "quoted-printable",
            Self::Base64 => "base64",
            Self::Unknown => "unknown",
        }
    }
}

impl Serialize for TransferEncoding {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl fmt::Display for TransferEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reverse `encoding` on `raw`.
pub fn decode_bytes(raw: &[u8], encoding: TransferEncoding) -> Result<Vec<u8>> {
    match encoding {
        TransferEncoding::Base64 => decode_base64(raw),
        TransferEncoding::QuotedPrintable => Ok(decode_quoted_printable(raw)),
        TransferEncoding::SevenBit
        | TransferEncoding::EightBit
        | TransferEncoding::Binary
        | TransferEncoding::Unknown => Ok(raw.to_vec()),
    }
}

/// Reverse `encoding` and map the bytes to text.
///
/// With a declared charset the bytes are decoded in it, failing with
/// [`MimeError::UnsupportedCharset`] for unknown names. Without one, bytes
/// map one-to-one to chars (ISO-8859-1), which keeps binary content intact.
pub fn decode_text(
    raw: &[u8],
    encoding: TransferEncoding,
    charset: Option<&str>,
) -> Result<String> {
    let bytes = decode_bytes(raw, encoding)?;
    match charset {
        Some(name) => charset::decode(name, &bytes),
        None => Ok(charset::decode_latin1(&bytes)),
    }
}

/// Decode base64, skipping whitespace and line breaks.
///
/// Characters outside the alphabet fail with
/// [`MimeError::InvalidEncoding`]. Missing padding is accepted and a dangling
/// final character (too short to carry a byte) is dropped.
pub fn decode_base64(raw: &[u8]) -> Result<Vec<u8>> {
    let mut clean = Vec::with_capacity(raw.len());
    for (offset, &b) in raw.iter().enumerate() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'+' | b'/' | b'=' => clean.push(b),
            b' ' | b'\t' | b'\r' | b'\n' | 0x0b | 0x0c => {}
            _ => {
                return Err(MimeError::InvalidEncoding {
                    encoding: "base64",
                    offset,
                    byte: b,
                })
            }
        }
    }

    // Anything after the first padding run is noise from sloppy producers.
    if let Some(pad) = clean.iter().position(|&b| b == b'=') {
        clean.truncate(pad);
    }
    if clean.len() % 4 == 1 {
        clean.pop();
    }

    LENIENT_BASE64
        .decode(&clean)
        .map_err(|e| base64_error(&clean, e))
}

/// Offsets refer to the whitespace-free input.
fn base64_error(clean: &[u8], err: base64::DecodeError) -> MimeError {
    let offset = match err {
        base64::DecodeError::InvalidByte(offset, _)
        | base64::DecodeError::InvalidLastSymbol(offset, _) => offset,
        _ => clean.len(),
    };
    MimeError::InvalidEncoding {
        encoding: "base64",
        offset,
        byte: clean.get(offset).copied().unwrap_or(0),
    }
}

/// Decode quoted-printable (RFC 2045 §6.7).
///
/// `=XX` escapes become bytes, `=` at the end of a line joins it with the
/// next one, and trailing whitespace on each line is dropped. A `=` not
/// followed by two hex digits is kept literally.
pub fn decode_quoted_printable(raw: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(raw.len());
    let mut rest = raw;

    while !rest.is_empty() {
        let (line, newline, next) = match rest.iter().position(|&b| b == b'\n') {
            Some(nl) if nl > 0 && rest[nl - 1] == b'\r' => {
                (&rest[..nl - 1], &rest[nl - 1..=nl], &rest[nl + 1..])
            }
            Some(nl) => (&rest[..nl], &rest[nl..=nl], &rest[nl + 1..]),
            None => (rest, &rest[rest.len()..], &rest[rest.len()..]),
        };
        rest = next;

        let line = trim_trailing_whitespace(line);
        match line.strip_suffix(b"=") {
            Some(soft) => unescape_qp(soft, &mut out),
            None => {
                unescape_qp(line, &mut out);
                out.extend_from_slice(newline);
            }
        }
    }
    out
}

fn trim_trailing_whitespace(line: &[u8]) -> &[u8] {
    let end = line
        .iter()
        .rposition(|&b| b != b' ' && b != b'\t')
        .map_or(0, |i| i + 1);
    &line[..end]
}

fn unescape_qp(line: &[u8], out: &mut Vec<u8>) {
    let mut i = 0;
    while i < line.len() {
        if line[i] == b'=' && i + 2 < line.len() {
            if let Some(byte) = hex_pair(line[i + 1], line[i + 2]) {
                out.push(byte);
                i += 3;
                continue;
            }
        }
        out.push(line[i]);
        i += 1;
    }
}

/// Value of two hex digits, either case.
pub(crate) fn hex_pair(hi: u8, lo: u8) -> Option<u8> {
    let hi = (hi as char).to_digit(16)?;
    let lo = (lo as char).to_digit(16)?;
    Some((hi * 16 + lo) as u8)
}
