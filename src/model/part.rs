//! One node of the MIME tree.

use crate::error::Result;
use crate::model::attachment::Attachment;
use crate::model::header::HeaderMap;
use crate::model::message::Message;
use crate::parser::charset;
use crate::parser::content::{resolve_filename, ContentDisposition, ContentType};
use crate::parser::encoded_word::decode_encoded_words;
use crate::parser::header::strip_angle_brackets;
use crate::parser::transfer::{self, TransferEncoding};

/// Media type assumed when a part has no Content-Type (RFC 2045 §5.2).
pub const DEFAULT_MEDIA_TYPE: &str = "text/plain";

/// The MIME headers of a part, folded out of its header map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartHeaders {
    pub content_type: Option<ContentType>,
    pub content_disposition: Option<ContentDisposition>,
    pub content_transfer_encoding: TransferEncoding,
    /// Encoded words decoded.
    pub content_description: Option<String>,
    /// Without the angle brackets.
    pub content_id: Option<String>,
    /// Disposition `filename`, else Content-Type `name`.
    pub file_name: Option<String>,
    /// Every header of the part, including the ones above.
    pub headers: HeaderMap,
}

impl PartHeaders {
    /// Fold a header map into the MIME header record. When a header repeats,
    /// the last occurrence wins.
    pub fn from_map(headers: HeaderMap) -> Self {
        let mut parsed = Self::default();

        for (name, value) in headers.iter() {
            match name.to_ascii_lowercase().as_str() {
                "content-type" => {
                    let content_type = ContentType::parse(value);
                    parsed.content_type =
                        (!content_type.media_type.is_empty()).then_some(content_type);
                }
                "content-transfer-encoding" => {
                    parsed.content_transfer_encoding = TransferEncoding::parse(value)
                }
                "content-description" => {
                    parsed.content_description = Some(decode_encoded_words(value.trim()))
                }
                "content-disposition" => {
                    parsed.content_disposition = Some(ContentDisposition::parse(value))
                }
                "content-id" => parsed.content_id = Some(strip_angle_brackets(value)),
                _ => {}
            }
        }

        parsed.file_name = resolve_filename(
            parsed.content_disposition.as_ref(),
            parsed.content_type.as_ref(),
        );
        parsed.headers = headers;
        parsed
    }

    /// Declared media type, or `text/plain` when Content-Type is absent.
    pub fn media_type(&self) -> &str {
        self.content_type
            .as_ref()
            .map_or(DEFAULT_MEDIA_TYPE, |ct| ct.media_type.as_str())
    }

    pub fn charset(&self) -> Option<&str> {
        self.content_type.as_ref().and_then(|ct| ct.charset.as_deref())
    }
}

/// What a part contains after its headers.
#[derive(Debug, Clone, PartialEq)]
pub enum PartBody {
    /// Undecoded body bytes, see [`MessagePart::raw_body`].
    Leaf,
    /// Child parts in order; preamble and epilogue are not kept.
    Multipart(Vec<MessagePart>),
    /// A `message/rfc822` body, parsed.
    Message(Box<Message>),
}

/// A node of the MIME tree.
///
/// The part owns its exact input slice, so [`raw_headers`](Self::raw_headers)
/// and [`raw`](Self::raw) reproduce the original bytes. Decoding is done on
/// demand and never cached.
#[derive(Debug, Clone, PartialEq)]
pub struct MessagePart {
    headers: PartHeaders,
    raw: Vec<u8>,
    header_end: usize,
    body_start: usize,
    body: PartBody,
}

impl MessagePart {
    pub(crate) fn new(
        headers: PartHeaders,
        raw: Vec<u8>,
        header_end: usize,
        body_start: usize,
        body: PartBody,
    ) -> Self {
        Self {
            headers,
            raw,
            header_end,
            body_start,
            body,
        }
    }

    pub fn headers(&self) -> &PartHeaders {
        &self.headers
    }

    pub fn header_map(&self) -> &HeaderMap {
        &self.headers.headers
    }

    pub fn body(&self) -> &PartBody {
        &self.body
    }

    /// The whole part as it appeared in the input.
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    /// The header block, without the blank separator line.
    pub fn raw_headers(&self) -> &[u8] {
        &self.raw[..self.header_end]
    }

    /// Everything after the blank separator line, still transfer-encoded.
    pub fn raw_body(&self) -> &[u8] {
        &self.raw[self.body_start..]
    }

    pub fn content_type(&self) -> Option<&ContentType> {
        self.headers.content_type.as_ref()
    }

    pub fn content_disposition(&self) -> Option<&ContentDisposition> {
        self.headers.content_disposition.as_ref()
    }

    pub fn transfer_encoding(&self) -> TransferEncoding {
        self.headers.content_transfer_encoding
    }

    pub fn content_description(&self) -> Option<&str> {
        self.headers.content_description.as_deref()
    }

    pub fn content_id(&self) -> Option<&str> {
        self.headers.content_id.as_deref()
    }

    pub fn file_name(&self) -> Option<&str> {
        self.headers.file_name.as_deref()
    }

    /// Effective media type (`text/plain` when undeclared).
    pub fn media_type(&self) -> &str {
        self.headers.media_type()
    }

    pub fn charset(&self) -> Option<&str> {
        self.headers.charset()
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self.body, PartBody::Leaf)
    }

    pub fn is_multipart(&self) -> bool {
        matches!(self.body, PartBody::Multipart(_))
    }

    pub fn is_text(&self) -> bool {
        self.media_type().starts_with("text/")
    }

    /// Child parts of a multipart; empty otherwise.
    pub fn children(&self) -> &[MessagePart] {
        match &self.body {
            PartBody::Multipart(children) => children,
            _ => &[],
        }
    }

    /// The embedded message of a `message/rfc822` part.
    pub fn nested_message(&self) -> Option<&Message> {
        match &self.body {
            PartBody::Message(message) => Some(message),
            _ => None,
        }
    }

    /// Body bytes with the transfer encoding reversed.
    pub fn decoded_body(&self) -> Result<Vec<u8>> {
        transfer::decode_bytes(self.raw_body(), self.transfer_encoding())
    }

    /// Body as text.
    ///
    /// A declared charset is applied strictly and an unknown one fails with
    /// [`MimeError::UnsupportedCharset`](crate::error::MimeError). Without a
    /// declaration the bytes are read as UTF-8, falling back to Windows-1252.
    pub fn body_text(&self) -> Result<String> {
        let bytes = self.decoded_body()?;
        match self.charset() {
            Some(name) => charset::decode(name, &bytes),
            None => Ok(charset::decode_undeclared(&bytes)),
        }
    }

    /// Attachments below this part, depth-first, skipping parts that are not
    /// attachments. Nested messages count as one attachment each.
    pub fn attachments(&self) -> Vec<Attachment> {
        let mut found = Vec::new();
        self.collect_attachments(&mut found);
        found
    }

    fn collect_attachments(&self, found: &mut Vec<Attachment>) {
        match &self.body {
            PartBody::Multipart(children) => {
                for child in children {
                    child.collect_attachments(found);
                }
            }
            PartBody::Leaf | PartBody::Message(_) => {
                let attachment = Attachment::from_part(self);
                if !attachment.is_not_attachment() {
                    found.push(attachment);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(pairs: &[(&str, &str)]) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for (name, value) in pairs {
            headers.push(*name, *value);
        }
        headers
    }

    fn leaf(headers: &[(&str, &str)], body: &[u8]) -> MessagePart {
        MessagePart::new(
            PartHeaders::from_map(map(headers)),
            body.to_vec(),
            0,
            0,
            PartBody::Leaf,
        )
    }

    #[test]
    fn test_fold_mime_headers() {
        let parsed = PartHeaders::from_map(map(&[
            ("Content-Type", "image/png; name=\"logo.png\""),
            ("content-transfer-encoding", "BASE64"),
            ("Content-Description", "=?utf-8?Q?Logo_caf=C3=A9?="),
            ("Content-ID", "<logo@example.com>"),
            ("X-Other", "kept"),
        ]));

        assert_eq!(parsed.media_type(), "image/png");
        assert_eq!(parsed.content_transfer_encoding, TransferEncoding::Base64);
        assert_eq!(parsed.content_description.as_deref(), Some("Logo café"));
        assert_eq!(parsed.content_id.as_deref(), Some("logo@example.com"));
        assert_eq!(parsed.file_name.as_deref(), Some("logo.png"));
        assert_eq!(parsed.headers.get("x-other"), Some("kept"));
    }

    #[test]
    fn test_disposition_filename_wins() {
        let parsed = PartHeaders::from_map(map(&[
            ("Content-Type", "application/pdf; name=a.pdf"),
            ("Content-Disposition", "attachment; filename=b.pdf"),
        ]));
        assert_eq!(parsed.file_name.as_deref(), Some("b.pdf"));
    }

    #[test]
    fn test_missing_content_type_defaults_to_text_plain() {
        let parsed = PartHeaders::from_map(HeaderMap::new());
        assert!(parsed.content_type.is_none());
        assert_eq!(parsed.media_type(), "text/plain");
        assert_eq!(parsed.content_transfer_encoding, TransferEncoding::SevenBit);
    }

    #[test]
    fn test_empty_content_type_defaults_to_text_plain() {
        let parsed = PartHeaders::from_map(map(&[("Content-Type", "")]));
        assert!(parsed.content_type.is_none());
        assert_eq!(parsed.media_type(), "text/plain");

        let part = leaf(&[("Content-Type", "  ")], b"hello");
        assert_eq!(part.media_type(), "text/plain");
        assert!(part.is_text());
    }

    #[test]
    fn test_body_text_declared_charset() {
        let part = leaf(
            &[
                ("Content-Type", "text/plain; charset=iso-8859-1"),
                ("Content-Transfer-Encoding", "quoted-printable"),
            ],
            b"Gr=FC=DFe",
        );
        assert_eq!(part.body_text().unwrap(), "Grüße");
    }

    #[test]
    fn test_body_text_undeclared_charset_falls_back() {
        let part = leaf(&[], b"M\xfcller");
        assert_eq!(part.body_text().unwrap(), "Müller");
    }

    #[test]
    fn test_decoding_is_repeatable() {
        let part = leaf(&[("Content-Transfer-Encoding", "base64")], b"SGVsbG8=");
        assert_eq!(part.decoded_body().unwrap(), b"Hello");
        assert_eq!(part.decoded_body().unwrap(), b"Hello");
        assert_eq!(part.raw_body(), b"SGVsbG8=");
    }

    #[test]
    fn test_leaf_without_type_name_or_id_is_not_attachment() {
        let part = leaf(&[], b"plain body");
        assert!(part.attachments().is_empty());
    }
}
