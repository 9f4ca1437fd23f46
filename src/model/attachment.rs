//! Attachments: a part's body plus the MIME headers describing it, or a
//! standalone blob.
//!
//! Decoding is best effort. Text decoding that fails falls back to the raw
//! body, and nothing is decoded until asked for.

use std::borrow::Cow;
use std::cmp::Ordering;

use tracing::debug;

use crate::config::AttachmentNames;
use crate::error::Result;
use crate::model::message::Message;
use crate::model::part::{MessagePart, PartHeaders};
use crate::parser::charset;
use crate::parser::content::{ContentDisposition, ContentType};
use crate::parser::encoded_word::decode_encoded_words;
use crate::parser::header::extract_headers;
use crate::parser::mime::parse_message;
use crate::parser::transfer::{self, TransferEncoding};

/// An attachment and the headers that describe it.
///
/// Attachments built from text keep the full input (`raw_content`) and the
/// body with the header block removed and whitespace trimmed
/// (`raw_attachment`). Blobs built with [`Attachment::from_bytes`] have
/// neither; their bytes are available through [`Attachment::raw_bytes`].
///
/// Equality and ordering compare `raw_attachment` only, so sorting a list
/// groups identical bodies together.
#[derive(Debug, Clone)]
pub struct Attachment {
    raw_content: Option<Vec<u8>>,
    raw_attachment: Option<Vec<u8>>,
    raw_bytes: Option<Vec<u8>>,
    content_length: usize,
    content_type: Option<ContentType>,
    transfer_encoding: TransferEncoding,
    description: Option<String>,
    disposition: Option<ContentDisposition>,
    /// Empty when no name was declared.
    file_name: String,
    content_id: Option<String>,
}

impl Attachment {
    /// Wrap a blob. Nothing is parsed; the fields are taken as given.
    pub fn from_bytes(
        bytes: Vec<u8>,
        length: usize,
        file_name: impl Into<String>,
        content_type: Option<&str>,
    ) -> Self {
        Self {
            raw_content: None,
            raw_attachment: None,
            raw_bytes: Some(bytes),
            content_length: length,
            content_type: content_type.map(ContentType::parse),
            transfer_encoding: TransferEncoding::default(),
            description: None,
            disposition: None,
            file_name: file_name.into(),
            content_id: None,
        }
    }

    /// Build from text holding a MIME entity.
    ///
    /// With `parse_headers` the leading header block is read the same way a
    /// message part's headers are and `content_type` is ignored. Without it
    /// the whole text is the body, `content_type` describes it and the file
    /// name is the MS-TNEF default (`winmail.dat`).
    pub fn from_text(text: &str, content_type: Option<&str>, parse_headers: bool) -> Self {
        Self::from_text_with_names(text, content_type, parse_headers, &AttachmentNames::default())
    }

    /// [`from_text`](Self::from_text) with configured default file names.
    pub fn from_text_with_names(
        text: &str,
        content_type: Option<&str>,
        parse_headers: bool,
        names: &AttachmentNames,
    ) -> Self {
        let raw = text.as_bytes();

        if !parse_headers {
            return Self {
                raw_content: Some(raw.to_vec()),
                raw_attachment: Some(raw.to_vec()),
                raw_bytes: None,
                content_length: raw.len(),
                content_type: content_type.map(ContentType::parse),
                transfer_encoding: TransferEncoding::default(),
                description: None,
                disposition: None,
                file_name: names.ms_tnef.clone(),
                content_id: None,
            };
        }

        let (headers, body) = match extract_headers(raw) {
            Ok(extracted) => (
                PartHeaders::from_map(extracted.headers),
                &raw[extracted.raw_headers.len()..],
            ),
            Err(e) => {
                debug!(error = %e, "Attachment text has no headers, using it whole");
                (PartHeaders::default(), raw)
            }
        };

        Self::with_headers(&headers, raw, trim_ascii(body))
    }

    /// Build from a parsed part.
    pub fn from_part(part: &MessagePart) -> Self {
        Self::with_headers(part.headers(), part.raw(), trim_ascii(part.raw_body()))
    }

    fn with_headers(headers: &PartHeaders, raw: &[u8], body: &[u8]) -> Self {
        Self {
            raw_content: Some(raw.to_vec()),
            raw_attachment: Some(body.to_vec()),
            raw_bytes: None,
            content_length: body.len(),
            content_type: headers.content_type.clone(),
            transfer_encoding: headers.content_transfer_encoding,
            description: headers.content_description.clone(),
            disposition: headers.content_disposition.clone(),
            file_name: headers.file_name.clone().unwrap_or_default(),
            content_id: headers.content_id.clone(),
        }
    }

    /// Full input text, headers included.
    pub fn raw_content(&self) -> Option<Cow<'_, str>> {
        self.raw_content.as_deref().map(raw_text)
    }

    /// Body with the header block removed and surrounding whitespace trimmed.
    pub fn raw_attachment(&self) -> Option<Cow<'_, str>> {
        self.raw_attachment.as_deref().map(raw_text)
    }

    /// The blob given to [`from_bytes`](Self::from_bytes).
    pub fn raw_bytes(&self) -> Option<&[u8]> {
        self.raw_bytes.as_deref()
    }

    pub fn is_in_bytes(&self) -> bool {
        self.raw_bytes.is_some()
    }

    pub fn content_length(&self) -> usize {
        self.content_length
    }

    pub fn content_type(&self) -> Option<&ContentType> {
        self.content_type.as_ref()
    }

    /// Declared media type, if any.
    pub fn media_type(&self) -> Option<&str> {
        self.content_type.as_ref().map(|ct| ct.media_type.as_str())
    }

    pub fn charset(&self) -> Option<&str> {
        self.content_type.as_ref().and_then(|ct| ct.charset.as_deref())
    }

    pub fn format(&self) -> Option<&str> {
        self.content_type.as_ref().and_then(|ct| ct.format.as_deref())
    }

    pub fn transfer_encoding(&self) -> TransferEncoding {
        self.transfer_encoding
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn disposition(&self) -> Option<&ContentDisposition> {
        self.disposition.as_ref()
    }

    /// Declared file name; empty when none was given.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn content_id(&self) -> Option<&str> {
        self.content_id.as_deref()
    }

    /// True when there is neither a usable content type and file name nor a
    /// Content-ID.
    pub fn is_not_attachment(&self) -> bool {
        (self.content_type.is_none() || self.file_name.is_empty()) && self.content_id.is_none()
    }

    /// File name to persist the attachment under: the declared one, else a
    /// default picked by content category.
    pub fn default_file_name(&self, names: &AttachmentNames) -> String {
        if !self.file_name.is_empty() {
            return self.file_name.clone();
        }
        let media_type = self.media_type().unwrap_or("");
        match media_type {
            "application/ms-tnef" | "application/vnd.ms-tnef" => names.ms_tnef.clone(),
            "message/rfc822" => names.mime.clone(),
            "multipart/report"
            | "message/delivery-status"
            | "message/disposition-notification" => names.report.clone(),
            _ => names.body.clone(),
        }
    }

    /// Body as text.
    ///
    /// `message/rfc822` bodies only get encoded words decoded. Anything else
    /// is transfer-decoded and mapped through the declared charset. Any
    /// failure returns the raw body instead.
    pub fn decode_as_text(&self) -> String {
        let body = match (&self.raw_attachment, &self.raw_bytes) {
            (Some(body), _) => body,
            (None, Some(bytes)) => return charset::decode_latin1(bytes),
            (None, None) => return String::new(),
        };

        if self.media_type() == Some("message/rfc822") {
            return decode_encoded_words(&raw_text(body));
        }

        transfer::decode_text(body, self.transfer_encoding, self.charset()).unwrap_or_else(|e| {
            debug!(error = %e, file_name = %self.file_name, "Attachment kept undecoded");
            raw_text(body).into_owned()
        })
    }

    /// Parse the attachment as a message.
    ///
    /// `use_raw_content` picks the full input over the header-stripped body;
    /// `remove_leading_blank_line` drops one leading CRLF first.
    pub fn decode_as_message(
        &self,
        remove_leading_blank_line: bool,
        use_raw_content: bool,
    ) -> Result<Message> {
        let source = if use_raw_content {
            self.raw_content.as_deref()
        } else {
            self.raw_attachment.as_deref()
        };
        let mut content = source.or(self.raw_bytes.as_deref()).unwrap_or_default();
        if remove_leading_blank_line {
            content = content.strip_prefix(b"\r\n").unwrap_or(content);
        }
        parse_message(content)
    }

    /// Body bytes with the transfer encoding reversed, whatever the file
    /// name. An undecodable body is returned as it is.
    pub fn decoded_content(&self) -> Vec<u8> {
        if let Some(bytes) = &self.raw_bytes {
            return bytes.clone();
        }
        let Some(body) = &self.raw_attachment else {
            return Vec::new();
        };
        transfer::decode_bytes(body, self.transfer_encoding).unwrap_or_else(|e| {
            debug!(error = %e, file_name = %self.file_name, "Attachment content kept undecoded");
            body.clone()
        })
    }

    /// Decoded body as bytes, for writing to disk.
    ///
    /// Returns `None` when there is no text body, which includes blobs from
    /// [`from_bytes`](Self::from_bytes), and also whenever the file name is
    /// empty even if a body exists. The body is decoded with
    /// [`decode_as_text`](Self::decode_as_text) and encoded back in the
    /// declared charset. Without a usable charset it is mapped back one char
    /// per byte (ISO-8859-1), so binary content survives intact.
    pub fn decoded_as_bytes(&self) -> Option<Vec<u8>> {
        if self.file_name.is_empty() {
            return None;
        }
        self.raw_attachment.as_ref()?;

        let text = self.decode_as_text();
        let encoding = self.charset().and_then(|name| charset::lookup(name).ok());
        Some(match encoding {
            Some(encoding) => charset::encode(encoding, &text),
            None => charset::encode_latin1(&text),
        })
    }
}

impl PartialEq for Attachment {
    fn eq(&self, other: &Self) -> bool {
        self.raw_attachment == other.raw_attachment
    }
}

impl Eq for Attachment {}

impl PartialOrd for Attachment {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Attachment {
    fn cmp(&self, other: &Self) -> Ordering {
        self.raw_attachment.cmp(&other.raw_attachment)
    }
}

/// UTF-8 when valid, otherwise one char per byte.
fn raw_text(bytes: &[u8]) -> Cow<'_, str> {
    match std::str::from_utf8(bytes) {
        Ok(s) => Cow::Borrowed(s),
        Err(_) => encoding_rs::mem::decode_latin1(bytes),
    }
}

fn trim_ascii(bytes: &[u8]) -> &[u8] {
    let start = bytes
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(bytes.len());
    let end = bytes
        .iter()
        .rposition(|b| !b.is_ascii_whitespace())
        .map_or(start, |i| i + 1);
    &bytes[start..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    const PDF_PART: &str = "Content-Type: application/pdf; name=\"doc.pdf\"\r\n\
Content-Transfer-Encoding: base64\r\n\
Content-Disposition: attachment; filename=\"report.pdf\"\r\n\
\r\n\
JVBERi0xLjQ=\r\n";

    #[test]
    fn test_from_text_parses_headers() {
        let att = Attachment::from_text(PDF_PART, None, true);
        assert_eq!(att.media_type(), Some("application/pdf"));
        assert_eq!(att.transfer_encoding(), TransferEncoding::Base64);
        assert_eq!(att.file_name(), "report.pdf");
        assert_eq!(att.raw_attachment().as_deref(), Some("JVBERi0xLjQ="));
        assert_eq!(att.raw_content().as_deref(), Some(PDF_PART));
        assert!(!att.is_not_attachment());
    }

    #[test]
    fn test_decoded_as_bytes() {
        let att = Attachment::from_text(PDF_PART, None, true);
        assert_eq!(att.decoded_as_bytes().unwrap(), b"%PDF-1.4");
    }

    #[test]
    fn test_decoded_as_bytes_binary_survives() {
        let text = "Content-Type: application/octet-stream; name=x.bin\r\n\
Content-Transfer-Encoding: base64\r\n\r\n/wCA";
        let att = Attachment::from_text(text, None, true);
        assert_eq!(att.decoded_as_bytes().unwrap(), vec![0xffu8, 0x00, 0x80]);
    }

    // The file name gates byte extraction even when a body is present.
    #[test]
    fn test_decoded_as_bytes_none_without_file_name() {
        let text = "Content-Type: text/plain\r\nContent-ID: <x@y>\r\n\r\nhello";
        let att = Attachment::from_text(text, None, true);
        assert_eq!(att.decode_as_text(), "hello");
        assert!(att.decoded_as_bytes().is_none());
    }

    #[test]
    fn test_decoded_content_ignores_file_name() {
        let text = "Content-Type: image/png\r\nContent-ID: <logo@x>\r\n\
Content-Transfer-Encoding: base64\r\n\r\niVBORw0KGgo=";
        let att = Attachment::from_text(text, None, true);
        assert!(att.decoded_as_bytes().is_none());
        assert_eq!(att.decoded_content(), b"\x89PNG\r\n\x1a\n");
    }

    #[test]
    fn test_from_text_without_headers_is_tnef_blob() {
        let att = Attachment::from_text("x: not a header", Some("application/ms-tnef"), false);
        assert_eq!(att.file_name(), "winmail.dat");
        assert_eq!(att.raw_attachment().as_deref(), Some("x: not a header"));
        assert_eq!(att.media_type(), Some("application/ms-tnef"));
    }

    #[test]
    fn test_content_type_argument_ignored_when_parsing_headers() {
        let text = "Content-Disposition: attachment; filename=a.txt\r\n\r\nbody";
        let att = Attachment::from_text(text, Some("text/plain"), true);
        assert_eq!(att.media_type(), None);
        assert_eq!(att.file_name(), "a.txt");
        assert!(att.is_not_attachment());

        let att = Attachment::from_text(PDF_PART, Some("text/html"), true);
        assert_eq!(att.media_type(), Some("application/pdf"));
    }

    #[test]
    fn test_not_attachment_rule() {
        let bare = Attachment::from_text("X-Foo: bar\r\n\r\nbody", None, true);
        assert!(bare.is_not_attachment());

        let typed_no_name = Attachment::from_text("Content-Type: image/png\r\n\r\nabc", None, true);
        assert!(typed_no_name.is_not_attachment());

        let with_id = Attachment::from_text("Content-ID: <a@b>\r\n\r\nabc", None, true);
        assert!(!with_id.is_not_attachment());
    }

    #[test]
    fn test_decode_as_text_degrades_on_unknown_charset() {
        let text = "Content-Type: text/plain; charset=x-martian; name=a.txt\r\n\
Content-Transfer-Encoding: quoted-printable\r\n\r\ncaf=E9";
        let att = Attachment::from_text(text, None, true);
        assert_eq!(att.decode_as_text(), "caf=E9");
    }

    #[test]
    fn test_decode_as_text_degrades_on_bad_base64() {
        let text = "Content-Type: text/plain; name=a.txt\r\n\
Content-Transfer-Encoding: base64\r\n\r\nnot*base64";
        let att = Attachment::from_text(text, None, true);
        assert_eq!(att.decode_as_text(), "not*base64");
    }

    #[test]
    fn test_decode_as_text_rfc822_only_decodes_words() {
        let text = "Content-Type: message/rfc822\r\n\
Content-Transfer-Encoding: base64\r\n\r\n\
Subject: =?utf-8?Q?caf=C3=A9?=\r\n\r\nSGVsbG8=";
        let att = Attachment::from_text(text, None, true);
        assert_eq!(att.decode_as_text(), "Subject: café\r\n\r\nSGVsbG8=");
    }

    #[test]
    fn test_decode_as_message() {
        let text = "Content-Type: message/rfc822\r\n\r\n\
Subject: inner\r\n\r\ninner body";
        let att = Attachment::from_text(text, None, true);
        let inner = att.decode_as_message(false, false).unwrap();
        assert_eq!(inner.header().subject.as_deref(), Some("inner"));

        let outer = att.decode_as_message(true, true).unwrap();
        assert_eq!(outer.root().media_type(), "message/rfc822");
    }

    #[test]
    fn test_from_bytes_verbatim() {
        let att = Attachment::from_bytes(vec![1, 2, 3], 3, "blob.bin", Some("application/octet-stream"));
        assert!(att.is_in_bytes());
        assert_eq!(att.content_length(), 3);
        assert_eq!(att.raw_bytes(), Some(&[1u8, 2, 3][..]));
        assert!(att.raw_attachment().is_none());
        assert_eq!(att.decode_as_text(), "\u{1}\u{2}\u{3}");
        assert_eq!(att.decoded_content(), vec![1u8, 2, 3]);
    }

    // Blobs have no text body, so byte extraction yields nothing even with
    // a file name; the bytes stay reachable through `raw_bytes`.
    #[test]
    fn test_decoded_as_bytes_none_for_blob() {
        let att = Attachment::from_bytes(vec![1, 2, 3], 3, "blob.bin", None);
        assert!(att.decoded_as_bytes().is_none());
    }

    #[test]
    fn test_decoded_as_bytes_declared_utf8_beyond_latin1() {
        let text = "Content-Type: text/plain; charset=utf-8; name=a.txt\r\n\r\n\u{20ac}uro \u{65e5}\u{672c}";
        let att = Attachment::from_text(text, None, true);
        assert_eq!(att.decode_as_text(), "\u{20ac}uro \u{65e5}\u{672c}");
        assert_eq!(
            att.decoded_as_bytes().unwrap(),
            "\u{20ac}uro \u{65e5}\u{672c}".as_bytes()
        );
    }

    #[test]
    fn test_decoded_as_bytes_declared_latin1_qp() {
        let text = "Content-Type: text/plain; charset=iso-8859-1; name=a.txt\r\n\
Content-Transfer-Encoding: quoted-printable\r\n\r\ncaf=E9";
        let att = Attachment::from_text(text, None, true);
        assert_eq!(att.decoded_as_bytes().unwrap(), b"caf\xe9");
    }

    #[test]
    fn test_default_file_names() {
        let names = AttachmentNames::default();
        let tnef = Attachment::from_bytes(Vec::new(), 0, "", Some("application/ms-tnef"));
        let nested = Attachment::from_bytes(Vec::new(), 0, "", Some("message/rfc822"));
        let report = Attachment::from_bytes(Vec::new(), 0, "", Some("message/delivery-status"));
        let html = Attachment::from_bytes(Vec::new(), 0, "", Some("text/html"));
        let named = Attachment::from_bytes(Vec::new(), 0, "x.txt", Some("text/plain"));

        assert_eq!(tnef.default_file_name(&names), "winmail.dat");
        assert_eq!(nested.default_file_name(&names), "body.eml");
        assert_eq!(report.default_file_name(&names), "report.htm");
        assert_eq!(html.default_file_name(&names), "body.htm");
        assert_eq!(named.default_file_name(&names), "x.txt");
    }

    #[test]
    fn test_ordering_by_raw_attachment() {
        let b = Attachment::from_text("Content-ID: <1>\r\n\r\nbbb", None, true);
        let a = Attachment::from_text("Content-ID: <2>\r\n\r\naaa", None, true);
        let a2 = Attachment::from_text("Content-Type: text/plain\r\n\r\n  aaa  ", None, true);

        let mut list = vec![b.clone(), a.clone()];
        list.sort();
        assert_eq!(list[0].raw_attachment().as_deref(), Some("aaa"));
        assert_eq!(a, a2);
        assert!(a < b);
    }
}
