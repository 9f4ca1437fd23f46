//! The root of a parsed message.

use serde::Serialize;

use crate::error::Result;
use crate::model::address::EmailAddress;
use crate::model::attachment::Attachment;
use crate::model::header::HeaderMap;
use crate::model::part::MessagePart;
use crate::parser::date::{parse_date_time, ParsedDateTime};
use crate::parser::encoded_word::decode_encoded_words;
use crate::parser::header::{extract_all_angle_brackets, strip_angle_brackets};
use crate::traverse;

/// Facts about a message known before it was parsed (typically from the
/// mail store it came from). Carried untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MessageInfo {
    pub size: Option<u64>,
    pub uid: Option<String>,
    pub flags: Vec<String>,
}

/// The well-known headers of the top-level part, decoded for display.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MessageHeader {
    /// Encoded words decoded.
    pub subject: Option<String>,
    pub from: Option<EmailAddress>,
    pub sender: Option<EmailAddress>,
    pub reply_to: Vec<EmailAddress>,
    pub to: Vec<EmailAddress>,
    pub cc: Vec<EmailAddress>,
    pub bcc: Vec<EmailAddress>,
    /// `Date` as written; see [`Message::date`].
    pub date: Option<String>,
    pub message_id: Option<String>,
    pub in_reply_to: Vec<String>,
    pub references: Vec<String>,
    /// Every `Received` trace line, newest first as in the message.
    pub received: Vec<String>,
    pub mime_version: Option<String>,
}

impl MessageHeader {
    pub fn from_map(headers: &HeaderMap) -> Self {
        let addresses = |name: &str| {
            headers
                .get_all(name)
                .flat_map(EmailAddress::parse_list)
                .collect::<Vec<_>>()
        };
        let single = |name: &str| headers.get(name).map(EmailAddress::parse);

        Self {
            subject: headers.get("subject").map(decode_encoded_words),
            from: single("from"),
            sender: single("sender"),
            reply_to: addresses("reply-to"),
            to: addresses("to"),
            cc: addresses("cc"),
            bcc: addresses("bcc"),
            date: headers.get("date").map(str::to_string),
            message_id: headers
                .get("message-id")
                .map(strip_angle_brackets)
                .filter(|id| !id.is_empty()),
            in_reply_to: headers
                .get("in-reply-to")
                .map(extract_all_angle_brackets)
                .unwrap_or_default(),
            references: headers
                .get_all("references")
                .flat_map(extract_all_angle_brackets)
                .collect(),
            received: headers.get_all("received").map(str::to_string).collect(),
            mime_version: headers.get("mime-version").map(str::to_string),
        }
    }
}

/// A parsed message: the root part plus whole-message metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    root: MessagePart,
    header: MessageHeader,
    /// Passed through from the caller.
    pub info: MessageInfo,
}

impl Message {
    pub(crate) fn new(root: MessagePart) -> Self {
        let header = MessageHeader::from_map(root.header_map());
        Self {
            root,
            header,
            info: MessageInfo::default(),
        }
    }

    /// Attach externally known facts about the message.
    pub fn with_info(mut self, info: MessageInfo) -> Self {
        self.info = info;
        self
    }

    pub fn root(&self) -> &MessagePart {
        &self.root
    }

    pub fn header(&self) -> &MessageHeader {
        &self.header
    }

    pub fn headers(&self) -> &HeaderMap {
        self.root.header_map()
    }

    /// The whole message as parsed.
    pub fn raw(&self) -> &[u8] {
        self.root.raw()
    }

    pub fn raw_size(&self) -> usize {
        self.root.raw().len()
    }

    /// The `Date` header parsed. `None` when the header is missing; a
    /// malformed date is an error for the caller to handle.
    pub fn date(&self) -> Option<Result<ParsedDateTime>> {
        self.header.date.as_deref().map(parse_date_time)
    }

    /// First part, depth-first, whose effective media type equals
    /// `media_type` (compared lowercased).
    pub fn find_first_part_by_media_type(&self, media_type: &str) -> Option<&MessagePart> {
        traverse::find_first_part_by_media_type(&self.root, media_type)
    }

    pub fn find_first_plain_text(&self) -> Option<&MessagePart> {
        self.find_first_part_by_media_type("text/plain")
    }

    pub fn find_first_html(&self) -> Option<&MessagePart> {
        self.find_first_part_by_media_type("text/html")
    }

    pub fn find_part_by_content_id(&self, content_id: &str) -> Option<&MessagePart> {
        traverse::find_part_by_content_id(&self.root, content_id)
    }

    pub fn attachments(&self) -> Vec<Attachment> {
        self.root.attachments()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::date::ZoneSource;
    use crate::parser::mime::parse_message;

    const RAW: &[u8] = b"From: =?utf-8?Q?Ren=C3=A9?= <rene@example.com>\r\n\
To: a@example.com, \"B, Bee\" <b@example.com>\r\n\
Cc: c@example.com\r\n\
Subject: =?utf-8?B?SG9sYQ==?= world\r\n\
Date: Fri, 21 Nov 1997 09:55:06 -0600\r\n\
Message-ID: <1234@local.machine.example>\r\n\
In-Reply-To: <1233@local.machine.example>\r\n\
References: <1232@local.machine.example>\r\n <1233@local.machine.example>\r\n\
Received: from a by b\r\n\
Received: from c by d\r\n\
\r\n\
Body\r\n";

    #[test]
    fn test_summary_headers() {
        let msg = parse_message(RAW).unwrap();
        let h = msg.header();
        assert_eq!(h.subject.as_deref(), Some("Hola world"));
        assert_eq!(h.from.as_ref().unwrap().display_name, "René");
        assert_eq!(h.to.len(), 2);
        assert_eq!(h.to[1].display_name, "B, Bee");
        assert_eq!(h.cc[0].address, "c@example.com");
        assert_eq!(h.message_id.as_deref(), Some("1234@local.machine.example"));
        assert_eq!(h.in_reply_to, vec!["1233@local.machine.example"]);
        assert_eq!(h.references.len(), 2);
        assert_eq!(h.received, vec!["from a by b", "from c by d"]);
    }

    #[test]
    fn test_date_parsed_on_demand() {
        let msg = parse_message(RAW).unwrap();
        let date = msg.date().unwrap().unwrap();
        assert_eq!(date.utc.to_rfc3339(), "1997-11-21T15:55:06+00:00");
        assert_eq!(date.zone, ZoneSource::Numeric);
    }

    #[test]
    fn test_bad_date_is_an_error() {
        let msg = parse_message(b"Date: yesterday\r\n\r\nx").unwrap();
        assert!(msg.date().unwrap().is_err());

        let msg = parse_message(b"Subject: no date\r\n\r\nx").unwrap();
        assert!(msg.date().is_none());
    }

    #[test]
    fn test_info_passthrough() {
        let info = MessageInfo {
            size: Some(42),
            uid: Some("uid-7".into()),
            flags: vec!["\\Seen".into()],
        };
        let msg = parse_message(RAW).unwrap().with_info(info.clone());
        assert_eq!(msg.info, info);
        assert_eq!(msg.raw_size(), RAW.len());
    }
}
