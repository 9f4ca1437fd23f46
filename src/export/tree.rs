//! Part tree summaries for display and JSON output.

use std::fmt::Write as _;

use serde::Serialize;

use crate::model::message::{Message, MessageHeader};
use crate::model::part::{MessagePart, PartBody};
use crate::parser::transfer::TransferEncoding;

/// One node of the summarized tree.
#[derive(Debug, Clone, Serialize)]
pub struct PartSummary {
    pub media_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub charset: Option<String>,
    pub transfer_encoding: TransferEncoding,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disposition: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_id: Option<String>,
    /// Size of the still-encoded body.
    pub body_size: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<PartSummary>,
    /// Summary of an embedded `message/rfc822`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<Box<MessageSummary>>,
}

/// A message: its decoded headers and the tree below its root.
#[derive(Debug, Clone, Serialize)]
pub struct MessageSummary {
    pub header: MessageHeader,
    pub raw_size: usize,
    pub root: PartSummary,
}

impl MessageSummary {
    pub fn new(message: &Message) -> Self {
        Self {
            header: message.header().clone(),
            raw_size: message.raw_size(),
            root: PartSummary::new(message.root()),
        }
    }
}

impl PartSummary {
    pub fn new(part: &MessagePart) -> Self {
        let (children, message) = match part.body() {
            PartBody::Leaf => (Vec::new(), None),
            PartBody::Multipart(children) => (children.iter().map(Self::new).collect(), None),
            PartBody::Message(nested) => (Vec::new(), Some(Box::new(MessageSummary::new(nested)))),
        };

        Self {
            media_type: part.media_type().to_string(),
            charset: part.charset().map(str::to_string),
            transfer_encoding: part.transfer_encoding(),
            disposition: part
                .content_disposition()
                .and_then(|d| d.disposition_type.clone()),
            file_name: part.file_name().map(str::to_string),
            content_id: part.content_id().map(str::to_string),
            body_size: part.raw_body().len(),
            children,
            message,
        }
    }
}

/// Render the tree as indented text, one part per line.
pub fn render_tree(message: &Message) -> String {
    let mut out = String::new();
    render_part(&PartSummary::new(message.root()), 0, &mut out);
    out
}

fn render_part(part: &PartSummary, depth: usize, out: &mut String) {
    let indent = "  ".repeat(depth);
    let size = humansize::format_size(part.body_size, humansize::BINARY);
    let _ = write!(out, "{indent}{} [{}, {size}]", part.media_type, part.transfer_encoding);
    if let Some(name) = &part.file_name {
        let _ = write!(out, " \"{name}\"");
    }
    if let Some(id) = &part.content_id {
        let _ = write!(out, " <{id}>");
    }
    out.push('\n');

    for child in &part.children {
        render_part(child, depth + 1, out);
    }
    if let Some(nested) = &part.message {
        if let Some(subject) = &nested.header.subject {
            let _ = writeln!(out, "{indent}  Subject: {subject}");
        }
        render_part(&nested.root, depth + 1, out);
    }
}
