//! `mimetree` decodes raw RFC 2822 / MIME messages into a tree of typed
//! parts.
//!
//! Headers are unfolded and their encoded words decoded, transfer encodings
//! are reversed on demand, attachments are identified and dates are
//! normalized to UTC. Real-world mail is accepted leniently: wherever a
//! literal fallback exists the decoder degrades to it instead of failing.
//!
//! ```
//! use mimetree::parse_message;
//!
//! let raw = b"Subject: =?utf-8?Q?caf=C3=A9?=\r\n\r\nHello\r\n";
//! let message = parse_message(raw).unwrap();
//! assert_eq!(message.header().subject.as_deref(), Some("café"));
//! assert_eq!(message.root().body_text().unwrap(), "Hello\r\n");
//! ```

pub mod config;
pub mod error;
pub mod export;
pub mod model;
pub mod parser;
pub mod traverse;

pub use error::{MimeError, Result};
pub use model::attachment::Attachment;
pub use model::message::{Message, MessageInfo};
pub use model::part::{MessagePart, PartBody};
pub use parser::{parse_message, MessageParser};
