//! Message decoding: header extraction, encoded words, dates, structured
//! fields, transfer encodings and MIME tree assembly.

pub mod charset;
pub mod content;
pub mod date;
pub mod eml;
pub mod encoded_word;
pub mod header;
pub mod mime;
pub mod transfer;

pub use mime::{parse_message, MessageParser};
