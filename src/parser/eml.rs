//! Loading single `.eml` files (one RFC 2822 message per file).

use std::path::Path;

use tracing::debug;

use crate::error::{MimeError, Result};
use crate::model::message::{Message, MessageInfo};
use crate::parser::mime::MessageParser;

/// Read and parse a `.eml` file with default limits.
pub fn parse_eml(path: impl AsRef<Path>) -> Result<Message> {
    parse_eml_with(path, &MessageParser::default())
}

/// Read and parse a `.eml` file.
///
/// A UTF-8 byte-order mark and a leading mbox `From ` envelope line are
/// skipped. The file size is recorded in [`MessageInfo::size`].
pub fn parse_eml_with(path: impl AsRef<Path>, parser: &MessageParser) -> Result<Message> {
    let path = path.as_ref();
    let data = std::fs::read(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            MimeError::FileNotFound(path.to_path_buf())
        } else {
            MimeError::io(path, e)
        }
    })?;

    debug!(path = %path.display(), bytes = data.len(), "Parsing message file");
    let message = parser.parse(strip_envelope(&data))?;
    Ok(message.with_info(MessageInfo {
        size: Some(data.len() as u64),
        ..MessageInfo::default()
    }))
}

/// Skip a UTF-8 BOM and the mbox `From ` separator line.
pub fn strip_envelope(data: &[u8]) -> &[u8] {
    let data = data.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(data);

    if data.starts_with(b"From ") {
        if let Some(pos) = data.iter().position(|&b| b == b'\n') {
            return &data[pos + 1..];
        }
    }
    data
}
