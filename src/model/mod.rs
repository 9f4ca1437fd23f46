//! The parsed message tree and the values hanging off it.

pub mod address;
pub mod attachment;
pub mod header;
pub mod message;
pub mod part;
