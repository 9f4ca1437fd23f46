//! Output built from parsed messages: attachment files, text rendering and
//! tree summaries.

pub mod attachment;
pub mod text;
pub mod tree;
