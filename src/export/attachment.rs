//! Write a message's attachments to disk.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::config::{AttachmentNames, ExportConfig};
use crate::error::{MimeError, Result};
use crate::model::message::Message;

/// Options for [`export_attachments`].
#[derive(Debug, Clone)]
pub struct ExportOptions {
    /// Skip attachments whose decoded bytes were already written.
    pub dedup: bool,
    pub max_filename_len: usize,
    pub names: AttachmentNames,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self::from_config(&ExportConfig::default(), &AttachmentNames::default())
    }
}

impl ExportOptions {
    pub fn from_config(export: &ExportConfig, names: &AttachmentNames) -> Self {
        Self {
            dedup: export.dedup,
            max_filename_len: export.max_filename_len,
            names: names.clone(),
        }
    }
}

/// Write every attachment of `message` into `output_dir`.
///
/// File names are sanitized and never overwrite an existing file. An
/// attachment with no declared name is written under its default name
/// (`winmail.dat`, `body.eml`, …); the second and later unnamed bodies use
/// the numbered template (`body2.htm`). Content is written transfer-decoded.
/// Returns the written paths in attachment order.
pub fn export_attachments(
    message: &Message,
    output_dir: &Path,
    options: &ExportOptions,
) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(output_dir).map_err(|e| MimeError::io(output_dir, e))?;

    let mut seen = HashSet::new();
    let mut paths = Vec::new();
    let mut unnamed_bodies = 0usize;

    for attachment in message.attachments() {
        let data = attachment.decoded_content();
        if options.dedup && !seen.insert(Sha256::digest(&data)) {
            debug!(file_name = attachment.file_name(), "Duplicate attachment skipped");
            continue;
        }

        let mut name = attachment.default_file_name(&options.names);
        if attachment.file_name().is_empty() && name == options.names.body {
            unnamed_bodies += 1;
            if unnamed_bodies > 1 {
                name = options.names.numbered_body(unnamed_bodies);
            }
        }

        match export_attachment(&name, &data, output_dir, options) {
            Ok(path) => paths.push(path),
            Err(e) => {
                warn!(
                    file_name = attachment.file_name(),
                    error = %e,
                    "Failed to export attachment"
                );
            }
        }
    }

    info!(count = paths.len(), dir = %output_dir.display(), "Exported attachments");
    Ok(paths)
}

fn export_attachment(
    name: &str,
    data: &[u8],
    output_dir: &Path,
    options: &ExportOptions,
) -> Result<PathBuf> {
    let file_name = sanitize_filename_part(name, options.max_filename_len);
    let path = unique_path(&output_dir.join(file_name))?;

    std::fs::write(&path, data).map_err(|e| MimeError::io(&path, e))?;
    debug!(path = %path.display(), bytes = data.len(), "Wrote attachment");
    Ok(path)
}

/// Sanitize a string for use in filenames.
///
/// Replaces invalid characters with `_` and truncates to `max_len`.
pub fn sanitize_filename_part(s: &str, max_len: usize) -> String {
    let sanitized: String = s
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '.' || c == '_' || c == '@' {
                c
            } else {
                '_'
            }
        })
        .take(max_len)
        .collect();

    // A name made only of dots would resolve to a directory.
    if sanitized.chars().all(|c| c == '.' || c == '_') {
        "unknown".to_string()
    } else {
        sanitized
    }
}

/// If `path` already exists, append a counter to make it unique.
fn unique_path(path: &Path) -> Result<PathBuf> {
    if !path.exists() {
        return Ok(path.to_path_buf());
    }

    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("file");
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    let parent = path.parent().unwrap_or(Path::new("."));

    for i in 1..1000 {
        let candidate = if ext.is_empty() {
            parent.join(format!("{stem}_{i}"))
        } else {
            parent.join(format!("{stem}_{i}.{ext}"))
        };
        if !candidate.exists() {
            return Ok(candidate);
        }
    }

    Err(MimeError::ExportError(format!(
        "no free file name for '{}'",
        path.display()
    )))
}
