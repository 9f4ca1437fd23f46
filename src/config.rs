//! Application configuration.
//!
//! Configuration is loaded from a TOML file at:
//! 1. `$MIMETREE_CONFIG` (environment variable)
//! 2. `~/.config/mimetree/config.toml` (Linux/macOS)
//!    `%APPDATA%\mimetree\config.toml` (Windows)
//! 3. Built-in defaults

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General behavior settings.
    pub general: GeneralConfig,
    /// Message parser limits.
    pub parser: ParserConfig,
    /// Default file names for attachments without a declared name.
    pub attachments: AttachmentNames,
    /// Export defaults.
    pub export: ExportConfig,
}

/// General behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Override cache directory for logs.
    pub cache_dir: Option<PathBuf>,
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub log_level: String,
}

/// Message parser limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Maximum multipart / message/rfc822 nesting depth. Deeper content is
    /// kept as an undecoded leaf.
    pub max_depth: usize,
}

/// Default file names used when a part is persisted without a declared name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttachmentNames {
    /// MS-TNEF payloads.
    pub ms_tnef: String,
    /// Embedded `message/rfc822` bodies.
    pub mime: String,
    /// Delivery and disposition reports.
    pub report: String,
    /// Message bodies.
    pub body: String,
    /// Numbered message bodies; `*` is replaced by the part number.
    pub body_numbered: String,
}

/// Export defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Default output directory for extracted attachments.
    pub default_output_dir: Option<PathBuf>,
    /// Skip attachments whose decoded content was already written.
    pub dedup: bool,
    /// Maximum length of a sanitized file name.
    pub max_filename_len: usize,
}

// ── Default implementations ─────────────────────────────────────

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            cache_dir: None,
            log_level: "warn".to_string(),
        }
    }
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self { max_depth: 32 }
    }
}

impl Default for AttachmentNames {
    fn default() -> Self {
        Self {
            ms_tnef: "winmail.dat".to_string(),
            mime: "body.eml".to_string(),
            report: "report.htm".to_string(),
            body: "body.htm".to_string(),
            body_numbered: "body*.htm".to_string(),
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            default_output_dir: None,
            dedup: true,
            max_filename_len: 150,
        }
    }
}

impl AttachmentNames {
    /// Expand the numbered body template for part `n`.
    pub fn numbered_body(&self, n: usize) -> String {
        self.body_numbered.replacen('*', &n.to_string(), 1)
    }
}

// ── Load / save ─────────────────────────────────────────────────

/// Load configuration, searching standard locations.
///
/// Returns the default configuration if no file is found or on parse error.
pub fn load_config() -> Config {
    if let Some(path) = config_file_path() {
        if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(contents) => match toml::from_str::<Config>(&contents) {
                    Ok(cfg) => {
                        tracing::info!(path = %path.display(), "Loaded config");
                        return cfg;
                    }
                    Err(e) => {
                        tracing::warn!(
                            path = %path.display(),
                            error = %e,
                            "Failed to parse config, using defaults"
                        );
                    }
                },
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "Failed to read config file, using defaults"
                    );
                }
            }
        }
    }
    Config::default()
}

/// Save configuration to the standard location.
pub fn save_config(config: &Config) -> anyhow::Result<()> {
    let path = config_file_path()
        .ok_or_else(|| anyhow::anyhow!("Could not determine config file path"))?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let contents = toml::to_string_pretty(config)?;
    std::fs::write(&path, contents)?;
    tracing::info!(path = %path.display(), "Saved config");
    Ok(())
}

/// Determine the config file path (checking env var first, then standard dirs).
pub fn config_file_path() -> Option<PathBuf> {
    if let Ok(env_path) = std::env::var("MIMETREE_CONFIG") {
        return Some(PathBuf::from(env_path));
    }

    dirs::config_dir().map(|d| d.join("mimetree").join("config.toml"))
}

/// Return the cache directory for logs.
pub fn cache_dir(config: &Config) -> PathBuf {
    if let Some(ref dir) = config.general.cache_dir {
        return dir.clone();
    }
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("mimetree")
}

/// Return the log file path.
pub fn log_file_path(config: &Config) -> PathBuf {
    cache_dir(config).join("mimetree.log")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let cfg = Config::default();
        assert_eq!(cfg.general.log_level, "warn");
        assert_eq!(cfg.parser.max_depth, 32);
        assert_eq!(cfg.attachments.ms_tnef, "winmail.dat");
        assert_eq!(cfg.attachments.mime, "body.eml");
        assert_eq!(cfg.attachments.report, "report.htm");
        assert!(cfg.export.dedup);
    }

    #[test]
    fn test_serialize_deserialize_roundtrip() {
        let cfg = Config::default();
        let toml_str = toml::to_string_pretty(&cfg).expect("serialize");
        let parsed: Config = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.general.log_level, cfg.general.log_level);
        assert_eq!(parsed.parser.max_depth, cfg.parser.max_depth);
        assert_eq!(parsed.attachments, cfg.attachments);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let partial = r#"
[parser]
max_depth = 4

[attachments]
ms_tnef = "tnef.bin"
"#;
        let cfg: Config = toml::from_str(partial).expect("parse partial");
        assert_eq!(cfg.parser.max_depth, 4);
        assert_eq!(cfg.attachments.ms_tnef, "tnef.bin");
        // Other fields use defaults
        assert_eq!(cfg.attachments.body, "body.htm");
        assert_eq!(cfg.general.log_level, "warn");
    }

    #[test]
    fn test_numbered_body() {
        let names = AttachmentNames::default();
        assert_eq!(names.numbered_body(3), "body3.htm");
    }
}
