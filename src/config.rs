//! TOML configuration: page layout, font, output defaults and logging.
//!
//! The file is `$EMLPDF_CONFIG` when set, otherwise `emlpdf/config.toml`
//! under the platform config directory. Missing keys take their defaults.

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

/// File name of the log written to the cache directory.
pub const LOG_FILE_NAME: &str = "emlpdf.log";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General behavior settings.
    pub general: GeneralConfig,
    /// Page geometry and text size.
    pub layout: LayoutConfig,
    /// Document font.
    pub font: FontConfig,
    /// Output defaults.
    pub output: OutputConfig,
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

/// Page geometry, in PDF points (1/72 inch).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Page width (default: A4).
    pub page_width: f32,
    /// Page height (default: A4).
    pub page_height: f32,
    /// Left and right margin.
    pub margin_x: f32,
    /// Distance from the top edge to the first baseline.
    pub margin_top: f32,
    /// Lowest allowed baseline.
    pub margin_bottom: f32,
    /// Font size for headers and body.
    pub font_size: f32,
    /// Extra space between consecutive lines.
    pub line_gap: f32,
    /// Extra space between the header block and the body.
    pub header_gap: f32,
}

/// Document font.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FontConfig {
    /// TrueType font to embed. Uses the bundled DejaVu Sans when unset.
    pub path: Option<PathBuf>,
    /// Use the PDF standard Helvetica instead of an embedded font. Ignored
    /// when `path` is set.
    pub helvetica: bool,
}

/// Output defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Output directory used when `--output` is not given.
    pub default_dir: Option<PathBuf>,
    /// Sort documents into `YYYY-MM` folders by default.
    pub categorize: bool,
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

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            page_width: 595.28,  // A4
            page_height: 841.89, // A4
            margin_x: 50.0,
            margin_top: 40.0,
            margin_bottom: 40.0,
            font_size: 12.0,
            line_gap: 5.0,
            header_gap: 20.0,
        }
    }
}

// ── Files ───────────────────────────────────────────────────────

/// Where the configuration lives: `$EMLPDF_CONFIG`, else the platform config dir.
pub fn config_file_path() -> Option<PathBuf> {
    match std::env::var_os("EMLPDF_CONFIG") {
        Some(explicit) => Some(PathBuf::from(explicit)),
        None => dirs::config_dir().map(|d| d.join("emlpdf").join("config.toml")),
    }
}

/// Parse one configuration file.
pub fn read_config(path: &Path) -> anyhow::Result<Config> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    toml::from_str(&contents).with_context(|| format!("parsing {}", path.display()))
}

/// Load the configuration, falling back to defaults when the file is
/// missing or unusable.
pub fn load_config() -> Config {
    let Some(path) = config_file_path().filter(|p| p.is_file()) else {
        return Config::default();
    };
    match read_config(&path) {
        Ok(cfg) => {
            tracing::info!(path = %path.display(), "Loaded config");
            cfg
        }
        Err(e) => {
            tracing::warn!(error = format!("{e:#}"), "Ignoring config file, using defaults");
            Config::default()
        }
    }
}

/// Write `config` as TOML to [`config_file_path`], creating parent directories.
pub fn save_config(config: &Config) -> anyhow::Result<PathBuf> {
    let path = config_file_path().context("no configuration directory on this platform")?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&path, toml::to_string_pretty(config)?)?;
    tracing::info!(path = %path.display(), "Saved config");
    Ok(path)
}

/// Directory holding [`LOG_FILE_NAME`].
pub fn cache_dir(config: &Config) -> PathBuf {
    config.general.cache_dir.clone().unwrap_or_else(|| {
        dirs::cache_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("emlpdf")
    })
}
