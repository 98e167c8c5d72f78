//! Text configuration (lumen_text.toml)
//!
//! Defaults for new text fields, the auto-scale search bounds, and the
//! bitmap fonts to register at startup.

use crate::{Result, TextError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level text configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TextConfig {
    /// Font used by text fields created without an explicit font
    #[serde(default = "default_font_name")]
    pub default_font_name: String,
    /// Font size used by text fields created without an explicit size
    #[serde(default = "default_font_size")]
    pub default_font_size: f32,
    /// Text color as 0xRRGGBB
    #[serde(default)]
    pub default_color: u32,
    /// Smallest size auto-scale will shrink to
    #[serde(default = "default_min_font_size")]
    pub min_font_size: f32,
    /// Upper bound on auto-scale search steps
    #[serde(default = "default_auto_scale_iterations")]
    pub auto_scale_iterations: u32,
    /// Auto-scale stops once the search window is narrower than this
    #[serde(default = "default_auto_scale_precision")]
    pub auto_scale_precision: f32,
    /// Bitmap fonts registered by `FontRegistry::preload`
    #[serde(default)]
    pub fonts: Vec<FontEntry>,
}

/// A bitmap font file to register
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct FontEntry {
    /// Path to the BMFont XML descriptor
    pub path: PathBuf,
    /// Registry name; the descriptor's face name when absent
    #[serde(default)]
    pub name: Option<String>,
}

fn default_font_name() -> String {
    "Helvetica".to_string()
}

fn default_font_size() -> f32 {
    14.0
}

fn default_min_font_size() -> f32 {
    4.0
}

fn default_auto_scale_iterations() -> u32 {
    12
}

fn default_auto_scale_precision() -> f32 {
    0.05
}

impl Default for TextConfig {
    fn default() -> Self {
        Self {
            default_font_name: default_font_name(),
            default_font_size: default_font_size(),
            default_color: 0x000000,
            min_font_size: default_min_font_size(),
            auto_scale_iterations: default_auto_scale_iterations(),
            auto_scale_precision: default_auto_scale_precision(),
            fonts: Vec::new(),
        }
    }
}

impl TextConfig {
    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: TextConfig =
            toml::from_str(content).map_err(|e| TextError::Config(e.to_string()))?;
        config.check()?;
        Ok(config)
    }

    /// Load configuration from a file
    ///
    /// Relative font paths are resolved against the file's directory.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| TextError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let mut config = Self::from_toml_str(&content)?;

        let base = path.parent().unwrap_or(Path::new(""));
        for entry in &mut config.fonts {
            if entry.path.is_relative() {
                entry.path = base.join(&entry.path);
            }
        }
        Ok(config)
    }

    /// Serialize to TOML string
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| TextError::Config(e.to_string()))
    }

    fn check(&self) -> Result<()> {
        if !(self.default_font_size.is_finite() && self.default_font_size > 0.0) {
            return Err(TextError::Config(format!(
                "default_font_size must be positive, got {}",
                self.default_font_size
            )));
        }
        if !(self.min_font_size.is_finite() && self.min_font_size > 0.0) {
            return Err(TextError::Config(format!(
                "min_font_size must be positive, got {}",
                self.min_font_size
            )));
        }
        if !(self.auto_scale_precision.is_finite() && self.auto_scale_precision > 0.0) {
            return Err(TextError::Config(format!(
                "auto_scale_precision must be positive, got {}",
                self.auto_scale_precision
            )));
        }
        Ok(())
    }
}
