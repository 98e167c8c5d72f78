//! Bitmap-font text for the Lumen scene graph
//!
//! This crate provides:
//! - BMFont descriptor parsing and a built-in debug font
//! - A shared, injectable font registry
//! - Text layout (line breaking, alignment, auto-size, auto-scale, kerning)
//! - Text fields with lazy layout and two font paths (bitmap atlas or an
//!   external system-font rasterizer)
//! - Glyph quad output and draw-call batching

pub mod config;
pub mod field;
pub mod font;
pub mod layout;
pub mod mini;
pub mod registry;
pub mod renderer;
pub mod system;
pub mod texture;

#[cfg(test)]
mod test_support;

pub use config::{FontEntry, TextConfig};
pub use field::{FontPath, TextField};
pub use font::{FontDescriptor, Glyph, MISSING_GLYPH_ADVANCE_EM};
pub use layout::{
    AutoSize, HAlign, LayoutOptions, LineRecord, MetricsSource, PlacedGlyph, TextLayout,
    TextLayoutEngine, VAlign, NATIVE_FONT_SIZE,
};
pub use mini::{mini_font, MINI_FONT_NAME};
pub use registry::FontRegistry;
pub use renderer::{
    BorderOutline, DrawBatch, GlyphQuad, GlyphRun, MaterialId, QuadBatcher, RenderOutput,
    SystemTextDraw, TextGeometry,
};
pub use system::{
    RasterizedText, SystemFontStyle, SystemTextMetrics, SystemTextRasterizer, SystemTextRequest,
    DEFAULT_SYSTEM_FONT_SIZE,
};
pub use texture::{AtlasTexture, Texture, TextureId};

use std::path::PathBuf;
use thiserror::Error;

/// Text errors
#[derive(Error, Debug)]
pub enum TextError {
    #[error("Invalid font descriptor: {0}")]
    InvalidFontDescriptor(String),

    #[error("Font file not found: {}", .0.display())]
    FontFileNotFound(PathBuf),

    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse font: {0}")]
    FontParse(String),

    #[error("Failed to decode atlas image: {0}")]
    Image(#[from] image::ImageError),

    #[error("Invalid value {value} for {property}")]
    InvalidProperty { property: &'static str, value: f32 },

    #[error("Invalid text configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, TextError>;
