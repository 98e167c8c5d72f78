//! System-font collaborator
//!
//! Text whose font name does not resolve to a registered bitmap font is
//! shaped and rasterized by an external renderer (platform text APIs, a
//! vector font stack, ...). This module only defines the seam: what gets
//! asked, and what comes back.

use crate::layout::{HAlign, LineRecord};
use crate::texture::Texture;
use lumen_core::{Color, Rect};
use std::sync::Arc;

/// Native size reported for system fonts unless the rasterizer knows better
pub const DEFAULT_SYSTEM_FONT_SIZE: f32 = 14.0;

/// Everything the external rasterizer needs for one string
#[derive(Debug, Clone, PartialEq)]
pub struct SystemTextRequest<'a> {
    pub text: &'a str,
    pub font_name: &'a str,
    pub font_size: f32,
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub color: Color,
    /// `None` disables wrapping
    pub wrap_width: Option<f32>,
    pub h_align: HAlign,
}

/// Style half of a request, fixed for a text field between property writes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SystemFontStyle<'a> {
    pub font_name: &'a str,
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub color: Color,
}

impl<'a> SystemFontStyle<'a> {
    /// Combine with the per-pass inputs into a full request
    pub fn request(
        &self,
        text: &'a str,
        font_size: f32,
        wrap_width: Option<f32>,
        h_align: HAlign,
    ) -> SystemTextRequest<'a> {
        SystemTextRequest {
            text,
            font_name: self.font_name,
            font_size,
            bold: self.bold,
            italic: self.italic,
            underline: self.underline,
            color: self.color,
            wrap_width,
            h_align,
        }
    }
}

/// Measured extent of shaped text
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SystemTextMetrics {
    pub width: f32,
    pub height: f32,
    /// Line ranges as broken by the rasterizer
    ///
    /// May be empty if the rasterizer doesn't report them.
    pub lines: Vec<LineRecord>,
}

/// Rasterized text, opaque to this crate apart from its bounds
#[derive(Debug, Clone)]
pub struct RasterizedText {
    pub texture: Arc<dyn Texture>,
    /// Bounds of the rendered text relative to its own origin
    pub bounds: Rect,
}

/// External text rasterizer used for non-bitmap fonts
///
/// Implementations own shaping, kerning and glyph rendering entirely.
pub trait SystemTextRasterizer: Send + Sync {
    /// Report the size the text would occupy
    fn measure(&self, request: &SystemTextRequest<'_>) -> SystemTextMetrics;

    /// Render the text
    fn rasterize(&self, request: &SystemTextRequest<'_>) -> RasterizedText;

    /// Size a font is laid out at when the field asks for its native size
    fn native_font_size(&self, _font_name: &str) -> f32 {
        DEFAULT_SYSTEM_FONT_SIZE
    }
}
