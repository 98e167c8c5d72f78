//! Fonts and collaborators shared by the unit tests

use crate::font::{FontDescriptor, Glyph};
use crate::layout::LineRecord;
use crate::system::{RasterizedText, SystemTextMetrics, SystemTextRasterizer, SystemTextRequest};
use crate::texture::{AtlasTexture, Texture};
use lumen_core::Rect;
use std::sync::{Arc, Mutex};

/// Fixed-advance font: ASCII letters, digits and punctuation advance 10,
/// space advances 6, line height 20 at native size 20
pub fn fixed_font(name: &str) -> FontDescriptor {
    let mut font = FontDescriptor::new(name, 20.0, 20.0).with_baseline(16.0);
    for (i, c) in ('!'..='~').enumerate() {
        let x = (i % 16) as f32 * 10.0;
        let y = (i / 16) as f32 * 20.0;
        let glyph = Glyph::new(c, Rect::new(x, y, 8.0, 16.0), 10.0).with_offset(1.0, 2.0);
        font = font.with_glyph(glyph);
    }
    font.with_glyph(Glyph::new(' ', Rect::new(0.0, 0.0, 0.0, 0.0), 6.0))
        .with_texture(Arc::new(AtlasTexture::blank(160, 120)))
}

/// Rasterizer reporting 8 units per character and 18 units per line,
/// wrapping by whole characters; records every request it sees
#[derive(Default)]
pub struct FakeRasterizer {
    pub requests: Mutex<Vec<(String, f32, Option<f32>, bool)>>,
}

impl FakeRasterizer {
    pub const CHAR_WIDTH: f32 = 8.0;
    pub const LINE_HEIGHT: f32 = 18.0;
}

impl SystemTextRasterizer for FakeRasterizer {
    fn measure(&self, request: &SystemTextRequest<'_>) -> SystemTextMetrics {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push((
                request.text.to_string(),
                request.font_size,
                request.wrap_width,
                request.bold,
            ));
        }
        let scale = request.font_size / 16.0;
        let char_width = Self::CHAR_WIDTH * scale;
        let count = request.text.chars().count();
        let per_line = match request.wrap_width {
            Some(w) => ((w / char_width).floor() as usize).max(1),
            None => count.max(1),
        };
        let line_count = count.div_ceil(per_line);
        let lines = (0..line_count)
            .map(|i| {
                let start = i * per_line;
                let end = (start + per_line).min(count);
                LineRecord {
                    start,
                    end,
                    x: 0.0,
                    y: i as f32 * Self::LINE_HEIGHT * scale,
                    width: (end - start) as f32 * char_width,
                }
            })
            .collect();
        SystemTextMetrics {
            width: count.min(per_line) as f32 * char_width,
            height: line_count as f32 * Self::LINE_HEIGHT * scale,
            lines,
        }
    }

    fn rasterize(&self, request: &SystemTextRequest<'_>) -> RasterizedText {
        let metrics = self.measure(request);
        let (width, height) = (metrics.width.ceil() as u32, metrics.height.ceil() as u32);
        let texture: Arc<dyn Texture> = Arc::new(AtlasTexture::blank(width, height));
        RasterizedText {
            texture,
            bounds: Rect::new(0.0, 0.0, metrics.width, metrics.height),
        }
    }
}

pub fn assert_close(actual: f32, expected: f32) {
    assert!(
        (actual - expected).abs() < 1e-3,
        "expected {expected}, got {actual}"
    );
}

