//! Text field
//!
//! A [`TextField`] owns display properties for one piece of text. Property
//! writes only invalidate the cached layout; the next [`TextField::measure`]
//! or [`TextField::render`] resolves the font, runs the layout engine once,
//! and caches the result until the next change.
//!
//! The font name decides the path for each pass: a name the registry
//! resolves uses that bitmap font, anything else goes to the system-font
//! rasterizer (when one is attached).

use crate::config::TextConfig;
use crate::font::FontDescriptor;
use crate::layout::{
    AutoSize, HAlign, LayoutOptions, MetricsSource, TextLayout, TextLayoutEngine, VAlign,
    NATIVE_FONT_SIZE,
};
use crate::registry::FontRegistry;
use crate::renderer::{
    BorderOutline, GlyphQuad, GlyphRun, MaterialId, RenderOutput, SystemTextDraw, TextGeometry,
};
use crate::system::{RasterizedText, SystemFontStyle, SystemTextRasterizer};
use crate::{Result, TextError};
use lumen_core::{Affine2D, Color, Rect, Size};
use std::fmt;
use std::sync::Arc;

/// Font path chosen by the most recent layout pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontPath {
    Bitmap,
    System,
    /// No bitmap font and no rasterizer: nothing is laid out
    Unresolved,
}

enum ResolvedFont {
    Bitmap(Arc<FontDescriptor>),
    System(Arc<dyn SystemTextRasterizer>),
    Unresolved,
}

impl ResolvedFont {
    fn path(&self) -> FontPath {
        match self {
            ResolvedFont::Bitmap(_) => FontPath::Bitmap,
            ResolvedFont::System(_) => FontPath::System,
            ResolvedFont::Unresolved => FontPath::Unresolved,
        }
    }
}

struct CachedLayout {
    font: ResolvedFont,
    layout: TextLayout,
    /// System-path raster, produced on first render
    raster: Option<RasterizedText>,
}

/// Replace `slot` with `value`, reporting whether it changed
fn replace<T: PartialEq>(slot: &mut T, value: T) -> bool {
    if *slot == value {
        return false;
    }
    *slot = value;
    true
}

fn check_size(property: &'static str, value: f32) -> Result<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(TextError::InvalidProperty { property, value })
    }
}

/// A displayable, lazily laid-out text string
pub struct TextField {
    registry: Arc<FontRegistry>,
    rasterizer: Option<Arc<dyn SystemTextRasterizer>>,
    engine: TextLayoutEngine,

    text: String,
    font_name: String,
    font_size: f32,
    color: Color,
    h_align: HAlign,
    v_align: VAlign,
    border: bool,
    bold: bool,
    italic: bool,
    underline: bool,
    kerning: bool,
    auto_scale: bool,
    auto_size: AutoSize,
    batchable: bool,
    leading: f32,
    width: f32,
    height: f32,
    material: Option<MaterialId>,

    min_font_size: f32,
    auto_scale_iterations: u32,
    auto_scale_precision: f32,

    /// `None` while dirty
    cache: Option<CachedLayout>,
    generation: u64,
    last_bounds: Option<(Rect, Size)>,
    bounds_observer: Option<Box<dyn FnMut(Rect)>>,
}

impl TextField {
    /// Size of a field created without explicit dimensions
    pub const DEFAULT_SIZE: f32 = 128.0;

    /// Create a text field with default configuration
    pub fn new(
        registry: Arc<FontRegistry>,
        width: f32,
        height: f32,
        text: impl Into<String>,
    ) -> Self {
        Self::with_config(registry, &TextConfig::default(), width, height, text)
    }

    /// Create a 128×128 text field with default configuration
    pub fn from_text(registry: Arc<FontRegistry>, text: impl Into<String>) -> Self {
        Self::new(registry, Self::DEFAULT_SIZE, Self::DEFAULT_SIZE, text)
    }

    /// Create a text field taking its defaults from `config`
    ///
    /// Negative or non-finite sizes are clamped to zero.
    pub fn with_config(
        registry: Arc<FontRegistry>,
        config: &TextConfig,
        width: f32,
        height: f32,
        text: impl Into<String>,
    ) -> Self {
        let sanitize = |v: f32| if v.is_finite() { v.max(0.0) } else { 0.0 };
        Self {
            registry,
            rasterizer: None,
            engine: TextLayoutEngine::new(),
            text: text.into(),
            font_name: config.default_font_name.clone(),
            font_size: config.default_font_size,
            color: Color::from_rgb_hex(config.default_color),
            h_align: HAlign::Center,
            v_align: VAlign::Center,
            border: false,
            bold: false,
            italic: false,
            underline: false,
            kerning: true,
            auto_scale: false,
            auto_size: AutoSize::None,
            batchable: false,
            leading: 0.0,
            width: sanitize(width),
            height: sanitize(height),
            material: None,
            min_font_size: config.min_font_size,
            auto_scale_iterations: config.auto_scale_iterations,
            auto_scale_precision: config.auto_scale_precision,
            cache: None,
            generation: 0,
            last_bounds: None,
            bounds_observer: None,
        }
    }

    /// Attach the rasterizer used when the font name is not a bitmap font
    pub fn with_rasterizer(mut self, rasterizer: Arc<dyn SystemTextRasterizer>) -> Self {
        self.rasterizer = Some(rasterizer);
        self.cache = None;
        self
    }

    /// Called with the new text bounds whenever a recompute changes them
    pub fn set_bounds_observer(&mut self, observer: Box<dyn FnMut(Rect)>) {
        self.bounds_observer = Some(observer);
    }

    /// Drop the cached layout so the next read recomputes it
    ///
    /// Registry changes are not tracked; call this to pick them up.
    pub fn invalidate(&mut self) {
        self.cache = None;
    }

    pub fn is_dirty(&self) -> bool {
        self.cache.is_none()
    }

    /// Number of layout passes run so far
    pub fn layout_generation(&self) -> u64 {
        self.generation
    }

    fn changed(&mut self, changed: bool) -> bool {
        if changed {
            self.cache = None;
        }
        changed
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn set_text(&mut self, text: impl Into<String>) -> bool {
        let changed = replace(&mut self.text, text.into());
        self.changed(changed)
    }

    pub fn font_name(&self) -> &str {
        &self.font_name
    }

    pub fn set_font_name(&mut self, name: impl Into<String>) -> bool {
        let changed = replace(&mut self.font_name, name.into());
        self.changed(changed)
    }

    pub fn font_size(&self) -> f32 {
        self.font_size
    }

    /// Requested font size; must be positive or [`NATIVE_FONT_SIZE`]
    pub fn set_font_size(&mut self, size: f32) -> Result<()> {
        let valid = size == NATIVE_FONT_SIZE || (size.is_finite() && size > 0.0);
        if !valid {
            return Err(TextError::InvalidProperty {
                property: "font_size",
                value: size,
            });
        }
        let changed = replace(&mut self.font_size, size);
        self.changed(changed);
        Ok(())
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn set_color(&mut self, color: Color) -> bool {
        let changed = replace(&mut self.color, color);
        self.changed(changed)
    }

    pub fn h_align(&self) -> HAlign {
        self.h_align
    }

    pub fn set_h_align(&mut self, align: HAlign) -> bool {
        let changed = replace(&mut self.h_align, align);
        self.changed(changed)
    }

    pub fn v_align(&self) -> VAlign {
        self.v_align
    }

    pub fn set_v_align(&mut self, align: VAlign) -> bool {
        let changed = replace(&mut self.v_align, align);
        self.changed(changed)
    }

    pub fn border(&self) -> bool {
        self.border
    }

    /// Draw an outline over the requested area; layout is unaffected
    pub fn set_border(&mut self, border: bool) -> bool {
        replace(&mut self.border, border)
    }

    pub fn bold(&self) -> bool {
        self.bold
    }

    /// Only used on the system-font path
    pub fn set_bold(&mut self, bold: bool) -> bool {
        let changed = replace(&mut self.bold, bold);
        self.changed(changed)
    }

    pub fn italic(&self) -> bool {
        self.italic
    }

    /// Only used on the system-font path
    pub fn set_italic(&mut self, italic: bool) -> bool {
        let changed = replace(&mut self.italic, italic);
        self.changed(changed)
    }

    pub fn underline(&self) -> bool {
        self.underline
    }

    /// Only used on the system-font path
    pub fn set_underline(&mut self, underline: bool) -> bool {
        let changed = replace(&mut self.underline, underline);
        self.changed(changed)
    }

    pub fn kerning(&self) -> bool {
        self.kerning
    }

    pub fn set_kerning(&mut self, kerning: bool) -> bool {
        let changed = replace(&mut self.kerning, kerning);
        self.changed(changed)
    }

    pub fn auto_scale(&self) -> bool {
        self.auto_scale
    }

    /// Shrink the font to fit; ignored unless auto-size is `None`
    pub fn set_auto_scale(&mut self, auto_scale: bool) -> bool {
        let changed = replace(&mut self.auto_scale, auto_scale);
        self.changed(changed)
    }

    pub fn auto_size(&self) -> AutoSize {
        self.auto_size
    }

    pub fn set_auto_size(&mut self, auto_size: AutoSize) -> bool {
        let changed = replace(&mut self.auto_size, auto_size);
        self.changed(changed)
    }

    pub fn batchable(&self) -> bool {
        self.batchable
    }

    /// Allow merging this field's glyphs with compatible siblings
    pub fn set_batchable(&mut self, batchable: bool) -> bool {
        replace(&mut self.batchable, batchable)
    }

    pub fn material(&self) -> Option<MaterialId> {
        self.material
    }

    /// Shader override; fields with different materials never batch together
    pub fn set_material(&mut self, material: Option<MaterialId>) -> bool {
        replace(&mut self.material, material)
    }

    pub fn leading(&self) -> f32 {
        self.leading
    }

    /// Extra space between lines; may be negative
    pub fn set_leading(&mut self, leading: f32) -> Result<()> {
        if !leading.is_finite() {
            return Err(TextError::InvalidProperty {
                property: "leading",
                value: leading,
            });
        }
        let changed = replace(&mut self.leading, leading);
        self.changed(changed);
        Ok(())
    }

    /// Size the field was given, before any auto-sizing
    pub fn requested_size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    pub fn set_width(&mut self, width: f32) -> Result<()> {
        check_size("width", width)?;
        let changed = replace(&mut self.width, width);
        self.changed(changed);
        Ok(())
    }

    pub fn set_height(&mut self, height: f32) -> Result<()> {
        check_size("height", height)?;
        let changed = replace(&mut self.height, height);
        self.changed(changed);
        Ok(())
    }

    /// Effective width (grows with the text when auto-sized horizontally)
    pub fn width(&mut self) -> f32 {
        self.measure().field_size.width
    }

    /// Effective height (grows with the text when auto-sized vertically)
    pub fn height(&mut self) -> f32 {
        self.measure().field_size.height
    }

    /// Bounds of the laid-out text in field coordinates
    pub fn text_bounds(&mut self) -> Rect {
        self.measure().bounds
    }

    /// Font size actually used, after auto-scale
    pub fn effective_font_size(&mut self) -> f32 {
        self.measure().font_size
    }

    pub fn font_path(&mut self) -> FontPath {
        let cached = self.take_layout();
        let path = cached.font.path();
        self.cache = Some(cached);
        path
    }

    /// Current layout, recomputed first if any property changed
    pub fn measure(&mut self) -> &TextLayout {
        let cached = self.take_layout();
        &self.cache.insert(cached).layout
    }

    /// Produce this frame's geometry under the accumulated `transform`
    pub fn render(&mut self, transform: &Affine2D) -> RenderOutput {
        let mut cached = self.take_layout();
        let geometry = self.geometry(&mut cached, transform);
        self.cache = Some(cached);

        let border = self
            .border
            .then(|| BorderOutline::new(self.width, self.height, transform, self.color));

        RenderOutput { geometry, border }
    }

    fn geometry(&self, cached: &mut CachedLayout, transform: &Affine2D) -> TextGeometry {
        match &cached.font {
            ResolvedFont::Bitmap(font) => {
                let Some(texture) = font.texture() else {
                    return TextGeometry::Empty;
                };
                let quads = cached
                    .layout
                    .glyphs
                    .iter()
                    .filter_map(|placed| {
                        GlyphQuad::from_placed(placed, texture.as_ref(), transform, self.color)
                    })
                    .collect();
                TextGeometry::Glyphs(GlyphRun {
                    font_name: self.font_name.clone(),
                    texture: Arc::clone(texture),
                    batchable: self.batchable,
                    material: self.material,
                    quads,
                })
            }
            ResolvedFont::System(rasterizer) => {
                if self.text.is_empty() {
                    return TextGeometry::Empty;
                }
                let options = self.layout_options();
                let (h_align, _) = options.effective_alignment();
                let raster = cached.raster.get_or_insert_with(|| {
                    let request = self.system_style().request(
                        &self.text,
                        cached.layout.font_size,
                        options.wrap_width(),
                        h_align,
                    );
                    rasterizer.rasterize(&request)
                });
                let origin = cached.layout.bounds.origin;
                let area = raster.bounds.offset(origin.x, origin.y);
                TextGeometry::System(SystemTextDraw {
                    texture: Arc::clone(&raster.texture),
                    corners: transform.transform_rect(&area),
                    color: self.color,
                })
            }
            ResolvedFont::Unresolved => TextGeometry::Empty,
        }
    }

    fn layout_options(&self) -> LayoutOptions {
        LayoutOptions {
            width: self.width,
            height: self.height,
            font_size: self.font_size,
            auto_size: self.auto_size,
            auto_scale: self.auto_scale,
            h_align: self.h_align,
            v_align: self.v_align,
            kerning: self.kerning,
            leading: self.leading,
            min_font_size: self.min_font_size,
            auto_scale_iterations: self.auto_scale_iterations,
            auto_scale_precision: self.auto_scale_precision,
        }
    }

    fn system_style(&self) -> SystemFontStyle<'_> {
        SystemFontStyle {
            font_name: &self.font_name,
            bold: self.bold,
            italic: self.italic,
            underline: self.underline,
            color: self.color,
        }
    }

    /// Take the cached layout out, computing it when dirty
    fn take_layout(&mut self) -> CachedLayout {
        match self.cache.take() {
            Some(cached) => cached,
            None => self.compute_layout(),
        }
    }

    fn compute_layout(&mut self) -> CachedLayout {
        let options = self.layout_options();

        let (font, layout) = match self.registry.lookup(&self.font_name) {
            Some(font) => {
                let layout = self
                    .engine
                    .layout(&self.text, MetricsSource::Bitmap(&font), &options);
                (ResolvedFont::Bitmap(font), layout)
            }
            None => match &self.rasterizer {
                Some(rasterizer) => {
                    let source = MetricsSource::System(rasterizer.as_ref(), self.system_style());
                    let layout = self.engine.layout(&self.text, source, &options);
                    (ResolvedFont::System(Arc::clone(rasterizer)), layout)
                }
                None => {
                    tracing::warn!(
                        "Font '{}' is not a bitmap font and no system rasterizer is attached",
                        self.font_name
                    );
                    (
                        ResolvedFont::Unresolved,
                        TextLayout::empty(&options, self.font_size),
                    )
                }
            },
        };

        self.generation += 1;
        tracing::trace!(
            "Text layout #{} for '{}': {:?} path, size {}, {} lines",
            self.generation,
            self.font_name,
            font.path(),
            layout.font_size,
            layout.line_count()
        );

        let bounds = (layout.bounds, layout.field_size);
        if self.last_bounds != Some(bounds) {
            self.last_bounds = Some(bounds);
            if let Some(observer) = self.bounds_observer.as_mut() {
                observer(layout.bounds);
            }
        }

        CachedLayout {
            font,
            layout,
            raster: None,
        }
    }
}

impl fmt::Debug for TextField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TextField")
            .field("text", &self.text)
            .field("font_name", &self.font_name)
            .field("font_size", &self.font_size)
            .field("color", &format_args!("#{:06x}", self.color.to_rgb_hex()))
            .field("requested_size", &self.requested_size())
            .field("auto_size", &self.auto_size)
            .field("dirty", &self.is_dirty())
            .finish()
    }
}
