//! Render output and draw-call batching
//!
//! A text field renders into a [`RenderOutput`]: glyph quads sampling a
//! bitmap-font atlas, an opaque system-text draw, or nothing. Glyph runs
//! from sibling fields can be merged into shared draw batches by a
//! [`QuadBatcher`].

use crate::layout::PlacedGlyph;
use crate::texture::{Texture, TextureId};
use lumen_core::{Affine2D, Color, Point, Rect};
use std::sync::Arc;

/// Shader or material override applied to a glyph run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MaterialId(pub u32);

/// One textured quad for a glyph
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlyphQuad {
    /// Transformed corners, clockwise from the top-left
    pub corners: [Point; 4],
    /// UV coordinates in the atlas (u_min, v_min, u_max, v_max)
    pub uv: [f32; 4],
    /// Per-instance tint
    pub color: Color,
}

impl GlyphQuad {
    pub(crate) fn from_placed(
        placed: &PlacedGlyph,
        texture: &dyn Texture,
        transform: &Affine2D,
        color: Color,
    ) -> Option<Self> {
        if !placed.glyph.is_visible() {
            return None;
        }
        Some(Self {
            corners: transform.transform_rect(&placed.bounds()),
            uv: texture.uv_rect(&placed.glyph.region),
            color,
        })
    }
}

/// Glyph quads sampling a single bitmap-font atlas
#[derive(Debug, Clone)]
pub struct GlyphRun {
    /// Registry name the font was resolved under
    pub font_name: String,
    pub texture: Arc<dyn Texture>,
    /// Whether the owning field allows merging with its siblings
    pub batchable: bool,
    pub material: Option<MaterialId>,
    pub quads: Vec<GlyphQuad>,
}

impl GlyphRun {
    /// Whether both runs can be submitted in one draw call
    pub fn can_batch_with(&self, other: &GlyphRun) -> bool {
        self.batch_key().joins(&other.batch_key())
    }

    fn batch_key(&self) -> BatchKey<'_> {
        BatchKey {
            font_name: &self.font_name,
            texture: self.texture.id(),
            batchable: self.batchable,
            material: self.material,
        }
    }
}

/// Draw state that must match for two runs to merge
#[derive(Debug, Clone, Copy)]
struct BatchKey<'a> {
    font_name: &'a str,
    texture: TextureId,
    batchable: bool,
    material: Option<MaterialId>,
}

impl BatchKey<'_> {
    fn joins(&self, other: &BatchKey<'_>) -> bool {
        self.batchable
            && other.batchable
            && self.font_name == other.font_name
            && self.texture == other.texture
            && self.material == other.material
    }
}

/// Text rasterized by the system-font collaborator
#[derive(Debug, Clone)]
pub struct SystemTextDraw {
    pub texture: Arc<dyn Texture>,
    /// Transformed corners of the rasterized bounds
    pub corners: [Point; 4],
    pub color: Color,
}

/// Geometry produced by one render call
#[derive(Debug, Clone, Default)]
pub enum TextGeometry {
    #[default]
    Empty,
    Glyphs(GlyphRun),
    System(SystemTextDraw),
}

impl TextGeometry {
    pub fn is_empty(&self) -> bool {
        match self {
            TextGeometry::Empty => true,
            TextGeometry::Glyphs(run) => run.quads.is_empty(),
            TextGeometry::System(_) => false,
        }
    }

    pub fn glyph_run(&self) -> Option<&GlyphRun> {
        match self {
            TextGeometry::Glyphs(run) => Some(run),
            _ => None,
        }
    }

    pub fn into_glyph_run(self) -> Option<GlyphRun> {
        match self {
            TextGeometry::Glyphs(run) => Some(run),
            _ => None,
        }
    }
}

/// Cosmetic outline drawn over the requested field area
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BorderOutline {
    /// Top, right, bottom and left edges
    pub edges: [[Point; 4]; 4],
    pub color: Color,
}

impl BorderOutline {
    /// Outline of `width * height` with 1-unit edges inside the area
    pub fn new(width: f32, height: f32, transform: &Affine2D, color: Color) -> Self {
        let top = Rect::new(0.0, 0.0, width, 1.0);
        let right = Rect::new(width - 1.0, 0.0, 1.0, height);
        let bottom = Rect::new(0.0, height - 1.0, width, 1.0);
        let left = Rect::new(0.0, 0.0, 1.0, height);
        Self {
            edges: [top, right, bottom, left].map(|edge| transform.transform_rect(&edge)),
            color,
        }
    }
}

/// Everything a text field hands to the renderer for one frame
#[derive(Debug, Clone, Default)]
pub struct RenderOutput {
    pub geometry: TextGeometry,
    pub border: Option<BorderOutline>,
}

/// Quads sharing one draw submission
#[derive(Debug, Clone)]
pub struct DrawBatch {
    pub font_name: String,
    pub texture: Arc<dyn Texture>,
    pub batchable: bool,
    pub material: Option<MaterialId>,
    pub quads: Vec<GlyphQuad>,
    /// Number of glyph runs merged into this batch
    pub runs: usize,
}

impl DrawBatch {
    fn from_run(run: GlyphRun) -> Self {
        Self {
            font_name: run.font_name,
            texture: run.texture,
            batchable: run.batchable,
            material: run.material,
            quads: run.quads,
            runs: 1,
        }
    }

    fn accepts(&self, run: &GlyphRun) -> bool {
        let key = BatchKey {
            font_name: &self.font_name,
            texture: self.texture.id(),
            batchable: self.batchable,
            material: self.material,
        };
        key.joins(&run.batch_key())
    }
}

/// Merges consecutive compatible glyph runs
///
/// Submission order is preserved: a run only joins the batch directly
/// before it, so interleaved fonts never reorder draws.
#[derive(Debug, Default)]
pub struct QuadBatcher {
    batches: Vec<DrawBatch>,
}

impl QuadBatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a glyph run, merging it into the previous batch when allowed
    pub fn push(&mut self, run: GlyphRun) {
        if run.quads.is_empty() {
            return;
        }

        match self.batches.last_mut() {
            Some(batch) if batch.accepts(&run) => {
                batch.quads.extend(run.quads);
                batch.runs += 1;
            }
            _ => self.batches.push(DrawBatch::from_run(run)),
        }
    }

    /// Append the glyph geometry of a render output; other geometry is ignored
    pub fn push_output(&mut self, output: RenderOutput) {
        if let Some(run) = output.geometry.into_glyph_run() {
            self.push(run);
        }
    }

    pub fn batch_count(&self) -> usize {
        self.batches.len()
    }

    pub fn batches(&self) -> &[DrawBatch] {
        &self.batches
    }

    pub fn finish(self) -> Vec<DrawBatch> {
        tracing::trace!("Flushed {} text draw batches", self.batches.len());
        self.batches
    }
}
