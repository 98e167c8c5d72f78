//! Texture handles for glyph atlases
//!
//! The text subsystem never uploads or samples textures itself. It only needs
//! an opaque handle that knows its pixel dimensions, so glyph regions can be
//! turned into UV coordinates, and an identity, so draw batching can tell two
//! atlases apart.

use image::RgbaImage;
use lumen_core::Rect;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_TEXTURE_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique texture identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(u64);

impl TextureId {
    /// Allocate a fresh id
    pub fn next() -> Self {
        Self(NEXT_TEXTURE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Opaque texture resource
///
/// Ownership of the underlying pixels stays with the implementor. Fonts only
/// hold an `Arc<dyn Texture>` reference.
pub trait Texture: Send + Sync + fmt::Debug {
    fn id(&self) -> TextureId;

    /// Width in pixels
    fn width(&self) -> u32;

    /// Height in pixels
    fn height(&self) -> u32;

    /// UV coordinates (u_min, v_min, u_max, v_max) of a pixel region
    fn uv_rect(&self, region: &Rect) -> [f32; 4] {
        let w = self.width().max(1) as f32;
        let h = self.height().max(1) as f32;
        [
            region.x() / w,
            region.y() / h,
            region.max_x() / w,
            region.max_y() / h,
        ]
    }
}

/// CPU-side RGBA atlas image
///
/// Produced by file registration and by the built-in debug font. The GPU
/// layer uploads `image()` once per id.
pub struct AtlasTexture {
    id: TextureId,
    image: RgbaImage,
}

impl AtlasTexture {
    pub fn new(image: RgbaImage) -> Self {
        Self {
            id: TextureId::next(),
            image,
        }
    }

    /// Fully transparent atlas of the given size
    pub fn blank(width: u32, height: u32) -> Self {
        Self::new(RgbaImage::new(width, height))
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }
}

impl fmt::Debug for AtlasTexture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AtlasTexture")
            .field("id", &self.id)
            .field("width", &self.image.width())
            .field("height", &self.image.height())
            .finish()
    }
}

impl Texture for AtlasTexture {
    fn id(&self) -> TextureId {
        self.id
    }

    fn width(&self) -> u32 {
        self.image.width()
    }

    fn height(&self) -> u32 {
        self.image.height()
    }
}
