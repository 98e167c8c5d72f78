//! Bitmap font descriptors
//!
//! A [`FontDescriptor`] is the immutable metrics table of one bitmap font:
//! per-character atlas regions and advances, kerning pairs, the common line
//! height and baseline, and a shared reference to the atlas texture.
//!
//! Descriptors are either built in code or parsed from the BMFont XML format
//! written by AngelCode's Bitmap Font Generator, Glyph Designer and bmGlyph.

use crate::texture::{AtlasTexture, Texture};
use crate::{Result, TextError};
use lumen_core::Rect;
use roxmltree::{Document, Node};
use rustc_hash::FxHashMap;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

/// Advance of a character that has no glyph, as a fraction of the font size.
///
/// Missing characters are not drawn; the pen moves by this much instead.
pub const MISSING_GLYPH_ADVANCE_EM: f32 = 0.5;

/// Metrics of a single character in native font units
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Glyph {
    /// Character this glyph renders
    pub id: char,
    /// Source rectangle within the atlas, in pixels
    pub region: Rect,
    /// Horizontal pen advance after drawing
    pub x_advance: f32,
    /// Horizontal offset from the pen position to the region's left edge
    pub x_offset: f32,
    /// Vertical offset from the line top to the region's top edge
    pub y_offset: f32,
}

impl Glyph {
    pub fn new(id: char, region: Rect, x_advance: f32) -> Self {
        Self {
            id,
            region,
            x_advance,
            x_offset: 0.0,
            y_offset: 0.0,
        }
    }

    pub fn with_offset(mut self, x_offset: f32, y_offset: f32) -> Self {
        self.x_offset = x_offset;
        self.y_offset = y_offset;
        self
    }

    /// Whether the glyph has any pixels to draw (spaces usually don't)
    pub fn is_visible(&self) -> bool {
        !self.region.is_empty()
    }
}

/// Immutable metrics table of one bitmap font
#[derive(Debug, Clone)]
pub struct FontDescriptor {
    name: String,
    size: f32,
    line_height: f32,
    baseline: f32,
    glyphs: FxHashMap<char, Glyph>,
    kerning: FxHashMap<(char, char), f32>,
    texture: Option<Arc<dyn Texture>>,
}

impl FontDescriptor {
    /// Create an empty descriptor
    ///
    /// # Arguments
    /// * `name` - Intrinsic font name, used as the default registry key
    /// * `size` - Native em size the glyphs were rendered at
    /// * `line_height` - Distance between consecutive line tops at native size
    pub fn new(name: impl Into<String>, size: f32, line_height: f32) -> Self {
        Self {
            name: name.into(),
            size,
            line_height,
            baseline: line_height,
            glyphs: FxHashMap::default(),
            kerning: FxHashMap::default(),
            texture: None,
        }
    }

    pub fn with_baseline(mut self, baseline: f32) -> Self {
        self.baseline = baseline;
        self
    }

    /// Add or replace the glyph for `glyph.id`
    pub fn with_glyph(mut self, glyph: Glyph) -> Self {
        self.glyphs.insert(glyph.id, glyph);
        self
    }

    /// Set the advance adjustment applied between `first` and a following `second`
    pub fn with_kerning(mut self, first: char, second: char, amount: f32) -> Self {
        self.kerning.insert((first, second), amount);
        self
    }

    pub fn with_texture(mut self, texture: Arc<dyn Texture>) -> Self {
        self.texture = Some(texture);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size(&self) -> f32 {
        self.size
    }

    pub fn line_height(&self) -> f32 {
        self.line_height
    }

    pub fn baseline(&self) -> f32 {
        self.baseline
    }

    pub fn glyph(&self, c: char) -> Option<&Glyph> {
        self.glyphs.get(&c)
    }

    pub fn glyph_count(&self) -> usize {
        self.glyphs.len()
    }

    pub fn glyphs(&self) -> &FxHashMap<char, Glyph> {
        &self.glyphs
    }

    /// Kerning adjustment between two adjacent characters (0 when unset)
    pub fn kerning(&self, first: char, second: char) -> f32 {
        self.kerning.get(&(first, second)).copied().unwrap_or(0.0)
    }

    pub fn kerning_pairs(&self) -> &FxHashMap<(char, char), f32> {
        &self.kerning
    }

    pub fn texture(&self) -> Option<&Arc<dyn Texture>> {
        self.texture.as_ref()
    }

    pub fn has_texture(&self) -> bool {
        self.texture.is_some()
    }

    /// Pen advance used for characters without a glyph, in native units
    pub fn missing_glyph_advance(&self) -> f32 {
        self.size * MISSING_GLYPH_ADVANCE_EM
    }

    /// Check the descriptor can back a registry entry
    pub fn validate(&self) -> Result<()> {
        if self.texture.is_none() {
            return Err(TextError::InvalidFontDescriptor(format!(
                "font '{}' has no atlas texture",
                self.name
            )));
        }
        if self.glyphs.is_empty() {
            return Err(TextError::InvalidFontDescriptor(format!(
                "font '{}' has no glyphs",
                self.name
            )));
        }
        Ok(())
    }

    /// Parse a BMFont XML descriptor bound to an already loaded atlas
    pub fn parse_xml(xml: &str, texture: Arc<dyn Texture>) -> Result<Self> {
        let (font, _pages) = parse_document(xml)?;
        Ok(font.with_texture(texture))
    }

    /// Load a BMFont XML descriptor from disk
    ///
    /// Blocks for the file read and, when `texture` is `None`, for decoding the
    /// atlas image named by page 0 (resolved relative to the descriptor).
    pub fn from_file(path: &Path, texture: Option<Arc<dyn Texture>>) -> Result<Self> {
        let xml = read_to_string(path)?;
        let (font, pages) = parse_document(&xml)?;

        let texture = match texture {
            Some(texture) => texture,
            None => {
                let file = pages
                    .iter()
                    .find(|(id, _)| *id == 0)
                    .or_else(|| pages.first())
                    .map(|(_, file)| file.as_str())
                    .ok_or_else(|| {
                        TextError::FontParse(format!(
                            "{} declares no atlas page and no texture was given",
                            path.display()
                        ))
                    })?;
                let image_path = path.parent().unwrap_or(Path::new("")).join(file);
                load_atlas(&image_path)?
            }
        };

        Ok(font.with_texture(texture))
    }
}

fn read_to_string(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            TextError::FontFileNotFound(path.to_path_buf())
        } else {
            TextError::Io {
                path: path.to_path_buf(),
                source: e,
            }
        }
    })
}

fn load_atlas(path: &Path) -> Result<Arc<dyn Texture>> {
    if !path.exists() {
        tracing::warn!("Atlas page {} not found", path.display());
        return Err(TextError::FontFileNotFound(path.to_path_buf()));
    }
    let image = image::open(path)?.to_rgba8();
    tracing::debug!(
        "Decoded atlas {} ({}x{})",
        path.display(),
        image.width(),
        image.height()
    );
    Ok(Arc::new(AtlasTexture::new(image)))
}

/// Parse the XML into a texture-less descriptor plus its `(page id, file)` list
fn parse_document(xml: &str) -> Result<(FontDescriptor, Vec<(u32, String)>)> {
    let doc = Document::parse(xml).map_err(|e| TextError::FontParse(e.to_string()))?;
    let root = doc.root_element();
    if !root.has_tag_name("font") {
        return Err(TextError::FontParse(format!(
            "expected <font> root element, found <{}>",
            root.tag_name().name()
        )));
    }

    let info = child(root, "info")?;
    let common = child(root, "common")?;

    let name: String = attr(info, "face")?;
    // Some exporters write a negative size to mean "match character height"
    let size: f32 = attr::<f32>(info, "size")?.abs();
    if !(size.is_finite() && size > 0.0) {
        return Err(TextError::FontParse(format!(
            "font '{}' has unusable size {}",
            name, size
        )));
    }
    let line_height: f32 = attr(common, "lineHeight")?;
    let baseline: f32 = attr_or(common, "base", line_height)?;

    let mut font = FontDescriptor::new(name, size, line_height).with_baseline(baseline);

    let mut pages = Vec::new();
    for page in elements(root, "pages", "page") {
        pages.push((attr_or(page, "id", 0u32)?, attr::<String>(page, "file")?));
    }

    for node in elements(root, "chars", "char") {
        let id: i64 = attr(node, "id")?;
        let Some(id) = u32::try_from(id).ok().and_then(char::from_u32) else {
            tracing::warn!("Skipping glyph with invalid character id {}", id);
            continue;
        };
        let region = Rect::new(
            attr(node, "x")?,
            attr(node, "y")?,
            attr(node, "width")?,
            attr(node, "height")?,
        );
        let glyph = Glyph::new(id, region, attr(node, "xadvance")?)
            .with_offset(attr_or(node, "xoffset", 0.0)?, attr_or(node, "yoffset", 0.0)?);
        font.glyphs.insert(id, glyph);
    }

    for node in elements(root, "kernings", "kerning") {
        let first = char_attr(node, "first")?;
        let second = char_attr(node, "second")?;
        let amount: f32 = attr(node, "amount")?;
        match (first, second) {
            (Some(first), Some(second))
                if font.glyphs.contains_key(&first) && font.glyphs.contains_key(&second) =>
            {
                font.kerning.insert((first, second), amount);
            }
            _ => {
                tracing::warn!(
                    "Kerning pair {:?}/{:?} in '{}' references an unknown glyph",
                    first,
                    second,
                    font.name
                );
            }
        }
    }

    tracing::debug!(
        "Parsed bitmap font '{}': {} chars, {} kerning pairs",
        font.name,
        font.glyphs.len(),
        font.kerning.len()
    );

    Ok((font, pages))
}

fn child<'a, 'input>(parent: Node<'a, 'input>, tag: &str) -> Result<Node<'a, 'input>> {
    parent
        .children()
        .find(|n| n.has_tag_name(tag))
        .ok_or_else(|| TextError::FontParse(format!("missing <{}> element", tag)))
}

/// All `<item>` elements inside the (optional) `<group>` children of `root`
fn elements<'a, 'input: 'a>(
    root: Node<'a, 'input>,
    group: &'a str,
    item: &'a str,
) -> impl Iterator<Item = Node<'a, 'input>> + 'a {
    root.children()
        .filter(move |n| n.has_tag_name(group))
        .flat_map(move |g| g.children().filter(move |n| n.has_tag_name(item)))
}

fn attr<T: FromStr>(node: Node<'_, '_>, name: &str) -> Result<T> {
    let raw = node.attribute(name).ok_or_else(|| {
        TextError::FontParse(format!(
            "<{}> is missing attribute '{}'",
            node.tag_name().name(),
            name
        ))
    })?;
    parse_value(node, name, raw)
}

fn attr_or<T: FromStr>(node: Node<'_, '_>, name: &str, default: T) -> Result<T> {
    match node.attribute(name) {
        Some(raw) => parse_value(node, name, raw),
        None => Ok(default),
    }
}

fn char_attr(node: Node<'_, '_>, name: &str) -> Result<Option<char>> {
    let id: i64 = attr(node, name)?;
    Ok(u32::try_from(id).ok().and_then(char::from_u32))
}

fn parse_value<T: FromStr>(node: Node<'_, '_>, name: &str, raw: &str) -> Result<T> {
    raw.trim().parse().map_err(|_| {
        TextError::FontParse(format!(
            "<{}> attribute '{}' has invalid value '{}'",
            node.tag_name().name(),
            name,
            raw
        ))
    })
}
