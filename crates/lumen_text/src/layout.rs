//! Text layout engine
//!
//! Turns a string plus layout options into line records, placed glyphs and
//! a bounding rectangle. The engine is a pure function of its inputs: it
//! performs no I/O and keeps no state between calls.
//!
//! Two metrics sources are supported, selected once per pass:
//!
//! - [`MetricsSource::Bitmap`] - per-glyph advances and kerning from a
//!   [`FontDescriptor`]; the engine does its own greedy line breaking.
//! - [`MetricsSource::System`] - an external rasterizer shapes the whole
//!   string and reports only its aggregate extent.

use crate::font::{FontDescriptor, Glyph};
use crate::system::{SystemFontStyle, SystemTextRasterizer};
use lumen_core::{Rect, Size};
use std::ops::{BitOr, BitOrAssign};

/// Tolerance for width/height comparisons
const LAYOUT_EPSILON: f32 = 1e-3;

/// Font size sentinel meaning "the size the font was designed at"
pub const NATIVE_FONT_SIZE: f32 = -1.0;

/// Horizontal alignment of lines within the field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum HAlign {
    #[default]
    Left,
    Center,
    Right,
}

/// Vertical alignment of the line block within the field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum VAlign {
    #[default]
    Top,
    Center,
    Bottom,
}

/// Which field dimensions grow to fit the text
///
/// `Horizontal` lets the width grow (no wrapping), `Vertical` lets the height
/// grow. The two axes combine independently; `None` is the identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AutoSize {
    #[default]
    None,
    Horizontal,
    Vertical,
    Both,
}

impl AutoSize {
    fn from_axes(horizontal: bool, vertical: bool) -> Self {
        match (horizontal, vertical) {
            (false, false) => AutoSize::None,
            (true, false) => AutoSize::Horizontal,
            (false, true) => AutoSize::Vertical,
            (true, true) => AutoSize::Both,
        }
    }

    pub fn grows_horizontally(self) -> bool {
        matches!(self, AutoSize::Horizontal | AutoSize::Both)
    }

    pub fn grows_vertically(self) -> bool {
        matches!(self, AutoSize::Vertical | AutoSize::Both)
    }

    /// Whether every axis of `other` is also set in `self`
    pub fn contains(self, other: AutoSize) -> bool {
        (self | other) == self
    }
}

impl BitOr for AutoSize {
    type Output = AutoSize;

    fn bitor(self, rhs: AutoSize) -> AutoSize {
        AutoSize::from_axes(
            self.grows_horizontally() || rhs.grows_horizontally(),
            self.grows_vertically() || rhs.grows_vertically(),
        )
    }
}

impl BitOrAssign for AutoSize {
    fn bitor_assign(&mut self, rhs: AutoSize) {
        *self = *self | rhs;
    }
}

/// Options for one layout pass
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutOptions {
    /// Requested field width
    pub width: f32,
    /// Requested field height
    pub height: f32,
    /// Requested font size
    pub font_size: f32,
    pub auto_size: AutoSize,
    /// Shrink the font until the text fits (only with `AutoSize::None`)
    pub auto_scale: bool,
    pub h_align: HAlign,
    pub v_align: VAlign,
    /// Apply bitmap-font kerning pairs
    pub kerning: bool,
    /// Extra space between lines, in output units
    pub leading: f32,
    /// Auto-scale floor
    pub min_font_size: f32,
    /// Auto-scale search step ceiling
    pub auto_scale_iterations: u32,
    /// Auto-scale stops when the search window is narrower than this
    pub auto_scale_precision: f32,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            width: 128.0,
            height: 128.0,
            font_size: 14.0,
            auto_size: AutoSize::None,
            auto_scale: false,
            h_align: HAlign::Center,
            v_align: VAlign::Center,
            kerning: true,
            leading: 0.0,
            min_font_size: 4.0,
            auto_scale_iterations: 12,
            auto_scale_precision: 0.05,
        }
    }
}

impl LayoutOptions {
    /// Alignment after auto-size overrides (auto-sized axes align left/top)
    pub fn effective_alignment(&self) -> (HAlign, VAlign) {
        let h = if self.auto_size.grows_horizontally() {
            HAlign::Left
        } else {
            self.h_align
        };
        let v = if self.auto_size.grows_vertically() {
            VAlign::Top
        } else {
            self.v_align
        };
        (h, v)
    }

    /// Copy with [`NATIVE_FONT_SIZE`] replaced by `native`
    pub fn with_native_size(&self, native: f32) -> LayoutOptions {
        let mut options = self.clone();
        if options.font_size == NATIVE_FONT_SIZE {
            options.font_size = native;
        }
        options
    }

    /// Wrap width, or `None` when the width is auto-sized
    pub fn wrap_width(&self) -> Option<f32> {
        (!self.auto_size.grows_horizontally()).then_some(self.width)
    }
}

/// One laid-out line
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineRecord {
    /// Byte offset of the first character
    pub start: usize,
    /// Byte offset one past the last character kept on the line
    pub end: usize,
    /// Left edge after alignment
    pub x: f32,
    /// Top edge after alignment
    pub y: f32,
    /// Sum of advances (and kerning) on the line
    pub width: f32,
}

/// A glyph positioned in field coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacedGlyph {
    pub glyph: Glyph,
    /// Top-left of the glyph quad
    pub x: f32,
    pub y: f32,
    /// Native-to-output scale applied to the glyph region
    pub scale: f32,
}

impl PlacedGlyph {
    /// Destination rectangle of the glyph quad
    pub fn bounds(&self) -> Rect {
        Rect::new(
            self.x,
            self.y,
            self.glyph.region.width() * self.scale,
            self.glyph.region.height() * self.scale,
        )
    }
}

/// Result of laying out text
#[derive(Debug, Clone, PartialEq)]
pub struct TextLayout {
    pub lines: Vec<LineRecord>,
    /// Placed glyphs in reading order (bitmap fonts only)
    pub glyphs: Vec<PlacedGlyph>,
    /// Union of the aligned line boxes; `Rect::ZERO` without lines
    pub bounds: Rect,
    /// Field size after auto-sizing
    pub field_size: Size,
    /// Widest line and total block height
    pub content_size: Size,
    /// Font size the layout was produced at (after auto-scale)
    pub font_size: f32,
}

impl TextLayout {
    pub(crate) fn empty(options: &LayoutOptions, font_size: f32) -> Self {
        let width = if options.auto_size.grows_horizontally() {
            0.0
        } else {
            options.width
        };
        let height = if options.auto_size.grows_vertically() {
            0.0
        } else {
            options.height
        };
        Self {
            lines: Vec::new(),
            glyphs: Vec::new(),
            bounds: Rect::ZERO,
            field_size: Size::new(width, height),
            content_size: Size::ZERO,
            font_size,
        }
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Whether the content fits inside the requested field
    fn fits(&self, options: &LayoutOptions) -> bool {
        self.content_size.width <= options.width + LAYOUT_EPSILON
            && self.content_size.height <= options.height + LAYOUT_EPSILON
    }
}

/// Where glyph metrics come from for a pass
#[derive(Clone, Copy)]
pub enum MetricsSource<'a> {
    Bitmap(&'a FontDescriptor),
    System(&'a dyn SystemTextRasterizer, SystemFontStyle<'a>),
}

/// Text layout engine
#[derive(Debug, Clone, Copy, Default)]
pub struct TextLayoutEngine;

impl TextLayoutEngine {
    pub fn new() -> Self {
        Self
    }

    /// Layout text with the given options
    ///
    /// A font size of [`NATIVE_FONT_SIZE`] resolves to the font's own size.
    pub fn layout(
        &self,
        text: &str,
        source: MetricsSource<'_>,
        options: &LayoutOptions,
    ) -> TextLayout {
        match source {
            MetricsSource::Bitmap(font) => {
                let options = &options.with_native_size(font.size());
                self.fit(options, |size| self.layout_bitmap(text, font, size, options))
            }
            MetricsSource::System(rasterizer, style) => {
                let native = rasterizer.native_font_size(style.font_name);
                let options = &options.with_native_size(native);
                self.fit(options, |size| {
                    self.layout_system(text, rasterizer, &style, size, options)
                })
            }
        }
    }

    /// Run `pass` at the requested size, shrinking it when auto-scale applies
    ///
    /// Binary search between the floor and the requested size for the largest
    /// size whose content fits. The result either fits or is at the floor.
    fn fit<F>(&self, options: &LayoutOptions, mut pass: F) -> TextLayout
    where
        F: FnMut(f32) -> TextLayout,
    {
        let requested = options.font_size;
        let layout = pass(requested);

        if !options.auto_scale || options.auto_size != AutoSize::None || layout.fits(options) {
            return layout;
        }

        let floor = options.min_font_size.min(requested);
        if floor >= requested {
            return layout;
        }

        let floor_layout = pass(floor);
        if !floor_layout.fits(options) {
            tracing::trace!("auto-scale: text overflows even at floor size {}", floor);
            return floor_layout;
        }

        let (mut lo, mut hi) = (floor, requested);
        let mut best = floor_layout;
        for _ in 0..options.auto_scale_iterations {
            if hi - lo <= options.auto_scale_precision {
                break;
            }
            let mid = (lo + hi) / 2.0;
            let candidate = pass(mid);
            let fits = candidate.fits(options);
            tracing::trace!("auto-scale: size {} fits={}", mid, fits);
            if fits {
                lo = mid;
                best = candidate;
            } else {
                hi = mid;
            }
        }
        best
    }

    fn layout_bitmap(
        &self,
        text: &str,
        font: &FontDescriptor,
        font_size: f32,
        options: &LayoutOptions,
    ) -> TextLayout {
        if text.is_empty() {
            return TextLayout::empty(options, font_size);
        }

        let scale = if font.size() > 0.0 {
            font_size / font.size()
        } else {
            1.0
        };
        let line_pitch = font.line_height() * scale + options.leading;

        let mut breaker = LineBreaker::new(font, scale, options.kerning, options.wrap_width());
        for (offset, c) in text.char_indices() {
            breaker.push(c, offset);
        }
        let lines = breaker.finish(text.len());

        let content_width = lines.iter().map(|l| l.width).fold(0.0f32, f32::max);
        let content_height = lines.len() as f32 * line_pitch;
        let field_size = Size::new(
            if options.auto_size.grows_horizontally() {
                content_width
            } else {
                options.width
            },
            if options.auto_size.grows_vertically() {
                content_height
            } else {
                options.height
            },
        );

        let (h_align, v_align) = options.effective_alignment();
        let block_y = align_offset(v_align.into(), field_size.height, content_height);

        let mut records = Vec::with_capacity(lines.len());
        let mut glyphs = Vec::with_capacity(text.len());
        let mut bounds: Option<Rect> = None;

        for (index, line) in lines.iter().enumerate() {
            let x = align_offset(h_align.into(), field_size.width, line.width);
            let y = block_y + index as f32 * line_pitch;

            let line_box = Rect::new(x, y, line.width, line_pitch);
            bounds = Some(bounds.map_or(line_box, |b| b.union(&line_box)));

            records.push(LineRecord {
                start: line.start,
                end: line.end,
                x,
                y,
                width: line.width,
            });

            for pen in &line.pens {
                if let Some(glyph) = pen.glyph {
                    glyphs.push(PlacedGlyph {
                        glyph,
                        x: x + pen.x + glyph.x_offset * scale,
                        y: y + glyph.y_offset * scale,
                        scale,
                    });
                }
            }
        }

        TextLayout {
            lines: records,
            glyphs,
            bounds: bounds.unwrap_or(Rect::ZERO),
            field_size,
            content_size: Size::new(content_width, content_height),
            font_size,
        }
    }

    fn layout_system(
        &self,
        text: &str,
        rasterizer: &dyn SystemTextRasterizer,
        style: &SystemFontStyle<'_>,
        font_size: f32,
        options: &LayoutOptions,
    ) -> TextLayout {
        if text.is_empty() {
            return TextLayout::empty(options, font_size);
        }

        let (h_align, v_align) = options.effective_alignment();
        let request = style.request(text, font_size, options.wrap_width(), h_align);
        let metrics = rasterizer.measure(&request);

        let field_size = Size::new(
            if options.auto_size.grows_horizontally() {
                metrics.width
            } else {
                options.width
            },
            if options.auto_size.grows_vertically() {
                metrics.height
            } else {
                options.height
            },
        );
        let x = align_offset(h_align.into(), field_size.width, metrics.width);
        let y = align_offset(v_align.into(), field_size.height, metrics.height);

        let lines = metrics
            .lines
            .iter()
            .map(|line| LineRecord {
                x: x + line.x,
                y: y + line.y,
                ..*line
            })
            .collect();

        TextLayout {
            lines,
            glyphs: Vec::new(),
            bounds: Rect::new(x, y, metrics.width, metrics.height),
            field_size,
            content_size: Size::new(metrics.width, metrics.height),
            font_size,
        }
    }
}

/// Start/middle/end placement shared by both axes
#[derive(Clone, Copy)]
enum Placement {
    Start,
    Middle,
    End,
}

impl From<HAlign> for Placement {
    fn from(align: HAlign) -> Self {
        match align {
            HAlign::Left => Placement::Start,
            HAlign::Center => Placement::Middle,
            HAlign::Right => Placement::End,
        }
    }
}

impl From<VAlign> for Placement {
    fn from(align: VAlign) -> Self {
        match align {
            VAlign::Top => Placement::Start,
            VAlign::Center => Placement::Middle,
            VAlign::Bottom => Placement::End,
        }
    }
}

fn align_offset(placement: Placement, available: f32, used: f32) -> f32 {
    match placement {
        Placement::Start => 0.0,
        Placement::Middle => (available - used) / 2.0,
        Placement::End => available - used,
    }
}

/// A character on a line being built
#[derive(Debug, Clone, Copy)]
struct Pen {
    c: char,
    offset: usize,
    glyph: Option<Glyph>,
    /// Pen position before this character's kerning
    start_x: f32,
    /// Glyph origin (after kerning)
    x: f32,
}

#[derive(Debug)]
struct BrokenLine {
    start: usize,
    end: usize,
    pens: Vec<Pen>,
    /// Pen position after the last character
    width: f32,
    /// Index in `pens` of the most recent whitespace that follows content
    last_space: Option<usize>,
    /// Holds at least one non-whitespace character
    has_content: bool,
    /// Started by wrapping rather than by the text start or a newline
    wrapped: bool,
}

impl BrokenLine {
    fn new(start: usize, wrapped: bool) -> Self {
        Self {
            start,
            end: start,
            pens: Vec::new(),
            width: 0.0,
            last_space: None,
            has_content: false,
            wrapped,
        }
    }
}

/// Greedy line breaker for bitmap fonts
struct LineBreaker<'a> {
    font: &'a FontDescriptor,
    scale: f32,
    kerning: bool,
    wrap_width: Option<f32>,
    lines: Vec<BrokenLine>,
    current: BrokenLine,
}

impl<'a> LineBreaker<'a> {
    fn new(font: &'a FontDescriptor, scale: f32, kerning: bool, wrap_width: Option<f32>) -> Self {
        Self {
            font,
            scale,
            kerning,
            wrap_width,
            lines: Vec::new(),
            current: BrokenLine::new(0, false),
        }
    }

    fn advance(&self, c: char) -> (Option<Glyph>, f32) {
        match self.font.glyph(c) {
            Some(glyph) => (Some(*glyph), glyph.x_advance * self.scale),
            None => (None, self.font.missing_glyph_advance() * self.scale),
        }
    }

    fn kerning_before(&self, c: char) -> f32 {
        match self.current.pens.last() {
            Some(prev) if self.kerning => self.font.kerning(prev.c, c) * self.scale,
            _ => 0.0,
        }
    }

    /// Drop whitespace at the end of the current line
    fn trim_trailing_whitespace(&mut self) {
        while let Some(pen) = self.current.pens.last().copied() {
            if !pen.c.is_whitespace() {
                break;
            }
            self.current.pens.pop();
            self.current.width = pen.start_x;
            self.current.end = pen.offset;
        }
    }

    /// Close the current line and open a wrapped one at `next_start`
    fn wrap(&mut self, next_start: usize) {
        let line = std::mem::replace(&mut self.current, BrokenLine::new(next_start, true));
        self.lines.push(line);
    }

    fn push(&mut self, c: char, offset: usize) {
        match c {
            '\n' => {
                let mut line =
                    std::mem::replace(&mut self.current, BrokenLine::new(offset + 1, false));
                line.end = offset;
                self.lines.push(line);
                return;
            }
            '\r' => return,
            _ => {}
        }

        let (glyph, advance) = self.advance(c);
        let whitespace = c.is_whitespace();

        if let Some(max_width) = self.wrap_width {
            loop {
                let kern = self.kerning_before(c);
                let overflows = !self.current.pens.is_empty()
                    && self.current.width + kern + advance > max_width + LAYOUT_EPSILON;
                if !overflows {
                    break;
                }

                if !self.current.has_content {
                    // Only whitespace so far: it never forms a line of its own
                    if whitespace {
                        return;
                    }
                    self.current.pens.clear();
                    self.current.width = 0.0;
                    self.current.start = offset;
                    self.current.end = offset;
                    break;
                }

                if whitespace {
                    // The overflowing whitespace itself becomes the break
                    self.trim_trailing_whitespace();
                    self.wrap(offset + c.len_utf8());
                    return;
                }

                match self.current.last_space {
                    Some(index) => {
                        let space = self.current.pens[index];
                        let tail = self.current.pens.split_off(index + 1);
                        self.trim_trailing_whitespace();
                        self.wrap(space.offset + space.c.len_utf8());
                        for pen in tail {
                            self.push(pen.c, pen.offset);
                        }
                    }
                    None => self.wrap(offset),
                }
            }
        }

        if self.current.wrapped && self.current.pens.is_empty() && whitespace {
            self.current.start = offset + c.len_utf8();
            self.current.end = self.current.start;
            return;
        }

        let start_x = self.current.width;
        let x = start_x + self.kerning_before(c);
        self.current.pens.push(Pen {
            c,
            offset,
            glyph,
            start_x,
            x,
        });
        self.current.width = x + advance;
        self.current.end = offset + c.len_utf8();
        if !whitespace {
            self.current.has_content = true;
        } else if self.current.has_content {
            self.current.last_space = Some(self.current.pens.len() - 1);
        }
    }

    fn finish(mut self, text_len: usize) -> Vec<BrokenLine> {
        let mut line = self.current;
        line.end = line.end.max(line.start).min(text_len);
        self.lines.push(line);
        self.lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::SystemFontStyle;
    use crate::test_support::{assert_close, fixed_font, FakeRasterizer};
    use lumen_core::Color;

    fn options(width: f32, height: f32) -> LayoutOptions {
        LayoutOptions {
            width,
            height,
            font_size: 20.0,
            h_align: HAlign::Left,
            v_align: VAlign::Top,
            kerning: false,
            ..Default::default()
        }
    }

    fn line_texts<'t>(text: &'t str, layout: &TextLayout) -> Vec<&'t str> {
        layout.lines.iter().map(|l| &text[l.start..l.end]).collect()
    }

    fn bitmap(text: &str, font: &FontDescriptor, options: &LayoutOptions) -> TextLayout {
        TextLayoutEngine::new().layout(text, MetricsSource::Bitmap(font), options)
    }

    #[test]
    fn test_auto_size_bit_or() {
        assert_eq!(AutoSize::Horizontal | AutoSize::Vertical, AutoSize::Both);
        assert_eq!(AutoSize::None | AutoSize::Vertical, AutoSize::Vertical);
        assert_eq!(AutoSize::Both | AutoSize::None, AutoSize::Both);

        let mut auto = AutoSize::None;
        auto |= AutoSize::Horizontal;
        assert!(auto.contains(AutoSize::Horizontal));
        assert!(!auto.contains(AutoSize::Vertical));
        assert!(AutoSize::Both.contains(AutoSize::None));
    }

    #[test]
    fn test_empty_text_has_no_lines() {
        let font = fixed_font("fixed");
        let layout = bitmap("", &font, &options(300.0, 100.0));
        assert!(layout.lines.is_empty());
        assert!(layout.glyphs.is_empty());
        assert_eq!(layout.bounds.area(), 0.0);
    }

    #[test]
    fn test_centered_hello_world() {
        let font = fixed_font("fixed");
        let opts = LayoutOptions {
            h_align: HAlign::Center,
            v_align: VAlign::Center,
            ..options(300.0, 100.0)
        };
        let layout = bitmap("Hello world!", &font, &opts);

        assert_eq!(layout.line_count(), 1);
        let line = layout.lines[0];
        assert_close(line.width, 116.0);
        assert_close(line.x, 92.0);
        assert_close(line.y, 40.0);
        assert_eq!(layout.bounds, Rect::new(92.0, 40.0, 116.0, 20.0));
    }

    #[test]
    fn test_wraps_at_last_whitespace() {
        let font = fixed_font("fixed");
        let text = "aaa bbb";
        let layout = bitmap(text, &font, &options(50.0, 100.0));

        assert_eq!(line_texts(text, &layout), vec!["aaa", "bbb"]);
        assert_close(layout.lines[0].width, 30.0);
        assert_close(layout.lines[1].width, 30.0);
        assert_close(layout.lines[1].y, 20.0);
    }

    #[test]
    fn test_wrapped_words_keep_all_content() {
        let font = fixed_font("fixed");
        let text = "the quick brown fox jumps over the lazy dog";
        let layout = bitmap(text, &font, &options(100.0, 400.0));

        assert!(layout.line_count() > 1);
        let rejoined = line_texts(text, &layout).join(" ");
        assert_eq!(rejoined, text);
        for line in &layout.lines {
            assert!(line.width <= 100.0 + LAYOUT_EPSILON);
        }
    }

    #[test]
    fn test_long_word_breaks_by_character() {
        let font = fixed_font("fixed");
        let text = "abcdefgh";
        let layout = bitmap(text, &font, &options(35.0, 100.0));
        assert_eq!(line_texts(text, &layout), vec!["abc", "def", "gh"]);
    }

    #[test]
    fn test_long_word_after_space_breaks_by_character() {
        let font = fixed_font("fixed");
        let text = "ab cdefghij";
        let layout = bitmap(text, &font, &options(45.0, 100.0));
        assert_eq!(line_texts(text, &layout), vec!["ab", "cdef", "ghij"]);
    }

    #[test]
    fn test_leading_whitespace_never_forms_a_line() {
        let font = fixed_font("fixed");
        let text = " abcdefgh";
        let layout = bitmap(text, &font, &options(35.0, 100.0));

        assert_eq!(line_texts(text, &layout), vec![" ab", "cde", "fgh"]);
        assert_close(layout.content_size.height, 60.0);
    }

    #[test]
    fn test_whitespace_only_line_start_is_dropped_on_overflow() {
        let font = fixed_font("fixed");
        let text = "        abc";
        let layout = bitmap(text, &font, &options(35.0, 100.0));
        assert_eq!(line_texts(text, &layout), vec!["abc"]);
        assert_eq!(layout.lines[0].x, 0.0);
    }

    #[test]
    fn test_every_space_before_a_break_is_dropped() {
        let font = fixed_font("fixed");
        let text = "aaa  bbb";
        let opts = LayoutOptions {
            h_align: HAlign::Right,
            ..options(50.0, 100.0)
        };
        let layout = bitmap(text, &font, &opts);

        assert_eq!(line_texts(text, &layout), vec!["aaa", "bbb"]);
        for line in &layout.lines {
            assert_close(line.width, 30.0);
            assert_close(line.x, 20.0);
        }
    }

    #[test]
    fn test_overflowing_spaces_are_dropped() {
        let font = fixed_font("fixed");
        let text = "aaa    bbb";
        let layout = bitmap(text, &font, &options(50.0, 100.0));
        assert_eq!(line_texts(text, &layout), vec!["aaa", "bbb"]);
        assert_close(layout.lines[0].width, 30.0);
    }

    #[test]
    fn test_explicit_newlines_always_break() {
        let font = fixed_font("fixed");
        let text = "one\ntwo\n";
        let layout = bitmap(text, &font, &options(300.0, 100.0));
        assert_eq!(line_texts(text, &layout), vec!["one", "two", ""]);
    }

    #[test]
    fn test_horizontal_auto_size_never_wraps() {
        let font = fixed_font("fixed");
        let text = "this line is much wider than the field";
        let opts = LayoutOptions {
            auto_size: AutoSize::Horizontal,
            h_align: HAlign::Right,
            ..options(40.0, 100.0)
        };
        let layout = bitmap(text, &font, &opts);

        assert_eq!(layout.line_count(), 1);
        assert_close(layout.field_size.width, layout.lines[0].width);
        // Right alignment is overridden to left
        assert_eq!(layout.lines[0].x, 0.0);
        // Height stays as requested
        assert_eq!(layout.field_size.height, 100.0);
    }

    #[test]
    fn test_horizontal_auto_size_splits_on_newlines_only() {
        let font = fixed_font("fixed");
        let text = "short\na much longer second line";
        let opts = LayoutOptions {
            auto_size: AutoSize::Horizontal,
            ..options(10.0, 100.0)
        };
        let layout = bitmap(text, &font, &opts);
        assert_eq!(
            line_texts(text, &layout),
            vec!["short", "a much longer second line"]
        );
    }

    #[test]
    fn test_left_and_right_alignment_edges() {
        let font = fixed_font("fixed");
        let text = "alignment keeps every line edge in place";
        let width = 120.0;

        let left = bitmap(text, &font, &options(width, 200.0));
        assert!(left.line_count() > 1);
        for line in &left.lines {
            assert_eq!(line.x, 0.0);
        }

        let right_opts = LayoutOptions {
            h_align: HAlign::Right,
            ..options(width, 200.0)
        };
        let right = bitmap(text, &font, &right_opts);
        for line in &right.lines {
            assert_close(line.x + line.width, width);
        }
    }

    #[test]
    fn test_auto_size_both_bounds() {
        let font = fixed_font("fixed");
        let text = "first\nsecond line\nthird";
        let opts = LayoutOptions {
            auto_size: AutoSize::Both,
            leading: 4.0,
            h_align: HAlign::Center,
            v_align: VAlign::Bottom,
            ..options(10.0, 10.0)
        };
        let layout = bitmap(text, &font, &opts);

        let widest = layout.lines.iter().map(|l| l.width).fold(0.0, f32::max);
        assert_eq!(layout.line_count(), 3);
        assert_close(layout.bounds.width(), widest);
        assert_close(layout.bounds.height(), 3.0 * (20.0 + 4.0));
        assert_eq!(layout.bounds.origin, lumen_core::Point::ZERO);
        assert_eq!(layout.field_size, layout.bounds.size);
    }

    #[test]
    fn test_vertical_auto_size_keeps_width() {
        let font = fixed_font("fixed");
        let opts = LayoutOptions {
            auto_size: AutoSize::Vertical,
            v_align: VAlign::Bottom,
            ..options(50.0, 5.0)
        };
        let layout = bitmap("aaa bbb ccc", &font, &opts);
        assert_eq!(layout.line_count(), 3);
        assert_eq!(layout.field_size, Size::new(50.0, 60.0));
        assert_eq!(layout.lines[0].y, 0.0);
    }

    #[test]
    fn test_constrained_height_keeps_overflowing_lines() {
        let font = fixed_font("fixed");
        let layout = bitmap("aaa bbb ccc ddd", &font, &options(50.0, 30.0));
        assert_eq!(layout.line_count(), 4);
        assert_eq!(layout.field_size.height, 30.0);
    }

    #[test]
    fn test_kerning_toggle() {
        let font = fixed_font("fixed").with_kerning('A', 'V', -3.0);
        let mut opts = options(300.0, 100.0);

        let plain = bitmap("AVA", &font, &opts);
        opts.kerning = true;
        let kerned = bitmap("AVA", &font, &opts);
        assert!(kerned.lines[0].width < plain.lines[0].width);
        assert_close(plain.lines[0].width - kerned.lines[0].width, 3.0);

        // No kerned pair in the text: identical results
        let plain_other = bitmap("xyz", &font, &options(300.0, 100.0));
        let kerned_other = bitmap("xyz", &font, &opts);
        assert_eq!(plain_other, kerned_other);
    }

    #[test]
    fn test_missing_glyph_advances_half_em() {
        let font = fixed_font("fixed");
        let layout = bitmap("a\u{e9}a", &font, &options(300.0, 100.0));
        assert_eq!(layout.glyphs.len(), 2);
        assert_close(layout.lines[0].width, 10.0 + 10.0 + 10.0);
        assert_close(layout.glyphs[1].x - layout.glyphs[0].x, 20.0);
    }

    #[test]
    fn test_font_size_scales_metrics() {
        let font = fixed_font("fixed");
        let opts = LayoutOptions {
            font_size: 40.0,
            ..options(300.0, 100.0)
        };
        let layout = bitmap("ab", &font, &opts);
        assert_close(layout.lines[0].width, 40.0);
        let first = layout.glyphs[0];
        assert_eq!(first.scale, 2.0);
        assert_eq!(first.bounds(), Rect::new(2.0, 4.0, 16.0, 32.0));
    }

    #[test]
    fn test_native_font_size_uses_descriptor_size() {
        let font = fixed_font("fixed");
        let opts = LayoutOptions {
            font_size: NATIVE_FONT_SIZE,
            ..options(300.0, 100.0)
        };
        let layout = bitmap("ab", &font, &opts);
        assert_eq!(layout.font_size, 20.0);
        assert_eq!(layout.glyphs[0].scale, 1.0);
        assert_close(layout.lines[0].width, 20.0);
    }

    #[test]
    fn test_native_font_size_on_system_path() {
        let rasterizer = FakeRasterizer::default();
        let style = SystemFontStyle {
            font_name: "Helvetica",
            bold: false,
            italic: false,
            underline: false,
            color: Color::BLACK,
        };
        let opts = LayoutOptions {
            font_size: NATIVE_FONT_SIZE,
            ..options(300.0, 100.0)
        };
        let layout = TextLayoutEngine::new().layout(
            "abc",
            MetricsSource::System(&rasterizer, style),
            &opts,
        );
        assert_eq!(layout.font_size, crate::system::DEFAULT_SYSTEM_FONT_SIZE);
    }

    #[test]
    fn test_auto_scale_shrinks_until_fit() {
        let font = fixed_font("fixed");
        let opts = LayoutOptions {
            auto_scale: true,
            font_size: 40.0,
            ..options(100.0, 40.0)
        };
        let layout = bitmap("scale this text down", &font, &opts);

        assert!(layout.font_size < 40.0);
        assert!(layout.font_size >= opts.min_font_size);
        assert!(layout.content_size.height <= 40.0 + LAYOUT_EPSILON);
        assert!(layout.content_size.width <= 100.0 + LAYOUT_EPSILON);
    }

    #[test]
    fn test_auto_scale_keeps_fitting_size() {
        let font = fixed_font("fixed");
        let opts = LayoutOptions {
            auto_scale: true,
            ..options(300.0, 100.0)
        };
        let layout = bitmap("fits", &font, &opts);
        assert_eq!(layout.font_size, 20.0);
    }

    #[test]
    fn test_auto_scale_falls_back_to_floor() {
        let font = fixed_font("fixed");
        let opts = LayoutOptions {
            auto_scale: true,
            font_size: 30.0,
            min_font_size: 10.0,
            ..options(20.0, 5.0)
        };
        let layout = bitmap("never fits", &font, &opts);
        assert_eq!(layout.font_size, 10.0);
        assert!(!layout.lines.is_empty());
    }

    #[test]
    fn test_auto_scale_ignored_when_auto_sizing() {
        let font = fixed_font("fixed");
        let opts = LayoutOptions {
            auto_scale: true,
            auto_size: AutoSize::Vertical,
            ..options(50.0, 5.0)
        };
        let layout = bitmap("aaa bbb ccc", &font, &opts);
        assert_eq!(layout.font_size, 20.0);
    }

    #[test]
    fn test_system_path_adopts_rasterizer_bounds() {
        let rasterizer = FakeRasterizer::default();
        let style = SystemFontStyle {
            font_name: "Georgia-Bold",
            bold: true,
            italic: false,
            underline: false,
            color: Color::BLACK,
        };
        let opts = LayoutOptions {
            font_size: 16.0,
            h_align: HAlign::Center,
            v_align: VAlign::Center,
            ..options(300.0, 100.0)
        };
        let layout = TextLayoutEngine::new().layout(
            "Hello world!",
            MetricsSource::System(&rasterizer, style),
            &opts,
        );

        assert!(layout.glyphs.is_empty());
        assert_eq!(layout.bounds, Rect::new(102.0, 41.0, 96.0, 18.0));

        let requests = rasterizer.requests.lock().unwrap();
        assert_eq!(
            requests.as_slice(),
            &[("Hello world!".to_string(), 16.0, Some(300.0), true)]
        );
    }

    #[test]
    fn test_system_path_auto_scale_uses_measurements() {
        let rasterizer = FakeRasterizer::default();
        let style = SystemFontStyle {
            font_name: "Helvetica",
            bold: false,
            italic: false,
            underline: false,
            color: Color::BLACK,
        };
        let opts = LayoutOptions {
            auto_scale: true,
            font_size: 32.0,
            ..options(80.0, 20.0)
        };
        let layout = TextLayoutEngine::new().layout(
            "0123456789",
            MetricsSource::System(&rasterizer, style),
            &opts,
        );
        assert!(layout.font_size < 32.0);
        assert!(layout.content_size.height <= 20.0 + LAYOUT_EPSILON);
    }
}
