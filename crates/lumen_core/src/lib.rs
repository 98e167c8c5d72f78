//! Lumen Core Types
//!
//! Leaf crate holding the value types every Lumen rendering crate agrees on:
//!
//! - **Geometry**: `Point`, `Size`, `Rect`
//! - **Transforms**: `Affine2D`, the accumulated scene-graph transform
//! - **Color**: linear RGBA with `0xRRGGBB` helpers

pub mod color;
pub mod geometry;

pub use color::Color;
pub use geometry::{Affine2D, Point, Rect, Size};
