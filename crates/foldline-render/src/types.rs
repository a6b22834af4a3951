//! Layout geometry shared by documents, screenshots, and the probe.

use serde::{Deserialize, Serialize};

/// A border box in document coordinates (CSS pixels, scroll offset zero).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    /// Create a new rectangle from origin and size.
    #[inline]
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Empty rectangle at origin.
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0, 0.0);

    /// Left edge x coordinate.
    #[inline]
    pub fn left(&self) -> f32 {
        self.x
    }

    /// Top edge y coordinate.
    #[inline]
    pub fn top(&self) -> f32 {
        self.y
    }

    /// Right edge x coordinate.
    #[inline]
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    /// Bottom edge y coordinate.
    #[inline]
    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    /// Check if the rectangle is empty (zero or negative size).
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    /// Compute the intersection of two rectangles.
    pub fn intersect(&self, other: &Rect) -> Option<Rect> {
        let left = self.left().max(other.left());
        let top = self.top().max(other.top());
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());

        if left < right && top < bottom {
            Some(Rect::new(left, top, right - left, bottom - top))
        } else {
            None
        }
    }
}

/// The visible area of a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    /// Create a viewport.
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// The viewport as a rectangle at the origin.
    pub fn rect(&self) -> Rect {
        Rect::new(0.0, 0.0, self.width as f32, self.height as f32)
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(1200, 1080)
    }
}
