//! Viewport screenshots of laid-out documents.
//!
//! Static documents carry no paint information, so a screenshot shows the
//! viewport with every element's border box outlined. That is enough to see
//! what the probe considered above the fold.

use std::path::Path;

use image::{Rgba, RgbaImage};
use tracing::debug;

use crate::document::{DocumentView, StaticDocument};
use crate::error::{RenderError, RenderResult};
use crate::types::Rect;

const BACKGROUND: Rgba<u8> = Rgba([255, 255, 255, 255]);
const OUTLINE: Rgba<u8> = Rgba([66, 133, 244, 255]);

/// Draw the visible part of a document into an image.
///
/// The image has the viewport's size multiplied by `scale` (at least 1x1).
pub fn render_boxes(document: &StaticDocument, scale: f32) -> RgbaImage {
    let viewport = document.viewport();
    let scale = if scale > 0.0 { scale } else { 1.0 };
    let width = ((viewport.width as f32 * scale).round() as u32).max(1);
    let height = ((viewport.height as f32 * scale).round() as u32).max(1);

    let mut image = RgbaImage::from_pixel(width, height, BACKGROUND);
    let visible = viewport.rect();

    for (_, rect) in document.boxes() {
        if rect.is_empty() {
            continue;
        }
        if let Some(clipped) = rect.intersect(&visible) {
            outline(&mut image, &clipped, scale);
        }
    }

    image
}

fn outline(image: &mut RgbaImage, rect: &Rect, scale: f32) {
    let (width, height) = image.dimensions();
    let left = ((rect.left() * scale) as u32).min(width - 1);
    let top = ((rect.top() * scale) as u32).min(height - 1);
    let right = ((rect.right() * scale).ceil() as u32).saturating_sub(1).min(width - 1);
    let bottom = ((rect.bottom() * scale).ceil() as u32).saturating_sub(1).min(height - 1);

    for x in left..=right {
        image.put_pixel(x, top, OUTLINE);
        image.put_pixel(x, bottom, OUTLINE);
    }
    for y in top..=bottom {
        image.put_pixel(left, y, OUTLINE);
        image.put_pixel(right, y, OUTLINE);
    }
}

/// Save an image, with the format chosen by the file extension.
pub fn save_image(image: &RgbaImage, path: impl AsRef<Path>) -> RenderResult<()> {
    let path = path.as_ref();

    image
        .save(path)
        .map_err(|e| RenderError::Screenshot(format!("{}: {}", path.display(), e)))?;

    debug!(
        target: "foldline_render::screenshot",
        path = %path.display(),
        width = image.width(),
        height = image.height(),
        "saved screenshot"
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{DocumentSnapshot, ElementSnapshot};
    use crate::types::Viewport;

    fn document() -> StaticDocument {
        DocumentSnapshot::new(
            ElementSnapshot::new("body")
                .with_child(ElementSnapshot::new("div").with_rect(Rect::new(10.0, 10.0, 20.0, 20.0)))
                .with_child(ElementSnapshot::new("div").with_rect(Rect::new(0.0, 500.0, 20.0, 20.0))),
        )
        .layout(Viewport::new(100, 50), true)
    }

    #[test]
    fn test_render_boxes() {
        let image = render_boxes(&document(), 1.0);
        assert_eq!(image.dimensions(), (100, 50));
        assert_eq!(*image.get_pixel(10, 10), OUTLINE);
        assert_eq!(*image.get_pixel(29, 29), OUTLINE);
        assert_eq!(*image.get_pixel(20, 20), BACKGROUND);
        assert_eq!(*image.get_pixel(5, 45), BACKGROUND);
    }

    #[test]
    fn test_render_boxes_scaled() {
        let image = render_boxes(&document(), 2.0);
        assert_eq!(image.dimensions(), (200, 100));
        assert_eq!(*image.get_pixel(20, 20), OUTLINE);
    }

    #[test]
    fn test_save_image() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shot.png");

        save_image(&render_boxes(&document(), 1.0), &path).unwrap();

        let loaded = image::open(&path).unwrap().to_rgba8();
        assert_eq!(loaded.dimensions(), (100, 50));
    }

    #[test]
    fn test_save_image_to_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("shot.png");

        assert!(matches!(
            save_image(&render_boxes(&document(), 1.0), &path),
            Err(RenderError::Screenshot(_))
        ));
    }
}
