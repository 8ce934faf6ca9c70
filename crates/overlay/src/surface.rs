//! The overlay drawing surface: an RGBA canvas kept exactly the size of the
//! media element's on-screen rectangle.

use crate::font::{GLYPH_HEIGHT, GLYPH_WIDTH, glyph, measure_text};
use crate::viewport::ViewportRect;
use image::{Rgba, RgbaImage, imageops};

const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);
const LABEL_TEXT: Rgba<u8> = Rgba([0xFF, 0xFF, 0xFF, 0xFF]);

/// Vertical padding inside a label chip.
const CHIP_PAD: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelPlacement {
    Above,
    Below,
}

pub struct Surface {
    image: RgbaImage,
    rect: ViewportRect,
}

impl Surface {
    pub fn new(rect: ViewportRect) -> Self {
        Self {
            image: RgbaImage::new(rect.width, rect.height),
            rect,
        }
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn rect(&self) -> ViewportRect {
        self.rect
    }

    /// Track the media element's rectangle. The pixel buffer is reallocated
    /// only when the size actually changed; pure repositioning (fullscreen
    /// centering, scroll) just updates the stored origin. Returns whether
    /// anything changed.
    pub fn resize_if_changed(&mut self, rect: ViewportRect) -> bool {
        if rect == self.rect {
            return false;
        }
        if rect.width != self.rect.width || rect.height != self.rect.height {
            self.image = RgbaImage::new(rect.width, rect.height);
        }
        self.rect = rect;
        true
    }

    pub fn clear(&mut self) {
        for pixel in self.image.pixels_mut() {
            *pixel = TRANSPARENT;
        }
    }

    fn put_pixel_checked(&mut self, x: i64, y: i64, color: Rgba<u8>) {
        if x >= 0 && y >= 0 && (x as u32) < self.image.width() && (y as u32) < self.image.height() {
            self.image.put_pixel(x as u32, y as u32, color);
        }
    }

    pub fn fill_rect(&mut self, x: i64, y: i64, width: u32, height: u32, color: Rgba<u8>) {
        for dy in 0..height as i64 {
            for dx in 0..width as i64 {
                self.put_pixel_checked(x + dx, y + dy, color);
            }
        }
    }

    pub fn stroke_rect(
        &mut self,
        x: i64,
        y: i64,
        width: u32,
        height: u32,
        color: Rgba<u8>,
        line_width: u32,
    ) {
        let lw = line_width.min(width).min(height);
        // Top and bottom edges.
        self.fill_rect(x, y, width, lw, color);
        self.fill_rect(x, y + height as i64 - lw as i64, width, lw, color);
        // Left and right edges.
        self.fill_rect(x, y, lw, height, color);
        self.fill_rect(x + width as i64 - lw as i64, y, lw, height, color);
    }

    pub fn draw_text(&mut self, x: i64, y: i64, text: &str, color: Rgba<u8>) {
        let mut cx = x;
        for c in text.chars() {
            if let Some(rows) = glyph(c) {
                for (row, bits) in rows.iter().enumerate() {
                    for col in 0..GLYPH_WIDTH as i64 {
                        if (bits >> (GLYPH_WIDTH as i64 - 1 - col)) & 1 == 1 {
                            self.put_pixel_checked(cx + col, y + row as i64, color);
                        }
                    }
                }
            }
            cx += GLYPH_WIDTH as i64;
        }
    }

    /// Filled label chip for a box at `(box_x, box_y)` with height `box_h`
    /// (surface pixels). Placed above the box unless that would clip off the
    /// top edge, in which case it goes below.
    pub fn draw_label(
        &mut self,
        text: &str,
        box_x: f32,
        box_y: f32,
        box_h: f32,
        color: Rgba<u8>,
    ) -> LabelPlacement {
        let chip_w = measure_text(text) + 2 * CHIP_PAD + 2;
        let chip_h = GLYPH_HEIGHT + 2 * CHIP_PAD;

        let x = box_x.round() as i64;
        let (chip_y, placement) = if box_y >= chip_h as f32 {
            (box_y.round() as i64 - chip_h as i64, LabelPlacement::Above)
        } else {
            ((box_y + box_h).round() as i64, LabelPlacement::Below)
        };

        self.fill_rect(x, chip_y, chip_w, chip_h, color);
        self.draw_text(x + CHIP_PAD as i64 + 1, chip_y + CHIP_PAD as i64, text, LABEL_TEXT);
        placement
    }

    /// Blit a backend-annotated frame scaled to the full surface.
    pub fn draw_annotated(&mut self, frame: &RgbaImage) {
        if frame.dimensions() == self.image.dimensions() {
            self.image.copy_from_slice(frame.as_raw());
            return;
        }
        let scaled = imageops::resize(
            frame,
            self.image.width(),
            self.image.height(),
            imageops::FilterType::Triangle,
        );
        self.image.copy_from_slice(scaled.as_raw());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect(width: u32, height: u32) -> ViewportRect {
        ViewportRect {
            x: 0,
            y: 0,
            width,
            height,
        }
    }

    const RED: Rgba<u8> = Rgba([0xFF, 0, 0, 0xFF]);

    #[test]
    fn resize_is_a_noop_for_an_unchanged_rect() {
        let mut surface = Surface::new(rect(100, 50));
        assert!(!surface.resize_if_changed(rect(100, 50)));
        assert!(surface.resize_if_changed(rect(200, 50)));
        assert_eq!(surface.image().width(), 200);
    }

    #[test]
    fn repositioning_does_not_reallocate() {
        let mut surface = Surface::new(rect(100, 50));
        let moved = ViewportRect {
            x: 40,
            y: 20,
            width: 100,
            height: 50,
        };
        assert!(surface.resize_if_changed(moved));
        assert_eq!(surface.rect(), moved);
        assert_eq!(surface.image().dimensions(), (100, 50));
    }

    #[test]
    fn clear_makes_every_pixel_transparent() {
        let mut surface = Surface::new(rect(20, 20));
        surface.fill_rect(0, 0, 20, 20, RED);
        surface.clear();
        assert!(surface.image().pixels().all(|p| p.0[3] == 0));
    }

    #[test]
    fn stroke_rect_paints_edges_not_interior() {
        let mut surface = Surface::new(rect(40, 40));
        surface.stroke_rect(10, 10, 20, 20, RED, 2);
        assert_eq!(*surface.image().get_pixel(10, 10), RED);
        assert_eq!(*surface.image().get_pixel(29, 29), RED);
        assert_eq!(surface.image().get_pixel(20, 20).0[3], 0, "interior stays clear");
    }

    #[test]
    fn out_of_bounds_drawing_is_clipped_not_panicking() {
        let mut surface = Surface::new(rect(10, 10));
        surface.stroke_rect(-5, -5, 30, 30, RED, 2);
        surface.fill_rect(8, 8, 10, 10, RED);
    }

    #[test]
    fn label_goes_above_when_there_is_room() {
        let mut surface = Surface::new(rect(200, 100));
        let placement = surface.draw_label("fish (0.95)", 20.0, 50.0, 30.0, RED);
        assert_eq!(placement, LabelPlacement::Above);
        // Chip background sits directly above the box top edge.
        assert_eq!(*surface.image().get_pixel(21, 49), RED);
    }

    #[test]
    fn label_drops_below_when_it_would_clip_the_top_edge() {
        let mut surface = Surface::new(rect(200, 100));
        let placement = surface.draw_label("fish (0.95)", 20.0, 4.0, 30.0, RED);
        assert_eq!(placement, LabelPlacement::Below);
        // Chip background starts at the box bottom edge.
        assert_eq!(*surface.image().get_pixel(21, 35), RED);
    }

    #[test]
    fn annotated_frame_is_scaled_to_the_surface() {
        let mut surface = Surface::new(rect(32, 16));
        let frame = RgbaImage::from_pixel(8, 4, Rgba([1, 2, 3, 255]));
        surface.draw_annotated(&frame);
        assert_eq!(*surface.image().get_pixel(16, 8), Rgba([1, 2, 3, 255]));
    }
}
