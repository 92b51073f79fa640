// Pixel canvas with the few primitives the plots need: rectangles, straight
// lines and column fills. Coordinates outside the image are clipped.

use image::{Rgb, RgbImage};

pub const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
pub const BLACK: Rgb<u8> = Rgb([0, 0, 0]);
/// matplotlib's first cycle color (C0)
pub const LINE_BLUE: Rgb<u8> = Rgb([31, 119, 180]);

/// Axis-aligned pixel rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }

    /// Pixel column for a horizontal axis fraction in `[0, 1]`.
    pub fn x_at(&self, fraction: f32) -> i64 {
        self.x as i64 + (fraction * (self.width.saturating_sub(1)) as f32).round() as i64
    }

    /// Pixel row for a vertical axis fraction; 0 is the bottom edge.
    pub fn y_at(&self, fraction: f32) -> i64 {
        let span = self.height.saturating_sub(1) as f32;
        self.y as i64 + (span - fraction * span).round() as i64
    }
}

pub struct Canvas {
    image: RgbImage,
}

impl Canvas {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            image: RgbImage::from_pixel(width, height, WHITE),
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn put(&mut self, x: i64, y: i64, color: Rgb<u8>) {
        if x >= 0 && y >= 0 && (x as u64) < self.width() as u64 && (y as u64) < self.height() as u64
        {
            self.image.put_pixel(x as u32, y as u32, color);
        }
    }

    pub fn fill_rect(&mut self, rect: Rect, color: Rgb<u8>) {
        let right = rect.right().min(self.width());
        let bottom = rect.bottom().min(self.height());
        for y in rect.y..bottom {
            for x in rect.x..right {
                self.image.put_pixel(x, y, color);
            }
        }
    }

    /// One-pixel outline just inside `rect`.
    pub fn stroke_rect(&mut self, rect: Rect, color: Rgb<u8>) {
        if rect.width == 0 || rect.height == 0 {
            return;
        }
        let (left, top) = (rect.x as i64, rect.y as i64);
        let (right, bottom) = (rect.right() as i64 - 1, rect.bottom() as i64 - 1);
        self.hline(left, right, top, color);
        self.hline(left, right, bottom, color);
        self.vline(left, top, bottom, color);
        self.vline(right, top, bottom, color);
    }

    pub fn hline(&mut self, x0: i64, x1: i64, y: i64, color: Rgb<u8>) {
        let (a, b) = if x0 <= x1 { (x0, x1) } else { (x1, x0) };
        for x in a..=b {
            self.put(x, y, color);
        }
    }

    pub fn vline(&mut self, x: i64, y0: i64, y1: i64, color: Rgb<u8>) {
        let (a, b) = if y0 <= y1 { (y0, y1) } else { (y1, y0) };
        for y in a..=b {
            self.put(x, y, color);
        }
    }

    /// Bresenham line between two points, inclusive.
    pub fn line(&mut self, (x0, y0): (i64, i64), (x1, y1): (i64, i64), color: Rgb<u8>) {
        let dx = (x1 - x0).abs();
        let dy = -(y1 - y0).abs();
        let sx = if x0 < x1 { 1 } else { -1 };
        let sy = if y0 < y1 { 1 } else { -1 };
        let mut err = dx + dy;
        let (mut x, mut y) = (x0, y0);
        loop {
            self.put(x, y, color);
            if x == x1 && y == y1 {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x += sx;
            }
            if e2 <= dx {
                err += dx;
                y += sy;
            }
        }
    }

    /// Line drawn `thickness` pixels wide (grown downward and rightward).
    pub fn thick_line(
        &mut self,
        from: (i64, i64),
        to: (i64, i64),
        thickness: u32,
        color: Rgb<u8>,
    ) {
        for offset in 0..thickness.max(1) as i64 {
            self.line((from.0, from.1 + offset), (to.0, to.1 + offset), color);
            self.line((from.0 + offset, from.1), (to.0 + offset, to.1), color);
        }
    }

    pub fn pixel(&self, x: u32, y: u32) -> Rgb<u8> {
        *self.image.get_pixel(x, y)
    }

    pub fn into_image(self) -> RgbImage {
        self.image
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_canvas_is_white() {
        let canvas = Canvas::new(20, 10);
        assert_eq!(canvas.pixel(0, 0), WHITE);
        assert_eq!(canvas.pixel(19, 9), WHITE);
    }

    #[test]
    fn test_line_hits_both_endpoints() {
        let mut canvas = Canvas::new(20, 20);
        canvas.line((1, 2), (17, 11), BLACK);
        assert_eq!(canvas.pixel(1, 2), BLACK);
        assert_eq!(canvas.pixel(17, 11), BLACK);
    }

    #[test]
    fn test_drawing_outside_is_clipped() {
        let mut canvas = Canvas::new(10, 10);
        canvas.line((-5, -5), (20, 20), BLACK);
        canvas.fill_rect(
            Rect {
                x: 8,
                y: 8,
                width: 10,
                height: 10,
            },
            LINE_BLUE,
        );
        assert_eq!(canvas.pixel(9, 9), LINE_BLUE);
        assert_eq!(canvas.pixel(0, 0), BLACK);
    }

    #[test]
    fn test_rect_axis_mapping() {
        let rect = Rect {
            x: 10,
            y: 20,
            width: 101,
            height: 51,
        };
        assert_eq!(rect.x_at(0.0), 10);
        assert_eq!(rect.x_at(1.0), 110);
        // Fraction 0 is the bottom row, 1 the top row
        assert_eq!(rect.y_at(0.0), 70);
        assert_eq!(rect.y_at(1.0), 20);
    }

    #[test]
    fn test_stroke_rect_outline() {
        let mut canvas = Canvas::new(10, 10);
        let rect = Rect {
            x: 2,
            y: 2,
            width: 5,
            height: 5,
        };
        canvas.stroke_rect(rect, BLACK);
        assert_eq!(canvas.pixel(2, 2), BLACK);
        assert_eq!(canvas.pixel(6, 6), BLACK);
        assert_eq!(canvas.pixel(4, 4), WHITE);
    }
}
