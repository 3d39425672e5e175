// ============================================================
// Layer 3 — DrivingFrame Domain Type
// ============================================================
// One dashboard camera frame together with the steering angle
// that was commanded when it was captured.
//
// The image is kept as an 8-bit RGB buffer (HWC layout) so the
// augmentation code can use `image::imageops` directly. It is
// only converted to a float CHW tensor at batch time.

use image::RgbImage;

/// A labelled camera frame.
#[derive(Debug, Clone, PartialEq)]
pub struct DrivingFrame {
    /// Camera image, RGB8, row-major
    pub image: RgbImage,

    /// Steering angle label. Positive and negative values are
    /// mirror images of each other, which is what makes the
    /// horizontal flip augmentation valid.
    pub angle: f32,
}

impl DrivingFrame {
    pub fn new(image: RgbImage, angle: f32) -> Self {
        Self { image, angle }
    }

    /// (width, height) of the image in pixels
    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    /// Mirror the image left/right and negate the angle in place.
    pub fn flip_horizontal(&mut self) {
        image::imageops::flip_horizontal_in_place(&mut self.image);
        self.angle = -self.angle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_flip_negates_angle_and_mirrors_pixels() {
        let mut img = RgbImage::new(3, 1);
        img.put_pixel(0, 0, Rgb([255, 0, 0]));
        let frame   = DrivingFrame::new(img, 0.25);

        let mut flipped = frame.clone();
        flipped.flip_horizontal();
        assert_eq!(flipped.angle, -0.25);
        assert_eq!(flipped.image.get_pixel(2, 0), &Rgb([255, 0, 0]));
        assert_eq!(flipped.image.get_pixel(0, 0), &Rgb([0, 0, 0]));

        // Original is unchanged
        assert_eq!(frame.angle, 0.25);
    }

    #[test]
    fn test_double_flip_is_identity() {
        let mut img = RgbImage::new(4, 2);
        img.put_pixel(1, 1, Rgb([10, 20, 30]));
        let frame = DrivingFrame::new(img, -0.1);
        let mut twice = frame.clone();
        twice.flip_horizontal();
        twice.flip_horizontal();
        assert_eq!(twice, frame);
    }
}
