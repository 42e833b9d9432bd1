use std::path::Path;

use image::{GrayImage, Luma, Rgba, RgbaImage};

use crate::error::{Result, WcloudError};

/// Per-channel distance below which a pixel counts as background tone.
const BACKGROUND_TOLERANCE: u8 = 10;

/// Immutable raster loaded once at startup. The silhouette (pixels differing
/// from the dominant background tone) bounds word placement, and the pixel
/// colors drive recoloring of placed words.
pub struct MaskImage {
    image: RgbaImage,
    background: Rgba<u8>,
}

impl MaskImage {
    pub fn from_image(image: RgbaImage) -> Self {
        let background = dominant_corner_tone(&image);
        MaskImage { image, background }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let image = image::open(path)
            .map_err(|err| {
                WcloudError::config(format!("unable to load mask {}: {err}", path.display()))
            })?
            .to_rgba8();

        Ok(Self::from_image(image))
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Occupancy buffer for the placement search: background pixels are
    /// pre-marked occupied, so only the silhouette accepts words.
    pub fn occupancy(&self) -> GrayImage {
        let mut buffer = GrayImage::from_pixel(self.image.width(), self.image.height(), Luma([0]));

        for (x, y, pixel) in self.image.enumerate_pixels() {
            if self.is_background(pixel) {
                buffer.put_pixel(x, y, Luma([1]));
            }
        }

        buffer
    }

    /// Nearest-pixel color sample, clamped to the raster bounds. Returns
    /// `None` when the sample lands on background tone.
    pub fn color_at(&self, x: u32, y: u32) -> Option<Rgba<u8>> {
        let x = x.min(self.image.width().saturating_sub(1));
        let y = y.min(self.image.height().saturating_sub(1));

        let pixel = *self.image.get_pixel(x, y);
        if self.is_background(&pixel) {
            None
        } else {
            Some(pixel)
        }
    }

    fn is_background(&self, pixel: &Rgba<u8>) -> bool {
        pixel
            .0
            .iter()
            .take(3)
            .zip(self.background.0.iter())
            .all(|(a, b)| a.abs_diff(*b) <= BACKGROUND_TOLERANCE)
    }
}

/// The background tone is whichever corner pixel value occurs most often.
fn dominant_corner_tone(image: &RgbaImage) -> Rgba<u8> {
    let (w, h) = (
        image.width().saturating_sub(1),
        image.height().saturating_sub(1),
    );
    let corners = [
        *image.get_pixel(0, 0),
        *image.get_pixel(w, 0),
        *image.get_pixel(0, h),
        *image.get_pixel(w, h),
    ];

    let mut best = corners[0];
    let mut best_count = 0;
    for candidate in corners {
        let count = corners.iter().filter(|c| c.0 == candidate.0).count();
        if count > best_count {
            best = candidate;
            best_count = count;
        }
    }

    best
}

#[cfg(test)]
mod tests {
    use image::{Luma, Rgba, RgbaImage};

    use super::MaskImage;

    const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);
    const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);

    fn heart_like_mask() -> MaskImage {
        let mut image = RgbaImage::from_pixel(8, 8, WHITE);
        // red block in the middle is the silhouette
        for y in 2..6 {
            for x in 2..6 {
                image.put_pixel(x, y, RED);
            }
        }
        MaskImage::from_image(image)
    }

    #[test]
    fn occupancy_blocks_background() {
        let mask = heart_like_mask();
        let occupancy = mask.occupancy();

        assert_eq!(occupancy.get_pixel(0, 0), &Luma([1]));
        assert_eq!(occupancy.get_pixel(3, 3), &Luma([0]));
    }

    #[test]
    fn color_sampling_follows_the_mask() {
        let mask = heart_like_mask();

        assert_eq!(mask.color_at(3, 3), Some(RED));
        assert_eq!(mask.color_at(0, 0), None);
    }

    #[test]
    fn out_of_bounds_samples_clamp() {
        let mask = heart_like_mask();
        assert_eq!(mask.color_at(100, 100), None);
    }

    #[test]
    fn near_background_pixels_count_as_background() {
        let mut image = RgbaImage::from_pixel(4, 4, WHITE);
        image.put_pixel(1, 1, Rgba([250, 250, 250, 255]));
        let mask = MaskImage::from_image(image);

        assert_eq!(mask.color_at(1, 1), None);
    }
}
