use std::{fs, path::Path};

use ab_glyph::{point, FontVec, Point, PxScale};
use image::{Rgba, RgbaImage};
use nanorand::{Rng, WyRand};
use palette::{Hsl, IntoColor, Pixel, Srgb};

use crate::error::{Result, WcloudError};
use crate::text::GlyphData;

pub mod config;
pub mod error;
pub mod mask;
pub mod pipeline;
mod sat;
mod text;
pub mod title;
pub mod tokenizer;
pub mod web;

pub use mask::MaskImage;
pub use title::TimeMode;
pub use tokenizer::{ChineseTokenizer, WordCount};

/// Layout knobs shared by every invocation. Changing any value changes the
/// produced image, so the defaults are part of the output contract.
#[derive(Clone, Debug)]
pub struct RenderConfig {
    pub max_font_size: f32,
    pub random_seed: u64,
    pub top_n: usize,
    pub background_color: Rgba<u8>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        RenderConfig {
            max_font_size: 600.0,
            random_seed: 100,
            top_n: 100,
            background_color: Rgba([255, 255, 255, 255]),
        }
    }
}

/// The glyph-touching surface of the pipeline. Production rendering lives in
/// [`WordCloud`]; tests substitute a deterministic fake so layout properties
/// are checkable without rasterizing real glyphs.
pub trait CloudRenderer: Send + Sync {
    /// Renders the ranked words into the mask silhouette. `None` means there
    /// was nothing to lay out.
    fn render_cloud(
        &self,
        ranked: &[WordCount],
        mask: &MaskImage,
        config: &RenderConfig,
    ) -> Option<RgbaImage>;

    /// Draws the title centered in the band at the top of `canvas`.
    fn draw_title(&self, canvas: &mut RgbaImage, title: &str);
}

struct PlacedWord {
    glyphs: GlyphData,
    position: Point,
}

pub struct WordCloud {
    pub font: FontVec,
    min_font_size: f32,
    font_step: f32,
    word_margin: u32,
    relative_font_scaling: f32,
    title_color: Rgba<u8>,
}

impl WordCloud {
    pub fn new(font: FontVec) -> Self {
        WordCloud {
            font,
            min_font_size: 4.0,
            font_step: 1.0,
            word_margin: 2,
            relative_font_scaling: 0.5,
            title_color: Rgba([255, 0, 0, 255]),
        }
    }

    pub fn from_font_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|err| {
            WcloudError::config(format!("unable to read font {}: {err}", path.display()))
        })?;
        let font = FontVec::try_from_vec(bytes).map_err(|err| {
            WcloudError::config(format!("invalid font {}: {err}", path.display()))
        })?;

        Ok(WordCloud::new(font))
    }

    pub fn with_title_color(mut self, color: Rgba<u8>) -> Self {
        self.title_color = color;
        self
    }

    fn text_dimensions_at_font_size(&self, text: &str, font_size: PxScale) -> sat::Rect {
        let glyphs = text::text_to_glyphs(text, &self.font, font_size);
        sat::Rect {
            width: glyphs.width + self.word_margin,
            height: glyphs.height + self.word_margin,
        }
    }

    /// Starting size for the largest word, derived from the canvas aspect.
    fn initial_font_size(&self, word: &str, width: u32, height: u32, cap: f32) -> f32 {
        //使用第一个词的长宽来作为参考
        let rect_at_image_height =
            self.text_dimensions_at_font_size(word, PxScale::from(height as f32 * 0.95));

        let height_ratio = rect_at_image_height.height as f32 / rect_at_image_height.width as f32;

        (width as f32 * height_ratio).min(cap)
    }
}

impl CloudRenderer for WordCloud {
    fn render_cloud(
        &self,
        ranked: &[WordCount],
        mask: &MaskImage,
        config: &RenderConfig,
    ) -> Option<RgbaImage> {
        if ranked.is_empty() {
            return None;
        }

        let words = &ranked[..ranked.len().min(config.top_n)];

        let mut gray = mask.occupancy();
        let (width, height) = gray.dimensions();
        if width == 0 || height == 0 {
            return None;
        }

        let mut rng = WyRand::new_seed(config.random_seed);

        let max_count = words[0].count as f32;
        let mut last_font_size =
            self.initial_font_size(&words[0].word, width, height, config.max_font_size);
        let mut last_frequency = 1.0_f32;

        let mut placed: Vec<PlacedWord> = Vec::with_capacity(words.len());

        for (index, word_count) in words.iter().enumerate() {
            let frequency = word_count.count as f32 / max_count;

            let mut font_size = if index == 0 {
                last_font_size
            } else {
                let scaled = last_font_size
                    * (self.relative_font_scaling * (frequency / last_frequency)
                        + (1.0 - self.relative_font_scaling));
                scaled.min(config.max_font_size)
            };

            let mut placement = None;
            while font_size >= self.min_font_size {
                let glyphs =
                    text::text_to_glyphs(&word_count.word, &self.font, PxScale::from(font_size));
                let rect = sat::Rect {
                    width: glyphs.width + self.word_margin,
                    height: glyphs.height + self.word_margin,
                };

                if rect.width < width && rect.height < height {
                    let table = sat::to_summed_area_table(&gray);
                    if let Some(pos) =
                        sat::find_space_for_rect(&table, width, height, &rect, &mut rng)
                    {
                        placement = Some((glyphs, pos));
                        break;
                    }
                }

                //放不下就缩小再试
                font_size -= self.font_step;
            }

            let (glyphs, pos) = match placement {
                Some(placement) => placement,
                // 实在放不下的词直接丢弃
                None => continue,
            };

            let half_margin = (self.word_margin / 2) as f32;
            let position = point(pos.x as f32 + half_margin, pos.y as f32 + half_margin);

            text::draw_glyphs_to_gray_buffer(&mut gray, glyphs.clone(), &self.font, position);

            placed.push(PlacedWord { glyphs, position });
            last_font_size = font_size;
            last_frequency = frequency;
        }

        // Recolor every placed word from the mask sample at its centroid,
        // then composite over the background color.
        let mut image = RgbaImage::from_pixel(width, height, config.background_color);
        for word in placed {
            let center_x = word.position.x as u32 + word.glyphs.width / 2;
            let center_y = word.position.y as u32 + word.glyphs.height / 2;

            let color = match mask.color_at(center_x, center_y) {
                Some(color) => color,
                None => grayscale_color_rgba(&mut rng),
            };

            text::draw_glyphs_to_rgba_buffer(&mut image, word.glyphs, &self.font, word.position, color);
        }

        Some(image)
    }

    fn draw_title(&self, canvas: &mut RgbaImage, title: &str) {
        let glyphs = text::text_to_glyphs(title, &self.font, PxScale::from(title::TITLE_FONT_SIZE));

        let x = canvas.width().saturating_sub(glyphs.width) as f32 / 2.0;
        let y = title::TITLE_BAND_HEIGHT.saturating_sub(glyphs.height) as f32 / 2.0;

        text::draw_glyphs_to_rgba_buffer(canvas, glyphs, &self.font, point(x, y), self.title_color);
    }
}

/// Fallback for centroids that land on background tone.
fn grayscale_color_rgba(rng: &mut WyRand) -> Rgba<u8> {
    let lightness: u8 = rng.generate_range(40..100);

    let col = Hsl::new(0.0, 0.0, lightness as f32 / 100.0);
    let rgb: Srgb = col.into_color();

    let raw: [u8; 3] = rgb.into_format().into_raw();

    Rgba([raw[0], raw[1], raw[2], 255])
}

#[cfg(test)]
mod tests {
    use nanorand::WyRand;

    use super::{grayscale_color_rgba, RenderConfig};

    #[test]
    fn render_config_defaults_match_the_service_contract() {
        let config = RenderConfig::default();

        assert_eq!(config.max_font_size, 600.0);
        assert_eq!(config.random_seed, 100);
        assert_eq!(config.top_n, 100);
        assert_eq!(config.background_color.0, [255, 255, 255, 255]);
    }

    #[test]
    fn fallback_color_is_seeded() {
        let a = grayscale_color_rgba(&mut WyRand::new_seed(100));
        let b = grayscale_color_rgba(&mut WyRand::new_seed(100));
        assert_eq!(a, b);
    }
}
