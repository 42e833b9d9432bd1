use std::fs;
use std::io::{Cursor, Write};
use std::path::Path;

use chrono::NaiveDate;
use image::{DynamicImage, ImageOutputFormat};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::error::{Result, WcloudError};
use crate::mask::MaskImage;
use crate::title::{self, TimeMode};
use crate::tokenizer::ChineseTokenizer;
use crate::{CloudRenderer, RenderConfig};

/// Everything a request needs, loaded once at startup and shared read-only.
/// Each invocation owns its working buffers and its own seeded rng, so
/// concurrent requests never share mutable state.
pub struct Pipeline {
    pub tokenizer: ChineseTokenizer,
    pub mask: MaskImage,
    pub renderer: Box<dyn CloudRenderer>,
    pub config: RenderConfig,
}

/// Owned handle to the rendered PNG. The backing temp file is removed when
/// the handle is dropped, which covers every exit path; [`RenderedCloud::close`]
/// removes it eagerly and reports failures so the caller can log them.
#[derive(Debug)]
pub struct RenderedCloud {
    temp: NamedTempFile,
    pub download_name: String,
}

impl RenderedCloud {
    pub fn path(&self) -> &Path {
        self.temp.path()
    }

    pub fn bytes(&self) -> Result<Vec<u8>> {
        Ok(fs::read(self.temp.path())?)
    }

    pub fn close(self) -> std::io::Result<()> {
        self.temp.close()
    }
}

impl Pipeline {
    /// Runs the whole text-to-image pipeline for one request:
    /// tokenize → filter/count → lay out → title → encode.
    pub fn generate(
        &self,
        content: &str,
        chat_room_id: &str,
        mode: TimeMode,
        now: NaiveDate,
    ) -> Result<RenderedCloud> {
        let ranked = self.tokenizer.count_words(content);
        info!(chat_room_id, distinct = ranked.len(), "counted words");

        if ranked.is_empty() {
            return Err(WcloudError::EmptyResult);
        }

        let cloud = self
            .renderer
            .render_cloud(&ranked, &self.mask, &self.config)
            .ok_or(WcloudError::EmptyResult)?;

        let mut composite = title::compose_band(&cloud);
        self.renderer.draw_title(&mut composite, &mode.title_text(now));

        let mut png = Vec::new();
        DynamicImage::ImageRgba8(composite)
            .write_to(&mut Cursor::new(&mut png), ImageOutputFormat::Png)?;

        let mut temp = tempfile::Builder::new()
            .prefix("wcloud-")
            .suffix(".png")
            .tempfile()?;
        temp.write_all(&png)?;
        temp.flush()?;

        debug!(chat_room_id, path = %temp.path().display(), "wrote transient artifact");

        let download_name = format!("{}_{}.png", mode.compact_label(now), chat_room_id);

        Ok(RenderedCloud {
            temp,
            download_name,
        })
    }
}


#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::testing::test_pipeline;
    use crate::error::WcloudError;
    use crate::title::{TimeMode, TITLE_BAND_HEIGHT};

    fn now() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()
    }

    #[test]
    fn identical_inputs_produce_identical_bytes() {
        let pipeline = test_pipeline();

        let a = pipeline
            .generate("测试 测试 词云 词云 词云", "room1", TimeMode::Yesterday, now())
            .unwrap();
        let b = pipeline
            .generate("测试 测试 词云 词云 词云", "room1", TimeMode::Yesterday, now())
            .unwrap();

        assert_eq!(a.bytes().unwrap(), b.bytes().unwrap());
    }

    #[test]
    fn stopword_only_content_reports_empty_result() {
        let pipeline = test_pipeline();

        let err = pipeline
            .generate("的 了 是 a b", "room1", TimeMode::Yesterday, now())
            .unwrap_err();

        assert!(matches!(err, WcloudError::EmptyResult));
    }

    #[test]
    fn composite_is_cloud_height_plus_band() {
        let pipeline = test_pipeline();

        let artifact = pipeline
            .generate("词云 词云", "room1", TimeMode::Yesterday, now())
            .unwrap();
        let decoded = image::load_from_memory(&artifact.bytes().unwrap()).unwrap();

        assert_eq!(decoded.width(), pipeline.mask.width());
        assert_eq!(
            decoded.height(),
            pipeline.mask.height() + TITLE_BAND_HEIGHT
        );
    }

    #[test]
    fn download_name_uses_the_compact_period() {
        let pipeline = test_pipeline();

        let artifact = pipeline
            .generate("词云 词云", "room42", TimeMode::Month, now())
            .unwrap();

        assert_eq!(artifact.download_name, "202312_room42.png");
    }

    #[test]
    fn artifact_is_removed_on_close() {
        let pipeline = test_pipeline();

        let artifact = pipeline
            .generate("词云 词云", "room1", TimeMode::Yesterday, now())
            .unwrap();
        let path = artifact.path().to_path_buf();
        assert!(path.exists());

        artifact.close().unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn artifact_is_removed_on_drop() {
        let pipeline = test_pipeline();

        let artifact = pipeline
            .generate("词云 词云", "room1", TimeMode::Yesterday, now())
            .unwrap();
        let path = artifact.path().to_path_buf();

        drop(artifact);
        assert!(!path.exists());
    }
}
