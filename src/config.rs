use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use image::Rgba;
use tracing::info;

use crate::error::{Result, WcloudError};
use crate::mask::MaskImage;
use crate::pipeline::Pipeline;
use crate::tokenizer::ChineseTokenizer;
use crate::{RenderConfig, WordCloud};

/// Resource paths and layout knobs, resolved once at startup. The defaults
/// mirror the deployment layout this service replaces.
#[derive(Clone, Debug)]
pub struct Settings {
    pub stopwords_path: PathBuf,
    pub userdict_path: PathBuf,
    pub font_path: PathBuf,
    pub mask_path: PathBuf,
    pub background_color: String,
    pub title_color: String,
    pub max_font_size: f32,
    pub random_seed: u64,
    pub top_n: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            stopwords_path: PathBuf::from("config/stopwords.txt"),
            userdict_path: PathBuf::from("config/userdict.txt"),
            font_path: PathBuf::from("config/font/jiangxizhuokai2.0.ttf"),
            mask_path: PathBuf::from("config/templates/heart.jpg"),
            background_color: "white".to_string(),
            title_color: "#ff0000".to_string(),
            max_font_size: 600.0,
            random_seed: 100,
            top_n: 100,
        }
    }
}

impl Settings {
    /// Loads every external resource and assembles the immutable pipeline.
    /// Any missing or corrupt resource fails startup with a `Config` error.
    pub fn build_pipeline(&self) -> Result<Pipeline> {
        let stopwords = load_stopwords(&self.stopwords_path)?;
        let user_words = load_user_dict(&self.userdict_path)?;

        info!(
            stopwords = stopwords.len(),
            user_words = user_words.len(),
            "loaded dictionaries"
        );

        let tokenizer = ChineseTokenizer::default()
            .with_stopwords(stopwords)
            .with_user_words(&user_words);

        let mask = MaskImage::load(&self.mask_path)?;
        info!(mask = %self.mask_path.display(), width = mask.width(), height = mask.height(), "loaded mask");

        let renderer = WordCloud::from_font_path(&self.font_path)?
            .with_title_color(parse_color(&self.title_color)?);

        let config = RenderConfig {
            max_font_size: self.max_font_size,
            random_seed: self.random_seed,
            top_n: self.top_n,
            background_color: parse_color(&self.background_color)?,
        };

        Ok(Pipeline {
            tokenizer,
            mask,
            renderer: Box::new(renderer),
            config,
        })
    }
}

pub fn parse_color(value: &str) -> Result<Rgba<u8>> {
    let color = csscolorparser::parse(value)
        .map_err(|err| WcloudError::config(format!("invalid color {value:?}: {err}")))?;

    Ok(Rgba(color.to_rgba8()))
}

fn load_stopwords(path: &Path) -> Result<HashSet<String>> {
    let contents = fs::read_to_string(path).map_err(|err| {
        WcloudError::config(format!("unable to read stopwords {}: {err}", path.display()))
    })?;

    Ok(contents
        .lines()
        .map(|line| line.trim().to_lowercase())
        .filter(|line| !line.is_empty())
        .collect())
}

/// jieba user-dictionary lines are `word [freq] [tag]`; only the word column
/// matters here.
fn load_user_dict(path: &Path) -> Result<Vec<String>> {
    let contents = fs::read_to_string(path).map_err(|err| {
        WcloudError::config(format!("unable to read user dictionary {}: {err}", path.display()))
    })?;

    Ok(contents
        .lines()
        .filter_map(|line| line.split_whitespace().next())
        .map(str::to_string)
        .collect())
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::{load_stopwords, load_user_dict, parse_color};
    use crate::error::WcloudError;

    #[test]
    fn colors_parse_from_css_strings() {
        assert_eq!(parse_color("white").unwrap().0, [255, 255, 255, 255]);
        assert_eq!(parse_color("#ff0000").unwrap().0, [255, 0, 0, 255]);
        assert!(matches!(
            parse_color("not-a-color"),
            Err(WcloudError::Config(_))
        ));
    }

    #[test]
    fn stopwords_are_trimmed_and_lowercased() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "  The\n的\n\n了  ").unwrap();

        let stopwords = load_stopwords(file.path()).unwrap();
        assert!(stopwords.contains("the"));
        assert!(stopwords.contains("的"));
        assert!(stopwords.contains("了"));
        assert_eq!(stopwords.len(), 3);
    }

    #[test]
    fn user_dict_keeps_only_the_word_column() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "词云 5 n\n奥利给\n").unwrap();

        let words = load_user_dict(file.path()).unwrap();
        assert_eq!(words, vec!["词云".to_string(), "奥利给".to_string()]);
    }

    #[test]
    fn missing_files_are_config_errors() {
        let err = load_stopwords("does/not/exist.txt".as_ref()).unwrap_err();
        assert!(matches!(err, WcloudError::Config(_)));
    }
}
