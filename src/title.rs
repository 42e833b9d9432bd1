use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Duration, NaiveDate};
use image::{imageops, Rgba, RgbaImage};

use crate::error::WcloudError;

/// Extra height added above the cloud for the title band.
pub const TITLE_BAND_HEIGHT: u32 = 100;
pub const TITLE_FONT_SIZE: f32 = 32.0;

/// Which historical bucket the word cloud describes. Labels are always
/// derived from the wall clock passed in, never from generation metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeMode {
    #[default]
    Yesterday,
    Week,
    Month,
    Year,
}

impl TimeMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeMode::Yesterday => "yesterday",
            TimeMode::Week => "week",
            TimeMode::Month => "month",
            TimeMode::Year => "year",
        }
    }

    /// Human-readable period label used in the image title.
    ///
    /// The week and year forms keep the legacy arithmetic of the service
    /// this replaces: the ISO week is decremented without rolling back
    /// across year starts (week 0 is possible), and the year form only
    /// crosses into the previous year during January.
    pub fn title_label(&self, now: NaiveDate) -> String {
        match self {
            TimeMode::Yesterday => (now - Duration::days(1)).format("%Y年%m月%d日").to_string(),
            TimeMode::Week => {
                let iso = now.iso_week();
                format!("{}年第{}周", iso.year(), iso.week() as i32 - 1)
            }
            TimeMode::Month => prev_month_end(now).format("%Y年%m月").to_string(),
            TimeMode::Year => prev_month_end(now).format("%Y年").to_string(),
        }
    }

    /// Compact period label used in the download filename. Same arithmetic
    /// as [`TimeMode::title_label`], without the Chinese text.
    pub fn compact_label(&self, now: NaiveDate) -> String {
        match self {
            TimeMode::Yesterday => (now - Duration::days(1)).format("%Y%m%d").to_string(),
            TimeMode::Week => {
                let iso = now.iso_week();
                format!("{}{}", iso.year(), iso.week() as i32 - 1)
            }
            TimeMode::Month => prev_month_end(now).format("%Y%m").to_string(),
            TimeMode::Year => prev_month_end(now).year().to_string(),
        }
    }

    pub fn title_text(&self, now: NaiveDate) -> String {
        format!("{} 词云", self.title_label(now))
    }
}

impl fmt::Display for TimeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TimeMode {
    type Err = WcloudError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "yesterday" => Ok(TimeMode::Yesterday),
            "week" => Ok(TimeMode::Week),
            "month" => Ok(TimeMode::Month),
            "year" => Ok(TimeMode::Year),
            other => Err(WcloudError::Validation(format!(
                "invalid mode {other:?}, must be one of: yesterday, week, month, year"
            ))),
        }
    }
}

/// Last day of the previous month.
fn prev_month_end(now: NaiveDate) -> NaiveDate {
    now.with_day(1).unwrap_or(now) - Duration::days(1)
}

/// White canvas with a [`TITLE_BAND_HEIGHT`] band above the cloud. The title
/// text itself is drawn by the renderer.
pub fn compose_band(cloud: &RgbaImage) -> RgbaImage {
    let (width, height) = cloud.dimensions();
    let mut canvas = RgbaImage::from_pixel(
        width,
        height + TITLE_BAND_HEIGHT,
        Rgba([255, 255, 255, 255]),
    );
    imageops::replace(&mut canvas, cloud, 0, TITLE_BAND_HEIGHT as i64);

    canvas
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use image::{Rgba, RgbaImage};

    use super::{compose_band, TimeMode, TITLE_BAND_HEIGHT};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn yesterday_labels() {
        let now = date(2024, 1, 15);
        assert_eq!(TimeMode::Yesterday.title_label(now), "2024年01月14日");
        assert_eq!(TimeMode::Yesterday.compact_label(now), "20240114");
    }

    #[test]
    fn week_labels_use_simple_subtraction() {
        // 2024-01-15 is the Monday starting ISO week 3
        let now = date(2024, 1, 15);
        assert_eq!(TimeMode::Week.title_label(now), "2024年第2周");
        assert_eq!(TimeMode::Week.compact_label(now), "20242");
    }

    #[test]
    fn week_zero_at_the_year_start_is_preserved() {
        // 2024-01-01 falls in ISO week 1
        let now = date(2024, 1, 1);
        assert_eq!(TimeMode::Week.title_label(now), "2024年第0周");
        assert_eq!(TimeMode::Week.compact_label(now), "20240");
    }

    #[test]
    fn month_labels_point_at_the_previous_month() {
        let now = date(2024, 1, 15);
        assert_eq!(TimeMode::Month.title_label(now), "2023年12月");
        assert_eq!(TimeMode::Month.compact_label(now), "202312");
    }

    #[test]
    fn year_label_only_crosses_back_in_january() {
        assert_eq!(TimeMode::Year.compact_label(date(2024, 1, 15)), "2023");
        // outside January the legacy arithmetic stays in the current year
        assert_eq!(TimeMode::Year.compact_label(date(2024, 6, 15)), "2024");
        assert_eq!(TimeMode::Year.title_label(date(2024, 6, 15)), "2024年");
    }

    #[test]
    fn title_text_appends_the_suffix() {
        let now = date(2024, 1, 15);
        assert_eq!(TimeMode::Yesterday.title_text(now), "2024年01月14日 词云");
    }

    #[test]
    fn mode_parsing() {
        assert_eq!("week".parse::<TimeMode>().unwrap(), TimeMode::Week);
        assert!("decade".parse::<TimeMode>().is_err());
        assert_eq!(TimeMode::default(), TimeMode::Yesterday);
    }

    #[test]
    fn band_sits_above_the_cloud() {
        let cloud = RgbaImage::from_pixel(40, 30, Rgba([1, 2, 3, 255]));
        let composite = compose_band(&cloud);

        assert_eq!(composite.width(), 40);
        assert_eq!(composite.height(), 30 + TITLE_BAND_HEIGHT);
        assert_eq!(composite.get_pixel(0, 0), &Rgba([255, 255, 255, 255]));
        assert_eq!(
            composite.get_pixel(0, TITLE_BAND_HEIGHT),
            &Rgba([1, 2, 3, 255])
        );
    }
}
