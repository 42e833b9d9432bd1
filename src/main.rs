use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use wcloud_server::config::Settings;
use wcloud_server::web;

/// Chat-room word cloud HTTP service
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value_t = 9000)]
    port: u16,

    /// Stopword list, one word per line
    #[arg(long, default_value = "config/stopwords.txt")]
    stopwords: PathBuf,

    /// jieba user dictionary
    #[arg(long, default_value = "config/userdict.txt")]
    userdict: PathBuf,

    /// TrueType font used for words and the title
    #[arg(long, default_value = "config/font/jiangxizhuokai2.0.ttf")]
    font: PathBuf,

    /// Mask image bounding placement and driving recoloring
    #[arg(long, default_value = "config/templates/heart.jpg")]
    mask: PathBuf,

    /// Cloud background color (CSS color string)
    #[arg(long, default_value = "white")]
    background: String,

    /// Title text color (CSS color string)
    #[arg(long, default_value = "#ff0000")]
    title_color: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let settings = Settings {
        stopwords_path: args.stopwords,
        userdict_path: args.userdict,
        font_path: args.font,
        mask_path: args.mask,
        background_color: args.background,
        title_color: args.title_color,
        ..Settings::default()
    };

    let pipeline = settings.build_pipeline()?;

    info!(port = args.port, "API endpoint: POST /api/v1/word-cloud/gen");
    web::serve(pipeline, args.port).await?;

    Ok(())
}
