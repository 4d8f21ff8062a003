use anyhow::Context;
use clap::{Parser, Subcommand};
use inkstamp::config::Config;
use inkstamp::error::AppError;
use inkstamp::suggest::{Language, SuggestionClient, SuggestionService};
use inkstamp::watermark::{
    encode_png, export_file_name, load_image, Anchor, Color, Compositor, ImageLimits,
    WatermarkKind, WatermarkSettings,
};
use std::path::PathBuf;

/// Inkstamp - Text and image watermarks for photos
#[derive(Parser, Debug)]
#[command(name = "inkstamp")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Composite a watermark over an image and write a PNG
    Render(RenderArgs),
    /// Ask for watermark text ideas for an image
    Suggest(SuggestArgs),
}

#[derive(clap::Args, Debug)]
struct RenderArgs {
    /// Base image (PNG, JPEG or WebP)
    input: PathBuf,

    /// Output path (default: watermarked-<unix-ms>.png)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Watermark text
    #[arg(long, conflicts_with = "image")]
    text: Option<String>,

    /// Watermark image
    #[arg(long)]
    image: Option<PathBuf>,

    /// Image width as a percentage of the base width (1-100)
    #[arg(long)]
    scale: Option<f32>,

    /// Text color (#RGB, #RRGGBB or #RRGGBBAA)
    #[arg(long)]
    color: Option<Color>,

    /// Opacity (0-1]
    #[arg(long)]
    opacity: Option<f32>,

    /// Text size as a percentage of the base width (1-30)
    #[arg(long)]
    font_size: Option<f32>,

    /// Clockwise rotation in degrees (-180 to 180)
    #[arg(long, allow_hyphen_values = true)]
    rotation: Option<i32>,

    /// Repeat the watermark across the image
    #[arg(long)]
    tiled: bool,

    /// Anchor for single placement (tl, tc, tr, cl, cc, cr, bl, bc, br)
    #[arg(long)]
    anchor: Option<Anchor>,

    /// Tile spacing (0-100)
    #[arg(long)]
    gap: Option<f32>,
}

#[derive(clap::Args, Debug)]
struct SuggestArgs {
    /// Image to describe
    input: PathBuf,

    /// Suggestion language (en or zh)
    #[arg(long, default_value = "en")]
    lang: Language,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = Config::load(args.config.as_deref())
        .map_err(AppError::Config)
        .context("Failed to load configuration")?;

    inkstamp::logging::init_subscriber(&config.logging)
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging subsystem: {}", e))?;

    tracing::debug!(
        config_file = ?args.config,
        tiling = ?config.render.tiling,
        "Configuration loaded successfully"
    );

    match args.command {
        Command::Render(render) => {
            let output = run_render(&config, render).context("Render failed")?;
            println!("{}", output.display());
        }
        Command::Suggest(suggest) => {
            let suggestions = run_suggest(&config, suggest)
                .await
                .context("Suggestion failed")?;
            for suggestion in suggestions {
                println!("{}", suggestion);
            }
        }
    }

    Ok(())
}

fn run_render(config: &Config, args: RenderArgs) -> Result<PathBuf, AppError> {
    let limits = &config.render.limits;
    let base = load_image(&args.input, limits)?;
    let settings = apply_render_args(&config.watermark, &args, limits)?;

    settings.validate().map_err(AppError::Config)?;

    let compositor = Compositor::with_policy(config.render.tiling);
    let (output, report) = compositor.render_image(&base, &settings);

    tracing::info!(
        input = %args.input.display(),
        width = base.width(),
        height = base.height(),
        mode = ?report.mode,
        tiles = report.tiles_drawn,
        capped = report.capped,
        "Watermark applied"
    );

    let path = args
        .output
        .unwrap_or_else(|| PathBuf::from(export_file_name(chrono::Utc::now())));
    std::fs::write(&path, encode_png(&output)?)?;

    Ok(path)
}

/// Layer command-line flags over the configured default settings.
fn apply_render_args(
    defaults: &WatermarkSettings,
    args: &RenderArgs,
    limits: &ImageLimits,
) -> Result<WatermarkSettings, AppError> {
    let mut settings = defaults.clone();

    if let Some(text) = &args.text {
        settings = settings.with_kind(WatermarkKind::Text).with_text(text.as_str());
    }
    if let Some(path) = &args.image {
        settings = settings
            .with_kind(WatermarkKind::Image)
            .with_watermark_image(load_image(path, limits)?);
    }
    if let Some(scale) = args.scale {
        settings = settings.with_image_scale(scale);
    }
    if let Some(color) = args.color {
        settings = settings.with_color(color);
    }
    if let Some(opacity) = args.opacity {
        settings = settings.with_opacity(opacity);
    }
    if let Some(font_size) = args.font_size {
        settings = settings.with_font_size(font_size);
    }
    if let Some(rotation) = args.rotation {
        settings = settings.with_rotation(rotation);
    }
    if args.tiled {
        settings = settings.with_tiled(true);
    }
    if let Some(anchor) = args.anchor {
        settings = settings.with_anchor(anchor);
    }
    if let Some(gap) = args.gap {
        settings = settings.with_gap(gap);
    }

    Ok(settings)
}

async fn run_suggest(config: &Config, args: SuggestArgs) -> Result<Vec<String>, AppError> {
    let image = load_image(&args.input, &config.render.limits)?;

    if config.suggestions.api_key().is_none() {
        tracing::warn!("No API key configured, suggestions will use the built-in list");
    }

    let service = SuggestionService::new(SuggestionClient::new(config.suggestions.clone())?);
    Ok(service.suggest(&image, args.lang).await?)
}
