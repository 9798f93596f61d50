use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use cutout_core::{
    Config, CutoutEditor, HttpSegmentationClient, Point, RequestOutcome, SelectionMode,
    editor::DEFAULT_DOWNLOAD_NAME,
    id_photo::{self, BgColor, PhotoSize},
    image_processing::ImageProcessor,
    init,
    layout::RenderedRect,
};
use log::info;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Override the service base URL defined in .env
    #[arg(long, global = true)]
    api: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Remove the background, optionally cropped to a selection
    Segment {
        input: PathBuf,

        /// Rectangle selection in image pixels
        #[arg(
            long,
            num_args = 4,
            value_names = ["X", "Y", "W", "H"],
            allow_negative_numbers = true,
            conflicts_with = "contour"
        )]
        rect: Option<Vec<f32>>,

        /// JSON file with contour strokes: [[{"x": 1, "y": 2}, ...], ...]
        #[arg(long)]
        contour: Option<PathBuf>,

        /// Output file or directory
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Produce an ID photo on a solid background
    IdPhoto {
        input: PathBuf,

        /// white, blue or red
        #[arg(long, default_value = "blue")]
        bg: BgColor,

        /// 1inch, 2inch, small or big
        #[arg(long, default_value = "1inch")]
        size: PhotoSize,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Run only the local downscale and re-encode step
    Preprocess {
        input: PathBuf,

        #[arg(short, long)]
        output: Option<PathBuf>,

        #[arg(long)]
        max_edge: Option<u32>,

        /// Encoder quality between 0 and 1
        #[arg(long)]
        quality: Option<f32>,
    },

    /// Check that the segmentation service is reachable
    Health,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Setup
    init();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut config = Config::load().context("Failed to load configuration")?;
    if let Some(api) = args.api {
        config = Config::builder()
            .with_base_url(api)
            .with_timeout(config.request_timeout)
            .with_max_edge(config.preprocess.max_edge)
            .with_quality(config.preprocess.quality)
            .with_format(config.preprocess.format)
            .build()
            .context("Invalid --api URL")?;
    }

    match args.command {
        Command::Segment {
            input,
            rect,
            contour,
            output,
        } => {
            let editor = open_editor(&config, &input)?;
            if let Some(rect) = rect {
                select_rect(&editor, &rect);
            } else if let Some(path) = contour {
                select_contour(&editor, &path)?;
            }

            confirm(&editor).await?;
            let target = output.unwrap_or_else(|| PathBuf::from(DEFAULT_DOWNLOAD_NAME));
            let written = editor.download(&target).context("Failed to save result")?;
            println!("{}", written.display());
        }
        Command::IdPhoto {
            input,
            bg,
            size,
            output,
        } => {
            let editor = open_editor(&config, &input)?;
            confirm(&editor).await?;

            let bytes = editor.result_bytes().context("No result to compose")?;
            let cutout = ImageProcessor::decode(&bytes)?;
            let photo = id_photo::compose_jpeg(&cutout, bg, size).context("Failed to compose ID photo")?;

            let target = resolve_output(output, &id_photo::file_name(bg, size));
            fs::write(&target, photo).with_context(|| format!("Failed to write {}", target.display()))?;
            println!("{}", target.display());
        }
        Command::Preprocess {
            input,
            output,
            max_edge,
            quality,
        } => {
            let mut options = config.preprocess;
            if let Some(edge) = max_edge {
                options.max_edge = edge;
            }
            if let Some(q) = quality {
                options.quality = q;
            }

            let bytes = read_input(&input)?;
            let result = ImageProcessor::preprocess(&bytes, &options).context("Failed to preprocess image")?;
            info!(
                "{:?} -> {:?}, {:.2}x smaller",
                result.original_size, result.processed_size, result.compression_ratio
            );

            let name = format!("preprocessed.{}", options.format.extension());
            let target = resolve_output(output, &name);
            fs::write(&target, &result.bytes).with_context(|| format!("Failed to write {}", target.display()))?;
            println!("{}", target.display());
        }
        Command::Health => {
            let client = HttpSegmentationClient::new(&config)?;
            let status = client
                .health_check()
                .await
                .with_context(|| format!("Service at {} is not healthy", config.api_base_url))?;
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
    }

    Ok(())
}

fn read_input(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn resolve_output(output: Option<PathBuf>, default_name: &str) -> PathBuf {
    match output {
        Some(path) if path.is_dir() => path.join(default_name),
        Some(path) => path,
        None => PathBuf::from(default_name),
    }
}

/// Loads the image and lays the canvas out at natural size, so pointer
/// positions are image pixels.
fn open_editor(config: &Config, input: &Path) -> Result<CutoutEditor<HttpSegmentationClient>> {
    let client = HttpSegmentationClient::new(config)?;
    let editor = CutoutEditor::new(client, config);
    let source = editor
        .load_image(read_input(input)?)
        .with_context(|| format!("{} is not a supported image", input.display()))?;

    editor.on_viewport_resized(RenderedRect {
        left: 0.0,
        top: 0.0,
        width: source.width as f32,
        height: source.height as f32,
    });
    Ok(editor)
}

fn select_rect(editor: &CutoutEditor<HttpSegmentationClient>, rect: &[f32]) {
    let [x, y, w, h] = [rect[0], rect[1], rect[2], rect[3]];
    editor.set_mode(SelectionMode::Rectangle);
    editor.on_pointer_down(Point::new(x, y));
    editor.on_pointer_move(Point::new(x + w, y + h));
    editor.on_pointer_up();
}

fn select_contour(editor: &CutoutEditor<HttpSegmentationClient>, path: &Path) -> Result<()> {
    let raw = fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let strokes: Vec<Vec<Point>> =
        serde_json::from_str(&raw).with_context(|| format!("{} is not a list of strokes", path.display()))?;

    editor.set_mode(SelectionMode::Contour);
    for stroke in strokes {
        let mut points = stroke.into_iter();
        let Some(first) = points.next() else {
            continue;
        };
        editor.on_pointer_down(first);
        for point in points {
            editor.on_pointer_move(point);
        }
        editor.on_pointer_up();
    }
    Ok(())
}

async fn confirm(editor: &CutoutEditor<HttpSegmentationClient>) -> Result<()> {
    match editor.confirm_selection().await {
        Ok(RequestOutcome::Published(result)) => {
            info!("received {}x{} cutout", result.width, result.height);
            Ok(())
        }
        Ok(RequestOutcome::Discarded { request_id }) => bail!("Request {} was superseded", request_id),
        Err(err) => {
            let message = err.user_message().unwrap_or("Request failed");
            Err(anyhow::Error::new(err).context(message))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rect_accepts_negative_origin() {
        let args = Args::try_parse_from(["cutout-cli", "segment", "in.png", "--rect", "-5", "-2.5", "40", "40"]).unwrap();
        match args.command {
            Command::Segment { rect, .. } => assert_eq!(rect, Some(vec![-5.0, -2.5, 40.0, 40.0])),
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn rect_and_contour_are_exclusive() {
        let parsed = Args::try_parse_from([
            "cutout-cli", "segment", "in.png", "--rect", "0", "0", "40", "40", "--contour", "c.json",
        ]);
        assert!(parsed.is_err());
    }
}
