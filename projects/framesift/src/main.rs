mod cli;
mod inputs;

use anyhow::{Context, Result};
use cli::{Args, Command};
use framesift::error::MediaError;
use framesift::photos::{self, ImageInput};
use framesift::pipeline::{self, JobControl};
use framesift::video::{self, SampleRequest};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

fn main() -> Result<()> {
    // Load environment variables from .env if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt::init();

    let args = Args::parse_args();
    let config = args.to_config()?;
    let control = JobControl::new(config.timeout);

    match args.command {
        Command::Probe { video } => {
            let bytes = read_file(&video)?;
            let handle = video::probe(&bytes).map_err(media_error)?;
            print_json(&handle.metadata())?;
        }
        Command::Extract {
            video,
            start,
            end,
            interval,
            no_overlay_time,
            no_remove_shadows,
            output,
        } => {
            let bytes = read_file(&video)?;
            let request = SampleRequest::new(start, end, interval)
                .with_overlay_time(!no_overlay_time)
                .with_remove_shadows(!no_remove_shadows);

            let spinner = spinner(&format!("Extracting frames from {}", video.display()))?;
            let result = pipeline::extract_frames(&bytes, &request, &config, &control);
            spinner.finish_and_clear();
            let extraction = result.map_err(media_error)?;

            fs::write(&output, &extraction.archive)
                .with_context(|| format!("Failed to write archive: {}", output.display()))?;
            tracing::info!(
                "Wrote {} frames to {}",
                extraction.frame_count(),
                output.display()
            );
            print_json(&extraction.metadata)?;
        }
        Command::Classify { image } => {
            let name = image
                .file_name()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| image.display().to_string());
            let input = ImageInput::new(name, read_file(&image)?);
            let result = photos::classify_one(&input, &config, &control).map_err(media_error)?;
            print_json(&result)?;
        }
        Command::Sort { paths, archive } => {
            let images = inputs::collect_images(&paths)?;
            if images.is_empty() {
                anyhow::bail!("No images found in the given paths");
            }

            let spinner = spinner(&format!("Classifying {} images", images.len()))?;
            let result = photos::sort_batch(&images, &config, &control);
            spinner.finish_and_clear();
            let batch = result.map_err(media_error)?;

            if let Some(archive_path) = archive {
                let bytes = batch.archive(&images).map_err(media_error)?;
                fs::write(&archive_path, bytes).with_context(|| {
                    format!("Failed to write archive: {}", archive_path.display())
                })?;
                tracing::info!("Wrote sorted archive to {}", archive_path.display());
            }
            print_json(&batch.report)?;
        }
    }

    Ok(())
}

fn read_file(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Attach the user-facing message and stable code to a library error.
fn media_error(err: MediaError) -> anyhow::Error {
    let context = format!("{} [{}]", err.user_message(), err.kind().code());
    anyhow::Error::new(err).context(context)
}

fn spinner(message: &str) -> Result<ProgressBar> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg} [{elapsed}]")?
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ "),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(120));
    Ok(pb)
}
