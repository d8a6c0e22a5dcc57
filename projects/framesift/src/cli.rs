use anyhow::Result;
use clap::{Parser, Subcommand};
use framesift::config::{
    ClassifierThresholds, ProcessingConfig, COLORFUL_PERCENT_THRESHOLD, DEFAULT_INTERVAL_SECONDS,
    DEFAULT_MAX_IMAGE_PIXELS, DEFAULT_MAX_SAMPLES, SATURATION_THRESHOLD,
};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Worker threads for annotation and classification [default: CPU count]
    #[arg(long, global = true, env = "FRAMESIFT_WORKERS")]
    pub workers: Option<usize>,

    /// Give up on a job after this many seconds
    #[arg(long, global = true, env = "FRAMESIFT_TIMEOUT_SECS")]
    pub timeout_secs: Option<f64>,

    /// Most frames a single extraction may produce
    #[arg(long, global = true, env = "FRAMESIFT_MAX_SAMPLES", default_value_t = DEFAULT_MAX_SAMPLES)]
    pub max_samples: usize,

    /// Largest image (width * height) the classifier will decode
    #[arg(long, global = true, env = "FRAMESIFT_MAX_IMAGE_PIXELS", default_value_t = DEFAULT_MAX_IMAGE_PIXELS)]
    pub max_image_pixels: u64,

    /// Channel spread above which a pixel counts as colorful
    #[arg(long, global = true, env = "COLOR_THRESHOLD", default_value_t = SATURATION_THRESHOLD)]
    pub color_threshold: u8,

    /// Percentage of colorful pixels above which an image is colorful
    #[arg(long, global = true, env = "COLORFUL_PERCENT_THRESHOLD", default_value_t = COLORFUL_PERCENT_THRESHOLD)]
    pub colorful_percent_threshold: f64,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print duration, frame rate and size of a video
    Probe { video: PathBuf },

    /// Sample frames from a video into a zip of PNGs
    Extract {
        video: PathBuf,

        /// Start of the window in seconds
        #[arg(long, default_value_t = 0.0)]
        start: f64,

        /// End of the window in seconds
        #[arg(long)]
        end: f64,

        /// Seconds between samples
        #[arg(long, default_value_t = DEFAULT_INTERVAL_SECONDS)]
        interval: f64,

        /// Do not burn the timestamp into each frame
        #[arg(long)]
        no_overlay_time: bool,

        /// Do not brighten dark areas
        #[arg(long)]
        no_remove_shadows: bool,

        /// Where to write the archive
        #[arg(long, short, default_value = "frames.zip")]
        output: PathBuf,
    },

    /// Classify one image as colorful or black & white
    Classify { image: PathBuf },

    /// Classify images and directories of images
    Sort {
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Also write a zip with colorful/ and b&w/ folders
        #[arg(long)]
        archive: Option<PathBuf>,
    },
}

impl Args {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    pub fn to_config(&self) -> Result<ProcessingConfig> {
        let timeout = match self.timeout_secs {
            Some(secs) if secs.is_finite() && secs >= 0.0 => Some(Duration::from_secs_f64(secs)),
            Some(secs) => anyhow::bail!("Invalid timeout: {}", secs),
            None => None,
        };

        let mut config = ProcessingConfig::default().with_timeout(timeout);
        if let Some(workers) = self.workers {
            config = config.with_workers(workers);
        }
        config.max_samples = self.max_samples;
        config.max_image_pixels = self.max_image_pixels;
        config.thresholds = ClassifierThresholds {
            saturation: self.color_threshold,
            colorful_percent: self.colorful_percent_threshold,
        };
        Ok(config)
    }
}
