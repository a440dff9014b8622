use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::info;

mod audio;
mod color;
mod config;
mod display;
mod error;
mod renderer;
mod spectrogram;

use audio::{AudioInput, SourceKind, WindowFunction};
use config::Config;
use renderer::ViewMode;
use spectrogram::Spectrogram;

#[derive(Parser, Debug)]
#[command(name = "micgram")]
#[command(author, version, about = "Live scrolling spectrogram of a microphone input")]
struct Args {
    /// Config file path (defaults to ~/.config/micgram/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Write a commented default config file and exit
    #[arg(long)]
    init_config: bool,

    /// List audio input devices and exit
    #[arg(long)]
    list_devices: bool,

    /// Capture backend
    #[arg(long)]
    source: Option<SourceKind>,

    /// Input device name (skips priority selection)
    #[arg(short, long)]
    device: Option<String>,

    /// Spectrogram layout
    #[arg(short, long)]
    view: Option<ViewMode>,

    /// Sample rate in Hz
    #[arg(long)]
    sample_rate: Option<u32>,

    /// Seconds of history shown
    #[arg(long)]
    seconds: Option<f32>,

    /// Spectrum captures per second
    #[arg(long)]
    slices: Option<u32>,

    /// Spectrum size, power of two between 64 and 8192
    #[arg(short, long)]
    bins: Option<usize>,

    /// FFT window function
    #[arg(short, long)]
    window: Option<WindowFunction>,

    /// Lowest frequency shown by the stereo views (Hz)
    #[arg(long)]
    min_freq: Option<f32>,

    /// Highest frequency shown by the stereo views (Hz)
    #[arg(long)]
    max_freq: Option<f32>,

    /// Pixel rows per channel in the columns view
    #[arg(long)]
    vertical_resolution: Option<usize>,

    /// Gain applied to magnitudes in the stereo views
    #[arg(long)]
    magnitude_scale: Option<f32>,

    /// Draw high frequencies at the bottom
    #[arg(long)]
    invert_y: bool,

    /// Terminal frames per second
    #[arg(long)]
    fps: Option<u32>,

    /// Write logs to this file instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,
}

fn init_logging(log_file: Option<&PathBuf>) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::from_default_env().add_directive("micgram=info".parse()?);

    match log_file {
        Some(path) => {
            let file = std::fs::File::create(path)
                .with_context(|| format!("Failed to create log file {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.log_file.as_ref())?;

    if args.init_config {
        let path = Config::init_default_config()?;
        println!("Wrote default config to {}", path.display());
        return Ok(());
    }

    // Load config, then let the CLI override it
    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::load_from_default_path().unwrap_or_default(),
    };
    config.merge_args(&args);

    let mut input = audio::open_input(config.audio.source)?;

    if args.list_devices {
        for device in input.list_devices()? {
            println!("{}", device);
        }
        return Ok(());
    }

    info!("Starting micgram with {:?} input", config.audio.source);

    let spectrogram = start_spectrogram(input.as_mut(), &config)?;

    display::terminal::run(spectrogram, config.display).await
}

/// Device start and warm-up block, so keep them off the async workers.
fn start_spectrogram(input: &mut dyn AudioInput, config: &Config) -> Result<Spectrogram> {
    tokio::task::block_in_place(|| Spectrogram::start(input, &config.audio, &config.spectrogram))
        .context("Spectrogram disabled")
}
