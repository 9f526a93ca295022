use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use backdrop::{
    is_enabled, BackgroundEffect, BackgroundSource, EffectOptions, FrameSource, LoopbackSink,
    Orientation, OutputSink, OutputStream, Quality, WebcamSource,
};
use clap::{Parser, ValueEnum};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Input webcam device index
    #[arg(short, long, default_value_t = 0)]
    input_device: u32,

    /// Output v4l2loopback device path
    #[arg(short, long, default_value = "/dev/video10")]
    output_device: String,

    /// Background service URL returning {"msg": "<image url>"}
    #[arg(long)]
    background_url: Option<String>,

    /// Background image file (takes precedence over --background-url)
    #[arg(long)]
    background_image: Option<PathBuf>,

    /// Solid background colour as R,G,B
    #[arg(long, value_delimiter = ',', num_args = 3)]
    background_color: Option<Vec<u8>>,

    /// Segmentation quality preset
    #[arg(long, value_enum, default_value = "medium")]
    quality: QualityArg,

    /// Force landscape or portrait model selection
    #[arg(long, value_enum)]
    orientation: Option<OrientationArg>,

    /// Tick period in milliseconds
    #[arg(long, default_value_t = 33)]
    tick_ms: u64,

    /// Directory holding the ONNX model exports
    #[arg(long, default_value = "models")]
    model_dir: PathBuf,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum QualityArg {
    Low,
    Medium,
    Full,
}

impl From<QualityArg> for Quality {
    fn from(arg: QualityArg) -> Self {
        match arg {
            QualityArg::Low => Quality::Low,
            QualityArg::Medium => Quality::Medium,
            QualityArg::Full => Quality::Full,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum OrientationArg {
    Landscape,
    Portrait,
}

impl From<OrientationArg> for Orientation {
    fn from(arg: OrientationArg) -> Self {
        match arg {
            OrientationArg::Landscape => Orientation::Landscape,
            OrientationArg::Portrait => Orientation::Portrait,
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .init();

    tracing::info!("Backdrop starting");

    let source =
        WebcamSource::new(args.input_device).context("Failed to initialize webcam capture")?;
    if !is_enabled(&source.track()) {
        anyhow::bail!("input track is not a live camera video track");
    }

    let background = if let Some(path) = args.background_image {
        BackgroundSource::File(path)
    } else if let Some(url) = args.background_url {
        BackgroundSource::Service(url)
    } else if let Some(rgb) = args.background_color {
        BackgroundSource::Solid([rgb[0], rgb[1], rgb[2]])
    } else {
        BackgroundSource::Solid([0, 0, 0])
    };

    let options = EffectOptions {
        quality: args.quality.into(),
        orientation_override: args.orientation.map(Into::into),
        background,
        tick_period: Duration::from_millis(args.tick_ms),
        model_dir: args.model_dir,
    };

    let mut effect = BackgroundEffect::new(options);
    let stream = effect
        .start_effect(Box::new(source))
        .context("Failed to start effect")?;

    let (width, height) = stream.dimensions();
    let mut sink = LoopbackSink::new(&args.output_device, width, height)
        .context("Failed to initialize v4l2loopback output")?;

    relay(&stream, &mut sink)
}

/// Relay the live output stream to the sink at its frame rate.
fn relay<S: OutputSink>(stream: &OutputStream, sink: &mut S) -> Result<()> {
    let frame_duration = Duration::from_secs_f32(1.0 / stream.frame_rate().max(1) as f32);
    let mut frame_count = 0u64;
    let mut total_output_time = Duration::ZERO;

    tracing::info!("Relaying composited stream");
    tracing::info!("Press Ctrl+C to stop");

    loop {
        let loop_start = Instant::now();

        let frame = stream.snapshot();

        let output_start = Instant::now();
        sink.write_frame(&frame).context("Failed to write frame")?;
        total_output_time += output_start.elapsed();

        frame_count += 1;

        // Log stats every 30 frames
        if frame_count % 30 == 0 {
            let avg_output_ms = total_output_time.as_secs_f64() * 1000.0 / frame_count as f64;
            tracing::info!(
                "Frame {}: composited={}, output={:.1}ms",
                frame_count,
                stream.frames_presented(),
                avg_output_ms
            );
        }

        // Frame rate limiting
        let elapsed = loop_start.elapsed();
        if elapsed < frame_duration {
            std::thread::sleep(frame_duration - elapsed);
        }
    }
}
