use anyhow::{Context, Result};
use clap::Parser;
use facecloak::capture::{CaptureSource, ImageFileCapture};
use facecloak::output::{JpegFileOutput, OutputSink};
use facecloak::{Config, ObfuscationOrchestrator};
use std::path::PathBuf;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Photo to obscure (any format the image crate decodes)
    #[arg(short, long)]
    input: PathBuf,

    /// Where to write the obscured JPEG
    #[arg(short, long)]
    output: PathBuf,

    /// Path to the face detection model (ONNX file)
    /// Overrides `model.path` from the config file
    #[arg(long)]
    model: Option<PathBuf>,

    /// Config file (defaults to the user config directory)
    #[arg(long)]
    config: Option<PathBuf>,

    /// JPEG quality
    #[arg(long, default_value_t = 90)]
    quality: u8,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,

    /// Refuse to write the output unless at least one face was obscured
    #[arg(long)]
    require_obfuscation: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Config::load_from_path(path.clone()),
        None => Config::load(),
    };
    if let Some(model) = &args.model {
        config.model.path = Some(model.clone());
    }

    // RUST_LOG wins over --debug, which wins over the config file
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if args.debug {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new(&config.general.log_level)
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    tracing::info!("Facecloak starting");
    match &config.model.path {
        Some(path) => tracing::info!("Face model: {}", path.display()),
        None => tracing::info!("No face model configured, heuristic detection only"),
    }

    let orchestrator = ObfuscationOrchestrator::from_config(&config);
    orchestrator.warm_up();

    let mut capture = ImageFileCapture::new(&args.input).context("Failed to open input image")?;
    let (width, height) = capture.resolution();
    tracing::info!("Input: {}x{}", width, height);

    let frame = capture.capture_frame().context("Failed to capture frame")?;

    let start = Instant::now();
    let result = orchestrator
        .obfuscate(frame)
        .await
        .context("Failed to start obfuscation")?;
    tracing::info!(
        "Obfuscation finished in {:.1}ms using the {:?} model state",
        start.elapsed().as_secs_f64() * 1000.0,
        orchestrator.models().state()
    );

    if !result.any_region_transformed {
        tracing::warn!("No face was obscured; the output is NOT protected");
        if args.require_obfuscation {
            anyhow::bail!(
                "no face was obscured in {}, refusing to write {}",
                args.input.display(),
                args.output.display()
            );
        }
    }

    let mut output = JpegFileOutput::new(&args.output, args.quality);
    output
        .write_frame(&result.buffer)
        .context("Failed to write output image")?;

    Ok(())
}
