use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rxscan::models::{ImageFormat, RawImage, Strategy};
use rxscan::{Config, ExtractionPipeline};

#[derive(Parser)]
#[command(name = "rxscan")]
#[command(about = "Extract text and medicine names from a prescription photo")]
struct Args {
    /// PNG or JPEG image of the prescription
    image: PathBuf,

    /// Extraction strategy (defaults to EXTRACTION_STRATEGY)
    #[arg(long)]
    strategy: Option<Strategy>,

    /// Pretty-print the JSON result
    #[arg(long)]
    pretty: bool,
}

fn load_image(path: &Path) -> anyhow::Result<RawImage> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("Failed to read image {}", path.display()))?;

    if ImageFormat::sniff(&bytes).is_some() {
        return Ok(RawImage::new(bytes));
    }

    // Unrecognized magic bytes; let the extension decide and the decoder complain.
    let format = path
        .extension()
        .and_then(|ext| ext.to_str())
        .and_then(ImageFormat::from_extension);

    Ok(match format {
        Some(format) => RawImage::with_format(bytes, format),
        None => RawImage::new(bytes),
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rxscan=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = Config::from_env();
    let pipeline = ExtractionPipeline::new(&config)?;
    let strategy = args.strategy.unwrap_or(pipeline.default_strategy());

    let raw = load_image(&args.image)?;
    tracing::info!(
        path = %args.image.display(),
        bytes = raw.len(),
        format = ?raw.format(),
        %strategy,
        "Scanning prescription"
    );

    let cancel_token = CancellationToken::new();
    let token = cancel_token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupted, cancelling scan...");
            token.cancel();
        }
    });

    let result = pipeline
        .run_with_cancel(raw, strategy, &cancel_token)
        .await?;

    if result.degraded {
        tracing::warn!(reason = ?result.degraded_reason, "Scan produced a degraded result");
    }

    let output = if args.pretty {
        serde_json::to_string_pretty(&result)?
    } else {
        serde_json::to_string(&result)?
    };
    println!("{output}");

    Ok(())
}
