use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;

use factura_core::EngineConfig;
use factura_ocr::{Canonicalizer, JsonTokenSource, TokenSource};
use factura_vendor::VendorRouter;

/// Reconstruct a structured invoice record from an OCR word-token dump.
#[derive(Parser, Debug)]
#[command(name = "factura", version, about)]
struct Cli {
    /// Token dump to process: a JSON array of
    /// {text, left, top, width, height, confidence} objects.
    document: PathBuf,

    /// Directory the JSON artifact is written into.
    #[arg(long, default_value = "output_jsons")]
    output_dir: PathBuf,

    /// Vendor slug to try first, skipping detection when it validates.
    #[arg(long)]
    vendor: Option<String>,

    /// Engine tuning overrides (TOML). Defaults are used when omitted.
    #[arg(long)]
    config: Option<PathBuf>,
}

async fn run(cli: &Cli) -> anyhow::Result<PathBuf> {
    let bytes = std::fs::read(&cli.document)
        .with_context(|| format!("reading {}", cli.document.display()))?;

    let tokens = JsonTokenSource
        .tokenize(&bytes)
        .with_context(|| format!("decoding tokens from {}", cli.document.display()))?;
    tracing::info!(tokens = tokens.len(), document = %cli.document.display(), "loaded token dump");

    let cfg = match &cli.config {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            EngineConfig::from_toml(&raw)?
        }
        None => EngineConfig::default(),
    };

    let router = VendorRouter::with_default_profiles(cfg, Canonicalizer::with_defaults());
    let record = router
        .route(&tokens, cli.vendor.as_deref())
        .await
        .with_context(|| format!("no vendor matched {}", cli.document.display()))?;
    tracing::info!(vendor = %record.vendor, items = record.line_items.len(), "document routed");

    std::fs::create_dir_all(&cli.output_dir)
        .with_context(|| format!("creating {}", cli.output_dir.display()))?;
    let out_path = cli.output_dir.join(artifact_name(&cli.document));
    let json = serde_json::to_string_pretty(&record)?;
    std::fs::write(&out_path, json)
        .with_context(|| format!("writing {}", out_path.display()))?;

    Ok(out_path)
}

fn artifact_name(document: &Path) -> String {
    document
        .file_stem()
        .map(|s| format!("{}.json", s.to_string_lossy()))
        .unwrap_or_else(|| "invoice.json".to_string())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let out_path = run(&cli).await?;
    println!("{}", out_path.display());
    Ok(())
}
