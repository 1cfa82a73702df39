//! Amnesia XPointer CLI
//!
//! Converts reading positions between EPUB CFIs and XPointers against a
//! directory of extracted section documents.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::json;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use amnesia_xpointer::document::SectionStore;
use amnesia_xpointer::{normalize_xpointer, Config, LocationTranslator};

#[derive(Parser, Debug)]
#[command(name = "amnesia-xpointer")]
#[command(about = "CFI <-> XPointer location converter", long_about = None)]
struct Cli {
    /// Directory of section documents; file names sorted ascending give the
    /// spine order (default: XPOINTER_SECTIONS_DIR)
    #[arg(long, global = true)]
    sections: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Convert a CFI (point or range) to an XPointer
    ToXpointer { cfi: String },
    /// Convert an XPointer to a CFI
    ToCfi { xpointer: String },
    /// Strip trailing text offsets from an XPointer
    Normalize { xpointer: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "amnesia_xpointer=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = Config::from_env();

    let output = match cli.command {
        Commands::Normalize { xpointer } => json!({ "xpointer": normalize_xpointer(&xpointer) }),
        Commands::ToXpointer { cfi } => {
            let translator = load_translator(cli.sections.or(config.sections_dir)).await?;
            let location = translator
                .cfi_to_xpointer(&cfi)
                .await
                .with_context(|| format!("Failed to convert {}", cfi))?;
            serde_json::to_value(location)?
        }
        Commands::ToCfi { xpointer } => {
            let translator = load_translator(cli.sections.or(config.sections_dir)).await?;
            let cfi = translator
                .xpointer_to_cfi(&xpointer)
                .await
                .with_context(|| format!("Failed to convert {}", xpointer))?;
            json!({ "cfi": cfi })
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

async fn load_translator(dir: Option<PathBuf>) -> Result<LocationTranslator<SectionStore>> {
    let dir = dir.context("No section directory: pass --sections or set XPOINTER_SECTIONS_DIR")?;
    let store = SectionStore::load_dir(&dir)
        .await
        .with_context(|| format!("Failed to load sections from {}", dir.display()))?;

    tracing::info!("Loaded {} sections from {}", store.len(), dir.display());
    Ok(LocationTranslator::new(store))
}
