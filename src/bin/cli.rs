//! CLI binary for herbview.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use herb_search::{AcquisitionResult, Provider, Query, SearchType, TracingSink};
use herbview::{HerbViewConfig, build_orchestrator};
use tracing_subscriber::EnvFilter;

/// herbview: descriptions and images for herbs and remedies.
#[derive(Parser)]
#[command(name = "herbview", version, about)]
struct Cli {
    /// Path to TOML configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch snippets and images for a subject.
    Acquire {
        /// Herb name, disease or free text.
        text: String,

        /// subject, indication or free-text.
        #[arg(short = 't', long = "type", value_parser = parse_search_type, default_value = "subject")]
        search_type: SearchType,

        /// Search provider. Defaults to the configured one.
        #[arg(short, long, value_parser = parse_provider)]
        provider: Option<Provider>,

        /// Number of images (1-20).
        #[arg(short = 'n', long)]
        count: Option<usize>,

        /// Translate snippets into this language code.
        #[arg(short, long)]
        lang: Option<String>,

        /// Directory to save images into as PNG.
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// List the provider registry.
    Providers,
}

fn parse_search_type(raw: &str) -> Result<SearchType, String> {
    SearchType::parse(raw).ok_or_else(|| format!("unknown search type `{raw}`"))
}

fn parse_provider(raw: &str) -> Result<Provider, String> {
    Provider::parse(raw).ok_or_else(|| format!("unknown provider `{raw}`"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr; stdout carries the snippets.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("herbview=info,herb_search=warn")),
        )
        .init();

    let cli = Cli::parse();
    let config = HerbViewConfig::load(cli.config.as_deref())?;

    match cli.command {
        Command::Acquire {
            text,
            search_type,
            provider,
            count,
            lang,
            out,
        } => {
            let mut options = config.default_options();
            if let Some(provider) = provider {
                options.provider = provider;
            }
            if let Some(count) = count {
                options.image_count = count;
            }
            if lang.is_some() {
                options.target_language = lang;
            }

            let orchestrator = build_orchestrator(&config, Arc::new(TracingSink))?;
            let result = orchestrator
                .acquire(&Query::new(text, search_type), &options)
                .await?;
            print_result(&result);
            if let Some(dir) = out {
                save_images(&result, &dir)?;
            }
            Ok(())
        }
        Command::Providers => {
            list_providers();
            Ok(())
        }
    }
}

fn print_result(result: &AcquisitionResult) {
    println!("Provider: {}", result.provider_used);
    if let Some(lang) = &result.target_language {
        let status = if result.translated { "translated" } else { "untranslated" };
        println!("Language: {lang} ({status})");
    }

    if result.snippets.is_empty() {
        println!("\nNo description found.");
    } else {
        println!();
        for snippet in &result.snippets {
            println!("- {snippet}");
        }
    }

    println!("\nImages: {}", result.images.len());
    for image in &result.images {
        let (w, h) = image.display_dimensions();
        println!("  {w}x{h}  {}", image.source_url);
    }
}

fn save_images(result: &AcquisitionResult, dir: &Path) -> anyhow::Result<()> {
    std::fs::create_dir_all(dir)?;
    for (index, image) in result.images.iter().enumerate() {
        let png = image.encode_png()?;
        let path = dir.join(format!(
            "{:02}-{}.png",
            index + 1,
            image.provider.name().to_ascii_lowercase()
        ));
        std::fs::write(&path, png)?;
        println!("saved {}", path.display());
    }
    Ok(())
}

fn list_providers() {
    for provider in Provider::all() {
        let descriptor = herb_search::descriptor(*provider);
        let modes: Vec<&str> = descriptor
            .escalation_order
            .iter()
            .map(|mode| mode.as_str())
            .collect();
        println!(
            "{:<11} text={:<5} images={:<5} escalation={}",
            provider.name(),
            descriptor.supports(herb_search::Capability::TextSnippets),
            descriptor.supports(herb_search::Capability::Images),
            modes.join(" -> ")
        );
    }
}
