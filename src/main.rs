mod app;
mod logging;
mod papers;
mod util;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, anyhow};
use clap::Parser;

use papers::{FixtureGenerator, GeminiGenerator, Generator};

const API_KEY_ENV: &str = "GEMINI_API_KEY";

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Topic mapped on startup.
    #[arg(long, default_value = app::DEFAULT_TOPIC)]
    topic: String,

    /// Serve graphs and insights from a local JSON document instead of Gemini.
    #[arg(long)]
    fixture: Option<PathBuf>,

    #[arg(long, default_value = "gemini-3-pro-preview")]
    model: String,

    /// Defaults to the GEMINI_API_KEY environment variable.
    #[arg(long)]
    api_key: Option<String>,

    #[arg(long)]
    debug: bool,
}

fn build_generator(args: &Args) -> anyhow::Result<Arc<dyn Generator>> {
    if let Some(path) = &args.fixture {
        anyhow::ensure!(path.is_file(), "fixture {} does not exist", path.display());
        tracing::info!(path = %path.display(), "using fixture generator");
        return Ok(Arc::new(FixtureGenerator::new(path.clone())));
    }

    let api_key = args
        .api_key
        .clone()
        .or_else(|| std::env::var(API_KEY_ENV).ok())
        .filter(|key| !key.trim().is_empty())
        .ok_or_else(|| {
            anyhow!("no API key: set {API_KEY_ENV}, pass --api-key, or use --fixture <PATH>")
        })?;

    let generator = GeminiGenerator::new(api_key, args.model.clone())
        .context("failed to build the Gemini client")?;
    tracing::info!(model = %args.model, "using Gemini generator");
    Ok(Arc::new(generator))
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    logging::init(args.debug);

    let generator = build_generator(&args)?;
    let options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default().with_inner_size([1440.0, 920.0]),
        ..Default::default()
    };

    let topic = args.topic;
    eframe::run_native(
        "paper-atlas",
        options,
        Box::new(move |cc| Ok(Box::new(app::PaperAtlasApp::new(cc, generator, topic)))),
    )
    .map_err(|error| anyhow!(error.to_string()))
}
