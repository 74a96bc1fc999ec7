//! Offline embeddings-artifact builder.
//!
//! Reads extracted pages (`[{ "page": 1, "text": "..." }]`), chunks and
//! embeds them, and writes the `embeddings.json` artifact the runtime index
//! loads.

use std::path::PathBuf;

use tracing::info;
use tracing_subscriber::EnvFilter;

use lectern_core::ChunkingConfig;
use lectern_embed::{build_artifact, create_embedder, read_pages, write_artifact};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 3 {
        eprintln!("Usage: lectern-embed <pages.json> <embeddings.json> [model-dir]");
        std::process::exit(2);
    }

    let pages_path = PathBuf::from(&args[1]);
    let output_path = PathBuf::from(&args[2]);
    let model_dir = args
        .get(3)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("models/all-MiniLM-L6-v2"));

    let pages = read_pages(&pages_path)?;
    info!(pages = pages.len(), "read extracted pages");

    let embedder = create_embedder(&model_dir);
    let artifact = build_artifact(&pages, &ChunkingConfig::default(), embedder.as_ref())?;
    write_artifact(&output_path, &artifact)?;

    info!(
        chunks = artifact.chunks.len(),
        output = %output_path.display(),
        "wrote embeddings artifact"
    );
    Ok(())
}
