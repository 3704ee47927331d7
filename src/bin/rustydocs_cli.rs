//! Command-line front end: index local files and ask questions without running the server.
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use rustydocs::{
    config, logging,
    processing::{DocumentExtractor, DocumentService},
};
use walkdir::WalkDir;

#[derive(Parser)]
#[command(
    name = "rustydocs-cli",
    about = "Index documents and answer questions strictly from their content"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Replace the index with the given files (directories are walked recursively).
    Index {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
        /// File extensions picked up when walking directories.
        #[arg(long = "extension", default_values = ["txt", "md"])]
        extensions: Vec<String>,
    },
    /// Answer a question from the current index.
    Ask {
        question: String,
        /// Number of chunks retrieved as context.
        #[arg(long)]
        k: Option<usize>,
    },
    /// Describe the index currently on disk.
    Inspect {
        /// Print the description as JSON.
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    config::init_config().context("failed to load configuration")?;
    logging::init_cli_tracing();
    let service = DocumentService::from_config(config::get_config())
        .context("failed to initialize document service")?;

    match cli.command {
        Command::Index { paths, extensions } => {
            let files = collect_files(&paths, &extensions)?;
            let outcome = service
                .index_files(&files, &DocumentExtractor::default())
                .await
                .with_context(|| format!("failed to index {} file(s)", files.len()))?;
            println!(
                "Indexed {} document(s) into {} chunk(s) (dimension {}, build {})",
                outcome.documents, outcome.chunk_count, outcome.dimension, outcome.build_id
            );
        }
        Command::Ask { question, k } => {
            let answer = service.ask(&question, k).await?;
            println!("{answer}");
        }
        Command::Inspect { json } => {
            let summary = service.index_summary().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                println!("Location:        {}", summary.location.display());
                println!("Build:           {}", summary.build_id);
                println!("Built at:        {}", summary.built_at);
                println!("Embedding model: {}", summary.embedding_model);
                println!("Dimension:       {}", summary.dimension);
                println!("Metric:          {:?}", summary.metric);
                println!("Chunks:          {}", summary.chunk_count);
            }
        }
    }
    Ok(())
}

/// Expand directories into their matching files; explicit file arguments are kept as given.
fn collect_files(paths: &[PathBuf], extensions: &[String]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_file() {
            files.push(path.clone());
            continue;
        }
        if !path.is_dir() {
            bail!("{} does not exist", path.display());
        }

        let mut found: Vec<PathBuf> = Vec::new();
        for entry in WalkDir::new(path).follow_links(false) {
            let entry =
                entry.with_context(|| format!("failed to walk {}", path.display()))?;
            if entry.file_type().is_file() && has_extension(entry.path(), extensions) {
                found.push(entry.into_path());
            }
        }
        found.sort();
        files.extend(found);
    }

    if files.is_empty() {
        bail!("no matching files found");
    }
    Ok(files)
}

fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            extensions
                .iter()
                .any(|wanted| wanted.trim_start_matches('.').eq_ignore_ascii_case(ext))
        })
}
