//! Subcommand handlers.

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use design_core::{
    optimize, ChunkedStorage, Diagnostics, DirectoryPersistence, Document, DocumentBuilder,
    LiveScene,
};
use design_renderer::{CancelToken, FontSet, Rasterizer, RenderOptions, UriImageLoader};

use crate::{AppConfig, BuildArgs, Command, OptimizeArgs, RenderArgs};

/// Run one subcommand.
///
/// # Errors
///
/// Returns an error if an input cannot be read or parsed, storage fails, or
/// rendering fails.
pub async fn run(config: &AppConfig, command: Command) -> Result<()> {
    match command {
        Command::Build(args) => build(&args).await,
        Command::Optimize(args) => optimize_document(config, &args).await,
        Command::Save { input } => save(config, &input).await,
        Command::Load { id, kind, out } => {
            let storage = storage(config);
            let json = match kind {
                Some(kind) => {
                    let records = storage
                        .load_kind(&id, kind.into())
                        .await
                        .with_context(|| format!("Failed to load records of {id}"))?;
                    serde_json::to_string_pretty(&records)?
                }
                None => storage
                    .load(&id)
                    .await
                    .with_context(|| format!("Failed to load document {id}"))?
                    .to_json()?,
            };
            write_output(out.as_deref(), json.as_bytes()).await
        }
        Command::Render(args) => render(config, &args).await,
    }
}

async fn build(args: &BuildArgs) -> Result<()> {
    let raw = read_input(&args.input).await?;
    let value: serde_json::Value = serde_json::from_str(&raw)
        .with_context(|| format!("Invalid JSON in {}", args.input.display()))?;
    let scene = LiveScene::from_canvas_json(&value)
        .with_context(|| format!("Invalid canvas in {}", args.input.display()))?;

    let mut builder = DocumentBuilder::new(&args.id, &args.editor_kind);
    if let Some(key) = &args.template_key {
        builder = builder.template_key(key);
    }
    if let Some(path) = &args.previous {
        builder = builder.previous(&read_document(path).await?);
    }

    let (document, diagnostics) = if args.no_metadata {
        builder.build_without_metadata(&scene)
    } else {
        builder.build(&scene)
    };
    report(&diagnostics);
    tracing::info!(document_id = %document.id, objects = document.object_count(), "built document");

    write_output(args.out.as_deref(), document.to_json()?.as_bytes()).await
}

async fn optimize_document(config: &AppConfig, args: &OptimizeArgs) -> Result<()> {
    let document = read_document(&args.input).await?;
    let options = config.compression_options(args.storage_only);
    let outcome = optimize(&document, args.max_bytes, &options)?;
    report(&outcome.diagnostics);

    tracing::info!(
        tier = %outcome.tier_used,
        original_size = outcome.original_size,
        result_size = outcome.result_size,
        budget_exceeded = outcome.budget_exceeded,
        "optimized document"
    );
    write_output(args.out.as_deref(), outcome.result.to_json()?.as_bytes()).await
}

async fn save(config: &AppConfig, input: &Path) -> Result<()> {
    let document = read_document(input).await?;
    let saved = storage(config)
        .save(&document)
        .await
        .with_context(|| format!("Failed to save document {}", document.id))?;
    for artifact in &saved.artifacts {
        println!("{artifact}");
    }
    Ok(())
}

async fn render(config: &AppConfig, args: &RenderArgs) -> Result<()> {
    let document = read_document(&args.input).await?;
    let mut rasterizer = Rasterizer::new(UriImageLoader::new());
    if let Some(path) = &config.font_path {
        let font = FontSet::load_file(path)
            .with_context(|| format!("Failed to load font {}", path.display()))?;
        rasterizer = rasterizer.with_font(font);
    }

    let options = RenderOptions::from(args);
    let output = rasterizer
        .render(&document, &options, &CancelToken::new())
        .await
        .with_context(|| format!("Failed to render {}", document.id))?;
    report(&output.diagnostics);

    let bytes = match &output.encoded_text {
        Some(uri) => uri.as_bytes(),
        None => output.bytes.as_slice(),
    };
    tokio::fs::write(&args.out, bytes)
        .await
        .with_context(|| format!("Failed to write {}", args.out.display()))?;
    tracing::info!(
        out = %args.out.display(),
        width = output.width,
        height = output.height,
        "rendered document"
    );
    Ok(())
}

fn storage(config: &AppConfig) -> ChunkedStorage<DirectoryPersistence> {
    ChunkedStorage::new(DirectoryPersistence::new(config.data_dir.clone()))
}

fn report(diagnostics: &Diagnostics) {
    for diagnostic in diagnostics.iter() {
        tracing::warn!(
            kind = ?diagnostic.kind,
            object_id = diagnostic.object_id.as_deref().unwrap_or("-"),
            "{}",
            diagnostic.message
        );
    }
}

async fn read_input(path: &Path) -> Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))
}

async fn read_document(path: &Path) -> Result<Document> {
    let json = read_input(path).await?;
    let (document, diagnostics) = Document::from_json_with_diagnostics(&json)
        .with_context(|| format!("Invalid document in {}", path.display()))?;
    report(&diagnostics);
    Ok(document)
}

async fn write_output(out: Option<&Path>, contents: &[u8]) -> Result<()> {
    match out {
        Some(path) => tokio::fs::write(path, contents)
            .await
            .with_context(|| format!("Failed to write {}", path.display())),
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(contents)?;
            stdout.write_all(b"\n")?;
            Ok(())
        }
    }
}
