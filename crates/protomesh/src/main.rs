//! protomesh - Split inline PROTO geometry into standalone OBJ meshes.
//!
//! Given a `.proto` file, writes `<dir>/<name>_multifile/<name>.proto` with
//! every `IndexedFaceSet` replaced by a `Mesh` node, and the meshes under
//! `<name>_meshes/`. Given a directory, converts every PROTO document of a
//! copy of that directory.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use protomesh_core::{convert_document, ConvertOptions, MeshNormalizer};
use protomesh_smooth::CreaseSmoother;

mod batch;

#[derive(Parser)]
#[command(name = "protomesh")]
#[command(about = "Extract inline PROTO geometry into OBJ mesh files", long_about = None)]
struct Cli {
    /// A .proto file, or a directory to convert recursively
    #[arg(short, long)]
    input: PathBuf,

    /// Output .proto file (single-file mode only)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// JSON file with conversion options
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Do not write smoothed mesh variants
    #[arg(long)]
    no_smooth: bool,

    /// Stop extracting after this many consecutive blank lines
    #[arg(long, value_name = "LINES")]
    legacy_blank_limit: Option<usize>,
}

impl Cli {
    fn options(&self) -> Result<ConvertOptions> {
        let mut options = match &self.config {
            Some(path) => ConvertOptions::from_json_file(path)?,
            None => ConvertOptions::default(),
        };
        if self.no_smooth {
            options.smooth = false;
        }
        if self.legacy_blank_limit.is_some() {
            options.legacy_blank_line_limit = self.legacy_blank_limit;
        }
        options.validate()?;
        Ok(options)
    }
}

/// Default destination of a single document: `<dir>/<name>_multifile/<name>.proto`.
fn default_output(input: &Path) -> Result<PathBuf> {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .with_context(|| format!("Invalid input file name: {}", input.display()))?;
    let dir = input.parent().unwrap_or_else(|| Path::new(""));
    Ok(dir.join(format!("{}_multifile", stem)).join(format!("{}.proto", stem)))
}

fn convert_file(input: &Path, output: &Path, options: &ConvertOptions, normalizer: Option<&dyn MeshNormalizer>) -> Result<()> {
    let report = convert_document(input, output, options, normalizer)?;

    for mesh in &report.meshes {
        log::info!(
            "  {} - {} vertices, {} faces ({:?})",
            mesh.name,
            mesh.vertex_count,
            mesh.face_count,
            mesh.smooth
        );
    }
    for mesh in report.unsmoothed() {
        log::warn!("{} has no smoothed variant", mesh.name);
    }

    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let cli = Cli::parse();
    let options = cli.options()?;

    let smoother = CreaseSmoother;
    let normalizer: Option<&dyn MeshNormalizer> = options.smooth.then_some(&smoother as &dyn MeshNormalizer);

    if cli.input.is_dir() {
        if cli.output.is_some() {
            log::warn!("--output is ignored when converting a directory");
        }
        let input = cli
            .input
            .canonicalize()
            .with_context(|| format!("Failed to resolve {}", cli.input.display()))?;

        let summary = batch::convert_tree(&input, &options, normalizer)?;
        log::info!(
            "Converted {} document(s) into {}, skipped {}",
            summary.converted,
            summary.output_dir.display(),
            summary.skipped
        );

        if !summary.failed.is_empty() {
            for path in &summary.failed {
                log::error!("Failed: {}", path.display());
            }
            anyhow::bail!("{} document(s) failed to convert", summary.failed.len());
        }
    } else if cli.input.extension().is_some_and(|ext| ext == "proto") {
        let output = match &cli.output {
            Some(output) => output.clone(),
            None => default_output(&cli.input)?,
        };
        convert_file(&cli.input, &output, &options, normalizer)?;
    } else {
        anyhow::bail!("--input has to be a .proto file or a directory: {}", cli.input.display());
    }

    log::info!("Multi-file extraction done");
    Ok(())
}
