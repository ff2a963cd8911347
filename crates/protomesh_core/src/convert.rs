//! Single-document conversion.
//!
//! This module ties the pipeline together: extract geometry, finalize
//! names, serialize each mesh as OBJ, resolve placeholders, optionally run
//! the normalization service, and publish the results.
//!
//! Output for `<out-dir>/<doc>.proto`:
//!
//! - `<out-dir>/<doc>.proto` - the rewritten document
//! - `<out-dir>/<doc>_meshes/<mesh>.obj` - one file per geometry node
//! - `<out-dir>/<doc>_meshes/<mesh>_SMOOTH.obj` - normalized variant
//!
//! Everything is written to a staging directory next to the destination
//! first. The mesh directory is moved into place before the document, so a
//! published document never points at meshes that are not there.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::ConvertOptions;
use crate::mesh::{ObjError, ObjMesh};
use crate::normalize::{MeshNormalizer, NormalizeError};
use crate::placeholder::{resolve_placeholders, PlaceholderError, Replacement};
use crate::proto::{extract_geometry, finalize_names, ParseError};

/// Errors that can occur during a document conversion.
#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: ParseError,
    },

    #[error("{path}: mesh at line {line}: {source}")]
    Format {
        path: String,
        line: usize,
        #[source]
        source: ObjError,
    },

    #[error("{path}: {source}")]
    Placeholder {
        path: String,
        #[source]
        source: PlaceholderError,
    },

    #[error("Invalid document path: {0}")]
    InvalidPath(String),
}

/// Result type for conversion operations.
pub type ConvertResult<T> = Result<T, ConvertError>;

/// A mesh produced by a conversion, ready to be written.
#[derive(Clone, Debug)]
pub struct MeshFile {
    /// File stem inside the `_meshes` directory
    pub name: String,

    /// Document line of the geometry node it came from
    pub line: usize,

    pub mesh: ObjMesh,
}

/// In-memory result of converting one document.
#[derive(Clone, Debug)]
pub struct ConvertedDocument {
    /// Rewritten document with every placeholder resolved
    pub document: String,

    /// Meshes in document order
    pub meshes: Vec<MeshFile>,
}

/// Outcome of the normalization step for one mesh.
#[derive(Clone, Debug, PartialEq)]
pub enum SmoothStatus {
    /// Normalization was not requested
    Skipped,

    /// The smoothed variant was written
    Smoothed,

    /// The service failed; only the raw mesh exists
    Unsmoothed(String),
}

/// Per-mesh summary of a conversion.
#[derive(Clone, Debug)]
pub struct MeshSummary {
    pub name: String,
    pub vertex_count: usize,
    pub face_count: usize,
    pub smooth: SmoothStatus,
}

/// Summary of a published conversion.
#[derive(Clone, Debug)]
pub struct ConversionReport {
    pub input: PathBuf,
    pub output: PathBuf,
    pub meshes: Vec<MeshSummary>,
}

impl ConversionReport {
    /// Meshes for which the normalization service failed.
    pub fn unsmoothed(&self) -> impl Iterator<Item = &MeshSummary> {
        self.meshes
            .iter()
            .filter(|m| matches!(m.smooth, SmoothStatus::Unsmoothed(_)))
    }
}

/// Convert document text in memory.
///
/// `doc_base` is the document's file stem; mesh URLs are written as
/// `"<doc_base>_meshes/<name>.obj"`. `path` only labels errors.
pub fn convert_str(content: &str, doc_base: &str, path: &str, options: &ConvertOptions) -> ConvertResult<ConvertedDocument> {
    let extraction = extract_geometry(content, options).map_err(|source| ConvertError::Parse {
        path: path.to_string(),
        source,
    })?;

    let names = finalize_names(&extraction.meshes, options);

    let mut meshes = Vec::with_capacity(names.len());
    let mut replacements = Vec::with_capacity(names.len());

    for ((_, record), name) in extraction.meshes.iter().zip(names) {
        let mesh = ObjMesh::from_record(record, &name).map_err(|source| ConvertError::Format {
            path: path.to_string(),
            line: record.line,
            source,
        })?;

        replacements.push(Replacement::mesh_url(record.key.placeholder(), doc_base, &name));
        meshes.push(MeshFile {
            name,
            line: record.line,
            mesh,
        });
    }

    let document = resolve_placeholders(&extraction.document, &replacements).map_err(|source| {
        ConvertError::Placeholder {
            path: path.to_string(),
            source,
        }
    })?;

    Ok(ConvertedDocument { document, meshes })
}

/// Convert the document at `input` and publish it as `output`.
///
/// Nothing is published unless every step before publishing succeeds. A
/// normalization failure does not fail the conversion; it is logged and
/// recorded in the report.
pub fn convert_document<P: AsRef<Path>, Q: AsRef<Path>>(
    input: P,
    output: Q,
    options: &ConvertOptions,
    normalizer: Option<&dyn MeshNormalizer>,
) -> ConvertResult<ConversionReport> {
    let input = input.as_ref();
    let output = output.as_ref();
    let input_label = input.display().to_string();

    let doc_base = output
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| ConvertError::InvalidPath(output.display().to_string()))?;
    let file_name = output
        .file_name()
        .ok_or_else(|| ConvertError::InvalidPath(output.display().to_string()))?;
    let out_dir = match output.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    };

    let content = fs::read_to_string(input).map_err(|source| ConvertError::Io {
        path: input_label.clone(),
        source,
    })?;

    let converted = convert_str(&content, doc_base, &input_label, options)?;

    fs::create_dir_all(&out_dir).map_err(|source| io_error(&out_dir, source))?;
    let staging = tempfile::Builder::new()
        .prefix(".protomesh-")
        .tempdir_in(&out_dir)
        .map_err(|source| io_error(&out_dir, source))?;

    let mesh_dir_name = format!("{}_meshes", doc_base);
    let staged_mesh_dir = staging.path().join(&mesh_dir_name);
    fs::create_dir_all(&staged_mesh_dir).map_err(|source| io_error(&staged_mesh_dir, source))?;

    let mut summaries = Vec::with_capacity(converted.meshes.len());

    for mesh_file in &converted.meshes {
        let raw_path = staged_mesh_dir.join(format!("{}.obj", mesh_file.name));
        fs::write(&raw_path, mesh_file.mesh.to_obj_string()).map_err(|source| io_error(&raw_path, source))?;

        let smooth = match normalizer.filter(|_| options.smooth) {
            Some(normalizer) => {
                let smooth_path = staged_mesh_dir.join(format!("{}{}.obj", mesh_file.name, options.smooth_suffix));
                match normalize_mesh(normalizer, &raw_path, &smooth_path, mesh_file.mesh.crease_angle) {
                    Ok(()) => SmoothStatus::Smoothed,
                    Err(e) => {
                        log::warn!(
                            "{}: mesh {} (line {}) left unsmoothed: {}",
                            input_label,
                            mesh_file.name,
                            mesh_file.line,
                            e
                        );
                        SmoothStatus::Unsmoothed(e.to_string())
                    }
                }
            }
            None => SmoothStatus::Skipped,
        };

        log::debug!(
            "Wrote mesh {} ({} vertices, {} faces)",
            mesh_file.name,
            mesh_file.mesh.vertex_count(),
            mesh_file.mesh.face_count()
        );

        summaries.push(MeshSummary {
            name: mesh_file.name.clone(),
            vertex_count: mesh_file.mesh.vertex_count(),
            face_count: mesh_file.mesh.face_count(),
            smooth,
        });
    }

    let staged_document = staging.path().join(file_name);
    fs::write(&staged_document, &converted.document).map_err(|source| io_error(&staged_document, source))?;

    // Publish: meshes first, then the document that references them.
    let mesh_dir = out_dir.join(&mesh_dir_name);
    if mesh_dir.exists() {
        fs::remove_dir_all(&mesh_dir).map_err(|source| io_error(&mesh_dir, source))?;
    }
    fs::rename(&staged_mesh_dir, &mesh_dir).map_err(|source| io_error(&mesh_dir, source))?;
    fs::rename(&staged_document, output).map_err(|source| io_error(output, source))?;

    log::info!(
        "Converted {} -> {} ({} mesh(es))",
        input_label,
        output.display(),
        summaries.len()
    );

    Ok(ConversionReport {
        input: input.to_path_buf(),
        output: output.to_path_buf(),
        meshes: summaries,
    })
}

fn normalize_mesh(
    normalizer: &dyn MeshNormalizer,
    raw_path: &Path,
    smooth_path: &Path,
    crease_angle: f64,
) -> Result<(), NormalizeError> {
    let smoothed = normalizer.normalize(raw_path, crease_angle)?;
    fs::write(smooth_path, smoothed)?;
    Ok(())
}

fn io_error(path: &Path, source: std::io::Error) -> ConvertError {
    ConvertError::Io {
        path: path.display().to_string(),
        source,
    }
}
