//! Mesh normalization service boundary.
//!
//! Cleanup and smoothing of extracted meshes (dropping unreferenced
//! vertices and duplicate faces, crease-angle smoothed normals) happens
//! behind [`MeshNormalizer`]. The converter hands it the raw OBJ file it
//! just wrote and stores whatever OBJ text comes back as the smoothed
//! variant.

use std::path::Path;

use thiserror::Error;

/// Errors reported by a normalization service.
#[derive(Error, Debug)]
pub enum NormalizeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to load mesh {path}: {message}")]
    Load { path: String, message: String },

    #[error("Mesh {path} rejected: {message}")]
    Rejected { path: String, message: String },
}

/// A service that cleans and smooths an OBJ mesh file.
pub trait MeshNormalizer {
    /// Read the OBJ file at `source` and return the cleaned, smoothed mesh
    /// as OBJ text. `crease_angle` is in radians.
    fn normalize(&self, source: &Path, crease_angle: f64) -> Result<String, NormalizeError>;
}

impl<F> MeshNormalizer for F
where
    F: Fn(&Path, f64) -> Result<String, NormalizeError>,
{
    fn normalize(&self, source: &Path, crease_angle: f64) -> Result<String, NormalizeError> {
        self(source, crease_angle)
    }
}
