//! Protomesh Smooth - Mesh normalization service for extracted meshes.
//!
//! Loads an OBJ file, cleans it up and recomputes its vertex normals with a
//! crease angle, then hands the result back as OBJ text:
//!
//! - **Cleanup**: weld identical vertices, drop degenerate and duplicate
//!   triangles, drop vertices nothing references
//! - **Smoothing**: area-weighted normals, split along edges sharper than
//!   the crease angle
//!
//! [`CreaseSmoother`] plugs into `protomesh_core` as its [`MeshNormalizer`].
//!
//! # Example
//!
//! ```ignore
//! use protomesh_smooth::CreaseSmoother;
//! use protomesh_core::{convert_document, ConvertOptions};
//!
//! let smoother = CreaseSmoother::default();
//! convert_document("robot.proto", "out/robot.proto", &ConvertOptions::default(), Some(&smoother))?;
//! ```

pub mod clean;
pub mod load;
pub mod smooth;
pub mod write;

use std::path::Path;

use glam::{Vec2, Vec3};
use protomesh_core::{MeshNormalizer, NormalizeError};

pub use clean::{clean, CleanStats};
pub use load::load_obj;
pub use smooth::{smooth, SmoothCorner, SmoothMesh};

/// Indexed triangle mesh.
#[derive(Clone, Debug, Default)]
pub struct TriMesh {
    pub name: String,
    pub positions: Vec<Vec3>,

    /// Per-vertex texture coordinates (optional)
    pub tex_coords: Option<Vec<Vec2>>,

    pub triangles: Vec<[u32; 3]>,
}

/// Normalization service: cleanup followed by crease-angle smoothing.
#[derive(Clone, Copy, Debug, Default)]
pub struct CreaseSmoother;

impl CreaseSmoother {
    /// Load, clean and smooth an OBJ file.
    pub fn smooth_file(&self, source: &Path, crease_angle: f64) -> Result<SmoothMesh, NormalizeError> {
        let mut mesh = load_obj(source)?;
        let stats = clean(&mut mesh);

        if mesh.triangles.is_empty() {
            return Err(NormalizeError::Rejected {
                path: source.display().to_string(),
                message: "no faces left after cleanup".to_string(),
            });
        }

        log::debug!(
            "{}: merged {} vertices, dropped {} degenerate and {} duplicate faces, {} unreferenced vertices",
            source.display(),
            stats.merged_vertices,
            stats.degenerate_faces,
            stats.duplicate_faces,
            stats.unreferenced_vertices
        );

        Ok(smooth(mesh, crease_angle as f32))
    }
}

impl MeshNormalizer for CreaseSmoother {
    fn normalize(&self, source: &Path, crease_angle: f64) -> Result<String, NormalizeError> {
        let smoothed = self.smooth_file(source, crease_angle)?;
        Ok(write::to_obj_string(&smoothed))
    }
}
