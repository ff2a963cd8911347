//! OBJ loading via `tobj`.

use std::fs;
use std::path::Path;

use glam::{Vec2, Vec3};
use protomesh_core::NormalizeError;

use crate::TriMesh;

/// Drop `f` records with fewer than three corners; points and lines carry
/// no surface.
fn surface_only(obj: &str) -> (String, usize) {
    let mut kept = String::with_capacity(obj.len());
    let mut dropped = 0;

    for line in obj.lines() {
        let mut fields = line.split_whitespace();
        if fields.next() == Some("f") && fields.count() < 3 {
            dropped += 1;
            continue;
        }
        kept.push_str(line);
        kept.push('\n');
    }

    (kept, dropped)
}

/// Load an OBJ file as a single triangle mesh.
///
/// Polygons are triangulated and every model in the file is merged into
/// one mesh. Normals in the file are ignored; they are recomputed.
pub fn load_obj<P: AsRef<Path>>(path: P) -> Result<TriMesh, NormalizeError> {
    let path = path.as_ref();
    let load_error = |message: String| NormalizeError::Load {
        path: path.display().to_string(),
        message,
    };

    let text = fs::read_to_string(path).map_err(|e| load_error(e.to_string()))?;
    let (text, dropped) = surface_only(&text);
    if dropped > 0 {
        log::debug!("{}: ignoring {} face(s) with fewer than 3 vertices", path.display(), dropped);
    }

    let (models, _materials) = tobj::load_obj_buf(
        &mut text.as_bytes(),
        &tobj::LoadOptions {
            single_index: true,
            triangulate: true,
            ..Default::default()
        },
        |_| Err(tobj::LoadError::OpenFileFailed),
    )
    .map_err(|e| load_error(e.to_string()))?;

    if models.is_empty() {
        return Err(load_error("No models found in OBJ file".to_string()));
    }

    let name = models[0].name.clone();
    let has_tex_coords = models.iter().all(|m| !m.mesh.texcoords.is_empty());

    let mut mesh = TriMesh {
        name,
        positions: Vec::new(),
        tex_coords: has_tex_coords.then(Vec::new),
        triangles: Vec::new(),
    };

    for model in &models {
        log::debug!("OBJ model '{}': {} indices", model.name, model.mesh.indices.len());

        let obj_mesh = &model.mesh;
        let offset = mesh.positions.len() as u32;

        mesh.positions
            .extend(obj_mesh.positions.chunks_exact(3).map(Vec3::from_slice));

        if let Some(tex_coords) = mesh.tex_coords.as_mut() {
            tex_coords.extend(obj_mesh.texcoords.chunks_exact(2).map(Vec2::from_slice));
        }

        mesh.triangles.extend(
            obj_mesh
                .indices
                .chunks_exact(3)
                .map(|t| [t[0] + offset, t[1] + offset, t[2] + offset]),
        );
    }

    Ok(mesh)
}
