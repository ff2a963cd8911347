//! Mesh cleanup: vertex welding, degenerate and duplicate face removal,
//! unreferenced vertex removal.

use std::collections::{HashMap, HashSet};

use crate::TriMesh;

/// What a cleanup pass removed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CleanStats {
    pub merged_vertices: usize,
    pub degenerate_faces: usize,
    pub duplicate_faces: usize,
    pub unreferenced_vertices: usize,
}

/// Bit pattern of a coordinate, with `-0.0` folded into `0.0`.
fn bits(v: f32) -> u32 {
    if v == 0.0 {
        0
    } else {
        v.to_bits()
    }
}

/// Hashable identity of a vertex position.
pub(crate) fn position_key(p: glam::Vec3) -> [u32; 3] {
    [bits(p.x), bits(p.y), bits(p.z)]
}

type VertexKey = ([u32; 3], Option<[u32; 2]>);

/// Clean `mesh` in place.
pub fn clean(mesh: &mut TriMesh) -> CleanStats {
    let mut stats = CleanStats::default();

    // Weld vertices with identical position and texture coordinate
    let mut welded: HashMap<VertexKey, u32> = HashMap::with_capacity(mesh.positions.len());
    let mut remap = Vec::with_capacity(mesh.positions.len());
    let mut positions = Vec::with_capacity(mesh.positions.len());
    let mut tex_coords = mesh.tex_coords.as_ref().map(|t| Vec::with_capacity(t.len()));

    for (i, &p) in mesh.positions.iter().enumerate() {
        let uv = mesh.tex_coords.as_ref().map(|t| t[i]);
        let key = (position_key(p), uv.map(|uv| [bits(uv.x), bits(uv.y)]));
        let index = *welded.entry(key).or_insert_with(|| {
            positions.push(p);
            if let (Some(out), Some(uv)) = (tex_coords.as_mut(), uv) {
                out.push(uv);
            }
            (positions.len() - 1) as u32
        });
        remap.push(index);
    }
    stats.merged_vertices = mesh.positions.len() - positions.len();

    // Drop degenerate and repeated triangles
    let mut seen = HashSet::with_capacity(mesh.triangles.len());
    let mut triangles = Vec::with_capacity(mesh.triangles.len());

    for tri in &mesh.triangles {
        let t = [remap[tri[0] as usize], remap[tri[1] as usize], remap[tri[2] as usize]];
        let [a, b, c] = t.map(|i| positions[i as usize]);
        if t[0] == t[1] || t[1] == t[2] || t[0] == t[2] || (b - a).cross(c - a) == glam::Vec3::ZERO {
            stats.degenerate_faces += 1;
            continue;
        }

        let mut sorted = t;
        sorted.sort_unstable();
        if !seen.insert(sorted) {
            stats.duplicate_faces += 1;
            continue;
        }

        triangles.push(t);
    }

    // Compact away vertices no triangle references
    let mut compact = vec![u32::MAX; positions.len()];
    let mut kept_positions = Vec::with_capacity(positions.len());
    let mut kept_tex_coords = tex_coords.as_ref().map(|t| Vec::with_capacity(t.len()));

    for tri in &mut triangles {
        for index in tri.iter_mut() {
            let old = *index as usize;
            if compact[old] == u32::MAX {
                compact[old] = kept_positions.len() as u32;
                kept_positions.push(positions[old]);
                if let (Some(out), Some(uvs)) = (kept_tex_coords.as_mut(), tex_coords.as_ref()) {
                    out.push(uvs[old]);
                }
            }
            *index = compact[old];
        }
    }
    stats.unreferenced_vertices = positions.len() - kept_positions.len();

    mesh.positions = kept_positions;
    mesh.tex_coords = kept_tex_coords;
    mesh.triangles = triangles;

    stats
}
