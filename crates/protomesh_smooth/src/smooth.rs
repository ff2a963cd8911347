//! Crease-angle vertex normals.
//!
//! Two triangles sharing an edge are smoothed across it when the angle
//! between their face normals is at most the crease angle. Corners that end
//! up connected around a vertex share one area-weighted normal; anywhere
//! else the vertex is split.

use std::collections::HashMap;

use glam::Vec3;

use crate::clean::position_key;
use crate::TriMesh;

/// Slack on the crease comparison so coplanar faces always merge.
const COS_EPSILON: f32 = 1e-5;

/// One triangle corner of a smoothed mesh.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SmoothCorner {
    /// Index into positions (and texture coordinates, when present)
    pub vertex: u32,

    /// Index into normals
    pub normal: u32,
}

/// Triangle mesh with per-corner normals.
#[derive(Clone, Debug)]
pub struct SmoothMesh {
    pub mesh: TriMesh,
    pub normals: Vec<Vec3>,
    pub faces: Vec<[SmoothCorner; 3]>,
}

/// Disjoint-set forest over triangle corners.
struct Corners {
    parent: Vec<usize>,
}

impl Corners {
    fn new(count: usize) -> Self {
        Self {
            parent: (0..count).collect(),
        }
    }

    fn find(&mut self, mut c: usize) -> usize {
        while self.parent[c] != c {
            self.parent[c] = self.parent[self.parent[c]];
            c = self.parent[c];
        }
        c
    }

    fn union(&mut self, a: usize, b: usize) {
        let (a, b) = (self.find(a), self.find(b));
        if a != b {
            self.parent[a.max(b)] = a.min(b);
        }
    }
}

/// Compute crease-angle normals for a cleaned mesh. `crease_angle` is in radians.
pub fn smooth(mesh: TriMesh, crease_angle: f32) -> SmoothMesh {
    let face_normals: Vec<Vec3> = mesh
        .triangles
        .iter()
        .map(|t| {
            let [a, b, c] = t.map(|i| mesh.positions[i as usize]);
            // unnormalized: length is twice the area
            (b - a).cross(c - a)
        })
        .collect();

    // Adjacency goes by position, so texture seams do not split normals
    let mut position_ids: HashMap<[u32; 3], u32> = HashMap::with_capacity(mesh.positions.len());
    let welded: Vec<u32> = mesh
        .positions
        .iter()
        .map(|&p| {
            let next = position_ids.len() as u32;
            *position_ids.entry(position_key(p)).or_insert(next)
        })
        .collect();

    let mut edges: HashMap<(u32, u32), Vec<(usize, usize, usize)>> = HashMap::new();
    for (f, tri) in mesh.triangles.iter().enumerate() {
        for k in 0..3 {
            let (ca, cb) = (f * 3 + k, f * 3 + (k + 1) % 3);
            let (pa, pb) = (welded[tri[k] as usize], welded[tri[(k + 1) % 3] as usize]);
            let entry = if pa < pb { (ca, cb) } else { (cb, ca) };
            edges.entry((pa.min(pb), pa.max(pb))).or_default().push((f, entry.0, entry.1));
        }
    }

    let min_cos = crease_angle.clamp(0.0, std::f32::consts::PI).cos() - COS_EPSILON;
    let mut corners = Corners::new(mesh.triangles.len() * 3);

    for edge in edges.values().filter(|e| e.len() > 1) {
        for (i, &(f1, lo1, hi1)) in edge.iter().enumerate() {
            for &(f2, lo2, hi2) in &edge[i + 1..] {
                let n1 = face_normals[f1].normalize_or_zero();
                let n2 = face_normals[f2].normalize_or_zero();
                if n1.dot(n2) >= min_cos {
                    corners.union(lo1, lo2);
                    corners.union(hi1, hi2);
                }
            }
        }
    }

    // Corners around the same vertex that got connected share a normal
    let corner_count = mesh.triangles.len() * 3;
    let mut sums: Vec<Vec3> = Vec::new();
    let mut group_of_root: HashMap<usize, u32> = HashMap::new();
    let mut corner_group = Vec::with_capacity(corner_count);

    for c in 0..corner_count {
        let root = corners.find(c);
        let group = *group_of_root.entry(root).or_insert_with(|| {
            sums.push(Vec3::ZERO);
            (sums.len() - 1) as u32
        });
        sums[group as usize] += face_normals[c / 3];
        corner_group.push(group);
    }

    let normals: Vec<Vec3> = sums
        .into_iter()
        .map(|n| {
            let n = n.normalize_or_zero();
            if n == Vec3::ZERO {
                Vec3::Y
            } else {
                n
            }
        })
        .collect();

    let faces = mesh
        .triangles
        .iter()
        .enumerate()
        .map(|(f, tri)| {
            [0, 1, 2].map(|k| SmoothCorner {
                vertex: tri[k],
                normal: corner_group[f * 3 + k],
            })
        })
        .collect();

    SmoothMesh { mesh, normals, faces }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mesh(positions: &[[f32; 3]], triangles: &[[u32; 3]]) -> TriMesh {
        TriMesh {
            name: "m".to_string(),
            positions: positions.iter().map(|p| Vec3::from_array(*p)).collect(),
            tex_coords: None,
            triangles: triangles.to_vec(),
        }
    }

    /// Two triangles folded 90 degrees along the x axis.
    fn folded() -> TriMesh {
        mesh(
            &[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
            &[[0, 1, 2], [1, 0, 3]],
        )
    }

    #[test]
    fn test_flat_quad_shares_normals() {
        let quad = mesh(
            &[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0]],
            &[[0, 1, 2], [0, 2, 3]],
        );
        let smoothed = smooth(quad, 0.0);

        // one normal per vertex, all facing +z
        assert_eq!(smoothed.normals.len(), 4);
        for n in &smoothed.normals {
            assert!((*n - Vec3::Z).length() < 1e-6);
        }
        assert_eq!(smoothed.faces[0][0].normal, smoothed.faces[1][0].normal);
    }

    #[test]
    fn test_sharp_fold_splits_normals() {
        let smoothed = smooth(folded(), 0.5);

        // 90 degrees exceeds the crease angle: every corner keeps its face normal
        assert_eq!(smoothed.normals.len(), 6);
        assert_ne!(smoothed.faces[0][0].normal, smoothed.faces[1][1].normal);
    }

    #[test]
    fn test_wide_crease_angle_smooths_fold() {
        let smoothed = smooth(folded(), std::f32::consts::FRAC_PI_2 + 0.1);

        // the two shared vertices merge across the fold
        assert_eq!(smoothed.normals.len(), 4);
        let shared = smoothed.normals[smoothed.faces[0][0].normal as usize];
        let expected = Vec3::new(0.0, 1.0, 1.0).normalize();
        // face 0 faces +z, face 1 faces +y
        assert!((shared - expected).length() < 1e-5);
        assert_eq!(smoothed.faces[0][0].normal, smoothed.faces[1][1].normal);
        assert_eq!(smoothed.faces[0][1].normal, smoothed.faces[1][0].normal);
    }
}
