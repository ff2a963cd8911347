//! OBJ output for smoothed meshes.

use std::fmt::Write;

use crate::smooth::SmoothMesh;

/// Render a smoothed mesh as OBJ text.
pub fn to_obj_string(smoothed: &SmoothMesh) -> String {
    let mesh = &smoothed.mesh;
    let mut out = String::new();

    // Writing into a String cannot fail
    let _ = writeln!(out, "o {}", mesh.name);
    for v in &mesh.positions {
        let _ = writeln!(out, "v {} {} {}", v.x, v.y, v.z);
    }
    if let Some(tex_coords) = &mesh.tex_coords {
        for vt in tex_coords {
            let _ = writeln!(out, "vt {} {}", vt.x, vt.y);
        }
    }
    for vn in &smoothed.normals {
        let _ = writeln!(out, "vn {} {} {}", vn.x, vn.y, vn.z);
    }

    let textured = mesh.tex_coords.is_some();
    for face in &smoothed.faces {
        out.push('f');
        for corner in face {
            // OBJ indices are 1-based; texture coordinates share the vertex index
            let v = corner.vertex + 1;
            let n = corner.normal + 1;
            if textured {
                let _ = write!(out, " {}/{}/{}", v, v, n);
            } else {
                let _ = write!(out, " {}//{}", v, n);
            }
        }
        out.push('\n');
    }

    out
}
