//! Indexed mesh decoding and OBJ serialization.
//!
//! This module turns a captured [`MeshRecord`] into an [`ObjMesh`]: float
//! tuples for positions, texture coordinates and normals, and polygon faces
//! whose corners index those lists. Index streams use the VRML convention
//! of zero-based indices with `-1` closing each face; OBJ output is
//! one-based.

use std::io::Write;

use glam::{DVec2, DVec3};
use thiserror::Error;

use crate::proto::MeshRecord;

/// Errors raised while decoding captured geometry.
#[derive(Error, Debug)]
pub enum ObjError {
    #[error("{mesh}: '{token}' in {field} is not a number")]
    InvalidNumber {
        mesh: String,
        field: String,
        token: String,
    },

    #[error("{mesh}: {field} has {count} values, not a multiple of {arity}")]
    ComponentCount {
        mesh: String,
        field: String,
        count: usize,
        arity: usize,
    },

    #[error("{mesh}: {index} in {field} is not a valid index")]
    InvalidIndex { mesh: String, field: String, index: i64 },

    #[error("{mesh}: {field} describes {found} faces, coordIndex describes {expected}")]
    FaceCountMismatch {
        mesh: String,
        field: String,
        expected: usize,
        found: usize,
    },

    #[error("{mesh}: face {face} has {found} {field} entries but {expected} vertices")]
    CornerCountMismatch {
        mesh: String,
        field: String,
        face: usize,
        expected: usize,
        found: usize,
    },

    #[error("{mesh}: index {index} in {field} is out of bounds ({len} values)")]
    IndexOutOfBounds {
        mesh: String,
        field: String,
        index: u32,
        len: usize,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for mesh decoding and writing.
pub type ObjResult<T> = Result<T, ObjError>;

/// Which attributes each face corner references. Fixes the `f` record syntax.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FaceLayout {
    /// `f v v v`
    Position,

    /// `f v/t v/t v/t`
    PositionTexture,

    /// `f v//n v//n v//n`
    PositionNormal,

    /// `f v/t/n v/t/n v/t/n`
    PositionTextureNormal,
}

/// One polygon corner. Indices are zero-based.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FaceCorner {
    pub position: u32,
    pub texture: Option<u32>,
    pub normal: Option<u32>,
}

/// A polygon mesh ready to be written as OBJ.
#[derive(Clone, Debug)]
pub struct ObjMesh {
    /// Object name, written as the `o` record
    pub name: String,

    /// Vertex positions
    pub positions: Vec<DVec3>,

    /// Texture coordinates (optional)
    pub tex_coords: Option<Vec<DVec2>>,

    /// Normals (optional)
    pub normals: Option<Vec<DVec3>>,

    /// Polygon faces in source order, one per index segment
    pub faces: Vec<Vec<FaceCorner>>,

    /// Crease angle in radians handed to the normalization service
    pub crease_angle: f64,
}

/// Field-aware number parsing for one named mesh.
struct Decoder<'a> {
    mesh: &'a str,
}

impl Decoder<'_> {
    fn floats(&self, field: &str, raw: &str) -> ObjResult<Vec<f64>> {
        tokens(raw)
            .map(|token| {
                token.parse::<f64>().map_err(|_| ObjError::InvalidNumber {
                    mesh: self.mesh.to_string(),
                    field: field.to_string(),
                    token: token.to_string(),
                })
            })
            .collect()
    }

    fn vec3s(&self, field: &str, raw: &str) -> ObjResult<Vec<DVec3>> {
        let values = self.floats(field, raw)?;
        self.check_arity(field, values.len(), 3)?;
        Ok(values
            .chunks_exact(3)
            .map(|c| DVec3::new(c[0], c[1], c[2]))
            .collect())
    }

    fn vec2s(&self, field: &str, raw: &str) -> ObjResult<Vec<DVec2>> {
        let values = self.floats(field, raw)?;
        self.check_arity(field, values.len(), 2)?;
        Ok(values.chunks_exact(2).map(|c| DVec2::new(c[0], c[1])).collect())
    }

    fn check_arity(&self, field: &str, count: usize, arity: usize) -> ObjResult<()> {
        if count % arity != 0 {
            return Err(ObjError::ComponentCount {
                mesh: self.mesh.to_string(),
                field: field.to_string(),
                count,
                arity,
            });
        }
        Ok(())
    }

    /// Split a sentinel-delimited index stream into per-face index lists.
    ///
    /// Empty segments (consecutive or trailing `-1`) are dropped. A final
    /// segment without a closing `-1` still counts as a face.
    fn faces(&self, field: &str, raw: &str) -> ObjResult<Vec<Vec<u32>>> {
        let mut faces = Vec::new();
        let mut current = Vec::new();

        for token in tokens(raw) {
            let index = token.parse::<i64>().map_err(|_| ObjError::InvalidNumber {
                mesh: self.mesh.to_string(),
                field: field.to_string(),
                token: token.to_string(),
            })?;

            match index {
                -1 => {
                    if !current.is_empty() {
                        faces.push(std::mem::take(&mut current));
                    }
                }
                i if i < 0 || i > u32::MAX as i64 => {
                    return Err(ObjError::InvalidIndex {
                        mesh: self.mesh.to_string(),
                        field: field.to_string(),
                        index: i,
                    })
                }
                i => current.push(i as u32),
            }
        }

        if !current.is_empty() {
            faces.push(current);
        }

        Ok(faces)
    }

    /// Decode an attribute index stream and check it lines up with the
    /// coordinate faces and stays within `len` values.
    fn aligned_faces(&self, field: &str, raw: &str, coord_faces: &[Vec<u32>], len: usize) -> ObjResult<Vec<Vec<u32>>> {
        let faces = self.faces(field, raw)?;

        if faces.len() != coord_faces.len() {
            return Err(ObjError::FaceCountMismatch {
                mesh: self.mesh.to_string(),
                field: field.to_string(),
                expected: coord_faces.len(),
                found: faces.len(),
            });
        }

        for (i, (face, coord_face)) in faces.iter().zip(coord_faces).enumerate() {
            if face.len() != coord_face.len() {
                return Err(ObjError::CornerCountMismatch {
                    mesh: self.mesh.to_string(),
                    field: field.to_string(),
                    face: i,
                    expected: coord_face.len(),
                    found: face.len(),
                });
            }
        }

        self.check_bounds(field, &faces, len)?;
        Ok(faces)
    }

    fn check_bounds(&self, field: &str, faces: &[Vec<u32>], len: usize) -> ObjResult<()> {
        for &index in faces.iter().flatten() {
            if index as usize >= len {
                return Err(ObjError::IndexOutOfBounds {
                    mesh: self.mesh.to_string(),
                    field: field.to_string(),
                    index,
                    len,
                });
            }
        }
        Ok(())
    }
}

/// Numeric tokens of a raw array: whitespace and commas both separate.
fn tokens(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(|c: char| c.is_whitespace() || c == ',')
        .filter(|t| !t.is_empty())
}

impl ObjMesh {
    /// Decode a captured record into a mesh named `name`.
    pub fn from_record(record: &MeshRecord, name: &str) -> ObjResult<Self> {
        let decoder = Decoder { mesh: name };

        let positions = decoder.vec3s("coord", &record.coord)?;
        let coord_faces = decoder.faces("coordIndex", &record.coord_index)?;
        decoder.check_bounds("coordIndex", &coord_faces, positions.len())?;

        let (tex_coords, tex_faces) = match &record.tex_coord {
            Some(stream) => {
                let values = decoder.vec2s("texCoord", &stream.values)?;
                let faces = decoder.aligned_faces("texCoordIndex", &stream.indices, &coord_faces, values.len())?;
                (Some(values), Some(faces))
            }
            None => (None, None),
        };

        let (normals, normal_faces) = match &record.normal {
            Some(stream) => {
                let values = decoder.vec3s("normal", &stream.values)?;
                let faces = decoder.aligned_faces("normalIndex", &stream.indices, &coord_faces, values.len())?;
                (Some(values), Some(faces))
            }
            None => (None, None),
        };

        let crease_angle = match &record.crease_angle {
            Some(raw) => raw.parse::<f64>().map_err(|_| ObjError::InvalidNumber {
                mesh: name.to_string(),
                field: "creaseAngle".to_string(),
                token: raw.clone(),
            })?,
            None => 0.0,
        };

        let faces: Vec<Vec<FaceCorner>> = coord_faces
            .iter()
            .enumerate()
            .map(|(i, coord_face)| {
                coord_face
                    .iter()
                    .enumerate()
                    .map(|(corner, &position)| FaceCorner {
                        position,
                        texture: tex_faces.as_ref().map(|f| f[i][corner]),
                        normal: normal_faces.as_ref().map(|f| f[i][corner]),
                    })
                    .collect()
            })
            .collect();

        let short = faces.iter().filter(|f| f.len() < 3).count();
        if short > 0 {
            log::warn!("{}: {} face(s) with fewer than 3 vertices", name, short);
        }

        Ok(Self {
            name: name.to_string(),
            positions,
            tex_coords,
            normals,
            faces,
            crease_angle,
        })
    }

    /// Face record syntax implied by the attributes present.
    pub fn layout(&self) -> FaceLayout {
        match (self.tex_coords.is_some(), self.normals.is_some()) {
            (false, false) => FaceLayout::Position,
            (true, false) => FaceLayout::PositionTexture,
            (false, true) => FaceLayout::PositionNormal,
            (true, true) => FaceLayout::PositionTextureNormal,
        }
    }

    /// Get the number of vertices in the mesh.
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Get the number of faces in the mesh.
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// Write the mesh in OBJ syntax.
    pub fn write_obj<W: Write>(&self, out: &mut W) -> std::io::Result<()> {
        writeln!(out, "o {}", self.name)?;

        for v in &self.positions {
            writeln!(out, "v {} {} {}", v.x, v.y, v.z)?;
        }
        if let Some(tex_coords) = &self.tex_coords {
            for vt in tex_coords {
                writeln!(out, "vt {} {}", vt.x, vt.y)?;
            }
        }
        if let Some(normals) = &self.normals {
            for vn in normals {
                writeln!(out, "vn {} {} {}", vn.x, vn.y, vn.z)?;
            }
        }

        let layout = self.layout();
        for face in &self.faces {
            write!(out, "f")?;
            for corner in face {
                // OBJ indices are 1-based
                let v = corner.position + 1;
                let t = corner.texture.map(|t| t + 1).unwrap_or(0);
                let n = corner.normal.map(|n| n + 1).unwrap_or(0);
                match layout {
                    FaceLayout::Position => write!(out, " {}", v)?,
                    FaceLayout::PositionTexture => write!(out, " {}/{}", v, t)?,
                    FaceLayout::PositionNormal => write!(out, " {}//{}", v, n)?,
                    FaceLayout::PositionTextureNormal => write!(out, " {}/{}/{}", v, t, n)?,
                }
            }
            writeln!(out)?;
        }

        Ok(())
    }

    /// Render the mesh as an OBJ string.
    pub fn to_obj_string(&self) -> String {
        let mut buf = Vec::new();
        // Writing into a Vec cannot fail
        let _ = self.write_obj(&mut buf);
        String::from_utf8_lossy(&buf).into_owned()
    }
}
