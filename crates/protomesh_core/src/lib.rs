//! Protomesh Core - Geometry extraction for PROTO/VRML scene documents.
//!
//! This crate provides:
//!
//! - **Extraction**: single-pass scanning of `.proto`/`.wrl` documents that
//!   lifts inline `IndexedFaceSet` nodes out into standalone meshes
//! - **Naming**: mesh names from `DEF` identifiers and `name` fields
//! - **OBJ output**: Wavefront OBJ serialization of the extracted meshes
//! - **Conversion**: rewriting the document to reference the mesh files,
//!   with an optional normalization service for smoothed variants
//!
//! # Example
//!
//! ```ignore
//! use protomesh_core::{convert_document, ConvertOptions};
//!
//! let report = convert_document("robot.proto", "out/robot.proto", &ConvertOptions::default(), None)?;
//! for mesh in &report.meshes {
//!     println!("{}: {} vertices, {} faces", mesh.name, mesh.vertex_count, mesh.face_count);
//! }
//! ```

pub mod config;
pub mod convert;
pub mod mesh;
pub mod normalize;
pub mod placeholder;
pub mod proto;

// Re-export commonly used types
pub use config::{ConfigError, ConvertOptions};
pub use convert::{
    convert_document, convert_str, ConversionReport, ConvertError, ConvertResult, ConvertedDocument, MeshFile,
    MeshSummary, SmoothStatus,
};
pub use mesh::{FaceCorner, FaceLayout, ObjError, ObjMesh};
pub use normalize::{MeshNormalizer, NormalizeError};
pub use placeholder::{resolve_placeholders, PlaceholderError, Replacement};
pub use proto::{extract_geometry, Extraction, ParseError};
