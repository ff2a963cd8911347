//! PROTO/VRML geometry extraction.
//!
//! This module scans brace-delimited scene documents (Webots `.proto`
//! files, VRML97 `.wrl`) and pulls inline `IndexedFaceSet` nodes out of
//! them, leaving a placeholder `Mesh` node at the same position.
//!
//! ## Pipeline
//!
//! - [`LineCursor`]: line/token cursor and bracketed field reader
//! - [`GeometryExtractor`]: depth-tracking single-pass scanner
//! - [`resolve_names`] / [`finalize_names`]: mesh naming from `DEF` and `name`
//!
//! ## Not Supported
//!
//! - `USE` references to geometry or coordinate nodes
//! - Array fields written as anything but numeric lists
//!
//! # Example
//!
//! ```ignore
//! use protomesh_core::proto::extract_geometry;
//! use protomesh_core::ConvertOptions;
//!
//! let extraction = extract_geometry(&content, &ConvertOptions::default())?;
//! println!("Found {} geometry nodes", extraction.meshes.len());
//! ```

mod cursor;
mod naming;
mod parser;
mod types;

pub use cursor::*;
pub use naming::*;
pub use parser::*;
pub use types::*;
