//! Placeholder resolution.
//!
//! Once every mesh has its final name, each placeholder token in the
//! rewritten document becomes a quoted path to the mesh file.

use thiserror::Error;

/// Errors raised when placeholders and meshes do not pair up one-to-one.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum PlaceholderError {
    #[error("Placeholder {token} does not appear in the document")]
    Missing { token: String },

    #[error("Placeholder {token} appears {count} times in the document")]
    Duplicate { token: String, count: usize },
}

/// A placeholder token and the path that replaces it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Replacement {
    pub token: String,
    pub path: String,
}

impl Replacement {
    /// Replacement for the mesh `name` of the document `doc_base`:
    /// `"<doc_base>_meshes/<name>.obj"`.
    pub fn mesh_url(token: String, doc_base: &str, name: &str) -> Self {
        Self {
            token,
            path: format!("\"{}\"", mesh_relative_path(doc_base, name)),
        }
    }
}

/// Path of a mesh file relative to its document.
pub fn mesh_relative_path(doc_base: &str, name: &str) -> String {
    format!("{}_meshes/{}.obj", doc_base, name)
}

/// Replace every token with its path. Each token must occur exactly once.
pub fn resolve_placeholders(document: &str, replacements: &[Replacement]) -> Result<String, PlaceholderError> {
    for replacement in replacements {
        match document.matches(replacement.token.as_str()).count() {
            1 => {}
            0 => {
                return Err(PlaceholderError::Missing {
                    token: replacement.token.clone(),
                })
            }
            count => {
                return Err(PlaceholderError::Duplicate {
                    token: replacement.token.clone(),
                    count,
                })
            }
        }
    }

    let mut resolved = document.to_string();
    for replacement in replacements {
        resolved = resolved.replacen(replacement.token.as_str(), &replacement.path, 1);
    }

    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolves_each_token_once() {
        let doc = "a Mesh { url MeshID_1_1_placeholder }\nb Mesh { url MeshID_1_11_placeholder }\n";
        let replacements = vec![
            Replacement::mesh_url("MeshID_1_1_placeholder".to_string(), "robot", "arm_0"),
            Replacement::mesh_url("MeshID_1_11_placeholder".to_string(), "robot", "arm_1"),
        ];

        let resolved = resolve_placeholders(doc, &replacements).unwrap();
        assert_eq!(
            resolved,
            "a Mesh { url \"robot_meshes/arm_0.obj\" }\nb Mesh { url \"robot_meshes/arm_1.obj\" }\n"
        );
        assert!(!resolved.contains("_placeholder"));
    }

    #[test]
    fn test_missing_token() {
        let replacements = vec![Replacement::mesh_url("MeshID_2_1_placeholder".to_string(), "r", "x")];
        assert_eq!(
            resolve_placeholders("nothing here", &replacements),
            Err(PlaceholderError::Missing {
                token: "MeshID_2_1_placeholder".to_string()
            })
        );
    }

    #[test]
    fn test_duplicate_token() {
        let doc = "MeshID_2_1_placeholder MeshID_2_1_placeholder";
        let replacements = vec![Replacement::mesh_url("MeshID_2_1_placeholder".to_string(), "r", "x")];
        assert!(matches!(
            resolve_placeholders(doc, &replacements),
            Err(PlaceholderError::Duplicate { count: 2, .. })
        ));
    }
}
