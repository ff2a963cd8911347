//! Geometry extractor for brace-delimited PROTO/VRML documents.
//!
//! The extractor makes a single pass over the document. Lines are copied
//! verbatim while the scope depth and the enclosing `DEF` context are
//! tracked; every geometry node (`IndexedFaceSet` by default) is captured
//! and replaced in place by a one-line `Mesh` node whose `url` is a
//! placeholder token, to be resolved once every mesh has its final name.
//!
//! # Recognized fields inside a geometry node
//!
//! - `coord [...]` or `coord [DEF x] Coordinate { point [...] }`
//! - `texCoord [...]` or `texCoord TextureCoordinate { point [...] }`
//! - `normal [...]` or `normal Normal { vector [...] }`
//! - `coordIndex [...]`, `texCoordIndex [...]`, `normalIndex [...]`
//! - `creaseAngle <number>`

use thiserror::Error;

use super::cursor::{LineCursor, Token, TokenKind};
use super::naming::resolve_names;
use super::types::*;
use crate::config::ConvertOptions;

/// Structural errors found while scanning a document.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("Parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("Field '{field}' starting at line {line} has no closing ']'")]
    UnterminatedField { field: String, line: usize },

    #[error("{node} starting at line {line} is never closed")]
    UnclosedBlock { node: String, line: usize },

    #[error("Unmatched closing bracket at line {line}")]
    UnbalancedClose { line: usize },

    #[error("Document ends with {depth} unclosed scope(s)")]
    UnbalancedDocument { depth: usize },

    #[error("Geometry node at line {line} has no '{field}' field")]
    MissingField { field: String, line: usize },
}

/// Result type for parsing operations.
pub type ParseResult<T> = Result<T, ParseError>;

/// Output of one extraction pass.
#[derive(Debug)]
pub struct Extraction {
    /// Rewritten document, holding one placeholder token per mesh
    pub document: String,

    /// Captured geometry in document order
    pub meshes: MeshArena,

    /// Line at which the legacy blank-line cutoff stopped extraction
    pub truncated_at: Option<usize>,
}

/// Array-valued attribute fields that may wrap their array in a node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ArrayField {
    Coord,
    TexCoord,
    Normal,
}

impl ArrayField {
    fn name(self) -> &'static str {
        match self {
            ArrayField::Coord => "coord",
            ArrayField::TexCoord => "texCoord",
            ArrayField::Normal => "normal",
        }
    }
}

/// Raw fields collected while a geometry node is open.
#[derive(Default)]
struct GeometryFields {
    coord: Option<String>,
    coord_index: Option<String>,
    tex_coord: Option<String>,
    tex_coord_index: Option<String>,
    normal: Option<String>,
    normal_index: Option<String>,
    crease_angle: Option<String>,
}

impl GeometryFields {
    fn set_array(&mut self, field: ArrayField, raw: String) {
        match field {
            ArrayField::Coord => self.coord = Some(raw),
            ArrayField::TexCoord => self.tex_coord = Some(raw),
            ArrayField::Normal => self.normal = Some(raw),
        }
    }

    fn into_record(self, key: MeshKey, line: usize, name: Option<String>) -> ParseResult<MeshRecord> {
        let coord = self.coord.ok_or_else(|| ParseError::MissingField {
            field: "coord".to_string(),
            line,
        })?;
        let coord_index = self.coord_index.ok_or_else(|| ParseError::MissingField {
            field: "coordIndex".to_string(),
            line,
        })?;

        let tex_coord = attribute_stream("texCoord", self.tex_coord, self.tex_coord_index, &coord_index, line);
        let normal = attribute_stream("normal", self.normal, self.normal_index, &coord_index, line);

        Ok(MeshRecord {
            key,
            line,
            coord,
            coord_index,
            tex_coord,
            normal,
            crease_angle: self.crease_angle,
            name,
        })
    }
}

/// Pair an attribute array with its index stream. A missing index stream
/// falls back to `coordIndex`; an index stream without its array is dropped.
fn attribute_stream(
    field: &str,
    values: Option<String>,
    indices: Option<String>,
    coord_index: &str,
    line: usize,
) -> Option<AttributeStream> {
    match (values, indices) {
        (Some(values), Some(indices)) => Some(AttributeStream { values, indices }),
        (Some(values), None) => {
            log::debug!("{} at line {} has no index stream, reusing coordIndex", field, line);
            Some(AttributeStream {
                values,
                indices: coord_index.to_string(),
            })
        }
        (None, Some(_)) => {
            log::warn!("{}Index at line {} has no {} array, ignoring it", field, line, field);
            None
        }
        (None, None) => None,
    }
}

fn starts_uppercase(word: &str) -> bool {
    word.chars().next().is_some_and(|c| c.is_ascii_uppercase())
}

/// Text that replaces a geometry node in the rewritten document.
fn placeholder_node(def_name: Option<&str>, key: &MeshKey) -> String {
    match def_name {
        Some(name) => format!("DEF {} Mesh {{ url {} }}", name, key.placeholder()),
        None => format!("Mesh {{ url {} }}", key.placeholder()),
    }
}

/// Single-pass geometry extractor.
pub struct GeometryExtractor<'a> {
    cursor: LineCursor<'a>,
    options: &'a ConvertOptions,
    meshes: MeshArena,
    output: String,
}

impl<'a> GeometryExtractor<'a> {
    /// Create an extractor over the document contents.
    pub fn new(content: &'a str, options: &'a ConvertOptions) -> Self {
        Self {
            cursor: LineCursor::new(content),
            options,
            meshes: MeshArena::new(),
            output: String::with_capacity(content.len() / 2),
        }
    }

    /// Scan the whole document.
    pub fn extract(mut self) -> ParseResult<Extraction> {
        let mut state = ScanState::default();
        let mut truncated_at = None;

        while !self.cursor.at_end() {
            if self.cursor.line_text().trim().is_empty() {
                state.blank_run += 1;
                if let Some(limit) = self.options.legacy_blank_line_limit {
                    if state.blank_run > limit {
                        truncated_at = Some(self.cursor.line_number());
                        break;
                    }
                }
            } else {
                state.blank_run = 0;
            }

            state = self.scan_line(state)?;
            self.cursor.advance_line();
        }

        if let Some(line) = truncated_at {
            log::warn!(
                "Stopped extracting after {} blank lines at line {}; {} remaining line(s) copied unchanged",
                state.blank_run,
                line,
                self.cursor.remaining_lines()
            );
            while !self.cursor.at_end() {
                self.output.push_str(self.cursor.line_text());
                self.cursor.advance_line();
            }
        } else if state.depth != 0 {
            return Err(ParseError::UnbalancedDocument { depth: state.depth });
        }

        log::debug!("Extracted {} geometry node(s)", self.meshes.len());

        Ok(Extraction {
            document: self.output,
            meshes: self.meshes,
            truncated_at,
        })
    }

    /// Scan the current line from the cursor position to its end. A geometry
    /// node may carry the cursor onto a later line; scanning then continues
    /// with whatever follows the node's closing brace.
    fn scan_line(&mut self, mut state: ScanState) -> ParseResult<ScanState> {
        let mut copy_from = self.cursor.pos();
        let mut prev: Option<Token<'a>> = None;
        let mut prev2: Option<Token<'a>> = None;

        while let Some(token) = self.cursor.next_token() {
            if let Some(p) = prev {
                if p.is_word("name") && matches!(token.kind, TokenKind::Word | TokenKind::Str) {
                    let assigned = resolve_names(&mut self.meshes, token.unquoted(), state.depth, self.options);
                    if assigned > 0 {
                        log::debug!(
                            "name {} at line {} claimed {} mesh(es)",
                            token.text,
                            self.cursor.line_number(),
                            assigned
                        );
                    }
                }
            }

            let declared = match (prev2, prev) {
                (Some(d), Some(id)) if d.is_word("DEF") && id.kind == TokenKind::Word => Some((d, id)),
                _ => None,
            };

            match token.kind {
                TokenKind::Open(_) => state = state.open(),
                TokenKind::Close(_) => {
                    state = state.close().ok_or(ParseError::UnbalancedClose {
                        line: self.cursor.line_number(),
                    })?;
                }
                TokenKind::Word if token.text == self.options.marker => {
                    let (node_start, def_name) = match declared {
                        Some((d, id)) => (d.start, Some(id.text.to_string())),
                        None => (token.start, None),
                    };

                    self.output.push_str(&self.cursor.line_text()[copy_from..node_start]);

                    let handle = self.capture_geometry(&state, def_name.clone())?;
                    state.def_context = None;

                    let key = self.meshes.get(handle).key;
                    self.output.push_str(&placeholder_node(def_name.as_deref(), &key));

                    copy_from = self.cursor.pos();
                    prev = None;
                    prev2 = None;
                    continue;
                }
                TokenKind::Word if self.options.is_ancestor_type(token.text) => {
                    if let Some((_, id)) = declared {
                        state.def_context = Some(DefContext {
                            identifier: id.text.to_string(),
                            depth: state.depth,
                        });
                    }
                }
                _ => {}
            }

            prev2 = prev;
            prev = Some(token);
        }

        self.output.push_str(&self.cursor.line_text()[copy_from..]);
        Ok(state)
    }

    /// Capture a geometry node whose marker token was just consumed, up to
    /// and including its matching closing brace.
    fn capture_geometry(&mut self, state: &ScanState, def_name: Option<String>) -> ParseResult<MeshHandle> {
        let start_line = self.cursor.line_number();
        let options = self.options;
        let marker = options.marker.as_str();
        let key = MeshKey {
            depth: state.depth,
            sequence: self.meshes.next_sequence(),
        };

        match self.cursor.next_token_across_lines() {
            Some(token) if token.kind == TokenKind::Open('{') => {}
            Some(token) => {
                return Err(ParseError::Parse {
                    line: self.cursor.line_number(),
                    message: format!("Expected '{{' after {}, found '{}'", marker, token.text),
                })
            }
            None => {
                return Err(ParseError::UnclosedBlock {
                    node: marker.to_string(),
                    line: start_line,
                })
            }
        }

        let mut fields = GeometryFields::default();
        let mut pending: Option<ArrayField> = None;
        let mut after_def = false;
        let mut depth = 1usize;

        while depth > 0 {
            let token = self
                .cursor
                .next_token_across_lines()
                .ok_or_else(|| ParseError::UnclosedBlock {
                    node: marker.to_string(),
                    line: start_line,
                })?;

            match token.kind {
                TokenKind::Open(bracket) => {
                    if bracket == '[' {
                        if let Some(field) = pending.take() {
                            let line = self.cursor.line_number();
                            let raw = self.cursor.read_bracketed(field.name(), line)?;
                            fields.set_array(field, raw);
                            continue;
                        }
                    }
                    depth += 1;
                }
                TokenKind::Close(_) => {
                    depth -= 1;
                    if depth <= 1 {
                        pending = None;
                    }
                }
                TokenKind::Word if depth == 1 => {
                    // `coord DEF c Coordinate { ... }` keeps the field open
                    // until its node's array shows up.
                    if pending.is_some() && (after_def || token.text == "DEF" || starts_uppercase(token.text)) {
                        after_def = token.text == "DEF";
                        continue;
                    }
                    after_def = false;
                    pending = None;
                    match token.text {
                        "coord" => pending = Some(ArrayField::Coord),
                        "texCoord" => pending = Some(ArrayField::TexCoord),
                        "normal" => pending = Some(ArrayField::Normal),
                        "coordIndex" => fields.coord_index = Some(self.cursor.read_field("coordIndex")?),
                        "texCoordIndex" => {
                            fields.tex_coord_index = Some(self.cursor.read_field("texCoordIndex")?)
                        }
                        "normalIndex" => fields.normal_index = Some(self.cursor.read_field("normalIndex")?),
                        "creaseAngle" => {
                            match self.cursor.peek_token_across_lines().filter(|t| t.kind == TokenKind::Word) {
                                Some(value) if value.text == "IS" => {
                                    // bound to a PROTO field; its value is unknown here
                                    self.cursor.next_token_across_lines();
                                    self.cursor.next_token_across_lines();
                                    log::warn!(
                                        "creaseAngle at line {} is a PROTO field reference, using the default",
                                        self.cursor.line_number()
                                    );
                                }
                                Some(value) => {
                                    self.cursor.next_token_across_lines();
                                    fields.crease_angle = Some(value.text.to_string());
                                }
                                None => log::warn!(
                                    "creaseAngle at line {} has no value, using the default",
                                    self.cursor.line_number()
                                ),
                            }
                        }
                        _ => {}
                    }
                }
                _ => {}
            }
        }

        let name = def_name.or_else(|| state.def_context.as_ref().map(|ctx| ctx.identifier.clone()));
        let record = fields.into_record(key, start_line, name)?;

        log::debug!(
            "Captured {} at line {} (depth {}, name {:?})",
            marker,
            start_line,
            key.depth,
            record.name
        );

        Ok(self.meshes.push(record))
    }
}

/// Extract every geometry node from a document.
pub fn extract_geometry(content: &str, options: &ConvertOptions) -> ParseResult<Extraction> {
    GeometryExtractor::new(content, options).extract()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(doc: &str) -> Extraction {
        extract_geometry(doc, &ConvertOptions::default()).unwrap()
    }

    #[test]
    fn test_single_line_shape() {
        let doc = "Shape { geometry IndexedFaceSet { coord [0 0 0, 1 0 0, 0 1 0] coordIndex [0 1 2 -1] } }\n";
        let result = extract(doc);

        assert_eq!(result.meshes.len(), 1);
        assert_eq!(
            result.document,
            "Shape { geometry Mesh { url MeshID_1_1_placeholder } }\n"
        );

        let (_, record) = result.meshes.iter().next().unwrap();
        assert_eq!(record.coord, "0 0 0, 1 0 0, 0 1 0");
        assert_eq!(record.coord_index, "0 1 2 -1");
        assert!(record.name.is_none());
    }

    #[test]
    fn test_multi_line_node_with_wrapped_arrays() {
        let doc = r#"Transform {
  children [
    Shape {
      geometry DEF body_mesh IndexedFaceSet {
        coord Coordinate {
          point [
            0 0 0, 1 0 0,
            0 1 0
          ]
        }
        normal Normal { vector [ 0 0 1 ] }
        texCoord TextureCoordinate {
          point [ 0 0, 1 0, 0 1 ]
        }
        coordIndex [ 0, 1, 2, -1 ]
        normalIndex [ 0 0 0 -1 ]
        texCoordIndex [
          0 1 2 -1
        ]
        creaseAngle 0.785
      }
    }
  ]
}
"#;
        let result = extract(doc);
        assert_eq!(
            result.document,
            "Transform {\n  children [\n    Shape {\n      geometry DEF body_mesh Mesh { url MeshID_3_1_placeholder }\n    }\n  ]\n}\n"
        );

        let (_, record) = result.meshes.iter().next().unwrap();
        assert_eq!(record.key, MeshKey { depth: 3, sequence: 1 });
        assert_eq!(record.line, 4);
        assert_eq!(record.coord, "0 0 0, 1 0 0, 0 1 0");
        assert_eq!(record.normal.as_ref().unwrap().values, "0 0 1");
        assert_eq!(record.normal.as_ref().unwrap().indices, "0 0 0 -1");
        assert_eq!(record.tex_coord.as_ref().unwrap().values, "0 0, 1 0, 0 1");
        assert_eq!(record.crease_angle.as_deref(), Some("0.785"));
        assert_eq!(record.name.as_deref(), Some("body_mesh"));
    }

    #[test]
    fn test_color_node_is_not_captured_as_attribute() {
        let doc = "geometry IndexedFaceSet {\n  color Color { color [ 1 0 0 ] }\n  coord [ 0 0 0 1 0 0 0 1 0 ]\n  coordIndex [ 0 1 2 ]\n}\n";
        let result = extract(doc);
        let (_, record) = result.meshes.iter().next().unwrap();
        assert_eq!(record.coord, "0 0 0 1 0 0 0 1 0");
        assert!(record.normal.is_none());
        assert!(record.tex_coord.is_none());
    }

    #[test]
    fn test_def_context_names_nested_geometry() {
        let doc = r#"DEF WHEEL Transform {
  children [
    Shape {
      geometry IndexedFaceSet {
        coord [ 0 0 0 1 0 0 0 1 0 ]
        coordIndex [ 0 1 2 -1 ]
      }
    }
  ]
}
"#;
        let result = extract(doc);
        let (_, record) = result.meshes.iter().next().unwrap();
        assert_eq!(record.name.as_deref(), Some("WHEEL"));
    }

    #[test]
    fn test_marker_def_wins_over_def_context() {
        let doc = "DEF OUTER Shape {\n  geometry DEF INNER IndexedFaceSet { coord [ 0 0 0 ] coordIndex [ 0 -1 ] }\n}\n";
        let result = extract(doc);
        let (_, record) = result.meshes.iter().next().unwrap();
        assert_eq!(record.name.as_deref(), Some("INNER"));
    }

    #[test]
    fn test_def_context_is_consumed_by_geometry() {
        let doc = r#"DEF BODY Shape {
  geometry IndexedFaceSet { coord [ 0 0 0 ] coordIndex [ 0 -1 ] }
}
Shape {
  geometry IndexedFaceSet { coord [ 0 0 0 ] coordIndex [ 0 -1 ] }
}
"#;
        let result = extract(doc);
        let names: Vec<_> = result.meshes.iter().map(|(_, r)| r.name.clone()).collect();
        assert_eq!(names, vec![Some("BODY".to_string()), None]);
    }

    #[test]
    fn test_def_context_reaches_following_siblings() {
        let doc = r#"Group {
  children [
    DEF EMPTY Transform {
      children [ ]
    }
    Shape {
      geometry IndexedFaceSet { coord [ 0 0 0 ] coordIndex [ 0 -1 ] }
    }
  ]
}
"#;
        let result = extract(doc);
        let (_, record) = result.meshes.iter().next().unwrap();
        assert_eq!(record.name.as_deref(), Some("EMPTY"));
    }

    #[test]
    fn test_def_context_ends_with_its_enclosing_scope() {
        let doc = r#"Group {
  children [
    DEF EMPTY Transform {
      children [ ]
    }
  ]
}
Shape {
  geometry IndexedFaceSet { coord [ 0 0 0 ] coordIndex [ 0 -1 ] }
}
"#;
        let result = extract(doc);
        let (_, record) = result.meshes.iter().next().unwrap();
        assert!(record.name.is_none());
    }

    #[test]
    fn test_crease_angle_value_on_next_line() {
        let doc = "IndexedFaceSet {\n  coord [ 0 0 0 1 0 0 0 1 0 ]\n  coordIndex [ 0 1 2 -1 ]\n  creaseAngle\n    1.2\n}\n";
        let result = extract(doc);
        let (_, record) = result.meshes.iter().next().unwrap();
        assert_eq!(record.crease_angle.as_deref(), Some("1.2"));
    }

    #[test]
    fn test_crease_angle_is_reference_uses_default() {
        let doc = "IndexedFaceSet {\n  coord [ 0 0 0 ]\n  coordIndex [ 0 -1 ]\n  creaseAngle IS\n    crease\n}\n";
        let result = extract(doc);
        let (_, record) = result.meshes.iter().next().unwrap();
        assert!(record.crease_angle.is_none());
    }

    #[test]
    fn test_name_field_claims_meshes_at_fixed_offsets() {
        let doc = r#"Robot {
  children [
    Shape {
      geometry IndexedFaceSet { coord [ 0 0 0 ] coordIndex [ 0 -1 ] }
    }
    Transform {
      children [
        Shape {
          geometry IndexedFaceSet { coord [ 0 0 0 ] coordIndex [ 0 -1 ] }
        }
      ]
    }
  ]
  name "arm"
}
"#;
        let result = extract(doc);
        let names: Vec<_> = result.meshes.iter().map(|(_, r)| r.name.clone()).collect();
        assert_eq!(
            names,
            vec![Some("arm_0".to_string()), Some("arm_1".to_string())]
        );
    }

    #[test]
    fn test_placeholder_count_matches_records() {
        let doc = "Group { children [\n Shape { geometry IndexedFaceSet { coord [0 0 0] coordIndex [0 -1] } }\n Shape { geometry IndexedFaceSet { coord [0 0 0] coordIndex [0 -1] } }\n] }\n";
        let result = extract(doc);
        assert_eq!(result.meshes.len(), 2);
        assert_eq!(result.document.matches("_placeholder").count(), 2);
        for (_, record) in result.meshes.iter() {
            assert_eq!(result.document.matches(&record.key.placeholder()).count(), 1);
        }
    }

    #[test]
    fn test_untouched_lines_are_copied_verbatim() {
        let doc = "#VRML_SIM R2021a utf8\r\n# a comment with { brace\r\n\r\nSolid {\r\n  translation 0 0.1 0\r\n}\r\n";
        let result = extract(doc);
        assert_eq!(result.document, doc);
        assert!(result.meshes.is_empty());
    }

    #[test]
    fn test_texcoord_without_index_reuses_coord_index() {
        let doc = "IndexedFaceSet {\n coord [0 0 0 1 0 0 0 1 0]\n texCoord [0 0 1 0 0 1]\n coordIndex [0 1 2 -1]\n}\n";
        let result = extract(doc);
        let (_, record) = result.meshes.iter().next().unwrap();
        assert_eq!(record.tex_coord.as_ref().unwrap().indices, "0 1 2 -1");
    }

    #[test]
    fn test_unclosed_geometry_is_structural_error() {
        let doc = "Shape {\n  geometry IndexedFaceSet {\n    coord [ 0 0 0 ]\n";
        let err = extract_geometry(doc, &ConvertOptions::default()).unwrap_err();
        assert!(matches!(err, ParseError::UnclosedBlock { line: 2, .. }));
    }

    #[test]
    fn test_unmatched_opener_is_structural_error() {
        let doc = "Solid {\n  children [\n  ]\n";
        let err = extract_geometry(doc, &ConvertOptions::default()).unwrap_err();
        assert!(matches!(err, ParseError::UnbalancedDocument { depth: 1 }));
    }

    #[test]
    fn test_unmatched_closer_is_structural_error() {
        let err = extract_geometry("Solid { }\n}\n", &ConvertOptions::default()).unwrap_err();
        assert!(matches!(err, ParseError::UnbalancedClose { line: 2 }));
    }

    #[test]
    fn test_missing_coord_index_is_reported() {
        let err = extract_geometry("IndexedFaceSet { coord [ 0 0 0 ] }\n", &ConvertOptions::default()).unwrap_err();
        assert!(matches!(err, ParseError::MissingField { ref field, line: 1 } if field == "coordIndex"));
    }

    #[test]
    fn test_long_blank_runs_do_not_end_the_document() {
        let mut doc = String::from("Group {\n");
        doc.push_str(&"\n".repeat(25));
        doc.push_str("  children [ Shape { geometry IndexedFaceSet { coord [0 0 0] coordIndex [0 -1] } } ]\n}\n");

        let result = extract(&doc);
        assert_eq!(result.meshes.len(), 1);
        assert!(result.truncated_at.is_none());
    }

    #[test]
    fn test_legacy_blank_line_limit_copies_the_rest() {
        let options = ConvertOptions {
            legacy_blank_line_limit: Some(2),
            ..Default::default()
        };
        let doc = "Group {\n}\n\n\n\nShape { geometry IndexedFaceSet { coord [0 0 0] coordIndex [0 -1] } }\n";
        let result = extract_geometry(doc, &options).unwrap();

        assert_eq!(result.truncated_at, Some(5));
        assert!(result.meshes.is_empty());
        assert_eq!(result.document, doc);
    }
}
