//! Intermediate types produced by the geometry extractor.
//!
//! These types hold raw field text captured from the document, before the
//! mesh serializer decodes it into numbers.

/// Handle to a [`MeshRecord`] inside a [`MeshArena`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MeshHandle(usize);

impl MeshHandle {
    /// Position of the record in creation order.
    pub fn index(self) -> usize {
        self.0
    }
}

/// Identity of a captured geometry node: the depth it was found at and its
/// 1-based sequence number in the document.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MeshKey {
    pub depth: usize,
    pub sequence: usize,
}

impl MeshKey {
    /// The token standing in for this record's file reference until names
    /// are final. The trailing `_placeholder` keeps tokens from prefixing
    /// one another.
    pub fn placeholder(&self) -> String {
        format!("MeshID_{}_{}_placeholder", self.depth, self.sequence)
    }
}

/// An attribute array together with the index stream addressing it.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AttributeStream {
    /// Raw array contents (brackets stripped, whitespace collapsed)
    pub values: String,

    /// Raw sentinel-delimited index stream
    pub indices: String,
}

/// A geometry node captured from the document.
#[derive(Clone, Debug, PartialEq)]
pub struct MeshRecord {
    pub key: MeshKey,

    /// Line of the geometry marker (1-based)
    pub line: usize,

    /// Raw `coord` array
    pub coord: String,

    /// Raw `coordIndex` stream
    pub coord_index: String,

    /// Texture coordinates, present as a unit or not at all
    pub tex_coord: Option<AttributeStream>,

    /// Normals, present as a unit or not at all
    pub normal: Option<AttributeStream>,

    /// Raw `creaseAngle` value
    pub crease_angle: Option<String>,

    /// Resolved name, filled by the declaring `DEF` or the name resolver
    pub name: Option<String>,
}

/// Owns every [`MeshRecord`] of one conversion, in creation order.
#[derive(Clone, Debug, Default)]
pub struct MeshArena {
    records: Vec<MeshRecord>,
}

impl MeshArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a record and return its handle.
    pub fn push(&mut self, record: MeshRecord) -> MeshHandle {
        self.records.push(record);
        MeshHandle(self.records.len() - 1)
    }

    pub fn get(&self, handle: MeshHandle) -> &MeshRecord {
        &self.records[handle.0]
    }

    pub fn get_mut(&mut self, handle: MeshHandle) -> &mut MeshRecord {
        &mut self.records[handle.0]
    }

    /// Sequence number the next pushed record will get.
    pub fn next_sequence(&self) -> usize {
        self.records.len() + 1
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn handles(&self) -> impl Iterator<Item = MeshHandle> {
        (0..self.records.len()).map(MeshHandle)
    }

    pub fn iter(&self) -> impl Iterator<Item = (MeshHandle, &MeshRecord)> {
        self.records
            .iter()
            .enumerate()
            .map(|(i, r)| (MeshHandle(i), r))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (MeshHandle, &mut MeshRecord)> {
        self.records
            .iter_mut()
            .enumerate()
            .map(|(i, r)| (MeshHandle(i), r))
    }
}

/// The nearest enclosing `DEF` name of a mesh-ancestor container.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DefContext {
    pub identifier: String,

    /// Depth at the `DEF` token, before the container's opening brace
    pub depth: usize,
}

/// Scanner state carried from one line to the next.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ScanState {
    /// Number of currently open `{` / `[` scopes
    pub depth: usize,

    pub def_context: Option<DefContext>,

    /// Consecutive blank lines seen so far
    pub blank_run: usize,
}

impl ScanState {
    /// Enter a scope.
    pub fn open(mut self) -> Self {
        self.depth += 1;
        self
    }

    /// Leave a scope, dropping the `DEF` context once the scope holding its
    /// container is closed; later siblings in that scope still see it.
    /// Returns `None` when there is no scope to leave.
    pub fn close(mut self) -> Option<Self> {
        self.depth = self.depth.checked_sub(1)?;
        if let Some(ctx) = &self.def_context {
            if self.depth < ctx.depth {
                self.def_context = None;
            }
        }
        Some(self)
    }
}
