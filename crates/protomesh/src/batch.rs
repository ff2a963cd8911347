//! Directory conversion.
//!
//! The source tree is copied to the first free `<dir>_multiProto_<n>`
//! sibling, then every `.proto` file of the source is converted into its
//! place in the copy. The source tree itself is never modified.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use protomesh_core::{convert_document, ConvertOptions, MeshNormalizer};

/// Why a document was left as copied.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SkipReason {
    /// First line is not a `#VRML` header
    NoHeader,

    /// Header declares the `hidden` tag
    Hidden,
}

/// Outcome of a directory conversion.
#[derive(Debug, Default)]
pub struct BatchSummary {
    pub output_dir: PathBuf,
    pub converted: usize,
    pub skipped: usize,
    pub failed: Vec<PathBuf>,
}

/// Check the header comment block of a document.
pub fn skip_reason(content: &str) -> Option<SkipReason> {
    let mut lines = content.lines();
    match lines.next() {
        Some(first) if first.trim_start_matches('\u{feff}').starts_with("#VRML") => {}
        _ => return Some(SkipReason::NoHeader),
    }

    // `# tags: nonDeterministic, hidden`
    let hidden = lines
        .take_while(|line| line.trim_start().starts_with('#'))
        .filter_map(|line| line.trim_start().trim_start_matches('#').trim().strip_prefix("tags:"))
        .flat_map(|tags| tags.split(|c: char| c == ',' || c.is_whitespace()))
        .any(|tag| tag == "hidden");

    hidden.then_some(SkipReason::Hidden)
}

/// First `<dir>_multiProto_<n>` sibling of `source` that does not exist yet.
pub fn output_dir_for(source: &Path) -> Result<PathBuf> {
    let name = source
        .file_name()
        .and_then(|n| n.to_str())
        .with_context(|| format!("Cannot name a copy of {}", source.display()))?;
    let parent = source.parent().unwrap_or_else(|| Path::new("."));

    let mut n = 0;
    loop {
        let candidate = parent.join(format!("{}_multiProto_{}", name, n));
        if !candidate.exists() {
            return Ok(candidate);
        }
        n += 1;
    }
}

/// Recursively copy a directory.
pub fn copy_tree(source: &Path, dest: &Path) -> Result<()> {
    fs::create_dir_all(dest).with_context(|| format!("Failed to create {}", dest.display()))?;

    for entry in fs::read_dir(source).with_context(|| format!("Failed to read {}", source.display()))? {
        let entry = entry?;
        let target = dest.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_tree(&entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), &target)
                .with_context(|| format!("Failed to copy {}", entry.path().display()))?;
        }
    }

    Ok(())
}

/// Every `.proto` file below `root`, relative to it, in sorted order.
pub fn find_documents(root: &Path) -> Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    collect_documents(root, Path::new(""), &mut found)?;
    found.sort();
    Ok(found)
}

fn collect_documents(root: &Path, relative: &Path, found: &mut Vec<PathBuf>) -> Result<()> {
    let dir = root.join(relative);
    for entry in fs::read_dir(&dir).with_context(|| format!("Failed to read {}", dir.display()))? {
        let entry = entry?;
        let path = relative.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            collect_documents(root, &path, found)?;
        } else if path.extension().is_some_and(|ext| ext == "proto") {
            found.push(path);
        }
    }
    Ok(())
}

/// Convert every document of `source` into a fresh copy of the tree.
///
/// A failing document is logged and counted; the others still convert.
pub fn convert_tree(
    source: &Path,
    options: &ConvertOptions,
    normalizer: Option<&dyn MeshNormalizer>,
) -> Result<BatchSummary> {
    let output_dir = output_dir_for(source)?;
    log::info!("Copying {} to {}", source.display(), output_dir.display());
    copy_tree(source, &output_dir)?;

    let documents = find_documents(source)?;
    log::info!("Found {} PROTO document(s)", documents.len());

    let mut summary = BatchSummary {
        output_dir: output_dir.clone(),
        ..Default::default()
    };

    for relative in documents {
        let input = source.join(&relative);
        let content = match fs::read_to_string(&input) {
            Ok(content) => content,
            Err(e) => {
                log::error!("Failed to read {}: {}", input.display(), e);
                summary.failed.push(relative);
                continue;
            }
        };

        if let Some(reason) = skip_reason(&content) {
            log::info!("Skipping {} ({:?})", relative.display(), reason);
            summary.skipped += 1;
            continue;
        }

        match convert_document(&input, output_dir.join(&relative), options, normalizer) {
            Ok(report) => {
                for mesh in report.unsmoothed() {
                    log::warn!("{}: {} has no smoothed variant", relative.display(), mesh.name);
                }
                summary.converted += 1;
            }
            Err(e) => {
                log::error!("{}", e);
                summary.failed.push(relative);
            }
        }
    }

    Ok(summary)
}
