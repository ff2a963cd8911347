//! Mesh naming.
//!
//! A `name` field names the still-unnamed meshes captured a fixed number of
//! scopes below it (by default two and four: geometry directly in the
//! node's `children`, and geometry one container deeper). Meshes nobody
//! claims fall back to `<default-base-name><index>` when names are final.

use std::collections::HashSet;

use super::types::MeshArena;
use crate::config::ConvertOptions;

/// `name IS name` inside a PROTO body; maps to the default base name.
pub const INHERITED_NAME: &str = "IS";

/// Assign `<declared>_<n>` to every unnamed mesh at one of the configured
/// depth offsets below `depth`, in creation order. Returns how many
/// meshes were named.
pub fn resolve_names(meshes: &mut MeshArena, declared: &str, depth: usize, options: &ConvertOptions) -> usize {
    let base = if declared == INHERITED_NAME {
        options.default_base_name.as_str()
    } else {
        declared
    };

    let mut counter = 0;
    for (_, record) in meshes.iter_mut() {
        if record.name.is_some() {
            continue;
        }
        let claimed = options
            .name_offsets
            .iter()
            .any(|offset| record.key.depth == depth + offset);
        if claimed {
            record.name = Some(format!("{}_{}", base, counter));
            counter += 1;
        }
    }

    counter
}

/// Make a name usable as a file stem.
pub fn sanitize_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_whitespace() || c.is_control() => '_',
            c => c,
        })
        .collect();

    if cleaned.is_empty() || cleaned.chars().all(|c| c == '.') {
        format!("_{}", cleaned)
    } else {
        cleaned
    }
}

/// Final file stem of every mesh, indexed by handle.
///
/// Unnamed meshes get `<default-base-name><index>`. Names are sanitized and
/// made unique by appending `_<k>`. A name also reserves its smoothed
/// variant `<name><smooth-suffix>`, and stems are compared ignoring ASCII
/// case, so no two meshes share a file on a case-insensitive filesystem.
pub fn finalize_names(meshes: &MeshArena, options: &ConvertOptions) -> Vec<String> {
    let suffix = options.smooth_suffix.to_ascii_lowercase();
    let mut taken = HashSet::with_capacity(meshes.len() * 2);
    let mut names = Vec::with_capacity(meshes.len());

    for (handle, record) in meshes.iter() {
        let base = match &record.name {
            Some(name) => sanitize_name(name),
            None => sanitize_name(&format!("{}{}", options.default_base_name, handle.index())),
        };

        let stems = |name: &str| {
            let plain = name.to_ascii_lowercase();
            let smooth = format!("{}{}", plain, suffix);
            (plain, smooth)
        };

        let mut name = base.clone();
        let mut k = 1;
        loop {
            let (plain, smooth) = stems(&name);
            if !taken.contains(&plain) && !taken.contains(&smooth) {
                taken.insert(plain);
                taken.insert(smooth);
                break;
            }
            name = format!("{}_{}", base, k);
            k += 1;
        }
        if name != base {
            log::warn!("Mesh name '{}' is used more than once, writing '{}'", base, name);
        }

        names.push(name);
    }

    names
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proto::types::{MeshKey, MeshRecord};

    fn arena(depths: &[usize]) -> MeshArena {
        let mut meshes = MeshArena::new();
        for &depth in depths {
            let sequence = meshes.next_sequence();
            meshes.push(MeshRecord {
                key: MeshKey { depth, sequence },
                line: sequence,
                coord: "0 0 0".to_string(),
                coord_index: "0 -1".to_string(),
                tex_coord: None,
                normal: None,
                crease_angle: None,
                name: None,
            });
        }
        meshes
    }

    fn names(meshes: &MeshArena) -> Vec<Option<String>> {
        meshes.iter().map(|(_, r)| r.name.clone()).collect()
    }

    #[test]
    fn test_only_fixed_offsets_are_claimed() {
        let mut meshes = arena(&[3, 4, 5, 6]);
        let assigned = resolve_names(&mut meshes, "arm", 1, &ConvertOptions::default());

        assert_eq!(assigned, 2);
        assert_eq!(
            names(&meshes),
            vec![Some("arm_0".to_string()), None, Some("arm_1".to_string()), None]
        );
    }

    #[test]
    fn test_offset_one_stays_unresolved() {
        let mut meshes = arena(&[2]);
        resolve_names(&mut meshes, "link", 1, &ConvertOptions::default());
        assert_eq!(names(&meshes), vec![None]);
        assert_eq!(finalize_names(&meshes, &ConvertOptions::default()), vec!["base_link0"]);
    }

    #[test]
    fn test_named_records_are_not_renamed() {
        let mut meshes = arena(&[3, 3]);
        resolve_names(&mut meshes, "first", 1, &ConvertOptions::default());
        let assigned = resolve_names(&mut meshes, "second", 1, &ConvertOptions::default());
        assert_eq!(assigned, 0);
        assert_eq!(
            names(&meshes),
            vec![Some("first_0".to_string()), Some("first_1".to_string())]
        );
    }

    #[test]
    fn test_is_maps_to_default_base_name() {
        let mut meshes = arena(&[4]);
        resolve_names(&mut meshes, INHERITED_NAME, 2, &ConvertOptions::default());
        assert_eq!(names(&meshes), vec![Some("base_link_0".to_string())]);
    }

    #[test]
    fn test_counter_restarts_per_event() {
        let mut meshes = arena(&[3, 7]);
        resolve_names(&mut meshes, "a", 1, &ConvertOptions::default());
        resolve_names(&mut meshes, "b", 5, &ConvertOptions::default());
        assert_eq!(
            names(&meshes),
            vec![Some("a_0".to_string()), Some("b_0".to_string())]
        );
    }

    #[test]
    fn test_finalize_falls_back_to_index() {
        let mut meshes = arena(&[3, 9, 9]);
        resolve_names(&mut meshes, "body", 1, &ConvertOptions::default());
        assert_eq!(
            finalize_names(&meshes, &ConvertOptions::default()),
            vec!["body_0", "base_link1", "base_link2"]
        );
    }

    #[test]
    fn test_finalize_deduplicates() {
        let mut meshes = arena(&[0, 0, 0]);
        for (_, record) in meshes.iter_mut() {
            record.name = Some("wheel".to_string());
        }
        assert_eq!(
            finalize_names(&meshes, &ConvertOptions::default()),
            vec!["wheel", "wheel_1", "wheel_2"]
        );
    }

    fn named(names: &[&str]) -> MeshArena {
        let mut meshes = arena(&vec![0; names.len()]);
        for ((_, record), name) in meshes.iter_mut().zip(names) {
            record.name = Some(name.to_string());
        }
        meshes
    }

    #[test]
    fn test_finalize_reserves_smoothed_variant() {
        let options = ConvertOptions::default();
        assert_eq!(finalize_names(&named(&["a", "a_SMOOTH"]), &options), vec!["a", "a_SMOOTH_1"]);
        assert_eq!(finalize_names(&named(&["a_SMOOTH", "a"]), &options), vec!["a_SMOOTH", "a_1"]);
    }

    #[test]
    fn test_finalize_ignores_case() {
        let options = ConvertOptions::default();
        assert_eq!(finalize_names(&named(&["Wheel", "wheel"]), &options), vec!["Wheel", "wheel_1"]);
        assert_eq!(finalize_names(&named(&["a", "A_smooth"]), &options), vec!["a", "A_smooth_1"]);
    }

    #[test]
    fn test_sanitize_name() {
        assert_eq!(sanitize_name("left wheel"), "left_wheel");
        assert_eq!(sanitize_name("a/b\\c"), "a_b_c");
        assert_eq!(sanitize_name(".."), "_..");
        assert_eq!(sanitize_name("arm_0"), "arm_0");
    }
}
