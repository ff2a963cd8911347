use std::fs;

use protomesh_core::{convert_document, ConvertOptions, MeshNormalizer, NormalizeError, SmoothStatus};
use protomesh_smooth::CreaseSmoother;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Unit cube written with one quad per side and duplicated corners.
const CUBE: &str = r#"#VRML_SIM R2021a utf8
Solid {
  children [
    Shape {
      geometry DEF BOX IndexedFaceSet {
        coord Coordinate {
          point [
            0 0 0, 1 0 0, 1 1 0, 0 1 0,
            0 0 1, 1 0 1, 1 1 1, 0 1 1,
            0 0 0
          ]
        }
        coordIndex [
          0 3 2 1 -1  4 5 6 7 -1
          0 1 5 4 -1  2 3 7 6 -1
          1 2 6 5 -1  8 4 7 3 -1
          0 3 2 1 -1
        ]
      }
    }
  ]
}
"#;

#[test]
fn test_cube_is_cleaned_and_split_at_edges() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("src.proto");
    fs::write(&input, CUBE).unwrap();

    let smoothed = CreaseSmoother
        .smooth_file(&write_raw_cube(dir.path()), 0.0)
        .unwrap();
    // the duplicated corner is welded and the repeated side dropped
    assert_eq!(smoothed.mesh.positions.len(), 8);
    assert_eq!(smoothed.faces.len(), 12);
    // flat shading: each corner of each side gets that side's normal
    assert_eq!(smoothed.normals.len(), 6 * 4);

    let output = dir.path().join("box.proto");
    let report = convert_document(&input, &output, &ConvertOptions::default(), Some(&CreaseSmoother)).unwrap();
    assert_eq!(report.meshes[0].smooth, SmoothStatus::Smoothed);

    let smooth_obj = fs::read_to_string(dir.path().join("box_meshes/BOX_SMOOTH.obj")).unwrap();
    assert!(smooth_obj.starts_with("o BOX\n"));
    assert_eq!(smooth_obj.lines().filter(|l| l.starts_with("v ")).count(), 8);
    assert_eq!(smooth_obj.lines().filter(|l| l.starts_with("vn ")).count(), 24);
    assert_eq!(smooth_obj.lines().filter(|l| l.starts_with("f ")).count(), 12);
}

#[test]
fn test_wide_crease_angle_gives_one_normal_per_corner_vertex() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let smoothed = CreaseSmoother
        .smooth_file(&write_raw_cube(dir.path()), std::f64::consts::PI)
        .unwrap();
    assert_eq!(smoothed.normals.len(), 8);
}

#[test]
fn test_mesh_without_faces_is_rejected() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("flat.obj");
    // all three corners collapse onto one line
    fs::write(&path, "o flat\nv 0 0 0\nv 1 0 0\nv 2 0 0\nf 1 2 3\n").unwrap();

    let err = CreaseSmoother.normalize(&path, 0.0).unwrap_err();
    assert!(matches!(err, NormalizeError::Rejected { .. }));
}

fn write_raw_cube(dir: &std::path::Path) -> std::path::PathBuf {
    let path = dir.join("cube.obj");
    let mut obj = String::from("o cube\n");
    for p in [
        "0 0 0", "1 0 0", "1 1 0", "0 1 0", "0 0 1", "1 0 1", "1 1 1", "0 1 1", "0 0 0",
    ] {
        obj.push_str(&format!("v {}\n", p));
    }
    for f in ["1 4 3 2", "5 6 7 8", "1 2 6 5", "3 4 8 7", "2 3 7 6", "9 5 8 4", "1 4 3 2"] {
        obj.push_str(&format!("f {}\n", f));
    }
    fs::write(&path, obj).unwrap();
    path
}
