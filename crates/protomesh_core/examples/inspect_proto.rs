//! Example: Extract and inspect the geometry of a PROTO file.
//!
//! Run with: cargo run --example inspect_proto -- path/to/robot.proto

use std::env;
use std::fs;

use protomesh_core::proto::finalize_names;
use protomesh_core::{extract_geometry, ConvertOptions, ObjMesh};

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        println!("Usage: inspect_proto <path-to-proto-file>");
        println!("\nExamples:");
        println!("  cargo run --example inspect_proto -- robot.proto");
        println!("  cargo run --example inspect_proto -- world.wrl");
        return;
    }

    let path = &args[1];
    println!("Inspecting PROTO file: {}", path);

    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            eprintln!("Error reading {}: {}", path, e);
            return;
        }
    };

    let options = ConvertOptions::default();
    match extract_geometry(&content, &options) {
        Ok(extraction) => {
            println!("\n=== {} geometry node(s) ===", extraction.meshes.len());
            if let Some(line) = extraction.truncated_at {
                println!("Extraction stopped at line {}", line);
            }

            let names = finalize_names(&extraction.meshes, &options);
            for ((_, record), name) in extraction.meshes.iter().zip(&names) {
                match ObjMesh::from_record(record, name) {
                    Ok(mesh) => println!(
                        "  [{}] {} (line {}, depth {}) - {} vertices, {} faces, {:?}",
                        record.key.sequence,
                        name,
                        record.line,
                        record.key.depth,
                        mesh.vertex_count(),
                        mesh.face_count(),
                        mesh.layout()
                    ),
                    Err(e) => println!("  [{}] {} (line {}) - {}", record.key.sequence, name, record.line, e),
                }
            }
        }
        Err(e) => {
            eprintln!("Error extracting geometry: {}", e);
        }
    }
}
