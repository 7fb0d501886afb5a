//! Example: parse a CityGML file and print a summary of its contents
//!
//! ```text
//! cargo run --example parse_citygml -- district.gml [min_lod max_lod]
//! ```
//!
//! Recovered content errors are logged through `tracing`; set `RUST_LOG=debug`
//! to also see skipped elements.

use citygml::{CityObject, ParserConfig, TessellationMode, parse_reader};
use std::env;
use std::fs::File;
use std::io::BufReader;
use std::process;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(env::var("RUST_LOG").unwrap_or_else(|_| "warn,citygml=info".into()))
        .init();

    let args: Vec<String> = env::args().collect();
    if args.len() != 2 && args.len() != 4 {
        eprintln!("Usage: {} <file.gml> [min_lod max_lod]", args[0]);
        process::exit(1);
    }

    let mut config = ParserConfig::new().with_tessellation_mode(TessellationMode::Deferred);
    if args.len() == 4 {
        let (Ok(min), Ok(max)) = (args[2].parse::<u8>(), args[3].parse::<u8>()) else {
            eprintln!("LOD bounds must be integers between 0 and 4");
            process::exit(1);
        };
        config = config.with_lod_range(min, max);
    }

    let file = match File::open(&args[1]) {
        Ok(file) => file,
        Err(e) => {
            eprintln!("Failed to open {}: {}", args[1], e);
            process::exit(1);
        }
    };

    let outcome = match parse_reader(BufReader::new(file), config) {
        Ok(outcome) => outcome,
        Err(e) => {
            eprintln!("Failed to parse {}: {}", args[1], e);
            process::exit(1);
        }
    };
    let model = &outcome.model;

    println!("=== {} ===", model.name().unwrap_or("Unnamed city model"));
    println!("CRS: {}", model.srs_name().unwrap_or("<unspecified>"));
    if let (Some(min), Some(max)) = (model.envelope().min(), model.envelope().max()) {
        println!(
            "Extent: ({:.2}, {:.2}, {:.2}) - ({:.2}, {:.2}, {:.2})",
            min.x, min.y, min.z, max.x, max.y, max.z
        );
    }
    println!("Top-level objects: {}", model.object_count());
    println!("Registered definitions: {}", model.registry().len());
    println!();

    for object in model.objects() {
        print_object(object, 0);
    }

    if !outcome.diagnostics.is_empty() {
        println!("\nDiagnostics ({}):", outcome.diagnostics.len());
        for diagnostic in &outcome.diagnostics {
            println!("  {}", diagnostic);
        }
    }
    if !outcome.unresolved.is_empty() {
        println!("\nUnresolved references ({}):", outcome.unresolved.len());
        for reference in &outcome.unresolved {
            println!("  {}", reference);
        }
    }
}

fn print_object(object: &CityObject, depth: usize) {
    let triangles: usize = object.geometries().iter().map(|g| g.triangle_count()).sum();
    println!(
        "{:indent$}{} {} - {} geometries, {} triangles",
        "",
        object.kind(),
        object.id(),
        object.geometries().len(),
        triangles,
        indent = depth * 2
    );
    for child in object.children() {
        print_object(child, depth + 1);
    }
}
