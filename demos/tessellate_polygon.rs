//! Example demonstrating polygon tessellation
//!
//! Triangulates a tilted facade with a window opening and prints the
//! resulting triangles and normals.

use citygml::mesh_ops::Point3;
use citygml::tessellator::{TessellationOptions, tessellate};

fn main() {
    println!("=== Polygon Tessellation Example ===\n");

    // A 10 x 6 facade leaning back by 1 unit over its height
    let facade = [
        Point3::new(0.0, 0.0, 0.0),
        Point3::new(10.0, 0.0, 0.0),
        Point3::new(10.0, 1.0, 6.0),
        Point3::new(0.0, 1.0, 6.0),
    ];
    let window = [
        Point3::new(4.0, 0.25, 1.5),
        Point3::new(4.0, 0.75, 4.5),
        Point3::new(6.0, 0.75, 4.5),
        Point3::new(6.0, 0.25, 1.5),
    ];

    let options = TessellationOptions {
        smooth_normals: true,
    };
    let mesh = match tessellate(&facade, &[&window], options) {
        Ok(mesh) => mesh,
        Err(e) => {
            eprintln!("Tessellation failed: {}", e);
            std::process::exit(1);
        }
    };

    println!(
        "Facade: {} vertices, {} triangles, area {:.3}",
        mesh.vertices.len(),
        mesh.triangle_count(),
        mesh.area()
    );
    for index in 0..mesh.triangle_count() {
        if let Some([a, b, c]) = mesh.triangle(index) {
            println!(
                "  Triangle {}: ({:.2}, {:.2}, {:.2}) ({:.2}, {:.2}, {:.2}) ({:.2}, {:.2}, {:.2})",
                index, a.x, a.y, a.z, b.x, b.y, b.z, c.x, c.y, c.z
            );
        }
    }
    if let Some(normal) = mesh.normal_at(0) {
        println!("Normal: ({:.4}, {:.4}, {:.4})", normal.x, normal.y, normal.z);
    }

    // A ring that collapses to a line cannot be tessellated
    let degenerate = [
        Point3::new(0.0, 0.0, 0.0),
        Point3::new(1.0, 1.0, 1.0),
        Point3::new(2.0, 2.0, 2.0),
    ];
    match tessellate(&degenerate, &[], TessellationOptions::default()) {
        Ok(_) => println!("\nDegenerate ring unexpectedly tessellated"),
        Err(e) => println!("\nDegenerate ring rejected: {}", e),
    }
}
