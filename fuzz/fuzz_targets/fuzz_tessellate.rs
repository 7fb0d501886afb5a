#![no_main]

use citygml::mesh_ops::Point3;
use citygml::tessellator::{TessellationOptions, tessellate};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Interpret the input as 3D points; the first byte splits exterior and hole
    let Some((&split, rest)) = data.split_first() else {
        return;
    };
    let points: Vec<Point3> = rest
        .chunks_exact(3)
        .map(|c| Point3::new(c[0] as f64, c[1] as f64, c[2] as f64))
        .collect();
    let split = (split as usize).min(points.len());
    let (exterior, hole) = points.split_at(split);

    if let Ok(mesh) = tessellate(exterior, &[hole], TessellationOptions::default()) {
        assert!(mesh.indices.iter().all(|&i| i < mesh.vertices.len()));
    }
});
