//! Polygon tessellation
//!
//! This module converts planar (or nearly planar) 3D polygons with holes into
//! indexed triangle meshes:
//! - The best-fit plane normal comes from Newell's method on the exterior ring
//! - All rings are projected onto that plane, which absorbs small non-planar noise
//! - Holes are stitched into the same ear-clipping pass (`earcutr`), so cavities
//!   are never filled
//! - Every output triangle is wound counter-clockwise around the plane normal
//!
//! Degenerate input is rejected with a [`TessellationError`] rather than
//! producing incorrect triangles.

use std::collections::HashSet;

use crate::mesh_ops::{
    PlaneBasis, Point2, Point3, Vector3, calculate_vertex_normals, mesh_area, newell_normal,
    ring_signed_area_2d, signed_area_2d,
};

/// Relative tolerance used for orientation and coincidence tests
const RELATIVE_EPSILON: f64 = 1e-10;

/// Relative tolerance of the area check between triangles and rings
const AREA_TOLERANCE: f64 = 1e-6;

/// Error type for polygon tessellation
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TessellationError {
    /// A ring has too few distinct points to bound an area
    #[error("Ring {ring} has too few distinct points: {count} (minimum 3 required)")]
    TooFewPoints {
        /// Ring index: 0 is the exterior, holes follow
        ring: usize,
        /// Number of distinct points found
        count: usize,
    },

    /// A ring contains a NaN or infinite coordinate
    #[error("Ring {ring} has a non-finite coordinate")]
    NonFiniteCoordinate {
        /// Ring index: 0 is the exterior, holes follow
        ring: usize,
    },

    /// The exterior ring encloses no area (all points collinear)
    #[error("Exterior ring is degenerate (zero area)")]
    Degenerate,

    /// A ring crosses or touches itself
    #[error("Ring {ring} intersects itself")]
    SelfIntersection {
        /// Ring index: 0 is the exterior, holes follow
        ring: usize,
    },

    /// A hole extends outside the exterior ring's footprint
    #[error("Hole {hole} lies outside the exterior ring")]
    HoleOutsideExterior {
        /// Hole index (0-based among holes)
        hole: usize,
    },

    /// A hole coincides with the exterior ring
    #[error("Hole {hole} coincides with the exterior ring")]
    HoleCoincidentWithExterior {
        /// Hole index (0-based among holes)
        hole: usize,
    },

    /// Two holes overlap
    #[error("Holes {first} and {second} overlap")]
    OverlappingHoles {
        /// First hole index
        first: usize,
        /// Second hole index
        second: usize,
    },

    /// The triangulation itself failed or produced an inconsistent result
    #[error("Triangulation failed: {0}")]
    TriangulationFailed(String),
}

/// Options controlling tessellation output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TessellationOptions {
    /// Produce per-vertex normals (area-weighted) instead of one polygon normal
    pub smooth_normals: bool,
}

/// Normals attached to a tessellated polygon
#[derive(Debug, Clone, PartialEq)]
pub enum Normals {
    /// One unit normal shared by every triangle
    PerPolygon(Vector3),
    /// One unit normal per vertex, aligned with the vertex buffer
    PerVertex(Vec<Vector3>),
}

/// Render-ready triangle mesh of one polygon
///
/// The vertex buffer holds the exterior ring's points followed by each hole's
/// points, in ring order. `indices` is a flat list, three entries per triangle.
#[derive(Debug, Clone, PartialEq)]
pub struct TriangleMesh {
    /// Merged vertex buffer (exterior, then holes)
    pub vertices: Vec<Point3>,
    /// Flat triangle index list into `vertices`
    pub indices: Vec<usize>,
    /// Polygon or vertex normals
    pub normals: Normals,
}

impl TriangleMesh {
    /// Number of triangles
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// True if the mesh has no triangles
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Sum of the triangle areas
    pub fn area(&self) -> f64 {
        mesh_area(&self.vertices, &self.indices)
    }

    /// Corner points of triangle `index`
    pub fn triangle(&self, index: usize) -> Option<[Point3; 3]> {
        let t = self.indices.get(index * 3..index * 3 + 3)?;
        Some([self.vertices[t[0]], self.vertices[t[1]], self.vertices[t[2]]])
    }

    /// Normal to use at `vertex`
    pub fn normal_at(&self, vertex: usize) -> Option<Vector3> {
        match self.normals {
            Normals::PerPolygon(normal) => (vertex < self.vertices.len()).then_some(normal),
            Normals::PerVertex(ref normals) => normals.get(vertex).copied(),
        }
    }
}

/// Tessellate a polygon given as an exterior ring and hole rings
///
/// Rings are open point sequences (no repeated closing point). The returned
/// vertex buffer is the concatenation of the exterior and the holes, unchanged,
/// so per-ring data such as texture coordinates lines up with it.
///
/// # Errors
///
/// Returns an error if any ring has fewer than 3 distinct points, the exterior
/// has no area, a ring intersects itself, a hole leaves or coincides with the
/// exterior, or two holes overlap.
///
/// # Example
///
/// ```
/// use citygml::mesh_ops::Point3;
/// use citygml::tessellator::{tessellate, TessellationOptions};
///
/// let square = vec![
///     Point3::new(0.0, 0.0, 0.0),
///     Point3::new(1.0, 0.0, 0.0),
///     Point3::new(1.0, 1.0, 0.0),
///     Point3::new(0.0, 1.0, 0.0),
/// ];
///
/// let mesh = tessellate(&square, &[], TessellationOptions::default())
///     .expect("Failed to tessellate");
///
/// assert_eq!(mesh.triangle_count(), 2);
/// assert!((mesh.area() - 1.0).abs() < 1e-9);
/// ```
pub fn tessellate(
    exterior: &[Point3],
    holes: &[&[Point3]],
    options: TessellationOptions,
) -> Result<TriangleMesh, TessellationError> {
    for (ring, points) in std::iter::once(exterior).chain(holes.iter().copied()).enumerate() {
        if !points.iter().all(|p| p.coords.iter().all(|c| c.is_finite())) {
            return Err(TessellationError::NonFiniteCoordinate { ring });
        }
        check_distinct_points(ring, points)?;
    }

    let scale = ring_scale(exterior);
    let raw_normal = newell_normal(exterior);
    if raw_normal.norm() <= RELATIVE_EPSILON * scale * scale {
        return Err(TessellationError::Degenerate);
    }
    let normal = raw_normal.normalize();
    let basis = PlaneBasis::new(exterior[0], normal);

    let outer_2d = basis.project_ring(exterior);
    let holes_2d: Vec<Vec<Point2>> = holes.iter().map(|h| basis.project_ring(h)).collect();
    let tolerance = RELATIVE_EPSILON * scale;

    check_ring_topology(&outer_2d, &holes_2d, tolerance)?;

    // Flatten into [x0, y0, x1, y1, ...] with hole start offsets
    let total_points = exterior.len() + holes.iter().map(|h| h.len()).sum::<usize>();
    let mut coords = Vec::with_capacity(total_points * 2);
    let mut points_2d = Vec::with_capacity(total_points);
    let mut hole_indices = Vec::with_capacity(holes.len());

    points_2d.extend_from_slice(&outer_2d);
    for hole in &holes_2d {
        hole_indices.push(points_2d.len());
        points_2d.extend_from_slice(hole);
    }
    for p in &points_2d {
        coords.push(p.x);
        coords.push(p.y);
    }

    let mut indices = earcutr::earcut(&coords, &hole_indices, 2)
        .map_err(|e| TessellationError::TriangulationFailed(format!("Earcut error: {}", e)))?;

    if indices.is_empty() {
        return Err(TessellationError::TriangulationFailed(
            "Earcut returned no triangles".to_string(),
        ));
    }

    // Orient every triangle counter-clockwise in the plane basis, which is
    // counter-clockwise around `normal` in 3D.
    let mut triangle_area_2d = 0.0;
    for triangle in indices.chunks_exact_mut(3) {
        let area = signed_area_2d(
            &points_2d[triangle[0]],
            &points_2d[triangle[1]],
            &points_2d[triangle[2]],
        );
        if area < 0.0 {
            triangle.swap(1, 2);
        }
        triangle_area_2d += area.abs();
    }

    let expected_area = ring_signed_area_2d(&outer_2d).abs()
        - holes_2d
            .iter()
            .map(|h| ring_signed_area_2d(h).abs())
            .sum::<f64>();
    let area_tolerance = AREA_TOLERANCE * expected_area.abs().max(f64::MIN_POSITIVE);
    if (triangle_area_2d - expected_area).abs() > area_tolerance {
        return Err(TessellationError::TriangulationFailed(format!(
            "Triangle area {} does not match polygon area {}",
            triangle_area_2d, expected_area
        )));
    }

    let mut vertices = Vec::with_capacity(total_points);
    vertices.extend_from_slice(exterior);
    for hole in holes {
        vertices.extend_from_slice(hole);
    }

    let normals = if options.smooth_normals {
        let per_vertex = calculate_vertex_normals(&vertices, &indices)
            .into_iter()
            .map(|n| if n == Vector3::zeros() { normal } else { n })
            .collect();
        Normals::PerVertex(per_vertex)
    } else {
        Normals::PerPolygon(normal)
    };

    Ok(TriangleMesh {
        vertices,
        indices,
        normals,
    })
}

/// Count pairwise distinct points
pub fn distinct_point_count(points: &[Point3]) -> usize {
    points
        .iter()
        // -0.0 and 0.0 are the same coordinate
        .map(|p| [p.x, p.y, p.z].map(|c| if c == 0.0 { 0 } else { c.to_bits() }))
        .collect::<HashSet<_>>()
        .len()
}

fn check_distinct_points(ring: usize, points: &[Point3]) -> Result<(), TessellationError> {
    let count = distinct_point_count(points);
    if count < 3 {
        return Err(TessellationError::TooFewPoints { ring, count });
    }
    Ok(())
}

/// Diagonal of the ring's bounding box, used to scale tolerances
fn ring_scale(points: &[Point3]) -> f64 {
    let envelope = crate::envelope::Envelope::from_points(points);
    envelope.size().map(|s| s.norm()).unwrap_or(0.0).max(f64::MIN_POSITIVE)
}

/// Ring with consecutive duplicates removed, so every edge has non-zero length
fn dedup_ring(points: &[Point2]) -> Vec<Point2> {
    let mut ring: Vec<Point2> = Vec::with_capacity(points.len());
    for p in points {
        if ring.last() != Some(p) {
            ring.push(*p);
        }
    }
    while ring.len() > 1 && ring.first() == ring.last() {
        ring.pop();
    }
    ring
}

fn edges(ring: &[Point2]) -> impl Iterator<Item = (usize, Point2, Point2)> + '_ {
    let n = ring.len();
    (0..n).map(move |i| (i, ring[i], ring[(i + 1) % n]))
}

fn orientation(a: &Point2, b: &Point2, c: &Point2) -> f64 {
    (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)
}

fn sign(value: f64, tolerance: f64) -> i8 {
    if value > tolerance {
        1
    } else if value < -tolerance {
        -1
    } else {
        0
    }
}

fn on_segment(p: &Point2, a: &Point2, b: &Point2, tolerance: f64) -> bool {
    let length = (b - a).norm();
    sign(orientation(a, b, p), tolerance * length.max(tolerance)) == 0
        && p.x >= a.x.min(b.x) - tolerance
        && p.x <= a.x.max(b.x) + tolerance
        && p.y >= a.y.min(b.y) - tolerance
        && p.y <= a.y.max(b.y) + tolerance
}

/// Segment intersection test
///
/// With `proper_only`, only crossings through both interiors count; otherwise
/// touching and collinear overlap count as well.
fn segments_intersect(
    p1: &Point2,
    p2: &Point2,
    q1: &Point2,
    q2: &Point2,
    tolerance: f64,
    proper_only: bool,
) -> bool {
    let scale_p = (p2 - p1).norm().max(tolerance);
    let scale_q = (q2 - q1).norm().max(tolerance);
    let d1 = sign(orientation(q1, q2, p1), tolerance * scale_q);
    let d2 = sign(orientation(q1, q2, p2), tolerance * scale_q);
    let d3 = sign(orientation(p1, p2, q1), tolerance * scale_p);
    let d4 = sign(orientation(p1, p2, q2), tolerance * scale_p);

    if d1 * d2 < 0 && d3 * d4 < 0 {
        return true;
    }
    if proper_only {
        return false;
    }

    (d1 == 0 && on_segment(p1, q1, q2, tolerance))
        || (d2 == 0 && on_segment(p2, q1, q2, tolerance))
        || (d3 == 0 && on_segment(q1, p1, p2, tolerance))
        || (d4 == 0 && on_segment(q2, p1, p2, tolerance))
}

fn ring_self_intersects(ring: &[Point2], tolerance: f64) -> bool {
    let n = ring.len();
    if n < 4 {
        return false;
    }
    for (i, a1, a2) in edges(ring) {
        for (j, b1, b2) in edges(ring).skip(i + 2) {
            // The first and last edges share the closing vertex
            if i == 0 && j == n - 1 {
                continue;
            }
            if segments_intersect(&a1, &a2, &b1, &b2, tolerance, false) {
                return true;
            }
        }
    }
    false
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Location {
    Inside,
    Outside,
    Boundary,
}

fn locate_point(point: &Point2, ring: &[Point2], tolerance: f64) -> Location {
    let mut inside = false;
    for (_, a, b) in edges(ring) {
        if on_segment(point, &a, &b, tolerance) {
            return Location::Boundary;
        }
        if (a.y > point.y) != (b.y > point.y) {
            let x_cross = a.x + (point.y - a.y) * (b.x - a.x) / (b.y - a.y);
            if point.x < x_cross {
                inside = !inside;
            }
        }
    }
    if inside {
        Location::Inside
    } else {
        Location::Outside
    }
}

fn rings_cross(a: &[Point2], b: &[Point2], tolerance: f64) -> bool {
    edges(a).any(|(_, a1, a2)| {
        edges(b).any(|(_, b1, b2)| segments_intersect(&a1, &a2, &b1, &b2, tolerance, true))
    })
}

fn check_ring_topology(
    outer: &[Point2],
    holes: &[Vec<Point2>],
    tolerance: f64,
) -> Result<(), TessellationError> {
    let outer = dedup_ring(outer);
    if ring_self_intersects(&outer, tolerance) {
        return Err(TessellationError::SelfIntersection { ring: 0 });
    }

    let holes: Vec<Vec<Point2>> = holes.iter().map(|h| dedup_ring(h)).collect();
    for (i, hole) in holes.iter().enumerate() {
        if ring_self_intersects(hole, tolerance) {
            return Err(TessellationError::SelfIntersection { ring: i + 1 });
        }

        let locations: Vec<Location> = hole
            .iter()
            .map(|p| locate_point(p, &outer, tolerance))
            .collect();
        if locations.iter().all(|&l| l == Location::Boundary) {
            return Err(TessellationError::HoleCoincidentWithExterior { hole: i });
        }
        if locations.contains(&Location::Outside) || rings_cross(hole, &outer, tolerance) {
            return Err(TessellationError::HoleOutsideExterior { hole: i });
        }
    }

    for (i, first) in holes.iter().enumerate() {
        for (j, second) in holes.iter().enumerate().skip(i + 1) {
            let overlap = rings_cross(first, second, tolerance)
                || first
                    .iter()
                    .any(|p| locate_point(p, second, tolerance) == Location::Inside)
                || second
                    .iter()
                    .any(|p| locate_point(p, first, tolerance) == Location::Inside)
                || first
                    .iter()
                    .all(|p| locate_point(p, second, tolerance) == Location::Boundary);
            if overlap {
                return Err(TessellationError::OverlappingHoles {
                    first: i,
                    second: j,
                });
            }
        }
    }

    Ok(())
}
