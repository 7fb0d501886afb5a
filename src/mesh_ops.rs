//! Triangle and ring math on nalgebra types
//!
//! This module provides the small geometric kernels shared by the tessellator,
//! the envelope code and consumers of tessellated meshes:
//! - Face normals and area-weighted vertex normals
//! - Triangle and ring areas
//! - Best-fit plane normals (Newell's method)
//! - Projection of 3D rings onto a 2D plane basis

/// A 3D point in document coordinates
pub type Point3 = nalgebra::Point3<f64>;

/// A 3D vector
pub type Vector3 = nalgebra::Vector3<f64>;

/// A 2D point in a projected plane basis
pub type Point2 = nalgebra::Point2<f64>;

/// Calculate the unit normal of a triangle
///
/// Returns the zero vector for degenerate triangles.
///
/// # Example
/// ```
/// use citygml::mesh_ops::{calculate_face_normal, Point3};
///
/// let normal = calculate_face_normal(
///     &Point3::new(0.0, 0.0, 0.0),
///     &Point3::new(1.0, 0.0, 0.0),
///     &Point3::new(0.0, 1.0, 0.0),
/// );
/// assert!((normal.z - 1.0).abs() < 1e-12);
/// ```
pub fn calculate_face_normal(v0: &Point3, v1: &Point3, v2: &Point3) -> Vector3 {
    let cross = (v1 - v0).cross(&(v2 - v0));
    let magnitude = cross.norm();

    if magnitude > 0.0 {
        cross / magnitude
    } else {
        Vector3::zeros()
    }
}

/// Area of a 3D triangle
pub fn triangle_area(v0: &Point3, v1: &Point3, v2: &Point3) -> f64 {
    (v1 - v0).cross(&(v2 - v0)).norm() * 0.5
}

/// Signed area of a 2D triangle (positive when counter-clockwise)
pub fn signed_area_2d(a: &Point2, b: &Point2, c: &Point2) -> f64 {
    ((b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)) * 0.5
}

/// Signed area of a closed 2D ring (shoelace formula, positive when counter-clockwise)
pub fn ring_signed_area_2d(points: &[Point2]) -> f64 {
    let n = points.len();
    if n < 3 {
        return 0.0;
    }

    let mut twice_area = 0.0;
    for i in 0..n {
        let p = &points[i];
        let q = &points[(i + 1) % n];
        twice_area += p.x * q.y - q.x * p.y;
    }
    twice_area * 0.5
}

/// Unnormalized best-fit plane normal of a closed ring (Newell's method)
///
/// The magnitude of the returned vector is twice the ring's projected area,
/// so it doubles as an area measure for planar rings.
pub fn newell_normal(points: &[Point3]) -> Vector3 {
    let n = points.len();
    let mut normal = Vector3::zeros();

    for i in 0..n {
        let current = &points[i];
        let next = &points[(i + 1) % n];

        normal.x += (current.y - next.y) * (current.z + next.z);
        normal.y += (current.z - next.z) * (current.x + next.x);
        normal.z += (current.x - next.x) * (current.y + next.y);
    }

    normal
}

/// Area of a closed planar 3D ring
pub fn ring_area(points: &[Point3]) -> f64 {
    newell_normal(points).norm() * 0.5
}

/// Orthonormal plane basis used to flatten rings for triangulation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaneBasis {
    /// Point on the plane mapped to the 2D origin
    pub origin: Point3,
    /// Unit normal of the plane
    pub normal: Vector3,
    /// First in-plane axis
    pub u_axis: Vector3,
    /// Second in-plane axis, with `u_axis × v_axis == normal`
    pub v_axis: Vector3,
}

impl PlaneBasis {
    /// Build a basis from an origin and a unit normal
    ///
    /// The reference axis is the world axis least parallel to the normal, which
    /// keeps the cross products well conditioned.
    pub fn new(origin: Point3, normal: Vector3) -> Self {
        let abs_x = normal.x.abs();
        let abs_y = normal.y.abs();
        let abs_z = normal.z.abs();

        let reference = if abs_x <= abs_y && abs_x <= abs_z {
            Vector3::new(1.0, 0.0, 0.0)
        } else if abs_y <= abs_z {
            Vector3::new(0.0, 1.0, 0.0)
        } else {
            Vector3::new(0.0, 0.0, 1.0)
        };

        let u_axis = normal.cross(&reference).normalize();
        let v_axis = normal.cross(&u_axis).normalize();

        Self {
            origin,
            normal,
            u_axis,
            v_axis,
        }
    }

    /// Project a point onto the plane, returning its 2D coordinates
    pub fn project(&self, point: &Point3) -> Point2 {
        let v = point - self.origin;
        Point2::new(v.dot(&self.u_axis), v.dot(&self.v_axis))
    }

    /// Project a whole ring
    pub fn project_ring(&self, points: &[Point3]) -> Vec<Point2> {
        points.iter().map(|p| self.project(p)).collect()
    }
}

/// Calculate area-weighted vertex normals for an indexed triangle list
///
/// For each vertex, accumulates the unnormalized normals of all adjacent
/// triangles (their magnitude is twice the triangle area, which gives the area
/// weighting for free) and normalizes the sum. Degenerate triangles and
/// out-of-range indices are skipped. Vertices not referenced by any valid
/// triangle get the zero vector.
pub fn calculate_vertex_normals(vertices: &[Point3], indices: &[usize]) -> Vec<Vector3> {
    let mut normals = vec![Vector3::zeros(); vertices.len()];

    for triangle in indices.chunks_exact(3) {
        let (a, b, c) = (triangle[0], triangle[1], triangle[2]);
        if a >= vertices.len() || b >= vertices.len() || c >= vertices.len() {
            continue;
        }

        let area_weighted_normal = (vertices[b] - vertices[a]).cross(&(vertices[c] - vertices[a]));
        if area_weighted_normal.norm() > 0.0 {
            normals[a] += area_weighted_normal;
            normals[b] += area_weighted_normal;
            normals[c] += area_weighted_normal;
        }
    }

    normals
        .into_iter()
        .map(|n| {
            let magnitude = n.norm();
            if magnitude > 0.0 { n / magnitude } else { n }
        })
        .collect()
}

/// Total area of an indexed triangle list
pub fn mesh_area(vertices: &[Point3], indices: &[usize]) -> f64 {
    indices
        .chunks_exact(3)
        .filter(|t| t.iter().all(|&i| i < vertices.len()))
        .map(|t| triangle_area(&vertices[t[0]], &vertices[t[1]], &vertices[t[2]]))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_square() -> Vec<Point3> {
        vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ]
    }

    #[test]
    fn test_face_normal_degenerate() {
        let p = Point3::new(1.0, 1.0, 1.0);
        assert_eq!(calculate_face_normal(&p, &p, &p), Vector3::zeros());
    }

    #[test]
    fn test_newell_normal_square() {
        let normal = newell_normal(&unit_square());
        assert!((normal.z - 2.0).abs() < 1e-12);
        assert!((ring_area(&unit_square()) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_newell_normal_vertical_wall() {
        let wall = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 3.0),
            Point3::new(0.0, 0.0, 3.0),
        ];
        let normal = newell_normal(&wall).normalize();
        assert!((normal.y.abs() - 1.0).abs() < 1e-12);
        assert!((ring_area(&wall) - 6.0).abs() < 1e-12);
    }

    #[test]
    fn test_plane_basis_is_right_handed() {
        let basis = PlaneBasis::new(Point3::origin(), Vector3::new(0.0, 0.0, 1.0));
        let cross = basis.u_axis.cross(&basis.v_axis);
        assert!((cross - basis.normal).norm() < 1e-12);

        let projected = basis.project_ring(&unit_square());
        assert!((ring_signed_area_2d(&projected) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_vertex_normals_single_triangle() {
        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(5.0, 5.0, 5.0),
        ];
        let normals = calculate_vertex_normals(&vertices, &[0, 1, 2]);
        for normal in &normals[..3] {
            assert!((normal.z - 1.0).abs() < 1e-12);
        }
        assert_eq!(normals[3], Vector3::zeros());
    }

    #[test]
    fn test_mesh_area_skips_invalid_indices() {
        let square = unit_square();
        let area = mesh_area(&square, &[0, 1, 2, 0, 2, 3, 0, 1, 9]);
        assert!((area - 1.0).abs() < 1e-12);
    }
}
