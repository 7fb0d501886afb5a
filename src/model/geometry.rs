//! Spatial primitives: rings, polygons, LOD geometries and implicit geometries

use nalgebra::Matrix4;

use super::appearance::AppearanceBinding;
use crate::envelope::Envelope;
use crate::error::{Error, Result};
use crate::mesh_ops::{Point2, Point3};
use crate::tessellator::{
    TessellationError, TessellationOptions, TriangleMesh, distinct_point_count, tessellate,
};

/// Geometry type tag of a [`Geometry`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GeometryType {
    /// `gml:Solid`
    Solid,
    /// `gml:MultiSolid`
    MultiSolid,
    /// `gml:CompositeSolid`
    CompositeSolid,
    /// `gml:MultiSurface`
    MultiSurface,
    /// `gml:CompositeSurface`
    CompositeSurface,
    /// `gml:TriangulatedSurface`
    TriangulatedSurface,
    /// `gml:Tin`
    Tin,
    /// `gml:Surface`
    Surface,
    /// A bare `gml:Polygon`
    Polygon,
    /// `gml:Shell`
    Shell,
}

impl GeometryType {
    /// Map a GML element local name to a geometry type
    pub fn from_element_name(name: &str) -> Option<Self> {
        Some(match name {
            "Solid" => GeometryType::Solid,
            "MultiSolid" => GeometryType::MultiSolid,
            "CompositeSolid" => GeometryType::CompositeSolid,
            "MultiSurface" => GeometryType::MultiSurface,
            "CompositeSurface" => GeometryType::CompositeSurface,
            "TriangulatedSurface" => GeometryType::TriangulatedSurface,
            "Tin" | "TIN" => GeometryType::Tin,
            "Surface" | "OrientableSurface" => GeometryType::Surface,
            "Polygon" => GeometryType::Polygon,
            "Shell" => GeometryType::Shell,
            _ => return None,
        })
    }
}

/// Closed ring of 3D points
///
/// The closing point is implicit: a ring never stores a last point equal to
/// its first.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearRing {
    id: Option<String>,
    points: Vec<Point3>,
}

impl LinearRing {
    /// Build a ring from document points
    ///
    /// An explicit closing point equal to the first point is removed. With
    /// `require_closed`, a ring whose last point differs from its first is
    /// rejected.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidRing`] when the ring has fewer than 3 distinct points or
    /// is required to be closed and is not.
    pub(crate) fn from_points(
        id: Option<String>,
        mut points: Vec<Point3>,
        require_closed: bool,
    ) -> Result<Self> {
        let closed = points.len() > 1 && points.first() == points.last();
        if require_closed && !closed {
            return Err(Error::InvalidRing(format!(
                "Ring {} is not explicitly closed",
                id.as_deref().unwrap_or("<anonymous>")
            )));
        }
        if closed {
            points.pop();
        }

        let distinct = distinct_point_count(&points);
        if distinct < 3 {
            return Err(Error::InvalidRing(format!(
                "Ring {} has {} distinct points (minimum 3 required)",
                id.as_deref().unwrap_or("<anonymous>"),
                distinct
            )));
        }

        Ok(Self { id, points })
    }

    /// Optional `gml:id`
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Ring points without the closing point
    pub fn points(&self) -> &[Point3] {
        &self.points
    }

    /// Number of stored points
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// True if the ring stores no points
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Envelope of the ring points
    pub fn envelope(&self) -> Envelope {
        Envelope::from_points(&self.points)
    }
}

/// Tessellation state of a polygon
#[derive(Debug, Clone, PartialEq)]
pub enum MeshState {
    /// Not tessellated yet
    Pending,
    /// Tessellated successfully
    Ready(TriangleMesh),
    /// Tessellation was attempted and failed
    Failed(TessellationError),
}

/// Planar face with an exterior ring and optional holes
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    id: Option<String>,
    exterior: LinearRing,
    interiors: Vec<LinearRing>,
    appearances: Vec<AppearanceBinding>,
    mesh: MeshState,
}

impl Polygon {
    pub(crate) fn new(id: Option<String>, exterior: LinearRing) -> Self {
        Self {
            id,
            exterior,
            interiors: Vec::new(),
            appearances: Vec::new(),
            mesh: MeshState::Pending,
        }
    }

    /// Add a hole, discarding any cached mesh
    pub(crate) fn add_interior(&mut self, ring: LinearRing) {
        self.interiors.push(ring);
        self.mesh = MeshState::Pending;
    }

    /// Optional `gml:id`
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Exterior ring
    pub fn exterior(&self) -> &LinearRing {
        &self.exterior
    }

    /// Hole rings
    pub fn interiors(&self) -> &[LinearRing] {
        &self.interiors
    }

    /// Exterior followed by holes
    pub fn rings(&self) -> impl Iterator<Item = &LinearRing> {
        std::iter::once(&self.exterior).chain(self.interiors.iter())
    }

    /// Envelope of the exterior ring
    pub fn envelope(&self) -> Envelope {
        self.exterior.envelope()
    }

    /// Tessellate the polygon, caching the result
    ///
    /// A polygon is tessellated at most once: later calls return the cached
    /// mesh or the cached failure.
    pub(crate) fn tessellate(
        &mut self,
        options: TessellationOptions,
    ) -> std::result::Result<&TriangleMesh, TessellationError> {
        if let MeshState::Pending = self.mesh {
            let holes: Vec<&[Point3]> = self.interiors.iter().map(|r| r.points()).collect();
            self.mesh = match tessellate(self.exterior.points(), &holes, options) {
                Ok(mesh) => MeshState::Ready(mesh),
                Err(err) => MeshState::Failed(err),
            };
        }

        match self.mesh {
            MeshState::Ready(ref mesh) => Ok(mesh),
            MeshState::Failed(ref err) => Err(err.clone()),
            MeshState::Pending => Err(TessellationError::TriangulationFailed(
                "Polygon was not tessellated".to_string(),
            )),
        }
    }

    /// Tessellation state
    pub fn mesh_state(&self) -> &MeshState {
        &self.mesh
    }

    /// Cached triangle mesh, if tessellation succeeded
    pub fn mesh(&self) -> Option<&TriangleMesh> {
        match self.mesh {
            MeshState::Ready(ref mesh) => Some(mesh),
            _ => None,
        }
    }

    /// True once tessellation has been attempted
    pub fn is_tessellated(&self) -> bool {
        !matches!(self.mesh, MeshState::Pending)
    }

    /// All appearance bindings, one per theme
    pub fn appearances(&self) -> &[AppearanceBinding] {
        &self.appearances
    }

    /// Binding for `theme`
    pub fn appearance(&self, theme: &str) -> Option<&AppearanceBinding> {
        self.appearances.iter().find(|b| b.theme == theme)
    }

    fn binding_mut(&mut self, theme: &str) -> &mut AppearanceBinding {
        let index = match self.appearances.iter().position(|b| b.theme == theme) {
            Some(index) => index,
            None => {
                self.appearances.push(AppearanceBinding {
                    theme: theme.to_string(),
                    ..AppearanceBinding::default()
                });
                self.appearances.len() - 1
            }
        };
        &mut self.appearances[index]
    }

    pub(crate) fn bind_material(&mut self, theme: &str, material_id: &str) {
        self.binding_mut(theme).material = Some(material_id.to_string());
    }

    /// Bind a texture with coordinates per ring (exterior first)
    ///
    /// A closing coordinate that repeats the first one is dropped so each ring
    /// has exactly one coordinate per stored point.
    pub(crate) fn bind_texture(
        &mut self,
        theme: &str,
        texture_id: &str,
        mut coordinates: Vec<Vec<Point2>>,
    ) {
        for (coords, ring) in coordinates.iter_mut().zip(self.rings()) {
            if coords.len() == ring.len() + 1 && coords.first() == coords.last() {
                coords.pop();
            }
        }

        let binding = self.binding_mut(theme);
        binding.texture = Some(texture_id.to_string());
        binding.texture_coordinates = coordinates;
    }

    /// Texture coordinates for `theme` aligned with the mesh vertex buffer
    ///
    /// Returns `None` when no texture is bound for the theme or a ring's
    /// coordinate count does not match its point count.
    pub fn texture_coordinates(&self, theme: &str) -> Option<Vec<Point2>> {
        let binding = self.appearance(theme)?;
        binding.texture.as_ref()?;

        let rings: Vec<&LinearRing> = self.rings().collect();
        if binding.texture_coordinates.len() != rings.len() {
            return None;
        }

        let mut merged = Vec::new();
        for (coords, ring) in binding.texture_coordinates.iter().zip(rings) {
            if coords.len() != ring.len() {
                return None;
            }
            merged.extend_from_slice(coords);
        }
        Some(merged)
    }
}

/// Polygons of one object at one level of detail
#[derive(Debug, Clone, PartialEq)]
pub struct Geometry {
    id: Option<String>,
    lod: u8,
    geometry_type: GeometryType,
    srs_name: Option<String>,
    polygons: Vec<Polygon>,
}

impl Geometry {
    pub(crate) fn new(
        id: Option<String>,
        lod: u8,
        geometry_type: GeometryType,
        srs_name: Option<String>,
    ) -> Self {
        Self {
            id,
            lod,
            geometry_type,
            srs_name,
            polygons: Vec::new(),
        }
    }

    pub(crate) fn add_polygon(&mut self, polygon: Polygon) {
        self.polygons.push(polygon);
    }

    /// Optional `gml:id`
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Level of detail (0-4)
    pub fn lod(&self) -> u8 {
        self.lod
    }

    /// Geometry type tag
    pub fn geometry_type(&self) -> GeometryType {
        self.geometry_type
    }

    /// Coordinate reference system name, if known
    pub fn srs_name(&self) -> Option<&str> {
        self.srs_name.as_deref()
    }

    /// Polygons in document order
    pub fn polygons(&self) -> &[Polygon] {
        &self.polygons
    }

    pub(crate) fn polygons_mut(&mut self) -> &mut [Polygon] {
        &mut self.polygons
    }

    /// Union of the polygon envelopes
    pub fn envelope(&self) -> Envelope {
        let mut envelope = Envelope::new();
        for polygon in &self.polygons {
            envelope.union_envelope(&polygon.envelope());
        }
        envelope
    }

    /// Total triangles over all tessellated polygons
    pub fn triangle_count(&self) -> usize {
        self.polygons
            .iter()
            .filter_map(Polygon::mesh)
            .map(TriangleMesh::triangle_count)
            .sum()
    }
}

/// Template geometry of an implicit geometry
#[derive(Debug, Clone, PartialEq)]
pub enum ImplicitTemplate {
    /// Template given inline
    Inline(Geometry),
    /// Template defined elsewhere in the document, by id
    Reference(String),
    /// Only a library object is given
    None,
}

/// A template geometry placed by a transformation at a reference point
#[derive(Debug, Clone, PartialEq)]
pub struct ImplicitGeometry {
    pub(crate) lod: u8,
    pub(crate) mime_type: Option<String>,
    pub(crate) library_object: Option<String>,
    pub(crate) transformation: Matrix4<f64>,
    pub(crate) reference_point: Point3,
    pub(crate) template: ImplicitTemplate,
}

impl ImplicitGeometry {
    pub(crate) fn new(lod: u8) -> Self {
        Self {
            lod,
            mime_type: None,
            library_object: None,
            transformation: Matrix4::identity(),
            reference_point: Point3::origin(),
            template: ImplicitTemplate::None,
        }
    }

    /// Level of detail (0-4)
    pub fn lod(&self) -> u8 {
        self.lod
    }

    /// MIME type of the library object
    pub fn mime_type(&self) -> Option<&str> {
        self.mime_type.as_deref()
    }

    /// External library object reference
    pub fn library_object(&self) -> Option<&str> {
        self.library_object.as_deref()
    }

    /// Row-major 4x4 transformation applied to template points
    pub fn transformation(&self) -> &Matrix4<f64> {
        &self.transformation
    }

    /// Anchor point in world coordinates
    pub fn reference_point(&self) -> Point3 {
        self.reference_point
    }

    /// Template geometry
    pub fn template(&self) -> &ImplicitTemplate {
        &self.template
    }

    /// Map a template point into world coordinates
    pub fn place(&self, point: &Point3) -> Point3 {
        let transformed = self.transformation.transform_point(point);
        transformed + self.reference_point.coords
    }

    /// Envelope of the reference point and, for inline templates, the placed
    /// template points
    pub fn envelope(&self) -> Envelope {
        let mut envelope = Envelope::new();
        envelope.union_point(&self.reference_point);
        if let ImplicitTemplate::Inline(ref geometry) = self.template {
            for polygon in geometry.polygons() {
                for ring in polygon.rings() {
                    for point in ring.points() {
                        envelope.union_point(&self.place(point));
                    }
                }
            }
        }
        envelope
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tessellator::Normals;

    fn square_points(closed: bool) -> Vec<Point3> {
        let mut points = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ];
        if closed {
            points.push(Point3::new(0.0, 0.0, 0.0));
        }
        points
    }

    #[test]
    fn test_ring_drops_closing_point() {
        let ring = LinearRing::from_points(None, square_points(true), false).unwrap();
        assert_eq!(ring.len(), 4);
    }

    #[test]
    fn test_ring_with_two_distinct_points_is_invalid() {
        let points = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 0.0, 0.0),
        ];
        let err = LinearRing::from_points(Some("r1".to_string()), points, false).unwrap_err();
        assert!(matches!(err, Error::InvalidRing(_)));
        assert!(err.to_string().contains("r1"));
    }

    #[test]
    fn test_ring_closure_requirement() {
        assert!(LinearRing::from_points(None, square_points(false), true).is_err());
        assert!(LinearRing::from_points(None, square_points(true), true).is_ok());
    }

    #[test]
    fn test_polygon_tessellation_is_cached() {
        let exterior = LinearRing::from_points(None, square_points(true), false).unwrap();
        let mut polygon = Polygon::new(Some("p1".to_string()), exterior);
        assert!(!polygon.is_tessellated());

        let triangles = polygon
            .tessellate(TessellationOptions::default())
            .unwrap()
            .triangle_count();
        assert_eq!(triangles, 2);
        assert!(polygon.is_tessellated());

        let mesh = polygon.mesh().unwrap();
        assert!((mesh.area() - 1.0).abs() < 1e-9);
        assert!(matches!(mesh.normals, Normals::PerPolygon(_)));
    }

    #[test]
    fn test_add_interior_invalidates_mesh() {
        let exterior = LinearRing::from_points(
            None,
            square_points(false)
                .iter()
                .map(|p| Point3::from(p.coords * 10.0))
                .collect(),
            false,
        )
        .unwrap();
        let mut polygon = Polygon::new(None, exterior);
        polygon.tessellate(TessellationOptions::default()).unwrap();

        let hole = LinearRing::from_points(
            None,
            square_points(false)
                .iter()
                .map(|p| Point3::new(p.x * 2.0 + 4.0, p.y * 2.0 + 4.0, 0.0))
                .collect(),
            false,
        )
        .unwrap();
        polygon.add_interior(hole);
        assert!(!polygon.is_tessellated());

        let area = polygon.tessellate(TessellationOptions::default()).unwrap().area();
        assert!((area - 96.0).abs() < 1e-6);
    }

    #[test]
    fn test_texture_coordinates_follow_vertex_order() {
        let exterior = LinearRing::from_points(None, square_points(true), false).unwrap();
        let mut polygon = Polygon::new(Some("p1".to_string()), exterior);
        let uv = vec![
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(1.0, 1.0),
            Point2::new(0.0, 1.0),
            Point2::new(0.0, 0.0),
        ];
        polygon.bind_texture("rgbTexture", "tex-1", vec![uv]);
        polygon.bind_material("rgbTexture", "mat-1");

        let coords = polygon.texture_coordinates("rgbTexture").unwrap();
        assert_eq!(coords.len(), 4);
        assert_eq!(coords[2], Point2::new(1.0, 1.0));
        assert_eq!(polygon.appearances().len(), 1);
        assert_eq!(
            polygon.appearance("rgbTexture").unwrap().material.as_deref(),
            Some("mat-1")
        );
        assert!(polygon.texture_coordinates("winter").is_none());
    }

    #[test]
    fn test_implicit_geometry_placement() {
        let mut implicit = ImplicitGeometry::new(2);
        implicit.reference_point = Point3::new(100.0, 50.0, 0.0);
        implicit.transformation = Matrix4::new_scaling(2.0);

        let placed = implicit.place(&Point3::new(1.0, 1.0, 1.0));
        assert_eq!(placed, Point3::new(102.0, 52.0, 2.0));

        let envelope = implicit.envelope();
        assert_eq!(envelope.min(), Some(Point3::new(100.0, 50.0, 0.0)));
    }
}
