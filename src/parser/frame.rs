//! In-progress builders held on the parsing stack

use std::collections::HashMap;
use std::sync::Arc;

use super::elements::{BoundaryKind, ScalarKind, SlotKind};
use crate::envelope::Envelope;
use crate::mesh_ops::{Point3, Vector3};
use crate::model::{
    Address, Appearance, AttributeType, CityObject, GeometryType, GridCoverage, GridSamples,
    ImplicitGeometry, LinearRing, Polygon, SurfaceData, SurfaceTarget,
};

/// One open element: its qualified name, the CRS in effect and its builder
#[derive(Debug)]
pub(crate) struct StackEntry {
    pub name: String,
    pub srs: Option<Arc<str>>,
    pub frame: Frame,
}

/// Builder state of an open element
#[derive(Debug)]
pub(crate) enum Frame {
    /// The `CityModel` root element
    Model,
    CityObject(Box<ObjectBuilder>),
    Geometry(GeometryBuilder),
    Polygon(PolygonBuilder),
    Boundary(BoundaryBuilder),
    LinearRing(RingBuilder),
    Scalar(ScalarBuilder),
    GenericAttribute(GenericAttributeBuilder),
    Appearance(Appearance),
    SurfaceData(SurfaceData),
    TextureTarget(SurfaceTarget),
    Envelope(EnvelopeBuilder),
    Address(Address),
    /// `lodNImplicitRepresentation`
    ImplicitProperty {
        lod: u8,
    },
    ImplicitGeometry(Box<ImplicitGeometry>),
    Slot(SlotBuilder),
    /// Unknown element; its children attach to the frame below
    PassThrough,
    /// Filtered subtree; everything inside is ignored
    Skip,
}

impl Frame {
    pub fn is_transparent(&self) -> bool {
        matches!(self, Frame::PassThrough)
    }
}

/// Index of the innermost frame that is not a pass-through
pub(crate) fn owner_index(stack: &[StackEntry]) -> Option<usize> {
    stack.iter().rposition(|entry| !entry.frame.is_transparent())
}

/// Innermost non pass-through frame
pub(crate) fn owner_mut(stack: &mut [StackEntry]) -> Option<&mut Frame> {
    let index = owner_index(stack)?;
    Some(&mut stack[index].frame)
}

/// Innermost city object frame
pub(crate) fn nearest_object_mut(stack: &mut [StackEntry]) -> Option<&mut ObjectBuilder> {
    stack.iter_mut().rev().find_map(|entry| match entry.frame {
        Frame::CityObject(ref mut builder) => Some(builder.as_mut()),
        _ => None,
    })
}

/// Innermost geometry frame belonging to the current object
pub(crate) fn nearest_geometry_mut(stack: &mut [StackEntry]) -> Option<&mut GeometryBuilder> {
    for entry in stack.iter_mut().rev() {
        match entry.frame {
            Frame::Geometry(ref mut builder) => return Some(builder),
            Frame::CityObject(_) => return None,
            _ => {}
        }
    }
    None
}

/// Innermost polygon frame belonging to the current geometry
pub(crate) fn nearest_polygon_mut(stack: &mut [StackEntry]) -> Option<&mut PolygonBuilder> {
    for entry in stack.iter_mut().rev() {
        match entry.frame {
            Frame::Polygon(ref mut builder) => return Some(builder),
            Frame::Geometry(_) | Frame::CityObject(_) => return None,
            _ => {}
        }
    }
    None
}

/// Innermost implicit geometry frame belonging to the current object
pub(crate) fn nearest_implicit_mut(stack: &mut [StackEntry]) -> Option<&mut ImplicitGeometry> {
    for entry in stack.iter_mut().rev() {
        match entry.frame {
            Frame::ImplicitGeometry(ref mut implicit) => return Some(implicit),
            Frame::CityObject(_) => return None,
            _ => {}
        }
    }
    None
}

/// Innermost appearance frame
pub(crate) fn nearest_appearance_mut(stack: &mut [StackEntry]) -> Option<&mut Appearance> {
    for entry in stack.iter_mut().rev() {
        match entry.frame {
            Frame::Appearance(ref mut appearance) => return Some(appearance),
            Frame::CityObject(_) => return None,
            _ => {}
        }
    }
    None
}

/// LOD of the innermost implicit representation property
pub(crate) fn implicit_lod(stack: &[StackEntry]) -> Option<u8> {
    stack.iter().rev().find_map(|entry| match entry.frame {
        Frame::ImplicitProperty { lod } => Some(lod),
        Frame::ImplicitGeometry(ref implicit) => Some(implicit.lod()),
        _ => None,
    })
}

#[derive(Debug)]
pub(crate) struct ObjectBuilder {
    pub object: CityObject,
    /// Present for grid coverages only
    pub grid: Option<GridBuilder>,
}

/// Parts of a rectified grid collected from its child elements
#[derive(Debug, Default)]
pub(crate) struct GridBuilder {
    pub origin: Option<Point3>,
    pub offset_vectors: Vec<Vector3>,
    pub low: Option<Vec<i64>>,
    pub high: Option<Vec<i64>>,
    pub samples: Option<Vec<f64>>,
    pub file: Option<String>,
}

impl GridBuilder {
    fn is_untouched(&self) -> bool {
        self.origin.is_none()
            && self.offset_vectors.is_empty()
            && self.low.is_none()
            && self.high.is_none()
            && self.samples.is_none()
            && self.file.is_none()
    }

    /// Assemble the coverage; `Ok(None)` when the element carried no grid data
    pub fn build(self) -> Result<Option<GridCoverage>, String> {
        if self.is_untouched() {
            return Ok(None);
        }

        let origin = self.origin.ok_or("Grid has no origin")?;
        let [first, second] = self.offset_vectors[..] else {
            return Err(format!(
                "Grid has {} offset vectors, expected 2",
                self.offset_vectors.len()
            ));
        };

        let low = self.low.unwrap_or_else(|| vec![0, 0]);
        let high = self.high.ok_or("Grid has no upper limit")?;
        let (&[low_x, low_y, ..], &[high_x, high_y, ..]) = (low.as_slice(), high.as_slice()) else {
            return Err("Grid limits need two components".to_string());
        };
        let columns = high_x - low_x + 1;
        let rows = high_y - low_y + 1;
        if columns <= 0 || rows <= 0 {
            return Err(format!("Grid limits give an empty {}x{} grid", rows, columns));
        }

        let samples = match (self.samples, self.file) {
            (Some(values), _) => GridSamples::Inline(values),
            (None, Some(file)) => GridSamples::External { file },
            (None, None) => return Err("Grid has neither inline samples nor a file".to_string()),
        };

        Ok(Some(GridCoverage::new(
            origin,
            [first, second],
            rows as usize,
            columns as usize,
            samples,
        )))
    }
}

#[derive(Debug)]
pub(crate) struct GeometryBuilder {
    pub id: Option<String>,
    pub lod: u8,
    pub geometry_type: Option<GeometryType>,
    pub srs_name: Option<String>,
    pub polygons: Vec<Polygon>,
    /// Builds the template of an implicit geometry instead of object geometry
    pub template: bool,
}

impl GeometryBuilder {
    pub fn new(lod: u8, srs_name: Option<String>, template: bool) -> Self {
        Self {
            id: None,
            lod,
            geometry_type: None,
            srs_name,
            polygons: Vec::new(),
            template,
        }
    }

    /// Record the outermost GML geometry element seen inside the property
    pub fn note_element(
        &mut self,
        geometry_type: GeometryType,
        id: Option<String>,
        srs: Option<&str>,
    ) {
        if self.geometry_type.is_none() {
            self.geometry_type = Some(geometry_type);
            self.id = id;
        }
        if self.srs_name.is_none() {
            self.srs_name = srs.map(str::to_string);
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct PolygonBuilder {
    pub id: Option<String>,
    pub exterior: Option<LinearRing>,
    pub interiors: Vec<LinearRing>,
    /// Set when one of the rings was rejected
    pub invalid: bool,
}

#[derive(Debug)]
pub(crate) struct BoundaryBuilder {
    pub kind: BoundaryKind,
    pub ring: Option<LinearRing>,
}

#[derive(Debug, Default)]
pub(crate) struct RingBuilder {
    pub id: Option<String>,
    pub points: Vec<Point3>,
    /// Set when a coordinate could not be parsed
    pub invalid: bool,
}

#[derive(Debug)]
pub(crate) struct ScalarBuilder {
    pub kind: ScalarKind,
    /// Element local name
    pub local: String,
    pub attributes: HashMap<String, String>,
    pub text: String,
}

#[derive(Debug)]
pub(crate) struct GenericAttributeBuilder {
    pub name: Option<String>,
    pub value_type: AttributeType,
    pub value: Option<String>,
    pub uom: Option<String>,
}

#[derive(Debug, Default)]
pub(crate) struct EnvelopeBuilder {
    pub srs_name: Option<String>,
    pub lower: Option<Point3>,
    pub upper: Option<Point3>,
    /// Corners given as `gml:pos` pairs
    pub points: Vec<Point3>,
}

impl EnvelopeBuilder {
    pub fn build(&self) -> Envelope {
        let mut envelope = Envelope::new();
        for corner in self.lower.iter().chain(self.upper.iter()).chain(self.points.iter()) {
            envelope.union_point(corner);
        }
        envelope
    }
}

#[derive(Debug)]
pub(crate) struct SlotBuilder {
    pub kind: SlotKind,
    pub point: Option<Point3>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete_grid() -> GridBuilder {
        GridBuilder {
            origin: Some(Point3::origin()),
            offset_vectors: vec![Vector3::x(), Vector3::y()],
            low: Some(vec![0, 0]),
            high: Some(vec![2, 1]),
            samples: Some(vec![0.0; 6]),
            file: None,
        }
    }

    #[test]
    fn test_grid_dimensions_from_limits() {
        let grid = complete_grid().build().unwrap().unwrap();
        assert_eq!(grid.columns(), 3);
        assert_eq!(grid.rows(), 2);
    }

    #[test]
    fn test_untouched_grid_builds_nothing() {
        assert_eq!(GridBuilder::default().build(), Ok(None));
    }

    #[test]
    fn test_incomplete_grid_is_an_error() {
        let mut grid = complete_grid();
        grid.offset_vectors.pop();
        assert!(grid.build().is_err());

        let mut grid = complete_grid();
        grid.samples = None;
        assert!(grid.build().is_err());

        let mut grid = complete_grid();
        grid.samples = None;
        grid.file = Some("dem.asc".to_string());
        assert!(matches!(
            grid.build().unwrap().unwrap().samples(),
            GridSamples::External { .. }
        ));
    }

    #[test]
    fn test_envelope_builder_from_corners() {
        let builder = EnvelopeBuilder {
            lower: Some(Point3::new(1.0, 2.0, 3.0)),
            upper: Some(Point3::new(4.0, 5.0, 6.0)),
            ..EnvelopeBuilder::default()
        };
        let envelope = builder.build();
        assert_eq!(envelope.min(), Some(Point3::new(1.0, 2.0, 3.0)));
        assert_eq!(envelope.max(), Some(Point3::new(4.0, 5.0, 6.0)));
    }
}
