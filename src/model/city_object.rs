//! City objects: the closed set of feature kinds and their shared contract

use std::collections::HashMap;
use std::fmt;

use super::attributes::{AttributeError, AttributeType, AttributeValue, Date, schema_type};
use super::coverage::{GridCoverage, GridLookupError};
use super::geometry::{Geometry, ImplicitGeometry};
use crate::envelope::Envelope;

macro_rules! city_object_kinds {
    ($($kind:ident => $element:literal),+ $(,)?) => {
        /// Kind tag of a city object
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum CityObjectKind {
            $(
                #[doc = concat!("`", $element, "`")]
                $kind,
            )+
        }

        impl CityObjectKind {
            /// Every kind, in declaration order
            pub const ALL: &'static [CityObjectKind] = &[$(CityObjectKind::$kind),+];

            /// Element local name of this kind
            pub fn element_name(self) -> &'static str {
                match self {
                    $(CityObjectKind::$kind => $element,)+
                }
            }

            /// Map an element local name to a kind
            pub fn from_element_name(name: &str) -> Option<Self> {
                match name {
                    $($element => Some(CityObjectKind::$kind),)+
                    _ => None,
                }
            }
        }
    };
}

city_object_kinds! {
    Building => "Building",
    BuildingPart => "BuildingPart",
    Room => "Room",
    BuildingInstallation => "BuildingInstallation",
    BuildingFurniture => "BuildingFurniture",
    Door => "Door",
    Window => "Window",
    WallSurface => "WallSurface",
    RoofSurface => "RoofSurface",
    GroundSurface => "GroundSurface",
    ClosureSurface => "ClosureSurface",
    FloorSurface => "FloorSurface",
    InteriorWallSurface => "InteriorWallSurface",
    CeilingSurface => "CeilingSurface",
    OuterCeilingSurface => "OuterCeilingSurface",
    OuterFloorSurface => "OuterFloorSurface",
    Bridge => "Bridge",
    BridgePart => "BridgePart",
    BridgeConstructionElement => "BridgeConstructionElement",
    BridgeInstallation => "BridgeInstallation",
    Tunnel => "Tunnel",
    TunnelPart => "TunnelPart",
    TunnelInstallation => "TunnelInstallation",
    Road => "Road",
    Railway => "Railway",
    Track => "Track",
    Square => "Square",
    TransportationComplex => "TransportationComplex",
    TrafficArea => "TrafficArea",
    AuxiliaryTrafficArea => "AuxiliaryTrafficArea",
    WaterBody => "WaterBody",
    WaterSurface => "WaterSurface",
    WaterGroundSurface => "WaterGroundSurface",
    WaterClosureSurface => "WaterClosureSurface",
    PlantCover => "PlantCover",
    SolitaryVegetationObject => "SolitaryVegetationObject",
    LandUse => "LandUse",
    CityFurniture => "CityFurniture",
    GenericCityObject => "GenericCityObject",
    CityObjectGroup => "CityObjectGroup",
    ReliefFeature => "ReliefFeature",
    TinRelief => "TINRelief",
    MassPointRelief => "MassPointRelief",
    RasterRelief => "RasterRelief",
    RectifiedGridCoverage => "RectifiedGridCoverage",
}

const BOUNDARY_SURFACES: &[CityObjectKind] = &[
    CityObjectKind::WallSurface,
    CityObjectKind::RoofSurface,
    CityObjectKind::GroundSurface,
    CityObjectKind::ClosureSurface,
    CityObjectKind::FloorSurface,
    CityObjectKind::InteriorWallSurface,
    CityObjectKind::CeilingSurface,
    CityObjectKind::OuterCeilingSurface,
    CityObjectKind::OuterFloorSurface,
];

const OPENINGS: &[CityObjectKind] = &[CityObjectKind::Door, CityObjectKind::Window];

impl CityObjectKind {
    /// Prefix of generated identifiers for objects without `gml:id`
    pub fn id_prefix(self) -> &'static str {
        self.element_name()
    }

    /// True for thematic boundary surfaces (wall, roof, ground, ...)
    pub fn is_boundary_surface(self) -> bool {
        BOUNDARY_SURFACES.contains(&self)
    }

    /// True if objects of this kind usually carry `child` as a sub-feature
    pub fn expects_child(self, child: CityObjectKind) -> bool {
        use CityObjectKind::*;
        match self {
            Building | BuildingPart => {
                child == BuildingPart
                    || child == Room
                    || child == BuildingInstallation
                    || child.is_boundary_surface()
            }
            Room => {
                child == BuildingFurniture
                    || child == BuildingInstallation
                    || child.is_boundary_surface()
            }
            Bridge | BridgePart => {
                child == BridgePart
                    || child == BridgeConstructionElement
                    || child == BridgeInstallation
                    || child.is_boundary_surface()
            }
            Tunnel | TunnelPart => {
                child == TunnelPart || child == TunnelInstallation || child.is_boundary_surface()
            }
            BuildingInstallation | BridgeInstallation | BridgeConstructionElement
            | TunnelInstallation => child.is_boundary_surface(),
            WallSurface | RoofSurface | GroundSurface | ClosureSurface | FloorSurface
            | InteriorWallSurface | CeilingSurface | OuterCeilingSurface | OuterFloorSurface => {
                OPENINGS.contains(&child)
            }
            Road | Railway | Track | Square | TransportationComplex => {
                child == TrafficArea || child == AuxiliaryTrafficArea
            }
            WaterBody => {
                child == WaterSurface || child == WaterGroundSurface || child == WaterClosureSurface
            }
            ReliefFeature => {
                child == TinRelief || child == MassPointRelief || child == RasterRelief
            }
            RasterRelief => child == RectifiedGridCoverage,
            CityObjectGroup => true,
            _ => false,
        }
    }
}

impl fmt::Display for CityObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.element_name())
    }
}

/// Postal address of a building, bridge or tunnel
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Address {
    /// Country name
    pub country: Option<String>,
    /// Locality (city) name
    pub locality: Option<String>,
    /// Street name
    pub thoroughfare_name: Option<String>,
    /// House number
    pub thoroughfare_number: Option<String>,
    /// Postal code
    pub postal_code: Option<String>,
}

impl Address {
    /// True if no component is set
    pub fn is_empty(&self) -> bool {
        self.country.is_none()
            && self.locality.is_none()
            && self.thoroughfare_name.is_none()
            && self.thoroughfare_number.is_none()
            && self.postal_code.is_none()
    }
}

/// A city object: identity, attributes, envelope, owned geometry and children
///
/// Objects are built by the parser only. Every kind shares the same fields;
/// kinds differ in their attribute schema and expected children.
#[derive(Debug, Clone, PartialEq)]
pub struct CityObject {
    id: String,
    kind: CityObjectKind,
    attributes: HashMap<String, AttributeValue>,
    envelope: Envelope,
    declared_envelope: Option<Envelope>,
    children: Vec<CityObject>,
    geometries: Vec<Geometry>,
    implicit_geometries: Vec<ImplicitGeometry>,
    coverage: Option<GridCoverage>,
    address: Option<Address>,
    appearances: Vec<String>,
}

impl CityObject {
    /// Create an empty object
    ///
    /// The parser names objects without a `gml:id` `<Prefix>_<n>`, numbering
    /// them per document.
    pub(crate) fn new(kind: CityObjectKind, id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            attributes: HashMap::new(),
            envelope: Envelope::new(),
            declared_envelope: None,
            children: Vec::new(),
            geometries: Vec::new(),
            implicit_geometries: Vec::new(),
            coverage: None,
            address: None,
            appearances: Vec::new(),
        }
    }

    /// Identifier
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Kind tag
    pub fn kind(&self) -> CityObjectKind {
        self.kind
    }

    /// Computed envelope: own geometry plus all descendants
    pub fn envelope(&self) -> &Envelope {
        &self.envelope
    }

    /// Envelope declared in the document (`gml:boundedBy`), if any
    pub fn declared_envelope(&self) -> Option<&Envelope> {
        self.declared_envelope.as_ref()
    }

    /// Raw attribute map, including generic attributes
    pub fn attributes(&self) -> &HashMap<String, AttributeValue> {
        &self.attributes
    }

    /// Raw attribute value, without schema validation
    pub fn attribute(&self, name: &str) -> Option<&AttributeValue> {
        self.attributes.get(name)
    }

    /// Validated lookup of a feature-specific attribute
    ///
    /// # Errors
    ///
    /// - [`AttributeError::NotInSchema`] if `name` is not defined for this kind
    /// - [`AttributeError::Absent`] if it is defined but not set
    /// - [`AttributeError::TypeMismatch`] if the stored value cannot be
    ///   coerced to the schema type
    pub fn feature_attribute(&self, name: &str) -> Result<AttributeValue, AttributeError> {
        let expected = schema_type(self.kind, name).ok_or_else(|| AttributeError::NotInSchema {
            name: name.to_string(),
            kind: self.kind,
        })?;
        self.typed_attribute(name, expected)
    }

    fn typed_attribute(
        &self,
        name: &str,
        expected: AttributeType,
    ) -> Result<AttributeValue, AttributeError> {
        let value = self.attributes.get(name).ok_or_else(|| AttributeError::Absent {
            name: name.to_string(),
        })?;
        value
            .coerce(expected)
            .ok_or_else(|| AttributeError::TypeMismatch {
                name: name.to_string(),
                expected,
                found: value.value_type(),
            })
    }

    /// Attribute as text
    ///
    /// Every value has a text form, so only a missing value fails.
    pub fn attribute_as_string(&self, name: &str) -> Result<String, AttributeError> {
        self.attributes
            .get(name)
            .map(AttributeValue::to_string)
            .ok_or_else(|| AttributeError::Absent {
                name: name.to_string(),
            })
    }

    /// Attribute as a floating-point number (measures yield their value)
    pub fn attribute_as_double(&self, name: &str) -> Result<f64, AttributeError> {
        match self.typed_attribute(name, AttributeType::Double)? {
            AttributeValue::Double(d) => Ok(d),
            other => Err(mismatch(name, AttributeType::Double, &other)),
        }
    }

    /// Attribute as a whole number
    pub fn attribute_as_integer(&self, name: &str) -> Result<i64, AttributeError> {
        match self.typed_attribute(name, AttributeType::Integer)? {
            AttributeValue::Integer(i) => Ok(i),
            other => Err(mismatch(name, AttributeType::Integer, &other)),
        }
    }

    /// Attribute as a calendar date
    pub fn attribute_as_date(&self, name: &str) -> Result<Date, AttributeError> {
        match self.typed_attribute(name, AttributeType::Date)? {
            AttributeValue::Date(d) => Ok(d),
            other => Err(mismatch(name, AttributeType::Date, &other)),
        }
    }

    /// Direct sub-features in document order
    pub fn children(&self) -> &[CityObject] {
        &self.children
    }

    /// Explicit geometries at every LOD
    pub fn geometries(&self) -> &[Geometry] {
        &self.geometries
    }

    /// Explicit geometries at `lod`
    pub fn geometries_at_lod(&self, lod: u8) -> impl Iterator<Item = &Geometry> {
        self.geometries.iter().filter(move |g| g.lod() == lod)
    }

    /// Implicit (template-based) geometries
    pub fn implicit_geometries(&self) -> &[ImplicitGeometry] {
        &self.implicit_geometries
    }

    /// Grid coverage, for RectifiedGridCoverage objects
    pub fn coverage(&self) -> Option<&GridCoverage> {
        self.coverage.as_ref()
    }

    /// Stored grid sample of cell `(row, column)`
    pub fn sample_at(&self, row: usize, column: usize) -> Result<f64, GridLookupError> {
        self.coverage
            .as_ref()
            .ok_or(GridLookupError::NoCoverage)?
            .sample_at(row, column)
    }

    /// Postal address
    pub fn address(&self) -> Option<&Address> {
        self.address.as_ref()
    }

    /// Ids of the appearances this object owns or references
    pub fn appearance_ids(&self) -> &[String] {
        &self.appearances
    }

    /// Depth-first (pre-order) iterator over this object and its descendants
    pub fn descendants(&self) -> DepthFirst<'_> {
        DepthFirst { stack: vec![self] }
    }

    /// True if the object has no geometry, coverage or children
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
            && self.geometries.is_empty()
            && self.implicit_geometries.is_empty()
            && self.coverage.is_none()
    }

    pub(crate) fn set_attribute(&mut self, name: impl Into<String>, value: AttributeValue) {
        self.attributes.insert(name.into(), value);
    }

    pub(crate) fn set_declared_envelope(&mut self, envelope: Envelope) {
        self.declared_envelope = Some(envelope);
    }

    pub(crate) fn add_geometry(&mut self, geometry: Geometry) {
        self.geometries.push(geometry);
    }

    pub(crate) fn add_implicit_geometry(&mut self, implicit: ImplicitGeometry) {
        self.implicit_geometries.push(implicit);
    }

    pub(crate) fn set_coverage(&mut self, coverage: GridCoverage) {
        self.coverage = Some(coverage);
    }

    pub(crate) fn set_address(&mut self, address: Address) {
        self.address = Some(address);
    }

    pub(crate) fn add_appearance(&mut self, appearance_id: impl Into<String>) {
        let appearance_id = appearance_id.into();
        if !self.appearances.contains(&appearance_id) {
            self.appearances.push(appearance_id);
        }
    }

    /// Append a finished child, folding its envelope into this one
    pub(crate) fn add_child(&mut self, child: CityObject) {
        self.envelope.union_envelope(&child.envelope);
        self.children.push(child);
    }

    /// Fold the object's own geometry into its envelope
    ///
    /// Children are folded in as they are attached, so after this call the
    /// envelope covers the whole subtree.
    pub(crate) fn finalize_envelope(&mut self) {
        for geometry in &self.geometries {
            self.envelope.union_envelope(&geometry.envelope());
        }
        for implicit in &self.implicit_geometries {
            self.envelope.union_envelope(&implicit.envelope());
        }
        if let Some(ref coverage) = self.coverage {
            self.envelope.union_envelope(&coverage.envelope());
        }
    }

    pub(crate) fn geometries_mut(&mut self) -> &mut [Geometry] {
        &mut self.geometries
    }

    pub(crate) fn children_mut(&mut self) -> &mut [CityObject] {
        &mut self.children
    }

    pub(crate) fn geometry_and_children_mut(&mut self) -> (&mut [Geometry], &mut [CityObject]) {
        (&mut self.geometries, &mut self.children)
    }
}

fn mismatch(name: &str, expected: AttributeType, found: &AttributeValue) -> AttributeError {
    AttributeError::TypeMismatch {
        name: name.to_string(),
        expected,
        found: found.value_type(),
    }
}

/// Pre-order depth-first iterator over city objects
#[derive(Debug, Clone)]
pub struct DepthFirst<'a> {
    stack: Vec<&'a CityObject>,
}

impl<'a> DepthFirst<'a> {
    pub(crate) fn over(roots: &'a [CityObject]) -> Self {
        Self {
            stack: roots.iter().rev().collect(),
        }
    }
}

impl<'a> Iterator for DepthFirst<'a> {
    type Item = &'a CityObject;

    fn next(&mut self) -> Option<Self::Item> {
        let object = self.stack.pop()?;
        self.stack.extend(object.children.iter().rev());
        Some(object)
    }
}
