//! Element vocabulary: what each element local name opens

use std::collections::HashMap;

use super::get_attr_by_local_name;
use crate::model::{
    AttributeType, CityObjectKind, GeometryType, TextureKind, is_thematic_attribute,
};

/// Ring role inside a polygon
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BoundaryKind {
    Exterior,
    Interior,
}

/// Point-valued property slots
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SlotKind {
    /// `gml:origin` of a rectified grid
    Origin,
    /// `referencePoint` of an implicit geometry
    ReferencePoint,
}

/// Surface data element kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SurfaceDataTag {
    Material,
    Texture(TextureKind),
}

/// Elements whose text content is collected and delivered on close
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ScalarKind {
    Pos,
    PosList,
    Coordinates,
    LowerCorner,
    UpperCorner,
    Thematic,
    GenericValue,
    Theme,
    IsFront,
    DiffuseColor,
    EmissiveColor,
    SpecularColor,
    AmbientIntensity,
    Shininess,
    Transparency,
    IsSmooth,
    ImageUri,
    MimeType,
    WrapMode,
    BorderColor,
    Target,
    TextureCoordinates,
    TransformationMatrix,
    LibraryObject,
    GridLow,
    GridHigh,
    OffsetVector,
    TupleList,
    FileName,
    CountryName,
    LocalityName,
    ThoroughfareName,
    ThoroughfareNumber,
    PostalCodeNumber,
}

/// Classification of an opened element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ElementClass {
    CityModel,
    CityObject(CityObjectKind),
    /// `lodN...` geometry property; `None` takes the LOD from the owning relief
    LodGeometry { lod: Option<u8> },
    LodImplicit { lod: u8 },
    /// Curve and point properties, which carry no surfaces
    LodSkipped,
    GmlGeometry(GeometryType),
    Polygon,
    Boundary(BoundaryKind),
    LinearRing,
    Scalar(ScalarKind),
    GenericAttribute(AttributeType),
    Appearance,
    AppearanceProperty,
    SurfaceData(SurfaceDataTag),
    SurfaceDataProperty,
    TextureTarget,
    Envelope,
    Address,
    ImplicitGeometry,
    RelativeGeometry,
    Slot(SlotKind),
    Unknown,
}

/// Split `lod2MultiSurface` into its LOD digit and the remaining name
fn split_lod_prefix(local: &str) -> Option<(u8, &str)> {
    let rest = local.strip_prefix("lod")?;
    let digit = rest.chars().next()?.to_digit(10)?;
    if digit > 4 {
        return None;
    }
    Some((digit as u8, &rest[1..]))
}

fn classify_lod_property(lod: u8, rest: &str) -> ElementClass {
    if rest == "ImplicitRepresentation" {
        ElementClass::LodImplicit { lod }
    } else if rest.contains("Curve")
        || rest.contains("TerrainIntersection")
        || rest.contains("Network")
        || rest.contains("Point")
    {
        ElementClass::LodSkipped
    } else {
        ElementClass::LodGeometry { lod: Some(lod) }
    }
}

/// Map an element local name (and its attributes) to an element class
pub(crate) fn classify(local: &str, attrs: &HashMap<String, String>) -> ElementClass {
    if let Some(kind) = CityObjectKind::from_element_name(local) {
        return ElementClass::CityObject(kind);
    }

    match local {
        "CityModel" => ElementClass::CityModel,

        // Geometry
        "Polygon" | "Triangle" | "PolygonPatch" | "Rectangle" => ElementClass::Polygon,
        "exterior" => ElementClass::Boundary(BoundaryKind::Exterior),
        "interior" => ElementClass::Boundary(BoundaryKind::Interior),
        "LinearRing" => ElementClass::LinearRing,
        "pos" => ElementClass::Scalar(ScalarKind::Pos),
        "posList" => ElementClass::Scalar(ScalarKind::PosList),
        "coordinates" => ElementClass::Scalar(ScalarKind::Coordinates),
        "tin" => ElementClass::LodGeometry { lod: None },
        "reliefPoints" => ElementClass::LodSkipped,

        // Envelopes
        "Envelope" => ElementClass::Envelope,
        "lowerCorner" => ElementClass::Scalar(ScalarKind::LowerCorner),
        "upperCorner" => ElementClass::Scalar(ScalarKind::UpperCorner),

        // Generic attributes
        "stringAttribute" => ElementClass::GenericAttribute(AttributeType::String),
        "intAttribute" => ElementClass::GenericAttribute(AttributeType::Integer),
        "doubleAttribute" => ElementClass::GenericAttribute(AttributeType::Double),
        "dateAttribute" => ElementClass::GenericAttribute(AttributeType::Date),
        "uriAttribute" => ElementClass::GenericAttribute(AttributeType::Uri),
        "measureAttribute" => ElementClass::GenericAttribute(AttributeType::Measure),
        "value" => ElementClass::Scalar(ScalarKind::GenericValue),

        // Appearance
        "Appearance" => ElementClass::Appearance,
        "appearance" | "appearanceMember" => ElementClass::AppearanceProperty,
        "theme" => ElementClass::Scalar(ScalarKind::Theme),
        "surfaceDataMember" => ElementClass::SurfaceDataProperty,
        "X3DMaterial" => ElementClass::SurfaceData(SurfaceDataTag::Material),
        "ParameterizedTexture" => {
            ElementClass::SurfaceData(SurfaceDataTag::Texture(TextureKind::Parameterized))
        }
        "GeoreferencedTexture" => {
            ElementClass::SurfaceData(SurfaceDataTag::Texture(TextureKind::Georeferenced))
        }
        "isFront" => ElementClass::Scalar(ScalarKind::IsFront),
        "diffuseColor" => ElementClass::Scalar(ScalarKind::DiffuseColor),
        "emissiveColor" => ElementClass::Scalar(ScalarKind::EmissiveColor),
        "specularColor" => ElementClass::Scalar(ScalarKind::SpecularColor),
        "ambientIntensity" => ElementClass::Scalar(ScalarKind::AmbientIntensity),
        "shininess" => ElementClass::Scalar(ScalarKind::Shininess),
        "transparency" => ElementClass::Scalar(ScalarKind::Transparency),
        "isSmooth" => ElementClass::Scalar(ScalarKind::IsSmooth),
        "imageURI" => ElementClass::Scalar(ScalarKind::ImageUri),
        "mimeType" => ElementClass::Scalar(ScalarKind::MimeType),
        "wrapMode" => ElementClass::Scalar(ScalarKind::WrapMode),
        "borderColor" => ElementClass::Scalar(ScalarKind::BorderColor),
        "target" if get_attr_by_local_name(attrs, "uri").is_some() => ElementClass::TextureTarget,
        "target" => ElementClass::Scalar(ScalarKind::Target),
        "textureCoordinates" => ElementClass::Scalar(ScalarKind::TextureCoordinates),

        // Implicit geometry
        "ImplicitGeometry" => ElementClass::ImplicitGeometry,
        "transformationMatrix" => ElementClass::Scalar(ScalarKind::TransformationMatrix),
        "libraryObject" => ElementClass::Scalar(ScalarKind::LibraryObject),
        "relativeGMLGeometry" => ElementClass::RelativeGeometry,
        "referencePoint" => ElementClass::Slot(SlotKind::ReferencePoint),

        // Rectified grid
        "origin" => ElementClass::Slot(SlotKind::Origin),
        "low" => ElementClass::Scalar(ScalarKind::GridLow),
        "high" => ElementClass::Scalar(ScalarKind::GridHigh),
        "offsetVector" => ElementClass::Scalar(ScalarKind::OffsetVector),
        "tupleList" => ElementClass::Scalar(ScalarKind::TupleList),
        "fileName" => ElementClass::Scalar(ScalarKind::FileName),

        // Addresses (xAL)
        "Address" => ElementClass::Address,
        "CountryName" => ElementClass::Scalar(ScalarKind::CountryName),
        "LocalityName" => ElementClass::Scalar(ScalarKind::LocalityName),
        "ThoroughfareName" => ElementClass::Scalar(ScalarKind::ThoroughfareName),
        "ThoroughfareNumber" => ElementClass::Scalar(ScalarKind::ThoroughfareNumber),
        "PostalCodeNumber" => ElementClass::Scalar(ScalarKind::PostalCodeNumber),

        _ => {
            if let Some(geometry_type) = GeometryType::from_element_name(local) {
                ElementClass::GmlGeometry(geometry_type)
            } else if let Some((lod, rest)) = split_lod_prefix(local) {
                classify_lod_property(lod, rest)
            } else if is_thematic_attribute(local) {
                ElementClass::Scalar(ScalarKind::Thematic)
            } else {
                ElementClass::Unknown
            }
        }
    }
}
