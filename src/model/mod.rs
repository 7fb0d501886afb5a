//! Data structures representing CityGML city models

// Declare all submodules
mod appearance;
mod attributes;
mod city_model;
mod city_object;
mod coverage;
mod geometry;

// Re-export all public types from appearance module
pub use appearance::{
    Appearance, AppearanceBinding, Color, ColorRgba, RingTextureCoordinates, SurfaceData,
    SurfaceDataKind, SurfaceTarget, Texture, TextureKind, WrapMode, X3DMaterial,
};

// Re-export all public types from attributes module
pub use attributes::{
    AttributeError, AttributeType, AttributeValue, Date, SchemaEntry, schema_type,
};

// Re-export all public types from city_model module
pub use city_model::{CityModel, CrsDefinition, Definition, Reference, ReferenceKind, Registry};

// Re-export all public types from city_object module
pub use city_object::{Address, CityObject, CityObjectKind, DepthFirst};

// Re-export all public types from coverage module
pub use coverage::{GridCoverage, GridLookupError, GridSamples};

// Re-export all public types from geometry module
pub use geometry::{
    Geometry, GeometryType, ImplicitGeometry, ImplicitTemplate, LinearRing, MeshState, Polygon,
};

pub(crate) use attributes::is_thematic_attribute;
