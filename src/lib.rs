//! # citygml
//!
//! A pure Rust reader for CityGML 3D city models.
//!
//! This library reads CityGML documents (buildings, terrain, bridges, tunnels,
//! vegetation, water bodies, transportation and elevation grids) into a
//! strongly typed scene graph ready for rendering and spatial analysis.
//!
//! ## Features
//!
//! - Pure Rust implementation with no unsafe code
//! - Streaming parse of arbitrarily large documents with quick-xml
//! - Typed city objects with per-kind attribute schemas
//! - Polygon tessellation with holes, eagerly or in a parallel batch
//! - Appearances (materials and textures) bound to polygons by theme
//! - Implicit geometries, elevation grids and two-phase reference resolution
//! - Content errors are recovered and reported as diagnostics
//!
//! ## Example
//!
//! ```no_run
//! use citygml::{ParserConfig, parse_reader};
//! use std::fs::File;
//! use std::io::BufReader;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let file = BufReader::new(File::open("district.gml")?);
//! let outcome = parse_reader(file, ParserConfig::new().with_lod_range(1, 2))?;
//!
//! println!("Model contains {} objects", outcome.model.object_count());
//! for diagnostic in &outcome.diagnostics {
//!     eprintln!("{}", diagnostic);
//! }
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod envelope;
pub mod error;
pub mod mesh_ops;
pub mod model;
pub mod parser;
mod services;
pub mod tessellator;

pub use config::{ParserConfig, TessellationMode};
pub use envelope::Envelope;
pub use error::{Diagnostic, DiagnosticKind, Error, ErrorContext, Result};
pub use model::{
    Address, Appearance, AppearanceBinding, AttributeError, AttributeType, AttributeValue,
    CityModel, CityObject, CityObjectKind, Color, ColorRgba, CrsDefinition, Date, Definition,
    Geometry, GeometryType, GridCoverage, GridLookupError, GridSamples, ImplicitGeometry,
    ImplicitTemplate, LinearRing, MeshState, Polygon, Reference, ReferenceKind, Registry,
    SurfaceData, SurfaceDataKind, Texture, TextureKind, WrapMode, X3DMaterial,
};
pub use parser::{ParseOutcome, ParsingFactory, parse_reader, parse_str};
pub use services::{CrsTransform, TextureImage, TextureLoader};
pub use tessellator::{TessellationError, TessellationOptions, TriangleMesh};

use std::io::BufRead;

impl CityModel {
    /// Parse a CityGML document from a buffered reader
    ///
    /// This method uses the default parser configuration. Diagnostics are
    /// logged through `tracing`; use [`parse_reader`] to receive them.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use citygml::CityModel;
    /// use std::fs::File;
    /// use std::io::BufReader;
    ///
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let model = CityModel::from_reader(BufReader::new(File::open("district.gml")?))?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self> {
        Self::from_reader_with_config(reader, ParserConfig::default())
    }

    /// Parse a CityGML document from a buffered reader with custom configuration
    ///
    /// # Arguments
    ///
    /// * `reader` - A reader positioned at the start of the document
    /// * `config` - Filters, tessellation mode and external services
    pub fn from_reader_with_config<R: BufRead>(reader: R, config: ParserConfig) -> Result<Self> {
        parse_reader(reader, config).map(|outcome| outcome.model)
    }
}

impl std::str::FromStr for CityModel {
    type Err = Error;

    /// Parse a CityGML document held in memory with the default configuration
    fn from_str(xml: &str) -> Result<Self> {
        parse_str(xml, ParserConfig::default()).map(|outcome| outcome.model)
    }
}
