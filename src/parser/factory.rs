//! Event-driven construction of a city model
//!
//! [`ParsingFactory`] receives open, text and close events for one document
//! and keeps a stack of in-progress builders. Each closed element is validated
//! and attached to the nearest enclosing builder that accepts it. Content
//! errors (bad rings, unparsable values) are recovered locally and reported as
//! [`Diagnostic`]s; structural errors abort the document.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::coordinates::{
    CoordinateSeparators, parse_coordinates, parse_doubles, parse_integers, parse_matrix4,
    parse_pos, parse_pos_list, parse_texture_coordinates, parse_vector3,
};
use super::elements::{BoundaryKind, ElementClass, ScalarKind, SlotKind, SurfaceDataTag, classify};
use super::frame::{
    BoundaryBuilder, EnvelopeBuilder, Frame, GenericAttributeBuilder, GeometryBuilder, GridBuilder,
    ObjectBuilder, PolygonBuilder, RingBuilder, ScalarBuilder, SlotBuilder, StackEntry,
    implicit_lod, nearest_appearance_mut, nearest_geometry_mut, nearest_implicit_mut,
    nearest_object_mut, nearest_polygon_mut, owner_mut,
};
use super::{get_attr_by_local_name, get_local_name};
use crate::config::{ParserConfig, TessellationMode};
use crate::error::{Diagnostic, DiagnosticKind, Error, ErrorContext, Result};
use crate::mesh_ops::Point3;
use crate::model::{
    Address, Appearance, AttributeType, AttributeValue, CityModel, CityObject, CityObjectKind,
    Color, ColorRgba, CrsDefinition, Definition, Geometry, GeometryType, ImplicitGeometry,
    ImplicitTemplate, LinearRing, Polygon, Reference, ReferenceKind, RingTextureCoordinates,
    SurfaceData, SurfaceDataKind, SurfaceTarget, Texture, X3DMaterial, schema_type,
};

/// Result of parsing one document
#[derive(Debug)]
pub struct ParseOutcome {
    /// The finished model
    pub model: CityModel,
    /// Recovered content problems in the order they were found
    pub diagnostics: Vec<Diagnostic>,
    /// References that never resolved, each id listed once per kind
    pub unresolved: Vec<Reference>,
}

/// Builds a [`CityModel`] from a stream of element events
///
/// A factory parses one document. After a structural error every further
/// event is rejected; dropping the factory releases all partial state.
///
/// # Example
///
/// ```
/// use std::collections::HashMap;
/// use citygml::{ParserConfig, ParsingFactory};
///
/// let mut factory = ParsingFactory::new(ParserConfig::default());
/// let mut attrs = HashMap::new();
/// attrs.insert("gml:id".to_string(), "B1".to_string());
///
/// factory.open_element("core:CityModel", &HashMap::new())?;
/// factory.open_element("bldg:Building", &attrs)?;
/// factory.close_element("bldg:Building")?;
/// factory.close_element("core:CityModel")?;
///
/// let outcome = factory.finish()?;
/// assert_eq!(outcome.model.objects()[0].id(), "B1");
/// # Ok::<(), citygml::Error>(())
/// ```
#[derive(Debug)]
pub struct ParsingFactory {
    config: ParserConfig,
    model: CityModel,
    stack: Vec<StackEntry>,
    diagnostics: Vec<Diagnostic>,
    byte_offset: Option<u64>,
    aborted: bool,
    anonymous_count: usize,
}

impl ParsingFactory {
    /// Create a factory for one document
    pub fn new(config: ParserConfig) -> Self {
        let model = match config.shared_registry() {
            Some(registry) => CityModel::with_shared_registry(Arc::clone(registry)),
            None => CityModel::new(),
        };

        Self {
            config,
            model,
            stack: Vec::new(),
            diagnostics: Vec::new(),
            byte_offset: None,
            aborted: false,
            anonymous_count: 0,
        }
    }

    /// Record the reader position of the next event, used in error messages
    pub fn set_byte_offset(&mut self, offset: u64) {
        self.byte_offset = Some(offset);
    }

    /// The model built so far
    pub fn model(&self) -> &CityModel {
        &self.model
    }

    /// Diagnostics reported so far
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Number of open elements
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// True once a structural error has stopped the parse
    pub fn is_aborted(&self) -> bool {
        self.aborted
    }

    /// Handle an opening tag
    ///
    /// # Arguments
    ///
    /// * `name` - Qualified element name as written (`bldg:Building`)
    /// * `attributes` - Attributes keyed by qualified name
    pub fn open_element(&mut self, name: &str, attributes: &HashMap<String, String>) -> Result<()> {
        self.ensure_active(name)?;

        let skipped = matches!(
            self.stack.last(),
            Some(StackEntry {
                frame: Frame::Skip,
                ..
            })
        );

        let inherited = self.stack.last().and_then(|entry| entry.srs.clone());
        let srs = match get_attr_by_local_name(attributes, "srsName") {
            Some(srs_name) if !skipped => {
                self.register_crs(&srs_name, attributes);
                Some(Arc::from(srs_name.as_str()))
            }
            _ => inherited,
        };

        let frame = if skipped {
            Frame::Skip
        } else {
            self.open_frame(get_local_name(name), attributes, srs.as_deref())
        };

        self.stack.push(StackEntry {
            name: name.to_string(),
            srs,
            frame,
        });
        Ok(())
    }

    /// Handle character data inside the innermost element
    pub fn text(&mut self, content: &str) -> Result<()> {
        self.ensure_active("#text")?;
        if let Some(StackEntry {
            frame: Frame::Scalar(scalar),
            ..
        }) = self.stack.last_mut()
        {
            scalar.text.push_str(content);
        }
        Ok(())
    }

    /// Handle a closing tag
    ///
    /// # Errors
    ///
    /// [`Error::MalformedStructure`] when `name` is not the innermost open
    /// element. The factory is aborted afterwards.
    pub fn close_element(&mut self, name: &str) -> Result<()> {
        self.ensure_active(name)?;

        match self.stack.last() {
            None => {
                let error = Error::malformed(
                    &format!("Closing tag </{}> has no open element", name),
                    self.context(name),
                );
                return self.abort(error);
            }
            Some(entry) if entry.name != name => {
                let error = Error::malformed(
                    &format!(
                        "Closing tag </{}> does not match open element <{}>",
                        name, entry.name
                    ),
                    self.context(name)
                        .hint("Check that elements are closed in the order they were opened"),
                );
                return self.abort(error);
            }
            Some(_) => {}
        }

        if let Some(entry) = self.stack.pop() {
            self.close_frame(entry);
        }
        Ok(())
    }

    /// Complete the document
    ///
    /// Runs deferred tessellation, binds appearances to polygons and resolves
    /// the remaining references. Every unresolved reference is also reported as
    /// a [`DiagnosticKind::DanglingReference`] diagnostic.
    ///
    /// # Errors
    ///
    /// [`Error::MalformedStructure`] if the parse was aborted or elements are
    /// still open.
    pub fn finish(mut self) -> Result<ParseOutcome> {
        if self.aborted {
            return Err(Error::malformed(
                "Parsing was aborted by an earlier error",
                self.context("#document"),
            ));
        }
        if let Some(entry) = self.stack.last() {
            return Err(Error::malformed(
                &format!("Document ended with {} unclosed element(s)", self.stack.len()),
                self.context(&entry.name),
            ));
        }

        if self.config.tessellation_mode() == TessellationMode::Deferred {
            let failures = self.model.tessellate_all(self.config.tessellation_options());
            self.diagnostics.extend(failures);
        }

        let unresolved = self.model.finalize();
        for reference in &unresolved {
            self.report(
                Diagnostic::new(
                    DiagnosticKind::DanglingReference,
                    Error::DanglingReference(reference.to_string()).to_string(),
                )
                .with_element_id(reference.referrer.clone()),
            );
        }

        info!(
            objects = self.model.object_count(),
            diagnostics = self.diagnostics.len(),
            unresolved = unresolved.len(),
            "Parsed CityGML document"
        );

        Ok(ParseOutcome {
            model: self.model,
            diagnostics: self.diagnostics,
            unresolved,
        })
    }

    fn context(&self, element: &str) -> ErrorContext {
        let context = ErrorContext::new().element(element);
        match self.byte_offset {
            Some(offset) => context.byte_offset(offset),
            None => context,
        }
    }

    fn ensure_active(&self, element: &str) -> Result<()> {
        if self.aborted {
            return Err(Error::malformed(
                "Parsing was aborted by an earlier error",
                self.context(element),
            ));
        }
        Ok(())
    }

    fn abort(&mut self, error: Error) -> Result<()> {
        self.aborted = true;
        Err(error)
    }

    fn report(&mut self, diagnostic: Diagnostic) {
        warn!(%diagnostic, "Recovered from content error");
        self.diagnostics.push(diagnostic);
    }

    fn anonymous_id(&mut self, prefix: &str) -> String {
        self.anonymous_count += 1;
        format!("{}_{}", prefix, self.anonymous_count)
    }

    fn current_object_id(&self) -> Option<String> {
        self.stack.iter().rev().find_map(|entry| match entry.frame {
            Frame::CityObject(ref builder) => Some(builder.object.id().to_string()),
            _ => None,
        })
    }

    /// LOD of a TIN relief, read from its `lod` attribute
    fn relief_lod(&self) -> u8 {
        self.stack
            .iter()
            .rev()
            .find_map(|entry| match entry.frame {
                Frame::CityObject(ref builder) => Some(&builder.object),
                _ => None,
            })
            .and_then(|object| object.attribute_as_integer("lod").ok())
            .and_then(|lod| u8::try_from(lod).ok())
            .filter(|lod| *lod <= 4)
            .unwrap_or(0)
    }

    /// True inside the template of an implicit geometry
    fn in_template(&self) -> bool {
        self.stack.iter().rev().any(|entry| {
            matches!(
                entry.frame,
                Frame::Geometry(GeometryBuilder { template: true, .. })
            )
        })
    }

    fn crs_dimension(&self, srs: Option<&str>) -> Option<usize> {
        match self.model.resolve(srs?) {
            Ok(Definition::Crs(crs)) => crs.dimension.map(usize::from),
            _ => None,
        }
    }

    fn register_crs(&mut self, srs_name: &str, attributes: &HashMap<String, String>) {
        if !self.model.registry().contains(srs_name) {
            let dimension = get_attr_by_local_name(attributes, "srsDimension")
                .and_then(|d| d.trim().parse::<u8>().ok());
            self.model.register_crs(
                srs_name,
                CrsDefinition {
                    name: srs_name.to_string(),
                    dimension,
                },
            );
        }
        let referrer = self.current_object_id();
        self.model
            .record_reference(Reference::new(srs_name, ReferenceKind::Crs, referrer));
    }

    fn reproject(&self, srs: Option<&str>, points: &mut [Point3]) {
        let Some(transform) = self.config.crs_transform() else {
            return;
        };
        if self.in_template() {
            return;
        }
        let Some(srs) = srs.or(self.model.srs_name()) else {
            return;
        };
        for point in points {
            if let Some(projected) = transform.transform(srs, point) {
                *point = projected;
            }
        }
    }

    fn open_frame(
        &mut self,
        local: &str,
        attributes: &HashMap<String, String>,
        srs: Option<&str>,
    ) -> Frame {
        let gml_id = get_attr_by_local_name(attributes, "id");

        match classify(local, attributes) {
            ElementClass::CityModel => Frame::Model,
            ElementClass::CityObject(kind) => {
                if !self.config.accepts_kind(kind) {
                    debug!(%kind, id = ?gml_id, "Skipping filtered city object");
                    return Frame::Skip;
                }
                let grid =
                    (kind == CityObjectKind::RectifiedGridCoverage).then(GridBuilder::default);
                let id = gml_id.unwrap_or_else(|| self.anonymous_id(kind.id_prefix()));
                Frame::CityObject(Box::new(ObjectBuilder {
                    object: CityObject::new(kind, id),
                    grid,
                }))
            }
            ElementClass::LodGeometry { lod } => {
                let lod = lod.unwrap_or_else(|| self.relief_lod());
                if !self.config.accepts_lod(lod) {
                    debug!(lod, element = local, "Skipping geometry outside the LOD range");
                    return Frame::Skip;
                }
                Frame::Geometry(GeometryBuilder::new(lod, srs.map(str::to_string), false))
            }
            ElementClass::LodImplicit { lod } => {
                if !self.config.accepts_lod(lod) {
                    debug!(lod, "Skipping implicit geometry outside the LOD range");
                    return Frame::Skip;
                }
                Frame::ImplicitProperty { lod }
            }
            ElementClass::LodSkipped => Frame::Skip,
            ElementClass::GmlGeometry(geometry_type) => {
                if let Some(geometry) = nearest_geometry_mut(&mut self.stack) {
                    geometry.note_element(geometry_type, gml_id, srs);
                }
                Frame::PassThrough
            }
            ElementClass::Polygon => {
                if let Some(geometry) = nearest_geometry_mut(&mut self.stack) {
                    geometry.note_element(GeometryType::Polygon, None, srs);
                }
                Frame::Polygon(PolygonBuilder {
                    id: gml_id,
                    ..PolygonBuilder::default()
                })
            }
            ElementClass::Boundary(kind) => match owner_mut(&mut self.stack) {
                Some(Frame::Polygon(_)) => Frame::Boundary(BoundaryBuilder { kind, ring: None }),
                _ => Frame::PassThrough,
            },
            ElementClass::LinearRing => Frame::LinearRing(RingBuilder {
                id: gml_id,
                ..RingBuilder::default()
            }),
            ElementClass::Scalar(kind) => Frame::Scalar(ScalarBuilder {
                kind,
                local: local.to_string(),
                attributes: attributes.clone(),
                text: String::new(),
            }),
            ElementClass::GenericAttribute(value_type) => {
                Frame::GenericAttribute(GenericAttributeBuilder {
                    name: get_attr_by_local_name(attributes, "name"),
                    value_type,
                    value: None,
                    uom: None,
                })
            }
            ElementClass::Appearance => {
                let id = gml_id.unwrap_or_else(|| self.anonymous_id("Appearance"));
                Frame::Appearance(Appearance::new(id, ""))
            }
            ElementClass::AppearanceProperty => {
                if let Some(href) = get_attr_by_local_name(attributes, "href") {
                    self.reference_appearance(&href);
                }
                Frame::PassThrough
            }
            ElementClass::SurfaceData(tag) => {
                let (prefix, kind) = match tag {
                    SurfaceDataTag::Material => {
                        ("Material", SurfaceDataKind::Material(X3DMaterial::default()))
                    }
                    SurfaceDataTag::Texture(texture_kind) => {
                        ("Texture", SurfaceDataKind::Texture(Texture::new(texture_kind)))
                    }
                };
                let id = gml_id.unwrap_or_else(|| self.anonymous_id(prefix));
                Frame::SurfaceData(SurfaceData::new(id, kind))
            }
            ElementClass::SurfaceDataProperty => {
                if let Some(href) = get_attr_by_local_name(attributes, "href") {
                    self.reference_surface_data(&href);
                }
                Frame::PassThrough
            }
            ElementClass::TextureTarget => {
                let uri = get_attr_by_local_name(attributes, "uri").unwrap_or_default();
                Frame::TextureTarget(SurfaceTarget {
                    polygon_id: strip_fragment(&uri),
                    rings: Vec::new(),
                })
            }
            ElementClass::Envelope => Frame::Envelope(EnvelopeBuilder {
                srs_name: srs.map(str::to_string),
                ..EnvelopeBuilder::default()
            }),
            ElementClass::Address => Frame::Address(Address::default()),
            ElementClass::ImplicitGeometry => {
                let lod = implicit_lod(&self.stack).unwrap_or(0);
                Frame::ImplicitGeometry(Box::new(ImplicitGeometry::new(lod)))
            }
            ElementClass::RelativeGeometry => match get_attr_by_local_name(attributes, "href") {
                Some(href) => {
                    let id = strip_fragment(&href);
                    let referrer = self.current_object_id();
                    if let Some(implicit) = nearest_implicit_mut(&mut self.stack) {
                        implicit.template = ImplicitTemplate::Reference(id.clone());
                    }
                    self.model.record_reference(Reference::new(
                        &id,
                        ReferenceKind::GeometryTemplate,
                        referrer,
                    ));
                    Frame::PassThrough
                }
                None => {
                    let lod = implicit_lod(&self.stack).unwrap_or(0);
                    Frame::Geometry(GeometryBuilder::new(lod, srs.map(str::to_string), true))
                }
            },
            ElementClass::Slot(kind) => Frame::Slot(SlotBuilder { kind, point: None }),
            ElementClass::Unknown => Frame::PassThrough,
        }
    }

    fn reference_appearance(&mut self, href: &str) {
        let id = strip_fragment(href);
        let referrer = self.current_object_id();
        if let Some(builder) = nearest_object_mut(&mut self.stack) {
            builder.object.add_appearance(id.as_str());
        }
        self.model
            .record_reference(Reference::new(&id, ReferenceKind::Appearance, referrer));
    }

    fn reference_surface_data(&mut self, href: &str) {
        let id = strip_fragment(href);
        let referrer = nearest_appearance_mut(&mut self.stack).map(|appearance| {
            appearance.surface_data.push(id.clone());
            appearance.id.clone()
        });
        self.model
            .record_reference(Reference::new(&id, ReferenceKind::SurfaceData, referrer));
    }

    fn close_frame(&mut self, entry: StackEntry) {
        match entry.frame {
            Frame::Model | Frame::PassThrough | Frame::Skip | Frame::ImplicitProperty { .. } => {}
            Frame::CityObject(builder) => self.close_object(*builder),
            Frame::Geometry(builder) => self.close_geometry(builder),
            Frame::Polygon(builder) => self.close_polygon(builder),
            Frame::Boundary(boundary) => self.close_boundary(boundary),
            Frame::LinearRing(ring) => self.close_ring(ring),
            Frame::Scalar(scalar) => self.close_scalar(scalar, entry.srs.as_deref()),
            Frame::GenericAttribute(attribute) => self.close_generic_attribute(attribute),
            Frame::Appearance(appearance) => {
                let id = appearance.id.clone();
                self.model.register_appearance(appearance);
                if let Some(builder) = nearest_object_mut(&mut self.stack) {
                    builder.object.add_appearance(id);
                }
            }
            Frame::SurfaceData(surface_data) => {
                let id = surface_data.id.clone();
                self.model.register_surface_data(surface_data);
                if let Some(appearance) = nearest_appearance_mut(&mut self.stack) {
                    appearance.surface_data.push(id);
                }
            }
            Frame::TextureTarget(target) => {
                if let Some(Frame::SurfaceData(surface_data)) = owner_mut(&mut self.stack) {
                    surface_data.targets.push(target);
                }
            }
            Frame::Envelope(envelope) => self.close_envelope(envelope),
            Frame::Address(address) => {
                if address.is_empty() {
                    return;
                }
                if let Some(builder) = nearest_object_mut(&mut self.stack) {
                    builder.object.set_address(address);
                }
            }
            Frame::ImplicitGeometry(implicit) => {
                if let Some(builder) = nearest_object_mut(&mut self.stack) {
                    builder.object.add_implicit_geometry(*implicit);
                }
            }
            Frame::Slot(slot) => self.close_slot(slot),
        }
    }

    fn close_object(&mut self, builder: ObjectBuilder) {
        let ObjectBuilder { mut object, grid } = builder;

        if let Some(grid) = grid {
            match grid.build() {
                Ok(Some(coverage)) => object.set_coverage(coverage),
                Ok(None) => {}
                Err(message) => self.report(
                    Diagnostic::new(DiagnosticKind::InvalidValue, message)
                        .with_element_id(Some(object.id().to_string())),
                ),
            }
        }

        object.finalize_envelope();

        if self.config.prune_empty_objects() && object.is_empty() {
            debug!(id = object.id(), "Pruning empty city object");
            return;
        }

        match nearest_object_mut(&mut self.stack) {
            Some(parent) => {
                if !parent.object.kind().expects_child(object.kind()) {
                    debug!(
                        parent = %parent.object.kind(),
                        child = %object.kind(),
                        "Unexpected child kind"
                    );
                }
                parent.object.add_child(object);
            }
            None => {
                debug!(kind = %object.kind(), id = object.id(), "Closed top-level city object");
                self.model.add_top_level_object(object);
            }
        }
    }

    fn close_geometry(&mut self, builder: GeometryBuilder) {
        let GeometryBuilder {
            id,
            lod,
            geometry_type,
            srs_name,
            polygons,
            template,
        } = builder;

        if polygons.is_empty() {
            debug!(lod, "Dropping geometry without polygons");
            return;
        }

        let srs_name = match (self.config.crs_transform(), self.config.destination_srs()) {
            (Some(_), Some(destination)) if !template => Some(destination.to_string()),
            _ => srs_name,
        };
        let mut geometry = Geometry::new(
            id,
            lod,
            geometry_type.unwrap_or(GeometryType::MultiSurface),
            srs_name,
        );
        for polygon in polygons {
            geometry.add_polygon(polygon);
        }

        if template {
            if let Some(template_id) = geometry.id().map(str::to_string) {
                self.model
                    .register_geometry_template(template_id, geometry.clone());
            }
            if let Some(implicit) = nearest_implicit_mut(&mut self.stack) {
                implicit.template = ImplicitTemplate::Inline(geometry);
            }
            return;
        }

        match nearest_object_mut(&mut self.stack) {
            Some(builder) => builder.object.add_geometry(geometry),
            None => debug!(lod, "Dropping geometry outside a city object"),
        }
    }

    fn close_polygon(&mut self, builder: PolygonBuilder) {
        let PolygonBuilder {
            id,
            exterior,
            interiors,
            invalid,
        } = builder;

        if invalid {
            debug!(polygon = ?id, "Dropping polygon with an invalid ring");
            return;
        }
        let Some(exterior) = exterior else {
            let element_id = id.clone().or_else(|| self.current_object_id());
            self.report(
                Diagnostic::new(
                    DiagnosticKind::InvalidRing,
                    format!(
                        "Polygon {} has no exterior ring",
                        id.as_deref().unwrap_or("<anonymous>")
                    ),
                )
                .with_element_id(element_id),
            );
            return;
        };

        let mut polygon = Polygon::new(id, exterior);
        for ring in interiors {
            polygon.add_interior(ring);
        }

        if self.config.tessellation_mode() == TessellationMode::Eager {
            let failure = polygon.tessellate(self.config.tessellation_options()).err();
            if let Some(error) = failure {
                let element_id = polygon
                    .id()
                    .map(str::to_string)
                    .or_else(|| self.current_object_id());
                self.report(
                    Diagnostic::new(
                        DiagnosticKind::TessellationFailure,
                        Error::Tessellation(error).to_string(),
                    )
                    .with_element_id(element_id),
                );
            }
        }

        match nearest_geometry_mut(&mut self.stack) {
            Some(geometry) => geometry.polygons.push(polygon),
            None => debug!(polygon = ?polygon.id(), "Dropping polygon outside a geometry property"),
        }
    }

    fn close_boundary(&mut self, boundary: BoundaryBuilder) {
        let Some(ring) = boundary.ring else {
            return;
        };
        if let Some(Frame::Polygon(polygon)) = owner_mut(&mut self.stack) {
            match boundary.kind {
                BoundaryKind::Exterior => polygon.exterior = Some(ring),
                BoundaryKind::Interior => polygon.interiors.push(ring),
            }
        }
    }

    fn close_ring(&mut self, builder: RingBuilder) {
        let RingBuilder { id, points, invalid } = builder;

        let ring = if invalid {
            Err(Error::InvalidRing(format!(
                "Ring {} has unreadable coordinates",
                id.as_deref().unwrap_or("<anonymous>")
            )))
        } else {
            LinearRing::from_points(id, points, self.config.require_closed_rings())
        };

        match ring {
            Ok(ring) => {
                if let Some(Frame::Boundary(boundary)) = owner_mut(&mut self.stack) {
                    boundary.ring = Some(ring);
                }
            }
            Err(error) => {
                let polygon_id = nearest_polygon_mut(&mut self.stack).and_then(|polygon| {
                    polygon.invalid = true;
                    polygon.id.clone()
                });
                let element_id = polygon_id.or_else(|| self.current_object_id());
                self.report(
                    Diagnostic::new(DiagnosticKind::InvalidRing, error.to_string())
                        .with_element_id(element_id),
                );
            }
        }
    }

    fn close_scalar(&mut self, scalar: ScalarBuilder, srs: Option<&str>) {
        let ScalarBuilder {
            kind,
            local,
            attributes,
            text,
        } = scalar;
        let text = text.trim();

        let outcome = match kind {
            ScalarKind::Pos
            | ScalarKind::PosList
            | ScalarKind::Coordinates
            | ScalarKind::LowerCorner
            | ScalarKind::UpperCorner => self.close_point_scalar(kind, &attributes, text, srs),
            ScalarKind::Thematic => {
                self.close_thematic(&local, &attributes, text);
                Ok(())
            }
            _ => self.close_owned_scalar(kind, &attributes, text),
        };

        if let Err(error) = outcome {
            let element_id = self.current_object_id();
            self.report(
                Diagnostic::new(DiagnosticKind::InvalidValue, error.to_string())
                    .with_element_id(element_id),
            );
        }
    }

    fn close_point_scalar(
        &mut self,
        kind: ScalarKind,
        attributes: &HashMap<String, String>,
        text: &str,
        srs: Option<&str>,
    ) -> Result<()> {
        let parsed = match kind {
            ScalarKind::PosList => {
                let dimension = get_attr_by_local_name(attributes, "srsDimension")
                    .and_then(|d| d.trim().parse::<usize>().ok())
                    .or_else(|| self.crs_dimension(srs));
                parse_pos_list(text, dimension)
            }
            ScalarKind::Coordinates => parse_coordinates(text, &separators(attributes)),
            _ => parse_pos(text).map(|point| vec![point]),
        };

        let mut points = match parsed {
            Ok(points) => points,
            Err(error) => {
                if let Some(Frame::LinearRing(ring)) = owner_mut(&mut self.stack) {
                    ring.invalid = true;
                }
                return Err(error);
            }
        };
        self.reproject(srs, &mut points);

        match (kind, owner_mut(&mut self.stack)) {
            (ScalarKind::LowerCorner, Some(Frame::Envelope(envelope))) => {
                envelope.lower = points.first().copied();
            }
            (ScalarKind::UpperCorner, Some(Frame::Envelope(envelope))) => {
                envelope.upper = points.first().copied();
            }
            (_, Some(Frame::Envelope(envelope))) => envelope.points.extend(points),
            (_, Some(Frame::LinearRing(ring))) => ring.points.extend(points),
            (_, Some(Frame::Slot(slot))) => slot.point = points.first().copied(),
            _ => {}
        }
        Ok(())
    }

    /// Store a thematic attribute typed by the owning object's schema
    fn close_thematic(&mut self, name: &str, attributes: &HashMap<String, String>, text: &str) {
        let uom = get_attr_by_local_name(attributes, "uom");

        let mismatch = match owner_mut(&mut self.stack) {
            Some(Frame::CityObject(builder)) => {
                let expected =
                    schema_type(builder.object.kind(), name).unwrap_or(AttributeType::String);
                match AttributeValue::parse_as(text, expected, uom.as_deref()) {
                    Some(value) => {
                        builder.object.set_attribute(name, value);
                        None
                    }
                    None => {
                        builder
                            .object
                            .set_attribute(name, AttributeValue::String(text.to_string()));
                        Some((builder.object.id().to_string(), expected))
                    }
                }
            }
            None | Some(Frame::Model) => {
                match name {
                    "name" => self.model.set_name(text.to_string()),
                    "description" => self.model.set_description(text.to_string()),
                    _ => {}
                }
                None
            }
            _ => None,
        };

        if let Some((object_id, expected)) = mismatch {
            self.report(
                Diagnostic::new(
                    DiagnosticKind::AttributeTypeMismatch,
                    format!("Attribute '{}' value '{}' is not a valid {}", name, text, expected),
                )
                .with_element_id(Some(object_id)),
            );
        }
    }

    fn close_generic_attribute(&mut self, attribute: GenericAttributeBuilder) {
        let GenericAttributeBuilder {
            name,
            value_type,
            value,
            uom,
        } = attribute;
        let object_id = self.current_object_id();

        let Some(name) = name.filter(|name| !name.is_empty()) else {
            self.report(
                Diagnostic::new(DiagnosticKind::InvalidValue, "Generic attribute without a name")
                    .with_element_id(object_id),
            );
            return;
        };
        let text = value.unwrap_or_default();

        let mismatch = match nearest_object_mut(&mut self.stack) {
            Some(builder) => match AttributeValue::parse_as(&text, value_type, uom.as_deref()) {
                Some(value) => {
                    builder.object.set_attribute(name.as_str(), value);
                    false
                }
                None => {
                    builder
                        .object
                        .set_attribute(name.as_str(), AttributeValue::String(text.clone()));
                    true
                }
            },
            None => {
                debug!(name = %name, "Ignoring generic attribute outside a city object");
                false
            }
        };

        if mismatch {
            self.report(
                Diagnostic::new(
                    DiagnosticKind::AttributeTypeMismatch,
                    format!(
                        "Generic attribute '{}' value '{}' is not a valid {}",
                        name, text, value_type
                    ),
                )
                .with_element_id(object_id),
            );
        }
    }

    /// Deliver a scalar to the appearance, implicit geometry, grid or address
    /// builder that owns it
    fn close_owned_scalar(
        &mut self,
        kind: ScalarKind,
        attributes: &HashMap<String, String>,
        text: &str,
    ) -> Result<()> {
        let Some(owner) = owner_mut(&mut self.stack) else {
            return Ok(());
        };

        match (kind, owner) {
            (ScalarKind::GenericValue, Frame::GenericAttribute(attribute)) => {
                attribute.value = Some(text.to_string());
                attribute.uom = get_attr_by_local_name(attributes, "uom");
            }
            (ScalarKind::Theme, Frame::Appearance(appearance)) => {
                appearance.theme = text.to_string();
            }
            (ScalarKind::IsFront, Frame::SurfaceData(surface_data)) => {
                surface_data.is_front = parse_bool("isFront", text)?;
            }
            (ScalarKind::Target, Frame::SurfaceData(surface_data)) => {
                surface_data.targets.push(SurfaceTarget {
                    polygon_id: strip_fragment(text),
                    rings: Vec::new(),
                });
            }
            (_, Frame::SurfaceData(surface_data)) => {
                apply_surface_property(&mut surface_data.kind, kind, text)?;
            }
            (ScalarKind::TextureCoordinates, Frame::TextureTarget(target)) => {
                target.rings.push(RingTextureCoordinates {
                    ring: get_attr_by_local_name(attributes, "ring")
                        .map(|ring| strip_fragment(&ring)),
                    coordinates: parse_texture_coordinates(text)?,
                });
            }
            (ScalarKind::MimeType, Frame::ImplicitGeometry(implicit)) => {
                implicit.mime_type = Some(text.to_string());
            }
            (ScalarKind::LibraryObject, Frame::ImplicitGeometry(implicit)) => {
                implicit.library_object = Some(text.to_string());
            }
            (ScalarKind::TransformationMatrix, Frame::ImplicitGeometry(implicit)) => {
                implicit.transformation = parse_matrix4(text)?;
            }
            (_, Frame::CityObject(builder)) => {
                if let Some(grid) = builder.grid.as_mut() {
                    apply_grid_property(grid, kind, text)?;
                }
            }
            (_, Frame::Address(address)) => apply_address_property(address, kind, text),
            _ => {}
        }
        Ok(())
    }

    fn close_envelope(&mut self, builder: EnvelopeBuilder) {
        let envelope = builder.build();
        if !envelope.is_valid() {
            debug!("Ignoring envelope without corners");
            return;
        }

        match owner_mut(&mut self.stack) {
            Some(Frame::CityObject(object)) => object.object.set_declared_envelope(envelope),
            None | Some(Frame::Model) => {
                if let (None, Some(srs_name)) = (self.model.srs_name(), builder.srs_name) {
                    self.model.set_srs_name(srs_name);
                }
                self.model.set_declared_envelope(envelope);
            }
            _ => {}
        }
    }

    fn close_slot(&mut self, slot: SlotBuilder) {
        let Some(point) = slot.point else {
            return;
        };
        match (slot.kind, owner_mut(&mut self.stack)) {
            (SlotKind::Origin, Some(Frame::CityObject(builder))) => {
                if let Some(grid) = builder.grid.as_mut() {
                    grid.origin = Some(point);
                }
            }
            (SlotKind::ReferencePoint, Some(Frame::ImplicitGeometry(implicit))) => {
                implicit.reference_point = point;
            }
            _ => {}
        }
    }
}

fn strip_fragment(reference: &str) -> String {
    reference.trim().trim_start_matches('#').to_string()
}

fn separators(attributes: &HashMap<String, String>) -> CoordinateSeparators {
    let defaults = CoordinateSeparators::default();
    let first_char = |name: &str, default: char| {
        get_attr_by_local_name(attributes, name)
            .and_then(|value| value.chars().next())
            .unwrap_or(default)
    };
    CoordinateSeparators {
        decimal: first_char("decimal", defaults.decimal),
        component: first_char("cs", defaults.component),
        tuple: first_char("ts", defaults.tuple),
    }
}

fn parse_bool(field: &str, text: &str) -> Result<bool> {
    match text {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        _ => Err(Error::parse_error_with_context(field, text, "boolean")),
    }
}

fn parse_unit_interval(field: &str, text: &str) -> Result<f64> {
    let value = text
        .parse::<f64>()
        .map_err(|_| Error::parse_error_with_context(field, text, "floating-point number"))?;
    if !(0.0..=1.0).contains(&value) {
        return Err(Error::parse_error_with_context(field, text, "value in [0, 1]"));
    }
    Ok(value)
}

fn parse_color(text: &str) -> Result<Color> {
    text.parse::<Color>().map_err(Error::ParseError)
}

/// Sample values of a `tupleList`, separated by whitespace or commas
fn parse_tuple_list(text: &str) -> Result<Vec<f64>> {
    parse_doubles("tupleList", &text.replace(',', " "))
}

fn apply_surface_property(
    kind: &mut SurfaceDataKind,
    property: ScalarKind,
    text: &str,
) -> Result<()> {
    match kind {
        SurfaceDataKind::Material(material) => match property {
            ScalarKind::DiffuseColor => material.diffuse_color = Some(parse_color(text)?),
            ScalarKind::EmissiveColor => material.emissive_color = Some(parse_color(text)?),
            ScalarKind::SpecularColor => material.specular_color = Some(parse_color(text)?),
            ScalarKind::AmbientIntensity => {
                material.ambient_intensity = Some(parse_unit_interval("ambientIntensity", text)?);
            }
            ScalarKind::Shininess => {
                material.shininess = Some(parse_unit_interval("shininess", text)?);
            }
            ScalarKind::Transparency => {
                material.transparency = Some(parse_unit_interval("transparency", text)?);
            }
            ScalarKind::IsSmooth => material.is_smooth = parse_bool("isSmooth", text)?,
            _ => {}
        },
        SurfaceDataKind::Texture(texture) => match property {
            ScalarKind::ImageUri => texture.image_uri = Some(text.to_string()),
            ScalarKind::MimeType => texture.mime_type = Some(text.to_string()),
            ScalarKind::WrapMode => texture.wrap_mode = text.parse().map_err(Error::ParseError)?,
            ScalarKind::BorderColor => {
                texture.border_color = Some(text.parse::<ColorRgba>().map_err(Error::ParseError)?);
            }
            _ => {}
        },
    }
    Ok(())
}

fn apply_grid_property(grid: &mut GridBuilder, property: ScalarKind, text: &str) -> Result<()> {
    match property {
        ScalarKind::GridLow => grid.low = Some(parse_integers("low", text)?),
        ScalarKind::GridHigh => grid.high = Some(parse_integers("high", text)?),
        ScalarKind::OffsetVector => grid
            .offset_vectors
            .push(parse_vector3("offsetVector", text)?),
        ScalarKind::TupleList => grid.samples = Some(parse_tuple_list(text)?),
        ScalarKind::FileName => grid.file = Some(text.to_string()),
        _ => {}
    }
    Ok(())
}

fn apply_address_property(address: &mut Address, property: ScalarKind, text: &str) {
    let slot = match property {
        ScalarKind::CountryName => &mut address.country,
        ScalarKind::LocalityName => &mut address.locality,
        ScalarKind::ThoroughfareName => &mut address.thoroughfare_name,
        ScalarKind::ThoroughfareNumber => &mut address.thoroughfare_number,
        ScalarKind::PostalCodeNumber => &mut address.postal_code,
        _ => return,
    };
    *slot = Some(text.to_string());
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attrs(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn open(factory: &mut ParsingFactory, name: &str, pairs: &[(&str, &str)]) {
        factory.open_element(name, &attrs(pairs)).unwrap();
    }

    fn close(factory: &mut ParsingFactory, name: &str) {
        factory.close_element(name).unwrap();
    }

    fn leaf(factory: &mut ParsingFactory, name: &str, text: &str) {
        open(factory, name, &[]);
        factory.text(text).unwrap();
        close(factory, name);
    }

    fn polygon(factory: &mut ParsingFactory, id: &str, pos_list: &str) {
        open(factory, "gml:Polygon", &[("gml:id", id)]);
        open(factory, "gml:exterior", &[]);
        open(factory, "gml:LinearRing", &[]);
        leaf(factory, "gml:posList", pos_list);
        close(factory, "gml:LinearRing");
        close(factory, "gml:exterior");
        close(factory, "gml:Polygon");
    }

    fn building_with_polygon(factory: &mut ParsingFactory, pos_list: &str) {
        open(factory, "core:CityModel", &[]);
        open(factory, "core:cityObjectMember", &[]);
        open(factory, "bldg:Building", &[("gml:id", "B1")]);
        open(factory, "bldg:lod2MultiSurface", &[]);
        open(factory, "gml:MultiSurface", &[("gml:id", "MS1")]);
        open(factory, "gml:surfaceMember", &[]);
        polygon(factory, "P1", pos_list);
        close(factory, "gml:surfaceMember");
        close(factory, "gml:MultiSurface");
        close(factory, "bldg:lod2MultiSurface");
        close(factory, "bldg:Building");
        close(factory, "core:cityObjectMember");
        close(factory, "core:CityModel");
    }

    const SQUARE: &str = "0 0 0 1 0 0 1 1 0 0 1 0 0 0 0";

    #[test]
    fn test_builds_geometry_on_object() {
        let mut factory = ParsingFactory::new(ParserConfig::default());
        building_with_polygon(&mut factory, SQUARE);
        let outcome = factory.finish().unwrap();

        let building = &outcome.model.objects()[0];
        assert_eq!(building.id(), "B1");
        let geometry = &building.geometries()[0];
        assert_eq!(geometry.lod(), 2);
        assert_eq!(geometry.id(), Some("MS1"));
        assert_eq!(geometry.geometry_type(), GeometryType::MultiSurface);
        assert_eq!(geometry.polygons()[0].exterior().len(), 4);
        assert!(geometry.polygons()[0].is_tessellated());
        assert_eq!(building.envelope().max(), Some(Point3::new(1.0, 1.0, 0.0)));
        assert!(outcome.diagnostics.is_empty());
    }

    #[test]
    fn test_invalid_ring_drops_polygon_with_diagnostic() {
        let mut factory = ParsingFactory::new(ParserConfig::default());
        building_with_polygon(&mut factory, "0 0 0 1 0 0 0 0 0");
        let outcome = factory.finish().unwrap();

        assert!(outcome.model.objects()[0].geometries().is_empty());
        assert_eq!(outcome.diagnostics.len(), 1);
        assert_eq!(outcome.diagnostics[0].kind, DiagnosticKind::InvalidRing);
        assert_eq!(outcome.diagnostics[0].element_id.as_deref(), Some("P1"));
    }

    #[test]
    fn test_unparsable_coordinates_invalidate_the_ring() {
        let mut factory = ParsingFactory::new(ParserConfig::default());
        building_with_polygon(&mut factory, "0 0 0 1 0 zero 1 1 0");
        let outcome = factory.finish().unwrap();

        let kinds: Vec<_> = outcome.diagnostics.iter().map(|d| d.kind).collect();
        assert_eq!(kinds, vec![DiagnosticKind::InvalidValue, DiagnosticKind::InvalidRing]);
        assert!(outcome.model.objects()[0].geometries().is_empty());
    }

    #[test]
    fn test_non_finite_coordinates_invalidate_the_ring() {
        for pos_list in ["0 0 0 1 0 0 NaN 1 0 0 1 0", "0 0 0 1 0 0 1 inf 0 0 1 0"] {
            let mut factory = ParsingFactory::new(ParserConfig::default());
            building_with_polygon(&mut factory, pos_list);
            let outcome = factory.finish().unwrap();

            let kinds: Vec<_> = outcome.diagnostics.iter().map(|d| d.kind).collect();
            assert_eq!(kinds, vec![DiagnosticKind::InvalidValue, DiagnosticKind::InvalidRing]);
            assert!(outcome.model.objects()[0].geometries().is_empty());
        }
    }

    #[test]
    fn test_alternating_ring_is_invalid() {
        let mut factory = ParsingFactory::new(ParserConfig::default());
        building_with_polygon(&mut factory, "0 0 0 1 0 0 0 0 0 1 0 0 0 0 0");
        let outcome = factory.finish().unwrap();

        let kinds: Vec<_> = outcome.diagnostics.iter().map(|d| d.kind).collect();
        assert_eq!(kinds, vec![DiagnosticKind::InvalidRing]);
        assert!(outcome.model.objects()[0].geometries().is_empty());
    }

    #[test]
    fn test_mismatched_close_aborts() {
        let mut factory = ParsingFactory::new(ParserConfig::default());
        open(&mut factory, "core:CityModel", &[]);
        open(&mut factory, "bldg:Building", &[]);
        factory.set_byte_offset(42);

        let err = factory.close_element("core:CityModel").unwrap_err();
        assert!(matches!(err, Error::MalformedStructure(_)));
        assert!(err.to_string().contains("42"));
        assert!(factory.is_aborted());

        // Every later event is rejected
        assert!(factory.close_element("bldg:Building").is_err());
        assert!(factory.text("x").is_err());
        assert!(factory.finish().is_err());
    }

    #[test]
    fn test_close_without_open_element() {
        let mut factory = ParsingFactory::new(ParserConfig::default());
        assert!(matches!(
            factory.close_element("core:CityModel"),
            Err(Error::MalformedStructure(_))
        ));
    }

    #[test]
    fn test_unclosed_elements_fail_finish() {
        let mut factory = ParsingFactory::new(ParserConfig::default());
        open(&mut factory, "core:CityModel", &[]);
        open(&mut factory, "bldg:Building", &[]);
        let err = factory.finish().unwrap_err();
        assert!(err.to_string().contains("2 unclosed"));
    }

    #[test]
    fn test_lod_filter_skips_geometry() {
        let config = ParserConfig::new().with_lod_range(0, 1);
        let mut factory = ParsingFactory::new(config);
        building_with_polygon(&mut factory, SQUARE);
        let outcome = factory.finish().unwrap();

        let building = &outcome.model.objects()[0];
        assert!(building.geometries().is_empty());
        assert!(!building.envelope().is_valid());
    }

    #[test]
    fn test_kind_filter_skips_subtree() {
        let config = ParserConfig::new().with_enabled_kinds([CityObjectKind::Road]);
        let mut factory = ParsingFactory::new(config);
        building_with_polygon(&mut factory, SQUARE);
        let outcome = factory.finish().unwrap();
        assert_eq!(outcome.model.object_count(), 0);
    }

    #[test]
    fn test_deferred_tessellation_runs_at_finish() {
        let config = ParserConfig::new().with_tessellation_mode(TessellationMode::Deferred);
        let mut factory = ParsingFactory::new(config);
        building_with_polygon(&mut factory, SQUARE);

        let pending = &factory.model().objects()[0].geometries()[0].polygons()[0];
        assert!(!pending.is_tessellated());

        let outcome = factory.finish().unwrap();
        let polygon = &outcome.model.objects()[0].geometries()[0].polygons()[0];
        assert_eq!(polygon.mesh().map(|m| m.triangle_count()), Some(2));
    }

    #[test]
    fn test_disabled_tessellation_leaves_polygons_pending() {
        let config = ParserConfig::new().with_tessellation_mode(TessellationMode::Disabled);
        let mut factory = ParsingFactory::new(config);
        building_with_polygon(&mut factory, SQUARE);
        let outcome = factory.finish().unwrap();
        let polygon = &outcome.model.objects()[0].geometries()[0].polygons()[0];
        assert!(!polygon.is_tessellated());
    }

    #[test]
    fn test_thematic_attribute_is_typed_by_schema() {
        let mut factory = ParsingFactory::new(ParserConfig::default());
        open(&mut factory, "bldg:Building", &[("gml:id", "B1")]);
        open(&mut factory, "bldg:measuredHeight", &[("uom", "m")]);
        factory.text(" 12.5 ").unwrap();
        close(&mut factory, "bldg:measuredHeight");
        leaf(&mut factory, "bldg:storeysAboveGround", "three");
        close(&mut factory, "bldg:Building");
        let outcome = factory.finish().unwrap();

        let building = &outcome.model.objects()[0];
        assert_eq!(building.attribute_as_double("measuredHeight"), Ok(12.5));
        assert_eq!(
            building.attribute("storeysAboveGround"),
            Some(&AttributeValue::String("three".to_string()))
        );
        assert_eq!(outcome.diagnostics.len(), 1);
        assert_eq!(
            outcome.diagnostics[0].kind,
            DiagnosticKind::AttributeTypeMismatch
        );
    }

    #[test]
    fn test_model_name_and_envelope_srs() {
        let mut factory = ParsingFactory::new(ParserConfig::default());
        open(&mut factory, "core:CityModel", &[]);
        leaf(&mut factory, "gml:name", "District");
        open(&mut factory, "gml:boundedBy", &[]);
        open(&mut factory, "gml:Envelope", &[("srsName", "EPSG:25832"), ("srsDimension", "3")]);
        leaf(&mut factory, "gml:lowerCorner", "0 0 0");
        leaf(&mut factory, "gml:upperCorner", "10 10 5");
        close(&mut factory, "gml:Envelope");
        close(&mut factory, "gml:boundedBy");
        close(&mut factory, "core:CityModel");
        let outcome = factory.finish().unwrap();

        assert_eq!(outcome.model.name(), Some("District"));
        assert_eq!(outcome.model.srs_name(), Some("EPSG:25832"));
        let declared = outcome.model.declared_envelope().unwrap();
        assert_eq!(declared.max(), Some(Point3::new(10.0, 10.0, 5.0)));
        assert!(matches!(
            outcome.model.resolve("EPSG:25832"),
            Ok(Definition::Crs(CrsDefinition { dimension: Some(3), .. }))
        ));
        assert!(outcome.unresolved.is_empty());
    }

    #[test]
    fn test_crs_transform_applies_to_coordinates() {
        let shift: Arc<dyn crate::services::CrsTransform> =
            Arc::new(|_: &str, p: &Point3| Some(Point3::new(p.x + 100.0, p.y, p.z)));
        let config = ParserConfig::new().with_crs_transform(shift, Some("local".to_string()));
        let mut factory = ParsingFactory::new(config);

        open(&mut factory, "core:CityModel", &[("srsName", "EPSG:25832")]);
        open(&mut factory, "bldg:Building", &[]);
        open(&mut factory, "bldg:lod1MultiSurface", &[]);
        open(&mut factory, "gml:MultiSurface", &[]);
        polygon(&mut factory, "P1", SQUARE);
        close(&mut factory, "gml:MultiSurface");
        close(&mut factory, "bldg:lod1MultiSurface");
        close(&mut factory, "bldg:Building");
        close(&mut factory, "core:CityModel");
        let outcome = factory.finish().unwrap();

        let geometry = &outcome.model.objects()[0].geometries()[0];
        assert_eq!(geometry.srs_name(), Some("local"));
        assert_eq!(geometry.polygons()[0].exterior().points()[0].x, 100.0);
    }

    #[test]
    fn test_grid_coverage_from_events() {
        let mut factory = ParsingFactory::new(ParserConfig::default());
        open(&mut factory, "dem:RasterRelief", &[("gml:id", "R1")]);
        open(&mut factory, "dem:grid", &[]);
        open(&mut factory, "gml:RectifiedGridCoverage", &[("gml:id", "G1")]);
        open(&mut factory, "gml:domainSet", &[]);
        open(&mut factory, "gml:RectifiedGrid", &[]);
        open(&mut factory, "gml:limits", &[]);
        open(&mut factory, "gml:GridEnvelope", &[]);
        leaf(&mut factory, "gml:low", "0 0");
        leaf(&mut factory, "gml:high", "1 1");
        close(&mut factory, "gml:GridEnvelope");
        close(&mut factory, "gml:limits");
        open(&mut factory, "gml:origin", &[]);
        open(&mut factory, "gml:Point", &[]);
        leaf(&mut factory, "gml:pos", "100 200 0");
        close(&mut factory, "gml:Point");
        close(&mut factory, "gml:origin");
        leaf(&mut factory, "gml:offsetVector", "10 0 0");
        leaf(&mut factory, "gml:offsetVector", "0 10 0");
        close(&mut factory, "gml:RectifiedGrid");
        close(&mut factory, "gml:domainSet");
        open(&mut factory, "gml:rangeSet", &[]);
        open(&mut factory, "gml:DataBlock", &[]);
        leaf(&mut factory, "gml:tupleList", "1.5,2.5 3.5,4.5");
        close(&mut factory, "gml:DataBlock");
        close(&mut factory, "gml:rangeSet");
        close(&mut factory, "gml:RectifiedGridCoverage");
        close(&mut factory, "dem:grid");
        close(&mut factory, "dem:RasterRelief");
        let outcome = factory.finish().unwrap();

        let relief = &outcome.model.objects()[0];
        let grid = &relief.children()[0];
        assert_eq!(grid.id(), "G1");
        assert_eq!(grid.sample_at(0, 0), Ok(1.5));
        assert_eq!(grid.sample_at(1, 1), Ok(4.5));
        assert_eq!(relief.envelope().max(), Some(Point3::new(110.0, 210.0, 4.5)));
    }

    #[test]
    fn test_incomplete_grid_reports_diagnostic() {
        let mut factory = ParsingFactory::new(ParserConfig::default());
        open(&mut factory, "gml:RectifiedGridCoverage", &[("gml:id", "G1")]);
        leaf(&mut factory, "gml:offsetVector", "10 0 0");
        close(&mut factory, "gml:RectifiedGridCoverage");
        let outcome = factory.finish().unwrap();

        assert!(outcome.model.objects()[0].coverage().is_none());
        assert_eq!(outcome.diagnostics[0].kind, DiagnosticKind::InvalidValue);
        assert_eq!(outcome.diagnostics[0].element_id.as_deref(), Some("G1"));
    }

    #[test]
    fn test_address_components() {
        let mut factory = ParsingFactory::new(ParserConfig::default());
        open(&mut factory, "bldg:Building", &[]);
        open(&mut factory, "bldg:address", &[]);
        open(&mut factory, "core:Address", &[]);
        open(&mut factory, "xAL:Locality", &[]);
        leaf(&mut factory, "xAL:LocalityName", "Berlin");
        open(&mut factory, "xAL:Thoroughfare", &[]);
        leaf(&mut factory, "xAL:ThoroughfareNumber", "7");
        close(&mut factory, "xAL:Thoroughfare");
        close(&mut factory, "xAL:Locality");
        close(&mut factory, "core:Address");
        close(&mut factory, "bldg:address");
        close(&mut factory, "bldg:Building");
        let outcome = factory.finish().unwrap();

        let address = outcome.model.objects()[0].address().unwrap();
        assert_eq!(address.locality.as_deref(), Some("Berlin"));
        assert_eq!(address.thoroughfare_number.as_deref(), Some("7"));
        assert!(address.country.is_none());
    }

    #[test]
    fn test_anonymous_appearance_ids_are_unique() {
        let mut factory = ParsingFactory::new(ParserConfig::default());
        open(&mut factory, "core:CityModel", &[]);
        for _ in 0..2 {
            open(&mut factory, "app:appearanceMember", &[]);
            open(&mut factory, "app:Appearance", &[]);
            close(&mut factory, "app:Appearance");
            close(&mut factory, "app:appearanceMember");
        }
        close(&mut factory, "core:CityModel");
        let outcome = factory.finish().unwrap();

        assert!(outcome.model.registry().contains("Appearance_1"));
        assert!(outcome.model.registry().contains("Appearance_2"));
    }

    #[test]
    fn test_anonymous_object_ids_are_numbered_per_document() {
        let build = || {
            let mut factory = ParsingFactory::new(ParserConfig::default());
            open(&mut factory, "core:CityModel", &[]);
            for kind in ["bldg:Building", "bldg:Building", "tran:Road"] {
                open(&mut factory, "core:cityObjectMember", &[]);
                open(&mut factory, kind, &[]);
                close(&mut factory, kind);
                close(&mut factory, "core:cityObjectMember");
            }
            close(&mut factory, "core:CityModel");
            let outcome = factory.finish().unwrap();
            outcome
                .model
                .objects()
                .iter()
                .map(|o| o.id().to_string())
                .collect::<Vec<_>>()
        };

        let first = build();
        assert_eq!(first, vec!["Building_1", "Building_2", "Road_3"]);
        assert_eq!(build(), first);
    }
}
