//! The root container: top-level objects, aggregate envelope and id registry

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use tracing::{debug, warn};

use super::appearance::{Appearance, SurfaceData, SurfaceDataKind};
use super::city_object::{CityObject, DepthFirst};
use super::geometry::{Geometry, ImplicitGeometry, ImplicitTemplate, Polygon};
use crate::envelope::Envelope;
use crate::error::{Diagnostic, DiagnosticKind, Error, Result};
use crate::mesh_ops::Point2;
use crate::services::{TextureImage, TextureLoader};
use crate::tessellator::TessellationOptions;

/// Coordinate reference system known by name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrsDefinition {
    /// CRS identifier as written in `srsName`
    pub name: String,
    /// Coordinate dimension (`srsDimension`), when given
    pub dimension: Option<u8>,
}

/// A definition addressable by id
#[derive(Debug, Clone, PartialEq)]
pub enum Definition {
    /// Themed appearance
    Appearance(Appearance),
    /// Material or texture
    SurfaceData(SurfaceData),
    /// Coordinate reference system
    Crs(CrsDefinition),
    /// Geometry used as an implicit geometry template
    GeometryTemplate(Geometry),
}

impl Definition {
    /// Reference kind that resolves to this definition
    pub fn kind(&self) -> ReferenceKind {
        match self {
            Definition::Appearance(_) => ReferenceKind::Appearance,
            Definition::SurfaceData(_) => ReferenceKind::SurfaceData,
            Definition::Crs(_) => ReferenceKind::Crs,
            Definition::GeometryTemplate(_) => ReferenceKind::GeometryTemplate,
        }
    }
}

/// Id-keyed definition table
///
/// Iteration follows registration order, so a definition read earlier in the
/// document comes first. Replacing an id keeps its original position.
///
/// A registry built ahead of time can be shared read-only between parses
/// through [`crate::ParserConfig::with_shared_registry`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Registry {
    definitions: HashMap<String, Definition>,
    order: Vec<String>,
}

impl Registry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a definition, replacing any previous one with the same id
    pub fn insert(&mut self, id: impl Into<String>, definition: Definition) -> Option<Definition> {
        let id = id.into();
        let previous = self.definitions.insert(id.clone(), definition);
        if previous.is_none() {
            self.order.push(id);
        }
        previous
    }

    /// Look up a definition
    pub fn get(&self, id: &str) -> Option<&Definition> {
        self.definitions.get(id)
    }

    /// True if `id` is defined
    pub fn contains(&self, id: &str) -> bool {
        self.definitions.contains_key(id)
    }

    /// Number of definitions
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    /// True if the registry holds no definitions
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// All definitions with their ids, in registration order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Definition)> {
        self.order
            .iter()
            .filter_map(|id| self.definitions.get_key_value(id))
            .map(|(id, def)| (id.as_str(), def))
    }
}

/// What a cross-reference points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReferenceKind {
    /// An appearance (`app:appearance xlink:href`)
    Appearance,
    /// A surface data definition (`app:surfaceDataMember xlink:href`)
    SurfaceData,
    /// A coordinate reference system
    Crs,
    /// An implicit geometry template
    GeometryTemplate,
    /// A polygon targeted by a material or texture
    Polygon,
}

impl fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ReferenceKind::Appearance => "appearance",
            ReferenceKind::SurfaceData => "surface data",
            ReferenceKind::Crs => "CRS",
            ReferenceKind::GeometryTemplate => "geometry template",
            ReferenceKind::Polygon => "polygon",
        };
        f.write_str(name)
    }
}

/// A cross-reference by id
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Reference {
    /// Referenced id, without a leading `#`
    pub id: String,
    /// Expected definition kind
    pub kind: ReferenceKind,
    /// Id of the object or definition holding the reference
    pub referrer: Option<String>,
}

impl Reference {
    /// Create a reference; a leading `#` is stripped from `id`
    pub fn new(id: &str, kind: ReferenceKind, referrer: Option<String>) -> Self {
        Self {
            id: id.trim().trim_start_matches('#').to_string(),
            kind,
            referrer,
        }
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.referrer {
            Some(ref referrer) => {
                write!(f, "{} '{}' (referenced by {})", self.kind, self.id, referrer)
            }
            None => write!(f, "{} '{}'", self.kind, self.id),
        }
    }
}

/// A parsed city model
///
/// Owns the top-level objects, the aggregate envelope and the registry of
/// definitions referenced by id.
#[derive(Debug, Clone, Default)]
pub struct CityModel {
    name: Option<String>,
    description: Option<String>,
    srs_name: Option<String>,
    envelope: Envelope,
    declared_envelope: Option<Envelope>,
    objects: Vec<CityObject>,
    registry: Registry,
    shared_registry: Option<Arc<Registry>>,
    pending: Vec<Reference>,
}

impl CityModel {
    /// Create an empty model
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty model that falls back to `shared` for lookups
    pub fn with_shared_registry(shared: Arc<Registry>) -> Self {
        Self {
            shared_registry: Some(shared),
            ..Self::default()
        }
    }

    /// Model name (`gml:name`)
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Model description (`gml:description`)
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Document CRS name
    pub fn srs_name(&self) -> Option<&str> {
        self.srs_name.as_deref()
    }

    /// Union of all top-level object envelopes
    pub fn envelope(&self) -> &Envelope {
        &self.envelope
    }

    /// Envelope declared by the document, if any
    pub fn declared_envelope(&self) -> Option<&Envelope> {
        self.declared_envelope.as_ref()
    }

    /// Top-level objects in document order
    pub fn objects(&self) -> &[CityObject] {
        &self.objects
    }

    /// Number of top-level objects
    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    /// Depth-first iterator over every object in the model
    pub fn depth_first(&self) -> DepthFirst<'_> {
        DepthFirst::over(&self.objects)
    }

    /// Find an object anywhere in the tree by id
    pub fn find_object(&self, id: &str) -> Option<&CityObject> {
        self.depth_first().find(|object| object.id() == id)
    }

    /// Local definitions
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// References not yet resolved
    pub fn pending_references(&self) -> &[Reference] {
        &self.pending
    }

    pub(crate) fn set_name(&mut self, name: String) {
        self.name = Some(name);
    }

    pub(crate) fn set_description(&mut self, description: String) {
        self.description = Some(description);
    }

    pub(crate) fn set_srs_name(&mut self, srs_name: String) {
        self.srs_name = Some(srs_name);
    }

    pub(crate) fn set_declared_envelope(&mut self, envelope: Envelope) {
        self.declared_envelope = Some(envelope);
    }

    /// Take ownership of a finished top-level object
    pub fn add_top_level_object(&mut self, object: CityObject) {
        self.envelope.union_envelope(object.envelope());
        self.objects.push(object);
    }

    fn register(&mut self, id: String, definition: Definition) {
        if self.registry.insert(id.clone(), definition).is_some() {
            debug!(id = %id, "Definition replaced by a later one with the same id");
        }
    }

    /// Register an appearance under its id
    pub fn register_appearance(&mut self, appearance: Appearance) {
        self.register(appearance.id.clone(), Definition::Appearance(appearance));
    }

    /// Register a material or texture under its id
    pub fn register_surface_data(&mut self, surface_data: SurfaceData) {
        self.register(surface_data.id.clone(), Definition::SurfaceData(surface_data));
    }

    /// Register a coordinate reference system
    pub fn register_crs(&mut self, id: impl Into<String>, crs: CrsDefinition) {
        self.register(id.into(), Definition::Crs(crs));
    }

    /// Register a geometry usable as an implicit geometry template
    pub fn register_geometry_template(&mut self, id: impl Into<String>, geometry: Geometry) {
        self.register(id.into(), Definition::GeometryTemplate(geometry));
    }

    /// Look up a definition in the local registry, then the shared one
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] if neither registry defines `id`.
    pub fn resolve(&self, id: &str) -> Result<&Definition> {
        let id = id.trim_start_matches('#');
        self.registry
            .get(id)
            .or_else(|| self.shared_registry.as_ref().and_then(|shared| shared.get(id)))
            .ok_or_else(|| Error::NotFound(id.to_string()))
    }

    fn is_resolved(&self, reference: &Reference) -> bool {
        match reference.kind {
            ReferenceKind::Polygon => self.contains_polygon(&reference.id),
            kind => self
                .resolve(&reference.id)
                .is_ok_and(|definition| definition.kind() == kind),
        }
    }

    fn contains_polygon(&self, id: &str) -> bool {
        self.depth_first()
            .flat_map(|object| object.geometries())
            .flat_map(|geometry| geometry.polygons())
            .any(|polygon| polygon.id() == Some(id))
    }

    /// Record a cross-reference
    ///
    /// The reference is resolved immediately when the registry already holds
    /// its id, otherwise it is kept for [`CityModel::finalize`]. Polygon
    /// references are always deferred since polygons are indexed only once
    /// the tree is complete.
    pub fn record_reference(&mut self, reference: Reference) {
        if reference.kind != ReferenceKind::Polygon && self.is_resolved(&reference) {
            return;
        }
        if !self.pending.contains(&reference) {
            self.pending.push(reference);
        }
    }

    /// Resolve deferred references and bind appearances to polygons
    ///
    /// Returns the references still unresolved, each id listed once per kind.
    /// Calling it again re-runs the pass with the same result.
    pub fn finalize(&mut self) -> Vec<Reference> {
        self.bind_appearances();

        let pending = std::mem::take(&mut self.pending);
        let mut seen = HashSet::new();
        let mut unresolved = Vec::new();
        for reference in pending {
            if self.is_resolved(&reference) {
                continue;
            }
            if seen.insert((reference.id.clone(), reference.kind)) {
                unresolved.push(reference.clone());
            }
            self.pending.push(reference);
        }
        unresolved
    }

    /// Collect per-polygon bindings from every appearance and apply them
    fn bind_appearances(&mut self) {
        let mut bindings: HashMap<String, Vec<PolygonBinding>> = HashMap::new();
        let mut targets: Vec<String> = Vec::new();

        for (_, definition) in self.registry.iter() {
            let Definition::Appearance(appearance) = definition else {
                continue;
            };
            for surface_data_id in &appearance.surface_data {
                let Ok(Definition::SurfaceData(surface_data)) = self.resolve(surface_data_id)
                else {
                    continue;
                };
                for target in &surface_data.targets {
                    let binding = match surface_data.kind {
                        SurfaceDataKind::Material(_) => PolygonBinding::Material {
                            theme: appearance.theme.clone(),
                            id: surface_data.id.clone(),
                        },
                        SurfaceDataKind::Texture(_) => PolygonBinding::Texture {
                            theme: appearance.theme.clone(),
                            id: surface_data.id.clone(),
                            rings: target
                                .rings
                                .iter()
                                .map(|r| (r.ring.clone(), r.coordinates.clone()))
                                .collect(),
                        },
                    };
                    let entry = bindings.entry(target.polygon_id.clone()).or_default();
                    if entry.is_empty() {
                        targets.push(target.polygon_id.clone());
                    }
                    entry.push(binding);
                }
            }
        }

        if bindings.is_empty() {
            return;
        }

        let mut bound = HashSet::new();
        for object in &mut self.objects {
            bind_object(object, &bindings, &mut bound);
        }

        let referrers: Vec<Reference> = targets
            .iter()
            .filter(|id| !bound.contains(*id))
            .map(|id| Reference::new(id, ReferenceKind::Polygon, None))
            .collect();
        for reference in referrers {
            self.record_reference(reference);
        }
    }

    /// Tessellate every polygon that has not been tessellated yet
    ///
    /// Runs across polygons in parallel with the `parallel` feature. Returns a
    /// diagnostic for every polygon that failed.
    pub fn tessellate_all(&mut self, options: TessellationOptions) -> Vec<Diagnostic> {
        let mut polygons: Vec<&mut Polygon> = Vec::new();
        for object in &mut self.objects {
            collect_polygons(object, &mut polygons);
        }

        #[cfg(feature = "parallel")]
        let failures: Vec<Diagnostic> = {
            use rayon::prelude::*;
            polygons
                .into_par_iter()
                .filter_map(|polygon| tessellate_polygon(polygon, options))
                .collect()
        };

        #[cfg(not(feature = "parallel"))]
        let failures: Vec<Diagnostic> = polygons
            .into_iter()
            .filter_map(|polygon| tessellate_polygon(polygon, options))
            .collect();

        for failure in &failures {
            warn!(diagnostic = %failure, "Polygon tessellation failed");
        }
        failures
    }

    /// The template geometry of `implicit`, resolving references
    pub fn implicit_template<'a>(&'a self, implicit: &'a ImplicitGeometry) -> Option<&'a Geometry> {
        match implicit.template() {
            ImplicitTemplate::Inline(geometry) => Some(geometry),
            ImplicitTemplate::Reference(id) => match self.resolve(id) {
                Ok(Definition::GeometryTemplate(geometry)) => Some(geometry),
                _ => None,
            },
            ImplicitTemplate::None => None,
        }
    }

    /// Decode the image of texture `texture_id` with `loader`
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] if the id is undefined, [`Error::TextureLoad`] if
    /// it is not a texture with an image URI or the loader fails.
    pub fn load_texture(
        &self,
        texture_id: &str,
        loader: &dyn TextureLoader,
    ) -> Result<TextureImage> {
        let definition = self.resolve(texture_id)?;
        let Definition::SurfaceData(surface_data) = definition else {
            return Err(Error::TextureLoad(format!("'{}' is not a texture", texture_id)));
        };
        let texture = surface_data
            .texture()
            .ok_or_else(|| Error::TextureLoad(format!("'{}' is a material", texture_id)))?;
        let source = texture
            .image_uri
            .as_deref()
            .ok_or_else(|| {
                Error::TextureLoad(format!("Texture '{}' has no image URI", texture_id))
            })?;

        loader.load(texture_id, source)
    }
}

/// A material or texture to attach to one polygon
enum PolygonBinding {
    Material {
        theme: String,
        id: String,
    },
    Texture {
        theme: String,
        id: String,
        rings: Vec<(Option<String>, Vec<Point2>)>,
    },
}

fn bind_object(
    object: &mut CityObject,
    bindings: &HashMap<String, Vec<PolygonBinding>>,
    bound: &mut HashSet<String>,
) {
    for geometry in object.geometries_mut() {
        for polygon in geometry.polygons_mut() {
            let Some(id) = polygon.id().map(str::to_string) else {
                continue;
            };
            let Some(polygon_bindings) = bindings.get(&id) else {
                continue;
            };
            for binding in polygon_bindings {
                apply_binding(polygon, binding);
            }
            bound.insert(id);
        }
    }
    for child in object.children_mut() {
        bind_object(child, bindings, bound);
    }
}

fn apply_binding(polygon: &mut Polygon, binding: &PolygonBinding) {
    match binding {
        PolygonBinding::Material { theme, id } => polygon.bind_material(theme, id),
        PolygonBinding::Texture { theme, id, rings } => {
            let coordinates = order_ring_coordinates(polygon, rings);
            polygon.bind_texture(theme, id, coordinates);
        }
    }
}

/// Arrange texture coordinates in ring order (exterior, then holes)
///
/// Coordinates naming a ring id go to that ring; unnamed ones fill the
/// remaining rings in document order.
fn order_ring_coordinates(
    polygon: &Polygon,
    rings: &[(Option<String>, Vec<Point2>)],
) -> Vec<Vec<Point2>> {
    let ring_ids: Vec<Option<&str>> = polygon.rings().map(|r| r.id()).collect();
    let mut ordered: Vec<Option<Vec<Point2>>> = vec![None; ring_ids.len()];
    let mut unnamed = Vec::new();

    for (ring, coordinates) in rings {
        let slot = ring.as_deref().and_then(|name| {
            let name = name.trim_start_matches('#');
            ring_ids.iter().position(|id| *id == Some(name))
        });
        match slot {
            Some(index) => ordered[index] = Some(coordinates.clone()),
            None => unnamed.push(coordinates.clone()),
        }
    }

    let mut unnamed = unnamed.into_iter();
    for slot in ordered.iter_mut().filter(|slot| slot.is_none()) {
        *slot = unnamed.next();
    }

    // Rings without coordinates get an empty list
    ordered.into_iter().map(Option::unwrap_or_default).collect()
}

fn collect_polygons<'a>(object: &'a mut CityObject, polygons: &mut Vec<&'a mut Polygon>) {
    let (geometries, children) = object.geometry_and_children_mut();
    for geometry in geometries {
        polygons.extend(geometry.polygons_mut().iter_mut().filter(|p| !p.is_tessellated()));
    }
    for child in children {
        collect_polygons(child, polygons);
    }
}

fn tessellate_polygon(polygon: &mut Polygon, options: TessellationOptions) -> Option<Diagnostic> {
    match polygon.tessellate(options) {
        Ok(_) => None,
        Err(err) => Some(
            Diagnostic::new(
                DiagnosticKind::TessellationFailure,
                Error::Tessellation(err).to_string(),
            )
            .with_element_id(polygon.id().map(str::to_string)),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::appearance::{
        RingTextureCoordinates, SurfaceTarget, Texture, TextureKind, X3DMaterial,
    };
    use crate::model::city_object::CityObjectKind;
    use crate::model::geometry::{GeometryType, LinearRing};
    use crate::mesh_ops::Point3;

    fn square_polygon(id: &str, offset: f64) -> Polygon {
        let ring = LinearRing::from_points(
            None,
            vec![
                Point3::new(offset, 0.0, 0.0),
                Point3::new(offset + 1.0, 0.0, 0.0),
                Point3::new(offset + 1.0, 1.0, 0.0),
                Point3::new(offset, 1.0, 0.0),
            ],
            false,
        )
        .unwrap();
        Polygon::new(Some(id.to_string()), ring)
    }

    fn building_with_polygon(id: &str, polygon_id: &str, offset: f64) -> CityObject {
        let mut geometry = Geometry::new(None, 2, GeometryType::MultiSurface, None);
        geometry.add_polygon(square_polygon(polygon_id, offset));
        let mut building = CityObject::new(CityObjectKind::Building, id);
        building.add_geometry(geometry);
        building.finalize_envelope();
        building
    }

    #[test]
    fn test_add_top_level_object_unions_envelope() {
        let mut model = CityModel::new();
        model.add_top_level_object(building_with_polygon("b1", "p1", 0.0));
        model.add_top_level_object(building_with_polygon("b2", "p2", 5.0));

        assert_eq!(model.object_count(), 2);
        assert_eq!(model.envelope().min(), Some(Point3::new(0.0, 0.0, 0.0)));
        assert_eq!(model.envelope().max(), Some(Point3::new(6.0, 1.0, 0.0)));
        assert!(model.find_object("b2").is_some());
        assert!(model.find_object("nope").is_none());
    }

    #[test]
    fn test_resolve_not_found() {
        let model = CityModel::new();
        assert!(matches!(model.resolve("#missing"), Err(Error::NotFound(id)) if id == "missing"));
    }

    #[test]
    fn test_shared_registry_fallback() {
        let mut shared = Registry::new();
        shared.insert(
            "EPSG:25832",
            Definition::Crs(CrsDefinition {
                name: "EPSG:25832".to_string(),
                dimension: Some(3),
            }),
        );
        let model = CityModel::with_shared_registry(Arc::new(shared));
        assert!(matches!(model.resolve("EPSG:25832"), Ok(Definition::Crs(_))));
    }

    #[test]
    fn test_forward_reference_resolves_at_finalize() {
        let mut model = CityModel::new();
        model.record_reference(Reference::new("#app-1", ReferenceKind::Appearance, None));
        assert_eq!(model.pending_references().len(), 1);

        model.register_appearance(Appearance::new("app-1", "summer"));
        assert!(model.finalize().is_empty());
        assert!(model.pending_references().is_empty());
    }

    #[test]
    fn test_dangling_reference_listed_once() {
        let mut model = CityModel::new();
        for (id, referrer) in [("#ghost", "b1"), ("ghost", "b2")] {
            model.record_reference(Reference::new(
                id,
                ReferenceKind::Appearance,
                Some(referrer.into()),
            ));
        }

        let unresolved = model.finalize();
        assert_eq!(unresolved.len(), 1);
        assert_eq!(unresolved[0].id, "ghost");

        // Idempotent
        assert_eq!(model.finalize().len(), 1);
    }

    #[test]
    fn test_reference_to_wrong_kind_is_unresolved() {
        let mut model = CityModel::new();
        model.register_appearance(Appearance::new("x", ""));
        model.record_reference(Reference::new("x", ReferenceKind::SurfaceData, None));
        assert_eq!(model.finalize().len(), 1);
    }

    #[test]
    fn test_finalize_binds_material_and_texture() {
        let mut model = CityModel::new();
        model.add_top_level_object(building_with_polygon("b1", "p1", 0.0));

        let mut material =
            SurfaceData::new("mat-1", SurfaceDataKind::Material(X3DMaterial::default()));
        material.targets.push(SurfaceTarget {
            polygon_id: "p1".to_string(),
            rings: Vec::new(),
        });
        let mut texture = SurfaceData::new(
            "tex-1",
            SurfaceDataKind::Texture(Texture::new(TextureKind::Parameterized)),
        );
        texture.targets.push(SurfaceTarget {
            polygon_id: "p1".to_string(),
            rings: vec![RingTextureCoordinates {
                ring: None,
                coordinates: vec![
                    Point2::new(0.0, 0.0),
                    Point2::new(1.0, 0.0),
                    Point2::new(1.0, 1.0),
                    Point2::new(0.0, 1.0),
                ],
            }],
        });

        let mut appearance = Appearance::new("app-1", "rgbTexture");
        appearance.surface_data = vec!["mat-1".to_string(), "tex-1".to_string()];
        model.register_surface_data(material);
        model.register_surface_data(texture);
        model.register_appearance(appearance);

        assert!(model.finalize().is_empty());

        let polygon = &model.objects()[0].geometries()[0].polygons()[0];
        let binding = polygon.appearance("rgbTexture").unwrap();
        assert_eq!(binding.material.as_deref(), Some("mat-1"));
        assert_eq!(binding.texture.as_deref(), Some("tex-1"));
        assert_eq!(polygon.texture_coordinates("rgbTexture").unwrap().len(), 4);
    }

    #[test]
    fn test_registry_iterates_in_registration_order() {
        let mut registry = Registry::new();
        for id in ["zeta", "alpha", "mu"] {
            registry.insert(id, Definition::Appearance(Appearance::new(id, "")));
        }
        registry.insert("alpha", Definition::Appearance(Appearance::new("alpha", "winter")));

        let ids: Vec<&str> = registry.iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec!["zeta", "alpha", "mu"]);
        assert!(matches!(
            registry.get("alpha"),
            Some(Definition::Appearance(a)) if a.theme == "winter"
        ));
    }

    #[test]
    fn test_later_appearance_wins_for_same_theme() {
        let mut model = CityModel::new();
        model.add_top_level_object(building_with_polygon("b1", "p1", 0.0));

        for i in 0..16 {
            let mut material = SurfaceData::new(
                format!("mat-{i}"),
                SurfaceDataKind::Material(X3DMaterial::default()),
            );
            material.targets.push(SurfaceTarget {
                polygon_id: "p1".to_string(),
                rings: Vec::new(),
            });
            let mut appearance = Appearance::new(format!("app-{i}"), "summer");
            appearance.surface_data.push(format!("mat-{i}"));
            model.register_surface_data(material);
            model.register_appearance(appearance);
        }

        assert!(model.finalize().is_empty());
        let polygon = &model.objects()[0].geometries()[0].polygons()[0];
        let binding = polygon.appearance("summer").unwrap();
        assert_eq!(binding.material.as_deref(), Some("mat-15"));
    }

    #[test]
    fn test_unknown_target_polygon_is_reported() {
        let mut model = CityModel::new();
        let mut material =
            SurfaceData::new("mat-1", SurfaceDataKind::Material(X3DMaterial::default()));
        material.targets.push(SurfaceTarget {
            polygon_id: "no-such-polygon".to_string(),
            rings: Vec::new(),
        });
        let mut appearance = Appearance::new("app-1", "");
        appearance.surface_data.push("mat-1".to_string());
        model.register_surface_data(material);
        model.register_appearance(appearance);

        let unresolved = model.finalize();
        assert_eq!(unresolved.len(), 1);
        assert_eq!(unresolved[0].kind, ReferenceKind::Polygon);
    }

    #[test]
    fn test_tessellate_all() {
        let mut model = CityModel::new();
        model.add_top_level_object(building_with_polygon("b1", "p1", 0.0));
        let failures = model.tessellate_all(TessellationOptions::default());
        assert!(failures.is_empty());
        assert_eq!(model.objects()[0].geometries()[0].triangle_count(), 2);
    }

    #[test]
    fn test_load_texture_errors() {
        struct NoLoader;
        impl TextureLoader for NoLoader {
            fn load(&self, _texture_id: &str, _source: &str) -> Result<TextureImage> {
                Err(Error::TextureLoad("unreachable".to_string()))
            }
        }

        let mut model = CityModel::new();
        model.register_surface_data(SurfaceData::new(
            "mat-1",
            SurfaceDataKind::Material(X3DMaterial::default()),
        ));
        assert!(matches!(model.load_texture("missing", &NoLoader), Err(Error::NotFound(_))));
        assert!(matches!(model.load_texture("mat-1", &NoLoader), Err(Error::TextureLoad(_))));
    }
}
