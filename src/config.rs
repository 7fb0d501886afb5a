//! Parser configuration

use std::collections::HashSet;
use std::sync::Arc;

use crate::model::{CityObjectKind, Registry};
use crate::services::CrsTransform;
use crate::tessellator::TessellationOptions;

/// When polygons are tessellated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TessellationMode {
    /// As each polygon closes during parsing
    #[default]
    Eager,
    /// In one batch after the document is read (parallel with the `parallel` feature)
    Deferred,
    /// Not at all; call [`crate::CityModel::tessellate_all`] later if needed
    Disabled,
}

/// Configuration for parsing CityGML documents
///
/// # Example
///
/// ```
/// use citygml::{CityObjectKind, ParserConfig, TessellationMode};
///
/// let config = ParserConfig::new()
///     .with_lod_range(1, 2)
///     .with_enabled_kinds([CityObjectKind::Building, CityObjectKind::WallSurface])
///     .with_tessellation_mode(TessellationMode::Deferred);
///
/// assert!(config.accepts_lod(2));
/// assert!(!config.accepts_lod(3));
/// assert!(!config.accepts_kind(CityObjectKind::Road));
/// ```
#[derive(Clone)]
pub struct ParserConfig {
    min_lod: u8,
    max_lod: u8,
    /// `None` enables every kind
    enabled_kinds: Option<HashSet<CityObjectKind>>,
    tessellation_mode: TessellationMode,
    tessellation_options: TessellationOptions,
    prune_empty_objects: bool,
    require_closed_rings: bool,
    crs_transform: Option<Arc<dyn CrsTransform>>,
    destination_srs: Option<String>,
    shared_registry: Option<Arc<Registry>>,
}

impl ParserConfig {
    /// Create a configuration accepting everything
    pub fn new() -> Self {
        Self {
            min_lod: 0,
            max_lod: 4,
            enabled_kinds: None,
            tessellation_mode: TessellationMode::Eager,
            tessellation_options: TessellationOptions::default(),
            prune_empty_objects: false,
            require_closed_rings: false,
            crs_transform: None,
            destination_srs: None,
            shared_registry: None,
        }
    }

    /// Keep only geometries with `min <= lod <= max`
    pub fn with_lod_range(mut self, min: u8, max: u8) -> Self {
        self.min_lod = min.min(max);
        self.max_lod = max.max(min);
        self
    }

    /// Keep only objects of the given kinds (and skip the subtrees of others)
    pub fn with_enabled_kinds(mut self, kinds: impl IntoIterator<Item = CityObjectKind>) -> Self {
        self.enabled_kinds = Some(kinds.into_iter().collect());
        self
    }

    /// Choose when polygons are tessellated
    pub fn with_tessellation_mode(mut self, mode: TessellationMode) -> Self {
        self.tessellation_mode = mode;
        self
    }

    /// Produce per-vertex normals instead of one normal per polygon
    pub fn with_smooth_normals(mut self, smooth: bool) -> Self {
        self.tessellation_options.smooth_normals = smooth;
        self
    }

    /// Drop objects that end up without geometry, coverage or children
    pub fn with_prune_empty_objects(mut self, prune: bool) -> Self {
        self.prune_empty_objects = prune;
        self
    }

    /// Reject rings whose last point does not repeat the first
    pub fn with_require_closed_rings(mut self, require: bool) -> Self {
        self.require_closed_rings = require;
        self
    }

    /// Reproject coordinates through `transform`
    ///
    /// # Arguments
    ///
    /// * `transform` - The service called for every coordinate
    /// * `destination_srs` - CRS name recorded on geometries after reprojection
    pub fn with_crs_transform(
        mut self,
        transform: Arc<dyn CrsTransform>,
        destination_srs: Option<String>,
    ) -> Self {
        self.crs_transform = Some(transform);
        self.destination_srs = destination_srs;
        self
    }

    /// Fall back to `registry` for ids the document does not define
    pub fn with_shared_registry(mut self, registry: Arc<Registry>) -> Self {
        self.shared_registry = Some(registry);
        self
    }

    /// True if geometry at `lod` is kept
    pub fn accepts_lod(&self, lod: u8) -> bool {
        (self.min_lod..=self.max_lod).contains(&lod)
    }

    /// True if objects of `kind` are kept
    pub fn accepts_kind(&self, kind: CityObjectKind) -> bool {
        self.enabled_kinds
            .as_ref()
            .is_none_or(|kinds| kinds.contains(&kind))
    }

    /// Inclusive LOD range
    pub fn lod_range(&self) -> (u8, u8) {
        (self.min_lod, self.max_lod)
    }

    /// Tessellation mode
    pub fn tessellation_mode(&self) -> TessellationMode {
        self.tessellation_mode
    }

    /// Tessellation options
    pub fn tessellation_options(&self) -> TessellationOptions {
        self.tessellation_options
    }

    /// Whether empty objects are dropped
    pub fn prune_empty_objects(&self) -> bool {
        self.prune_empty_objects
    }

    /// Whether rings must repeat their first point
    pub fn require_closed_rings(&self) -> bool {
        self.require_closed_rings
    }

    /// Get the CRS transform if one is configured
    pub fn crs_transform(&self) -> Option<&Arc<dyn CrsTransform>> {
        self.crs_transform.as_ref()
    }

    /// CRS name recorded after reprojection
    pub fn destination_srs(&self) -> Option<&str> {
        self.destination_srs.as_deref()
    }

    /// Get the shared registry if one is configured
    pub fn shared_registry(&self) -> Option<&Arc<Registry>> {
        self.shared_registry.as_ref()
    }
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ParserConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParserConfig")
            .field("lod_range", &(self.min_lod, self.max_lod))
            .field("enabled_kinds", &self.enabled_kinds)
            .field("tessellation_mode", &self.tessellation_mode)
            .field("tessellation_options", &self.tessellation_options)
            .field("prune_empty_objects", &self.prune_empty_objects)
            .field("require_closed_rings", &self.require_closed_rings)
            .field("has_crs_transform", &self.crs_transform.is_some())
            .field("destination_srs", &self.destination_srs)
            .field(
                "shared_registry_len",
                &self.shared_registry.as_ref().map(|r| r.len()),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_accept_everything() {
        let config = ParserConfig::default();
        for lod in 0..=4 {
            assert!(config.accepts_lod(lod));
        }
        assert!(config.accepts_kind(CityObjectKind::Tunnel));
        assert_eq!(config.tessellation_mode(), TessellationMode::Eager);
        assert!(!config.tessellation_options().smooth_normals);
    }

    #[test]
    fn test_lod_range_is_normalized() {
        let config = ParserConfig::new().with_lod_range(3, 1);
        assert_eq!(config.lod_range(), (1, 3));
        assert!(!config.accepts_lod(0));
        assert!(config.accepts_lod(3));
    }

    #[test]
    fn test_debug_hides_services() {
        let transform: Arc<dyn CrsTransform> =
            Arc::new(|_: &str, p: &crate::mesh_ops::Point3| Some(*p));
        let config =
            ParserConfig::new().with_crs_transform(transform, Some("EPSG:4978".to_string()));
        let debug = format!("{:?}", config);
        assert!(debug.contains("has_crs_transform: true"));
        assert!(debug.contains("EPSG:4978"));
    }
}
