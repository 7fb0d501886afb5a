//! External service traits
//!
//! The parser never decodes images or reprojects coordinates itself. These
//! traits are the narrow interfaces through which callers plug in their own
//! implementations.

use crate::error::Result;
use crate::mesh_ops::Point3;

/// Decoded texture pixels
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureImage {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Bytes per pixel (1 = grey, 3 = RGB, 4 = RGBA)
    pub channels: u8,
    /// Row-major pixel data
    pub pixels: Vec<u8>,
}

/// Trait for decoding texture images
///
/// Implement this trait to resolve a texture's image URI (relative path,
/// archive entry, URL) and decode it.
///
/// # Example
///
/// ```
/// use citygml::{Result, TextureImage, TextureLoader};
///
/// struct SolidWhite;
///
/// impl TextureLoader for SolidWhite {
///     fn load(&self, _texture_id: &str, _source: &str) -> Result<TextureImage> {
///         Ok(TextureImage {
///             width: 1,
///             height: 1,
///             channels: 4,
///             pixels: vec![255, 255, 255, 255],
///         })
///     }
/// }
/// ```
pub trait TextureLoader: Send + Sync {
    /// Load the image of texture `texture_id` from `source`
    ///
    /// # Arguments
    ///
    /// * `texture_id` - Id of the texture definition
    /// * `source` - Image URI exactly as written in the document
    fn load(&self, texture_id: &str, source: &str) -> Result<TextureImage>;
}

/// Trait for reprojecting points between coordinate reference systems
///
/// The parser calls it for every coordinate it reads, with the `srsName` in
/// effect for that coordinate. Returning `None` keeps the point unchanged.
///
/// Closures with the matching signature implement this trait:
///
/// ```
/// use citygml::{CrsTransform, mesh_ops::Point3};
///
/// let shift = |srs: &str, p: &Point3| {
///     (srs == "EPSG:25832").then(|| Point3::new(p.x - 500000.0, p.y, p.z))
/// };
/// assert_eq!(
///     shift.transform("EPSG:25832", &Point3::new(500001.0, 2.0, 3.0)),
///     Some(Point3::new(1.0, 2.0, 3.0))
/// );
/// ```
pub trait CrsTransform: Send + Sync {
    /// Reproject `point` given in `srs`
    fn transform(&self, srs: &str, point: &Point3) -> Option<Point3>;
}

impl<F> CrsTransform for F
where
    F: Fn(&str, &Point3) -> Option<Point3> + Send + Sync,
{
    fn transform(&self, srs: &str, point: &Point3) -> Option<Point3> {
        self(srs, point)
    }
}
