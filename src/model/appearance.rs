//! Appearance definitions: materials, textures and their surface targets

use std::str::FromStr;

use crate::mesh_ops::Point2;

/// RGB colour with components in `[0, 1]`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    /// Red
    pub r: f64,
    /// Green
    pub g: f64,
    /// Blue
    pub b: f64,
}

impl Color {
    /// Create a colour
    pub fn new(r: f64, g: f64, b: f64) -> Self {
        Self { r, g, b }
    }
}

impl FromStr for Color {
    type Err = String;

    /// Parse a whitespace separated `r g b` triple
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let components = parse_unit_components(s, 3)?;
        Ok(Color::new(components[0], components[1], components[2]))
    }
}

/// RGBA colour with components in `[0, 1]`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorRgba {
    /// Red
    pub r: f64,
    /// Green
    pub g: f64,
    /// Blue
    pub b: f64,
    /// Alpha
    pub a: f64,
}

impl FromStr for ColorRgba {
    type Err = String;

    /// Parse a whitespace separated `r g b a` quadruple
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let c = parse_unit_components(s, 4)?;
        Ok(ColorRgba {
            r: c[0],
            g: c[1],
            b: c[2],
            a: c[3],
        })
    }
}

fn parse_unit_components(s: &str, expected: usize) -> Result<Vec<f64>, String> {
    let components = s
        .split_whitespace()
        .map(|t| {
            t.parse::<f64>()
                .map_err(|_| format!("Invalid colour component '{}'", t))
        })
        .collect::<Result<Vec<f64>, String>>()?;

    if components.len() != expected {
        return Err(format!(
            "Colour '{}' has {} components, expected {}",
            s.trim(),
            components.len(),
            expected
        ));
    }
    if let Some(c) = components.iter().find(|c| !(0.0..=1.0).contains(*c)) {
        return Err(format!("Colour component {} is outside [0, 1]", c));
    }
    Ok(components)
}

/// X3D material parameters
#[derive(Debug, Clone, PartialEq, Default)]
pub struct X3DMaterial {
    /// Ambient intensity in `[0, 1]`
    pub ambient_intensity: Option<f64>,
    /// Diffuse colour
    pub diffuse_color: Option<Color>,
    /// Emissive colour
    pub emissive_color: Option<Color>,
    /// Specular colour
    pub specular_color: Option<Color>,
    /// Shininess in `[0, 1]`
    pub shininess: Option<f64>,
    /// Transparency in `[0, 1]`
    pub transparency: Option<f64>,
    /// Whether normals should be interpolated across the surface
    pub is_smooth: bool,
}

/// How a texture is attached to surfaces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureKind {
    /// Texture coordinates are given per target ring
    Parameterized,
    /// Texture is placed in world space by a georeference
    Georeferenced,
}

/// Texture wrapping behaviour outside `[0, 1]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WrapMode {
    /// No wrapping (default)
    #[default]
    None,
    /// Repeat
    Wrap,
    /// Repeat mirrored
    Mirror,
    /// Clamp to the edge texel
    Clamp,
    /// Use the border colour
    Border,
}

impl FromStr for WrapMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "none" => Ok(WrapMode::None),
            "wrap" => Ok(WrapMode::Wrap),
            "mirror" => Ok(WrapMode::Mirror),
            "clamp" => Ok(WrapMode::Clamp),
            "border" => Ok(WrapMode::Border),
            other => Err(format!("Unknown wrap mode '{}'", other)),
        }
    }
}

/// Texture image reference and sampling parameters
#[derive(Debug, Clone, PartialEq)]
pub struct Texture {
    /// Parameterized or georeferenced
    pub kind: TextureKind,
    /// Image location (opaque to the parser)
    pub image_uri: Option<String>,
    /// MIME type of the image
    pub mime_type: Option<String>,
    /// Wrap mode
    pub wrap_mode: WrapMode,
    /// Border colour used with [`WrapMode::Border`]
    pub border_color: Option<ColorRgba>,
}

impl Texture {
    /// Create a texture without an image reference
    pub fn new(kind: TextureKind) -> Self {
        Self {
            kind,
            image_uri: None,
            mime_type: None,
            wrap_mode: WrapMode::None,
            border_color: None,
        }
    }
}

/// Material or texture payload of a surface data definition
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceDataKind {
    /// X3D material
    Material(X3DMaterial),
    /// Texture
    Texture(Texture),
}

/// Texture coordinates for one ring of a target polygon
#[derive(Debug, Clone, PartialEq)]
pub struct RingTextureCoordinates {
    /// Id of the ring the coordinates belong to, when given
    pub ring: Option<String>,
    /// One coordinate per ring point
    pub coordinates: Vec<Point2>,
}

/// A polygon a surface data definition applies to
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceTarget {
    /// Polygon id (without a leading `#`)
    pub polygon_id: String,
    /// Per-ring texture coordinates (textures only)
    pub rings: Vec<RingTextureCoordinates>,
}

/// A material or texture definition with its targets
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceData {
    /// Identifier
    pub id: String,
    /// Applies to the front side of its targets
    pub is_front: bool,
    /// Payload
    pub kind: SurfaceDataKind,
    /// Target polygons
    pub targets: Vec<SurfaceTarget>,
}

impl SurfaceData {
    /// Create a definition without targets
    pub fn new(id: impl Into<String>, kind: SurfaceDataKind) -> Self {
        Self {
            id: id.into(),
            is_front: true,
            kind,
            targets: Vec::new(),
        }
    }

    /// Material payload, if this is a material
    pub fn material(&self) -> Option<&X3DMaterial> {
        match self.kind {
            SurfaceDataKind::Material(ref m) => Some(m),
            SurfaceDataKind::Texture(_) => None,
        }
    }

    /// Texture payload, if this is a texture
    pub fn texture(&self) -> Option<&Texture> {
        match self.kind {
            SurfaceDataKind::Texture(ref t) => Some(t),
            SurfaceDataKind::Material(_) => None,
        }
    }
}

/// A themed group of surface data definitions
#[derive(Debug, Clone, PartialEq)]
pub struct Appearance {
    /// Identifier
    pub id: String,
    /// Theme name (e.g. "rgbTexture"); empty when the document gives none
    pub theme: String,
    /// Ids of the surface data definitions in this appearance
    pub surface_data: Vec<String>,
}

impl Appearance {
    /// Create an empty appearance
    pub fn new(id: impl Into<String>, theme: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            theme: theme.into(),
            surface_data: Vec::new(),
        }
    }
}

/// Appearance data bound to one polygon for one theme
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AppearanceBinding {
    /// Theme name; empty when the appearance has none
    pub theme: String,
    /// Id of the bound material
    pub material: Option<String>,
    /// Id of the bound texture
    pub texture: Option<String>,
    /// Texture coordinates per ring: exterior first, then holes in order
    pub texture_coordinates: Vec<Vec<Point2>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_color() {
        let color: Color = "0.5 0.25 1".parse().unwrap();
        assert_eq!(color, Color::new(0.5, 0.25, 1.0));
        assert!("0.5 0.25".parse::<Color>().is_err());
        assert!("0.5 0.25 2.0".parse::<Color>().is_err());
        assert!("red green blue".parse::<Color>().is_err());
    }

    #[test]
    fn test_parse_rgba() {
        let color: ColorRgba = "0 0 0 1".parse().unwrap();
        assert_eq!(color.a, 1.0);
    }

    #[test]
    fn test_wrap_mode() {
        assert_eq!("mirror".parse::<WrapMode>(), Ok(WrapMode::Mirror));
        assert!("tile".parse::<WrapMode>().is_err());
        assert_eq!(WrapMode::default(), WrapMode::None);
    }

    #[test]
    fn test_surface_data_payload_accessors() {
        let material = SurfaceData::new("mat", SurfaceDataKind::Material(X3DMaterial::default()));
        assert!(material.material().is_some());
        assert!(material.texture().is_none());
        assert!(material.is_front);
    }
}
