//! Parsing of coordinate and number lists from element text

use nalgebra::Matrix4;

use crate::error::{Error, Result};
use crate::mesh_ops::{Point2, Point3, Vector3};

/// Parse one finite floating-point number; `NaN` and infinities are rejected
fn parse_finite(field: &str, token: &str) -> Result<f64> {
    match token.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(Error::parse_error_with_context(
            field,
            token,
            "finite floating-point number",
        )),
    }
}

/// Parse whitespace separated floating-point numbers
pub(crate) fn parse_doubles(field: &str, text: &str) -> Result<Vec<f64>> {
    text.split_whitespace()
        .map(|token| parse_finite(field, token))
        .collect()
}

/// Parse whitespace separated integers
pub(crate) fn parse_integers(field: &str, text: &str) -> Result<Vec<i64>> {
    text.split_whitespace()
        .map(|token| {
            token
                .parse::<i64>()
                .map_err(|_| Error::parse_error_with_context(field, token, "integer"))
        })
        .collect()
}

fn to_points(field: &str, values: &[f64], dimension: usize) -> Result<Vec<Point3>> {
    if !(2..=3).contains(&dimension) {
        return Err(Error::ParseError(format!(
            "{}: unsupported coordinate dimension {}",
            field, dimension
        )));
    }
    if values.len() % dimension != 0 {
        return Err(Error::ParseError(format!(
            "{}: {} values do not form {}D coordinates",
            field,
            values.len(),
            dimension
        )));
    }

    Ok(values
        .chunks_exact(dimension)
        .map(|c| Point3::new(c[0], c[1], if dimension == 3 { c[2] } else { 0.0 }))
        .collect())
}

/// Parse `gml:posList` text
///
/// `dimension` comes from `srsDimension`; without it, 3D is assumed. 2D
/// coordinates get a height of zero.
pub(crate) fn parse_pos_list(text: &str, dimension: Option<usize>) -> Result<Vec<Point3>> {
    let values = parse_doubles("posList", text)?;
    to_points("posList", &values, dimension.unwrap_or(3))
}

/// Parse a single `gml:pos` point (2D or 3D)
pub(crate) fn parse_pos(text: &str) -> Result<Point3> {
    let values = parse_doubles("pos", text)?;
    match values.as_slice() {
        [x, y] => Ok(Point3::new(*x, *y, 0.0)),
        [x, y, z] => Ok(Point3::new(*x, *y, *z)),
        _ => Err(Error::ParseError(format!(
            "pos: expected 2 or 3 values, got {}",
            values.len()
        ))),
    }
}

/// Separators of legacy `gml:coordinates` text
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CoordinateSeparators {
    pub decimal: char,
    pub component: char,
    pub tuple: char,
}

impl Default for CoordinateSeparators {
    fn default() -> Self {
        Self {
            decimal: '.',
            component: ',',
            tuple: ' ',
        }
    }
}

/// Parse legacy `gml:coordinates` text (`x,y,z x,y,z ...` by default)
pub(crate) fn parse_coordinates(
    text: &str,
    separators: &CoordinateSeparators,
) -> Result<Vec<Point3>> {
    let tuples: Vec<&str> = if separators.tuple.is_whitespace() {
        text.split_whitespace().collect()
    } else {
        text.split(separators.tuple)
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .collect()
    };

    tuples
        .into_iter()
        .map(|tuple| {
            let values = tuple
                .split(separators.component)
                .map(|component| {
                    let component = component.trim();
                    let normalized = if separators.decimal == '.' {
                        component.to_string()
                    } else {
                        component.replace(separators.decimal, ".")
                    };
                    parse_finite("coordinates", &normalized)
                })
                .collect::<Result<Vec<f64>>>()?;
            match values.as_slice() {
                [x, y] => Ok(Point3::new(*x, *y, 0.0)),
                [x, y, z] => Ok(Point3::new(*x, *y, *z)),
                _ => Err(Error::ParseError(format!(
                    "coordinates: tuple '{}' has {} components",
                    tuple,
                    values.len()
                ))),
            }
        })
        .collect()
}

/// Parse `s t s t ...` texture coordinate pairs
pub(crate) fn parse_texture_coordinates(text: &str) -> Result<Vec<Point2>> {
    let values = parse_doubles("textureCoordinates", text)?;
    if values.len() % 2 != 0 {
        return Err(Error::ParseError(format!(
            "textureCoordinates: odd number of values ({})",
            values.len()
        )));
    }
    Ok(values.chunks_exact(2).map(|c| Point2::new(c[0], c[1])).collect())
}

/// Parse a row-major 4x4 matrix
pub(crate) fn parse_matrix4(text: &str) -> Result<Matrix4<f64>> {
    let values = parse_doubles("transformationMatrix", text)?;
    if values.len() != 16 {
        return Err(Error::ParseError(format!(
            "transformationMatrix: expected 16 values, got {}",
            values.len()
        )));
    }
    Ok(Matrix4::from_row_slice(&values))
}

/// Parse a 3D vector (2D vectors get a zero z component)
pub(crate) fn parse_vector3(field: &str, text: &str) -> Result<Vector3> {
    let values = parse_doubles(field, text)?;
    match values.as_slice() {
        [x, y] => Ok(Vector3::new(*x, *y, 0.0)),
        [x, y, z] => Ok(Vector3::new(*x, *y, *z)),
        _ => Err(Error::ParseError(format!(
            "{}: expected 2 or 3 values, got {}",
            field,
            values.len()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pos_list_3d() {
        let points = parse_pos_list("0 0 0  1 0 0\n1 1 0", None).unwrap();
        assert_eq!(points.len(), 3);
        assert_eq!(points[2], Point3::new(1.0, 1.0, 0.0));
    }

    #[test]
    fn test_pos_list_2d() {
        let points = parse_pos_list("0 0 1 0 1 1", Some(2)).unwrap();
        assert_eq!(points, vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
        ]);
    }

    #[test]
    fn test_pos_list_errors() {
        assert!(parse_pos_list("0 0 0 1", None).is_err());
        assert!(parse_pos_list("0 0 x", None).is_err());
        assert!(parse_pos_list("0 0 0 0", Some(4)).is_err());
    }

    #[test]
    fn test_non_finite_values_are_rejected() {
        assert!(parse_pos_list("0 0 0 NaN 0 0 1 1 0", None).is_err());
        assert!(parse_pos_list("0 0 inf 1 0 0", None).is_err());
        assert!(parse_pos("-infinity 2").is_err());
        assert!(parse_coordinates("0,0,0 1,NaN,0", &CoordinateSeparators::default()).is_err());
        assert!(parse_matrix4("1 0 0 NaN  0 1 0 0  0 0 1 0  0 0 0 1").is_err());
    }

    #[test]
    fn test_pos() {
        assert_eq!(parse_pos("1 2").unwrap(), Point3::new(1.0, 2.0, 0.0));
        assert!(parse_pos("1").is_err());
    }

    #[test]
    fn test_legacy_coordinates() {
        let points =
            parse_coordinates("0,0,0 1,0,0 1,1,2", &CoordinateSeparators::default()).unwrap();
        assert_eq!(points[2], Point3::new(1.0, 1.0, 2.0));

        let european = CoordinateSeparators {
            decimal: ',',
            component: ';',
            tuple: ' ',
        };
        let points = parse_coordinates("0,5;1,5 2;3", &european).unwrap();
        assert_eq!(points, vec![Point3::new(0.5, 1.5, 0.0), Point3::new(2.0, 3.0, 0.0)]);
    }

    #[test]
    fn test_matrix_is_row_major() {
        let matrix = parse_matrix4("1 0 0 10  0 1 0 20  0 0 1 30  0 0 0 1").unwrap();
        assert_eq!(matrix[(0, 3)], 10.0);
        assert_eq!(matrix[(2, 3)], 30.0);
        assert!(parse_matrix4("1 0 0").is_err());
    }

    #[test]
    fn test_texture_coordinates() {
        let coords = parse_texture_coordinates("0 0 1 0 1 1").unwrap();
        assert_eq!(coords.len(), 3);
        assert!(parse_texture_coordinates("0 0 1").is_err());
    }
}
