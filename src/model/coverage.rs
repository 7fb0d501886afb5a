//! Regularly sampled elevation grids

use crate::envelope::Envelope;
use crate::mesh_ops::{Point3, Vector3};

/// Sample storage of a grid coverage
#[derive(Debug, Clone, PartialEq)]
pub enum GridSamples {
    /// Row-major sample values stored in the document
    Inline(Vec<f64>),
    /// Samples live in an external file the parser does not read
    External {
        /// File reference as written in the document
        file: String,
    },
}

/// Failure of a grid sample lookup
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GridLookupError {
    /// The requested cell lies outside the grid
    #[error("Cell ({row}, {column}) is outside the {rows}x{columns} grid")]
    OutOfBounds {
        /// Requested row
        row: usize,
        /// Requested column
        column: usize,
        /// Grid rows
        rows: usize,
        /// Grid columns
        columns: usize,
    },

    /// The grid's samples are stored externally
    #[error("Grid samples are stored externally in '{file}'")]
    ExternalSamples {
        /// External file reference
        file: String,
    },

    /// The object carries no grid
    #[error("Object has no grid coverage")]
    NoCoverage,
}

/// A rectified grid of elevation samples
///
/// Grid axis 0 (columns) runs along `offset_vectors[0]`, axis 1 (rows) along
/// `offset_vectors[1]`. Samples are stored row-major, so the value of cell
/// `(row, column)` is at index `row * columns + column`.
#[derive(Debug, Clone, PartialEq)]
pub struct GridCoverage {
    origin: Point3,
    offset_vectors: [Vector3; 2],
    rows: usize,
    columns: usize,
    samples: GridSamples,
}

impl GridCoverage {
    pub(crate) fn new(
        origin: Point3,
        offset_vectors: [Vector3; 2],
        rows: usize,
        columns: usize,
        samples: GridSamples,
    ) -> Self {
        Self {
            origin,
            offset_vectors,
            rows,
            columns,
            samples,
        }
    }

    /// Grid origin (cell `(0, 0)`)
    pub fn origin(&self) -> Point3 {
        self.origin
    }

    /// Offset vectors of the column and row axes
    pub fn offset_vectors(&self) -> &[Vector3; 2] {
        &self.offset_vectors
    }

    /// Number of rows
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns
    pub fn columns(&self) -> usize {
        self.columns
    }

    /// Sample storage
    pub fn samples(&self) -> &GridSamples {
        &self.samples
    }

    /// Stored sample value of cell `(row, column)`
    ///
    /// # Errors
    ///
    /// [`GridLookupError::OutOfBounds`] for cells outside the grid or missing
    /// from a short inline sample list, [`GridLookupError::ExternalSamples`]
    /// when samples are stored externally.
    pub fn sample_at(&self, row: usize, column: usize) -> Result<f64, GridLookupError> {
        let out_of_bounds = GridLookupError::OutOfBounds {
            row,
            column,
            rows: self.rows,
            columns: self.columns,
        };
        if row >= self.rows || column >= self.columns {
            return Err(out_of_bounds);
        }

        match self.samples {
            GridSamples::Inline(ref values) => values
                .get(row * self.columns + column)
                .copied()
                .ok_or(out_of_bounds),
            GridSamples::External { ref file } => {
                Err(GridLookupError::ExternalSamples { file: file.clone() })
            }
        }
    }

    /// Position of the grid point `(row, column)` in the horizontal frame
    ///
    /// The height is the stored sample when available, the origin's height
    /// otherwise.
    pub fn point_at(&self, row: usize, column: usize) -> Point3 {
        let mut point = self.origin
            + self.offset_vectors[0] * column as f64
            + self.offset_vectors[1] * row as f64;
        if let Ok(height) = self.sample_at(row, column) {
            point.z = height;
        }
        point
    }

    /// The four corner points of the grid
    pub fn corners(&self) -> [Point3; 4] {
        let last_row = self.rows.saturating_sub(1);
        let last_column = self.columns.saturating_sub(1);
        [
            self.point_at(0, 0),
            self.point_at(0, last_column),
            self.point_at(last_row, last_column),
            self.point_at(last_row, 0),
        ]
    }

    /// Envelope of the four corner points
    pub fn envelope(&self) -> Envelope {
        Envelope::from_points(&self.corners())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid_2x2() -> GridCoverage {
        GridCoverage::new(
            Point3::new(100.0, 200.0, 0.0),
            [Vector3::new(10.0, 0.0, 0.0), Vector3::new(0.0, 10.0, 0.0)],
            2,
            2,
            GridSamples::Inline(vec![1.0, 2.0, 3.0, 4.0]),
        )
    }

    #[test]
    fn test_sample_lookup_row_major() {
        let grid = grid_2x2();
        assert_eq!(grid.sample_at(0, 0), Ok(1.0));
        assert_eq!(grid.sample_at(0, 1), Ok(2.0));
        assert_eq!(grid.sample_at(1, 0), Ok(3.0));
        assert_eq!(grid.sample_at(1, 1), Ok(4.0));
    }

    #[test]
    fn test_sample_out_of_bounds() {
        let grid = grid_2x2();
        assert_eq!(
            grid.sample_at(5, 5),
            Err(GridLookupError::OutOfBounds {
                row: 5,
                column: 5,
                rows: 2,
                columns: 2
            })
        );
    }

    #[test]
    fn test_external_samples() {
        let grid = GridCoverage::new(
            Point3::origin(),
            [Vector3::x(), Vector3::y()],
            3,
            3,
            GridSamples::External {
                file: "dem.tif".to_string(),
            },
        );
        assert!(matches!(
            grid.sample_at(0, 0),
            Err(GridLookupError::ExternalSamples { .. })
        ));
        // Corners fall back to the origin's height
        assert!(grid.corners().iter().all(|c| c.z == 0.0));
    }

    #[test]
    fn test_corner_envelope_uses_sample_heights() {
        let envelope = grid_2x2().envelope();
        assert_eq!(envelope.min(), Some(Point3::new(100.0, 200.0, 1.0)));
        assert_eq!(envelope.max(), Some(Point3::new(110.0, 210.0, 4.0)));
    }
}
