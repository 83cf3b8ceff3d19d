use crate::{diameter, CloudmaskError, Diameters, Point, C};
use log::debug;
use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::Path,
};

/// A two-level cloud mask in row-major order.
///
/// The image → mask step (loading, thresholding) belongs to whatever
/// detector ran upstream; this type only carries its output.
#[derive(Clone, Debug)]
pub struct Mask {
    width: usize,
    height: usize,
    cells: Box<[bool]>,
}

impl Mask {
    /// Returns a mask over `cells`, which must hold `width * height`
    /// row-major entries.
    pub fn from_cells(width: usize, height: usize, cells: Vec<bool>) -> Result<Self, CloudmaskError> {
        if cells.len() != width * height {
            return Err(CloudmaskError::Dimensions {
                width,
                height,
                len: cells.len(),
            });
        }
        Ok(Self {
            width,
            height,
            cells: cells.into_boxed_slice(),
        })
    }

    /// Returns a mask read from the plain-text grid file at `path`: one row
    /// per line, `0`/`1` per cell, optional single spaces between cells.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, CloudmaskError> {
        Self::read(BufReader::new(File::open(path)?))
    }

    /// Like [`Mask::load`], but from any buffered reader.
    pub fn read<R: BufRead>(reader: R) -> Result<Self, CloudmaskError> {
        let mut width = 0;
        let mut height = 0;
        let mut cells = Vec::new();
        for (line_idx, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let row_start = cells.len();
            for cell in line.chars() {
                match cell {
                    '0' => cells.push(false),
                    '1' => cells.push(true),
                    ' ' => (),
                    other => {
                        return Err(CloudmaskError::Cell {
                            line: line_idx + 1,
                            cell: other,
                        })
                    }
                }
            }
            let row_len = cells.len() - row_start;
            if height == 0 {
                width = row_len;
            } else if row_len != width {
                return Err(CloudmaskError::RaggedRow {
                    line: line_idx + 1,
                    expected: width,
                    actual: row_len,
                });
            }
            height += 1;
        }
        Self::from_cells(width, height, cells)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Number of set cells.
    pub fn area_px(&self) -> usize {
        self.cells.iter().filter(|cell| **cell).count()
    }

    fn get(&self, x: isize, y: isize) -> bool {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return false;
        }
        self.cells[y as usize * self.width + x as usize]
    }
}

/// Geometry derived from one mask: the inputs the diameter resolver and the
/// MER pipeline need, still in pixel units.
#[derive(Clone, Debug)]
pub struct GeometrySample {
    /// Unweighted center of mass of the set cells.
    pub centroid: Point,

    /// Set cells with at least one unset (or out-of-bounds) 4-neighbor, in
    /// row-major scan order.
    pub boundary: Vec<Point>,

    /// Set-cell count.
    pub area_px: usize,
}

impl GeometrySample {
    /// Extracts centroid, boundary, and area from `mask`.
    ///
    /// # Errors
    ///
    /// Fails with [`CloudmaskError::EmptyMask`] when no cell is set.
    pub fn from_mask(mask: &Mask) -> Result<Self, CloudmaskError> {
        let mut area_px = 0;
        let mut sum_x = 0.0;
        let mut sum_y = 0.0;
        let mut boundary = Vec::new();

        for y in 0..mask.height as isize {
            for x in 0..mask.width as isize {
                if !mask.get(x, y) {
                    continue;
                }
                area_px += 1;
                sum_x += x as C;
                sum_y += y as C;
                let interior = mask.get(x - 1, y)
                    && mask.get(x + 1, y)
                    && mask.get(x, y - 1)
                    && mask.get(x, y + 1);
                if !interior {
                    boundary.push(Point {
                        x: x as C,
                        y: y as C,
                    });
                }
            }
        }

        if area_px == 0 {
            return Err(CloudmaskError::EmptyMask);
        }

        let centroid = Point {
            x: sum_x / area_px as C,
            y: sum_y / area_px as C,
        };
        debug!(
            "geometry sample; area_px: {area_px}, boundary: {}, centroid: ({:.2}, {:.2})",
            boundary.len(),
            centroid.x,
            centroid.y
        );

        Ok(Self {
            centroid,
            boundary,
            area_px,
        })
    }

    /// Footprint area in km² for the given km-per-pixel scale.
    pub fn area_km2(&self, km_per_pixel: C) -> C {
        self.area_px as C * km_per_pixel * km_per_pixel
    }

    /// Orthogonal footprint diameters in km for the given km-per-pixel
    /// scale.
    pub fn diameters(&self, km_per_pixel: C) -> Result<Diameters, CloudmaskError> {
        diameter::resolve_diameters(&self.boundary, self.centroid, km_per_pixel)
    }
}
