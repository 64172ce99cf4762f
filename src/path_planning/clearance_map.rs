//! Occupancy grid and clearance field
//!
//! Cells are addressed as `(ix, iy)`; `ix` runs along x from the grid origin
//! (the lower-left corner), `iy` along y.

use log::debug;
use nalgebra::DMatrix;

use crate::common::{PlannerError, PlanningResult, Point2D};

/// Cells holding more than this are treated as occupied
pub const OCCUPIED_THRESHOLD: f64 = 0.01;

#[derive(Debug, Clone, PartialEq)]
pub struct GridMap {
    data: DMatrix<f64>,
    resolution: f64,
    origin: Point2D,
}

impl GridMap {
    /// Empty (all free) grid of `width` x `height` cells.
    pub fn new(width: usize, height: usize, resolution: f64, origin: Point2D) -> PlanningResult<Self> {
        if width == 0 || height == 0 {
            return Err(PlannerError::InvalidParameter(format!(
                "grid must have at least one cell, got {}x{}",
                width, height
            )));
        }
        if !(resolution > 0.0) {
            return Err(PlannerError::InvalidParameter(format!(
                "grid resolution must be positive, got {}",
                resolution
            )));
        }
        Ok(Self {
            data: DMatrix::zeros(width, height),
            resolution,
            origin,
        })
    }

    /// Grid with every cell whose center lies within `radius` of an obstacle
    /// point marked occupied.
    pub fn from_obstacles(
        width: usize,
        height: usize,
        resolution: f64,
        origin: Point2D,
        obstacles: &[Point2D],
        radius: f64,
    ) -> PlanningResult<Self> {
        let mut map = Self::new(width, height, resolution, origin)?;
        for ix in 0..width {
            for iy in 0..height {
                let center = map.cell_center(ix, iy);
                if obstacles.iter().any(|o| o.distance(&center) <= radius) {
                    map.data[(ix, iy)] = 1.0;
                }
            }
        }
        Ok(map)
    }

    pub fn width(&self) -> usize {
        self.data.nrows()
    }

    pub fn height(&self) -> usize {
        self.data.ncols()
    }

    pub fn resolution(&self) -> f64 {
        self.resolution
    }

    pub fn origin(&self) -> Point2D {
        self.origin
    }

    pub fn data(&self) -> &DMatrix<f64> {
        &self.data
    }

    /// Cell containing `point`, if it lies on the grid.
    pub fn cell_index(&self, point: &Point2D) -> Option<(usize, usize)> {
        let fx = ((point.x - self.origin.x) / self.resolution).floor();
        let fy = ((point.y - self.origin.y) / self.resolution).floor();
        if !fx.is_finite() || !fy.is_finite() || fx < 0.0 || fy < 0.0 {
            return None;
        }
        let (ix, iy) = (fx as usize, fy as usize);
        if ix < self.width() && iy < self.height() {
            Some((ix, iy))
        } else {
            None
        }
    }

    pub fn cell_center(&self, ix: usize, iy: usize) -> Point2D {
        Point2D::new(
            self.origin.x + (ix as f64 + 0.5) * self.resolution,
            self.origin.y + (iy as f64 + 0.5) * self.resolution,
        )
    }

    pub fn get(&self, ix: usize, iy: usize) -> Option<f64> {
        self.data.get((ix, iy)).copied()
    }

    pub fn set(&mut self, ix: usize, iy: usize, value: f64) -> PlanningResult<()> {
        match self.data.get_mut((ix, iy)) {
            Some(cell) => {
                *cell = value;
                Ok(())
            }
            None => Err(PlannerError::InvalidInput(format!(
                "cell ({}, {}) outside {}x{} grid",
                ix,
                iy,
                self.width(),
                self.height()
            ))),
        }
    }

    /// Value of the cell containing `point`.
    pub fn value_at(&self, point: &Point2D) -> Option<f64> {
        self.cell_index(point).and_then(|(ix, iy)| self.get(ix, iy))
    }

    pub fn is_occupied(&self, ix: usize, iy: usize) -> bool {
        self.get(ix, iy).map_or(false, |v| v > OCCUPIED_THRESHOLD)
    }

    pub fn has_obstacles(&self) -> bool {
        self.data.iter().any(|&v| v > OCCUPIED_THRESHOLD)
    }

    /// Clearance field in metres: distance from every cell to the nearest
    /// occupied cell, 0 on occupied cells.
    ///
    /// A grid without any occupied cell yields a uniform field of one cell.
    pub fn clearance_map(&self) -> GridMap {
        let cells = if self.has_obstacles() {
            let seed = self
                .data
                .map(|v| if v > OCCUPIED_THRESHOLD { 0.0 } else { f64::INFINITY });
            squared_distance_transform(&seed).map(f64::sqrt)
        } else {
            debug!("no occupied cell; using a uniform clearance field");
            DMatrix::from_element(self.width(), self.height(), 1.0)
        };
        GridMap {
            data: cells * self.resolution,
            resolution: self.resolution,
            origin: self.origin,
        }
    }
}

/// Exact squared Euclidean distance transform, one pass per axis.
fn squared_distance_transform(seed: &DMatrix<f64>) -> DMatrix<f64> {
    let mut out = seed.clone();
    for ix in 0..out.nrows() {
        let row: Vec<f64> = out.row(ix).iter().copied().collect();
        for (iy, v) in distance_transform_1d(&row).into_iter().enumerate() {
            out[(ix, iy)] = v;
        }
    }
    for iy in 0..out.ncols() {
        let column: Vec<f64> = out.column(iy).iter().copied().collect();
        for (ix, v) in distance_transform_1d(&column).into_iter().enumerate() {
            out[(ix, iy)] = v;
        }
    }
    out
}

/// Lower envelope of the parabolas `(q - p)^2 + f[p]`; infinite samples
/// contribute no parabola.
fn distance_transform_1d(f: &[f64]) -> Vec<f64> {
    let n = f.len();
    let mut d = vec![f64::INFINITY; n];
    // parabola apexes and the left boundary of each one's interval
    let mut apexes: Vec<usize> = Vec::with_capacity(n);
    let mut bounds: Vec<f64> = Vec::with_capacity(n);

    for q in (0..n).filter(|&q| f[q].is_finite()) {
        let mut s = f64::NEG_INFINITY;
        while let (Some(&p), Some(&bound)) = (apexes.last(), bounds.last()) {
            s = ((f[q] + (q * q) as f64) - (f[p] + (p * p) as f64)) / (2.0 * (q as f64 - p as f64));
            if s <= bound {
                apexes.pop();
                bounds.pop();
                s = f64::NEG_INFINITY;
            } else {
                break;
            }
        }
        apexes.push(q);
        bounds.push(s);
    }

    if apexes.is_empty() {
        return d;
    }
    let mut k = 0;
    for (q, out) in d.iter_mut().enumerate() {
        while k + 1 < apexes.len() && bounds[k + 1] < q as f64 {
            k += 1;
        }
        let p = apexes[k];
        *out = (q as f64 - p as f64).powi(2) + f[p];
    }
    d
}
