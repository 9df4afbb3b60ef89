//! Bounding rectangles and cell-size alignment.
//! All coordinate math uses f64; row 0 is the northern (max_y) edge.

use serde::{Deserialize, Serialize};

use crate::error::{AllocationError, Result};

/// Two coordinates closer than this many cells are treated as the same grid line.
pub const ALIGN_TOLERANCE: f64 = 1e-8;

/// The usual geographic cell sizes in degrees: 10″, 30″, 5′, 10′, 30′, 1°.
pub const GEOGRAPHIC_CELL_SIZES: [f64; 6] = [
    1.0 / 360.0,
    1.0 / 120.0,
    1.0 / 12.0,
    1.0 / 6.0,
    0.5,
    1.0,
];

/// An axis-aligned bounding rectangle `(min_x, min_y, max_x, max_y)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Extent {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Extent {
    /// Build an extent, rejecting non-finite bounds or a non-positive width/height.
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Result<Self> {
        let e = Self { min_x, min_y, max_x, max_y };
        e.validate()?;
        Ok(e)
    }

    pub fn validate(&self) -> Result<()> {
        let finite = [self.min_x, self.min_y, self.max_x, self.max_y]
            .iter()
            .all(|v| v.is_finite());
        if !finite {
            return Err(AllocationError::InvalidGeometry(format!(
                "extent {self:?} has non-finite bounds"
            )));
        }
        if self.width() <= 0.0 || self.height() <= 0.0 {
            return Err(AllocationError::InvalidGeometry(format!(
                "extent {self:?} has non-positive width or height"
            )));
        }
        Ok(())
    }

    #[inline]
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    #[inline]
    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    pub fn nr_cols(&self, cell_size: f64) -> usize {
        (self.width() / cell_size).round().max(0.0) as usize
    }

    pub fn nr_rows(&self, cell_size: f64) -> usize {
        (self.height() / cell_size).round().max(0.0) as usize
    }

    /// Snap the extent outward onto the lattice of `cell_size` multiples.
    /// Bounds already on the lattice (within [`ALIGN_TOLERANCE`] cells) are
    /// kept bit-for-bit, so aligning twice is the same as aligning once.
    pub fn align(&self, cell_size: f64) -> Self {
        Self {
            min_x: snap(self.min_x, cell_size, f64::floor),
            min_y: snap(self.min_y, cell_size, f64::floor),
            max_x: snap(self.max_x, cell_size, f64::ceil),
            max_y: snap(self.max_y, cell_size, f64::ceil),
        }
    }

    /// Compare bounds with an absolute tolerance in coordinate units.
    pub fn approx_eq(&self, other: &Extent, tolerance: f64) -> bool {
        (self.min_x - other.min_x).abs() <= tolerance
            && (self.min_y - other.min_y).abs() <= tolerance
            && (self.max_x - other.max_x).abs() <= tolerance
            && (self.max_y - other.max_y).abs() <= tolerance
    }

    /// Overlapping rectangle, or `None` when the extents only touch or are disjoint.
    pub fn intersection(&self, other: &Extent) -> Option<Extent> {
        let e = Extent {
            min_x: self.min_x.max(other.min_x),
            min_y: self.min_y.max(other.min_y),
            max_x: self.max_x.min(other.max_x),
            max_y: self.max_y.min(other.max_y),
        };
        (e.width() > 0.0 && e.height() > 0.0).then_some(e)
    }

    /// Coordinates of the centre of cell (row, col).
    pub fn cell_center(&self, cell_size: f64, row: usize, col: usize) -> (f64, f64) {
        let x = self.min_x + (col as f64 + 0.5) * cell_size;
        let y = self.max_y - (row as f64 + 0.5) * cell_size;
        (x, y)
    }

    /// Cell (row, col) containing (x, y), or `None` outside the extent.
    pub fn cell_of(&self, cell_size: f64, x: f64, y: f64) -> Option<(usize, usize)> {
        if x < self.min_x || x >= self.max_x || y <= self.min_y || y > self.max_y {
            return None;
        }
        let col = ((x - self.min_x) / cell_size).floor() as usize;
        let row = ((self.max_y - y) / cell_size).floor() as usize;
        Some((row, col))
    }
}

/// Reject zero, negative or non-finite cell sizes.
pub fn check_cell_size(cell_size: f64) -> Result<()> {
    if cell_size.is_finite() && cell_size > 0.0 {
        Ok(())
    } else {
        Err(AllocationError::InvalidGeometry(format!(
            "cell size {cell_size} must be positive and finite"
        )))
    }
}

/// Whether two cell sizes describe the same lattice.
pub fn same_cell_size(a: f64, b: f64) -> bool {
    (a - b).abs() <= ALIGN_TOLERANCE * a.abs().max(b.abs())
}

/// Integer number of `small` cells per `big` cell, tolerating float noise
/// such as `(1/12) / (1/120) = 9.999999999999998`.
pub fn step_factor(big: f64, small: f64) -> usize {
    (big / small + ALIGN_TOLERANCE).floor().max(0.0) as usize
}

fn on_lattice(v: f64, cell_size: f64) -> bool {
    let q = v / cell_size;
    (q - q.round()).abs() < ALIGN_TOLERANCE
}

fn snap(v: f64, cell_size: f64, round: fn(f64) -> f64) -> f64 {
    if on_lattice(v, cell_size) {
        v
    } else {
        round(v / cell_size) * cell_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_rejects_degenerate_extents() {
        assert!(Extent::new(0.0, 0.0, 0.0, 1.0).is_err());
        assert!(Extent::new(0.0, 2.0, 1.0, 1.0).is_err());
        assert!(Extent::new(0.0, 0.0, f64::NAN, 1.0).is_err());
        assert!(Extent::new(0.0, 0.0, 1.0, 1.0).is_ok());
    }

    #[test]
    fn align_snaps_outward() {
        let e = Extent { min_x: 0.3, min_y: -0.7, max_x: 2.2, max_y: 3.9 };
        let a = e.align(0.5);
        assert_eq!(a, Extent { min_x: 0.0, min_y: -1.0, max_x: 2.5, max_y: 4.0 });
    }

    #[test]
    fn align_is_idempotent() {
        let cs = 1.0 / 12.0;
        let e = Extent { min_x: -10.03, min_y: 35.01, max_x: 20.4, max_y: 60.77 };
        let once = e.align(cs);
        let twice = once.align(cs);
        assert_eq!(once, twice);
    }

    #[test]
    fn global_extent_is_aligned_to_geographic_sizes() {
        let w = Extent { min_x: -180.0, min_y: -90.0, max_x: 180.0, max_y: 90.0 };
        for cs in GEOGRAPHIC_CELL_SIZES {
            assert_eq!(w.align(cs), w, "world not aligned at {cs}");
            assert_eq!(w.nr_cols(cs), (360.0 / cs).round() as usize);
        }
    }

    #[test]
    fn intersection_of_disjoint_extents_is_none() {
        let a = Extent { min_x: 0.0, min_y: 0.0, max_x: 1.0, max_y: 1.0 };
        let b = Extent { min_x: 1.0, min_y: 0.0, max_x: 2.0, max_y: 1.0 };
        assert!(a.intersection(&b).is_none());
        let c = Extent { min_x: 0.5, min_y: 0.5, max_x: 2.0, max_y: 2.0 };
        assert_eq!(
            a.intersection(&c),
            Some(Extent { min_x: 0.5, min_y: 0.5, max_x: 1.0, max_y: 1.0 })
        );
    }

    #[test]
    fn cell_center_and_cell_of_agree() {
        let e = Extent { min_x: 10.0, min_y: 20.0, max_x: 16.0, max_y: 24.0 };
        let (x, y) = e.cell_center(1.0, 2, 5);
        assert_eq!((x, y), (15.5, 21.5));
        assert_eq!(e.cell_of(1.0, x, y), Some((2, 5)));
        assert_eq!(e.cell_of(1.0, 9.0, 21.0), None);
    }

    #[test]
    fn step_factor_tolerates_float_noise() {
        assert_eq!(step_factor(1.0 / 12.0, 1.0 / 120.0), 10);
        assert_eq!(step_factor(2.0, 1.0), 2);
        assert_eq!(step_factor(2.5, 1.0), 2);
    }

    #[test]
    fn check_cell_size_rejects_non_positive() {
        assert!(check_cell_size(0.0).is_err());
        assert!(check_cell_size(-1.0).is_err());
        assert!(check_cell_size(f64::INFINITY).is_err());
        assert!(check_cell_size(0.25).is_ok());
    }
}
