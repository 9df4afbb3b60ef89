//! Boolean cell selection with the same row-major layout as a grid.

use serde::{Deserialize, Serialize};

use crate::error::{AllocationError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mask {
    nr_rows: usize,
    nr_cols: usize,
    cells: Vec<bool>,
}

impl Mask {
    pub fn new(nr_rows: usize, nr_cols: usize, value: bool) -> Self {
        Self { nr_rows, nr_cols, cells: vec![value; nr_rows * nr_cols] }
    }

    pub fn from_vec(nr_rows: usize, nr_cols: usize, cells: Vec<bool>) -> Result<Self> {
        if cells.len() != nr_rows * nr_cols {
            return Err(AllocationError::ShapeMismatch {
                what: "mask buffer",
                expected: format!("{} cells", nr_rows * nr_cols),
                actual: format!("{} cells", cells.len()),
            });
        }
        Ok(Self { nr_rows, nr_cols, cells })
    }

    /// Caller guarantees `cells.len() == nr_rows * nr_cols`.
    pub(crate) fn from_parts(nr_rows: usize, nr_cols: usize, cells: Vec<bool>) -> Self {
        debug_assert_eq!(cells.len(), nr_rows * nr_cols);
        Self { nr_rows, nr_cols, cells }
    }

    #[inline]
    pub fn nr_rows(&self) -> usize {
        self.nr_rows
    }

    #[inline]
    pub fn nr_cols(&self) -> usize {
        self.nr_cols
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    #[inline]
    pub fn is_set(&self, idx: usize) -> bool {
        self.cells[idx]
    }

    #[inline]
    pub fn set(&mut self, idx: usize, value: bool) {
        self.cells[idx] = value;
    }

    pub fn get(&self, row: usize, col: usize) -> Result<bool> {
        if row >= self.nr_rows || col >= self.nr_cols {
            return Err(AllocationError::IndexOutOfRange {
                row,
                col,
                nr_rows: self.nr_rows,
                nr_cols: self.nr_cols,
            });
        }
        Ok(self.cells[row * self.nr_cols + col])
    }

    pub fn as_slice(&self) -> &[bool] {
        &self.cells
    }

    /// Number of selected cells.
    pub fn count(&self) -> usize {
        self.cells.iter().filter(|&&c| c).count()
    }

    /// Row-major indices of the selected cells, ascending.
    pub fn indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.cells.iter().enumerate().filter(|(_, &c)| c).map(|(i, _)| i)
    }

    pub fn check_shape(&self, nr_rows: usize, nr_cols: usize) -> Result<()> {
        if self.nr_rows != nr_rows || self.nr_cols != nr_cols {
            return Err(AllocationError::ShapeMismatch {
                what: "mask",
                expected: format!("{nr_rows}x{nr_cols}"),
                actual: format!("{}x{}", self.nr_rows, self.nr_cols),
            });
        }
        Ok(())
    }

    pub fn and(&self, other: &Mask) -> Result<Mask> {
        other.check_shape(self.nr_rows, self.nr_cols)?;
        let cells = self.cells.iter().zip(&other.cells).map(|(&a, &b)| a && b).collect();
        Ok(Mask { nr_rows: self.nr_rows, nr_cols: self.nr_cols, cells })
    }

    /// Cells selected here but not in `other`.
    pub fn and_not(&self, other: &Mask) -> Result<Mask> {
        other.check_shape(self.nr_rows, self.nr_cols)?;
        let cells = self.cells.iter().zip(&other.cells).map(|(&a, &b)| a && !b).collect();
        Ok(Mask { nr_rows: self.nr_rows, nr_cols: self.nr_cols, cells })
    }

    pub fn invert(&self) -> Mask {
        Mask {
            nr_rows: self.nr_rows,
            nr_cols: self.nr_cols,
            cells: self.cells.iter().map(|&c| !c).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_vec_rejects_wrong_length() {
        assert!(Mask::from_vec(2, 2, vec![true; 3]).is_err());
        assert!(Mask::from_vec(2, 2, vec![true; 4]).is_ok());
    }

    #[test]
    fn combinators_follow_boolean_logic() {
        let a = Mask::from_vec(1, 4, vec![true, true, false, false]).unwrap();
        let b = Mask::from_vec(1, 4, vec![true, false, true, false]).unwrap();
        assert_eq!(a.and(&b).unwrap().as_slice(), &[true, false, false, false]);
        assert_eq!(a.and_not(&b).unwrap().as_slice(), &[false, true, false, false]);
        assert_eq!(a.invert().as_slice(), &[false, false, true, true]);
    }

    #[test]
    fn combining_masks_of_different_shapes_fails() {
        let a = Mask::new(2, 3, true);
        let b = Mask::new(3, 2, true);
        assert!(matches!(a.and(&b), Err(AllocationError::ShapeMismatch { .. })));
    }

    #[test]
    fn indices_are_ascending_and_counted() {
        let m = Mask::from_vec(2, 3, vec![false, true, false, true, true, false]).unwrap();
        assert_eq!(m.indices().collect::<Vec<_>>(), vec![1, 3, 4]);
        assert_eq!(m.count(), 3);
        assert!(m.get(1, 1).unwrap());
        assert!(m.get(2, 0).is_err());
    }
}
