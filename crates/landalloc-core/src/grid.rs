use serde::{Deserialize, Serialize};

use crate::error::{AllocationError, Result};
use crate::extent::{check_cell_size, Extent};
use crate::mask::Mask;
use crate::scalar::{DataType, Scalar};

/// A 2D raster of one scalar kind, row-major, north-up.
///
/// The shape (`nr_rows × nr_cols`) is fixed at construction and always
/// matches the extent and cell size; only cell contents can change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    into = "RawGrid<T>",
    try_from = "RawGrid<T>",
    bound(
        serialize = "T: Scalar + Serialize",
        deserialize = "T: Scalar + Deserialize<'de>"
    )
)]
pub struct Grid<T: Scalar> {
    extent: Extent,
    cell_size: f64,
    nr_rows: usize,
    nr_cols: usize,
    nodata: T,
    data: Vec<T>,
}

/// Serialised form; the shape is re-derived and checked on load.
#[derive(Serialize, Deserialize)]
struct RawGrid<T> {
    extent: Extent,
    cell_size: f64,
    nodata: T,
    data: Vec<T>,
}

impl<T: Scalar> From<Grid<T>> for RawGrid<T> {
    fn from(g: Grid<T>) -> Self {
        Self { extent: g.extent, cell_size: g.cell_size, nodata: g.nodata, data: g.data }
    }
}

impl<T: Scalar> TryFrom<RawGrid<T>> for Grid<T> {
    type Error = AllocationError;

    fn try_from(raw: RawGrid<T>) -> Result<Self> {
        Grid::from_vec(raw.extent, raw.cell_size, raw.nodata, raw.data)
    }
}

fn shape_for(extent: &Extent, cell_size: f64) -> Result<(usize, usize)> {
    check_cell_size(cell_size)?;
    extent.validate()?;
    let (nr_rows, nr_cols) = (extent.nr_rows(cell_size), extent.nr_cols(cell_size));
    if nr_rows == 0 || nr_cols == 0 {
        return Err(AllocationError::InvalidGeometry(format!(
            "extent {extent:?} is smaller than one cell of size {cell_size}"
        )));
    }
    Ok((nr_rows, nr_cols))
}

impl<T: Scalar> Grid<T> {
    /// Allocate a grid with every cell set to `nodata`.
    pub fn create_empty(extent: Extent, cell_size: f64, nodata: T) -> Result<Self> {
        Self::filled(extent, cell_size, nodata, nodata)
    }

    /// Allocate a grid with every cell set to `value`.
    pub fn filled(extent: Extent, cell_size: f64, nodata: T, value: T) -> Result<Self> {
        let (nr_rows, nr_cols) = shape_for(&extent, cell_size)?;
        Ok(Self {
            extent,
            cell_size,
            nr_rows,
            nr_cols,
            nodata,
            data: vec![value; nr_rows * nr_cols],
        })
    }

    /// Wrap an existing row-major buffer; its length must match the extent.
    pub fn from_vec(extent: Extent, cell_size: f64, nodata: T, data: Vec<T>) -> Result<Self> {
        let (nr_rows, nr_cols) = shape_for(&extent, cell_size)?;
        if data.len() != nr_rows * nr_cols {
            return Err(AllocationError::ShapeMismatch {
                what: "grid buffer",
                expected: format!("{nr_rows}x{nr_cols} = {} cells", nr_rows * nr_cols),
                actual: format!("{} cells", data.len()),
            });
        }
        Ok(Self { extent, cell_size, nr_rows, nr_cols, nodata, data })
    }

    #[inline]
    pub fn extent(&self) -> &Extent {
        &self.extent
    }

    #[inline]
    pub fn cell_size(&self) -> f64 {
        self.cell_size
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
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    pub fn nodata(&self) -> T {
        self.nodata
    }

    pub fn data_type(&self) -> DataType {
        T::DATA_TYPE
    }

    #[inline]
    pub fn data(&self) -> &[T] {
        &self.data
    }

    /// Mutable cell access; the buffer length cannot change through a slice.
    #[inline]
    pub fn data_mut(&mut self) -> &mut [T] {
        &mut self.data
    }

    #[inline]
    pub fn is_nodata(&self, value: T) -> bool {
        value.is_nodata(self.nodata)
    }

    #[inline]
    fn index(&self, row: usize, col: usize) -> Result<usize> {
        if row >= self.nr_rows || col >= self.nr_cols {
            return Err(AllocationError::IndexOutOfRange {
                row,
                col,
                nr_rows: self.nr_rows,
                nr_cols: self.nr_cols,
            });
        }
        Ok(row * self.nr_cols + col)
    }

    pub fn get(&self, row: usize, col: usize) -> Result<T> {
        Ok(self.data[self.index(row, col)?])
    }

    pub fn set(&mut self, row: usize, col: usize, value: T) -> Result<()> {
        let i = self.index(row, col)?;
        self.data[i] = value;
        Ok(())
    }

    /// Per-cell "holds data" selection.
    pub fn data_mask(&self) -> Mask {
        let cells = self.data.iter().map(|&v| !v.is_nodata(self.nodata)).collect();
        Mask::from_parts(self.nr_rows, self.nr_cols, cells)
    }

    /// Cells equal to `value`. Equality with the nodata sentinel selects nothing.
    pub fn equal_mask(&self, value: T) -> Mask {
        let cells = self
            .data
            .iter()
            .map(|&v| v == value && !v.is_nodata(self.nodata))
            .collect();
        Mask::from_parts(self.nr_rows, self.nr_cols, cells)
    }

    /// Set every cell, or only the cells selected by `mask`, to `value`.
    pub fn fill(&mut self, value: T, mask: Option<&Mask>) -> Result<()> {
        match mask {
            None => self.data.fill(value),
            Some(m) => {
                m.check_shape(self.nr_rows, self.nr_cols)?;
                for (v, &sel) in self.data.iter_mut().zip(m.as_slice()) {
                    if sel {
                        *v = value;
                    }
                }
            }
        }
        Ok(())
    }

    /// Copy with a different nodata sentinel; old nodata cells carry the new one.
    pub fn with_nodata(&self, nodata: T) -> Self {
        let old = self.nodata;
        let data = self
            .data
            .iter()
            .map(|&v| if v.is_nodata(old) { nodata } else { v })
            .collect();
        Self { nodata, data, ..self.clone_shape() }
    }

    /// Convert to another scalar kind. Nodata maps to `nodata`; any data value
    /// the target kind cannot hold is an [`AllocationError::Overflow`].
    pub fn cast<U: Scalar>(&self, nodata: U) -> Result<Grid<U>> {
        let mut data = Vec::with_capacity(self.data.len());
        for &v in &self.data {
            if v.is_nodata(self.nodata) {
                data.push(nodata);
                continue;
            }
            let x = v.to_f64();
            let converted = U::from_f64(x).ok_or(AllocationError::Overflow {
                value: x,
                data_type: U::DATA_TYPE,
            })?;
            data.push(converted);
        }
        Ok(Grid {
            extent: self.extent,
            cell_size: self.cell_size,
            nr_rows: self.nr_rows,
            nr_cols: self.nr_cols,
            nodata,
            data,
        })
    }

    /// Cell values selected by `mask`, in row-major order.
    pub fn values_where(&self, mask: &Mask) -> Result<Vec<T>> {
        mask.check_shape(self.nr_rows, self.nr_cols)?;
        Ok(mask.indices().map(|i| self.data[i]).collect())
    }

    /// Sorted distinct data values.
    pub fn unique_values(&self) -> Vec<T> {
        let mut values: Vec<T> = self
            .data
            .iter()
            .copied()
            .filter(|v| !v.is_nodata(self.nodata))
            .collect();
        values.sort_unstable_by(|a, b| a.total_cmp(b));
        values.dedup_by(|a, b| a.total_cmp(b).is_eq());
        values
    }

    /// Sum of data cells in f64.
    pub fn sum(&self) -> f64 {
        self.data
            .iter()
            .filter(|v| !v.is_nodata(self.nodata))
            .map(|v| v.to_f64())
            .sum()
    }

    /// Whether `other` covers the same cells (extent within a tenth of a cell).
    pub fn same_geometry<U: Scalar>(&self, other: &Grid<U>) -> bool {
        self.nr_rows == other.nr_rows
            && self.nr_cols == other.nr_cols
            && self.extent.approx_eq(&other.extent, self.cell_size * 0.1)
    }

    pub fn check_same_geometry<U: Scalar>(&self, other: &Grid<U>, what: &'static str) -> Result<()> {
        if self.same_geometry(other) {
            return Ok(());
        }
        Err(AllocationError::ShapeMismatch {
            what,
            expected: format!("{}x{} over {:?}", self.nr_rows, self.nr_cols, self.extent),
            actual: format!("{}x{} over {:?}", other.nr_rows, other.nr_cols, other.extent),
        })
    }

    fn clone_shape(&self) -> Self {
        Self {
            extent: self.extent,
            cell_size: self.cell_size,
            nr_rows: self.nr_rows,
            nr_cols: self.nr_cols,
            nodata: self.nodata,
            data: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extent(cols: f64, rows: f64) -> Extent {
        Extent::new(0.0, 0.0, cols, rows).unwrap()
    }

    #[test]
    fn create_empty_rejects_bad_geometry() {
        assert!(matches!(
            Grid::<f32>::create_empty(extent(4.0, 4.0), 0.0, -1.0),
            Err(AllocationError::InvalidGeometry(_))
        ));
        assert!(matches!(
            Grid::<f32>::create_empty(extent(4.0, 4.0), -1.0, -1.0),
            Err(AllocationError::InvalidGeometry(_))
        ));
        let degenerate = Extent { min_x: 0.0, min_y: 0.0, max_x: 0.0, max_y: 4.0 };
        assert!(matches!(
            Grid::<f32>::create_empty(degenerate, 1.0, -1.0),
            Err(AllocationError::InvalidGeometry(_))
        ));
    }

    #[test]
    fn create_empty_derives_shape_and_fills_with_nodata() {
        let g = Grid::<u8>::create_empty(extent(6.0, 4.0), 1.0, 255).unwrap();
        assert_eq!((g.nr_rows(), g.nr_cols()), (4, 6));
        assert_eq!(g.len(), 24);
        assert!(g.data().iter().all(|&v| v == 255));
        assert_eq!(g.data_type(), DataType::U8);
        assert_eq!(g.data_mask().count(), 0);
    }

    #[test]
    fn from_vec_checks_buffer_length() {
        let err = Grid::<i32>::from_vec(extent(2.0, 2.0), 1.0, -1, vec![0; 3]).unwrap_err();
        assert!(matches!(err, AllocationError::ShapeMismatch { .. }));
    }

    #[test]
    fn get_set_are_bounds_checked() {
        let mut g = Grid::<f64>::create_empty(extent(3.0, 2.0), 1.0, -9999.0).unwrap();
        g.set(1, 2, 4.5).unwrap();
        assert_eq!(g.get(1, 2).unwrap(), 4.5);
        assert_eq!(
            g.get(2, 0),
            Err(AllocationError::IndexOutOfRange { row: 2, col: 0, nr_rows: 2, nr_cols: 3 })
        );
        assert!(g.set(0, 3, 1.0).is_err());
    }

    #[test]
    fn fill_with_mask_touches_only_selected_cells() {
        let mut g = Grid::<i16>::filled(extent(2.0, 2.0), 1.0, -1, 0).unwrap();
        let m = Mask::from_vec(2, 2, vec![true, false, false, true]).unwrap();
        g.fill(7, Some(&m)).unwrap();
        assert_eq!(g.data(), &[7, 0, 0, 7]);
        g.fill(3, None).unwrap();
        assert_eq!(g.data(), &[3, 3, 3, 3]);
        assert!(g.fill(1, Some(&Mask::new(1, 4, true))).is_err());
    }

    #[test]
    fn data_mask_excludes_nodata() {
        let g = Grid::from_vec(extent(2.0, 2.0), 1.0, -1.0f32, vec![1.0, -1.0, 0.0, -1.0]).unwrap();
        assert_eq!(g.data_mask().as_slice(), &[true, false, true, false]);
    }

    #[test]
    fn with_nodata_restamps_sentinel() {
        let g = Grid::from_vec(extent(3.0, 1.0), 1.0, 0u8, vec![0, 5, 0]).unwrap();
        let h = g.with_nodata(255);
        assert_eq!(h.nodata(), 255);
        assert_eq!(h.data(), &[255, 5, 255]);
    }

    #[test]
    fn cast_maps_nodata_and_reports_overflow() {
        let g = Grid::from_vec(extent(3.0, 1.0), 1.0, -1.0f64, vec![-1.0, 2.4, 300.0]).unwrap();
        assert!(matches!(g.cast::<u8>(255), Err(AllocationError::Overflow { .. })));
        let g = Grid::from_vec(extent(3.0, 1.0), 1.0, -1.0f64, vec![-1.0, 2.4, 200.0]).unwrap();
        let c = g.cast::<u8>(255).unwrap();
        assert_eq!(c.data(), &[255, 2, 200]);
    }

    #[test]
    fn unique_values_are_sorted_without_nodata() {
        let g = Grid::from_vec(extent(5.0, 1.0), 1.0, 0i32, vec![3, 0, 1, 3, 2]).unwrap();
        assert_eq!(g.unique_values(), vec![1, 2, 3]);
        assert_eq!(g.sum(), 9.0);
    }

    #[test]
    fn values_where_follows_mask_order() {
        let g = Grid::from_vec(extent(4.0, 1.0), 1.0, 0u16, vec![4, 5, 6, 7]).unwrap();
        let m = Mask::from_vec(1, 4, vec![false, true, false, true]).unwrap();
        assert_eq!(g.values_where(&m).unwrap(), vec![5, 7]);
        assert!(g.values_where(&Mask::new(2, 2, true)).is_err());
    }

    #[test]
    fn serde_round_trip_rejects_inconsistent_buffer() {
        let g = Grid::from_vec(extent(2.0, 1.0), 1.0, -1.0f32, vec![0.5, 1.5]).unwrap();
        let json = serde_json::to_string(&g).unwrap();
        let back: Grid<f32> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, g);

        let bad = r#"{"extent":{"min_x":0,"min_y":0,"max_x":2,"max_y":1},"cell_size":1,"nodata":-1,"data":[1]}"#;
        assert!(serde_json::from_str::<Grid<f32>>(bad).is_err());
    }
}
