//! Extent changes at a fixed cell size: crop, pad and shift.

use crate::error::Result;
use crate::extent::{same_cell_size, Extent};
use crate::grid::Grid;
use crate::resample::{resample, ResampleMode};
use crate::scalar::Scalar;

/// Move `source` onto `to_extent` (snapped outward to the source cell size).
/// Cells outside the source are nodata; a target that does not overlap the
/// source at all yields an all-nodata grid.
pub fn resize<T: Scalar>(source: &Grid<T>, to_extent: &Extent) -> Result<Grid<T>> {
    resize_with_nodata(source, to_extent, source.nodata())
}

/// As [`resize`], writing `nodata` as the sentinel of the result.
pub fn resize_with_nodata<T: Scalar>(source: &Grid<T>, to_extent: &Extent, nodata: T) -> Result<Grid<T>> {
    to_extent.validate()?;
    let cs = source.cell_size();
    let target = to_extent.align(cs);
    let src = source.extent();

    if target.approx_eq(src, cs * 0.1) {
        return Ok(source.with_nodata(nodata));
    }

    let mut out = Grid::create_empty(target, cs, nodata)?;
    let Some(overlap) = src.intersection(&target) else {
        tracing::debug!(
            target: "landalloc::resize",
            from = ?src,
            to = ?target,
            "resize.no_overlap"
        );
        return Ok(out);
    };

    let offset = |from: f64, to: f64| ((to - from) / cs).round().max(0.0) as usize;
    let src_row0 = offset(overlap.max_y, src.max_y);
    let src_col0 = offset(src.min_x, overlap.min_x);
    let dst_row0 = offset(overlap.max_y, target.max_y);
    let dst_col0 = offset(target.min_x, overlap.min_x);

    let rows = overlap
        .nr_rows(cs)
        .min(source.nr_rows().saturating_sub(src_row0))
        .min(out.nr_rows().saturating_sub(dst_row0));
    let cols = overlap
        .nr_cols(cs)
        .min(source.nr_cols().saturating_sub(src_col0))
        .min(out.nr_cols().saturating_sub(dst_col0));

    let (src_stride, dst_stride) = (source.nr_cols(), out.nr_cols());
    let src_nodata = source.nodata();
    let src_data = source.data();
    let dst_data = out.data_mut();
    for r in 0..rows {
        let s0 = (src_row0 + r) * src_stride + src_col0;
        let d0 = (dst_row0 + r) * dst_stride + dst_col0;
        for (d, &v) in dst_data[d0..d0 + cols].iter_mut().zip(&src_data[s0..s0 + cols]) {
            *d = if v.is_nodata(src_nodata) { nodata } else { v };
        }
    }
    Ok(out)
}

/// Bring `grid` onto the working lattice: resample to `cell_size`, then
/// resize to `extent`. Nodata cells are skipped while aggregating.
/// A grid already at `cell_size` is resized directly, so at most one new
/// buffer is allocated.
pub fn conform<T: Scalar>(grid: &Grid<T>, cell_size: f64, extent: &Extent, mode: ResampleMode) -> Result<Grid<T>> {
    if same_cell_size(grid.cell_size(), cell_size) {
        return resize(grid, extent);
    }
    let resampled = resample(grid, cell_size, mode, true)?;
    resize(&resampled, extent)
}

/// As [`conform`], consuming `grid`. A grid already on the lattice is
/// returned as is, without copying.
pub fn conform_owned<T: Scalar>(grid: Grid<T>, cell_size: f64, extent: &Extent, mode: ResampleMode) -> Result<Grid<T>> {
    extent.validate()?;
    if same_cell_size(grid.cell_size(), cell_size) && extent.align(cell_size).approx_eq(grid.extent(), cell_size * 0.1) {
        return Ok(grid);
    }
    conform(&grid, cell_size, extent, mode)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbered(cols: usize, rows: usize) -> Grid<i32> {
        let e = Extent::new(0.0, 0.0, cols as f64, rows as f64).unwrap();
        Grid::from_vec(e, 1.0, -1, (0..(cols * rows) as i32).collect()).unwrap()
    }

    #[test]
    fn resize_to_own_extent_is_identity() {
        let g = numbered(5, 3);
        assert_eq!(resize(&g, g.extent()).unwrap(), g);
    }

    #[test]
    fn crop_keeps_overlapping_values() {
        let g = numbered(4, 4);
        // Rows 1..3 (from the top) and cols 1..3.
        let out = resize(&g, &Extent::new(1.0, 1.0, 3.0, 3.0).unwrap()).unwrap();
        assert_eq!((out.nr_rows(), out.nr_cols()), (2, 2));
        assert_eq!(out.data(), &[5, 6, 9, 10]);
    }

    #[test]
    fn pad_fills_new_cells_with_nodata() {
        let g = numbered(2, 2);
        let out = resize(&g, &Extent::new(-1.0, 0.0, 2.0, 3.0).unwrap()).unwrap();
        assert_eq!((out.nr_rows(), out.nr_cols()), (3, 3));
        assert_eq!(out.data(), &[-1, -1, -1, -1, 0, 1, -1, 2, 3]);
    }

    #[test]
    fn shifted_target_copies_partial_overlap() {
        let g = numbered(3, 1);
        let out = resize(&g, &Extent::new(1.0, 0.0, 4.0, 1.0).unwrap()).unwrap();
        assert_eq!(out.data(), &[1, 2, -1]);
    }

    #[test]
    fn disjoint_target_is_all_nodata() {
        let g = numbered(2, 2);
        let out = resize(&g, &Extent::new(10.0, 10.0, 12.0, 11.0).unwrap()).unwrap();
        assert_eq!((out.nr_rows(), out.nr_cols()), (1, 2));
        assert!(out.data().iter().all(|&v| v == -1));
    }

    #[test]
    fn target_extent_is_snapped_outward() {
        let g = numbered(4, 4);
        let out = resize(&g, &Extent::new(0.4, 0.2, 1.6, 1.9).unwrap()).unwrap();
        assert_eq!(out.extent(), &Extent::new(0.0, 0.0, 2.0, 2.0).unwrap());
        assert_eq!(out.data(), &[8, 9, 12, 13]);
    }

    #[test]
    fn resize_with_nodata_restamps_copied_nodata() {
        let e = Extent::new(0.0, 0.0, 2.0, 1.0).unwrap();
        let g = Grid::from_vec(e, 1.0, -1i32, vec![-1, 4]).unwrap();
        let out = resize_with_nodata(&g, &Extent::new(0.0, 0.0, 3.0, 1.0).unwrap(), -99).unwrap();
        assert_eq!(out.data(), &[-99, 4, -99]);
    }

    #[test]
    fn conform_on_lattice_only_resizes() {
        let g = numbered(3, 2);
        let target = Extent::new(0.0, 0.0, 4.0, 2.0).unwrap();
        // Same cell size: no aggregation, only padding.
        let out = conform(&g, 1.0, &target, ResampleMode::Sum).unwrap();
        assert_eq!(out.data(), &[0, 1, 2, -1, 3, 4, 5, -1]);
    }

    #[test]
    fn conform_owned_returns_grid_already_on_lattice() {
        let g = numbered(3, 2);
        let ptr = g.data().as_ptr();
        let out = conform_owned(g, 1.0, &Extent::new(0.0, 0.0, 3.0, 2.0).unwrap(), ResampleMode::Mean).unwrap();
        assert_eq!(out.data().as_ptr(), ptr, "buffer should be reused, not copied");
        assert_eq!(out.data(), &[0, 1, 2, 3, 4, 5]);

        let shifted = conform_owned(out, 1.0, &Extent::new(1.0, 0.0, 3.0, 2.0).unwrap(), ResampleMode::Mean).unwrap();
        assert_eq!(shifted.data(), &[1, 2, 4, 5]);
    }

    #[test]
    fn conform_resamples_then_resizes() {
        let e = Extent::new(0.0, 0.0, 4.0, 4.0).unwrap();
        let g = Grid::from_vec(e, 1.0, -1.0f64, vec![1.0; 16]).unwrap();
        let target = Extent::new(0.0, 0.0, 6.0, 4.0).unwrap();
        let out = conform(&g, 2.0, &target, ResampleMode::Sum).unwrap();
        assert_eq!((out.nr_rows(), out.nr_cols()), (2, 3));
        assert_eq!(out.data(), &[4.0, 4.0, -1.0, 4.0, 4.0, -1.0]);
    }
}
