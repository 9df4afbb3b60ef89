//! Cell-size changes that keep a grid's quantity meaningful.
//!
//! The caller picks the mode from what the grid holds:
//!   * `Replicate` for categories (land use, region codes): majority when
//!     shrinking, copy when growing.
//!   * `Mean` for intensive quantities (suitability, fractions).
//!   * `Sum` for extensive quantities (areas, counts): block sums when
//!     shrinking, value / k² per sub-cell when growing, so totals are kept.
//!
//! Both directions require the two cell sizes to be integer multiples of one
//! another. Shrinking drops trailing rows/columns that do not fill a whole
//! block and recomputes the extent from what is left.

use serde::{Deserialize, Serialize};

use crate::error::{AllocationError, Result};
use crate::extent::{check_cell_size, same_cell_size, step_factor, Extent};
use crate::grid::Grid;
use crate::scalar::Scalar;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResampleMode {
    Replicate,
    Mean,
    Sum,
}

impl ResampleMode {
    pub fn name(self) -> &'static str {
        match self {
            ResampleMode::Replicate => "replicate",
            ResampleMode::Mean => "mean",
            ResampleMode::Sum => "sum",
        }
    }
}

/// Resample `source` to `to_cell_size`, keeping its nodata sentinel.
///
/// The larger cell size must be a whole multiple of the smaller one. A ratio
/// such as 2.5 is not floored to a block of 2 but rejected with
/// [`AllocationError::InvalidGeometry`]; every pair in
/// [`GEOGRAPHIC_CELL_SIZES`](crate::extent::GEOGRAPHIC_CELL_SIZES) qualifies.
///
/// With `skip_nodata == false`, a nodata cell inside a `Mean` or `Sum` block
/// is an [`AllocationError::ResampleNoDataNotAllowed`]. `Replicate` then
/// counts nodata as an ordinary candidate value.
pub fn resample<T: Scalar>(
    source: &Grid<T>,
    to_cell_size: f64,
    mode: ResampleMode,
    skip_nodata: bool,
) -> Result<Grid<T>> {
    resample_with_nodata(source, to_cell_size, mode, skip_nodata, source.nodata())
}

/// As [`resample`], writing `nodata` as the sentinel of the result.
pub fn resample_with_nodata<T: Scalar>(
    source: &Grid<T>,
    to_cell_size: f64,
    mode: ResampleMode,
    skip_nodata: bool,
    nodata: T,
) -> Result<Grid<T>> {
    check_cell_size(to_cell_size)?;
    let from_cell_size = source.cell_size();

    if same_cell_size(from_cell_size, to_cell_size) {
        return Ok(source.with_nodata(nodata));
    }

    if to_cell_size > from_cell_size {
        let k = integer_factor(to_cell_size, from_cell_size)?;
        downsample(source, k, to_cell_size, mode, skip_nodata, nodata)
    } else {
        let k = integer_factor(from_cell_size, to_cell_size)?;
        upsample(source, k, to_cell_size, mode, nodata)
    }
}

/// Cells are square, so the row and column step factors coincide.
fn integer_factor(big: f64, small: f64) -> Result<usize> {
    let k = step_factor(big, small);
    if k < 2 || !same_cell_size(k as f64 * small, big) {
        return Err(AllocationError::InvalidGeometry(format!(
            "cell size {big} is not an integer multiple of {small}"
        )));
    }
    Ok(k)
}

// ── Shrinking ─────────────────────────────────────────────────────────────────

fn downsample<T: Scalar>(
    source: &Grid<T>,
    k: usize,
    to_cell_size: f64,
    mode: ResampleMode,
    skip_nodata: bool,
    nodata: T,
) -> Result<Grid<T>> {
    let (src_rows, src_cols) = (source.nr_rows(), source.nr_cols());
    let out_rows = src_rows / k;
    let out_cols = src_cols / k;
    if out_rows == 0 || out_cols == 0 {
        return Err(AllocationError::InvalidGeometry(format!(
            "{src_rows}x{src_cols} grid is smaller than one {k}x{k} block"
        )));
    }
    if out_rows * k != src_rows || out_cols * k != src_cols {
        tracing::debug!(
            target: "landalloc::resample",
            dropped_rows = src_rows - out_rows * k,
            dropped_cols = src_cols - out_cols * k,
            k,
            "resample.downsample.truncated"
        );
    }

    let src = source.extent();
    let extent = Extent {
        min_x: src.min_x,
        min_y: src.max_y - out_rows as f64 * to_cell_size,
        max_x: src.min_x + out_cols as f64 * to_cell_size,
        max_y: src.max_y,
    };

    let src_data = source.data();
    let src_nodata = source.nodata();
    let mut data = vec![nodata; out_rows * out_cols];

    for_each_row(&mut data, out_cols, |orow, out| {
        let mut block: Vec<T> = Vec::with_capacity(k * k);
        for (ocol, cell) in out.iter_mut().enumerate() {
            block.clear();
            for r in orow * k..(orow + 1) * k {
                let row = &src_data[r * src_cols + ocol * k..r * src_cols + (ocol + 1) * k];
                for (dc, &v) in row.iter().enumerate() {
                    if v.is_nodata(src_nodata) {
                        if skip_nodata {
                            continue;
                        }
                        if mode != ResampleMode::Replicate {
                            return Err(AllocationError::ResampleNoDataNotAllowed {
                                mode: mode.name(),
                                row: r,
                                col: ocol * k + dc,
                            });
                        }
                    }
                    block.push(v);
                }
            }
            *cell = aggregate(mode, &mut block, src_nodata, nodata)?;
        }
        Ok(())
    })?;

    Grid::from_vec(extent, to_cell_size, nodata, data)
}

fn aggregate<T: Scalar>(mode: ResampleMode, block: &mut [T], src_nodata: T, nodata: T) -> Result<T> {
    if block.is_empty() {
        return Ok(nodata);
    }
    let value = match mode {
        ResampleMode::Replicate => {
            let m = majority(block);
            return Ok(if m.is_nodata(src_nodata) { nodata } else { m });
        }
        ResampleMode::Mean => block.iter().map(|v| v.to_f64()).sum::<f64>() / block.len() as f64,
        ResampleMode::Sum => block.iter().map(|v| v.to_f64()).sum::<f64>(),
    };
    T::from_f64(value).ok_or(AllocationError::Overflow { value, data_type: T::DATA_TYPE })
}

/// Most frequent value; among equally frequent values the smallest wins.
fn majority<T: Scalar>(block: &mut [T]) -> T {
    block.sort_unstable_by(|a, b| a.total_cmp(b));
    let mut best = block[0];
    let mut best_count = 0usize;
    let mut i = 0usize;
    while i < block.len() {
        let mut j = i + 1;
        while j < block.len() && block[j].total_cmp(&block[i]).is_eq() {
            j += 1;
        }
        // Strictly greater keeps the earlier (smaller) value on ties.
        if j - i > best_count {
            best = block[i];
            best_count = j - i;
        }
        i = j;
    }
    best
}

// ── Growing ───────────────────────────────────────────────────────────────────

fn upsample<T: Scalar>(
    source: &Grid<T>,
    k: usize,
    to_cell_size: f64,
    mode: ResampleMode,
    nodata: T,
) -> Result<Grid<T>> {
    let src_cols = source.nr_cols();
    let out_cols = src_cols * k;
    let out_rows = source.nr_rows() * k;
    let src_data = source.data();
    let src_nodata = source.nodata();
    let divisor = match mode {
        ResampleMode::Sum => (k * k) as f64,
        ResampleMode::Replicate | ResampleMode::Mean => 1.0,
    };

    let mut data = vec![nodata; out_rows * out_cols];
    for_each_row(&mut data, out_cols, |orow, out| {
        let srow = orow / k;
        for scol in 0..src_cols {
            let v = src_data[srow * src_cols + scol];
            // Nodata is copied as-is, never divided.
            let w = if v.is_nodata(src_nodata) {
                nodata
            } else if divisor == 1.0 {
                v
            } else {
                let x = v.to_f64() / divisor;
                T::from_f64(x).ok_or(AllocationError::Overflow { value: x, data_type: T::DATA_TYPE })?
            };
            out[scol * k..(scol + 1) * k].fill(w);
        }
        Ok(())
    })?;

    Grid::from_vec(*source.extent(), to_cell_size, nodata, data)
}

/// Run `f(row_index, row)` over consecutive `row_len` chunks of `data`,
/// in parallel when the `threading` feature is on.
pub(crate) fn for_each_row<T, F>(data: &mut [T], row_len: usize, f: F) -> Result<()>
where
    T: Send,
    F: Fn(usize, &mut [T]) -> Result<()> + Sync + Send,
{
    #[cfg(feature = "threading")]
    {
        use rayon::prelude::*;
        data.par_chunks_mut(row_len)
            .enumerate()
            .try_for_each(|(r, row)| f(r, row))
    }
    #[cfg(not(feature = "threading"))]
    {
        data.chunks_mut(row_len)
            .enumerate()
            .try_for_each(|(r, row)| f(r, row))
    }
}
