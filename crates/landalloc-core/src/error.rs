//! Fatal error taxonomy for the grid and allocation engines.
//!
//! Conditions that only mean "a claim could not be fully met" are not errors;
//! they are reported as [`crate::allocation::Diagnostic`] values instead.

use thiserror::Error;

use crate::landuse::LanduseCode;
use crate::scalar::DataType;

#[derive(Debug, Error, PartialEq)]
pub enum AllocationError {
    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("cell ({row}, {col}) is outside a {nr_rows}x{nr_cols} grid")]
    IndexOutOfRange {
        row: usize,
        col: usize,
        nr_rows: usize,
        nr_cols: usize,
    },

    #[error("{mode} resampling met a nodata cell at ({row}, {col}); resample with skip_nodata")]
    ResampleNoDataNotAllowed {
        mode: &'static str,
        row: usize,
        col: usize,
    },

    #[error("value {value} is not representable as {data_type:?}")]
    Overflow { value: f64, data_type: DataType },

    #[error("shape mismatch: {what} expected {expected}, got {actual}")]
    ShapeMismatch {
        what: &'static str,
        expected: String,
        actual: String,
    },

    #[error("invalid allocation config: {0}")]
    InvalidConfig(String),

    #[error("cell size {0} is not in the permitted set")]
    UnsupportedCellSize(f64),

    #[error("duplicate land-use code {0}")]
    DuplicateLanduseCode(LanduseCode),

    #[error("land-use code {0} is reserved for unassigned cells")]
    ReservedLanduseCode(LanduseCode),

    #[error("unknown land-use code {0}")]
    UnknownLanduseCode(LanduseCode),

    #[error("invalid claim for land use {code}: {reason}")]
    InvalidClaim { code: LanduseCode, reason: String },
}

pub type Result<T> = std::result::Result<T, AllocationError>;
