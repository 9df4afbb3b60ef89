//! Raster grid engine and greedy claim-constrained land-use allocation.
//!
//! The grid side ([`Grid`], [`resample()`], [`resize()`]) keeps nodata and
//! area totals consistent across cell-size and extent changes. The allocation
//! side ([`allocate`]) assigns land-use categories to cells, region by region,
//! in priority order until each region's area claim is met.

pub mod allocation;
pub mod config;
pub mod error;
pub mod extent;
pub mod grid;
pub mod landuse;
pub mod mask;
pub mod resample;
pub mod resize;
pub mod scalar;

pub use allocation::{
    allocate, allocate_into, fill_unassigned, Allocation, AllocationInputs, AllocationReport,
    CategorySummary, Diagnostic, RegionOutcome,
};
pub use config::{AllocationConfig, ConfigError};
pub use error::{AllocationError, Result};
pub use extent::{Extent, GEOGRAPHIC_CELL_SIZES};
pub use grid::Grid;
pub use landuse::{
    Claim, LanduseCatalog, LanduseCode, LanduseType, RegionId, SuitabilitySource, UNASSIGNED,
};
pub use mask::Mask;
pub use resample::{resample, resample_with_nodata, ResampleMode};
pub use resize::{conform, conform_owned, resize, resize_with_nodata};
pub use scalar::{DataType, Scalar, FLOAT_NODATA};
