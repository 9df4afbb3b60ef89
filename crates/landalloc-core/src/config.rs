//! Per-run allocation settings.
//!
//! Passed by reference into the engine entry points; nothing here is global.
//! Loaded from JSON with every field optional.

use std::collections::BTreeMap;
use std::{fs, io, path::Path, path::PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::{AllocationError, Result};
use crate::extent::same_cell_size;
use crate::landuse::{LanduseCode, RegionId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AllocationConfig {
    /// Perturb suitability to break exact ties.
    pub use_noise: bool,
    /// Seed for the generated noise grid when none is supplied.
    pub noise_seed: u64,
    /// Noise amplitude as a fraction of the smallest suitability gap. Must
    /// stay below 1 so noise never reorders distinct values.
    pub noise_fraction: f64,
    /// Gaps at or below this are treated as equal values.
    pub min_suitability_gap: f64,
    /// Relative slack when comparing cumulative area against a claim.
    pub claim_tolerance: f64,
    /// When set, only these regions are allocated.
    pub include_regions: Option<Vec<RegionId>>,
    pub exclude_regions: Vec<RegionId>,
    /// Empty means any cell size is accepted.
    pub permitted_cell_sizes: Vec<f64>,
    pub claim_multipliers: BTreeMap<LanduseCode, f64>,
}

impl Default for AllocationConfig {
    fn default() -> Self {
        Self {
            use_noise: false,
            noise_seed: 42,
            noise_fraction: 0.9,
            min_suitability_gap: 1e-50,
            claim_tolerance: 1e-9,
            include_regions: None,
            exclude_regions: Vec::new(),
            permitted_cell_sizes: Vec::new(),
            claim_multipliers: BTreeMap::new(),
        }
    }
}

impl AllocationConfig {
    pub fn from_json_str(json: &str) -> std::result::Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> std::result::Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&contents)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.noise_fraction > 0.0 && self.noise_fraction < 1.0) {
            return Err(AllocationError::InvalidConfig(format!(
                "noise_fraction {} must lie in (0, 1)",
                self.noise_fraction
            )));
        }
        if !(self.min_suitability_gap >= 0.0 && self.min_suitability_gap.is_finite()) {
            return Err(AllocationError::InvalidConfig(format!(
                "min_suitability_gap {} must be finite and non-negative",
                self.min_suitability_gap
            )));
        }
        if !(0.0..1.0).contains(&self.claim_tolerance) {
            return Err(AllocationError::InvalidConfig(format!(
                "claim_tolerance {} must lie in [0, 1)",
                self.claim_tolerance
            )));
        }
        for &cs in &self.permitted_cell_sizes {
            crate::extent::check_cell_size(cs)?;
        }
        Ok(())
    }

    /// Reject `cell_size` unless it is one of the permitted sizes.
    pub fn check_cell_size(&self, cell_size: f64) -> Result<()> {
        if self.permitted_cell_sizes.is_empty()
            || self.permitted_cell_sizes.iter().any(|&p| same_cell_size(p, cell_size))
        {
            Ok(())
        } else {
            Err(AllocationError::UnsupportedCellSize(cell_size))
        }
    }

    /// Whether `region` passes the include/exclude filters.
    pub fn region_selected(&self, region: RegionId) -> bool {
        let included = self
            .include_regions
            .as_ref()
            .map_or(true, |list| list.contains(&region));
        included && !self.exclude_regions.contains(&region)
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse allocation config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("failed to read allocation config from {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("allocation config rejected: {0}")]
    Invalid(#[from] AllocationError),
}
