//! Land-use categories, their area claims and their suitability sources.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{AllocationError, Result};
use crate::grid::Grid;

pub type LanduseCode = u16;
pub type RegionId = i32;

/// Output-grid sentinel for cells no category has taken.
pub const UNASSIGNED: LanduseCode = u16::MAX;

// ── Suitability sources ───────────────────────────────────────────────────────

/// Where a category's suitability grid comes from. Loaded once per run,
/// right before the category is allocated, and dropped afterwards.
pub trait SuitabilitySource: Send + Sync {
    fn load(&self) -> Result<Grid<f32>>;
}

impl SuitabilitySource for Grid<f32> {
    fn load(&self) -> Result<Grid<f32>> {
        Ok(self.clone())
    }
}

impl<F> SuitabilitySource for F
where
    F: Fn() -> Result<Grid<f32>> + Send + Sync,
{
    fn load(&self) -> Result<Grid<f32>> {
        self()
    }
}

// ── Claims ────────────────────────────────────────────────────────────────────

/// One row of a resolved claims table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Claim {
    pub region: RegionId,
    pub code: LanduseCode,
    pub km2: f64,
}

fn check_claim(code: LanduseCode, km2: f64) -> Result<()> {
    if km2.is_finite() && km2 >= 0.0 {
        Ok(())
    } else {
        Err(AllocationError::InvalidClaim {
            code,
            reason: format!("claim {km2} km² must be finite and non-negative"),
        })
    }
}

// ── Categories ────────────────────────────────────────────────────────────────

pub struct LanduseType {
    pub code: LanduseCode,
    pub name: String,
    /// `None` means the category is never allocated.
    pub suitability: Option<Box<dyn SuitabilitySource>>,
    /// Area claim in km² per region.
    pub claims: BTreeMap<RegionId, f64>,
}

impl fmt::Debug for LanduseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LanduseType")
            .field("code", &self.code)
            .field("name", &self.name)
            .field("has_suitability", &self.suitability.is_some())
            .field("claims", &self.claims)
            .finish()
    }
}

impl LanduseType {
    pub fn new(code: LanduseCode, name: impl Into<String>) -> Self {
        Self { code, name: name.into(), suitability: None, claims: BTreeMap::new() }
    }

    pub fn with_suitability(mut self, source: impl SuitabilitySource + 'static) -> Self {
        self.suitability = Some(Box::new(source));
        self
    }

    pub fn has_suitability(&self) -> bool {
        self.suitability.is_some()
    }

    pub fn claim(&self, region: RegionId) -> Option<f64> {
        self.claims.get(&region).copied()
    }

    pub fn total_claim(&self) -> f64 {
        self.claims.values().sum()
    }
}

/// The land-use categories of one run, in insertion order, keyed by code.
#[derive(Debug, Default)]
pub struct LanduseCatalog {
    types: Vec<LanduseType>,
}

impl LanduseCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from parallel code and name lists.
    pub fn from_codes_and_names<S: AsRef<str>>(codes: &[LanduseCode], names: &[S]) -> Result<Self> {
        if codes.len() != names.len() {
            return Err(AllocationError::ShapeMismatch {
                what: "land-use names",
                expected: format!("{} names", codes.len()),
                actual: format!("{} names", names.len()),
            });
        }
        let mut catalog = Self::new();
        for (&code, name) in codes.iter().zip(names) {
            catalog.push(LanduseType::new(code, name.as_ref()))?;
        }
        Ok(catalog)
    }

    pub fn push(&mut self, landuse: LanduseType) -> Result<()> {
        if landuse.code == UNASSIGNED {
            return Err(AllocationError::ReservedLanduseCode(landuse.code));
        }
        if self.get(landuse.code).is_some() {
            return Err(AllocationError::DuplicateLanduseCode(landuse.code));
        }
        for &km2 in landuse.claims.values() {
            check_claim(landuse.code, km2)?;
        }
        self.types.push(landuse);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LanduseType> {
        self.types.iter()
    }

    pub fn codes(&self) -> Vec<LanduseCode> {
        self.types.iter().map(|t| t.code).collect()
    }

    pub fn get(&self, code: LanduseCode) -> Option<&LanduseType> {
        self.types.iter().find(|t| t.code == code)
    }

    pub fn require(&self, code: LanduseCode) -> Result<&LanduseType> {
        self.get(code).ok_or(AllocationError::UnknownLanduseCode(code))
    }

    fn require_mut(&mut self, code: LanduseCode) -> Result<&mut LanduseType> {
        self.types
            .iter_mut()
            .find(|t| t.code == code)
            .ok_or(AllocationError::UnknownLanduseCode(code))
    }

    pub fn set_suitability(&mut self, code: LanduseCode, source: impl SuitabilitySource + 'static) -> Result<()> {
        self.require_mut(code)?.suitability = Some(Box::new(source));
        Ok(())
    }

    pub fn set_claim(&mut self, code: LanduseCode, region: RegionId, km2: f64) -> Result<()> {
        check_claim(code, km2)?;
        self.require_mut(code)?.claims.insert(region, km2);
        Ok(())
    }

    /// Load rows of a claims table. A later row for the same (code, region)
    /// replaces an earlier one.
    pub fn load_claims<I: IntoIterator<Item = Claim>>(&mut self, claims: I) -> Result<()> {
        for c in claims {
            self.set_claim(c.code, c.region, c.km2)?;
        }
        Ok(())
    }

    /// Scale every claim of `code` by `factor`.
    pub fn apply_claim_multiplier(&mut self, code: LanduseCode, factor: f64) -> Result<()> {
        if !factor.is_finite() || factor < 0.0 {
            return Err(AllocationError::InvalidClaim {
                code,
                reason: format!("claim multiplier {factor} must be finite and non-negative"),
            });
        }
        for km2 in self.require_mut(code)?.claims.values_mut() {
            *km2 *= factor;
        }
        Ok(())
    }

    pub fn apply_claim_multipliers(&mut self, multipliers: &BTreeMap<LanduseCode, f64>) -> Result<()> {
        for (&code, &factor) in multipliers {
            self.apply_claim_multiplier(code, factor)?;
        }
        Ok(())
    }

    /// Every region that at least one category claims area in.
    pub fn claimed_regions(&self) -> BTreeSet<RegionId> {
        self.types.iter().flat_map(|t| t.claims.keys().copied()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extent::Extent;

    #[test]
    fn duplicate_and_reserved_codes_are_rejected() {
        let err = LanduseCatalog::from_codes_and_names(&[1, 2, 1], &["urban", "crop", "again"]).unwrap_err();
        assert_eq!(err, AllocationError::DuplicateLanduseCode(1));

        let err = LanduseCatalog::from_codes_and_names(&[UNASSIGNED], &["x"]).unwrap_err();
        assert_eq!(err, AllocationError::ReservedLanduseCode(UNASSIGNED));

        assert!(matches!(
            LanduseCatalog::from_codes_and_names(&[1, 2], &["only one"]),
            Err(AllocationError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn claims_must_be_non_negative() {
        let mut c = LanduseCatalog::from_codes_and_names(&[3], &["pasture"]).unwrap();
        assert!(matches!(c.set_claim(3, 1, -0.5), Err(AllocationError::InvalidClaim { code: 3, .. })));
        assert!(c.set_claim(3, 1, f64::NAN).is_err());
        assert_eq!(c.set_claim(9, 1, 1.0), Err(AllocationError::UnknownLanduseCode(9)));
        c.set_claim(3, 1, 12.0).unwrap();
        assert_eq!(c.require(3).unwrap().claim(1), Some(12.0));
        assert_eq!(c.require(3).unwrap().claim(2), None);
    }

    #[test]
    fn multipliers_scale_all_regions_of_one_category() {
        let mut c = LanduseCatalog::from_codes_and_names(&[1, 2], &["crop", "forest"]).unwrap();
        c.load_claims([
            Claim { region: 10, code: 1, km2: 4.0 },
            Claim { region: 11, code: 1, km2: 6.0 },
            Claim { region: 10, code: 2, km2: 5.0 },
        ])
        .unwrap();
        c.apply_claim_multipliers(&BTreeMap::from([(1, 0.5)])).unwrap();
        assert_eq!(c.require(1).unwrap().total_claim(), 5.0);
        assert_eq!(c.require(2).unwrap().claim(10), Some(5.0));
        assert!(c.apply_claim_multiplier(2, -1.0).is_err());
        assert_eq!(c.claimed_regions().into_iter().collect::<Vec<_>>(), vec![10, 11]);
    }

    #[test]
    fn grids_and_closures_both_serve_as_sources() {
        let e = Extent::new(0.0, 0.0, 2.0, 1.0).unwrap();
        let g = Grid::from_vec(e, 1.0, -1.0f32, vec![0.25, 0.75]).unwrap();
        let mut c = LanduseCatalog::from_codes_and_names(&[1, 2], &["a", "b"]).unwrap();
        c.set_suitability(1, g.clone()).unwrap();
        let lazy = g.clone();
        c.set_suitability(2, move || -> Result<Grid<f32>> { Ok(lazy.clone()) }).unwrap();
        for code in [1, 2] {
            let loaded = c.require(code).unwrap().suitability.as_ref().unwrap().load().unwrap();
            assert_eq!(loaded, g, "source for {code} loaded a different grid");
        }
    }
}
