//! JSON scenario files and the built-in demo scenario.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use landalloc_core::{
    AllocationConfig, AllocationInputs, Claim, Extent, Grid, LanduseCatalog, LanduseCode,
    LanduseType, Mask, RegionId,
};

/// One land-use category as written in a scenario file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LanduseEntry {
    pub code: LanduseCode,
    pub name: String,
    #[serde(default)]
    pub suitability: Option<Grid<f32>>,
}

/// Everything one allocation run needs, in memory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    pub regions: Grid<RegionId>,
    pub area: Grid<f64>,
    #[serde(default)]
    pub protection: Option<Grid<f32>>,
    #[serde(default)]
    pub noise: Option<Grid<f32>>,
    #[serde(default)]
    pub allocatable: Option<Mask>,
    /// Pre-seeded output; cells other than the unassigned code are kept.
    #[serde(default)]
    pub preassigned: Option<Grid<LanduseCode>>,
    pub landuse: Vec<LanduseEntry>,
    /// Allocation order, highest priority first. Defaults to `landuse` order.
    #[serde(default)]
    pub priority: Option<Vec<LanduseCode>>,
    pub claims: Vec<Claim>,
    #[serde(default)]
    pub config: AllocationConfig,
}

impl Scenario {
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot read {}", path.display()))?;
        let scenario: Scenario = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse scenario {}", path.display()))?;
        scenario.config.validate().context("Scenario config rejected")?;
        Ok(scenario)
    }

    pub fn priority(&self) -> Vec<LanduseCode> {
        self.priority
            .clone()
            .unwrap_or_else(|| self.landuse.iter().map(|l| l.code).collect())
    }

    pub fn catalog(&self, config: &AllocationConfig) -> Result<LanduseCatalog> {
        let mut catalog = LanduseCatalog::new();
        for entry in &self.landuse {
            let mut landuse = LanduseType::new(entry.code, entry.name.clone());
            if let Some(grid) = &entry.suitability {
                landuse = landuse.with_suitability(grid.clone());
            }
            catalog.push(landuse)?;
        }
        catalog.load_claims(self.claims.iter().copied())?;
        catalog.apply_claim_multipliers(&config.claim_multipliers)?;
        Ok(catalog)
    }

    pub fn inputs(&self) -> AllocationInputs<'_> {
        AllocationInputs {
            regions: &self.regions,
            area: &self.area,
            protection: self.protection.as_ref(),
            noise: self.noise.as_ref(),
            allocatable: self.allocatable.as_ref(),
        }
    }
}

/// 4×6 grid, one region, 1 km² per cell. Cropland prefers the western
/// columns, pasture is indifferent, forest has no suitability map.
pub fn demo() -> Result<Scenario> {
    const COLS: usize = 6;
    const ROWS: usize = 4;
    let extent = Extent::new(0.0, 0.0, COLS as f64, ROWS as f64)?;

    let regions = Grid::filled(extent, 1.0, -1, 1)?;
    let area = Grid::filled(extent, 1.0, -1.0, 1.0)?;
    let crop = (0..ROWS * COLS).map(|i| (COLS - i % COLS) as f32).collect();
    let crop = Grid::from_vec(extent, 1.0, -1.0, crop)?;
    let pasture = Grid::filled(extent, 1.0, -1.0, 0.5)?;

    Ok(Scenario {
        regions,
        area,
        protection: None,
        noise: None,
        allocatable: None,
        preassigned: None,
        landuse: vec![
            LanduseEntry { code: 1, name: "cropland".into(), suitability: Some(crop) },
            LanduseEntry { code: 2, name: "pasture".into(), suitability: Some(pasture) },
            LanduseEntry { code: 3, name: "forest".into(), suitability: None },
        ],
        priority: None,
        claims: vec![
            Claim { region: 1, code: 1, km2: 10.0 },
            Claim { region: 1, code: 2, km2: 10.0 },
            Claim { region: 1, code: 3, km2: 2.0 },
        ],
        config: AllocationConfig::default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_scenario_round_trips_through_json() {
        let s = demo().unwrap();
        let json = serde_json::to_string(&s).unwrap();
        let back: Scenario = serde_json::from_str(&json).unwrap();
        assert_eq!(back.regions, s.regions);
        assert_eq!(back.priority(), vec![1, 2, 3]);
        assert_eq!(back.claims, s.claims);
    }

    #[test]
    fn catalog_applies_config_multipliers() {
        let s = demo().unwrap();
        let mut cfg = AllocationConfig::default();
        cfg.claim_multipliers.insert(2, 0.5);
        let catalog = s.catalog(&cfg).unwrap();
        assert_eq!(catalog.require(2).unwrap().claim(1), Some(5.0));
        assert!(!catalog.require(3).unwrap().has_suitability());
    }
}
