//! Active region list and the cells each region owns.

use std::collections::{BTreeMap, BTreeSet};

use crate::config::AllocationConfig;
use crate::grid::Grid;
use crate::landuse::{LanduseCatalog, RegionId};
use crate::mask::Mask;

use super::report::Diagnostic;

/// Distinct data values of `regions` that pass the config's include/exclude
/// filters, ascending.
pub fn region_list(regions: &Grid<RegionId>, config: &AllocationConfig) -> Vec<RegionId> {
    regions
        .unique_values()
        .into_iter()
        .filter(|&r| config.region_selected(r))
        .collect()
}

/// Cells belonging to `region`.
pub fn region_mask(regions: &Grid<RegionId>, region: RegionId) -> Mask {
    regions.equal_mask(region)
}

/// Row-major cell indices per active region. Regions partition the grid, so
/// no index appears under two regions.
#[derive(Debug)]
pub(crate) struct RegionIndex {
    cells: BTreeMap<RegionId, Vec<usize>>,
}

impl RegionIndex {
    /// Regions claimed by no category are dropped here with a diagnostic.
    pub(crate) fn build(
        regions: &Grid<RegionId>,
        catalog: &LanduseCatalog,
        config: &AllocationConfig,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Self {
        let claimed: BTreeSet<RegionId> = catalog.claimed_regions();
        let mut cells: BTreeMap<RegionId, Vec<usize>> = BTreeMap::new();
        for region in region_list(regions, config) {
            if claimed.contains(&region) {
                cells.insert(region, Vec::new());
            } else {
                tracing::warn!(
                    target: "landalloc::regions",
                    region,
                    "regions.dropped.no_claim"
                );
                diagnostics.push(Diagnostic::RegionWithoutClaim { region });
            }
        }

        let nodata = regions.nodata();
        for (i, &r) in regions.data().iter().enumerate() {
            if r == nodata {
                continue;
            }
            if let Some(list) = cells.get_mut(&r) {
                list.push(i);
            }
        }

        tracing::debug!(
            target: "landalloc::regions",
            active = cells.len(),
            "regions.indexed"
        );
        Self { cells }
    }

    pub(crate) fn regions(&self) -> Vec<RegionId> {
        self.cells.keys().copied().collect()
    }

    pub(crate) fn cells(&self, region: RegionId) -> &[usize] {
        self.cells.get(&region).map(Vec::as_slice).unwrap_or(&[])
    }
}
