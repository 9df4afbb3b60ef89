//! Greedy claim-constrained land-use allocation.
//!
//! Categories are processed one at a time in priority order. Each one sees
//! only the cells every earlier category left unassigned; within a category
//! the regions are independent. A cell is written at most once per run.

pub mod regions;
pub mod report;
mod select;
mod suitability;

pub use regions::{region_list, region_mask};
pub use report::{AllocationReport, CategorySummary, Diagnostic, RegionOutcome};
pub use suitability::{generate_noise, smallest_gap};

use std::collections::BTreeSet;

use crate::config::AllocationConfig;
use crate::error::{AllocationError, Result};
use crate::grid::Grid;
use crate::landuse::{LanduseCatalog, LanduseCode, RegionId, UNASSIGNED};
use crate::mask::Mask;

use regions::RegionIndex;

// ── Inputs / outputs ──────────────────────────────────────────────────────────

/// Spatial inputs of one run. `regions` defines the working lattice; `area`
/// must share it exactly. Protection and noise grids are conformed onto it.
#[derive(Debug, Clone, Copy)]
pub struct AllocationInputs<'a> {
    pub regions: &'a Grid<RegionId>,
    /// Cell area in km².
    pub area: &'a Grid<f64>,
    /// Suitability multiplier in `[0, 1]`; 1 means unprotected.
    pub protection: Option<&'a Grid<f32>>,
    /// Tie-breaking noise in `[0, 1)`, used only when the config asks for noise.
    pub noise: Option<&'a Grid<f32>>,
    /// Cells any category may take; `None` allows all.
    pub allocatable: Option<&'a Mask>,
}

impl<'a> AllocationInputs<'a> {
    pub fn new(regions: &'a Grid<RegionId>, area: &'a Grid<f64>) -> Self {
        Self { regions, area, protection: None, noise: None, allocatable: None }
    }

    pub fn with_protection(mut self, protection: &'a Grid<f32>) -> Self {
        self.protection = Some(protection);
        self
    }

    pub fn with_noise(mut self, noise: &'a Grid<f32>) -> Self {
        self.noise = Some(noise);
        self
    }

    pub fn with_allocatable(mut self, allocatable: &'a Mask) -> Self {
        self.allocatable = Some(allocatable);
        self
    }
}

#[derive(Debug, Clone)]
pub struct Allocation {
    /// Land-use code per cell, [`UNASSIGNED`] where nothing was allocated.
    pub output: Grid<LanduseCode>,
    pub report: AllocationReport,
}

// ── Entry points ──────────────────────────────────────────────────────────────

/// Allocate `priority` (highest first) onto a fresh output grid.
pub fn allocate(
    priority: &[LanduseCode],
    catalog: &LanduseCatalog,
    inputs: &AllocationInputs<'_>,
    config: &AllocationConfig,
) -> Result<Allocation> {
    let r = inputs.regions;
    let mut output = Grid::create_empty(*r.extent(), r.cell_size(), UNASSIGNED)?;
    let report = allocate_into(&mut output, priority, catalog, inputs, config)?;
    Ok(Allocation { output, report })
}

/// Allocate into an existing output grid. Cells not equal to [`UNASSIGNED`]
/// are treated as already taken and are never overwritten.
pub fn allocate_into(
    output: &mut Grid<LanduseCode>,
    priority: &[LanduseCode],
    catalog: &LanduseCatalog,
    inputs: &AllocationInputs<'_>,
    config: &AllocationConfig,
) -> Result<AllocationReport> {
    config.validate()?;
    let regions = inputs.regions;
    config.check_cell_size(regions.cell_size())?;
    regions.check_same_geometry(inputs.area, "area grid")?;
    regions.check_same_geometry(output, "output grid")?;
    if let Some(m) = inputs.allocatable {
        m.check_shape(regions.nr_rows(), regions.nr_cols())?;
    }
    check_priority(priority, catalog)?;

    let protection = inputs
        .protection
        .map(|p| suitability::prepare_protection(p, regions))
        .transpose()?;
    let noise = if config.use_noise {
        Some(suitability::prepare_noise(inputs.noise, regions, config.noise_seed)?)
    } else {
        None
    };

    let mut report = AllocationReport::default();
    let index = RegionIndex::build(regions, catalog, config, &mut report.diagnostics);
    report.regions = index.regions();
    report.preassigned_cells = count_assigned(output);

    tracing::info!(
        target: "landalloc::allocation",
        categories = priority.len(),
        regions = report.regions.len(),
        cells = output.len(),
        preassigned = report.preassigned_cells,
        noise = config.use_noise,
        protection = protection.is_some(),
        "allocation.run.start"
    );

    for &code in priority {
        let landuse = catalog.require(code)?;
        let Some(source) = landuse.suitability.as_ref() else {
            tracing::info!(
                target: "landalloc::allocation",
                code,
                name = %landuse.name,
                "allocation.category.skipped"
            );
            report.diagnostics.push(Diagnostic::CategoryWithoutSuitability { code });
            report.categories.push(CategorySummary {
                code,
                name: landuse.name.clone(),
                claimed_km2: 0.0,
                allocated_km2: 0.0,
                cells: 0,
                skipped: true,
            });
            continue;
        };

        let suit = suitability::prepare(source.load()?, regions, protection.as_ref(), noise.as_ref(), config)?;
        let eligible = select::eligible_cells(output, &suit, inputs.area, inputs.allocatable);

        let mut jobs: Vec<(RegionId, f64)> = Vec::with_capacity(report.regions.len());
        for &region in &report.regions {
            match landuse.claim(region) {
                Some(claim) => jobs.push((region, claim)),
                None => {
                    tracing::debug!(
                        target: "landalloc::allocation",
                        code,
                        region,
                        "allocation.region.no_claim"
                    );
                    report.diagnostics.push(Diagnostic::ClaimMissing { code, region });
                }
            }
        }

        let selections = select::select_all(&jobs, &index, &eligible, &suit, inputs.area, config.claim_tolerance);
        // Working suitability is released before the next category loads its own.
        drop(suit);

        let mut summary = CategorySummary {
            code,
            name: landuse.name.clone(),
            claimed_km2: 0.0,
            allocated_km2: 0.0,
            cells: 0,
            skipped: false,
        };
        for sel in selections {
            select::commit(output, code, &sel.cells);
            let outcome =
                RegionOutcome::new(code, sel.region, sel.claimed_km2, sel.allocated_km2, sel.cells.len(), sel.met);

            tracing::debug!(
                target: "landalloc::allocation",
                code,
                region = sel.region,
                candidates = sel.candidates,
                cells = outcome.cells,
                claimed_km2 = outcome.claimed_km2,
                allocated_km2 = outcome.allocated_km2,
                "allocation.region.done"
            );
            if sel.candidates == 0 && sel.claimed_km2 > 0.0 {
                report.diagnostics.push(Diagnostic::NoCandidateCellsInRegion { code, region: sel.region });
            }
            if !sel.met {
                tracing::warn!(
                    target: "landalloc::allocation",
                    code,
                    region = sel.region,
                    claimed_km2 = outcome.claimed_km2,
                    allocated_km2 = outcome.allocated_km2,
                    satisfaction = outcome.satisfaction,
                    "allocation.claim.partial"
                );
                report.diagnostics.push(Diagnostic::ClaimPartiallySatisfied {
                    code,
                    region: sel.region,
                    claimed_km2: outcome.claimed_km2,
                    allocated_km2: outcome.allocated_km2,
                    satisfaction: outcome.satisfaction,
                });
            }

            summary.claimed_km2 += outcome.claimed_km2;
            summary.allocated_km2 += outcome.allocated_km2;
            summary.cells += outcome.cells;
            report.outcomes.push(outcome);
        }

        tracing::info!(
            target: "landalloc::allocation",
            code,
            name = %summary.name,
            claimed_km2 = summary.claimed_km2,
            allocated_km2 = summary.allocated_km2,
            cells = summary.cells,
            "allocation.category.done"
        );
        report.categories.push(summary);
    }

    report.unassigned_cells = output.len() - count_assigned(output);
    tracing::info!(
        target: "landalloc::allocation",
        unassigned = report.unassigned_cells,
        unmet = report.unmet().count(),
        "allocation.run.done"
    );
    Ok(report)
}

/// Set every still-unassigned cell (optionally only within `within`) to
/// `code`. Returns the number of cells filled.
pub fn fill_unassigned(output: &mut Grid<LanduseCode>, code: LanduseCode, within: Option<&Mask>) -> Result<usize> {
    if code == UNASSIGNED {
        return Err(AllocationError::ReservedLanduseCode(code));
    }
    if let Some(m) = within {
        m.check_shape(output.nr_rows(), output.nr_cols())?;
    }
    let mut filled = 0usize;
    for (i, v) in output.data_mut().iter_mut().enumerate() {
        if *v == UNASSIGNED && within.map_or(true, |m| m.is_set(i)) {
            *v = code;
            filled += 1;
        }
    }
    Ok(filled)
}

fn check_priority(priority: &[LanduseCode], catalog: &LanduseCatalog) -> Result<()> {
    let mut seen = BTreeSet::new();
    for &code in priority {
        catalog.require(code)?;
        if !seen.insert(code) {
            return Err(AllocationError::DuplicateLanduseCode(code));
        }
    }
    Ok(())
}

fn count_assigned(output: &Grid<LanduseCode>) -> usize {
    output.data().iter().filter(|&&v| v != UNASSIGNED).count()
}
