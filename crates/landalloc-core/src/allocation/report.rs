//! Run summary: what each (category, region) pair received, plus the
//! non-fatal conditions met along the way.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::landuse::{LanduseCode, RegionId};

/// A condition that did not stop the run but that the caller should see.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// Present in the region grid but claimed by no category; never allocated.
    RegionWithoutClaim { region: RegionId },
    /// Category has no suitability source and was skipped.
    CategoryWithoutSuitability { code: LanduseCode },
    /// Category has no claim for this region; the pair was skipped.
    ClaimMissing { code: LanduseCode, region: RegionId },
    /// No free, allocatable, measurable cell was left in the region.
    NoCandidateCellsInRegion { code: LanduseCode, region: RegionId },
    /// Candidates ran out before the claim was met.
    ClaimPartiallySatisfied {
        code: LanduseCode,
        region: RegionId,
        claimed_km2: f64,
        allocated_km2: f64,
        satisfaction: f64,
    },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::RegionWithoutClaim { region } => {
                write!(f, "region {region} has no claim in any category")
            }
            Diagnostic::CategoryWithoutSuitability { code } => {
                write!(f, "land use {code} has no suitability source")
            }
            Diagnostic::ClaimMissing { code, region } => {
                write!(f, "land use {code} has no claim for region {region}")
            }
            Diagnostic::NoCandidateCellsInRegion { code, region } => {
                write!(f, "no candidate cells left for land use {code} in region {region}")
            }
            Diagnostic::ClaimPartiallySatisfied {
                code,
                region,
                claimed_km2,
                allocated_km2,
                satisfaction,
            } => write!(
                f,
                "land use {code} in region {region}: {allocated_km2:.3} of {claimed_km2:.3} km² ({:.1}%)",
                satisfaction * 100.0
            ),
        }
    }
}

/// Result of one (category, region) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionOutcome {
    pub code: LanduseCode,
    pub region: RegionId,
    pub claimed_km2: f64,
    pub allocated_km2: f64,
    pub cells: usize,
    /// `allocated / claimed`, capped at 1. Exactly 1 whenever the claim was
    /// met within the claim tolerance, including a zero claim.
    pub satisfaction: f64,
}

impl RegionOutcome {
    pub(crate) fn new(
        code: LanduseCode,
        region: RegionId,
        claimed_km2: f64,
        allocated_km2: f64,
        cells: usize,
        met: bool,
    ) -> Self {
        let satisfaction = if met || claimed_km2 <= 0.0 {
            1.0
        } else {
            (allocated_km2 / claimed_km2).min(1.0)
        };
        Self { code, region, claimed_km2, allocated_km2, cells, satisfaction }
    }
}

/// Per-category totals over all active regions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorySummary {
    pub code: LanduseCode,
    pub name: String,
    pub claimed_km2: f64,
    pub allocated_km2: f64,
    pub cells: usize,
    /// No suitability source; nothing was attempted.
    pub skipped: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AllocationReport {
    /// Regions that took part, ascending.
    pub regions: Vec<RegionId>,
    /// Category order as allocated.
    pub categories: Vec<CategorySummary>,
    pub outcomes: Vec<RegionOutcome>,
    pub diagnostics: Vec<Diagnostic>,
    /// Cells already assigned before the run started.
    pub preassigned_cells: usize,
    pub unassigned_cells: usize,
}

impl AllocationReport {
    pub fn outcome(&self, code: LanduseCode, region: RegionId) -> Option<&RegionOutcome> {
        self.outcomes.iter().find(|o| o.code == code && o.region == region)
    }

    pub fn category(&self, code: LanduseCode) -> Option<&CategorySummary> {
        self.categories.iter().find(|c| c.code == code)
    }

    /// Outcomes whose claim was not fully met.
    pub fn unmet(&self) -> impl Iterator<Item = &RegionOutcome> {
        self.outcomes.iter().filter(|o| o.satisfaction < 1.0)
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn satisfaction_is_capped_and_zero_claims_count_as_met() {
        assert_relative_eq!(RegionOutcome::new(1, 1, 100.0, 24.0, 24, false).satisfaction, 0.24);
        assert_eq!(RegionOutcome::new(1, 1, 10.0, 10.5, 11, true).satisfaction, 1.0);
        assert_eq!(RegionOutcome::new(1, 1, 0.0, 0.0, 0, true).satisfaction, 1.0);
    }

    #[test]
    fn met_claim_reports_full_satisfaction_despite_rounding() {
        let o = RegionOutcome::new(1, 1, 0.8, 0.799_999_999_999_999_9, 8, true);
        assert_eq!(o.satisfaction, 1.0);
    }

    #[test]
    fn diagnostics_serialise_with_kind_tag() {
        let d = Diagnostic::NoCandidateCellsInRegion { code: 4, region: 7 };
        let json = serde_json::to_string(&d).unwrap();
        assert_eq!(json, r#"{"kind":"no_candidate_cells_in_region","code":4,"region":7}"#);
        let back: Diagnostic = serde_json::from_str(&json).unwrap();
        assert_eq!(back, d);
    }

    #[test]
    fn unmet_lists_only_partial_outcomes() {
        let report = AllocationReport {
            outcomes: vec![
                RegionOutcome::new(1, 1, 10.0, 10.0, 10, true),
                RegionOutcome::new(2, 1, 10.0, 4.0, 4, false),
            ],
            ..Default::default()
        };
        let unmet: Vec<_> = report.unmet().map(|o| o.code).collect();
        assert_eq!(unmet, vec![2]);
        assert_eq!(report.outcome(2, 1).map(|o| o.cells), Some(4));
        assert!(report.outcome(3, 1).is_none());
    }

    #[test]
    fn report_json_keeps_outcomes_and_diagnostics() {
        let report = AllocationReport {
            regions: vec![1],
            outcomes: vec![RegionOutcome::new(2, 1, 10.0, 4.0, 4, false)],
            diagnostics: vec![Diagnostic::NoCandidateCellsInRegion { code: 3, region: 1 }],
            ..Default::default()
        };
        let json = report.to_json_pretty().unwrap();
        assert!(json.contains("\"no_candidate_cells_in_region\""));
        let back: AllocationReport = serde_json::from_str(&json).unwrap();
        assert_eq!(back, report);
    }
}
