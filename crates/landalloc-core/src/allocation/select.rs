//! Candidate selection for one (category, region) pair: rank free cells by
//! suitability, accumulate their area and cut where the claim is met.

use crate::grid::Grid;
use crate::landuse::{LanduseCode, RegionId, UNASSIGNED};
use crate::mask::Mask;

use super::regions::RegionIndex;

/// Cells a category may take: still unassigned, allowed by the allocatable
/// mask, with rankable suitability and a measurable non-negative area.
pub(crate) fn eligible_cells(
    output: &Grid<LanduseCode>,
    suitability: &Grid<f64>,
    area: &Grid<f64>,
    allocatable: Option<&Mask>,
) -> Mask {
    let (out, suit, ar) = (output.data(), suitability.data(), area.data());
    let cells = (0..out.len())
        .map(|i| {
            out[i] == UNASSIGNED
                && allocatable.map_or(true, |m| m.is_set(i))
                && !suitability.is_nodata(suit[i])
                && !area.is_nodata(ar[i])
                && ar[i] >= 0.0
        })
        .collect();
    Mask::from_parts(output.nr_rows(), output.nr_cols(), cells)
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Selection {
    pub region: RegionId,
    pub claimed_km2: f64,
    /// Eligible cells in the region before the cut.
    pub candidates: usize,
    /// Chosen cells, best first.
    pub cells: Vec<usize>,
    pub allocated_km2: f64,
    /// The cut reached `claim × (1 − tolerance)`. Always true for a zero claim.
    pub met: bool,
}

/// Pick the best cells of `region_cells` until their area reaches `claim`.
///
/// Candidates are ranked by descending suitability with a stable sort, so
/// equal scores keep row-major order. The cut is the shortest prefix whose
/// cumulative area reaches `claim × (1 − tolerance)`; if none does, every
/// candidate is taken.
pub(crate) fn select_region(
    region: RegionId,
    claim: f64,
    region_cells: &[usize],
    eligible: &Mask,
    suitability: &[f64],
    area: &[f64],
    tolerance: f64,
) -> Selection {
    let mut order: Vec<usize> = region_cells.iter().copied().filter(|&i| eligible.is_set(i)).collect();
    let candidates = order.len();
    if claim <= 0.0 || order.is_empty() {
        return Selection {
            region,
            claimed_km2: claim,
            candidates,
            cells: Vec::new(),
            allocated_km2: 0.0,
            met: claim <= 0.0,
        };
    }

    order.sort_by(|&a, &b| suitability[b].total_cmp(&suitability[a]));

    let mut cumulative = Vec::with_capacity(order.len());
    let mut total = 0.0f64;
    for &i in &order {
        total += area[i];
        cumulative.push(total);
    }

    let target = claim * (1.0 - tolerance);
    let n = (cumulative.partition_point(|&c| c < target) + 1).min(order.len());
    order.truncate(n);
    let allocated_km2 = cumulative[n - 1];
    Selection { region, claimed_km2: claim, candidates, cells: order, allocated_km2, met: allocated_km2 >= target }
}

/// Run [`select_region`] for every `(region, claim)` job. Regions are
/// disjoint, so the jobs are independent; results keep job order.
pub(crate) fn select_all(
    jobs: &[(RegionId, f64)],
    index: &RegionIndex,
    eligible: &Mask,
    suitability: &Grid<f64>,
    area: &Grid<f64>,
    tolerance: f64,
) -> Vec<Selection> {
    let (suit, ar) = (suitability.data(), area.data());
    let run = |&(region, claim): &(RegionId, f64)| {
        select_region(region, claim, index.cells(region), eligible, suit, ar, tolerance)
    };

    #[cfg(feature = "threading")]
    {
        use rayon::prelude::*;
        jobs.par_iter().map(run).collect()
    }
    #[cfg(not(feature = "threading"))]
    {
        jobs.iter().map(run).collect()
    }
}

/// Write `code` into the chosen cells. Every cell must still be unassigned.
pub(crate) fn commit(output: &mut Grid<LanduseCode>, code: LanduseCode, cells: &[usize]) {
    let data = output.data_mut();
    for &i in cells {
        debug_assert_eq!(data[i], UNASSIGNED, "cell {i} assigned twice");
        data[i] = code;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extent::Extent;
    use approx::assert_relative_eq;

    #[test]
    fn picks_highest_suitability_first_and_keeps_tie_order() {
        let suit = [0.5, 0.9, 0.5, 0.1, 0.9];
        let area = [1.0; 5];
        let eligible = Mask::new(1, 5, true);
        let s = select_region(1, 3.0, &[0, 1, 2, 3, 4], &eligible, &suit, &area, 0.0);
        assert_eq!(s.cells, vec![1, 4, 0]);
        assert_eq!(s.candidates, 5);
        assert_eq!(s.allocated_km2, 3.0);
    }

    #[test]
    fn cut_overshoots_by_less_than_one_cell() {
        let suit = [4.0, 3.0, 2.0, 1.0];
        let area = [2.0, 2.0, 2.0, 2.0];
        let eligible = Mask::new(1, 4, true);
        let s = select_region(1, 5.0, &[0, 1, 2, 3], &eligible, &suit, &area, 1e-9);
        assert_eq!(s.cells, vec![0, 1, 2]);
        assert!(s.allocated_km2 >= 5.0 && s.allocated_km2 - 5.0 < 2.0);
    }

    #[test]
    fn tolerance_absorbs_float_accumulation() {
        let suit = [1.0; 10];
        let area = [0.1; 10];
        let eligible = Mask::new(1, 10, true);
        let cells: Vec<usize> = (0..10).collect();
        // Eight cells of 0.1 sum to 0.7999999999999999.
        let strict = select_region(1, 0.8, &cells, &eligible, &suit, &area, 0.0);
        assert_eq!(strict.cells.len(), 9);
        let s = select_region(1, 0.8, &cells, &eligible, &suit, &area, 1e-9);
        assert_eq!(s.cells.len(), 8);
        assert_relative_eq!(s.allocated_km2, 0.8, epsilon = 1e-12);
        assert!(s.met, "0.7999999999999999 km² meets 0.8 within tolerance");
    }

    #[test]
    fn claim_beyond_supply_takes_everything() {
        let suit = [0.2, 0.4];
        let area = [1.5, 2.5];
        let eligible = Mask::new(1, 2, true);
        let s = select_region(3, 100.0, &[0, 1], &eligible, &suit, &area, 1e-9);
        assert_eq!(s.cells, vec![1, 0]);
        assert_eq!(s.allocated_km2, 4.0);
        assert!(!s.met);
    }

    #[test]
    fn zero_claim_and_empty_candidates_take_nothing() {
        let eligible = Mask::from_vec(1, 2, vec![false, true]).unwrap();
        let s = select_region(1, 0.0, &[0, 1], &eligible, &[1.0, 1.0], &[1.0, 1.0], 0.0);
        assert!(s.cells.is_empty());
        assert_eq!(s.candidates, 1);
        assert!(s.met);
        let s = select_region(1, 5.0, &[0], &eligible, &[1.0, 1.0], &[1.0, 1.0], 0.0);
        assert!(s.cells.is_empty());
        assert_eq!(s.candidates, 0);
        assert!(!s.met);
    }

    #[test]
    fn eligibility_excludes_taken_blocked_and_nodata_cells() {
        let e = Extent::new(0.0, 0.0, 5.0, 1.0).unwrap();
        let output = Grid::from_vec(e, 1.0, UNASSIGNED, vec![UNASSIGNED, 3, UNASSIGNED, UNASSIGNED, UNASSIGNED]).unwrap();
        let suit = Grid::from_vec(e, 1.0, -1.0, vec![0.5, 0.5, -1.0, 0.5, 0.5]).unwrap();
        let area = Grid::from_vec(e, 1.0, -1.0, vec![1.0, 1.0, 1.0, -1.0, 1.0]).unwrap();
        let allocatable = Mask::from_vec(1, 5, vec![true, true, true, true, false]).unwrap();
        let m = eligible_cells(&output, &suit, &area, Some(&allocatable));
        assert_eq!(m.as_slice(), &[true, false, false, false, false]);
    }

    #[test]
    fn commit_writes_code_into_chosen_cells() {
        let e = Extent::new(0.0, 0.0, 3.0, 1.0).unwrap();
        let mut output = Grid::create_empty(e, 1.0, UNASSIGNED).unwrap();
        commit(&mut output, 7, &[2, 0]);
        assert_eq!(output.data(), &[7, UNASSIGNED, 7]);
    }
}
