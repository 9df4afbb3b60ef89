//! Working suitability for one category: normalised onto the region grid,
//! dampened in protected areas and optionally perturbed to break ties.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::AllocationConfig;
use crate::error::Result;
use crate::grid::Grid;
use crate::landuse::RegionId;
use crate::resample::ResampleMode;
use crate::resize::{conform, conform_owned};
use crate::scalar::Scalar;

// ── Auxiliary grids (prepared once per run) ───────────────────────────────────

/// Conform a protection factor grid and clamp it to `[0, 1]`.
/// NaN factors are treated as nodata.
pub(crate) fn prepare_protection(raw: &Grid<f32>, template: &Grid<RegionId>) -> Result<Grid<f32>> {
    let mut protection = conform(raw, template.cell_size(), template.extent(), ResampleMode::Mean)?;
    template.check_same_geometry(&protection, "protection grid")?;

    let nodata = protection.nodata();
    let mut clamped = 0usize;
    for v in protection.data_mut() {
        if v.is_nodata(nodata) {
            continue;
        }
        if v.is_nan() {
            *v = nodata;
        } else if !(0.0..=1.0).contains(&*v) {
            *v = v.clamp(0.0, 1.0);
            clamped += 1;
        }
    }
    if clamped > 0 {
        tracing::warn!(
            target: "landalloc::suitability",
            clamped,
            "suitability.protection.clamped"
        );
    }
    Ok(protection)
}

/// The caller's noise grid conformed to the template, or a seeded uniform
/// `[0, 1)` grid when none is supplied.
pub(crate) fn prepare_noise(
    supplied: Option<&Grid<f32>>,
    template: &Grid<RegionId>,
    seed: u64,
) -> Result<Grid<f32>> {
    let Some(raw) = supplied else {
        return generate_noise(template, seed);
    };
    let mut noise = conform(raw, template.cell_size(), template.extent(), ResampleMode::Mean)?;
    template.check_same_geometry(&noise, "noise grid")?;
    let nodata = noise.nodata();
    for v in noise.data_mut() {
        if !v.is_nodata(nodata) {
            *v = if v.is_nan() { 0.0 } else { v.clamp(0.0, 1.0) };
        }
    }
    Ok(noise)
}

/// Uniform `[0, 1)` noise over the template's cells, reproducible from `seed`.
pub fn generate_noise<U: Scalar>(template: &Grid<U>, seed: u64) -> Result<Grid<f32>> {
    let mut rng = StdRng::seed_from_u64(seed);
    let data = (0..template.len()).map(|_| rng.gen::<f32>()).collect();
    Grid::from_vec(*template.extent(), template.cell_size(), f32::default_nodata(), data)
}

// ── Per category ──────────────────────────────────────────────────────────────

/// Build the working suitability grid for one category.
pub(crate) fn prepare(
    raw: Grid<f32>,
    template: &Grid<RegionId>,
    protection: Option<&Grid<f32>>,
    noise: Option<&Grid<f32>>,
    config: &AllocationConfig,
) -> Result<Grid<f64>> {
    let working = raw.cast::<f64>(f64::default_nodata())?;
    drop(raw);
    let mut suitability = conform_owned(working, template.cell_size(), template.extent(), ResampleMode::Mean)?;
    template.check_same_geometry(&suitability, "suitability grid")?;

    // NaN cannot be ranked.
    let nodata = suitability.nodata();
    for v in suitability.data_mut() {
        if v.is_nan() {
            *v = nodata;
        }
    }

    if let Some(p) = protection {
        apply_protection(&mut suitability, p);
    }
    if let Some(n) = noise {
        apply_noise(&mut suitability, n, config);
    }
    Ok(suitability)
}

/// `suitability *= protection` wherever both hold data.
pub(crate) fn apply_protection(suitability: &mut Grid<f64>, protection: &Grid<f32>) {
    let (s_nodata, p_nodata) = (suitability.nodata(), protection.nodata());
    for (s, &p) in suitability.data_mut().iter_mut().zip(protection.data()) {
        if !s.is_nodata(s_nodata) && !p.is_nodata(p_nodata) {
            *s *= p as f64;
        }
    }
}

/// Add `noise × noise_fraction × gap`, where `gap` is the smallest distance
/// between distinct suitability values. With noise in `[0, 1]` and
/// `noise_fraction < 1` no two distinct values can swap order.
pub(crate) fn apply_noise(suitability: &mut Grid<f64>, noise: &Grid<f32>, config: &AllocationConfig) {
    let values = suitability.unique_values();
    // A single distinct value has no order to disturb.
    let gap = smallest_gap(&values, config.min_suitability_gap).unwrap_or(1.0);
    let amplitude = config.noise_fraction * gap;
    tracing::debug!(
        target: "landalloc::suitability",
        distinct = values.len(),
        gap,
        amplitude,
        "suitability.noise.applied"
    );

    let (s_nodata, n_nodata) = (suitability.nodata(), noise.nodata());
    for (s, &n) in suitability.data_mut().iter_mut().zip(noise.data()) {
        if !s.is_nodata(s_nodata) && !n.is_nodata(n_nodata) {
            *s += n as f64 * amplitude;
        }
    }
}

/// Smallest difference above `floor` between neighbours of an ascending,
/// deduplicated slice.
pub fn smallest_gap(sorted_unique: &[f64], floor: f64) -> Option<f64> {
    sorted_unique
        .windows(2)
        .map(|w| w[1] - w[0])
        .filter(|&d| d > floor)
        .min_by(|a, b| a.total_cmp(b))
}
