//! Sparse sharing-probability model.
//!
//! A requested density alone would make the expected number of sharing edges
//! grow quadratically with the population. The effective probability is the
//! smaller of a density-driven cap and a volume-driven cap, so the expected
//! edge count stays near `count_scale` however large the population gets,
//! while small populations still honour the caller's density.

/// Scale factors feeding [`effective_probability`] for one attribute family.
///
/// # Examples
/// ```
/// use fraudnet_core::DensityScales;
///
/// let scales = DensityScales::USER;
/// assert_eq!(scales.count_scale, 8.0);
/// assert_eq!(scales.density_scale, 0.1);
/// assert_eq!(scales.probability(1.0, 1_000), 0.008);
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DensityScales {
    /// Expected number of sharing events the volume cap aims for.
    pub count_scale: f64,
    /// Multiplier applied to the clamped requested density.
    pub density_scale: f64,
}

impl DensityScales {
    /// Scales used for the user attribute family.
    pub const USER: Self = Self {
        count_scale: 8.0,
        density_scale: 0.1,
    };

    /// Scales used for the transaction attribute family.
    pub const TRANSACTION: Self = Self {
        count_scale: 6.0,
        density_scale: 0.08,
    };

    /// Applies [`effective_probability`] with these scales.
    #[must_use]
    pub fn probability(self, density: f64, candidate_count: usize) -> f64 {
        effective_probability(
            density,
            candidate_count,
            self.count_scale,
            self.density_scale,
        )
    }

    pub(crate) fn is_valid(self) -> bool {
        self.count_scale.is_finite()
            && self.count_scale >= 0.0
            && self.density_scale.is_finite()
            && self.density_scale >= 0.0
    }
}

/// Maps a requested density and population size to the per-candidate
/// sharing probability actually used by the sharing engine.
///
/// Returns `0.0` when `candidate_count` is zero or `density` is not
/// positive (including NaN). Otherwise returns
/// `min(clamp(density, 0, 1) * density_scale, count_scale / candidate_count)`
/// clamped into `[0, 1]`.
///
/// # Examples
/// ```
/// use fraudnet_core::effective_probability;
///
/// // Small population: the density cap wins.
/// assert_eq!(effective_probability(0.5, 10, 8.0, 0.1), 0.05);
/// // Large population: the volume cap wins.
/// assert_eq!(effective_probability(0.5, 20_000, 8.0, 0.1), 0.0004);
/// assert_eq!(effective_probability(0.5, 0, 8.0, 0.1), 0.0);
/// ```
#[must_use]
#[expect(
    clippy::cast_precision_loss,
    reason = "population sizes are far below 2^52"
)]
pub fn effective_probability(
    density: f64,
    candidate_count: usize,
    count_scale: f64,
    density_scale: f64,
) -> f64 {
    if candidate_count == 0 || density.is_nan() || density <= 0.0 {
        return 0.0;
    }
    let by_density = density.clamp(0.0, 1.0) * density_scale;
    let by_count = count_scale / candidate_count as f64;
    let probability = by_density.min(by_count);
    if probability.is_nan() {
        return 0.0;
    }
    probability.clamp(0.0, 1.0)
}
