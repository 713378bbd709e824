//! Fixed sampling primitives shared by every stochastic subsystem.
//!
//! All distributions are written out explicitly rather than delegated to a
//! distribution crate so that the byte-for-byte replay guarantee cannot be
//! broken by an upstream algorithm change.

use rand::Rng;

/// Clamp a value into `[min, max]`, tolerating non-finite inputs.
#[must_use]
pub fn clamp(min: f64, max: f64, value: f64) -> f64 {
    if !value.is_finite() {
        return min;
    }
    value.clamp(min, max)
}

/// Clamp a value into the unit interval.
#[must_use]
pub fn clamp01(value: f64) -> f64 {
    clamp(0.0, 1.0, value)
}

/// Draw from a normal distribution via the Box-Muller transform.
///
/// Consumes exactly two uniform draws per call regardless of the result.
pub fn normal<R: Rng + ?Sized>(rng: &mut R, mean: f64, std_dev: f64) -> f64 {
    let mut u1: f64 = rng.r#gen();
    let u2: f64 = rng.r#gen();
    if u1 <= f64::MIN_POSITIVE {
        u1 = f64::MIN_POSITIVE;
    }
    let z = (-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos();
    mean + std_dev * z
}

/// Draw from a Poisson distribution via Knuth's product method.
///
/// Returns 0 for non-positive or non-finite rates.
pub fn poisson<R: Rng + ?Sized>(rng: &mut R, lambda: f64) -> u32 {
    if !lambda.is_finite() || lambda <= 0.0 {
        return 0;
    }
    let limit = (-lambda).exp();
    let mut k: u32 = 0;
    let mut product: f64 = 1.0;
    loop {
        k += 1;
        product *= rng.r#gen::<f64>();
        if product <= limit {
            return k - 1;
        }
    }
}

/// Symmetric integer jitter in `[-spread, spread]` inclusive.
pub fn int_jitter<R: Rng + ?Sized>(rng: &mut R, spread: i64) -> i64 {
    if spread <= 0 {
        return 0;
    }
    rng.gen_range(-spread..=spread)
}

/// Uniform draw from `[min, max]`, degrading to `min` when the range is empty.
pub fn uniform<R: Rng + ?Sized>(rng: &mut R, min: f64, max: f64) -> f64 {
    if max <= min {
        return min;
    }
    min + (max - min) * rng.r#gen::<f64>()
}

/// Uniform integer draw from `[min, max]` inclusive.
pub fn uniform_u32<R: Rng + ?Sized>(rng: &mut R, min: u32, max: u32) -> u32 {
    if max <= min {
        return min;
    }
    rng.gen_range(min..=max)
}

/// Pick an index by cumulative weight scan. Non-finite and negative weights
/// count as zero. Returns `None` when no weight is positive.
pub fn weighted_index<R: Rng + ?Sized>(rng: &mut R, weights: &[f64]) -> Option<usize> {
    let total: f64 = weights
        .iter()
        .map(|w| if w.is_finite() && *w > 0.0 { *w } else { 0.0 })
        .sum();
    if total <= 0.0 {
        return None;
    }
    let roll = rng.r#gen::<f64>() * total;
    let mut cumulative = 0.0;
    for (idx, weight) in weights.iter().enumerate() {
        if weight.is_finite() && *weight > 0.0 {
            cumulative += weight;
            if roll < cumulative {
                return Some(idx);
            }
        }
    }
    // Roll landed exactly on the total; fall back to the last positive weight.
    weights
        .iter()
        .rposition(|w| w.is_finite() && *w > 0.0)
}
