//! Analytic collision probabilities for 2-stable Euclidean hashing.
//!
//! For a single hash function `floor((<a, v> + b) / w)` with Gaussian `a`
//! and `b` uniform in `[0, w)`, two points at distance `c` collide with
//!
//! ```text
//! p(c) = 1 - 2 Phi(-w/c) - 2 / (sqrt(2 pi) w/c) * (1 - exp(-(w/c)^2 / 2))
//! ```
//!
//! Combining `l` independent functions into one key gives `p(c)^l`.

use std::f64::consts::{PI, SQRT_2};

/// Probability that one hash function puts two points at `distance` into the
/// same bucket of width `width`.
pub fn collision_probability(distance: f64, width: f64) -> f64 {
    if distance <= 0.0 {
        return 1.0;
    }
    let r = width / distance;
    let p = 1.0 - 2.0 * normal_cdf(-r) - 2.0 / ((2.0 * PI).sqrt() * r) * (1.0 - (-r * r / 2.0).exp());
    p.clamp(0.0, 1.0)
}

/// Probability that all `l` combined functions agree.
pub fn combined_collision_probability(distance: f64, width: f64, l: usize) -> f64 {
    collision_probability(distance, width).powi(l as i32)
}

/// Smallest `l` in `1..=64` whose combined collision probability at
/// `far_distance` does not exceed `max_far_collision`.
pub fn suggest_num_projections(width: f64, far_distance: f64, max_far_collision: f64) -> usize {
    let p = collision_probability(far_distance, width);
    (1..=64usize)
        .find(|&l| p.powi(l as i32) <= max_far_collision)
        .unwrap_or(64)
}

/// Standard normal CDF.
pub(crate) fn normal_cdf(x: f64) -> f64 {
    0.5 * erfc(-x / SQRT_2)
}

// Abramowitz & Stegun 7.1.26, absolute error below 1.5e-7.
fn erfc(x: f64) -> f64 {
    if x < 0.0 {
        return 2.0 - erfc(-x);
    }
    let t = 1.0 / (1.0 + 0.327_591_1 * x);
    let poly = t
        * (0.254_829_592
            + t * (-0.284_496_736 + t * (1.421_413_741 + t * (-1.453_152_027 + t * 1.061_405_429))));
    poly * (-x * x).exp()
}
