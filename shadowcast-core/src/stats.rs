//! Statistical primitives shared by every scoring layer.
//!
//! All functions are pure and guard their own domains: zero denominators yield
//! `None` or NaN instead of dividing, and probabilities are clamped into
//! `(ε, 1 − ε)` before a log-odds transform.

/// Two-sided 95% normal quantile.
pub const Z_95: f64 = 1.959_963_984_540_054;

/// Probability clamp used before taking log-odds.
pub const LOGIT_EPS: f64 = 1e-6;

// ─── Scalars ─────────────────────────────────────────────────────────

pub fn clamp(x: f64, lo: f64, hi: f64) -> f64 {
    x.max(lo).min(hi)
}

/// Log-odds with the input clamped into `[LOGIT_EPS, 1 − LOGIT_EPS]`.
pub fn logit(p: f64) -> f64 {
    let q = clamp(p, LOGIT_EPS, 1.0 - LOGIT_EPS);
    (q / (1.0 - q)).ln()
}

/// Numerically stable logistic function.
pub fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

/// Beta-prior shrinkage of `k` successes in `n` trials toward `a0 / (a0 + b0)`.
///
/// Returns NaN only when the prior and the sample are both empty.
pub fn beta_shrink(k: f64, n: f64, a0: f64, b0: f64) -> f64 {
    let denom = n + a0 + b0;
    if denom <= 0.0 {
        return f64::NAN;
    }
    (k + a0) / denom
}

/// `k / n`, or `None` when `n` is zero.
pub fn ratio(k: f64, n: f64) -> Option<f64> {
    if n > 0.0 {
        Some(k / n)
    } else {
        None
    }
}

/// Exponential decay weight for an observation `age` years old.
///
/// `None` half-life means no decay (weight 1). Non-positive half-lives are
/// treated as a tiny positive value so the weight stays finite.
pub fn decay_weight(age: f64, half_life: Option<f64>) -> f64 {
    match half_life {
        None => 1.0,
        Some(h) => {
            let lambda = std::f64::consts::LN_2 / h.max(1e-9);
            (-lambda * age).exp()
        }
    }
}

// ─── Wilson score interval ───────────────────────────────────────────

/// Wilson score interval for `k` successes out of `n` at normal quantile `z`.
///
/// Returns `None` when `n` is zero.
pub fn wilson_interval(k: f64, n: f64, z: f64) -> Option<(f64, f64)> {
    if n <= 0.0 {
        return None;
    }
    let p_hat = clamp(k / n, 0.0, 1.0);
    let z2 = z * z;
    let denom = 1.0 + z2 / n;
    let centre = p_hat + z2 / (2.0 * n);
    let margin = z * ((p_hat * (1.0 - p_hat) + z2 / (4.0 * n)).max(0.0) / n).sqrt();
    let low = clamp((centre - margin) / denom, 0.0, 1.0);
    let high = clamp((centre + margin) / denom, 0.0, 1.0);
    Some((low, high))
}

/// Half the width of the 95% Wilson interval, or `None` when `n` is zero.
pub fn wilson_half_width(k: f64, n: f64) -> Option<f64> {
    wilson_interval(k, n, Z_95).map(|(lo, hi)| (hi - lo) / 2.0)
}

// ─── Ordered samples ─────────────────────────────────────────────────

/// The element at index `len / 2` of an ascending slice (upper median).
///
/// Used as the early/late split point: years strictly below it are the early
/// half, the rest the late half.
pub fn split_point<T: Copy>(sorted: &[T]) -> Option<T> {
    sorted.get(sorted.len() / 2).copied()
}
