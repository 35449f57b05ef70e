//! Confidence-gated fusion ("dynamic super") and the hedge blend.
//!
//! For each year: rank the columns on their recent record and keep the top K,
//! run the advanced stacked model on them, and accept its call only if it is
//! confident and enough columns voted. Otherwise fall back to a weighted blend
//! of the same columns. An untrusted stacked call still beats an abstaining
//! blend; the plain majority of the year's raw predictions is used only when
//! both abstain.

use serde::{Deserialize, Serialize};

use shadowcast_core::domain::{Forecast, Outcome, Year};
use shadowcast_core::stats::logit;

use super::matrix::CandidateMatrix;
use super::meta_vote::{meta_best, MetaConfig};
use super::profiles::{BlendConfig, HedgeWeights, TuningProfile};
use super::stacking::stacked_forecast;
use super::track_record::track_record;

/// Which tier of the fallback chain produced a gated forecast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateTier {
    Stacked,
    Blend,
    Majority,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GatedForecast {
    pub forecast: Forecast,
    pub tier: GateTier,
    pub columns: Vec<usize>,
}

// ─── Column selection ────────────────────────────────────────────────

/// Top-K columns by shrunk accuracy over the rank window, ties to more
/// history. Columns below `min_config_years` are skipped; when nothing
/// qualifies (or there is no history yet) every column is returned.
pub fn select_top_columns(matrix: &CandidateMatrix, year: Year, profile: &TuningProfile) -> Vec<usize> {
    let all: Vec<usize> = (0..matrix.width()).collect();
    let train = matrix.train_years(year, profile.rank_window_years);
    if train.is_empty() {
        return all;
    }

    let mut scored: Vec<(usize, f64, f64)> = all
        .iter()
        .filter_map(|&c| {
            let r = track_record(matrix, c, &train, year, profile.rank_decay_half_life);
            (r.accuracy.is_finite() && r.n >= profile.min_config_years).then(|| (c, r.shrunk(), r.n))
        })
        .collect();
    if scored.is_empty() {
        return all;
    }
    // Stable sort keeps column order on exact ties.
    scored.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(b.2.partial_cmp(&a.2).unwrap_or(std::cmp::Ordering::Equal))
    });
    let top_k = profile.top_k.clamp(1, scored.len());
    scored.into_iter().take(top_k).map(|(c, _, _)| c).collect()
}

// ─── Blend ───────────────────────────────────────────────────────────

/// Strength-weighted blend of `columns` with windowed log-odds weights.
///
/// Weight per column: `logit(p) · (1 + ln(1 + n)/3) · (1 + boost · (stability − 0.5))`
/// where `p = (k + 2)/(n + 4)`. Abstains with fewer than `min_train` training
/// years or when no weighted column calls `year`.
pub fn weighted_blend(
    matrix: &CandidateMatrix,
    year: Year,
    columns: &[usize],
    blend: &BlendConfig,
    min_config_years: f64,
) -> Forecast {
    let train = matrix.train_years(year, blend.window_years);
    if train.len() < blend.min_train {
        return Forecast::abstain();
    }
    let (mut score, mut total_abs, mut used) = (0.0, 0.0, 0usize);
    for &c in columns {
        let r = track_record(matrix, c, &train, year, blend.decay_half_life);
        if r.n < min_config_years {
            continue;
        }
        let stability_factor = 1.0 + blend.stability_boost * (r.stability - 0.5);
        let weight = logit(r.shrunk()) * (1.0 + r.n.ln_1p() / 3.0) * stability_factor;
        let cell = matrix.cell(year, c);
        if cell.is_abstain() {
            continue;
        }
        score += weight * cell.strength();
        total_abs += weight.abs();
        used += 1;
    }
    if total_abs <= 0.0 {
        return Forecast::abstain();
    }
    Forecast::new(Outcome::from_score(score), (score.abs() / total_abs).min(1.0), used)
}

// ─── Gated fusion ────────────────────────────────────────────────────

pub fn dynamic_super(matrix: &CandidateMatrix, year: Year, profile: &TuningProfile) -> GatedForecast {
    let columns = select_top_columns(matrix, year, profile);
    let stacked = stacked_forecast(matrix, year, &columns, &profile.stack);
    let used_ratio = if columns.is_empty() {
        0.0
    } else {
        stacked.used as f64 / columns.len() as f64
    };
    let trusted = !stacked.is_abstain()
        && stacked.certainty >= profile.gate
        && stacked.used >= profile.min_models
        && used_ratio >= profile.min_used_ratio;

    let (forecast, tier) = if trusted {
        (stacked, GateTier::Stacked)
    } else {
        let blended = weighted_blend(matrix, year, &columns, &profile.blend, profile.min_config_years);
        if !blended.is_abstain() {
            (blended, GateTier::Blend)
        } else if !stacked.is_abstain() {
            (stacked, GateTier::Stacked)
        } else {
            (matrix.majority(year), GateTier::Majority)
        }
    };
    GatedForecast {
        forecast,
        tier,
        columns,
    }
}

/// Meta-best configured from a profile's ranking parameters.
pub fn profile_meta_config(profile: &TuningProfile) -> MetaConfig {
    MetaConfig {
        window_years: profile.rank_window_years,
        decay_half_life: profile.rank_decay_half_life,
        min_config_years: profile.min_config_years,
    }
}

/// Fixed-weight blend of the gated forecast, meta-best and majority strengths.
pub fn hedge(
    matrix: &CandidateMatrix,
    year: Year,
    profile: &TuningProfile,
    weights: HedgeWeights,
) -> Forecast {
    let parts = [
        (weights.gated, dynamic_super(matrix, year, profile).forecast),
        (weights.best, meta_best(matrix, year, &profile_meta_config(profile))),
        (weights.majority, matrix.majority(year)),
    ];
    let (mut score, mut total, mut used) = (0.0, 0.0, 0usize);
    for (w, f) in parts {
        if f.is_abstain() || w <= 0.0 {
            continue;
        }
        score += w * f.strength();
        total += w;
        used += 1;
    }
    if total <= 0.0 {
        return Forecast::abstain();
    }
    Forecast::new(Outcome::from_score(score), (score.abs() / total).min(1.0), used)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backtest::BacktestGate;
    use crate::fusion::matrix::MatrixSource;
    use shadowcast_core::domain::{Dataset, OutcomeTable, Prediction, PredictionPanel, TargetId};

    fn actual(y: Year) -> Outcome {
        if y % 2 == 0 {
            Outcome::LongWinter
        } else {
            Outcome::EarlySpring
        }
    }

    fn matrix_with<F>(first: Year, last: Year, cell: F) -> CandidateMatrix
    where
        F: Fn(usize, Year) -> Forecast + Sync,
    {
        let t = TargetId::from("T");
        let mut preds = Vec::new();
        let mut outcomes = OutcomeTable::new();
        for y in first..=last {
            if y < last {
                outcomes.insert(t.clone(), y, actual(y));
            }
            for i in 0..4 {
                preds.push(Prediction::new(y, format!("f{i}"), false));
            }
        }
        let data = Dataset::new(PredictionPanel::from_predictions(preds), outcomes);
        CandidateMatrix::from_columns(
            &data,
            &t,
            BacktestGate { min_forecasters: 1 },
            MatrixSource::Fusion,
            (0..4).map(|i| format!("c{i}")).collect(),
            false,
            |c, years| years.iter().map(|&y| cell(c, y)).collect(),
        )
    }

    /// 4 raw forecasters saying ES. Columns: 0 perfect, 1 perfect but silent
    /// before 2025, 2 always wrong, 3 always ES.
    fn matrix(first: Year, last: Year) -> CandidateMatrix {
        matrix_with(first, last, |c, y| match c {
            0 => Forecast::new(actual(y), 0.9, 10),
            1 if y < 2025 => Forecast::abstain(),
            1 => Forecast::new(actual(y), 0.9, 10),
            2 => Forecast::new(actual(y).flipped(), 0.9, 10),
            _ => Forecast::new(Outcome::EarlySpring, 0.5, 10),
        })
    }

    fn profile() -> TuningProfile {
        TuningProfile::builtin()[0].clone()
    }

    #[test]
    fn selection_ranks_and_skips_thin_columns() {
        let m = matrix(1990, 2030);
        let mut p = profile();
        p.top_k = 2;
        // Column 1 has 5 scored years < min_config_years 8.
        assert_eq!(select_top_columns(&m, 2030, &p), vec![0, 3]);
    }

    #[test]
    fn selection_falls_back_to_all_columns() {
        let m = matrix(1990, 2030);
        assert_eq!(select_top_columns(&m, 1990, &profile()), vec![0, 1, 2, 3]);
        let mut p = profile();
        p.min_config_years = 1000.0;
        assert_eq!(select_top_columns(&m, 2030, &p), vec![0, 1, 2, 3]);
    }

    #[test]
    fn blend_inverts_the_reliably_wrong_column() {
        let m = matrix(1990, 2030);
        let p = profile();
        let f = weighted_blend(&m, 2030, &[2], &p.blend, p.min_config_years);
        assert_eq!(f.pred, Some(actual(2030)));
        assert_eq!(f.used, 1);
    }

    #[test]
    fn stacked_tier_on_clean_history() {
        let m = matrix(1960, 2030);
        let g = dynamic_super(&m, 2030, &profile());
        assert_eq!(g.tier, GateTier::Stacked);
        assert_eq!(g.forecast.pred, Some(actual(2030)));
    }

    #[test]
    fn short_history_falls_to_blend_then_majority() {
        // 9 training years: stacked needs 12, blend needs 8. Decayed records
        // that short only clear a lowered min_config_years.
        let m = matrix(2021, 2030);
        let mut p = profile();
        p.min_config_years = 4.0;
        let g = dynamic_super(&m, 2030, &p);
        assert_eq!(g.tier, GateTier::Blend);
        assert_eq!(g.forecast.pred, Some(actual(2030)));
        assert_eq!(dynamic_super(&m, 2030, &profile()).tier, GateTier::Majority);
        // 5 training years: every tier but majority abstains.
        let m = matrix(2025, 2030);
        let g = dynamic_super(&m, 2030, &profile());
        assert_eq!(g.tier, GateTier::Majority);
        assert_eq!(g.forecast.pred, Some(Outcome::EarlySpring));
        assert_eq!(g.forecast.used, 4);
    }

    #[test]
    fn failed_gate_falls_to_blend() {
        let m = matrix(1960, 2030);
        let mut p = profile();
        p.gate = 1.01;
        let g = dynamic_super(&m, 2030, &p);
        assert_eq!(g.tier, GateTier::Blend);
        assert_eq!(g.forecast.pred, Some(actual(2030)));
    }

    #[test]
    fn untrusted_stacked_call_beats_abstaining_blend() {
        let m = matrix(1960, 2030);
        let mut p = profile();
        p.gate = 1.01;
        p.blend.min_train = 1000;
        let g = dynamic_super(&m, 2030, &p);
        let stacked = stacked_forecast(&m, 2030, &g.columns, &p.stack);
        assert!(!stacked.is_abstain());
        assert_eq!(g.tier, GateTier::Stacked);
        assert_eq!(g.forecast, stacked);
        assert_ne!(g.forecast.pred, m.majority(2030).pred);
    }

    #[test]
    fn low_used_ratio_alone_fails_the_gate() {
        // Column 3 is silent in the nowcast year, so the stacked model
        // sees 2 of the 3 selected columns vote.
        let m = matrix_with(1960, 2030, |c, y| match c {
            0 => Forecast::new(actual(y), 0.9, 10),
            1 => Forecast::abstain(),
            2 => Forecast::new(actual(y).flipped(), 0.9, 10),
            _ if y == 2030 => Forecast::abstain(),
            _ => Forecast::new(Outcome::EarlySpring, 0.5, 10),
        });
        let mut p = profile();
        p.gate = 0.0;
        p.min_models = 1;
        p.min_used_ratio = 0.5;
        let g = dynamic_super(&m, 2030, &p);
        assert_eq!(g.columns.len(), 3);
        assert_eq!(g.tier, GateTier::Stacked);
        assert_eq!(g.forecast.used, 2);

        p.min_used_ratio = 0.9;
        let g = dynamic_super(&m, 2030, &p);
        assert_eq!(g.tier, GateTier::Blend);
        assert_eq!(g.forecast.pred, Some(actual(2030)));
    }

    #[test]
    fn hedge_combines_available_parts() {
        let m = matrix(2025, 2030);
        // Only majority is available: ES at certainty 1.
        let f = hedge(&m, 2030, &profile(), HedgeWeights::default());
        assert_eq!(f.pred, Some(Outcome::EarlySpring));
        assert_eq!(f.used, 2);

        let m = matrix(1960, 2030);
        let f = hedge(&m, 2030, &profile(), HedgeWeights::default());
        assert_eq!(f.pred, Some(actual(2030)));
        assert_eq!(f.used, 3);
    }
}
