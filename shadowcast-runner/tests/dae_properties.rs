//! Property tests for the data adequacy epoch gate.

use proptest::prelude::*;

use shadowcast_runner::{first_adequate_year, DaeConfig, DaeRow};

/// A trace of `outcomes.len()` scored years from 1950 with growing panels.
fn rows(outcomes: &[bool], voters: &[usize]) -> Vec<DaeRow> {
    let mut k = 0;
    outcomes
        .iter()
        .zip(voters)
        .enumerate()
        .map(|(i, (&correct, &v))| {
            k += usize::from(correct);
            DaeRow {
                year: 1950 + i as i32,
                cum_n: i + 1,
                cum_k: k,
                voters: v,
                experienced_voters: v.saturating_sub(i.min(5)),
            }
        })
        .collect()
}

fn config() -> impl Strategy<Value = DaeConfig> {
    (1usize..40, 0.05f64..0.5, 0usize..30).prop_map(|(years, hw, groundhogs)| DaeConfig {
        min_backtest_years: years,
        max_ci_half_width: hw,
        min_groundhogs: groundhogs,
        min_obs_per_groundhog: 5,
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Tightening any threshold never makes the epoch earlier.
    #[test]
    fn tighter_gate_is_never_earlier(
        outcomes in prop::collection::vec(any::<bool>(), 1..80),
        voters in prop::collection::vec(0usize..40, 80),
        loose in config(),
        extra_years in 0usize..10,
        shrink in 0.0f64..0.04,
        extra_groundhogs in 0usize..10,
    ) {
        let rows = rows(&outcomes, &voters);
        let tight = DaeConfig {
            min_backtest_years: loose.min_backtest_years + extra_years,
            max_ci_half_width: loose.max_ci_half_width - shrink,
            min_groundhogs: loose.min_groundhogs + extra_groundhogs,
            ..loose.clone()
        };
        let (a, b) = (first_adequate_year(&rows, &loose), first_adequate_year(&rows, &tight));
        match (a, b) {
            (None, Some(_)) => prop_assert!(false, "tight gate passed where loose failed"),
            (Some(a), Some(b)) => prop_assert!(b >= a),
            _ => {}
        }
    }

    /// The epoch row satisfies every threshold.
    #[test]
    fn epoch_row_meets_all_thresholds(
        outcomes in prop::collection::vec(any::<bool>(), 1..80),
        voters in prop::collection::vec(0usize..40, 80),
        cfg in config(),
    ) {
        let rows = rows(&outcomes, &voters);
        if let Some(year) = first_adequate_year(&rows, &cfg) {
            let row = rows.iter().find(|r| r.year == year).unwrap();
            prop_assert!(row.cum_n >= cfg.min_backtest_years);
            prop_assert!(row.voters >= cfg.min_groundhogs);
            prop_assert!(row.experienced_voters >= cfg.min_groundhogs);
        }
    }
}
