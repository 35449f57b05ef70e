//! Prediction panel and outcome table — the two inputs every layer reads.
//!
//! Both are immutable after construction. The panel keeps predictions grouped
//! by year and ordered by forecaster id so that every vote is computed in the
//! same order on every run.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use super::ids::{ForecasterId, TargetId};
use super::outcome::Outcome;

/// Calendar year of a forecast.
pub type Year = i32;

/// A single forecaster's call for a single year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prediction {
    pub year: Year,
    pub forecaster: ForecasterId,
    pub shadow_seen: bool,
}

impl Prediction {
    pub fn new(year: Year, forecaster: impl Into<String>, shadow_seen: bool) -> Self {
        Self {
            year,
            forecaster: ForecasterId::new(forecaster),
            shadow_seen,
        }
    }

    /// The outcome this prediction votes for.
    pub fn outcome(&self) -> Outcome {
        Outcome::from_shadow(self.shadow_seen)
    }
}

/// Predictions grouped by year, each year sorted by forecaster id.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PredictionPanel {
    by_year: BTreeMap<Year, Vec<Prediction>>,
}

impl PredictionPanel {
    pub fn from_predictions(predictions: impl IntoIterator<Item = Prediction>) -> Self {
        let mut by_year: BTreeMap<Year, Vec<Prediction>> = BTreeMap::new();
        for p in predictions {
            by_year.entry(p.year).or_default().push(p);
        }
        for preds in by_year.values_mut() {
            preds.sort_by(|a, b| a.forecaster.cmp(&b.forecaster));
        }
        Self { by_year }
    }

    /// Predictions for a year (empty slice when there are none).
    pub fn year(&self, year: Year) -> &[Prediction] {
        self.by_year.get(&year).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of forecasters who made a call in `year`.
    pub fn count(&self, year: Year) -> usize {
        self.year(year).len()
    }

    /// All panel years, ascending.
    pub fn years(&self) -> impl Iterator<Item = Year> + '_ {
        self.by_year.keys().copied()
    }

    /// Panel years strictly before `cutoff`, ascending.
    pub fn years_before(&self, cutoff: Year) -> impl Iterator<Item = Year> + '_ {
        self.by_year.range(..cutoff).map(|(y, _)| *y)
    }

    pub fn first_year(&self) -> Option<Year> {
        self.by_year.keys().next().copied()
    }

    pub fn last_year(&self) -> Option<Year> {
        self.by_year.keys().next_back().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.by_year.is_empty()
    }

    /// Total number of predictions across all years.
    pub fn len(&self) -> usize {
        self.by_year.values().map(Vec::len).sum()
    }

    /// Replace one year's predictions (re-sorted). Used to build perturbed
    /// panels in tests and what-if runs.
    pub fn with_year(mut self, year: Year, predictions: Vec<Prediction>) -> Self {
        let mut preds = predictions;
        preds.sort_by(|a, b| a.forecaster.cmp(&b.forecaster));
        if preds.is_empty() {
            self.by_year.remove(&year);
        } else {
            self.by_year.insert(year, preds);
        }
        self
    }
}

/// Ground truth keyed by (target, year).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutcomeTable {
    by_target: HashMap<TargetId, BTreeMap<Year, Outcome>>,
}

impl OutcomeTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, target: TargetId, year: Year, outcome: Outcome) {
        self.by_target.entry(target).or_default().insert(year, outcome);
    }

    /// Remove a single observation (what-if / perturbation support).
    pub fn remove(&mut self, target: &TargetId, year: Year) -> Option<Outcome> {
        self.by_target.get_mut(target).and_then(|m| m.remove(&year))
    }

    pub fn get(&self, target: &TargetId, year: Year) -> Option<Outcome> {
        self.by_target.get(target).and_then(|m| m.get(&year).copied())
    }

    pub fn contains(&self, target: &TargetId, year: Year) -> bool {
        self.get(target, year).is_some()
    }

    /// Years with a known outcome for `target`, ascending.
    pub fn years(&self, target: &TargetId) -> Vec<Year> {
        self.by_target
            .get(target)
            .map(|m| m.keys().copied().collect())
            .unwrap_or_default()
    }

    /// Known targets, sorted for deterministic iteration.
    pub fn targets(&self) -> Vec<TargetId> {
        let mut targets: Vec<TargetId> = self.by_target.keys().cloned().collect();
        targets.sort();
        targets
    }

    pub fn len(&self) -> usize {
        self.by_target.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl FromIterator<(TargetId, Year, Outcome)> for OutcomeTable {
    fn from_iter<I: IntoIterator<Item = (TargetId, Year, Outcome)>>(iter: I) -> Self {
        let mut table = Self::new();
        for (target, year, outcome) in iter {
            table.insert(target, year, outcome);
        }
        table
    }
}

/// The two already-parsed inputs, bundled.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Dataset {
    pub panel: PredictionPanel,
    pub outcomes: OutcomeTable,
}

impl Dataset {
    pub fn new(panel: PredictionPanel, outcomes: OutcomeTable) -> Self {
        Self { panel, outcomes }
    }

    /// Outcome for `target` in `year`, if known.
    pub fn outcome(&self, target: &TargetId, year: Year) -> Option<Outcome> {
        self.outcomes.get(target, year)
    }

    /// Panel years before `cutoff` that have a known outcome for `target`.
    ///
    /// This is the only view of history that training code is allowed to use.
    pub fn history_before(&self, target: &TargetId, cutoff: Year) -> Vec<Year> {
        self.panel
            .years_before(cutoff)
            .filter(|y| self.outcomes.contains(target, *y))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panel_sorts_each_year_by_forecaster() {
        let panel = PredictionPanel::from_predictions(vec![
            Prediction::new(2000, "zeta", true),
            Prediction::new(2000, "alpha", false),
            Prediction::new(1999, "mid", false),
        ]);
        let ids: Vec<&str> = panel.year(2000).iter().map(|p| p.forecaster.as_str()).collect();
        assert_eq!(ids, vec!["alpha", "zeta"]);
        assert_eq!(panel.years().collect::<Vec<_>>(), vec![1999, 2000]);
        assert_eq!(panel.len(), 3);
    }

    #[test]
    fn missing_year_is_empty_slice() {
        let panel = PredictionPanel::default();
        assert!(panel.year(1950).is_empty());
        assert_eq!(panel.count(1950), 0);
        assert!(panel.last_year().is_none());
    }

    #[test]
    fn history_before_excludes_cutoff_and_unknown_years() {
        let panel = PredictionPanel::from_predictions(vec![
            Prediction::new(2000, "a", true),
            Prediction::new(2001, "a", true),
            Prediction::new(2002, "a", true),
        ]);
        let target = TargetId::from("T");
        let mut outcomes = OutcomeTable::new();
        outcomes.insert(target.clone(), 2000, Outcome::LongWinter);
        outcomes.insert(target.clone(), 2002, Outcome::LongWinter);
        let data = Dataset::new(panel, outcomes);
        assert_eq!(data.history_before(&target, 2002), vec![2000]);
        assert_eq!(data.history_before(&target, 2003), vec![2000, 2002]);
    }

    #[test]
    fn outcome_targets_are_sorted() {
        let table: OutcomeTable = vec![
            (TargetId::from("B"), 2000, Outcome::EarlySpring),
            (TargetId::from("A"), 2000, Outcome::LongWinter),
        ]
        .into_iter()
        .collect();
        assert_eq!(table.targets(), vec![TargetId::from("A"), TargetId::from("B")]);
        assert_eq!(table.len(), 2);
    }
}
