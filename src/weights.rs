//! Lexicographic objective weights.
//!
//! A single linear objective has to reproduce a strict ranking of concerns:
//!
//! ```text
//! later selection > earlier selection > preferences > not-selected penalty > later period
//! ```
//!
//! Each level gets a magnitude strictly larger than everything below it can add
//! up to, so no combination of lower-level gains can outweigh one higher-level
//! decision. Selection weights therefore roughly double at each priority step.

use indexmap::{IndexMap, IndexSet};
use log::{debug, warn};

use crate::error::{Error, Result};
use crate::types::Action;

/// Constants of the weight encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeightConfig {
    /// Weight of a selectable variable no selection mentions (default: -2).
    pub not_selected: i64,
    /// Period step as a multiple of `not_selected` (default: 6).
    pub period_factor: i64,
    /// Magnitude above which a solution is flagged as saturated (default: 2^55).
    pub saturation_threshold: i64,
}

impl Default for WeightConfig {
    fn default() -> Self {
        Self {
            not_selected: -2,
            period_factor: 6,
            saturation_threshold: 1 << 55,
        }
    }
}

impl WeightConfig {
    /// Weight step between consecutive periods.
    pub fn period_step(&self) -> i64 {
        self.not_selected * self.period_factor
    }
}

/// The column a selection's weight lands on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub column: String,
    pub action: Action,
}

/// Inputs of the derivation, all by column id.
#[derive(Debug, Clone, Copy)]
pub struct WeightInputs<'a> {
    pub selectable: &'a IndexSet<String>,
    /// Every id mentioned by a selection, sub-selections included.
    pub covered: &'a IndexSet<String>,
    pub preferred: &'a IndexSet<String>,
    /// Period ids, chronologically.
    pub periods: &'a [String],
    /// Selections in priority order, lowest first.
    pub targets: &'a [Target],
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Weights {
    values: IndexMap<String, i64>,
    saturated: Option<Error>,
}

fn overflow(id: &str, weight: i64, config: &WeightConfig) -> Error {
    Error::WeightSaturated {
        id: id.to_string(),
        weight,
        threshold: config.saturation_threshold,
    }
}

impl Weights {
    pub fn derive(inputs: WeightInputs<'_>, config: &WeightConfig) -> Result<Self> {
        let mut values: IndexMap<String, i64> = IndexMap::new();

        // Not-selected penalty.
        let mut sum_ns: i64 = 0;
        for id in inputs.selectable.iter().filter(|id| !inputs.covered.contains(*id)) {
            values.insert(id.clone(), config.not_selected);
            sum_ns = sum_ns
                .checked_add(config.not_selected)
                .ok_or_else(|| overflow(id, sum_ns, config))?;
        }

        // Preferences, strictly above all not-selected penalties combined.
        let preferred_weight = if sum_ns == 0 { 0 } else { sum_ns - 1 };
        let mut sum_pref: i64 = 0;
        for id in inputs.preferred {
            values.insert(id.clone(), preferred_weight);
            sum_pref = sum_pref
                .checked_add(preferred_weight)
                .ok_or_else(|| overflow(id, sum_pref, config))?;
        }

        // Periods, earliest first at zero.
        let step = config.period_step();
        let mut min_period: i64 = 0;
        for (i, id) in inputs.periods.iter().enumerate() {
            let weight = (i as i64).checked_mul(step).ok_or_else(|| overflow(id, step, config))?;
            values.insert(id.clone(), weight);
            min_period = weight;
        }

        let mut threshold = sum_ns
            .checked_add(sum_pref)
            .and_then(|s| s.checked_add(min_period))
            .and_then(i64::checked_neg)
            .ok_or_else(|| overflow("threshold", sum_ns, config))?;
        debug!(
            "derive: sum_ns = {}, sum_pref = {}, min_period = {}, threshold = {}",
            sum_ns, sum_pref, min_period, threshold
        );

        for target in inputs.targets {
            let delta = threshold
                .checked_add(1)
                .ok_or_else(|| overflow(&target.column, threshold, config))?;
            let weight = if target.action.is_add() { delta } else { -delta };
            values.insert(target.column.clone(), weight);
            threshold = threshold
                .checked_add(delta)
                .ok_or_else(|| overflow(&target.column, delta, config))?;
        }

        let saturated = values
            .iter()
            .find(|(_, w)| w.unsigned_abs() > config.saturation_threshold.unsigned_abs())
            .map(|(id, &w)| overflow(id, w, config));
        if let Some(err) = &saturated {
            warn!("derive: {}", err);
        }

        Ok(Self { values, saturated })
    }

    pub fn get(&self, id: &str) -> Option<i64> {
        self.values.get(id).copied()
    }

    pub fn values(&self) -> &IndexMap<String, i64> {
        &self.values
    }

    /// Informational [`Error::WeightSaturated`] for the first weight past the threshold.
    pub fn saturated(&self) -> Option<&Error> {
        self.saturated.as_ref()
    }
}
