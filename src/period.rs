//! Time windows: splitting a span into atomic periods and grouping them by the
//! time-bound assumptions active in each.
//!
//! Given the span `[0, 60)` and assumptions `x @ [0, 30)`, `y @ [15, 60)`, the
//! atomic periods are `[0, 15)`, `[15, 30)` and `[30, 60)`, with active sets
//! `{x}`, `{x, y}` and `{y}`.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use log::trace;
use serde::{Deserialize, Serialize};

use crate::types::Period;

/// An assumption that only has to hold during `period`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeBound {
    pub id: String,
    pub period: Period,
}

/// A primitive introduced for one atomic period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodVariable {
    pub id: String,
    pub period: Period,
}

/// Name of the primitive for the `index`-th atomic period.
pub fn period_variable_name(index: usize) -> String {
    format!("period_{}", index)
}

/// The smallest period covering every time-bound assumption, if there is any.
pub fn span_of(bounds: &[TimeBound]) -> Option<Period> {
    bounds
        .iter()
        .map(|b| b.period)
        .reduce(|acc, p| acc.hull(&p))
}

/// Splits `span` at every endpoint of `bounds` that falls strictly inside it.
///
/// The result is chronological, non-overlapping, and covers `span` exactly.
pub fn atomic_periods(span: &Period, bounds: &[TimeBound]) -> Vec<Period> {
    let mut cuts: BTreeSet<DateTime<Utc>> = BTreeSet::new();
    cuts.insert(span.from());
    cuts.insert(span.to());
    for bound in bounds {
        for t in [bound.period.from(), bound.period.to()] {
            if span.from() < t && t < span.to() {
                cuts.insert(t);
            }
        }
    }
    let cuts: Vec<_> = cuts.into_iter().collect();
    cuts.windows(2)
        .filter_map(|w| Period::new(w[0], w[1]).ok())
        .collect()
}

/// Groups atomic periods (by index) by the ids of the assumptions active in them.
///
/// Periods without any active assumption are left out. Groups appear in the
/// order of their earliest period; ids keep the order of `bounds`.
pub fn group_by_active(atoms: &[Period], bounds: &[TimeBound]) -> IndexMap<Vec<String>, Vec<usize>> {
    let mut groups: IndexMap<Vec<String>, Vec<usize>> = IndexMap::new();
    for (i, atom) in atoms.iter().enumerate() {
        let mut active: Vec<String> = Vec::new();
        for bound in bounds.iter().filter(|b| b.period.covers(atom)) {
            if !active.contains(&bound.id) {
                active.push(bound.id.clone());
            }
        }
        if active.is_empty() {
            continue;
        }
        trace!("period {} {} -> {:?}", i, atom, active);
        groups.entry(active).or_default().push(i);
    }
    groups
}

/// Index of the atomic period containing `time`.
pub fn locate(periods: &[PeriodVariable], time: DateTime<Utc>) -> Option<usize> {
    periods.iter().position(|p| p.period.contains(time))
}
