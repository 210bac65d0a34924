//! Selections and their reduction.
//!
//! A selection list is ordered by priority: the last entry wins every conflict.
//! [`reduce`] drops the entries a later one makes redundant, so that the weight
//! engine never spends a priority level on a selection without effect.

use std::fmt;

use indexmap::IndexSet;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::types::Action;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Selection {
    pub id: String,
    #[serde(default)]
    pub sub_selection_ids: Vec<String>,
    pub action: Action,
}

// Constructors
impl Selection {
    pub fn new(id: impl Into<String>, action: Action) -> Self {
        Self {
            id: id.into(),
            sub_selection_ids: Vec::new(),
            action,
        }
    }

    pub fn add(id: impl Into<String>) -> Self {
        Self::new(id, Action::Add)
    }

    pub fn remove(id: impl Into<String>) -> Self {
        Self::new(id, Action::Remove)
    }

    /// A selection of `id` together with `subs`.
    pub fn composite<I, S>(id: impl Into<String>, subs: I, action: Action) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id: id.into(),
            sub_selection_ids: subs.into_iter().map(Into::into).collect(),
            action,
        }
    }
}

// Getters
impl Selection {
    pub fn is_composite(&self) -> bool {
        !self.sub_selection_ids.is_empty()
    }

    /// `{id} ∪ sub_selection_ids`, with `id` first.
    pub fn ids(&self) -> IndexSet<&str> {
        std::iter::once(self.id.as_str())
            .chain(self.sub_selection_ids.iter().map(String::as_str))
            .collect()
    }

    /// Checks whether `self`, kept at a higher priority, makes `other` pointless.
    pub fn makes_redundant(&self, other: &Selection) -> bool {
        let ids = self.ids();
        let other_ids = other.ids();
        if other_ids.is_subset(&ids) {
            return true;
        }
        if other.action == Action::Remove && other.sub_selection_ids.iter().any(|s| ids.contains(s.as_str())) {
            return true;
        }
        self.id == other.id
            && (!other.is_composite() || other.sub_selection_ids.iter().all(|s| ids.contains(s.as_str())))
    }
}

impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.action, self.id)?;
        if self.is_composite() {
            write!(f, " [{}]", self.sub_selection_ids.join(", "))?;
        }
        Ok(())
    }
}

/// Removes redundant selections, keeping the survivors in their original order.
///
/// Candidates are visited from the highest priority down; a candidate is dropped
/// when an already kept selection [makes it redundant][Selection::makes_redundant].
/// A `REMOVE` that shadowed an earlier selection and has nothing left before it
/// cancels out as well: `[ADD b, REMOVE b]` reduces to nothing.
///
/// Reducing a reduced list changes nothing.
pub fn reduce(selections: &[Selection]) -> Vec<Selection> {
    reduce_with(selections, |_| false)
}

/// Like [`reduce`], but a `REMOVE` for which `keep_remove` holds never cancels out.
///
/// Used for removals that must stay explicit, e.g. of a preferred variable, where
/// falling back to the defaults would bring the variable back.
pub fn reduce_with<F>(selections: &[Selection], keep_remove: F) -> Vec<Selection>
where
    F: Fn(&Selection) -> bool,
{
    // Each kept selection with whether it shadowed an earlier one.
    let mut kept: Vec<(&Selection, bool)> = Vec::new();
    for candidate in selections.iter().rev() {
        let mut redundant = false;
        for (k, shadows) in kept.iter_mut() {
            if k.makes_redundant(candidate) {
                *shadows = true;
                redundant = true;
            }
        }
        if redundant {
            debug!("reduce: dropping shadowed {}", candidate);
            continue;
        }
        kept.push((candidate, false));
    }
    kept.reverse();

    let mut result: Vec<Selection> = Vec::with_capacity(kept.len());
    for (selection, shadows) in kept {
        if selection.action == Action::Remove && shadows && result.is_empty() && !keep_remove(selection) {
            debug!("reduce: {} cancels everything before it", selection);
            continue;
        }
        result.push(selection.clone());
    }
    result
}
