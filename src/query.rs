//! Query preparation and solution decoding.
//!
//! A [`Query`] owns a private copy of the rule set's polyhedron and variables, so
//! composite selections and period pinning never leak into the shared [`Ruleset`].

use chrono::{DateTime, Utc};
use indexmap::{IndexMap, IndexSet};
use log::{debug, trace};

use crate::constraint::{AuxiliaryConstraint, Constraint};
use crate::error::{Error, Result};
use crate::period::locate;
use crate::polyhedron::Polyhedron;
use crate::ruleset::Ruleset;
use crate::selection::{reduce_with, Selection};
use crate::solver::{Direction, Problem, ProblemPolyhedron, SolveResponse, VariableBound};
use crate::weights::{Target, WeightConfig, WeightInputs, Weights};

#[derive(Debug, Clone)]
pub struct Query {
    polyhedron: Polyhedron,
    variables: IndexSet<String>,
    selectable: IndexSet<String>,
    independent: IndexSet<String>,
    selections: Vec<Selection>,
    weights: Weights,
}

/// A decoded configuration over the selectable variables.
#[derive(Debug, Clone, PartialEq)]
pub struct Solution {
    pub values: IndexMap<String, i64>,
    pub objective: Option<f64>,
    /// Set when a weight passed the saturation threshold.
    pub warning: Option<Error>,
}

impl Solution {
    pub fn get(&self, id: &str) -> Option<i64> {
        self.values.get(id).copied()
    }

    /// Ids set to 1.
    pub fn selected(&self) -> impl Iterator<Item = &str> {
        self.values.iter().filter(|(_, &v)| v == 1).map(|(id, _)| id.as_str())
    }
}

fn validate(ruleset: &Ruleset, selection: &Selection) -> Result<()> {
    for id in selection.ids() {
        if id.is_empty() {
            return Err(Error::Empty);
        }
        if !ruleset.selectable_variables().contains(id) {
            return Err(Error::invalid_argument(id, "selection of a non-selectable variable"));
        }
        if selection.is_composite() && ruleset.independent_variables().contains(id) {
            return Err(Error::invalid_argument(
                id,
                "composite selection cannot include an independent variable",
            ));
        }
    }
    Ok(())
}

impl Query {
    pub(crate) fn new(
        ruleset: &Ruleset,
        selections: &[Selection],
        from: Option<DateTime<Utc>>,
        config: &WeightConfig,
    ) -> Result<Self> {
        for selection in selections {
            validate(ruleset, selection)?;
        }
        // Dropping the removal of a preferred id would hand it back to the preference.
        let selections = reduce_with(selections, |s| ruleset.preferences().contains(&s.id));
        debug!("query: {} selections after reduction", selections.len());

        let mut polyhedron = ruleset.polyhedron().clone();
        let mut variables = ruleset.variables().clone();

        let mut targets = Vec::with_capacity(selections.len());
        let mut covered = IndexSet::new();
        for selection in &selections {
            let ids = selection.ids();
            covered.extend(ids.iter().map(|id| id.to_string()));
            let column = if selection.is_composite() {
                let n = ids.len() as i64;
                let conjunction = Constraint::at_least(ids, n)?;
                if !variables.contains(conjunction.id()) {
                    trace!("query: materialising {} for {}", conjunction.id(), selection);
                    variables.insert(conjunction.id().to_string());
                    polyhedron.add_empty_column();
                    for row in conjunction.support_rows() {
                        polyhedron.append_auxiliary(&row, &variables)?;
                    }
                }
                conjunction.id().to_string()
            } else {
                selection.id.clone()
            };
            targets.push(Target {
                column,
                action: selection.action,
            });
        }

        let periods = ruleset.period_variables();
        match from {
            Some(time) if !periods.is_empty() => {
                let index = locate(periods, time).ok_or_else(|| {
                    Error::invalid_argument(time.to_rfc3339(), "time lies outside every compiled period")
                })?;
                debug!("query: pinning {} for {}", periods[index].id, time);
                polyhedron.append_auxiliary(&AuxiliaryConstraint::assume(&periods[index].id), &variables)?;
            }
            Some(time) => debug!("query: ignoring {} without periods", time),
            None => {}
        }

        let period_ids: Vec<String> = periods.iter().map(|p| p.id.clone()).collect();
        let weights = Weights::derive(
            WeightInputs {
                selectable: ruleset.selectable_variables(),
                covered: &covered,
                preferred: ruleset.preferred_variables(),
                periods: &period_ids,
                targets: &targets,
            },
            config,
        )?;

        Ok(Self {
            polyhedron,
            variables,
            selectable: ruleset.selectable_variables().clone(),
            independent: ruleset.independent_variables().clone(),
            selections,
            weights,
        })
    }

    /// The query's private polyhedron, over [`variables`][Self::variables].
    pub fn polyhedron(&self) -> &Polyhedron {
        &self.polyhedron
    }

    pub fn variables(&self) -> &IndexSet<String> {
        &self.variables
    }

    /// Selections left after reduction.
    pub fn selections(&self) -> &[Selection] {
        &self.selections
    }

    pub fn weights(&self) -> &Weights {
        &self.weights
    }

    /// Builds the solver request; independent columns are left out.
    pub fn problem(&self) -> Problem {
        let columns: Vec<usize> = self
            .variables
            .iter()
            .enumerate()
            .filter(|(_, id)| !self.independent.contains(*id))
            .map(|(i, _)| i)
            .collect();
        let polyhedron = self.polyhedron.select_columns(&columns);
        let kept: Vec<&String> = columns.iter().map(|&i| &self.variables[i]).collect();
        let objective: IndexMap<String, i64> = kept
            .iter()
            .filter_map(|id| self.weights.get(id).map(|w| ((*id).clone(), w)))
            .collect();

        Problem {
            polyhedron: ProblemPolyhedron {
                a: polyhedron.sparse_matrix(),
                b: polyhedron.b().to_vec(),
                variables: kept.into_iter().map(VariableBound::binary).collect(),
            },
            objectives: vec![objective],
            direction: Direction::Maximize,
        }
    }

    /// Interprets the solver's answer as values of the selectable variables.
    pub fn decode(&self, response: SolveResponse) -> Result<Solution> {
        let solution = response.into_single()?;
        let mut values = IndexMap::with_capacity(self.selectable.len());
        for id in &self.selectable {
            let value = if self.independent.contains(id) {
                self.independent_value(id)
            } else {
                match solution.solution.get(id) {
                    Some(&v) if v == 0 || v == 1 => v,
                    Some(&v) => {
                        return Err(Error::InvalidResponse(format!("{:?} = {} is not binary", id, v)));
                    }
                    None => 0,
                }
            };
            values.insert(id.clone(), value);
        }
        Ok(Solution {
            values,
            objective: solution.objective,
            warning: self.weights.saturated().cloned(),
        })
    }

    /// The caller's verdict on an independent variable; unselected means 0.
    fn independent_value(&self, id: &str) -> i64 {
        self.selections
            .iter()
            .rev()
            .find(|s| s.id == id)
            .map_or(0, |s| if s.action.is_add() { 1 } else { 0 })
    }
}
