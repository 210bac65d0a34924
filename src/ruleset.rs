//! Compiling a [`Model`] into an immutable [`Ruleset`].
//!
//! The builder gathers everything that is global to a rule set (preferences,
//! time-bound assumptions and the enabled period) and [`RulesetBuilder::build`]
//! lowers it all in one pass:
//!
//! 1. every preferred id `p` gets a support for `NOT(p)`;
//! 2. the span is split into atomic periods `period_0, period_1, …`, exactly one of
//!    which holds, and each group of periods forces its active assumptions;
//! 3. all assumptions are folded into one root;
//! 4. the polyhedron is emitted over the model's variable order.

use chrono::{DateTime, Utc};
use indexmap::IndexSet;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::Model;
use crate::period::{atomic_periods, group_by_active, period_variable_name, span_of, PeriodVariable, TimeBound};
use crate::polyhedron::Polyhedron;
use crate::query::{Query, Solution};
use crate::selection::Selection;
use crate::solver::Solver;
use crate::types::Period;
use crate::weights::WeightConfig;

#[derive(Debug, Clone)]
pub struct RulesetBuilder {
    model: Model,
    preferred: IndexSet<String>,
    time_bounds: Vec<TimeBound>,
    global_period: Option<Period>,
}

impl RulesetBuilder {
    pub fn new(model: Model) -> Self {
        Self {
            model,
            preferred: IndexSet::new(),
            time_bounds: Vec::new(),
            global_period: None,
        }
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    /// Gives access to the model, e.g. to add connectives after preferences.
    pub fn model_mut(&mut self) -> &mut Model {
        &mut self.model
    }

    /// Marks ids whose truth should be favoured when nothing else decides.
    pub fn prefer<I, S>(&mut self, ids: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let ids: Vec<String> = ids.into_iter().map(|s| s.as_ref().to_string()).collect();
        self.model.require(&ids)?;
        self.preferred.extend(ids);
        Ok(())
    }

    pub fn assume<I, S>(&mut self, ids: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.model.assume(ids)
    }

    /// Requires `id` to hold whenever the chosen period lies inside `period`.
    pub fn assume_in_period(&mut self, id: &str, period: Period) -> Result<()> {
        self.model.require(&[id])?;
        if let Some(global) = &self.global_period {
            if !global.covers(&period) {
                return Err(Error::invalid_argument(
                    period,
                    format!("period lies outside the enabled period {}", global),
                ));
            }
        }
        debug!("assume_in_period({}, {})", id, period);
        self.time_bounds.push(TimeBound {
            id: id.to_string(),
            period,
        });
        Ok(())
    }

    /// Enables the global period every time-bound assumption must fit into.
    pub fn enable_period(&mut self, period: Period) -> Result<()> {
        if let Some(outside) = self.time_bounds.iter().find(|b| !period.covers(&b.period)) {
            return Err(Error::invalid_argument(
                outside.period,
                format!("time-bound assumption of {:?} lies outside {}", outside.id, period),
            ));
        }
        debug!("enable_period({})", period);
        self.global_period = Some(period);
        Ok(())
    }

    pub fn build(mut self) -> Result<Ruleset> {
        let mut preferred_variables = IndexSet::new();
        for id in &self.preferred {
            preferred_variables.insert(self.model.set_not([id])?);
        }

        let period_variables = self.build_periods()?;
        let period_ids: IndexSet<&str> = period_variables.iter().map(|p| p.id.as_str()).collect();

        let assumed: Vec<String> = self.model.assumed().iter().cloned().collect();
        if assumed.len() >= 2 {
            let root = self.model.set_and(&assumed)?;
            debug!("build: assumption root {} over {} ids", root, assumed.len());
            self.model.replace_assumed(root);
        }

        let polyhedron = self.model.to_polyhedron()?;
        let variables = self.model.variables().clone();
        let mut selectable_variables = IndexSet::new();
        let mut independent_variables = IndexSet::new();
        for (column, id) in variables.iter().enumerate() {
            if self.model.is_support(id) {
                continue;
            }
            if polyhedron.column_is_zero(column) {
                independent_variables.insert(id.clone());
            }
            if !period_ids.contains(id.as_str()) {
                selectable_variables.insert(id.clone());
            }
        }
        debug!(
            "build: {} variables, {} selectable, {} independent, {} periods",
            variables.len(),
            selectable_variables.len(),
            independent_variables.len(),
            period_variables.len()
        );

        Ok(Ruleset {
            polyhedron,
            variables,
            selectable_variables,
            independent_variables,
            preferred_variables,
            preferences: self.preferred,
            period_variables,
            global_period: self.global_period,
        })
    }

    fn build_periods(&mut self) -> Result<Vec<PeriodVariable>> {
        let span = match self.global_period.or_else(|| span_of(&self.time_bounds)) {
            Some(span) => span,
            None => return Ok(Vec::new()),
        };
        let atoms = atomic_periods(&span, &self.time_bounds);
        let names: Vec<String> = (0..atoms.len()).map(period_variable_name).collect();
        self.model.add_primitives(names.iter().cloned())?;

        if names.len() == 1 {
            self.model.assume(&names)?;
        } else {
            let exactly_one = self.model.set_xor(&names)?;
            self.model.assume([exactly_one])?;
        }

        for (active, group) in group_by_active(&atoms, &self.time_bounds) {
            let during = match group.as_slice() {
                [single] => names[*single].clone(),
                _ => self.model.set_or(group.iter().map(|&i| &names[i]))?,
            };
            let required = match active.as_slice() {
                [single] => single.clone(),
                _ => self.model.set_and(&active)?,
            };
            let rule = self.model.set_imply(&during, &required)?;
            self.model.assume([rule])?;
        }

        Ok(names
            .into_iter()
            .zip(atoms)
            .map(|(id, period)| PeriodVariable { id, period })
            .collect())
    }
}

/// A compiled rule set, immutable and reusable across queries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ruleset {
    polyhedron: Polyhedron,
    variables: IndexSet<String>,
    selectable_variables: IndexSet<String>,
    independent_variables: IndexSet<String>,
    preferred_variables: IndexSet<String>,
    /// The preferred ids themselves.
    #[serde(default)]
    preferences: IndexSet<String>,
    period_variables: Vec<PeriodVariable>,
    global_period: Option<Period>,
}

impl Ruleset {
    pub fn polyhedron(&self) -> &Polyhedron {
        &self.polyhedron
    }

    /// Column names, in column order.
    pub fn variables(&self) -> &IndexSet<String> {
        &self.variables
    }

    pub fn selectable_variables(&self) -> &IndexSet<String> {
        &self.selectable_variables
    }

    /// Primitives that no row mentions.
    pub fn independent_variables(&self) -> &IndexSet<String> {
        &self.independent_variables
    }

    /// Ids of the `NOT` supports standing for preferences.
    pub fn preferred_variables(&self) -> &IndexSet<String> {
        &self.preferred_variables
    }

    /// Ids marked as preferred, before negation.
    pub fn preferences(&self) -> &IndexSet<String> {
        &self.preferences
    }

    /// Period primitives, chronologically.
    pub fn period_variables(&self) -> &[PeriodVariable] {
        &self.period_variables
    }

    pub fn global_period(&self) -> Option<Period> {
        self.global_period
    }

    /// Prepares a query without touching this rule set.
    pub fn prepare(&self, selections: &[Selection], from: Option<DateTime<Utc>>, config: &WeightConfig) -> Result<Query> {
        Query::new(self, selections, from, config)
    }

    /// Prepares a query with the default weights, ships it to `solver` and decodes the answer.
    pub fn solve<S: Solver + ?Sized>(
        &self,
        solver: &S,
        selections: &[Selection],
        from: Option<DateTime<Utc>>,
    ) -> Result<Solution> {
        let query = self.prepare(selections, from, &WeightConfig::default())?;
        let response = solver.solve(&query.problem())?;
        query.decode(response)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let ruleset: Ruleset = serde_json::from_str(json)?;
        if ruleset.polyhedron.shape().1 != ruleset.variables.len() {
            return Err(Error::Serialization(format!(
                "polyhedron has {} columns for {} variables",
                ruleset.polyhedron.shape().1,
                ruleset.variables.len()
            )));
        }
        ruleset
            .polyhedron
            .check_shape()
            .map_err(|err| Error::Serialization(err.to_string()))?;
        Ok(ruleset)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};
    use test_log::test;

    use super::*;

    fn t(minutes: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap() + Duration::minutes(minutes)
    }

    fn p(from: i64, to: i64) -> Period {
        Period::new(t(from), t(to)).unwrap()
    }

    #[test]
    fn test_build_and_of_two() {
        let mut model = Model::new();
        model.add_primitives(["x", "y"]).unwrap();
        let and = model.set_and(["x", "y"]).unwrap();
        model.assume([&and]).unwrap();

        let ruleset = RulesetBuilder::new(model).build().unwrap();
        let columns: Vec<&str> = ruleset.variables().iter().map(String::as_str).collect();
        assert_eq!(columns, vec!["x", "y", and.as_str()]);
        assert_eq!(ruleset.polyhedron().shape(), (3, 3));
        assert_eq!(ruleset.selectable_variables().len(), 2);
        assert!(ruleset.independent_variables().is_empty());
        assert!(ruleset.period_variables().is_empty());
    }

    #[test]
    fn test_assumption_root() {
        let mut model = Model::new();
        model.add_primitives(["a", "b", "c"]).unwrap();
        model.assume(["a", "b"]).unwrap();
        let ruleset = RulesetBuilder::new(model).build().unwrap();

        // AND(a, b) has two support rows, plus its single assumption row.
        assert_eq!(ruleset.polyhedron().shape(), (3, 4));
        assert_eq!(ruleset.independent_variables().iter().collect::<Vec<_>>(), vec!["c"]);
        assert_eq!(ruleset.selectable_variables().len(), 3);
    }

    #[test]
    fn test_prefer_inserts_not() {
        let mut model = Model::new();
        model.add_primitives(["a"]).unwrap();
        let mut builder = RulesetBuilder::new(model);
        builder.prefer(["a"]).unwrap();
        assert_eq!(builder.prefer(["nope"]), Err(Error::NotFound("nope".to_string())));
        let mut reference = builder.model().clone();
        let not_a = reference.set_not(["a"]).unwrap();

        let ruleset = builder.build().unwrap();
        assert_eq!(ruleset.preferred_variables().iter().collect::<Vec<_>>(), vec![&not_a]);
        assert!(ruleset.variables().contains(&not_a));
        assert!(!ruleset.selectable_variables().contains(&not_a));
    }

    #[test]
    fn test_periods() {
        let mut model = Model::new();
        model.add_primitives(["x"]).unwrap();
        let mut builder = RulesetBuilder::new(model);
        builder.enable_period(p(0, 60)).unwrap();
        builder.assume_in_period("x", p(0, 30)).unwrap();
        let ruleset = builder.build().unwrap();

        let periods = ruleset.period_variables();
        assert_eq!(periods.len(), 2);
        assert_eq!(periods[0].id, "period_0");
        assert_eq!(periods[0].period, p(0, 30));
        assert_eq!(periods[1].period, p(30, 60));
        let selectable: Vec<&String> = ruleset.selectable_variables().iter().collect();
        assert_eq!(selectable, vec!["x"]);
        assert_eq!(ruleset.global_period(), Some(p(0, 60)));
    }

    #[test]
    fn test_single_period_is_assumed() {
        let mut model = Model::new();
        model.add_primitives(["x"]).unwrap();
        let mut builder = RulesetBuilder::new(model);
        builder.assume_in_period("x", p(0, 30)).unwrap();
        let ruleset = builder.build().unwrap();
        assert_eq!(ruleset.period_variables().len(), 1);
        // period_0 ⇒ x, and period_0 itself, folded under one root.
        assert!(ruleset.polyhedron().satisfies(&assignment(&ruleset, &["x", "period_0"])));
        assert!(!ruleset.polyhedron().satisfies(&assignment(&ruleset, &["period_0"])));
    }

    /// Sets the given ids and derives every support bottom-up.
    fn assignment(ruleset: &Ruleset, ones: &[&str]) -> Vec<i64> {
        let n = ruleset.variables().len();
        let fixed: Vec<usize> = ones
            .iter()
            .map(|id| ruleset.variables().get_index_of(*id).unwrap())
            .collect();
        let free: Vec<usize> = (0..n)
            .filter(|c| !fixed.contains(c) && !ruleset.selectable_variables().contains(&ruleset.variables()[*c]))
            .filter(|c| !ruleset.period_variables().iter().any(|p| p.id == ruleset.variables()[*c]))
            .collect();
        for bits in 0..(1u64 << free.len()) {
            let mut x = vec![0; n];
            for &c in &fixed {
                x[c] = 1;
            }
            for (i, &c) in free.iter().enumerate() {
                x[c] = ((bits >> i) & 1) as i64;
            }
            if ruleset.polyhedron().satisfies(&x) {
                return x;
            }
        }
        let mut x = vec![0; n];
        for &c in &fixed {
            x[c] = 1;
        }
        x
    }

    #[test]
    fn test_period_validation() {
        let mut model = Model::new();
        model.add_primitives(["x"]).unwrap();
        let mut builder = RulesetBuilder::new(model);
        builder.assume_in_period("x", p(0, 90)).unwrap();
        assert!(matches!(builder.enable_period(p(0, 60)), Err(Error::InvalidArgument { .. })));
        builder.enable_period(p(0, 120)).unwrap();
        assert!(matches!(
            builder.assume_in_period("x", p(100, 130)),
            Err(Error::InvalidArgument { .. })
        ));
        assert_eq!(
            builder.assume_in_period("y", p(0, 10)),
            Err(Error::NotFound("y".to_string()))
        );
    }

    #[test]
    fn test_json_round_trip() {
        let mut model = Model::new();
        model.add_primitives(["a", "b"]).unwrap();
        let or = model.set_or(["a", "b"]).unwrap();
        model.assume([&or]).unwrap();
        let mut builder = RulesetBuilder::new(model);
        builder.prefer(["a"]).unwrap();
        builder.enable_period(p(0, 60)).unwrap();
        let ruleset = builder.build().unwrap();

        let json = ruleset.to_json().unwrap();
        assert!(json.contains("\"A\""));
        assert_eq!(Ruleset::from_json(&json).unwrap(), ruleset);
        assert!(matches!(Ruleset::from_json("{}"), Err(Error::Serialization(_))));
    }

    #[test]
    fn test_from_json_rejects_ragged_rows() {
        let mut model = Model::new();
        model.add_primitives(["a", "b"]).unwrap();
        let or = model.set_or(["a", "b"]).unwrap();
        model.assume([&or]).unwrap();
        let ruleset = RulesetBuilder::new(model).build().unwrap();

        let mut value: serde_json::Value = serde_json::from_str(&ruleset.to_json().unwrap()).unwrap();
        value["polyhedron"]["A"][1].as_array_mut().unwrap().pop();
        assert!(matches!(Ruleset::from_json(&value.to_string()), Err(Error::Serialization(_))));

        let mut value: serde_json::Value = serde_json::from_str(&ruleset.to_json().unwrap()).unwrap();
        value["polyhedron"]["b"].as_array_mut().unwrap().pop();
        assert!(matches!(Ruleset::from_json(&value.to_string()), Err(Error::Serialization(_))));
    }
}
