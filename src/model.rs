//! The constraint DAG.
//!
//! A [`Model`] owns every variable of a rule set: user-declared *primitives* and the
//! *support* variables created for composite constraints. Constraints are content
//! addressed (see [`constraint_id`][crate::constraint::constraint_id]), so building
//! the same connective twice hands back the same support variable.
//!
//! Supports are always created after their operands, therefore the variable order is
//! a topological order of the DAG and the graph cannot contain cycles.
//!
//! # Examples
//!
//! ```
//! use ruleset_rs::model::Model;
//!
//! let mut model = Model::new();
//! model.add_primitives(["x", "y"]).unwrap();
//! let and = model.set_and(["x", "y"]).unwrap();
//! model.assume([and.as_str()]).unwrap();
//!
//! let polyhedron = model.to_polyhedron().unwrap();
//! // Two rows link the support to x ∧ y, one row asserts it.
//! assert_eq!(polyhedron.shape(), (3, 3));
//! ```

use indexmap::{IndexMap, IndexSet};
use log::debug;

use crate::constraint::{AuxiliaryConstraint, Constraint};
use crate::error::{Error, Result};
use crate::polyhedron::Polyhedron;

#[derive(Debug, Clone, Default)]
pub struct Model {
    /// Primitives and supports, in creation order.
    variables: IndexSet<String>,
    /// Composite constraints keyed by id (the support variable).
    constraints: IndexMap<String, Constraint>,
    /// Ids that must hold.
    assumed: IndexSet<String>,
}

impl Model {
    pub fn new() -> Self {
        Self::default()
    }

    /// All variables in creation order.
    pub fn variables(&self) -> &IndexSet<String> {
        &self.variables
    }

    pub fn constraints(&self) -> impl Iterator<Item = &Constraint> {
        self.constraints.values()
    }

    pub fn constraint(&self, id: &str) -> Option<&Constraint> {
        self.constraints.get(id)
    }

    pub fn assumed(&self) -> &IndexSet<String> {
        &self.assumed
    }

    pub fn contains(&self, id: &str) -> bool {
        self.variables.contains(id)
    }

    pub fn is_support(&self, id: &str) -> bool {
        self.constraints.contains_key(id)
    }

    /// Declares new primitive variables.
    ///
    /// Fails on an empty id, on a duplicate within `names`, and on a collision with
    /// any existing variable. Nothing is added unless every name is valid.
    pub fn add_primitives<I, S>(&mut self, names: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut fresh = IndexSet::new();
        for name in names {
            let name = name.into();
            if name.is_empty() {
                return Err(Error::Empty);
            }
            if self.variables.contains(&name) || fresh.contains(&name) {
                return Err(Error::AlreadyExists(name));
            }
            fresh.insert(name);
        }
        debug!("add_primitives({:?})", fresh);
        self.variables.extend(fresh);
        Ok(())
    }

    /// Registers a composite constraint, reusing an existing one with the same id.
    pub(crate) fn insert_constraint(&mut self, constraint: Constraint) -> Result<String> {
        let id = constraint.id().to_string();
        if self.constraints.contains_key(&id) {
            debug!("insert_constraint: reusing {}", id);
            return Ok(id);
        }
        if self.variables.contains(&id) {
            return Err(Error::AlreadyExists(id));
        }
        if let Some(missing) = constraint.operands().find(|v| !self.variables.contains(*v)) {
            return Err(Error::NotFound(missing.to_string()));
        }
        debug!("insert_constraint: {}", constraint);
        self.variables.insert(id.clone());
        self.constraints.insert(id.clone(), constraint);
        Ok(id)
    }

    /// Marks the given ids as assumed to be true.
    ///
    /// Ids already assumed are skipped.
    pub fn assume<I, S>(&mut self, ids: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let ids: Vec<String> = ids.into_iter().map(|s| s.as_ref().to_string()).collect();
        self.require(&ids)?;
        for id in ids {
            if self.assumed.insert(id.clone()) {
                debug!("assume({})", id);
            }
        }
        Ok(())
    }

    /// Replaces every assumption by the single id `root`.
    pub(crate) fn replace_assumed(&mut self, root: String) {
        self.assumed.clear();
        self.assumed.insert(root);
    }

    /// Returns `true` iff every id has been introduced.
    pub fn validate_variables<I, S>(&self, ids: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        ids.into_iter().all(|id| self.variables.contains(id.as_ref()))
    }

    /// Fails with [`Error::NotFound`] on the first id that was never introduced.
    pub(crate) fn require<S: AsRef<str>>(&self, ids: &[S]) -> Result<()> {
        for id in ids {
            let id = id.as_ref();
            if id.is_empty() {
                return Err(Error::Empty);
            }
            if !self.variables.contains(id) {
                return Err(Error::NotFound(id.to_string()));
            }
        }
        Ok(())
    }

    /// Variables that are not supports, in creation order.
    pub fn primitive_variables(&self) -> Vec<String> {
        self.variables
            .iter()
            .filter(|v| !self.constraints.contains_key(*v))
            .cloned()
            .collect()
    }

    /// Support variables, in creation order.
    pub fn support_variables(&self) -> Vec<String> {
        self.constraints.keys().cloned().collect()
    }

    /// Builds `A x ≥ b` over [`variables`][Self::variables].
    ///
    /// Rows come in a stable order: the two support rows of every constraint in
    /// creation order, then one row per assumed id.
    pub fn to_polyhedron(&self) -> Result<Polyhedron> {
        let mut polyhedron = Polyhedron::new(self.variables.len());
        for constraint in self.constraints.values() {
            for row in constraint.support_rows() {
                polyhedron.append_auxiliary(&row, &self.variables)?;
            }
        }
        for id in &self.assumed {
            polyhedron.append_auxiliary(&AuxiliaryConstraint::assume(id), &self.variables)?;
        }
        debug!(
            "to_polyhedron: {} rows over {} variables",
            polyhedron.shape().0,
            polyhedron.shape().1
        );
        Ok(polyhedron)
    }
}
