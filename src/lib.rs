//! # ruleset-rs: configuration rules as integer programs
//!
//! **`ruleset-rs`** compiles configuration rules (boolean primitives, propositional connectives,
//! assumptions, preferences and time-bound assumptions) into an integer polyhedron `A x ≥ b` over
//! 0/1 variables plus a lexicographic objective, and decodes the optimiser's answer.
//!
//! ## How it works
//!
//! Every connective is lowered to a cardinality constraint (`Σ x ≥ k` or `Σ x ≤ k`). Each constraint
//! is content addressed by a SHA-1 digest and owns a *support* variable that is true iff the
//! constraint holds; two linking rows per constraint keep the support faithful. Connectives over
//! supports compose, so the whole rule set forms a DAG with structural sharing.
//!
//! At query time, ordered ADD/REMOVE selections are reduced, composite selections get their own
//! support on a private copy of the polyhedron, and weights are derived so that a single linear
//! maximisation honours, in order: later selections, earlier selections, preferences, the
//! not-selected penalty, and earlier periods.
//!
//! ## Basic Usage
//!
//! ```rust
//! use ruleset_rs::model::Model;
//! use ruleset_rs::ruleset::RulesetBuilder;
//! use ruleset_rs::selection::Selection;
//! use ruleset_rs::weights::WeightConfig;
//!
//! // 1. Declare primitives and rules
//! let mut model = Model::new();
//! model.add_primitives(["a", "b", "c"]).unwrap();
//! let exactly_one = model.set_xor(["a", "b", "c"]).unwrap();
//! model.assume([&exactly_one]).unwrap();
//!
//! // 2. Compile, preferring `a`
//! let mut builder = RulesetBuilder::new(model);
//! builder.prefer(["a"]).unwrap();
//! let ruleset = builder.build().unwrap();
//!
//! // 3. Prepare a query and hand `query.problem()` to an ILP solver
//! let query = ruleset.prepare(&[Selection::add("b")], None, &WeightConfig::default()).unwrap();
//! let problem = query.problem();
//! assert_eq!(problem.polyhedron.variables.len(), ruleset.variables().len());
//! ```
//!
//! ## Core Components
//!
//! - **[`model`]** and **[`connective`]**: the constraint DAG and connective lowering.
//! - **[`ruleset`]**: compilation of preferences, periods and assumptions.
//! - **[`query`]**: selections, weights and decoding, on top of [`selection`] and [`weights`].
//! - **[`solver`]**: the JSON contract with an external optimiser.
//! - **[`dot`]**: Graphviz rendering of the DAG.

pub mod connective;
pub mod constraint;
pub mod dot;
pub mod error;
pub mod model;
pub mod period;
pub mod polyhedron;
pub mod query;
pub mod ruleset;
pub mod selection;
pub mod solver;
pub mod types;
pub mod weights;

pub use error::{Error, Result};
