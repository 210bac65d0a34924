//! The contract with an external ILP solver.
//!
//! The crate never solves anything itself. A [`Problem`] is serialized as
//!
//! ```json
//! {
//!   "polyhedron": {
//!     "A": {"rows": [..], "cols": [..], "vals": [..], "shape": {"nrows": 2, "ncols": 3}},
//!     "b": [..],
//!     "variables": [{"id": "x", "bound": [0, 1]}]
//!   },
//!   "objectives": [{"x": -2}],
//!   "direction": "maximize"
//! }
//! ```
//!
//! and the solver answers with a [`SolveResponse`]. Transport belongs to whoever
//! implements [`Solver`].

use std::fmt;

use indexmap::IndexMap;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::polyhedron::SparseMatrix;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableBound {
    pub id: String,
    pub bound: [i64; 2],
}

impl VariableBound {
    pub fn binary(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            bound: [0, 1],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProblemPolyhedron {
    #[serde(rename = "A")]
    pub a: SparseMatrix,
    pub b: Vec<i64>,
    pub variables: Vec<VariableBound>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Maximize,
    Minimize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Problem {
    pub polyhedron: ProblemPolyhedron,
    pub objectives: Vec<IndexMap<String, i64>>,
    pub direction: Direction,
}

impl Problem {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Outcome reported by the solver for one objective.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    Optimal,
    Feasible,
    MipFailed,
    Other(String),
}

impl Status {
    pub fn parse(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "optimal" => Status::Optimal,
            "feasible" => Status::Feasible,
            "mipfailed" => Status::MipFailed,
            _ => Status::Other(s.to_string()),
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Status::Optimal | Status::Feasible)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Optimal => write!(f, "optimal"),
            Status::Feasible => write!(f, "feasible"),
            Status::MipFailed => write!(f, "mipfailed"),
            Status::Other(s) => write!(f, "{}", s),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolverSolution {
    pub status: String,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub objective: Option<f64>,
    #[serde(default)]
    pub solution: IndexMap<String, i64>,
}

impl SolverSolution {
    pub fn status(&self) -> Status {
        Status::parse(&self.status)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SolveResponse {
    pub solutions: Vec<SolverSolution>,
}

impl SolveResponse {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Extracts the single usable solution.
    ///
    /// Fails with [`Error::SolverFailed`] on `mipfailed` and with
    /// [`Error::InvalidResponse`] on any other unexpected shape or status.
    pub fn into_single(self) -> Result<SolverSolution> {
        let count = self.solutions.len();
        let mut solutions = self.solutions.into_iter();
        let solution = match (solutions.next(), count) {
            (Some(solution), 1) => solution,
            _ => {
                return Err(Error::InvalidResponse(format!("expected exactly one solution, got {}", count)));
            }
        };
        let status = solution.status();
        debug!("solver status: {}", status);
        match status {
            s if s.is_ok() => Ok(solution),
            Status::MipFailed => Err(Error::SolverFailed(
                solution.error.unwrap_or_else(|| status_message(&solution.status)),
            )),
            _ => Err(Error::InvalidResponse(status_message(&solution.status))),
        }
    }
}

fn status_message(status: &str) -> String {
    format!("status {:?}", status)
}

/// Anything able to answer a [`Problem`], typically an HTTP client.
pub trait Solver {
    fn solve(&self, problem: &Problem) -> Result<SolveResponse>;
}

impl<S: Solver + ?Sized> Solver for &S {
    fn solve(&self, problem: &Problem) -> Result<SolveResponse> {
        (**self).solve(problem)
    }
}
