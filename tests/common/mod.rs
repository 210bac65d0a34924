//! Shared helpers for the integration tests.

use indexmap::IndexMap;
use ruleset_rs::solver::{Problem, SolveResponse, Solver, SolverSolution};
use ruleset_rs::Result;

/// Exhaustive 0/1 solver for small problems.
///
/// Enumerates assignments in binary counting order (first column as lowest bit)
/// and keeps the first one with the best objective.
pub struct ExhaustiveSolver;

impl Solver for ExhaustiveSolver {
    fn solve(&self, problem: &Problem) -> Result<SolveResponse> {
        let p = &problem.polyhedron;
        let n = p.variables.len();
        assert!(n <= 24, "too many variables for exhaustive search: {}", n);

        let mut rows = vec![vec![0i64; n]; p.a.shape.nrows];
        for ((&r, &c), &v) in p.a.rows.iter().zip(&p.a.cols).zip(&p.a.vals) {
            rows[r][c] = v;
        }
        let objective: Vec<i64> = p
            .variables
            .iter()
            .map(|v| problem.objectives[0].get(&v.id).copied().unwrap_or(0))
            .collect();

        let mut best: Option<(i64, u64)> = None;
        for bits in 0..(1u64 << n) {
            let x = |j: usize| ((bits >> j) & 1) as i64;
            let feasible = rows
                .iter()
                .zip(&p.b)
                .all(|(row, &b)| (0..n).map(|j| row[j] * x(j)).sum::<i64>() >= b);
            if !feasible {
                continue;
            }
            let value: i64 = (0..n).map(|j| objective[j] * x(j)).sum();
            if best.map_or(true, |(v, _)| value > v) {
                best = Some((value, bits));
            }
        }

        let solution = match best {
            Some((value, bits)) => SolverSolution {
                status: "optimal".to_string(),
                error: None,
                objective: Some(value as f64),
                solution: p
                    .variables
                    .iter()
                    .enumerate()
                    .map(|(j, v)| (v.id.clone(), ((bits >> j) & 1) as i64))
                    .collect::<IndexMap<_, _>>(),
            },
            None => SolverSolution {
                status: "mipfailed".to_string(),
                error: Some("infeasible".to_string()),
                objective: None,
                solution: IndexMap::new(),
            },
        };
        Ok(SolveResponse {
            solutions: vec![solution],
        })
    }
}
