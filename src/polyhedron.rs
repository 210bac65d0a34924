//! Dense integer polyhedra `A x ≥ b`.
//!
//! Columns are positional; the owner of a polyhedron (the [`Model`][crate::model::Model]
//! or a compiled [`Ruleset`][crate::ruleset::Ruleset]) keeps the variable order that
//! gives each column its name.
//!
//! # Examples
//!
//! ```
//! use ruleset_rs::polyhedron::Polyhedron;
//!
//! let mut p = Polyhedron::new(2);
//! p.append(vec![1, 1], 1).unwrap(); // x + y >= 1
//! p.add_empty_column();
//! assert_eq!(p.shape(), (1, 3));
//! assert!(p.satisfies(&[0, 1, 0]));
//! assert!(!p.satisfies(&[0, 0, 1]));
//! ```

use std::fmt;

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

use crate::constraint::AuxiliaryConstraint;
use crate::error::{Error, Result};

/// Matrix dimensions.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct Shape {
    pub nrows: usize,
    pub ncols: usize,
}

/// Coordinate (COO) representation of an integer matrix.
///
/// `(rows[i], cols[i])` holds the non-zero `vals[i]`.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct SparseMatrix {
    pub rows: Vec<usize>,
    pub cols: Vec<usize>,
    pub vals: Vec<i64>,
    pub shape: Shape,
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct Polyhedron {
    #[serde(rename = "A")]
    a: Vec<Vec<i64>>,
    b: Vec<i64>,
    ncols: usize,
}

impl Polyhedron {
    /// Creates a polyhedron with no rows over `ncols` columns.
    pub fn new(ncols: usize) -> Self {
        Self {
            a: Vec::new(),
            b: Vec::new(),
            ncols,
        }
    }

    /// Returns `(number_of_rows, number_of_columns)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.a.len(), self.ncols)
    }

    pub fn rows(&self) -> &[Vec<i64>] {
        &self.a
    }

    pub fn b(&self) -> &[i64] {
        &self.b
    }

    /// Appends a zero column to every row and returns its index.
    pub fn add_empty_column(&mut self) -> usize {
        for row in self.a.iter_mut() {
            row.push(0);
        }
        self.ncols += 1;
        self.ncols - 1
    }

    /// Appends the inequality `row · x ≥ b`.
    pub fn append(&mut self, row: Vec<i64>, b: i64) -> Result<()> {
        if row.len() != self.ncols {
            return Err(Error::invalid_argument(
                format!("{:?}", row),
                format!("row has {} columns, expected {}", row.len(), self.ncols),
            ));
        }
        self.a.push(row);
        self.b.push(b);
        Ok(())
    }

    /// Projects `Σ c·x + bias ≥ 0` onto `variables` and appends it as `c · x ≥ -bias`.
    pub fn append_auxiliary(&mut self, constraint: &AuxiliaryConstraint, variables: &IndexSet<String>) -> Result<()> {
        let mut row = vec![0; self.ncols];
        for (id, &value) in &constraint.coefficients {
            let column = variables
                .get_index_of(id)
                .ok_or_else(|| Error::NotFound(id.clone()))?;
            if column >= self.ncols {
                return Err(Error::invalid_argument(id, "variable has no column in the polyhedron"));
            }
            row[column] = value;
        }
        self.append(row, -constraint.bias)
    }

    /// Checks that every row has `ncols` entries and that `b` has one entry per row.
    ///
    /// Always true for polyhedra built through [`append`][Self::append]; deserialized
    /// ones may disagree.
    pub fn check_shape(&self) -> Result<()> {
        if self.b.len() != self.a.len() {
            return Err(Error::invalid_argument(
                format!("b of length {}", self.b.len()),
                format!("expected one entry per row ({})", self.a.len()),
            ));
        }
        if let Some((i, row)) = self.a.iter().enumerate().find(|(_, row)| row.len() != self.ncols) {
            return Err(Error::invalid_argument(
                format!("row {}", i),
                format!("row has {} columns, expected {}", row.len(), self.ncols),
            ));
        }
        Ok(())
    }

    /// Emits the non-zero entries in row-major order.
    pub fn sparse_matrix(&self) -> SparseMatrix {
        let mut rows = Vec::new();
        let mut cols = Vec::new();
        let mut vals = Vec::new();
        for (i, row) in self.a.iter().enumerate() {
            for (j, &val) in row.iter().enumerate() {
                if val != 0 {
                    rows.push(i);
                    cols.push(j);
                    vals.push(val);
                }
            }
        }
        SparseMatrix {
            rows,
            cols,
            vals,
            shape: Shape {
                nrows: self.a.len(),
                ncols: self.ncols,
            },
        }
    }

    /// Checks whether every column entry is zero, i.e. no row refers to it.
    pub fn column_is_zero(&self, column: usize) -> bool {
        self.a.iter().all(|row| row[column] == 0)
    }

    /// Keeps only the given columns, in the given order.
    pub fn select_columns(&self, columns: &[usize]) -> Polyhedron {
        Polyhedron {
            a: self
                .a
                .iter()
                .map(|row| columns.iter().map(|&c| row[c]).collect())
                .collect(),
            b: self.b.clone(),
            ncols: columns.len(),
        }
    }

    /// Checks `A x ≥ b` for a full assignment.
    ///
    /// # Panics
    ///
    /// Panics if `x` does not have one entry per column.
    pub fn satisfies(&self, x: &[i64]) -> bool {
        assert_eq!(x.len(), self.ncols, "Assignment length must match the column count");
        self.a
            .iter()
            .zip(&self.b)
            .all(|(row, &b)| row.iter().zip(x).map(|(a, x)| a * x).sum::<i64>() >= b)
    }
}

impl fmt::Display for Polyhedron {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (row, b) in self.a.iter().zip(&self.b) {
            for val in row {
                write!(f, "{:>3} ", val)?;
            }
            writeln!(f, ">= {:>3}", b)?;
        }
        Ok(())
    }
}
