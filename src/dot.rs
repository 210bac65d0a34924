//! Constraint DAG to DOT (Graphviz) conversion.
//!
//! # DOT Format
//!
//! The generated DOT output follows these conventions:
//! - **Primitive variables** are the leaves, placed on the sink rank
//! - **Support variables** are labeled with the first characters of their id and
//!   the inequality they stand for, e.g. `Σ ≥ 2`
//! - **Edges** go from a support to each of its operands:
//!   - Solid lines for positive coefficients
//!   - Dashed lines for negative coefficients
//! - **Assumed** variables are drawn with the assumed shape
//!
//! # Examples
//!
//! ```
//! use ruleset_rs::model::Model;
//!
//! let mut model = Model::new();
//! model.add_primitives(["x", "y"]).unwrap();
//! let or = model.set_or(["x", "y"]).unwrap();
//! model.assume([&or]).unwrap();
//!
//! let dot = model.to_dot().unwrap();
//! // Write to file and render with: dot -Tpng output.dot -o output.png
//! assert!(dot.starts_with("digraph {"));
//! ```

use std::fmt::Write as _;

use crate::constraint::Constraint;
use crate::model::Model;

/// Configuration options for DOT output generation.
///
/// ```
/// use ruleset_rs::dot::DotConfig;
///
/// let config = DotConfig {
///     id_prefix: 12,
///     ..DotConfig::default()
/// };
/// assert_eq!(config.primitive_shape, "ellipse");
/// ```
#[derive(Debug, Clone)]
pub struct DotConfig {
    /// Shape for primitive variables (default: "ellipse")
    pub primitive_shape: &'static str,
    /// Shape for support variables (default: "box")
    pub support_shape: &'static str,
    /// Shape for assumed variables (default: "doubleoctagon")
    pub assumed_shape: &'static str,
    /// Style for edges with a positive coefficient (default: "solid")
    pub positive_edge_style: &'static str,
    /// Style for edges with a negative coefficient (default: "dashed")
    pub negative_edge_style: &'static str,
    /// Number of id characters shown for supports (default: 8)
    pub id_prefix: usize,
}

impl Default for DotConfig {
    fn default() -> Self {
        Self {
            primitive_shape: "ellipse",
            support_shape: "box",
            assumed_shape: "doubleoctagon",
            positive_edge_style: "solid",
            negative_edge_style: "dashed",
            id_prefix: 8,
        }
    }
}

fn escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

/// `Σ ≥ k` for cardinality rows, the raw inequality otherwise.
fn support_label(constraint: &Constraint) -> String {
    let coefficients: Vec<i64> = constraint.coefficients().values().copied().collect();
    let bias = constraint.bias();
    if coefficients.iter().all(|&c| c == 1) {
        format!("Σ ≥ {}", -bias)
    } else if coefficients.iter().all(|&c| c == -1) {
        format!("Σ ≤ {}", bias)
    } else {
        format!("{}", constraint.row())
    }
}

impl Model {
    /// Converts the constraint DAG to DOT format with the default configuration.
    pub fn to_dot(&self) -> Result<String, std::fmt::Error> {
        self.to_dot_with_config(&DotConfig::default())
    }

    /// Converts the constraint DAG to DOT format.
    ///
    /// Node names are the variable indices in [`variables`][Model::variables], so the
    /// output is stable for a given model.
    pub fn to_dot_with_config(&self, config: &DotConfig) -> Result<String, std::fmt::Error> {
        let mut dot = String::new();
        writeln!(dot, "digraph {{")?;
        writeln!(dot, "node [shape={}];", config.primitive_shape)?;

        // Primitives at the bottom
        writeln!(dot, "{{ rank=sink")?;
        for (i, id) in self.variables().iter().enumerate() {
            if self.is_support(id) {
                continue;
            }
            let shape = if self.assumed().contains(id) {
                config.assumed_shape
            } else {
                config.primitive_shape
            };
            writeln!(dot, "v{} [shape={}, label=\"{}\"];", i, shape, escape(id))?;
        }
        writeln!(dot, "}}")?;

        for (i, id) in self.variables().iter().enumerate() {
            let Some(constraint) = self.constraint(id) else {
                continue;
            };
            let shape = if self.assumed().contains(id) {
                config.assumed_shape
            } else {
                config.support_shape
            };
            let prefix = &id[..config.id_prefix.min(id.len())];
            writeln!(
                dot,
                "v{} [shape={}, label=\"{}\\n{}\"];",
                i,
                shape,
                prefix,
                escape(&support_label(constraint))
            )?;

            for (operand, &coefficient) in constraint.coefficients() {
                let Some(j) = self.variables().get_index_of(operand) else {
                    continue;
                };
                let style = if coefficient < 0 {
                    config.negative_edge_style
                } else {
                    config.positive_edge_style
                };
                if coefficient.abs() == 1 {
                    writeln!(dot, "v{} -> v{} [style={}];", i, j, style)?;
                } else {
                    writeln!(dot, "v{} -> v{} [style={}, label=\"{}\"];", i, j, style, coefficient)?;
                }
            }
        }

        writeln!(dot, "}}")?;
        Ok(dot)
    }
}
