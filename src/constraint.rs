//! Linear constraints over 0/1 variables.
//!
//! A constraint is the inequality
//!
//! ```text
//! Σ coefficients[v]·x[v] + bias ≥ 0
//! ```
//!
//! Every composite constraint is identified by a SHA-1 digest of its canonical
//! serialization, so structurally equal constraints always share one id. That id
//! doubles as the name of the *support* variable which indicates whether the
//! constraint holds.
//!
//! # Examples
//!
//! ```
//! use ruleset_rs::constraint::Constraint;
//!
//! // x + y ≥ 2
//! let and = Constraint::at_least(["x", "y"], 2).unwrap();
//! let same = Constraint::at_least(["y", "x"], 2).unwrap();
//! assert_eq!(and.id(), same.id());
//! assert_eq!(and.bias(), -2);
//! ```

use std::cmp::max;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

use log::trace;
use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};

use crate::error::{Error, Result};

/// Coefficients of a linear form, sorted by variable id.
pub type Coefficients = BTreeMap<String, i64>;

/// Computes the content-addressed id of a linear form.
///
/// The digest covers each key in sorted order followed by its decimal value, then
/// the decimal bias, without any separators:
///
/// ```text
/// {x: 1, y: 1}, bias -2  =>  sha1("x1y1-2")
/// ```
pub fn constraint_id(coefficients: &Coefficients, bias: i64) -> String {
    let mut hasher = Sha1::new();
    for (key, value) in coefficients {
        hasher.update(key.as_bytes());
        hasher.update(value.to_string().as_bytes());
    }
    hasher.update(bias.to_string().as_bytes());
    hex::encode(hasher.finalize())
}

/// Maximum absolute value the linear form can take over 0/1 inputs.
///
/// ```text
/// max(|Σ negative coefficients|, Σ positive coefficients)
/// ```
pub fn inner_bound(coefficients: &Coefficients) -> i64 {
    let (negative, positive) = coefficients.values().fold((0, 0), |(neg, pos), &c| {
        if c < 0 {
            (neg + c, pos)
        } else {
            (neg, pos + c)
        }
    });
    max(negative.abs(), positive)
}

/// Bias of the strict complement: `f + b ≥ 0` negates to `-f + (-b - 1) ≥ 0`.
pub const fn negate_bias(bias: i64) -> i64 {
    -bias - 1
}

/// A linear inequality without an identity.
///
/// Used for the rows linking a support variable to its constraint, and for rows
/// that pin a variable to true (assumptions, period pinning).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuxiliaryConstraint {
    pub coefficients: Coefficients,
    pub bias: i64,
}

impl AuxiliaryConstraint {
    pub fn new(coefficients: Coefficients, bias: i64) -> Self {
        Self { coefficients, bias }
    }

    /// The row `x - 1 ≥ 0`, forcing `x` to be true.
    pub fn assume(id: &str) -> Self {
        Self::new(Coefficients::from([(id.to_string(), 1)]), -1)
    }

    pub fn inner_bound(&self) -> i64 {
        inner_bound(&self.coefficients)
    }

    /// The strict complement of this inequality.
    pub fn negate(&self) -> Self {
        Self {
            coefficients: self.coefficients.iter().map(|(k, &v)| (k.clone(), -v)).collect(),
            bias: negate_bias(self.bias),
        }
    }

    /// Checks the inequality; ids missing from `assignment` count as 0.
    pub fn is_satisfied_by(&self, assignment: &HashMap<String, i64>) -> bool {
        let lhs: i64 = self
            .coefficients
            .iter()
            .map(|(k, &v)| v * assignment.get(k).copied().unwrap_or(0))
            .sum();
        lhs + self.bias >= 0
    }
}

impl fmt::Display for AuxiliaryConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (key, value) in &self.coefficients {
            write!(f, "{:+}*{} ", value, key)?;
        }
        write!(f, "{:+} >= 0", self.bias)
    }
}

/// A composite constraint with its content-addressed id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Constraint {
    id: String,
    row: AuxiliaryConstraint,
}

impl Constraint {
    /// Creates a constraint, dropping zero coefficients.
    ///
    /// The caller guarantees `bias ≥ |Σ negative coefficients| - inner bound`,
    /// which [`support_rows`][Self::support_rows] relies on.
    pub(crate) fn new(coefficients: Coefficients, bias: i64) -> Self {
        let coefficients: Coefficients = coefficients.into_iter().filter(|&(_, v)| v != 0).collect();
        let id = constraint_id(&coefficients, bias);
        Self {
            id,
            row: AuxiliaryConstraint::new(coefficients, bias),
        }
    }

    /// Creates a constraint from an arbitrary linear form.
    ///
    /// Fails with [`Error::InvalidOperand`] when the form has no variables, or when
    /// its bias is so low that the support variable could not be false:
    ///
    /// ```text
    /// bias < |Σ negative coefficients| - inner bound
    /// ```
    pub fn try_new(coefficients: Coefficients, bias: i64) -> Result<Self> {
        let constraint = Self::new(coefficients, bias);
        if constraint.coefficients().is_empty() {
            return Err(Error::invalid_operand("{}", "at least one non-zero coefficient is required"));
        }
        let negative: i64 = constraint.coefficients().values().filter(|&&c| c < 0).sum();
        let lowest = negative.abs() - constraint.inner_bound();
        if bias < lowest {
            return Err(Error::invalid_operand(
                bias,
                format!("bias must be at least {} for a representable support", lowest),
            ));
        }
        Ok(constraint)
    }

    /// `Σ x ≥ k`, stored as `Σ (+1)·x + (-k) ≥ 0`.
    pub fn at_least<I, S>(vars: I, k: i64) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::cardinality(vars, k, 1)
    }

    /// `Σ x ≤ k`, stored as `Σ (-1)·x + k ≥ 0`.
    pub fn at_most<I, S>(vars: I, k: i64) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::cardinality(vars, k, -1)
    }

    fn cardinality<I, S>(vars: I, k: i64, sign: i64) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let vars: Vec<String> = vars.into_iter().map(Into::into).collect();
        if vars.is_empty() {
            return Err(Error::invalid_operand("[]", "at least one variable is required"));
        }
        if k < 0 || k > vars.len() as i64 {
            return Err(Error::invalid_operand(
                k,
                format!("cardinality must be in 0..={}", vars.len()),
            ));
        }
        let mut seen = BTreeSet::new();
        if let Some(dup) = vars.iter().find(|v| !seen.insert(v.as_str())) {
            return Err(Error::invalid_operand(dup, "duplicate operand"));
        }

        let coefficients = vars.into_iter().map(|v| (v, sign)).collect();
        let constraint = Self::new(coefficients, -sign * k);
        trace!("cardinality(k = {}, sign = {:+}) -> {}", k, sign, constraint.id);
        Ok(constraint)
    }

    /// The content-addressed id, also the name of the support variable.
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn coefficients(&self) -> &Coefficients {
        &self.row.coefficients
    }

    pub fn bias(&self) -> i64 {
        self.row.bias
    }

    /// Ids of the variables this constraint refers to, sorted.
    pub fn operands(&self) -> impl Iterator<Item = &str> {
        self.row.coefficients.keys().map(String::as_str)
    }

    pub fn row(&self) -> &AuxiliaryConstraint {
        &self.row
    }

    pub fn inner_bound(&self) -> i64 {
        self.row.inner_bound()
    }

    /// The strict complement of the underlying inequality.
    pub fn negate(&self) -> AuxiliaryConstraint {
        self.row.negate()
    }

    /// The two rows making the support variable `s` a faithful indicator:
    ///
    /// ```text
    /// s ⇒ C :  C - M·s + M ≥ 0         (M  = inner bound of C)
    /// C ⇒ s : ¬C + (M' - b')·s ≥ 0     (M' = inner bound of ¬C, b' = bias of ¬C)
    /// ```
    pub fn support_rows(&self) -> [AuxiliaryConstraint; 2] {
        let m = self.inner_bound();
        let mut support_implies = self.row.clone();
        support_implies.coefficients.insert(self.id.clone(), -m);
        support_implies.bias += m;

        let mut implies_support = self.row.negate();
        let coefficient = implies_support.inner_bound() - implies_support.bias;
        implies_support.coefficients.insert(self.id.clone(), coefficient);

        [support_implies, implies_support]
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", &self.id[..8], self.row)
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    fn assignment(vars: &[String], bits: u32) -> HashMap<String, i64> {
        vars.iter()
            .enumerate()
            .map(|(i, v)| (v.clone(), ((bits >> i) & 1) as i64))
            .collect()
    }

    #[test]
    fn test_id_ignores_insertion_order() {
        let mut a = Coefficients::new();
        a.insert("y".to_string(), 1);
        a.insert("x".to_string(), 1);
        let mut b = Coefficients::new();
        b.insert("x".to_string(), 1);
        b.insert("y".to_string(), 1);
        assert_eq!(constraint_id(&a, -2), constraint_id(&b, -2));
        assert_ne!(constraint_id(&a, -2), constraint_id(&a, -1));
    }

    #[test]
    fn test_id_canonical_serialization() {
        let coefficients = Coefficients::from([("x".to_string(), 1), ("y".to_string(), 1)]);
        let expected = hex::encode(Sha1::digest(b"x1y1-2"));
        assert_eq!(constraint_id(&coefficients, -2), expected);
        assert_eq!(expected.len(), 40);
    }

    #[test]
    fn test_inner_bound() {
        let c = Coefficients::from([("a".to_string(), -2), ("b".to_string(), 1), ("c".to_string(), 1)]);
        assert_eq!(inner_bound(&c), 2);
        let c = Coefficients::from([("a".to_string(), -3), ("b".to_string(), 1)]);
        assert_eq!(inner_bound(&c), 3);
        let c = Coefficients::from([("a".to_string(), 1), ("b".to_string(), 4)]);
        assert_eq!(inner_bound(&c), 5);
    }

    #[test]
    fn test_negate_bias() {
        for b in -5..=5 {
            assert_eq!(negate_bias(b), -b - 1);
        }
    }

    #[test]
    fn test_at_least_shape() {
        let c = Constraint::at_least(["x", "y", "z"], 2).unwrap();
        assert!(c.coefficients().values().all(|&v| v == 1));
        assert_eq!(c.bias(), -2);
        assert_eq!(c.operands().collect::<Vec<_>>(), vec!["x", "y", "z"]);
    }

    #[test]
    fn test_at_most_shape() {
        let c = Constraint::at_most(["x", "y"], 1).unwrap();
        assert!(c.coefficients().values().all(|&v| v == -1));
        assert_eq!(c.bias(), 1);
    }

    #[test]
    fn test_at_least_and_at_most_differ() {
        let a = Constraint::at_least(["x", "y"], 1).unwrap();
        let b = Constraint::at_most(["x", "y"], 1).unwrap();
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_invalid_operands() {
        let empty: [&str; 0] = [];
        assert!(matches!(Constraint::at_least(empty, 0), Err(Error::InvalidOperand { .. })));
        assert!(matches!(Constraint::at_least(["x"], -1), Err(Error::InvalidOperand { .. })));
        assert!(matches!(Constraint::at_most(["x"], 2), Err(Error::InvalidOperand { .. })));
        assert_eq!(
            Constraint::at_least(["x", "x"], 1),
            Err(Error::invalid_operand("x", "duplicate operand"))
        );
    }

    #[test]
    fn test_semantics() {
        let vars: Vec<String> = ["a", "b", "c"].iter().map(|s| s.to_string()).collect();
        for k in 0..=3 {
            let at_least = Constraint::at_least(vars.clone(), k).unwrap();
            let at_most = Constraint::at_most(vars.clone(), k).unwrap();
            for bits in 0..8u32 {
                let x = assignment(&vars, bits);
                let sum = bits.count_ones() as i64;
                assert_eq!(at_least.row().is_satisfied_by(&x), sum >= k);
                assert_eq!(at_most.row().is_satisfied_by(&x), sum <= k);
            }
        }
    }

    #[test]
    fn test_support_rows_are_biconditional() {
        let vars: Vec<String> = ["a", "b", "c", "d"].iter().map(|s| s.to_string()).collect();
        for n in 1..=vars.len() {
            let operands = &vars[..n];
            for k in 0..=n as i64 {
                for c in [
                    Constraint::at_least(operands.to_vec(), k).unwrap(),
                    Constraint::at_most(operands.to_vec(), k).unwrap(),
                ] {
                    let rows = c.support_rows();
                    for bits in 0..(1u32 << n) {
                        let mut x = assignment(operands, bits);
                        let holds = c.row().is_satisfied_by(&x);
                        for s in [0, 1] {
                            x.insert(c.id().to_string(), s);
                            let linked = rows.iter().all(|r| r.is_satisfied_by(&x));
                            assert_eq!(linked, holds == (s == 1), "{} with s = {}", c, s);
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn test_try_new_rejects_unrepresentable_bias() {
        let x = || Coefficients::from([("x".to_string(), 1)]);
        assert!(matches!(Constraint::try_new(x(), -5), Err(Error::InvalidOperand { .. })));
        assert!(matches!(Constraint::try_new(x(), -2), Err(Error::InvalidOperand { .. })));
        assert!(matches!(
            Constraint::try_new(Coefficients::from([("x".to_string(), 0)]), 0),
            Err(Error::InvalidOperand { .. })
        ));
        let mixed = || Coefficients::from([("x".to_string(), 2), ("y".to_string(), -3)]);
        assert!(matches!(Constraint::try_new(mixed(), -1), Err(Error::InvalidOperand { .. })));
        assert!(Constraint::try_new(mixed(), 0).is_ok());
    }

    #[test]
    fn test_try_new_support_rows_are_biconditional() {
        let vars: Vec<String> = ["x", "y"].iter().map(|s| s.to_string()).collect();
        for (cx, cy) in [(1, 1), (2, -1), (-1, -3), (3, 0)] {
            let coefficients = Coefficients::from([("x".to_string(), cx), ("y".to_string(), cy)]);
            for bias in -6..=6 {
                let c = match Constraint::try_new(coefficients.clone(), bias) {
                    Ok(c) => c,
                    Err(_) => continue,
                };
                let rows = c.support_rows();
                for bits in 0..4u32 {
                    let mut x = assignment(&vars, bits);
                    let holds = c.row().is_satisfied_by(&x);
                    for s in [0, 1] {
                        x.insert(c.id().to_string(), s);
                        let linked = rows.iter().all(|r| r.is_satisfied_by(&x));
                        assert_eq!(linked, holds == (s == 1), "{} with s = {}", c, s);
                    }
                }
            }
        }
    }

    #[test]
    fn test_support_rows_of_and() {
        let c = Constraint::at_least(["x", "y"], 2).unwrap();
        let [implies, implied] = c.support_rows();
        // x + y - 2s >= 0
        assert_eq!(implies.coefficients[c.id()], -2);
        assert_eq!(implies.bias, 0);
        // -x - y + s + 1 >= 0
        assert_eq!(implied.coefficients["x"], -1);
        assert_eq!(implied.coefficients[c.id()], 1);
        assert_eq!(implied.bias, 1);
    }

    #[test]
    fn test_assume_row() {
        let row = AuxiliaryConstraint::assume("x");
        assert!(row.is_satisfied_by(&HashMap::from([("x".to_string(), 1)])));
        assert!(!row.is_satisfied_by(&HashMap::new()));
    }
}
