use std::fmt;

use indexmap::IndexSet;
use log::debug;

use crate::constraint::Constraint;
use crate::error::{Error, Result};
use crate::model::Model;

/// Propositional connectives understood by [`Model::set`].
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Connective {
    And,
    Or,
    Not,
    Xor,
    OneOrNone,
    Imply,
    Equiv,
    AtLeast(i64),
    AtMost(i64),
}

// Getters
impl Connective {
    /// Minimum number of distinct operands.
    pub fn min_operands(self) -> usize {
        match self {
            Connective::And | Connective::Or | Connective::Xor => 2,
            Connective::Imply | Connective::Equiv => 2,
            Connective::Not | Connective::OneOrNone => 1,
            Connective::AtLeast(_) | Connective::AtMost(_) => 1,
        }
    }

    /// Connectives over an ordered pair rather than a set.
    pub fn is_binary(self) -> bool {
        matches!(self, Connective::Imply | Connective::Equiv)
    }
}

impl fmt::Display for Connective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Connective::And => write!(f, "AND"),
            Connective::Or => write!(f, "OR"),
            Connective::Not => write!(f, "NOT"),
            Connective::Xor => write!(f, "XOR"),
            Connective::OneOrNone => write!(f, "ONE_OR_NONE"),
            Connective::Imply => write!(f, "IMPLY"),
            Connective::Equiv => write!(f, "EQUIV"),
            Connective::AtLeast(k) => write!(f, "AT_LEAST({})", k),
            Connective::AtMost(k) => write!(f, "AT_MOST({})", k),
        }
    }
}

fn owned<I, S>(operands: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    operands.into_iter().map(|s| s.as_ref().to_string()).collect()
}

impl Model {
    /// Lowers `connective` over `operands` into linear constraints and returns the id
    /// of the support variable that is true iff the connective holds.
    ///
    /// Operands are de-duplicated (keeping first occurrences) for every connective
    /// except [`Imply`][Connective::Imply] and [`Equiv`][Connective::Equiv], which take
    /// exactly two operands. Building the same connective again returns the same id
    /// and leaves the model unchanged.
    pub fn set<I, S>(&mut self, connective: Connective, operands: I) -> Result<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let operands = owned(operands);
        self.require(&operands)?;

        if connective.is_binary() {
            let [a, b]: [String; 2] = operands.try_into().map_err(|ops: Vec<String>| {
                Error::invalid_operand(format!("{:?}", ops), format!("{} takes exactly two operands", connective))
            })?;
            debug!("set({}, [{}, {}])", connective, a, b);
            return match connective {
                Connective::Imply => {
                    let not_a = self.set_not([&a])?;
                    self.set_or([not_a, b])
                }
                _ => {
                    if a == b {
                        return Err(Error::invalid_operand(&a, "EQUIV needs two distinct operands"));
                    }
                    let both = self.set_and([&a, &b])?;
                    let neither = self.set_not([&a, &b])?;
                    self.set_or([both, neither])
                }
            };
        }

        let distinct: IndexSet<String> = operands.into_iter().collect();
        if distinct.len() < connective.min_operands() {
            return Err(Error::invalid_operand(
                format!("{:?}", distinct),
                format!("{} needs at least {} distinct operands", connective, connective.min_operands()),
            ));
        }
        debug!("set({}, {:?})", connective, distinct);

        let n = distinct.len() as i64;
        let constraint = match connective {
            Connective::And => Constraint::at_least(distinct, n)?,
            Connective::Or => Constraint::at_least(distinct, 1)?,
            Connective::Not => Constraint::at_most(distinct, 0)?,
            Connective::OneOrNone => Constraint::at_most(distinct, 1)?,
            Connective::AtLeast(k) => Constraint::at_least(distinct, k)?,
            Connective::AtMost(k) => Constraint::at_most(distinct, k)?,
            Connective::Xor => {
                let some = self.insert_constraint(Constraint::at_least(distinct.iter(), 1)?)?;
                let few = self.insert_constraint(Constraint::at_most(distinct.iter(), 1)?)?;
                Constraint::at_least([some, few], 2)?
            }
            Connective::Imply | Connective::Equiv => unreachable!(),
        };
        self.insert_constraint(constraint)
    }

    pub fn set_and<I, S>(&mut self, operands: I) -> Result<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.set(Connective::And, operands)
    }

    pub fn set_or<I, S>(&mut self, operands: I) -> Result<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.set(Connective::Or, operands)
    }

    /// True iff none of the operands holds.
    pub fn set_not<I, S>(&mut self, operands: I) -> Result<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.set(Connective::Not, operands)
    }

    /// True iff exactly one operand holds.
    pub fn set_xor<I, S>(&mut self, operands: I) -> Result<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.set(Connective::Xor, operands)
    }

    pub fn set_one_or_none<I, S>(&mut self, operands: I) -> Result<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.set(Connective::OneOrNone, operands)
    }

    pub fn set_imply(&mut self, condition: &str, consequence: &str) -> Result<String> {
        self.set(Connective::Imply, [condition, consequence])
    }

    pub fn set_equiv(&mut self, a: &str, b: &str) -> Result<String> {
        self.set(Connective::Equiv, [a, b])
    }

    pub fn set_at_least<I, S>(&mut self, operands: I, k: i64) -> Result<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.set(Connective::AtLeast(k), operands)
    }

    pub fn set_at_most<I, S>(&mut self, operands: I, k: i64) -> Result<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.set(Connective::AtMost(k), operands)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use test_log::test;

    use super::*;

    /// Assignments of `primitives` that extend to a feasible point of the model.
    fn models(model: &Model, primitives: &[&str]) -> BTreeSet<Vec<i64>> {
        let polyhedron = model.to_polyhedron().unwrap();
        let n = model.variables().len();
        let columns: Vec<usize> = primitives
            .iter()
            .map(|p| model.variables().get_index_of(*p).unwrap())
            .collect();
        let mut result = BTreeSet::new();
        for bits in 0..(1u64 << n) {
            let x: Vec<i64> = (0..n).map(|i| ((bits >> i) & 1) as i64).collect();
            if polyhedron.satisfies(&x) {
                result.insert(columns.iter().map(|&c| x[c]).collect());
            }
        }
        result
    }

    fn truth_table(connective: Connective, arity: usize, f: impl Fn(&[i64]) -> bool) {
        let names: Vec<String> = (0..arity).map(|i| format!("v{}", i)).collect();
        let mut model = Model::new();
        model.add_primitives(names.clone()).unwrap();
        let id = model.set(connective, &names).unwrap();
        model.assume([&id]).unwrap();

        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        let expected: BTreeSet<Vec<i64>> = (0..(1u64 << arity))
            .map(|bits| (0..arity).map(|i| ((bits >> i) & 1) as i64).collect::<Vec<_>>())
            .filter(|x| f(x))
            .collect();
        assert_eq!(models(&model, &refs), expected, "{}", connective);
    }

    #[test]
    fn test_truth_tables() {
        truth_table(Connective::And, 3, |x| x.iter().all(|&v| v == 1));
        truth_table(Connective::Or, 3, |x| x.iter().any(|&v| v == 1));
        truth_table(Connective::Not, 2, |x| x.iter().all(|&v| v == 0));
        truth_table(Connective::Xor, 3, |x| x.iter().sum::<i64>() == 1);
        truth_table(Connective::OneOrNone, 3, |x| x.iter().sum::<i64>() <= 1);
        truth_table(Connective::Imply, 2, |x| x[0] == 0 || x[1] == 1);
        truth_table(Connective::Equiv, 2, |x| x[0] == x[1]);
        truth_table(Connective::AtLeast(2), 3, |x| x.iter().sum::<i64>() >= 2);
        truth_table(Connective::AtMost(2), 3, |x| x.iter().sum::<i64>() <= 2);
    }

    #[test]
    fn test_lowering_is_idempotent() {
        let mut model = Model::new();
        model.add_primitives(["a", "b", "c"]).unwrap();
        let first = model.set_xor(["a", "b", "c"]).unwrap();
        let count = model.variables().len();
        let second = model.set_xor(["c", "b", "a"]).unwrap();
        assert_eq!(first, second);
        assert_eq!(model.variables().len(), count);
        // XOR introduces at-least-1, at-most-1 and their conjunction.
        assert_eq!(model.support_variables().len(), 3);
    }

    #[test]
    fn test_operands_are_deduplicated() {
        let mut model = Model::new();
        model.add_primitives(["a", "b"]).unwrap();
        let with_dup = model.set_and(["a", "b", "a"]).unwrap();
        let plain = model.set_and(["a", "b"]).unwrap();
        assert_eq!(with_dup, plain);
        assert!(matches!(model.set_or(["a", "a"]), Err(Error::InvalidOperand { .. })));
        assert!(model.set_not(["a", "a"]).is_ok());
    }

    #[test]
    fn test_operand_failures() {
        let mut model = Model::new();
        model.add_primitives(["a", "b"]).unwrap();
        assert_eq!(model.set_and(["a", "z"]), Err(Error::NotFound("z".to_string())));
        assert_eq!(model.set_and(["a", ""]), Err(Error::Empty));
        assert!(matches!(model.set_equiv("a", "a"), Err(Error::InvalidOperand { .. })));
        assert!(matches!(model.set(Connective::Imply, ["a"]), Err(Error::InvalidOperand { .. })));
        assert!(matches!(model.set_at_least(["a", "b"], 3), Err(Error::InvalidOperand { .. })));
        let none: [&str; 0] = [];
        assert!(matches!(model.set_not(none), Err(Error::InvalidOperand { .. })));
        // Nothing was added by the failed calls.
        assert_eq!(model.variables().len(), 2);
    }

    #[test]
    fn test_nested() {
        let mut model = Model::new();
        model.add_primitives(["a", "b", "c"]).unwrap();
        let ab = model.set_or(["a", "b"]).unwrap();
        let root = model.set_imply(&ab, "c").unwrap();
        model.assume([&root]).unwrap();
        let feasible = models(&model, &["a", "b", "c"]);
        assert!(feasible.contains(&vec![1, 0, 1]));
        assert!(!feasible.contains(&vec![1, 0, 0]));
        assert!(!feasible.contains(&vec![0, 1, 0]));
        assert!(feasible.contains(&vec![0, 0, 0]));
    }
}
