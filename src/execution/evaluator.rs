//! Predicate evaluation.
//!
//! Decides whether a single binding satisfies a criteria tree. Evaluation
//! never fails: a missing field or a type mismatch is simply "no match".

use std::cmp::Ordering;

use crate::criteria::{Clause, Criteria, Operator, Predicate};
use crate::model::{Binding, Value};

/// Full match: endpoint filters, type filter, then every clause (AND).
pub fn matches(binding: &Binding, criteria: &Criteria) -> bool {
    filter_eq(criteria.from_type.as_deref(), &binding.from_type)
        && filter_eq(criteria.from_id.as_deref(), &binding.from_id)
        && filter_eq(criteria.to_type.as_deref(), &binding.to_type)
        && filter_eq(criteria.to_id.as_deref(), &binding.to_id)
        && filter_eq(criteria.relationship_type.as_deref(), &binding.binding_type)
        && criteria.clauses.iter().all(|clause| clause_matches(binding, clause))
}

fn filter_eq(filter: Option<&str>, actual: &str) -> bool {
    filter.is_none_or(|expected| expected == actual)
}

/// A leaf matches by its operator; an OR group matches if any nested
/// clause does, so an empty group matches nothing.
pub fn clause_matches(binding: &Binding, clause: &Clause) -> bool {
    match clause {
        Clause::Leaf(predicate) => predicate_matches(binding, predicate),
        Clause::Group(group) => group.conditions.iter().any(|c| clause_matches(binding, c)),
    }
}

pub fn predicate_matches(binding: &Binding, predicate: &Predicate) -> bool {
    let actual = binding.field(&predicate.field);
    let expected = &predicate.value;

    match (predicate.operator, actual.as_deref()) {
        (Operator::Exists, found) => found.is_some(),
        (Operator::Null, found) => matches!(found, Some(Value::Null)),
        (Operator::NotNull, found) => found.is_some_and(|v| !v.is_null()),
        (_, None) => false,

        (Operator::Eq, Some(v)) => v.matches(expected),
        (Operator::NotEq, Some(v)) => !v.matches(expected),
        (Operator::Gt, Some(v)) => v.compare(expected) == Some(Ordering::Greater),
        (Operator::Gte, Some(v)) => at_least(v, expected),
        (Operator::Lt, Some(v)) => v.compare(expected) == Some(Ordering::Less),
        (Operator::Lte, Some(v)) => at_most(v, expected),
        (Operator::In, Some(v)) => match expected {
            Value::List(items) => items.iter().any(|item| v.matches(item)),
            _ => false,
        },
        (Operator::NotIn, Some(v)) => match expected {
            Value::List(items) => !items.iter().any(|item| v.matches(item)),
            _ => false,
        },
        (Operator::Between, Some(v)) => match expected.as_list() {
            Some([min, max]) => at_least(v, min) && at_most(v, max),
            _ => false,
        },
    }
}

fn at_least(v: &Value, bound: &Value) -> bool {
    matches!(v.compare(bound), Some(Ordering::Greater | Ordering::Equal))
}

fn at_most(v: &Value, bound: &Value) -> bool {
    matches!(v.compare(bound), Some(Ordering::Less | Ordering::Equal))
}
