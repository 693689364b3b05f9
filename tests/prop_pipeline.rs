//! Property tests for the result pipeline: paging, counting, ordering,
//! and the equivalence of `in` with an OR group of equalities.

use entity_bindings::execution::{self, Candidate};
use entity_bindings::{
    meta, Binding, Clause, Criteria, EntityRef, Operator, Predicate, SortClause, SortDirection,
    Value,
};
use proptest::prelude::*;
use smallvec::smallvec;

fn dataset(scores: &[i64]) -> Vec<Binding> {
    scores
        .iter()
        .enumerate()
        .map(|(i, score)| {
            Binding::new(
                EntityRef::new("user", "1"),
                EntityRef::new("item", i.to_string()),
                "rates",
                meta([("score", *score)]),
            )
        })
        .collect()
}

fn candidates(bindings: &[Binding]) -> impl Iterator<Item = Candidate<'_>> {
    bindings
        .iter()
        .enumerate()
        .map(|(i, binding)| Candidate { sequence: i as u64, binding })
}

const TWO_53: i64 = 1 << 53;

/// Ints and floats clustered around +/-2^53, where f64 loses integer
/// precision, plus non-finite floats from stores that skip validation.
fn numeric_value() -> impl Strategy<Value = Value> {
    let near = prop_oneof![Just(TWO_53), Just(-TWO_53)];
    prop_oneof![
        (near.clone(), -4i64..4).prop_map(|(base, k)| Value::Int(base + k)),
        (near, -4i64..4).prop_map(|(base, k)| Value::Float((base + k) as f64)),
        (-4i64..4).prop_map(Value::Int),
        (-8i64..8).prop_map(|k| Value::Float(k as f64 / 2.0)),
        Just(Value::Float(f64::NAN)),
        Just(Value::Float(f64::INFINITY)),
        Just(Value::Float(f64::NEG_INFINITY)),
    ]
}

fn mixed_dataset(scores: &[Value]) -> Vec<Binding> {
    scores
        .iter()
        .enumerate()
        .map(|(i, score)| {
            Binding::new(
                EntityRef::new("user", "1"),
                EntityRef::new("item", i.to_string()),
                "rates",
                meta([("score", score.clone())]),
            )
        })
        .collect()
}

fn sorted_by_score(direction: SortDirection) -> Criteria {
    Criteria {
        order_by: smallvec![SortClause { field: "score".into(), direction }],
        ..Criteria::default()
    }
}

fn ids(bindings: &[Binding]) -> Vec<String> {
    bindings.iter().map(|b| b.id.to_string()).collect()
}

proptest! {
    #[test]
    fn paging_is_drop_then_take(
        scores in prop::collection::vec(-20i64..20, 0..40),
        offset in 0usize..50,
        limit in 0usize..50,
    ) {
        let data = dataset(&scores);
        let full_criteria = sorted_by_score(SortDirection::Desc);
        let full = execution::execute(candidates(&data), &full_criteria);

        let paged_criteria = Criteria { offset: Some(offset), limit: Some(limit), ..full_criteria.clone() };
        let page = execution::execute(candidates(&data), &paged_criteria);

        let expected: Vec<Binding> = full.iter().skip(offset).take(limit).cloned().collect();
        prop_assert_eq!(ids(&page), ids(&expected));
        prop_assert_eq!(execution::count(candidates(&data), &paged_criteria), full.len());
    }

    #[test]
    fn order_is_total_and_stable(scores in prop::collection::vec(0i64..5, 0..30)) {
        let data = dataset(&scores);
        for direction in [SortDirection::Asc, SortDirection::Desc] {
            let rows = execution::execute(candidates(&data), &sorted_by_score(direction));
            prop_assert_eq!(rows.len(), data.len());

            for pair in rows.windows(2) {
                let a = pair[0].metadata["score"].as_int().unwrap_or_default();
                let b = pair[1].metadata["score"].as_int().unwrap_or_default();
                let seq = |x: &Binding| data.iter().position(|d| d == x).unwrap_or_default();
                match direction {
                    SortDirection::Asc => prop_assert!(a <= b),
                    SortDirection::Desc => prop_assert!(a >= b),
                }
                if a == b {
                    prop_assert!(seq(&pair[0]) < seq(&pair[1]));
                }
            }
        }
    }

    #[test]
    fn desc_reverses_asc_on_distinct_values(mut scores in prop::collection::vec(-100i64..100, 0..30)) {
        scores.sort_unstable();
        scores.dedup();
        let data = dataset(&scores);

        let asc = execution::execute(candidates(&data), &sorted_by_score(SortDirection::Asc));
        let mut desc = execution::execute(candidates(&data), &sorted_by_score(SortDirection::Desc));
        desc.reverse();
        prop_assert_eq!(ids(&asc), ids(&desc));
    }

    #[test]
    fn in_equals_or_of_equalities(
        scores in prop::collection::vec(0i64..10, 0..30),
        wanted in prop::collection::vec(0i64..12, 1..5),
    ) {
        let data = dataset(&scores);

        let by_in = Criteria {
            clauses: vec![Predicate::new("score", Operator::In, wanted.clone()).into()],
            ..Criteria::default()
        };
        let by_or = Criteria {
            clauses: vec![Clause::or(
                wanted.iter().map(|v| Predicate::new("score", Operator::Eq, *v).into()).collect(),
            )],
            ..Criteria::default()
        };

        let a = execution::execute(candidates(&data), &by_in);
        let b = execution::execute(candidates(&data), &by_or);
        prop_assert_eq!(ids(&a), ids(&b));
        prop_assert_eq!(a.len(), scores.iter().filter(|s| wanted.contains(s)).count());
    }

    #[test]
    fn between_is_inclusive(
        scores in prop::collection::vec(-10i64..10, 0..30),
        low in -10i64..10,
        high in -10i64..10,
    ) {
        let data = dataset(&scores);
        let criteria = Criteria {
            clauses: vec![Predicate::new("score", Operator::Between, vec![low, high]).into()],
            ..Criteria::default()
        };
        let expected = scores.iter().filter(|s| low <= **s && **s <= high).count();
        prop_assert_eq!(execution::count(candidates(&data), &criteria), expected);
    }

    #[test]
    fn mixed_numeric_sort_is_deterministic_and_ordered(
        scores in prop::collection::vec(numeric_value(), 0..60),
        desc in any::<bool>(),
    ) {
        let data = mixed_dataset(&scores);
        let direction = if desc { SortDirection::Desc } else { SortDirection::Asc };
        let criteria = sorted_by_score(direction);

        let first = execution::execute(candidates(&data), &criteria);
        let mut reversed: Vec<_> = candidates(&data).collect();
        reversed.reverse();
        let second = execution::execute(reversed, &criteria);
        prop_assert_eq!(ids(&first), ids(&second));
        prop_assert_eq!(first.len(), data.len());

        for pair in first.windows(2) {
            let ordering = pair[0].metadata["score"].sort_cmp(&pair[1].metadata["score"]);
            match direction {
                SortDirection::Asc => prop_assert_ne!(ordering, std::cmp::Ordering::Greater),
                SortDirection::Desc => prop_assert_ne!(ordering, std::cmp::Ordering::Less),
            }
        }
    }
}
