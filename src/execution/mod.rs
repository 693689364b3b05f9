//! Query execution engine.
//!
//! Runs a [`Criteria`] over a set of candidate bindings:
//!
//! ```text
//! candidates ─▶ evaluator::matches ─▶ pipeline::sort ─▶ pipeline::paginate ─▶ Vec<Binding>
//! ```
//!
//! Candidate selection belongs to the store (see [`crate::index`]); the
//! engine itself holds no state and performs no I/O, so any backend that
//! can enumerate bindings in creation order can reuse it.

pub mod evaluator;
pub mod pipeline;

use crate::criteria::Criteria;
use crate::model::Binding;

/// A stored binding together with its creation sequence number.
///
/// The sequence is the final sort tie-breaker.
#[derive(Debug, Clone, Copy)]
pub struct Candidate<'a> {
    pub sequence: u64,
    pub binding: &'a Binding,
}

/// Filter, sort and paginate.
pub fn execute<'a>(
    candidates: impl IntoIterator<Item = Candidate<'a>>,
    criteria: &Criteria,
) -> Vec<Binding> {
    let mut rows: Vec<Candidate<'a>> = candidates
        .into_iter()
        .filter(|c| evaluator::matches(c.binding, criteria))
        .collect();
    let matched = rows.len();

    pipeline::sort(&mut rows, &criteria.order_by);
    let page: Vec<Binding> = pipeline::paginate(rows, criteria.offset, criteria.limit)
        .into_iter()
        .map(|c| c.binding.clone())
        .collect();

    tracing::trace!(matched, returned = page.len(), "executed criteria");
    page
}

/// Number of matching candidates. Limit and offset are ignored.
pub fn count<'a>(candidates: impl IntoIterator<Item = Candidate<'a>>, criteria: &Criteria) -> usize {
    candidates
        .into_iter()
        .filter(|c| evaluator::matches(c.binding, criteria))
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::criteria::{SortClause, SortDirection};
    use crate::model::{meta, EntityRef};

    fn data() -> Vec<Binding> {
        (0..6)
            .map(|i| {
                Binding::new(
                    EntityRef::new("user", i.to_string()),
                    EntityRef::new("post", "1"),
                    if i % 2 == 0 { "likes" } else { "shares" },
                    meta([("score", i)]),
                )
            })
            .collect()
    }

    fn candidates(data: &[Binding]) -> impl Iterator<Item = Candidate<'_>> {
        data.iter().enumerate().map(|(i, binding)| Candidate { sequence: i as u64, binding })
    }

    #[test]
    fn test_execute_filters_sorts_and_pages() {
        let data = data();
        let criteria = Criteria {
            relationship_type: Some("likes".into()),
            order_by: smallvec::smallvec![SortClause { field: "score".into(), direction: SortDirection::Desc }],
            offset: Some(1),
            limit: Some(5),
            ..Criteria::default()
        };

        let ids: Vec<_> = execute(candidates(&data), &criteria)
            .into_iter()
            .map(|b| b.from_id)
            .collect();
        assert_eq!(ids, vec!["2", "0"]);
        assert_eq!(count(candidates(&data), &criteria), 3);
    }

    #[test]
    fn test_execute_without_order_keeps_creation_order() {
        let data = data();
        let mut shuffled: Vec<_> = candidates(&data).collect();
        shuffled.reverse();

        let ids: Vec<_> = execute(shuffled, &Criteria::default())
            .into_iter()
            .map(|b| b.from_id)
            .collect();
        assert_eq!(ids, vec!["0", "1", "2", "3", "4", "5"]);
    }
}
