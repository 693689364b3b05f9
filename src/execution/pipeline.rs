//! Result pipeline: sort, then paginate.

use std::cmp::Ordering;

use super::Candidate;
use crate::criteria::{SortClause, SortDirection};
use crate::model::Binding;

/// Stable multi-key sort.
///
/// Keys apply left to right; remaining ties are broken by creation
/// sequence (always ascending), so repeated queries return the same order.
pub fn sort(rows: &mut [Candidate<'_>], order: &[SortClause]) {
    rows.sort_by(|a, b| {
        order
            .iter()
            .map(|clause| {
                let ordering = compare_field(a.binding, b.binding, &clause.field);
                match clause.direction {
                    SortDirection::Asc => ordering,
                    SortDirection::Desc => ordering.reverse(),
                }
            })
            .find(|ordering| ordering.is_ne())
            .unwrap_or_else(|| a.sequence.cmp(&b.sequence))
    });
}

/// Skip `offset` rows, then keep at most `limit`.
pub fn paginate<T>(rows: Vec<T>, offset: Option<usize>, limit: Option<usize>) -> Vec<T> {
    rows.into_iter()
        .skip(offset.unwrap_or(0))
        .take(limit.unwrap_or(usize::MAX))
        .collect()
}

/// Missing fields sort before present ones, present values by
/// [`Value::sort_cmp`](crate::model::Value::sort_cmp).
fn compare_field(a: &Binding, b: &Binding, field: &str) -> Ordering {
    match (a.field(field), b.field(field)) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(x), Some(y)) => x.sort_cmp(&y),
    }
}
