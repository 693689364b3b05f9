//! # Criteria
//!
//! The immutable, storage-agnostic description of a binding query.
//!
//! `Criteria` is a plain structured record and doubles as the wire
//! contract consumed by backend query translators:
//!
//! ```text
//! {
//!   "fromType": "user", "fromId": "1",
//!   "toType": null, "toId": null,
//!   "relationshipType": "follows",
//!   "where": [
//!     { "field": "score", "operator": ">=", "value": {"type": "Int", "value": 10} },
//!     { "combinator": "or", "conditions": [ ... ] }
//!   ],
//!   "orderBy": [ { "field": "score", "direction": "desc" } ],
//!   "limit": 10, "offset": 0
//! }
//! ```
//!
//! Criteria values are produced by [`builder::CriteriaBuilder`], which never
//! mutates a snapshot once handed out.

pub mod builder;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::model::{EntityRef, Value};
use crate::{Error, Result};

pub use builder::{CriteriaBuilder, Endpoint};

// ============================================================================
// Operators
// ============================================================================

/// Comparison operator of a leaf predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    #[serde(rename = "=")]
    Eq,
    #[serde(rename = "!=")]
    NotEq,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    Gte,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Lte,
    #[serde(rename = "in")]
    In,
    #[serde(rename = "not_in")]
    NotIn,
    #[serde(rename = "between")]
    Between,
    #[serde(rename = "exists")]
    Exists,
    #[serde(rename = "null")]
    Null,
    #[serde(rename = "not_null")]
    NotNull,
}

impl Operator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::NotEq => "!=",
            Operator::Gt => ">",
            Operator::Gte => ">=",
            Operator::Lt => "<",
            Operator::Lte => "<=",
            Operator::In => "in",
            Operator::NotIn => "not_in",
            Operator::Between => "between",
            Operator::Exists => "exists",
            Operator::Null => "null",
            Operator::NotNull => "not_null",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operator {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let op = match s.trim().to_ascii_lowercase().as_str() {
            "=" | "==" => Operator::Eq,
            "!=" | "<>" => Operator::NotEq,
            ">" => Operator::Gt,
            ">=" => Operator::Gte,
            "<" => Operator::Lt,
            "<=" => Operator::Lte,
            "in" => Operator::In,
            "not_in" | "not in" => Operator::NotIn,
            "between" => Operator::Between,
            "exists" => Operator::Exists,
            "null" | "is null" => Operator::Null,
            "not_null" | "is not null" => Operator::NotNull,
            other => return Err(Error::InvalidArgument(format!("unknown operator '{other}'"))),
        };
        Ok(op)
    }
}

// ============================================================================
// Clauses
// ============================================================================

/// A leaf condition: `field operator value`.
///
/// `in`/`not_in` carry a list value, `between` a two-element `[min, max]`
/// list, and the presence operators carry `Null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Predicate {
    pub field: String,
    pub operator: Operator,
    pub value: Value,
}

impl Predicate {
    pub fn new(field: impl Into<String>, operator: Operator, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            operator,
            value: value.into(),
        }
    }
}

/// Logical combinator tag of a clause group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Combinator {
    Or,
}

/// A disjunction of nested clauses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClauseGroup {
    pub combinator: Combinator,
    pub conditions: Vec<Clause>,
}

/// One entry of the `where` list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Clause {
    Group(ClauseGroup),
    Leaf(Predicate),
}

impl Clause {
    pub fn or(conditions: Vec<Clause>) -> Self {
        Clause::Group(ClauseGroup { combinator: Combinator::Or, conditions })
    }
}

impl From<Predicate> for Clause {
    fn from(p: Predicate) -> Self { Clause::Leaf(p) }
}

// ============================================================================
// Sorting
// ============================================================================

/// Sort direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl FromStr for SortDirection {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" => Ok(SortDirection::Asc),
            "desc" => Ok(SortDirection::Desc),
            _ => Err(Error::InvalidArgument(format!(
                "sort direction must be 'asc' or 'desc', got '{s}'"
            ))),
        }
    }
}

/// One `orderBy` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortClause {
    pub field: String,
    pub direction: SortDirection,
}

// ============================================================================
// Criteria
// ============================================================================

/// A complete binding query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Criteria {
    pub from_type: Option<String>,
    pub from_id: Option<String>,
    pub to_type: Option<String>,
    pub to_id: Option<String>,
    pub relationship_type: Option<String>,
    #[serde(rename = "where", default)]
    pub clauses: Vec<Clause>,
    #[serde(default)]
    pub order_by: SmallVec<[SortClause; 2]>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl Criteria {
    /// The "from" endpoint filter, when both type and id are set.
    pub fn from_ref(&self) -> Option<EntityRef> {
        Some(EntityRef::new(self.from_type.as_deref()?, self.from_id.as_deref()?))
    }

    /// The "to" endpoint filter, when both type and id are set.
    pub fn to_ref(&self) -> Option<EntityRef> {
        Some(EntityRef::new(self.to_type.as_deref()?, self.to_id.as_deref()?))
    }

    /// Same criteria without limit and offset.
    pub fn unpaged(&self) -> Criteria {
        Criteria { limit: None, offset: None, ..self.clone() }
    }

    /// True if any of the index-backed filters is present.
    pub fn has_indexed_filter(&self) -> bool {
        self.from_ref().is_some() || self.to_ref().is_some() || self.relationship_type.is_some()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_operator_parse() {
        assert_eq!("=".parse::<Operator>().unwrap(), Operator::Eq);
        assert_eq!("IN".parse::<Operator>().unwrap(), Operator::In);
        assert_eq!("not in".parse::<Operator>().unwrap(), Operator::NotIn);
        assert!(matches!("~=".parse::<Operator>(), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn test_direction_parse() {
        assert_eq!("ASC".parse::<SortDirection>().unwrap(), SortDirection::Asc);
        assert_eq!(" Desc ".parse::<SortDirection>().unwrap(), SortDirection::Desc);
        assert!(matches!("up".parse::<SortDirection>(), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn test_wire_shape() {
        let criteria = Criteria {
            from_type: Some("user".into()),
            from_id: Some("1".into()),
            relationship_type: Some("follows".into()),
            clauses: vec![
                Predicate::new("score", Operator::Gte, 10).into(),
                Clause::or(vec![
                    Predicate::new("tier", Operator::Eq, "gold").into(),
                    Predicate::new("tier", Operator::Null, Value::Null).into(),
                ]),
            ],
            order_by: smallvec::smallvec![SortClause {
                field: "score".into(),
                direction: SortDirection::Desc,
            }],
            limit: Some(5),
            ..Criteria::default()
        };

        let json: serde_json::Value = serde_json::from_str(&criteria.to_json().unwrap()).unwrap();
        assert_eq!(json["fromType"], "user");
        assert_eq!(json["relationshipType"], "follows");
        assert_eq!(json["where"][0]["operator"], ">=");
        assert_eq!(json["where"][1]["combinator"], "or");
        assert_eq!(json["where"][1]["conditions"][1]["operator"], "null");
        assert_eq!(json["orderBy"][0]["direction"], "desc");
        assert_eq!(json["limit"], 5);
        assert!(json["offset"].is_null());

        let back = Criteria::from_json(&criteria.to_json().unwrap()).unwrap();
        assert_eq!(back, criteria);
    }

    #[test]
    fn test_endpoint_refs_need_type_and_id() {
        let criteria = Criteria { from_type: Some("user".into()), ..Criteria::default() };
        assert_eq!(criteria.from_ref(), None);
        assert!(!criteria.has_indexed_filter());
    }
}
