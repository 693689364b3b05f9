//! Fluent, persistent criteria builder.
//!
//! Every method takes `&self` and returns a new builder; the receiver is
//! never touched. A builder can therefore be kept as a template and
//! extended in several directions, or shared across tasks without locking.

use std::fmt;
use std::sync::Arc;

use super::{Clause, Criteria, Operator, Predicate, SortClause, SortDirection};
use crate::model::{Binding, Entity, EntityRef, Value};
use crate::storage::BindingStore;
use crate::{Error, Result};

// ============================================================================
// Endpoint
// ============================================================================

/// An endpoint argument: either a domain object to be resolved through
/// the store's identity extraction, or a raw type with an explicit id.
#[derive(Clone)]
pub enum Endpoint<'a> {
    Entity(&'a dyn Entity),
    Raw {
        entity_type: String,
        entity_id: Option<String>,
    },
}

impl<'a> Endpoint<'a> {
    pub fn entity(entity: &'a dyn Entity) -> Self {
        Endpoint::Entity(entity)
    }

    pub fn raw(entity_type: impl Into<String>, entity_id: impl Into<String>) -> Self {
        Endpoint::Raw {
            entity_type: entity_type.into(),
            entity_id: Some(entity_id.into()),
        }
    }

    /// Resolve to a concrete (type, id) pair.
    ///
    /// Extraction errors from the entity are returned unchanged.
    pub fn resolve(&self, store: &dyn BindingStore) -> Result<EntityRef> {
        match self {
            Endpoint::Entity(entity) => store.extract_entity(*entity),
            Endpoint::Raw { entity_type, entity_id: Some(id) } => {
                Ok(EntityRef::new(entity_type.as_str(), id.as_str()))
            }
            Endpoint::Raw { entity_id: None, .. } => Err(Error::InvalidArgument(
                "entity id required when type given without a resolved entity".into(),
            )),
        }
    }
}

impl fmt::Debug for Endpoint<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Entity(_) => f.write_str("Endpoint::Entity(..)"),
            Endpoint::Raw { entity_type, entity_id } => f
                .debug_struct("Endpoint::Raw")
                .field("entity_type", entity_type)
                .field("entity_id", entity_id)
                .finish(),
        }
    }
}

impl<'a> From<&'a dyn Entity> for Endpoint<'a> {
    fn from(entity: &'a dyn Entity) -> Self { Endpoint::Entity(entity) }
}

impl<'a> From<&'a EntityRef> for Endpoint<'a> {
    fn from(entity: &'a EntityRef) -> Self { Endpoint::Entity(entity) }
}

impl From<EntityRef> for Endpoint<'_> {
    fn from(entity: EntityRef) -> Self {
        Endpoint::Raw {
            entity_type: entity.entity_type,
            entity_id: Some(entity.entity_id),
        }
    }
}

impl<T: Into<String>, I: Into<String>> From<(T, I)> for Endpoint<'_> {
    fn from((entity_type, entity_id): (T, I)) -> Self {
        Endpoint::raw(entity_type, entity_id)
    }
}

/// A bare type string. Resolving it fails: an id is required.
impl From<&str> for Endpoint<'_> {
    fn from(entity_type: &str) -> Self {
        Endpoint::Raw { entity_type: entity_type.to_owned(), entity_id: None }
    }
}

// ============================================================================
// CriteriaBuilder
// ============================================================================

/// Builds a [`Criteria`] snapshot and runs it against a store.
#[derive(Clone)]
pub struct CriteriaBuilder {
    store: Arc<dyn BindingStore>,
    criteria: Criteria,
}

impl CriteriaBuilder {
    pub fn new(store: Arc<dyn BindingStore>) -> Self {
        Self { store, criteria: Criteria::default() }
    }

    /// The current snapshot.
    pub fn criteria(&self) -> &Criteria {
        &self.criteria
    }

    pub fn into_criteria(self) -> Criteria {
        self.criteria
    }

    fn derive(&self, change: impl FnOnce(&mut Criteria)) -> Self {
        let mut criteria = self.criteria.clone();
        change(&mut criteria);
        Self { store: Arc::clone(&self.store), criteria }
    }

    fn push(&self, clause: Clause) -> Self {
        self.derive(|c| c.clauses.push(clause))
    }

    // ========================================================================
    // Filters
    // ========================================================================

    /// Only bindings whose source is `endpoint`.
    pub fn from_endpoint<'e>(&self, endpoint: impl Into<Endpoint<'e>>) -> Result<Self> {
        let entity = endpoint.into().resolve(self.store.as_ref())?;
        Ok(self.derive(|c| {
            c.from_type = Some(entity.entity_type);
            c.from_id = Some(entity.entity_id);
        }))
    }

    /// Only bindings whose target is `endpoint`.
    pub fn to_endpoint<'e>(&self, endpoint: impl Into<Endpoint<'e>>) -> Result<Self> {
        let entity = endpoint.into().resolve(self.store.as_ref())?;
        Ok(self.derive(|c| {
            c.to_type = Some(entity.entity_type);
            c.to_id = Some(entity.entity_id);
        }))
    }

    /// Exact relationship-type filter.
    pub fn with_type(&self, binding_type: impl Into<String>) -> Self {
        let binding_type = binding_type.into();
        self.derive(|c| c.relationship_type = Some(binding_type))
    }

    /// `field = value`
    pub fn where_eq(&self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.where_op(field, Operator::Eq, value)
    }

    /// Leaf predicate with an explicit operator.
    pub fn where_op(
        &self,
        field: impl Into<String>,
        operator: Operator,
        value: impl Into<Value>,
    ) -> Self {
        self.push(Predicate::new(field, operator, value).into())
    }

    pub fn where_in<V: Into<Value>>(
        &self,
        field: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        let list = Value::List(values.into_iter().map(Into::into).collect());
        self.where_op(field, Operator::In, list)
    }

    pub fn where_not_in<V: Into<Value>>(
        &self,
        field: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        let list = Value::List(values.into_iter().map(Into::into).collect());
        self.where_op(field, Operator::NotIn, list)
    }

    /// Inclusive range. Bounds are not checked here: `min > max` simply
    /// matches nothing.
    pub fn where_between(
        &self,
        field: impl Into<String>,
        min: impl Into<Value>,
        max: impl Into<Value>,
    ) -> Self {
        let bounds = Value::List(vec![min.into(), max.into()]);
        self.where_op(field, Operator::Between, bounds)
    }

    /// The key is present, whatever its value (including null).
    pub fn where_exists(&self, field: impl Into<String>) -> Self {
        self.where_op(field, Operator::Exists, Value::Null)
    }

    /// The key is present and holds null. An absent key does not match.
    pub fn where_null(&self, field: impl Into<String>) -> Self {
        self.where_op(field, Operator::Null, Value::Null)
    }

    /// The key is present and holds a non-null value.
    pub fn where_not_null(&self, field: impl Into<String>) -> Self {
        self.where_op(field, Operator::NotNull, Value::Null)
    }

    /// Disjunction of the clauses added by `build` to a fresh builder.
    ///
    /// Only the sub-builder's `where` clauses are lifted; endpoint, type,
    /// ordering and paging set inside `build` are ignored. An empty group
    /// matches nothing.
    pub fn or_group<F>(&self, build: F) -> Self
    where
        F: FnOnce(CriteriaBuilder) -> CriteriaBuilder,
    {
        let sub = build(CriteriaBuilder::new(Arc::clone(&self.store)));
        self.push(Clause::or(sub.criteria.clauses))
    }

    // ========================================================================
    // Ordering and paging
    // ========================================================================

    /// Append a sort key. `direction` is case-insensitive `asc` or `desc`.
    pub fn order_by(&self, field: impl Into<String>, direction: &str) -> Result<Self> {
        let direction = direction.parse::<SortDirection>()?;
        Ok(self.sort_by(field, direction))
    }

    pub fn sort_by(&self, field: impl Into<String>, direction: SortDirection) -> Self {
        let clause = SortClause { field: field.into(), direction };
        self.derive(|c| c.order_by.push(clause))
    }

    pub fn limit(&self, n: i64) -> Result<Self> {
        let n = non_negative("limit", n)?;
        Ok(self.derive(|c| c.limit = Some(n)))
    }

    pub fn offset(&self, n: i64) -> Result<Self> {
        let n = non_negative("offset", n)?;
        Ok(self.derive(|c| c.offset = Some(n)))
    }

    // ========================================================================
    // Terminal operations
    // ========================================================================

    /// Run the query and return the ordered page.
    pub async fn execute(&self) -> Result<Vec<Binding>> {
        self.store.execute_query(&self.criteria).await
    }

    /// First binding of the fully sorted result (honours offset).
    pub async fn first(&self) -> Result<Option<Binding>> {
        let page = self.derive(|c| c.limit = Some(1));
        Ok(page.execute().await?.into_iter().next())
    }

    /// Number of matches, ignoring limit and offset.
    pub async fn count(&self) -> Result<usize> {
        self.store.count(&self.criteria.unpaged()).await
    }

    pub async fn exists(&self) -> Result<bool> {
        Ok(self.count().await? > 0)
    }
}

impl fmt::Debug for CriteriaBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CriteriaBuilder")
            .field("store", &self.store.kind())
            .field("criteria", &self.criteria)
            .finish()
    }
}

fn non_negative(name: &str, n: i64) -> Result<usize> {
    usize::try_from(n)
        .map_err(|_| Error::InvalidArgument(format!("{name} must be non-negative, got {n}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::criteria::ClauseGroup;
    use crate::storage::MemoryStore;
    use pretty_assertions::assert_eq;

    fn builder() -> CriteriaBuilder {
        CriteriaBuilder::new(Arc::new(MemoryStore::new()))
    }

    struct Broken;

    impl Entity for Broken {
        fn entity_type(&self) -> Result<String> {
            Err(Error::EntityExtraction("no type on Broken".into()))
        }

        fn entity_id(&self) -> Result<String> {
            Ok("1".into())
        }
    }

    #[test]
    fn test_two_arg_where_is_equality() {
        let a = builder().where_eq("score", 3);
        let b = builder().where_op("score", Operator::Eq, 3);
        assert_eq!(a.criteria(), b.criteria());
    }

    #[test]
    fn test_mutators_do_not_touch_receiver() {
        let base = builder().with_type("follows");
        let narrowed = base.where_eq("score", 1).limit(3).unwrap();

        assert!(base.criteria().clauses.is_empty());
        assert_eq!(base.criteria().limit, None);
        assert_eq!(narrowed.criteria().clauses.len(), 1);
        assert_eq!(narrowed.criteria().relationship_type.as_deref(), Some("follows"));
    }

    #[test]
    fn test_endpoint_forms() {
        let q = builder()
            .from_endpoint(("user", "1")).unwrap()
            .to_endpoint(&EntityRef::new("team", "7")).unwrap();
        assert_eq!(q.criteria().from_ref(), Some(EntityRef::new("user", "1")));
        assert_eq!(q.criteria().to_ref(), Some(EntityRef::new("team", "7")));
    }

    #[test]
    fn test_bare_type_endpoint_rejected() {
        let err = builder().from_endpoint("user").unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(ref m) if m.contains("entity id required")));
    }

    #[test]
    fn test_extraction_failure_propagates() {
        let broken = Broken;
        let err = builder().to_endpoint(Endpoint::entity(&broken)).unwrap_err();
        assert!(matches!(err, Error::EntityExtraction(ref m) if m == "no type on Broken"));
    }

    #[test]
    fn test_leaf_shapes() {
        let q = builder()
            .where_in("tier", ["gold", "silver"])
            .where_between("score", 10, 20)
            .where_exists("note")
            .where_null("deleted");
        let clauses = &q.criteria().clauses;

        assert_eq!(clauses[0], Clause::from(Predicate::new("tier", Operator::In, vec!["gold", "silver"])));
        assert_eq!(clauses[1], Clause::from(Predicate::new("score", Operator::Between, vec![10, 20])));
        assert_eq!(clauses[2], Clause::from(Predicate::new("note", Operator::Exists, Value::Null)));
        assert_eq!(clauses[3], Clause::from(Predicate::new("deleted", Operator::Null, Value::Null)));
    }

    #[test]
    fn test_or_group_lifts_only_clauses() {
        let q = builder().where_eq("active", true).or_group(|sub| {
            sub.where_eq("tier", "gold")
                .where_eq("tier", "silver")
                .with_type("ignored")
                .or_group(|inner| inner.where_null("tier"))
        });

        assert_eq!(q.criteria().relationship_type, None);
        assert_eq!(q.criteria().clauses.len(), 2);
        let Clause::Group(ClauseGroup { conditions, .. }) = &q.criteria().clauses[1] else {
            panic!("expected an OR group");
        };
        assert_eq!(conditions.len(), 3);
        assert!(matches!(conditions[2], Clause::Group(_)));
    }

    #[test]
    fn test_template_reuse_inside_or_group() {
        let gold = builder().where_eq("tier", "gold");
        let q = builder().or_group(|_| gold.where_eq("tier", "silver"));

        assert_eq!(gold.criteria().clauses.len(), 1);
        let Clause::Group(group) = &q.criteria().clauses[0] else {
            panic!("expected an OR group");
        };
        assert_eq!(group.conditions.len(), 2);
    }

    #[test]
    fn test_order_by_normalizes_direction() {
        let q = builder().order_by("score", "DESC").unwrap().order_by("id", "Asc").unwrap();
        let dirs: Vec<_> = q.criteria().order_by.iter().map(|s| s.direction).collect();
        assert_eq!(dirs, vec![SortDirection::Desc, SortDirection::Asc]);

        assert!(matches!(builder().order_by("score", "sideways"), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn test_negative_paging_rejected() {
        assert!(matches!(builder().limit(-1), Err(Error::InvalidArgument(_))));
        assert!(matches!(builder().offset(-5), Err(Error::InvalidArgument(_))));
        assert_eq!(builder().limit(0).unwrap().criteria().limit, Some(0));
    }
}
