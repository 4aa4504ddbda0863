//! Immutable, schema-validated query construction.
//!
//! Queries are built incrementally against one model's field set; every
//! builder call returns a new [`Query`] value and never mutates the
//! receiver. Filtering or sorting on a field the schema does not declare
//! fails with a schema error at build time, before any network call.
//!
//! # Filter expressions
//!
//! The [`Filter`] struct provides static constructors for property
//! conditions, combined into an [`Expr`] tree with `and`/`or`:
//!
//! ```ignore
//! let query = Query::new(schema)
//!     .filter(Filter::eq("done", Value::Checkbox(false))
//!         .and(Filter::contains("title", "report")))?
//!     .sort("due", SortDirection::Ascending)?
//!     .limit(50);
//! ```
//!
//! The wire output follows the store's filter grammar exactly, and the
//! order of clauses inside `and`/`or` groups is the caller's order - the
//! store's evaluation can be order-sensitive for mixed logical operators,
//! so the builder never reorders.

use std::sync::Arc;

use serde_json::{Map, Value as Json, json};
use uuid::Uuid;

use crate::{
    error::{PageStoreError, PageStoreResult},
    schema::{FieldDef, FieldKind, Schema},
    value::{DateValue, Value},
};

/// Sort direction for query results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    fn as_wire(&self) -> &'static str {
        match self {
            SortDirection::Ascending => "ascending",
            SortDirection::Descending => "descending",
        }
    }
}

/// Sort specification: a declared field and a direction.
#[derive(Debug, Clone)]
pub struct Sort {
    field: String,
    direction: SortDirection,
}

/// A single property condition.
#[derive(Debug, Clone)]
pub enum Condition {
    /// Field equals the value.
    Equals(Value),
    /// Field does not equal the value.
    DoesNotEqual(Value),
    /// Text or multi-select field contains the string.
    Contains(String),
    /// Relation or people field contains the referenced id.
    ContainsRef(Uuid),
    /// Number field is greater than the value.
    GreaterThan(f64),
    /// Number field is less than the value.
    LessThan(f64),
    /// Date field is on or after the instant.
    OnOrAfter(DateValue),
    /// Date field is on or before the instant.
    OnOrBefore(DateValue),
    /// Field has no value.
    IsEmpty,
    /// Field has a value.
    IsNotEmpty,
}

/// A filter expression tree over one model's fields.
///
/// `And`/`Or` groups preserve the order their members were supplied in.
#[derive(Debug, Clone)]
pub enum Expr {
    And(Vec<Expr>),
    Or(Vec<Expr>),
    Prop { field: String, condition: Condition },
}

impl Expr {
    /// Combines this expression with another using logical AND.
    ///
    /// If this expression is already an AND, the other expression is
    /// appended to the group, preserving order.
    pub fn and(self, other: Expr) -> Self {
        match self {
            Expr::And(mut group) => {
                group.push(other);
                Expr::And(group)
            }
            _ => Expr::And(vec![self, other]),
        }
    }

    /// Combines this expression with another using logical OR.
    pub fn or(self, other: Expr) -> Self {
        match self {
            Expr::Or(mut group) => {
                group.push(other);
                Expr::Or(group)
            }
            _ => Expr::Or(vec![self, other]),
        }
    }
}

/// Helper struct for constructing filter expressions.
pub struct Filter;

impl Filter {
    fn prop(field: impl Into<String>, condition: Condition) -> Expr {
        Expr::Prop { field: field.into(), condition }
    }

    /// Matches records where the field equals the given value.
    pub fn eq(field: impl Into<String>, value: Value) -> Expr {
        Self::prop(field, Condition::Equals(value))
    }

    /// Matches records where the field does not equal the given value.
    pub fn ne(field: impl Into<String>, value: Value) -> Expr {
        Self::prop(field, Condition::DoesNotEqual(value))
    }

    /// Matches records where a text or multi-select field contains the string.
    pub fn contains(field: impl Into<String>, value: impl Into<String>) -> Expr {
        Self::prop(field, Condition::Contains(value.into()))
    }

    /// Matches records where a relation or people field references the id.
    pub fn contains_ref(field: impl Into<String>, id: Uuid) -> Expr {
        Self::prop(field, Condition::ContainsRef(id))
    }

    /// Matches records where a number field is greater than the value.
    pub fn gt(field: impl Into<String>, value: f64) -> Expr {
        Self::prop(field, Condition::GreaterThan(value))
    }

    /// Matches records where a number field is less than the value.
    pub fn lt(field: impl Into<String>, value: f64) -> Expr {
        Self::prop(field, Condition::LessThan(value))
    }

    /// Matches records where a date field is on or after the instant.
    pub fn on_or_after(field: impl Into<String>, value: DateValue) -> Expr {
        Self::prop(field, Condition::OnOrAfter(value))
    }

    /// Matches records where a date field is on or before the instant.
    pub fn on_or_before(field: impl Into<String>, value: DateValue) -> Expr {
        Self::prop(field, Condition::OnOrBefore(value))
    }

    /// Matches records where the field has no value.
    pub fn is_empty(field: impl Into<String>) -> Expr {
        Self::prop(field, Condition::IsEmpty)
    }

    /// Matches records where the field has a value.
    pub fn is_not_empty(field: impl Into<String>) -> Expr {
        Self::prop(field, Condition::IsNotEmpty)
    }

    /// Combines expressions with logical AND, preserving the given order.
    pub fn and(exprs: impl IntoIterator<Item = Expr>) -> Expr {
        Expr::And(exprs.into_iter().collect())
    }

    /// Combines expressions with logical OR, preserving the given order.
    pub fn or(exprs: impl IntoIterator<Item = Expr>) -> Expr {
        Expr::Or(exprs.into_iter().collect())
    }
}

/// An immutable filter/sort/pagination specification bound to one schema.
#[derive(Debug, Clone)]
pub struct Query {
    schema: Arc<Schema>,
    filter: Option<Expr>,
    sorts: Vec<Sort>,
    page_size: Option<usize>,
    start_cursor: Option<String>,
}

impl Query {
    /// Creates an empty query for the given schema.
    pub fn new(schema: Arc<Schema>) -> Self {
        Self {
            schema,
            filter: None,
            sorts: Vec::new(),
            page_size: None,
            start_cursor: None,
        }
    }

    /// The schema this query is bound to.
    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// The requested page size, if one was set.
    pub fn page_size(&self) -> Option<usize> {
        self.page_size
    }

    /// Returns a new query with the expression added to the filter.
    ///
    /// A second `filter` call AND-combines with the existing filter, the
    /// earlier clauses first.
    ///
    /// # Errors
    ///
    /// Returns [`PageStoreError::Schema`] when the expression references an
    /// undeclared field, uses an operator the field's kind does not support,
    /// or contains an empty compound group.
    pub fn filter(&self, expr: Expr) -> PageStoreResult<Self> {
        validate_expr(&self.schema, &expr)?;

        let mut next = self.clone();
        next.filter = Some(match next.filter.take() {
            Some(existing) => existing.and(expr),
            None => expr,
        });

        Ok(next)
    }

    /// Returns a new query with a sort appended.
    ///
    /// # Errors
    ///
    /// Returns [`PageStoreError::Schema`] when the field is not declared.
    pub fn sort(&self, field: &str, direction: SortDirection) -> PageStoreResult<Self> {
        self.schema.expect_field(field)?;

        let mut next = self.clone();
        next.sorts.push(Sort { field: field.to_string(), direction });

        Ok(next)
    }

    /// Returns a new query with the given page size.
    pub fn limit(&self, page_size: usize) -> Self {
        let mut next = self.clone();
        next.page_size = Some(page_size);
        next
    }

    /// Returns a new query resuming after the given pagination cursor.
    pub fn starting_after(&self, cursor: impl Into<String>) -> Self {
        let mut next = self.clone();
        next.start_cursor = Some(cursor.into());
        next
    }

    /// Produces the request body in the store's query grammar.
    pub fn to_wire(&self) -> PageStoreResult<Json> {
        let mut body = Map::new();

        if let Some(expr) = &self.filter {
            body.insert("filter".to_string(), expr_to_wire(&self.schema, expr)?);
        }

        if !self.sorts.is_empty() {
            let sorts = self
                .sorts
                .iter()
                .map(|sort| {
                    let field = self.schema.expect_field(&sort.field)?;

                    Ok(json!({
                        "property": field.property(),
                        "direction": sort.direction.as_wire(),
                    }))
                })
                .collect::<PageStoreResult<Vec<_>>>()?;

            body.insert("sorts".to_string(), Json::Array(sorts));
        }

        if let Some(page_size) = self.page_size {
            body.insert("page_size".to_string(), json!(page_size));
        }

        if let Some(cursor) = &self.start_cursor {
            body.insert("start_cursor".to_string(), json!(cursor));
        }

        Ok(Json::Object(body))
    }
}

fn validate_expr(schema: &Schema, expr: &Expr) -> PageStoreResult<()> {
    match expr {
        Expr::And(group) | Expr::Or(group) => {
            if group.is_empty() {
                return Err(PageStoreError::Schema("empty compound filter group".to_string()));
            }

            group
                .iter()
                .try_for_each(|member| validate_expr(schema, member))
        }
        Expr::Prop { field, condition } => {
            let field = schema.expect_field(field)?;
            validate_condition(field, condition)
        }
    }
}

fn validate_condition(field: &FieldDef, condition: &Condition) -> PageStoreResult<()> {
    let supported = match condition {
        Condition::Equals(value) | Condition::DoesNotEqual(value) => {
            field.check(value)?;
            !matches!(
                field.kind(),
                FieldKind::MultiSelect | FieldKind::Relation | FieldKind::People
            )
        }
        Condition::Contains(_) => matches!(
            field.kind(),
            FieldKind::Title | FieldKind::Text | FieldKind::MultiSelect
        ),
        Condition::ContainsRef(_) => {
            matches!(field.kind(), FieldKind::Relation | FieldKind::People)
        }
        Condition::GreaterThan(_) | Condition::LessThan(_) => {
            matches!(field.kind(), FieldKind::Number)
        }
        Condition::OnOrAfter(_) | Condition::OnOrBefore(_) => {
            matches!(field.kind(), FieldKind::Date)
        }
        Condition::IsEmpty | Condition::IsNotEmpty => true,
    };

    if supported {
        Ok(())
    } else {
        Err(PageStoreError::Schema(format!(
            "operator {} is not supported on {} field '{}'",
            condition.op_name(),
            field.kind().keyword(),
            field.name(),
        )))
    }
}

impl Condition {
    fn op_name(&self) -> &'static str {
        match self {
            Condition::Equals(_) => "equals",
            Condition::DoesNotEqual(_) => "does_not_equal",
            Condition::Contains(_) | Condition::ContainsRef(_) => "contains",
            Condition::GreaterThan(_) => "greater_than",
            Condition::LessThan(_) => "less_than",
            Condition::OnOrAfter(_) => "on_or_after",
            Condition::OnOrBefore(_) => "on_or_before",
            Condition::IsEmpty => "is_empty",
            Condition::IsNotEmpty => "is_not_empty",
        }
    }

    fn operand(&self, field: &FieldDef) -> PageStoreResult<Json> {
        match self {
            Condition::Equals(value) | Condition::DoesNotEqual(value) => {
                equality_operand(field, value)
            }
            Condition::Contains(text) => Ok(json!(text)),
            Condition::ContainsRef(id) => Ok(json!(id.to_string())),
            Condition::GreaterThan(number) | Condition::LessThan(number) => Ok(json!(number)),
            Condition::OnOrAfter(date) | Condition::OnOrBefore(date) => {
                Ok(json!(date.start_string()))
            }
            Condition::IsEmpty | Condition::IsNotEmpty => Ok(json!(true)),
        }
    }
}

/// The scalar an equality condition compares against, per field kind.
fn equality_operand(field: &FieldDef, value: &Value) -> PageStoreResult<Json> {
    match value {
        Value::Text(_) => Ok(json!(value.as_plain_text().unwrap_or_default())),
        Value::Number(number) => Ok(json!(number)),
        Value::Checkbox(checked) => Ok(json!(checked)),
        Value::Select(name) => Ok(json!(name)),
        Value::Date(date) => Ok(json!(date.start_string())),
        Value::Url(text) | Value::Email(text) => Ok(json!(text)),
        other => Err(PageStoreError::Schema(format!(
            "{} value cannot be used in an equality filter on '{}'",
            other.kind_name(),
            field.name(),
        ))),
    }
}

fn expr_to_wire(schema: &Schema, expr: &Expr) -> PageStoreResult<Json> {
    match expr {
        Expr::And(group) => Ok(json!({ "and": group_to_wire(schema, group)? })),
        Expr::Or(group) => Ok(json!({ "or": group_to_wire(schema, group)? })),
        Expr::Prop { field, condition } => {
            let field = schema.expect_field(field)?;

            let mut clause = Map::new();
            clause.insert(condition.op_name().to_string(), condition.operand(field)?);

            let mut prop = Map::new();
            prop.insert("property".to_string(), json!(field.property()));
            prop.insert(field.kind().keyword().to_string(), Json::Object(clause));

            Ok(Json::Object(prop))
        }
    }
}

fn group_to_wire(schema: &Schema, group: &[Expr]) -> PageStoreResult<Vec<Json>> {
    group
        .iter()
        .map(|member| expr_to_wire(schema, member))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldDef;

    fn schema() -> Arc<Schema> {
        Arc::new(
            Schema::builder("task", Uuid::new_v4())
                .field(FieldDef::new("title", FieldKind::Title).required())
                .field(FieldDef::new("done", FieldKind::Checkbox))
                .field(FieldDef::new("priority", FieldKind::Number).mapped_to("Priority"))
                .build()
                .unwrap(),
        )
    }

    #[test]
    fn undeclared_field_fails_at_build_time() {
        let err = Query::new(schema())
            .filter(Filter::eq("status", Value::text("open")))
            .unwrap_err();

        assert!(matches!(err, PageStoreError::Schema(_)));
    }

    #[test]
    fn empty_compound_group_is_rejected() {
        let err = Query::new(schema())
            .filter(Filter::and(Vec::new()))
            .unwrap_err();

        assert!(matches!(err, PageStoreError::Schema(_)));
    }

    #[test]
    fn operator_kind_mismatch_is_rejected() {
        let err = Query::new(schema())
            .filter(Filter::gt("title", 2.0))
            .unwrap_err();

        assert!(matches!(err, PageStoreError::Schema(_)));
    }

    #[test]
    fn builder_calls_do_not_mutate_the_receiver() {
        let base = Query::new(schema());
        let filtered = base
            .filter(Filter::eq("done", Value::Checkbox(true)))
            .unwrap();

        assert!(base.to_wire().unwrap().get("filter").is_none());
        assert!(filtered.to_wire().unwrap().get("filter").is_some());
    }

    #[test]
    fn clause_order_is_preserved() {
        let query = Query::new(schema())
            .filter(Filter::or([
                Filter::eq("done", Value::Checkbox(false)),
                Filter::gt("priority", 3.0),
                Filter::contains("title", "urgent"),
            ]))
            .unwrap();

        let wire = query.to_wire().unwrap();
        let clauses = wire["filter"]["or"].as_array().unwrap();

        assert_eq!(clauses.len(), 3);
        assert_eq!(clauses[0]["property"], "done");
        assert_eq!(clauses[1]["property"], "Priority");
        assert_eq!(clauses[1]["number"]["greater_than"], 3.0);
        assert_eq!(clauses[2]["property"], "title");
    }

    #[test]
    fn sorts_use_remote_property_names() {
        let query = Query::new(schema())
            .sort("priority", SortDirection::Descending)
            .unwrap()
            .limit(10);

        let wire = query.to_wire().unwrap();
        assert_eq!(wire["sorts"][0]["property"], "Priority");
        assert_eq!(wire["sorts"][0]["direction"], "descending");
        assert_eq!(wire["page_size"], 10);
    }
}
