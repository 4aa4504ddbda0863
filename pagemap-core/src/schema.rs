//! Declarative schema definitions binding local field types to a remote database.
//!
//! A [`Schema`] describes one model: its remote database id and the typed
//! fields it exposes. Field definitions map a local attribute name to the
//! remote property name (which may differ) and declare the semantic kind,
//! required flag and optional default.
//!
//! Schemas are defined once at startup, are immutable afterwards, and are
//! collected into an explicit [`SchemaRegistry`] that is passed by reference
//! to the session and query builder - there is no ambient global registry.
//!
//! # Example
//!
//! ```ignore
//! let tasks = Schema::builder("task", database_id)
//!     .field(FieldDef::new("title", FieldKind::Title).required())
//!     .field(FieldDef::new("due", FieldKind::Date).mapped_to("Due Date"))
//!     .field(FieldDef::new("done", FieldKind::Checkbox).with_default(Value::Checkbox(false)))
//!     .build()?;
//!
//! let registry = SchemaRegistry::builder().register(tasks).build()?;
//! ```

use std::{collections::HashMap, sync::Arc};
use uuid::Uuid;

use crate::{
    error::{PageStoreError, PageStoreResult},
    value::Value,
};

/// Semantic kind of a schema field.
///
/// Each kind defines its own encode/decode contract against the wire format
/// (see [`crate::value`]) and the set of filter operators it accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// The page title (rich text, exactly one per schema on the remote side).
    Title,
    /// Rich text content.
    Text,
    /// A floating-point number.
    Number,
    /// A boolean checkbox.
    Checkbox,
    /// A date or date-time, optionally a range.
    Date,
    /// A single enumerated option, compared by name.
    Select,
    /// Multiple enumerated options, compared by name.
    MultiSelect,
    /// References to other pages.
    Relation,
    /// References to users.
    People,
    /// A URL string.
    Url,
    /// An email string.
    Email,
}

impl FieldKind {
    /// The wire keyword for this kind, used both as the property payload key
    /// and as the filter condition key. Must match the store's grammar
    /// byte-for-byte.
    pub fn keyword(&self) -> &'static str {
        match self {
            FieldKind::Title => "title",
            FieldKind::Text => "rich_text",
            FieldKind::Number => "number",
            FieldKind::Checkbox => "checkbox",
            FieldKind::Date => "date",
            FieldKind::Select => "select",
            FieldKind::MultiSelect => "multi_select",
            FieldKind::Relation => "relation",
            FieldKind::People => "people",
            FieldKind::Url => "url",
            FieldKind::Email => "email",
        }
    }
}

/// Definition of a single schema field.
#[derive(Debug, Clone)]
pub struct FieldDef {
    name: String,
    property: String,
    kind: FieldKind,
    required: bool,
    default: Option<Value>,
}

impl FieldDef {
    /// Creates a field whose remote property name equals its local name.
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        let name = name.into();

        Self {
            property: name.clone(),
            name,
            kind,
            required: false,
            default: None,
        }
    }

    /// Maps this field to a differently-named remote property.
    pub fn mapped_to(mut self, property: impl Into<String>) -> Self {
        self.property = property.into();
        self
    }

    /// Marks this field as required on create and hydration.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Supplies a default value, applied on create when the field is unset.
    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    /// The local attribute name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The remote property name.
    pub fn property(&self) -> &str {
        &self.property
    }

    /// The semantic kind of this field.
    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    /// Whether the field is required.
    pub fn is_required(&self) -> bool {
        self.required
    }

    /// The default value, if one was declared.
    pub fn default(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    /// Checks that a value is acceptable for this field.
    ///
    /// # Errors
    ///
    /// Returns [`PageStoreError::Validation`] naming the field and the
    /// expected vs. actual kind.
    pub fn check(&self, value: &Value) -> PageStoreResult<()> {
        if value.matches(self.kind) {
            Ok(())
        } else {
            Err(PageStoreError::validation(
                &self.name,
                self.kind.keyword(),
                value.kind_name(),
            ))
        }
    }
}

/// An immutable typed schema bound to one remote database.
#[derive(Debug)]
pub struct Schema {
    model: String,
    database_id: Uuid,
    fields: Vec<FieldDef>,
    by_name: HashMap<String, usize>,
}

impl Schema {
    /// Creates a builder for a schema with the given model name and remote
    /// database id.
    pub fn builder(model: impl Into<String>, database_id: Uuid) -> SchemaBuilder {
        SchemaBuilder {
            model: model.into(),
            database_id,
            fields: Vec::new(),
        }
    }

    /// The local model name.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// The id of the remote database this schema is bound to.
    pub fn database_id(&self) -> Uuid {
        self.database_id
    }

    /// The declared fields, in declaration order.
    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    /// Looks up a field by its local name.
    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.by_name.get(name).map(|i| &self.fields[*i])
    }

    /// Looks up a field by its local name, failing with
    /// [`PageStoreError::Schema`] if it is not declared.
    pub fn expect_field(&self, name: &str) -> PageStoreResult<&FieldDef> {
        self.field(name).ok_or_else(|| {
            PageStoreError::Schema(format!(
                "field '{name}' is not declared on model '{}'",
                self.model
            ))
        })
    }
}

/// Builder for [`Schema`] instances.
#[derive(Debug)]
pub struct SchemaBuilder {
    model: String,
    database_id: Uuid,
    fields: Vec<FieldDef>,
}

impl SchemaBuilder {
    /// Adds a field definition.
    pub fn field(mut self, def: FieldDef) -> Self {
        self.fields.push(def);
        self
    }

    /// Builds the schema.
    ///
    /// # Errors
    ///
    /// Returns [`PageStoreError::Schema`] for duplicate field names or a
    /// default value that does not match its field's kind.
    pub fn build(self) -> PageStoreResult<Schema> {
        let mut by_name = HashMap::with_capacity(self.fields.len());

        for (index, def) in self.fields.iter().enumerate() {
            if by_name.insert(def.name.clone(), index).is_some() {
                return Err(PageStoreError::Schema(format!(
                    "duplicate field '{}' on model '{}'",
                    def.name, self.model
                )));
            }

            if let Some(default) = &def.default {
                def.check(default)?;
            }
        }

        Ok(Schema {
            model: self.model,
            database_id: self.database_id,
            fields: self.fields,
            by_name,
        })
    }
}

/// An explicit, immutable registry of schemas, keyed by model name.
///
/// Constructed once at startup and shared (by `Arc`) with every session
/// that needs it.
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    models: HashMap<String, Arc<Schema>>,
}

impl SchemaRegistry {
    /// Creates a builder for a registry.
    pub fn builder() -> SchemaRegistryBuilder {
        SchemaRegistryBuilder { schemas: Vec::new() }
    }

    /// Looks up the schema for a model, failing with
    /// [`PageStoreError::Schema`] if the model was never registered.
    pub fn model(&self, name: &str) -> PageStoreResult<&Arc<Schema>> {
        self.models
            .get(name)
            .ok_or_else(|| PageStoreError::Schema(format!("unknown model '{name}'")))
    }

    /// The names of all registered models.
    pub fn model_names(&self) -> impl Iterator<Item = &str> {
        self.models.keys().map(String::as_str)
    }
}

/// Builder for [`SchemaRegistry`] instances.
#[derive(Debug)]
pub struct SchemaRegistryBuilder {
    schemas: Vec<Schema>,
}

impl SchemaRegistryBuilder {
    /// Registers a schema under its model name.
    pub fn register(mut self, schema: Schema) -> Self {
        self.schemas.push(schema);
        self
    }

    /// Builds the registry, rejecting duplicate model names with
    /// [`PageStoreError::Schema`].
    pub fn build(self) -> PageStoreResult<SchemaRegistry> {
        let mut models = HashMap::with_capacity(self.schemas.len());

        for schema in self.schemas {
            let name = schema.model.clone();

            if models.insert(name.clone(), Arc::new(schema)).is_some() {
                return Err(PageStoreError::Schema(format!("duplicate model '{name}'")));
            }
        }

        Ok(SchemaRegistry { models })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task_schema() -> Schema {
        Schema::builder("task", Uuid::new_v4())
            .field(FieldDef::new("title", FieldKind::Title).required())
            .field(FieldDef::new("done", FieldKind::Checkbox).with_default(Value::Checkbox(false)))
            .build()
            .unwrap()
    }

    #[test]
    fn field_lookup_uses_local_names() {
        let schema = Schema::builder("task", Uuid::new_v4())
            .field(FieldDef::new("due", FieldKind::Date).mapped_to("Due Date"))
            .build()
            .unwrap();

        let field = schema.expect_field("due").unwrap();
        assert_eq!(field.property(), "Due Date");
        assert!(schema.field("Due Date").is_none());
    }

    #[test]
    fn duplicate_fields_rejected() {
        let err = Schema::builder("task", Uuid::new_v4())
            .field(FieldDef::new("title", FieldKind::Title))
            .field(FieldDef::new("title", FieldKind::Text))
            .build()
            .unwrap_err();

        assert!(matches!(err, PageStoreError::Schema(_)));
    }

    #[test]
    fn mismatched_default_rejected() {
        let err = Schema::builder("task", Uuid::new_v4())
            .field(FieldDef::new("done", FieldKind::Checkbox).with_default(Value::Number(1.0)))
            .build()
            .unwrap_err();

        assert!(matches!(err, PageStoreError::Validation { .. }));
    }

    #[test]
    fn registry_rejects_duplicates_and_unknowns() {
        let registry = SchemaRegistry::builder()
            .register(task_schema())
            .build()
            .unwrap();

        assert!(registry.model("task").is_ok());
        assert!(matches!(registry.model("nope"), Err(PageStoreError::Schema(_))));

        let err = SchemaRegistry::builder()
            .register(task_schema())
            .register(task_schema())
            .build()
            .unwrap_err();

        assert!(matches!(err, PageStoreError::Schema(_)));
    }
}
