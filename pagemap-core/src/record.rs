//! Change-tracked records and the shared handle the session hands out.
//!
//! A [`Record`] holds the typed field values of one remote page together
//! with the last-synced baseline. Local writes go through [`Record::set`]
//! and [`Record::clear`], which validate against the schema; the baseline
//! only moves when the session confirms a round trip, so [`Record::diff`]
//! always reflects exactly what has changed since the last sync.
//!
//! Records are shared as [`RecordRef`] handles. The session's identity map
//! guarantees one handle per `(model, id)` pair, so two lookups of the same
//! page observe each other's edits.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use serde_json::{Map, Value as Json};
use uuid::Uuid;

use crate::{
    error::{PageStoreError, PageStoreResult},
    schema::Schema,
    value::{self, Value},
};

/// Shared handle to a change-tracked record.
pub type RecordRef = Arc<Mutex<Record>>;

/// One remote page viewed through a schema, with local change tracking.
#[derive(Debug)]
pub struct Record {
    schema: Arc<Schema>,
    id: Option<Uuid>,
    archived: bool,
    values: HashMap<String, Value>,
    baseline: HashMap<String, Value>,
}

impl Record {
    /// Creates an empty, unsaved record for the given schema.
    pub fn new(schema: Arc<Schema>) -> Self {
        Self {
            schema,
            id: None,
            archived: false,
            values: HashMap::new(),
            baseline: HashMap::new(),
        }
    }

    /// Creates an unsaved record pre-populated with the given field values.
    ///
    /// # Errors
    ///
    /// Returns [`PageStoreError::Schema`] for an undeclared field name and
    /// [`PageStoreError::Validation`] for a value of the wrong kind.
    pub fn draft(schema: Arc<Schema>, values: Vec<(&str, Value)>) -> PageStoreResult<Self> {
        let mut record = Self::new(schema);

        for (name, value) in values {
            record.set(name, value)?;
        }

        Ok(record)
    }

    /// The remote page id, `None` until the record has been created.
    pub fn id(&self) -> Option<Uuid> {
        self.id
    }

    /// The schema this record is bound to.
    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Whether the remote page is archived.
    pub fn archived(&self) -> bool {
        self.archived
    }

    /// The current value of a field, if it is set.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Sets a field to a new value, validating against the schema.
    ///
    /// # Errors
    ///
    /// Returns [`PageStoreError::Schema`] for an undeclared field name and
    /// [`PageStoreError::Validation`] for a value of the wrong kind.
    pub fn set(&mut self, name: &str, value: Value) -> PageStoreResult<()> {
        let field = self.schema.expect_field(name)?;
        field.check(&value)?;

        self.values.insert(field.name().to_string(), value);
        Ok(())
    }

    /// Clears a field locally; the next sync writes an empty property.
    ///
    /// # Errors
    ///
    /// Returns [`PageStoreError::Schema`] for an undeclared field name.
    pub fn clear(&mut self, name: &str) -> PageStoreResult<()> {
        let field = self.schema.expect_field(name)?;

        self.values.remove(field.name());
        Ok(())
    }

    /// Whether any field differs from the last-synced baseline.
    pub fn is_dirty(&self) -> bool {
        !self.dirty_fields().is_empty()
    }

    /// The names of fields that differ from the baseline, in schema order.
    pub fn dirty_fields(&self) -> Vec<&str> {
        self.schema
            .fields()
            .iter()
            .map(|field| field.name())
            .filter(|name| self.values.get(*name) != self.baseline.get(*name))
            .collect()
    }

    /// Drops all local edits, restoring the last-synced baseline.
    pub fn discard_changes(&mut self) {
        self.values = self.baseline.clone();
    }

    /// Builds a record from a full page response.
    ///
    /// Undeclared remote properties are ignored. Declared properties that
    /// decode to empty are left unset.
    pub(crate) fn hydrate(schema: Arc<Schema>, page: &Json) -> PageStoreResult<Self> {
        let id = parse_page_id(page)?;

        let mut record = Self::new(schema);
        record.id = Some(id);
        record.apply_page(page)?;
        record.baseline = record.values.clone();

        for field in record.schema.fields() {
            if field.is_required() && !record.values.contains_key(field.name()) {
                return Err(PageStoreError::validation(
                    field.name(),
                    field.kind().keyword(),
                    "empty",
                ));
            }
        }

        Ok(record)
    }

    /// Merges a fresh page response, keeping local edits.
    ///
    /// The baseline takes the server's values for every field; current
    /// values follow only where the field was clean. Dirty fields keep
    /// their local value and stay dirty relative to the new baseline.
    pub(crate) fn refresh(&mut self, page: &Json) -> PageStoreResult<()> {
        let dirty: Vec<String> = self
            .dirty_fields()
            .into_iter()
            .map(str::to_string)
            .collect();
        let edits: HashMap<String, Option<Value>> = dirty
            .iter()
            .map(|name| (name.clone(), self.values.get(name).cloned()))
            .collect();

        self.absorb(page)?;

        for (name, edit) in edits {
            match edit {
                Some(value) => {
                    self.values.insert(name, value);
                }
                None => {
                    self.values.remove(&name);
                }
            }
        }

        Ok(())
    }

    /// Replaces this record's state wholesale with a page response.
    ///
    /// Used after create/update/delete, where the response is the
    /// authoritative post-write state and local edits are already applied.
    pub(crate) fn absorb(&mut self, page: &Json) -> PageStoreResult<()> {
        self.id = Some(parse_page_id(page)?);
        self.values.clear();
        self.apply_page(page)?;
        self.baseline = self.values.clone();

        Ok(())
    }

    fn apply_page(&mut self, page: &Json) -> PageStoreResult<()> {
        self.archived = page
            .get("archived")
            .and_then(Json::as_bool)
            .unwrap_or(false);

        let properties = page
            .get("properties")
            .and_then(Json::as_object)
            .ok_or_else(|| PageStoreError::decode("page without 'properties'"))?;

        for field in self.schema.fields() {
            let Some(fragment) = properties.get(field.property()) else {
                continue;
            };

            if let Some(decoded) = value::decode(fragment, field)? {
                self.values.insert(field.name().to_string(), decoded);
            }
        }

        Ok(())
    }

    /// Encodes only the dirty fields, keyed by remote property name.
    ///
    /// A cleared field encodes as an empty payload for its kind.
    pub(crate) fn diff(&self) -> PageStoreResult<Map<String, Json>> {
        let mut properties = Map::new();

        for name in self.dirty_fields() {
            let field = self.schema.expect_field(name)?;

            let fragment = match self.values.get(name) {
                Some(value) => value::encode(value, field)?,
                None => empty_fragment(field.kind().keyword()),
            };

            properties.insert(field.property().to_string(), fragment);
        }

        Ok(properties)
    }

    /// Encodes the full property set for a create request, applying
    /// declared defaults and enforcing required fields.
    pub(crate) fn encode_new(&self) -> PageStoreResult<Map<String, Json>> {
        let mut properties = Map::new();

        for field in self.schema.fields() {
            let value = self.values.get(field.name()).or(field.default());

            match value {
                Some(value) => {
                    properties.insert(field.property().to_string(), value::encode(value, field)?);
                }
                None if field.is_required() => {
                    return Err(PageStoreError::validation(
                        field.name(),
                        field.kind().keyword(),
                        "empty",
                    ));
                }
                None => {}
            }
        }

        Ok(properties)
    }
}

fn parse_page_id(page: &Json) -> PageStoreResult<Uuid> {
    let raw = page
        .get("id")
        .and_then(Json::as_str)
        .ok_or_else(|| PageStoreError::decode("page without an 'id'"))?;

    Uuid::parse_str(raw)
        .map_err(|_| PageStoreError::decode(format!("page id '{raw}' is not a uuid")))
}

/// The wire fragment that clears a property of the given kind.
fn empty_fragment(keyword: &str) -> Json {
    let payload = match keyword {
        "title" | "rich_text" | "multi_select" | "relation" | "people" => Json::Array(Vec::new()),
        _ => Json::Null,
    };

    let mut fragment = Map::new();
    fragment.insert(keyword.to_string(), payload);
    Json::Object(fragment)
}
