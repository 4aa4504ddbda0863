//! Typed property values and the codec between them and wire fragments.
//!
//! [`encode`] and [`decode`] are pure functions with no side effects. For
//! any value accepted by a field's validator, `decode(encode(v)) == Some(v)`
//! under the field's equality semantics: dates compare by instant (values
//! are normalized to UTC on decode) and rich text by its content spans.
//!
//! An unknown or malformed fragment fails with
//! [`PageStoreError::Decode`](crate::error::PageStoreError::Decode) carrying
//! the offending type tag - never a silent default.

use chrono::{DateTime, DurationRound, NaiveDate, SecondsFormat, TimeDelta, Utc};
use serde_json::{Map, Value as Json, json};
use uuid::Uuid;

use crate::{
    error::{PageStoreError, PageStoreResult},
    schema::{FieldDef, FieldKind},
    text::{self, RichText},
};

/// A date or date-time property value, optionally a range.
///
/// Instants are stored in UTC. Date-only values hydrate at midnight UTC and
/// re-encode as date-only strings, so the round-trip law holds under instant
/// equality.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DateValue {
    start: DateTime<Utc>,
    end: Option<DateTime<Utc>>,
    date_only: bool,
}

impl DateValue {
    /// A single timestamped instant.
    ///
    /// Truncated to millisecond precision, the finest the wire format
    /// carries, so every accepted instant survives a round trip.
    pub fn instant(start: DateTime<Utc>) -> Self {
        Self { start: truncate_to_millis(start), end: None, date_only: false }
    }

    /// A single calendar day (no time component on the wire).
    pub fn day(day: NaiveDate) -> Self {
        Self {
            start: day.and_hms_opt(0, 0, 0).unwrap_or_default().and_utc(),
            end: None,
            date_only: true,
        }
    }

    /// A timestamped range with an end instant, truncated like
    /// [`DateValue::instant`].
    pub fn range(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            start: truncate_to_millis(start),
            end: Some(truncate_to_millis(end)),
            date_only: false,
        }
    }

    /// The start of the value.
    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    /// The end of the range, if this value is a range.
    pub fn end(&self) -> Option<DateTime<Utc>> {
        self.end
    }

    /// Whether this value represents a range rather than a single date.
    pub fn is_range(&self) -> bool {
        self.end.is_some()
    }

    /// The start instant in its wire form, used by date filter conditions.
    pub(crate) fn start_string(&self) -> String {
        self.format_instant(self.start)
    }

    fn format_instant(&self, instant: DateTime<Utc>) -> String {
        if self.date_only {
            instant.date_naive().format("%Y-%m-%d").to_string()
        } else {
            instant.to_rfc3339_opts(SecondsFormat::Millis, true)
        }
    }

    fn to_wire(&self) -> Json {
        let end = match self.end {
            Some(end) => Json::String(self.format_instant(end)),
            None => Json::Null,
        };

        json!({ "start": self.format_instant(self.start), "end": end })
    }

    fn from_wire(payload: &Json) -> PageStoreResult<Self> {
        let start_raw = payload
            .get("start")
            .and_then(Json::as_str)
            .ok_or_else(|| PageStoreError::decode("date payload without 'start'"))?;

        let (start, date_only) = parse_instant(start_raw)?;
        let end = match payload.get("end") {
            None | Some(Json::Null) => None,
            Some(Json::String(raw)) => Some(parse_instant(raw)?.0),
            Some(other) => {
                return Err(PageStoreError::decode(format!("date 'end' fragment: {other}")));
            }
        };

        Ok(Self { start, end, date_only })
    }
}

fn truncate_to_millis(instant: DateTime<Utc>) -> DateTime<Utc> {
    instant
        .duration_trunc(TimeDelta::milliseconds(1))
        .unwrap_or(instant)
}

/// Parses a wire instant, which may be a date-only string or RFC 3339.
fn parse_instant(raw: &str) -> PageStoreResult<(DateTime<Utc>, bool)> {
    if let Ok(day) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok((day.and_hms_opt(0, 0, 0).unwrap_or_default().and_utc(), true));
    }

    DateTime::parse_from_rfc3339(raw)
        .map(|instant| (instant.with_timezone(&Utc), false))
        .map_err(|_| PageStoreError::decode(format!("unparseable instant '{raw}'")))
}

/// A typed local property value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Rich text, used for both title and text fields.
    Text(Vec<RichText>),
    /// A number.
    Number(f64),
    /// A checkbox.
    Checkbox(bool),
    /// A date, date-time or range.
    Date(DateValue),
    /// A single select option, by name.
    Select(String),
    /// Multiple select options, by name, in order.
    MultiSelect(Vec<String>),
    /// References to other pages.
    Relation(Vec<Uuid>),
    /// References to users.
    People(Vec<Uuid>),
    /// A URL.
    Url(String),
    /// An email address.
    Email(String),
}

impl Value {
    /// Creates a rich text value from a plain string.
    pub fn text(content: impl Into<String>) -> Self {
        Value::Text(vec![RichText::plain(content)])
    }

    /// Returns the concatenated plain content of a text value.
    pub fn as_plain_text(&self) -> Option<String> {
        match self {
            Value::Text(spans) => Some(text::plain_text(spans)),
            _ => None,
        }
    }

    /// A short name for this value's shape, used in validation errors.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Text(_) => "text",
            Value::Number(_) => "number",
            Value::Checkbox(_) => "checkbox",
            Value::Date(_) => "date",
            Value::Select(_) => "select",
            Value::MultiSelect(_) => "multi_select",
            Value::Relation(_) => "relation",
            Value::People(_) => "people",
            Value::Url(_) => "url",
            Value::Email(_) => "email",
        }
    }

    /// Whether this value is acceptable for a field of the given kind.
    pub fn matches(&self, kind: FieldKind) -> bool {
        matches!(
            (self, kind),
            (Value::Text(_), FieldKind::Title | FieldKind::Text)
                | (Value::Number(_), FieldKind::Number)
                | (Value::Checkbox(_), FieldKind::Checkbox)
                | (Value::Date(_), FieldKind::Date)
                | (Value::Select(_), FieldKind::Select)
                | (Value::MultiSelect(_), FieldKind::MultiSelect)
                | (Value::Relation(_), FieldKind::Relation)
                | (Value::People(_), FieldKind::People)
                | (Value::Url(_), FieldKind::Url)
                | (Value::Email(_), FieldKind::Email)
        )
    }
}

/// Encodes a value into the wire property fragment for the given field.
///
/// Pure; validates the value against the field first.
///
/// # Errors
///
/// Returns [`PageStoreError::Validation`] when the value does not match the
/// field's kind.
pub fn encode(value: &Value, field: &FieldDef) -> PageStoreResult<Json> {
    field.check(value)?;

    let keyword = field.kind().keyword();
    let payload = match value {
        Value::Text(spans) => text::spans_to_wire(spans),
        Value::Number(number) => json!(number),
        Value::Checkbox(checked) => json!(checked),
        Value::Date(date) => date.to_wire(),
        Value::Select(name) => json!({ "name": name }),
        Value::MultiSelect(names) => Json::Array(
            names
                .iter()
                .map(|name| json!({ "name": name }))
                .collect(),
        ),
        Value::Relation(ids) => Json::Array(
            ids.iter()
                .map(|id| json!({ "id": id.to_string() }))
                .collect(),
        ),
        Value::People(ids) => Json::Array(
            ids.iter()
                .map(|id| json!({ "object": "user", "id": id.to_string() }))
                .collect(),
        ),
        Value::Url(url) => json!(url),
        Value::Email(email) => json!(email),
    };

    let mut fragment = Map::new();
    fragment.insert(keyword.to_string(), payload);

    Ok(Json::Object(fragment))
}

/// Decodes a wire property fragment into a typed value for the given field.
///
/// Pure. Returns `Ok(None)` when the property is present but empty (a null
/// payload), which the store uses for cleared optional properties.
///
/// # Errors
///
/// Returns [`PageStoreError::Decode`] carrying the fragment's type tag when
/// the fragment does not match the field's kind, or when a nested shape is
/// malformed.
pub fn decode(fragment: &Json, field: &FieldDef) -> PageStoreResult<Option<Value>> {
    let keyword = field.kind().keyword();

    let payload = match fragment.get(keyword) {
        Some(payload) => payload,
        None => {
            let actual = fragment
                .get("type")
                .and_then(Json::as_str)
                .unwrap_or("<untagged>");

            return Err(PageStoreError::decode(format!(
                "property fragment tagged '{actual}' where '{keyword}' was expected"
            )));
        }
    };

    if payload.is_null() {
        return Ok(None);
    }

    let value = match field.kind() {
        FieldKind::Title | FieldKind::Text => Value::Text(text::spans_from_wire(payload)?),
        FieldKind::Number => Value::Number(
            payload
                .as_f64()
                .ok_or_else(|| PageStoreError::decode(format!("number payload: {payload}")))?,
        ),
        FieldKind::Checkbox => Value::Checkbox(
            payload
                .as_bool()
                .ok_or_else(|| PageStoreError::decode(format!("checkbox payload: {payload}")))?,
        ),
        FieldKind::Date => Value::Date(DateValue::from_wire(payload)?),
        FieldKind::Select => Value::Select(decode_option_name(payload)?),
        FieldKind::MultiSelect => Value::MultiSelect(
            expect_array(payload, "multi_select")?
                .iter()
                .map(decode_option_name)
                .collect::<PageStoreResult<Vec<_>>>()?,
        ),
        FieldKind::Relation => Value::Relation(
            expect_array(payload, "relation")?
                .iter()
                .map(decode_reference_id)
                .collect::<PageStoreResult<Vec<_>>>()?,
        ),
        FieldKind::People => Value::People(
            expect_array(payload, "people")?
                .iter()
                .map(decode_reference_id)
                .collect::<PageStoreResult<Vec<_>>>()?,
        ),
        FieldKind::Url => Value::Url(expect_string(payload, "url")?),
        FieldKind::Email => Value::Email(expect_string(payload, "email")?),
    };

    Ok(Some(value))
}

fn expect_array<'a>(payload: &'a Json, keyword: &str) -> PageStoreResult<&'a Vec<Json>> {
    payload
        .as_array()
        .ok_or_else(|| PageStoreError::decode(format!("{keyword} payload is not an array")))
}

fn expect_string(payload: &Json, keyword: &str) -> PageStoreResult<String> {
    payload
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| PageStoreError::decode(format!("{keyword} payload is not a string")))
}

fn decode_option_name(option: &Json) -> PageStoreResult<String> {
    option
        .get("name")
        .and_then(Json::as_str)
        .map(str::to_string)
        .ok_or_else(|| PageStoreError::decode(format!("select option without 'name': {option}")))
}

fn decode_reference_id(reference: &Json) -> PageStoreResult<Uuid> {
    let raw = reference
        .get("id")
        .and_then(Json::as_str)
        .ok_or_else(|| PageStoreError::decode(format!("reference without 'id': {reference}")))?;

    Uuid::parse_str(raw)
        .map_err(|_| PageStoreError::decode(format!("reference id '{raw}' is not a uuid")))
}
