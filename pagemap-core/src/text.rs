//! Rich text spans shared by properties and content blocks.
//!
//! A rich text value is an ordered list of [`RichText`] spans, each carrying
//! its own [`Annotations`] and an optional link. The wire shape is the
//! store's tagged span array; only `text` spans are produced by this layer,
//! and only `text` spans are accepted back - an unknown span tag fails with
//! a decode error rather than being dropped.

use serde::{Deserialize, Serialize};
use serde_json::{Value as Json, json};

use crate::error::{PageStoreError, PageStoreResult};

/// Style annotations on a single text span.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotations {
    pub bold: bool,
    pub italic: bool,
    pub strikethrough: bool,
    pub underline: bool,
    pub code: bool,
    pub color: String,
}

impl Default for Annotations {
    fn default() -> Self {
        Self {
            bold: false,
            italic: false,
            strikethrough: false,
            underline: false,
            code: false,
            color: "default".to_string(),
        }
    }
}

/// One annotated span of text.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RichText {
    pub text: String,
    pub href: Option<String>,
    pub annotations: Annotations,
}

impl RichText {
    /// Creates an unannotated span.
    pub fn plain(text: impl Into<String>) -> Self {
        Self { text: text.into(), ..Default::default() }
    }

    /// Creates a span linking to the given URL.
    pub fn link(text: impl Into<String>, href: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            href: Some(href.into()),
            annotations: Annotations::default(),
        }
    }

    fn to_wire(&self) -> Json {
        let link = match &self.href {
            Some(url) => json!({ "url": url }),
            None => Json::Null,
        };

        json!({
            "type": "text",
            "text": { "content": self.text, "link": link },
            "annotations": serde_json::to_value(&self.annotations).unwrap_or_default(),
            "plain_text": self.text,
        })
    }

    fn from_wire(fragment: &Json) -> PageStoreResult<Self> {
        let tag = fragment
            .get("type")
            .and_then(Json::as_str)
            .ok_or_else(|| PageStoreError::decode("rich text span without a type tag"))?;

        if tag != "text" {
            return Err(PageStoreError::decode(format!("rich text span '{tag}'")));
        }

        let body = fragment
            .get("text")
            .and_then(Json::as_object)
            .ok_or_else(|| PageStoreError::decode("text span without a 'text' payload"))?;

        let content = body
            .get("content")
            .and_then(Json::as_str)
            .ok_or_else(|| PageStoreError::decode("text span without 'content'"))?;

        let href = body
            .get("link")
            .and_then(|link| link.get("url"))
            .and_then(Json::as_str)
            .map(str::to_string);

        let annotations = match fragment.get("annotations") {
            Some(raw) => serde_json::from_value(raw.clone())?,
            None => Annotations::default(),
        };

        Ok(Self { text: content.to_string(), href, annotations })
    }
}

/// Concatenates the plain content of the given spans.
pub fn plain_text(spans: &[RichText]) -> String {
    spans.iter().map(|span| span.text.as_str()).collect()
}

/// Encodes spans into the store's tagged array shape.
pub fn spans_to_wire(spans: &[RichText]) -> Json {
    Json::Array(spans.iter().map(RichText::to_wire).collect())
}

/// Decodes a tagged span array, preserving span order.
pub fn spans_from_wire(fragment: &Json) -> PageStoreResult<Vec<RichText>> {
    fragment
        .as_array()
        .ok_or_else(|| PageStoreError::decode("rich text payload is not an array"))?
        .iter()
        .map(RichText::from_wire)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spans_round_trip() {
        let spans = vec![
            RichText::plain("hello "),
            RichText {
                text: "world".to_string(),
                href: Some("https://example.com".to_string()),
                annotations: Annotations { bold: true, ..Default::default() },
            },
        ];

        let decoded = spans_from_wire(&spans_to_wire(&spans)).unwrap();
        assert_eq!(decoded, spans);
        assert_eq!(plain_text(&decoded), "hello world");
    }

    #[test]
    fn unknown_span_tag_fails() {
        let fragment = json!([{ "type": "equation", "equation": { "expression": "x" } }]);
        let err = spans_from_wire(&fragment).unwrap_err();

        match err {
            PageStoreError::Decode { tag } => assert!(tag.contains("equation")),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
