//! Discriminated content blocks: paragraphs, headings, list items, to-dos.
//!
//! Blocks represent rich page content, distinct from flat properties. Each
//! block carries a type tag and a type-specific payload; container blocks
//! nest ordered children. Decoding is recursive, preserves nesting depth
//! and order, and is guarded by [`MAX_BLOCK_DEPTH`] to protect against
//! runaway recursion on hostile payloads.

use serde_json::{Map, Value as Json, json};

use crate::{
    error::{PageStoreError, PageStoreResult},
    text::{self, RichText},
};

/// Maximum nesting depth accepted when decoding block trees.
pub const MAX_BLOCK_DEPTH: usize = 32;

/// A typed structured content unit.
#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Paragraph { text: Vec<RichText>, children: Vec<Block> },
    Heading1 { text: Vec<RichText> },
    Heading2 { text: Vec<RichText> },
    Heading3 { text: Vec<RichText> },
    BulletedListItem { text: Vec<RichText>, children: Vec<Block> },
    NumberedListItem { text: Vec<RichText>, children: Vec<Block> },
    ToDo { text: Vec<RichText>, checked: bool, children: Vec<Block> },
}

impl Block {
    /// Creates a paragraph from a plain string.
    pub fn paragraph(content: impl Into<String>) -> Self {
        Block::Paragraph { text: vec![RichText::plain(content)], children: Vec::new() }
    }

    /// Creates an unchecked to-do item from a plain string.
    pub fn to_do(content: impl Into<String>) -> Self {
        Block::ToDo {
            text: vec![RichText::plain(content)],
            checked: false,
            children: Vec::new(),
        }
    }

    /// The wire type tag of this block.
    pub fn type_tag(&self) -> &'static str {
        match self {
            Block::Paragraph { .. } => "paragraph",
            Block::Heading1 { .. } => "heading_1",
            Block::Heading2 { .. } => "heading_2",
            Block::Heading3 { .. } => "heading_3",
            Block::BulletedListItem { .. } => "bulleted_list_item",
            Block::NumberedListItem { .. } => "numbered_list_item",
            Block::ToDo { .. } => "to_do",
        }
    }

    /// The text spans of this block.
    pub fn text(&self) -> &[RichText] {
        match self {
            Block::Paragraph { text, .. }
            | Block::Heading1 { text }
            | Block::Heading2 { text }
            | Block::Heading3 { text }
            | Block::BulletedListItem { text, .. }
            | Block::NumberedListItem { text, .. }
            | Block::ToDo { text, .. } => text,
        }
    }

    /// The nested children of this block, empty for leaf block types.
    pub fn children(&self) -> &[Block] {
        match self {
            Block::Paragraph { children, .. }
            | Block::BulletedListItem { children, .. }
            | Block::NumberedListItem { children, .. }
            | Block::ToDo { children, .. } => children,
            _ => &[],
        }
    }

    /// Encodes this block into the store's tagged wire shape.
    pub fn to_wire(&self) -> Json {
        let mut payload = Map::new();
        payload.insert("rich_text".to_string(), text::spans_to_wire(self.text()));

        if let Block::ToDo { checked, .. } = self {
            payload.insert("checked".to_string(), json!(checked));
        }

        if !self.children().is_empty() {
            payload.insert(
                "children".to_string(),
                Json::Array(self.children().iter().map(Block::to_wire).collect()),
            );
        }

        let mut block = Map::new();
        block.insert("object".to_string(), json!("block"));
        block.insert("type".to_string(), json!(self.type_tag()));
        block.insert(self.type_tag().to_string(), Json::Object(payload));

        Json::Object(block)
    }

    /// Decodes a block tree, recursing into children.
    ///
    /// # Errors
    ///
    /// Returns [`PageStoreError::Decode`] for unknown block type tags,
    /// malformed payloads, or nesting deeper than [`MAX_BLOCK_DEPTH`].
    pub fn from_wire(fragment: &Json) -> PageStoreResult<Self> {
        Self::decode_at(fragment, 0)
    }

    fn decode_at(fragment: &Json, depth: usize) -> PageStoreResult<Self> {
        if depth > MAX_BLOCK_DEPTH {
            return Err(PageStoreError::decode(format!(
                "block nesting exceeds {MAX_BLOCK_DEPTH} levels"
            )));
        }

        let tag = fragment
            .get("type")
            .and_then(Json::as_str)
            .ok_or_else(|| PageStoreError::decode("block without a type tag"))?;

        let payload = fragment
            .get(tag)
            .ok_or_else(|| PageStoreError::decode(format!("block '{tag}' without a payload")))?;

        let text = match payload.get("rich_text") {
            Some(spans) => text::spans_from_wire(spans)?,
            None => Vec::new(),
        };

        let children = match payload.get("children") {
            Some(Json::Array(items)) => items
                .iter()
                .map(|child| Block::decode_at(child, depth + 1))
                .collect::<PageStoreResult<Vec<_>>>()?,
            _ => Vec::new(),
        };

        match tag {
            "paragraph" => Ok(Block::Paragraph { text, children }),
            // Headings are leaf blocks; dropping their children silently
            // would lose content.
            "heading_1" | "heading_2" | "heading_3" if !children.is_empty() => Err(
                PageStoreError::decode(format!("block '{tag}' carrying children")),
            ),
            "heading_1" => Ok(Block::Heading1 { text }),
            "heading_2" => Ok(Block::Heading2 { text }),
            "heading_3" => Ok(Block::Heading3 { text }),
            "bulleted_list_item" => Ok(Block::BulletedListItem { text, children }),
            "numbered_list_item" => Ok(Block::NumberedListItem { text, children }),
            "to_do" => Ok(Block::ToDo {
                text,
                checked: payload
                    .get("checked")
                    .and_then(Json::as_bool)
                    .unwrap_or(false),
                children,
            }),
            other => Err(PageStoreError::decode(format!("block '{other}'"))),
        }
    }
}

/// Encodes an ordered block sequence.
pub fn blocks_to_wire(blocks: &[Block]) -> Json {
    Json::Array(blocks.iter().map(Block::to_wire).collect())
}

/// Decodes an ordered block sequence, preserving order.
pub fn blocks_from_wire(fragment: &Json) -> PageStoreResult<Vec<Block>> {
    fragment
        .as_array()
        .ok_or_else(|| PageStoreError::decode("block list payload is not an array"))?
        .iter()
        .map(Block::from_wire)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_blocks_round_trip() {
        let blocks = vec![
            Block::Heading1 { text: vec![RichText::plain("Plan")] },
            Block::BulletedListItem {
                text: vec![RichText::plain("phase one")],
                children: vec![
                    Block::to_do("draft"),
                    Block::ToDo {
                        text: vec![RichText::plain("review")],
                        checked: true,
                        children: vec![Block::paragraph("with notes")],
                    },
                ],
            },
        ];

        let decoded = blocks_from_wire(&blocks_to_wire(&blocks)).unwrap();
        assert_eq!(decoded, blocks);
    }

    #[test]
    fn unknown_block_type_names_its_tag() {
        let fragment = json!({ "object": "block", "type": "synced_block", "synced_block": {} });
        let err = Block::from_wire(&fragment).unwrap_err();

        match err {
            PageStoreError::Decode { tag } => assert!(tag.contains("synced_block")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn headings_with_children_are_rejected() {
        let fragment = json!({
            "object": "block",
            "type": "heading_2",
            "heading_2": {
                "rich_text": [],
                "children": [Block::paragraph("stray").to_wire()],
            },
        });

        match Block::from_wire(&fragment).unwrap_err() {
            PageStoreError::Decode { tag } => assert!(tag.contains("heading_2")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn runaway_nesting_is_rejected() {
        let mut fragment = json!({ "object": "block", "type": "paragraph", "paragraph": { "rich_text": [] } });

        for _ in 0..(MAX_BLOCK_DEPTH + 1) {
            fragment = json!({
                "object": "block",
                "type": "paragraph",
                "paragraph": { "rich_text": [], "children": [fragment] },
            });
        }

        assert!(Block::from_wire(&fragment).is_err());
    }
}
