pub mod entity;

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::content::entity::{Entity, EntityKey, EntityKind, EntityMap, Mutability};

/// The in-memory representation of a rich-text document: an ordered list of
/// blocks plus the entities they reference. This is what the editor
/// manipulates, as distinct from its HTML serialization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentState {
    pub blocks: Vec<ContentBlock>,
    #[serde(default)]
    pub entities: EntityMap,
}

impl ContentState {
    pub fn empty() -> Self {
        ContentState::default()
    }

    /// A content state holding a single unstyled block with the given text.
    pub fn from_text(text: &str) -> Self {
        ContentState {
            blocks: vec![ContentBlock::from_text(BlockType::Unstyled, text)],
            entities: EntityMap::default(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Register an entity and return its key. Entities are never shared
    /// across content states.
    pub fn add_entity(&mut self, kind: EntityKind, mutability: Mutability) -> EntityKey {
        self.entities.insert(Entity { kind, mutability })
    }

    pub fn entity(&self, key: EntityKey) -> Option<&Entity> {
        self.entities.get(key)
    }
}

/// One structural unit of a document: a paragraph, heading, list item,
/// blockquote, or an atomic non-text unit (table, media).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentBlock {
    pub block_type: BlockType,
    /// Raw character sequence. For atomic blocks this is a single
    /// placeholder character.
    pub text: String,
    /// Nesting level; meaningful for list items only.
    #[serde(default)]
    pub depth: usize,
    /// Per-character style/entity metadata, parallel to `text`'s chars.
    #[serde(default)]
    pub chars: Vec<CharacterMetadata>,
    /// Free-form side-channel data (annotation ranges, highlight notes).
    #[serde(default)]
    pub data: BlockData,
}

impl ContentBlock {
    pub fn new(block_type: BlockType) -> Self {
        ContentBlock {
            block_type,
            text: String::new(),
            depth: 0,
            chars: Vec::new(),
            data: BlockData::default(),
        }
    }

    /// A block whose characters all carry empty metadata.
    pub fn from_text(block_type: BlockType, text: &str) -> Self {
        let mut block = ContentBlock::new(block_type);
        for ch in text.chars() {
            block.push_char(ch, CharacterMetadata::default());
        }
        block
    }

    /// An atomic block: one placeholder character referencing `entity`.
    pub fn atomic(entity: EntityKey) -> Self {
        let mut block = ContentBlock::new(BlockType::Atomic);
        block.push_char(
            ' ',
            CharacterMetadata {
                styles: BTreeSet::new(),
                entity: Some(entity),
            },
        );
        block
    }

    /// Append a character together with its metadata, preserving the
    /// text/metadata length invariant.
    pub fn push_char(&mut self, ch: char, meta: CharacterMetadata) {
        self.text.push(ch);
        self.chars.push(meta);
    }

    pub fn is_list_item(&self) -> bool {
        matches!(
            self.block_type,
            BlockType::UnorderedListItem | BlockType::OrderedListItem
        )
    }

    /// True when the block renders to nothing: no text, no annotation
    /// ranges, not atomic.
    pub fn is_blank(&self) -> bool {
        self.block_type != BlockType::Atomic
            && self.text.is_empty()
            && self.data.inline_style_ranges.is_empty()
    }

    /// The single entity an atomic block references, if any.
    pub fn atomic_entity(&self) -> Option<EntityKey> {
        self.chars.first().and_then(|meta| meta.entity)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockType {
    Unstyled,
    /// Heading level 1-6.
    Header(u8),
    Blockquote,
    UnorderedListItem,
    OrderedListItem,
    Atomic,
}

/// Style set and entity reference for one character.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CharacterMetadata {
    #[serde(default)]
    pub styles: BTreeSet<InlineStyle>,
    #[serde(default)]
    pub entity: Option<EntityKey>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum InlineStyle {
    Bold,
    Italic,
    Underline,
    Strikethrough,
    Subscript,
    Superscript,
}

/// Side-channel block data. Annotations live here as inline style ranges
/// tagged `ANNOTATION_<id>`, with their note payloads keyed by the same tag
/// in `highlights`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BlockData {
    #[serde(default)]
    pub inline_style_ranges: Vec<StyleRange>,
    #[serde(default)]
    pub highlights: BTreeMap<String, HighlightNote>,
}

/// An inline style range in character units over the owning block's text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleRange {
    pub offset: usize,
    pub length: usize,
    /// Style tag, e.g. `ANNOTATION_1`.
    pub style: String,
}

/// Prefix shared by all annotation style tags.
pub const ANNOTATION_STYLE_PREFIX: &str = "ANNOTATION";

impl StyleRange {
    pub fn is_annotation(&self) -> bool {
        self.style.starts_with(ANNOTATION_STYLE_PREFIX)
    }
}

/// Out-of-band message data for one annotation. `msg` holds a nested
/// mini-document as a JSON blob; it is parsed lazily at generation time and
/// a parse failure renders as an empty note.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HighlightNote {
    pub msg: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_char_keeps_lengths_in_sync() {
        let mut block = ContentBlock::new(BlockType::Unstyled);
        block.push_char('h', CharacterMetadata::default());
        block.push_char('ē', CharacterMetadata::default());
        assert_eq!(block.text.chars().count(), block.chars.len());
    }

    #[test]
    fn atomic_block_has_one_placeholder_char() {
        let mut state = ContentState::empty();
        let key = state.add_entity(
            EntityKind::Link {
                href: "https://example.com".to_string(),
                target: None,
            },
            Mutability::Mutable,
        );
        let block = ContentBlock::atomic(key);
        assert_eq!(block.text.len(), 1);
        assert_eq!(block.atomic_entity(), Some(key));
    }

    #[test]
    fn blank_detection_ignores_annotated_blocks() {
        let mut block = ContentBlock::new(BlockType::Unstyled);
        assert!(block.is_blank());
        block.data.inline_style_ranges.push(StyleRange {
            offset: 0,
            length: 0,
            style: "ANNOTATION_1".to_string(),
        });
        assert!(!block.is_blank());
    }

    #[test]
    fn content_state_round_trips_through_json() {
        let state = ContentState::from_text("plain text");
        let json = serde_json::to_string(&state).unwrap();
        let back: ContentState = serde_json::from_str(&json).unwrap();
        assert_eq!(state, back);
    }
}
