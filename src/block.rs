use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::markup;

/// Stable identity of a block. Indices shift on insert and delete, ids never do.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockId(String);

impl BlockId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Element id used to find the block's editable region in the page.
    pub fn dom_id(&self) -> String {
        format!("block-{}", self.0)
    }
}

impl From<&str> for BlockId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for BlockId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BlockType {
    #[default]
    #[serde(rename = "paragraph")]
    Paragraph,
    #[serde(rename = "h1")]
    Heading1,
    #[serde(rename = "h2")]
    Heading2,
    #[serde(rename = "h3")]
    Heading3,
    #[serde(rename = "list_bullet")]
    BulletItem,
    #[serde(rename = "quote")]
    Quote,
}

impl BlockType {
    pub const ALL: [BlockType; 6] = [
        BlockType::Paragraph,
        BlockType::Heading1,
        BlockType::Heading2,
        BlockType::Heading3,
        BlockType::BulletItem,
        BlockType::Quote,
    ];

    pub fn tag(self) -> &'static str {
        match self {
            BlockType::Paragraph => "paragraph",
            BlockType::Heading1 => "h1",
            BlockType::Heading2 => "h2",
            BlockType::Heading3 => "h3",
            BlockType::BulletItem => "list_bullet",
            BlockType::Quote => "quote",
        }
    }

    /// Label shown in the slash menu.
    pub fn label(self) -> &'static str {
        match self {
            BlockType::Paragraph => "Text",
            BlockType::Heading1 => "Heading 1",
            BlockType::Heading2 => "Heading 2",
            BlockType::Heading3 => "Heading 3",
            BlockType::BulletItem => "Bullet list",
            BlockType::Quote => "Quote",
        }
    }

    pub fn css_class(self) -> &'static str {
        match self {
            BlockType::Paragraph => "block block-paragraph",
            BlockType::Heading1 => "block block-h1",
            BlockType::Heading2 => "block block-h2",
            BlockType::Heading3 => "block block-h3",
            BlockType::BulletItem => "block block-bullet",
            BlockType::Quote => "block block-quote",
        }
    }

    pub fn heading_level(self) -> Option<u8> {
        match self {
            BlockType::Heading1 => Some(1),
            BlockType::Heading2 => Some(2),
            BlockType::Heading3 => Some(3),
            _ => None,
        }
    }
}

impl fmt::Display for BlockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub id: BlockId,
    #[serde(rename = "type")]
    pub kind: BlockType,
    #[serde(default)]
    pub content: String,
}

impl Block {
    pub fn new(kind: BlockType, content: impl Into<String>) -> Self {
        Self {
            id: BlockId::generate(),
            kind,
            content: content.into(),
        }
    }

    pub fn paragraph() -> Self {
        Self::new(BlockType::Paragraph, "")
    }

    pub fn plain_text(&self) -> String {
        markup::plain_text(&self.content)
    }

    pub fn is_empty(&self) -> bool {
        markup::is_empty(&self.content)
    }
}

/// Placeholder shown for an empty block: the first block always, any other only while focused.
pub fn placeholder<'a>(
    index: usize,
    is_empty: bool,
    is_focused: bool,
    first: &'a str,
    focused: &'a str,
) -> Option<&'a str> {
    if !is_empty {
        return None;
    }
    if index == 0 {
        Some(first)
    } else if is_focused {
        Some(focused)
    } else {
        None
    }
}
