use pulldown_cmark::{Event, HeadingLevel, Options, Parser, Tag, TagEnd};
use serde::{Deserialize, Serialize};

use crate::block::{Block, BlockType};
use crate::error::{EditorError, Result};
use crate::markup::{self, Segment};
use crate::store::BlockStore;

pub const NOTE_KEY: &str = "blockpad-note";

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct NoteContent {
    #[serde(default)]
    pub blocks: Vec<Block>,
}

impl NoteContent {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(EditorError::Document)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(EditorError::Document)
    }

    pub fn from_store(store: &BlockStore) -> Self {
        Self {
            blocks: store.blocks().to_vec(),
        }
    }

    /// An empty note still opens with one empty paragraph.
    pub fn into_store(self) -> BlockStore {
        BlockStore::from_blocks(self.blocks)
    }

    pub fn from_markdown(source: &str) -> Self {
        Self {
            blocks: markdown_to_blocks(source),
        }
    }

    pub fn to_markdown(&self) -> String {
        blocks_to_markdown(&self.blocks)
    }
}

struct BlockBuilder {
    blocks: Vec<Block>,
    current: Option<(BlockType, String)>,
    quote_depth: usize,
    item_depth: usize,
}

impl BlockBuilder {
    fn context_kind(&self) -> BlockType {
        if self.item_depth > 0 {
            BlockType::BulletItem
        } else if self.quote_depth > 0 {
            BlockType::Quote
        } else {
            BlockType::Paragraph
        }
    }

    fn begin(&mut self, kind: BlockType) {
        if let Some((_, html)) = &self.current {
            if html.is_empty() {
                self.current = Some((kind, String::new()));
                return;
            }
        }
        self.flush();
        self.current = Some((kind, String::new()));
    }

    fn push(&mut self, html: &str) {
        if self.current.is_none() {
            self.current = Some((self.context_kind(), String::new()));
        }
        if let Some((_, buf)) = self.current.as_mut() {
            buf.push_str(html);
        }
    }

    fn flush(&mut self) {
        if let Some((kind, html)) = self.current.take() {
            if kind == BlockType::Paragraph && html.is_empty() {
                return;
            }
            self.blocks.push(Block::new(kind, html));
        }
    }
}

fn heading_kind(level: HeadingLevel) -> BlockType {
    match level {
        HeadingLevel::H1 => BlockType::Heading1,
        HeadingLevel::H2 => BlockType::Heading2,
        _ => BlockType::Heading3,
    }
}

pub fn markdown_to_blocks(source: &str) -> Vec<Block> {
    let mut builder = BlockBuilder {
        blocks: Vec::new(),
        current: None,
        quote_depth: 0,
        item_depth: 0,
    };

    for event in Parser::new_ext(source, Options::ENABLE_STRIKETHROUGH) {
        match event {
            Event::Start(Tag::Heading { level, .. }) => builder.begin(heading_kind(level)),
            Event::Start(Tag::Paragraph) | Event::Start(Tag::CodeBlock(_)) => {
                let kind = builder.context_kind();
                builder.begin(kind);
            }
            Event::Start(Tag::Item) => {
                builder.item_depth += 1;
                builder.begin(BlockType::BulletItem);
            }
            Event::Start(Tag::BlockQuote(_)) => {
                builder.flush();
                builder.quote_depth += 1;
            }
            Event::Start(Tag::List(_)) => builder.flush(),
            Event::Start(Tag::Emphasis) => builder.push("<i>"),
            Event::Start(Tag::Strong) => builder.push("<b>"),
            Event::Start(Tag::Strikethrough) => builder.push("<s>"),
            Event::End(TagEnd::Emphasis) => builder.push("</i>"),
            Event::End(TagEnd::Strong) => builder.push("</b>"),
            Event::End(TagEnd::Strikethrough) => builder.push("</s>"),
            Event::End(TagEnd::Heading(_))
            | Event::End(TagEnd::Paragraph)
            | Event::End(TagEnd::CodeBlock) => builder.flush(),
            Event::End(TagEnd::Item) => {
                builder.flush();
                builder.item_depth = builder.item_depth.saturating_sub(1);
            }
            Event::End(TagEnd::BlockQuote(_)) => {
                builder.flush();
                builder.quote_depth = builder.quote_depth.saturating_sub(1);
            }
            Event::Text(text) => builder.push(&markup::escape_text(&text)),
            Event::Code(code) => {
                builder.push("<code>");
                builder.push(&markup::escape_text(&code));
                builder.push("</code>");
            }
            Event::InlineHtml(html) => builder.push(&html),
            Event::SoftBreak | Event::HardBreak => builder.push("\n"),
            _ => {}
        }
    }
    builder.flush();
    builder.blocks
}

fn inline_markdown(html: &str) -> String {
    let mut out = String::new();
    for segment in markup::segments(html) {
        match segment {
            Segment::Text(text) => out.push_str(&text),
            Segment::Open { name, .. } | Segment::Close { name } => {
                let marker = match name.as_str() {
                    "b" | "strong" => "**",
                    "i" | "em" => "*",
                    "s" | "strike" | "del" => "~~",
                    "code" => "`",
                    _ => "",
                };
                out.push_str(marker);
            }
            Segment::Inert { .. } => {}
        }
    }
    out
}

pub fn blocks_to_markdown(blocks: &[Block]) -> String {
    let mut out = String::new();
    let mut prev: Option<BlockType> = None;

    for block in blocks {
        if let Some(prev_kind) = prev {
            let tight = prev_kind == BlockType::BulletItem && block.kind == BlockType::BulletItem;
            out.push_str(if tight { "\n" } else { "\n\n" });
        }
        let text = inline_markdown(&block.content);
        match block.kind {
            BlockType::Quote => {
                let quoted: Vec<String> = text.split('\n').map(|line| format!("> {line}")).collect();
                out.push_str(&quoted.join("\n"));
            }
            kind => {
                let prefix = match kind.heading_level() {
                    Some(level) => format!("{} ", "#".repeat(level as usize)),
                    None if kind == BlockType::BulletItem => "- ".to_string(),
                    None => String::new(),
                };
                out.push_str(&prefix);
                out.push_str(&text);
            }
        }
        prev = Some(block.kind);
    }
    out
}
