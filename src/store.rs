use crate::block::{Block, BlockId, BlockType};
use crate::markup;

/// Where focus lands after a merge: the surviving block and the old boundary.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MergeOutcome {
    pub target: BlockId,
    pub caret: usize,
}

/// Ordered block sequence of one document.
///
/// Never empty, and exactly one block is active. Every state-changing mutation
/// bumps `revision` so callers can persist at keystroke granularity.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockStore {
    blocks: Vec<Block>,
    active: BlockId,
    revision: u64,
}

impl Default for BlockStore {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockStore {
    pub fn new() -> Self {
        Self::from_blocks(Vec::new())
    }

    pub fn from_blocks(mut blocks: Vec<Block>) -> Self {
        if blocks.is_empty() {
            blocks.push(Block::paragraph());
        }
        let mut seen = std::collections::HashSet::new();
        for block in blocks.iter_mut() {
            if !seen.insert(block.id.clone()) {
                block.id = BlockId::generate();
            }
        }
        let active = blocks[0].id.clone();
        Self {
            blocks,
            active,
            revision: 0,
        }
    }

    /// Swaps in a whole new document, keeping the store invariants.
    pub fn replace_blocks(&mut self, blocks: Vec<Block>) {
        let revision = self.revision + 1;
        *self = Self::from_blocks(blocks);
        self.revision = revision;
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn ids(&self) -> Vec<BlockId> {
        self.blocks.iter().map(|b| b.id.clone()).collect()
    }

    pub fn get(&self, id: &BlockId) -> Option<&Block> {
        self.blocks.iter().find(|b| &b.id == id)
    }

    pub fn index_of(&self, id: &BlockId) -> Option<usize> {
        self.blocks.iter().position(|b| &b.id == id)
    }

    pub fn previous(&self, id: &BlockId) -> Option<&Block> {
        let idx = self.index_of(id)?;
        idx.checked_sub(1).and_then(|i| self.blocks.get(i))
    }

    pub fn next(&self, id: &BlockId) -> Option<&Block> {
        let idx = self.index_of(id)?;
        self.blocks.get(idx + 1)
    }

    pub fn active(&self) -> &BlockId {
        &self.active
    }

    pub fn set_active(&mut self, id: &BlockId) -> bool {
        if self.index_of(id).is_none() {
            return false;
        }
        if &self.active != id {
            self.active = id.clone();
        }
        true
    }

    fn block_mut(&mut self, id: &BlockId) -> Option<&mut Block> {
        self.blocks.iter_mut().find(|b| &b.id == id)
    }

    /// Commits edited markup for a block. Returns whether anything changed.
    pub fn update_content(&mut self, id: &BlockId, html: &str) -> bool {
        let Some(block) = self.block_mut(id) else {
            return false;
        };
        if block.content == html {
            return false;
        }
        block.content = html.to_string();
        self.revision += 1;
        true
    }

    pub fn retype(&mut self, id: &BlockId, kind: BlockType) -> bool {
        let Some(block) = self.block_mut(id) else {
            return false;
        };
        if block.kind == kind {
            return false;
        }
        block.kind = kind;
        self.revision += 1;
        true
    }

    /// Inserts a block right after `after`; appends when `after` is unknown.
    pub fn insert_after(&mut self, after: &BlockId, kind: BlockType, html: &str) -> BlockId {
        let block = Block::new(kind, html);
        let id = block.id.clone();
        match self.index_of(after) {
            Some(idx) => self.blocks.insert(idx + 1, block),
            None => self.blocks.push(block),
        }
        self.revision += 1;
        id
    }

    pub fn append(&mut self, kind: BlockType) -> BlockId {
        let block = Block::new(kind, "");
        let id = block.id.clone();
        self.blocks.push(block);
        self.revision += 1;
        id
    }

    /// Keeps `before` in the block and moves `after` into a new block below it,
    /// which becomes active.
    pub fn split(
        &mut self,
        id: &BlockId,
        before: &str,
        after: &str,
        next_kind: BlockType,
    ) -> Option<BlockId> {
        self.index_of(id)?;
        self.update_content(id, before);
        let new_id = self.insert_after(id, next_kind, after);
        self.active = new_id.clone();
        Some(new_id)
    }

    /// Appends `html` (the block's live markup) onto the previous block and
    /// removes the block. The first block has no predecessor and is left alone.
    pub fn merge_into_previous(&mut self, id: &BlockId, html: &str) -> Option<MergeOutcome> {
        let idx = self.index_of(id)?;
        if idx == 0 {
            return None;
        }
        let prev = &mut self.blocks[idx - 1];
        let caret = markup::text_len(&prev.content);
        prev.content.push_str(html);
        let target = prev.id.clone();
        self.blocks.remove(idx);
        self.active = target.clone();
        self.revision += 1;
        Some(MergeOutcome { target, caret })
    }

    /// Removes a block unless it is the only one left.
    pub fn delete(&mut self, id: &BlockId) -> bool {
        if self.blocks.len() <= 1 {
            return false;
        }
        let Some(idx) = self.index_of(id) else {
            return false;
        };
        self.blocks.remove(idx);
        if &self.active == id {
            let fallback = idx.saturating_sub(1).min(self.blocks.len() - 1);
            self.active = self.blocks[fallback].id.clone();
        }
        self.revision += 1;
        true
    }

    /// Flushes markup read back from the rendered blocks after an in-place edit.
    pub fn sync_contents<I, S>(&mut self, updates: I) -> usize
    where
        I: IntoIterator<Item = (BlockId, S)>,
        S: AsRef<str>,
    {
        let mut changed = 0;
        for (id, html) in updates {
            if self.update_content(&id, html.as_ref()) {
                changed += 1;
            }
        }
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_of(contents: &[(BlockType, &str)]) -> BlockStore {
        BlockStore::from_blocks(
            contents
                .iter()
                .map(|(kind, html)| Block::new(*kind, *html))
                .collect(),
        )
    }

    #[test]
    fn never_empty() {
        let store = BlockStore::new();
        assert_eq!(store.len(), 1);
        assert_eq!(store.active(), &store.blocks()[0].id);
        assert_eq!(store.blocks()[0].kind, BlockType::Paragraph);
    }

    #[test]
    fn duplicate_ids_are_reassigned() {
        let a = Block {
            id: BlockId::from("same"),
            kind: BlockType::Paragraph,
            content: "a".into(),
        };
        let store = BlockStore::from_blocks(vec![a.clone(), a]);
        assert_ne!(store.blocks()[0].id, store.blocks()[1].id);
    }

    #[test]
    fn split_inserts_below_and_activates() {
        let mut store = store_of(&[(BlockType::Paragraph, "Hello world")]);
        let id = store.blocks()[0].id.clone();
        let new_id = store
            .split(&id, "Hello ", "world", BlockType::Paragraph)
            .unwrap();

        assert_eq!(store.len(), 2);
        assert_eq!(store.blocks()[0].content, "Hello ");
        assert_eq!(store.blocks()[1].content, "world");
        assert_eq!(store.blocks()[1].id, new_id);
        assert_eq!(store.active(), &new_id);
    }

    #[test]
    fn merge_appends_and_reports_boundary() {
        let mut store = store_of(&[
            (BlockType::Paragraph, "<b>Foo</b>"),
            (BlockType::Paragraph, "Bar"),
        ]);
        let second = store.blocks()[1].id.clone();
        let outcome = store.merge_into_previous(&second, "Bar").unwrap();

        assert_eq!(store.len(), 1);
        assert_eq!(store.blocks()[0].content, "<b>Foo</b>Bar");
        assert_eq!(outcome.caret, 3);
        assert_eq!(&outcome.target, store.active());
    }

    #[test]
    fn merge_on_first_block_is_a_no_op() {
        let mut store = store_of(&[(BlockType::Paragraph, "a"), (BlockType::Paragraph, "b")]);
        let first = store.blocks()[0].id.clone();
        store.set_active(&first);
        let before = store.clone();

        assert!(store.merge_into_previous(&first, "a").is_none());
        assert_eq!(store, before);
    }

    #[test]
    fn split_then_merge_restores_content() {
        let original = "Hel<i>lo wo</i>rld";
        let mut store = store_of(&[(BlockType::Paragraph, original)]);
        let id = store.blocks()[0].id.clone();
        let (before, after) = markup::split_at(original, 5, 5);
        let new_id = store
            .split(&id, &before, &after, BlockType::Paragraph)
            .unwrap();
        store.merge_into_previous(&new_id, &after).unwrap();

        assert_eq!(store.len(), 1);
        assert_eq!(store.blocks()[0].content, format!("{before}{after}"));
        assert_eq!(store.blocks()[0].plain_text(), "Hello world");
    }

    #[test]
    fn last_block_cannot_be_deleted() {
        let mut store = BlockStore::new();
        let id = store.blocks()[0].id.clone();
        assert!(!store.delete(&id));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn deleting_active_block_moves_focus_up() {
        let mut store = store_of(&[(BlockType::Paragraph, "a"), (BlockType::Quote, "b")]);
        let second = store.blocks()[1].id.clone();
        store.set_active(&second);
        assert!(store.delete(&second));
        assert_eq!(store.active(), &store.blocks()[0].id);
    }

    #[test]
    fn append_adds_an_empty_block_at_the_end() {
        let mut store = store_of(&[(BlockType::Heading1, "Title")]);
        let id = store.append(BlockType::Paragraph);
        assert_eq!(store.ids().last(), Some(&id));
        assert!(store.get(&id).unwrap().is_empty());
        assert_eq!(store.revision(), 1);
    }

    #[test]
    fn replacing_the_document_bumps_revision() {
        let mut store = store_of(&[(BlockType::Paragraph, "old")]);
        let id = store.ids()[0].clone();
        store.update_content(&id, "older");
        store.replace_blocks(vec![
            Block::new(BlockType::Heading2, "New"),
            Block::new(BlockType::BulletItem, "item"),
        ]);
        assert_eq!(store.revision(), 2);
        assert_eq!(store.len(), 2);
        assert_eq!(store.active(), &store.blocks()[0].id);

        store.replace_blocks(Vec::new());
        assert_eq!(store.len(), 1);
        assert_eq!(store.revision(), 3);
    }

    #[test]
    fn revision_tracks_real_changes_only() {
        let mut store = BlockStore::new();
        let id = store.blocks()[0].id.clone();
        assert!(!store.update_content(&id, ""));
        assert!(!store.retype(&id, BlockType::Paragraph));
        assert_eq!(store.revision(), 0);

        store.update_content(&id, "x");
        store.retype(&id, BlockType::Heading1);
        assert_eq!(store.revision(), 2);
    }

    #[test]
    fn sync_ignores_unknown_ids() {
        let mut store = store_of(&[(BlockType::Paragraph, "a"), (BlockType::Paragraph, "b")]);
        let ids = store.ids();
        let changed = store.sync_contents(vec![
            (ids[0].clone(), "<b>a</b>".to_string()),
            (ids[1].clone(), "b".to_string()),
            (BlockId::from("ghost"), "zzz".to_string()),
        ]);
        assert_eq!(changed, 1);
        assert_eq!(store.blocks()[0].content, "<b>a</b>");
    }
}
