use crate::block::{BlockId, BlockType};
use crate::caret::{self, TextSurface};
use crate::markup;
use crate::store::BlockStore;

/// Markdown prefixes that retype a block, checked in order.
pub const SHORTCUTS: [(&str, BlockType); 5] = [
    ("# ", BlockType::Heading1),
    ("## ", BlockType::Heading2),
    ("### ", BlockType::Heading3),
    ("- ", BlockType::BulletItem),
    ("> ", BlockType::Quote),
];

pub const SLASH_ITEMS: [BlockType; 6] = BlockType::ALL;

pub fn match_shortcut(text: &str) -> Option<BlockType> {
    SHORTCUTS
        .iter()
        .find(|(prefix, _)| text.starts_with(prefix))
        .map(|(_, kind)| *kind)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Key {
    Enter,
    Backspace,
    ArrowUp,
    ArrowDown,
    Escape,
    Other,
}

impl Key {
    /// Maps a DOM `KeyboardEvent.key` value.
    pub fn from_dom(key: &str) -> Self {
        match key {
            "Enter" => Key::Enter,
            "Backspace" => Key::Backspace,
            "ArrowUp" => Key::ArrowUp,
            "ArrowDown" => Key::ArrowDown,
            "Escape" => Key::Escape,
            _ => Key::Other,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KeyInput {
    pub key: Key,
    pub shift: bool,
}

impl KeyInput {
    pub fn plain(key: Key) -> Self {
        Self { key, shift: false }
    }

    pub fn shifted(key: Key) -> Self {
        Self { key, shift: true }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Mode {
    #[default]
    Editing,
    SlashMenu,
}

/// Focus and caret placement to run once the target block is rendered.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FocusRequest {
    pub block: BlockId,
    pub offset: usize,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InputOutcome {
    Edited,
    SlashMenuOpened,
    Retyped(BlockType),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum KeyOutcome {
    /// Not ours; the browser default applies.
    PassThrough,
    Handled,
    Focus(FocusRequest),
}

impl KeyOutcome {
    pub fn prevents_default(&self) -> bool {
        !matches!(self, KeyOutcome::PassThrough)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InputInterpreter {
    block: BlockId,
    mode: Mode,
    trigger: char,
}

impl InputInterpreter {
    pub fn new(block: BlockId, trigger: char) -> Self {
        Self {
            block,
            mode: Mode::Editing,
            trigger,
        }
    }

    pub fn block(&self) -> &BlockId {
        &self.block
    }

    pub fn slash_open(&self) -> bool {
        self.mode == Mode::SlashMenu
    }

    fn is_trigger(&self, text: &str) -> bool {
        let mut chars = text.chars();
        chars.next() == Some(self.trigger) && chars.next().is_none()
    }

    fn clear(&self, surface: &mut impl TextSurface, store: &mut BlockStore) {
        surface.set_markup("");
        store.update_content(&self.block, "");
    }

    /// Handles an input event after the surface content changed.
    pub fn on_input(&mut self, surface: &mut impl TextSurface, store: &mut BlockStore) -> InputOutcome {
        store.update_content(&self.block, &surface.markup());
        let text = surface.plain_text();

        if self.is_trigger(&text) {
            self.mode = Mode::SlashMenu;
            return InputOutcome::SlashMenuOpened;
        }

        if let Some(kind) = match_shortcut(&text) {
            store.retype(&self.block, kind);
            self.clear(surface, store);
            return InputOutcome::Retyped(kind);
        }

        self.mode = Mode::Editing;
        InputOutcome::Edited
    }

    pub fn on_keydown(
        &mut self,
        input: KeyInput,
        surface: &mut impl TextSurface,
        store: &mut BlockStore,
    ) -> KeyOutcome {
        if self.mode == Mode::SlashMenu {
            return self.slash_keydown(input, surface, store);
        }

        let Some(kind) = store.get(&self.block).map(|b| b.kind) else {
            return KeyOutcome::PassThrough;
        };

        match input.key {
            Key::Enter if !input.shift => self.split(kind, surface, store),
            Key::Backspace if caret::is_at_start(surface) => {
                if kind != BlockType::Paragraph {
                    store.retype(&self.block, BlockType::Paragraph);
                    return KeyOutcome::Handled;
                }
                match store.merge_into_previous(&self.block, &surface.markup()) {
                    Some(merged) => KeyOutcome::Focus(FocusRequest {
                        block: merged.target,
                        offset: merged.caret,
                    }),
                    None => KeyOutcome::Handled,
                }
            }
            Key::ArrowUp if surface.selection().is_some() && caret::is_on_first_line(surface) => {
                let column = caret::caret_column(surface);
                let Some(prev) = store.previous(&self.block) else {
                    return KeyOutcome::PassThrough;
                };
                let request = FocusRequest {
                    block: prev.id.clone(),
                    offset: caret::offset_on_last_line(&prev.plain_text(), column),
                };
                store.set_active(&request.block);
                KeyOutcome::Focus(request)
            }
            Key::ArrowDown if surface.selection().is_some() && caret::is_on_last_line(surface) => {
                let column = caret::caret_column(surface);
                let Some(next) = store.next(&self.block) else {
                    return KeyOutcome::PassThrough;
                };
                let request = FocusRequest {
                    block: next.id.clone(),
                    offset: caret::offset_on_first_line(&next.plain_text(), column),
                };
                store.set_active(&request.block);
                KeyOutcome::Focus(request)
            }
            _ => KeyOutcome::PassThrough,
        }
    }

    fn slash_keydown(
        &mut self,
        input: KeyInput,
        surface: &mut impl TextSurface,
        store: &mut BlockStore,
    ) -> KeyOutcome {
        match input.key {
            Key::Escape => {
                self.mode = Mode::Editing;
                KeyOutcome::Handled
            }
            Key::Backspace if self.is_trigger(&surface.plain_text()) => {
                self.mode = Mode::Editing;
                self.clear(surface, store);
                KeyOutcome::Handled
            }
            // The menu is picked with the mouse; a native line break here would
            // land in markup the store never sees.
            Key::Enter => KeyOutcome::Handled,
            _ => KeyOutcome::PassThrough,
        }
    }

    fn split(
        &mut self,
        kind: BlockType,
        surface: &mut impl TextSurface,
        store: &mut BlockStore,
    ) -> KeyOutcome {
        let (before, after) = caret::split_at_selection(surface);
        surface.set_markup(&before);

        // An empty bullet line ends the list.
        let next_kind = if kind == BlockType::BulletItem && !markup::plain_text(&before).trim().is_empty() {
            BlockType::BulletItem
        } else {
            BlockType::Paragraph
        };

        match store.split(&self.block, &before, &after, next_kind) {
            Some(new_id) => KeyOutcome::Focus(FocusRequest {
                block: new_id,
                offset: 0,
            }),
            None => KeyOutcome::PassThrough,
        }
    }

    /// Applies a slash menu entry and asks for focus back on this block.
    pub fn select_slash_item(
        &mut self,
        kind: BlockType,
        surface: &mut impl TextSurface,
        store: &mut BlockStore,
    ) -> FocusRequest {
        self.clear(surface, store);
        store.retype(&self.block, kind);
        self.mode = Mode::Editing;
        FocusRequest {
            block: self.block.clone(),
            offset: 0,
        }
    }

    pub fn on_blur(&mut self, surface: &impl TextSurface, store: &mut BlockStore) {
        self.mode = Mode::Editing;
        store.update_content(&self.block, &surface.markup());
    }
}
