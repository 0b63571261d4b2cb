use std::collections::HashMap;

use leptos::ev;
use leptos::html;
use leptos::logging::{error, log, warn};
use leptos::prelude::*;

use crate::block::{self, BlockId, BlockType};
use crate::document::{NoteContent, NOTE_KEY};
use crate::dom::{self, DomSurface};
use crate::focus::{self, Scheduler, TimeoutScheduler};
use crate::format::{self, FormatCommand, ToolbarPosition, PALETTE};
use crate::interpreter::{
    FocusRequest, InputInterpreter, InputOutcome, Key, KeyInput, KeyOutcome, SLASH_ITEMS,
};
use crate::markup;
use crate::settings::EditorSettings;
use crate::store::BlockStore;

#[derive(Clone, Copy)]
struct EditorCtx {
    store: RwSignal<BlockStore>,
    /// Block whose element is being typed into; its DOM is authoritative.
    live: RwSignal<Option<BlockId>>,
    settings: StoredValue<EditorSettings>,
    interpreters: StoredValue<HashMap<BlockId, InputInterpreter>>,
}

#[derive(Clone, Debug, PartialEq)]
struct SlashMenu {
    block: BlockId,
    top: f64,
    left: f64,
}

fn local_storage() -> Option<web_sys::Storage> {
    window().local_storage().ok().flatten()
}

fn load_note() -> BlockStore {
    let Some(json) = local_storage().and_then(|s| s.get_item(NOTE_KEY).ok().flatten()) else {
        return BlockStore::new();
    };
    match NoteContent::from_json(&json) {
        Ok(note) => note.into_store(),
        Err(err) => {
            warn!("starting with an empty note: {err}");
            BlockStore::new()
        }
    }
}

fn save_note(store: &BlockStore) {
    let json = match NoteContent::from_store(store).to_json() {
        Ok(json) => json,
        Err(err) => {
            error!("could not encode note: {err}");
            return;
        }
    };
    if let Some(storage) = local_storage() {
        if let Err(err) = storage.set_item(NOTE_KEY, &json) {
            error!("could not save note: {err:?}");
        }
    }
}

fn request_focus(ctx: EditorCtx, request: FocusRequest) {
    TimeoutScheduler.defer(Box::new(move || {
        let surface = DomSurface::find(&request.block);
        let activate = |id: &BlockId| {
            let mut known = false;
            ctx.store.update(|s| known = s.set_active(id));
            known
        };
        if focus::apply_focus(&request, activate, surface) {
            ctx.live.set(Some(request.block.clone()));
        } else {
            warn!("focus target {} is not rendered", request.block);
        }
    }));
}

/// Runs `f` against the interpreter and surface of the block holding the caret.
fn dispatch<R>(
    ctx: EditorCtx,
    f: impl FnOnce(&mut InputInterpreter, &mut DomSurface, &mut BlockStore) -> R,
) -> Option<(BlockId, R)> {
    let (id, mut surface) = dom::block_at_selection()?;
    if ctx.live.with_untracked(|live| live.as_ref() != Some(&id)) {
        ctx.live.set(Some(id.clone()));
    }
    let trigger = ctx.settings.with_value(|s| s.slash_trigger);

    let mut result = None;
    ctx.interpreters.update_value(|map| {
        let interp = map
            .entry(id.clone())
            .or_insert_with(|| InputInterpreter::new(id.clone(), trigger));
        ctx.store.update(|store| result = Some(f(interp, &mut surface, store)));
    });
    result.map(|r| (id, r))
}

fn prune_interpreters(ctx: EditorCtx) {
    let ids = ctx.store.with_untracked(|s| s.ids());
    ctx.interpreters
        .update_value(|map| map.retain(|id, _| ids.contains(id)));
}

/// Placeholder for a rendered block. Only the block being edited counts as
/// focused, so nothing but the first block keeps one once the editor blurs.
fn placeholder_text(
    settings: &EditorSettings,
    id: &BlockId,
    index: usize,
    empty: bool,
    live: Option<&BlockId>,
) -> String {
    block::placeholder(
        index,
        empty,
        live == Some(id),
        &settings.first_block_placeholder,
        &settings.focused_placeholder,
    )
    .unwrap_or_default()
    .to_string()
}

#[component]
pub fn App() -> impl IntoView {
    let settings = EditorSettings::load();
    let store = RwSignal::new(load_note());
    provide_context(EditorCtx {
        store,
        live: RwSignal::new(None),
        settings: StoredValue::new(settings),
        interpreters: StoredValue::new(HashMap::new()),
    });

    // Persist at keystroke granularity, skipping the initial load.
    Effect::new(move |last: Option<u64>| {
        let revision = store.with(|s| s.revision());
        if last.is_some_and(|prev| prev != revision) {
            store.with_untracked(save_note);
        }
        revision
    });

    view! {
        <main class="app-layout">
            <NoteActions/>
            <Editor/>
        </main>
    }
}

#[component]
fn NoteActions() -> impl IntoView {
    let ctx = expect_context::<EditorCtx>();
    let store = ctx.store;
    let panel_open = RwSignal::new(false);
    let draft = RwSignal::new(String::new());

    let add_block = move |_: ev::MouseEvent| {
        let mut appended = None;
        store.update(|s| appended = Some(s.append(BlockType::Paragraph)));
        if let Some(block) = appended {
            request_focus(ctx, FocusRequest { block, offset: 0 });
        }
    };

    let open_markdown = move |_: ev::MouseEvent| {
        draft.set(store.with_untracked(|s| NoteContent::from_store(s).to_markdown()));
        panel_open.set(true);
    };

    let import = move |_: ev::MouseEvent| {
        let note = draft.with_untracked(|text| NoteContent::from_markdown(text));
        log!("replacing note with {} imported blocks", note.blocks.len());
        ctx.live.set(None);
        store.update(|s| s.replace_blocks(note.blocks));
        prune_interpreters(ctx);
        panel_open.set(false);
    };

    view! {
        <div class="note-actions">
            <button on:click=add_block>"New block"</button>
            <button on:click=open_markdown>"Markdown"</button>
        </div>
        {move || {
            panel_open
                .get()
                .then(|| {
                    view! {
                        <div class="markdown-panel">
                            <textarea
                                spellcheck="false"
                                prop:value=move || draft.get()
                                on:input=move |ev| draft.set(event_target_value(&ev))
                            ></textarea>
                            <div class="markdown-panel-actions">
                                <button on:click=import>"Replace note"</button>
                                <button on:click=move |_| panel_open.set(false)>"Close"</button>
                            </div>
                        </div>
                    }
                })
        }}
    }
}

#[component]
fn Editor() -> impl IntoView {
    let ctx = expect_context::<EditorCtx>();
    let store = ctx.store;
    let container: NodeRef<html::Div> = NodeRef::new();
    let slash = RwSignal::new(None::<SlashMenu>);
    let toolbar = RwSignal::new(None::<ToolbarPosition>);
    let selected_text = StoredValue::new(String::new());

    let track_selection = move || {
        let Some((id, _)) = dom::block_at_selection() else {
            return;
        };
        if store.with_untracked(|s| s.active() != &id) {
            store.update(|s| {
                s.set_active(&id);
            });
        }
        if ctx.live.with_untracked(|live| live.as_ref() != Some(&id)) {
            ctx.live.set(Some(id));
        }
    };

    let close_slash_for = move |id: &BlockId| {
        if slash.with_untracked(|menu| menu.as_ref().is_some_and(|m| &m.block == id)) {
            slash.set(None);
        }
    };

    let on_keydown = move |ev: ev::KeyboardEvent| {
        let input = KeyInput {
            key: Key::from_dom(&ev.key()),
            shift: ev.shift_key(),
        };
        if input.key == Key::Other {
            return;
        }
        let Some((id, (outcome, still_open))) = dispatch(ctx, |interp, surface, store| {
            let outcome = interp.on_keydown(input, surface, store);
            (outcome, interp.slash_open())
        }) else {
            return;
        };
        if outcome.prevents_default() {
            ev.prevent_default();
        }
        if !still_open {
            close_slash_for(&id);
        }
        if let KeyOutcome::Focus(request) = outcome {
            prune_interpreters(ctx);
            request_focus(ctx, request);
        }
    };

    let on_input = move |_: ev::Event| {
        let Some((id, (outcome, (bottom, left)))) = dispatch(ctx, |interp, surface, store| {
            let outcome = interp.on_input(surface, store);
            (outcome, surface.bounds())
        }) else {
            return;
        };
        match outcome {
            InputOutcome::SlashMenuOpened => slash.set(Some(SlashMenu {
                block: id,
                top: bottom + 4.0,
                left,
            })),
            InputOutcome::Edited | InputOutcome::Retyped(_) => close_slash_for(&id),
        }
    };

    let on_blur = move |_: ev::FocusEvent| {
        let Some(id) = ctx.live.get_untracked() else {
            return;
        };
        if let Some(surface) = DomSurface::find(&id) {
            ctx.interpreters.update_value(|map| {
                if let Some(interp) = map.get_mut(&id) {
                    store.update(|s| interp.on_blur(&surface, s));
                }
            });
        }
        ctx.live.set(None);
        slash.set(None);
    };

    let choose = move |kind: BlockType| {
        let Some(menu) = slash.get_untracked() else {
            return;
        };
        let Some(mut surface) = DomSurface::find(&menu.block) else {
            return;
        };
        let trigger = ctx.settings.with_value(|s| s.slash_trigger);
        let mut request = None;
        ctx.interpreters.update_value(|map| {
            let interp = map
                .entry(menu.block.clone())
                .or_insert_with(|| InputInterpreter::new(menu.block.clone(), trigger));
            store.update(|s| request = Some(interp.select_slash_item(kind, &mut surface, s)));
        });
        slash.set(None);
        if let Some(request) = request {
            request_focus(ctx, request);
        }
    };

    let on_mouseup = move |_: ev::MouseEvent| {
        track_selection();
        let Some(el) = container.get_untracked() else {
            return;
        };
        let offset = ctx.settings.with_value(|s| s.toolbar_offset);
        let position = dom::container_selection(&el).and_then(|(text, rect)| {
            selected_text.set_value(text);
            let (scroll_x, scroll_y) = dom::scroll_offsets();
            format::toolbar_position(rect, scroll_x, scroll_y, offset)
        });
        toolbar.set(position);
    };

    let apply = move |command: FormatCommand| {
        let text = selected_text.get_value();
        if let Err(err) = dom::exec_format(&command, &text) {
            error!("formatting failed: {err}");
        }
        if let Some(el) = container.get_untracked() {
            let updates = dom::read_block_markup(&el);
            store.update(|s| {
                s.sync_contents(updates);
            });
        }
        toolbar.set(None);
    };

    view! {
        <div class="editor-pane" on:mouseup=on_mouseup>
            <div
                class="editor-blocks"
                node_ref=container
                contenteditable="true"
                spellcheck="false"
                on:keydown=on_keydown
                on:keyup=move |_: ev::KeyboardEvent| track_selection()
                on:input=on_input
                on:blur=on_blur
            >
                <For
                    each=move || store.with(|s| s.ids())
                    key=|id| id.clone()
                    children=move |id| view! { <BlockView id=id/> }
                />
            </div>
            {move || slash.get().map(|menu| slash_menu_view(menu, choose))}
            {move || toolbar.get().map(|pos| format_toolbar_view(pos, apply))}
        </div>
    }
}

#[component]
fn BlockView(id: BlockId) -> impl IntoView {
    let ctx = expect_context::<EditorCtx>();
    let store = ctx.store;
    let node_ref: NodeRef<html::Div> = NodeRef::new();

    let kind = {
        let id = id.clone();
        Memo::new(move |_| store.with(|s| s.get(&id).map(|b| b.kind).unwrap_or_default()))
    };
    let index = {
        let id = id.clone();
        Memo::new(move |_| store.with(|s| s.index_of(&id).unwrap_or(0)))
    };
    let content = {
        let id = id.clone();
        Memo::new(move |_| {
            store.with(|s| s.get(&id).map(|b| b.content.clone()).unwrap_or_default())
        })
    };

    // Mirror stored content into the element unless it is being typed into.
    {
        let id = id.clone();
        Effect::new(move |_| {
            let html = content.get();
            let Some(el) = node_ref.get() else {
                return;
            };
            let editing = ctx.live.with_untracked(|live| live.as_ref() == Some(&id));
            if !editing && el.inner_html() != html {
                el.set_inner_html(&html);
            }
        });
    }

    let is_empty = move || content.with(|html| markup::is_empty(html));
    let placeholder = {
        let id = id.clone();
        move || {
            let empty = is_empty();
            let index = index.get();
            ctx.live.with(|live| {
                ctx.settings
                    .with_value(|s| placeholder_text(s, &id, index, empty, live.as_ref()))
            })
        }
    };
    let remove = {
        let id = id.clone();
        move |ev: ev::MouseEvent| {
            ev.prevent_default();
            if ctx.live.with_untracked(|live| live.as_ref() == Some(&id)) {
                ctx.live.set(None);
            }
            let mut removed = false;
            store.update(|s| removed = s.delete(&id));
            if removed {
                prune_interpreters(ctx);
            }
        }
    };
    let class = move || {
        let mut class = kind.get().css_class().to_string();
        if is_empty() {
            class.push_str(" empty-block");
        }
        class
    };

    view! {
        <div class=move || format!("block-row block-row-{}", kind.get().tag())>
            {move || (kind.get() == BlockType::Quote).then(|| view! { <div class="quote-bar"></div> })}
            {move || (kind.get() == BlockType::BulletItem).then(|| view! { <span class="bullet">"•"</span> })}
            <div
                node_ref=node_ref
                id=id.dom_id()
                data-block-id=id.to_string()
                class=class
                data-placeholder=placeholder
            ></div>
            <button
                class="block-delete"
                contenteditable="false"
                tabindex="-1"
                title="Delete block"
                on:mousedown=remove
            >
                "×"
            </button>
        </div>
    }
}

fn slash_menu_view(
    menu: SlashMenu,
    choose: impl Fn(BlockType) + Copy + Send + Sync + 'static,
) -> impl IntoView {
    view! {
        <div
            id="slash-menu"
            class="slash-menu"
            tabindex="-1"
            style=format!("position: fixed; top: {}px; left: {}px;", menu.top, menu.left)
        >
            <p class="slash-heading">"Turn into"</p>
            {SLASH_ITEMS
                .iter()
                .map(|kind| {
                    let kind = *kind;
                    view! {
                        <button
                            class="slash-item"
                            on:mousedown=move |ev: ev::MouseEvent| {
                                ev.prevent_default();
                                choose(kind);
                            }
                        >
                            {kind.label()}
                        </button>
                    }
                })
                .collect::<Vec<_>>()}
        </div>
    }
}

fn format_toolbar_view(
    pos: ToolbarPosition,
    apply: impl Fn(FormatCommand) + Copy + Send + Sync + 'static,
) -> impl IntoView {
    let button = move |command: FormatCommand, glyph: &'static str| {
        let title = command.title();
        view! {
            <button
                class="fmt-btn"
                title=title
                on:mousedown=move |ev: ev::MouseEvent| {
                    ev.prevent_default();
                    apply(command.clone());
                }
            >
                {glyph}
            </button>
        }
    };

    view! {
        <div
            id="fmt-menu"
            class="fmt-menu"
            tabindex="-1"
            style=format!(
                "position: absolute; top: {}px; left: {}px; transform: translateX(-50%);",
                pos.top,
                pos.left,
            )
        >
            {button(FormatCommand::Bold, "B")}
            {button(FormatCommand::Italic, "I")}
            {button(FormatCommand::Strikethrough, "S")}
            {button(FormatCommand::Code, "</>")}
            <div class="fmt-divider"></div>
            <span class="fmt-label">"Color"</span>
            {PALETTE
                .iter()
                .map(|swatch| {
                    let command = FormatCommand::ForeColor(swatch.value.to_string());
                    view! {
                        <button
                            class="fmt-swatch"
                            title=swatch.label
                            style=format!("background-color: {};", swatch.value)
                            on:mousedown=move |ev: ev::MouseEvent| {
                                ev.prevent_default();
                                apply(command.clone());
                            }
                        ></button>
                    }
                })
                .collect::<Vec<_>>()}
            {button(FormatCommand::ClearFormatting, "Clear")}
        </div>
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_follows_the_block_being_edited() {
        let settings = EditorSettings::default();
        let third = BlockId::from("c");

        let editing = placeholder_text(&settings, &third, 2, true, Some(&third));
        assert_eq!(editing, settings.focused_placeholder);

        // After blur nothing is live, even though the store still marks it active.
        assert_eq!(placeholder_text(&settings, &third, 2, true, None), "");
        let elsewhere = BlockId::from("a");
        assert_eq!(placeholder_text(&settings, &third, 2, true, Some(&elsewhere)), "");

        let first = placeholder_text(&settings, &elsewhere, 0, true, None);
        assert_eq!(first, settings.first_block_placeholder);
        assert_eq!(placeholder_text(&settings, &third, 2, false, Some(&third)), "");
    }
}
