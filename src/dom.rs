use wasm_bindgen::JsCast;
use web_sys::{Element, HtmlDocument, HtmlElement, Node, Range};

use crate::block::BlockId;
use crate::caret::{Selection, TextSurface};
use crate::error::{EditorError, Result};
use crate::focus::Focusable;
use crate::format::{FormatCommand, SelectionRect};

const SHOW_TEXT: u32 = 0x4;

/// Selection offsets from the DOM are UTF-16 units; the editor core counts chars.
pub fn utf16_to_char_offset(text: &str, units: u32) -> usize {
    let mut acc = 0u32;
    for (idx, ch) in text.chars().enumerate() {
        if acc >= units {
            return idx;
        }
        acc += ch.len_utf16() as u32;
    }
    text.chars().count()
}

pub fn char_to_utf16_offset(text: &str, chars: usize) -> u32 {
    text.chars()
        .take(chars)
        .map(|c| c.len_utf16() as u32)
        .sum()
}

/// Text node index and offset inside it for a UTF-16 offset over nodes of the
/// given lengths. A boundary between two nodes resolves to the end of the first.
fn text_node_at(lengths: &[u32], units: u32) -> Option<(usize, u32)> {
    let mut remaining = units;
    for (idx, len) in lengths.iter().enumerate() {
        if remaining <= *len {
            return Some((idx, remaining));
        }
        remaining -= len;
    }
    None
}

fn dom_err(err: wasm_bindgen::JsValue) -> EditorError {
    EditorError::Dom(format!("{err:?}"))
}

/// Editable block element in the live page.
#[derive(Clone, Debug)]
pub struct DomSurface {
    el: HtmlElement,
}

impl DomSurface {
    pub fn new(el: HtmlElement) -> Self {
        Self { el }
    }

    pub fn find(id: &BlockId) -> Option<Self> {
        web_sys::window()?
            .document()?
            .get_element_by_id(&id.dom_id())?
            .dyn_into::<HtmlElement>()
            .ok()
            .map(Self::new)
    }

    /// Viewport rectangle of the block, for anchoring the slash menu.
    pub fn bounds(&self) -> (f64, f64) {
        let rect = self.el.get_bounding_client_rect();
        (rect.bottom(), rect.left())
    }

    fn current_range(&self) -> Option<Range> {
        let selection = web_sys::window()?.get_selection().ok()??;
        if selection.range_count() == 0 {
            return None;
        }
        let range = selection.get_range_at(0).ok()?;
        let node: &Node = self.el.as_ref();
        if !node.contains(Some(&range.start_container().ok()?)) {
            return None;
        }
        Some(range)
    }

    /// UTF-16 length of the text between the element start and a boundary point.
    fn units_before(&self, container: &Node, offset: u32) -> Result<u32> {
        let document = web_sys::window()
            .and_then(|w| w.document())
            .ok_or_else(|| EditorError::Dom("no document".to_string()))?;
        let pre = document.create_range().map_err(dom_err)?;
        pre.select_node_contents(&self.el).map_err(dom_err)?;
        pre.set_end(container, offset).map_err(dom_err)?;
        Ok(pre.to_string().length())
    }

    fn text_nodes(&self, document: &web_sys::Document) -> Result<Vec<Node>> {
        let walker = document
            .create_tree_walker_with_what_to_show(&self.el, SHOW_TEXT)
            .map_err(dom_err)?;
        let mut nodes = Vec::new();
        while let Some(node) = walker.next_node().map_err(dom_err)? {
            nodes.push(node);
        }
        Ok(nodes)
    }

    /// Sets one end of `range` at a UTF-16 offset, or at the end of the element
    /// when the offset runs past the text.
    fn set_boundary(
        &self,
        range: &Range,
        nodes: &[Node],
        units: u32,
        start: bool,
    ) -> Result<()> {
        let lengths: Vec<u32> = nodes
            .iter()
            .map(|n| n.text_content().unwrap_or_default().encode_utf16().count() as u32)
            .collect();
        let (node, offset): (&Node, u32) = match text_node_at(&lengths, units) {
            Some((idx, offset)) => (&nodes[idx], offset),
            None => (self.el.as_ref(), self.el.child_nodes().length()),
        };
        if start {
            range.set_start(node, offset).map_err(dom_err)
        } else {
            range.set_end(node, offset).map_err(dom_err)
        }
    }

    fn place_selection(&self, start: u32, end: u32) -> Result<()> {
        let window = web_sys::window().ok_or_else(|| EditorError::Dom("no window".to_string()))?;
        let document = window
            .document()
            .ok_or_else(|| EditorError::Dom("no document".to_string()))?;
        let selection = window
            .get_selection()
            .map_err(dom_err)?
            .ok_or_else(|| EditorError::Dom("no selection".to_string()))?;
        let range = document.create_range().map_err(dom_err)?;

        let nodes = self.text_nodes(&document)?;
        self.set_boundary(&range, &nodes, start, true)?;
        if end > start {
            self.set_boundary(&range, &nodes, end, false)?;
        } else {
            range.collapse_with_to_start(true);
        }

        selection.remove_all_ranges().map_err(dom_err)?;
        selection.add_range(&range).map_err(dom_err)?;
        Ok(())
    }
}

impl TextSurface for DomSurface {
    fn plain_text(&self) -> String {
        self.el.text_content().unwrap_or_default()
    }

    fn markup(&self) -> String {
        self.el.inner_html()
    }

    fn set_markup(&mut self, html: &str) {
        self.el.set_inner_html(html);
    }

    fn selection(&self) -> Option<Selection> {
        let range = self.current_range()?;
        let start = self
            .units_before(&range.start_container().ok()?, range.start_offset().ok()?)
            .ok()?;
        let end = self
            .units_before(&range.end_container().ok()?, range.end_offset().ok()?)
            .ok()?;
        let text = self.plain_text();
        Some(Selection::new(
            utf16_to_char_offset(&text, start),
            utf16_to_char_offset(&text, end),
        ))
    }

    fn set_selection(&mut self, selection: Selection) {
        let text = self.plain_text();
        let start = char_to_utf16_offset(&text, selection.start);
        let end = char_to_utf16_offset(&text, selection.end);
        if let Err(err) = self.place_selection(start, end) {
            leptos::logging::warn!("selection placement failed: {err}");
        }
    }
}

impl Focusable for DomSurface {
    /// Focuses the editing host; blocks live inside one editable container.
    fn focus(&self) {
        let host = self
            .el
            .closest("[contenteditable]")
            .ok()
            .flatten()
            .and_then(|el| el.dyn_into::<HtmlElement>().ok())
            .unwrap_or_else(|| self.el.clone());
        if let Err(err) = host.focus() {
            leptos::logging::warn!("block focus failed: {err:?}");
        }
    }
}

/// Block holding the selection anchor, with its surface.
pub fn block_at_selection() -> Option<(BlockId, DomSurface)> {
    let selection = web_sys::window()?.get_selection().ok()??;
    let anchor = selection.anchor_node()?;
    let element = match anchor.dyn_ref::<Element>() {
        Some(el) => el.clone(),
        None => anchor.parent_element()?,
    };
    let block = element.closest("[data-block-id]").ok()??;
    let id = block.get_attribute("data-block-id")?;
    let el = block.dyn_into::<HtmlElement>().ok()?;
    Some((BlockId::from(id), DomSurface::new(el)))
}

/// Current non-collapsed selection inside `container`, as text and bounding box.
pub fn container_selection(container: &Element) -> Option<(String, SelectionRect)> {
    let selection = web_sys::window()?.get_selection().ok()??;
    if selection.range_count() == 0 || selection.is_collapsed() {
        return None;
    }
    let anchor = selection.anchor_node();
    let node: &Node = container.as_ref();
    if !node.contains(anchor.as_ref()) {
        return None;
    }
    let range = selection.get_range_at(0).ok()?;
    let rect = range.get_bounding_client_rect();
    Some((
        String::from(selection.to_string()),
        SelectionRect {
            top: rect.top(),
            left: rect.left(),
            width: rect.width(),
        },
    ))
}

pub fn scroll_offsets() -> (f64, f64) {
    web_sys::window()
        .map(|w| (w.scroll_x().unwrap_or(0.0), w.scroll_y().unwrap_or(0.0)))
        .unwrap_or((0.0, 0.0))
}

/// Runs a formatting command on the live selection.
pub fn exec_format(command: &FormatCommand, selected_text: &str) -> Result<()> {
    let document = web_sys::window()
        .and_then(|w| w.document())
        .ok_or_else(|| EditorError::Dom("no document".to_string()))?
        .dyn_into::<HtmlDocument>()
        .map_err(|_| EditorError::Dom("not an html document".to_string()))?;
    let (name, value) = command.exec_args(selected_text);
    match value {
        Some(value) => document
            .exec_command_with_show_ui_and_value(name, false, &value)
            .map_err(dom_err)?,
        None => document.exec_command(name).map_err(dom_err)?,
    };
    Ok(())
}

/// Markup of every rendered block under `container`, keyed by block id.
pub fn read_block_markup(container: &Element) -> Vec<(BlockId, String)> {
    let Ok(nodes) = container.query_selector_all("[data-block-id]") else {
        return Vec::new();
    };
    (0..nodes.length())
        .filter_map(|i| nodes.item(i))
        .filter_map(|node| node.dyn_into::<Element>().ok())
        .filter_map(|el| {
            let id = el.get_attribute("data-block-id")?;
            Some((BlockId::from(id), el.inner_html()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_between_utf16_and_chars() {
        let text = "a😀b";
        assert_eq!(char_to_utf16_offset(text, 2), 3);
        assert_eq!(utf16_to_char_offset(text, 3), 2);
        assert_eq!(utf16_to_char_offset(text, 99), 3);
        assert_eq!(utf16_to_char_offset("", 0), 0);
    }

    #[test]
    fn locates_boundaries_across_text_nodes() {
        let lengths = [5, 0, 6];
        assert_eq!(text_node_at(&lengths, 0), Some((0, 0)));
        assert_eq!(text_node_at(&lengths, 5), Some((0, 5)));
        assert_eq!(text_node_at(&lengths, 7), Some((2, 2)));
        assert_eq!(text_node_at(&lengths, 11), Some((2, 6)));
        assert_eq!(text_node_at(&lengths, 12), None);
        assert_eq!(text_node_at(&[], 0), None);
    }
}
