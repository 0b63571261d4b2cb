use crate::markup;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Selection {
    pub start: usize,
    pub end: usize,
}

impl Selection {
    pub fn new(start: usize, end: usize) -> Self {
        if start <= end {
            Self { start, end }
        } else {
            Self {
                start: end,
                end: start,
            }
        }
    }

    pub fn cursor(pos: usize) -> Self {
        Self {
            start: pos,
            end: pos,
        }
    }

    pub fn is_cursor(self) -> bool {
        self.start == self.end
    }

    pub fn clamp(self, len: usize) -> Self {
        Self::new(self.start.min(len), self.end.min(len))
    }
}

/// A text-bearing node with a navigable selection.
pub trait TextSurface {
    fn plain_text(&self) -> String;

    fn markup(&self) -> String;

    fn set_markup(&mut self, html: &str);

    /// Selection in plain-text offsets, `None` when no selection lies inside the surface.
    fn selection(&self) -> Option<Selection>;

    fn set_selection(&mut self, selection: Selection);
}

pub fn caret_offset(surface: &impl TextSurface) -> usize {
    surface.selection().map(|sel| sel.start).unwrap_or(0)
}

pub fn is_on_first_line(surface: &impl TextSurface) -> bool {
    let Some(sel) = surface.selection() else {
        return true;
    };
    !surface.plain_text().chars().take(sel.start).any(|c| c == '\n')
}

pub fn is_on_last_line(surface: &impl TextSurface) -> bool {
    let Some(sel) = surface.selection() else {
        return true;
    };
    !surface.plain_text().chars().skip(sel.end).any(|c| c == '\n')
}

pub fn is_at_start(surface: &impl TextSurface) -> bool {
    match surface.selection() {
        Some(sel) => sel.is_cursor() && sel.start == 0,
        None => false,
    }
}

/// Column on the caret's line, counting explicit `\n` breaks only.
pub fn caret_column(surface: &impl TextSurface) -> usize {
    let offset = caret_offset(surface);
    column_at(&surface.plain_text(), offset)
}

pub fn column_at(text: &str, offset: usize) -> usize {
    let line_start = text
        .chars()
        .take(offset)
        .enumerate()
        .filter(|(_, c)| *c == '\n')
        .last()
        .map(|(i, _)| i + 1)
        .unwrap_or(0);
    offset.saturating_sub(line_start)
}

/// Places a collapsed caret, clamped to the end of the content.
pub fn set_caret_at_offset(surface: &mut impl TextSurface, offset: usize) {
    let len = surface.plain_text().chars().count();
    surface.set_selection(Selection::cursor(offset.min(len)));
}

/// Markup before the selection start and after the selection end.
///
/// The selected text itself is dropped, as a forward delete followed by a split
/// would. Without a selection everything stays in `before`.
pub fn split_at_selection(surface: &impl TextSurface) -> (String, String) {
    let html = surface.markup();
    match surface.selection() {
        Some(sel) => markup::split_at(&html, sel.start, sel.end),
        None => (html, String::new()),
    }
}

/// Absolute offset of `column` on the last line of `text`, clamped to that line.
pub fn offset_on_last_line(text: &str, column: usize) -> usize {
    let chars: Vec<char> = text.chars().collect();
    let line_start = chars
        .iter()
        .rposition(|c| *c == '\n')
        .map(|i| i + 1)
        .unwrap_or(0);
    line_start + column.min(chars.len() - line_start)
}

/// Absolute offset of `column` on the first line of `text`, clamped to that line.
pub fn offset_on_first_line(text: &str, column: usize) -> usize {
    let first_line = text.chars().take_while(|c| *c != '\n').count();
    column.min(first_line)
}

/// In-memory surface: block markup plus a plain-text selection.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MarkupSurface {
    html: String,
    selection: Option<Selection>,
}

impl MarkupSurface {
    pub fn new(html: impl Into<String>) -> Self {
        Self {
            html: html.into(),
            selection: None,
        }
    }

    pub fn with_caret(html: impl Into<String>, offset: usize) -> Self {
        let mut surface = Self::new(html);
        set_caret_at_offset(&mut surface, offset);
        surface
    }

    pub fn with_selection(html: impl Into<String>, start: usize, end: usize) -> Self {
        let mut surface = Self::new(html);
        surface.set_selection(Selection::new(start, end));
        surface
    }

    pub fn clear_selection(&mut self) {
        self.selection = None;
    }

    /// Types `text` at the caret, replacing any selection.
    pub fn insert_text(&mut self, text: &str) {
        let sel = self.selection.unwrap_or_else(|| {
            Selection::cursor(markup::text_len(&self.html))
        });
        let (before, after) = markup::split_at(&self.html, sel.start, sel.end);
        self.html = format!("{before}{}{after}", markup::escape_text(text));
        self.selection = Some(Selection::cursor(sel.start + text.chars().count()));
    }
}

impl TextSurface for MarkupSurface {
    fn plain_text(&self) -> String {
        markup::plain_text(&self.html)
    }

    fn markup(&self) -> String {
        self.html.clone()
    }

    fn set_markup(&mut self, html: &str) {
        self.html = html.to_string();
        let len = markup::text_len(&self.html);
        self.selection = self.selection.map(|sel| sel.clamp(len));
    }

    fn selection(&self) -> Option<Selection> {
        self.selection
    }

    fn set_selection(&mut self, selection: Selection) {
        let len = markup::text_len(&self.html);
        self.selection = Some(selection.clamp(len));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_selection_uses_safe_defaults() {
        let surface = MarkupSurface::new("one\ntwo");
        assert_eq!(caret_offset(&surface), 0);
        assert!(is_on_first_line(&surface));
        assert!(is_on_last_line(&surface));
        assert!(!is_at_start(&surface));
        assert_eq!(
            split_at_selection(&surface),
            ("one\ntwo".to_string(), String::new())
        );
    }

    #[test]
    fn offset_ignores_inline_tags() {
        let surface = MarkupSurface::with_caret("<b>Hel</b>lo", 4);
        assert_eq!(caret_offset(&surface), 4);
        assert!(!is_at_start(&surface));
    }

    #[test]
    fn classifies_lines_by_explicit_breaks() {
        let surface = MarkupSurface::with_caret("first\nsecond\nthird", 8);
        assert!(!is_on_first_line(&surface));
        assert!(!is_on_last_line(&surface));
        assert_eq!(caret_column(&surface), 2);

        let top = MarkupSurface::with_caret("first\nsecond", 3);
        assert!(is_on_first_line(&top));
        assert!(!is_on_last_line(&top));

        let bottom = MarkupSurface::with_caret("first\nsecond", 6);
        assert!(!is_on_first_line(&bottom));
        assert!(is_on_last_line(&bottom));
        assert_eq!(caret_column(&bottom), 0);
    }

    #[test]
    fn at_start_requires_collapsed_selection() {
        assert!(is_at_start(&MarkupSurface::with_caret("abc", 0)));
        assert!(!is_at_start(&MarkupSurface::with_selection("abc", 0, 2)));
    }

    #[test]
    fn set_caret_clamps_to_content() {
        let mut surface = MarkupSurface::new("<i>abc</i>");
        set_caret_at_offset(&mut surface, 42);
        assert_eq!(surface.selection(), Some(Selection::cursor(3)));
    }

    #[test]
    fn split_uses_selection_bounds() {
        let surface = MarkupSurface::with_selection("Hello brave world", 6, 12);
        let (before, after) = split_at_selection(&surface);
        assert_eq!(before, "Hello ");
        assert_eq!(after, "world");
    }

    #[test]
    fn maps_columns_onto_neighbour_lines() {
        assert_eq!(offset_on_last_line("ab\ncdef", 2), 5);
        assert_eq!(offset_on_last_line("ab\ncd", 9), 5);
        assert_eq!(offset_on_last_line("", 3), 0);
        assert_eq!(offset_on_first_line("abcd\nef", 2), 2);
        assert_eq!(offset_on_first_line("ab\ncdef", 7), 2);
    }

    #[test]
    fn insert_text_escapes_and_moves_caret() {
        let mut surface = MarkupSurface::with_caret("ab", 1);
        surface.insert_text("<");
        assert_eq!(surface.markup(), "a&lt;b");
        assert_eq!(caret_offset(&surface), 2);
    }
}
