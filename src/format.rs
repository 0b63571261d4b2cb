use crate::markup;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Swatch {
    pub label: &'static str,
    pub value: &'static str,
}

pub const PALETTE: [Swatch; 7] = [
    Swatch { label: "Red", value: "#ef4444" },
    Swatch { label: "Orange", value: "#f97316" },
    Swatch { label: "Yellow", value: "#eab308" },
    Swatch { label: "Green", value: "#22c55e" },
    Swatch { label: "Blue", value: "#3b82f6" },
    Swatch { label: "Purple", value: "#a855f7" },
    Swatch { label: "Gray", value: "#6b7280" },
];

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FormatCommand {
    Bold,
    Italic,
    Strikethrough,
    /// Wraps the selected plain text in `<code>`.
    Code,
    ForeColor(String),
    ClearFormatting,
}

impl FormatCommand {
    pub fn title(&self) -> &'static str {
        match self {
            FormatCommand::Bold => "Bold",
            FormatCommand::Italic => "Italic",
            FormatCommand::Strikethrough => "Strikethrough",
            FormatCommand::Code => "Code",
            FormatCommand::ForeColor(_) => "Color",
            FormatCommand::ClearFormatting => "Remove formatting",
        }
    }

    /// `document.execCommand` name and value for this command, given the selected text.
    pub fn exec_args(&self, selected_text: &str) -> (&'static str, Option<String>) {
        match self {
            FormatCommand::Bold => ("bold", None),
            FormatCommand::Italic => ("italic", None),
            FormatCommand::Strikethrough => ("strikeThrough", None),
            FormatCommand::Code => (
                "insertHTML",
                Some(format!("<code>{}</code>", markup::escape_text(selected_text))),
            ),
            FormatCommand::ForeColor(color) => ("foreColor", Some(color.clone())),
            FormatCommand::ClearFormatting => ("removeFormat", None),
        }
    }
}

/// Bounding box of a selection in viewport coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SelectionRect {
    pub top: f64,
    pub left: f64,
    pub width: f64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ToolbarPosition {
    pub top: f64,
    /// Horizontal centre; the toolbar translates itself by -50%.
    pub left: f64,
}

/// Document position for the toolbar, `None` for a degenerate selection.
pub fn toolbar_position(
    rect: SelectionRect,
    scroll_x: f64,
    scroll_y: f64,
    offset: f64,
) -> Option<ToolbarPosition> {
    if rect.width <= 0.0 {
        return None;
    }
    Some(ToolbarPosition {
        top: rect.top + scroll_y - offset,
        left: rect.left + scroll_x + rect.width / 2.0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_width_selection_keeps_toolbar_closed() {
        let rect = SelectionRect {
            top: 100.0,
            left: 40.0,
            width: 0.0,
        };
        assert_eq!(toolbar_position(rect, 0.0, 0.0, 48.0), None);
    }

    #[test]
    fn toolbar_sits_above_selection_centre() {
        let rect = SelectionRect {
            top: 100.0,
            left: 40.0,
            width: 60.0,
        };
        let pos = toolbar_position(rect, 5.0, 200.0, 48.0).unwrap();
        assert_eq!(pos.top, 252.0);
        assert_eq!(pos.left, 75.0);
    }

    #[test]
    fn code_command_escapes_selection() {
        let (name, value) = FormatCommand::Code.exec_args("a<b");
        assert_eq!(name, "insertHTML");
        assert_eq!(value.as_deref(), Some("<code>a&lt;b</code>"));
    }

    #[test]
    fn colour_command_carries_value() {
        let cmd = FormatCommand::ForeColor(PALETTE[4].value.to_string());
        assert_eq!(cmd.exec_args(""), ("foreColor", Some("#3b82f6".to_string())));
        assert_eq!(FormatCommand::ClearFormatting.exec_args("x").0, "removeFormat");
    }
}
