use serde::{Deserialize, Serialize};

use crate::error::{EditorError, Result};

pub const SETTINGS_KEY: &str = "blockpad-settings";

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct EditorSettings {
    pub slash_trigger: char,
    pub first_block_placeholder: String,
    pub focused_placeholder: String,
    /// Distance in pixels between the formatting toolbar and the selection.
    pub toolbar_offset: f64,
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            slash_trigger: '/',
            first_block_placeholder: "Start writing or type '/' for commands…".to_string(),
            focused_placeholder: "Type '/' for commands…".to_string(),
            toolbar_offset: 48.0,
        }
    }
}

impl EditorSettings {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(EditorError::Settings)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(EditorError::Settings)
    }

    /// Reads settings saved in `localStorage`, falling back to defaults.
    pub fn load() -> Self {
        let stored = web_sys::window()
            .and_then(|w| w.local_storage().ok().flatten())
            .and_then(|storage| storage.get_item(SETTINGS_KEY).ok().flatten());
        let Some(json) = stored else {
            return Self::default();
        };
        match Self::from_json(&json) {
            Ok(settings) => settings,
            Err(err) => {
                leptos::logging::warn!("ignoring stored settings: {err}");
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let settings = EditorSettings::from_json(r#"{"slash_trigger":"!"}"#).unwrap();
        assert_eq!(settings.slash_trigger, '!');
        assert_eq!(settings.toolbar_offset, 48.0);
        assert_eq!(
            settings.focused_placeholder,
            EditorSettings::default().focused_placeholder
        );
    }

    #[test]
    fn malformed_settings_are_an_error() {
        assert!(matches!(
            EditorSettings::from_json("{not json"),
            Err(EditorError::Settings(_))
        ));
    }

    #[test]
    fn round_trips_through_json() {
        let settings = EditorSettings {
            toolbar_offset: 32.0,
            ..EditorSettings::default()
        };
        let json = settings.to_json().unwrap();
        assert_eq!(EditorSettings::from_json(&json).unwrap(), settings);
    }
}
