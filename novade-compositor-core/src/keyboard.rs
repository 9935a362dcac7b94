//! Keyboard layout description (XKB rule names).

use serde::{Deserialize, Serialize};

/// XKB rule names. An empty string selects the XKB default for that field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct KeyboardLayout {
    pub rules: String,
    pub model: String,
    pub layout: String,
    pub variant: String,
    pub options: String,
}

impl Default for KeyboardLayout {
    fn default() -> Self {
        Self {
            rules: String::new(),
            model: "pc104".to_string(),
            layout: "us".to_string(),
            variant: String::new(),
            options: String::new(),
        }
    }
}

impl KeyboardLayout {
    /// `None` for an empty (default) field.
    fn field(value: &str) -> Option<&str> {
        if value.is_empty() {
            None
        } else {
            Some(value)
        }
    }

    pub fn rules(&self) -> Option<&str> {
        Self::field(&self.rules)
    }

    pub fn model(&self) -> Option<&str> {
        Self::field(&self.model)
    }

    pub fn layout(&self) -> Option<&str> {
        Self::field(&self.layout)
    }

    pub fn variant(&self) -> Option<&str> {
        Self::field(&self.variant)
    }

    pub fn options(&self) -> Option<&str> {
        Self::field(&self.options)
    }
}
