//! Unsaved-change detection for the raw configuration editor.

use serde_json::{Map, Value};

/// Canonical text of a document: object keys sorted, no insignificant whitespace.
pub fn canonical_text(value: &Value) -> String {
    canonicalize(value).to_string()
}

fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let mut sorted = Map::with_capacity(map.len());
            for key in keys {
                sorted.insert(key.clone(), canonicalize(&map[key.as_str()]));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        scalar => scalar.clone(),
    }
}

/// Whether two documents differ once canonicalized.
pub fn differs(original: &Value, current: &Value) -> bool {
    canonical_text(original) != canonical_text(current)
}

/// Whether the edit buffer `current` differs from the saved `original`.
///
/// Text that does not parse can never equal a valid document, so it is dirty.
pub fn dirty(original: &Value, current: &str) -> bool {
    match serde_json::from_str::<Value>(current) {
        Ok(parsed) => differs(original, &parsed),
        Err(_) => true,
    }
}

/// Text shown in the raw editor for a document.
pub fn editor_text(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

/// Raw-JSON edit buffer and the baseline it was last saved as.
#[derive(Debug, Clone)]
pub struct ConfigEditor {
    baseline: Value,
    text: String,
}

impl Default for ConfigEditor {
    fn default() -> Self {
        Self::new(Value::Null)
    }
}

impl ConfigEditor {
    pub fn new(baseline: Value) -> Self {
        let text = editor_text(&baseline);
        Self { baseline, text }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn set_text(&mut self, text: String) {
        self.text = text;
    }

    pub fn is_dirty(&self) -> bool {
        dirty(&self.baseline, &self.text)
    }

    /// Drop unsaved edits.
    pub fn revert(&mut self) {
        self.text = editor_text(&self.baseline);
    }

    /// The buffer was persisted as `saved`.
    pub fn mark_saved(&mut self, saved: Value) {
        self.baseline = saved;
    }

    /// Take a reloaded document as the new baseline, keeping unsaved edits.
    pub fn rebase(&mut self, reloaded: &Value) {
        let keep_edits = self.is_dirty();
        self.baseline = reloaded.clone();
        if !keep_edits {
            self.text = editor_text(reloaded);
        }
    }
}
