//! Form field value objects

use std::fmt;

/// Type-safe field values
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    /// Parsed number plus the text as typed, so partial input like "8." survives
    Number { value: Option<f64>, text: String },
    Bool(bool),
}

impl Default for FieldValue {
    fn default() -> Self {
        FieldValue::Text(String::new())
    }
}

impl FieldValue {
    pub fn number(value: Option<f64>) -> Self {
        FieldValue::Number {
            value,
            text: value.map(|n| n.to_string()).unwrap_or_default(),
        }
    }

    /// Whether the value counts as "not filled in"
    pub fn is_empty(&self) -> bool {
        match self {
            FieldValue::Text(s) => s.trim().is_empty(),
            FieldValue::Number { value, .. } => value.is_none(),
            FieldValue::Bool(b) => !b,
        }
    }

    /// Get the text value (returns empty string for non-text fields)
    pub fn as_text(&self) -> &str {
        match self {
            FieldValue::Text(s) => s,
            _ => "",
        }
    }

    /// Numeric reading of the value, parsing text when needed
    pub fn as_number(&self) -> Option<f64> {
        match self {
            FieldValue::Number { value, .. } => *value,
            FieldValue::Text(s) => s.trim().parse().ok(),
            FieldValue::Bool(_) => None,
        }
    }

    /// Push a typed character
    pub fn push_char(&mut self, c: char) {
        match self {
            FieldValue::Text(s) => s.push(c),
            FieldValue::Number { value, text } => {
                let accepted = c.is_ascii_digit()
                    || (c == '.' && !text.contains('.'))
                    || (c == '-' && text.is_empty());
                if accepted {
                    text.push(c);
                    *value = text.parse().ok();
                }
            }
            FieldValue::Bool(_) => {}
        }
    }

    /// Remove the last character from a text value
    pub fn pop_char(&mut self) {
        match self {
            FieldValue::Text(s) => {
                s.pop();
            }
            FieldValue::Number { value, text } => {
                text.pop();
                *value = text.parse().ok();
            }
            FieldValue::Bool(_) => {}
        }
    }

    pub fn as_bool(&self) -> bool {
        matches!(self, FieldValue::Bool(true))
    }

    /// Character count used by length rules
    pub fn char_len(&self) -> usize {
        match self {
            FieldValue::Text(s) => s.chars().count(),
            other => other.to_string().chars().count(),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Text(s) => f.write_str(s),
            FieldValue::Number { text, .. } => f.write_str(text),
            FieldValue::Bool(b) => write!(f, "{b}"),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Text(s)
    }
}

impl From<f64> for FieldValue {
    fn from(n: f64) -> Self {
        FieldValue::number(Some(n))
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Bool(b)
    }
}

/// Raw input event for a field, as produced by an input widget
#[derive(Debug, Clone, PartialEq)]
pub enum FieldInput {
    /// Free text entry
    Text(String),
    /// Numeric entry; empty or unparsable text clears the value
    Number(String),
    /// Checkbox / switch toggle
    Checked(bool),
}

impl FieldInput {
    /// Normalize the raw input into a stored value
    pub fn into_value(self) -> FieldValue {
        match self {
            FieldInput::Text(s) => FieldValue::Text(s),
            FieldInput::Number(s) => {
                let text = s.trim().to_string();
                FieldValue::Number {
                    value: text.parse().ok(),
                    text,
                }
            }
            FieldInput::Checked(b) => FieldValue::Bool(b),
        }
    }
}

/// Tracked state of a single field
#[derive(Debug, Clone, PartialEq)]
pub struct FieldState {
    pub name: String,
    pub value: FieldValue,
    pub error: String,
    pub touched: bool,
    pub validating: bool,
    pub is_valid: bool,
}

impl FieldState {
    pub fn new(name: &str, value: FieldValue) -> Self {
        Self {
            name: name.to_string(),
            value,
            error: String::new(),
            touched: false,
            validating: false,
            is_valid: true,
        }
    }

    /// Record a validation result, keeping `is_valid` in step with `error`
    pub fn set_error(&mut self, error: String) {
        self.is_valid = error.is_empty();
        self.error = error;
    }
}
