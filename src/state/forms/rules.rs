//! Declarative validation rules
//!
//! Synchronous rules are evaluated in a fixed order and stop at the first
//! failure: required, min length, max length, pattern, min, max, then the
//! predicate. The asynchronous check only runs once all of them pass.

use super::field::FieldValue;
use anyhow::Result;
use async_trait::async_trait;
use regex::Regex;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Message recorded when an async check itself fails
pub const ASYNC_CHECK_FAILED: &str = "Validation error";

/// Current values of every field, used by cross-field predicates
pub type FormValues = HashMap<String, FieldValue>;

/// Synchronous predicate: `Some(message)` on failure
pub type Predicate = Arc<dyn Fn(&FieldValue, &FormValues) -> Option<String> + Send + Sync>;

/// Asynchronous check, e.g. a uniqueness lookup against the backend
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AsyncCheck: Send + Sync {
    /// `Ok(Some(message))` when the value is rejected
    async fn check(&self, value: &FieldValue) -> Result<Option<String>>;
}

/// Rule kinds, used to override default messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleKind {
    Required,
    MinLength,
    MaxLength,
    Pattern,
    Min,
    Max,
}

/// Rules attached to one field. Immutable once handed to a validator.
#[derive(Clone, Default)]
pub struct FieldRules {
    label: String,
    required: bool,
    min_length: Option<usize>,
    max_length: Option<usize>,
    pattern: Option<Regex>,
    min: Option<f64>,
    max: Option<f64>,
    validate: Option<Predicate>,
    custom: Option<Arc<dyn AsyncCheck>>,
    messages: HashMap<RuleKind, String>,
}

impl fmt::Debug for FieldRules {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldRules")
            .field("label", &self.label)
            .field("required", &self.required)
            .field("min_length", &self.min_length)
            .field("max_length", &self.max_length)
            .field("pattern", &self.pattern.as_ref().map(Regex::as_str))
            .field("min", &self.min)
            .field("max", &self.max)
            .field("has_validate", &self.validate.is_some())
            .field("has_custom", &self.custom.is_some())
            .finish()
    }
}

impl FieldRules {
    /// Rules for a field shown to the user as `label`
    pub fn new(label: &str) -> Self {
        Self {
            label: label.to_string(),
            ..Default::default()
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn min_length(mut self, len: usize) -> Self {
        self.min_length = Some(len);
        self
    }

    pub fn max_length(mut self, len: usize) -> Self {
        self.max_length = Some(len);
        self
    }

    pub fn pattern(mut self, pattern: Regex) -> Self {
        self.pattern = Some(pattern);
        self
    }

    pub fn min(mut self, min: f64) -> Self {
        self.min = Some(min);
        self
    }

    pub fn max(mut self, max: f64) -> Self {
        self.max = Some(max);
        self
    }

    pub fn validate<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&FieldValue, &FormValues) -> Option<String> + Send + Sync + 'static,
    {
        self.validate = Some(Arc::new(predicate));
        self
    }

    pub fn custom(mut self, check: Arc<dyn AsyncCheck>) -> Self {
        self.custom = Some(check);
        self
    }

    /// Replace the default message of one rule
    pub fn message(mut self, kind: RuleKind, message: &str) -> Self {
        self.messages.insert(kind, message.to_string());
        self
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn async_check(&self) -> Option<Arc<dyn AsyncCheck>> {
        self.custom.clone()
    }

    fn message_for(&self, kind: RuleKind) -> String {
        if let Some(message) = self.messages.get(&kind) {
            return message.clone();
        }
        match kind {
            RuleKind::Required => format!("{} wajib diisi", self.label),
            RuleKind::MinLength => format!(
                "{} minimal {} karakter",
                self.label,
                self.min_length.unwrap_or_default()
            ),
            RuleKind::MaxLength => format!(
                "{} maksimal {} karakter",
                self.label,
                self.max_length.unwrap_or_default()
            ),
            RuleKind::Pattern => format!("Format {} tidak valid", self.label),
            RuleKind::Min => format!(
                "{} minimal {}",
                self.label,
                self.min.map(format_bound).unwrap_or_default()
            ),
            RuleKind::Max => format!(
                "{} maksimal {}",
                self.label,
                self.max.map(format_bound).unwrap_or_default()
            ),
        }
    }

    /// Evaluate the synchronous rules. Returns the first failing rule's
    /// message, or an empty string when the value passes.
    pub fn validate_sync(&self, value: &FieldValue, values: &FormValues) -> String {
        if value.is_empty() {
            return if self.required {
                self.message_for(RuleKind::Required)
            } else {
                String::new()
            };
        }

        if let Some(min_length) = self.min_length {
            if value.char_len() < min_length {
                return self.message_for(RuleKind::MinLength);
            }
        }

        if let Some(max_length) = self.max_length {
            if value.char_len() > max_length {
                return self.message_for(RuleKind::MaxLength);
            }
        }

        if let Some(pattern) = &self.pattern {
            if !pattern.is_match(&value.to_string()) {
                return self.message_for(RuleKind::Pattern);
            }
        }

        if let Some(min) = self.min {
            if value.as_number().is_some_and(|n| n < min) {
                return self.message_for(RuleKind::Min);
            }
        }

        if let Some(max) = self.max {
            if value.as_number().is_some_and(|n| n > max) {
                return self.message_for(RuleKind::Max);
            }
        }

        if let Some(predicate) = &self.validate {
            if let Some(message) = predicate(value, values) {
                return message;
            }
        }

        String::new()
    }

    /// Full validation: synchronous rules, then the async check if they pass.
    /// Failures of the async check itself become [`ASYNC_CHECK_FAILED`].
    pub async fn validate_full(&self, value: &FieldValue, values: &FormValues) -> String {
        let error = self.validate_sync(value, values);
        if !error.is_empty() || value.is_empty() {
            return error;
        }
        match &self.custom {
            Some(check) => run_async_check(check.as_ref(), value).await,
            None => String::new(),
        }
    }
}

/// Run an async check, folding its failure into a field message
pub async fn run_async_check(check: &dyn AsyncCheck, value: &FieldValue) -> String {
    match check.check(value).await {
        Ok(Some(message)) => message,
        Ok(None) => String::new(),
        Err(e) => {
            tracing::warn!("Async validation failed: {e:#}");
            ASYNC_CHECK_FAILED.to_string()
        }
    }
}

fn format_bound(n: f64) -> String {
    if n.fract() == 0.0 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}
