//! Debounced, rule-based form validation
//!
//! Each field's validation runs as a spawned task that reports back over a
//! channel. Every schedule bumps a per-field generation and aborts the task
//! it supersedes, so only the latest validation of a field is applied.

use super::field::{FieldInput, FieldState, FieldValue};
use super::rules::{run_async_check, FieldRules, FormValues, ASYNC_CHECK_FAILED};
use crate::retry::user_friendly_error;
use anyhow::Result;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};

/// Default quiet period before on-change validation runs
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

/// Messages from validation tasks back to the form
#[derive(Debug)]
enum ValidationEvent {
    /// The async check of a field started
    Started { field: String, generation: u64 },
    /// Validation of a field completed with `error` ("" when valid)
    Finished {
        field: String,
        generation: u64,
        error: String,
    },
}

/// Result of [`FormValidator::handle_submit`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// At least one field failed validation; the handler was not called
    Invalid,
    /// The handler ran and succeeded
    Submitted,
    /// The handler returned an error, reported as this message
    Failed(String),
}

/// Form validator owning per-field state
pub struct FormValidator {
    fields: Vec<FieldState>,
    initial: Vec<(String, FieldValue)>,
    rules: HashMap<String, Arc<FieldRules>>,
    debounce: Duration,
    generations: HashMap<String, u64>,
    pending: HashMap<String, JoinHandle<()>>,
    events_tx: mpsc::UnboundedSender<ValidationEvent>,
    events_rx: mpsc::UnboundedReceiver<ValidationEvent>,
    is_submitting: bool,
    submit_error: Option<String>,
}

impl std::fmt::Debug for FormValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormValidator")
            .field("fields", &self.fields)
            .field("debounce", &self.debounce)
            .field("pending", &self.pending.keys().collect::<Vec<_>>())
            .field("is_submitting", &self.is_submitting)
            .field("submit_error", &self.submit_error)
            .finish()
    }
}

impl FormValidator {
    /// Create a form from its initial values, in display order
    pub fn new<I, S>(initial: I) -> Self
    where
        I: IntoIterator<Item = (S, FieldValue)>,
        S: Into<String>,
    {
        let initial: Vec<(String, FieldValue)> =
            initial.into_iter().map(|(n, v)| (n.into(), v)).collect();
        let fields = initial
            .iter()
            .map(|(name, value)| FieldState::new(name, value.clone()))
            .collect();
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        Self {
            fields,
            initial,
            rules: HashMap::new(),
            debounce: DEFAULT_DEBOUNCE,
            generations: HashMap::new(),
            pending: HashMap::new(),
            events_tx,
            events_rx,
            is_submitting: false,
            submit_error: None,
        }
    }

    /// Attach rules to a field
    pub fn rule(mut self, name: &str, rules: FieldRules) -> Self {
        self.rules.insert(name.to_string(), Arc::new(rules));
        self
    }

    /// Override the on-change debounce period
    pub fn debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    pub fn fields(&self) -> &[FieldState] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldState> {
        self.fields.iter().find(|f| f.name == name)
    }

    fn field_mut(&mut self, name: &str) -> Option<&mut FieldState> {
        self.fields.iter_mut().find(|f| f.name == name)
    }

    pub fn rules_for(&self, name: &str) -> Option<&FieldRules> {
        self.rules.get(name).map(Arc::as_ref)
    }

    pub fn value(&self, name: &str) -> Option<&FieldValue> {
        self.field(name).map(|f| &f.value)
    }

    /// Error message of a field ("" when valid or unknown)
    pub fn error(&self, name: &str) -> &str {
        self.field(name).map(|f| f.error.as_str()).unwrap_or("")
    }

    /// Snapshot of every field's value
    pub fn values(&self) -> FormValues {
        self.fields
            .iter()
            .map(|f| (f.name.clone(), f.value.clone()))
            .collect()
    }

    pub fn is_valid(&self) -> bool {
        self.fields.iter().all(|f| f.is_valid)
    }

    pub fn is_validating(&self) -> bool {
        self.fields.iter().any(|f| f.validating)
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn is_submitting(&self) -> bool {
        self.is_submitting
    }

    pub fn submit_error(&self) -> Option<&str> {
        self.submit_error.as_deref()
    }

    /// Set a field's value. Touched fields are revalidated after the
    /// debounce period; a newer change restarts the wait.
    pub fn set_field_value(&mut self, name: &str, value: FieldValue) {
        let Some(field) = self.field_mut(name) else {
            tracing::warn!("Ignoring value for unknown field {name}");
            return;
        };
        field.value = value;
        if field.touched {
            self.schedule(name, self.debounce);
        }
    }

    /// Apply a raw input event to a field
    pub fn handle_change(&mut self, name: &str, input: FieldInput) {
        self.set_field_value(name, input.into_value());
    }

    /// Type a character into a field
    pub fn push_char(&mut self, name: &str, c: char) {
        if let Some(mut value) = self.value(name).cloned() {
            value.push_char(c);
            self.set_field_value(name, value);
        }
    }

    /// Delete the last character of a field
    pub fn pop_char(&mut self, name: &str) {
        if let Some(mut value) = self.value(name).cloned() {
            value.pop_char();
            self.set_field_value(name, value);
        }
    }

    /// Mark a field touched and validate it without waiting
    pub fn handle_blur(&mut self, name: &str) {
        let Some(field) = self.field_mut(name) else {
            return;
        };
        field.touched = true;
        self.schedule(name, Duration::ZERO);
    }

    /// Spawn a validation of `name` after `delay`, superseding any pending one
    fn schedule(&mut self, name: &str, delay: Duration) {
        let generation = self.bump_generation(name);
        if let Some(handle) = self.pending.remove(name) {
            handle.abort();
        }

        let Some(rules) = self.rules.get(name).cloned() else {
            if let Some(field) = self.field_mut(name) {
                field.set_error(String::new());
            }
            return;
        };
        let Some(value) = self.value(name).cloned() else {
            return;
        };
        let values = self.values();
        let tx = self.events_tx.clone();
        let field = name.to_string();

        let handle = tokio::spawn(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            let mut error = rules.validate_sync(&value, &values);
            if error.is_empty() && !value.is_empty() {
                if let Some(check) = rules.async_check() {
                    let _ = tx.send(ValidationEvent::Started {
                        field: field.clone(),
                        generation,
                    });
                    error = run_async_check(check.as_ref(), &value).await;
                }
            }
            let _ = tx.send(ValidationEvent::Finished {
                field,
                generation,
                error,
            });
        });
        self.pending.insert(name.to_string(), handle);
    }

    fn bump_generation(&mut self, name: &str) -> u64 {
        let generation = self.generations.entry(name.to_string()).or_insert(0);
        *generation += 1;
        *generation
    }

    fn is_current(&self, name: &str, generation: u64) -> bool {
        self.generations.get(name).copied() == Some(generation)
    }

    fn apply(&mut self, event: ValidationEvent) {
        match event {
            ValidationEvent::Started { field, generation } => {
                if self.is_current(&field, generation) {
                    if let Some(state) = self.field_mut(&field) {
                        state.validating = true;
                    }
                }
            }
            ValidationEvent::Finished {
                field,
                generation,
                error,
            } => {
                if !self.is_current(&field, generation) {
                    return;
                }
                self.pending.remove(&field);
                if let Some(state) = self.field_mut(&field) {
                    state.validating = false;
                    state.set_error(error);
                }
            }
        }
    }

    /// Apply results of validations that finished since the last call.
    /// Returns true when any field state changed.
    pub fn poll(&mut self) -> bool {
        let mut changed = false;
        while let Ok(event) = self.events_rx.try_recv() {
            self.apply(event);
            changed = true;
        }
        changed
    }

    /// Wait for every scheduled validation to finish and apply the results
    pub async fn settle(&mut self) {
        while !self.pending.is_empty() {
            match self.events_rx.recv().await {
                Some(event) => self.apply(event),
                None => break,
            }
        }
    }

    fn cancel_pending(&mut self) {
        for (name, handle) in self.pending.drain() {
            handle.abort();
            if let Some(generation) = self.generations.get_mut(&name) {
                *generation += 1;
            }
        }
        while self.events_rx.try_recv().is_ok() {}
        for field in &mut self.fields {
            field.validating = false;
        }
    }

    /// Validate every field concurrently. Pending debounced validations are
    /// cancelled first. Returns true when the whole form is valid.
    pub async fn validate_all(&mut self) -> bool {
        self.cancel_pending();
        let values = self.values();
        let mut tasks = JoinSet::new();

        for index in 0..self.fields.len() {
            let name = self.fields[index].name.clone();
            let generation = self.bump_generation(&name);
            let field = &mut self.fields[index];
            field.touched = true;

            let Some(rules) = self.rules.get(&name).cloned() else {
                field.set_error(String::new());
                continue;
            };
            field.validating = rules.async_check().is_some();
            let value = field.value.clone();
            let values = values.clone();
            tasks.spawn(async move {
                let error = rules.validate_full(&value, &values).await;
                (name, generation, error)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((field, generation, error)) => self.apply(ValidationEvent::Finished {
                    field,
                    generation,
                    error,
                }),
                Err(e) => tracing::error!("Field validation task failed: {e}"),
            }
        }

        // A task that died never reported; treat its field as failed
        for field in &mut self.fields {
            if field.validating {
                field.validating = false;
                field.set_error(ASYNC_CHECK_FAILED.to_string());
            }
        }

        self.is_valid()
    }

    /// Validate the whole form and, if valid, hand its values to
    /// `on_submit`. Handler errors are logged and stored as a user-facing
    /// message instead of being returned.
    pub async fn handle_submit<F, Fut>(&mut self, on_submit: F) -> SubmitOutcome
    where
        F: FnOnce(FormValues) -> Fut,
        Fut: Future<Output = Result<()>>,
    {
        self.is_submitting = true;
        self.submit_error = None;

        let outcome = if !self.validate_all().await {
            SubmitOutcome::Invalid
        } else {
            match on_submit(self.values()).await {
                Ok(()) => SubmitOutcome::Submitted,
                Err(e) => {
                    tracing::error!("Form submission failed: {e:#}");
                    let message = user_friendly_error(&e);
                    self.submit_error = Some(message.clone());
                    SubmitOutcome::Failed(message)
                }
            }
        };

        self.is_submitting = false;
        outcome
    }

    /// Restore initial values and clear all validation state
    pub fn reset(&mut self) {
        self.cancel_pending();
        self.fields = self
            .initial
            .iter()
            .map(|(name, value)| FieldState::new(name, value.clone()))
            .collect();
        self.is_submitting = false;
        self.submit_error = None;
    }
}

impl Drop for FormValidator {
    fn drop(&mut self) {
        for handle in self.pending.values() {
            handle.abort();
        }
    }
}
