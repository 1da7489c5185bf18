//! Form state management and form structs

use super::field::{FieldInput, FieldValue};
use super::rules::{AsyncCheck, FieldRules, FormValues, RuleKind};
use super::validator::FormValidator;
use crate::backend::BackendClientTrait;
use crate::files::{self, FileRules};
use crate::state::Audience;
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Trait for common form operations
pub trait Form {
    fn field_count(&self) -> usize;
    fn active_field(&self) -> usize;
    fn set_active_field(&mut self, index: usize);
    fn next_field(&mut self) {
        let count = self.field_count();
        let current = self.active_field();
        self.set_active_field((current + 1) % count);
    }
    fn prev_field(&mut self) {
        let count = self.field_count();
        let current = self.active_field();
        if current == 0 {
            self.set_active_field(count - 1);
        } else {
            self.set_active_field(current - 1);
        }
    }
}

/// Field names of the announcement form, in display order
pub const ANNOUNCEMENT_FIELDS: [&str; 5] = ["title", "content", "audience", "pinned", "attachment"];

/// Index of the submit button row
pub const ANNOUNCEMENT_SUBMIT_ROW: usize = ANNOUNCEMENT_FIELDS.len();

/// Rejects announcement titles already used on the backend
pub struct TitleAvailability<B> {
    backend: Mutex<B>,
}

impl<B> TitleAvailability<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend: Mutex::new(backend),
        }
    }
}

#[async_trait]
impl<B: BackendClientTrait + 'static> AsyncCheck for TitleAvailability<B> {
    async fn check(&self, value: &FieldValue) -> Result<Option<String>> {
        let mut backend = self.backend.lock().await;
        let exists = backend.announcement_title_exists(value.as_text().trim()).await?;
        Ok(exists.then(|| "Judul pengumuman sudah digunakan".to_string()))
    }
}

/// Validates the file an attachment path points to
pub struct AttachmentCheck {
    rules: FileRules,
}

impl AttachmentCheck {
    pub fn new(rules: FileRules) -> Self {
        Self { rules }
    }
}

#[async_trait]
impl AsyncCheck for AttachmentCheck {
    async fn check(&self, value: &FieldValue) -> Result<Option<String>> {
        match files::validate_path(value.as_text().trim(), &self.rules).await {
            Ok(_) => Ok(None),
            Err(e) => Ok(Some(e.to_string())),
        }
    }
}

/// Values of a successfully validated announcement form
#[derive(Debug, Clone, PartialEq)]
pub struct NewAnnouncement {
    pub title: String,
    pub content: String,
    pub audience: Audience,
    pub pinned: bool,
    pub attachment_path: Option<String>,
}

impl NewAnnouncement {
    pub fn from_values(values: &FormValues) -> Self {
        let text = |name: &str| {
            values
                .get(name)
                .map(|v| v.as_text().trim().to_string())
                .unwrap_or_default()
        };
        let attachment = text("attachment");
        Self {
            title: text("title"),
            content: text("content"),
            audience: Audience::parse(&text("audience")),
            pinned: values.get("pinned").is_some_and(FieldValue::as_bool),
            attachment_path: (!attachment.is_empty()).then_some(attachment),
        }
    }
}

/// Announcement create form
#[derive(Debug)]
pub struct AnnouncementForm {
    pub validator: FormValidator,
    pub active_field_index: usize,
}

impl AnnouncementForm {
    pub fn new(
        title_check: Arc<dyn AsyncCheck>,
        attachment_rules: FileRules,
        debounce: Duration,
    ) -> Self {
        let validator = FormValidator::new([
            ("title", FieldValue::from("")),
            ("content", FieldValue::from("")),
            ("audience", FieldValue::from(Audience::All.as_str())),
            ("pinned", FieldValue::Bool(false)),
            ("attachment", FieldValue::from("")),
        ])
        .debounce(debounce)
        .rule(
            "title",
            FieldRules::new("Judul")
                .required()
                .min_length(5)
                .max_length(100)
                .custom(title_check),
        )
        .rule(
            "content",
            FieldRules::new("Isi pengumuman")
                .required()
                .min_length(10)
                .max_length(2000)
                .message(RuleKind::Required, "Isi pengumuman tidak boleh kosong"),
        )
        .rule(
            "audience",
            FieldRules::new("Sasaran").required().validate(|value, _| {
                let audience = value.as_text();
                (Audience::parse(audience).as_str() != audience)
                    .then(|| "Sasaran pengumuman tidak dikenal".to_string())
            }),
        )
        .rule(
            "attachment",
            FieldRules::new("Lampiran").custom(Arc::new(AttachmentCheck::new(attachment_rules))),
        );

        Self {
            validator,
            active_field_index: 0,
        }
    }

    /// Name of the focused field, `None` on the submit row
    pub fn active_field_name(&self) -> Option<&'static str> {
        ANNOUNCEMENT_FIELDS.get(self.active_field_index).copied()
    }

    /// Returns true if the submit row is focused
    pub fn is_submit_row_active(&self) -> bool {
        self.active_field_index == ANNOUNCEMENT_SUBMIT_ROW
    }

    /// Whether the focused field takes multiline text
    pub fn is_active_field_multiline(&self) -> bool {
        self.active_field_name() == Some("content")
    }

    /// Move focus, validating the field being left
    pub fn focus_next(&mut self) {
        self.blur_active();
        self.next_field();
    }

    pub fn focus_prev(&mut self) {
        self.blur_active();
        self.prev_field();
    }

    fn blur_active(&mut self) {
        if let Some(name) = self.active_field_name() {
            self.validator.handle_blur(name);
        }
    }

    /// Type into the focused text field
    pub fn input_char(&mut self, c: char) {
        match self.active_field_name() {
            Some(name @ ("title" | "content" | "attachment")) => {
                self.validator.push_char(name, c);
            }
            Some("audience") | Some("pinned") if c == ' ' => self.toggle(),
            _ => {}
        }
    }

    pub fn backspace(&mut self) {
        if let Some(name @ ("title" | "content" | "attachment")) = self.active_field_name() {
            self.validator.pop_char(name);
        }
    }

    /// Cycle the audience selector or flip the pinned switch
    pub fn toggle(&mut self) {
        match self.active_field_name() {
            Some("audience") => {
                let current = self
                    .validator
                    .value("audience")
                    .map(|v| Audience::parse(v.as_text()))
                    .unwrap_or_default();
                self.validator.handle_change(
                    "audience",
                    FieldInput::Text(current.next().as_str().to_string()),
                );
            }
            Some("pinned") => {
                let pinned = self.validator.value("pinned").is_some_and(FieldValue::as_bool);
                self.validator
                    .handle_change("pinned", FieldInput::Checked(!pinned));
            }
            _ => {}
        }
    }
}

impl Form for AnnouncementForm {
    fn field_count(&self) -> usize {
        ANNOUNCEMENT_FIELDS.len() + 1 // fields + submit row
    }
    fn active_field(&self) -> usize {
        self.active_field_index
    }
    fn set_active_field(&mut self, index: usize) {
        self.active_field_index = index.min(ANNOUNCEMENT_SUBMIT_ROW);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MockBackendClientTrait;
    use crate::state::forms::rules::MockAsyncCheck;
    use crate::state::forms::SubmitOutcome;
    use pretty_assertions::assert_eq;

    fn free_title() -> Arc<dyn AsyncCheck> {
        let mut check = MockAsyncCheck::new();
        check.expect_check().returning(|_| Ok(None));
        Arc::new(check)
    }

    fn form() -> AnnouncementForm {
        AnnouncementForm::new(
            free_title(),
            files::document_rules(),
            Duration::from_millis(300),
        )
    }

    fn type_text(form: &mut AnnouncementForm, text: &str) {
        for c in text.chars() {
            form.input_char(c);
        }
    }

    #[test]
    fn test_next_field_cycles_through_submit_row() {
        let mut form = form();
        for _ in 0..ANNOUNCEMENT_FIELDS.len() {
            form.next_field();
        }
        assert!(form.is_submit_row_active());
        assert_eq!(form.active_field_name(), None);
        form.next_field();
        assert_eq!(form.active_field_index, 0);
    }

    #[test]
    fn test_prev_field_wraps_to_submit_row() {
        let mut form = form();
        form.prev_field();
        assert!(form.is_submit_row_active());
    }

    #[test]
    fn test_set_active_field_clamps() {
        let mut form = form();
        form.set_active_field(100);
        assert_eq!(form.active_field_index, ANNOUNCEMENT_SUBMIT_ROW);
    }

    #[test]
    fn test_toggle_audience_and_pinned() {
        let mut form = form();
        form.set_active_field(2);
        form.input_char(' ');
        assert_eq!(
            form.validator.value("audience"),
            Some(&FieldValue::from("teachers"))
        );

        form.set_active_field(3);
        form.toggle();
        assert_eq!(form.validator.value("pinned"), Some(&FieldValue::Bool(true)));
    }

    #[test]
    fn test_typing_ignored_on_toggle_fields() {
        let mut form = form();
        form.set_active_field(3);
        form.input_char('x');
        form.backspace();
        assert_eq!(form.validator.value("pinned"), Some(&FieldValue::Bool(false)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_leaving_field_validates_it() {
        let mut form = form();
        type_text(&mut form, "abc");
        form.focus_next();
        form.validator.settle().await;

        assert_eq!(form.validator.error("title"), "Judul minimal 5 karakter");
        assert_eq!(form.active_field_index, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_submit_produces_new_announcement() {
        let mut form = form();
        type_text(&mut form, "Rapat orang tua");
        form.set_active_field(1);
        type_text(&mut form, "Rapat diadakan hari Sabtu di aula.");
        form.set_active_field(3);
        form.toggle();

        let mut captured = None;
        let outcome = form
            .validator
            .handle_submit(|values| {
                captured = Some(NewAnnouncement::from_values(&values));
                async { Ok(()) }
            })
            .await;

        assert_eq!(outcome, SubmitOutcome::Submitted);
        assert_eq!(
            captured,
            Some(NewAnnouncement {
                title: "Rapat orang tua".to_string(),
                content: "Rapat diadakan hari Sabtu di aula.".to_string(),
                audience: Audience::All,
                pinned: true,
                attachment_path: None,
            })
        );
    }

    #[tokio::test]
    async fn test_missing_attachment_file_is_reported() {
        let mut form = form();
        form.set_active_field(4);
        type_text(&mut form, "/nonexistent/portal-guru/surat.pdf");
        form.focus_next();
        form.validator.settle().await;

        assert!(!form.validator.error("attachment").is_empty());
    }

    #[tokio::test]
    async fn test_title_availability_uses_backend() {
        let mut backend = MockBackendClientTrait::new();
        backend
            .expect_announcement_title_exists()
            .withf(|title| title == "Libur semester")
            .times(1)
            .returning(|_| Ok(true));
        let check = TitleAvailability::new(backend);

        let result = check.check(&FieldValue::from(" Libur semester ")).await.unwrap();
        assert_eq!(result, Some("Judul pengumuman sudah digunakan".to_string()));
    }
}
