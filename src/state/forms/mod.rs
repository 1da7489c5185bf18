//! Form domain layer
//!
//! Field state, declarative rules, and the debounced validator that drives
//! the create/edit views.

mod field;
mod form_state;
mod rules;
mod validator;

pub use field::{FieldInput, FieldState, FieldValue};
pub use form_state::{
    AnnouncementForm, AttachmentCheck, Form, NewAnnouncement, TitleAvailability,
    ANNOUNCEMENT_FIELDS, ANNOUNCEMENT_SUBMIT_ROW,
};
pub use rules::{AsyncCheck, FieldRules, FormValues, RuleKind, ASYNC_CHECK_FAILED};
pub use validator::{FormValidator, SubmitOutcome, DEFAULT_DEBOUNCE};
