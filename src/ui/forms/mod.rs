//! Form views

mod announcement_form;
mod field_renderer;

pub use announcement_form::draw_announcement_create;
