//! Reusable UI components

mod button;
mod dialog;

pub use button::{
    render_button_with_spinner, render_sidebar_button, spinner_frame, ButtonState, BUTTON_HEIGHT,
};
pub use dialog::render_error_dialog;
