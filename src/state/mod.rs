//! Application state module

mod app_state;
mod forms;
mod pagination;

pub use app_state::*;
pub use forms::*;
pub use pagination::*;
