//! Platform-specific key bindings

use crossterm::event::KeyModifiers;

/// Modifier for form shortcuts
/// - macOS: SUPER (Cmd key), Ctrl also accepted
/// - Linux/Windows: CONTROL (Ctrl key)
#[cfg(target_os = "macos")]
pub const SUBMIT_MODIFIER: KeyModifiers = KeyModifiers::SUPER;

#[cfg(not(target_os = "macos"))]
pub const SUBMIT_MODIFIER: KeyModifiers = KeyModifiers::CONTROL;

/// Submit shortcut display for form help text
/// Ctrl+S works on all platforms
pub const SUBMIT_SHORTCUT: &str = "Ctrl+S";

/// Whether `modifiers` holds the submit modifier (or Ctrl, which always works)
pub fn is_submit_modifier(modifiers: KeyModifiers) -> bool {
    modifiers.contains(SUBMIT_MODIFIER) || modifiers.contains(KeyModifiers::CONTROL)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ctrl_always_submits() {
        assert!(is_submit_modifier(KeyModifiers::CONTROL));
        assert!(!is_submit_modifier(KeyModifiers::SHIFT));
        assert!(!is_submit_modifier(KeyModifiers::NONE));
    }
}
