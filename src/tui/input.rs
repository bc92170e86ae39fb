//! Input dispatch layer for Elm Architecture (TEA) pattern.
//!
//! Maps key events to messages based on current app mode. Text-entry modes
//! (compose, form) capture printable characters; list screens use vim-style
//! movement.

use super::{App, Message, ModalState, Screen};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Map key events to messages based on current app mode.
pub fn dispatch(app: &App, key: KeyEvent) -> Message {
    if matches!(app.modal, ModalState::Help) {
        return dispatch_help_modal(key);
    }
    if matches!(app.modal, ModalState::NewSession(_)) {
        return dispatch_form_modal(key);
    }
    if app.compose_mode {
        return dispatch_compose_mode(key);
    }
    dispatch_screen(app, key)
}

// ─────────────────────────────────────────────────────────────────────────────
// Mode-specific dispatch functions
// ─────────────────────────────────────────────────────────────────────────────

fn dispatch_screen(app: &App, key: KeyEvent) -> Message {
    // Keys shared by every screen
    match key.code {
        KeyCode::Char('q') => return Message::Quit,
        KeyCode::Char('?') => return Message::ToggleHelp,
        KeyCode::Char('r') => return Message::Refresh,
        KeyCode::Esc | KeyCode::Char('h') | KeyCode::Left => return Message::Back,
        KeyCode::Char('j') | KeyCode::Down => return Message::MoveDown,
        KeyCode::Char('k') | KeyCode::Up => return Message::MoveUp,
        KeyCode::Char('g') => return Message::GotoTop,
        KeyCode::Char('G') => return Message::GotoBottom,
        KeyCode::Enter | KeyCode::Char('l') | KeyCode::Right => return Message::Select,
        _ => {}
    }

    // Screen-specific keys
    match app.screen() {
        Screen::Sessions { .. } => match key.code {
            KeyCode::Char('n') => Message::OpenNewSession,
            _ => Message::None,
        },
        Screen::Session { .. } => match key.code {
            KeyCode::Char('i') | KeyCode::Char('m') => Message::EnterCompose,
            KeyCode::Char('w') => Message::ToggleWatch,
            KeyCode::Char('a') => Message::ApprovePlan,
            KeyCode::Char('d') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                Message::ScrollTimeline(10)
            }
            KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                Message::ScrollTimeline(-10)
            }
            _ => Message::None,
        },
        Screen::Sources => Message::None,
    }
}

fn dispatch_compose_mode(key: KeyEvent) -> Message {
    match key.code {
        KeyCode::Esc => Message::ExitCompose,
        KeyCode::Enter => Message::ComposeSubmit,
        KeyCode::Backspace => Message::ComposeBackspace,
        KeyCode::Char(c) => Message::ComposeInput(c),
        _ => Message::None,
    }
}

fn dispatch_form_modal(key: KeyEvent) -> Message {
    match key.code {
        KeyCode::Esc => Message::CloseModal,
        KeyCode::Tab => Message::FormNextField,
        KeyCode::Enter => Message::FormSubmit,
        KeyCode::Backspace => Message::FormBackspace,
        KeyCode::Char(c) => Message::FormInput(c),
        _ => Message::None,
    }
}

fn dispatch_help_modal(key: KeyEvent) -> Message {
    match key.code {
        KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('?') => Message::CloseModal,
        _ => Message::None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ctrl(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL)
    }

    #[test]
    fn test_compose_mode_captures_q() {
        // 'q' must type into the buffer, not quit the app
        assert_eq!(
            dispatch_compose_mode(key(KeyCode::Char('q'))),
            Message::ComposeInput('q')
        );
        assert_eq!(dispatch_compose_mode(key(KeyCode::Esc)), Message::ExitCompose);
        assert_eq!(
            dispatch_compose_mode(key(KeyCode::Enter)),
            Message::ComposeSubmit
        );
    }

    #[test]
    fn test_form_modal_tab_cycles_fields() {
        assert_eq!(dispatch_form_modal(key(KeyCode::Tab)), Message::FormNextField);
        assert_eq!(dispatch_form_modal(key(KeyCode::Enter)), Message::FormSubmit);
        assert_eq!(
            dispatch_form_modal(key(KeyCode::Char('x'))),
            Message::FormInput('x')
        );
    }

    #[test]
    fn test_help_modal_closes() {
        assert_eq!(dispatch_help_modal(key(KeyCode::Esc)), Message::CloseModal);
        assert_eq!(
            dispatch_help_modal(key(KeyCode::Char('?'))),
            Message::CloseModal
        );
        assert_eq!(dispatch_help_modal(key(KeyCode::Char('j'))), Message::None);
    }

    #[test]
    fn test_ctrl_keys_have_modifier() {
        let event = ctrl('d');
        assert!(event.modifiers.contains(KeyModifiers::CONTROL));
    }
}
