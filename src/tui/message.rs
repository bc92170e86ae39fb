//! Message enum for Elm Architecture (TEA) pattern.
//!
//! All possible user actions in the application are represented as messages.
//! This enables unidirectional data flow and testable update logic.

/// All possible user actions in the application.
///
/// Messages are dispatched from key events and processed by the
/// `App::update()` method.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    // ─────────────────────────────────────────────────────────────────────────
    // App lifecycle
    // ─────────────────────────────────────────────────────────────────────────
    /// Quit the application
    Quit,
    /// Refresh the current screen's data, bypassing the cache
    Refresh,
    /// Go back: close a modal, leave compose mode, or pop the screen stack
    Back,

    // ─────────────────────────────────────────────────────────────────────────
    // Navigation
    // ─────────────────────────────────────────────────────────────────────────
    /// Move selection up by one
    MoveUp,
    /// Move selection down by one
    MoveDown,
    /// Go to the first item
    GotoTop,
    /// Go to the last item
    GotoBottom,
    /// Open the selected item (source -> sessions, session -> timeline)
    Select,

    // ─────────────────────────────────────────────────────────────────────────
    // Session screen
    // ─────────────────────────────────────────────────────────────────────────
    /// Toggle background watching for the current session
    ToggleWatch,
    /// Approve the agent's generated plan
    ApprovePlan,
    /// Scroll the activity timeline (positive = toward newest)
    ScrollTimeline(i32),

    // ─────────────────────────────────────────────────────────────────────────
    // Chat compose
    // ─────────────────────────────────────────────────────────────────────────
    /// Enter compose mode
    EnterCompose,
    /// Leave compose mode without sending
    ExitCompose,
    /// Add a character to the compose buffer
    ComposeInput(char),
    /// Remove the last character from the compose buffer
    ComposeBackspace,
    /// Send the composed message to the agent
    ComposeSubmit,

    // ─────────────────────────────────────────────────────────────────────────
    // New session modal
    // ─────────────────────────────────────────────────────────────────────────
    /// Open the new-session form for the current source
    OpenNewSession,
    /// Move to the next form field
    FormNextField,
    /// Add a character to the focused form field
    FormInput(char),
    /// Remove the last character from the focused form field
    FormBackspace,
    /// Submit the form and create the session
    FormSubmit,

    // ─────────────────────────────────────────────────────────────────────────
    // Modal toggles
    // ─────────────────────────────────────────────────────────────────────────
    /// Toggle help modal
    ToggleHelp,
    /// Close current modal (generic close)
    CloseModal,

    // ─────────────────────────────────────────────────────────────────────────
    // No-op
    // ─────────────────────────────────────────────────────────────────────────
    /// No operation (for unhandled keys)
    None,
}
