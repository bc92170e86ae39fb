//! Screen-stack and update-loop behavior, exercised without a terminal.

use julet::api::JulesClient;
use julet::config::Config;
use julet::data::{Session, SessionState, Source, SourceContext};
use julet::store::cache::ResultCache;
use julet::store::watchlist::Watchlist;
use julet::tui::{App, FormField, Message, ModalState, Screen};
use std::sync::Arc;
use tempfile::TempDir;

fn make_source(id: &str) -> Source {
    Source {
        name: format!("sources/github/acme/{}", id),
        id: id.to_string(),
        github_repo: None,
    }
}

fn make_session(id: &str, title: &str, source: &Source) -> Session {
    Session {
        name: format!("sessions/{}", id),
        id: id.to_string(),
        title: title.to_string(),
        prompt: None,
        source_context: Some(SourceContext {
            source: source.name.clone(),
            github_repo_context: None,
        }),
        create_time: None,
        update_time: None,
        state: SessionState::InProgress,
    }
}

/// App against a dead endpoint; background fetches fail harmlessly.
fn make_app(dir: &TempDir) -> App {
    let client = JulesClient::new("http://127.0.0.1:9", "test-key");
    let cache = ResultCache::with_dir(dir.path().join("cache"), true);
    let watchlist = Arc::new(Watchlist::open(dir.path().join("watchlist.json")).unwrap());
    App::new(Config::default(), client, cache, watchlist, None)
}

#[tokio::test]
async fn starts_on_sources_screen() {
    let dir = TempDir::new().unwrap();
    let app = make_app(&dir);
    assert_eq!(*app.screen(), Screen::Sources);
}

#[tokio::test]
async fn select_source_opens_its_sessions() {
    let dir = TempDir::new().unwrap();
    let mut app = make_app(&dir);
    app.sources = vec![make_source("boba-app"), make_source("dotfiles")];
    app.selected_source = 1;

    app.update(Message::Select).await.unwrap();

    match app.screen() {
        Screen::Sessions { source } => assert_eq!(source.id, "dotfiles"),
        other => panic!("expected sessions screen, got {:?}", other),
    }
}

#[tokio::test]
async fn select_on_empty_source_list_is_a_noop() {
    let dir = TempDir::new().unwrap();
    let mut app = make_app(&dir);

    app.update(Message::Select).await.unwrap();
    assert_eq!(*app.screen(), Screen::Sources);
}

#[tokio::test]
async fn opening_a_session_starts_watching_it() {
    let dir = TempDir::new().unwrap();
    let mut app = make_app(&dir);
    let source = make_source("boba-app");
    app.sources = vec![source.clone()];

    app.update(Message::Select).await.unwrap();
    app.sessions = vec![make_session("31337", "Fix the build", &source)];

    app.update(Message::Select).await.unwrap();

    assert!(matches!(app.screen(), Screen::Session { .. }));
    assert!(app.watching);
    assert!(app.watchlist.contains("31337").await);
}

#[tokio::test]
async fn toggle_watch_removes_and_re_adds() {
    let dir = TempDir::new().unwrap();
    let mut app = make_app(&dir);
    let source = make_source("boba-app");
    app.sources = vec![source.clone()];
    app.update(Message::Select).await.unwrap();
    app.sessions = vec![make_session("31337", "Fix the build", &source)];
    app.update(Message::Select).await.unwrap();

    app.update(Message::ToggleWatch).await.unwrap();
    assert!(!app.watching);
    assert!(!app.watchlist.contains("31337").await);

    app.update(Message::ToggleWatch).await.unwrap();
    assert!(app.watching);
    assert!(app.watchlist.contains("31337").await);
}

#[tokio::test]
async fn back_pops_the_screen_stack() {
    let dir = TempDir::new().unwrap();
    let mut app = make_app(&dir);
    app.sources = vec![make_source("boba-app")];

    app.update(Message::Select).await.unwrap();
    assert!(matches!(app.screen(), Screen::Sessions { .. }));

    app.update(Message::Back).await.unwrap();
    assert_eq!(*app.screen(), Screen::Sources);

    // Back on the root screen stays put.
    app.update(Message::Back).await.unwrap();
    assert_eq!(*app.screen(), Screen::Sources);
}

#[tokio::test]
async fn back_closes_modal_before_popping() {
    let dir = TempDir::new().unwrap();
    let mut app = make_app(&dir);
    app.sources = vec![make_source("boba-app")];
    app.update(Message::Select).await.unwrap();

    app.update(Message::OpenNewSession).await.unwrap();
    assert!(matches!(app.modal, ModalState::NewSession(_)));

    app.update(Message::Back).await.unwrap();
    assert!(app.modal.is_none());
    assert!(matches!(app.screen(), Screen::Sessions { .. }));
}

#[tokio::test]
async fn new_session_modal_only_opens_on_sessions_screen() {
    let dir = TempDir::new().unwrap();
    let mut app = make_app(&dir);

    app.update(Message::OpenNewSession).await.unwrap();
    assert!(app.modal.is_none());
}

#[tokio::test]
async fn form_fields_cycle_and_capture_input() {
    let dir = TempDir::new().unwrap();
    let mut app = make_app(&dir);
    app.sources = vec![make_source("boba-app")];
    app.update(Message::Select).await.unwrap();
    app.update(Message::OpenNewSession).await.unwrap();

    for c in "fix it".chars() {
        app.update(Message::FormInput(c)).await.unwrap();
    }
    app.update(Message::FormNextField).await.unwrap();
    for c in "Build fix".chars() {
        app.update(Message::FormInput(c)).await.unwrap();
    }

    match &app.modal {
        ModalState::NewSession(form) => {
            assert_eq!(form.prompt, "fix it");
            assert_eq!(form.title, "Build fix");
            assert_eq!(form.field, FormField::Title);
        }
        other => panic!("expected form modal, got {:?}", other),
    }
}

#[tokio::test]
async fn form_submit_without_prompt_is_rejected() {
    let dir = TempDir::new().unwrap();
    let mut app = make_app(&dir);
    app.sources = vec![make_source("boba-app")];
    app.update(Message::Select).await.unwrap();
    app.update(Message::OpenNewSession).await.unwrap();

    app.update(Message::FormSubmit).await.unwrap();

    assert!(matches!(app.modal, ModalState::NewSession(_)));
    assert!(app.error_message.is_some());
}

#[tokio::test]
async fn compose_buffer_follows_input() {
    let dir = TempDir::new().unwrap();
    let mut app = make_app(&dir);
    let source = make_source("boba-app");
    app.sources = vec![source.clone()];
    app.update(Message::Select).await.unwrap();
    app.sessions = vec![make_session("31337", "Fix the build", &source)];
    app.update(Message::Select).await.unwrap();

    app.update(Message::EnterCompose).await.unwrap();
    assert!(app.compose_mode);

    for c in "hello".chars() {
        app.update(Message::ComposeInput(c)).await.unwrap();
    }
    app.update(Message::ComposeBackspace).await.unwrap();
    assert_eq!(app.compose_buffer, "hell");

    app.update(Message::ExitCompose).await.unwrap();
    assert!(!app.compose_mode);
    assert!(app.compose_buffer.is_empty());
}

#[tokio::test]
async fn compose_only_enters_on_session_screen() {
    let dir = TempDir::new().unwrap();
    let mut app = make_app(&dir);

    app.update(Message::EnterCompose).await.unwrap();
    assert!(!app.compose_mode);
}

#[tokio::test]
async fn selection_clamps_to_list_bounds() {
    let dir = TempDir::new().unwrap();
    let mut app = make_app(&dir);
    app.sources = vec![make_source("a"), make_source("b")];

    app.update(Message::MoveUp).await.unwrap();
    assert_eq!(app.selected_source, 0);

    app.update(Message::MoveDown).await.unwrap();
    app.update(Message::MoveDown).await.unwrap();
    app.update(Message::MoveDown).await.unwrap();
    assert_eq!(app.selected_source, 1);

    app.update(Message::GotoTop).await.unwrap();
    assert_eq!(app.selected_source, 0);
    app.update(Message::GotoBottom).await.unwrap();
    assert_eq!(app.selected_source, 1);
}

#[tokio::test]
async fn help_modal_toggles() {
    let dir = TempDir::new().unwrap();
    let mut app = make_app(&dir);

    app.update(Message::ToggleHelp).await.unwrap();
    assert!(matches!(app.modal, ModalState::Help));
    app.update(Message::ToggleHelp).await.unwrap();
    assert!(app.modal.is_none());
}
