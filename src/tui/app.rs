use crate::api::{JulesClient, NewSession};
use crate::config::Config;
use crate::data::{Activity, Session, Source};
use crate::notify::Notification;
use crate::store::cache::{self, ResultCache};
use crate::store::watchlist::Watchlist;
use anyhow::Result;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;

/// Braille spinner frames for loading animation
pub const SPINNER_FRAMES: &[char] = &['⠋', '⠙', '⠹', '⠸', '⠼', '⠴', '⠦', '⠧', '⠇', '⠏'];

/// How long a transient notice stays in the status line.
const NOTICE_TTL_SECS: u64 = 5;

/// Where the user currently is. Screens form a stack; `Back` pops.
#[derive(Debug, Clone, PartialEq)]
pub enum Screen {
    Sources,
    Sessions { source: Source },
    Session { session: Session },
}

/// Focused field of the new-session form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FormField {
    #[default]
    Prompt,
    Title,
    Branch,
}

impl FormField {
    pub fn next(self) -> Self {
        match self {
            Self::Prompt => Self::Title,
            Self::Title => Self::Branch,
            Self::Branch => Self::Prompt,
        }
    }
}

/// Form state for creating a session against the current source.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewSessionForm {
    pub prompt: String,
    pub title: String,
    pub branch: String,
    pub field: FormField,
}

impl NewSessionForm {
    pub fn focused_mut(&mut self) -> &mut String {
        match self.field {
            FormField::Prompt => &mut self.prompt,
            FormField::Title => &mut self.title,
            FormField::Branch => &mut self.branch,
        }
    }
}

/// Active modal state - only one modal can be active at a time
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ModalState {
    #[default]
    None,
    Help,
    NewSession(NewSessionForm),
}

impl ModalState {
    pub fn is_none(&self) -> bool {
        matches!(self, ModalState::None)
    }
}

/// Result from a background refresh task
pub enum RefreshResult {
    Sources(Vec<Source>),
    Sessions {
        source: Source,
        sessions: Vec<Session>,
    },
    Activities {
        session_name: String,
        activities: Vec<Activity>,
    },
    SessionCreated(Session),
    /// A fire-and-forget action (send message, approve plan) finished.
    ActionDone(&'static str),
    Error(String),
}

pub struct App {
    pub config: Arc<Config>,
    client: JulesClient,
    cache: ResultCache,
    pub watchlist: Arc<Watchlist>,

    pub screens: Vec<Screen>,
    pub modal: ModalState,

    // Sources screen
    pub sources: Vec<Source>,
    pub sources_stale: bool,
    pub selected_source: usize,

    // Sessions screen (for the source on top of the stack)
    pub sessions: Vec<Session>,
    pub sessions_stale: bool,
    pub selected_session: usize,

    // Session screen: timeline, newest first as fetched
    pub activities: Vec<Activity>,
    pub timeline_scroll: usize,
    pub watching: bool,
    pub compose_mode: bool,
    pub compose_buffer: String,

    // UI state
    pub is_loading: bool,
    pub spinner_frame: usize,
    pub error_message: Option<String>,
    pub notice: Option<(String, Instant)>,

    refresh_tx: mpsc::Sender<RefreshResult>,
    refresh_rx: mpsc::Receiver<RefreshResult>,
    notice_rx: Option<mpsc::Receiver<Notification>>,
}

impl App {
    pub fn new(
        config: Config,
        client: JulesClient,
        cache: ResultCache,
        watchlist: Arc<Watchlist>,
        notice_rx: Option<mpsc::Receiver<Notification>>,
    ) -> Self {
        let (refresh_tx, refresh_rx) = mpsc::channel(32);
        Self {
            config: Arc::new(config),
            client,
            cache,
            watchlist,
            screens: vec![Screen::Sources],
            modal: ModalState::None,
            sources: Vec::new(),
            sources_stale: false,
            selected_source: 0,
            sessions: Vec::new(),
            sessions_stale: false,
            selected_session: 0,
            activities: Vec::new(),
            timeline_scroll: 0,
            watching: false,
            compose_mode: false,
            compose_buffer: String::new(),
            is_loading: false,
            spinner_frame: 0,
            error_message: None,
            notice: None,
            refresh_tx,
            refresh_rx,
            notice_rx,
        }
    }

    pub fn screen(&self) -> &Screen {
        self.screens.last().expect("screen stack is never empty")
    }

    /// Load cached sources immediately and kick off the first refresh.
    pub fn start(&mut self) {
        if let Some(entry) = self.cache.get::<Vec<Source>>(&cache::sources_key()) {
            self.sources = entry.value;
            self.sources_stale = true;
        }
        self.spawn_load_sources();
    }

    /// Process a message and update app state (Elm Architecture update function).
    ///
    /// Returns `Ok(true)` if the app should quit, `Ok(false)` to continue.
    pub async fn update(&mut self, msg: super::Message) -> Result<bool> {
        use super::Message;
        match msg {
            // ─────────────────────────────────────────────────────────────────
            // App lifecycle
            // ─────────────────────────────────────────────────────────────────
            Message::Quit => return Ok(true),
            Message::Refresh => self.refresh_current_screen(),
            Message::Back => self.go_back(),

            // ─────────────────────────────────────────────────────────────────
            // Navigation
            // ─────────────────────────────────────────────────────────────────
            Message::MoveUp => self.move_selection(-1),
            Message::MoveDown => self.move_selection(1),
            Message::GotoTop => self.goto_edge(true),
            Message::GotoBottom => self.goto_edge(false),
            Message::Select => self.select_current().await?,

            // ─────────────────────────────────────────────────────────────────
            // Session screen
            // ─────────────────────────────────────────────────────────────────
            Message::ToggleWatch => self.toggle_watch().await?,
            Message::ApprovePlan => self.approve_plan(),
            Message::ScrollTimeline(delta) => self.scroll_timeline(delta),

            // ─────────────────────────────────────────────────────────────────
            // Chat compose
            // ─────────────────────────────────────────────────────────────────
            Message::EnterCompose => {
                if matches!(self.screen(), Screen::Session { .. }) {
                    self.compose_mode = true;
                }
            }
            Message::ExitCompose => {
                self.compose_mode = false;
                self.compose_buffer.clear();
            }
            Message::ComposeInput(c) => self.compose_buffer.push(c),
            Message::ComposeBackspace => {
                self.compose_buffer.pop();
            }
            Message::ComposeSubmit => self.submit_compose(),

            // ─────────────────────────────────────────────────────────────────
            // New session modal
            // ─────────────────────────────────────────────────────────────────
            Message::OpenNewSession => {
                if matches!(self.screen(), Screen::Sessions { .. }) {
                    self.modal = ModalState::NewSession(NewSessionForm::default());
                }
            }
            Message::FormNextField => {
                if let ModalState::NewSession(form) = &mut self.modal {
                    form.field = form.field.next();
                }
            }
            Message::FormInput(c) => {
                if let ModalState::NewSession(form) = &mut self.modal {
                    form.focused_mut().push(c);
                }
            }
            Message::FormBackspace => {
                if let ModalState::NewSession(form) = &mut self.modal {
                    form.focused_mut().pop();
                }
            }
            Message::FormSubmit => self.submit_new_session(),

            // ─────────────────────────────────────────────────────────────────
            // Modal toggles
            // ─────────────────────────────────────────────────────────────────
            Message::ToggleHelp => {
                self.modal = if matches!(self.modal, ModalState::Help) {
                    ModalState::None
                } else {
                    ModalState::Help
                };
            }
            Message::CloseModal => self.modal = ModalState::None,

            // ─────────────────────────────────────────────────────────────────
            // No-op
            // ─────────────────────────────────────────────────────────────────
            Message::None => {}
        }
        Ok(false)
    }

    fn go_back(&mut self) {
        if !self.modal.is_none() {
            self.modal = ModalState::None;
            return;
        }
        if self.compose_mode {
            self.compose_mode = false;
            self.compose_buffer.clear();
            return;
        }
        if self.screens.len() > 1 {
            self.screens.pop();
            self.error_message = None;
            match self.screen() {
                Screen::Sources => {
                    self.sessions.clear();
                    self.sessions_stale = false;
                    self.selected_session = 0;
                }
                Screen::Sessions { .. } => {
                    self.activities.clear();
                    self.timeline_scroll = 0;
                }
                Screen::Session { .. } => {}
            }
        }
    }

    fn move_selection(&mut self, delta: i32) {
        match self.screen() {
            Screen::Sources => {
                self.selected_source = step(self.selected_source, delta, self.sources.len());
            }
            Screen::Sessions { .. } => {
                self.selected_session = step(self.selected_session, delta, self.sessions.len());
            }
            Screen::Session { .. } => self.scroll_timeline(delta),
        }
    }

    fn goto_edge(&mut self, top: bool) {
        match self.screen() {
            Screen::Sources => {
                self.selected_source = if top {
                    0
                } else {
                    self.sources.len().saturating_sub(1)
                };
            }
            Screen::Sessions { .. } => {
                self.selected_session = if top {
                    0
                } else {
                    self.sessions.len().saturating_sub(1)
                };
            }
            Screen::Session { .. } => {
                // Top of the view is the oldest activity, bottom the newest.
                self.timeline_scroll = if top {
                    self.activities.len().saturating_sub(1)
                } else {
                    0
                };
            }
        }
    }

    fn scroll_timeline(&mut self, delta: i32) {
        // Scroll 0 pins to the newest activity; larger values look back.
        if delta < 0 {
            self.timeline_scroll = self
                .timeline_scroll
                .saturating_add(delta.unsigned_abs() as usize)
                .min(self.activities.len().saturating_sub(1));
        } else {
            self.timeline_scroll = self.timeline_scroll.saturating_sub(delta as usize);
        }
    }

    /// Open the item under the cursor.
    async fn select_current(&mut self) -> Result<()> {
        match self.screen().clone() {
            Screen::Sources => {
                let Some(source) = self.sources.get(self.selected_source).cloned() else {
                    return Ok(());
                };
                self.screens.push(Screen::Sessions {
                    source: source.clone(),
                });
                self.selected_session = 0;
                self.sessions.clear();
                self.sessions_stale = false;

                if let Some(entry) = self
                    .cache
                    .get::<Vec<Session>>(&source_cache_key(&source))
                {
                    self.sessions = entry.value;
                    self.sessions_stale = true;
                }
                self.spawn_load_sessions(source);
            }
            Screen::Sessions { .. } => {
                let Some(session) = self.sessions.get(self.selected_session).cloned() else {
                    return Ok(());
                };

                // Opening the session view starts observing it; `w` stops.
                self.watchlist
                    .add(session.short_id(), &session.display_title())
                    .await?;
                self.watching = true;

                self.screens.push(Screen::Session {
                    session: session.clone(),
                });
                self.activities.clear();
                self.timeline_scroll = 0;
                self.spawn_load_activities(&session);
            }
            Screen::Session { .. } => {}
        }
        Ok(())
    }

    async fn toggle_watch(&mut self) -> Result<()> {
        let Screen::Session { session } = self.screen().clone() else {
            return Ok(());
        };

        if self.watching {
            self.watchlist.remove(session.short_id()).await?;
            self.watching = false;
            self.set_notice("Stopped watching this session".to_string());
        } else {
            self.watchlist
                .add(session.short_id(), &session.display_title())
                .await?;
            self.watching = true;
            self.set_notice("Watching this session".to_string());
        }
        Ok(())
    }

    fn approve_plan(&mut self) {
        let Screen::Session { session } = self.screen() else {
            return;
        };

        let client = self.client.clone();
        let session_id = session.short_id().to_string();
        let tx = self.refresh_tx.clone();
        self.is_loading = true;

        tokio::spawn(async move {
            let result = match client.approve_plan(&session_id).await {
                Ok(()) => RefreshResult::ActionDone("Plan approved"),
                Err(e) => RefreshResult::Error(format!("Approve failed: {}", e)),
            };
            crate::util::send_or_log(&tx, result, "approve result").await;
        });
    }

    fn submit_compose(&mut self) {
        let Screen::Session { session } = self.screen() else {
            return;
        };
        let prompt = self.compose_buffer.trim().to_string();
        if prompt.is_empty() {
            return;
        }

        let client = self.client.clone();
        let session_id = session.short_id().to_string();
        let tx = self.refresh_tx.clone();
        self.compose_buffer.clear();
        self.is_loading = true;

        tokio::spawn(async move {
            let result = match client.send_message(&session_id, &prompt).await {
                Ok(()) => RefreshResult::ActionDone("Message sent"),
                Err(e) => RefreshResult::Error(format!("Send failed: {}", e)),
            };
            crate::util::send_or_log(&tx, result, "send result").await;
        });
    }

    fn submit_new_session(&mut self) {
        let ModalState::NewSession(form) = &self.modal else {
            return;
        };
        let Screen::Sessions { source } = self.screen() else {
            return;
        };

        if form.prompt.trim().is_empty() {
            self.error_message = Some("A prompt is required".to_string());
            return;
        }

        let request = NewSession {
            prompt: form.prompt.trim().to_string(),
            source: source.name.clone(),
            title: non_empty_trimmed(&form.title),
            starting_branch: non_empty_trimmed(&form.branch),
        };

        let client = self.client.clone();
        let tx = self.refresh_tx.clone();
        self.modal = ModalState::None;
        self.is_loading = true;

        tokio::spawn(async move {
            let result = match client.create_session(&request).await {
                Ok(session) => RefreshResult::SessionCreated(session),
                Err(e) => RefreshResult::Error(format!("Create failed: {}", e)),
            };
            crate::util::send_or_log(&tx, result, "create result").await;
        });
    }

    fn refresh_current_screen(&mut self) {
        match self.screen().clone() {
            Screen::Sources => self.spawn_load_sources(),
            Screen::Sessions { source } => self.spawn_load_sessions(source),
            Screen::Session { session } => self.spawn_load_activities(&session),
        }
    }

    fn spawn_load_sources(&mut self) {
        let client = self.client.clone();
        let tx = self.refresh_tx.clone();
        self.is_loading = true;

        tokio::spawn(async move {
            let result = match client.list_sources().await {
                Ok(sources) => RefreshResult::Sources(sources),
                Err(e) => RefreshResult::Error(format!("Refresh failed: {}", e)),
            };
            crate::util::send_or_log(&tx, result, "sources result").await;
        });
    }

    fn spawn_load_sessions(&mut self, source: Source) {
        let client = self.client.clone();
        let tx = self.refresh_tx.clone();
        self.is_loading = true;

        tokio::spawn(async move {
            // The service lists sessions globally; scope them to the source
            // the user is looking at.
            let result = match client.list_sessions().await {
                Ok(all) => {
                    let sessions = all
                        .into_iter()
                        .filter(|s| s.source_name() == Some(source.name.as_str()))
                        .collect();
                    RefreshResult::Sessions { source, sessions }
                }
                Err(e) => RefreshResult::Error(format!("Refresh failed: {}", e)),
            };
            crate::util::send_or_log(&tx, result, "sessions result").await;
        });
    }

    fn spawn_load_activities(&mut self, session: &Session) {
        let client = self.client.clone();
        let tx = self.refresh_tx.clone();
        let session_name = session.name.clone();
        let session_id = session.short_id().to_string();
        self.is_loading = true;

        tokio::spawn(async move {
            let result = match client.list_activities(&session_id).await {
                Ok(activities) => RefreshResult::Activities {
                    session_name,
                    activities,
                },
                Err(e) => RefreshResult::Error(format!("Refresh failed: {}", e)),
            };
            crate::util::send_or_log(&tx, result, "activities result").await;
        });
    }

    /// Poll for background results (non-blocking, call from event loop tick)
    pub fn poll_refresh(&mut self) {
        while let Ok(result) = self.refresh_rx.try_recv() {
            self.apply_refresh(result);
        }
    }

    fn apply_refresh(&mut self, result: RefreshResult) {
        match result {
            RefreshResult::Sources(sources) => {
                if let Err(e) = self.cache.put(&cache::sources_key(), &sources) {
                    tracing::warn!("Failed to cache sources: {}", e);
                }
                self.sources = sources;
                self.sources_stale = false;
                self.selected_source = self
                    .selected_source
                    .min(self.sources.len().saturating_sub(1));
                self.is_loading = false;
                self.error_message = None;
            }
            RefreshResult::Sessions { source, sessions } => {
                if let Err(e) = self.cache.put(&source_cache_key(&source), &sessions) {
                    tracing::warn!("Failed to cache sessions: {}", e);
                }
                // Only apply if the user is still looking at this source.
                let applies = matches!(
                    self.screen(),
                    Screen::Sessions { source: current } if current.name == source.name
                );
                if applies {
                    self.sessions = sessions;
                    self.sessions_stale = false;
                    self.selected_session = self
                        .selected_session
                        .min(self.sessions.len().saturating_sub(1));
                }
                self.is_loading = false;
                self.error_message = None;
            }
            RefreshResult::Activities {
                session_name,
                activities,
            } => {
                let applies = matches!(
                    self.screen(),
                    Screen::Session { session } if session.name == session_name
                );
                if applies {
                    self.activities = activities;
                    self.timeline_scroll = self
                        .timeline_scroll
                        .min(self.activities.len().saturating_sub(1));
                }
                self.is_loading = false;
                self.error_message = None;
            }
            RefreshResult::SessionCreated(session) => {
                self.set_notice(format!("Session created: {}", session.display_title()));
                self.is_loading = false;
                if let Screen::Sessions { source } = self.screen().clone() {
                    self.spawn_load_sessions(source);
                }
            }
            RefreshResult::ActionDone(what) => {
                self.set_notice(what.to_string());
                self.is_loading = false;
                if let Screen::Session { session } = self.screen().clone() {
                    self.spawn_load_activities(&session);
                }
            }
            RefreshResult::Error(msg) => {
                self.error_message = Some(msg);
                self.is_loading = false;
            }
        }
    }

    /// Drain monitor notifications into the status line.
    fn poll_notices(&mut self) {
        // Take ownership of the receiver to avoid borrow issues
        let Some(mut rx) = self.notice_rx.take() else {
            return;
        };

        let mut refresh_session: Option<Session> = None;
        while let Ok(notification) = rx.try_recv() {
            self.notice = Some((
                format!("{}: {}", notification.session_title, notification.body),
                Instant::now(),
            ));

            if self.config.notifications.sound {
                ring_bell();
            }

            // Live-update the timeline if the notice is about the open session.
            if let Screen::Session { session } = self.screen() {
                if session.short_id() == notification.session_id {
                    refresh_session = Some(session.clone());
                }
            }
        }

        self.notice_rx = Some(rx);

        if let Some(session) = refresh_session {
            self.spawn_load_activities(&session);
        }
    }

    pub fn set_notice(&mut self, text: String) {
        self.notice = Some((text, Instant::now()));
    }

    /// Advance spinner frame (call on tick while loading)
    pub fn tick_spinner(&mut self) {
        if self.is_loading {
            self.spinner_frame = (self.spinner_frame + 1) % SPINNER_FRAMES.len();
        }
    }

    /// Get current spinner character
    pub fn spinner_char(&self) -> char {
        SPINNER_FRAMES[self.spinner_frame]
    }

    pub fn on_tick(&mut self) {
        self.tick_spinner();
        self.poll_refresh();
        self.poll_notices();

        if let Some((_, since)) = &self.notice {
            if since.elapsed().as_secs() >= NOTICE_TTL_SECS {
                self.notice = None;
            }
        }
    }
}

/// Cache key for a source's session listing.
fn source_cache_key(source: &Source) -> String {
    let id = if source.id.is_empty() {
        &source.name
    } else {
        &source.id
    };
    cache::sessions_key(id)
}

fn non_empty_trimmed(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn step(current: usize, delta: i32, len: usize) -> usize {
    if len == 0 {
        return 0;
    }
    if delta < 0 {
        current.saturating_sub(delta.unsigned_abs() as usize)
    } else {
        (current + delta as usize).min(len - 1)
    }
}

fn ring_bell() {
    use std::io::Write;
    let mut stdout = std::io::stdout();
    let _ = stdout.write_all(b"\x07");
    let _ = stdout.flush();
}
