mod app;
mod input;
mod message;
mod ui;

use crate::api::JulesClient;
use crate::config::Config;
use crate::monitor::{self, ActivityMonitor};
use crate::notify::{ChannelSink, Deduplicated};
use crate::store::cache::ResultCache;
use crate::store::credentials;
use crate::store::watchlist::Watchlist;
use anyhow::{Context, Result};
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

pub use app::{App, FormField, ModalState, NewSessionForm, RefreshResult, Screen};
pub use message::Message;

pub async fn run(config: Config) -> Result<()> {
    // Check if stdout is a terminal
    if !std::io::IsTerminal::is_terminal(&io::stdout()) {
        anyhow::bail!("julet requires an interactive terminal");
    }

    let api_key = credentials::load_api_key()?
        .context("No API key configured. Run `julet --init` or set JULES_API_KEY.")?;
    let client = JulesClient::new(&config.api.base_url, api_key);
    let cache = ResultCache::open(&config)?;
    let watchlist = Arc::new(Watchlist::open(Watchlist::default_path()?)?);

    // Background monitor: notifications arrive in the event loop through a
    // channel sink, deduplicated by activity id.
    let (poller, notice_rx) = if config.notifications.enabled {
        let (tx, rx) = mpsc::channel(16);
        let monitor = Arc::new(ActivityMonitor::new(
            Arc::new(client.clone()),
            Arc::clone(&watchlist) as Arc<dyn monitor::WatchRegistry>,
            Arc::new(Deduplicated::new(ChannelSink::new(tx))),
        ));
        let handle = monitor::spawn_polling(
            monitor,
            Duration::from_secs(config.polling.session_interval_secs.max(5)),
        );
        (Some(handle), Some(rx))
    } else {
        (None, None)
    };

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Create app state; cached data shows immediately with a refresh underway
    let mut app = App::new(config, client, cache, watchlist, notice_rx);
    app.start();

    let result = run_app(&mut terminal, &mut app).await;

    if let Some(handle) = poller {
        handle.abort();
    }

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> Result<()> {
    let tick_rate = Duration::from_millis(250);
    let mut last_tick = std::time::Instant::now();

    loop {
        terminal.draw(|f| ui::draw(f, app))?;

        let timeout = tick_rate.saturating_sub(last_tick.elapsed());

        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                let msg = input::dispatch(app, key);
                if app.update(msg).await? {
                    return Ok(()); // Quit requested
                }
            }
        }

        if last_tick.elapsed() >= tick_rate {
            app.on_tick();
            last_tick = std::time::Instant::now();
        }
    }
}
