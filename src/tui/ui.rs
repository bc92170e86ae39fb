//! Rendering for all screens and modals.

use super::app::{App, FormField, ModalState, NewSessionForm, Screen};
use crate::data::{Activity, SessionState};
use crate::monitor::summary;
use crate::util;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph};
use ratatui::Frame;
use unicode_width::UnicodeWidthStr;

pub fn draw(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // header
            Constraint::Min(1),    // body
            Constraint::Length(1), // footer
        ])
        .split(f.area());

    draw_header(f, app, chunks[0]);

    match app.screen() {
        Screen::Sources => draw_sources(f, app, chunks[1]),
        Screen::Sessions { source } => {
            let title = source.display_name();
            draw_sessions(f, app, chunks[1], &title);
        }
        Screen::Session { session } => {
            let title = session.display_title();
            draw_session(f, app, chunks[1], &title);
        }
    }

    draw_footer(f, app, chunks[2]);

    match &app.modal {
        ModalState::Help => draw_help_modal(f),
        ModalState::NewSession(form) => draw_new_session_modal(f, form),
        ModalState::None => {}
    }
}

fn draw_header(f: &mut Frame, app: &App, area: Rect) {
    let mut spans = vec![Span::styled(
        " julet ",
        Style::default()
            .fg(Color::Black)
            .bg(Color::Magenta)
            .add_modifier(Modifier::BOLD),
    )];

    let breadcrumb = match app.screen() {
        Screen::Sources => " Sources".to_string(),
        Screen::Sessions { source } => format!(" Sources > {}", source.display_name()),
        Screen::Session { session } => format!(" Sessions > {}", session.display_title()),
    };
    spans.push(Span::raw(breadcrumb));

    if app.is_loading {
        spans.push(Span::styled(
            format!("  {} refreshing", app.spinner_char()),
            Style::default().fg(Color::Yellow),
        ));
    } else if stale_for_screen(app) {
        spans.push(Span::styled(
            "  (cached)",
            Style::default().fg(Color::DarkGray),
        ));
    }

    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn stale_for_screen(app: &App) -> bool {
    match app.screen() {
        Screen::Sources => app.sources_stale,
        Screen::Sessions { .. } => app.sessions_stale,
        Screen::Session { .. } => false,
    }
}

fn draw_sources(f: &mut Frame, app: &App, area: Rect) {
    let width = area.width.saturating_sub(4) as usize;
    let items: Vec<ListItem> = app
        .sources
        .iter()
        .map(|source| ListItem::new(truncate(&source.display_name(), width)))
        .collect();

    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!(" Sources ({}) ", app.sources.len()));

    if items.is_empty() {
        let text = if app.is_loading {
            "Loading sources..."
        } else {
            "No sources connected. Link a repository at jules.google.com."
        };
        f.render_widget(Paragraph::new(text).block(block), area);
        return;
    }

    let list = List::new(items)
        .block(block)
        .highlight_style(
            Style::default()
                .bg(Color::Magenta)
                .fg(Color::Black)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    let mut state = ListState::default();
    state.select(Some(app.selected_source.min(app.sources.len() - 1)));
    f.render_stateful_widget(list, area, &mut state);
}

fn draw_sessions(f: &mut Frame, app: &App, area: Rect, source_title: &str) {
    let width = area.width.saturating_sub(4) as usize;
    let title_width = width.saturating_sub(30);

    let items: Vec<ListItem> = app
        .sessions
        .iter()
        .map(|session| {
            let state_style = match session.state {
                SessionState::Failed => Style::default().fg(Color::Red),
                SessionState::Completed => Style::default().fg(Color::Green),
                SessionState::AwaitingPlanApproval => Style::default().fg(Color::Yellow),
                _ => Style::default().fg(Color::Cyan),
            };
            let line = Line::from(vec![
                Span::raw(format!(
                    "{:<width$} ",
                    truncate(&session.display_title(), title_width),
                    width = title_width
                )),
                Span::styled(format!("{:<18}", session.state.label()), state_style),
                Span::styled(
                    util::relative_time(session.update_time.as_deref()),
                    Style::default().fg(Color::DarkGray),
                ),
            ]);
            ListItem::new(line)
        })
        .collect();

    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!(" {} sessions ", source_title));

    if items.is_empty() {
        let text = if app.is_loading {
            "Loading sessions..."
        } else {
            "No sessions yet. Press n to start one."
        };
        f.render_widget(Paragraph::new(text).block(block), area);
        return;
    }

    let list = List::new(items)
        .block(block)
        .highlight_style(
            Style::default()
                .bg(Color::Magenta)
                .fg(Color::Black)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    let mut state = ListState::default();
    state.select(Some(app.selected_session.min(app.sessions.len() - 1)));
    f.render_stateful_widget(list, area, &mut state);
}

fn draw_session(f: &mut Frame, app: &App, area: Rect, session_title: &str) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(3)])
        .split(area);

    draw_timeline(f, app, chunks[0], session_title);
    draw_compose(f, app, chunks[1]);
}

fn draw_timeline(f: &mut Frame, app: &App, area: Rect, session_title: &str) {
    let watch_marker = if app.watching { " ● watching" } else { "" };
    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!(" {}{} ", session_title, watch_marker));

    if app.activities.is_empty() {
        let text = if app.is_loading {
            "Loading activity..."
        } else {
            "No activity yet."
        };
        f.render_widget(Paragraph::new(text).block(block), area);
        return;
    }

    let width = area.width.saturating_sub(4) as usize;
    let visible = area.height.saturating_sub(2) as usize;

    // The service returns newest first; chat reads top-down, so render
    // oldest first and anchor the window `timeline_scroll` entries back
    // from the newest.
    let lines: Vec<Line> = app
        .activities
        .iter()
        .rev()
        .map(|activity| timeline_line(activity, width))
        .collect();

    let end = lines.len().saturating_sub(app.timeline_scroll.min(lines.len() - 1));
    let start = end.saturating_sub(visible);
    let window: Vec<Line> = lines[start..end].to_vec();

    f.render_widget(Paragraph::new(window).block(block), area);
}

fn timeline_line(activity: &Activity, width: usize) -> Line<'static> {
    let (who, who_style) = if activity.is_user() {
        ("you", Style::default().fg(Color::Green).add_modifier(Modifier::BOLD))
    } else {
        ("jules", Style::default().fg(Color::Magenta).add_modifier(Modifier::BOLD))
    };

    let text = match activity.message_text() {
        Some(message) => first_line(message),
        None => summary::summarize(activity),
    };

    let time = util::relative_time(activity.create_time.as_deref());
    let text_width = width.saturating_sub(8 + time.width() + 2);

    Line::from(vec![
        Span::styled(format!("{:>5} ", who), who_style),
        Span::raw(format!(
            "{:<width$} ",
            truncate(&text, text_width),
            width = text_width
        )),
        Span::styled(time, Style::default().fg(Color::DarkGray)),
    ])
}

fn draw_compose(f: &mut Frame, app: &App, area: Rect) {
    let (title, style) = if app.compose_mode {
        (" Message (Enter to send, Esc to cancel) ", Style::default().fg(Color::Yellow))
    } else {
        (" Press i to message the agent ", Style::default().fg(Color::DarkGray))
    };

    let cursor = if app.compose_mode { "█" } else { "" };
    let text = format!("{}{}", app.compose_buffer, cursor);

    let paragraph = Paragraph::new(text)
        .style(style)
        .block(Block::default().borders(Borders::ALL).title(title));
    f.render_widget(paragraph, area);
}

fn draw_footer(f: &mut Frame, app: &App, area: Rect) {
    // Errors win over notices, notices over hints.
    let line = if let Some(error) = &app.error_message {
        Line::from(Span::styled(
            format!(" {} ", error),
            Style::default().fg(Color::Red),
        ))
    } else if let Some((notice, _)) = &app.notice {
        Line::from(Span::styled(
            format!(" {} ", notice),
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        ))
    } else {
        let hints = match app.screen() {
            Screen::Sources => " j/k move · Enter open · r refresh · ? help · q quit",
            Screen::Sessions { .. } => {
                " j/k move · Enter open · n new session · r refresh · Esc back · q quit"
            }
            Screen::Session { .. } => {
                " i message · w watch · a approve plan · j/k scroll · r refresh · Esc back"
            }
        };
        Line::from(Span::styled(hints, Style::default().fg(Color::DarkGray)))
    };

    f.render_widget(Paragraph::new(line), area);
}

fn draw_help_modal(f: &mut Frame) {
    let area = centered_rect(52, 16, f.area());
    f.render_widget(Clear, area);

    let rows = [
        ("j / k", "move selection / scroll timeline"),
        ("Enter / l", "open selected item"),
        ("Esc / h", "back"),
        ("r", "refresh current screen"),
        ("n", "new session (sessions screen)"),
        ("i", "message the agent (session screen)"),
        ("w", "toggle watching (session screen)"),
        ("a", "approve plan (session screen)"),
        ("g / G", "jump to top / bottom"),
        ("?", "toggle this help"),
        ("q", "quit"),
    ];

    let lines: Vec<Line> = rows
        .iter()
        .map(|(keys, what)| {
            Line::from(vec![
                Span::styled(format!(" {:<10}", keys), Style::default().fg(Color::Magenta)),
                Span::raw(*what),
            ])
        })
        .collect();

    let paragraph = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title(" Keys "));
    f.render_widget(paragraph, area);
}

fn draw_new_session_modal(f: &mut Frame, form: &NewSessionForm) {
    let area = centered_rect(60, 11, f.area());
    f.render_widget(Clear, area);

    let field_line = |label: &str, value: &str, focused: bool| -> Line<'static> {
        let marker = if focused { "> " } else { "  " };
        let style = if focused {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default()
        };
        let cursor = if focused { "█" } else { "" };
        Line::from(vec![
            Span::styled(format!("{}{:<8}", marker, label), style),
            Span::styled(format!("{}{}", value, cursor), style),
        ])
    };

    let lines = vec![
        Line::raw(""),
        field_line("Prompt", &form.prompt, form.field == FormField::Prompt),
        field_line("Title", &form.title, form.field == FormField::Title),
        field_line("Branch", &form.branch, form.field == FormField::Branch),
        Line::raw(""),
        Line::from(Span::styled(
            " Tab next field · Enter create · Esc cancel",
            Style::default().fg(Color::DarkGray),
        )),
    ];

    let paragraph = Paragraph::new(lines)
        .alignment(Alignment::Left)
        .block(Block::default().borders(Borders::ALL).title(" New session "));
    f.render_widget(paragraph, area);
}

/// Centered rect with fixed width/height, clamped to the frame.
fn centered_rect(width: u16, height: u16, frame: Rect) -> Rect {
    let width = width.min(frame.width);
    let height = height.min(frame.height);
    Rect {
        x: frame.x + (frame.width - width) / 2,
        y: frame.y + (frame.height - height) / 2,
        width,
        height,
    }
}

/// Truncate to a display width, appending an ellipsis when cut.
fn truncate(text: &str, max_width: usize) -> String {
    if max_width == 0 {
        return String::new();
    }
    if text.width() <= max_width {
        return text.to_string();
    }

    let mut out = String::new();
    let mut used = 0;
    for c in text.chars() {
        let w = unicode_width::UnicodeWidthChar::width(c).unwrap_or(0);
        if used + w > max_width.saturating_sub(1) {
            break;
        }
        out.push(c);
        used += w;
    }
    out.push('…');
    out
}

fn first_line(text: &str) -> String {
    match text.lines().next() {
        Some(line) if text.contains('\n') => format!("{} …", line),
        Some(line) => line.to_string(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_short_text_unchanged() {
        assert_eq!(truncate("hello", 10), "hello");
    }

    #[test]
    fn test_truncate_long_text_gets_ellipsis() {
        let out = truncate("a very long session title", 10);
        assert!(out.ends_with('…'));
        assert!(out.width() <= 10);
    }

    #[test]
    fn test_truncate_zero_width() {
        assert_eq!(truncate("anything", 0), "");
    }

    #[test]
    fn test_first_line_collapses_multiline() {
        assert_eq!(first_line("one\ntwo"), "one …");
        assert_eq!(first_line("single"), "single");
        assert_eq!(first_line(""), "");
    }
}
