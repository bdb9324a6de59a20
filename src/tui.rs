use std::io;
use std::time::{Duration, Instant};

use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::ExecutableCommand;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use ratatui::Terminal;

use crate::cli::{self, ConsoleCommand};
use crate::core::config::Settings;
use crate::core::dashboard::{Dashboard, DashboardEvent};
use crate::core::error::AppError;
use crate::core::filter::{visible_jobs, EvaluationFilter, FilterCounts, FilterState, TitleFilter};
use crate::core::formatter::{
    collapse_description, format_created_at, format_filter_chip, format_last_updated,
    format_note_line, format_showing_line,
};
use crate::core::job::{Evaluation, JobRecord};
use crate::core::notify::Notifier;
use crate::core::store::KeyValueStore;

struct TerminalGuard;

impl TerminalGuard {
    fn enter() -> Result<Self, AppError> {
        enable_raw_mode().map_err(AppError::terminal)?;
        let mut stdout = io::stdout();
        stdout
            .execute(EnterAlternateScreen)
            .map_err(AppError::terminal)?;
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let mut stdout = io::stdout();
        let _ = stdout.execute(LeaveAlternateScreen);
    }
}

#[derive(Debug)]
struct AppState {
    input: String,
    history: Vec<String>,
    filters: FilterState,
    title_filter: bool,
    /// Link of the card showing its full description.
    expanded: Option<String>,
    should_quit: bool,
    scroll_offset: usize,
    view_lines: usize,
    content_lines: usize,
}

const MAX_HISTORY: usize = 200;

impl AppState {
    fn new(settings: &Settings) -> Self {
        let mut history = Vec::new();
        history.push("Welcome to jobwatch. Type 'help' for commands.".to_string());
        history.push(format!(
            "Polling {} every {} min.",
            settings.feed_url,
            settings.poll_interval.as_secs() / 60
        ));
        Self {
            input: String::new(),
            history,
            filters: FilterState::default(),
            title_filter: settings.title_filter,
            expanded: None,
            should_quit: false,
            scroll_offset: 0,
            view_lines: 1,
            content_lines: 0,
        }
    }

    fn push_history(&mut self, line: impl Into<String>) {
        if self.history.len() >= MAX_HISTORY {
            let drain_count = self.history.len().saturating_sub(MAX_HISTORY - 1);
            self.history.drain(0..drain_count);
        }
        self.history.push(line.into());
    }

    fn title_filter(&self) -> Option<&'static TitleFilter> {
        self.title_filter.then(TitleFilter::design_roles)
    }

    fn set_view_lines(&mut self, lines: usize, content_lines: usize) {
        self.view_lines = lines.max(1);
        self.content_lines = content_lines;
        self.clamp_scroll();
    }

    fn scroll_up(&mut self, lines: usize) {
        self.scroll_offset = self.scroll_offset.saturating_sub(lines);
    }

    fn scroll_down(&mut self, lines: usize) {
        self.scroll_offset = (self.scroll_offset + lines).min(self.max_scroll());
    }

    fn scroll_top(&mut self) {
        self.scroll_offset = 0;
    }

    fn scroll_bottom(&mut self) {
        self.scroll_offset = self.max_scroll();
    }

    fn max_scroll(&self) -> usize {
        self.content_lines.saturating_sub(self.view_lines)
    }

    fn clamp_scroll(&mut self) {
        let max_scroll = self.max_scroll();
        if self.scroll_offset > max_scroll {
            self.scroll_offset = max_scroll;
        }
    }

    fn record_events(&mut self, events: Vec<DashboardEvent>) {
        for event in events {
            let line = match event {
                DashboardEvent::Refreshed { count, new_jobs: 0 } => format!("Loaded {count} jobs."),
                DashboardEvent::Refreshed { count, new_jobs } => {
                    format!("Loaded {count} jobs, {new_jobs} new since last poll.")
                }
                DashboardEvent::Failed(message) => format!("error: {message}"),
                DashboardEvent::Notified { new_jobs } => {
                    format!("Notified about {new_jobs} new job{}.", plural(new_jobs))
                }
            };
            self.push_history(line);
        }
    }
}

pub fn run(settings: &Settings) -> Result<(), AppError> {
    let mut dash = crate::core::build_dashboard(settings)?;

    let _guard = TerminalGuard::enter()?;
    let stdout = io::stdout();
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).map_err(AppError::terminal)?;

    let mut app = AppState::new(settings);
    dash.start();

    loop {
        let events = dash.tick(Instant::now());
        app.record_events(events);

        let size = terminal.size().map_err(AppError::terminal)?;
        let cards_height = size.height.saturating_sub(4 + 3 + 7 + 3).max(3) as usize;
        let card_width = size.width.saturating_sub(2).max(10) as usize;
        let cards = card_lines(&app, &dash);
        let content = wrapped_height(&cards, card_width);
        app.set_view_lines(cards_height.saturating_sub(2), content);

        terminal
            .draw(|frame| {
                let layout = Layout::default()
                    .direction(Direction::Vertical)
                    .constraints([
                        Constraint::Length(4),
                        Constraint::Length(3),
                        Constraint::Min(3),
                        Constraint::Length(7),
                        Constraint::Length(3),
                    ])
                    .split(frame.size());

                frame.render_widget(render_header(&dash), layout[0]);
                frame.render_widget(render_filters(&app, &dash), layout[1]);

                let cards = Paragraph::new(cards)
                    .block(Block::default().title("Jobs").borders(Borders::ALL))
                    .wrap(Wrap { trim: false })
                    .scroll((app.scroll_offset.min(u16::MAX as usize) as u16, 0));
                frame.render_widget(cards, layout[2]);

                let history = render_history(&app, layout[3].height as usize);
                frame.render_widget(history, layout[3]);

                let input = Paragraph::new(app.input.as_str())
                    .block(Block::default().title("Command").borders(Borders::ALL));
                frame.render_widget(input, layout[4]);
                let cursor = layout[4].x.saturating_add(1).saturating_add(cursor_column(&app.input));
                frame.set_cursor(cursor, layout[4].y + 1);
            })
            .map_err(AppError::terminal)?;

        if event::poll(Duration::from_millis(200)).map_err(AppError::terminal)? {
            if let Event::Key(key) = event::read().map_err(AppError::terminal)? {
                if key.kind == KeyEventKind::Release {
                    continue;
                }
                match key.code {
                    KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                        app.should_quit = true;
                    }
                    KeyCode::Char(ch) => {
                        app.input.push(ch);
                    }
                    KeyCode::Backspace => {
                        app.input.pop();
                    }
                    KeyCode::Enter => {
                        let line = app.input.trim().to_string();
                        app.input.clear();
                        if !line.is_empty() {
                            handle_line(&mut app, &mut dash, &line);
                        }
                    }
                    KeyCode::F(5) => {
                        handle_command(&mut app, &mut dash, ConsoleCommand::Refresh);
                    }
                    KeyCode::PageUp => {
                        let step = app.view_lines.saturating_sub(1).max(1);
                        app.scroll_up(step);
                    }
                    KeyCode::PageDown => {
                        let step = app.view_lines.saturating_sub(1).max(1);
                        app.scroll_down(step);
                    }
                    KeyCode::Up => app.scroll_up(1),
                    KeyCode::Down => app.scroll_down(1),
                    KeyCode::Home => app.scroll_top(),
                    KeyCode::End => app.scroll_bottom(),
                    KeyCode::Esc => {
                        app.should_quit = true;
                    }
                    _ => {}
                }
            }
        }

        if app.should_quit {
            break;
        }
    }

    tracing::info!("Dashboard closed");
    Ok(())
}

fn handle_line<S: KeyValueStore, N: Notifier>(
    app: &mut AppState,
    dash: &mut Dashboard<S, N>,
    line: &str,
) {
    app.push_history(format!(">> {line}"));
    match cli::parse_line(line) {
        Ok(command) => handle_command(app, dash, command),
        Err(err) => {
            let first = err.lines().next().unwrap_or("invalid command").to_string();
            app.push_history(first);
        }
    }
}

fn handle_command<S: KeyValueStore, N: Notifier>(
    app: &mut AppState,
    dash: &mut Dashboard<S, N>,
    command: ConsoleCommand,
) {
    match command {
        ConsoleCommand::Refresh => {
            if dash.refresh() {
                app.push_history("Refreshing...");
            } else {
                app.push_history("A refresh is already running.");
            }
        }
        ConsoleCommand::Seen => {
            let count = dash.unseen_count();
            dash.mark_all_seen();
            app.push_history(format!("Marked {count} job{} as seen.", plural(count)));
        }
        ConsoleCommand::Filter { key } => {
            let enabled = app.filters.toggle(key);
            let state = if enabled { "shown" } else { "hidden" };
            app.push_history(format!("{} jobs {state}.", key.label()));
            app.scroll_top();
        }
        ConsoleCommand::Titles => {
            app.title_filter = !app.title_filter;
            let state = if app.title_filter { "on" } else { "off" };
            app.push_history(format!("Design-role title filter {state}."));
            app.scroll_top();
        }
        ConsoleCommand::Expand { index } => {
            let visible = visible_jobs(dash.jobs(), &app.filters, app.title_filter());
            match index.checked_sub(1).and_then(|idx| visible.get(idx)) {
                Some(job) => app.expanded = Some(job.link.clone()),
                None => app.push_history(format!("No card {index} (showing {}).", visible.len())),
            }
        }
        ConsoleCommand::Collapse => {
            app.expanded = None;
        }
        ConsoleCommand::Help => {
            for line in cli::CONSOLE_HELP {
                app.push_history(line);
            }
        }
        ConsoleCommand::Clear => {
            app.history.clear();
        }
        ConsoleCommand::Quit => {
            app.should_quit = true;
        }
    }
}

/// Columns the input occupies, counted in characters rather than bytes.
fn cursor_column(input: &str) -> u16 {
    input.chars().count().min(u16::MAX as usize) as u16
}

fn plural(count: usize) -> &'static str {
    if count == 1 {
        ""
    } else {
        "s"
    }
}

fn evaluation_color(evaluation: &Evaluation) -> Color {
    match evaluation {
        Evaluation::Perfect => Color::Rgb(0x22, 0xc5, 0x5e),
        Evaluation::Good => Color::Rgb(0x3b, 0x82, 0xf6),
        Evaluation::Maybe => Color::Rgb(0xf5, 0x9e, 0x0b),
        Evaluation::Skip => Color::Rgb(0x6b, 0x72, 0x80),
        Evaluation::Unrated | Evaluation::Unknown(_) => Color::Rgb(0xd3, 0xd3, 0xd3),
    }
}

fn filter_color(key: EvaluationFilter) -> Color {
    match key {
        EvaluationFilter::None => Color::Rgb(0x93, 0x33, 0xea),
        EvaluationFilter::Perfect => evaluation_color(&Evaluation::Perfect),
        EvaluationFilter::Good => evaluation_color(&Evaluation::Good),
        EvaluationFilter::Maybe => evaluation_color(&Evaluation::Maybe),
        EvaluationFilter::Skip => evaluation_color(&Evaluation::Skip),
    }
}

fn render_header<S: KeyValueStore, N: Notifier>(dash: &Dashboard<S, N>) -> Paragraph<'static> {
    let poller = dash.poller();
    let status = if poller.is_loading() { "Loading..." } else { "Idle" };
    let updated = poller
        .last_updated()
        .map(format_last_updated)
        .unwrap_or_else(|| "--:--:--".to_string());
    let next_poll = poller.next_due().saturating_duration_since(Instant::now()).as_secs();

    let mut first = vec![
        Span::raw(format!("Status: {status}")),
        Span::raw(format!("  Last updated: {updated}")),
        Span::raw(format!("  Next poll in {:02}:{:02}", next_poll / 60, next_poll % 60)),
    ];
    let unseen = dash.unseen_count();
    if unseen > 0 {
        first.push(Span::styled(
            format!("  {unseen} new"),
            Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
        ));
    }

    let second = match poller.error() {
        Some(error) => Line::from(Span::styled(
            format!("Error: {error}"),
            Style::default().fg(Color::Red),
        )),
        None => Line::from(""),
    };

    Paragraph::new(vec![Line::from(first), second])
        .block(Block::default().title("Job Dashboard").borders(Borders::ALL))
        .wrap(Wrap { trim: true })
}

fn render_filters<S: KeyValueStore, N: Notifier>(
    app: &AppState,
    dash: &Dashboard<S, N>,
) -> Paragraph<'static> {
    let jobs = dash.jobs();
    let counts = FilterCounts::from_jobs(jobs);
    let mut spans = Vec::new();
    for key in EvaluationFilter::ALL {
        let style = if app.filters.is_enabled(key) {
            Style::default().fg(filter_color(key)).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        spans.push(Span::styled(format_filter_chip(key, &app.filters, &counts), style));
        spans.push(Span::raw("  "));
    }
    if app.title_filter {
        spans.push(Span::styled("[design roles] ", Style::default().fg(Color::Cyan)));
    }
    let visible = visible_jobs(jobs, &app.filters, app.title_filter()).len();
    spans.push(Span::raw(format_showing_line(visible, jobs.len())));

    Paragraph::new(Line::from(spans)).block(Block::default().title("Filters").borders(Borders::ALL))
}

fn card_lines<S: KeyValueStore, N: Notifier>(
    app: &AppState,
    dash: &Dashboard<S, N>,
) -> Vec<Line<'static>> {
    let visible = visible_jobs(dash.jobs(), &app.filters, app.title_filter());
    if visible.is_empty() {
        let text = if dash.poller().has_loaded() || dash.poller().error().is_some() {
            "No jobs found"
        } else {
            "Loading..."
        };
        return vec![Line::from(Span::styled(text, Style::default().fg(Color::DarkGray)))];
    }

    let mut lines = Vec::new();
    for (idx, job) in visible.iter().enumerate() {
        let expanded = app.expanded.as_deref() == Some(job.link.as_str());
        lines.extend(render_card(idx + 1, job, dash.is_new(job), expanded));
        lines.push(Line::from(""));
    }
    lines
}

fn render_card(number: usize, job: &JobRecord, is_new: bool, expanded: bool) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    let emphasis = if is_new {
        Style::default().add_modifier(Modifier::BOLD)
    } else {
        Style::default()
    };

    let mut header = vec![Span::styled(format!("{number:>3}. "), Style::default().fg(Color::DarkGray))];
    if is_new {
        header.push(Span::styled("● ", Style::default().fg(Color::Green)));
    }
    let badge = match job.evaluation.label() {
        "" => "unrated".to_string(),
        label => label.to_string(),
    };
    header.push(Span::styled(
        format!("[{badge}]"),
        Style::default().fg(evaluation_color(&job.evaluation)),
    ));
    header.push(Span::styled(format!(" {}", job.company), emphasis));
    header.push(Span::styled(
        format!("  Found {}", format_created_at(&job.created_at)),
        Style::default().fg(Color::DarkGray),
    ));
    lines.push(Line::from(header));

    lines.push(Line::from(Span::styled(
        format!("     {}", job.title.to_uppercase()),
        emphasis.fg(Color::LightBlue),
    )));
    lines.push(Line::from(Span::styled(
        format!("     {}", job.link),
        Style::default().fg(Color::Blue).add_modifier(Modifier::UNDERLINED),
    )));

    if let Some(note) = format_note_line(job) {
        lines.push(Line::from(Span::styled(
            format!("     {note}"),
            Style::default().fg(Color::Yellow),
        )));
    }

    let (description, long) = collapse_description(&job.description, expanded);
    if !description.is_empty() {
        for paragraph in description.lines() {
            lines.push(Line::from(format!("     {paragraph}")));
        }
        if long {
            let hint = if expanded {
                "     (collapse to show less)".to_string()
            } else {
                format!("     (expand {number} to show more)")
            };
            lines.push(Line::from(Span::styled(hint, Style::default().fg(Color::DarkGray))));
        }
    }
    lines
}

/// Rows the lines occupy once wrapped to `width` columns.
fn wrapped_height(lines: &[Line], width: usize) -> usize {
    lines
        .iter()
        .map(|line| line.width().max(1).div_ceil(width.max(1)))
        .sum()
}

fn render_history(app: &AppState, height: usize) -> Paragraph<'static> {
    let max_lines = height.saturating_sub(2).max(1);
    let start = app.history.len().saturating_sub(max_lines);
    let lines: Vec<Line> = app.history[start..]
        .iter()
        .map(|line| {
            if line.starts_with("error:") {
                Line::from(Span::styled(line.clone(), Style::default().fg(Color::Red)))
            } else {
                Line::from(line.clone())
            }
        })
        .collect();

    Paragraph::new(lines)
        .block(Block::default().title("Session").borders(Borders::ALL))
        .wrap(Wrap { trim: false })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::job::job;
    use crate::core::notify::tests::RecordingNotifier;
    use crate::core::poller::tests::ScriptedFeed;
    use crate::core::poller::FeedPoller;
    use crate::core::store::MemoryStore;
    use crate::core::tracker::{SeenTracker, TrackingMode};
    use std::sync::Arc;

    fn loaded_dashboard(jobs: Vec<JobRecord>) -> Dashboard<MemoryStore, RecordingNotifier> {
        let poller = FeedPoller::new(
            Arc::new(ScriptedFeed::new(vec![Ok(jobs)])),
            Duration::from_secs(900),
        );
        let tracker = SeenTracker::new(MemoryStore::new(), TrackingMode::Highlight);
        let mut dash = Dashboard::new(poller, tracker, RecordingNotifier::granted());
        dash.start();
        dash.wait(Duration::from_secs(5));
        dash
    }

    fn app() -> AppState {
        AppState::new(&Settings::default())
    }

    #[test]
    fn seen_command_clears_new_markers() {
        let mut dash = loaded_dashboard(vec![job("a", "UX Designer", "Acme")]);
        let mut app = app();
        assert_eq!(dash.unseen_count(), 1);

        handle_line(&mut app, &mut dash, "seen");

        assert_eq!(dash.unseen_count(), 0);
        assert_eq!(app.history.last().unwrap(), "Marked 1 job as seen.");
    }

    #[test]
    fn filter_command_toggles_visibility() {
        let mut skipped = job("a", "UX Designer", "Acme");
        skipped.evaluation = Evaluation::Skip;
        let mut dash = loaded_dashboard(vec![skipped, job("b", "UI Designer", "Beta")]);
        let mut app = app();

        assert_eq!(visible_jobs(dash.jobs(), &app.filters, None).len(), 1);
        handle_line(&mut app, &mut dash, "filter skip");
        assert_eq!(visible_jobs(dash.jobs(), &app.filters, None).len(), 2);
        assert_eq!(app.history.last().unwrap(), "Skip jobs shown.");
    }

    #[test]
    fn expand_rejects_out_of_range_cards() {
        let mut dash = loaded_dashboard(vec![job("a", "UX Designer", "Acme")]);
        let mut app = app();

        handle_line(&mut app, &mut dash, "expand 4");
        assert_eq!(app.expanded, None);

        handle_line(&mut app, &mut dash, "expand 1");
        assert_eq!(app.expanded.as_deref(), Some("a"));

        handle_line(&mut app, &mut dash, "collapse");
        assert_eq!(app.expanded, None);
    }

    #[test]
    fn expanded_card_follows_its_job_across_filter_changes() {
        let mut skipped = job("a", "UX Designer", "Acme");
        skipped.evaluation = Evaluation::Skip;
        let mut dash = loaded_dashboard(vec![skipped, job("b", "UI Designer", "Beta")]);
        let mut app = app();

        handle_line(&mut app, &mut dash, "expand 1");
        assert_eq!(app.expanded.as_deref(), Some("b"));

        // Showing skipped jobs moves "b" to the second card.
        handle_line(&mut app, &mut dash, "filter skip");
        let visible = visible_jobs(dash.jobs(), &app.filters, None);
        assert_eq!(visible[1].link, "b");
        assert_eq!(app.expanded.as_deref(), Some(visible[1].link.as_str()));
    }

    #[test]
    fn cursor_column_counts_characters() {
        assert_eq!(cursor_column("seen"), 4);
        assert_eq!(cursor_column("filtér"), 6);
        assert_eq!(cursor_column(""), 0);
    }

    #[test]
    fn invalid_line_is_reported_not_fatal() {
        let mut dash = loaded_dashboard(Vec::new());
        let mut app = app();

        handle_line(&mut app, &mut dash, "launch rockets");
        assert!(!app.should_quit);
        assert!(app.history.last().unwrap().contains("error"));

        handle_line(&mut app, &mut dash, "quit");
        assert!(app.should_quit);
    }

    #[test]
    fn new_cards_get_a_marker() {
        let record = job("a", "UX Designer", "Acme");
        let fresh = render_card(1, &record, true, false);
        let old = render_card(1, &record, false, false);

        let text = |lines: &[Line]| lines[0].spans.iter().map(|s| s.content.to_string()).collect::<String>();
        assert!(text(&fresh[..]).contains('●'));
        assert!(!text(&old[..]).contains('●'));
    }

    #[test]
    fn wrapped_height_counts_wrapped_rows() {
        let lines = vec![Line::from("x".repeat(25)), Line::from("")];
        assert_eq!(wrapped_height(&lines, 10), 4);
    }
}
