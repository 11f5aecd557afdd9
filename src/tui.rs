use anyhow::Result;
use crossterm::{
    ExecutableCommand,
    event::{self, Event, KeyCode, KeyEventKind},
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
};
use std::io::stdout;

use crate::dashboard::Dashboard;
use crate::ranker::ScoredPosting;
use crate::scoring::breakdown_on;

struct AppState {
    ranked: Vec<ScoredPosting>,
    selected: usize,
    scroll_offset: u16,
    status: String,
}

impl AppState {
    fn new(ranked: Vec<ScoredPosting>) -> Self {
        Self {
            ranked,
            selected: 0,
            scroll_offset: 0,
            status: String::new(),
        }
    }

    fn current(&self) -> Option<&ScoredPosting> {
        self.ranked.get(self.selected)
    }

    fn next(&mut self) {
        if !self.ranked.is_empty() && self.selected < self.ranked.len() - 1 {
            self.selected += 1;
            self.scroll_offset = 0;
        }
    }

    fn prev(&mut self) {
        if self.selected > 0 {
            self.selected -= 1;
            self.scroll_offset = 0;
        }
    }

    fn scroll_down(&mut self) {
        self.scroll_offset = self.scroll_offset.saturating_add(3);
    }

    fn scroll_up(&mut self) {
        self.scroll_offset = self.scroll_offset.saturating_sub(3);
    }

    /// Re-rank after a profile change, keeping the same posting selected.
    fn rerank(&mut self, dash: &Dashboard) {
        let key = self
            .current()
            .map(|s| (s.posting.source.clone(), s.posting.id.clone()));
        self.ranked = dash.ranked();
        self.selected = key
            .and_then(|(source, id)| {
                self.ranked
                    .iter()
                    .position(|s| s.posting.source == source && s.posting.id == id)
            })
            .unwrap_or(0);
    }
}

pub fn run_browse(dash: &mut Dashboard) -> Result<()> {
    let ranked = dash.ranked();
    if ranked.is_empty() {
        println!("No postings to browse. Run 'jobscout search <query>' first.");
        return Ok(());
    }

    let mut state = AppState::new(ranked);

    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let result = run_loop(&mut terminal, &mut state, dash);

    // Restore terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
}

fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    state: &mut AppState,
    dash: &mut Dashboard,
) -> Result<()> {
    let mut list_state = ListState::default();
    list_state.select(Some(0));

    loop {
        terminal.draw(|frame| draw(frame, state, dash, &mut list_state))?;

        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            match key.code {
                KeyCode::Char('q') | KeyCode::Esc => break,
                KeyCode::Down | KeyCode::Char('j') => state.next(),
                KeyCode::Up | KeyCode::Char('k') => state.prev(),
                KeyCode::Char('J') | KeyCode::PageDown => state.scroll_down(),
                KeyCode::Char('K') | KeyCode::PageUp => state.scroll_up(),
                KeyCode::Char(c @ ('l' | 'd')) => {
                    if let Some(current) = state.current() {
                        let posting = current.posting.clone();
                        let liked = c == 'l';
                        dash.submit_feedback(&posting, liked, "", &[])?;
                        state.status = format!(
                            "{} '{}'",
                            if liked { "Liked" } else { "Disliked" },
                            posting.title
                        );
                        state.rerank(dash);
                    }
                }
                KeyCode::Char('s') => {
                    if let Some(current) = state.current() {
                        let title = current.posting.title.clone();
                        let newly_saved = dash.save_posting(&current.posting)?;
                        state.status = if newly_saved {
                            format!("Saved '{}'", title)
                        } else {
                            format!("'{}' is already saved", title)
                        };
                    }
                }
                _ => {}
            }
            list_state.select(Some(state.selected));
        }
    }
    Ok(())
}

fn draw(frame: &mut Frame, state: &AppState, dash: &Dashboard, list_state: &mut ListState) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(1)])
        .split(frame.area());

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(rows[0]);

    // Left panel: ranked list
    let items: Vec<ListItem> = state
        .ranked
        .iter()
        .map(|s| {
            let title = if s.posting.title.chars().count() > 32 {
                format!("{}...", s.posting.title.chars().take(29).collect::<String>())
            } else {
                s.posting.title.clone()
            };
            ListItem::new(format!("{:>6.2} {} | {}", s.score, title, s.posting.company))
        })
        .collect();

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!(" Ranked ({}) ", state.ranked.len())),
        )
        .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
        .highlight_symbol("> ");

    frame.render_stateful_widget(list, chunks[0], list_state);

    // Right panel: detail
    let detail = build_detail(state, dash);
    let detail_widget = Paragraph::new(detail)
        .block(Block::default().borders(Borders::ALL).title(" Detail "))
        .wrap(Wrap { trim: false })
        .scroll((state.scroll_offset, 0));

    frame.render_widget(detail_widget, chunks[1]);

    let footer = if state.status.is_empty() {
        " j/k:navigate  J/K:scroll  l:like  d:dislike  s:save  q:quit".to_string()
    } else {
        format!(" {}", state.status)
    };
    let help = Paragraph::new(footer).style(Style::default().fg(Color::DarkGray));
    frame.render_widget(help, rows[1]);
}

fn build_detail<'a>(state: &'a AppState, dash: &Dashboard) -> Text<'a> {
    let Some(current) = state.current() else {
        return Text::raw("No posting selected");
    };
    let job = &current.posting;

    let mut lines: Vec<Line> = Vec::new();

    lines.push(Line::from(Span::styled(
        &job.title,
        Style::default().add_modifier(Modifier::BOLD),
    )));
    lines.push(Line::from(format!("at {}", job.company)));
    if !job.location.is_empty() {
        lines.push(Line::from(format!("Location: {}", job.location)));
    }
    if let Some(date) = job.posted_at {
        lines.push(Line::from(format!("Posted: {}", date)));
    }
    match (job.salary_min, job.salary_max) {
        (Some(min), Some(max)) => lines.push(Line::from(format!("Pay: ${} - ${}", min, max))),
        (Some(min), None) => lines.push(Line::from(format!("Pay: ${}+", min))),
        (None, Some(max)) => lines.push(Line::from(format!("Pay: up to ${}", max))),
        (None, None) => {}
    }
    if !job.url.is_empty() {
        lines.push(Line::from(format!("URL: {}", job.url)));
    }
    lines.push(Line::from(Span::styled(
        format!("Source: {}", job.source),
        Style::default().fg(Color::DarkGray),
    )));
    lines.push(Line::from(""));

    if !job.tag_list().is_empty() {
        lines.push(Line::from(Span::styled(
            format!("Tags: {}", job.tag_list().join(", ")),
            Style::default().fg(Color::Cyan),
        )));
        lines.push(Line::from(""));
    }

    lines.push(Line::from(Span::styled(
        format!("Score {:.2}", current.score),
        Style::default().add_modifier(Modifier::BOLD),
    )));
    let today = chrono::Local::now().date_naive();
    for (factor, value) in breakdown_on(job, dash.prefs(), today).parts {
        if value != 0.0 {
            let style = if value > 0.0 {
                Style::default().fg(Color::Green)
            } else {
                Style::default().fg(Color::Red)
            };
            lines.push(Line::from(Span::styled(
                format!("  {:<16} {:+.2}", factor.name(), value),
                style,
            )));
        }
    }
    lines.push(Line::from(""));

    match &job.description {
        Some(text) if !text.trim().is_empty() => {
            lines.push(Line::from(Span::styled(
                "Description",
                Style::default().add_modifier(Modifier::BOLD),
            )));
            for line in textwrap::fill(text, 70).lines() {
                lines.push(Line::from(line.to_string()));
            }
        }
        _ => {
            lines.push(Line::from(Span::styled(
                "(No description)",
                Style::default().fg(Color::DarkGray),
            )));
        }
    }

    Text::from(lines)
}
