use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::sync::Mutex;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyModifiers,
    MouseButton, MouseEvent, MouseEventKind,
};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::{execute, ExecutableCommand};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::prelude::{Alignment, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, Paragraph};
use ratatui::{Frame, Terminal};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

const MAIN_W: u16 = 46;
const MAIN_MAX_ROWS: usize = 14;
const SUB_W: u16 = 30;
const SUB_MAX_ROWS: usize = 10;
const LABEL_WIDTH: usize = 38;
const SUB_LABEL_WIDTH: usize = 24;
const PREVIEW_MAX_LINES: usize = 8;
const PREVIEW_LINE_WIDTH: usize = 60;
const TOP_MARGIN: u16 = 1;
const BOTTOM_MARGIN: u16 = 2;
const EDGE_MARGIN: u16 = 1;

const HOVER_OPEN_DELAY: Duration = Duration::from_millis(140);
const SUBMENU_CLOSE_DELAY: Duration = Duration::from_millis(250);
const TOOLTIP_DELAY: Duration = Duration::from_millis(400);
const FOCUS_GRACE_DELAY: Duration = Duration::from_millis(120);
const SEARCH_DEBOUNCE: Duration = Duration::from_millis(120);
const TICK_RATE: Duration = Duration::from_millis(25);

#[derive(Parser)]
#[command(
    name = "clip-menu",
    about = "Clipboard history and snippet menu for the terminal"
)]
struct Cli {
    #[arg(long, value_enum, default_value_t = MenuMode::All)]
    mode: MenuMode,
    #[command(subcommand)]
    command: Option<CliCommand>,
}

#[derive(Subcommand)]
enum CliCommand {
    /// Read stdin and append it to the clipboard history
    Add,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let paths = AppPaths::new()?;
    if let Some(CliCommand::Add) = cli.command {
        return run_add(&paths);
    }
    init_logging(&paths)?;
    let mut app = AppState::new(paths, cli.mode)?;
    run_app(&mut app)
}

fn run_add(paths: &AppPaths) -> Result<()> {
    let mut content = String::new();
    io::stdin()
        .read_to_string(&mut content)
        .context("Unable to read stdin")?;
    if content.trim().is_empty() {
        println!("Nothing to add.");
        return Ok(());
    }
    let mut store = JsonStore::load(&paths.store_file)?;
    store.add_clip(&content);
    store.save()?;
    println!("Added to clipboard history.");
    Ok(())
}

fn init_logging(paths: &AppPaths) -> Result<()> {
    let log_file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&paths.log_file)
        .with_context(|| format!("Unable to open log file {}", paths.log_file.display()))?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(log_file))
        .with_ansi(false)
        .init();
    Ok(())
}

fn run_app(app: &mut AppState) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    stdout.execute(EnterAlternateScreen)?;
    stdout.execute(EnableMouseCapture)?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.hide_cursor()?;

    let result = event_loop(&mut terminal, app);

    restore_terminal(&mut terminal)?;
    if let Some(output) = app.exit_output.take() {
        println!("{output}");
    }
    result
}

fn event_loop<B>(terminal: &mut Terminal<B>, app: &mut AppState) -> Result<()>
where
    B: ratatui::backend::Backend + Write,
{
    loop {
        terminal.draw(|frame| render(frame, app))?;

        if let Some(request) = app.take_pending_paste() {
            app.dispatch_paste(request);
        }

        let screen = terminal.size()?;
        if event::poll(TICK_RATE)? {
            match event::read()? {
                Event::Key(key) => app.handle_key(key, screen),
                Event::Mouse(mouse) => app.handle_mouse(mouse, screen),
                Event::FocusGained => app.handle_focus_gained(),
                Event::FocusLost => app.handle_focus_lost(),
                Event::Resize(width, height) => app.handle_resize(Rect::new(0, 0, width, height)),
                Event::Paste(_) => {}
            };
        }
        app.on_tick(Instant::now(), screen);

        if app.should_quit {
            break;
        }
    }
    Ok(())
}

fn restore_terminal<B>(terminal: &mut Terminal<B>) -> Result<()>
where
    B: ratatui::backend::Backend + Write,
{
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    Ok(())
}

fn render(frame: &mut Frame, app: &AppState) {
    render_backdrop(frame, app);
    let overlay = &app.overlay;
    if let Some(main) = &overlay.main {
        render_main_surface(frame, overlay, main, &app.theme);
        if let Some(sub) = &overlay.cascade.submenu {
            render_submenu(frame, sub, &app.theme);
        }
        if let Some(tip) = &overlay.cascade.tooltip {
            render_tooltip(frame, tip, &app.theme);
        }
    }
}

fn render_backdrop(frame: &mut Frame, app: &AppState) {
    let theme = &app.theme;
    let size = frame.size();
    frame.render_widget(
        Block::default().style(Style::default().bg(theme.background)),
        size,
    );

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(1),
            Constraint::Length(1),
        ])
        .split(size);

    let header = Paragraph::new(app.title.clone())
        .alignment(Alignment::Center)
        .style(
            Style::default()
                .fg(theme.text)
                .bg(theme.surface)
                .add_modifier(Modifier::BOLD),
        );
    frame.render_widget(header, chunks[0]);

    if !app.overlay.is_visible() {
        let hint = Paragraph::new(vec![
            Line::from(""),
            Line::from(Span::styled(
                "Space  open menu",
                Style::default().fg(theme.muted),
            )),
            Line::from(Span::styled(
                "h      clipboard history",
                Style::default().fg(theme.muted),
            )),
            Line::from(Span::styled(
                "s      snippets",
                Style::default().fg(theme.muted),
            )),
            Line::from(Span::styled(
                "r      reload store",
                Style::default().fg(theme.muted),
            )),
            Line::from(Span::styled(
                "q      quit",
                Style::default().fg(theme.muted),
            )),
        ])
        .alignment(Alignment::Center);
        frame.render_widget(hint, chunks[1]);
    }

    let status = Paragraph::new(app.status_text())
        .alignment(Alignment::Center)
        .style(Style::default().bg(theme.surface).fg(theme.muted));
    frame.render_widget(status, chunks[2]);
}

fn render_main_surface(
    frame: &mut Frame,
    overlay: &OverlayController,
    main: &MainSurface,
    theme: &Theme,
) {
    frame.render_widget(Clear, main.rect);
    let block = Block::default()
        .title(overlay.mode.label())
        .borders(Borders::ALL)
        .style(Style::default().bg(theme.surface).fg(theme.text))
        .border_style(Style::default().fg(theme.border));
    let inner = block.inner(main.rect);
    frame.render_widget(block, main.rect);
    if inner.width == 0 || inner.height == 0 {
        return;
    }

    let search_area = Rect::new(inner.x, inner.y, inner.width, 1);
    let search_line = if overlay.search.is_empty() {
        Line::from(vec![
            Span::styled("Search ", Style::default().fg(theme.muted)),
            Span::styled("type to filter", Style::default().fg(theme.muted)),
        ])
    } else {
        Line::from(vec![
            Span::styled("Search ", Style::default().fg(theme.muted)),
            Span::styled(overlay.search.clone(), Style::default().fg(theme.text)),
            Span::styled("▏", Style::default().fg(theme.accent)),
        ])
    };
    frame.render_widget(Paragraph::new(search_line), search_area);

    let rows_area = Rect::new(
        inner.x,
        inner.y + 1,
        inner.width,
        inner.height.saturating_sub(1),
    );
    if rows_area.height == 0 {
        return;
    }
    let capacity = rows_area.height as usize;
    let end = (main.scroll + capacity).min(overlay.entries.len());
    let hovered = overlay.hovered_main_row();
    let mut items: Vec<ListItem> = Vec::new();
    for row in main.scroll..end {
        let entry = &overlay.entries[row];
        let selected = overlay.navigator.cursor == Some(row);
        items.push(main_entry_item(
            entry,
            selected,
            hovered == Some(row),
            rows_area.width as usize,
            theme,
        ));
    }
    if items.is_empty() {
        items.push(ListItem::new(""));
    }
    frame.render_widget(List::new(items), rows_area);
}

fn main_entry_item(
    entry: &Entry,
    selected: bool,
    hovered: bool,
    width: usize,
    theme: &Theme,
) -> ListItem<'static> {
    let (line, mut style) = match entry.kind {
        EntryKind::Header => (
            Line::from(Span::raw(entry.label.clone())),
            Style::default().fg(theme.muted).bg(theme.surface),
        ),
        EntryKind::Folder => {
            let name_width = UnicodeWidthStr::width(entry.label.as_str());
            let pad = width.saturating_sub(name_width + 3);
            (
                Line::from(Span::raw(format!(" {}{}▶", entry.label, " ".repeat(pad)))),
                Style::default().fg(theme.muted).bg(theme.surface),
            )
        }
        EntryKind::Clip => (
            Line::from(Span::raw(format!(" ◦ {}", entry.label))),
            Style::default().fg(theme.text).bg(theme.surface),
        ),
        EntryKind::Snippet => (
            Line::from(Span::raw(format!(" · {}", entry.label))),
            Style::default().fg(theme.text).bg(theme.surface),
        ),
    };
    if selected {
        style = Style::default()
            .bg(theme.highlight)
            .fg(theme.highlight_text)
            .add_modifier(Modifier::BOLD);
    } else if hovered {
        style = style.bg(theme.hover);
    }
    ListItem::new(line).style(style)
}

fn render_submenu(frame: &mut Frame, sub: &SubmenuSurface, theme: &Theme) {
    frame.render_widget(Clear, sub.rect);
    let block = Block::default()
        .title(sub.title.clone())
        .borders(Borders::ALL)
        .style(Style::default().bg(theme.surface).fg(theme.text))
        .border_style(Style::default().fg(theme.border));
    let inner = block.inner(sub.rect);
    frame.render_widget(block, sub.rect);
    if inner.width == 0 || inner.height == 0 {
        return;
    }

    let capacity = inner.height as usize;
    let end = (sub.scroll + capacity).min(sub.entries.len());
    let mut items: Vec<ListItem> = Vec::new();
    for row in sub.scroll..end {
        let entry = &sub.entries[row];
        let mut style = Style::default().fg(theme.text).bg(theme.surface);
        if sub.hover == Some(row) {
            style = Style::default().bg(theme.highlight).fg(theme.highlight_text);
        }
        items.push(ListItem::new(Line::from(format!(" {}", entry.label))).style(style));
    }
    if items.is_empty() {
        items.push(ListItem::new(""));
    }
    frame.render_widget(List::new(items), inner);
}

fn render_tooltip(frame: &mut Frame, tip: &TooltipSurface, theme: &Theme) {
    frame.render_widget(Clear, tip.rect);
    let block = Block::default()
        .borders(Borders::ALL)
        .style(Style::default().bg(theme.surface))
        .border_style(Style::default().fg(theme.border));
    let inner = block.inner(tip.rect);
    frame.render_widget(block, tip.rect);
    let lines: Vec<Line> = tip
        .lines
        .iter()
        .map(|line| Line::from(Span::styled(line.clone(), Style::default().fg(theme.muted))))
        .collect();
    frame.render_widget(Paragraph::new(lines), inner);
}

fn paste_worker(rx: Receiver<PasteRequest>, tx: Sender<PasteOutcome>) {
    while let Ok(request) = rx.recv() {
        let outcome = deliver_paste(&request);
        if tx.send(outcome).is_err() {
            break;
        }
    }
}

fn deliver_paste(request: &PasteRequest) -> PasteOutcome {
    let child = Command::new("sh")
        .arg("-c")
        .arg(&request.command)
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn();
    let mut child = match child {
        Ok(child) => child,
        Err(err) => {
            return PasteOutcome::Failed {
                detail: format!("Unable to start paste command: {err}"),
            }
        }
    };
    if let Some(stdin) = child.stdin.as_mut() {
        if let Err(err) = stdin.write_all(request.content.as_bytes()) {
            let _ = child.wait();
            return PasteOutcome::Failed {
                detail: format!("Unable to write to paste command: {err}"),
            };
        }
    }
    drop(child.stdin.take());
    match child.wait() {
        Ok(status) if status.success() => PasteOutcome::Delivered {
            source_id: request.source_id,
            snippet: request.snippet,
        },
        Ok(status) => PasteOutcome::Failed {
            detail: format!("Paste command exited with status {:?}", status.code()),
        },
        Err(err) => PasteOutcome::Failed {
            detail: format!("Paste command failed: {err}"),
        },
    }
}

#[derive(Debug, Error)]
#[error("content store unavailable: {0}")]
struct ProviderUnavailable(String);

#[derive(Clone, Debug)]
struct Clip {
    id: i64,
    content: String,
    #[allow(dead_code)]
    created_at: DateTime<Utc>,
}

#[derive(Clone, Debug)]
struct Folder {
    id: i64,
    name: String,
}

#[derive(Clone, Debug)]
struct Snippet {
    id: i64,
    title: String,
    content: String,
}

trait ContentProvider {
    fn list_history(&self, search: Option<&str>) -> Result<Vec<Clip>, ProviderUnavailable>;
    fn list_folders(&self) -> Result<Vec<Folder>, ProviderUnavailable>;
    fn list_snippets(
        &self,
        folder_id: Option<i64>,
        search: Option<&str>,
    ) -> Result<Vec<Snippet>, ProviderUnavailable>;
    fn list_all_snippets(&self, search: &str) -> Result<Vec<Snippet>, ProviderUnavailable>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum MenuMode {
    All,
    History,
    Snippets,
}

impl MenuMode {
    fn label(self) -> &'static str {
        match self {
            MenuMode::All => "History + Snippets",
            MenuMode::History => "Clipboard History",
            MenuMode::Snippets => "Snippets",
        }
    }

    fn includes_history(self) -> bool {
        matches!(self, MenuMode::All | MenuMode::History)
    }

    fn includes_snippets(self) -> bool {
        matches!(self, MenuMode::All | MenuMode::Snippets)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum EntryKind {
    Header,
    Folder,
    Clip,
    Snippet,
}

#[derive(Clone, Debug)]
struct Entry {
    kind: EntryKind,
    id: Option<i64>,
    label: String,
    content: String,
}

impl Entry {
    fn header(label: impl Into<String>) -> Self {
        Entry {
            kind: EntryKind::Header,
            id: None,
            label: label.into(),
            content: String::new(),
        }
    }

    fn placeholder(message: &str) -> Self {
        Entry::header(message)
    }

    fn folder(id: i64, label: String) -> Self {
        Entry {
            kind: EntryKind::Folder,
            id: Some(id),
            label,
            content: String::new(),
        }
    }

    fn clip(id: i64, label: String, content: String) -> Self {
        Entry {
            kind: EntryKind::Clip,
            id: Some(id),
            label,
            content,
        }
    }

    fn snippet(id: i64, label: String, content: String) -> Self {
        Entry {
            kind: EntryKind::Snippet,
            id: Some(id),
            label,
            content,
        }
    }

    fn selectable(&self) -> bool {
        matches!(self.kind, EntryKind::Clip | EntryKind::Snippet)
    }
}

fn empty_message(mode: MenuMode, searching: bool) -> &'static str {
    if searching {
        return "No results found";
    }
    match mode {
        MenuMode::All | MenuMode::History => "Clipboard is empty",
        MenuMode::Snippets => "No snippets registered",
    }
}

fn build_entries(provider: &dyn ContentProvider, mode: MenuMode, search: &str) -> Vec<Entry> {
    let trimmed = search.trim();
    let query = (!trimmed.is_empty()).then_some(trimmed);
    let mut entries = Vec::new();

    if mode.includes_history() {
        let clips = provider.list_history(query).unwrap_or_else(|err| {
            warn!("history read failed: {err}");
            Vec::new()
        });
        if !clips.is_empty() {
            entries.push(Entry::header("CLIPBOARD HISTORY"));
            for clip in clips {
                let label = truncate_label(&clip.content, LABEL_WIDTH);
                entries.push(Entry::clip(clip.id, label, clip.content));
            }
        }
    }

    if mode.includes_snippets() {
        let mut section: Vec<Entry> = Vec::new();
        if let Some(query) = query {
            match provider.list_all_snippets(query) {
                Ok(snippets) => {
                    for snippet in snippets {
                        let label = truncate_label(&snippet.title, LABEL_WIDTH);
                        section.push(Entry::snippet(snippet.id, label, snippet.content));
                    }
                }
                Err(err) => warn!("snippet search failed: {err}"),
            }
        } else {
            let folders = provider.list_folders().unwrap_or_else(|err| {
                warn!("folder read failed: {err}");
                Vec::new()
            });
            for folder in folders {
                match provider.list_snippets(Some(folder.id), None) {
                    Ok(children) if !children.is_empty() => {
                        section.push(Entry::folder(
                            folder.id,
                            truncate_label(&folder.name, LABEL_WIDTH),
                        ));
                    }
                    Ok(_) => {}
                    Err(err) => warn!("folder contents read failed: {err}"),
                }
            }
            match provider.list_snippets(None, None) {
                Ok(roots) => {
                    for snippet in roots {
                        let label = truncate_label(&snippet.title, LABEL_WIDTH);
                        section.push(Entry::snippet(snippet.id, label, snippet.content));
                    }
                }
                Err(err) => warn!("root snippet read failed: {err}"),
            }
        }
        if !section.is_empty() {
            entries.push(Entry::header("SNIPPETS"));
            entries.append(&mut section);
        }
    }

    if entries.is_empty() {
        entries.push(Entry::placeholder(empty_message(mode, query.is_some())));
    }
    entries
}

fn truncate_width(text: &str, max_width: usize) -> String {
    if UnicodeWidthStr::width(text) <= max_width {
        return text.to_string();
    }
    let mut out = String::new();
    let mut width = 0usize;
    for c in text.chars() {
        let char_width = UnicodeWidthChar::width(c).unwrap_or(0);
        if width + char_width > max_width.saturating_sub(1) {
            break;
        }
        out.push(c);
        width += char_width;
    }
    out.push('…');
    out
}

fn truncate_label(text: &str, max_width: usize) -> String {
    let flattened: String = text
        .chars()
        .map(|c| if matches!(c, '\n' | '\r' | '\t') { ' ' } else { c })
        .collect();
    truncate_width(flattened.trim(), max_width)
}

fn preview_lines(content: &str) -> Vec<String> {
    let mut lines: Vec<String> = content
        .lines()
        .take(PREVIEW_MAX_LINES)
        .map(|line| truncate_width(line, PREVIEW_LINE_WIDTH))
        .collect();
    if content.lines().count() > PREVIEW_MAX_LINES {
        lines.push("…".to_string());
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

#[derive(Default)]
struct Debounce {
    deadline: Option<Instant>,
    generation: u64,
}

impl Debounce {
    fn arm(&mut self, now: Instant, delay: Duration) -> u64 {
        self.generation = self.generation.wrapping_add(1);
        self.deadline = Some(now + delay);
        self.generation
    }

    fn cancel(&mut self) {
        self.generation = self.generation.wrapping_add(1);
        self.deadline = None;
    }

    fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    fn fire(&mut self, now: Instant) -> Option<u64> {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                Some(self.generation)
            }
            _ => None,
        }
    }
}

#[derive(Default)]
struct Navigator {
    cursor: Option<usize>,
}

impl Navigator {
    fn reset(&mut self, entries: &[Entry]) {
        self.cursor = entries.iter().position(Entry::selectable);
    }

    fn clear(&mut self) {
        self.cursor = None;
    }

    fn move_by(&mut self, entries: &[Entry], delta: isize) {
        let selectable: Vec<usize> = entries
            .iter()
            .enumerate()
            .filter(|(_, entry)| entry.selectable())
            .map(|(index, _)| index)
            .collect();
        if selectable.is_empty() {
            self.cursor = None;
            return;
        }
        let position = self
            .cursor
            .and_then(|current| selectable.iter().position(|&index| index == current));
        let next = match position {
            Some(position) => {
                let count = selectable.len() as isize;
                selectable[(position as isize + delta).rem_euclid(count) as usize]
            }
            None if delta < 0 => *selectable.last().unwrap(),
            None => selectable[0],
        };
        self.cursor = Some(next);
    }

    fn select(&mut self, entries: &[Entry], index: usize) {
        if entries.get(index).map_or(false, Entry::selectable) {
            self.cursor = Some(index);
        }
    }

    fn current<'a>(&self, entries: &'a [Entry]) -> Option<&'a Entry> {
        self.cursor
            .and_then(|index| entries.get(index))
            .filter(|entry| entry.selectable())
    }
}

fn rect_contains(rect: Rect, x: u16, y: u16) -> bool {
    x >= rect.x && x < rect.x + rect.width && y >= rect.y && y < rect.y + rect.height
}

fn add_scroll(current: usize, delta: isize, max: usize) -> usize {
    if delta < 0 {
        current.saturating_sub(delta.unsigned_abs())
    } else {
        (current + delta as usize).min(max)
    }
}

fn main_surface_height(entry_count: usize) -> u16 {
    entry_count.clamp(1, MAIN_MAX_ROWS) as u16 + 3
}

fn submenu_height(entry_count: usize) -> u16 {
    entry_count.clamp(1, SUB_MAX_ROWS) as u16 + 2
}

fn anchor_main(pointer: (u16, u16), screen: Rect, height: u16) -> Rect {
    let width = MAIN_W.min(screen.width);
    let height = height.min(screen.height);
    let max_x = screen.width.saturating_sub(width + EDGE_MARGIN);
    let max_y = screen.height.saturating_sub(height + BOTTOM_MARGIN);
    let x = pointer.0.min(max_x).max(EDGE_MARGIN.min(max_x));
    let y = pointer.1.min(max_y).max(TOP_MARGIN.min(max_y));
    Rect::new(x, y, width, height)
}

fn place_beside(parent: Rect, anchor_y: u16, width: u16, height: u16, screen: Rect) -> Rect {
    let width = width.min(screen.width);
    let height = height
        .min(screen.height.saturating_sub(TOP_MARGIN + BOTTOM_MARGIN))
        .max(1);
    let right = parent.x.saturating_add(parent.width);
    let x = if right.saturating_add(width) <= screen.width.saturating_sub(EDGE_MARGIN) {
        right
    } else {
        parent.x.saturating_sub(width)
    };
    let bottom_limit = screen.height.saturating_sub(BOTTOM_MARGIN);
    let mut y = anchor_y;
    if y.saturating_add(height) > bottom_limit {
        y = bottom_limit.saturating_sub(height);
    }
    if y < TOP_MARGIN {
        y = TOP_MARGIN;
    }
    Rect::new(x, y, width, height)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum CascadePhase {
    Closed,
    PendingOpen,
    Open,
    PendingClose,
}

struct PendingFolder {
    folder_id: i64,
    name: String,
    anchor_y: u16,
    token: u64,
}

struct PendingTooltip {
    row: usize,
    anchor_y: u16,
    token: u64,
}

struct SubmenuSurface {
    folder_id: i64,
    title: String,
    entries: Vec<Entry>,
    rect: Rect,
    scroll: usize,
    hover: Option<usize>,
}

impl SubmenuSurface {
    fn capacity(&self) -> usize {
        self.rect.height.saturating_sub(2) as usize
    }

    fn row_at(&self, x: u16, y: u16) -> Option<usize> {
        let inner = Rect::new(
            self.rect.x + 1,
            self.rect.y + 1,
            self.rect.width.saturating_sub(2),
            self.rect.height.saturating_sub(2),
        );
        if !rect_contains(inner, x, y) {
            return None;
        }
        let row = self.scroll + (y - inner.y) as usize;
        (row < self.entries.len()).then_some(row)
    }

    fn row_screen_y(&self, row: usize) -> Option<u16> {
        if row < self.scroll {
            return None;
        }
        let offset = row - self.scroll;
        if offset >= self.capacity() {
            return None;
        }
        Some(self.rect.y + 1 + offset as u16)
    }
}

struct TooltipSurface {
    rect: Rect,
    lines: Vec<String>,
}

#[derive(Default)]
struct CascadeManager {
    pending_open: Option<PendingFolder>,
    open_timer: Debounce,
    submenu: Option<SubmenuSurface>,
    close_timer: Debounce,
    tooltip: Option<TooltipSurface>,
    tooltip_timer: Debounce,
    pending_tooltip: Option<PendingTooltip>,
}

impl CascadeManager {
    fn phase(&self) -> CascadePhase {
        if self.submenu.is_some() {
            if self.close_timer.is_armed() {
                CascadePhase::PendingClose
            } else {
                CascadePhase::Open
            }
        } else if self.pending_open.is_some() {
            CascadePhase::PendingOpen
        } else {
            CascadePhase::Closed
        }
    }

    fn hover_folder(&mut self, folder_id: i64, name: &str, anchor_y: u16, now: Instant) {
        if let Some(sub) = &self.submenu {
            if sub.folder_id == folder_id {
                self.close_timer.cancel();
                self.pending_open = None;
                self.open_timer.cancel();
                return;
            }
            self.close_submenu();
        }
        let token = self.open_timer.arm(now, HOVER_OPEN_DELAY);
        self.pending_open = Some(PendingFolder {
            folder_id,
            name: name.to_string(),
            anchor_y,
            token,
        });
    }

    fn hover_plain_row(&mut self) {
        self.pending_open = None;
        self.open_timer.cancel();
        if self.submenu.is_some() {
            self.close_submenu();
        }
    }

    fn pointer_left_rows(&mut self, now: Instant) {
        self.pending_open = None;
        self.open_timer.cancel();
        if self.submenu.is_some() && !self.close_timer.is_armed() {
            self.close_timer.arm(now, SUBMENU_CLOSE_DELAY);
            debug!(phase = ?self.phase(), "pointer left trigger region");
        }
    }

    fn pointer_entered_submenu(&mut self) {
        self.close_timer.cancel();
    }

    fn hover_submenu_row(&mut self, row: usize, now: Instant) {
        self.close_timer.cancel();
        let anchor_y = match self.submenu.as_mut() {
            Some(sub) => {
                sub.hover = Some(row);
                sub.row_screen_y(row)
            }
            None => return,
        };
        self.hide_tooltip();
        if let Some(anchor_y) = anchor_y {
            let token = self.tooltip_timer.arm(now, TOOLTIP_DELAY);
            self.pending_tooltip = Some(PendingTooltip {
                row,
                anchor_y,
                token,
            });
        }
    }

    fn leave_submenu_row(&mut self) {
        if let Some(sub) = self.submenu.as_mut() {
            sub.hover = None;
        }
        self.hide_tooltip();
    }

    fn click_folder(
        &mut self,
        folder_id: i64,
        name: &str,
        anchor_y: u16,
        main_rect: Rect,
        screen: Rect,
        provider: &dyn ContentProvider,
    ) {
        self.pending_open = None;
        self.open_timer.cancel();
        if let Some(sub) = &self.submenu {
            if sub.folder_id == folder_id {
                self.close_timer.cancel();
                return;
            }
            self.close_submenu();
        }
        self.open_submenu(folder_id, name.to_string(), anchor_y, main_rect, screen, provider);
    }

    fn on_tick(
        &mut self,
        now: Instant,
        pointer: Option<(u16, u16)>,
        main_rect: Option<Rect>,
        screen: Rect,
        provider: &dyn ContentProvider,
    ) {
        if let Some(token) = self.open_timer.fire(now) {
            if let Some(pending) = self.pending_open.take() {
                if pending.token == token {
                    if let Some(main_rect) = main_rect {
                        self.open_submenu(
                            pending.folder_id,
                            pending.name,
                            pending.anchor_y,
                            main_rect,
                            screen,
                            provider,
                        );
                    }
                } else {
                    debug!("stale submenu open timer ignored");
                }
            }
        }
        if self.close_timer.fire(now).is_some() {
            let held = pointer.map_or(false, |(x, y)| {
                main_rect.map_or(false, |rect| rect_contains(rect, x, y))
                    || self
                        .submenu
                        .as_ref()
                        .map_or(false, |sub| rect_contains(sub.rect, x, y))
            });
            if held {
                self.close_timer.arm(now, SUBMENU_CLOSE_DELAY);
            } else {
                self.close_submenu();
            }
        }
        if let Some(token) = self.tooltip_timer.fire(now) {
            if let Some(pending) = self.pending_tooltip.take() {
                if pending.token == token {
                    self.show_tooltip(pending.row, pending.anchor_y, screen);
                } else {
                    debug!("stale tooltip timer ignored");
                }
            }
        }
    }

    fn open_submenu(
        &mut self,
        folder_id: i64,
        title: String,
        anchor_y: u16,
        main_rect: Rect,
        screen: Rect,
        provider: &dyn ContentProvider,
    ) {
        let children = match provider.list_snippets(Some(folder_id), None) {
            Ok(children) => children,
            Err(err) => {
                warn!("submenu read failed: {err}");
                Vec::new()
            }
        };
        if children.is_empty() {
            debug!(folder_id, "folder has no snippets, submenu suppressed");
            return;
        }
        self.hide_tooltip();
        let entries: Vec<Entry> = children
            .into_iter()
            .map(|snippet| {
                let label = truncate_label(&snippet.title, SUB_LABEL_WIDTH);
                Entry::snippet(snippet.id, label, snippet.content)
            })
            .collect();
        let height = submenu_height(entries.len());
        let rect = place_beside(main_rect, anchor_y, SUB_W, height, screen);
        self.close_timer.cancel();
        self.submenu = Some(SubmenuSurface {
            folder_id,
            title,
            entries,
            rect,
            scroll: 0,
            hover: None,
        });
    }

    fn show_tooltip(&mut self, row: usize, anchor_y: u16, screen: Rect) {
        let Some(sub) = &self.submenu else {
            return;
        };
        let Some(entry) = sub.entries.get(row) else {
            return;
        };
        let lines = preview_lines(&entry.content);
        let longest = lines
            .iter()
            .map(|line| UnicodeWidthStr::width(line.as_str()))
            .max()
            .unwrap_or(0);
        let width = (longest as u16).saturating_add(2).min(screen.width);
        let height = lines.len() as u16 + 2;
        let rect = place_beside(sub.rect, anchor_y, width, height, screen);
        self.tooltip = Some(TooltipSurface { rect, lines });
    }

    fn scroll_submenu(&mut self, delta: isize) {
        if let Some(sub) = &mut self.submenu {
            let max_scroll = sub.entries.len().saturating_sub(sub.capacity());
            sub.scroll = add_scroll(sub.scroll, delta, max_scroll);
        }
    }

    fn close_submenu(&mut self) {
        self.submenu = None;
        self.hide_tooltip();
        self.close_timer.cancel();
    }

    fn hide_tooltip(&mut self) {
        self.tooltip = None;
        self.pending_tooltip = None;
        self.tooltip_timer.cancel();
    }

    fn close_all(&mut self) {
        self.pending_open = None;
        self.open_timer.cancel();
        self.close_submenu();
    }
}

struct DismissalMonitor {
    focused: bool,
    grace: Debounce,
}

impl DismissalMonitor {
    fn new() -> Self {
        DismissalMonitor {
            focused: true,
            grace: Debounce::default(),
        }
    }

    fn focus_lost(&mut self, now: Instant) {
        self.focused = false;
        self.grace.arm(now, FOCUS_GRACE_DELAY);
    }

    fn focus_gained(&mut self) {
        self.focused = true;
    }

    fn reset(&mut self) {
        self.focused = true;
        self.grace.cancel();
    }

    fn should_dismiss(&mut self, now: Instant) -> bool {
        self.grace.fire(now).is_some() && !self.focused
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Hit {
    MainRow(usize),
    MainChrome,
    SubmenuRow(usize),
    SubmenuChrome,
    Tooltip,
    Outside,
}

struct MainSurface {
    rect: Rect,
    scroll: usize,
}

impl MainSurface {
    fn capacity(&self) -> usize {
        self.rect.height.saturating_sub(3) as usize
    }

    fn rows_area(&self) -> Rect {
        Rect::new(
            self.rect.x + 1,
            self.rect.y + 2,
            self.rect.width.saturating_sub(2),
            self.rect.height.saturating_sub(3),
        )
    }

    fn row_at(&self, x: u16, y: u16, entry_count: usize) -> Option<usize> {
        let rows = self.rows_area();
        if !rect_contains(rows, x, y) {
            return None;
        }
        let row = self.scroll + (y - rows.y) as usize;
        (row < entry_count).then_some(row)
    }
}

#[derive(Clone, Debug)]
struct Activation {
    content: String,
    source_id: Option<i64>,
    kind: EntryKind,
}

enum ClickOutcome {
    None,
    Activated(Activation),
    Dismissed,
}

struct OverlayController {
    mode: MenuMode,
    search: String,
    entries: Vec<Entry>,
    navigator: Navigator,
    main: Option<MainSurface>,
    cascade: CascadeManager,
    dismissal: DismissalMonitor,
    search_timer: Debounce,
    last_hover: Hit,
}

impl OverlayController {
    fn new(mode: MenuMode) -> Self {
        OverlayController {
            mode,
            search: String::new(),
            entries: Vec::new(),
            navigator: Navigator::default(),
            main: None,
            cascade: CascadeManager::default(),
            dismissal: DismissalMonitor::new(),
            search_timer: Debounce::default(),
            last_hover: Hit::Outside,
        }
    }

    fn is_visible(&self) -> bool {
        self.main.is_some()
    }

    fn show(
        &mut self,
        provider: &dyn ContentProvider,
        mode: MenuMode,
        screen: Rect,
        pointer: Option<(u16, u16)>,
    ) {
        if self.is_visible() {
            if self.mode == mode {
                self.dismissal.reset();
                return;
            }
            self.hide();
        }
        self.mode = mode;
        self.search.clear();
        self.entries = build_entries(provider, mode, "");
        self.navigator.reset(&self.entries);
        let height = main_surface_height(self.entries.len());
        let anchor = pointer.unwrap_or((screen.width / 2, screen.height / 3));
        self.main = Some(MainSurface {
            rect: anchor_main(anchor, screen, height),
            scroll: 0,
        });
        self.dismissal.reset();
        self.last_hover = Hit::Outside;
        info!(?mode, "overlay shown");
    }

    fn hide(&mut self) {
        self.main = None;
        self.entries.clear();
        self.navigator.clear();
        self.search.clear();
        self.cascade.close_all();
        self.search_timer.cancel();
        self.dismissal.reset();
        self.last_hover = Hit::Outside;
    }

    fn rebuild(&mut self, provider: &dyn ContentProvider, screen: Rect) {
        self.cascade.close_all();
        self.entries = build_entries(provider, self.mode, &self.search);
        self.navigator.reset(&self.entries);
        if let Some(main) = &mut self.main {
            let height = main_surface_height(self.entries.len());
            main.rect = anchor_main((main.rect.x, main.rect.y), screen, height);
            main.scroll = 0;
        }
        debug!(mode = ?self.mode, search = %self.search, "entries rebuilt");
    }

    fn search_input(&mut self, c: char, now: Instant) {
        if !self.is_visible() || c.is_control() {
            return;
        }
        self.search.push(c);
        self.search_timer.arm(now, SEARCH_DEBOUNCE);
    }

    fn search_backspace(&mut self, now: Instant) {
        if !self.is_visible() || self.search.pop().is_none() {
            return;
        }
        self.search_timer.arm(now, SEARCH_DEBOUNCE);
    }

    fn move_selection(&mut self, delta: isize) {
        self.navigator.move_by(&self.entries, delta);
        self.ensure_selection_visible();
    }

    fn ensure_selection_visible(&mut self) {
        let (Some(row), Some(main)) = (self.navigator.cursor, self.main.as_mut()) else {
            return;
        };
        let capacity = main.capacity();
        if capacity == 0 {
            return;
        }
        if row < main.scroll {
            main.scroll = row;
        } else if row >= main.scroll + capacity {
            main.scroll = row + 1 - capacity;
        }
    }

    fn activate_current(&mut self) -> Option<Activation> {
        let activation = match self.navigator.current(&self.entries) {
            Some(entry) => Activation {
                content: entry.content.clone(),
                source_id: entry.id,
                kind: entry.kind,
            },
            None => {
                debug!("activate with no selectable entry ignored");
                return None;
            }
        };
        self.hide();
        Some(activation)
    }

    fn activate_submenu_row(&mut self, row: usize) -> Option<Activation> {
        let entry = self.cascade.submenu.as_ref()?.entries.get(row)?;
        let activation = Activation {
            content: entry.content.clone(),
            source_id: entry.id,
            kind: entry.kind,
        };
        self.hide();
        Some(activation)
    }

    fn pointer_moved(&mut self, pos: (u16, u16), now: Instant) {
        if !self.is_visible() {
            return;
        }
        let hit = self.hit_test(pos);
        if hit == self.last_hover {
            return;
        }
        let prev = self.last_hover;
        self.last_hover = hit;

        if matches!(prev, Hit::SubmenuRow(_)) && !matches!(hit, Hit::SubmenuRow(_)) {
            self.cascade.leave_submenu_row();
        }

        match hit {
            Hit::MainRow(row) => {
                let (kind, folder_id, label) = match self.entries.get(row) {
                    Some(entry) => (entry.kind, entry.id, entry.label.clone()),
                    None => return,
                };
                match kind {
                    EntryKind::Folder => {
                        if let Some(folder_id) = folder_id {
                            let anchor = self.main_row_screen_y(row).unwrap_or(pos.1);
                            self.cascade.hover_folder(folder_id, &label, anchor, now);
                        }
                    }
                    EntryKind::Clip | EntryKind::Snippet => {
                        self.navigator.select(&self.entries, row);
                        self.cascade.hover_plain_row();
                    }
                    EntryKind::Header => self.cascade.pointer_left_rows(now),
                }
            }
            Hit::MainChrome => self.cascade.pointer_left_rows(now),
            Hit::SubmenuRow(row) => self.cascade.hover_submenu_row(row, now),
            Hit::SubmenuChrome => self.cascade.pointer_entered_submenu(),
            Hit::Tooltip => {}
            Hit::Outside => self.cascade.pointer_left_rows(now),
        }
    }

    fn pointer_click(
        &mut self,
        pos: (u16, u16),
        screen: Rect,
        provider: &dyn ContentProvider,
    ) -> ClickOutcome {
        if !self.is_visible() {
            return ClickOutcome::None;
        }
        match self.hit_test(pos) {
            Hit::MainRow(row) => {
                let (kind, folder_id, label) = match self.entries.get(row) {
                    Some(entry) => (entry.kind, entry.id, entry.label.clone()),
                    None => return ClickOutcome::None,
                };
                match kind {
                    EntryKind::Folder => {
                        let anchor = self.main_row_screen_y(row).unwrap_or(pos.1);
                        let main_rect = self.main.as_ref().map(|main| main.rect);
                        if let (Some(folder_id), Some(main_rect)) = (folder_id, main_rect) {
                            self.cascade.click_folder(
                                folder_id, &label, anchor, main_rect, screen, provider,
                            );
                        }
                        ClickOutcome::None
                    }
                    EntryKind::Clip | EntryKind::Snippet => {
                        self.navigator.select(&self.entries, row);
                        match self.activate_current() {
                            Some(activation) => ClickOutcome::Activated(activation),
                            None => ClickOutcome::None,
                        }
                    }
                    EntryKind::Header => ClickOutcome::None,
                }
            }
            Hit::SubmenuRow(row) => match self.activate_submenu_row(row) {
                Some(activation) => ClickOutcome::Activated(activation),
                None => ClickOutcome::None,
            },
            Hit::MainChrome | Hit::SubmenuChrome | Hit::Tooltip => ClickOutcome::None,
            Hit::Outside => {
                self.hide();
                ClickOutcome::Dismissed
            }
        }
    }

    fn scroll_surface(&mut self, pos: (u16, u16), delta: isize) {
        match self.hit_test(pos) {
            Hit::MainRow(_) | Hit::MainChrome => {
                let count = self.entries.len();
                if let Some(main) = &mut self.main {
                    let max_scroll = count.saturating_sub(main.capacity());
                    main.scroll = add_scroll(main.scroll, delta, max_scroll);
                }
            }
            Hit::SubmenuRow(_) | Hit::SubmenuChrome => self.cascade.scroll_submenu(delta),
            Hit::Tooltip | Hit::Outside => {}
        }
    }

    fn focus_lost(&mut self, now: Instant) {
        if self.is_visible() {
            self.dismissal.focus_lost(now);
        }
    }

    fn focus_gained(&mut self) {
        self.dismissal.focus_gained();
    }

    fn handle_resize(&mut self, screen: Rect) {
        if let Some(main) = &mut self.main {
            let height = main_surface_height(self.entries.len());
            main.rect = anchor_main((main.rect.x, main.rect.y), screen, height);
        }
        self.cascade.close_all();
    }

    fn on_tick(
        &mut self,
        now: Instant,
        screen: Rect,
        pointer: Option<(u16, u16)>,
        provider: &dyn ContentProvider,
    ) {
        if !self.is_visible() {
            return;
        }
        if self.search_timer.fire(now).is_some() {
            self.rebuild(provider, screen);
        }
        let main_rect = self.main.as_ref().map(|main| main.rect);
        self.cascade.on_tick(now, pointer, main_rect, screen, provider);
        if self.dismissal.should_dismiss(now) {
            debug!("focus not regained within grace period, dismissing overlay");
            self.hide();
        }
    }

    fn hit_test(&self, (x, y): (u16, u16)) -> Hit {
        if let Some(tip) = &self.cascade.tooltip {
            if rect_contains(tip.rect, x, y) {
                return Hit::Tooltip;
            }
        }
        if let Some(sub) = &self.cascade.submenu {
            if rect_contains(sub.rect, x, y) {
                return match sub.row_at(x, y) {
                    Some(row) => Hit::SubmenuRow(row),
                    None => Hit::SubmenuChrome,
                };
            }
        }
        if let Some(main) = &self.main {
            if rect_contains(main.rect, x, y) {
                return match main.row_at(x, y, self.entries.len()) {
                    Some(row) => Hit::MainRow(row),
                    None => Hit::MainChrome,
                };
            }
        }
        Hit::Outside
    }

    fn main_row_screen_y(&self, row: usize) -> Option<u16> {
        let main = self.main.as_ref()?;
        if row < main.scroll {
            return None;
        }
        let offset = row - main.scroll;
        if offset >= main.capacity() {
            return None;
        }
        Some(main.rect.y + 2 + offset as u16)
    }

    fn hovered_main_row(&self) -> Option<usize> {
        match self.last_hover {
            Hit::MainRow(row) => Some(row),
            _ => None,
        }
    }
}

struct AppPaths {
    store_file: PathBuf,
    theme_file: PathBuf,
    log_file: PathBuf,
}

impl AppPaths {
    fn new() -> Result<Self> {
        let home = dirs::home_dir().context("Unable to determine home directory")?;
        let config_dir = home.join(".local/clip-menu");
        fs::create_dir_all(&config_dir)?;
        Ok(Self {
            store_file: config_dir.join("store.json"),
            theme_file: config_dir.join("theme.json"),
            log_file: config_dir.join("clip-menu.log"),
        })
    }
}

struct PasteRequest {
    content: String,
    source_id: Option<i64>,
    snippet: bool,
    command: String,
}

enum PasteOutcome {
    Delivered {
        source_id: Option<i64>,
        snippet: bool,
    },
    Failed {
        detail: String,
    },
}

struct AppState {
    store: JsonStore,
    theme: Theme,
    overlay: OverlayController,
    default_mode: MenuMode,
    title: String,
    last_pointer: Option<(u16, u16)>,
    pending_paste: Option<PasteRequest>,
    paste_tx: Sender<PasteRequest>,
    outcome_rx: Receiver<PasteOutcome>,
    status_message: Option<String>,
    should_quit: bool,
    exit_output: Option<String>,
}

impl AppState {
    fn new(paths: AppPaths, mode: MenuMode) -> Result<Self> {
        let store = JsonStore::load(&paths.store_file)?;
        let theme = Theme::load(&paths.theme_file, &store.settings().theme)?;
        let (paste_tx, request_rx) = mpsc::channel();
        let (outcome_tx, outcome_rx) = mpsc::channel();
        thread::spawn(move || paste_worker(request_rx, outcome_tx));
        Ok(AppState {
            store,
            theme,
            overlay: OverlayController::new(mode),
            default_mode: mode,
            title: "clip-menu".into(),
            last_pointer: None,
            pending_paste: None,
            paste_tx,
            outcome_rx,
            status_message: None,
            should_quit: false,
            exit_output: None,
        })
    }

    fn handle_key(&mut self, key: KeyEvent, screen: Rect) {
        if self.overlay.is_visible() {
            match key.code {
                KeyCode::Esc => self.overlay.hide(),
                KeyCode::Enter => {
                    if let Some(activation) = self.overlay.activate_current() {
                        self.queue_activation(activation);
                    }
                }
                KeyCode::Up => self.overlay.move_selection(-1),
                KeyCode::Down => self.overlay.move_selection(1),
                KeyCode::Backspace => self.overlay.search_backspace(Instant::now()),
                KeyCode::Char(c) => {
                    if key.modifiers.contains(KeyModifiers::CONTROL) {
                        if c == 'c' {
                            self.should_quit = true;
                        }
                    } else {
                        self.overlay.search_input(c, Instant::now());
                    }
                }
                _ => {}
            }
            return;
        }
        match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.should_quit = true;
            }
            KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Char(' ') | KeyCode::Enter => self.show_overlay(self.default_mode, screen),
            KeyCode::Char('a') => self.show_overlay(MenuMode::All, screen),
            KeyCode::Char('h') => self.show_overlay(MenuMode::History, screen),
            KeyCode::Char('s') => self.show_overlay(MenuMode::Snippets, screen),
            KeyCode::Char('r') => match self.store.reload() {
                Ok(()) => self.set_status(Some("Store reloaded".into())),
                Err(err) => self.set_status(Some(format!("Reload failed: {err}"))),
            },
            _ => {}
        }
    }

    fn handle_mouse(&mut self, mouse: MouseEvent, screen: Rect) {
        self.last_pointer = Some((mouse.column, mouse.row));
        if !self.overlay.is_visible() {
            return;
        }
        match mouse.kind {
            MouseEventKind::Moved | MouseEventKind::Drag(_) => {
                self.overlay
                    .pointer_moved((mouse.column, mouse.row), Instant::now());
            }
            MouseEventKind::Down(MouseButton::Left) => {
                match self
                    .overlay
                    .pointer_click((mouse.column, mouse.row), screen, &self.store)
                {
                    ClickOutcome::Activated(activation) => self.queue_activation(activation),
                    ClickOutcome::Dismissed | ClickOutcome::None => {}
                }
            }
            MouseEventKind::ScrollDown => {
                self.overlay.scroll_surface((mouse.column, mouse.row), 1);
            }
            MouseEventKind::ScrollUp => {
                self.overlay.scroll_surface((mouse.column, mouse.row), -1);
            }
            _ => {}
        }
    }

    fn handle_focus_gained(&mut self) {
        self.overlay.focus_gained();
    }

    fn handle_focus_lost(&mut self) {
        self.overlay.focus_lost(Instant::now());
    }

    fn handle_resize(&mut self, screen: Rect) {
        self.overlay.handle_resize(screen);
    }

    fn on_tick(&mut self, now: Instant, screen: Rect) {
        self.overlay
            .on_tick(now, screen, self.last_pointer, &self.store);
        match self.outcome_rx.try_recv() {
            Ok(PasteOutcome::Delivered { source_id, snippet }) => {
                if snippet {
                    if let Some(id) = source_id {
                        if let Err(err) = self.store.increment_snippet_usage(id) {
                            warn!("usage update failed: {err}");
                        }
                    }
                }
                self.set_status(Some("Copied to clipboard".into()));
            }
            Ok(PasteOutcome::Failed { detail }) => {
                warn!("{detail}");
                self.set_status(Some(detail));
            }
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => {}
        }
    }

    fn show_overlay(&mut self, mode: MenuMode, screen: Rect) {
        self.overlay
            .show(&self.store, mode, screen, self.last_pointer);
        self.set_status(None);
    }

    fn queue_activation(&mut self, activation: Activation) {
        let snippet = activation.kind == EntryKind::Snippet;
        let command = self.store.settings().paste_command.clone();
        match command {
            Some(command) => {
                self.pending_paste = Some(PasteRequest {
                    content: activation.content,
                    source_id: activation.source_id,
                    snippet,
                    command,
                });
            }
            None => {
                if snippet {
                    if let Some(id) = activation.source_id {
                        if let Err(err) = self.store.increment_snippet_usage(id) {
                            warn!("usage update failed: {err}");
                        }
                    }
                }
                self.exit_output = Some(activation.content);
                self.should_quit = true;
            }
        }
    }

    fn take_pending_paste(&mut self) -> Option<PasteRequest> {
        self.pending_paste.take()
    }

    fn dispatch_paste(&mut self, request: PasteRequest) {
        if self.paste_tx.send(request).is_err() {
            self.set_status(Some("Paste worker unavailable".into()));
        }
    }

    fn set_status(&mut self, message: Option<String>) {
        self.status_message = message;
    }

    fn status_text(&self) -> String {
        if let Some(message) = &self.status_message {
            return message.clone();
        }
        if self.overlay.is_visible() {
            "↑↓ Move   Enter Paste   Esc Close".into()
        } else {
            "Space Menu | h History | s Snippets | r Reload | q Quit".into()
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct ClipRecord {
    id: i64,
    content: String,
    created_at: DateTime<Utc>,
    #[serde(default)]
    times_used: u32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct FolderRecord {
    id: i64,
    name: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct SnippetRecord {
    id: i64,
    title: String,
    content: String,
    #[serde(default)]
    folder_id: Option<i64>,
    #[serde(default)]
    times_used: u32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct StoreSettings {
    #[serde(default = "default_max_history")]
    max_history: usize,
    #[serde(default = "default_theme_name")]
    theme: String,
    #[serde(default)]
    paste_command: Option<String>,
}

impl Default for StoreSettings {
    fn default() -> Self {
        StoreSettings {
            max_history: default_max_history(),
            theme: default_theme_name(),
            paste_command: None,
        }
    }
}

fn default_max_history() -> usize {
    100
}

fn default_theme_name() -> String {
    "dark".to_string()
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct StoreFile {
    #[serde(default)]
    clips: Vec<ClipRecord>,
    #[serde(default)]
    folders: Vec<FolderRecord>,
    #[serde(default)]
    snippets: Vec<SnippetRecord>,
    #[serde(default)]
    settings: StoreSettings,
    #[serde(default = "default_next_id")]
    next_id: i64,
}

fn default_next_id() -> i64 {
    1
}

impl Default for StoreFile {
    fn default() -> Self {
        StoreFile {
            clips: Vec::new(),
            folders: Vec::new(),
            snippets: Vec::new(),
            settings: StoreSettings::default(),
            next_id: default_next_id(),
        }
    }
}

impl StoreFile {
    fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            let data = fs::read_to_string(path)?;
            let mut parsed: StoreFile = serde_json::from_str(&data)?;
            parsed.normalize();
            Ok(parsed)
        } else {
            let default = Self::default_data();
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(path, serde_json::to_string_pretty(&default)?)?;
            Ok(default)
        }
    }

    fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_string_pretty(self)?;
        fs::write(path, data)?;
        Ok(())
    }

    fn normalize(&mut self) {
        let max_id = self
            .clips
            .iter()
            .map(|clip| clip.id)
            .chain(self.folders.iter().map(|folder| folder.id))
            .chain(self.snippets.iter().map(|snippet| snippet.id))
            .max()
            .unwrap_or(0);
        if self.next_id <= max_id {
            self.next_id = max_id + 1;
        }
    }

    fn default_data() -> Self {
        let folders = vec![FolderRecord {
            id: 1,
            name: "Email".into(),
        }];
        let snippets = vec![
            SnippetRecord {
                id: 2,
                title: "Signature".into(),
                content: "Best regards,\nAlex".into(),
                folder_id: Some(1),
                times_used: 0,
            },
            SnippetRecord {
                id: 3,
                title: "Follow-up".into(),
                content: "Just following up on my previous message.\nAny update on this?".into(),
                folder_id: Some(1),
                times_used: 0,
            },
            SnippetRecord {
                id: 4,
                title: "Shrug".into(),
                content: "¯\\_(ツ)_/¯".into(),
                folder_id: None,
                times_used: 0,
            },
        ];
        StoreFile {
            clips: Vec::new(),
            folders,
            snippets,
            settings: StoreSettings::default(),
            next_id: 5,
        }
    }
}

struct JsonStore {
    path: PathBuf,
    data: StoreFile,
}

impl JsonStore {
    fn load(path: &Path) -> Result<Self> {
        let data = StoreFile::load(path)?;
        Ok(JsonStore {
            path: path.to_path_buf(),
            data,
        })
    }

    fn save(&self) -> Result<()> {
        self.data.save(&self.path)
    }

    fn reload(&mut self) -> Result<()> {
        self.data = StoreFile::load(&self.path)?;
        Ok(())
    }

    fn settings(&self) -> &StoreSettings {
        &self.data.settings
    }

    fn allocate_id(&mut self) -> i64 {
        let id = self.data.next_id;
        self.data.next_id += 1;
        id
    }

    fn add_clip(&mut self, content: &str) {
        if content.trim().is_empty() {
            return;
        }
        if let Some(existing) = self
            .data
            .clips
            .iter_mut()
            .find(|clip| clip.content == content)
        {
            existing.created_at = Utc::now();
            existing.times_used += 1;
            return;
        }
        let id = self.allocate_id();
        self.data.clips.push(ClipRecord {
            id,
            content: content.to_string(),
            created_at: Utc::now(),
            times_used: 0,
        });
        let max_history = self.data.settings.max_history.max(1);
        if self.data.clips.len() > max_history {
            self.data
                .clips
                .sort_by(|a, b| b.created_at.cmp(&a.created_at));
            self.data.clips.truncate(max_history);
        }
    }

    fn increment_snippet_usage(&mut self, id: i64) -> Result<()> {
        if let Some(snippet) = self.data.snippets.iter_mut().find(|s| s.id == id) {
            snippet.times_used += 1;
            self.save()?;
        }
        Ok(())
    }
}

fn matches_query(haystack: &str, query: &str) -> bool {
    haystack.to_lowercase().contains(&query.to_lowercase())
}

fn to_snippet(record: &SnippetRecord) -> Snippet {
    Snippet {
        id: record.id,
        title: record.title.clone(),
        content: record.content.clone(),
    }
}

impl ContentProvider for JsonStore {
    fn list_history(&self, search: Option<&str>) -> Result<Vec<Clip>, ProviderUnavailable> {
        let mut clips: Vec<&ClipRecord> = self
            .data
            .clips
            .iter()
            .filter(|clip| search.map_or(true, |query| matches_query(&clip.content, query)))
            .collect();
        clips.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        clips.truncate(self.data.settings.max_history.max(1));
        Ok(clips
            .into_iter()
            .map(|clip| Clip {
                id: clip.id,
                content: clip.content.clone(),
                created_at: clip.created_at,
            })
            .collect())
    }

    fn list_folders(&self) -> Result<Vec<Folder>, ProviderUnavailable> {
        let mut ranked: Vec<(u64, &FolderRecord)> = self
            .data
            .folders
            .iter()
            .map(|folder| {
                let usage: u64 = self
                    .data
                    .snippets
                    .iter()
                    .filter(|snippet| snippet.folder_id == Some(folder.id))
                    .map(|snippet| u64::from(snippet.times_used))
                    .sum();
                (usage, folder)
            })
            .collect();
        ranked.sort_by(|(usage_a, a), (usage_b, b)| {
            usage_b
                .cmp(usage_a)
                .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
        });
        Ok(ranked
            .into_iter()
            .map(|(_, folder)| Folder {
                id: folder.id,
                name: folder.name.clone(),
            })
            .collect())
    }

    fn list_snippets(
        &self,
        folder_id: Option<i64>,
        search: Option<&str>,
    ) -> Result<Vec<Snippet>, ProviderUnavailable> {
        let mut snippets: Vec<&SnippetRecord> = self
            .data
            .snippets
            .iter()
            .filter(|snippet| snippet.folder_id == folder_id)
            .filter(|snippet| {
                search.map_or(true, |query| {
                    matches_query(&snippet.title, query) || matches_query(&snippet.content, query)
                })
            })
            .collect();
        snippets.sort_by(|a, b| a.title.to_lowercase().cmp(&b.title.to_lowercase()));
        Ok(snippets.into_iter().map(to_snippet).collect())
    }

    fn list_all_snippets(&self, search: &str) -> Result<Vec<Snippet>, ProviderUnavailable> {
        let mut snippets: Vec<&SnippetRecord> = self
            .data
            .snippets
            .iter()
            .filter(|snippet| {
                matches_query(&snippet.title, search) || matches_query(&snippet.content, search)
            })
            .collect();
        snippets.sort_by(|a, b| a.title.to_lowercase().cmp(&b.title.to_lowercase()));
        Ok(snippets.into_iter().map(to_snippet).collect())
    }
}

struct Theme {
    name: String,
    background: Color,
    surface: Color,
    border: Color,
    text: Color,
    muted: Color,
    hover: Color,
    highlight: Color,
    highlight_text: Color,
    accent: Color,
    background_hex: String,
    surface_hex: String,
    border_hex: String,
    text_hex: String,
    muted_hex: String,
    hover_hex: String,
    highlight_hex: String,
    highlight_text_hex: String,
    accent_hex: String,
}

impl Theme {
    fn load(path: &Path, fallback: &str) -> Result<Self> {
        if path.exists() {
            let data = fs::read_to_string(path)?;
            if let Ok(file) = serde_json::from_str::<ThemeFile>(&data) {
                if let Some(skin) = file.skin {
                    if let Some(theme) = Theme::from_name(&skin) {
                        return Ok(theme);
                    }
                }
                if let Some(colors) = file.colors {
                    return Ok(Theme::from_overrides(colors));
                }
            }
            return Ok(Theme::fallback(fallback));
        }
        let theme = Theme::fallback(fallback);
        theme.save(path)?;
        Ok(theme)
    }

    fn fallback(name: &str) -> Self {
        Theme::from_name(name).unwrap_or_else(|| {
            let (key, def) = &THEME_PRESETS[0];
            Theme::from_definition((*key).to_string(), def)
        })
    }

    fn save(&self, path: &Path) -> Result<()> {
        let file = ThemeFile {
            skin: Some(self.name.clone()),
            colors: Some(ThemeColorOverrides {
                background: Some(self.background_hex.clone()),
                surface: Some(self.surface_hex.clone()),
                border: Some(self.border_hex.clone()),
                text: Some(self.text_hex.clone()),
                muted: Some(self.muted_hex.clone()),
                hover: Some(self.hover_hex.clone()),
                highlight: Some(self.highlight_hex.clone()),
                highlight_text: Some(self.highlight_text_hex.clone()),
                accent: Some(self.accent_hex.clone()),
            }),
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(&file)?)?;
        Ok(())
    }

    fn from_name(name: &str) -> Option<Self> {
        THEME_PRESETS
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(key, def)| Theme::from_definition((*key).to_string(), def))
    }

    fn from_definition(name: String, def: &ThemeDefinition) -> Theme {
        Theme::from_hexes(
            name,
            def.background,
            def.surface,
            def.border,
            def.text,
            def.muted,
            def.hover,
            def.highlight,
            def.highlight_text,
            def.accent,
        )
    }

    fn from_overrides(overrides: ThemeColorOverrides) -> Theme {
        let base = &THEME_PRESETS[0].1;
        Theme::from_hexes(
            "custom".to_string(),
            overrides.background.as_deref().unwrap_or(base.background),
            overrides.surface.as_deref().unwrap_or(base.surface),
            overrides.border.as_deref().unwrap_or(base.border),
            overrides.text.as_deref().unwrap_or(base.text),
            overrides.muted.as_deref().unwrap_or(base.muted),
            overrides.hover.as_deref().unwrap_or(base.hover),
            overrides.highlight.as_deref().unwrap_or(base.highlight),
            overrides
                .highlight_text
                .as_deref()
                .unwrap_or(base.highlight_text),
            overrides.accent.as_deref().unwrap_or(base.accent),
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn from_hexes(
        name: String,
        background: &str,
        surface: &str,
        border: &str,
        text: &str,
        muted: &str,
        hover: &str,
        highlight: &str,
        highlight_text: &str,
        accent: &str,
    ) -> Theme {
        Theme {
            name,
            background: color_from_hex(background).unwrap_or(Color::Black),
            surface: color_from_hex(surface).unwrap_or(Color::DarkGray),
            border: color_from_hex(border).unwrap_or(Color::DarkGray),
            text: color_from_hex(text).unwrap_or(Color::White),
            muted: color_from_hex(muted).unwrap_or(Color::Gray),
            hover: color_from_hex(hover).unwrap_or(Color::DarkGray),
            highlight: color_from_hex(highlight).unwrap_or(Color::Blue),
            highlight_text: color_from_hex(highlight_text).unwrap_or(Color::White),
            accent: color_from_hex(accent).unwrap_or(Color::Cyan),
            background_hex: normalize_hex(background),
            surface_hex: normalize_hex(surface),
            border_hex: normalize_hex(border),
            text_hex: normalize_hex(text),
            muted_hex: normalize_hex(muted),
            hover_hex: normalize_hex(hover),
            highlight_hex: normalize_hex(highlight),
            highlight_text_hex: normalize_hex(highlight_text),
            accent_hex: normalize_hex(accent),
        }
    }
}

#[derive(Serialize, Deserialize)]
struct ThemeFile {
    skin: Option<String>,
    colors: Option<ThemeColorOverrides>,
}

#[derive(Serialize, Deserialize, Default)]
struct ThemeColorOverrides {
    background: Option<String>,
    surface: Option<String>,
    border: Option<String>,
    text: Option<String>,
    muted: Option<String>,
    hover: Option<String>,
    highlight: Option<String>,
    highlight_text: Option<String>,
    accent: Option<String>,
}

struct ThemeDefinition {
    background: &'static str,
    surface: &'static str,
    border: &'static str,
    text: &'static str,
    muted: &'static str,
    hover: &'static str,
    highlight: &'static str,
    highlight_text: &'static str,
    accent: &'static str,
}

const THEME_PRESETS: &[(&str, ThemeDefinition)] = &[
    (
        "dark",
        ThemeDefinition {
            background: "#1e1e1e",
            surface: "#252525",
            border: "#333333",
            text: "#dddddd",
            muted: "#666666",
            hover: "#2a2a2a",
            highlight: "#333333",
            highlight_text: "#ffffff",
            accent: "#76b3c5",
        },
    ),
    (
        "light",
        ThemeDefinition {
            background: "#ffffff",
            surface: "#f0f0f0",
            border: "#d0d0d0",
            text: "#1a1a1a",
            muted: "#555555",
            hover: "#eef6ff",
            highlight: "#daeeff",
            highlight_text: "#000000",
            accent: "#3a7ca5",
        },
    ),
];

fn color_from_hex(value: &str) -> Option<Color> {
    let normalized = normalize_hex(value);
    let bytes = normalized.as_bytes();
    let r = u8::from_str_radix(std::str::from_utf8(&bytes[1..3]).ok()?, 16).ok()?;
    let g = u8::from_str_radix(std::str::from_utf8(&bytes[3..5]).ok()?, 16).ok()?;
    let b = u8::from_str_radix(std::str::from_utf8(&bytes[5..7]).ok()?, 16).ok()?;
    Some(Color::Rgb(r, g, b))
}

fn normalize_hex(value: &str) -> String {
    let mut cleaned = value.trim().to_string();
    if !cleaned.starts_with('#') {
        cleaned.insert(0, '#');
    }
    if cleaned.len() != 7 {
        return "#ffffff".into();
    }
    cleaned
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::{assert_eq, assert_ne};
    use std::cell::{Cell, RefCell};
    use tempfile::tempdir;

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    fn screen() -> Rect {
        Rect::new(0, 0, 120, 40)
    }

    fn main_rect() -> Rect {
        Rect::new(1, 1, 46, 18)
    }

    #[derive(Default)]
    struct FakeProvider {
        clips: RefCell<Vec<Clip>>,
        folders: Vec<Folder>,
        snippets: Vec<(Option<i64>, Snippet)>,
        fail: Cell<bool>,
        history_calls: Cell<usize>,
    }

    impl FakeProvider {
        fn with_clips(contents: &[&str]) -> Self {
            let provider = FakeProvider::default();
            for (index, content) in contents.iter().enumerate() {
                provider.clips.borrow_mut().push(Clip {
                    id: index as i64 + 1,
                    content: (*content).to_string(),
                    created_at: Utc::now(),
                });
            }
            provider
        }

        fn add_folder(&mut self, id: i64, name: &str) {
            self.folders.push(Folder {
                id,
                name: name.to_string(),
            });
        }

        fn add_snippet(&mut self, folder_id: Option<i64>, id: i64, title: &str, content: &str) {
            self.snippets.push((
                folder_id,
                Snippet {
                    id,
                    title: title.to_string(),
                    content: content.to_string(),
                },
            ));
        }

        fn standard() -> Self {
            let mut provider = FakeProvider::default();
            provider.add_folder(1, "Email");
            provider.add_folder(2, "Work");
            provider.add_folder(3, "Empty");
            provider.add_snippet(Some(1), 10, "Signature", "Best regards,\nAlex");
            provider.add_snippet(Some(1), 11, "Follow-up", "Any update?");
            provider.add_snippet(Some(2), 20, "Standup", "Daily standup notes");
            provider.add_snippet(None, 40, "Shrug", "¯\\_(ツ)_/¯");
            provider
        }
    }

    impl ContentProvider for FakeProvider {
        fn list_history(&self, search: Option<&str>) -> Result<Vec<Clip>, ProviderUnavailable> {
            self.history_calls.set(self.history_calls.get() + 1);
            if self.fail.get() {
                return Err(ProviderUnavailable("fake store offline".into()));
            }
            Ok(self
                .clips
                .borrow()
                .iter()
                .filter(|clip| search.map_or(true, |query| matches_query(&clip.content, query)))
                .cloned()
                .collect())
        }

        fn list_folders(&self) -> Result<Vec<Folder>, ProviderUnavailable> {
            if self.fail.get() {
                return Err(ProviderUnavailable("fake store offline".into()));
            }
            Ok(self.folders.clone())
        }

        fn list_snippets(
            &self,
            folder_id: Option<i64>,
            search: Option<&str>,
        ) -> Result<Vec<Snippet>, ProviderUnavailable> {
            if self.fail.get() {
                return Err(ProviderUnavailable("fake store offline".into()));
            }
            Ok(self
                .snippets
                .iter()
                .filter(|(parent, _)| *parent == folder_id)
                .filter(|(_, snippet)| {
                    search.map_or(true, |query| {
                        matches_query(&snippet.title, query)
                            || matches_query(&snippet.content, query)
                    })
                })
                .map(|(_, snippet)| snippet.clone())
                .collect())
        }

        fn list_all_snippets(&self, search: &str) -> Result<Vec<Snippet>, ProviderUnavailable> {
            if self.fail.get() {
                return Err(ProviderUnavailable("fake store offline".into()));
            }
            Ok(self
                .snippets
                .iter()
                .filter(|(_, snippet)| {
                    matches_query(&snippet.title, search) || matches_query(&snippet.content, search)
                })
                .map(|(_, snippet)| snippet.clone())
                .collect())
        }
    }

    fn mixed_entries() -> Vec<Entry> {
        vec![
            Entry::header("SNIPPETS"),
            Entry::folder(1, "Email".into()),
            Entry::clip(2, "alpha".into(), "alpha".into()),
            Entry::snippet(3, "beta".into(), "beta body".into()),
        ]
    }

    #[test]
    fn navigator_skips_headers_and_folders() {
        let entries = mixed_entries();
        let mut navigator = Navigator::default();
        navigator.reset(&entries);
        assert_eq!(navigator.cursor, Some(2));
        navigator.move_by(&entries, 1);
        assert_eq!(navigator.cursor, Some(3));
        navigator.move_by(&entries, 1);
        assert_eq!(navigator.cursor, Some(2));
    }

    #[test]
    fn navigator_wraps_backward() {
        let entries = mixed_entries();
        let mut navigator = Navigator::default();
        navigator.reset(&entries);
        navigator.move_by(&entries, -1);
        assert_eq!(navigator.cursor, Some(3));
    }

    #[test]
    fn navigator_empty_list_stays_none() {
        let entries = vec![Entry::placeholder("Clipboard is empty")];
        let mut navigator = Navigator::default();
        navigator.reset(&entries);
        assert_eq!(navigator.cursor, None);
        navigator.move_by(&entries, 1);
        assert_eq!(navigator.cursor, None);
        assert!(navigator.current(&entries).is_none());
    }

    #[test]
    fn navigator_invalid_cursor_jumps_by_direction() {
        let entries = mixed_entries();
        let mut navigator = Navigator::default();
        navigator.move_by(&entries, 1);
        assert_eq!(navigator.cursor, Some(2));
        navigator.clear();
        navigator.move_by(&entries, -1);
        assert_eq!(navigator.cursor, Some(3));
    }

    #[test]
    fn navigator_select_ignores_non_selectable() {
        let entries = mixed_entries();
        let mut navigator = Navigator::default();
        navigator.reset(&entries);
        navigator.select(&entries, 0);
        assert_eq!(navigator.cursor, Some(2));
        navigator.select(&entries, 1);
        assert_eq!(navigator.cursor, Some(2));
        navigator.select(&entries, 3);
        assert_eq!(navigator.cursor, Some(3));
    }

    #[test]
    fn history_mode_lists_clips_with_header() {
        let provider = FakeProvider::with_clips(&["alpha", "beta"]);
        let entries = build_entries(&provider, MenuMode::History, "");
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].kind, EntryKind::Header);
        assert_eq!(entries[1].label, "alpha");
        assert_eq!(entries[2].label, "beta");
        assert!(entries[1].selectable());
    }

    #[test]
    fn snippets_mode_hides_empty_folders() {
        let provider = FakeProvider::standard();
        let entries = build_entries(&provider, MenuMode::Snippets, "");
        let folder_labels: Vec<&str> = entries
            .iter()
            .filter(|entry| entry.kind == EntryKind::Folder)
            .map(|entry| entry.label.as_str())
            .collect();
        assert_eq!(folder_labels, vec!["Email", "Work"]);
        let root_titles: Vec<&str> = entries
            .iter()
            .filter(|entry| entry.kind == EntryKind::Snippet)
            .map(|entry| entry.label.as_str())
            .collect();
        assert_eq!(root_titles, vec!["Shrug"]);
    }

    #[test]
    fn search_bypasses_folder_hierarchy() {
        let provider = FakeProvider::standard();
        let entries = build_entries(&provider, MenuMode::Snippets, "sig");
        assert!(entries
            .iter()
            .all(|entry| entry.kind != EntryKind::Folder));
        let titles: Vec<&str> = entries
            .iter()
            .filter(|entry| entry.kind == EntryKind::Snippet)
            .map(|entry| entry.label.as_str())
            .collect();
        assert_eq!(titles, vec!["Signature"]);
    }

    #[test]
    fn empty_history_shows_placeholder() {
        let provider = FakeProvider::default();
        let entries = build_entries(&provider, MenuMode::History, "");
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].label, "Clipboard is empty");
        assert!(!entries[0].selectable());
    }

    #[test]
    fn empty_snippets_placeholder_message() {
        let provider = FakeProvider::default();
        let entries = build_entries(&provider, MenuMode::Snippets, "");
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].label, "No snippets registered");
    }

    #[test]
    fn search_without_matches_reports_no_results() {
        let provider = FakeProvider::standard();
        let entries = build_entries(&provider, MenuMode::All, "zzz-no-match");
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].label, "No results found");
    }

    #[test]
    fn provider_failure_degrades_to_placeholder() {
        let provider = FakeProvider::standard();
        provider.fail.set(true);
        let entries = build_entries(&provider, MenuMode::All, "");
        assert_eq!(entries.len(), 1);
        assert!(!entries[0].selectable());
    }

    #[test]
    fn labels_are_flattened_and_truncated() {
        let long = "first line\nsecond line that keeps going well past the label width";
        let provider = FakeProvider::with_clips(&[long]);
        let entries = build_entries(&provider, MenuMode::History, "");
        let label = &entries[1].label;
        assert!(!label.contains('\n'));
        assert!(UnicodeWidthStr::width(label.as_str()) <= LABEL_WIDTH);
        assert!(label.ends_with('…'));
        assert_eq!(entries[1].content, long);
    }

    #[test]
    fn truncate_width_preserves_short_strings() {
        assert_eq!(truncate_width("short", 10), "short");
        assert_eq!(truncate_label("  padded  ", 10), "padded");
    }

    #[test]
    fn preview_caps_lines_and_width() {
        let content = vec!["x".repeat(80); 12].join("\n");
        let lines = preview_lines(&content);
        assert_eq!(lines.len(), PREVIEW_MAX_LINES + 1);
        assert_eq!(lines.last().unwrap(), "…");
        for line in &lines {
            assert!(UnicodeWidthStr::width(line.as_str()) <= PREVIEW_LINE_WIDTH);
        }
    }

    #[test]
    fn debounce_fires_once_after_deadline() {
        let start = Instant::now();
        let mut timer = Debounce::default();
        timer.arm(start, ms(100));
        assert_eq!(timer.fire(start + ms(99)), None);
        assert!(timer.fire(start + ms(100)).is_some());
        assert_eq!(timer.fire(start + ms(200)), None);
    }

    #[test]
    fn debounce_rearm_replaces_deadline() {
        let start = Instant::now();
        let mut timer = Debounce::default();
        timer.arm(start, ms(100));
        timer.arm(start + ms(50), ms(100));
        assert_eq!(timer.fire(start + ms(120)), None);
        assert!(timer.fire(start + ms(151)).is_some());
    }

    #[test]
    fn debounce_cancel_discards_pending() {
        let start = Instant::now();
        let mut timer = Debounce::default();
        timer.arm(start, ms(100));
        timer.cancel();
        assert!(!timer.is_armed());
        assert_eq!(timer.fire(start + ms(500)), None);
    }

    #[test]
    fn debounce_tokens_invalidate_stale_generations() {
        let start = Instant::now();
        let mut timer = Debounce::default();
        let stale = timer.arm(start, ms(100));
        let current = timer.arm(start + ms(10), ms(100));
        assert_ne!(stale, current);
        assert_eq!(timer.fire(start + ms(200)), Some(current));
    }

    #[test]
    fn submenu_prefers_right_edge() {
        let rect = place_beside(main_rect(), 5, SUB_W, 6, screen());
        assert_eq!(rect.x, 47);
        assert_eq!(rect.y, 5);
    }

    #[test]
    fn submenu_flips_left_near_right_edge() {
        let narrow = Rect::new(0, 0, 80, 24);
        let parent = Rect::new(33, 2, 46, 17);
        let rect = place_beside(parent, 4, SUB_W, 6, narrow);
        assert_eq!(rect.x, 3);
    }

    #[test]
    fn submenu_clamps_to_bottom_margin() {
        let narrow = Rect::new(0, 0, 80, 24);
        let rect = place_beside(Rect::new(1, 1, 46, 18), 20, SUB_W, 8, narrow);
        assert_eq!(rect.y + rect.height, narrow.height - BOTTOM_MARGIN);
    }

    #[test]
    fn submenu_respects_top_margin() {
        let rect = place_beside(main_rect(), 0, SUB_W, 6, screen());
        assert_eq!(rect.y, TOP_MARGIN);
    }

    #[test]
    fn hover_opens_submenu_after_delay() {
        let provider = FakeProvider::standard();
        let start = Instant::now();
        let mut cascade = CascadeManager::default();
        cascade.hover_folder(1, "Email", 5, start);
        assert_eq!(cascade.phase(), CascadePhase::PendingOpen);
        cascade.on_tick(start + ms(139), None, Some(main_rect()), screen(), &provider);
        assert!(cascade.submenu.is_none());
        cascade.on_tick(start + ms(141), None, Some(main_rect()), screen(), &provider);
        let sub = cascade.submenu.as_ref().expect("submenu should be open");
        assert_eq!(sub.folder_id, 1);
        assert_eq!(sub.rect.x, 47);
        assert_eq!(sub.rect.y, 5);
        assert_eq!(cascade.phase(), CascadePhase::Open);
    }

    #[test]
    fn hover_same_folder_is_noop() {
        let provider = FakeProvider::standard();
        let start = Instant::now();
        let mut cascade = CascadeManager::default();
        cascade.click_folder(1, "Email", 5, main_rect(), screen(), &provider);
        cascade.hover_folder(1, "Email", 5, start);
        assert_eq!(cascade.phase(), CascadePhase::Open);
        assert!(cascade.pending_open.is_none());
    }

    #[test]
    fn switching_folders_swaps_submenu() {
        let provider = FakeProvider::standard();
        let start = Instant::now();
        let mut cascade = CascadeManager::default();
        cascade.click_folder(1, "Email", 5, main_rect(), screen(), &provider);
        cascade.hover_folder(2, "Work", 6, start);
        assert!(cascade.submenu.is_none());
        assert_eq!(cascade.phase(), CascadePhase::PendingOpen);
        cascade.on_tick(start + ms(141), None, Some(main_rect()), screen(), &provider);
        let sub = cascade.submenu.as_ref().expect("submenu should be open");
        assert_eq!(sub.folder_id, 2);
    }

    #[test]
    fn empty_folder_never_opens() {
        let provider = FakeProvider::standard();
        let start = Instant::now();
        let mut cascade = CascadeManager::default();
        cascade.hover_folder(3, "Empty", 7, start);
        cascade.on_tick(start + ms(150), None, Some(main_rect()), screen(), &provider);
        assert!(cascade.submenu.is_none());
        assert_eq!(cascade.phase(), CascadePhase::Closed);
    }

    #[test]
    fn click_opens_synchronously_and_is_idempotent() {
        let provider = FakeProvider::standard();
        let mut cascade = CascadeManager::default();
        cascade.click_folder(1, "Email", 5, main_rect(), screen(), &provider);
        assert!(cascade.submenu.is_some());
        cascade.click_folder(1, "Email", 5, main_rect(), screen(), &provider);
        let sub = cascade.submenu.as_ref().unwrap();
        assert_eq!(sub.folder_id, 1);
        assert_eq!(cascade.phase(), CascadePhase::Open);
    }

    #[test]
    fn pending_close_cancelled_by_reentry() {
        let provider = FakeProvider::standard();
        let start = Instant::now();
        let mut cascade = CascadeManager::default();
        cascade.click_folder(1, "Email", 5, main_rect(), screen(), &provider);
        cascade.pointer_left_rows(start);
        assert_eq!(cascade.phase(), CascadePhase::PendingClose);
        cascade.hover_folder(1, "Email", 5, start + ms(100));
        assert_eq!(cascade.phase(), CascadePhase::Open);
        cascade.on_tick(start + ms(400), None, Some(main_rect()), screen(), &provider);
        assert!(cascade.submenu.is_some());
    }

    #[test]
    fn pending_close_cancelled_by_entering_submenu() {
        let provider = FakeProvider::standard();
        let start = Instant::now();
        let mut cascade = CascadeManager::default();
        cascade.click_folder(1, "Email", 5, main_rect(), screen(), &provider);
        cascade.pointer_left_rows(start);
        cascade.pointer_entered_submenu();
        assert_eq!(cascade.phase(), CascadePhase::Open);
        cascade.on_tick(start + ms(400), None, Some(main_rect()), screen(), &provider);
        assert!(cascade.submenu.is_some());
    }

    #[test]
    fn close_fires_when_pointer_outside() {
        let provider = FakeProvider::standard();
        let start = Instant::now();
        let mut cascade = CascadeManager::default();
        cascade.click_folder(1, "Email", 5, main_rect(), screen(), &provider);
        cascade.pointer_left_rows(start);
        cascade.on_tick(
            start + ms(251),
            Some((110, 38)),
            Some(main_rect()),
            screen(),
            &provider,
        );
        assert!(cascade.submenu.is_none());
        assert_eq!(cascade.phase(), CascadePhase::Closed);
    }

    #[test]
    fn close_held_while_pointer_inside_main() {
        let provider = FakeProvider::standard();
        let start = Instant::now();
        let mut cascade = CascadeManager::default();
        cascade.click_folder(1, "Email", 5, main_rect(), screen(), &provider);
        cascade.pointer_left_rows(start);
        cascade.on_tick(
            start + ms(251),
            Some((5, 5)),
            Some(main_rect()),
            screen(),
            &provider,
        );
        assert!(cascade.submenu.is_some());
        assert_eq!(cascade.phase(), CascadePhase::PendingClose);
        cascade.on_tick(
            start + ms(502),
            Some((110, 38)),
            Some(main_rect()),
            screen(),
            &provider,
        );
        assert!(cascade.submenu.is_none());
    }

    #[test]
    fn tooltip_appears_after_delay() {
        let provider = FakeProvider::standard();
        let start = Instant::now();
        let mut cascade = CascadeManager::default();
        cascade.click_folder(1, "Email", 5, main_rect(), screen(), &provider);
        cascade.hover_submenu_row(0, start);
        cascade.on_tick(start + ms(399), None, Some(main_rect()), screen(), &provider);
        assert!(cascade.tooltip.is_none());
        cascade.on_tick(start + ms(401), None, Some(main_rect()), screen(), &provider);
        let tip = cascade.tooltip.as_ref().expect("tooltip should be open");
        let sub = cascade.submenu.as_ref().unwrap();
        assert_eq!(tip.rect.x, sub.rect.x + sub.rect.width);
        assert_eq!(tip.lines, vec!["Best regards,".to_string(), "Alex".to_string()]);
    }

    #[test]
    fn opening_submenu_closes_tooltip() {
        let provider = FakeProvider::standard();
        let start = Instant::now();
        let mut cascade = CascadeManager::default();
        cascade.click_folder(1, "Email", 5, main_rect(), screen(), &provider);
        cascade.hover_submenu_row(0, start);
        cascade.on_tick(start + ms(401), None, Some(main_rect()), screen(), &provider);
        assert!(cascade.tooltip.is_some());
        cascade.click_folder(2, "Work", 6, main_rect(), screen(), &provider);
        assert!(cascade.tooltip.is_none());
        assert_eq!(cascade.submenu.as_ref().unwrap().folder_id, 2);
    }

    #[test]
    fn leaving_submenu_row_cancels_pending_tooltip() {
        let provider = FakeProvider::standard();
        let start = Instant::now();
        let mut cascade = CascadeManager::default();
        cascade.click_folder(1, "Email", 5, main_rect(), screen(), &provider);
        cascade.hover_submenu_row(0, start);
        cascade.leave_submenu_row();
        cascade.on_tick(start + ms(500), None, Some(main_rect()), screen(), &provider);
        assert!(cascade.tooltip.is_none());
    }

    #[test]
    fn focus_grace_dismisses_when_not_regained() {
        let provider = FakeProvider::standard();
        let start = Instant::now();
        let mut overlay = OverlayController::new(MenuMode::All);
        overlay.show(&provider, MenuMode::All, screen(), Some((10, 5)));
        overlay.focus_lost(start);
        overlay.on_tick(start + ms(119), screen(), None, &provider);
        assert!(overlay.is_visible());
        overlay.on_tick(start + ms(121), screen(), None, &provider);
        assert!(!overlay.is_visible());
    }

    #[test]
    fn focus_regained_within_grace_keeps_overlay() {
        let provider = FakeProvider::standard();
        let start = Instant::now();
        let mut overlay = OverlayController::new(MenuMode::All);
        overlay.show(&provider, MenuMode::All, screen(), Some((10, 5)));
        overlay.focus_lost(start);
        overlay.focus_gained();
        overlay.on_tick(start + ms(121), screen(), None, &provider);
        assert!(overlay.is_visible());
    }

    #[test]
    fn show_same_mode_is_idempotent() {
        let provider = FakeProvider::with_clips(&["alpha"]);
        let mut overlay = OverlayController::new(MenuMode::History);
        overlay.show(&provider, MenuMode::History, screen(), Some((10, 5)));
        overlay.show(&provider, MenuMode::History, screen(), Some((30, 9)));
        assert_eq!(provider.history_calls.get(), 1);
        assert!(overlay.is_visible());
    }

    #[test]
    fn show_different_mode_rebuilds() {
        let provider = FakeProvider::with_clips(&["alpha"]);
        let mut overlay = OverlayController::new(MenuMode::All);
        overlay.show(&provider, MenuMode::All, screen(), Some((10, 5)));
        overlay.show(&provider, MenuMode::History, screen(), Some((10, 5)));
        assert_eq!(overlay.mode, MenuMode::History);
        assert_eq!(provider.history_calls.get(), 2);
    }

    #[test]
    fn hide_then_show_reads_fresh_data() {
        let provider = FakeProvider::with_clips(&["alpha"]);
        let mut overlay = OverlayController::new(MenuMode::History);
        overlay.show(&provider, MenuMode::History, screen(), Some((10, 5)));
        overlay.hide();
        assert!(overlay.entries.is_empty());
        provider.clips.borrow_mut().push(Clip {
            id: 99,
            content: "fresh".into(),
            created_at: Utc::now(),
        });
        overlay.show(&provider, MenuMode::History, screen(), Some((10, 5)));
        assert!(overlay
            .entries
            .iter()
            .any(|entry| entry.content == "fresh"));
    }

    #[test]
    fn activation_returns_content_and_hides() {
        let provider = FakeProvider::with_clips(&["alpha"]);
        let mut overlay = OverlayController::new(MenuMode::History);
        overlay.show(&provider, MenuMode::History, screen(), Some((10, 5)));
        let activation = overlay.activate_current().expect("entry should activate");
        assert_eq!(activation.content, "alpha");
        assert_eq!(activation.kind, EntryKind::Clip);
        assert!(!overlay.is_visible());
        assert!(overlay.entries.is_empty());
    }

    #[test]
    fn placeholder_activation_is_noop() {
        let provider = FakeProvider::default();
        let mut overlay = OverlayController::new(MenuMode::History);
        overlay.show(&provider, MenuMode::History, screen(), Some((10, 5)));
        assert!(overlay.activate_current().is_none());
        assert!(overlay.is_visible());
    }

    #[test]
    fn search_debounce_coalesces_rebuilds() {
        let provider = FakeProvider::with_clips(&["foo", "bar"]);
        let start = Instant::now();
        let mut overlay = OverlayController::new(MenuMode::History);
        overlay.show(&provider, MenuMode::History, screen(), Some((10, 5)));
        assert_eq!(provider.history_calls.get(), 1);
        overlay.search_input('f', start);
        overlay.search_backspace(start + ms(50));
        overlay.on_tick(start + ms(130), screen(), None, &provider);
        assert_eq!(provider.history_calls.get(), 1);
        overlay.on_tick(start + ms(171), screen(), None, &provider);
        assert_eq!(provider.history_calls.get(), 2);
        overlay.on_tick(start + ms(400), screen(), None, &provider);
        assert_eq!(provider.history_calls.get(), 2);
    }

    #[test]
    fn hide_cancels_pending_timers() {
        let provider = FakeProvider::standard();
        let start = Instant::now();
        let mut overlay = OverlayController::new(MenuMode::Snippets);
        overlay.show(&provider, MenuMode::Snippets, screen(), Some((5, 3)));
        overlay.cascade.hover_folder(1, "Email", 6, start);
        overlay.search_input('x', start);
        overlay.hide();
        assert!(!overlay.cascade.open_timer.is_armed());
        assert!(!overlay.search_timer.is_armed());
        overlay.on_tick(start + ms(400), screen(), None, &provider);
        assert!(overlay.cascade.submenu.is_none());
        assert_eq!(overlay.cascade.phase(), CascadePhase::Closed);
    }

    #[test]
    fn click_outside_dismisses() {
        let provider = FakeProvider::with_clips(&["alpha"]);
        let mut overlay = OverlayController::new(MenuMode::History);
        overlay.show(&provider, MenuMode::History, screen(), Some((10, 5)));
        let outcome = overlay.pointer_click((115, 38), screen(), &provider);
        assert!(matches!(outcome, ClickOutcome::Dismissed));
        assert!(!overlay.is_visible());
    }

    #[test]
    fn pointer_hover_selects_selectable_row() {
        let provider = FakeProvider::with_clips(&["alpha", "beta"]);
        let start = Instant::now();
        let mut overlay = OverlayController::new(MenuMode::History);
        overlay.show(&provider, MenuMode::History, screen(), Some((10, 5)));
        let rect = overlay.main.as_ref().unwrap().rect;
        overlay.pointer_moved((rect.x + 2, rect.y + 3), start);
        assert_eq!(overlay.navigator.cursor, Some(1));
        assert_eq!(overlay.hovered_main_row(), Some(1));
    }

    #[test]
    fn pointer_hover_on_folder_row_opens_submenu() {
        let mut provider = FakeProvider::default();
        provider.add_folder(1, "Email");
        provider.add_snippet(Some(1), 10, "Signature", "Best regards,\nAlex");
        let start = Instant::now();
        let mut overlay = OverlayController::new(MenuMode::Snippets);
        overlay.show(&provider, MenuMode::Snippets, screen(), Some((5, 3)));
        let rect = overlay.main.as_ref().unwrap().rect;
        overlay.pointer_moved((rect.x + 2, rect.y + 3), start);
        assert_eq!(overlay.cascade.phase(), CascadePhase::PendingOpen);
        overlay.on_tick(
            start + ms(150),
            screen(),
            Some((rect.x + 2, rect.y + 3)),
            &provider,
        );
        let sub = overlay.cascade.submenu.as_ref().expect("submenu open");
        assert_eq!(sub.folder_id, 1);
        assert_eq!(sub.rect.x, rect.x + rect.width);
    }

    #[test]
    fn hover_plain_row_closes_open_submenu() {
        let provider = FakeProvider::standard();
        let mut overlay = OverlayController::new(MenuMode::All);
        overlay.show(&provider, MenuMode::All, screen(), Some((5, 3)));
        let rect = overlay.main.as_ref().unwrap().rect;
        overlay
            .cascade
            .click_folder(1, "Email", rect.y + 3, rect, screen(), &provider);
        assert!(overlay.cascade.submenu.is_some());
        overlay.pointer_moved((rect.x + 2, rect.y + 5), Instant::now());
        assert_eq!(overlay.navigator.cursor, Some(3));
        assert!(overlay.cascade.submenu.is_none());
    }

    #[test]
    fn store_creates_default_data_on_first_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.json");
        let store = JsonStore::load(&path).unwrap();
        assert!(path.exists());
        assert_eq!(store.data.folders.len(), 1);
        assert_eq!(store.data.snippets.len(), 3);
        assert_eq!(store.data.next_id, 5);
    }

    #[test]
    fn add_clip_dedups_and_refreshes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.json");
        let mut store = JsonStore::load(&path).unwrap();
        store.add_clip("hello");
        store.add_clip("hello");
        assert_eq!(store.data.clips.len(), 1);
        assert_eq!(store.data.clips[0].times_used, 1);
    }

    #[test]
    fn add_clip_ignores_blank_content() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.json");
        let mut store = JsonStore::load(&path).unwrap();
        store.add_clip("   \n  ");
        assert!(store.data.clips.is_empty());
    }

    #[test]
    fn add_clip_caps_history() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.json");
        let mut store = JsonStore::load(&path).unwrap();
        store.data.settings.max_history = 3;
        for index in 0..5 {
            store.add_clip(&format!("clip-{index}"));
        }
        assert_eq!(store.data.clips.len(), 3);
        assert!(store
            .data
            .clips
            .iter()
            .any(|clip| clip.content == "clip-4"));
    }

    #[test]
    fn folders_ranked_by_usage_then_name() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.json");
        let mut store = JsonStore::load(&path).unwrap();
        store.data.folders = vec![
            FolderRecord { id: 1, name: "Alpha".into() },
            FolderRecord { id: 2, name: "Beta".into() },
            FolderRecord { id: 3, name: "Gamma".into() },
        ];
        store.data.snippets = vec![
            SnippetRecord {
                id: 10,
                title: "a".into(),
                content: "a".into(),
                folder_id: Some(1),
                times_used: 1,
            },
            SnippetRecord {
                id: 11,
                title: "b".into(),
                content: "b".into(),
                folder_id: Some(2),
                times_used: 5,
            },
            SnippetRecord {
                id: 12,
                title: "c".into(),
                content: "c".into(),
                folder_id: Some(3),
                times_used: 1,
            },
        ];
        let names: Vec<String> = store
            .list_folders()
            .unwrap()
            .into_iter()
            .map(|folder| folder.name)
            .collect();
        assert_eq!(names, vec!["Beta", "Alpha", "Gamma"]);
    }

    #[test]
    fn snippet_search_matches_title_or_content() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.json");
        let store = JsonStore::load(&path).unwrap();
        let by_title = store.list_all_snippets("signa").unwrap();
        assert_eq!(by_title.len(), 1);
        assert_eq!(by_title[0].title, "Signature");
        let by_content = store.list_all_snippets("regards").unwrap();
        assert_eq!(by_content.len(), 1);
        assert_eq!(by_content[0].title, "Signature");
    }

    #[test]
    fn list_history_filters_case_insensitively() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.json");
        let mut store = JsonStore::load(&path).unwrap();
        store.add_clip("Hello World");
        store.add_clip("other");
        let clips = store.list_history(Some("hello")).unwrap();
        assert_eq!(clips.len(), 1);
        assert_eq!(clips[0].content, "Hello World");
    }

    #[test]
    fn increment_usage_persists_to_disk() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.json");
        let mut store = JsonStore::load(&path).unwrap();
        store.increment_snippet_usage(2).unwrap();
        let reloaded = JsonStore::load(&path).unwrap();
        let snippet = reloaded
            .data
            .snippets
            .iter()
            .find(|snippet| snippet.id == 2)
            .unwrap();
        assert_eq!(snippet.times_used, 1);
    }

    #[test]
    fn theme_falls_back_to_dark_preset() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("theme.json");
        let theme = Theme::load(&path, "no-such-theme").unwrap();
        assert_eq!(theme.name, "dark");
        assert!(path.exists());
        let reloaded = Theme::load(&path, "light").unwrap();
        assert_eq!(reloaded.name, "dark");
    }

    #[test]
    fn theme_overrides_win_over_fallback() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("theme.json");
        fs::write(
            &path,
            r##"{"skin": null, "colors": {"background": "#101010"}}"##,
        )
        .unwrap();
        let theme = Theme::load(&path, "dark").unwrap();
        assert_eq!(theme.name, "custom");
        assert_eq!(theme.background_hex, "#101010");
    }
}
