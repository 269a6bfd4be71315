//! Full-screen application shell: sidebar, pages, and the event loop.

use crate::events::Page;
use crate::llm::CompletionService;
use crate::prompts::DISCLAIMER;
use crate::ui::conversation::{ChatAction, ChatScreen};
use crate::ui::pages::{FeelingsPage, HelpRequestsPage};
use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Frame, Terminal,
    backend::{Backend, CrosstermBackend},
    layout::{Alignment, Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
};
use std::io;
use std::sync::Arc;
use std::time::Duration;

const TICK: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Sidebar,
    Page,
}

pub struct AppState {
    pub page: Page,
    pub focus: Focus,
    pub sidebar: ListState,
    pub chat: ChatScreen,
    pub help_requests: HelpRequestsPage,
    pub feelings: FeelingsPage,
    pub should_quit: bool,
}

impl AppState {
    pub fn new(service: Arc<dyn CompletionService>) -> Self {
        let mut sidebar = ListState::default();
        sidebar.select(Some(0));

        let mut state = Self {
            page: Page::Chatbot,
            focus: Focus::Page,
            sidebar,
            chat: ChatScreen::new(service),
            help_requests: HelpRequestsPage::new(),
            feelings: FeelingsPage::new(),
            should_quit: false,
        };
        state.sync_focus();
        state
    }

    fn sync_focus(&mut self) {
        let on_page = self.focus == Focus::Page;
        self.chat.set_focus(on_page && self.page == Page::Chatbot);
        self.help_requests
            .set_focus(on_page && self.page == Page::HelpRequests);
    }

    fn open_selected(&mut self) {
        let pages = Page::all();
        let index = self.sidebar.selected().unwrap_or(0).min(pages.len() - 1);
        self.page = pages[index];
        self.focus = Focus::Page;
        tracing::debug!(page = %self.page, "page opened");
    }

    fn move_selection(&mut self, delta: isize) {
        let len = Page::all().len() as isize;
        let current = self.sidebar.selected().unwrap_or(0) as isize;
        self.sidebar
            .select(Some((current + delta).rem_euclid(len) as usize));
    }

    /// Whether the open page wants to keep Esc for itself
    fn page_captures_escape(&self) -> bool {
        self.page == Page::Chatbot && self.chat.captures_escape()
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }

        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.should_quit = true;
            return;
        }

        match self.focus {
            Focus::Sidebar => match key.code {
                KeyCode::Up => self.move_selection(-1),
                KeyCode::Down => self.move_selection(1),
                KeyCode::Enter | KeyCode::Right | KeyCode::Tab => self.open_selected(),
                KeyCode::Esc => self.focus = Focus::Page,
                KeyCode::Char('q') => self.should_quit = true,
                _ => {}
            },
            Focus::Page => {
                if key.code == KeyCode::Esc && !self.page_captures_escape() {
                    self.focus = Focus::Sidebar;
                } else {
                    match self.page {
                        Page::Chatbot => {
                            if self.chat.handle_key(key) == ChatAction::Exit {
                                self.should_quit = true;
                            }
                        }
                        Page::HelpRequests => self.help_requests.handle_key(key),
                        Page::Feelings => self.feelings.handle_key(key),
                    }
                }
            }
        }

        self.sync_focus();
    }
}

pub fn draw_ui(f: &mut Frame, state: &mut AppState) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(8),
            Constraint::Length(1),
        ])
        .split(f.size());

    let header = Paragraph::new(Line::from(Span::styled(
        "🌟 You deserve to be happy. Take care of your mental health! 🌟",
        Style::default()
            .fg(Color::Magenta)
            .add_modifier(Modifier::BOLD),
    )))
    .alignment(Alignment::Center);
    f.render_widget(header, rows[0]);

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(32), Constraint::Min(40)])
        .split(rows[1]);

    let items: Vec<ListItem> = Page::all()
        .into_iter()
        .map(|page| ListItem::new(format!("{} {}", page.icon(), page)))
        .collect();
    let sidebar_style = if state.focus == Focus::Sidebar {
        Style::default().fg(Color::Green)
    } else {
        Style::default().fg(Color::Gray)
    };
    let sidebar = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Ways we can help")
                .style(sidebar_style),
        )
        .highlight_style(
            Style::default()
                .fg(Color::Black)
                .bg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("▶ ");
    f.render_stateful_widget(sidebar, columns[0], &mut state.sidebar);

    let page_area = columns[1];
    let buf = f.buffer_mut();
    match state.page {
        Page::Chatbot => state.chat.render(page_area, buf),
        Page::HelpRequests => state.help_requests.render(page_area, buf),
        Page::Feelings => state
            .feelings
            .render(page_area, buf, state.focus == Focus::Page),
    }

    let footer = Paragraph::new(Line::from(Span::styled(
        format!("{DISCLAIMER}  Esc: menu  Ctrl+C: quit"),
        Style::default().fg(Color::DarkGray),
    )))
    .alignment(Alignment::Center);
    f.render_widget(footer, rows[2]);
}

/// Take over the terminal and run until the user quits
pub async fn run(service: Arc<dyn CompletionService>) -> Result<()> {
    enable_raw_mode().context("Failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).context("Failed to enter alternate screen")?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;

    let mut state = AppState::new(service);
    let result = event_loop(&mut terminal, &mut state).await;

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

async fn event_loop<B: Backend>(terminal: &mut Terminal<B>, state: &mut AppState) -> Result<()> {
    tracing::info!("tui started");
    while !state.should_quit {
        state.chat.tick().await;
        terminal.draw(|f| draw_ui(f, state))?;

        if event::poll(TICK)? {
            if let Event::Key(key) = event::read()? {
                state.handle_key(key);
            }
        }
    }
    tracing::info!("tui stopped");
    Ok(())
}
