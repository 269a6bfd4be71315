//! Secondary pages: anonymous help requests and the feelings questionnaire.
//!
//! Both keep their state only for the life of the process.

use crate::prompts::FEELINGS;
use crate::ui::conversation::composer::ComposerResult;
use crate::ui::conversation::{ConversationComposer, Notice};
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind};
use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget, Wrap},
};

pub struct HelpRequestsPage {
    composer: ConversationComposer,
    requests: Vec<String>,
    notice: Option<Notice>,
}

impl Default for HelpRequestsPage {
    fn default() -> Self {
        Self::new()
    }
}

impl HelpRequestsPage {
    pub fn new() -> Self {
        Self {
            composer: ConversationComposer::plain(
                "📝 Describe what you need help with",
                "Nobody will see your name. Enter submits.",
            ),
            requests: Vec::new(),
            notice: None,
        }
    }

    #[allow(dead_code)]
    pub fn requests(&self) -> &[String] {
        &self.requests
    }

    #[allow(dead_code)]
    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn set_focus(&mut self, has_focus: bool) {
        self.composer.set_focus(has_focus);
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        if let ComposerResult::Submitted(text) = self.composer.handle_key(key) {
            self.submit(&text);
        }
    }

    fn submit(&mut self, text: &str) {
        let text = text.trim();
        if text.is_empty() {
            self.notice = Some(Notice::warning("Please enter a request before submitting."));
            return;
        }

        self.requests.push(text.to_string());
        tracing::info!(count = self.requests.len(), "help request submitted");
        self.notice = Some(Notice::success("Your anonymous request has been submitted!"));
    }

    pub fn render(&self, area: Rect, buf: &mut Buffer) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(4),
                Constraint::Length(1),
                Constraint::Length(3),
            ])
            .split(area);

        let lines: Vec<Line> = if self.requests.is_empty() {
            vec![Line::from(Span::styled(
                "No requests yet. Submit one below to reach out anonymously.",
                Style::default().fg(Color::DarkGray),
            ))]
        } else {
            self.requests
                .iter()
                .enumerate()
                .map(|(i, request)| {
                    Line::from(vec![
                        Span::styled(format!("{}. ", i + 1), Style::default().fg(Color::Cyan)),
                        Span::raw(request.as_str()),
                    ])
                })
                .collect()
        };

        Paragraph::new(lines)
            .wrap(Wrap { trim: false })
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title("🤝 Anonymous Help Requests"),
            )
            .render(chunks[0], buf);

        if let Some(notice) = &self.notice {
            notice.render(chunks[1], buf);
        }

        self.composer.render(chunks[2], buf);
    }
}

#[derive(Default)]
pub struct FeelingsPage {
    selected: [bool; FEELINGS.len()],
    cursor: usize,
    notice: Option<Notice>,
}

impl FeelingsPage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selected(&self) -> Vec<&'static str> {
        FEELINGS
            .iter()
            .zip(self.selected)
            .filter_map(|(feeling, on)| on.then_some(*feeling))
            .collect()
    }

    #[allow(dead_code)]
    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }

        match key.code {
            KeyCode::Up => self.cursor = self.cursor.saturating_sub(1),
            KeyCode::Down => self.cursor = (self.cursor + 1).min(FEELINGS.len() - 1),
            KeyCode::Char(' ') | KeyCode::Enter => {
                self.selected[self.cursor] = !self.selected[self.cursor];
            }
            KeyCode::Char('s') => {
                tracing::info!(selected = self.selected().len(), "questionnaire submitted");
                self.notice = Some(Notice::success("Your responses have been submitted!"));
            }
            KeyCode::Char('c') => {
                self.selected = [false; FEELINGS.len()];
                self.notice = Some(Notice::info("Your responses have been cleared!"));
            }
            _ => {}
        }
    }

    pub fn render(&self, area: Rect, buf: &mut Buffer, has_focus: bool) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(4), Constraint::Length(1)])
            .split(area);

        let mut lines = vec![
            Line::from(Span::styled(
                "How are you feeling today? Select all that apply.",
                Style::default().add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
        ];

        for (i, feeling) in FEELINGS.iter().enumerate() {
            let checkbox = if self.selected[i] { "[x]" } else { "[ ]" };
            let style = if has_focus && i == self.cursor {
                Style::default().fg(Color::Black).bg(Color::Cyan)
            } else {
                Style::default()
            };
            lines.push(Line::from(Span::styled(format!("{checkbox} {feeling}"), style)));
        }

        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            "Space toggles, s submits, c clears",
            Style::default().fg(Color::DarkGray),
        )));

        Paragraph::new(lines)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title("🤔 Feelings Questionnaire"),
            )
            .render(chunks[0], buf);

        if let Some(notice) = &self.notice {
            notice.render(chunks[1], buf);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn help_request_is_listed_after_submit() {
        let mut page = HelpRequestsPage::new();
        for c in "I need someone to talk to".chars() {
            page.handle_key(press(KeyCode::Char(c)));
        }
        page.handle_key(press(KeyCode::Enter));

        assert_eq!(page.requests(), ["I need someone to talk to".to_string()]);
        assert_eq!(
            page.notice().unwrap().text,
            "Your anonymous request has been submitted!"
        );
    }

    #[test]
    fn blank_help_request_is_refused_with_warning() {
        let mut page = HelpRequestsPage::new();
        page.handle_key(press(KeyCode::Char(' ')));
        page.handle_key(press(KeyCode::Enter));

        assert!(page.requests().is_empty());
        assert_eq!(
            page.notice().unwrap().text,
            "Please enter a request before submitting."
        );
    }

    #[test]
    fn feelings_toggle_submit_and_clear() {
        let mut page = FeelingsPage::new();
        page.handle_key(press(KeyCode::Char(' ')));
        page.handle_key(press(KeyCode::Down));
        page.handle_key(press(KeyCode::Down));
        page.handle_key(press(KeyCode::Char(' ')));

        assert_eq!(page.selected(), vec![FEELINGS[0], FEELINGS[2]]);

        page.handle_key(press(KeyCode::Char('s')));
        assert_eq!(
            page.notice().unwrap().text,
            "Your responses have been submitted!"
        );

        page.handle_key(press(KeyCode::Char('c')));
        assert!(page.selected().is_empty());
        assert_eq!(page.notice().unwrap().text, "Your responses have been cleared!");
    }

    #[test]
    fn cursor_stays_in_range() {
        let mut page = FeelingsPage::new();
        page.handle_key(press(KeyCode::Up));
        for _ in 0..10 {
            page.handle_key(press(KeyCode::Down));
        }
        page.handle_key(press(KeyCode::Char(' ')));

        assert_eq!(page.selected(), vec![FEELINGS[FEELINGS.len() - 1]]);
    }
}
