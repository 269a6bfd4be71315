//! Transcript display component

use crate::events::{Message, Role};
use crate::prompts::example_list;
use crate::session::Transcript;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Widget},
};

/// Read-only view of a transcript, drawn in stored order.
///
/// The chatbot page keeps the newest exchange at the front of the
/// transcript, so the latest answer is always the first thing on screen.
pub struct TranscriptView<'a> {
    transcript: &'a Transcript,
    scroll: usize,
}

impl<'a> TranscriptView<'a> {
    pub fn new(transcript: &'a Transcript) -> Self {
        Self {
            transcript,
            scroll: 0,
        }
    }

    /// Skip the first `lines` rendered lines
    pub fn scroll(mut self, lines: usize) -> Self {
        self.scroll = lines;
        self
    }

    fn lines(&self, width: u16) -> Vec<Line<'static>> {
        let mut all_lines = Vec::new();
        for message in self.transcript.iter() {
            all_lines.extend(render_message(message, width));
            all_lines.push(Line::from(""));
        }
        all_lines
    }
}

impl Widget for TranscriptView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .borders(Borders::ALL)
            .title("📜 Chat History");

        let inner_area = block.inner(area);
        block.render(area, buf);

        let lines = if self.transcript.is_empty() {
            welcome_lines()
        } else {
            self.lines(inner_area.width)
        };

        let start = self.scroll.min(lines.len().saturating_sub(1));
        for (i, line) in lines
            .iter()
            .skip(start)
            .take(inner_area.height as usize)
            .enumerate()
        {
            buf.set_line(inner_area.x, inner_area.y + i as u16, line, inner_area.width);
        }
    }
}

fn welcome_lines() -> Vec<Line<'static>> {
    let mut lines = vec![
        Line::from(Span::styled(
            "Welcome to MindMate 🌱",
            Style::default().fg(Color::Green),
        )),
        Line::from(""),
        Line::from(Span::styled(
            "Share how you feel below, or type /example to pick a starter question.",
            Style::default().fg(Color::Gray),
        )),
        Line::from(""),
        Line::from(Span::styled(
            "Enter sends, Shift+Enter adds a new line, Esc opens the menu.",
            Style::default().fg(Color::DarkGray),
        )),
        Line::from(""),
    ];
    lines.extend(
        example_list()
            .lines()
            .map(|line| Line::from(Span::styled(line.to_string(), Style::default().fg(Color::Cyan)))),
    );
    lines
}

fn render_message(message: &Message, width: u16) -> Vec<Line<'static>> {
    let (icon, style) = match message.role() {
        Role::User => ("👤", Style::default().fg(Color::Blue)),
        Role::Assistant => ("🤖", Style::default().fg(Color::Green)),
    };

    let mut lines = vec![Line::from(Span::styled(
        format!("{icon} {}:", message.role().label()),
        style.add_modifier(Modifier::BOLD),
    ))];

    for content_line in wrap_text(message.text(), width.saturating_sub(2) as usize) {
        lines.push(Line::from(vec![
            Span::raw("  "),
            Span::styled(content_line, style),
        ]));
    }

    lines
}

/// Word-wrap `text` to `width` columns, keeping explicit line breaks
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
    if width == 0 {
        return vec![text.to_string()];
    }

    let mut lines = Vec::new();
    for paragraph in text.split('\n') {
        let mut current_line = String::new();
        let mut current_width = 0;

        for word in paragraph.split_whitespace() {
            let word_width = word.chars().count();
            if current_width == 0 {
                current_line.push_str(word);
                current_width = word_width;
            } else if current_width + 1 + word_width <= width {
                current_line.push(' ');
                current_line.push_str(word);
                current_width += 1 + word_width;
            } else {
                lines.push(std::mem::take(&mut current_line));
                current_line.push_str(word);
                current_width = word_width;
            }
        }

        lines.push(current_line);
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buffer_text(buf: &Buffer) -> String {
        let area = buf.area;
        (area.y..area.y + area.height)
            .map(|y| {
                (area.x..area.x + area.width)
                    .map(|x| buf.get(x, y).symbol().to_string())
                    .collect::<String>()
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn wraps_on_word_boundaries() {
        assert_eq!(
            wrap_text("take a slow deep breath", 10),
            vec!["take a", "slow deep", "breath"]
        );
    }

    #[test]
    fn keeps_paragraph_breaks() {
        assert_eq!(wrap_text("one\n\ntwo", 20), vec!["one", "", "two"]);
    }

    #[test]
    fn overlong_words_get_their_own_line() {
        assert_eq!(
            wrap_text("a extraordinarily b", 5),
            vec!["a", "extraordinarily", "b"]
        );
    }

    #[test]
    fn empty_transcript_shows_welcome() {
        let transcript = Transcript::new();
        let area = Rect::new(0, 0, 60, 8);
        let mut buf = Buffer::empty(area);

        TranscriptView::new(&transcript).render(area, &mut buf);

        assert!(buffer_text(&buf).contains("Welcome to MindMate"));
    }
}
