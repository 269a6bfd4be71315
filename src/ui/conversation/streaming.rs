use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::Widget,
};
use std::time::{SystemTime, UNIX_EPOCH};

/// Animated "thinking" line shown while a reply is in flight
pub struct ThinkingIndicator<'a> {
    question: &'a str,
    partial: &'a str,
}

impl<'a> ThinkingIndicator<'a> {
    pub fn new(question: &'a str, partial: &'a str) -> Self {
        Self { question, partial }
    }
}

fn animation_frame(period_ms: u128, frames: u128) -> u128 {
    (SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis()
        / period_ms)
        % frames
}

impl Widget for ThinkingIndicator<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.height == 0 {
            return;
        }

        let dots = match animation_frame(300, 4) {
            0 => ".",
            1 => "..",
            2 => "...",
            _ => "   ",
        };

        let indicator = Line::from(vec![
            Span::styled("🤖 ", Style::default().fg(Color::Green)),
            Span::styled("MindMate AI thinking", Style::default().fg(Color::Green)),
            Span::styled(dots, Style::default().fg(Color::Yellow)),
            Span::styled(
                format!("  {}", self.question),
                Style::default().fg(Color::DarkGray),
            ),
        ]);
        buf.set_line(area.x, area.y, &indicator, area.width);

        if area.height > 1 && !self.partial.is_empty() {
            let cursor = if animation_frame(500, 2) == 0 { "▋" } else { " " };
            let tail: String = tail_chars(self.partial, area.width.saturating_sub(4) as usize);
            let line = Line::from(vec![
                Span::raw("  "),
                Span::styled(tail, Style::default().fg(Color::Green)),
                Span::styled(cursor, Style::default().fg(Color::Green)),
            ]);
            buf.set_line(area.x, area.y + 1, &line, area.width);
        }
    }
}

/// Last `count` characters of the newest line of `text`
fn tail_chars(text: &str, count: usize) -> String {
    let last_line = text.rsplit('\n').next().unwrap_or_default();
    let total = last_line.chars().count();
    last_line.chars().skip(total.saturating_sub(count)).collect()
}

/// Severity of a one-line status message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Info,
    Success,
    Warning,
    Error,
}

/// One-line status message shown under a page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub text: String,
}

impl Notice {
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Info,
            text: text.into(),
        }
    }

    pub fn success(text: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Success,
            text: text.into(),
        }
    }

    pub fn warning(text: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Warning,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Error,
            text: text.into(),
        }
    }

    pub fn line(&self) -> Line<'_> {
        let (icon, color) = match self.kind {
            NoticeKind::Info => ("ℹ️ ", Color::Blue),
            NoticeKind::Success => ("✅", Color::Green),
            NoticeKind::Warning => ("⚠️ ", Color::Yellow),
            NoticeKind::Error => ("❌", Color::Red),
        };

        Line::from(vec![
            Span::styled(icon, Style::default().fg(color)),
            Span::raw(" "),
            Span::styled(
                self.text.as_str(),
                Style::default().fg(color).add_modifier(Modifier::BOLD),
            ),
        ])
    }
}

impl Widget for &Notice {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.height > 0 {
            buf.set_line(area.x, area.y, &self.line(), area.width);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tail_keeps_the_end_of_the_last_line() {
        assert_eq!(tail_chars("first\nsecond line", 4), "line");
        assert_eq!(tail_chars("short", 10), "short");
        assert_eq!(tail_chars("", 3), "");
    }

    #[test]
    fn notice_line_carries_text() {
        let notice = Notice::warning("Please enter a question.");
        let rendered: String = notice
            .line()
            .spans
            .iter()
            .map(|span| span.content.as_ref())
            .collect();
        assert!(rendered.ends_with("Please enter a question."));
        assert_eq!(notice.kind, NoticeKind::Warning);
    }
}
