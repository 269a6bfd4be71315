use crate::ui::conversation::commands::{
    CommandEntry, ParsedCommand, command_entries, parse_slash_command,
};
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Widget},
};

/// Result returned when the user interacts with the composer
#[derive(Debug, PartialEq)]
pub enum ComposerResult {
    Submitted(String),
    Command(ParsedCommand),
    None,
}

/// Text being edited. The cursor counts characters, not bytes.
#[derive(Debug, Clone, Default)]
struct TextAreaState {
    content: String,
    cursor: usize,
}

impl TextAreaState {
    fn char_len(&self) -> usize {
        self.content.chars().count()
    }

    fn byte_offset(&self, cursor: usize) -> usize {
        self.content
            .char_indices()
            .nth(cursor)
            .map(|(i, _)| i)
            .unwrap_or(self.content.len())
    }

    fn insert(&mut self, c: char) {
        let at = self.byte_offset(self.cursor);
        self.content.insert(at, c);
        self.cursor += 1;
    }

    fn backspace(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        self.cursor -= 1;
        let at = self.byte_offset(self.cursor);
        self.content.remove(at);
        true
    }

    fn delete(&mut self) -> bool {
        if self.cursor >= self.char_len() {
            return false;
        }
        let at = self.byte_offset(self.cursor);
        self.content.remove(at);
        true
    }

    fn replace(&mut self, content: String) {
        self.content = content;
        self.cursor = self.char_len();
    }

    fn take(&mut self) -> String {
        self.cursor = 0;
        std::mem::take(&mut self.content)
    }
}

/// Single text input with an optional slash-command palette
#[derive(Debug, Clone)]
pub struct ConversationComposer {
    state: TextAreaState,
    title: String,
    placeholder: String,
    has_focus: bool,
    command_entries: Vec<CommandEntry>,
    filtered_commands: Vec<CommandEntry>,
    show_command_palette: bool,
    selected_command: Option<usize>,
}

impl ConversationComposer {
    /// Composer for the chatbot page, with slash commands enabled
    pub fn new(title: impl Into<String>, placeholder: impl Into<String>) -> Self {
        Self {
            command_entries: command_entries(),
            ..Self::plain(title, placeholder)
        }
    }

    /// Composer that treats every line as plain text
    pub fn plain(title: impl Into<String>, placeholder: impl Into<String>) -> Self {
        Self {
            state: TextAreaState::default(),
            title: title.into(),
            placeholder: placeholder.into(),
            has_focus: false,
            command_entries: Vec::new(),
            filtered_commands: Vec::new(),
            show_command_palette: false,
            selected_command: None,
        }
    }

    fn commands_enabled(&self) -> bool {
        !self.command_entries.is_empty()
    }

    /// Handle key input
    pub fn handle_key(&mut self, key: KeyEvent) -> ComposerResult {
        if key.kind != KeyEventKind::Press {
            return ComposerResult::None;
        }

        match key.code {
            KeyCode::Enter => {
                if key.modifiers.contains(KeyModifiers::SHIFT) {
                    self.state.insert('\n');
                } else if self.show_command_palette {
                    self.apply_selected_command();
                } else {
                    let content = self.state.take();
                    self.close_command_palette();
                    if self.commands_enabled() {
                        if let Some(command) = parse_slash_command(&content) {
                            return ComposerResult::Command(command);
                        }
                    }
                    return ComposerResult::Submitted(content);
                }
            }
            KeyCode::Up if self.show_command_palette => self.move_command_selection(-1),
            KeyCode::Down if self.show_command_palette => self.move_command_selection(1),
            KeyCode::Esc if self.show_command_palette => self.close_command_palette(),
            KeyCode::Tab if self.show_command_palette => {
                self.apply_selected_command();
            }
            KeyCode::Char(c) => {
                self.state.insert(c);

                if self.show_command_palette {
                    if self.state.content.starts_with('/') && !c.is_whitespace() {
                        self.refresh_command_palette();
                    } else {
                        self.close_command_palette();
                    }
                } else if self.commands_enabled() && self.state.content == "/" {
                    self.open_command_palette();
                }
            }
            KeyCode::Backspace => {
                if self.state.backspace() {
                    self.after_removal();
                }
            }
            KeyCode::Delete => {
                if self.state.delete() {
                    self.after_removal();
                }
            }
            KeyCode::Left => {
                self.state.cursor = self.state.cursor.saturating_sub(1);
            }
            KeyCode::Right => {
                if self.state.cursor < self.state.char_len() {
                    self.state.cursor += 1;
                }
            }
            KeyCode::Home => self.state.cursor = 0,
            KeyCode::End => self.state.cursor = self.state.char_len(),
            _ => {}
        }

        ComposerResult::None
    }

    fn after_removal(&mut self) {
        if self.show_command_palette {
            if self.state.content.starts_with('/') {
                self.refresh_command_palette();
            } else {
                self.close_command_palette();
            }
        }
    }

    fn open_command_palette(&mut self) {
        self.show_command_palette = true;
        self.selected_command = Some(0);
        self.refresh_command_palette();
    }

    fn close_command_palette(&mut self) {
        self.show_command_palette = false;
        self.filtered_commands.clear();
        self.selected_command = None;
    }

    fn refresh_command_palette(&mut self) {
        let query = self.state.content.trim_start_matches('/').to_lowercase();
        self.filtered_commands = self
            .command_entries
            .iter()
            .filter(|entry| query.is_empty() || entry.keyword.starts_with(&query))
            .copied()
            .collect();

        self.selected_command = if self.filtered_commands.is_empty() {
            None
        } else {
            let index = self.selected_command.unwrap_or(0);
            Some(index.min(self.filtered_commands.len() - 1))
        };
    }

    fn move_command_selection(&mut self, delta: isize) {
        if self.filtered_commands.is_empty() {
            self.selected_command = None;
            return;
        }

        let len = self.filtered_commands.len() as isize;
        let current = self.selected_command.unwrap_or(0) as isize;
        self.selected_command = Some((current + delta).rem_euclid(len) as usize);
    }

    fn apply_selected_command(&mut self) {
        let Some(entry) = self
            .selected_command
            .and_then(|index| self.filtered_commands.get(index).copied())
        else {
            return;
        };

        self.state.replace(format!("/{} ", entry.keyword));
        self.close_command_palette();
    }

    /// Whether Esc is currently consumed by the palette
    pub fn palette_open(&self) -> bool {
        self.show_command_palette
    }

    pub fn set_focus(&mut self, has_focus: bool) {
        self.has_focus = has_focus;
    }

    pub fn content(&self) -> &str {
        &self.state.content
    }

    /// Replace the text and move the cursor to its end
    pub fn set_content(&mut self, content: impl Into<String>) {
        self.state.replace(content.into());
        self.close_command_palette();
    }

    pub fn clear(&mut self) {
        self.state.take();
        self.close_command_palette();
    }
}

impl Widget for &ConversationComposer {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .borders(Borders::ALL)
            .title(self.title.as_str())
            .style(if self.has_focus {
                Style::default().fg(Color::Green)
            } else {
                Style::default().fg(Color::Gray)
            });

        let inner_area = block.inner(area);
        block.render(area, buf);

        if self.state.content.is_empty() {
            let placeholder_line = Line::from(Span::styled(
                self.placeholder.as_str(),
                Style::default().fg(Color::DarkGray),
            ));
            buf.set_line(inner_area.x, inner_area.y, &placeholder_line, inner_area.width);
        } else {
            let mut content = self.state.content.clone();
            if self.has_focus {
                content.insert(self.state.byte_offset(self.state.cursor), '▌');
            }

            for (i, line_text) in content.split('\n').enumerate() {
                if i >= inner_area.height as usize {
                    break;
                }
                let line = Line::from(Span::raw(line_text));
                buf.set_line(inner_area.x, inner_area.y + i as u16, &line, inner_area.width);
            }
        }

        if self.show_command_palette {
            let palette_height = (self.filtered_commands.len().min(5) + 2) as u16;
            let palette_area = Rect {
                x: inner_area.x,
                y: inner_area.y.saturating_sub(palette_height),
                width: inner_area.width,
                height: palette_height,
            }
            .intersection(buf.area);

            let block = Block::default()
                .borders(Borders::ALL)
                .title("Commands")
                .style(Style::default().fg(Color::Blue));
            let inner = block.inner(palette_area);
            block.render(palette_area, buf);

            for (index, entry) in self.filtered_commands.iter().enumerate() {
                if index >= inner.height as usize {
                    break;
                }

                let style = if self.selected_command == Some(index) {
                    Style::default()
                        .fg(Color::Black)
                        .bg(Color::Cyan)
                        .add_modifier(Modifier::BOLD)
                } else {
                    Style::default().fg(Color::White)
                };

                let line = Line::from(vec![
                    Span::styled(format!("/{}", entry.keyword), style),
                    Span::styled("  ", Style::default()),
                    Span::styled(entry.description, Style::default().fg(Color::Gray)),
                ]);

                buf.set_line(inner.x, inner.y + index as u16, &line, inner.width);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::conversation::commands::SlashCommand;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn type_text(composer: &mut ConversationComposer, text: &str) {
        for c in text.chars() {
            composer.handle_key(press(KeyCode::Char(c)));
        }
    }

    #[test]
    fn enter_submits_and_clears() {
        let mut composer = ConversationComposer::new("Question", "Type here");
        type_text(&mut composer, "hello");

        assert_eq!(
            composer.handle_key(press(KeyCode::Enter)),
            ComposerResult::Submitted("hello".to_string())
        );
        assert_eq!(composer.content(), "");
    }

    #[test]
    fn enter_on_blank_input_still_submits() {
        let mut composer = ConversationComposer::new("Question", "Type here");
        type_text(&mut composer, "   ");

        assert_eq!(
            composer.handle_key(press(KeyCode::Enter)),
            ComposerResult::Submitted("   ".to_string())
        );
        assert_eq!(composer.content(), "");
    }

    #[test]
    fn editing_handles_multibyte_characters() {
        let mut composer = ConversationComposer::plain("Request", "");
        type_text(&mut composer, "héllo😊");
        composer.handle_key(press(KeyCode::Left));
        composer.handle_key(press(KeyCode::Backspace));
        composer.handle_key(press(KeyCode::Home));
        composer.handle_key(press(KeyCode::Delete));

        assert_eq!(composer.content(), "éll😊");
    }

    #[test]
    fn slash_opens_palette_and_tab_completes() {
        let mut composer = ConversationComposer::new("Question", "");
        type_text(&mut composer, "/cl");
        assert!(composer.palette_open());

        composer.handle_key(press(KeyCode::Tab));
        assert!(!composer.palette_open());
        assert_eq!(composer.content(), "/clear ");

        match composer.handle_key(press(KeyCode::Enter)) {
            ComposerResult::Command(parsed) => assert_eq!(parsed.command, SlashCommand::Clear),
            other => panic!("expected command, got {other:?}"),
        }
    }

    #[test]
    fn esc_closes_palette_first() {
        let mut composer = ConversationComposer::new("Question", "");
        type_text(&mut composer, "/");
        assert!(composer.palette_open());

        composer.handle_key(press(KeyCode::Esc));
        assert!(!composer.palette_open());
        assert_eq!(composer.content(), "/");
    }

    #[test]
    fn plain_composer_submits_slashes_as_text() {
        let mut composer = ConversationComposer::plain("Request", "");
        type_text(&mut composer, "/clear");
        assert!(!composer.palette_open());

        assert_eq!(
            composer.handle_key(press(KeyCode::Enter)),
            ComposerResult::Submitted("/clear".to_string())
        );
    }

    #[test]
    fn set_content_places_cursor_at_end() {
        let mut composer = ConversationComposer::new("Question", "");
        composer.set_content("How can I calm");
        type_text(&mut composer, " down?");

        assert_eq!(composer.content(), "How can I calm down?");
    }
}
