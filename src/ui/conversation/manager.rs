use crate::error::ChatError;
use crate::events::ResponseMode;
use crate::llm::CompletionService;
use crate::prompts::EXAMPLE_QUESTIONS;
use crate::session::{Session, SessionManager, SubmitOutcome, Transcript};
use crate::ui::conversation::composer::ComposerResult;
use crate::ui::conversation::{
    ConversationComposer, Notice, ParsedCommand, SlashCommand, ThinkingIndicator, TranscriptView,
    get_help_text,
};
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind};
use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    widgets::Widget,
};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Actions the chatbot page asks the app to perform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatAction {
    None,
    Exit,
}

/// Session plus the manager that owns its remote binding
struct Conversation {
    session: Session,
    manager: SessionManager,
}

type SubmitResult = (Conversation, Result<SubmitOutcome, ChatError>);

/// A question whose reply is still streaming in a background task
struct InFlight {
    question: String,
    partial: String,
    chunks: mpsc::UnboundedReceiver<String>,
    task: JoinHandle<SubmitResult>,
}

/// Chatbot page: accumulated streaming replies, newest exchange first
pub struct ChatScreen {
    service: Arc<dyn CompletionService>,
    conversation: Option<Conversation>,
    shown: Transcript,
    composer: ConversationComposer,
    notice: Option<Notice>,
    in_flight: Option<InFlight>,
    scroll: usize,
}

impl ChatScreen {
    pub fn new(service: Arc<dyn CompletionService>) -> Self {
        let conversation = Self::fresh_conversation(service.clone());
        let mut composer = ConversationComposer::new(
            "💬 Your Question",
            "How are you feeling today? (Enter to send, / for commands)",
        );
        composer.set_focus(true);

        Self {
            service,
            conversation: Some(conversation),
            shown: Transcript::new(),
            composer,
            notice: None,
            in_flight: None,
            scroll: 0,
        }
    }

    fn fresh_conversation(service: Arc<dyn CompletionService>) -> Conversation {
        let conversation = Conversation {
            session: Session::new(),
            manager: SessionManager::new(service, ResponseMode::StreamingAccumulated),
        };
        tracing::debug!(
            session = %conversation.session.id(),
            created_at = %conversation.session.created_at(),
            mode = %conversation.manager.mode(),
            "chat session opened"
        );
        conversation
    }

    #[allow(dead_code)]
    pub fn transcript(&self) -> &Transcript {
        &self.shown
    }

    #[allow(dead_code)]
    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn is_pending(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Whether Esc should stay inside the page
    pub fn captures_escape(&self) -> bool {
        self.composer.palette_open()
    }

    pub fn set_focus(&mut self, has_focus: bool) {
        self.composer.set_focus(has_focus);
    }

    /// Handle key input
    pub fn handle_key(&mut self, key: KeyEvent) -> ChatAction {
        if key.kind != KeyEventKind::Press {
            return ChatAction::None;
        }

        match key.code {
            KeyCode::PageUp => {
                self.scroll = self.scroll.saturating_sub(5);
                return ChatAction::None;
            }
            KeyCode::PageDown => {
                self.scroll += 5;
                return ChatAction::None;
            }
            _ => {}
        }

        match self.composer.handle_key(key) {
            ComposerResult::Submitted(question) => {
                self.submit(question);
                ChatAction::None
            }
            ComposerResult::Command(command) => self.handle_slash_command(command),
            ComposerResult::None => ChatAction::None,
        }
    }

    /// Start answering `question` in the background
    pub fn submit(&mut self, question: String) {
        if self.in_flight.is_some() {
            self.composer.set_content(question);
            self.notice = Some(Notice::warning(
                "Please wait for the current reply to finish.",
            ));
            return;
        }

        let Some(mut conversation) = self.conversation.take() else {
            return;
        };

        let (tx, chunks) = mpsc::unbounded_channel();
        let prompt = question.clone();
        let task = tokio::spawn(async move {
            let mut display = move |chunk: &str| {
                let _ = tx.send(chunk.to_string());
            };
            let result = conversation
                .manager
                .submit(&mut conversation.session, &prompt, &mut display)
                .await;
            (conversation, result)
        });

        self.notice = None;
        self.in_flight = Some(InFlight {
            question,
            partial: String::new(),
            chunks,
            task,
        });
    }

    /// Drain streamed fragments and collect a finished reply.
    ///
    /// Called once per frame by the app loop.
    pub async fn tick(&mut self) {
        let Some(in_flight) = self.in_flight.as_mut() else {
            return;
        };

        while let Ok(chunk) = in_flight.chunks.try_recv() {
            in_flight.partial.push_str(&chunk);
        }

        if !in_flight.task.is_finished() {
            return;
        }

        let Some(in_flight) = self.in_flight.take() else {
            return;
        };

        match in_flight.task.await {
            Ok((conversation, result)) => {
                self.shown = conversation.session.transcript().clone();
                self.conversation = Some(conversation);
                self.finish(result);
            }
            Err(err) => {
                tracing::error!(error = %err, "reply task failed");
                self.conversation = Some(Self::fresh_conversation(self.service.clone()));
                self.shown = Transcript::new();
                self.notice = Some(Notice::error(
                    "The reply could not be completed and the conversation was reset.",
                ));
            }
        }
    }

    fn finish(&mut self, result: Result<SubmitOutcome, ChatError>) {
        match result {
            Ok(SubmitOutcome::Appended) => {
                self.scroll = 0;
            }
            Ok(SubmitOutcome::Duplicate) => {}
            Err(err) if err.is_user_correctable() => {
                self.notice = Some(Notice::warning(
                    "Please enter a question before submitting.",
                ));
            }
            Err(err) => {
                self.notice = Some(Notice::error(err.to_string()));
            }
        }
    }

    fn handle_slash_command(&mut self, command: ParsedCommand) -> ChatAction {
        match command.command {
            SlashCommand::Clear => {
                if self.in_flight.is_some() {
                    self.notice = Some(Notice::warning(
                        "Please wait for the current reply to finish.",
                    ));
                } else if let Some(conversation) = self.conversation.as_mut() {
                    conversation.manager.clear(&mut conversation.session);
                    self.shown = Transcript::new();
                    self.scroll = 0;
                    self.notice = Some(Notice::success("Chatbot history cleared!"));
                }
                ChatAction::None
            }
            SlashCommand::Example => {
                match command.example_target() {
                    Some(question) => {
                        self.composer.set_content(question);
                        self.notice = None;
                    }
                    None => {
                        self.notice = Some(Notice::info(format!(
                            "Pick an example with /example 1-{}",
                            EXAMPLE_QUESTIONS.len()
                        )));
                    }
                }
                ChatAction::None
            }
            SlashCommand::Help => {
                self.notice = Some(Notice::info(get_help_text()));
                ChatAction::None
            }
            SlashCommand::Quit => ChatAction::Exit,
        }
    }

    /// Draw the page into `area`
    pub fn render(&self, area: Rect, buf: &mut Buffer) {
        let indicator_height = if self.is_pending() { 2 } else { 0 };
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(5),
                Constraint::Length(indicator_height),
                Constraint::Length(1),
                Constraint::Length(3),
            ])
            .split(area);

        TranscriptView::new(&self.shown)
            .scroll(self.scroll)
            .render(chunks[0], buf);

        if let Some(in_flight) = &self.in_flight {
            ThinkingIndicator::new(&in_flight.question, &in_flight.partial).render(chunks[1], buf);
        }

        if let Some(notice) = &self.notice {
            notice.render(chunks[2], buf);
        }

        self.composer.render(chunks[3], buf);
    }
}
