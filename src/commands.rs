use anyhow::{Context, Result};
use std::io::{self, BufRead, Write};
use std::sync::Arc;

use crate::config::Config;
use crate::error::ChatError;
use crate::events::{ResponseMode, Role};
use crate::llm::CompletionService;
use crate::prompts::{DISCLAIMER, FOOTER};
use crate::session::{Session, SessionManager};
use crate::streaming::NullSink;

/// Write a default config file unless one is already there
pub fn init(config: &Config) -> Result<()> {
    let stdout = io::stdout();
    init_with(config, &mut stdout.lock())
}

pub fn init_with<W: Write>(config: &Config, out: &mut W) -> Result<()> {
    let path = config.config_path();
    if path.exists() {
        writeln!(out, "📄 Config already exists at {}", path.display())?;
        return Ok(());
    }

    config.save()?;
    writeln!(out, "✅ Wrote {}", path.display())?;
    writeln!(
        out,
        "Set {} in your environment or add api_key to the file.",
        config.api_key_env
    )?;
    Ok(())
}

/// Ask one question and print the complete answer
pub async fn ask(service: Arc<dyn CompletionService>, question: &str) -> Result<()> {
    let stdout = io::stdout();
    ask_with(service, question, &mut stdout.lock()).await
}

pub async fn ask_with<W: Write>(
    service: Arc<dyn CompletionService>,
    question: &str,
    out: &mut W,
) -> Result<()> {
    let mut manager = SessionManager::new(service, ResponseMode::SingleShot);
    let mut session = Session::new();

    writeln!(out, "🌟 Gemini-Enhanced AI for Mental Health & Emotional Support 🌟")?;
    writeln!(out, "Feel free to ask anything. Your mental health matters!")?;
    writeln!(out)?;

    if !question.trim().is_empty() {
        writeln!(out, "⏳ Thinking...")?;
        out.flush()?;
    }

    match manager.submit(&mut session, question, &mut NullSink).await {
        Ok(_) => {
            let reply = session
                .transcript()
                .messages()
                .last()
                .filter(|m| m.role() == Role::Assistant)
                .map(|m| m.text())
                .unwrap_or_default();
            writeln!(out, "🤖 AI Response:")?;
            writeln!(out, "{reply}")?;
        }
        Err(ChatError::EmptyInput) => {
            writeln!(out, "⚠️  Please enter a question before submitting.")?;
        }
        Err(err) => {
            writeln!(out, "❌ {err}")?;
        }
    }

    writeln!(out, "{}", "-".repeat(50))?;
    writeln!(out, "{FOOTER}")?;
    writeln!(out, "{DISCLAIMER}")?;
    Ok(())
}

/// Interactive streaming chat on stdin/stdout
pub async fn chat(service: Arc<dyn CompletionService>) -> Result<()> {
    let stdin = io::stdin();
    chat_with(service, stdin.lock(), &mut io::stdout()).await
}

pub async fn chat_with<R: BufRead, W: Write + Send>(
    service: Arc<dyn CompletionService>,
    mut input: R,
    out: &mut W,
) -> Result<()> {
    let mut manager = SessionManager::new(service, ResponseMode::StreamingTransient);
    let mut session = Session::new();

    writeln!(out, "🌸 Gemini Emotional Support Chatbot 🌸")?;
    writeln!(out, "Your Companion for Mental Health & Emotional Well-being")?;
    writeln!(
        out,
        "Hello! I'm here to support you. You can share your feelings, and I'll respond with empathy and understanding."
    )?;
    writeln!(out, "(/history shows the conversation, /clear starts over, /quit leaves)")?;

    loop {
        write!(out, "\n💭 How are you feeling today? ")?;
        out.flush()?;

        let mut line = String::new();
        let read = input
            .read_line(&mut line)
            .context("Failed to read user input")?;
        if read == 0 {
            break;
        }

        match line.trim() {
            "/quit" | "/exit" | "/bye" => break,
            "/clear" => {
                manager.clear(&mut session);
                writeln!(out, "✅ Chat history cleared!")?;
                continue;
            }
            "/history" => {
                print_history(&manager, out)?;
                continue;
            }
            _ => {}
        }

        let question = line.trim();
        if !question.is_empty() {
            writeln!(out, "👤 You: {question}")?;
            write!(out, "🤖 Gemini: ")?;
            out.flush()?;
        }

        let mut write_error: Option<io::Error> = None;
        let result = {
            let mut display = |chunk: &str| {
                if write_error.is_none() {
                    if let Err(err) = write!(out, "{chunk}").and_then(|()| out.flush()) {
                        write_error = Some(err);
                    }
                }
            };
            manager.submit(&mut session, question, &mut display).await
        };
        if let Some(err) = write_error {
            return Err(err).context("Failed to write reply");
        }

        match result {
            Ok(_) => writeln!(out)?,
            Err(ChatError::EmptyInput) => {
                writeln!(out, "❌ Please enter a message to continue.")?;
            }
            Err(err) => {
                writeln!(out)?;
                writeln!(out, "❌ {err}")?;
            }
        }
    }

    writeln!(out, "👋 Take care of yourself.")?;
    Ok(())
}

fn print_history<W: Write>(manager: &SessionManager, out: &mut W) -> Result<()> {
    let history = manager.chat_history();
    writeln!(out, "### Chat History")?;
    if history.is_empty() {
        writeln!(out, "(empty)")?;
    }
    for message in history {
        writeln!(out, "{}: {}", message.role(), message.text())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Script, ScriptedService};
    use std::fs;
    use std::io::Cursor;
    use tempfile::TempDir;

    fn render(out: Vec<u8>) -> String {
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn init_creates_a_missing_named_config() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("fresh").join("my.toml");
        let config = Config::at(Some(&path));
        let mut out = Vec::new();

        init_with(&config, &mut out).unwrap();

        assert!(render(out).contains(&format!("✅ Wrote {}", path.display())));
        let written = Config::load(Some(&path)).unwrap();
        assert_eq!(written.model, config.model);
        assert!(!dir.path().join("fresh").join("config.toml").exists());
    }

    #[test]
    fn init_leaves_an_existing_config_alone() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("my.toml");
        fs::write(&path, "model = \"gemini-1.5-pro\"\n").unwrap();
        let mut out = Vec::new();

        init_with(&Config::at(Some(&path)), &mut out).unwrap();

        assert!(render(out).contains("Config already exists"));
        assert_eq!(fs::read_to_string(&path).unwrap(), "model = \"gemini-1.5-pro\"\n");
    }

    #[tokio::test]
    async fn ask_prints_the_reply() {
        let service = Arc::new(ScriptedService::new(vec![Script::reply("Try deep breathing.")]));
        let mut out = Vec::new();

        ask_with(service, "I feel anxious", &mut out).await.unwrap();

        let text = render(out);
        assert!(text.contains("🤖 AI Response:\nTry deep breathing.\n"));
        assert!(text.contains(DISCLAIMER));
    }

    #[tokio::test]
    async fn ask_warns_on_blank_question() {
        let service = Arc::new(ScriptedService::new(vec![]));
        let mut out = Vec::new();

        ask_with(service.clone(), "   ", &mut out).await.unwrap();

        assert!(render(out).contains("Please enter a question before submitting."));
        assert!(service.prompts().is_empty());
    }

    #[tokio::test]
    async fn ask_reports_remote_errors_without_failing() {
        let service = Arc::new(ScriptedService::new(vec![Script::fail("quota exceeded")]));
        let mut out = Vec::new();

        ask_with(service, "hello", &mut out).await.unwrap();

        assert!(render(out).contains("quota exceeded"));
    }

    #[tokio::test]
    async fn chat_streams_chunks_and_keeps_history() {
        let service = Arc::new(ScriptedService::new(vec![
            Script::chunks(&["Hel", "lo"]),
            Script::chunks(&["Again"]),
        ]));
        let input = Cursor::new("hi\n\n/history\nmore\n/quit\n");
        let mut out = Vec::new();

        chat_with(service.clone(), input, &mut out).await.unwrap();

        let text = render(out);
        assert!(text.contains("🤖 Gemini: Hello\n"));
        assert!(text.contains("Please enter a message to continue."));
        assert!(text.contains("### Chat History\nuser: hi\nassistant: Hello\n"));
        assert_eq!(service.context_lengths(), vec![0, 2]);
    }

    /// Accepts output until a write contains `fail_on`
    struct ClosedPipe {
        written: Vec<u8>,
        fail_on: &'static str,
    }

    impl Write for ClosedPipe {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if String::from_utf8_lossy(buf).contains(self.fail_on) {
                return Err(io::Error::from(io::ErrorKind::BrokenPipe));
            }
            self.written.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn chat_stops_when_reply_cannot_be_written() {
        let service = Arc::new(ScriptedService::new(vec![
            Script::chunks(&["Breathe", " slowly"]),
            Script::chunks(&["never asked"]),
        ]));
        let input = Cursor::new("hi
again
");
        let mut out = ClosedPipe {
            written: Vec::new(),
            fail_on: "Breathe",
        };

        let err = chat_with(service.clone(), input, &mut out).await.unwrap_err();

        let kind = err.root_cause().downcast_ref::<io::Error>().map(|e| e.kind());
        assert_eq!(kind, Some(io::ErrorKind::BrokenPipe));
        assert_eq!(service.prompts(), vec!["hi".to_string()]);
    }

    #[tokio::test]
    async fn chat_clear_drops_context() {
        let service = Arc::new(ScriptedService::new(vec![
            Script::chunks(&["one"]),
            Script::chunks(&["two"]),
        ]));
        let input = Cursor::new("a\n/clear\nb\n");
        let mut out = Vec::new();

        chat_with(service.clone(), input, &mut out).await.unwrap();

        assert!(render(out).contains("Chat history cleared!"));
        assert_eq!(service.context_lengths(), vec![0, 0]);
    }
}
