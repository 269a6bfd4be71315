use std::path::Path;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Where log lines go
#[derive(Debug, Clone, Copy)]
pub enum LogTarget<'a> {
    /// Line-mode commands share the terminal with stderr
    Stderr,
    /// The full-screen UI owns the terminal, so logs go to a daily file
    File(&'a Path),
}

/// Install the global subscriber. `RUST_LOG` overrides `level`.
pub fn init(target: LogTarget<'_>, level: &str) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    match target {
        LogTarget::Stderr => {
            let _ = tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
                .try_init();
        }
        LogTarget::File(dir) => {
            let file_appender = RollingFileAppender::new(Rotation::DAILY, dir, "mindmate.log");
            let _ = tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().with_writer(file_appender).with_ansi(false))
                .try_init();
        }
    }
}
