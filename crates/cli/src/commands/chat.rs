use std::future::Future;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::info;
use tripsmith_agent::{AgentRuntime, TurnReply};
use tripsmith_core::config::{AppConfig, LoadOptions};
use tripsmith_core::domain::session::TripSession;
use tripsmith_core::errors::ApplicationError;
use tripsmith_core::notices::NoticeLevel;

use crate::commands::CommandResult;
use crate::logging::init_logging;

const WORD_DELAY: Duration = Duration::from_millis(50);
const CELEBRATION: &str = "🎉 🎉 🎉  Your itinerary is ready!  🎉 🎉 🎉";
const THINKING: &str = "✈️ Planning...";
const QUIT_WORDS: [&str; 3] = ["exit", "quit", "/quit"];

/// How replies are written to the terminal.
#[derive(Clone, Copy, Debug)]
pub struct Presenter {
    pub animate: bool,
    pub word_delay: Duration,
}

impl Presenter {
    pub fn new(animate: bool) -> Self {
        Self { animate, word_delay: WORD_DELAY }
    }

    pub fn plain() -> Self {
        Self::new(false)
    }

    async fn reveal<W>(&self, output: &mut W, text: &str) -> Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        output.write_all(b"Assistant: ").await?;
        if !self.animate {
            output.write_all(text.as_bytes()).await?;
        } else {
            for word in text.split_inclusive(' ') {
                output.write_all(word.as_bytes()).await?;
                output.flush().await?;
                tokio::time::sleep(self.word_delay).await;
            }
        }
        output.write_all(b"\n\n").await?;
        output.flush().await?;
        Ok(())
    }
}

pub fn run(options: LoadOptions, animate: bool) -> CommandResult {
    let config = match AppConfig::load(options) {
        Ok(config) => config,
        Err(error) => {
            let error = ApplicationError::from(error);
            return CommandResult::failure(
                "chat",
                "config_validation",
                format!("{} ({error})", error.user_message()),
                2,
            );
        }
    };
    init_logging(&config.logging);

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "chat",
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                1,
            );
        }
    };

    match runtime.block_on(chat(&config, Presenter::new(animate))) {
        Ok(()) => CommandResult::finished(),
        Err(error) => CommandResult::failure("chat", "chat_session", format!("{error:#}"), 1),
    }
}

async fn chat(config: &AppConfig, presenter: Presenter) -> Result<()> {
    let agent = AgentRuntime::from_config(config)?;
    let mut session = TripSession::new();
    info!(
        event_name = "planner.session.started",
        correlation_id = %session.id,
        "chat session started"
    );

    let input = BufReader::new(tokio::io::stdin());
    let mut output = tokio::io::stdout();
    let interrupted = async {
        let _ = tokio::signal::ctrl_c().await;
    };
    converse(&agent, &mut session, input, &mut output, presenter, interrupted).await?;

    info!(
        event_name = "planner.session.ended",
        correlation_id = %session.id,
        messages = session.transcript.len(),
        "chat session ended"
    );
    Ok(())
}

/// Runs the read-reply loop until end of input, a quit word or `shutdown`
/// resolves. `shutdown` is watched both at the prompt and while a turn is in
/// flight, so one interrupt is enough to leave.
pub async fn converse<R, W, S>(
    agent: &AgentRuntime,
    session: &mut TripSession,
    input: R,
    output: &mut W,
    presenter: Presenter,
    shutdown: S,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
    S: Future<Output = ()>,
{
    tokio::pin!(shutdown);

    if let Some(greeting) = session.transcript.last() {
        let greeting = greeting.content.clone();
        presenter.reveal(output, &greeting).await?;
    }

    let mut lines = input.lines();
    loop {
        output.write_all(b"> ").await?;
        output.flush().await?;

        let line = tokio::select! {
            line = lines.next_line() => line.context("failed to read from input")?,
            () = &mut shutdown => None,
        };
        let Some(line) = line else {
            break;
        };

        let message = line.trim();
        if message.is_empty() {
            continue;
        }
        if QUIT_WORDS.contains(&message.to_lowercase().as_str()) {
            break;
        }

        if presenter.animate {
            output.write_all(format!("{THINKING}\n").as_bytes()).await?;
        }
        let turn = tokio::select! {
            turn = agent.handle_message(session, message) => turn,
            () = &mut shutdown => break,
        };
        present_turn(&turn, session, output, &presenter).await?;
    }

    output.write_all(b"Safe travels!\n").await?;
    output.flush().await?;
    Ok(())
}

async fn present_turn<W>(
    turn: &TurnReply,
    session: &TripSession,
    output: &mut W,
    presenter: &Presenter,
) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    for notice in &turn.notices {
        let marker = match notice.level {
            NoticeLevel::Warning => "warning",
            NoticeLevel::Error => "error",
        };
        output.write_all(format!("[{marker}] {}\n", notice.message).as_bytes()).await?;
    }

    let reply = match &turn.reply {
        Some(reply) => reply.clone(),
        None => session
            .transcript
            .last()
            .map(|message| message.content.clone())
            .unwrap_or_default(),
    };
    presenter.reveal(output, &reply).await?;

    if turn.celebrate {
        output.write_all(format!("{CELEBRATION}\n\n").as_bytes()).await?;
    }
    output.flush().await?;
    Ok(())
}
