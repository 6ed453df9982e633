use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{error, info};
use tripsmith_core::config::AppConfig;
use tripsmith_core::domain::session::TripSession;
use tripsmith_core::errors::ApplicationError;

use crate::composer::ItineraryComposer;
use crate::dispatcher::{ConversationDispatcher, TurnReply};
use crate::extractor::InformationExtractor;
use crate::llm::{GeminiClient, LlmClient};
use crate::search::{SearchClient, SearchConnector, TavilyClient};

pub const HELP_TEXT: &str = "**Help Menu**\n\
    - To start over, say \"start over\"\n\
    - To change something, say \"change [thing]\"\n\
    - Need more help? Just describe what you're trying to do!";
pub const START_OVER_GREETING: &str = "Okay, let's start fresh! Where would you like to go?";

/// Commands recognised before the message reaches the dispatcher.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionCommand {
    Help,
    StartOver,
}

impl SessionCommand {
    pub fn recognize(text: &str) -> Option<Self> {
        match text.trim().to_lowercase().as_str() {
            "help" => Some(Self::Help),
            "start over" => Some(Self::StartOver),
            _ => None,
        }
    }
}

pub struct AgentRuntime {
    dispatcher: ConversationDispatcher,
}

impl AgentRuntime {
    pub fn new(dispatcher: ConversationDispatcher) -> Self {
        Self { dispatcher }
    }

    pub fn with_clients(llm: Arc<dyn LlmClient>, search: Arc<dyn SearchClient>) -> Result<Self> {
        let composer =
            ItineraryComposer::new(llm.clone()).context("failed to load itinerary template")?;
        Ok(Self::new(ConversationDispatcher::new(
            InformationExtractor::new(llm),
            SearchConnector::new(search),
            composer,
        )))
    }

    /// Wires the Gemini and Tavily HTTP clients from validated configuration.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let llm = GeminiClient::from_config(&config.llm)
            .context("failed to build language model client")?;
        let search =
            TavilyClient::from_config(&config.search).context("failed to build search client")?;
        info!(
            event_name = "planner.runtime.ready",
            model = %config.llm.model,
            llm_max_retries = config.llm.max_retries,
            search_max_retries = config.search.max_retries,
            "agent runtime initialised"
        );
        Self::with_clients(Arc::new(llm), Arc::new(search))
    }

    /// Handles one user message and records the exchange on the session
    /// transcript. Never fails: flow errors become a recoverable reply.
    pub async fn handle_message(&self, session: &mut TripSession, text: &str) -> TurnReply {
        match SessionCommand::recognize(text) {
            Some(SessionCommand::Help) => {
                session.record_user(text);
                session.record_assistant(HELP_TEXT);
                TurnReply::say(HELP_TEXT)
            }
            Some(SessionCommand::StartOver) => {
                match self.dispatcher.reset(session, START_OVER_GREETING).await {
                    Ok(()) => TurnReply::default(),
                    Err(domain_error) => self.recover(session, domain_error.into()),
                }
            }
            None => {
                session.record_user(text);
                match self.dispatcher.dispatch(session, text).await {
                    Ok(turn) => {
                        if let Some(reply) = &turn.reply {
                            session.record_assistant(reply.as_str());
                        }
                        turn
                    }
                    Err(domain_error) => self.recover(session, domain_error.into()),
                }
            }
        }
    }

    fn recover(&self, session: &mut TripSession, failure: ApplicationError) -> TurnReply {
        error!(
            event_name = "planner.turn.failed",
            correlation_id = %session.id,
            stage = session.stage.as_str(),
            error = %failure,
            "turn could not be completed"
        );
        let message = failure.user_message();
        session.record_assistant(message);
        TurnReply::say(message)
    }
}
