//! Conversation orchestration for the trip planner.
//!
//! The agent owns everything that talks to the outside world and the logic
//! that decides what to say next:
//! - `llm` / `search`: provider seams plus the Gemini and Tavily HTTP clients
//! - `extractor`: language-model normalization of free text into slot values
//! - `composer`: itinerary prompt rendering and generation
//! - `dispatcher`: the per-turn state machine over the core flow engine
//! - `runtime`: session commands (`help`, `start over`) and transcript upkeep
//!
//! The language model only normalizes text and writes the itinerary prose.
//! Stage progression and slot validation stay deterministic.

pub mod composer;
pub mod dispatcher;
pub mod extractor;
pub mod intent;
pub mod llm;
pub mod retry;
pub mod runtime;
pub mod search;

#[cfg(test)]
pub(crate) mod fakes;

pub use dispatcher::{ConversationDispatcher, TurnReply};
pub use llm::{GeminiClient, LlmClient, LlmError};
pub use runtime::{AgentRuntime, SessionCommand};
pub use search::{SearchClient, SearchConnector, SearchError, SearchHit, TavilyClient};
