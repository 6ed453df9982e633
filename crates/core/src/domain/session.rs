use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::transcript::{ChatMessage, Transcript};
use crate::domain::trip::TripSlots;
use crate::flows::engine::{FlowDefinition, PlannerFlow};
use crate::flows::states::ConversationStage;

pub const INITIAL_GREETING: &str = "Hi! I'm your travel assistant. Where would you like to go?";

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Per-conversation context handed to every dispatcher turn.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TripSession {
    pub id: SessionId,
    pub stage: ConversationStage,
    pub slots: TripSlots,
    pub transcript: Transcript,
}

impl Default for TripSession {
    fn default() -> Self {
        Self::new()
    }
}

impl TripSession {
    pub fn new() -> Self {
        Self::with_id(SessionId::generate())
    }

    pub fn with_id(id: SessionId) -> Self {
        Self {
            id,
            stage: PlannerFlow.initial_state(),
            slots: TripSlots::default(),
            transcript: Transcript::seeded(INITIAL_GREETING),
        }
    }

    pub fn record_user(&mut self, content: impl Into<String>) {
        self.transcript.push(ChatMessage::user(content));
    }

    pub fn record_assistant(&mut self, content: impl Into<String>) {
        self.transcript.push(ChatMessage::assistant(content));
    }
}
