pub mod engine;
pub mod states;

pub use engine::{missing_fields_for, FlowDefinition, FlowEngine, FlowTransitionError, PlannerFlow};
pub use states::{ConversationStage, FlowAction, FlowEvent, TransitionOutcome};
