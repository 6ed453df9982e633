//! Domain core for the trip planner: the per-session slot record, the
//! conversation flow, date normalization, user notices and configuration.
//!
//! Nothing in this crate performs I/O beyond reading configuration files.

pub mod config;
pub mod dates;
pub mod domain;
pub mod errors;
pub mod flows;
pub mod notices;

pub use dates::parse_flexible_date;
pub use domain::session::{SessionId, TripSession, INITIAL_GREETING};
pub use domain::transcript::{ChatMessage, Role, Transcript};
pub use domain::trip::{
    Accommodation, Attraction, AttractionStyle, Budget, TravelDates, TripSlots,
};
pub use errors::{ApplicationError, DomainError};
pub use flows::{ConversationStage, FlowAction, FlowEngine, FlowEvent, TransitionOutcome};
pub use notices::{InMemoryNoticeSink, Notice, NoticeLevel, NoticeSink, NoticeSource};
