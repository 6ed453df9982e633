use std::fmt;
use std::sync::Arc;

use tracing::warn;
use tripsmith_core::notices::{Notice, NoticeSink, NoticeSource};

use crate::llm::LlmClient;

/// The kinds of information the language model can be asked to pull out of a
/// free-text reply.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SlotKind {
    Destination,
    Dates,
    Budget,
    Preferences,
    FoodPreferences,
    SpecialNeeds,
    Accommodation,
}

impl SlotKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Destination => "destination",
            Self::Dates => "dates",
            Self::Budget => "budget",
            Self::Preferences => "preferences",
            Self::FoodPreferences => "food_preferences",
            Self::SpecialNeeds => "special_needs",
            Self::Accommodation => "accommodation",
        }
    }

    pub fn instruction(&self) -> &'static str {
        match self {
            Self::Destination => {
                "Extract ONLY the travel destination from this text. \
                 Return JUST the location name or empty string if none found:"
            }
            Self::Dates => {
                "Extract travel dates or duration from this text. \
                 Return as 'MM/DD-MM/DD' or 'X days' format:"
            }
            Self::Budget => {
                "Extract budget information from this text. \
                 Return as 'low/medium/high' or empty string:"
            }
            Self::Preferences => {
                "Extract travel preferences from this text \
                 focusing on activities, interests, and style:"
            }
            Self::FoodPreferences => {
                "Extract food preferences from this text (vegetarian/vegan/gluten-free/etc.):"
            }
            Self::SpecialNeeds => {
                "Extract special requirements from this text \
                 (wheelchair accessible/family-friendly/etc.):"
            }
            Self::Accommodation => {
                "Extract accommodation preferences from this text \
                 (hotel/hostel/villa/airbnb/luxury/budget/etc.):"
            }
        }
    }

    pub fn prompt_for(&self, text: &str) -> String {
        format!("{} '{}'", self.instruction(), text)
    }
}

impl fmt::Display for SlotKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone)]
pub struct InformationExtractor {
    llm: Arc<dyn LlmClient>,
}

impl InformationExtractor {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }

    /// Returns the extracted value, or an empty string when the model found
    /// nothing or could not be reached.
    pub async fn extract(&self, text: &str, kind: SlotKind, notices: &dyn NoticeSink) -> String {
        match self.llm.complete(&kind.prompt_for(text)).await {
            Ok(raw) => normalize_extraction(&raw),
            Err(error) => {
                warn!(
                    event_name = "planner.extraction.failed",
                    slot = kind.as_str(),
                    error = %error,
                    "information extraction failed"
                );
                notices.emit(Notice::error(
                    NoticeSource::Extraction,
                    format!("Error extracting {kind}: {error}"),
                ));
                String::new()
            }
        }
    }
}

/// Models sometimes answer `""` or `'Paris'` instead of the bare value.
fn normalize_extraction(raw: &str) -> String {
    raw.trim().trim_matches(|character| character == '"' || character == '\'').trim().to_string()
}
