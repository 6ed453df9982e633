use std::sync::Arc;

use serde::Serialize;
use tera::{Context, Tera};
use thiserror::Error;
use tracing::{info, warn};
use tripsmith_core::domain::trip::TripSlots;
use tripsmith_core::notices::{Notice, NoticeSink, NoticeSource};

use crate::llm::{LlmClient, LlmError};

const PROMPT_TEMPLATE: &str = "itinerary_prompt.txt";
const MIXED_TRANSPORT: &str = "mix of transport options";
const PROMPTED_ACCOMMODATIONS: usize = 2;

#[derive(Debug, Error)]
pub enum ComposeError {
    #[error("template error: {0}")]
    Template(String),
    #[error(transparent)]
    Llm(#[from] LlmError),
}

#[derive(Serialize)]
struct StayView<'a> {
    name: &'a str,
    url: &'a str,
    kind: &'a str,
}

/// Turns a filled slot record into a day-by-day itinerary via the language model.
#[derive(Clone)]
pub struct ItineraryComposer {
    llm: Arc<dyn LlmClient>,
    tera: Tera,
}

impl ItineraryComposer {
    pub fn new(llm: Arc<dyn LlmClient>) -> Result<Self, ComposeError> {
        let mut tera = Tera::default();
        tera.add_raw_template(PROMPT_TEMPLATE, include_str!("../templates/itinerary_prompt.txt"))
            .map_err(|error| ComposeError::Template(error.to_string()))?;
        Ok(Self { llm, tera })
    }

    pub fn build_prompt(&self, slots: &TripSlots) -> Result<String, ComposeError> {
        let food_type = slots.food_type_or_default();
        let accommodations = slots
            .accommodations
            .iter()
            .take(PROMPTED_ACCOMMODATIONS)
            .map(|stay| StayView { name: &stay.name, url: &stay.url, kind: &stay.kind })
            .collect::<Vec<_>>();
        let attraction_names = slots
            .attractions
            .iter()
            .map(|attraction| attraction.name.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        let preferences = slots.preferences.clone().unwrap_or_else(|| slots.compose_preferences());

        let mut context = Context::new();
        context.insert("days", &slots.days.unwrap_or_default());
        context.insert("destination", slots.destination.as_deref().unwrap_or_default());
        context.insert("start_date", slots.start_date().unwrap_or_default());
        context.insert("budget", slots.budget.map(|budget| budget.as_str()).unwrap_or_default());
        context.insert("preferences", &preferences);
        context.insert("dietary_needs", &slots.has_food_restrictions());
        context.insert("food_type", food_type);
        context.insert("accommodations", &accommodations);
        context.insert(
            "transport",
            slots.budget.map(|budget| budget.transport_hint()).unwrap_or(MIXED_TRANSPORT),
        );
        context.insert("attraction_names", &attraction_names);
        context.insert(
            "lunch_diet",
            if slots.has_food_restrictions() { food_type } else { "any" },
        );

        self.tera
            .render(PROMPT_TEMPLATE, &context)
            .map_err(|error| ComposeError::Template(error.to_string()))
    }

    async fn try_compose(&self, slots: &TripSlots) -> Result<String, ComposeError> {
        let prompt = self.build_prompt(slots)?;
        Ok(self.llm.complete(&prompt).await?)
    }

    /// Never fails: a provider or template failure becomes an apology the
    /// user sees in place of the itinerary.
    pub async fn compose(&self, slots: &TripSlots, notices: &dyn NoticeSink) -> String {
        match self.try_compose(slots).await {
            Ok(itinerary) => {
                info!(
                    event_name = "planner.itinerary.composed",
                    destination = slots.destination.as_deref().unwrap_or_default(),
                    days = slots.days.unwrap_or_default(),
                    "itinerary composed"
                );
                itinerary
            }
            Err(error) => {
                warn!(
                    event_name = "planner.itinerary.failed",
                    error = %error,
                    "itinerary composition failed"
                );
                notices.emit(Notice::error(NoticeSource::Composition, error.to_string()));
                format!("Sorry, I couldn't generate the itinerary. Error: {error}")
            }
        }
    }
}
