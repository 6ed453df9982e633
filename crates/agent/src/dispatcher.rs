//! Per-turn conversation handling.
//!
//! Each user message is interpreted against the session's current
//! [`ConversationStage`]: the stage decides which slot the message may fill,
//! collaborators are consulted as needed, and the resulting [`FlowEvent`] is
//! validated by the [`FlowEngine`] before the stage moves. Side effects the
//! engine requests come back as [`FlowAction`]s and are carried out here.

use std::sync::Arc;

use chrono::{Local, NaiveDate};
use tracing::{debug, info, warn};
use tripsmith_core::dates::parse_flexible_date;
use tripsmith_core::domain::session::TripSession;
use tripsmith_core::domain::trip::{
    AttractionStyle, Budget, TravelDates, TripSlots, DEFAULT_ACCOMMODATION_TYPE, DEFAULT_FOOD_TYPE,
    DEFAULT_SPECIAL_NEEDS,
};
use tripsmith_core::errors::DomainError;
use tripsmith_core::flows::{ConversationStage, FlowAction, FlowEngine, FlowEvent, PlannerFlow};
use tripsmith_core::notices::{InMemoryNoticeSink, Notice};

use crate::composer::ItineraryComposer;
use crate::extractor::{InformationExtractor, SlotKind};
use crate::intent::{is_affirmative, is_greeting, is_negative};
use crate::search::{AccommodationQuery, AttractionQuery, SearchConnector};

pub const NEW_TRIP_GREETING: &str = "Let's plan a new trip! Where would you like to go?";
pub const NEXT_TRIP_GREETING: &str = "Great! Where would you like to go next?";
pub const FALLBACK_REPLY: &str =
    "I didn't understand that. Please try again or say 'help' for options.";

const GREETING_REPLY: &str =
    "Hello! 😊 I'm your travel planning assistant. Where would you like to go?";
const ASK_DESTINATION: &str = "I'd love to help plan your trip! Where would you like to go? \
     (Example: 'Japan' or 'I want to visit Paris')";
const ASK_DATES: &str = "When will you be visiting? (Example: 'next month' or 'August 10-17')";
const UNREADABLE_DATES: &str = "I couldn't understand those dates. \
     Please try again (Example: 'next summer' or 'August 10-17')";
const ASK_BUDGET: &str = "What's your budget range? (low/medium/high)";
const INVALID_BUDGET: &str =
    "Please specify your budget as low, medium, or high (Example: 'medium budget')";
const INVALID_DAYS: &str = "Please enter the number of days (Example: '7' or '10')";
const ASK_ACTIVITIES: &str =
    "What types of activities interest you? (Examples: 'museums', 'hiking', 'food tours')";
const EMPTY_ACTIVITIES: &str =
    "Please share what activities you'd enjoy (Example: 'I love museums and walking tours')";
const ASK_FOOD: &str =
    "Any dietary preferences? (Examples: 'vegetarian', 'local food', or 'no preferences')";
const ASK_ACCOMMODATION: &str = "What type of accommodation do you prefer? \
     (Examples: 'hotel', 'hostel', 'airbnb', 'luxury resort')";
const ASK_SPECIAL_NEEDS: &str = "Any special requirements? \
     (Examples: 'wheelchair accessible', 'family-friendly', or 'none')";
const INVALID_STYLE: &str = "Please choose 1, 2, or 3 for attraction style";
const NO_ATTRACTIONS: &str = "Couldn't find matching activities. \
     Want to try different preferences? \
     Reply with 1, 2, or 3 to pick another attraction style, or say 'start over'.";
const SAVED_ASK_NEW_TRIP: &str = "Itinerary saved! Would you like to start a new trip? (yes/no)";
const ASK_CHANGES: &str = "What would you like to change? (budget, days, activities, etc.)";
const SECONDARY_MENU: &str =
    "You can:\n1. View your saved itineraries\n2. Exit the planner\n\nWhat would you like to do?";
const CHANGEABLE_FIELDS: &str = "What would you like to change about your itinerary? \
     You can update:\n- Destination\n- Dates\n- Budget\n- Activities\nOr say 'start over'";

const SHOWN_ATTRACTIONS: usize = 3;
const SHOWN_ACCOMMODATIONS: usize = 2;

type TodayFn = dyn Fn() -> NaiveDate + Send + Sync;

/// What one dispatched turn produced.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TurnReply {
    /// `None` when the turn reset the session and the seeded greeting is the
    /// visible response.
    pub reply: Option<String>,
    pub notices: Vec<Notice>,
    pub celebrate: bool,
}

impl TurnReply {
    pub fn say(reply: impl Into<String>) -> Self {
        Self { reply: Some(reply.into()), ..Self::default() }
    }
}

#[derive(Default)]
struct Turn {
    notices: InMemoryNoticeSink,
    celebrate: bool,
}

impl Turn {
    fn finish(self, reply: Option<String>) -> TurnReply {
        TurnReply { reply, notices: self.notices.drain(), celebrate: self.celebrate }
    }
}

pub struct ConversationDispatcher {
    extractor: InformationExtractor,
    search: SearchConnector,
    composer: ItineraryComposer,
    engine: FlowEngine<PlannerFlow>,
    today: Arc<TodayFn>,
}

impl ConversationDispatcher {
    pub fn new(
        extractor: InformationExtractor,
        search: SearchConnector,
        composer: ItineraryComposer,
    ) -> Self {
        Self {
            extractor,
            search,
            composer,
            engine: FlowEngine::default(),
            today: Arc::new(|| Local::now().date_naive()),
        }
    }

    /// Pins the reference date used to resolve relative travel dates.
    pub fn with_today<F>(mut self, today: F) -> Self
    where
        F: Fn() -> NaiveDate + Send + Sync + 'static,
    {
        self.today = Arc::new(today);
        self
    }

    pub async fn dispatch(
        &self,
        session: &mut TripSession,
        message: &str,
    ) -> Result<TurnReply, DomainError> {
        let mut turn = Turn::default();
        let text = message.trim();
        let lowered = text.to_lowercase();

        debug!(
            event_name = "planner.turn.received",
            correlation_id = %session.id,
            stage = session.stage.as_str(),
            "dispatching user message"
        );

        let reply = match session.stage {
            ConversationStage::Opening => Some(self.open(session, &lowered, &mut turn).await?),
            ConversationStage::Destination => {
                Some(self.capture_destination(session, text, &lowered, &mut turn).await?)
            }
            ConversationStage::Dates => Some(self.capture_dates(session, text, &mut turn).await?),
            ConversationStage::Budget => Some(self.capture_budget(session, text, &mut turn).await?),
            ConversationStage::Days => Some(self.capture_days(session, text, &mut turn).await?),
            ConversationStage::Activities => {
                Some(self.capture_activities(session, text, &mut turn).await?)
            }
            ConversationStage::FoodType => {
                Some(self.capture_food_type(session, text, &lowered, &mut turn).await?)
            }
            ConversationStage::AccommodationType => {
                Some(self.capture_accommodation_type(session, text, &lowered, &mut turn).await?)
            }
            ConversationStage::SpecialNeeds => {
                Some(self.capture_special_needs(session, text, &lowered, &mut turn).await?)
            }
            ConversationStage::AttractionStyle => {
                Some(self.choose_attraction_style(session, &lowered, &mut turn).await?)
            }
            ConversationStage::ItineraryConfirmation => {
                Some(self.confirm_itinerary(session, &lowered, &mut turn).await?)
            }
            ConversationStage::ItineraryMenu
            | ConversationStage::NewTripDecision
            | ConversationStage::SecondaryMenu => {
                self.handle_menu(session, &lowered, &mut turn).await?
            }
        };

        Ok(turn.finish(reply))
    }

    /// Clears the trip and replaces the transcript with `greeting`.
    pub async fn reset(
        &self,
        session: &mut TripSession,
        greeting: &str,
    ) -> Result<(), DomainError> {
        let mut turn = Turn::default();
        self.reset_with(session, greeting, &mut turn).await
    }

    async fn reset_with(
        &self,
        session: &mut TripSession,
        greeting: &str,
        turn: &mut Turn,
    ) -> Result<(), DomainError> {
        self.advance(session, FlowEvent::ResetRequested, turn).await?;
        session.transcript.reseed(greeting);
        info!(event_name = "planner.session.reset", correlation_id = %session.id, "trip reset");
        Ok(())
    }

    async fn advance(
        &self,
        session: &mut TripSession,
        event: FlowEvent,
        turn: &mut Turn,
    ) -> Result<(), DomainError> {
        let outcome = match self.engine.apply(&session.stage, &event, &session.slots) {
            Ok(outcome) => outcome,
            Err(error) => {
                warn!(
                    event_name = "planner.flow.transition_rejected",
                    correlation_id = %session.id,
                    stage = session.stage.as_str(),
                    event = ?event,
                    error = %error,
                    "flow transition rejected"
                );
                return Err(error.into());
            }
        };

        debug!(
            event_name = "planner.flow.transition_applied",
            correlation_id = %session.id,
            from = outcome.from.as_str(),
            to = outcome.to.as_str(),
            event = ?outcome.event,
            "flow transition applied"
        );
        session.stage = outcome.to;

        for action in outcome.actions {
            self.perform(action, session, turn).await;
        }
        Ok(())
    }

    async fn perform(&self, action: FlowAction, session: &mut TripSession, turn: &mut Turn) {
        let slots = &mut session.slots;
        match action {
            FlowAction::AssemblePreferences => {
                slots.preferences = Some(slots.compose_preferences());
            }
            FlowAction::SearchAccommodations => {
                let query = AccommodationQuery {
                    destination: slots.destination.as_deref().unwrap_or_default(),
                    budget: slots.budget,
                    accommodation_type: slots.accommodation_type_or_default(),
                };
                let found = self.search.find_accommodations(&query, &turn.notices).await;
                slots.accommodations = found;
            }
            FlowAction::Celebrate => turn.celebrate = true,
            FlowAction::MarkItinerarySaved => slots.saved_itinerary = true,
            FlowAction::ClearSavedFlag => slots.saved_itinerary = false,
            FlowAction::RetainTripBasics => slots.retain_trip_basics(),
            FlowAction::ClearTrip => *slots = TripSlots::default(),
        }
    }

    async fn open(
        &self,
        session: &mut TripSession,
        lowered: &str,
        turn: &mut Turn,
    ) -> Result<String, DomainError> {
        self.advance(session, FlowEvent::OpenerSent, turn).await?;
        Ok(if is_greeting(lowered) {
            GREETING_REPLY.to_string()
        } else {
            "Hi there! ✈️ Let's plan your trip. Where would you like to travel?".to_string()
        })
    }

    async fn capture_destination(
        &self,
        session: &mut TripSession,
        text: &str,
        lowered: &str,
        turn: &mut Turn,
    ) -> Result<String, DomainError> {
        if text.is_empty() || is_greeting(lowered) {
            return Ok(ASK_DESTINATION.to_string());
        }

        let extracted = self.extractor.extract(text, SlotKind::Destination, &turn.notices).await;
        let reply = if extracted.is_empty() {
            let reply =
                format!("I'll assume you want to visit {text}. When will you be traveling?");
            session.slots.destination = Some(text.to_string());
            reply
        } else {
            let reply = format!(
                "Great choice! {extracted} sounds wonderful. When will you be visiting? \
                 (Example: 'next summer' or 'July 15-22')"
            );
            session.slots.destination = Some(extracted);
            reply
        };

        self.advance(session, FlowEvent::DestinationCaptured, turn).await?;
        Ok(reply)
    }

    async fn capture_dates(
        &self,
        session: &mut TripSession,
        text: &str,
        turn: &mut Turn,
    ) -> Result<String, DomainError> {
        let extracted = self.extractor.extract(text, SlotKind::Dates, &turn.notices).await;
        if extracted.is_empty() {
            return Ok(ASK_DATES.to_string());
        }

        match parse_flexible_date(&extracted, (self.today)()) {
            Some(range) => {
                session.slots.dates = Some(TravelDates::from_range(range));
                self.advance(session, FlowEvent::DatesCaptured, turn).await?;
                Ok(ASK_BUDGET.to_string())
            }
            None => Ok(UNREADABLE_DATES.to_string()),
        }
    }

    async fn capture_budget(
        &self,
        session: &mut TripSession,
        text: &str,
        turn: &mut Turn,
    ) -> Result<String, DomainError> {
        let extracted = self.extractor.extract(text, SlotKind::Budget, &turn.notices).await;
        let Some(budget) = Budget::parse(&extracted) else {
            return Ok(INVALID_BUDGET.to_string());
        };

        session.slots.budget = Some(budget);
        self.advance(session, FlowEvent::BudgetCaptured, turn).await?;
        Ok(format!(
            "Got your {budget} budget preference. How many days will you be in {}?",
            session.slots.destination.as_deref().unwrap_or_default()
        ))
    }

    async fn capture_days(
        &self,
        session: &mut TripSession,
        text: &str,
        turn: &mut Turn,
    ) -> Result<String, DomainError> {
        let Some(days) = parse_day_count(text) else {
            return Ok(INVALID_DAYS.to_string());
        };

        session.slots.days = Some(days);
        self.advance(session, FlowEvent::DaysCaptured, turn).await?;
        Ok(ASK_ACTIVITIES.to_string())
    }

    async fn capture_activities(
        &self,
        session: &mut TripSession,
        text: &str,
        turn: &mut Turn,
    ) -> Result<String, DomainError> {
        if text.is_empty() {
            return Ok(EMPTY_ACTIVITIES.to_string());
        }

        session.slots.activities = Some(text.to_string());
        self.advance(session, FlowEvent::ActivitiesCaptured, turn).await?;
        Ok(ASK_FOOD.to_string())
    }

    async fn capture_food_type(
        &self,
        session: &mut TripSession,
        text: &str,
        lowered: &str,
        turn: &mut Turn,
    ) -> Result<String, DomainError> {
        session.slots.food_type = Some(value_or_default(text, lowered, DEFAULT_FOOD_TYPE));
        self.advance(session, FlowEvent::FoodTypeCaptured, turn).await?;
        Ok(ASK_ACCOMMODATION.to_string())
    }

    async fn capture_accommodation_type(
        &self,
        session: &mut TripSession,
        text: &str,
        lowered: &str,
        turn: &mut Turn,
    ) -> Result<String, DomainError> {
        session.slots.accommodation_type =
            Some(value_or_default(text, lowered, DEFAULT_ACCOMMODATION_TYPE));
        self.advance(session, FlowEvent::AccommodationTypeCaptured, turn).await?;
        Ok(ASK_SPECIAL_NEEDS.to_string())
    }

    async fn capture_special_needs(
        &self,
        session: &mut TripSession,
        text: &str,
        lowered: &str,
        turn: &mut Turn,
    ) -> Result<String, DomainError> {
        session.slots.special_needs = Some(value_or_default(text, lowered, DEFAULT_SPECIAL_NEEDS));
        self.advance(session, FlowEvent::SpecialNeedsCaptured, turn).await?;
        Ok(trip_summary(&session.slots))
    }

    async fn choose_attraction_style(
        &self,
        session: &mut TripSession,
        lowered: &str,
        turn: &mut Turn,
    ) -> Result<String, DomainError> {
        let Some(style) = AttractionStyle::from_choice(lowered) else {
            return Ok(INVALID_STYLE.to_string());
        };

        let slots = &session.slots;
        let query = AttractionQuery {
            destination: slots.destination.as_deref().unwrap_or_default(),
            preferences: slots.activities.as_deref().unwrap_or_default(),
            budget: slots.budget,
            hidden_gems: style.wants_hidden_gems(),
            food_type: slots.food_type_or_default(),
        };
        let attractions = self.search.find_attractions(&query, &turn.notices).await;
        if attractions.is_empty() {
            return Ok(NO_ATTRACTIONS.to_string());
        }

        session.slots.hidden_gems = Some(style.wants_hidden_gems());
        session.slots.attractions = attractions;
        self.advance(session, FlowEvent::AttractionsFound, turn).await?;
        Ok(findings_summary(&session.slots))
    }

    async fn confirm_itinerary(
        &self,
        session: &mut TripSession,
        lowered: &str,
        turn: &mut Turn,
    ) -> Result<String, DomainError> {
        if is_affirmative(lowered) && !session.slots.itinerary_generated {
            let itinerary = self.composer.compose(&session.slots, &turn.notices).await;
            session.slots.itinerary_generated = true;
            self.advance(session, FlowEvent::ItineraryGenerated, turn).await?;

            let slots = &session.slots;
            return Ok(format!(
                "**Your {}-Day {} Itinerary** ✈️\n\nBudget: {}\n\n{itinerary}\n\n\
                 What would you like to do next?\n\
                 1. Save this itinerary\n2. Make changes\n3. Start a new trip",
                slots.days.unwrap_or_default(),
                slots.destination.as_deref().unwrap_or_default(),
                slots.budget.map(|budget| budget.as_str()).unwrap_or_default(),
            ));
        }

        if is_negative(lowered) {
            return Ok("What would you like to do instead?".to_string());
        }
        Ok(FALLBACK_REPLY.to_string())
    }

    async fn handle_menu(
        &self,
        session: &mut TripSession,
        lowered: &str,
        turn: &mut Turn,
    ) -> Result<Option<String>, DomainError> {
        match lowered {
            "1" => {
                self.advance(session, FlowEvent::ItinerarySaved, turn).await?;
                return Ok(Some(SAVED_ASK_NEW_TRIP.to_string()));
            }
            "2" => {
                self.advance(session, FlowEvent::ChangesRequested, turn).await?;
                return Ok(Some(ASK_CHANGES.to_string()));
            }
            "3" => {
                self.reset_with(session, NEW_TRIP_GREETING, turn).await?;
                return Ok(None);
            }
            _ => {}
        }

        if session.stage == ConversationStage::NewTripDecision && session.slots.saved_itinerary {
            if is_affirmative(lowered) {
                self.reset_with(session, NEXT_TRIP_GREETING, turn).await?;
                return Ok(None);
            }
            if is_negative(lowered) {
                self.advance(session, FlowEvent::NewTripDeclined, turn).await?;
                return Ok(Some(SECONDARY_MENU.to_string()));
            }
        }

        if is_negative(lowered) {
            return Ok(Some(CHANGEABLE_FIELDS.to_string()));
        }
        Ok(Some(FALLBACK_REPLY.to_string()))
    }
}

/// Digits only, and at least one day.
fn parse_day_count(text: &str) -> Option<u32> {
    if text.is_empty() || !text.chars().all(|character| character.is_ascii_digit()) {
        return None;
    }
    text.parse::<u32>().ok().filter(|days| *days > 0)
}

fn value_or_default(text: &str, lowered: &str, default: &str) -> String {
    match lowered {
        "" | "no preferences" | "no preference" | "none" => default.to_string(),
        _ => text.to_string(),
    }
}

fn trip_summary(slots: &TripSlots) -> String {
    format!(
        "Perfect! For your {}-day trip to {} with a {} budget:\n\
         - Activities: {}\n- Food: {}\n- Accommodation: {}\n- Special needs: {}\n\n\
         Should I focus on:\n1. Popular tourist spots\n2. Local hidden gems\n3. A mix of both\n\n\
         Reply with 1, 2, or 3",
        slots.days.unwrap_or_default(),
        slots.destination.as_deref().unwrap_or_default(),
        slots.budget.map(|budget| budget.as_str()).unwrap_or_default(),
        slots.activities.as_deref().unwrap_or_default(),
        slots.food_type_or_default(),
        slots.accommodation_type_or_default(),
        slots.special_needs_or_default(),
    )
}

fn findings_summary(slots: &TripSlots) -> String {
    let mut reply = String::from("Here's what I found:\n");
    for (index, attraction) in slots.attractions.iter().take(SHOWN_ATTRACTIONS).enumerate() {
        reply.push_str(&format!(
            "\n{}. [{}]({}) - {}",
            index + 1,
            attraction.name,
            attraction.url,
            attraction.snippet
        ));
    }

    if !slots.accommodations.is_empty() {
        reply.push_str("\n\nRecommended accommodations:\n");
        for (index, stay) in slots.accommodations.iter().take(SHOWN_ACCOMMODATIONS).enumerate() {
            reply.push_str(&format!(
                "\n{}. [{}]({}) - {}",
                index + 1,
                stay.name,
                stay.url,
                stay.snippet
            ));
        }
    }

    reply.push_str("\n\nReady to create your itinerary? (yes/no)");
    reply
}
