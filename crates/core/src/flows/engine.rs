use thiserror::Error;

use crate::domain::trip::TripSlots;
use crate::flows::states::{ConversationStage, FlowAction, FlowEvent, TransitionOutcome};

pub trait FlowDefinition {
    fn initial_state(&self) -> ConversationStage;
    fn transition(
        &self,
        current: &ConversationStage,
        event: &FlowEvent,
        slots: &TripSlots,
    ) -> Result<TransitionOutcome, FlowTransitionError>;
}

/// The linear trip-planning flow: one slot per stage, then the itinerary menus.
#[derive(Clone, Debug, Default)]
pub struct PlannerFlow;

impl FlowDefinition for PlannerFlow {
    fn initial_state(&self) -> ConversationStage {
        ConversationStage::Opening
    }

    fn transition(
        &self,
        current: &ConversationStage,
        event: &FlowEvent,
        slots: &TripSlots,
    ) -> Result<TransitionOutcome, FlowTransitionError> {
        transition_planner(current, event, slots)
    }
}

pub struct FlowEngine<F> {
    flow: F,
}

impl<F> FlowEngine<F>
where
    F: FlowDefinition,
{
    pub fn new(flow: F) -> Self {
        Self { flow }
    }

    pub fn apply(
        &self,
        current: &ConversationStage,
        event: &FlowEvent,
        slots: &TripSlots,
    ) -> Result<TransitionOutcome, FlowTransitionError> {
        self.flow.transition(current, event, slots)
    }
}

impl Default for FlowEngine<PlannerFlow> {
    fn default() -> Self {
        Self::new(PlannerFlow)
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FlowTransitionError {
    #[error("missing required slots before entering {target:?} from {state:?}: {missing_fields:?}")]
    MissingRequiredFields {
        state: ConversationStage,
        target: ConversationStage,
        missing_fields: Vec<String>,
    },
    #[error("invalid transition from {state:?} using event {event:?}")]
    InvalidTransition { state: ConversationStage, event: FlowEvent },
}

/// Slots that must be filled before `target` can be entered.
pub fn missing_fields_for(target: ConversationStage, slots: &TripSlots) -> Vec<String> {
    use ConversationStage::{
        AccommodationType, Activities, AttractionStyle, Budget, Dates, Days, FoodType,
        ItineraryConfirmation, ItineraryMenu, SpecialNeeds,
    };

    let requirements = [
        ("destination", slots.destination.is_some(), Dates),
        ("dates", slots.dates.is_some(), Budget),
        ("budget", slots.budget.is_some(), Days),
        ("days", slots.days.is_some(), Activities),
        ("activities", slots.activities.is_some(), FoodType),
        ("food_type", slots.food_type.is_some(), AccommodationType),
        ("accommodation_type", slots.accommodation_type.is_some(), SpecialNeeds),
        ("special_needs", slots.special_needs.is_some(), AttractionStyle),
        ("hidden_gems", slots.hidden_gems.is_some(), ItineraryConfirmation),
        ("attractions", !slots.attractions.is_empty(), ItineraryConfirmation),
        ("itinerary_generated", slots.itinerary_generated, ItineraryMenu),
    ];

    requirements
        .iter()
        .filter(|(_, present, required_from)| target >= *required_from && !present)
        .map(|(name, _, _)| (*name).to_string())
        .collect()
}

fn transition_planner(
    current: &ConversationStage,
    event: &FlowEvent,
    slots: &TripSlots,
) -> Result<TransitionOutcome, FlowTransitionError> {
    use ConversationStage::{
        AccommodationType, Activities, AttractionStyle, Budget, Dates, Days, Destination,
        FoodType, ItineraryConfirmation, ItineraryMenu, NewTripDecision, Opening, SecondaryMenu,
        SpecialNeeds,
    };
    use FlowAction::{
        AssemblePreferences, Celebrate, ClearSavedFlag, ClearTrip, MarkItinerarySaved,
        RetainTripBasics, SearchAccommodations,
    };
    use FlowEvent::{
        AccommodationTypeCaptured, ActivitiesCaptured, AttractionsFound, BudgetCaptured,
        ChangesRequested, DatesCaptured, DaysCaptured, DestinationCaptured, FoodTypeCaptured,
        ItineraryGenerated, ItinerarySaved, NewTripDeclined, OpenerSent, ResetRequested,
        SpecialNeedsCaptured,
    };

    let (to, actions) = match (current, event) {
        (_, ResetRequested) => (Opening, vec![ClearTrip]),
        (Opening, OpenerSent) => (Destination, Vec::new()),
        (Destination, DestinationCaptured) => (Dates, Vec::new()),
        (Dates, DatesCaptured) => (Budget, Vec::new()),
        (Budget, BudgetCaptured) => (Days, Vec::new()),
        (Days, DaysCaptured) => (Activities, Vec::new()),
        (Activities, ActivitiesCaptured) => (FoodType, Vec::new()),
        (FoodType, FoodTypeCaptured) => (AccommodationType, Vec::new()),
        (AccommodationType, AccommodationTypeCaptured) => (SpecialNeeds, Vec::new()),
        (SpecialNeeds, SpecialNeedsCaptured) => {
            (AttractionStyle, vec![AssemblePreferences, SearchAccommodations])
        }
        (AttractionStyle, AttractionsFound) => (ItineraryConfirmation, Vec::new()),
        (ItineraryConfirmation, ItineraryGenerated) => (ItineraryMenu, vec![Celebrate]),
        (stage, ItinerarySaved) if stage.is_post_itinerary() => {
            (NewTripDecision, vec![MarkItinerarySaved])
        }
        (stage, ChangesRequested) if stage.is_post_itinerary() => {
            (Budget, vec![RetainTripBasics])
        }
        (NewTripDecision, NewTripDeclined) => (SecondaryMenu, vec![ClearSavedFlag]),
        _ => {
            return Err(FlowTransitionError::InvalidTransition { state: *current, event: *event });
        }
    };

    let missing_fields = missing_fields_for(to, slots);
    if !missing_fields.is_empty() {
        return Err(FlowTransitionError::MissingRequiredFields {
            state: *current,
            target: to,
            missing_fields,
        });
    }

    Ok(TransitionOutcome { from: *current, to, event: *event, actions })
}

#[cfg(test)]
mod tests {
    use crate::domain::trip::{Attraction, Budget, TravelDates, TripSlots};
    use crate::flows::engine::{FlowDefinition, FlowEngine, FlowTransitionError, PlannerFlow};
    use crate::flows::states::{ConversationStage, FlowAction, FlowEvent};

    fn filled_slots() -> TripSlots {
        TripSlots {
            destination: Some("Kyoto".to_string()),
            dates: Some(TravelDates::from_range("04/01-04/07")),
            budget: Some(Budget::Medium),
            days: Some(6),
            activities: Some("temples".to_string()),
            food_type: Some("vegetarian".to_string()),
            accommodation_type: Some("ryokan".to_string()),
            special_needs: Some("none".to_string()),
            preferences: None,
            hidden_gems: Some(false),
            attractions: vec![Attraction {
                name: "Fushimi Inari".to_string(),
                url: "https://inari.jp".to_string(),
                snippet: "Gates".to_string(),
            }],
            accommodations: Vec::new(),
            itinerary_generated: true,
            saved_itinerary: false,
        }
    }

    #[test]
    fn slot_stages_advance_in_fixed_order() {
        let engine = FlowEngine::default();
        let slots = filled_slots();
        let events = [
            FlowEvent::OpenerSent,
            FlowEvent::DestinationCaptured,
            FlowEvent::DatesCaptured,
            FlowEvent::BudgetCaptured,
            FlowEvent::DaysCaptured,
            FlowEvent::ActivitiesCaptured,
            FlowEvent::FoodTypeCaptured,
            FlowEvent::AccommodationTypeCaptured,
            FlowEvent::SpecialNeedsCaptured,
            FlowEvent::AttractionsFound,
            FlowEvent::ItineraryGenerated,
        ];

        let mut stage = PlannerFlow.initial_state();
        let mut visited = vec![stage];
        for event in &events {
            stage = engine.apply(&stage, event, &slots).expect("planner transition").to;
            visited.push(stage);
        }

        assert_eq!(
            visited,
            vec![
                ConversationStage::Opening,
                ConversationStage::Destination,
                ConversationStage::Dates,
                ConversationStage::Budget,
                ConversationStage::Days,
                ConversationStage::Activities,
                ConversationStage::FoodType,
                ConversationStage::AccommodationType,
                ConversationStage::SpecialNeeds,
                ConversationStage::AttractionStyle,
                ConversationStage::ItineraryConfirmation,
                ConversationStage::ItineraryMenu,
            ]
        );
    }

    #[test]
    fn special_needs_capture_triggers_accommodation_search() {
        let outcome = FlowEngine::default()
            .apply(
                &ConversationStage::SpecialNeeds,
                &FlowEvent::SpecialNeedsCaptured,
                &filled_slots(),
            )
            .expect("special needs -> attraction style");

        assert_eq!(outcome.to, ConversationStage::AttractionStyle);
        assert_eq!(
            outcome.actions,
            vec![FlowAction::AssemblePreferences, FlowAction::SearchAccommodations]
        );
    }

    #[test]
    fn entering_a_stage_with_unfilled_slots_is_rejected() {
        let slots = TripSlots { destination: Some("Oslo".to_string()), ..TripSlots::default() };
        let error = FlowEngine::default()
            .apply(&ConversationStage::Dates, &FlowEvent::DatesCaptured, &slots)
            .expect_err("dates slot is empty");

        assert_eq!(
            error,
            FlowTransitionError::MissingRequiredFields {
                state: ConversationStage::Dates,
                target: ConversationStage::Budget,
                missing_fields: vec!["dates".to_string()],
            }
        );
    }

    #[test]
    fn confirmation_requires_attractions() {
        let slots = TripSlots { attractions: Vec::new(), ..filled_slots() };
        let error = FlowEngine::default()
            .apply(&ConversationStage::AttractionStyle, &FlowEvent::AttractionsFound, &slots)
            .expect_err("no attractions");

        assert!(matches!(
            error,
            FlowTransitionError::MissingRequiredFields { ref missing_fields, .. }
                if missing_fields == &vec!["attractions".to_string()]
        ));
    }

    #[test]
    fn out_of_order_events_are_invalid() {
        let error = FlowEngine::default()
            .apply(&ConversationStage::Destination, &FlowEvent::BudgetCaptured, &filled_slots())
            .expect_err("budget cannot be captured before destination");

        assert_eq!(
            error,
            FlowTransitionError::InvalidTransition {
                state: ConversationStage::Destination,
                event: FlowEvent::BudgetCaptured,
            }
        );
    }

    #[test]
    fn menu_events_are_honoured_from_every_post_itinerary_stage() {
        let engine = FlowEngine::default();
        let slots = filled_slots();
        for stage in [
            ConversationStage::ItineraryMenu,
            ConversationStage::NewTripDecision,
            ConversationStage::SecondaryMenu,
        ] {
            let saved = engine.apply(&stage, &FlowEvent::ItinerarySaved, &slots).expect("save");
            assert_eq!(saved.to, ConversationStage::NewTripDecision);

            let changed =
                engine.apply(&stage, &FlowEvent::ChangesRequested, &slots).expect("change");
            assert_eq!(changed.to, ConversationStage::Budget);
            assert_eq!(changed.actions, vec![FlowAction::RetainTripBasics]);
        }

        let declined = engine
            .apply(&ConversationStage::NewTripDecision, &FlowEvent::NewTripDeclined, &slots)
            .expect("decline");
        assert_eq!(declined.to, ConversationStage::SecondaryMenu);
    }

    #[test]
    fn reset_is_accepted_from_any_stage() {
        let engine = FlowEngine::default();
        for stage in [
            ConversationStage::Opening,
            ConversationStage::Days,
            ConversationStage::ItineraryMenu,
            ConversationStage::SecondaryMenu,
        ] {
            let outcome = engine
                .apply(&stage, &FlowEvent::ResetRequested, &TripSlots::default())
                .expect("reset");
            assert_eq!(outcome.to, ConversationStage::Opening);
            assert_eq!(outcome.actions, vec![FlowAction::ClearTrip]);
        }
    }
}
