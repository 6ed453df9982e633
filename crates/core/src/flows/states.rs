use serde::{Deserialize, Serialize};

/// Where the planner conversation currently stands.
///
/// Slot stages appear in the fixed collection order; the last four stages are
/// the itinerary hand-off and the menus that follow it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ConversationStage {
    Opening,
    Destination,
    Dates,
    Budget,
    Days,
    Activities,
    FoodType,
    AccommodationType,
    SpecialNeeds,
    AttractionStyle,
    ItineraryConfirmation,
    ItineraryMenu,
    NewTripDecision,
    SecondaryMenu,
}

impl ConversationStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Opening => "opening",
            Self::Destination => "destination",
            Self::Dates => "dates",
            Self::Budget => "budget",
            Self::Days => "days",
            Self::Activities => "activities",
            Self::FoodType => "food_type",
            Self::AccommodationType => "accommodation_type",
            Self::SpecialNeeds => "special_needs",
            Self::AttractionStyle => "attraction_style",
            Self::ItineraryConfirmation => "itinerary_confirmation",
            Self::ItineraryMenu => "itinerary_menu",
            Self::NewTripDecision => "new_trip_decision",
            Self::SecondaryMenu => "secondary_menu",
        }
    }

    /// Stages reached after an itinerary exists, where the save/change/restart
    /// menu digits are honoured.
    pub fn is_post_itinerary(&self) -> bool {
        matches!(self, Self::ItineraryMenu | Self::NewTripDecision | Self::SecondaryMenu)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlowEvent {
    OpenerSent,
    DestinationCaptured,
    DatesCaptured,
    BudgetCaptured,
    DaysCaptured,
    ActivitiesCaptured,
    FoodTypeCaptured,
    AccommodationTypeCaptured,
    SpecialNeedsCaptured,
    AttractionsFound,
    ItineraryGenerated,
    ItinerarySaved,
    ChangesRequested,
    NewTripDeclined,
    ResetRequested,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlowAction {
    AssemblePreferences,
    SearchAccommodations,
    Celebrate,
    MarkItinerarySaved,
    ClearSavedFlag,
    RetainTripBasics,
    ClearTrip,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionOutcome {
    pub from: ConversationStage,
    pub to: ConversationStage,
    pub event: FlowEvent,
    pub actions: Vec<FlowAction>,
}
