use std::fmt;

use serde::{Deserialize, Serialize};

pub const DEFAULT_FOOD_TYPE: &str = "no restrictions";
pub const DEFAULT_ACCOMMODATION_TYPE: &str = "any";
pub const DEFAULT_SPECIAL_NEEDS: &str = "none";
pub const DEFAULT_LODGING_KIND: &str = "hotel";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Budget {
    Low,
    Medium,
    High,
}

impl Budget {
    /// Case-insensitive match against the three budget tiers.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    pub fn transport_hint(&self) -> &'static str {
        match self {
            Self::Low => "public transport and walking",
            Self::Medium => "taxis and occasional public transport",
            Self::High => "private transfers and premium transportation",
        }
    }
}

impl fmt::Display for Budget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TravelDates {
    pub range: String,
    pub start_date: String,
}

impl TravelDates {
    /// The start date is everything before the first `-`, or the whole value.
    pub fn from_range(range: impl Into<String>) -> Self {
        let range = range.into();
        let start_date = match range.split_once('-') {
            Some((start, _)) => start.trim().to_string(),
            None => range.clone(),
        };
        Self { range, start_date }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttractionStyle {
    Popular,
    HiddenGems,
    Mixed,
}

impl AttractionStyle {
    pub fn from_choice(choice: &str) -> Option<Self> {
        match choice.trim() {
            "1" => Some(Self::Popular),
            "2" => Some(Self::HiddenGems),
            "3" => Some(Self::Mixed),
            _ => None,
        }
    }

    pub fn wants_hidden_gems(&self) -> bool {
        !matches!(self, Self::Popular)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attraction {
    pub name: String,
    pub url: String,
    pub snippet: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Accommodation {
    pub name: String,
    pub url: String,
    pub snippet: String,
    #[serde(rename = "type")]
    pub kind: String,
}

/// Everything collected for one trip, filled in stage order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TripSlots {
    pub destination: Option<String>,
    pub dates: Option<TravelDates>,
    pub budget: Option<Budget>,
    pub days: Option<u32>,
    pub activities: Option<String>,
    pub food_type: Option<String>,
    pub accommodation_type: Option<String>,
    pub special_needs: Option<String>,
    pub preferences: Option<String>,
    pub hidden_gems: Option<bool>,
    pub attractions: Vec<Attraction>,
    pub accommodations: Vec<Accommodation>,
    pub itinerary_generated: bool,
    pub saved_itinerary: bool,
}

impl TripSlots {
    pub fn start_date(&self) -> Option<&str> {
        self.dates.as_ref().map(|dates| dates.start_date.as_str())
    }

    pub fn food_type_or_default(&self) -> &str {
        self.food_type.as_deref().unwrap_or(DEFAULT_FOOD_TYPE)
    }

    pub fn accommodation_type_or_default(&self) -> &str {
        self.accommodation_type.as_deref().unwrap_or(DEFAULT_ACCOMMODATION_TYPE)
    }

    pub fn special_needs_or_default(&self) -> &str {
        self.special_needs.as_deref().unwrap_or(DEFAULT_SPECIAL_NEEDS)
    }

    /// Composite preference text handed to the itinerary prompt.
    pub fn compose_preferences(&self) -> String {
        format!(
            "Activities: {}\nFood: {}\nAccommodation: {}\nSpecial needs: {}",
            self.activities.as_deref().unwrap_or_default(),
            self.food_type_or_default(),
            self.accommodation_type_or_default(),
            self.special_needs_or_default(),
        )
    }

    /// Drops everything except destination and dates.
    pub fn retain_trip_basics(&mut self) {
        *self = Self {
            destination: self.destination.take(),
            dates: self.dates.take(),
            ..Self::default()
        };
    }

    pub fn has_food_restrictions(&self) -> bool {
        self.food_type.as_deref().is_some_and(|food| food != DEFAULT_FOOD_TYPE)
    }
}
