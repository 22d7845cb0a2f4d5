//! Values carried on the event bus: lifecycle state, filter sets and actions.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Phase of the speech lifecycle controller. Owned and mutated only by
/// [`crate::VoiceAssistant`]; everyone else observes it on the state channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoiceState {
    Idle,
    Listening,
    Thinking,
    Speaking,
    Error,
}

impl VoiceState {
    pub fn as_str(self) -> &'static str {
        match self {
            VoiceState::Idle => "idle",
            VoiceState::Listening => "listening",
            VoiceState::Thinking => "thinking",
            VoiceState::Speaking => "speaking",
            VoiceState::Error => "error",
        }
    }
}

impl fmt::Display for VoiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Animation the waiter avatar plays for a given lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaiterPose {
    Idle,
    Listening,
    Speaking,
}

impl From<VoiceState> for WaiterPose {
    fn from(state: VoiceState) -> Self {
        match state {
            VoiceState::Speaking => WaiterPose::Speaking,
            VoiceState::Listening => WaiterPose::Listening,
            VoiceState::Idle | VoiceState::Thinking | VoiceState::Error => WaiterPose::Idle,
        }
    }
}

/// Menu category recognized from speech.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Pizza,
    Soup,
    Salad,
    Dessert,
    Drink,
}

impl Category {
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Pizza => "pizza",
            Category::Soup => "soup",
            Category::Salad => "salad",
            Category::Dessert => "dessert",
            Category::Drink => "drink",
        }
    }
}

/// Dish tag recognized from speech.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DishTag {
    Spicy,
    Sweet,
    Vegetarian,
    Light,
    Meat,
    Big,
    Cold,
}

impl DishTag {
    pub fn as_str(self) -> &'static str {
        match self {
            DishTag::Spicy => "spicy",
            DishTag::Sweet => "sweet",
            DishTag::Vegetarian => "vegetarian",
            DishTag::Light => "light",
            DishTag::Meat => "meat",
            DishTag::Big => "big",
            DishTag::Cold => "cold",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    RatingDesc,
    PriceAsc,
    PriceDesc,
}

impl SortOrder {
    /// Ordering parameter understood by the dish catalog.
    pub fn as_ordering(self) -> &'static str {
        match self {
            SortOrder::RatingDesc => "-rating",
            SortOrder::PriceAsc => "price",
            SortOrder::PriceDesc => "-price",
        }
    }
}

/// Independent optional menu criteria extracted from one utterance.
///
/// An absent field means "do not constrain on this axis". Produced fresh per
/// utterance; merging with earlier filters is up to the consumer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceFilters {
    pub category: Option<Category>,
    pub max_price: Option<u32>,
    #[serde(default)]
    pub tags: BTreeSet<DishTag>,
    pub query: Option<String>,
    pub rating_from: Option<f32>,
    pub sort: Option<SortOrder>,
}

impl VoiceFilters {
    /// True when no axis is constrained.
    pub fn is_empty(&self) -> bool {
        self.category.is_none()
            && self.max_price.is_none()
            && self.tags.is_empty()
            && self.query.is_none()
            && self.rating_from.is_none()
            && self.sort.is_none()
    }
}

/// Discrete application action requested by voice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum VoiceAction {
    StopAll,
    Help,
    Navigate { path: String },
    CheckoutOpen,
    CheckoutConfirm,
    CartClear,
    CartAdd { name: String },
    CartRemove { name: String },
    FiltersClear,
}

impl VoiceAction {
    pub fn kind(&self) -> &'static str {
        match self {
            VoiceAction::StopAll => "stop_all",
            VoiceAction::Help => "help",
            VoiceAction::Navigate { .. } => "navigate",
            VoiceAction::CheckoutOpen => "checkout_open",
            VoiceAction::CheckoutConfirm => "checkout_confirm",
            VoiceAction::CartClear => "cart_clear",
            VoiceAction::CartAdd { .. } => "cart_add",
            VoiceAction::CartRemove { .. } => "cart_remove",
            VoiceAction::FiltersClear => "filters_clear",
        }
    }
}
