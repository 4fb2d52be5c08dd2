/// Interaction state for the property showcase views
///
/// Rendering itself belongs to the host; this module only holds the state
/// machines the views drive.

pub mod deck;

pub use deck::{DeckKey, GestureOutcome, KeyOutcome, LeavingCard, SwipeDeck, SwipeDirection};
