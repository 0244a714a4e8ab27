pub mod layout;
pub mod transitions;

pub use layout::{SlotRect, SlotWidth, TrackLayout};
pub use transitions::{CoverLayer, StageEffects};
