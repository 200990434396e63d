//! Roadreel playback core
//!
//! Platform-agnostic simulation behind the animated road-trip replay: the
//! itinerary model, a reactive store, and the frame-driven engine that moves
//! the vehicle and fires narrative events. Rendering lives elsewhere and only
//! talks to this crate through store snapshots and the event callback.

pub mod autoplay;
pub mod config;
pub mod constants;
pub mod engine;
pub mod hud;
pub mod itinerary;
pub mod model;
pub mod numbers;
pub mod scheduler;
pub mod state;
pub mod store;

// Re-export commonly used types
pub use autoplay::AutoplayGuard;
pub use config::{EngineConfig, EngineConfigError};
pub use constants::{NUDGE_BUTTON_KM, NUDGE_STEP_KM};
pub use engine::{EventHandler, JourneyEngine, SeekOptions, SpeedStep, derive};
pub use hud::{HudView, format_km, next_stop, route_position, weather_for_mood};
pub use itinerary::{DayPlan, Itinerary, ItineraryError, Stop};
pub use model::{
    EventKind, EventPayload, JourneyModel, NarrativeEvent, Segment, TimelineItem, TimelineStatus,
};
pub use scheduler::{FrameHandle, FrameScheduler, ManualScheduler};
pub use state::{Mode, SimulationState, StatePatch};
pub use store::{Patch, Store, StoreReader, Subscription};
