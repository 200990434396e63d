//! Trip itinerary data and the free-text drive parsers.
//!
//! The itinerary is authored as JSON (one entry per day plus the stop list
//! and a coarse geo polyline). Drive descriptions are free text such as
//! `"上海 → 霞浦 约 720km 7h40m"`; distance and duration are pulled out with
//! lenient patterns and anything unparsable degrades to zero.
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use std::sync::OnceLock;
use thiserror::Error;

const DEFAULT_ITINERARY_DATA: &str = include_str!("../data/itinerary.json");
const UNKNOWN_TIME_LABEL: &str = "--:--";

/// One day of the trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct DayPlan {
    pub id: u32,
    pub date: String,
    pub lunar: String,
    /// Festival label; a few markers in here schedule festival events.
    pub festival: String,
    pub title: String,
    /// Free-text drive description carrying distance and duration.
    pub drive: String,
    /// Landscape tag (`coast`, `mountain`, `wind`, `urban-sea`, `return`).
    pub mood: String,
    pub element: String,
    /// Ordered checklist entries, usually prefixed with a `HH:MM` time.
    pub schedule: Vec<String>,
    /// Where the crew sleeps at the end of the day.
    pub sleep: String,
    pub food: Vec<String>,
    pub focus: String,
    pub backup: String,
}

/// A named city on the route, used for badges and map overlays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Stop {
    pub name: String,
    pub lat: f64,
    pub lng: f64,
}

/// Complete trip plan consumed once by the journey model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct Itinerary {
    pub title: String,
    pub spring_festival_date: String,
    /// Fallback route length used when no day carries a parsable distance.
    pub total_distance_km: f64,
    pub days: Vec<DayPlan>,
    pub stops: Vec<Stop>,
    /// Coarse `[lat, lng]` polyline of the whole loop.
    pub route_geo: Vec<[f64; 2]>,
}

/// Errors raised while loading an itinerary.
#[derive(Debug, Error)]
pub enum ItineraryError {
    #[error("itinerary JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("failed to read itinerary file: {0}")]
    Io(#[from] std::io::Error),
    #[error("itinerary has no days")]
    NoDays,
}

impl Itinerary {
    /// Load an itinerary from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON cannot be parsed or lists no days.
    pub fn from_json(json: &str) -> Result<Self, ItineraryError> {
        let itinerary: Self = serde_json::from_str(json)?;
        if itinerary.days.is_empty() {
            return Err(ItineraryError::NoDays);
        }
        Ok(itinerary)
    }

    /// Load an itinerary from a JSON file on disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_path(path: &Path) -> Result<Self, ItineraryError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    /// The embedded Spring Festival coastal loop.
    ///
    /// Falls back to an empty itinerary if the embedded asset fails to parse.
    #[must_use]
    pub fn default_itinerary() -> Self {
        Self::from_json(DEFAULT_ITINERARY_DATA).unwrap_or_else(|err| {
            log::warn!("embedded itinerary unusable: {err}");
            Self::default()
        })
    }

    /// Look up a day by its authored id.
    #[must_use]
    pub fn day_by_id(&self, day_id: u32) -> Option<&DayPlan> {
        self.days.iter().find(|day| day.id == day_id)
    }
}

fn cached_regex(cell: &'static OnceLock<Option<Regex>>, pattern: &str) -> Option<&'static Regex> {
    cell.get_or_init(|| Regex::new(pattern).ok()).as_ref()
}

fn first_number<T: FromStr>(
    cell: &'static OnceLock<Option<Regex>>,
    pattern: &str,
    text: &str,
) -> Option<T> {
    cached_regex(cell, pattern)?
        .captures(text)?
        .get(1)?
        .as_str()
        .parse()
        .ok()
}

/// Distance in kilometers from a drive description, `0.0` when absent.
///
/// Parsed as `f64` so an oversized token still yields its value.
#[must_use]
pub fn parse_drive_km(text: &str) -> f64 {
    static KM: OnceLock<Option<Regex>> = OnceLock::new();
    first_number(&KM, r"(?i)(\d+)\s*km", text).unwrap_or(0.0)
}

/// Raw driving minutes (`<h>h` and `<m>m` components), `0` when absent.
#[must_use]
pub fn parse_drive_minutes(text: &str) -> u32 {
    static HOURS: OnceLock<Option<Regex>> = OnceLock::new();
    static MINUTES: OnceLock<Option<Regex>> = OnceLock::new();
    let hours: u32 = first_number(&HOURS, r"(?i)(\d+)h", text).unwrap_or(0);
    let minutes: u32 = first_number(&MINUTES, r"(?i)(\d+)m", text).unwrap_or(0);
    hours.saturating_mul(60).saturating_add(minutes)
}

/// First `H:MM` or `HH:MM` token of a checklist entry, or `--:--`.
#[must_use]
pub fn parse_time_label(item: &str) -> String {
    static TIME: OnceLock<Option<Regex>> = OnceLock::new();
    cached_regex(&TIME, r"\b\d{1,2}:\d{2}\b")
        .and_then(|re| re.find(item))
        .map_or_else(|| UNKNOWN_TIME_LABEL.to_string(), |m| m.as_str().to_string())
}
