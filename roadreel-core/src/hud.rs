//! Presentation-ready derivations over a state snapshot.
//!
//! Renderers subscribe to the store and rebuild a [`HudView`] on every
//! snapshot; nothing here mutates state.
use serde::Serialize;

use crate::model::{JourneyModel, TimelineItem};
use crate::numbers::{clamp_finite, floor_f64_to_usize, round_f64_to_i64, usize_to_f64};
use crate::state::{Mode, SimulationState};

const UNKNOWN_STOP: &str = "--";
const ARRIVED_TITLE: &str = "平安返沪 · 计划回放完成";
const ARRIVED_SUBTITLE: &str = "你的一次春节沿海线规划演示已完成。";
const ARRIVED_BADGE: &str = "终点：上海";

/// Weather caption for a day's mood tag.
#[must_use]
pub fn weather_for_mood(mood: &str) -> &'static str {
    match mood {
        "coast" | "urban-sea" => "海风微潮",
        "mountain" => "山风微凉",
        "wind" => "沿海阵风",
        "return" => "返程晴间阴",
        _ => "晴朗",
    }
}

/// Name of the stop the crew is heading to on `day_index`.
#[must_use]
pub fn next_stop(model: &JourneyModel, day_index: usize) -> &str {
    let stops = &model.itinerary().stops;
    let idx = (day_index + 1).min(stops.len().saturating_sub(1));
    stops
        .get(idx)
        .map(|stop| stop.name.as_str())
        .filter(|name| !name.is_empty())
        .unwrap_or(UNKNOWN_STOP)
}

#[must_use]
pub fn format_km(km: f64) -> String {
    format!("{} km", round_f64_to_i64(km))
}

/// Whole-number percentage of a `[0, 1]` fraction.
#[must_use]
pub fn percent(fraction: f64) -> i64 {
    round_f64_to_i64(fraction * 100.0)
}

/// Point at fraction `t` along the `[lat, lng]` polyline.
///
/// Vertices are spaced evenly in `t` regardless of geographic distance.
#[must_use]
pub fn route_position(route: &[[f64; 2]], t: f64) -> Option<[f64; 2]> {
    let last = route.len().checked_sub(1)?;
    let scaled = clamp_finite(t, 0.0, 1.0) * usize_to_f64(last);
    let idx = floor_f64_to_usize(scaled);
    if idx >= last {
        return route.get(last).copied();
    }
    let frac = scaled - usize_to_f64(idx);
    let [a_lat, a_lng] = route[idx];
    let [b_lat, b_lng] = route[idx + 1];
    Some([
        a_lat + (b_lat - a_lat) * frac,
        a_lng + (b_lng - a_lng) * frac,
    ])
}

/// Everything the HUD and side panel display for one snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HudView {
    pub day_label: String,
    pub km_label: String,
    pub weather: &'static str,
    pub mood: String,
    pub title: String,
    pub subtitle: String,
    pub progress_percent: i64,
    pub badge: String,
    pub speed_label: String,
    pub fuel_percent: i64,
    pub fatigue_percent: i64,
    pub focus: String,
    pub food: Vec<String>,
    pub sleep: String,
    pub backup: String,
    pub timeline: Vec<TimelineItem>,
    /// Auto button highlighted.
    pub auto_active: bool,
    /// Pause button highlighted.
    pub pause_active: bool,
    /// Paused mid-route; the play prompt should be offered.
    pub resume_prompt: bool,
    pub vehicle_position: Option<[f64; 2]>,
}

impl HudView {
    #[must_use]
    pub fn from_state(model: &JourneyModel, state: &SimulationState) -> Self {
        let day = model.day(state.day_index).or_else(|| model.day(0));
        let segment = model.segments().get(state.day_index);
        let arrived = state.mode == Mode::Arrived;
        let driving = state.mode == Mode::Driving;

        let (day_label, weather, mood) = day.map_or_else(
            || (String::from("DAY --"), weather_for_mood(""), String::new()),
            |day| {
                (
                    format!("DAY {} · {}", day.id, day.festival),
                    weather_for_mood(&day.mood),
                    day.mood.clone(),
                )
            },
        );

        let (title, subtitle, badge) = if arrived {
            (
                ARRIVED_TITLE.to_string(),
                ARRIVED_SUBTITLE.to_string(),
                ARRIVED_BADGE.to_string(),
            )
        } else {
            let stop = next_stop(model, state.day_index);
            let distance = segment.map_or(0.0, |segment| segment.distance_km);
            (
                day.map(|day| day.title.clone()).unwrap_or_default(),
                day.map(|day| format!("{} | {} | {}", day.date, day.lunar, day.element))
                    .unwrap_or_default(),
                format!("{stop} · 本段 {distance}km"),
            )
        };

        Self {
            day_label,
            km_label: format_km(state.km),
            weather,
            mood,
            title,
            subtitle,
            progress_percent: percent(state.progress),
            badge,
            speed_label: format!("x{:.1}", state.speed_multiplier),
            fuel_percent: round_f64_to_i64(state.fuel),
            fatigue_percent: round_f64_to_i64(state.fatigue),
            focus: day.map(|day| day.focus.clone()).unwrap_or_default(),
            food: day.map(|day| day.food.clone()).unwrap_or_default(),
            sleep: day.map(|day| day.sleep.clone()).unwrap_or_default(),
            backup: day
                .map(|day| format!("备选: {}", day.backup))
                .unwrap_or_default(),
            timeline: model.timeline(state.day_index, state.segment_progress),
            auto_active: state.auto && !arrived,
            pause_active: !state.auto && !arrived,
            resume_prompt: driving && !state.auto,
            vehicle_position: route_position(&model.itinerary().route_geo, state.progress),
        }
    }
}
