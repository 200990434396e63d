//! Static route model: day segments, narrative events, and checklist views.
//!
//! Built once from an [`Itinerary`] and never mutated afterwards. Every query
//! here is a pure function of the itinerary and the position passed in.
use serde::{Deserialize, Serialize};

use crate::constants::{
    FALLBACK_TOTAL_KM, FESTIVAL_MARKERS, FESTIVAL_TRIGGER_BIAS, FESTIVAL_TRIGGER_FLOOR_KM,
    MIN_DRIVE_MINUTES,
};
use crate::itinerary::{DayPlan, Itinerary, parse_drive_km, parse_drive_minutes, parse_time_label};
use crate::numbers::{clamp_finite, floor_f64_to_usize, round_f64_to_i64, usize_to_f64};

/// One itinerary day's contiguous distance window along the route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub id: String,
    pub day_index: usize,
    pub day_id: u32,
    pub start_km: f64,
    pub end_km: f64,
    pub distance_km: f64,
    /// Average speed in km/h over the authored drive duration.
    pub average_speed: i64,
    pub mood_tag: String,
    pub title: String,
}

impl Segment {
    /// Whether `km` lies inside `[start_km, end_km]`.
    #[must_use]
    pub fn contains(&self, km: f64) -> bool {
        self.start_km <= km && km <= self.end_km
    }
}

/// Kind of one-shot narrative event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// The vehicle reached the end of a day's drive.
    Arrival,
    /// A festival atmosphere cue partway through a holiday drive.
    Festival,
}

/// Presentation text carried by a narrative event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventPayload {
    pub title: String,
    pub subtitle: String,
}

/// A point event anchored to an absolute route distance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NarrativeEvent {
    pub id: String,
    pub kind: EventKind,
    pub trigger_km: f64,
    pub payload: EventPayload,
}

/// Status of a checklist row relative to the position within the day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimelineStatus {
    Done,
    Active,
    Todo,
}

/// One row of the per-day checklist view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineItem {
    pub label: String,
    pub time: String,
    pub status: TimelineStatus,
}

/// Immutable route and event structure derived from an itinerary.
#[derive(Debug, Clone)]
pub struct JourneyModel {
    itinerary: Itinerary,
    segments: Vec<Segment>,
    events: Vec<NarrativeEvent>,
    total_km: f64,
}

impl JourneyModel {
    /// Build segments and the sorted event list from `itinerary`.
    ///
    /// Days whose drive text carries no distance collapse to zero-length
    /// segments rather than failing construction.
    #[must_use]
    pub fn new(itinerary: Itinerary) -> Self {
        let segments = build_segments(&itinerary.days);
        let total_km = resolve_total_km(&segments, itinerary.total_distance_km);
        let events = build_events(&itinerary.days, &segments);
        log::debug!(
            "journey model built: {} segments, {} events, {total_km} km",
            segments.len(),
            events.len()
        );
        Self {
            itinerary,
            segments,
            events,
            total_km,
        }
    }

    #[must_use]
    pub const fn itinerary(&self) -> &Itinerary {
        &self.itinerary
    }

    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Narrative events sorted ascending by trigger distance.
    #[must_use]
    pub fn events(&self) -> &[NarrativeEvent] {
        &self.events
    }

    #[must_use]
    pub const fn total_km(&self) -> f64 {
        self.total_km
    }

    /// Clamp `km` into the route's valid domain.
    #[must_use]
    pub fn clamp_km(&self, km: f64) -> f64 {
        clamp_finite(km, 0.0, self.total_km)
    }

    /// Index of the day containing `km`.
    ///
    /// A boundary distance belongs to the day that ends there, not the day
    /// starting there.
    #[must_use]
    pub fn day_index_by_km(&self, km: f64) -> usize {
        let safe_km = self.clamp_km(km);
        let idx = self.segments.partition_point(|segment| segment.end_km < safe_km);
        idx.min(self.segments.len().saturating_sub(1))
    }

    /// Segment containing `km`; `None` only for an itinerary without days.
    #[must_use]
    pub fn segment_by_km(&self, km: f64) -> Option<&Segment> {
        self.segments.get(self.day_index_by_km(km))
    }

    #[must_use]
    pub fn segment_by_day_id(&self, day_id: u32) -> Option<&Segment> {
        self.segments.iter().find(|segment| segment.day_id == day_id)
    }

    #[must_use]
    pub fn day(&self, day_index: usize) -> Option<&DayPlan> {
        self.itinerary.days.get(day_index)
    }

    /// Number of events whose trigger lies at or before `km`.
    #[must_use]
    pub fn events_resolved_at(&self, km: f64) -> usize {
        self.events.partition_point(|event| event.trigger_km <= km)
    }

    /// Checklist for `day_index` with statuses derived from `segment_progress`.
    #[must_use]
    pub fn timeline(&self, day_index: usize, segment_progress: f64) -> Vec<TimelineItem> {
        let Some(day) = self.day(day_index) else {
            return Vec::new();
        };
        let count = day.schedule.len().max(1);
        let scaled = clamp_finite(segment_progress, 0.0, 1.0) * usize_to_f64(count);
        let active = floor_f64_to_usize(scaled).min(count - 1);

        day.schedule
            .iter()
            .enumerate()
            .map(|(idx, item)| TimelineItem {
                label: item.clone(),
                time: parse_time_label(item),
                status: match idx.cmp(&active) {
                    std::cmp::Ordering::Less => TimelineStatus::Done,
                    std::cmp::Ordering::Equal => TimelineStatus::Active,
                    std::cmp::Ordering::Greater => TimelineStatus::Todo,
                },
            })
            .collect()
    }
}

fn build_segments(days: &[DayPlan]) -> Vec<Segment> {
    let mut cursor_km = 0.0;
    days.iter()
        .enumerate()
        .map(|(idx, day)| {
            let distance_km = parse_drive_km(&day.drive);
            if distance_km <= 0.0 {
                log::warn!("day {} has no parsable distance in {:?}", day.id, day.drive);
            }
            let drive_minutes = parse_drive_minutes(&day.drive).max(MIN_DRIVE_MINUTES);
            let start_km = cursor_km;
            let end_km = cursor_km + distance_km;
            cursor_km = end_km;

            Segment {
                id: format!("day_{}", day.id),
                day_index: idx,
                day_id: day.id,
                start_km,
                end_km,
                distance_km,
                average_speed: round_f64_to_i64(distance_km / f64::from(drive_minutes) * 60.0),
                mood_tag: day.mood.clone(),
                title: day.title.clone(),
            }
        })
        .collect()
}

fn resolve_total_km(segments: &[Segment], authored_total: f64) -> f64 {
    let route_end = segments.last().map_or(0.0, |segment| segment.end_km);
    if route_end > 0.0 {
        route_end
    } else if authored_total.is_finite() && authored_total > 0.0 {
        authored_total
    } else {
        FALLBACK_TOTAL_KM
    }
}

fn is_festival_day(day: &DayPlan) -> bool {
    FESTIVAL_MARKERS
        .iter()
        .any(|marker| day.festival.contains(marker))
}

fn build_events(days: &[DayPlan], segments: &[Segment]) -> Vec<NarrativeEvent> {
    let mut events = Vec::with_capacity(segments.len() * 2);
    for (day, segment) in days.iter().zip(segments) {
        events.push(NarrativeEvent {
            id: format!("arrival_{}", day.id),
            kind: EventKind::Arrival,
            trigger_km: segment.end_km,
            payload: EventPayload {
                title: format!("到达 {}", day.sleep),
                subtitle: day.title.clone(),
            },
        });

        if is_festival_day(day) {
            let offset = FESTIVAL_TRIGGER_FLOOR_KM.max(segment.distance_km * FESTIVAL_TRIGGER_BIAS);
            events.push(NarrativeEvent {
                id: format!("festival_{}", day.id),
                kind: EventKind::Festival,
                trigger_km: segment.start_km + offset,
                payload: EventPayload {
                    title: format!("{} 氛围触发", day.festival),
                    subtitle: day.element.clone(),
                },
            });
        }
    }
    // Vec::sort_by is stable, so ties keep itinerary order.
    events.sort_by(|a, b| a.trigger_km.total_cmp(&b.trigger_km));
    events
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(id: u32, drive: &str, festival: &str) -> DayPlan {
        DayPlan {
            id,
            drive: drive.to_string(),
            festival: festival.to_string(),
            sleep: format!("city{id}"),
            title: format!("Day {id}"),
            element: format!("element{id}"),
            schedule: vec![
                "08:00 depart".to_string(),
                "12:00 lunch".to_string(),
                "17:00 arrive".to_string(),
                "sunset".to_string(),
            ],
            ..DayPlan::default()
        }
    }

    fn model(days: Vec<DayPlan>) -> JourneyModel {
        JourneyModel::new(Itinerary {
            days,
            ..Itinerary::default()
        })
    }

    #[test]
    fn segments_are_contiguous_from_zero() {
        let m = model(vec![
            day(1, "40km 1h", ""),
            day(2, "60km 1h10m", ""),
            day(3, "25km", ""),
        ]);
        let segments = m.segments();
        assert!(segments[0].start_km.abs() < f64::EPSILON);
        for pair in segments.windows(2) {
            assert!((pair[0].end_km - pair[1].start_km).abs() < f64::EPSILON);
        }
        assert!((m.total_km() - 125.0).abs() < f64::EPSILON);
    }

    #[test]
    fn average_speed_uses_minimum_duration() {
        let m = model(vec![day(1, "90km 30m", ""), day(2, "140km 2h", "")]);
        assert_eq!(m.segments()[0].average_speed, 90);
        assert_eq!(m.segments()[1].average_speed, 70);
    }

    #[test]
    fn boundary_km_belongs_to_earlier_day() {
        let m = model(vec![day(1, "40km", ""), day(2, "60km", "")]);
        assert_eq!(m.day_index_by_km(0.0), 0);
        assert_eq!(m.day_index_by_km(40.0), 0);
        assert_eq!(m.day_index_by_km(40.1), 1);
        assert_eq!(m.day_index_by_km(100.0), 1);
        assert_eq!(m.day_index_by_km(-5.0), 0);
        assert_eq!(m.day_index_by_km(500.0), 1);
    }

    #[test]
    fn zero_length_days_resolve_to_first_match() {
        let m = model(vec![day(1, "40km", ""), day(2, "closed road", ""), day(3, "60km", "")]);
        assert_eq!(m.day_index_by_km(40.0), 0);
        assert_eq!(m.day_index_by_km(41.0), 2);
        assert!(m.segments()[1].distance_km.abs() < f64::EPSILON);
    }

    #[test]
    fn day_lookup_is_smallest_containing_segment() {
        let m = model(vec![day(1, "40km", ""), day(2, "0km", ""), day(3, "60km", "")]);
        let mut km = 0.0;
        while km <= m.total_km() {
            let idx = m.day_index_by_km(km);
            assert!(m.segments()[idx].contains(km), "km {km} not in segment {idx}");
            let first = m.segments().iter().position(|s| s.contains(km)).unwrap();
            assert_eq!(idx, first);
            km += 0.5;
        }
    }

    #[test]
    fn wide_distance_token_keeps_its_length() {
        let m = model(vec![day(1, "5000000000km 1h", ""), day(2, "40km", "")]);
        assert!((m.segments()[0].distance_km - 5_000_000_000.0).abs() < f64::EPSILON);
        assert!((m.total_km() - 5_000_000_040.0).abs() < f64::EPSILON);
    }

    #[test]
    fn unparsable_itinerary_uses_fallback_total() {
        let m = JourneyModel::new(Itinerary {
            total_distance_km: 300.0,
            days: vec![day(1, "???", "")],
            ..Itinerary::default()
        });
        assert!((m.total_km() - 300.0).abs() < f64::EPSILON);

        let bare = model(vec![day(1, "", "")]);
        assert!((bare.total_km() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn arrival_per_segment_and_festival_markers() {
        let m = model(vec![
            day(1, "100km", "除夕"),
            day(2, "10km", "初一 春节"),
            day(3, "50km", "初三"),
            day(4, "80km", "初五 迎财神"),
        ]);
        let arrivals = m.events().iter().filter(|e| e.kind == EventKind::Arrival).count();
        let festivals: Vec<_> = m
            .events()
            .iter()
            .filter(|e| e.kind == EventKind::Festival)
            .collect();
        assert_eq!(arrivals, 4);
        assert_eq!(festivals.len(), 3);

        let eve = festivals.iter().find(|e| e.id == "festival_1").unwrap();
        assert!((eve.trigger_km - 52.0).abs() < 1e-9);
        // Short day: floor of 12 km past the start.
        let new_year = festivals.iter().find(|e| e.id == "festival_2").unwrap();
        assert!((new_year.trigger_km - 112.0).abs() < 1e-9);
        assert_eq!(new_year.payload.title, "初一 春节 氛围触发");
        assert_eq!(new_year.payload.subtitle, "element2");
    }

    #[test]
    fn events_sorted_ascending() {
        let m = model(vec![day(1, "10km", "初一"), day(2, "100km", "除夕")]);
        let triggers: Vec<f64> = m.events().iter().map(|e| e.trigger_km).collect();
        assert!(triggers.windows(2).all(|w| w[0] <= w[1]));
        // festival_1 sits past arrival_1 because of the 12 km floor.
        assert_eq!(m.events()[0].id, "arrival_1");
        assert_eq!(m.events()[1].id, "festival_1");
    }

    #[test]
    fn events_resolved_counts_inclusive() {
        let m = model(vec![day(1, "40km", ""), day(2, "60km", "")]);
        assert_eq!(m.events_resolved_at(0.0), 0);
        assert_eq!(m.events_resolved_at(40.0), 1);
        assert_eq!(m.events_resolved_at(99.9), 1);
        assert_eq!(m.events_resolved_at(100.0), 2);
    }

    #[test]
    fn timeline_statuses_follow_progress() {
        let m = model(vec![day(1, "40km", "")]);
        let rows = m.timeline(0, 0.5);
        let statuses: Vec<_> = rows.iter().map(|r| r.status).collect();
        assert_eq!(
            statuses,
            vec![
                TimelineStatus::Done,
                TimelineStatus::Done,
                TimelineStatus::Active,
                TimelineStatus::Todo
            ]
        );
        assert_eq!(rows[0].time, "08:00");
        assert_eq!(rows[3].time, "--:--");

        let finished = m.timeline(0, 1.0);
        assert_eq!(finished[3].status, TimelineStatus::Active);
        assert!(m.timeline(7, 0.5).is_empty());
    }

    #[test]
    fn segment_by_day_id_finds_authored_id() {
        let m = model(vec![day(4, "40km", ""), day(9, "60km", "")]);
        assert_eq!(m.segment_by_day_id(9).map(|s| s.day_index), Some(1));
        assert!(m.segment_by_day_id(2).is_none());
    }

    #[test]
    fn empty_itinerary_is_structurally_valid() {
        let m = model(Vec::new());
        assert!(m.segments().is_empty());
        assert!(m.events().is_empty());
        assert_eq!(m.day_index_by_km(10.0), 0);
        assert!(m.segment_by_km(0.5).is_none());
    }
}
