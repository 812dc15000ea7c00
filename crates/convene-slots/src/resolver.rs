use std::collections::BTreeSet;
use std::fmt;

use chrono::NaiveDate;
use convene_core::config::ATOMIC_SLOT_MINUTES;
use convene_core::types::{AvailabilitySubmission, ClockTime, TimeRange};
use serde::{Deserialize, Serialize};

/// One fixed-width unit of availability.
///
/// Field order gives the derived `Ord` its meaning: date first, then start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AtomicSlot {
    pub date: NaiveDate,
    pub start: ClockTime,
    pub end: ClockTime,
}

impl AtomicSlot {
    /// Stable `date|start|end` key, e.g. `2026-03-02|09:30|10:00`.
    pub fn key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for AtomicSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}|{}", self.date, self.start, self.end)
    }
}

impl From<AtomicSlot> for TimeRange {
    fn from(slot: AtomicSlot) -> Self {
        TimeRange::new(slot.date, slot.start, slot.end)
    }
}

/// Outcome of intersecting every interviewer's availability.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Resolution {
    pub has_common: bool,
    /// Ascending by date, then start time.
    pub common_slots: Vec<TimeRange>,
}

impl Resolution {
    fn none() -> Self {
        Self::default()
    }

    /// Earliest common slot, the one a confirmation is built from.
    pub fn earliest(&self) -> Option<&TimeRange> {
        self.common_slots.first()
    }
}

/// Finds the time every assigned interviewer is free.
///
/// Ranges are sliced into `granularity_minutes` units; a trailing remainder
/// shorter than one unit is dropped rather than rounded, so `09:00-10:15`
/// yields `09:00-09:30` and `09:30-10:00` only.
#[derive(Debug, Clone, Copy)]
pub struct CommonSlotResolver {
    granularity_minutes: u32,
}

impl Default for CommonSlotResolver {
    fn default() -> Self {
        Self::new(ATOMIC_SLOT_MINUTES)
    }
}

impl CommonSlotResolver {
    pub fn new(granularity_minutes: u32) -> Self {
        Self {
            granularity_minutes: granularity_minutes.max(1),
        }
    }

    pub fn granularity_minutes(&self) -> u32 {
        self.granularity_minutes
    }

    /// Slice `range` into successive atomic units.
    pub fn expand_to_atomic(&self, range: &TimeRange) -> Vec<AtomicSlot> {
        let step = self.granularity_minutes;
        let end = range.end.minutes();
        let mut cursor = range.start.minutes();
        let mut out = Vec::new();

        while cursor + step <= end {
            // Both bounds are <= end < 24h, so construction cannot fail.
            if let (Some(start), Some(stop)) = (
                ClockTime::from_minutes(cursor),
                ClockTime::from_minutes(cursor + step),
            ) {
                out.push(AtomicSlot {
                    date: range.date,
                    start,
                    end: stop,
                });
            }
            cursor += step;
        }
        out
    }

    /// Deduplicated atomic units covered by the union of `ranges`.
    pub fn atomic_set<'a, I>(&self, ranges: I) -> BTreeSet<AtomicSlot>
    where
        I: IntoIterator<Item = &'a TimeRange>,
    {
        ranges
            .into_iter()
            .flat_map(|r| self.expand_to_atomic(r))
            .collect()
    }

    /// Units present in every set. A single set intersects to itself.
    pub fn intersect(&self, sets: &[BTreeSet<AtomicSlot>]) -> Vec<AtomicSlot> {
        let Some((first, rest)) = sets.split_first() else {
            return Vec::new();
        };
        first
            .iter()
            .filter(|slot| rest.iter().all(|other| other.contains(slot)))
            .copied()
            .collect()
    }

    /// Intersect the submissions of a session.
    ///
    /// Returns no common slot until `responded_count` reaches
    /// `total_assigned`, however much the ranges submitted so far overlap.
    pub fn resolve(
        &self,
        submissions: &[AvailabilitySubmission],
        responded_count: usize,
        total_assigned: usize,
    ) -> Resolution {
        if total_assigned == 0 || responded_count < total_assigned {
            return Resolution::none();
        }

        let sets: Vec<BTreeSet<AtomicSlot>> = submissions
            .iter()
            .map(|s| self.atomic_set(&s.ranges))
            .collect();

        let mut common = self.intersect(&sets);
        // Zero-padded HH:mm sorts lexically in chronological order, so this
        // matches a (date, start string) sort.
        common.sort_by_key(|slot| (slot.date, slot.start));

        Resolution {
            has_common: !common.is_empty(),
            common_slots: common.into_iter().map(TimeRange::from).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use convene_core::types::{InterviewerId, SessionId};

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, d).unwrap()
    }

    fn range(d: u32, start: &str, end: &str) -> TimeRange {
        TimeRange::new(day(d), start.parse().unwrap(), end.parse().unwrap())
    }

    fn submission(who: &str, ranges: Vec<TimeRange>) -> AvailabilitySubmission {
        AvailabilitySubmission {
            session_id: SessionId::from("s-1"),
            interviewer_id: InterviewerId::from(who),
            ranges,
            submitted_at: Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).unwrap(),
        }
    }

    fn render(slots: &[TimeRange]) -> Vec<String> {
        slots.iter().map(|r| r.to_string()).collect()
    }

    #[test]
    fn expand_drops_short_trailing_remainder() {
        let resolver = CommonSlotResolver::default();
        let slots = resolver.expand_to_atomic(&range(2, "09:00", "10:15"));
        let keys: Vec<String> = slots.iter().map(AtomicSlot::key).collect();
        assert_eq!(keys, vec!["2026-03-02|09:00|09:30", "2026-03-02|09:30|10:00"]);
    }

    #[test]
    fn expand_range_shorter_than_unit_is_empty() {
        let resolver = CommonSlotResolver::default();
        assert!(resolver.expand_to_atomic(&range(2, "09:00", "09:20")).is_empty());
    }

    #[test]
    fn expand_reaches_end_of_day() {
        let resolver = CommonSlotResolver::default();
        let slots = resolver.expand_to_atomic(&range(2, "22:30", "23:59"));
        assert_eq!(slots.len(), 2);
        assert_eq!(slots[1].end.to_string(), "23:30");
    }

    #[test]
    fn overlapping_ranges_of_one_interviewer_are_deduplicated() {
        let resolver = CommonSlotResolver::default();
        let ranges = [range(2, "09:00", "10:00"), range(2, "09:30", "10:30")];
        let set = resolver.atomic_set(&ranges);
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn two_interviewers_half_hour_overlap() {
        let resolver = CommonSlotResolver::default();
        let subs = vec![
            submission("a", vec![range(2, "09:00", "10:00")]),
            submission("b", vec![range(2, "09:30", "10:30")]),
        ];
        let res = resolver.resolve(&subs, 2, 2);
        assert!(res.has_common);
        assert_eq!(render(&res.common_slots), vec!["2026-03-02 09:30-10:00"]);
    }

    #[test]
    fn disjoint_ranges_have_nothing_in_common() {
        let resolver = CommonSlotResolver::default();
        let subs = vec![
            submission("a", vec![range(2, "09:00", "09:30")]),
            submission("b", vec![range(2, "10:00", "10:30")]),
        ];
        let res = resolver.resolve(&subs, 2, 2);
        assert!(!res.has_common);
        assert!(res.common_slots.is_empty());
    }

    #[test]
    fn incomplete_responses_never_resolve() {
        let resolver = CommonSlotResolver::default();
        let subs = vec![
            submission("a", vec![range(2, "09:00", "12:00")]),
            submission("b", vec![range(2, "09:00", "12:00")]),
        ];
        let res = resolver.resolve(&subs, 2, 3);
        assert!(!res.has_common);
        assert!(res.common_slots.is_empty());
    }

    #[test]
    fn single_submitter_gets_own_expanded_set() {
        let resolver = CommonSlotResolver::default();
        let subs = vec![submission(
            "a",
            vec![range(2, "09:00", "10:00"), range(2, "09:30", "10:10")],
        )];
        let res = resolver.resolve(&subs, 1, 1);
        assert_eq!(
            render(&res.common_slots),
            vec![
                "2026-03-02 09:00-09:30",
                "2026-03-02 09:30-10:00",
            ]
        );
    }

    #[test]
    fn results_sorted_by_date_then_start() {
        let resolver = CommonSlotResolver::default();
        let subs = vec![
            submission(
                "a",
                vec![range(4, "08:00", "09:00"), range(3, "14:00", "15:00"), range(3, "09:00", "09:30")],
            ),
            submission(
                "b",
                vec![range(3, "09:00", "15:00"), range(4, "07:00", "08:30")],
            ),
        ];
        let res = resolver.resolve(&subs, 2, 2);
        assert_eq!(
            render(&res.common_slots),
            vec![
                "2026-03-03 09:00-09:30",
                "2026-03-03 14:00-14:30",
                "2026-03-03 14:30-15:00",
                "2026-03-04 08:00-08:30",
            ]
        );
        assert_eq!(res.earliest().unwrap().to_string(), "2026-03-03 09:00-09:30");
    }

    #[test]
    fn fully_covered_unit_appears_exactly_once() {
        let resolver = CommonSlotResolver::default();
        // Each interviewer covers 10:00-10:30 through different, overlapping ranges.
        let subs = vec![
            submission("a", vec![range(5, "09:00", "11:00"), range(5, "10:00", "10:30")]),
            submission("b", vec![range(5, "10:00", "10:30"), range(5, "09:30", "10:30")]),
            submission("c", vec![range(5, "08:00", "12:00")]),
        ];
        let res = resolver.resolve(&subs, 3, 3);
        let hits = res
            .common_slots
            .iter()
            .filter(|r| r.to_string() == "2026-03-05 10:00-10:30")
            .count();
        assert_eq!(hits, 1);
        assert_eq!(res.common_slots.len(), 2);
    }

    #[test]
    fn custom_granularity_is_respected() {
        let resolver = CommonSlotResolver::new(15);
        let subs = vec![
            submission("a", vec![range(2, "09:00", "09:45")]),
            submission("b", vec![range(2, "09:30", "10:00")]),
        ];
        let res = resolver.resolve(&subs, 2, 2);
        assert_eq!(render(&res.common_slots), vec!["2026-03-02 09:30-09:45"]);
    }

    #[test]
    fn nobody_assigned_means_nothing_common() {
        let resolver = CommonSlotResolver::default();
        assert_eq!(resolver.resolve(&[], 0, 0), Resolution::default());
    }
}
