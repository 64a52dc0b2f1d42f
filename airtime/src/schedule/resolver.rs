//! Resolve "what plays now" and "what plays next" on a 24-hour cyclic timeline.
//!
//! The current entry is the most recently started one: the last entry whose
//! time of day is at or before `t`. Before the first entry of the day, the
//! last entry of the previous cycle is still current. Next is the entry after
//! current in sorted order, wrapping to the first.

use chrono::{DateTime, Utc};

use crate::domain::{ScheduleEntry, ScheduleSet, TimeOfDay};

/// Current and next entries for one instant.
///
/// Both are `Some` for any non-empty set and both `None` for an empty one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution<'a> {
    pub current: Option<&'a ScheduleEntry>,
    pub next: Option<&'a ScheduleEntry>,
}

impl Resolution<'_> {
    pub const NOTHING: Resolution<'static> = Resolution {
        current: None,
        next: None,
    };
}

/// Resolve against the UTC time of day of `now`.
pub fn resolve(set: &ScheduleSet, now: DateTime<Utc>) -> Resolution<'_> {
    resolve_at(set, TimeOfDay::of_instant(now))
}

/// Resolve against an explicit time of day.
pub fn resolve_at(set: &ScheduleSet, t: TimeOfDay) -> Resolution<'_> {
    let entries = set.entries();
    if entries.is_empty() {
        return Resolution::NOTHING;
    }

    // Number of entries already started today. Entries sharing a time are
    // all counted, so the last of them in stable order becomes current.
    let started = entries.partition_point(|e| e.time_of_day <= t);

    let (current, next) = if started == 0 {
        (entries.len() - 1, 0)
    } else {
        (started - 1, started % entries.len())
    };

    Resolution {
        current: Some(&entries[current]),
        next: Some(&entries[next]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t(s: &str) -> TimeOfDay {
        TimeOfDay::parse(s).unwrap()
    }

    fn set(items: &[(&str, &str)]) -> ScheduleSet {
        ScheduleSet::new(
            items
                .iter()
                .map(|(time, media)| ScheduleEntry::new(t(time), *media, 10))
                .collect(),
        )
    }

    fn media<'a>(r: Resolution<'a>) -> (&'a str, &'a str) {
        (
            r.current.unwrap().media_id.as_str(),
            r.next.unwrap().media_id.as_str(),
        )
    }

    #[test]
    fn test_empty_set_resolves_to_nothing() {
        let empty = ScheduleSet::empty();
        let r = resolve_at(&empty, t("12:00:00"));
        assert_eq!(r, Resolution::NOTHING);
    }

    #[test]
    fn test_between_entries() {
        let s = set(&[("06:00:00", "morning"), ("18:00:00", "evening")]);
        assert_eq!(media(resolve_at(&s, t("09:30:00"))), ("morning", "evening"));
        assert_eq!(media(resolve_at(&s, t("23:59:59"))), ("evening", "morning"));
    }

    #[test]
    fn test_before_first_entry_wraps_to_previous_cycle() {
        let s = set(&[("06:00:00", "morning"), ("18:00:00", "evening")]);
        assert_eq!(media(resolve_at(&s, t("02:00:00"))), ("evening", "morning"));
        assert_eq!(media(resolve_at(&s, t("00:00:00"))), ("evening", "morning"));
    }

    #[test]
    fn test_exact_boundary_is_inclusive() {
        let s = set(&[("06:00:00", "morning"), ("18:00:00", "evening")]);
        assert_eq!(media(resolve_at(&s, t("06:00:00"))), ("morning", "evening"));
        assert_eq!(media(resolve_at(&s, t("05:59:59"))), ("evening", "morning"));
        assert_eq!(media(resolve_at(&s, t("18:00:00"))), ("evening", "morning"));
    }

    #[test]
    fn test_single_entry_is_both_current_and_next() {
        let s = set(&[("12:00:00", "only")]);
        for time in ["00:00:00", "11:59:59", "12:00:00", "23:59:59"] {
            assert_eq!(media(resolve_at(&s, t(time))), ("only", "only"));
        }
    }

    #[test]
    fn test_shared_time_prefers_later_entry() {
        let s = set(&[
            ("06:00:00", "early"),
            ("12:00:00", "first"),
            ("12:00:00", "second"),
            ("20:00:00", "late"),
        ]);
        assert_eq!(media(resolve_at(&s, t("12:00:00"))), ("second", "late"));
        assert_eq!(media(resolve_at(&s, t("11:00:00"))), ("early", "first"));
    }

    #[test]
    fn test_total_over_the_whole_day() {
        let sets = [
            set(&[("00:00:00", "a")]),
            set(&[("06:00:00", "a"), ("18:00:00", "b")]),
            set(&[
                ("00:00:00", "a"),
                ("00:00:01", "b"),
                ("13:13:13", "c"),
                ("23:59:59", "d"),
            ]),
        ];

        for s in &sets {
            for secs in (0..crate::domain::time_of_day::SECONDS_PER_DAY).step_by(37) {
                let now = TimeOfDay::from_seconds(secs).unwrap();
                let r = resolve_at(s, now);
                let current = r.current.expect("current");
                let next = r.next.expect("next");

                // Current never starts after `now`, unless nothing has started yet today.
                let first = s.entries()[0].time_of_day;
                if now >= first {
                    assert!(current.time_of_day <= now);
                } else {
                    assert_eq!(current, s.entries().last().unwrap());
                }
                // Next is the successor of current in cyclic order.
                let idx = s.entries().iter().rposition(|e| e == current).unwrap();
                assert_eq!(next, &s.entries()[(idx + 1) % s.len()]);
            }
        }
    }

    #[test]
    fn test_resolve_uses_utc_instant() {
        let s = set(&[("08:00:00", "showA"), ("20:00:00", "showB")]);
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 9, 30, 0).unwrap();
        assert_eq!(media(resolve(&s, now)), ("showA", "showB"));
    }
}
