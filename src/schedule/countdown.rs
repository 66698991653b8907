use time::{Duration, OffsetDateTime, Time};
use uuid::Uuid;

use crate::models::{ScheduleEntry, WeekDay};

/// The soonest upcoming occurrence among a set of weekly slots.
#[derive(Debug, Clone, PartialEq)]
pub struct Countdown {
    pub entry_id: Uuid,
    pub title: String,
    pub at: OffsetDateTime,
    pub remaining: Duration,
}

/// Next occurrence of a weekly `day`/`hour` slot strictly after `now`.
///
/// The weekday delta wraps forward modulo 7; a same-day occurrence at or
/// before `now` lands one full week ahead. `None` only for an out-of-range
/// hour, which entry validation should have refused.
pub fn next_occurrence(now: OffsetDateTime, day: WeekDay, hour: u8) -> Option<OffsetDateTime> {
    let slot = Time::from_hms(hour, 0, 0).ok()?;
    let today = i64::from(now.weekday().number_days_from_sunday());
    let offset = (i64::from(day.index0()) - today).rem_euclid(7);
    let mut candidate = now.replace_time(slot) + Duration::days(offset);
    if offset == 0 && candidate <= now {
        candidate += Duration::days(7);
    }
    Some(candidate)
}

/// Pick the entry whose next occurrence is soonest. Ties on distance keep the
/// first entry in input order.
pub fn next_event(now: OffsetDateTime, entries: &[ScheduleEntry]) -> Option<Countdown> {
    let mut best: Option<Countdown> = None;
    for entry in entries {
        let Some(at) = next_occurrence(now, entry.day, entry.hour) else {
            continue;
        };
        if best.as_ref().is_none_or(|b| at < b.at) {
            best = Some(Countdown {
                entry_id: entry.id,
                title: entry.title.clone(),
                at,
                remaining: at - now,
            });
        }
    }
    best
}

impl Countdown {
    /// `"2d 3h 14min"` — leading zero components dropped, minutes always kept.
    pub fn human(&self) -> String {
        let total = self.remaining.whole_minutes();
        let days = total / (24 * 60);
        let hours = (total / 60) % 24;
        let minutes = total % 60;

        let mut out = String::new();
        if days > 0 {
            out += &format!("{days}d ");
        }
        if hours > 0 || days > 0 {
            out += &format!("{hours}h ");
        }
        out += &format!("{minutes}min");
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn entry(title: &str, day: WeekDay, hour: u8) -> ScheduleEntry {
        ScheduleEntry {
            id: Uuid::now_v7(),
            owner_id: Uuid::now_v7(),
            title: title.to_owned(),
            description: None,
            instructor: None,
            room: None,
            groups: None,
            day,
            hour,
            duration: None,
            category: String::new(),
            notification: false,
        }
    }

    // 2024-01-01 is a Monday.
    const MONDAY_NOON: OffsetDateTime = datetime!(2024-01-01 12:00:00 UTC);

    #[test]
    fn later_today_stays_today() {
        let at = next_occurrence(MONDAY_NOON, WeekDay::Monday, 15).unwrap();
        assert_eq!(at, datetime!(2024-01-01 15:00:00 UTC));
    }

    #[test]
    fn earlier_today_wraps_a_full_week() {
        let at = next_occurrence(MONDAY_NOON, WeekDay::Monday, 9).unwrap();
        assert_eq!(at, datetime!(2024-01-08 09:00:00 UTC));
    }

    #[test]
    fn exact_hit_is_not_its_own_next_occurrence() {
        // One second past Monday 10:00 -> the following Monday, not the one
        // just missed; and an exact hit counts as passed too.
        let just_after = datetime!(2024-01-01 10:00:01 UTC);
        let at = next_occurrence(just_after, WeekDay::Monday, 10).unwrap();
        assert_eq!(at, datetime!(2024-01-08 10:00:00 UTC));

        let exactly = datetime!(2024-01-01 10:00:00 UTC);
        let at = next_occurrence(exactly, WeekDay::Monday, 10).unwrap();
        assert_eq!(at, datetime!(2024-01-08 10:00:00 UTC));
    }

    #[test]
    fn weekday_delta_wraps_backwards_days_forward() {
        // Sunday from a Monday reference: six days out, not minus one.
        let at = next_occurrence(MONDAY_NOON, WeekDay::Sunday, 8).unwrap();
        assert_eq!(at, datetime!(2024-01-07 08:00:00 UTC));
    }

    #[test]
    fn every_occurrence_is_strictly_future_and_week_congruent() {
        for day in [
            WeekDay::Sunday,
            WeekDay::Monday,
            WeekDay::Tuesday,
            WeekDay::Wednesday,
            WeekDay::Thursday,
            WeekDay::Friday,
            WeekDay::Saturday,
        ] {
            for hour in [0u8, 7, 12, 23] {
                let at = next_occurrence(MONDAY_NOON, day, hour).unwrap();
                assert!(at > MONDAY_NOON, "{day} {hour} not in the future");
                assert!(at - MONDAY_NOON <= Duration::days(7));
                assert_eq!(at.weekday().number_days_from_sunday(), day.index0());
                assert_eq!(at.hour(), hour);
                assert_eq!((at.minute(), at.second()), (0, 0));
            }
        }
    }

    #[test]
    fn out_of_range_hour_yields_none() {
        assert!(next_occurrence(MONDAY_NOON, WeekDay::Monday, 24).is_none());
    }

    #[test]
    fn empty_set_has_no_countdown() {
        assert_eq!(next_event(MONDAY_NOON, &[]), None);
    }

    #[test]
    fn nearest_entry_wins() {
        let entries = vec![
            entry("friday", WeekDay::Friday, 10),
            entry("tuesday", WeekDay::Tuesday, 10),
        ];
        let countdown = next_event(MONDAY_NOON, &entries).unwrap();
        assert_eq!(countdown.title, "tuesday");
        assert_eq!(countdown.at, datetime!(2024-01-02 10:00:00 UTC));
    }

    #[test]
    fn ties_keep_input_order() {
        let first = entry("first", WeekDay::Wednesday, 9);
        let second = entry("second", WeekDay::Wednesday, 9);
        let countdown = next_event(MONDAY_NOON, &[first.clone(), second]).unwrap();
        assert_eq!(countdown.entry_id, first.id);
    }

    #[test]
    fn human_formatting_drops_leading_zeros_keeps_minutes() {
        let make = |remaining: Duration| Countdown {
            entry_id: Uuid::now_v7(),
            title: String::new(),
            at: MONDAY_NOON,
            remaining,
        };
        assert_eq!(make(Duration::minutes(5)).human(), "5min");
        assert_eq!(make(Duration::minutes(0)).human(), "0min");
        assert_eq!(make(Duration::hours(3) + Duration::minutes(14)).human(), "3h 14min");
        assert_eq!(
            make(Duration::days(2) + Duration::minutes(7)).human(),
            "2d 0h 7min"
        );
    }
}
