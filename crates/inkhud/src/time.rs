//! Wall-clock helpers: validity floor, humanised ages and node ids.

// Timestamps are u32 epoch seconds; differences are taken in i64 so they
// cannot overflow, and every division is by a non-zero constant.
#![allow(
    clippy::arithmetic_side_effects,
    clippy::cast_possible_truncation,
    clippy::integer_division
)]

use core::fmt::Write;

/// Humanised time, e.g. `"3 days ago"` or `"10:42 PM"`.
pub type TimeString = heapless::String<16>;

/// `"!"` + hex node number.
pub type NodeIdString = heapless::String<10>;

const SECS_PER_MIN: i64 = 60;
const SECS_PER_HOUR: i64 = 60 * SECS_PER_MIN;
const SECS_PER_DAY: i64 = 24 * SECS_PER_HOUR;

/// Ages beyond this many days are treated as a bad clock.
pub const MAX_AGE_DAYS: i64 = 6 * 30;

/// Clock readings this far ahead of a timestamp are treated as bad.
const MAX_FUTURE_DAYS: i64 = -2;

/// Unix time of the build, from `build.rs`.
pub const BUILD_EPOCH: u32 = parse_epoch(env!("INKHUD_BUILD_EPOCH"));

/// Used when the build epoch is not a valid number: 2024-10-01 00:00 UTC.
const FALLBACK_EPOCH: u32 = 1_727_740_800;

const fn parse_epoch(s: &str) -> u32 {
    let bytes = s.as_bytes();
    if bytes.is_empty() {
        return FALLBACK_EPOCH;
    }
    let mut value: u32 = 0;
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if !b.is_ascii_digit() {
            return FALLBACK_EPOCH;
        }
        value = match value.checked_mul(10) {
            Some(v) => match v.checked_add((b - b'0') as u32) {
                Some(v) => v,
                None => return FALLBACK_EPOCH,
            },
            None => return FALLBACK_EPOCH,
        };
        i += 1;
    }
    value
}

/// Clock readings at or before this are not trusted: six months before the
/// build.
pub fn valid_after() -> u32 {
    BUILD_EPOCH.saturating_sub((MAX_AGE_DAYS * SECS_PER_DAY) as u32)
}

/// How long ago `timestamp` was, relative to `now`.
///
/// Returns `""` when the clock is not trustworthy: `now` at or before
/// `valid_after`, `timestamp` at or before `valid_after`, `now` more than two
/// days behind `timestamp`, or an age over six months. Otherwise:
///
/// * more than one whole day: `"N days ago"`
/// * more than 18 hours: `"Yesterday"`
/// * else the 12-hour clock time of `timestamp`, e.g. `"9:05 AM"`
pub fn time_string(timestamp: u32, now: u32, valid_after: u32) -> TimeString {
    let mut out = TimeString::new();

    if now <= valid_after {
        debug!("clock prior to build time");
        return out;
    }
    if timestamp <= valid_after {
        debug!("timestamp prior to build time");
        return out;
    }

    let delta = i64::from(now) - i64::from(timestamp);
    let days_ago = delta / SECS_PER_DAY;
    let hours_ago = delta / SECS_PER_HOUR;

    if days_ago < MAX_FUTURE_DAYS {
        debug!("clock behind timestamp");
        return out;
    }
    if days_ago > MAX_AGE_DAYS {
        debug!("timestamp over six months old");
        return out;
    }

    if days_ago > 1 {
        let _ = write!(out, "{days_ago} days ago");
    } else if hours_ago > 18 {
        let _ = out.push_str("Yesterday");
    } else {
        let hms = i64::from(timestamp).rem_euclid(SECS_PER_DAY);
        let hour = hms / SECS_PER_HOUR;
        let minute = (hms % SECS_PER_HOUR) / SECS_PER_MIN;
        let display_hour = if hour % 12 == 0 { 12 } else { hour % 12 };
        let suffix = if hour > 11 { "PM" } else { "AM" };
        let _ = write!(out, "{display_hour}:{minute:02} {suffix}");
    }
    out
}

/// Short id for a node with no known name: `"!"` followed by lowercase hex.
pub fn node_id_string(node: u32) -> NodeIdString {
    let mut out = NodeIdString::new();
    let _ = write!(out, "!{node:x}");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const FLOOR: u32 = 1_700_000_000;
    const NOW: u32 = FLOOR + 400 * 86_400;

    fn ts(now: u32, secs_ago: i64) -> u32 {
        (i64::from(now) - secs_ago) as u32
    }

    #[test]
    fn test_parse_epoch() {
        assert_eq!(parse_epoch("1727740800"), 1_727_740_800);
        assert_eq!(parse_epoch(""), FALLBACK_EPOCH);
        assert_eq!(parse_epoch("12x"), FALLBACK_EPOCH);
        assert_eq!(parse_epoch("99999999999"), FALLBACK_EPOCH);
    }

    #[test]
    fn test_valid_after_is_six_months_before_build() {
        assert_eq!(u64::from(BUILD_EPOCH - valid_after()), 180 * 86_400);
    }

    #[test]
    fn test_untrusted_clock_gives_empty_string() {
        assert_eq!(time_string(FLOOR + 10, FLOOR, FLOOR), "");
        assert_eq!(time_string(FLOOR, NOW, FLOOR), "");
    }

    #[test]
    fn test_clock_far_behind_timestamp() {
        assert_eq!(time_string(ts(NOW, -3 * 86_400), NOW, FLOOR), "");
        // Slightly ahead is tolerated
        assert_ne!(time_string(ts(NOW, -3600), NOW, FLOOR), "");
    }

    #[test]
    fn test_very_old_timestamp() {
        assert_eq!(time_string(ts(NOW, 181 * 86_400), NOW, FLOOR), "");
        assert_eq!(time_string(ts(NOW, 180 * 86_400), NOW, FLOOR), "180 days ago");
    }

    #[test]
    fn test_days_and_yesterday() {
        assert_eq!(time_string(ts(NOW, 2 * 86_400 + 5), NOW, FLOOR), "2 days ago");
        assert_eq!(time_string(ts(NOW, 20 * 3600), NOW, FLOOR), "Yesterday");
        assert_eq!(time_string(ts(NOW, 30 * 3600), NOW, FLOOR), "Yesterday");
    }

    #[test]
    fn test_twelve_hour_clock() {
        let midnight = NOW - NOW % 86_400;
        let now = midnight + 14 * 3600;
        assert_eq!(time_string(midnight + 5 * 60, now, FLOOR), "12:05 AM");
        assert_eq!(time_string(midnight + 13 * 3600 + 7 * 60, now, FLOOR), "1:07 PM");
        assert_eq!(time_string(midnight + 11 * 3600 + 59 * 60, now, FLOOR), "11:59 AM");
    }

    #[test]
    fn test_node_id_string() {
        assert_eq!(node_id_string(0xDEAD_BEEF), "!deadbeef");
        assert_eq!(node_id_string(0x1a), "!1a");
    }
}
