use chrono::{
    DateTime, Days, Duration, LocalResult, NaiveDate, NaiveDateTime, TimeZone, Timelike, Utc,
};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// Outcome of a lenient parse.
///
/// `Fallback` carries a value that did not come from the expected grammar,
/// so callers can tell a best-effort result from an exact one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Parsed<T> {
    Exact(T),
    Fallback(T),
    Unparseable,
}

impl<T> Parsed<T> {
    /// The parsed value, whether exact or fallback
    pub fn value(self) -> Option<T> {
        match self {
            Parsed::Exact(value) | Parsed::Fallback(value) => Some(value),
            Parsed::Unparseable => None,
        }
    }

    pub fn is_exact(&self) -> bool {
        matches!(self, Parsed::Exact(_))
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Parsed::Fallback(_))
    }
}

/// A point in time as written in the feed, before zone resolution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Instant {
    /// `YYYYMMDDTHHMMSSZ`
    Utc(DateTime<Utc>),
    /// `YYYYMMDDTHHMMSS`, optionally with a TZID that is kept but not resolved
    Floating {
        at: NaiveDateTime,
        tzid: Option<String>,
    },
    /// `YYYYMMDD`
    Date(NaiveDate),
}

impl Instant {
    /// Resolve to an absolute UTC instant.
    ///
    /// Floating and date values are read as wall-clock time in `zone`.
    /// Ambiguous wall-clock times take the earlier offset; times inside a DST
    /// gap move forward by an hour.
    pub fn to_utc(&self, zone: &Tz) -> Option<DateTime<Utc>> {
        match self {
            Instant::Utc(at) => Some(*at),
            Instant::Floating { at, .. } => resolve_wall_clock(zone, at),
            Instant::Date(date) => resolve_wall_clock(zone, &date.and_hms_opt(0, 0, 0)?),
        }
    }

    /// Advance by a duration: calendar days first, then time of day.
    ///
    /// Returns the instant unchanged if the arithmetic would overflow.
    pub fn add_duration(&self, duration: &IcalDuration) -> Instant {
        let shifted = match self {
            Instant::Utc(at) => add_days_then_time(at.naive_utc(), duration)
                .map(|naive| Instant::Utc(naive.and_utc())),
            Instant::Floating { at, tzid } => {
                add_days_then_time(*at, duration).map(|at| Instant::Floating {
                    at,
                    tzid: tzid.clone(),
                })
            }
            Instant::Date(date) => date
                .and_hms_opt(0, 0, 0)
                .and_then(|midnight| add_days_then_time(midnight, duration))
                .map(|at| {
                    if at.num_seconds_from_midnight() == 0 {
                        Instant::Date(at.date())
                    } else {
                        Instant::Floating { at, tzid: None }
                    }
                }),
        };
        shifted.unwrap_or_else(|| self.clone())
    }
}

fn add_days_then_time(base: NaiveDateTime, duration: &IcalDuration) -> Option<NaiveDateTime> {
    let with_days = base.checked_add_days(Days::new(duration.days))?;
    let time = Duration::try_seconds(i64::try_from(duration.seconds).ok()?)?;
    with_days.checked_add_signed(time)
}

fn resolve_wall_clock(zone: &Tz, at: &NaiveDateTime) -> Option<DateTime<Utc>> {
    match zone.from_local_datetime(at) {
        LocalResult::Single(dt) => Some(dt.with_timezone(&Utc)),
        LocalResult::Ambiguous(earliest, _) => Some(earliest.with_timezone(&Utc)),
        LocalResult::None => zone
            .from_local_datetime(&at.checked_add_signed(Duration::hours(1))?)
            .earliest()
            .map(|dt| dt.with_timezone(&Utc)),
    }
}

/// Parse a DATE or DATE-TIME property value.
///
/// The shape is decided by length, not by a `VALUE=DATE` parameter:
/// eight characters is a date, fifteen or more a date-time. Anything else
/// goes through a best-effort generic parse.
pub fn parse_date_value(value: &str, tzid: Option<&str>) -> Parsed<Instant> {
    let v = value.replace('"', "");
    let v = v.trim();

    if v.len() == 8 {
        if let Ok(date) = NaiveDate::parse_from_str(v, "%Y%m%d") {
            return Parsed::Exact(Instant::Date(date));
        }
    } else if v.len() >= 15 {
        let parsed = v
            .get(..15)
            .and_then(|head| NaiveDateTime::parse_from_str(head, "%Y%m%dT%H%M%S").ok());
        if let Some(at) = parsed {
            if v.ends_with('Z') {
                return Parsed::Exact(Instant::Utc(at.and_utc()));
            }
            return Parsed::Exact(Instant::Floating {
                at,
                tzid: tzid.map(str::to_string),
            });
        }
    }

    parse_generic(v, tzid)
}

fn parse_generic(v: &str, tzid: Option<&str>) -> Parsed<Instant> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(v) {
        return Parsed::Fallback(Instant::Utc(dt.with_timezone(&Utc)));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(v) {
        return Parsed::Fallback(Instant::Utc(dt.with_timezone(&Utc)));
    }
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M"] {
        if let Ok(at) = NaiveDateTime::parse_from_str(v, format) {
            return Parsed::Fallback(Instant::Floating {
                at,
                tzid: tzid.map(str::to_string),
            });
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(v, "%Y-%m-%d") {
        return Parsed::Fallback(Instant::Date(date));
    }
    Parsed::Unparseable
}

/// An iCalendar DURATION split into calendar days and time-of-day seconds
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IcalDuration {
    pub days: u64,
    pub seconds: u64,
}

impl IcalDuration {
    pub fn is_zero(&self) -> bool {
        self.days == 0 && self.seconds == 0
    }
}

/// Parse `[+|-]P[nW][nD][T[nH][nM][nS]]`.
///
/// The sign is accepted and ignored. Input that does not follow the grammar
/// yields a zero-length fallback so applying it leaves the base unchanged.
pub fn parse_duration(value: &str) -> Parsed<IcalDuration> {
    match scan_duration(value.trim()) {
        Some(duration) => Parsed::Exact(duration),
        None => Parsed::Fallback(IcalDuration::default()),
    }
}

fn scan_duration(text: &str) -> Option<IcalDuration> {
    let text = text.strip_prefix(['+', '-']).unwrap_or(text);
    let body = text.strip_prefix('P')?;

    let (date_part, time_part) = match body.split_once('T') {
        Some((date, time)) => (date, Some(time)),
        None => (body, None),
    };

    let mut duration = IcalDuration::default();
    let mut seen_any = false;

    for (amount, designator) in components(date_part)? {
        let days = match designator {
            'W' => amount.checked_mul(7)?,
            'D' => amount,
            _ => return None,
        };
        duration.days = duration.days.checked_add(days)?;
        seen_any = true;
    }

    if let Some(time_part) = time_part {
        let parts = components(time_part)?;
        if parts.is_empty() {
            return None;
        }
        for (amount, designator) in parts {
            let seconds = match designator {
                'H' => amount.checked_mul(3600)?,
                'M' => amount.checked_mul(60)?,
                'S' => amount,
                _ => return None,
            };
            duration.seconds = duration.seconds.checked_add(seconds)?;
            seen_any = true;
        }
    }

    seen_any.then_some(duration)
}

/// Split `1W2D` into `[(1, 'W'), (2, 'D')]`
fn components(text: &str) -> Option<Vec<(u64, char)>> {
    let mut parts = Vec::new();
    let mut amount: Option<u64> = None;
    for c in text.chars() {
        if let Some(digit) = c.to_digit(10) {
            let current = amount.unwrap_or(0);
            amount = Some(current.checked_mul(10)?.checked_add(u64::from(digit))?);
        } else {
            parts.push((amount.take()?, c));
        }
    }
    // Trailing digits without a designator
    if amount.is_some() {
        return None;
    }
    Some(parts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveTime, TimeZone};

    #[test]
    fn test_date_only() {
        let parsed = parse_date_value("20240115", None);
        let expected = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        assert_eq!(parsed, Parsed::Exact(Instant::Date(expected)));
        let utc = parsed.value().unwrap().to_utc(&chrono_tz::UTC).unwrap();
        assert_eq!(utc.time(), NaiveTime::from_hms_opt(0, 0, 0).unwrap());
    }

    #[test]
    fn test_utc_datetime() {
        let parsed = parse_date_value("20240115T090000Z", None).value().unwrap();
        assert_eq!(
            parsed,
            Instant::Utc(Utc.with_ymd_and_hms(2024, 1, 15, 9, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_floating_keeps_tzid_hint_without_resolving_it() {
        let parsed = parse_date_value("20240115T090000", Some("America/New_York"))
            .value()
            .unwrap();
        let at = NaiveDate::from_ymd_opt(2024, 1, 15)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        assert_eq!(
            parsed,
            Instant::Floating {
                at,
                tzid: Some("America/New_York".to_string())
            }
        );
        // Read in the configured zone, not in the TZID
        let helsinki: Tz = "Europe/Helsinki".parse().unwrap();
        assert_eq!(
            parsed.to_utc(&helsinki).unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 15, 7, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_wall_clock_in_dst_gap_moves_forward() {
        let helsinki: Tz = "Europe/Helsinki".parse().unwrap();
        let at = NaiveDate::from_ymd_opt(2024, 3, 31)
            .unwrap()
            .and_hms_opt(3, 30, 0)
            .unwrap();
        let floating = Instant::Floating { at, tzid: None };
        assert_eq!(
            floating.to_utc(&helsinki).unwrap(),
            Utc.with_ymd_and_hms(2024, 3, 31, 1, 30, 0).unwrap()
        );
    }

    #[test]
    fn test_ambiguous_wall_clock_takes_earliest() {
        let helsinki: Tz = "Europe/Helsinki".parse().unwrap();
        let at = NaiveDate::from_ymd_opt(2024, 10, 27)
            .unwrap()
            .and_hms_opt(3, 30, 0)
            .unwrap();
        let floating = Instant::Floating { at, tzid: None };
        assert_eq!(
            floating.to_utc(&helsinki).unwrap(),
            Utc.with_ymd_and_hms(2024, 10, 27, 0, 30, 0).unwrap()
        );
    }

    #[test]
    fn test_quotes_are_stripped() {
        assert!(parse_date_value("\"20240115T090000Z\"", None).is_exact());
    }

    #[test]
    fn test_generic_fallback() {
        let parsed = parse_date_value("2024-01-15T09:00:00+02:00", None);
        assert!(parsed.is_fallback());
        assert_eq!(
            parsed.value().unwrap(),
            Instant::Utc(Utc.with_ymd_and_hms(2024, 1, 15, 7, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_garbage_is_unparseable() {
        assert_eq!(parse_date_value("not a date", None), Parsed::Unparseable);
        assert_eq!(parse_date_value("2024XX15", None), Parsed::Unparseable);
        assert_eq!(parse_date_value("20241315T250000Z", None), Parsed::Unparseable);
        assert_eq!(parse_date_value("", None), Parsed::Unparseable);
    }

    #[test]
    fn test_duration_hours_minutes() {
        let base = Instant::Utc(Utc.with_ymd_and_hms(2024, 1, 15, 9, 0, 0).unwrap());
        let duration = parse_duration("PT1H30M");
        assert!(duration.is_exact());
        let end = base.add_duration(&duration.value().unwrap());
        assert_eq!(
            end,
            Instant::Utc(Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap())
        );
    }

    #[test]
    fn test_duration_week() {
        let base = Instant::Utc(Utc.with_ymd_and_hms(2024, 1, 15, 9, 0, 0).unwrap());
        let end = base.add_duration(&parse_duration("P1W").value().unwrap());
        assert_eq!(
            end,
            Instant::Utc(Utc.with_ymd_and_hms(2024, 1, 22, 9, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_duration_full_grammar() {
        let duration = parse_duration("P1W2DT3H4M5S").value().unwrap();
        assert_eq!(duration.days, 9);
        assert_eq!(duration.seconds, 3 * 3600 + 4 * 60 + 5);
        assert!(parse_duration("-PT15M").is_exact());
    }

    #[test]
    fn test_duration_on_date_stays_date_for_whole_days() {
        let base = Instant::Date(NaiveDate::from_ymd_opt(2024, 2, 28).unwrap());
        assert_eq!(
            base.add_duration(&parse_duration("P2D").value().unwrap()),
            Instant::Date(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap())
        );
        let with_time = base.add_duration(&parse_duration("PT2H").value().unwrap());
        assert!(matches!(with_time, Instant::Floating { .. }));
    }

    #[test]
    fn test_bad_duration_is_zero_fallback() {
        for bad in ["", "1H", "PT", "P1X", "PT1H2", "P1H", "garbage"] {
            let parsed = parse_duration(bad);
            assert!(parsed.is_fallback(), "{bad} should fall back");
            assert!(parsed.value().unwrap().is_zero());
        }
        let base = Instant::Utc(Utc.with_ymd_and_hms(2024, 1, 15, 9, 0, 0).unwrap());
        assert_eq!(base.add_duration(&IcalDuration::default()), base);
    }

    #[test]
    fn test_overflowing_duration_leaves_base_unchanged() {
        let base = Instant::Utc(Utc.with_ymd_and_hms(2024, 1, 15, 9, 0, 0).unwrap());
        let huge = parse_duration("P99999999999999D").value().unwrap();
        assert_eq!(base.add_duration(&huge), base);
    }
}
