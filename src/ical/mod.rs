//! Minimal iCalendar reader for VEVENT busy/free data.
//!
//! Only what availability sync needs is understood: DTSTART, DTEND,
//! DURATION, SUMMARY, UID and TRANSP inside VEVENT blocks. Recurrence rules,
//! alarms and VTIMEZONE definitions are skipped. Malformed content never
//! produces an error, it just yields fewer events.

mod assembler;
mod property;
mod temporal;
mod unfold;

pub use assembler::{
    Assembler, AssemblerState, CalendarEvent, PartialEvent, RandomUid, UidGenerator,
    DEFAULT_SUMMARY,
};
pub use property::{parse_property_line, RawProperty};
pub use temporal::{parse_date_value, parse_duration, IcalDuration, Instant, Parsed};
pub use unfold::unfold_lines;

use std::sync::Arc;

/// Feed text parser with an injected placeholder-uid source
#[derive(Clone)]
pub struct IcalParser {
    uids: Arc<dyn UidGenerator>,
}

impl Default for IcalParser {
    fn default() -> Self {
        Self::new(Arc::new(RandomUid))
    }
}

impl IcalParser {
    pub fn new(uids: Arc<dyn UidGenerator>) -> Self {
        Self { uids }
    }

    /// Parse feed text into events, in feed order
    pub fn parse(&self, text: &str) -> Vec<CalendarEvent> {
        let mut assembler = Assembler::new(self.uids.as_ref());
        unfold_lines(text)
            .iter()
            .filter_map(|line| assembler.feed_line(line))
            .collect()
    }
}

/// Parse feed text with random placeholder uids
pub fn parse(text: &str) -> Vec<CalendarEvent> {
    IcalParser::default().parse(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    const FEED: &str = "BEGIN:VCALENDAR\r\n\
VERSION:2.0\r\n\
PRODID:-//Example//EN\r\n\
BEGIN:VTIMEZONE\r\n\
TZID:Europe/Helsinki\r\n\
BEGIN:STANDARD\r\n\
DTSTART:19701025T040000\r\n\
TZOFFSETFROM:+0300\r\n\
TZOFFSETTO:+0200\r\n\
END:STANDARD\r\n\
END:VTIMEZONE\r\n\
BEGIN:VEVENT\r\n\
UID:swim-1@example.com\r\n\
SUMMARY:Swimming lesson with a very long descr\r\n \
iption that was folded\r\n\
DTSTART:20240115T090000Z\r\n\
DURATION:PT1H30M\r\n\
END:VEVENT\r\n\
BEGIN:VEVENT\r\n\
UID:holiday@example.com\r\n\
DTSTART;VALUE=DATE:20240120\r\n\
DTEND;VALUE=DATE:20240121\r\n\
TRANSP:TRANSPARENT\r\n\
END:VEVENT\r\n\
BEGIN:VEVENT\r\n\
UID:broken@example.com\r\n\
SUMMARY:No end\r\n\
DTSTART:20240122T090000Z\r\n\
END:VEVENT\r\n\
END:VCALENDAR\r\n";

    #[test]
    fn test_parse_feed() {
        let events = parse(FEED);
        assert_eq!(events.len(), 2);

        let swim = &events[0];
        assert_eq!(swim.uid, "swim-1@example.com");
        assert_eq!(
            swim.summary,
            "Swimming lesson with a very long description that was folded"
        );
        assert_eq!(
            swim.end,
            Instant::Utc(Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap())
        );
        assert!(swim.is_busy);

        let holiday = &events[1];
        assert_eq!(holiday.summary, DEFAULT_SUMMARY);
        assert!(!holiday.is_busy);
        assert!(matches!(holiday.start, Instant::Date(_)));
    }

    #[test]
    fn test_folded_and_unfolded_parse_identically() {
        let folded = "BEGIN:VEVENT\nSUMMARY:Long t\n ext\nUID:a\nDTSTART:20240115\nDTEND:20240116\nEND:VEVENT";
        let plain = "BEGIN:VEVENT\nSUMMARY:Long text\nUID:a\nDTSTART:20240115\nDTEND:20240116\nEND:VEVENT";
        assert_eq!(parse(folded), parse(plain));
    }

    #[test]
    fn test_garbage_never_panics() {
        let inputs = [
            "",
            "BEGIN:VEVENT",
            "BEGIN:VEVENT\nDTSTART:20240115T090000Z\nDTEND:20240115T100000Z",
            "END:VEVENT\nEND:VEVENT\nBEGIN:VEVENT\n:::\n;;;\nDTSTART;=:\nEND:VEVENT",
            "\u{0}\u{1}BEGIN:VEVENT\nDTSTART:ééééééééééééééééé\nDURATION:P\nEND:VEVENT",
            "BEGIN:VEVENT\nDTSTART:20240115T090000Z\nDURATION:P99999999999999999999W\nEND:VEVENT",
        ];
        for input in inputs {
            let events = parse(input);
            assert!(events.len() <= 1);
        }
    }

    #[test]
    fn test_missing_uid_gets_distinct_placeholders() {
        let block = "BEGIN:VEVENT\nDTSTART:20240115\nDTEND:20240116\nEND:VEVENT\n";
        let events = parse(&block.repeat(2));
        assert_eq!(events.len(), 2);
        assert!(events[0].uid.starts_with("unknown_"));
        assert_ne!(events[0].uid, events[1].uid);
    }
}
