use super::property::{parse_property_line, RawProperty};
use super::temporal::{parse_date_value, parse_duration, Instant};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

/// Summary used when a VEVENT has none
pub const DEFAULT_SUMMARY: &str = "Busy";

/// An event parsed from a feed, before it is normalized for storage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub uid: String,
    pub summary: String,
    pub start: Instant,
    pub end: Instant,
    pub is_busy: bool,
}

/// Source of placeholder uids for events that do not carry one
pub trait UidGenerator: Send + Sync {
    fn next_uid(&self) -> String;
}

/// Random v4 uuids, unique across concurrent parses
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomUid;

impl UidGenerator for RandomUid {
    fn next_uid(&self) -> String {
        format!("unknown_{}", Uuid::new_v4())
    }
}

/// Fields collected so far for the VEVENT being read
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartialEvent {
    pub uid: Option<String>,
    pub summary: Option<String>,
    pub start: Option<Instant>,
    pub end: Option<Instant>,
    pub transp: Option<String>,
}

impl PartialEvent {
    fn apply(&mut self, property: RawProperty) {
        let tzid = property.parameter("TZID").map(str::to_string);
        match property.name.as_str() {
            "DTSTART" => {
                self.start = parse_date_value(&property.value, tzid.as_deref()).value();
            }
            "DTEND" => {
                self.end = parse_date_value(&property.value, tzid.as_deref()).value();
            }
            "DURATION" => {
                // First DTEND wins; a DURATION before DTSTART has nothing to extend
                if self.end.is_some() {
                    return;
                }
                if let Some(start) = &self.start {
                    let duration = parse_duration(&property.value);
                    if duration.is_fallback() {
                        debug!("Unparseable DURATION {:?}, treating as zero", property.value);
                    }
                    if let Some(duration) = duration.value() {
                        self.end = Some(start.add_duration(&duration));
                    }
                }
            }
            "SUMMARY" => self.summary = Some(property.value),
            "UID" => self.uid = Some(property.value),
            "TRANSP" => self.transp = Some(property.value),
            _ => {}
        }
    }

    /// Finish the record, or `None` when start or end is missing
    fn complete(self, uids: &dyn UidGenerator) -> Option<CalendarEvent> {
        let (start, end) = (self.start?, self.end?);
        Some(CalendarEvent {
            uid: self.uid.unwrap_or_else(|| uids.next_uid()),
            summary: self.summary.unwrap_or_else(|| DEFAULT_SUMMARY.to_string()),
            start,
            end,
            is_busy: self.transp.as_deref() != Some("TRANSPARENT"),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum AssemblerState {
    #[default]
    OutsideEvent,
    InsideEvent(PartialEvent),
}

/// Line-driven VEVENT state machine
pub struct Assembler<'a> {
    state: AssemblerState,
    uids: &'a dyn UidGenerator,
}

impl<'a> Assembler<'a> {
    pub fn new(uids: &'a dyn UidGenerator) -> Self {
        Self {
            state: AssemblerState::OutsideEvent,
            uids,
        }
    }

    pub fn state(&self) -> &AssemblerState {
        &self.state
    }

    /// Consume one unfolded line, returning an event when a block completes
    pub fn feed_line(&mut self, line: &str) -> Option<CalendarEvent> {
        if line == "BEGIN:VEVENT" {
            if matches!(self.state, AssemblerState::InsideEvent(_)) {
                debug!("BEGIN:VEVENT inside an open event, discarding the open one");
            }
            self.state = AssemblerState::InsideEvent(PartialEvent::default());
            return None;
        }

        match std::mem::take(&mut self.state) {
            AssemblerState::OutsideEvent => None,
            AssemblerState::InsideEvent(partial) if line == "END:VEVENT" => {
                let event = partial.complete(self.uids);
                if event.is_none() {
                    debug!("Discarding VEVENT without start or end");
                }
                event
            }
            AssemblerState::InsideEvent(mut partial) => {
                partial.apply(parse_property_line(line));
                self.state = AssemblerState::InsideEvent(partial);
                None
            }
        }
    }
}
