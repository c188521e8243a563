use std::cmp::Ordering;

use crate::time::TimeDiscretisation;

/// The kind of a scheduled event.
///
/// Sensor and actuator events carry the index of the handler they dispatch
/// to, as assigned by the owning simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde-derive", derive(serde::Serialize, serde::Deserialize))]
pub enum EventKind {
    /// An impact or contact transition located by root finding.
    NonSmooth,
    /// A sensor capture.
    Sensor(usize),
    /// An actuator update.
    Actuator(usize),
    /// The end of a time-discretisation step.
    TimeDiscretisation,
}

impl EventKind {
    /// Returns the processing priority among simultaneous events.
    ///
    /// Lower values are processed first: non-smooth events, then sensor
    /// captures, then actuator updates, and the step tick last.
    #[must_use]
    pub fn priority(self) -> u8 {
        match self {
            Self::NonSmooth => 0,
            Self::Sensor(_) => 1,
            Self::Actuator(_) => 2,
            Self::TimeDiscretisation => 3,
        }
    }
}

/// Stable identifier of a scheduled event, unique within one manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventHandle(pub(super) u64);

/// A discrete event: a time, a kind, and an optional recurrence clock.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub(super) handle: EventHandle,
    pub(super) kind: EventKind,
    pub(super) time: f64,
    pub(super) ticks: i64,
    pub(super) clock: Option<TimeDiscretisation>,
}

impl Event {
    /// Returns the event's handle.
    #[must_use]
    pub fn handle(&self) -> EventHandle {
        self.handle
    }

    /// Returns the event's kind.
    #[must_use]
    pub fn kind(&self) -> EventKind {
        self.kind
    }

    /// Returns the event time.
    #[must_use]
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Returns `true` if the event is rescheduled after processing.
    #[must_use]
    pub fn is_recurring(&self) -> bool {
        self.clock.is_some()
    }

    pub(super) fn key(&self) -> Key {
        Key {
            ticks: self.ticks,
            priority: self.kind.priority(),
            handle: self.handle,
        }
    }
}

/// Total order of the queue: time, then kind priority, then insertion order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct Key {
    pub(super) ticks: i64,
    pub(super) priority: u8,
    pub(super) handle: EventHandle,
}

impl Ord for Key {
    fn cmp(&self, other: &Self) -> Ordering {
        self.ticks
            .cmp(&other.ticks)
            .then(self.priority.cmp(&other.priority))
            .then(self.handle.cmp(&other.handle))
    }
}

impl PartialOrd for Key {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
