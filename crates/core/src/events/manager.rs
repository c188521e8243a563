use std::collections::{BTreeMap, VecDeque};

use crate::time::TimeDiscretisation;

use super::{
    EventError,
    event::{Event, EventHandle, EventKind, Key},
};

/// Default time quantum used to compare event times.
pub const DEFAULT_TICK: f64 = 1e-10;

/// Number of processed events kept for inspection.
const PAST_CAPACITY: usize = 64;

/// Time-ordered queue of discrete events.
///
/// The manager distinguishes the events at the current instant (already
/// processed, or inserted at "now") from pending events in the future.
/// [`process`](Self::process) retires the current events, pops every
/// pending event sharing the earliest instant, reschedules the recurring
/// ones, and moves "now" forward.
#[derive(Debug, Clone)]
pub struct EventsManager {
    tick: f64,
    t0: f64,
    t_final: f64,
    now: f64,
    now_ticks: i64,
    current: Vec<Event>,
    pending: BTreeMap<Key, Event>,
    past: VecDeque<Event>,
    next_handle: u64,
}

impl EventsManager {
    /// Creates an empty manager over `[t0, t_final]` with [`DEFAULT_TICK`].
    ///
    /// # Errors
    ///
    /// Returns an error if the horizon is not finite and ordered.
    pub fn new(t0: f64, t_final: f64) -> Result<Self, EventError> {
        Self::with_tick(t0, t_final, DEFAULT_TICK)
    }

    /// Creates an empty manager with an explicit tick.
    ///
    /// # Errors
    ///
    /// Returns an error if the tick is not finite and positive, or if the
    /// horizon is not finite and ordered.
    pub fn with_tick(t0: f64, t_final: f64, tick: f64) -> Result<Self, EventError> {
        if !tick.is_finite() || tick <= 0.0 {
            return Err(EventError::InvalidTick(tick));
        }
        if !t0.is_finite() || !t_final.is_finite() || t_final < t0 {
            return Err(EventError::InvalidHorizon { t0, t_final });
        }

        let mut manager = Self {
            tick,
            t0,
            t_final,
            now: t0,
            now_ticks: 0,
            current: Vec::new(),
            pending: BTreeMap::new(),
            past: VecDeque::new(),
            next_handle: 0,
        };
        manager.now_ticks = manager.ticks(t0);
        Ok(manager)
    }

    /// Inserts a recurring event driven by `clock`.
    ///
    /// The first occurrence is at the clock's current instant. If that
    /// instant is "now", the occurrence counts as current and the next one
    /// is scheduled immediately.
    ///
    /// # Errors
    ///
    /// Returns an error if the first occurrence is outside the horizon or
    /// before the current time.
    pub fn insert(
        &mut self,
        kind: EventKind,
        clock: TimeDiscretisation,
    ) -> Result<EventHandle, EventError> {
        let time = clock.current_time();
        let event = self.make_event(kind, time, Some(clock))?;
        let handle = event.handle;

        if event.ticks == self.now_ticks {
            if let Some(next) = Self::reschedule(&event, self.tick, self.t_final) {
                self.pending.insert(next.key(), next);
            }
            self.current.push(event);
        } else {
            self.pending.insert(event.key(), event);
        }

        tracing::trace!(?kind, time, "inserted recurring event");
        Ok(handle)
    }

    /// Schedules a single-shot event at `time`.
    ///
    /// # Errors
    ///
    /// Returns an error if `time` is outside the horizon or before the
    /// current time.
    pub fn schedule(&mut self, kind: EventKind, time: f64) -> Result<EventHandle, EventError> {
        let event = self.make_event(kind, time, None)?;
        let handle = event.handle;

        if event.ticks == self.now_ticks {
            self.current.push(event);
        } else {
            self.pending.insert(event.key(), event);
        }

        tracing::trace!(?kind, time, "scheduled event");
        Ok(handle)
    }

    /// Removes a pending event.
    ///
    /// Removing a recurring event stops its series.
    ///
    /// # Errors
    ///
    /// Returns an error if the event belongs to the current instant or is
    /// not pending.
    pub fn remove(&mut self, handle: EventHandle) -> Result<Event, EventError> {
        let key = self
            .pending
            .iter()
            .find(|(_, event)| event.handle == handle)
            .map(|(key, _)| *key);

        match key {
            Some(key) => self
                .pending
                .remove(&key)
                .ok_or(EventError::UnknownEvent(handle)),
            None if self.current.iter().any(|event| event.handle == handle) => {
                Err(EventError::RemoveCurrent)
            }
            None => Err(EventError::UnknownEvent(handle)),
        }
    }

    /// Returns the first event at the current instant, if any.
    #[must_use]
    pub fn current(&self) -> Option<&Event> {
        self.current.first()
    }

    /// Returns the earliest pending event without removing it.
    #[must_use]
    pub fn next(&self) -> Option<&Event> {
        self.pending.values().next()
    }

    /// Returns `true` while pending events remain.
    #[must_use]
    pub fn has_next(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Returns the current time.
    #[must_use]
    pub fn current_time(&self) -> f64 {
        self.now
    }

    /// Returns the time of the earliest pending event.
    #[must_use]
    pub fn next_time(&self) -> Option<f64> {
        self.next().map(Event::time)
    }

    /// Returns the simulation horizon `[t0, t_final]`.
    #[must_use]
    pub fn horizon(&self) -> (f64, f64) {
        (self.t0, self.t_final)
    }

    /// Returns `true` if `time` quantizes to the current instant.
    #[must_use]
    pub fn is_now(&self, time: f64) -> bool {
        self.ticks(time) == self.now_ticks
    }

    /// Returns the most recently retired events, oldest first.
    pub fn past(&self) -> impl Iterator<Item = &Event> {
        self.past.iter()
    }

    /// Processes every pending event sharing the earliest instant.
    ///
    /// Events are returned in processing order for the caller to dispatch
    /// to their handlers. Recurring events are rescheduled one clock step
    /// later; a series ends when its clock is exhausted or passes the final
    /// time. Returns an empty list when the queue is exhausted.
    pub fn process(&mut self) -> Vec<Event> {
        let Some(next_ticks) = self.pending.keys().next().map(|key| key.ticks) else {
            return Vec::new();
        };

        for event in self.current.drain(..) {
            if self.past.len() == PAST_CAPACITY {
                self.past.pop_front();
            }
            self.past.push_back(event);
        }

        let keys: Vec<Key> = self
            .pending
            .keys()
            .take_while(|key| key.ticks == next_ticks)
            .copied()
            .collect();

        let mut processed = Vec::with_capacity(keys.len());
        for key in keys {
            if let Some(event) = self.pending.remove(&key) {
                if let Some(next) = Self::reschedule(&event, self.tick, self.t_final) {
                    self.pending.insert(next.key(), next);
                }
                processed.push(event);
            }
        }

        if let Some(first) = processed.first() {
            self.now = first.time;
            self.now_ticks = next_ticks;
        }

        for event in &processed {
            tracing::debug!(kind = ?event.kind, time = event.time, "processed event");
        }

        self.current.clone_from(&processed);
        processed
    }

    fn make_event(
        &mut self,
        kind: EventKind,
        time: f64,
        clock: Option<TimeDiscretisation>,
    ) -> Result<Event, EventError> {
        let ticks = self.ticks(time);
        if !time.is_finite() || ticks < self.ticks(self.t0) || ticks > self.ticks(self.t_final) {
            return Err(EventError::OutOfBounds {
                time,
                t0: self.t0,
                t_final: self.t_final,
            });
        }
        if ticks < self.now_ticks {
            return Err(EventError::InThePast {
                time,
                now: self.now,
            });
        }

        let handle = EventHandle(self.next_handle);
        self.next_handle += 1;

        Ok(Event {
            handle,
            kind,
            time,
            ticks,
            clock,
        })
    }

    /// Builds the next occurrence of a recurring event, keeping its handle.
    fn reschedule(event: &Event, tick: f64, t_final: f64) -> Option<Event> {
        let mut clock = event.clock.clone()?;
        if !clock.increment() {
            return None;
        }

        let time = clock.current_time();
        let ticks = quantize(time, tick);
        if ticks > quantize(t_final, tick) {
            return None;
        }

        Some(Event {
            handle: event.handle,
            kind: event.kind,
            time,
            ticks,
            clock: Some(clock),
        })
    }

    fn ticks(&self, time: f64) -> i64 {
        quantize(time, self.tick)
    }
}

#[allow(clippy::cast_possible_truncation)]
fn quantize(time: f64, tick: f64) -> i64 {
    (time / tick).round() as i64
}
