use chrono::Utc;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;

use crate::events::{Event, EventResult, EventStatus, EventType, HistoryRecord};
use crate::simulation::StepContext;

/// Why an injection was refused. Injection failures are local: the rest of a
/// batch always proceeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// The id is already waiting in the pending set.
    DuplicateId,
    /// The id already reached a terminal state in this scheduler.
    AlreadyProcessed,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::DuplicateId => f.write_str("duplicate event id in pending set"),
            RejectReason::AlreadyProcessed => f.write_str("event id already processed"),
        }
    }
}

pub type Handler = Box<dyn FnMut(&Event, &mut StepContext) -> Result<EventResult, String>>;

/// Step-ordered, at-most-once event delivery.
///
/// Pending events are kept ordered by `(target_step, injection_seq)`; the
/// sequence counter gives a stable order for events sharing a step,
/// independent of wall-clock timestamps. A single owned processed-id set is
/// the only duplicate-tracking structure, so the processed list and the id
/// set cannot drift apart.
pub struct EventScheduler {
    pending: Vec<(u64, Event)>,
    next_seq: u64,
    handlers: HashMap<EventType, Vec<Handler>>,
    processed: Vec<Event>,
    failed: Vec<Event>,
    processed_ids: HashSet<String>,
    history: Vec<HistoryRecord>,
}

impl Default for EventScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl EventScheduler {
    pub fn new() -> Self {
        Self {
            pending: Vec::new(),
            next_seq: 0,
            handlers: HashMap::new(),
            processed: Vec::new(),
            failed: Vec::new(),
            processed_ids: HashSet::new(),
            history: Vec::new(),
        }
    }

    /// Register a handler for an event type. All handlers registered for a
    /// type run, in registration order.
    pub fn register_handler(&mut self, event_type: EventType, handler: Handler) {
        self.handlers.entry(event_type).or_default().push(handler);
    }

    /// Insert an event into the pending set.
    pub fn inject(&mut self, event: Event) -> Result<(), RejectReason> {
        if self.processed_ids.contains(&event.id) {
            warn!("event {} already processed, rejecting", event.id);
            return Err(RejectReason::AlreadyProcessed);
        }
        if self.pending.iter().any(|(_, e)| e.id == event.id) {
            warn!("event {} already pending, rejecting", event.id);
            return Err(RejectReason::DuplicateId);
        }

        let seq = self.next_seq;
        self.next_seq += 1;
        self.pending.push((seq, event));
        self.pending
            .sort_by_key(|(seq, e)| (e.target_step, *seq));
        Ok(())
    }

    /// Inject a batch; returns how many were accepted.
    pub fn inject_batch(&mut self, events: Vec<Event>) -> usize {
        let total = events.len();
        let mut accepted = 0;
        for event in events {
            if self.inject(event).is_ok() {
                accepted += 1;
            }
        }
        info!("batch injected {accepted}/{total} events");
        accepted
    }

    /// Deliver every pending event with `target_step <= current_step`,
    /// exactly once each, in `(target_step, injection_seq)` order.
    ///
    /// A failing handler marks its event `Failed` and processing continues
    /// with the next event. Returns the events completed in this call.
    pub fn process(&mut self, current_step: u32, ctx: &mut StepContext) -> Vec<Event> {
        let split = self
            .pending
            .iter()
            .position(|(_, e)| e.target_step > current_step)
            .unwrap_or(self.pending.len());
        let due: Vec<Event> = self
            .pending
            .drain(..split)
            .map(|(_, event)| event)
            .collect();

        let mut completed = Vec::new();
        for mut event in due {
            if self.processed_ids.contains(&event.id) {
                continue;
            }

            event.status = EventStatus::Processing;
            let outcome = Self::dispatch(&mut self.handlers, &event, ctx);
            match outcome {
                Ok(result) => {
                    event.status = EventStatus::Completed;
                    event.result = result;
                    self.record(current_step, &event);
                    self.processed.push(event.clone());
                    completed.push(event);
                }
                Err(message) => {
                    warn!("event {} failed: {message}", event.id);
                    event.status = EventStatus::Failed;
                    event.error = Some(message);
                    self.record(current_step, &event);
                    self.failed.push(event);
                }
            }
        }
        completed
    }

    fn dispatch(
        handlers: &mut HashMap<EventType, Vec<Handler>>,
        event: &Event,
        ctx: &mut StepContext,
    ) -> Result<EventResult, String> {
        let event_type = event.event_type();
        match handlers.get_mut(&event_type) {
            None => {
                // No handler is not an error: the event is a no-op but still
                // counts as completed so it is never reprocessed.
                warn!("no handler registered for {event_type}, treating as no-op");
                Ok(EventResult::new())
            }
            Some(list) => {
                let mut merged = EventResult::new();
                for handler in list.iter_mut() {
                    let result = handler(event, ctx)?;
                    merged.merge(result);
                }
                Ok(merged)
            }
        }
    }

    fn record(&mut self, step: u32, event: &Event) {
        self.processed_ids.insert(event.id.clone());
        self.history.push(HistoryRecord {
            step,
            event_id: event.id.clone(),
            event_type: event.event_type(),
            status: event.status,
            result: event.result.clone(),
            error: event.error.clone(),
            processed_at: Utc::now(),
        });
    }

    pub fn pending(&self) -> Vec<&Event> {
        self.pending.iter().map(|(_, e)| e).collect()
    }

    pub fn processed(&self) -> &[Event] {
        &self.processed
    }

    pub fn failed(&self) -> &[Event] {
        &self.failed
    }

    pub fn is_processed(&self, id: &str) -> bool {
        self.processed_ids.contains(id)
    }

    /// Drop all pending events; terminal history is retained.
    pub fn clear_pending(&mut self) {
        self.pending.clear();
    }

    /// Reset the scheduler completely, history included.
    pub fn clear_all(&mut self) {
        self.pending.clear();
        self.processed.clear();
        self.failed.clear();
        self.processed_ids.clear();
        self.history.clear();
    }

    pub fn summary(&self) -> SchedulerSummary {
        let mut by_type: BTreeMap<EventType, usize> = BTreeMap::new();
        for event in self
            .pending
            .iter()
            .map(|(_, e)| e)
            .chain(self.processed.iter())
            .chain(self.failed.iter())
        {
            *by_type.entry(event.event_type()).or_insert(0) += 1;
        }
        SchedulerSummary {
            pending: self.pending.len(),
            completed: self.processed.len(),
            failed: self.failed.len(),
            by_type,
        }
    }

    /// Ordered audit log of every terminal event.
    pub fn export_history(&self) -> &[HistoryRecord] {
        &self.history
    }

    pub fn save_history(&self, path: &str) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(&self.history)?;
        std::fs::write(path, json)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerSummary {
    pub pending: usize,
    pub completed: usize,
    pub failed: usize,
    pub by_type: BTreeMap<EventType, usize>,
}

impl SchedulerSummary {
    pub fn total(&self) -> usize {
        self.pending + self.completed + self.failed
    }
}

impl fmt::Display for SchedulerSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Events: {} total ({} pending, {} completed, {} failed)",
            self.total(),
            self.pending,
            self.completed,
            self.failed
        )?;
        for (event_type, count) in &self.by_type {
            writeln!(f, "  {event_type}: {count}")?;
        }
        Ok(())
    }
}
