use std::borrow::Cow;
use std::cell::RefCell;
use std::rc::Rc;

use rts_ai_core::rng::{hash_str, mix64};
use rts_ai_core::UnitId;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A small, allocation-friendly trace event.
///
/// This is intentionally "dumb data" so it can be recorded during simulation and later rendered
/// by tooling. Events must only carry deterministic payloads; wall-clock timings go to `tracing`.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TraceEvent {
    pub tick: u64,
    pub tag: Cow<'static, str>,
    pub agent: UnitId,
    pub a: u64,
    pub b: u64,
}

impl TraceEvent {
    pub fn new(tick: u64, tag: impl Into<Cow<'static, str>>) -> Self {
        Self {
            tick,
            tag: tag.into(),
            agent: 0,
            a: 0,
            b: 0,
        }
    }

    pub fn with_agent(mut self, agent: UnitId) -> Self {
        self.agent = agent;
        self
    }

    pub fn with_a(mut self, a: u64) -> Self {
        self.a = a;
        self
    }

    pub fn with_b(mut self, b: u64) -> Self {
        self.b = b;
        self
    }
}

pub trait TraceSink {
    fn emit(&mut self, event: TraceEvent);
}

#[derive(Debug, Default)]
pub struct NullTraceSink;

impl TraceSink for NullTraceSink {
    fn emit(&mut self, _event: TraceEvent) {}
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TraceLog {
    pub events: Vec<TraceEvent>,
}

impl TraceLog {
    pub fn push(&mut self, event: TraceEvent) {
        self.events.push(event);
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn with_tag<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a TraceEvent> + 'a {
        self.events.iter().filter(move |e| e.tag == tag)
    }

    /// Order-sensitive fingerprint of the whole log, for comparing two replays.
    pub fn digest(&self) -> u64 {
        self.events.iter().fold(0x243F_6A88_85A3_08D3, |acc, e| {
            let mut h = mix64(acc ^ e.tick);
            h = mix64(h ^ hash_str(&e.tag));
            h = mix64(h ^ e.agent);
            h = mix64(h ^ e.a);
            mix64(h ^ e.b)
        })
    }
}

impl TraceSink for TraceLog {
    fn emit(&mut self, event: TraceEvent) {
        self.push(event);
    }
}

/// A log several emitters (trees, the scheduler) can append to.
pub type SharedTraceLog = Rc<RefCell<TraceLog>>;

impl<S: TraceSink> TraceSink for Rc<RefCell<S>> {
    fn emit(&mut self, event: TraceEvent) {
        self.borrow_mut().emit(event);
    }
}

/// Emit into an optional sink.
pub fn emit(sink: Option<&mut (dyn TraceSink + 'static)>, event: TraceEvent) {
    if let Some(sink) = sink {
        sink.emit(event);
    }
}
