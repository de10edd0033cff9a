//! Ordered chains of dependent events

use std::sync::atomic::{AtomicU32, Ordering};

use crate::features::constraint::domain::Pred;
use crate::shared::models::MethodRef;

use super::event::{Event, SupportingEvent};

static NEXT_ID: AtomicU32 = AtomicU32::new(0);

/// One entry in a chain
#[derive(Debug, Clone)]
pub enum ChainEvent {
    Target(Event),
    Supporting(SupportingEvent),
}

impl ChainEvent {
    pub fn event(&self) -> &Event {
        match self {
            ChainEvent::Target(event) => event,
            ChainEvent::Supporting(support) => support.event(),
        }
    }

    pub fn dependence_constraint(&self) -> Option<&Pred> {
        match self {
            ChainEvent::Target(_) => None,
            ChainEvent::Supporting(support) => support.dependence_constraint(),
        }
    }
}

/// A target Event preceded by the SupportingEvents that satisfy its
/// dependencies, immutable once assembly ends
#[derive(Debug)]
pub struct EventChain {
    id: u32,
    /// Discovery order: target first, supports appended as they resolve
    events: Vec<ChainEvent>,
}

impl EventChain {
    /// Ids are process-wide monotonic; chains may still be persisted out
    /// of order
    pub fn new(target: Event) -> Self {
        EventChain {
            id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
            events: vec![ChainEvent::Target(target)],
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn push_supporting(&mut self, support: SupportingEvent) {
        self.events.push(ChainEvent::Supporting(support));
    }

    /// Events in execution order: deepest prerequisite first, target last
    pub fn events(&self) -> impl Iterator<Item = &ChainEvent> {
        self.events.iter().rev()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn target(&self) -> &Event {
        self.events[0].event()
    }

    /// Entry method fired first when the chain is replayed
    pub fn start_method(&self) -> &MethodRef {
        self.events[self.events.len() - 1].event().path().entry_method()
    }
}
