// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scope-ordered event dispatch (§4.4, §8 ordering guarantees).
//!
//! Subscribers register against a [`Scope`]; dispatch walks
//! `event.dispatch_order()` and invokes every subscriber registered at
//! each scope before moving to the next, so a `JobStart` walks
//! `CLASS_INTERNAL → GLOBAL_INTERNAL → INTERNAL_PLUGIN → API_PLUGIN →
//! JAR_PLUGIN` while the matching `JobEnd` walks the exact reverse.

use ats_core::event::{Event, Scope};
use std::collections::HashMap;
use std::sync::Arc;

pub trait EventSubscriber: Send + Sync {
    fn on_event(&self, event: &Event);
}

/// A closure-backed subscriber, for call sites that don't want to define
/// a named type.
pub struct FnSubscriber<F>(pub F)
where
    F: Fn(&Event) + Send + Sync;

impl<F> EventSubscriber for FnSubscriber<F>
where
    F: Fn(&Event) + Send + Sync,
{
    fn on_event(&self, event: &Event) {
        (self.0)(event)
    }
}

#[derive(Default)]
pub struct EventBus {
    subscribers: HashMap<Scope, Vec<Arc<dyn EventSubscriber>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, scope: Scope, subscriber: Arc<dyn EventSubscriber>) {
        self.subscribers.entry(scope).or_default().push(subscriber);
    }

    /// Dispatches `event` to every subscriber, scope by scope, in the
    /// order `event.dispatch_order()` prescribes.
    pub fn dispatch(&self, event: &Event) {
        for scope in event.dispatch_order() {
            if let Some(subs) = self.subscribers.get(&scope) {
                for sub in subs {
                    sub.on_event(event);
                }
            }
        }
    }

    /// Dispatches `event` to subscribers registered at a single `scope`,
    /// bypassing the usual five-scope walk. Used for
    /// [`Event::JobFirstAllocation`], which the job runner posts only to
    /// `Scope::ApiPlugin` (§4.3 allocation loop step 5).
    pub fn dispatch_to(&self, scope: Scope, event: &Event) {
        if let Some(subs) = self.subscribers.get(&scope) {
            for sub in subs {
                sub.on_event(event);
            }
        }
    }
}

#[cfg(test)]
#[path = "event_bus_tests.rs"]
mod tests;
