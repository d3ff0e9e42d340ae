// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Event System
//!
//! Callbacks for user-visible tracer events.

use std::sync::Arc;

use crate::crypto::Coordinate;
use crate::proximity::RadioWarning;

/// Events emitted by the tracer.
#[derive(Debug, Clone, PartialEq)]
pub enum TraceEvent {
    /// A matching pass flipped contacts to exposed.
    ExposureDetected {
        /// Contacts newly exposed by the pass.
        newly_exposed: usize,
        /// Where the most recent exposure happened, if known.
        last_exposed_coordinate: Option<Coordinate>,
    },

    /// A direct contact was stored.
    ContactRecorded {
        /// Day number of the contact.
        day: i64,
    },

    /// A scanned contact code was too old to answer.
    ContactExpired,

    /// The backend answered with a non-success status.
    BackendStatus {
        /// HTTP status code.
        code: u16,
    },

    /// Bluetooth was switched off; no exchanges until it is back on.
    BluetoothOff,

    /// A sync cycle finished.
    SyncCompleted {
        /// Diagnosis keys received.
        keys: usize,
        /// Tracks received.
        tracks: usize,
    },

    /// Error event for async operations.
    Error {
        /// Error description.
        message: String,
    },
}

/// Event handler trait.
///
/// Implement this trait to receive tracer events.
pub trait EventHandler: Send + Sync {
    /// Called when an event occurs.
    fn on_event(&self, event: TraceEvent);
}

/// Simple callback-based event handler.
///
/// Wraps a closure for easy event handling.
pub struct CallbackHandler<F>
where
    F: Fn(TraceEvent) + Send + Sync,
{
    callback: F,
}

impl<F> CallbackHandler<F>
where
    F: Fn(TraceEvent) + Send + Sync,
{
    /// Creates a new callback handler.
    pub fn new(callback: F) -> Self {
        CallbackHandler { callback }
    }
}

impl<F> EventHandler for CallbackHandler<F>
where
    F: Fn(TraceEvent) + Send + Sync,
{
    fn on_event(&self, event: TraceEvent) {
        (self.callback)(event);
    }
}

/// Event dispatcher for managing multiple handlers.
#[derive(Default)]
pub struct EventDispatcher {
    handlers: Vec<Arc<dyn EventHandler>>,
}

impl EventDispatcher {
    /// Creates a new event dispatcher.
    pub fn new() -> Self {
        EventDispatcher {
            handlers: Vec::new(),
        }
    }

    /// Adds an event handler.
    pub fn add_handler(&mut self, handler: Arc<dyn EventHandler>) {
        self.handlers.push(handler);
    }

    /// Returns the number of registered handlers.
    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }

    /// Dispatches an event to all handlers.
    pub fn dispatch(&self, event: TraceEvent) {
        for handler in &self.handlers {
            handler.on_event(event.clone());
        }
    }
}

impl RadioWarning for EventDispatcher {
    fn bluetooth_off(&self) {
        self.dispatch(TraceEvent::BluetoothOff);
    }
}
