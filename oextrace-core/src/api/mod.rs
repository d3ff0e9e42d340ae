// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! OExTrace API Layer
//!
//! High-level facade over the exposure-detection stores and protocols.
//!
//! # Example
//!
//! ```ignore
//! use oextrace_core::api::{TraceConfig, Tracer};
//!
//! let tracer = Tracer::builder()
//!     .config(TraceConfig::default().with_storage_path("/data/oextrace.db"))
//!     .storage_key(keychain_key)
//!     .build()?;
//!
//! // Every foreground activation
//! tracer.purge_expired()?;
//!
//! // Every location fix
//! if let Some(report) = tracer.on_location(raw).await? {
//!     println!("{} new exposures", report.newly_exposed());
//! }
//! ```
//!
//! # Module Structure
//!
//! - [`error`] - Error types for the API layer
//! - [`config`] - Configuration types
//! - [`events`] - Event system for callbacks
//! - [`tracer`] - Main orchestrator

pub mod config;
pub mod error;
pub mod events;
pub mod tracer;

pub use config::TraceConfig;
pub use error::{TraceError, TraceResult};
pub use events::{CallbackHandler, EventDispatcher, EventHandler, TraceEvent};
pub use tracer::{Tracer, TracerBuilder};
