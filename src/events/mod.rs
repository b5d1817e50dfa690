//! Runtime events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to
//! publish/observe lifecycle events emitted by the supervisor.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publisher**: `Supervisor` (race outcomes, job lifecycle, teardown).
//! - **Consumers**: registered subscribers (fed directly via
//!   `SubscriberSet`) and any embedder tap obtained from [`Bus::subscribe`].
//!
//! See `core/mod.rs` for the system-level wiring diagram.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
