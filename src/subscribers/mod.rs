//! # Event subscribers for the jobvisor runtime.
//!
//! This module provides the [`Subscribe`] trait, the [`SubscriberSet`]
//! fan-out, and the two built-in subscribers the supervisor registers at
//! init: structured logging and alert mail.
//!
//! ## Architecture
//! ```text
//! Event flow:
//!   Supervisor ── publish(Event) ──► SubscriberSet
//!                                        │
//!                              ┌─────────┼──────────┐
//!                              ▼         ▼          ▼
//!                          [queue]    [queue]    [queue]     (bounded, per subscriber)
//!                              │         │          │
//!                           worker    worker     worker      (panic isolated)
//!                              ▼         ▼          ▼
//!                          LogWriter  AlertMailer  custom Subscribe impls
//! ```
//!
//! ## Built-in subscribers
//! - [`LogWriter`] - every event becomes a `tracing` record.
//! - [`AlertMailer`] - alert-class events and the shutdown notice become
//!   SMTP mail; registered only when straps configure a relay.
//!
//! Custom subscribers implement [`Subscribe`] and are handed to the
//! supervisor at init.

mod log;
mod mailer;
mod set;
mod subscriber;

pub use log::LogWriter;
pub use mailer::{AlertMailer, MailError, MailSettings};
pub use set::SubscriberSet;
pub use subscriber::Subscribe;
