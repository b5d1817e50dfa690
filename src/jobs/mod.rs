//! # Job abstractions.
//!
//! This module provides the core job-related types:
//! - [`Job`] - trait for implementing async cancelable jobs
//! - [`JobFn`] - function-based job implementation
//! - [`JobRef`] - shared reference to a job (`Arc<dyn Job>`)
//! - [`ConfigSource`] - where a job's straps are loaded from

mod job;
mod job_fn;

pub use job::{ConfigSource, Job};
pub use job_fn::{JobFn, JobRef};
