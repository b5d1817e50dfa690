//! # Run history records.
//!
//! Each supervised run can leave an audit trail in the document store: one
//! [`JobRecord`] per run, opened by [`record_start`], annotated with
//! [`add_detail`], and sealed by [`record_end`]. [`prune_old`] removes
//! records past their keep window, but only during the nightly maintenance
//! slot so a fleet of machines does not hammer the collection all day.
//!
//! ## Rules
//! - One collection, named by [`RECORDS_COLLECTION`], for both writes and
//!   pruning. Field names are fixed by the serde tags on [`JobRecord`].
//! - Every helper acquires a session handle for the duration of the call
//!   and releases it before returning, success or failure.
//! - Pruning outside the maintenance window is a no-op that reports zero
//!   removals.

use mongodb::bson::oid::ObjectId;
use mongodb::bson::{doc, DateTime, Document};
use serde::{Deserialize, Serialize};

use crate::sessions::{SessionError, SessionPool};

/// Collection holding one document per supervised run.
pub const RECORDS_COLLECTION: &str = "job_records";

/// Days a record survives before the nightly prune removes it.
pub const RECORD_KEEP_DAYS: i64 = 3;

/// Start of the daily maintenance slot, minutes after 00:00 UTC.
const PRUNE_WINDOW_MINUTES: u32 = 15;

/// One timestamped annotation inside a [`JobRecord`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobDetail {
    /// Sub-task that produced the annotation.
    pub task: String,
    /// When the annotation was written.
    pub date: DateTime,
    /// Free-form description.
    pub details: String,
}

/// Audit document for one supervised run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    /// Job name as reported to the supervisor.
    pub job: String,
    pub start_date: DateTime,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<DateTime>,
    /// Final outcome label, set by [`record_end`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    pub details: Vec<JobDetail>,
}

impl JobRecord {
    fn open(job: &str) -> Self {
        Self {
            id: ObjectId::new(),
            job: job.to_string(),
            start_date: DateTime::now(),
            end_date: None,
            result: None,
            details: Vec::new(),
        }
    }
}

/// Inserts a fresh record for a starting run and returns it.
///
/// The returned record's id is what the other helpers key on.
pub async fn record_start(
    caller: &str,
    sessions: &SessionPool,
    session: &str,
    job: &str,
) -> Result<JobRecord, SessionError> {
    let handle = sessions.acquire(caller, session).await?;
    let record = JobRecord::open(job);
    let outcome = handle
        .database()
        .collection::<JobRecord>(RECORDS_COLLECTION)
        .insert_one(&record)
        .await;
    sessions.release(caller, handle).await;

    outcome?;
    tracing::debug!(caller, job, id = %record.id, "job record opened");
    Ok(record)
}

/// Appends a timestamped detail line to an open record.
///
/// The push upserts: when the record id is not in the store the update
/// creates the document instead of silently dropping the annotation.
pub async fn add_detail(
    caller: &str,
    sessions: &SessionPool,
    session: &str,
    record: &JobRecord,
    task: &str,
    details: &str,
) -> Result<(), SessionError> {
    let handle = sessions.acquire(caller, session).await?;
    let detail = JobDetail {
        task: task.to_string(),
        date: DateTime::now(),
        details: details.to_string(),
    };
    let outcome = match detail_push(&detail) {
        Ok(update) => {
            handle
                .database()
                .collection::<JobRecord>(RECORDS_COLLECTION)
                .update_one(doc! { "_id": record.id }, update)
                .upsert(true)
                .await
        }
        Err(err) => Err(err),
    };
    sessions.release(caller, handle).await;

    outcome?;
    Ok(())
}

/// `$push` update appending one detail to the record's array.
fn detail_push(detail: &JobDetail) -> Result<Document, mongodb::error::Error> {
    let entry = mongodb::bson::to_bson(detail)?;
    Ok(doc! { "$push": { "details": entry } })
}

/// Seals a record with its end time and outcome label.
pub async fn record_end(
    caller: &str,
    sessions: &SessionPool,
    session: &str,
    record: &JobRecord,
    result: &str,
) -> Result<(), SessionError> {
    let handle = sessions.acquire(caller, session).await?;
    let outcome = handle
        .database()
        .collection::<JobRecord>(RECORDS_COLLECTION)
        .update_one(
            doc! { "_id": record.id },
            doc! { "$set": { "end_date": DateTime::now(), "result": result } },
        )
        .await;
    sessions.release(caller, handle).await;

    outcome?;
    tracing::debug!(caller, id = %record.id, result, "job record sealed");
    Ok(())
}

/// Removes records older than [`RECORD_KEEP_DAYS`] days.
///
/// Runs only inside the nightly window (see [`should_prune`]); outside it
/// the call returns `Ok(0)` without touching the store.
pub async fn prune_old(
    caller: &str,
    sessions: &SessionPool,
    session: &str,
) -> Result<u64, SessionError> {
    let now = chrono::Utc::now();
    if !should_prune(&now) {
        return Ok(0);
    }

    let cutoff = prune_cutoff(&now);
    let handle = sessions.acquire(caller, session).await?;
    let outcome = handle
        .database()
        .collection::<JobRecord>(RECORDS_COLLECTION)
        .delete_many(doc! { "start_date": { "$lt": cutoff } })
        .await;
    sessions.release(caller, handle).await;

    let removed = outcome?.deleted_count;
    tracing::debug!(caller, removed, "job records pruned");
    Ok(removed)
}

/// True inside the daily maintenance slot: 00:00 to 00:15 UTC inclusive.
pub fn should_prune(now: &chrono::DateTime<chrono::Utc>) -> bool {
    use chrono::Timelike;
    now.hour() == 0 && now.minute() <= PRUNE_WINDOW_MINUTES
}

/// Oldest start date a record may carry and survive the prune.
fn prune_cutoff(now: &chrono::DateTime<chrono::Utc>) -> DateTime {
    let keep_ms = RECORD_KEEP_DAYS * 24 * 60 * 60 * 1000;
    DateTime::from_millis(now.timestamp_millis() - keep_ms)
}
