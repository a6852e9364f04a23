//! Redis run queue
//!
//! Redis Streams with a consumer group carry approved run ids from the
//! gateway to worker processes. Delivery is at-least-once: workers XACK
//! after `execute_run` returns, and entries left pending by a dead worker
//! are reclaimed after an idle threshold. The orchestrator's re-entry guard
//! makes duplicate delivery harmless.

use lo_core::time;
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, RedisError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, instrument};

/// Stream entries carry one whole run to execute
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunJob {
    pub run_id: String,
    pub enqueued_at: i64,
}

impl RunJob {
    pub fn new(run_id: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            enqueued_at: time::now().timestamp_millis(),
        }
    }
}

/// Stream name for approved runs
pub const RUNS_QUEUE: &str = "runs";

/// Redis queue client
///
/// The client is designed to be shared across tasks without locks: the
/// underlying `MultiplexedConnection` is Clone and handles concurrency
/// internally.
#[derive(Clone)]
pub struct QueueClient {
    conn: MultiplexedConnection,
    prefix: String,
}

impl QueueClient {
    /// Create a new queue client
    pub async fn new(redis_url: &str, prefix: &str) -> Result<Self, RedisError> {
        let client = redis::Client::open(redis_url)?;
        let conn = client.get_multiplexed_async_connection().await?;
        Ok(Self {
            conn,
            prefix: prefix.to_string(),
        })
    }

    fn conn(&self) -> MultiplexedConnection {
        self.conn.clone()
    }

    fn stream_key(&self, queue: &str) -> String {
        format!("{}stream:{}", self.prefix, queue)
    }

    fn group_name(&self, queue: &str) -> String {
        format!("{queue}-workers")
    }

    /// Initialize a queue (create stream and consumer group)
    #[instrument(skip(self))]
    pub async fn init_queue(&self, queue: &str) -> Result<(), RedisError> {
        let key = self.stream_key(queue);
        let group = self.group_name(queue);
        let mut conn = self.conn();

        // MKSTREAM creates the stream if it doesn't exist
        let result: Result<(), RedisError> = redis::cmd("XGROUP")
            .arg("CREATE")
            .arg(&key)
            .arg(&group)
            .arg("$")
            .arg("MKSTREAM")
            .query_async(&mut conn)
            .await;

        // Ignore "BUSYGROUP Consumer Group name already exists"
        match result {
            Ok(()) => Ok(()),
            Err(e) if e.to_string().contains("BUSYGROUP") => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Enqueue a run job
    #[instrument(skip(self, job), fields(run_id = %job.run_id))]
    pub async fn enqueue(&self, queue: &str, job: &RunJob) -> Result<String, RedisError> {
        let key = self.stream_key(queue);
        let mut conn = self.conn();
        let payload = serde_json::to_string(job).map_err(|e| {
            RedisError::from((
                redis::ErrorKind::TypeError,
                "JSON serialization error",
                e.to_string(),
            ))
        })?;

        let id: String = redis::cmd("XADD")
            .arg(&key)
            .arg("*")
            .arg("data")
            .arg(payload)
            .query_async(&mut conn)
            .await?;

        debug!(queue = %queue, stream_id = %id, "Enqueued run job");
        Ok(id)
    }

    /// Dequeue jobs (read new entries via the consumer group)
    #[instrument(skip(self))]
    pub async fn dequeue(
        &self,
        queue: &str,
        consumer: &str,
        count: usize,
        block_ms: usize,
    ) -> Result<Vec<(String, RunJob)>, RedisError> {
        let key = self.stream_key(queue);
        let group = self.group_name(queue);
        let mut conn = self.conn();

        let result: redis::Value = redis::cmd("XREADGROUP")
            .arg("GROUP")
            .arg(&group)
            .arg(consumer)
            .arg("COUNT")
            .arg(count)
            .arg("BLOCK")
            .arg(block_ms)
            .arg("STREAMS")
            .arg(&key)
            .arg(">") // only entries never delivered to this group
            .query_async(&mut conn)
            .await?;

        // Response format: [[stream_name, [[id, [field, value, ...]], ...]]]
        let mut jobs = Vec::new();
        if let redis::Value::Array(streams) = result {
            for stream in streams {
                if let redis::Value::Array(mut parts) = stream {
                    if parts.len() >= 2 {
                        if let redis::Value::Array(entries) = parts.remove(1) {
                            jobs.extend(parse_entries(entries)?);
                        }
                    }
                }
            }
        }
        Ok(jobs)
    }

    /// Acknowledge a processed job (remove from the pending list)
    #[instrument(skip(self))]
    pub async fn ack(&self, queue: &str, stream_id: &str) -> Result<(), RedisError> {
        let key = self.stream_key(queue);
        let group = self.group_name(queue);
        let mut conn = self.conn();

        let _: i32 = redis::cmd("XACK")
            .arg(&key)
            .arg(&group)
            .arg(stream_id)
            .query_async(&mut conn)
            .await?;

        debug!(queue = %queue, stream_id = %stream_id, "Acknowledged run job");
        Ok(())
    }

    /// Claim pending jobs another consumer left unacknowledged
    #[instrument(skip(self))]
    pub async fn claim_pending(
        &self,
        queue: &str,
        consumer: &str,
        min_idle_ms: u64,
        count: usize,
    ) -> Result<Vec<(String, RunJob)>, RedisError> {
        let key = self.stream_key(queue);
        let group = self.group_name(queue);
        let mut conn = self.conn();

        let pending: Vec<(String, String, u64, u64)> = redis::cmd("XPENDING")
            .arg(&key)
            .arg(&group)
            .arg("-")
            .arg("+")
            .arg(count)
            .query_async(&mut conn)
            .await
            .unwrap_or_default();

        if pending.is_empty() {
            return Ok(vec![]);
        }

        let mut claimed = Vec::new();
        for (id, _owner, idle_time, _deliveries) in pending {
            if idle_time >= min_idle_ms {
                let result: redis::Value = redis::cmd("XCLAIM")
                    .arg(&key)
                    .arg(&group)
                    .arg(consumer)
                    .arg(min_idle_ms)
                    .arg(&id)
                    .query_async(&mut conn)
                    .await?;

                if let redis::Value::Array(entries) = result {
                    claimed.extend(parse_entries(entries)?);
                }
            }
        }

        Ok(claimed)
    }

    /// Queue length (approximate)
    #[instrument(skip(self))]
    pub async fn len(&self, queue: &str) -> Result<usize, RedisError> {
        let key = self.stream_key(queue);
        let mut conn = self.conn();
        let len: usize = conn.xlen(&key).await?;
        Ok(len)
    }
}

/// Parse `[id, [field, value, ...]]` stream entries into run jobs
fn parse_entries(entries: Vec<redis::Value>) -> Result<Vec<(String, RunJob)>, RedisError> {
    let mut jobs = Vec::new();
    for entry in entries {
        if let redis::Value::Array(mut entry_parts) = entry {
            if entry_parts.len() >= 2 {
                let id = match entry_parts.remove(0) {
                    redis::Value::BulkString(b) => String::from_utf8_lossy(&b).to_string(),
                    _ => continue,
                };

                if let redis::Value::Array(fields) = entry_parts.remove(0) {
                    let data = extract_data_field(&fields)?;
                    let job: RunJob = serde_json::from_str(&data).map_err(|e| {
                        RedisError::from((
                            redis::ErrorKind::TypeError,
                            "JSON parse error",
                            e.to_string(),
                        ))
                    })?;
                    jobs.push((id, job));
                }
            }
        }
    }
    Ok(jobs)
}

/// Extract the "data" field from a field/value array
fn extract_data_field(fields: &[redis::Value]) -> Result<String, RedisError> {
    let mut field_map: HashMap<String, String> = HashMap::new();
    let mut iter = fields.iter();

    while let (Some(key), Some(val)) = (iter.next(), iter.next()) {
        if let (redis::Value::BulkString(k), redis::Value::BulkString(v)) = (key, val) {
            field_map.insert(
                String::from_utf8_lossy(k).to_string(),
                String::from_utf8_lossy(v).to_string(),
            );
        }
    }

    field_map
        .remove("data")
        .ok_or_else(|| RedisError::from((redis::ErrorKind::TypeError, "Missing data field")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_job_round_trips() {
        let job = RunJob::new("run_01ABC");
        let text = serde_json::to_string(&job).unwrap();
        let parsed: RunJob = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed.run_id, "run_01ABC");
        assert_eq!(parsed.enqueued_at, job.enqueued_at);
    }

    #[test]
    fn test_parse_entries_extracts_jobs() {
        let payload = serde_json::to_string(&RunJob::new("run_42")).unwrap();
        let entries = vec![redis::Value::Array(vec![
            redis::Value::BulkString(b"1-0".to_vec()),
            redis::Value::Array(vec![
                redis::Value::BulkString(b"data".to_vec()),
                redis::Value::BulkString(payload.into_bytes()),
            ]),
        ])];

        let jobs = parse_entries(entries).unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].0, "1-0");
        assert_eq!(jobs[0].1.run_id, "run_42");
    }

    #[test]
    fn test_parse_entries_requires_data_field() {
        let entries = vec![redis::Value::Array(vec![
            redis::Value::BulkString(b"1-0".to_vec()),
            redis::Value::Array(vec![
                redis::Value::BulkString(b"other".to_vec()),
                redis::Value::BulkString(b"{}".to_vec()),
            ]),
        ])];

        assert!(parse_entries(entries).is_err());
    }
}
