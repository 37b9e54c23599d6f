//! In-process store with composite unique indexes.
//!
//! Each table sits behind one lock, so an index lookup and the write that
//! depends on it happen in the same critical section. The indexes play the
//! role of unique constraints in a relational backend.

use async_trait::async_trait;
use attendance_core::{
    AttendanceRecord, Error, Result, Session, SessionFilter, SessionState,
};
use chrono::{DateTime, NaiveDate, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use telemetry::metrics;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::repository::{AttendanceStore, MeetingKey, SessionSlot, SessionStore};

#[derive(Debug, Default)]
struct SessionTables {
    rows: HashMap<Uuid, StoredSession>,
    by_token: HashMap<String, Uuid>,
    /// Most recent session per slot.
    by_slot: HashMap<SessionSlot, Uuid>,
}

#[derive(Debug, Default)]
struct RecordTables {
    rows: HashMap<Uuid, StoredRecord>,
    /// (student_id, session_id, day)
    by_session: HashMap<(String, Uuid, NaiveDate), Uuid>,
    by_meeting: HashMap<MeetingKey, Uuid>,
}

/// A session with the campus day it was opened on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredSession {
    pub session: Session,
    pub day: NaiveDate,
}

/// A record with the campus day it belongs to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredRecord {
    pub record: AttendanceRecord,
    pub day: NaiveDate,
}

/// Serializable copy of the whole store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreSnapshot {
    pub sessions: Vec<StoredSession>,
    pub records: Vec<StoredRecord>,
}

/// In-memory implementation of both stores.
#[derive(Debug, Default)]
pub struct MemoryStore {
    sessions: RwLock<SessionTables>,
    records: RwLock<RecordTables>,
    /// Error of the most recent failed snapshot write, cleared on success.
    snapshot_error: RwLock<Option<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a store and its indexes from a snapshot.
    pub fn restore(snapshot: StoreSnapshot) -> Self {
        let store = Self::new();
        {
            let mut tables = store.sessions.write();
            let mut ordered = snapshot.sessions;
            ordered.sort_by_key(|s| s.session.created_at);
            for stored in ordered {
                let id = stored.session.id;
                tables.by_token.insert(stored.session.token.clone(), id);
                tables
                    .by_slot
                    .insert(SessionSlot::of(&stored.session, stored.day), id);
                tables.rows.insert(id, stored);
            }
        }
        {
            let mut tables = store.records.write();
            for stored in snapshot.records {
                let id = stored.record.id;
                tables.by_session.insert(
                    (
                        stored.record.student_id.clone(),
                        stored.record.session_id,
                        stored.day,
                    ),
                    id,
                );
                tables
                    .by_meeting
                    .entry(MeetingKey::of(&stored.record, stored.day))
                    .or_insert(id);
                tables.rows.insert(id, stored);
            }
        }
        store
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        StoreSnapshot {
            sessions: self.sessions.read().rows.values().cloned().collect(),
            records: self.records.read().rows.values().cloned().collect(),
        }
    }

    /// Load a snapshot file, or start empty when it does not exist.
    pub async fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        match tokio::fs::read(path).await {
            Ok(bytes) => {
                let snapshot: StoreSnapshot = serde_json::from_slice(&bytes)?;
                info!(
                    path = %path.display(),
                    sessions = snapshot.sessions.len(),
                    records = snapshot.records.len(),
                    "Restored store snapshot"
                );
                Ok(Self::restore(snapshot))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %path.display(), "No store snapshot, starting empty");
                Ok(Self::new())
            }
            Err(e) => Err(Error::storage(format!(
                "failed to read snapshot {}: {}",
                path.display(),
                e
            ))),
        }
    }

    /// Write the current contents to a snapshot file.
    ///
    /// The snapshot is written next to the target and renamed over it, so a
    /// crash mid-write never leaves a truncated file behind.
    pub async fn persist_to(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let result = self.write_snapshot(path).await;
        match &result {
            Ok(()) => {
                *self.snapshot_error.write() = None;
                debug!(path = %path.display(), "Persisted store snapshot");
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Snapshot write failed");
                *self.snapshot_error.write() = Some(e.to_string());
            }
        }
        result
    }

    async fn write_snapshot(&self, path: &Path) -> Result<()> {
        let bytes = serde_json::to_vec(&self.snapshot())?;
        let tmp = temp_path(path);
        tokio::fs::write(&tmp, bytes).await.map_err(|e| {
            Error::storage(format!("failed to write snapshot {}: {}", tmp.display(), e))
        })?;
        tokio::fs::rename(&tmp, path).await.map_err(|e| {
            Error::storage(format!("failed to replace snapshot {}: {}", path.display(), e))
        })
    }

    /// Error of the last snapshot write, if it failed.
    pub fn last_snapshot_error(&self) -> Option<String> {
        self.snapshot_error.read().clone()
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn insert_session(&self, session: Session, day: NaiveDate) -> Result<Session> {
        let slot = SessionSlot::of(&session, day);
        let mut tables = self.sessions.write();

        if let Some(occupant) = tables.by_slot.get(&slot).and_then(|id| tables.rows.get(id)) {
            if occupant.session.is_live_at(session.created_at) {
                metrics().store_write_conflicts.inc();
                return Err(Error::conflict(format!(
                    "session {} is already active for {} meeting {} today",
                    occupant.session.id, slot.course_id, slot.meeting_number
                )));
            }
        }
        if tables.by_token.contains_key(&session.token) {
            metrics().store_write_conflicts.inc();
            return Err(Error::conflict("scan token already issued"));
        }

        tables.by_token.insert(session.token.clone(), session.id);
        tables.by_slot.insert(slot, session.id);
        tables.rows.insert(
            session.id,
            StoredSession {
                session: session.clone(),
                day,
            },
        );
        metrics().store_writes.inc();
        Ok(session)
    }

    async fn get_session(&self, id: Uuid) -> Result<Option<Session>> {
        Ok(self.sessions.read().rows.get(&id).map(|s| s.session.clone()))
    }

    async fn find_by_token(&self, token: &str) -> Result<Option<Session>> {
        let tables = self.sessions.read();
        Ok(tables
            .by_token
            .get(token)
            .and_then(|id| tables.rows.get(id))
            .map(|s| s.session.clone()))
    }

    async fn rotate_token(&self, id: Uuid, token: String, now: DateTime<Utc>) -> Result<Session> {
        let mut tables = self.sessions.write();
        if tables.by_token.contains_key(&token) {
            metrics().store_write_conflicts.inc();
            return Err(Error::conflict("scan token already issued"));
        }

        let stored = tables
            .rows
            .get_mut(&id)
            .ok_or_else(|| Error::not_found(format!("session {}", id)))?;
        if !stored.session.is_live_at(now) {
            return Err(Error::expired(format!("session {} is closed or expired", id)));
        }
        let old_token = std::mem::replace(&mut stored.session.token, token.clone());
        let session = stored.session.clone();

        tables.by_token.remove(&old_token);
        tables.by_token.insert(token, id);
        metrics().store_writes.inc();
        Ok(session)
    }

    async fn close_session(&self, id: Uuid) -> Result<Session> {
        let mut tables = self.sessions.write();
        let stored = tables
            .rows
            .get_mut(&id)
            .ok_or_else(|| Error::not_found(format!("session {}", id)))?;
        if stored.session.state != SessionState::Closed {
            stored.session.state = SessionState::Closed;
            metrics().store_writes.inc();
        }
        Ok(stored.session.clone())
    }

    async fn list_sessions(&self, filter: &SessionFilter) -> Result<Vec<Session>> {
        let mut sessions: Vec<Session> = self
            .sessions
            .read()
            .rows
            .values()
            .filter(|s| filter.matches(&s.session))
            .map(|s| s.session.clone())
            .collect();
        sessions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(sessions)
    }

    /// Unhealthy while the most recent snapshot write has failed.
    fn is_healthy(&self) -> bool {
        self.snapshot_error.read().is_none()
    }
}

#[async_trait]
impl AttendanceStore for MemoryStore {
    async fn insert_record(
        &self,
        record: AttendanceRecord,
        day: NaiveDate,
    ) -> Result<AttendanceRecord> {
        let meeting = MeetingKey::of(&record, day);
        let session_key = (record.student_id.clone(), record.session_id, day);
        let mut tables = self.records.write();

        let existing = tables
            .by_meeting
            .get(&meeting)
            .or_else(|| tables.by_session.get(&session_key))
            .and_then(|id| tables.rows.get(id));
        if let Some(existing) = existing {
            metrics().store_write_conflicts.inc();
            return Err(Error::AlreadyCheckedIn {
                status: existing.record.status,
                meeting_number: existing.record.meeting_number,
            });
        }

        tables.by_meeting.insert(meeting, record.id);
        tables.by_session.insert(session_key, record.id);
        tables.rows.insert(
            record.id,
            StoredRecord {
                record: record.clone(),
                day,
            },
        );
        metrics().store_writes.inc();
        Ok(record)
    }

    async fn upsert_record(
        &self,
        record: AttendanceRecord,
        day: NaiveDate,
    ) -> Result<AttendanceRecord> {
        let session_key = (record.student_id.clone(), record.session_id, day);
        let mut tables = self.records.write();

        if let Some(id) = tables.by_session.get(&session_key).copied() {
            let stored = tables
                .rows
                .get_mut(&id)
                .ok_or_else(|| Error::internal(format!("dangling record index {}", id)))?;
            stored.record.status = record.status;
            stored.record.recorded_at = record.recorded_at;
            stored.record.source = record.source;
            metrics().store_writes.inc();
            return Ok(stored.record.clone());
        }

        tables
            .by_meeting
            .entry(MeetingKey::of(&record, day))
            .or_insert(record.id);
        tables.by_session.insert(session_key, record.id);
        tables.rows.insert(
            record.id,
            StoredRecord {
                record: record.clone(),
                day,
            },
        );
        metrics().store_writes.inc();
        Ok(record)
    }

    async fn records_for_session(&self, session_id: Uuid) -> Result<Vec<AttendanceRecord>> {
        let mut records: Vec<AttendanceRecord> = self
            .records
            .read()
            .rows
            .values()
            .filter(|s| s.record.session_id == session_id)
            .map(|s| s.record.clone())
            .collect();
        records.sort_by(|a, b| a.recorded_at.cmp(&b.recorded_at));
        Ok(records)
    }

    async fn records_for_student(
        &self,
        student_id: &str,
        course_id: Option<&str>,
    ) -> Result<Vec<AttendanceRecord>> {
        let mut records: Vec<AttendanceRecord> = self
            .records
            .read()
            .rows
            .values()
            .filter(|s| s.record.student_id == student_id)
            .filter(|s| course_id.map_or(true, |c| s.record.course_id == c))
            .map(|s| s.record.clone())
            .collect();
        records.sort_by(|a, b| b.recorded_at.cmp(&a.recorded_at));
        Ok(records)
    }

    async fn records_for_course(&self, course_id: &str) -> Result<Vec<AttendanceRecord>> {
        let mut records: Vec<AttendanceRecord> = self
            .records
            .read()
            .rows
            .values()
            .filter(|s| s.record.course_id == course_id)
            .map(|s| s.record.clone())
            .collect();
        records.sort_by(|a, b| a.recorded_at.cmp(&b.recorded_at));
        Ok(records)
    }
}
