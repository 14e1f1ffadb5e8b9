use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use super::models::{IssueKey, SessionRecord};

/// Process-lifetime map from issue to the last known session record.
///
/// Writes replace a whole record under the write lock, so readers never see
/// a partially updated record. New sessions replace whatever the issue
/// held; refreshes only land while their session is still the current one.
/// Nothing is persisted.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    inner: RwLock<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    records: HashMap<IssueKey, SessionRecord>,
    by_session: HashMap<String, IssueKey>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite the record for the record's own issue key.
    /// Returns the record it replaced, if any.
    pub fn put(&self, record: SessionRecord) -> Option<SessionRecord> {
        let key = record.key();
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);

        let previous = inner.records.insert(key.clone(), record.clone());
        if let Some(prev) = &previous {
            // The superseded session no longer resolves to this issue.
            if prev.session_id != record.session_id
                && inner.by_session.get(&prev.session_id) == Some(&key)
            {
                inner.by_session.remove(&prev.session_id);
            }
        }
        inner.by_session.insert(record.session_id, key);
        previous
    }

    /// Overwrite the record for its issue only while that issue still
    /// carries the same session id. Returns false, storing nothing, once a
    /// newer session has replaced it.
    pub fn update_if_current(&self, record: SessionRecord) -> bool {
        let key = record.key();
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        match inner.records.get_mut(&key) {
            Some(current) if current.session_id == record.session_id => {
                *current = record;
                true
            }
            _ => false,
        }
    }

    pub fn get(&self, key: &IssueKey) -> Option<SessionRecord> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.records.get(key).cloned()
    }

    /// Look a record up by the Devin session id it currently carries.
    pub fn find_by_session(&self, session_id: &str) -> Option<SessionRecord> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner
            .by_session
            .get(session_id)
            .and_then(|key| inner.records.get(key))
            .filter(|record| record.session_id == session_id)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .records
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
