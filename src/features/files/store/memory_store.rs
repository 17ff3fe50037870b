use async_trait::async_trait;
use chrono::Utc;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};
use tokio::sync::RwLock;

use crate::features::files::models::{NewUploadRecord, RecordUpdate, UploadRecord, UploadState};
use crate::features::files::store::{
    unique_ids, RecordFilter, SortDirection, SortField, StateCounts, StoreError, StoreResult,
    UploadRecordStore,
};

#[derive(Default)]
struct MemoryState {
    last_id: i64,
    records: BTreeMap<i64, UploadRecord>,
    keys: HashSet<String>,
}

/// Process-local store; every mutation happens under one write lock
#[derive(Default)]
pub struct MemoryUploadRecordStore {
    state: RwLock<MemoryState>,
}

impl MemoryUploadRecordStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn matches(record: &UploadRecord, filter: &RecordFilter) -> bool {
    if let Some(state) = filter.state {
        if record.state != state {
            return false;
        }
    }
    match filter.original_name.as_deref() {
        Some(name) => record
            .original_name
            .to_lowercase()
            .contains(&name.to_lowercase()),
        None => true,
    }
}

fn compare(a: &UploadRecord, b: &UploadRecord, field: SortField) -> Ordering {
    match field {
        SortField::CreatedAt => a.created_at.cmp(&b.created_at),
        SortField::UpdatedAt => a.updated_at.cmp(&b.updated_at),
        SortField::FileSize => a.declared_size.cmp(&b.declared_size),
        SortField::OriginalName => a.original_name.cmp(&b.original_name),
    }
}

#[async_trait]
impl UploadRecordStore for MemoryUploadRecordStore {
    async fn create(&self, record: NewUploadRecord) -> StoreResult<UploadRecord> {
        let mut state = self.state.write().await;

        if state.keys.contains(&record.storage_key) {
            return Err(StoreError::DuplicateKey(record.storage_key));
        }

        state.last_id += 1;
        let now = Utc::now();
        let stored = UploadRecord {
            id: state.last_id,
            original_name: record.original_name,
            storage_key: record.storage_key,
            declared_size: record.declared_size,
            actual_size: None,
            content_type: record.content_type,
            extension: record.extension,
            access_url: None,
            state: UploadState::Pending,
            etag: None,
            error_message: None,
            note: record.note,
            created_at: now,
            updated_at: now,
        };

        state.keys.insert(stored.storage_key.clone());
        state.records.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn get(&self, id: i64) -> StoreResult<UploadRecord> {
        self.state
            .read()
            .await
            .records
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound(id))
    }

    async fn update(&self, id: i64, update: RecordUpdate) -> StoreResult<UploadRecord> {
        let mut state = self.state.write().await;
        let record = state.records.get_mut(&id).ok_or(StoreError::NotFound(id))?;

        if record.state.is_terminal() {
            return Err(StoreError::InvalidTransition {
                id,
                state: record.state,
            });
        }

        update.apply(record, Utc::now());
        Ok(record.clone())
    }

    async fn list(
        &self,
        filter: &RecordFilter,
        offset: i64,
        limit: i64,
    ) -> StoreResult<(Vec<UploadRecord>, i64)> {
        let state = self.state.read().await;

        let mut matched: Vec<&UploadRecord> = state
            .records
            .values()
            .filter(|record| matches(record, filter))
            .collect();

        matched.sort_by(|a, b| {
            let ordering = compare(a, b, filter.sort_by).then(a.id.cmp(&b.id));
            match filter.sort_dir {
                SortDirection::Asc => ordering,
                SortDirection::Desc => ordering.reverse(),
            }
        });

        let total = matched.len() as i64;
        let page = matched
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .cloned()
            .collect();

        Ok((page, total))
    }

    async fn count_by_state(&self) -> StoreResult<StateCounts> {
        let state = self.state.read().await;
        let mut counts = StateCounts::default();
        for record in state.records.values() {
            counts.add(record.state, 1);
        }
        Ok(counts)
    }

    async fn delete(&self, id: i64) -> StoreResult<()> {
        let mut state = self.state.write().await;
        let removed = state.records.remove(&id).ok_or(StoreError::NotFound(id))?;
        state.keys.remove(&removed.storage_key);
        Ok(())
    }

    async fn delete_many(&self, ids: &[i64]) -> StoreResult<u64> {
        let ids = unique_ids(ids);
        let mut state = self.state.write().await;

        let missing: Vec<i64> = ids
            .iter()
            .copied()
            .filter(|id| !state.records.contains_key(id))
            .collect();
        if !missing.is_empty() {
            return Err(StoreError::MissingIds(missing));
        }

        for id in &ids {
            if let Some(removed) = state.records.remove(id) {
                state.keys.remove(&removed.storage_key);
            }
        }
        Ok(ids.len() as u64)
    }
}
