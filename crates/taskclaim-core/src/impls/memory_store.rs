//! InMemoryRecordStore - 開発用・テスト用のレコードストア
//!
//! # 学習ポイント
//! - tokio::sync::Mutex による非同期排他
//! - `last_edited_time` はストア側が付与する（呼び出し側は触らない）
//! - 失敗注入（fail_updates / fail_comments）で「リモート書き込み失敗時にローカル状態を残す」を検証できる

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::ids::RecordId;
use crate::domain::lease::format_timestamp;
use crate::domain::property::{Field, PropertyChanges, PropertyValue, Record};
use crate::domain::status::TaskStatus;
use crate::ports::{Clock, RecordFilter, RecordStore, StoreError, SystemClock};

struct State {
    /// 挿入順を保持（query の結果順 = ストア順）
    records: Vec<Record>,
    comments: Vec<(RecordId, String)>,
    next_seq: u64,
    fail_updates: bool,
    fail_comments: bool,
}

impl State {
    fn find_mut(&mut self, id: &RecordId) -> Option<&mut Record> {
        self.records.iter_mut().find(|r| &r.id == id)
    }
}

fn matches_filter(record: &Record, filter: &RecordFilter) -> bool {
    if let Some(status) = filter.status
        && record.text(Field::Status).and_then(TaskStatus::parse) != Some(status)
    {
        return false;
    }
    if let Some(task_id) = &filter.task_id
        && record.text(Field::TaskId) != Some(task_id.as_str())
    {
        return false;
    }
    true
}

/// InMemoryRecordStore は開発用のストア
///
/// # 使用例
/// ```ignore
/// let store = InMemoryRecordStore::new(clock.clone());
/// store.insert(record).await;
/// let ready = store.query(&RecordFilter::by_status(TaskStatus::Ready)).await?;
/// ```
#[derive(Clone)]
pub struct InMemoryRecordStore {
    state: Arc<Mutex<State>>,
    clock: Arc<dyn Clock>,
    id_prefix: String,
}

impl InMemoryRecordStore {
    pub fn new(clock: impl Clock + 'static) -> Self {
        Self {
            state: Arc::new(Mutex::new(State {
                records: Vec::new(),
                comments: Vec::new(),
                next_seq: 1,
                fail_updates: false,
                fail_comments: false,
            })),
            clock: Arc::new(clock),
            id_prefix: "TASK".to_string(),
        }
    }

    /// Prefix used for the `ID` of created records (`TASK-1`, `TASK-2`, ...).
    pub fn with_id_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.id_prefix = prefix.into();
        self
    }

    /// Seeds a record as-is. Missing `last_edited_time` is stamped now.
    pub async fn insert(&self, mut record: Record) {
        if record.last_edited_time.is_none() {
            record.last_edited_time = Some(format_timestamp(self.clock.now()));
        }
        let mut state = self.state.lock().await;
        match state.find_mut(&record.id) {
            Some(existing) => *existing = record,
            None => state.records.push(record),
        }
    }

    /// Current stored copy, bypassing the port.
    pub async fn snapshot(&self, id: &RecordId) -> Option<Record> {
        let state = self.state.lock().await;
        state.records.iter().find(|r| &r.id == id).cloned()
    }

    pub async fn comments(&self, id: &RecordId) -> Vec<String> {
        let state = self.state.lock().await;
        state
            .comments
            .iter()
            .filter(|(rid, _)| rid == id)
            .map(|(_, text)| text.clone())
            .collect()
    }

    /// While set, every `update` fails without touching records.
    pub async fn fail_updates(&self, fail: bool) {
        self.state.lock().await.fail_updates = fail;
    }

    /// While set, every `add_comment` fails.
    pub async fn fail_comments(&self, fail: bool) {
        self.state.lock().await.fail_comments = fail;
    }
}

impl Default for InMemoryRecordStore {
    fn default() -> Self {
        Self::new(SystemClock)
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn query(&self, filter: &RecordFilter) -> Result<Vec<Record>, StoreError> {
        let state = self.state.lock().await;
        let matching = state.records.iter().filter(|r| matches_filter(r, filter)).cloned();
        Ok(match filter.limit {
            Some(limit) => matching.take(limit).collect(),
            None => matching.collect(),
        })
    }

    async fn get(&self, id: &RecordId) -> Result<Record, StoreError> {
        let state = self.state.lock().await;
        state
            .records
            .iter()
            .find(|r| &r.id == id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn update(&self, id: &RecordId, changes: &PropertyChanges) -> Result<(), StoreError> {
        let edited = format_timestamp(self.clock.now());
        let mut state = self.state.lock().await;
        if state.fail_updates {
            return Err(StoreError::Api(format!("update of {id} rejected")));
        }
        let record = state
            .find_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        record.apply(changes);
        record.last_edited_time = Some(edited);
        Ok(())
    }

    async fn create(&self, properties: &PropertyChanges) -> Result<Record, StoreError> {
        let edited = format_timestamp(self.clock.now());
        let mut state = self.state.lock().await;
        let seq = state.next_seq;
        state.next_seq += 1;

        let mut record = Record::new(RecordId::new(format!("record-{seq}"))).with(
            Field::TaskId,
            PropertyValue::Text(format!("{}-{seq}", self.id_prefix)),
        );
        record.apply(properties);
        record.last_edited_time = Some(edited);
        state.records.push(record.clone());
        Ok(record)
    }

    async fn add_comment(&self, id: &RecordId, text: &str) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        if state.fail_comments {
            return Err(StoreError::Api(format!("comment on {id} rejected")));
        }
        if state.find_mut(id).is_none() {
            return Err(StoreError::NotFound(id.to_string()));
        }
        state.comments.push((id.clone(), text.to_string()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::FixedClock;
    use chrono::{Duration, TimeZone, Utc};

    fn task(id: &str, status: &str) -> Record {
        Record::new(RecordId::new(format!("page-{id}")))
            .with(Field::TaskId, PropertyValue::Text(id.to_string()))
            .with(Field::Status, PropertyValue::Select(status.to_string()))
    }

    #[tokio::test]
    async fn query_filters_by_status_and_keeps_order() {
        let store = InMemoryRecordStore::default();
        store.insert(task("T-1", "Ready")).await;
        store.insert(task("T-2", "In Progress")).await;
        store.insert(task("T-3", "READY")).await;

        let ready = store
            .query(&RecordFilter::by_status(TaskStatus::Ready))
            .await
            .unwrap();
        let ids: Vec<_> = ready.iter().map(|r| r.text(Field::TaskId).unwrap()).collect();
        assert_eq!(ids, vec!["T-1", "T-3"]);
    }

    #[tokio::test]
    async fn update_stamps_last_edited_time() {
        let start = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
        let clock = FixedClock::new(start);
        let store = InMemoryRecordStore::new(clock.clone());
        store.insert(task("T-1", "Ready")).await;

        clock.advance(Duration::minutes(5));
        let id = RecordId::new("page-T-1");
        store
            .update(
                &id,
                &PropertyChanges::new().set(Field::Priority, PropertyValue::Number(9)),
            )
            .await
            .unwrap();

        let record = store.get(&id).await.unwrap();
        assert_eq!(record.number(Field::Priority), Some(9));
        assert_eq!(record.last_edited_time.as_deref(), Some("2025-03-01T12:05:00Z"));
    }

    #[tokio::test]
    async fn failed_update_leaves_record_untouched() {
        let store = InMemoryRecordStore::default();
        store.insert(task("T-1", "Ready")).await;
        store.fail_updates(true).await;

        let id = RecordId::new("page-T-1");
        let result = store
            .update(&id, &PropertyChanges::new().clear(Field::Status))
            .await;

        assert!(matches!(result, Err(StoreError::Api(_))));
        assert_eq!(
            store.get(&id).await.unwrap().text(Field::Status),
            Some("Ready")
        );
    }

    #[tokio::test]
    async fn create_assigns_ids() {
        let store = InMemoryRecordStore::default().with_id_prefix("OPS");
        let created = store
            .create(&PropertyChanges::new().set(Field::Title, PropertyValue::Text("x".into())))
            .await
            .unwrap();

        assert!(created.text(Field::TaskId).unwrap().starts_with("OPS-"));
        assert_eq!(store.get(&created.id).await.unwrap(), created);
    }

    #[tokio::test]
    async fn missing_records_are_not_found() {
        let store = InMemoryRecordStore::default();
        let err = store.get(&RecordId::new("nope")).await.unwrap_err();
        assert_eq!(err, StoreError::NotFound("nope".into()));
        assert!(store.add_comment(&RecordId::new("nope"), "hi").await.is_err());
    }
}
