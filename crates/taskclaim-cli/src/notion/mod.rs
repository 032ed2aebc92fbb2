//! RecordStore adapter over the `notion` command line client.
//!
//! Every call spawns the client with `NOTION_OUTPUT=json` and the token in its
//! environment:
//! - `db query <db> [--filter <json>] --all --results-only [--limit n]`
//! - `page get <id>`
//! - `page update <id> --properties <json>`
//! - `page create --parent <db> --properties <json>`
//! - `comment add <id> --text <text>`
//!
//! # 学習ポイント
//! - `tokio::process::Command` で子プロセスを await
//! - stderr は token を伏せてからエラーに載せる

pub mod page;

use async_trait::async_trait;
use tokio::process::Command;

use taskclaim_core::domain::{PropertyChanges, Record, RecordId};
use taskclaim_core::ports::{RecordFilter, RecordStore, StoreError, redact};

pub struct NotionCliStore {
    bin: String,
    token: String,
    database_id: String,
}

impl NotionCliStore {
    pub fn new(
        bin: impl Into<String>,
        token: impl Into<String>,
        database_id: impl Into<String>,
    ) -> Self {
        Self {
            bin: bin.into(),
            token: token.into(),
            database_id: database_id.into(),
        }
    }

    /// Output of `notion --version`.
    pub async fn version(&self) -> Result<String, StoreError> {
        let stdout = self.run(&["--version".to_string()]).await?;
        Ok(stdout.trim().to_string())
    }

    /// One-row query to confirm the database is reachable with this token.
    pub async fn check_access(&self) -> Result<(), StoreError> {
        let args = [
            "db".to_string(),
            "query".to_string(),
            self.database_id.clone(),
            "--limit".to_string(),
            "1".to_string(),
            "--results-only".to_string(),
        ];
        self.run(&args).await.map(|_| ())
    }

    #[tracing::instrument(skip(self, args), fields(bin = %self.bin))]
    async fn run(&self, args: &[String]) -> Result<String, StoreError> {
        let output = Command::new(&self.bin)
            .args(args)
            .env("NOTION_TOKEN", &self.token)
            .env("NOTION_OUTPUT", "json")
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => {
                    StoreError::ClientMissing(format!("{} binary not found in PATH", self.bin))
                }
                _ => StoreError::ClientMissing(format!("failed to run {}: {e}", self.bin)),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let message = redact(stderr.trim(), &self.token);
            tracing::warn!(status = %output.status, "notion command failed");
            return Err(StoreError::Api(format!(
                "{} {} failed: {message}",
                self.bin,
                args.iter().take(2).cloned().collect::<Vec<_>>().join(" ")
            )));
        }

        String::from_utf8(output.stdout)
            .map_err(|e| StoreError::Malformed(format!("non UTF-8 output: {e}")))
    }
}

#[async_trait]
impl RecordStore for NotionCliStore {
    async fn query(&self, filter: &RecordFilter) -> Result<Vec<Record>, StoreError> {
        let mut args = vec!["db".to_string(), "query".to_string(), self.database_id.clone()];
        if let Some(encoded) = page::encode_filter(filter)? {
            args.push("--filter".to_string());
            args.push(encoded.to_string());
        }
        args.push("--all".to_string());
        args.push("--results-only".to_string());
        if let Some(limit) = filter.limit {
            args.push("--limit".to_string());
            args.push(limit.to_string());
        }

        let mut records = page::decode_pages(&self.run(&args).await?)?;
        if let Some(limit) = filter.limit {
            records.truncate(limit);
        }
        tracing::debug!(count = records.len(), "query returned");
        Ok(records)
    }

    async fn get(&self, id: &RecordId) -> Result<Record, StoreError> {
        let args = ["page".to_string(), "get".to_string(), id.to_string()];
        page::decode_single(&self.run(&args).await?)
    }

    async fn update(&self, id: &RecordId, changes: &PropertyChanges) -> Result<(), StoreError> {
        let args = [
            "page".to_string(),
            "update".to_string(),
            id.to_string(),
            "--properties".to_string(),
            page::encode_properties(changes).to_string(),
        ];
        self.run(&args).await.map(|_| ())
    }

    async fn create(&self, properties: &PropertyChanges) -> Result<Record, StoreError> {
        let args = [
            "page".to_string(),
            "create".to_string(),
            "--parent".to_string(),
            self.database_id.clone(),
            "--properties".to_string(),
            page::encode_properties(properties).to_string(),
        ];
        page::decode_single(&self.run(&args).await?)
    }

    async fn add_comment(&self, id: &RecordId, text: &str) -> Result<(), StoreError> {
        let args = [
            "comment".to_string(),
            "add".to_string(),
            id.to_string(),
            "--text".to_string(),
            text.to_string(),
        ];
        self.run(&args).await.map(|_| ())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;
    use std::path::Path;
    use taskclaim_core::TaskServiceBuilder;
    use taskclaim_core::domain::{Field, TaskId, TaskStatus};
    use taskclaim_core::impls::InMemoryClaimStateStore;

    /// Writes an executable shell script standing in for the client.
    fn fake_client(dir: &Path, body: &str) -> String {
        let path = dir.join("notion");
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path.to_string_lossy().into_owned()
    }

    #[tokio::test]
    async fn missing_binary_is_client_missing() {
        let store = NotionCliStore::new("/nonexistent/notion-client", "secret", "db");
        let err = store.get(&RecordId::new("p1")).await.unwrap_err();
        assert!(matches!(err, StoreError::ClientMissing(_)));
    }

    #[tokio::test]
    async fn failure_output_is_redacted() {
        let dir = tempfile::tempdir().unwrap();
        let bin = fake_client(dir.path(), r#"echo "unauthorized token $NOTION_TOKEN" >&2; exit 1"#);
        let store = NotionCliStore::new(bin, "secret_abc123", "db");

        let err = store.get(&RecordId::new("p1")).await.unwrap_err();

        let message = match err {
            StoreError::Api(message) => message,
            other => panic!("expected Api error, got {other:?}"),
        };
        assert!(message.contains("[REDACTED]"));
        assert!(!message.contains("secret_abc123"));
    }

    #[tokio::test]
    async fn query_passes_filter_and_decodes() {
        let dir = tempfile::tempdir().unwrap();
        let bin = fake_client(
            dir.path(),
            r#"printf '%s\n' "$@" > "$(dirname "$0")/args"
echo '[{"id":"p1","properties":{"Status":{"type":"select","select":{"name":"Ready"}}}}]'"#,
        );
        let store = NotionCliStore::new(bin, "secret", "db-9");

        let records = store
            .query(&RecordFilter::by_status(TaskStatus::Ready).with_limit(5))
            .await
            .unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].text(Field::Status), Some("Ready"));

        let args = std::fs::read_to_string(dir.path().join("args")).unwrap();
        let args: Vec<&str> = args.lines().collect();
        assert_eq!(&args[..4], ["db", "query", "db-9", "--filter"]);
        assert_eq!(
            serde_json::from_str::<serde_json::Value>(args[4]).unwrap(),
            serde_json::json!({ "property": "Status", "select": { "equals": "Ready" } })
        );
        assert_eq!(&args[5..], ["--all", "--results-only", "--limit", "5"]);
    }

    #[tokio::test]
    async fn query_by_number_does_not_resolve_other_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let bin = fake_client(
            dir.path(),
            r#"echo '[{"id":"p42","properties":{"ID":{"type":"unique_id","unique_id":{"prefix":"TASK","number":42}},"Status":{"type":"select","select":{"name":"Ready"}}}}]'"#,
        );
        let service = TaskServiceBuilder::new()
            .record_store(NotionCliStore::new(bin, "secret", "db"))
            .claim_state(InMemoryClaimStateStore::new())
            .build()
            .unwrap();

        let err = service.get(&TaskId::new("BUG-42")).await.unwrap_err();
        assert_eq!(err.code(), "NOT_FOUND");

        let found = service.get(&TaskId::new("TASK-42")).await.unwrap();
        assert_eq!(found.record_id.as_str(), "p42");
    }
}
