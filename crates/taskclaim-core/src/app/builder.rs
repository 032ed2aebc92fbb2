//! TaskServiceBuilder - サービスの構築とワイヤリング
//!
//! # 学習ポイント
//! - Builder パターンの実装
//! - 起動時検証（Fail-fast 設計）
//! - 開発体験の改善（明確なエラーメッセージ）

use std::sync::Arc;

use crate::app::service::{ServiceConfig, TaskService};
use crate::ports::{ClaimStateStore, Clock, IdGenerator, RecordStore, SystemClock, UlidGenerator};

/// TaskServiceBuilder は TaskService を構築
///
/// # 使用例
/// ```ignore
/// let service = TaskServiceBuilder::new()
///     .record_store(store)
///     .claim_state(FileClaimStateStore::new(path))
///     .config(ServiceConfig { lease_minutes: 20, ..Default::default() })
///     .build()?;
/// ```
///
/// # Fail-fast 設計
/// - record store と claim state は必須
/// - 不足があれば build() が BuildError を返す
/// - clock / id generator / config は省略時に本番用のデフォルト
#[derive(Default)]
pub struct TaskServiceBuilder {
    store: Option<Arc<dyn RecordStore>>,
    claims: Option<Arc<dyn ClaimStateStore>>,
    clock: Option<Arc<dyn Clock>>,
    ids: Option<Arc<dyn IdGenerator>>,
    config: ServiceConfig,
}

/// BuildError はサービス構築時のエラー
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum BuildError {
    #[error("Missing components: {0:?}. These must be provided before build().")]
    MissingComponents(Vec<&'static str>),
}

impl TaskServiceBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_store(self, store: impl RecordStore + 'static) -> Self {
        self.shared_record_store(Arc::new(store))
    }

    /// Shares a store the caller keeps a handle to.
    pub fn shared_record_store(mut self, store: Arc<dyn RecordStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn claim_state(self, claims: impl ClaimStateStore + 'static) -> Self {
        self.shared_claim_state(Arc::new(claims))
    }

    pub fn shared_claim_state(mut self, claims: Arc<dyn ClaimStateStore>) -> Self {
        self.claims = Some(claims);
        self
    }

    pub fn clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Some(Arc::new(clock));
        self
    }

    pub fn id_generator(mut self, ids: impl IdGenerator + 'static) -> Self {
        self.ids = Some(Arc::new(ids));
        self
    }

    pub fn config(mut self, config: ServiceConfig) -> Self {
        self.config = config;
        self
    }

    /// TaskService を生成
    ///
    /// # 検証
    /// - record store / claim state が揃っているかチェック
    /// - 不足があれば BuildError::MissingComponents を返す
    pub fn build(self) -> Result<TaskService, BuildError> {
        let (store, claims) = match (self.store, self.claims) {
            (Some(store), Some(claims)) => (store, claims),
            (store, claims) => {
                let missing = [
                    store.is_none().then_some("record_store"),
                    claims.is_none().then_some("claim_state"),
                ]
                .into_iter()
                .flatten()
                .collect();
                return Err(BuildError::MissingComponents(missing));
            }
        };

        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let ids = self
            .ids
            .unwrap_or_else(|| Arc::new(UlidGenerator::new(clock.clone())));

        Ok(TaskService {
            store,
            claims,
            clock,
            ids,
            config: self.config,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::impls::{InMemoryClaimStateStore, InMemoryRecordStore};

    #[test]
    fn test_build_success() {
        let service = TaskServiceBuilder::new()
            .record_store(InMemoryRecordStore::default())
            .claim_state(InMemoryClaimStateStore::new())
            .build();
        assert!(service.is_ok());
    }

    #[test]
    fn test_build_missing_components() {
        let service = TaskServiceBuilder::new()
            .claim_state(InMemoryClaimStateStore::new())
            .build();
        assert!(matches!(
            service,
            Err(BuildError::MissingComponents(missing)) if missing == vec!["record_store"]
        ));

        let service = TaskServiceBuilder::new().build();
        assert!(matches!(
            service,
            Err(BuildError::MissingComponents(missing)) if missing.len() == 2
        ));
    }

    #[test]
    fn test_build_keeps_config() {
        let service = TaskServiceBuilder::new()
            .record_store(InMemoryRecordStore::default())
            .claim_state(InMemoryClaimStateStore::new())
            .config(ServiceConfig {
                lease_minutes: 20,
                ..ServiceConfig::default()
            })
            .build()
            .unwrap();
        assert_eq!(service.config().lease_minutes, 20);
        assert_eq!(service.config().heartbeat_minutes, 15);
    }
}
