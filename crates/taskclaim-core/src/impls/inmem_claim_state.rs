//! InMemoryClaimStateStore - テスト用の claim 状態

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::claim::ClaimState;
use crate::ports::{ClaimStateError, ClaimStateStore};

/// Clones share the same slot.
#[derive(Clone, Default)]
pub struct InMemoryClaimStateStore {
    slot: Arc<Mutex<Option<ClaimState>>>,
}

impl InMemoryClaimStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state(state: ClaimState) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Some(state))),
        }
    }
}

#[async_trait]
impl ClaimStateStore for InMemoryClaimStateStore {
    async fn load(&self) -> Result<Option<ClaimState>, ClaimStateError> {
        Ok(self.slot.lock().await.clone())
    }

    async fn save(&self, state: &ClaimState) -> Result<(), ClaimStateError> {
        *self.slot.lock().await = Some(state.clone());
        Ok(())
    }

    async fn clear(&self) -> Result<(), ClaimStateError> {
        self.slot.lock().await.take();
        Ok(())
    }
}
