//! claim / re-claim と heartbeat
//!
//! # claim アルゴリズム
//! 1. 新しい token と run id を生成
//! 2. `lock_expires = now + lease_minutes`
//! 3. 書き込み
//! 4. **読み直し**（CAS がないので、これが唯一のレース検出）
//! 5. `verify_claim`。負けていれば観測したレコード付きで Conflict
//! 6. 勝っていればローカル状態を保存

use crate::app::service::{LockSource, TaskService};
use crate::domain::claim::ClaimState;
use crate::domain::ids::TaskId;
use crate::domain::lease::{format_timestamp, lease_expiry};
use crate::domain::property::{AGENT_ASSIGNEE, Field, PropertyChanges, PropertyValue};
use crate::domain::record::TaskRecord;
use crate::domain::status::TaskStatus;
use crate::error::TaskError;
use crate::policy::lock::{LockVerdict, verify_claim, verify_lock};

/// Result of a successful claim.
#[derive(Debug, Clone)]
pub struct Claimed {
    /// Record as re-read after the write.
    pub task: TaskRecord,
    pub claim: ClaimState,
    /// True when an InProgress task with a lapsed lease was taken over.
    pub reclaimed: bool,
}

impl TaskService {
    /// Claims a Ready task, or re-claims an InProgress one whose lease lapsed.
    ///
    /// `lease_minutes` overrides the configured lease length.
    #[tracing::instrument(skip(self), fields(task_id = %task_id))]
    pub async fn claim(
        &self,
        task_id: &TaskId,
        lease_minutes: Option<u32>,
    ) -> Result<Claimed, TaskError> {
        let task = self.resolve(task_id).await?;
        let now = self.now();

        if task.is_held_by_human() {
            return Err(TaskError::conflict(
                format!("Task {} is held by a human operator", task.display_id()),
                &task,
            ));
        }

        let reclaimed = match task.status {
            Some(TaskStatus::Ready) | Some(TaskStatus::InProgress) if task.has_active_lease(now) => {
                return Err(TaskError::conflict(
                    "Task is already claimed with an active lock",
                    &task,
                ));
            }
            Some(TaskStatus::Ready) => false,
            Some(TaskStatus::InProgress) => true,
            _ => {
                return Err(TaskError::misconfigured_for(
                    format!(
                        "Task must be in Ready or In Progress status to claim (current: {})",
                        task.status_label()
                    ),
                    &task,
                ));
            }
        };

        let run_id = self.ids.generate_run_id();
        let lock_token = self.ids.generate_lock_token();
        let lock_expires = lease_expiry(now, lease_minutes.unwrap_or(self.config.lease_minutes));

        let mut changes = PropertyChanges::new()
            .set(Field::AgentRun, PropertyValue::Text(run_id.to_string()))
            .set(Field::LockToken, PropertyValue::Text(lock_token.to_string()))
            .set(Field::LockExpires, PropertyValue::Date(format_timestamp(lock_expires)))
            .set_opt(
                Field::Agent,
                self.config.agent_name.clone().map(PropertyValue::Select),
            );
        if !reclaimed {
            // re-claim keeps the first start time and assignee
            changes = changes
                .set(Field::Status, PropertyValue::Select(TaskStatus::InProgress.to_string()))
                .set(Field::ClaimedBy, PropertyValue::Select(AGENT_ASSIGNEE.to_string()))
                .set(Field::StartedAt, PropertyValue::Date(format_timestamp(now)));
        }

        self.store.update(&task.record_id, &changes).await?;

        let observed = self.reread(&task.record_id).await?;
        if verify_claim(&observed, &lock_token) != LockVerdict::Success {
            tracing::warn!(record_id = %task.record_id, "claim lost the race");
            return Err(TaskError::conflict("Task was claimed by another agent", &observed));
        }

        let claim = ClaimState {
            task_id: task_id.clone(),
            run_id,
            lock_token,
            lock_expires,
            record_id: task.record_id.clone(),
        };
        self.claims.save(&claim).await?;

        tracing::info!(
            run_id = %claim.run_id,
            lock_expires = %format_timestamp(lock_expires),
            reclaimed,
            "task claimed"
        );
        Ok(Claimed {
            task: observed,
            claim,
            reclaimed,
        })
    }

    /// Extends the lease. Only `Lock Expires` is written.
    ///
    /// `extend_minutes` overrides the configured heartbeat extension.
    #[tracing::instrument(skip(self, source), fields(task_id = %task_id))]
    pub async fn heartbeat(
        &self,
        task_id: &TaskId,
        source: LockSource,
        extend_minutes: Option<u32>,
    ) -> Result<TaskRecord, TaskError> {
        let task = self.resolve(task_id).await?;
        let token = self.require_lock(task_id, &task, &source, "heartbeat").await?;

        let now = self.now();
        let lock_expires = lease_expiry(
            now,
            extend_minutes.unwrap_or(self.config.heartbeat_minutes),
        );
        let changes = PropertyChanges::new()
            .set(Field::LockExpires, PropertyValue::Date(format_timestamp(lock_expires)));
        self.store.update(&task.record_id, &changes).await?;

        // the write may have raced a takeover; confirm the lease is still ours
        let observed = self.reread(&task.record_id).await?;
        if verify_lock(&observed, &token, now) != LockVerdict::Success {
            tracing::warn!(record_id = %task.record_id, "lease taken over during heartbeat");
            return Err(TaskError::lost_lock(
                "Lock token changed while extending the lease",
                &observed,
            ));
        }

        if let Some(state) = self.claims.load().await?
            && state.is_for(task_id)
            && state.lock_token == token
        {
            self.claims.save(&state.extended(lock_expires)).await?;
        }

        tracing::info!(lock_expires = %format_timestamp(lock_expires), "lease extended");
        Ok(observed)
    }
}
