//! `doctor`: environment, credentials and client checks.

use serde::Serialize;

use crate::config::{Config, DB_ID_VAR, TOKEN_VAR};
use crate::notion::NotionCliStore;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClientCheck {
    pub found: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Checks {
    pub notion_cli: ClientCheck,
    #[serde(rename = "env_NOTION_TOKEN")]
    pub env_notion_token: bool,
    #[serde(rename = "env_NOTION_TASKS_DB_ID")]
    pub env_notion_tasks_db_id: bool,
    /// Only checked when both variables are set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub db_accessible: Option<bool>,
}

impl Checks {
    /// Error code and message for the first failed check.
    ///
    /// Order: client, token, database id, database access.
    pub fn failure(&self) -> Option<(&'static str, String)> {
        if !self.notion_cli.found {
            return Some((
                "CLI_MISSING",
                "Environment check failed: notion client not found".to_string(),
            ));
        }
        let message = if !self.env_notion_token {
            format!("Environment check failed: {TOKEN_VAR} not configured")
        } else if !self.env_notion_tasks_db_id {
            format!("Environment check failed: {DB_ID_VAR} not configured")
        } else if self.db_accessible == Some(false) {
            "Environment check failed: database not accessible with the configured token"
                .to_string()
        } else {
            return None;
        };
        Some(("MISCONFIGURED", message))
    }
}

#[derive(Debug, Serialize)]
pub struct DoctorResponse {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<crate::output::ErrorPayload>,
    pub checks: Checks,
}

impl From<Checks> for DoctorResponse {
    fn from(checks: Checks) -> Self {
        let error = checks
            .failure()
            .map(|(code, message)| crate::output::ErrorPayload {
                code: code.to_string(),
                message,
            });
        Self {
            ok: error.is_none(),
            error,
            checks,
        }
    }
}

pub async fn run(config: &Config) -> Checks {
    let store = NotionCliStore::new(
        config.notion_bin.clone(),
        config.notion_token.clone().unwrap_or_default(),
        config.tasks_db_id.clone().unwrap_or_default(),
    );

    let notion_cli = match store.version().await {
        Ok(version) => ClientCheck {
            found: true,
            version: Some(version),
        },
        Err(e) => {
            tracing::warn!(error = %e, "notion client check failed");
            ClientCheck {
                found: false,
                version: None,
            }
        }
    };

    let env_notion_token = config.notion_token.is_some();
    let env_notion_tasks_db_id = config.tasks_db_id.is_some();
    let db_accessible = if env_notion_token && env_notion_tasks_db_id {
        let result = store.check_access().await;
        if let Err(e) = &result {
            tracing::warn!(error = %e, "database access check failed");
        }
        Some(result.is_ok())
    } else {
        None
    };

    Checks {
        notion_cli,
        env_notion_token,
        env_notion_tasks_db_id,
        db_accessible,
    }
}
