//! `taskclaim`: lease-based task claiming for agents over a shared Notion database.
//!
//! Each invocation is one short-lived command. The result is a single JSON
//! object on stdout; logs go to stderr (`RUST_LOG`, default `warn`).
//!
//! Exit codes: 0 ok, 2 CONFLICT, 3 MISCONFIGURED / NOT_FOUND / CLI_MISSING,
//! 4 LOST_LOCK, 5 API_ERROR, 6 INCOMPLETE_SUBTASKS.

mod config;
mod doctor;
mod notion;
mod output;

use std::process::ExitCode;

use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use taskclaim_core::app::{BlockReason, BuildError, NewTask, TaskUpdate};
use taskclaim_core::domain::{ClassOfService, LockToken, TaskId, TaskStatus, parse_timestamp};
use taskclaim_core::impls::FileClaimStateStore;
use taskclaim_core::{LockSource, TaskError, TaskService, TaskServiceBuilder};

use crate::config::{Config, ConfigError};
use crate::doctor::DoctorResponse;
use crate::notion::NotionCliStore;
use crate::output::{
    CommentResponse, ErrorResponse, ListResponse, TaskResponse, VersionResponse, render,
};

const EXIT_MISCONFIGURED: u8 = 3;
const EXIT_API_ERROR: u8 = 5;

#[derive(Parser)]
#[command(name = "taskclaim", version, about = "Claim and move tasks through their lifecycle")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Args)]
struct LockArgs {
    /// Verify this lock token instead of the local claim state
    #[arg(long = "lock-token")]
    lock_token: Option<String>,
}

impl LockArgs {
    fn source(self) -> LockSource {
        LockSource::from_option(self.lock_token.map(LockToken::new))
    }
}

#[derive(Subcommand)]
enum Command {
    /// Validate environment, credentials, and the notion client
    Doctor,

    /// Print version information
    Version,

    #[command(flatten)]
    Task(TaskCommand),
}

/// Commands that talk to the record store.
#[derive(Subcommand)]
enum TaskCommand {
    /// Show the task an agent should claim next
    Next,

    /// Claim a Ready task, or take over an In Progress task whose lease lapsed
    Claim {
        task_id: String,
        /// Lease length in minutes
        #[arg(long = "lease-min", value_parser = clap::value_parser!(u32).range(1..))]
        lease_min: Option<u32>,
    },

    /// Extend the lease on a claimed task
    Heartbeat {
        task_id: String,
        /// Extension in minutes
        #[arg(long = "extend-min", value_parser = clap::value_parser!(u32).range(1..))]
        extend_min: Option<u32>,
        #[command(flatten)]
        lock: LockArgs,
    },

    /// Submit a claimed task for review
    Review {
        task_id: String,
        #[arg(long)]
        summary: String,
        #[arg(long)]
        artifacts: Option<String>,
        #[command(flatten)]
        lock: LockArgs,
    },

    /// Approve a task in review
    Approve {
        task_id: String,
        #[arg(long)]
        summary: Option<String>,
    },

    /// Send a task in review back to In Progress
    Rework {
        task_id: String,
        #[arg(long)]
        reason: String,
    },

    /// Block a claimed task
    Block {
        task_id: String,
        #[arg(long)]
        reason: String,
        #[arg(long = "unblock-action")]
        unblock_action: String,
        /// RFC 3339 timestamp of the next check
        #[arg(long = "next-check", value_parser = parse_when)]
        next_check: Option<DateTime<Utc>>,
        #[command(flatten)]
        lock: LockArgs,
    },

    /// Return a blocked task to In Progress
    Unblock { task_id: String },

    /// Cancel a task
    Cancel {
        task_id: String,
        #[arg(long)]
        reason: String,
        #[command(flatten)]
        lock: LockArgs,
    },

    /// Mark a claimed task Done
    Complete {
        task_id: String,
        #[arg(long)]
        artifacts: String,
        #[command(flatten)]
        lock: LockArgs,
    },

    /// Create a task
    Create {
        #[arg(long)]
        title: String,
        #[arg(long, default_value_t = 5)]
        priority: i64,
        #[arg(long = "class", default_value = "Standard")]
        class_of_service: ClassOfService,
        #[arg(long, default_value = "Ready")]
        status: TaskStatus,
        /// Parent task id
        #[arg(long)]
        parent: Option<String>,
    },

    /// List tasks
    List {
        #[arg(long)]
        status: Option<TaskStatus>,
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Show one task
    Get { task_id: String },

    /// Add a comment to a task
    Comment {
        task_id: String,
        #[arg(long)]
        text: String,
    },

    /// Change priority, class or status outside the claim protocol
    Update {
        task_id: String,
        #[arg(long)]
        priority: Option<i64>,
        #[arg(long = "class")]
        class_of_service: Option<ClassOfService>,
        #[arg(long)]
        status: Option<TaskStatus>,
    },
}

fn parse_when(raw: &str) -> Result<DateTime<Utc>, String> {
    parse_timestamp(raw).ok_or_else(|| format!("'{raw}' is not an RFC 3339 timestamp"))
}

/// Rendered stdout plus process exit code.
struct Reply {
    body: String,
    exit_code: u8,
}

impl Reply {
    fn ok(value: &impl Serialize) -> Self {
        Self {
            body: render(value),
            exit_code: 0,
        }
    }

    fn failed(err: &anyhow::Error) -> Self {
        let (response, exit_code) = if let Some(e) = err.downcast_ref::<TaskError>() {
            (ErrorResponse::from(e), exit_u8(e.exit_code()))
        } else if err.is::<ConfigError>() || err.is::<BuildError>() {
            (ErrorResponse::new("MISCONFIGURED", format!("{err:#}")), EXIT_MISCONFIGURED)
        } else {
            (ErrorResponse::new("API_ERROR", format!("{err:#}")), EXIT_API_ERROR)
        };
        Self {
            body: render(&response),
            exit_code,
        }
    }
}

fn exit_u8(code: i32) -> u8 {
    u8::try_from(code).unwrap_or(EXIT_API_ERROR)
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn service(config: &Config) -> anyhow::Result<TaskService> {
    let store = config.store()?;
    let service = TaskServiceBuilder::new()
        .record_store(NotionCliStore::new(
            config.notion_bin.clone(),
            store.token,
            store.database_id,
        ))
        .claim_state(FileClaimStateStore::new(config.state_file.clone()))
        .config(config.service_config())
        .build()?;
    Ok(service)
}

async fn run(cmd: Command) -> anyhow::Result<Reply> {
    match cmd {
        Command::Version => Ok(Reply::ok(&VersionResponse {
            ok: true,
            version: env!("CARGO_PKG_VERSION"),
        })),
        Command::Doctor => {
            let config = Config::from_env()?;
            let response = DoctorResponse::from(doctor::run(&config).await);
            let exit_code = if response.ok { 0 } else { EXIT_MISCONFIGURED };
            Ok(Reply {
                body: render(&response),
                exit_code,
            })
        }
        Command::Task(cmd) => {
            let config = Config::from_env()?;
            execute(&service(&config)?, cmd).await
        }
    }
}

async fn execute(svc: &TaskService, cmd: TaskCommand) -> anyhow::Result<Reply> {
    let reply = match cmd {
        TaskCommand::Next => match svc.next().await? {
            Some(task) => Reply::ok(&TaskResponse::task(&task)),
            None => Reply::ok(&TaskResponse::empty("No ready tasks found")),
        },
        TaskCommand::Claim { task_id, lease_min } => {
            let claimed = svc.claim(&TaskId::new(task_id), lease_min).await?;
            let response = TaskResponse::task(&claimed.task);
            if claimed.reclaimed {
                Reply::ok(&response.with_message("Re-claimed task with a lapsed lease"))
            } else {
                Reply::ok(&response)
            }
        }
        TaskCommand::Heartbeat {
            task_id,
            extend_min,
            lock,
        } => {
            let task = svc
                .heartbeat(&TaskId::new(task_id), lock.source(), extend_min)
                .await?;
            Reply::ok(&TaskResponse::task(&task))
        }
        TaskCommand::Review {
            task_id,
            summary,
            artifacts,
            lock,
        } => {
            let task = svc
                .review(
                    &TaskId::new(task_id),
                    lock.source(),
                    &summary,
                    artifacts.as_deref(),
                )
                .await?;
            Reply::ok(&TaskResponse::task(&task))
        }
        TaskCommand::Approve { task_id, summary } => {
            let task = svc.approve(&TaskId::new(task_id), summary.as_deref()).await?;
            Reply::ok(&TaskResponse::task(&task))
        }
        TaskCommand::Rework { task_id, reason } => {
            let task = svc.rework(&TaskId::new(task_id), &reason).await?;
            Reply::ok(&TaskResponse::task(&task))
        }
        TaskCommand::Block {
            task_id,
            reason,
            unblock_action,
            next_check,
            lock,
        } => {
            let block = BlockReason {
                reason,
                unblock_action,
                next_check_at: next_check,
            };
            let task = svc
                .block(&TaskId::new(task_id), lock.source(), &block)
                .await?;
            Reply::ok(&TaskResponse::task(&task))
        }
        TaskCommand::Unblock { task_id } => {
            let task = svc.unblock(&TaskId::new(task_id)).await?;
            Reply::ok(&TaskResponse::task(&task))
        }
        TaskCommand::Cancel {
            task_id,
            reason,
            lock,
        } => {
            let outcome = svc
                .cancel(&TaskId::new(task_id), lock.source(), &reason)
                .await?;
            let response = TaskResponse::task(&outcome.task);
            if outcome.changed {
                Reply::ok(&response)
            } else {
                Reply::ok(&response.with_message(format!(
                    "Task is already {}",
                    outcome.task.status_label()
                )))
            }
        }
        TaskCommand::Complete {
            task_id,
            artifacts,
            lock,
        } => {
            let task = svc
                .complete(&TaskId::new(task_id), lock.source(), &artifacts)
                .await?;
            Reply::ok(&TaskResponse::task(&task))
        }
        TaskCommand::Create {
            title,
            priority,
            class_of_service,
            status,
            parent,
        } => {
            let new_task = NewTask {
                title,
                priority,
                class_of_service,
                status,
                parent: parent.map(TaskId::new),
            };
            let task = svc.create(&new_task).await?;
            Reply::ok(&TaskResponse::task(&task))
        }
        TaskCommand::List { status, limit } => {
            let tasks = svc.list(status, limit).await?;
            Reply::ok(&ListResponse::new(&tasks))
        }
        TaskCommand::Get { task_id } => {
            let task = svc.get(&TaskId::new(task_id)).await?;
            Reply::ok(&TaskResponse::task(&task))
        }
        TaskCommand::Comment { task_id, text } => {
            let task = svc.comment(&TaskId::new(task_id), &text).await?;
            Reply::ok(&CommentResponse {
                ok: true,
                task_id: task.display_id().to_string(),
                comment: text,
            })
        }
        TaskCommand::Update {
            task_id,
            priority,
            class_of_service,
            status,
        } => {
            let update = TaskUpdate {
                priority,
                class_of_service,
                status,
            };
            let task = svc.update(&TaskId::new(task_id), &update).await?;
            Reply::ok(&TaskResponse::task(&task))
        }
    };
    Ok(reply)
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    let cli = Cli::parse();
    let reply = match run(cli.cmd).await {
        Ok(reply) => reply,
        Err(err) => {
            tracing::debug!(error = ?err, "command failed");
            Reply::failed(&err)
        }
    };

    println!("{}", reply.body);
    ExitCode::from(reply.exit_code)
}
