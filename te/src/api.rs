//! Request/response adapter
//!
//! Decodes JSON requests, runs them against a `TaskManager` and encodes the
//! outcome with an HTTP-style status code. One request per line in, one
//! response per line out.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, warn};

use crate::domain::{NewTask, TaskId, TaskPatch};
use crate::engine::{BatchUpdateItem, TaskQuery};
use crate::error::{ItemFailure, TaskError, TaskResult};
use crate::state::TaskManager;

pub const STATUS_OK: u16 = 200;
pub const STATUS_CREATED: u16 = 201;
pub const STATUS_NO_CONTENT: u16 = 204;
pub const STATUS_BAD_REQUEST: u16 = 400;
pub const STATUS_NOT_FOUND: u16 = 404;
pub const STATUS_CONFLICT: u16 = 409;
pub const STATUS_UNAVAILABLE: u16 = 503;

/// A decoded request, tagged by `op`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Request {
    Create {
        task: NewTask,
    },
    Get {
        id: TaskId,
    },
    List {
        #[serde(default)]
        query: TaskQuery,
    },
    Search {
        query: String,
    },
    Update {
        id: TaskId,
        patch: TaskPatch,
    },
    Delete {
        id: TaskId,
    },
    BatchCreate {
        tasks: Vec<NewTask>,
    },
    BatchUpdate {
        updates: Vec<BatchUpdateItem>,
    },
    BatchDelete {
        ids: Vec<TaskId>,
    },
    CompletionRate,
    AverageCompletionTime,
    PopularTags,
    StatusBreakdown,
    TopologicalOrder,
}

/// Status code plus JSON body
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Response {
    pub status: u16,
    pub body: Value,
}

impl Response {
    fn new(status: u16, body: impl Serialize) -> Self {
        let body = serde_json::to_value(body)
            .unwrap_or_else(|e| json!({ "error": "SerializationError", "message": e.to_string() }));
        Self { status, body }
    }

    fn ok(body: impl Serialize) -> Self {
        Self::new(STATUS_OK, body)
    }

    fn no_content() -> Self {
        Self {
            status: STATUS_NO_CONTENT,
            body: Value::Null,
        }
    }

    /// Map an engine error to its status code and error body
    pub fn from_error(err: &TaskError) -> Self {
        let mut body = json!({
            "error": err.kind(),
            "message": err.to_string(),
        });
        if let Some(details) = error_details(err) {
            body["details"] = details;
        }
        Self {
            status: status_for(err),
            body,
        }
    }

    /// A request line that could not be decoded
    pub fn malformed(message: impl std::fmt::Display) -> Self {
        Self {
            status: STATUS_BAD_REQUEST,
            body: json!({
                "error": "ValidationError",
                "message": format!("Invalid request: {message}"),
            }),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// HTTP-style status code for an engine error
pub fn status_for(err: &TaskError) -> u16 {
    match err {
        TaskError::Validation { .. }
        | TaskError::InvalidTransition { .. }
        | TaskError::CyclicDependency { .. }
        | TaskError::IncompleteDependencies { .. }
        | TaskError::HasDependents { .. }
        | TaskError::BatchRejected { .. } => STATUS_BAD_REQUEST,
        TaskError::NotFound(_) => STATUS_NOT_FOUND,
        TaskError::DuplicateId(_) => STATUS_CONFLICT,
        TaskError::ChannelError => STATUS_UNAVAILABLE,
    }
}

fn error_details(err: &TaskError) -> Option<Value> {
    match err {
        TaskError::Validation { details } => Some(json!(details)),
        TaskError::CyclicDependency { cycle, .. } => Some(json!(cycle)),
        TaskError::IncompleteDependencies { incomplete, .. } => Some(json!(incomplete)),
        TaskError::HasDependents { dependents, .. } => Some(json!(dependents)),
        TaskError::BatchRejected { failures } => Some(failures_json(failures)),
        _ => None,
    }
}

fn failures_json(failures: &[ItemFailure]) -> Value {
    failures
        .iter()
        .map(|f| {
            json!({
                "index": f.index,
                "id": f.id,
                "error": f.error.kind(),
                "message": f.error.to_string(),
            })
        })
        .collect()
}

fn respond<T>(result: TaskResult<T>, on_ok: impl FnOnce(T) -> Response) -> Response {
    match result {
        Ok(value) => on_ok(value),
        Err(err) => {
            debug!(kind = err.kind(), error = %err, "respond: request failed");
            Response::from_error(&err)
        }
    }
}

/// Execute one request
pub async fn handle(manager: &TaskManager, request: Request) -> Response {
    debug!(?request, "handle: called");
    match request {
        Request::Create { task } => respond(manager.create_task(task).await, |t| Response::new(STATUS_CREATED, t)),
        Request::Get { id } => respond(manager.get_task(id).await, Response::ok),
        Request::List { query } => respond(manager.list_tasks(query).await, Response::ok),
        Request::Search { query } => respond(manager.search_tasks(query).await, Response::ok),
        Request::Update { id, patch } => respond(manager.update_task(id, patch).await, Response::ok),
        Request::Delete { id } => respond(manager.delete_task(id).await, |_| Response::no_content()),
        Request::BatchCreate { tasks } => respond(manager.batch_create(tasks).await, |created| {
            Response::new(STATUS_CREATED, json!({ "tasks": created }))
        }),
        Request::BatchUpdate { updates } => respond(manager.batch_update(updates).await, |report| {
            Response::ok(json!({
                "succeeded": report.succeeded,
                "failed": failures_json(&report.failed),
            }))
        }),
        Request::BatchDelete { ids } => {
            respond(manager.batch_delete(ids).await, |deleted| Response::ok(json!({ "deleted": deleted })))
        }
        Request::CompletionRate => respond(manager.completion_rate().await, Response::ok),
        Request::AverageCompletionTime => respond(manager.average_completion_time().await, Response::ok),
        Request::PopularTags => respond(manager.popular_tags().await, Response::ok),
        Request::StatusBreakdown => respond(manager.status_breakdown().await, Response::ok),
        Request::TopologicalOrder => respond(manager.topological_order().await, Response::ok),
    }
}

/// Decode and execute one request line
pub async fn handle_line(manager: &TaskManager, line: &str) -> Response {
    match serde_json::from_str::<Request>(line) {
        Ok(request) => handle(manager, request).await,
        Err(e) => {
            warn!(error = %e, "handle_line: malformed request");
            Response::malformed(e)
        }
    }
}

/// Serve JSON-lines requests until the reader is exhausted
///
/// Blank lines are skipped and a line that is not UTF-8 gets a malformed
/// response. Returns the number of requests handled.
pub async fn run_lines<R, W>(manager: &TaskManager, mut reader: R, mut writer: W) -> eyre::Result<usize>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buf = Vec::new();
    let mut handled = 0;

    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf).await? == 0 {
            break;
        }

        let response = match std::str::from_utf8(&buf) {
            Ok(text) => {
                let line = text.trim();
                if line.is_empty() {
                    continue;
                }
                handle_line(manager, line).await
            }
            Err(e) => {
                warn!(error = %e, "run_lines: request is not valid UTF-8");
                Response::malformed(e)
            }
        };

        let mut encoded = serde_json::to_vec(&response)?;
        encoded.push(b'\n');
        writer.write_all(&encoded).await?;
        handled += 1;
    }

    writer.flush().await?;
    info!(handled, "run_lines: input exhausted");
    Ok(handled)
}
