use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Serialize;
use sqlx::SqlitePool;
use std::collections::HashSet;
use thiserror::Error;
use uuid::Uuid;

use crate::services::llm::LlmClient;
use crate::services::tasks::{self, TaskError, TaskFilter};
use shared::{AssistantReply, AssistantRequest, DiffAction, Task, TaskDiff, TaskStatus};

/// Days of tasks given to the model when the request names no window
const DEFAULT_WINDOW_DAYS: i64 = 7;

#[derive(Debug, Error)]
pub enum AssistantError {
    #[error("Message cannot be empty")]
    EmptyMessage,
    #[error("Invalid date range")]
    InvalidRange,
    #[error("Language model request failed: {0}")]
    Llm(anyhow::Error),
    #[error("Language model returned an unusable response: {0}")]
    InvalidResponse(String),
    #[error(transparent)]
    Tasks(#[from] TaskError),
}

/// Task fields the model gets to see
#[derive(Debug, Serialize)]
struct TaskContext<'a> {
    id: Uuid,
    title: &'a str,
    description: Option<&'a str>,
    status: TaskStatus,
    estimated_pomodoros: i32,
    start_at: Option<DateTime<Utc>>,
    end_at: Option<DateTime<Utc>>,
    is_recurring: bool,
}

fn build_system_prompt(tasks: &[Task], today: NaiveDate) -> Result<String, AssistantError> {
    let context: Vec<TaskContext> = tasks
        .iter()
        .map(|t| TaskContext {
            id: t.id,
            title: &t.title,
            description: t.description.as_deref(),
            status: t.status,
            estimated_pomodoros: t.estimated_pomodoros,
            start_at: t.start_at,
            end_at: t.end_at,
            is_recurring: t.is_recurring,
        })
        .collect();
    let tasks_json = serde_json::to_string(&context)
        .map_err(|e| AssistantError::InvalidResponse(e.to_string()))?;

    Ok(format!(
        "You help the user organize their tasks and focus time. Today is {today}.\n\
         The user's current tasks as JSON:\n{tasks_json}\n\n\
         Answer with a single JSON object and nothing else:\n\
         {{\"tasks\": [{{\"action\": \"create\" | \"update\" | \"delete\", \"id\": \"<task id, required for update and delete>\", \
         \"title\": \"...\", \"description\": \"...\", \"status\": \"PENDING\" | \"IN_PROGRESS\" | \"COMPLETED\", \
         \"estimated_pomodoros\": 1, \"start_at\": \"RFC 3339\", \"end_at\": \"RFC 3339\"}}], \
         \"advice\": \"short advice for the user\"}}\n\
         Only include fields that change. Use an empty tasks list when nothing should change."
    ))
}

/// Remove a surrounding Markdown code fence, if any
fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Skip the info string ("json") on the opening line
    let body = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest,
    };
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

pub fn parse_reply(text: &str) -> Result<AssistantReply, AssistantError> {
    serde_json::from_str(strip_code_fences(text))
        .map_err(|e| AssistantError::InvalidResponse(e.to_string()))
}

/// Keep only diffs that can be applied by this user: creates need a title,
/// updates and deletes need the id of one of the user's tasks.
fn retain_applicable(diffs: Vec<TaskDiff>, owned: &HashSet<Uuid>) -> Vec<TaskDiff> {
    diffs
        .into_iter()
        .filter_map(|mut diff| match diff.action {
            DiffAction::Create => {
                diff.id = None;
                diff.title
                    .as_deref()
                    .is_some_and(|t| !t.trim().is_empty())
                    .then_some(diff)
            }
            DiffAction::Update | DiffAction::Delete => {
                diff.id.is_some_and(|id| owned.contains(&id)).then_some(diff)
            }
        })
        .collect()
}

/// Ask the model for task changes. The proposed diffs are returned to the
/// caller and never applied here.
pub async fn propose_changes(
    pool: &SqlitePool,
    llm: &dyn LlmClient,
    user_id: &str,
    request: &AssistantRequest,
    today: NaiveDate,
) -> Result<AssistantReply, AssistantError> {
    let message = request.message.trim();
    if message.is_empty() {
        return Err(AssistantError::EmptyMessage);
    }

    let from = request.from.unwrap_or(today);
    let to = request
        .to
        .unwrap_or(from + Duration::days(DEFAULT_WINDOW_DAYS));
    if to < from {
        return Err(AssistantError::InvalidRange);
    }
    let after_end = to.succ_opt().ok_or(AssistantError::InvalidRange)?;

    let filter = TaskFilter {
        from: Some(from.and_time(chrono::NaiveTime::MIN).and_utc()),
        to: Some(after_end.and_time(chrono::NaiveTime::MIN).and_utc()),
        list_id: None,
    };
    let window_tasks = tasks::list_tasks(pool, user_id, &filter).await?;

    let system_prompt = build_system_prompt(&window_tasks, today)?;
    let raw = llm
        .complete(&system_prompt, &request.history, message)
        .await
        .map_err(|e| {
            log::error!("LLM request failed: {:#}", e);
            AssistantError::Llm(e)
        })?;

    let reply = parse_reply(&raw).inspect_err(|e| {
        log::warn!("Discarding assistant response: {}", e);
    })?;

    let referenced: Vec<Uuid> = reply.tasks.iter().filter_map(|d| d.id).collect();
    let owned: HashSet<Uuid> = tasks::get_tasks_by_ids(pool, user_id, &referenced)
        .await?
        .into_iter()
        .map(|t| t.id)
        .collect();

    let proposed = reply.tasks.len();
    let tasks = retain_applicable(reply.tasks, &owned);
    if tasks.len() < proposed {
        log::info!(
            "Dropped {} inapplicable assistant diff(s) for user {}",
            proposed - tasks.len(),
            user_id
        );
    }

    Ok(AssistantReply {
        tasks,
        advice: reply.advice,
    })
}
