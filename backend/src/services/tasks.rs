use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::collections::HashMap;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{SubtaskRow, TaskRow};
use crate::services::categories::category_exists;
use crate::services::recurrence::{self, RecurrenceError};
use crate::services::task_lists::list_exists;
use shared::{
    CreateSubtaskRequest, CreateTaskRequest, Subtask, Task, TaskStatus, UpdateTaskRequest,
};

#[derive(Debug, Error)]
pub enum TaskError {
    #[error("Task not found")]
    NotFound,
    #[error("Task list not found")]
    ListNotFound,
    #[error("Category not found")]
    CategoryNotFound,
    #[error("Subtask not found")]
    SubtaskNotFound,
    #[error("Task title cannot be empty")]
    EmptyTitle,
    #[error("Task end must not be before its start")]
    InvalidTimeRange,
    #[error("Estimated pomodoros cannot be negative")]
    InvalidEstimate,
    #[error("Invalid recurrence: {0}")]
    InvalidRecurrence(#[from] RecurrenceError),
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

/// Optional filters for listing tasks
#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub list_id: Option<Uuid>,
}

fn validate_time_range(
    start_at: Option<DateTime<Utc>>,
    end_at: Option<DateTime<Utc>>,
) -> Result<(), TaskError> {
    if let (Some(start), Some(end)) = (start_at, end_at) {
        if end < start {
            return Err(TaskError::InvalidTimeRange);
        }
    }
    Ok(())
}

/// Create a task, materializing every occurrence of its recurrence.
///
/// All validation happens before the first write. Occurrences are inserted
/// in order inside one transaction: the first becomes the series parent and
/// every later occurrence points back at it. Returns the parent.
pub async fn create_task(
    pool: &SqlitePool,
    user_id: &str,
    request: &CreateTaskRequest,
) -> Result<Task, TaskError> {
    let title = request.title.trim();
    if title.is_empty() {
        return Err(TaskError::EmptyTitle);
    }
    if request.estimated_pomodoros < 0 {
        return Err(TaskError::InvalidEstimate);
    }
    validate_time_range(request.start_at, request.end_at)?;

    if !list_exists(pool, user_id, &request.list_id).await? {
        return Err(TaskError::ListNotFound);
    }
    if let Some(ref category_id) = request.category_id {
        if !category_exists(pool, user_id, category_id).await? {
            return Err(TaskError::CategoryNotFound);
        }
    }

    let occurrences = recurrence::plan_occurrences(request)?;
    let is_recurring = request.is_recurring || request.recurrence.is_some();
    let status = request.status.unwrap_or(TaskStatus::Pending);
    let now = Utc::now();

    let mut tx = pool.begin().await?;
    let mut parent: Option<Task> = None;

    for occurrence in &occurrences {
        let id = Uuid::new_v4();
        let parent_id = parent.as_ref().map(|p| p.id);

        sqlx::query(
            r#"
            INSERT INTO tasks (id, user_id, list_id, title, description, status, category_id, estimated_pomodoros, start_at, end_at, all_day, is_recurring, recurrence_parent_id, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(id.to_string())
        .bind(user_id)
        .bind(request.list_id.to_string())
        .bind(title)
        .bind(&request.description)
        .bind(status.as_str())
        .bind(request.category_id.map(|c| c.to_string()))
        .bind(request.estimated_pomodoros)
        .bind(occurrence.start_at)
        .bind(occurrence.end_at)
        .bind(request.all_day)
        .bind(is_recurring)
        .bind(parent_id.map(|p| p.to_string()))
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        let mut subtasks = Vec::with_capacity(request.subtasks.len());
        for (index, subtask_title) in request.subtasks.iter().enumerate() {
            let subtask_id = Uuid::new_v4();
            let sort_order = index as i32;

            sqlx::query(
                "INSERT INTO subtasks (id, task_id, title, completed, sort_order) VALUES (?, ?, ?, FALSE, ?)",
            )
            .bind(subtask_id.to_string())
            .bind(id.to_string())
            .bind(subtask_title.trim())
            .bind(sort_order)
            .execute(&mut *tx)
            .await?;

            subtasks.push(Subtask {
                id: subtask_id,
                task_id: id,
                title: subtask_title.trim().to_string(),
                completed: false,
                sort_order,
            });
        }

        if parent.is_none() {
            parent = Some(Task {
                id,
                user_id: user_id.to_string(),
                list_id: request.list_id,
                title: title.to_string(),
                description: request.description.clone(),
                status,
                category_id: request.category_id,
                estimated_pomodoros: request.estimated_pomodoros,
                start_at: occurrence.start_at,
                end_at: occurrence.end_at,
                all_day: request.all_day,
                is_recurring,
                recurrence_parent_id: None,
                subtasks,
                created_at: now,
                updated_at: now,
            });
        }
    }

    tx.commit().await?;

    let parent = parent.ok_or(TaskError::InvalidRecurrence(RecurrenceError::NoOccurrences))?;

    log::info!(
        "Created task {} with {} occurrence(s) for user {}",
        parent.id,
        occurrences.len(),
        user_id
    );

    Ok(parent)
}

async fn load_subtasks(pool: &SqlitePool, task_id: &Uuid) -> Result<Vec<Subtask>, sqlx::Error> {
    let rows: Vec<SubtaskRow> =
        sqlx::query_as("SELECT * FROM subtasks WHERE task_id = ? ORDER BY sort_order ASC")
            .bind(task_id.to_string())
            .fetch_all(pool)
            .await?;

    Ok(rows.into_iter().map(|s| s.to_shared()).collect())
}

/// Attach subtasks to a batch of tasks with a single query
async fn attach_subtasks(
    pool: &SqlitePool,
    user_id: &str,
    rows: Vec<TaskRow>,
) -> Result<Vec<Task>, sqlx::Error> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }

    let subtask_rows: Vec<SubtaskRow> = sqlx::query_as(
        r#"
        SELECT s.* FROM subtasks s
        JOIN tasks t ON s.task_id = t.id
        WHERE t.user_id = ?
        ORDER BY s.sort_order ASC
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    let mut by_task: HashMap<String, Vec<Subtask>> = HashMap::new();
    for row in subtask_rows {
        by_task.entry(row.task_id.clone()).or_default().push(row.to_shared());
    }

    Ok(rows
        .into_iter()
        .map(|row| {
            let mut task = row.to_shared();
            task.subtasks = by_task.remove(&row.id).unwrap_or_default();
            task
        })
        .collect())
}

async fn fetch_task_row(
    pool: &SqlitePool,
    user_id: &str,
    task_id: &Uuid,
) -> Result<Option<TaskRow>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM tasks WHERE id = ? AND user_id = ?")
        .bind(task_id.to_string())
        .bind(user_id)
        .fetch_optional(pool)
        .await
}

pub async fn get_task(
    pool: &SqlitePool,
    user_id: &str,
    task_id: &Uuid,
) -> Result<Option<Task>, TaskError> {
    let Some(row) = fetch_task_row(pool, user_id, task_id).await? else {
        return Ok(None);
    };

    let mut task = row.to_shared();
    task.subtasks = load_subtasks(pool, task_id).await?;
    Ok(Some(task))
}

pub async fn list_tasks(
    pool: &SqlitePool,
    user_id: &str,
    filter: &TaskFilter,
) -> Result<Vec<Task>, TaskError> {
    let rows: Vec<TaskRow> = sqlx::query_as(
        r#"
        SELECT * FROM tasks
        WHERE user_id = ?
          AND (? IS NULL OR list_id = ?)
          AND (? IS NULL OR start_at >= ?)
          AND (? IS NULL OR start_at < ?)
        ORDER BY start_at IS NULL, start_at ASC, created_at ASC
        "#,
    )
    .bind(user_id)
    .bind(filter.list_id.map(|l| l.to_string()))
    .bind(filter.list_id.map(|l| l.to_string()))
    .bind(filter.from)
    .bind(filter.from)
    .bind(filter.to)
    .bind(filter.to)
    .fetch_all(pool)
    .await?;

    Ok(attach_subtasks(pool, user_id, rows).await?)
}

/// Tasks scheduled to start in `[from, to)`, without subtasks
pub async fn list_tasks_between(
    pool: &SqlitePool,
    user_id: &str,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Result<Vec<Task>, TaskError> {
    let rows: Vec<TaskRow> = sqlx::query_as(
        "SELECT * FROM tasks WHERE user_id = ? AND start_at >= ? AND start_at < ? ORDER BY start_at ASC",
    )
    .bind(user_id)
    .bind(from)
    .bind(to)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(|r| r.to_shared()).collect())
}

/// Look up a set of the user's tasks by id, without subtasks.
/// Ids that do not exist (or belong to someone else) are skipped.
pub async fn get_tasks_by_ids(
    pool: &SqlitePool,
    user_id: &str,
    task_ids: &[Uuid],
) -> Result<Vec<Task>, TaskError> {
    if task_ids.is_empty() {
        return Ok(Vec::new());
    }

    let ids: Vec<String> = task_ids.iter().map(|id| id.to_string()).collect();
    let ids = serde_json::to_string(&ids).map_err(|e| sqlx::Error::Encode(Box::new(e)))?;

    let rows: Vec<TaskRow> = sqlx::query_as(
        "SELECT * FROM tasks WHERE user_id = ? AND id IN (SELECT value FROM json_each(?))",
    )
    .bind(user_id)
    .bind(ids)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(|row| row.to_shared()).collect())
}

pub async fn update_task(
    pool: &SqlitePool,
    user_id: &str,
    task_id: &Uuid,
    request: &UpdateTaskRequest,
) -> Result<Task, TaskError> {
    let mut task = fetch_task_row(pool, user_id, task_id)
        .await?
        .ok_or(TaskError::NotFound)?;

    if let Some(ref title) = request.title {
        let title = title.trim();
        if title.is_empty() {
            return Err(TaskError::EmptyTitle);
        }
        task.title = title.to_string();
    }
    if let Some(ref description) = request.description {
        task.description = Some(description.clone());
    }
    if let Some(status) = request.status {
        task.status = status.as_str().to_string();
    }
    if let Some(category_id) = request.category_id {
        if !category_exists(pool, user_id, &category_id).await? {
            return Err(TaskError::CategoryNotFound);
        }
        task.category_id = Some(category_id.to_string());
    }
    if let Some(estimate) = request.estimated_pomodoros {
        if estimate < 0 {
            return Err(TaskError::InvalidEstimate);
        }
        task.estimated_pomodoros = estimate;
    }
    if let Some(start_at) = request.start_at {
        task.start_at = Some(start_at);
    }
    if let Some(end_at) = request.end_at {
        task.end_at = Some(end_at);
    }
    if let Some(all_day) = request.all_day {
        task.all_day = all_day;
    }
    validate_time_range(task.start_at, task.end_at)?;

    task.updated_at = Utc::now();

    sqlx::query(
        r#"
        UPDATE tasks
        SET title = ?, description = ?, status = ?, category_id = ?, estimated_pomodoros = ?, start_at = ?, end_at = ?, all_day = ?, updated_at = ?
        WHERE id = ? AND user_id = ?
        "#,
    )
    .bind(&task.title)
    .bind(&task.description)
    .bind(&task.status)
    .bind(&task.category_id)
    .bind(task.estimated_pomodoros)
    .bind(task.start_at)
    .bind(task.end_at)
    .bind(task.all_day)
    .bind(task.updated_at)
    .bind(task_id.to_string())
    .bind(user_id)
    .execute(pool)
    .await?;

    let mut updated = task.to_shared();
    updated.subtasks = load_subtasks(pool, task_id).await?;
    Ok(updated)
}

pub async fn update_status(
    pool: &SqlitePool,
    user_id: &str,
    task_id: &Uuid,
    status: TaskStatus,
) -> Result<Task, TaskError> {
    let request = UpdateTaskRequest {
        status: Some(status),
        ..Default::default()
    };
    update_task(pool, user_id, task_id, &request).await
}

/// Delete a task. With `series` set, the whole series the task belongs to
/// (its parent and every child) is removed in one transaction.
pub async fn delete_task(
    pool: &SqlitePool,
    user_id: &str,
    task_id: &Uuid,
    series: bool,
) -> Result<usize, TaskError> {
    let task = fetch_task_row(pool, user_id, task_id)
        .await?
        .ok_or(TaskError::NotFound)?;

    let mut tx = pool.begin().await?;

    let deleted = if series {
        let root = task.recurrence_parent_id.clone().unwrap_or(task.id.clone());

        sqlx::query(
            r#"
            DELETE FROM subtasks WHERE task_id IN (
                SELECT id FROM tasks WHERE user_id = ? AND (id = ? OR recurrence_parent_id = ?)
            )
            "#,
        )
        .bind(user_id)
        .bind(&root)
        .bind(&root)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM tasks WHERE user_id = ? AND (id = ? OR recurrence_parent_id = ?)")
            .bind(user_id)
            .bind(&root)
            .bind(&root)
            .execute(&mut *tx)
            .await?
            .rows_affected()
    } else {
        sqlx::query("DELETE FROM subtasks WHERE task_id = ?")
            .bind(&task.id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM tasks WHERE id = ? AND user_id = ?")
            .bind(&task.id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?
            .rows_affected()
    };

    tx.commit().await?;

    log::info!("Deleted {} task(s) for user {}", deleted, user_id);

    Ok(deleted as usize)
}

pub async fn add_subtask(
    pool: &SqlitePool,
    user_id: &str,
    task_id: &Uuid,
    request: &CreateSubtaskRequest,
) -> Result<Subtask, TaskError> {
    let title = request.title.trim();
    if title.is_empty() {
        return Err(TaskError::EmptyTitle);
    }
    if fetch_task_row(pool, user_id, task_id).await?.is_none() {
        return Err(TaskError::NotFound);
    }

    let next_order = sqlx::query_scalar::<_, i32>(
        "SELECT COALESCE(MAX(sort_order) + 1, 0) FROM subtasks WHERE task_id = ?",
    )
    .bind(task_id.to_string())
    .fetch_one(pool)
    .await?;

    let id = Uuid::new_v4();

    sqlx::query(
        "INSERT INTO subtasks (id, task_id, title, completed, sort_order) VALUES (?, ?, ?, FALSE, ?)",
    )
    .bind(id.to_string())
    .bind(task_id.to_string())
    .bind(title)
    .bind(next_order)
    .execute(pool)
    .await?;

    Ok(Subtask {
        id,
        task_id: *task_id,
        title: title.to_string(),
        completed: false,
        sort_order: next_order,
    })
}

async fn fetch_subtask_row(
    pool: &SqlitePool,
    user_id: &str,
    task_id: &Uuid,
    subtask_id: &Uuid,
) -> Result<Option<SubtaskRow>, sqlx::Error> {
    sqlx::query_as(
        r#"
        SELECT s.* FROM subtasks s
        JOIN tasks t ON s.task_id = t.id
        WHERE s.id = ? AND s.task_id = ? AND t.user_id = ?
        "#,
    )
    .bind(subtask_id.to_string())
    .bind(task_id.to_string())
    .bind(user_id)
    .fetch_optional(pool)
    .await
}

pub async fn toggle_subtask(
    pool: &SqlitePool,
    user_id: &str,
    task_id: &Uuid,
    subtask_id: &Uuid,
) -> Result<Subtask, TaskError> {
    let mut subtask = fetch_subtask_row(pool, user_id, task_id, subtask_id)
        .await?
        .ok_or(TaskError::SubtaskNotFound)?;

    subtask.completed = !subtask.completed;

    sqlx::query("UPDATE subtasks SET completed = ? WHERE id = ?")
        .bind(subtask.completed)
        .bind(&subtask.id)
        .execute(pool)
        .await?;

    Ok(subtask.to_shared())
}

pub async fn delete_subtask(
    pool: &SqlitePool,
    user_id: &str,
    task_id: &Uuid,
    subtask_id: &Uuid,
) -> Result<(), TaskError> {
    let subtask = fetch_subtask_row(pool, user_id, task_id, subtask_id)
        .await?
        .ok_or(TaskError::SubtaskNotFound)?;

    sqlx::query("DELETE FROM subtasks WHERE id = ?")
        .bind(&subtask.id)
        .execute(pool)
        .await?;

    Ok(())
}
