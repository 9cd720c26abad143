use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Database model for tasks (one row per occurrence)
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct TaskRow {
    pub id: String,
    pub user_id: String,
    pub list_id: String,
    pub title: String,
    pub description: Option<String>,
    pub status: String,
    pub category_id: Option<String>,
    pub estimated_pomodoros: i32,
    pub start_at: Option<DateTime<Utc>>,
    pub end_at: Option<DateTime<Utc>>,
    pub all_day: bool,
    pub is_recurring: bool,
    pub recurrence_parent_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Database model for subtasks
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct SubtaskRow {
    pub id: String,
    pub task_id: String,
    pub title: String,
    pub completed: bool,
    pub sort_order: i32,
}

impl TaskRow {
    /// Converts without subtasks; callers attach them when needed
    pub fn to_shared(&self) -> shared::Task {
        shared::Task {
            id: Uuid::parse_str(&self.id).unwrap_or_default(),
            user_id: self.user_id.clone(),
            list_id: Uuid::parse_str(&self.list_id).unwrap_or_default(),
            title: self.title.clone(),
            description: self.description.clone(),
            status: self.status.parse().unwrap_or(shared::TaskStatus::Pending),
            category_id: self.category_id.as_ref().and_then(|id| Uuid::parse_str(id).ok()),
            estimated_pomodoros: self.estimated_pomodoros,
            start_at: self.start_at,
            end_at: self.end_at,
            all_day: self.all_day,
            is_recurring: self.is_recurring,
            recurrence_parent_id: self
                .recurrence_parent_id
                .as_ref()
                .and_then(|id| Uuid::parse_str(id).ok()),
            subtasks: Vec::new(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

impl SubtaskRow {
    pub fn to_shared(&self) -> shared::Subtask {
        shared::Subtask {
            id: Uuid::parse_str(&self.id).unwrap_or_default(),
            task_id: Uuid::parse_str(&self.task_id).unwrap_or_default(),
            title: self.title.clone(),
            completed: self.completed,
            sort_order: self.sort_order,
        }
    }
}
