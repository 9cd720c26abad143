use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Database model for task lists
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct TaskListRow {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl TaskListRow {
    pub fn to_shared(&self) -> shared::TaskList {
        shared::TaskList {
            id: Uuid::parse_str(&self.id).unwrap_or_default(),
            user_id: self.user_id.clone(),
            name: self.name.clone(),
            created_at: self.created_at,
        }
    }
}
