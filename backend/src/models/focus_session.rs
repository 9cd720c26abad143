use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Database model for recorded focus and break sessions
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct FocusSessionRow {
    pub id: String,
    pub user_id: String,
    pub task_id: Option<String>,
    pub session_type: String,
    pub status: String,
    pub planned_duration_seconds: i64,
    pub actual_duration_seconds: i64,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
}

impl FocusSessionRow {
    pub fn to_shared(&self) -> shared::FocusSession {
        shared::FocusSession {
            id: Uuid::parse_str(&self.id).unwrap_or_default(),
            user_id: self.user_id.clone(),
            task_id: self.task_id.as_ref().and_then(|id| Uuid::parse_str(id).ok()),
            session_type: self.session_type.parse().unwrap_or(shared::SessionType::Focus),
            status: self.status.parse().unwrap_or(shared::SessionStatus::Completed),
            planned_duration_seconds: self.planned_duration_seconds,
            actual_duration_seconds: self.actual_duration_seconds,
            started_at: self.started_at,
            ended_at: self.ended_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{SessionStatus, SessionType};

    #[test]
    fn test_focus_session_row_to_shared() {
        let now = Utc::now();
        let id = Uuid::new_v4();
        let task_id = Uuid::new_v4();

        let row = FocusSessionRow {
            id: id.to_string(),
            user_id: "user-1".to_string(),
            task_id: Some(task_id.to_string()),
            session_type: "SHORT_BREAK".to_string(),
            status: "INTERRUPTED".to_string(),
            planned_duration_seconds: 300,
            actual_duration_seconds: 120,
            started_at: now,
            ended_at: now,
        };

        let shared = row.to_shared();

        assert_eq!(shared.id, id);
        assert_eq!(shared.task_id, Some(task_id));
        assert_eq!(shared.session_type, SessionType::ShortBreak);
        assert_eq!(shared.status, SessionStatus::Interrupted);
        assert_eq!(shared.actual_duration_seconds, 120);
    }

    #[test]
    fn test_focus_session_row_with_dangling_task_reference() {
        let now = Utc::now();

        let row = FocusSessionRow {
            id: Uuid::new_v4().to_string(),
            user_id: "user-1".to_string(),
            task_id: Some("not-a-uuid".to_string()),
            session_type: "FOCUS".to_string(),
            status: "COMPLETED".to_string(),
            planned_duration_seconds: 1500,
            actual_duration_seconds: 1500,
            started_at: now,
            ended_at: now,
        };

        assert!(row.to_shared().task_id.is_none());
    }
}
