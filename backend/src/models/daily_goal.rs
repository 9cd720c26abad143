use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Database model for daily focus goals
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DailyGoalRow {
    pub user_id: String,
    pub date: NaiveDate,
    pub goal_minutes: i32,
}

impl DailyGoalRow {
    pub fn to_shared(&self) -> shared::DailyGoal {
        shared::DailyGoal {
            user_id: self.user_id.clone(),
            date: self.date,
            goal_minutes: self.goal_minutes,
        }
    }
}
