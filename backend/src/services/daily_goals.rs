use chrono::NaiveDate;
use sqlx::SqlitePool;
use thiserror::Error;

use crate::models::DailyGoalRow;
use shared::{DailyGoal, SetDailyGoalRequest};

#[derive(Debug, Error)]
pub enum DailyGoalError {
    #[error("Goal minutes cannot be negative")]
    InvalidGoal,
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

/// Create or replace the goal for one day
pub async fn set_goal(
    pool: &SqlitePool,
    user_id: &str,
    request: &SetDailyGoalRequest,
) -> Result<DailyGoal, DailyGoalError> {
    if request.goal_minutes < 0 {
        return Err(DailyGoalError::InvalidGoal);
    }

    sqlx::query(
        r#"
        INSERT INTO daily_goals (user_id, date, goal_minutes) VALUES (?, ?, ?)
        ON CONFLICT(user_id, date) DO UPDATE SET goal_minutes = excluded.goal_minutes
        "#,
    )
    .bind(user_id)
    .bind(request.date)
    .bind(request.goal_minutes)
    .execute(pool)
    .await?;

    Ok(DailyGoal {
        user_id: user_id.to_string(),
        date: request.date,
        goal_minutes: request.goal_minutes,
    })
}

pub async fn get_goal(
    pool: &SqlitePool,
    user_id: &str,
    date: NaiveDate,
) -> Result<Option<DailyGoal>, DailyGoalError> {
    let goal: Option<DailyGoalRow> =
        sqlx::query_as("SELECT * FROM daily_goals WHERE user_id = ? AND date = ?")
            .bind(user_id)
            .bind(date)
            .fetch_optional(pool)
            .await?;

    Ok(goal.map(|g| g.to_shared()))
}

/// Total goal minutes over the inclusive date range; days without a goal count as 0
pub async fn sum_goal_minutes(
    pool: &SqlitePool,
    user_id: &str,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<i64, DailyGoalError> {
    let total = sqlx::query_scalar::<_, i64>(
        "SELECT COALESCE(SUM(goal_minutes), 0) FROM daily_goals WHERE user_id = ? AND date >= ? AND date <= ?",
    )
    .bind(user_id)
    .bind(from)
    .bind(to)
    .fetch_one(pool)
    .await?;

    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    #[actix_rt::test]
    async fn test_set_goal_upserts() {
        let pool = test_pool().await;

        set_goal(&pool, "alice", &SetDailyGoalRequest { date: day(1), goal_minutes: 120 })
            .await
            .unwrap();
        set_goal(&pool, "alice", &SetDailyGoalRequest { date: day(1), goal_minutes: 90 })
            .await
            .unwrap();

        let goal = get_goal(&pool, "alice", day(1)).await.unwrap().unwrap();
        assert_eq!(goal.goal_minutes, 90);
        assert!(get_goal(&pool, "bob", day(1)).await.unwrap().is_none());
    }

    #[actix_rt::test]
    async fn test_negative_goal_rejected() {
        let pool = test_pool().await;

        assert!(matches!(
            set_goal(&pool, "alice", &SetDailyGoalRequest { date: day(1), goal_minutes: -1 }).await,
            Err(DailyGoalError::InvalidGoal)
        ));
    }

    #[actix_rt::test]
    async fn test_sum_goal_minutes() {
        let pool = test_pool().await;

        for (d, minutes) in [(1, 60), (2, 90), (5, 30)] {
            set_goal(&pool, "alice", &SetDailyGoalRequest { date: day(d), goal_minutes: minutes })
                .await
                .unwrap();
        }

        assert_eq!(sum_goal_minutes(&pool, "alice", day(1), day(2)).await.unwrap(), 150);
        assert_eq!(sum_goal_minutes(&pool, "alice", day(1), day(7)).await.unwrap(), 180);
        assert_eq!(sum_goal_minutes(&pool, "alice", day(10), day(12)).await.unwrap(), 0);
    }
}
