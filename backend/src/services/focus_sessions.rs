use chrono::{DateTime, Duration, Utc};
use sqlx::SqlitePool;
use thiserror::Error;
use uuid::Uuid;

use crate::models::FocusSessionRow;
use shared::{FocusSession, RecordSessionRequest};

#[derive(Debug, Error)]
pub enum FocusSessionError {
    #[error("Focus session not found")]
    NotFound,
    #[error("Task not found")]
    TaskNotFound,
    #[error("Session durations cannot be negative")]
    InvalidDuration,
    #[error("Session end must not be before its start")]
    InvalidTimeRange,
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

/// Record a finished (or interrupted) focus or break session.
/// Missing timestamps are derived from the actual duration, ending now.
pub async fn record_session(
    pool: &SqlitePool,
    user_id: &str,
    request: &RecordSessionRequest,
) -> Result<FocusSession, FocusSessionError> {
    if request.planned_duration_seconds < 0 || request.actual_duration_seconds < 0 {
        return Err(FocusSessionError::InvalidDuration);
    }

    let ended_at = request.ended_at.unwrap_or_else(Utc::now);
    let started_at = match request.started_at {
        Some(started_at) => started_at,
        None => Duration::try_seconds(request.actual_duration_seconds)
            .and_then(|d| ended_at.checked_sub_signed(d))
            .ok_or(FocusSessionError::InvalidDuration)?,
    };
    if ended_at < started_at {
        return Err(FocusSessionError::InvalidTimeRange);
    }

    if let Some(task_id) = request.task_id {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM tasks WHERE id = ? AND user_id = ?",
        )
        .bind(task_id.to_string())
        .bind(user_id)
        .fetch_one(pool)
        .await?;

        if count == 0 {
            return Err(FocusSessionError::TaskNotFound);
        }
    }

    let id = Uuid::new_v4();

    sqlx::query(
        r#"
        INSERT INTO focus_sessions (id, user_id, task_id, session_type, status, planned_duration_seconds, actual_duration_seconds, started_at, ended_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(id.to_string())
    .bind(user_id)
    .bind(request.task_id.map(|t| t.to_string()))
    .bind(request.session_type.as_str())
    .bind(request.status.as_str())
    .bind(request.planned_duration_seconds)
    .bind(request.actual_duration_seconds)
    .bind(started_at)
    .bind(ended_at)
    .execute(pool)
    .await?;

    log::debug!(
        "Recorded {} session {} for user {}",
        request.session_type.as_str(),
        id,
        user_id
    );

    Ok(FocusSession {
        id,
        user_id: user_id.to_string(),
        task_id: request.task_id,
        session_type: request.session_type,
        status: request.status,
        planned_duration_seconds: request.planned_duration_seconds,
        actual_duration_seconds: request.actual_duration_seconds,
        started_at,
        ended_at,
    })
}

/// Sessions started in `[from, to)`, oldest first. Open bounds are unrestricted.
pub async fn list_sessions(
    pool: &SqlitePool,
    user_id: &str,
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
) -> Result<Vec<FocusSession>, FocusSessionError> {
    let sessions: Vec<FocusSessionRow> = sqlx::query_as(
        r#"
        SELECT * FROM focus_sessions
        WHERE user_id = ?
          AND (? IS NULL OR started_at >= ?)
          AND (? IS NULL OR started_at < ?)
        ORDER BY started_at ASC
        "#,
    )
    .bind(user_id)
    .bind(from)
    .bind(from)
    .bind(to)
    .bind(to)
    .fetch_all(pool)
    .await?;

    Ok(sessions.into_iter().map(|s| s.to_shared()).collect())
}

pub async fn delete_session(
    pool: &SqlitePool,
    user_id: &str,
    session_id: &Uuid,
) -> Result<(), FocusSessionError> {
    let result = sqlx::query("DELETE FROM focus_sessions WHERE id = ? AND user_id = ?")
        .bind(session_id.to_string())
        .bind(user_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(FocusSessionError::NotFound);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;
    use chrono::TimeZone;
    use shared::{SessionStatus, SessionType};

    fn focus_request(actual_seconds: i64) -> RecordSessionRequest {
        RecordSessionRequest {
            task_id: None,
            session_type: SessionType::Focus,
            status: SessionStatus::Completed,
            planned_duration_seconds: 1500,
            actual_duration_seconds: actual_seconds,
            started_at: None,
            ended_at: Some(Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap()),
        }
    }

    #[actix_rt::test]
    async fn test_record_derives_start_time() {
        let pool = test_pool().await;

        let session = record_session(&pool, "alice", &focus_request(1500)).await.unwrap();

        assert_eq!(
            session.started_at,
            Utc.with_ymd_and_hms(2024, 1, 1, 9, 35, 0).unwrap()
        );
        assert!(session.task_id.is_none());
    }

    #[actix_rt::test]
    async fn test_record_validation() {
        let pool = test_pool().await;

        assert!(matches!(
            record_session(&pool, "alice", &focus_request(-5)).await,
            Err(FocusSessionError::InvalidDuration)
        ));

        let mut request = focus_request(60);
        request.started_at = Some(Utc.with_ymd_and_hms(2024, 1, 1, 11, 0, 0).unwrap());
        assert!(matches!(
            record_session(&pool, "alice", &request).await,
            Err(FocusSessionError::InvalidTimeRange)
        ));

        let mut request = focus_request(60);
        request.task_id = Some(Uuid::new_v4());
        assert!(matches!(
            record_session(&pool, "alice", &request).await,
            Err(FocusSessionError::TaskNotFound)
        ));
    }

    #[actix_rt::test]
    async fn test_list_and_delete_sessions() {
        let pool = test_pool().await;

        let first = record_session(&pool, "alice", &focus_request(600)).await.unwrap();
        let mut later = focus_request(300);
        later.ended_at = Some(Utc.with_ymd_and_hms(2024, 1, 2, 10, 0, 0).unwrap());
        record_session(&pool, "alice", &later).await.unwrap();
        record_session(&pool, "bob", &focus_request(900)).await.unwrap();

        let all = list_sessions(&pool, "alice", None, None).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id, first.id);

        let day_one = list_sessions(
            &pool,
            "alice",
            Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()),
            Some(Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap()),
        )
        .await
        .unwrap();
        assert_eq!(day_one.len(), 1);

        assert!(matches!(
            delete_session(&pool, "bob", &first.id).await,
            Err(FocusSessionError::NotFound)
        ));
        delete_session(&pool, "alice", &first.id).await.unwrap();
        assert_eq!(list_sessions(&pool, "alice", None, None).await.unwrap().len(), 1);
    }
}
