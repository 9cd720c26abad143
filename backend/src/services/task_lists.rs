use chrono::Utc;
use sqlx::SqlitePool;
use thiserror::Error;
use uuid::Uuid;

use crate::models::TaskListRow;
use shared::{CreateTaskListRequest, TaskList};

#[derive(Debug, Error)]
pub enum TaskListError {
    #[error("Task list not found")]
    NotFound,
    #[error("Task list name cannot be empty")]
    EmptyName,
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

pub async fn create_list(
    pool: &SqlitePool,
    user_id: &str,
    request: &CreateTaskListRequest,
) -> Result<TaskList, TaskListError> {
    let name = request.name.trim();
    if name.is_empty() {
        return Err(TaskListError::EmptyName);
    }

    let id = Uuid::new_v4();
    let now = Utc::now();

    sqlx::query("INSERT INTO task_lists (id, user_id, name, created_at) VALUES (?, ?, ?, ?)")
        .bind(id.to_string())
        .bind(user_id)
        .bind(name)
        .bind(now)
        .execute(pool)
        .await?;

    Ok(TaskList {
        id,
        user_id: user_id.to_string(),
        name: name.to_string(),
        created_at: now,
    })
}

pub async fn list_lists(pool: &SqlitePool, user_id: &str) -> Result<Vec<TaskList>, TaskListError> {
    let lists: Vec<TaskListRow> =
        sqlx::query_as("SELECT * FROM task_lists WHERE user_id = ? ORDER BY created_at ASC")
            .bind(user_id)
            .fetch_all(pool)
            .await?;

    Ok(lists.into_iter().map(|l| l.to_shared()).collect())
}

pub async fn list_exists(
    pool: &SqlitePool,
    user_id: &str,
    list_id: &Uuid,
) -> Result<bool, sqlx::Error> {
    let count = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM task_lists WHERE id = ? AND user_id = ?",
    )
    .bind(list_id.to_string())
    .bind(user_id)
    .fetch_one(pool)
    .await?;

    Ok(count > 0)
}

/// Delete a list together with its tasks and their subtasks
pub async fn delete_list(
    pool: &SqlitePool,
    user_id: &str,
    list_id: &Uuid,
) -> Result<(), TaskListError> {
    if !list_exists(pool, user_id, list_id).await? {
        return Err(TaskListError::NotFound);
    }

    let mut tx = pool.begin().await?;

    sqlx::query(
        "DELETE FROM subtasks WHERE task_id IN (SELECT id FROM tasks WHERE list_id = ? AND user_id = ?)",
    )
    .bind(list_id.to_string())
    .bind(user_id)
    .execute(&mut *tx)
    .await?;

    sqlx::query("DELETE FROM tasks WHERE list_id = ? AND user_id = ?")
        .bind(list_id.to_string())
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

    sqlx::query("DELETE FROM task_lists WHERE id = ? AND user_id = ?")
        .bind(list_id.to_string())
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;

    #[test]
    fn test_task_list_error_display() {
        assert_eq!(TaskListError::NotFound.to_string(), "Task list not found");
        assert_eq!(TaskListError::EmptyName.to_string(), "Task list name cannot be empty");
    }

    #[actix_rt::test]
    async fn test_lists_are_scoped_to_user() {
        let pool = test_pool().await;
        let request = CreateTaskListRequest {
            name: "  Work  ".to_string(),
        };

        let list = create_list(&pool, "alice", &request).await.unwrap();
        assert_eq!(list.name, "Work");

        assert!(list_exists(&pool, "alice", &list.id).await.unwrap());
        assert!(!list_exists(&pool, "bob", &list.id).await.unwrap());
        assert!(list_lists(&pool, "bob").await.unwrap().is_empty());

        assert!(matches!(
            delete_list(&pool, "bob", &list.id).await,
            Err(TaskListError::NotFound)
        ));
        delete_list(&pool, "alice", &list.id).await.unwrap();
        assert!(list_lists(&pool, "alice").await.unwrap().is_empty());
    }

    #[actix_rt::test]
    async fn test_create_list_rejects_blank_name() {
        let pool = test_pool().await;
        let request = CreateTaskListRequest {
            name: "   ".to_string(),
        };

        assert!(matches!(
            create_list(&pool, "alice", &request).await,
            Err(TaskListError::EmptyName)
        ));
    }
}
