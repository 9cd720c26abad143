use chrono::Utc;
use sqlx::SqlitePool;
use std::collections::HashMap;
use thiserror::Error;
use uuid::Uuid;

use crate::models::CategoryRow;
use shared::{Category, CreateCategoryRequest, UpdateCategoryRequest};

#[derive(Debug, Error)]
pub enum CategoryError {
    #[error("Category not found")]
    NotFound,
    #[error("Category name already exists")]
    DuplicateName,
    #[error("Category name cannot be empty")]
    EmptyName,
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

fn is_unique_violation(error: &sqlx::Error) -> bool {
    matches!(error, sqlx::Error::Database(e) if e.message().contains("UNIQUE constraint failed"))
}

pub async fn create_category(
    pool: &SqlitePool,
    user_id: &str,
    request: &CreateCategoryRequest,
) -> Result<Category, CategoryError> {
    let name = request.name.trim();
    if name.is_empty() {
        return Err(CategoryError::EmptyName);
    }

    let id = Uuid::new_v4();
    let now = Utc::now();

    let result = sqlx::query(
        "INSERT INTO categories (id, user_id, name, color, created_at) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(id.to_string())
    .bind(user_id)
    .bind(name)
    .bind(&request.color)
    .bind(now)
    .execute(pool)
    .await;

    match result {
        Ok(_) => Ok(Category {
            id,
            user_id: user_id.to_string(),
            name: name.to_string(),
            color: request.color.clone(),
            created_at: now,
        }),
        Err(e) if is_unique_violation(&e) => Err(CategoryError::DuplicateName),
        Err(e) => Err(CategoryError::DatabaseError(e)),
    }
}

pub async fn get_category(
    pool: &SqlitePool,
    user_id: &str,
    category_id: &Uuid,
) -> Result<Option<Category>, CategoryError> {
    let category: Option<CategoryRow> =
        sqlx::query_as("SELECT * FROM categories WHERE id = ? AND user_id = ?")
            .bind(category_id.to_string())
            .bind(user_id)
            .fetch_optional(pool)
            .await?;

    Ok(category.map(|c| c.to_shared()))
}

pub async fn list_categories(
    pool: &SqlitePool,
    user_id: &str,
) -> Result<Vec<Category>, CategoryError> {
    let categories: Vec<CategoryRow> =
        sqlx::query_as("SELECT * FROM categories WHERE user_id = ? ORDER BY name ASC")
            .bind(user_id)
            .fetch_all(pool)
            .await?;

    Ok(categories.into_iter().map(|c| c.to_shared()).collect())
}

/// All of a user's categories keyed by id, for display lookups
pub async fn category_map(
    pool: &SqlitePool,
    user_id: &str,
) -> Result<HashMap<Uuid, Category>, CategoryError> {
    Ok(list_categories(pool, user_id)
        .await?
        .into_iter()
        .map(|c| (c.id, c))
        .collect())
}

pub async fn category_exists(
    pool: &SqlitePool,
    user_id: &str,
    category_id: &Uuid,
) -> Result<bool, sqlx::Error> {
    let count = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM categories WHERE id = ? AND user_id = ?",
    )
    .bind(category_id.to_string())
    .bind(user_id)
    .fetch_one(pool)
    .await?;

    Ok(count > 0)
}

pub async fn update_category(
    pool: &SqlitePool,
    user_id: &str,
    category_id: &Uuid,
    request: &UpdateCategoryRequest,
) -> Result<Category, CategoryError> {
    let mut category: CategoryRow =
        sqlx::query_as("SELECT * FROM categories WHERE id = ? AND user_id = ?")
            .bind(category_id.to_string())
            .bind(user_id)
            .fetch_optional(pool)
            .await?
            .ok_or(CategoryError::NotFound)?;

    if let Some(ref name) = request.name {
        let name = name.trim();
        if name.is_empty() {
            return Err(CategoryError::EmptyName);
        }
        category.name = name.to_string();
    }
    if let Some(ref color) = request.color {
        category.color = Some(color.clone());
    }

    let result = sqlx::query("UPDATE categories SET name = ?, color = ? WHERE id = ? AND user_id = ?")
        .bind(&category.name)
        .bind(&category.color)
        .bind(category_id.to_string())
        .bind(user_id)
        .execute(pool)
        .await;

    match result {
        Ok(_) => Ok(category.to_shared()),
        Err(e) if is_unique_violation(&e) => Err(CategoryError::DuplicateName),
        Err(e) => Err(CategoryError::DatabaseError(e)),
    }
}

pub async fn delete_category(
    pool: &SqlitePool,
    user_id: &str,
    category_id: &Uuid,
) -> Result<(), CategoryError> {
    // Tasks keep existing without a category
    sqlx::query("UPDATE tasks SET category_id = NULL WHERE category_id = ? AND user_id = ?")
        .bind(category_id.to_string())
        .bind(user_id)
        .execute(pool)
        .await?;

    let result = sqlx::query("DELETE FROM categories WHERE id = ? AND user_id = ?")
        .bind(category_id.to_string())
        .bind(user_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(CategoryError::NotFound);
    }

    Ok(())
}
