use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Database model for categories
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct CategoryRow {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub color: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl CategoryRow {
    pub fn to_shared(&self) -> shared::Category {
        shared::Category {
            id: Uuid::parse_str(&self.id).unwrap_or_default(),
            user_id: self.user_id.clone(),
            name: self.name.clone(),
            color: self.color.clone(),
            created_at: self.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_row_to_shared() {
        let now = Utc::now();
        let id = Uuid::new_v4();

        let row = CategoryRow {
            id: id.to_string(),
            user_id: "user-1".to_string(),
            name: "Deep Work".to_string(),
            color: Some("#FF5733".to_string()),
            created_at: now,
        };

        let shared = row.to_shared();

        assert_eq!(shared.id, id);
        assert_eq!(shared.name, "Deep Work");
        assert_eq!(shared.color, Some("#FF5733".to_string()));
    }

    #[test]
    fn test_category_row_without_color() {
        let row = CategoryRow {
            id: Uuid::new_v4().to_string(),
            user_id: "user-1".to_string(),
            name: "Errands".to_string(),
            color: None,
            created_at: Utc::now(),
        };

        assert!(row.to_shared().color.is_none());
    }
}
