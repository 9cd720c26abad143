use std::sync::Arc;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::services::llm::LlmClient;

pub mod task_list;
pub mod task;
pub mod category;
pub mod focus_session;
pub mod daily_goal;

pub use task_list::*;
pub use task::*;
pub use category::*;
pub use focus_session::*;
pub use daily_goal::*;

/// Application state shared across all handlers
pub struct AppState {
    pub db: SqlitePool,
    pub config: Config,
    pub llm: Arc<dyn LlmClient>,
}
