pub mod analytics;
pub mod assistant;
pub mod auth;
pub mod categories;
pub mod daily_goals;
pub mod efficiency;
pub mod focus_sessions;
pub mod llm;
pub mod recurrence;
pub mod task_lists;
pub mod tasks;
