use chrono::{DateTime, NaiveDate, Utc, Weekday};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

// ============================================================================
// Task List Types
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskList {
    pub id: Uuid,
    pub user_id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTaskListRequest {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskListsResponse {
    pub lists: Vec<TaskList>,
}

// ============================================================================
// Category Types
// ============================================================================

/// Display values used when a session or task has no resolvable category
pub const UNCATEGORIZED_NAME: &str = "Uncategorized";
pub const DEFAULT_CATEGORY_COLOR: &str = "#9E9E9E";
pub const UNKNOWN_TASK_TITLE: &str = "Unknown Task";
pub const OTHERS_CATEGORY_NAME: &str = "Others";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: Uuid,
    pub user_id: String,
    pub name: String,
    pub color: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCategoryRequest {
    pub name: String,
    pub color: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateCategoryRequest {
    pub name: Option<String>,
    pub color: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoriesResponse {
    pub categories: Vec<Category>,
}

// ============================================================================
// Task Types
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Completed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "PENDING",
            TaskStatus::InProgress => "IN_PROGRESS",
            TaskStatus::Completed => "COMPLETED",
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, TaskStatus::Completed)
    }
}

impl FromStr for TaskStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "PENDING" => Ok(TaskStatus::Pending),
            "IN_PROGRESS" => Ok(TaskStatus::InProgress),
            "COMPLETED" => Ok(TaskStatus::Completed),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecurrenceFrequency {
    Daily,
    Weekly,
    Monthly,
    Yearly,
    Custom,
}

impl RecurrenceFrequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecurrenceFrequency::Daily => "DAILY",
            RecurrenceFrequency::Weekly => "WEEKLY",
            RecurrenceFrequency::Monthly => "MONTHLY",
            RecurrenceFrequency::Yearly => "YEARLY",
            RecurrenceFrequency::Custom => "CUSTOM",
        }
    }
}

impl FromStr for RecurrenceFrequency {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "DAILY" => Ok(RecurrenceFrequency::Daily),
            "WEEKLY" => Ok(RecurrenceFrequency::Weekly),
            "MONTHLY" => Ok(RecurrenceFrequency::Monthly),
            "YEARLY" => Ok(RecurrenceFrequency::Yearly),
            "CUSTOM" => Ok(RecurrenceFrequency::Custom),
            _ => Err(()),
        }
    }
}

fn default_interval() -> u32 {
    1
}

/// How a recurring task repeats. `until` and `count` are mutually exclusive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurrenceRule {
    pub frequency: RecurrenceFrequency,
    #[serde(default = "default_interval")]
    pub interval: u32,
    /// Only meaningful for weekly rules. Accepts "MON", "Mon", "monday", ...
    #[serde(default)]
    pub weekdays: Vec<Weekday>,
    pub until: Option<NaiveDate>,
    pub count: Option<u32>,
    /// Explicit dates for custom rules
    #[serde(default)]
    pub occurs: Vec<NaiveDate>,
}

impl RecurrenceRule {
    pub fn new(frequency: RecurrenceFrequency) -> Self {
        Self {
            frequency,
            interval: 1,
            weekdays: Vec::new(),
            until: None,
            count: None,
            occurs: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subtask {
    pub id: Uuid,
    pub task_id: Uuid,
    pub title: String,
    pub completed: bool,
    pub sort_order: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    pub user_id: String,
    pub list_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub category_id: Option<Uuid>,
    pub estimated_pomodoros: i32,
    pub start_at: Option<DateTime<Utc>>,
    pub end_at: Option<DateTime<Utc>>,
    pub all_day: bool,
    pub is_recurring: bool,
    /// First occurrence of the series this task belongs to; `None` for the
    /// parent itself and for standalone tasks
    pub recurrence_parent_id: Option<Uuid>,
    #[serde(default)]
    pub subtasks: Vec<Subtask>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTaskRequest {
    pub list_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub category_id: Option<Uuid>,
    #[serde(default)]
    pub estimated_pomodoros: i32,
    pub start_at: Option<DateTime<Utc>>,
    pub end_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub all_day: bool,
    #[serde(default)]
    pub is_recurring: bool,
    pub recurrence: Option<RecurrenceRule>,
    /// Explicit occurrence dates used when no recurrence rule is given
    #[serde(default)]
    pub dates: Vec<NaiveDate>,
    #[serde(default)]
    pub subtasks: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateTaskRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub category_id: Option<Uuid>,
    pub estimated_pomodoros: Option<i32>,
    pub start_at: Option<DateTime<Utc>>,
    pub end_at: Option<DateTime<Utc>>,
    pub all_day: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateTaskStatusRequest {
    pub status: TaskStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSubtaskRequest {
    pub title: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TasksResponse {
    pub tasks: Vec<Task>,
}

// ============================================================================
// Focus Session Types
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionType {
    Focus,
    ShortBreak,
    LongBreak,
}

impl SessionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionType::Focus => "FOCUS",
            SessionType::ShortBreak => "SHORT_BREAK",
            SessionType::LongBreak => "LONG_BREAK",
        }
    }
}

impl FromStr for SessionType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "FOCUS" => Ok(SessionType::Focus),
            "SHORT_BREAK" => Ok(SessionType::ShortBreak),
            "LONG_BREAK" => Ok(SessionType::LongBreak),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionStatus {
    Completed,
    Interrupted,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Completed => "COMPLETED",
            SessionStatus::Interrupted => "INTERRUPTED",
        }
    }
}

impl FromStr for SessionStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "COMPLETED" => Ok(SessionStatus::Completed),
            "INTERRUPTED" => Ok(SessionStatus::Interrupted),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FocusSession {
    pub id: Uuid,
    pub user_id: String,
    pub task_id: Option<Uuid>,
    pub session_type: SessionType,
    pub status: SessionStatus,
    pub planned_duration_seconds: i64,
    pub actual_duration_seconds: i64,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordSessionRequest {
    pub task_id: Option<Uuid>,
    pub session_type: SessionType,
    pub status: SessionStatus,
    pub planned_duration_seconds: i64,
    pub actual_duration_seconds: i64,
    /// Defaults to `ended_at - actual_duration_seconds`
    pub started_at: Option<DateTime<Utc>>,
    /// Defaults to the time of the record call
    pub ended_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FocusSessionsResponse {
    pub sessions: Vec<FocusSession>,
}

// ============================================================================
// Daily Goal Types
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyGoal {
    pub user_id: String,
    pub date: NaiveDate,
    pub goal_minutes: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetDailyGoalRequest {
    pub date: NaiveDate,
    pub goal_minutes: i32,
}

// ============================================================================
// Analytics Types
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryStat {
    pub category_id: Option<Uuid>,
    pub name: String,
    pub color: String,
    pub minutes: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskSummary {
    pub task_id: Uuid,
    pub title: String,
    pub category_id: Option<Uuid>,
    pub category_name: String,
    pub category_color: String,
    pub status: TaskStatus,
    pub start_at: Option<DateTime<Utc>>,
    pub recurrence_parent_id: Option<Uuid>,
    pub focus_minutes: i64,
    pub estimated_minutes: i64,
    pub progress: i32,
}

/// A recurring series (or a standalone task) with its members rolled up
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupedTaskSummary {
    /// Parent id for a series, the task's own id for a standalone task
    pub group_id: Uuid,
    pub title: String,
    pub category_name: String,
    pub category_color: String,
    pub total_focus_minutes: i64,
    pub total_estimated_minutes: i64,
    /// Truncated percentage of the summed estimate covered by focus time
    pub progress: i32,
    pub completed_count: usize,
    pub member_count: usize,
    pub members: Vec<TaskSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailySessionRow {
    pub session_id: Uuid,
    pub task_id: Option<Uuid>,
    pub task_title: String,
    pub category_name: String,
    pub category_color: String,
    pub session_type: SessionType,
    pub status: SessionStatus,
    pub actual_minutes: i64,
    pub started_at: String,
    pub ended_at: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Day,
    Week,
    Month,
}

impl FromStr for Granularity {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "day" | "daily" => Ok(Granularity::Day),
            "week" | "weekly" => Ok(Granularity::Week),
            "month" | "monthly" => Ok(Granularity::Month),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollupBucket {
    pub period_start: NaiveDate,
    pub focus_minutes: i64,
    pub session_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EfficiencyScores {
    pub rhythm_quality: f64,
    pub volume_balance: f64,
    pub efficiency_score: f64,
    pub completion_rate: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyReport {
    pub date: NaiveDate,
    pub timezone: String,
    pub total_focus_minutes: i64,
    pub goal_minutes: i32,
    /// Actual focus minutes as a percentage of the goal (0 without a goal)
    pub goal_achievement: f64,
    pub scores: EfficiencyScores,
    pub categories: Vec<CategoryStat>,
    pub tasks: Vec<GroupedTaskSummary>,
    pub sessions: Vec<DailySessionRow>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeriodReport {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub timezone: String,
    pub granularity: Granularity,
    pub total_focus_minutes: i64,
    pub goal_minutes: i32,
    pub goal_achievement: f64,
    pub scores: EfficiencyScores,
    pub buckets: Vec<RollupBucket>,
    pub categories: Vec<CategoryStat>,
    pub tasks: Vec<GroupedTaskSummary>,
}

// ============================================================================
// Assistant Types
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantRequest {
    pub message: String,
    #[serde(default)]
    pub history: Vec<ChatTurn>,
    /// Window of tasks given to the model as context; defaults to the next week
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffAction {
    Create,
    Update,
    Delete,
}

/// A change to the task list proposed by the assistant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskDiff {
    pub action: DiffAction,
    #[serde(default)]
    pub id: Option<Uuid>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: Option<TaskStatus>,
    #[serde(default)]
    pub estimated_pomodoros: Option<i32>,
    #[serde(default)]
    pub start_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssistantReply {
    #[serde(default)]
    pub tasks: Vec<TaskDiff>,
    #[serde(default)]
    pub advice: String,
}

// ============================================================================
// API Response Types
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub error: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiSuccess<T> {
    pub data: T,
}

impl<T> ApiSuccess<T> {
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

// ============================================================================
// Tests
// ============================================================================
