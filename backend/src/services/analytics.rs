use chrono::{DateTime, Datelike, Duration, Months, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use sqlx::SqlitePool;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use thiserror::Error;
use uuid::Uuid;

use crate::services::categories::{self, CategoryError};
use crate::services::daily_goals::{self, DailyGoalError};
use crate::services::efficiency;
use crate::services::focus_sessions::{self, FocusSessionError};
use crate::services::tasks::{self, TaskError};
use shared::{
    Category, CategoryStat, DailyReport, DailySessionRow, EfficiencyScores, FocusSession,
    Granularity, GroupedTaskSummary, PeriodReport, RollupBucket, SessionStatus, SessionType, Task,
    TaskSummary, DEFAULT_CATEGORY_COLOR, OTHERS_CATEGORY_NAME, UNCATEGORIZED_NAME,
    UNKNOWN_TASK_TITLE,
};

/// Longest range a period report may cover, in days
pub const MAX_REPORT_DAYS: i64 = 366;

#[derive(Debug, Error)]
pub enum AnalyticsError {
    #[error("Invalid date range")]
    InvalidRange,
    #[error("Unknown timezone: {0}")]
    InvalidTimezone(String),
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
    #[error(transparent)]
    Tasks(#[from] TaskError),
    #[error(transparent)]
    Sessions(#[from] FocusSessionError),
    #[error(transparent)]
    Categories(#[from] CategoryError),
    #[error(transparent)]
    Goals(#[from] DailyGoalError),
}

// ============================================================================
// Aggregation
// ============================================================================

fn seconds_to_minutes(seconds: i64) -> i64 {
    seconds / 60
}

fn category_of<'a>(
    session: &FocusSession,
    tasks: &HashMap<Uuid, Task>,
    categories: &'a HashMap<Uuid, Category>,
) -> Option<&'a Category> {
    session
        .task_id
        .and_then(|task_id| tasks.get(&task_id))
        .and_then(|task| task.category_id)
        .and_then(|category_id| categories.get(&category_id))
}

fn display_color(category: &Category) -> String {
    category
        .color
        .clone()
        .unwrap_or_else(|| DEFAULT_CATEGORY_COLOR.to_string())
}

/// Focus time per category. Sessions whose task or category cannot be
/// resolved land in one "Uncategorized" bucket with no id.
pub fn aggregate_by_category(
    sessions: &[FocusSession],
    tasks: &HashMap<Uuid, Task>,
    categories: &HashMap<Uuid, Category>,
) -> Vec<CategoryStat> {
    let mut seconds: HashMap<Option<Uuid>, i64> = HashMap::new();
    for session in sessions {
        let key = category_of(session, tasks, categories).map(|c| c.id);
        *seconds.entry(key).or_insert(0) += session.actual_duration_seconds;
    }

    let mut stats: Vec<CategoryStat> = seconds
        .into_iter()
        .map(|(category_id, total)| {
            let (name, color) = match category_id.and_then(|id| categories.get(&id)) {
                Some(category) => (category.name.clone(), display_color(category)),
                None => (
                    UNCATEGORIZED_NAME.to_string(),
                    DEFAULT_CATEGORY_COLOR.to_string(),
                ),
            };
            CategoryStat {
                category_id,
                name,
                color,
                minutes: seconds_to_minutes(total),
            }
        })
        .collect();

    stats.sort_by(|a, b| b.minutes.cmp(&a.minutes).then_with(|| a.name.cmp(&b.name)));
    stats
}

fn focus_seconds_by_task(sessions: &[FocusSession]) -> HashMap<Uuid, i64> {
    let mut seconds = HashMap::new();
    for session in sessions {
        if let Some(task_id) = session.task_id {
            *seconds.entry(task_id).or_insert(0) += session.actual_duration_seconds;
        }
    }
    seconds
}

/// Progress in percent, rounded to the nearest integer
fn rounded_progress(focus_minutes: i64, estimated_minutes: i64, completed: bool) -> i32 {
    if estimated_minutes > 0 {
        (focus_minutes as f64 / estimated_minutes as f64 * 100.0).round() as i32
    } else if completed {
        100
    } else {
        0
    }
}

fn compare_summaries(a: &TaskSummary, b: &TaskSummary) -> Ordering {
    let by_start = match (a.start_at, b.start_at) {
        (Some(a_start), Some(b_start)) => b_start.cmp(&a_start),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    by_start.then_with(|| b.task_id.cmp(&a.task_id))
}

/// One summary per task that was either scheduled in the range or worked
/// on in the range. Scheduled tasks win when a task appears in both.
pub fn build_task_summaries(
    scheduled: &[Task],
    session_tasks: &[Task],
    sessions: &[FocusSession],
    categories: &HashMap<Uuid, Category>,
    focus_duration_minutes: i64,
) -> Vec<TaskSummary> {
    let focus_seconds = focus_seconds_by_task(sessions);

    let mut seen = HashSet::new();
    let mut summaries = Vec::new();

    for task in scheduled.iter().chain(session_tasks) {
        if !seen.insert(task.id) {
            continue;
        }

        let category = task.category_id.and_then(|id| categories.get(&id));
        let focus_minutes = seconds_to_minutes(focus_seconds.get(&task.id).copied().unwrap_or(0));
        let estimated_minutes = task.estimated_pomodoros as i64 * focus_duration_minutes;

        summaries.push(TaskSummary {
            task_id: task.id,
            title: task.title.clone(),
            category_id: category.map(|c| c.id),
            category_name: category
                .map(|c| c.name.clone())
                .unwrap_or_else(|| UNCATEGORIZED_NAME.to_string()),
            category_color: category
                .map(display_color)
                .unwrap_or_else(|| DEFAULT_CATEGORY_COLOR.to_string()),
            status: task.status,
            start_at: task.start_at,
            recurrence_parent_id: task.recurrence_parent_id,
            focus_minutes,
            estimated_minutes,
            progress: rounded_progress(
                focus_minutes,
                estimated_minutes,
                task.status.is_completed(),
            ),
        });
    }

    summaries.sort_by(compare_summaries);
    summaries
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum GroupKey {
    Series(Uuid),
    Standalone(Uuid),
}

/// Roll recurring occurrences up under their parent id. Summaries without a
/// parent id stay on their own.
pub fn group_task_summaries(summaries: Vec<TaskSummary>) -> Vec<GroupedTaskSummary> {
    let mut order: Vec<GroupKey> = Vec::new();
    let mut members: HashMap<GroupKey, Vec<TaskSummary>> = HashMap::new();

    for summary in summaries {
        let key = match summary.recurrence_parent_id {
            Some(parent_id) => GroupKey::Series(parent_id),
            None => GroupKey::Standalone(summary.task_id),
        };
        if !members.contains_key(&key) {
            order.push(key);
        }
        members.entry(key).or_default().push(summary);
    }

    let mut groups: Vec<GroupedTaskSummary> = order
        .into_iter()
        .filter_map(|key| {
            let members = members.remove(&key)?;
            let first = members.first()?;
            let group_id = match key {
                GroupKey::Series(id) | GroupKey::Standalone(id) => id,
            };
            let total_focus_minutes: i64 = members.iter().map(|m| m.focus_minutes).sum();
            let total_estimated_minutes: i64 = members.iter().map(|m| m.estimated_minutes).sum();
            let completed_count = members.iter().filter(|m| m.status.is_completed()).count();
            Some(GroupedTaskSummary {
                group_id,
                title: first.title.clone(),
                category_name: first.category_name.clone(),
                category_color: first.category_color.clone(),
                total_focus_minutes,
                total_estimated_minutes,
                progress: efficiency::progress(
                    total_focus_minutes,
                    total_estimated_minutes,
                    completed_count == members.len(),
                ),
                completed_count,
                member_count: members.len(),
                members,
            })
        })
        .collect();

    groups.sort_by(|a, b| b.total_focus_minutes.cmp(&a.total_focus_minutes));
    groups
}

/// One display row per session, with fallbacks for deleted tasks or categories
pub fn map_daily_sessions(
    sessions: &[FocusSession],
    tasks: &HashMap<Uuid, Task>,
    categories: &HashMap<Uuid, Category>,
) -> Vec<DailySessionRow> {
    sessions
        .iter()
        .map(|session| {
            let task = session.task_id.and_then(|id| tasks.get(&id));
            let category = category_of(session, tasks, categories);

            DailySessionRow {
                session_id: session.id,
                task_id: session.task_id,
                task_title: task
                    .map(|t| t.title.clone())
                    .unwrap_or_else(|| UNKNOWN_TASK_TITLE.to_string()),
                category_name: category
                    .map(|c| c.name.clone())
                    .unwrap_or_else(|| OTHERS_CATEGORY_NAME.to_string()),
                category_color: category
                    .map(display_color)
                    .unwrap_or_else(|| DEFAULT_CATEGORY_COLOR.to_string()),
                session_type: session.session_type,
                status: session.status,
                actual_minutes: seconds_to_minutes(session.actual_duration_seconds),
                started_at: session.started_at.to_rfc3339(),
                ended_at: session.ended_at.to_rfc3339(),
            }
        })
        .collect()
}

// ============================================================================
// Period rollups
// ============================================================================

/// First day of the bucket containing `date`. Weeks start on Monday.
pub fn period_start(date: NaiveDate, granularity: Granularity) -> NaiveDate {
    match granularity {
        Granularity::Day => date,
        Granularity::Week => date - Duration::days(date.weekday().num_days_from_monday() as i64),
        Granularity::Month => date.with_day(1).unwrap_or(date),
    }
}

fn next_period(start: NaiveDate, granularity: Granularity) -> Option<NaiveDate> {
    match granularity {
        Granularity::Day => start.succ_opt(),
        Granularity::Week => start.checked_add_signed(Duration::days(7)),
        Granularity::Month => start.checked_add_months(Months::new(1)),
    }
}

/// Focus minutes per day, week or month of the inclusive range, in local
/// time. Every bucket of the range is present, empty ones with zeros.
pub fn rollup_by_period(
    sessions: &[FocusSession],
    granularity: Granularity,
    tz: Tz,
    from: NaiveDate,
    to: NaiveDate,
) -> Vec<RollupBucket> {
    let mut buckets: Vec<(NaiveDate, i64, usize)> = Vec::new();
    let last = period_start(to, granularity);
    let mut cursor = Some(period_start(from, granularity));
    while let Some(start) = cursor.filter(|s| *s <= last) {
        buckets.push((start, 0, 0));
        cursor = next_period(start, granularity);
    }

    for session in sessions {
        let local_date = session.started_at.with_timezone(&tz).date_naive();
        let key = period_start(local_date, granularity);
        if let Some(bucket) = buckets.iter_mut().find(|(start, _, _)| *start == key) {
            bucket.1 += session.actual_duration_seconds;
            bucket.2 += 1;
        }
    }

    buckets
        .into_iter()
        .map(|(period_start, seconds, session_count)| RollupBucket {
            period_start,
            focus_minutes: seconds_to_minutes(seconds),
            session_count,
        })
        .collect()
}

// ============================================================================
// Reports
// ============================================================================

pub fn parse_timezone(name: &str) -> Result<Tz, AnalyticsError> {
    name.parse::<Tz>()
        .map_err(|_| AnalyticsError::InvalidTimezone(name.to_string()))
}

/// UTC instant at which `date` begins in `tz`
pub fn local_day_start(date: NaiveDate, tz: Tz) -> DateTime<Utc> {
    let midnight = date.and_time(NaiveTime::MIN);
    tz.from_local_datetime(&midnight)
        .earliest()
        .map(|local| local.with_timezone(&Utc))
        .unwrap_or_else(|| Utc.from_utc_datetime(&midnight))
}

fn percent_of(actual: i64, goal: i64) -> f64 {
    if goal <= 0 {
        return 0.0;
    }
    actual as f64 / goal as f64 * 100.0
}

/// Everything the reports need about one time window
struct Snapshot {
    sessions: Vec<FocusSession>,
    focus_sessions: Vec<FocusSession>,
    scheduled: Vec<Task>,
    session_tasks: Vec<Task>,
    tasks_by_id: HashMap<Uuid, Task>,
    categories: HashMap<Uuid, Category>,
}

async fn load_snapshot(
    pool: &SqlitePool,
    user_id: &str,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Result<Snapshot, AnalyticsError> {
    let sessions = focus_sessions::list_sessions(pool, user_id, Some(from), Some(to)).await?;
    let scheduled = tasks::list_tasks_between(pool, user_id, from, to).await?;

    let scheduled_ids: HashSet<Uuid> = scheduled.iter().map(|t| t.id).collect();
    let mut extra_ids: Vec<Uuid> = sessions
        .iter()
        .filter_map(|s| s.task_id)
        .filter(|id| !scheduled_ids.contains(id))
        .collect();
    extra_ids.sort();
    extra_ids.dedup();
    let session_tasks = tasks::get_tasks_by_ids(pool, user_id, &extra_ids).await?;

    let categories = categories::category_map(pool, user_id).await?;

    let tasks_by_id = scheduled
        .iter()
        .chain(&session_tasks)
        .map(|t| (t.id, t.clone()))
        .collect();
    let focus_sessions = sessions
        .iter()
        .filter(|s| s.session_type == SessionType::Focus)
        .cloned()
        .collect();

    Ok(Snapshot {
        sessions,
        focus_sessions,
        scheduled,
        session_tasks,
        tasks_by_id,
        categories,
    })
}

fn score(snapshot: &Snapshot, summaries: &[TaskSummary], total_minutes: i64, goal_minutes: i64) -> EfficiencyScores {
    let completed_sessions = snapshot
        .focus_sessions
        .iter()
        .filter(|s| s.status == SessionStatus::Completed)
        .count();
    let rhythm_quality =
        efficiency::rhythm_quality(completed_sessions, snapshot.focus_sessions.len());
    let volume_balance = efficiency::volume_balance(total_minutes as f64, goal_minutes as f64);
    let completed_tasks = summaries.iter().filter(|s| s.status.is_completed()).count();

    EfficiencyScores {
        rhythm_quality,
        volume_balance,
        efficiency_score: efficiency::efficiency_score(rhythm_quality, volume_balance),
        completion_rate: efficiency::completion_rate(completed_tasks, summaries.len()),
    }
}

fn total_focus_minutes(sessions: &[FocusSession]) -> i64 {
    seconds_to_minutes(sessions.iter().map(|s| s.actual_duration_seconds).sum())
}

pub async fn daily_report(
    pool: &SqlitePool,
    user_id: &str,
    date: NaiveDate,
    tz: Tz,
    focus_duration_minutes: i64,
) -> Result<DailyReport, AnalyticsError> {
    let next_day = date.succ_opt().ok_or(AnalyticsError::InvalidRange)?;
    let snapshot = load_snapshot(
        pool,
        user_id,
        local_day_start(date, tz),
        local_day_start(next_day, tz),
    )
    .await?;

    let goal_minutes = daily_goals::get_goal(pool, user_id, date)
        .await?
        .map(|g| g.goal_minutes)
        .unwrap_or(0);

    let total = total_focus_minutes(&snapshot.focus_sessions);
    let summaries = build_task_summaries(
        &snapshot.scheduled,
        &snapshot.session_tasks,
        &snapshot.focus_sessions,
        &snapshot.categories,
        focus_duration_minutes,
    );
    let scores = score(&snapshot, &summaries, total, goal_minutes as i64);

    Ok(DailyReport {
        date,
        timezone: tz.name().to_string(),
        total_focus_minutes: total,
        goal_minutes,
        goal_achievement: percent_of(total, goal_minutes as i64),
        scores,
        categories: aggregate_by_category(
            &snapshot.focus_sessions,
            &snapshot.tasks_by_id,
            &snapshot.categories,
        ),
        tasks: group_task_summaries(summaries),
        sessions: map_daily_sessions(
            &snapshot.sessions,
            &snapshot.tasks_by_id,
            &snapshot.categories,
        ),
    })
}

/// Report over an inclusive date range (a week, a month or any custom range)
pub async fn period_report(
    pool: &SqlitePool,
    user_id: &str,
    from: NaiveDate,
    to: NaiveDate,
    granularity: Granularity,
    tz: Tz,
    focus_duration_minutes: i64,
) -> Result<PeriodReport, AnalyticsError> {
    if to < from || (to - from).num_days() >= MAX_REPORT_DAYS {
        return Err(AnalyticsError::InvalidRange);
    }
    let after_end = to.succ_opt().ok_or(AnalyticsError::InvalidRange)?;

    let snapshot = load_snapshot(
        pool,
        user_id,
        local_day_start(from, tz),
        local_day_start(after_end, tz),
    )
    .await?;

    let goal_total = daily_goals::sum_goal_minutes(pool, user_id, from, to).await?;
    let total = total_focus_minutes(&snapshot.focus_sessions);
    let summaries = build_task_summaries(
        &snapshot.scheduled,
        &snapshot.session_tasks,
        &snapshot.focus_sessions,
        &snapshot.categories,
        focus_duration_minutes,
    );
    let scores = score(&snapshot, &summaries, total, goal_total);

    log::debug!(
        "Period report for user {} from {} to {}: {} focus minutes",
        user_id,
        from,
        to,
        total
    );

    Ok(PeriodReport {
        from,
        to,
        timezone: tz.name().to_string(),
        granularity,
        total_focus_minutes: total,
        goal_minutes: i32::try_from(goal_total).unwrap_or(i32::MAX),
        goal_achievement: percent_of(total, goal_total),
        scores,
        buckets: rollup_by_period(&snapshot.focus_sessions, granularity, tz, from, to),
        categories: aggregate_by_category(
            &snapshot.focus_sessions,
            &snapshot.tasks_by_id,
            &snapshot.categories,
        ),
        tasks: group_task_summaries(summaries),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;
    use crate::services::task_lists::create_list;
    use shared::{
        CreateCategoryRequest, CreateTaskListRequest, CreateTaskRequest, RecordSessionRequest,
        SetDailyGoalRequest, TaskStatus,
    };

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, day, hour, 0, 0).unwrap()
    }

    fn make_task(category_id: Option<Uuid>, parent: Option<Uuid>, start_at: Option<DateTime<Utc>>) -> Task {
        Task {
            id: Uuid::new_v4(),
            user_id: "alice".to_string(),
            list_id: Uuid::new_v4(),
            title: "Task".to_string(),
            description: None,
            status: TaskStatus::Pending,
            category_id,
            estimated_pomodoros: 0,
            start_at,
            end_at: None,
            all_day: false,
            is_recurring: parent.is_some(),
            recurrence_parent_id: parent,
            subtasks: Vec::new(),
            created_at: at(1, 0),
            updated_at: at(1, 0),
        }
    }

    fn make_session(task_id: Option<Uuid>, seconds: i64, started_at: DateTime<Utc>) -> FocusSession {
        FocusSession {
            id: Uuid::new_v4(),
            user_id: "alice".to_string(),
            task_id,
            session_type: SessionType::Focus,
            status: SessionStatus::Completed,
            planned_duration_seconds: 1500,
            actual_duration_seconds: seconds,
            started_at,
            ended_at: started_at + Duration::seconds(seconds),
        }
    }

    fn make_category(name: &str) -> Category {
        Category {
            id: Uuid::new_v4(),
            user_id: "alice".to_string(),
            name: name.to_string(),
            color: Some("#112233".to_string()),
            created_at: at(1, 0),
        }
    }

    fn make_summary(parent: Option<Uuid>, focus_minutes: i64, status: TaskStatus) -> TaskSummary {
        TaskSummary {
            task_id: Uuid::new_v4(),
            title: "Summary".to_string(),
            category_id: None,
            category_name: UNCATEGORIZED_NAME.to_string(),
            category_color: DEFAULT_CATEGORY_COLOR.to_string(),
            status,
            start_at: None,
            recurrence_parent_id: parent,
            focus_minutes,
            estimated_minutes: 0,
            progress: 0,
        }
    }

    #[test]
    fn test_sessions_without_tasks_fall_into_uncategorized() {
        let sessions = vec![
            make_session(None, 1500, at(1, 9)),
            make_session(Some(Uuid::new_v4()), 1000, at(1, 10)),
            make_session(None, 59, at(1, 11)),
        ];

        let stats = aggregate_by_category(&sessions, &HashMap::new(), &HashMap::new());

        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].category_id, None);
        assert_eq!(stats[0].name, UNCATEGORIZED_NAME);
        assert_eq!(stats[0].color, DEFAULT_CATEGORY_COLOR);
        // Seconds are summed before the integer division
        assert_eq!(stats[0].minutes, (1500 + 1000 + 59) / 60);
    }

    #[test]
    fn test_category_aggregation_sorted_by_minutes() {
        let work = make_category("Work");
        let study = make_category("Study");
        let work_task = make_task(Some(work.id), None, None);
        let study_task = make_task(Some(study.id), None, None);
        let orphan_task = make_task(Some(Uuid::new_v4()), None, None);

        let sessions = vec![
            make_session(Some(work_task.id), 600, at(1, 9)),
            make_session(Some(study_task.id), 1800, at(1, 10)),
            make_session(Some(orphan_task.id), 120, at(1, 11)),
        ];
        let tasks: HashMap<Uuid, Task> = [work_task, study_task, orphan_task]
            .into_iter()
            .map(|t| (t.id, t))
            .collect();
        let categories: HashMap<Uuid, Category> =
            [work.clone(), study.clone()].into_iter().map(|c| (c.id, c)).collect();

        let stats = aggregate_by_category(&sessions, &tasks, &categories);

        assert_eq!(stats.len(), 3);
        assert_eq!(stats[0].category_id, Some(study.id));
        assert_eq!(stats[0].minutes, 30);
        assert_eq!(stats[1].name, "Work");
        assert_eq!(stats[2].category_id, None);
        assert_eq!(stats[2].minutes, 2);
    }

    #[test]
    fn test_summaries_union_first_seen_wins() {
        let scheduled = make_task(None, None, Some(at(2, 9)));
        let mut duplicate = scheduled.clone();
        duplicate.title = "Stale copy".to_string();
        let outside = make_task(None, None, Some(at(1, 9)));

        let sessions = vec![
            make_session(Some(scheduled.id), 1200, at(2, 9)),
            make_session(Some(outside.id), 600, at(2, 10)),
        ];

        let summaries = build_task_summaries(
            &[scheduled.clone()],
            &[duplicate, outside.clone()],
            &sessions,
            &HashMap::new(),
            25,
        );

        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].task_id, scheduled.id);
        assert_eq!(summaries[0].title, "Task");
        assert_eq!(summaries[0].focus_minutes, 20);
        assert_eq!(summaries[1].task_id, outside.id);
        assert_eq!(summaries[1].focus_minutes, 10);
    }

    #[test]
    fn test_summaries_sort_nulls_last() {
        let unscheduled = make_task(None, None, None);
        let early = make_task(None, None, Some(at(1, 9)));
        let late = make_task(None, None, Some(at(3, 9)));

        let summaries = build_task_summaries(
            &[unscheduled.clone(), early.clone(), late.clone()],
            &[],
            &[],
            &HashMap::new(),
            25,
        );

        let order: Vec<Uuid> = summaries.iter().map(|s| s.task_id).collect();
        assert_eq!(order, vec![late.id, early.id, unscheduled.id]);
    }

    #[test]
    fn test_rounded_progress() {
        assert_eq!(rounded_progress(50, 150, false), 33);
        assert_eq!(rounded_progress(2, 3, false), 67);
        assert_eq!(rounded_progress(0, 0, true), 100);
        assert_eq!(rounded_progress(30, 0, false), 0);
        // The calculator truncates where the aggregator rounds
        assert_eq!(efficiency::progress(50, 150, false), 33);
        assert_eq!(efficiency::progress(2, 3, false), 66);
    }

    #[test]
    fn test_summary_progress_uses_focus_duration() {
        let mut task = make_task(None, None, Some(at(1, 9)));
        task.estimated_pomodoros = 2;
        let sessions = vec![make_session(Some(task.id), 25 * 60, at(1, 9))];

        let summaries = build_task_summaries(&[task], &[], &sessions, &HashMap::new(), 25);

        assert_eq!(summaries[0].estimated_minutes, 50);
        assert_eq!(summaries[0].progress, 50);
    }

    #[test]
    fn test_summary_minutes_sum_seconds_before_converting() {
        let task = make_task(None, None, Some(at(1, 9)));
        let sessions = vec![
            make_session(Some(task.id), 90, at(1, 9)),
            make_session(Some(task.id), 90, at(1, 10)),
        ];

        let summaries = build_task_summaries(&[task], &[], &sessions, &HashMap::new(), 25);

        assert_eq!(summaries[0].focus_minutes, 3);
    }

    #[test]
    fn test_grouping_by_parent() {
        let parent_id = Uuid::new_v4();
        let summaries = vec![
            make_summary(Some(parent_id), 25, TaskStatus::Completed),
            make_summary(None, 10, TaskStatus::Pending),
            make_summary(Some(parent_id), 50, TaskStatus::Pending),
        ];
        let standalone_id = summaries[1].task_id;

        let groups = group_task_summaries(summaries);

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].group_id, parent_id);
        assert_eq!(groups[0].member_count, 2);
        assert_eq!(groups[0].total_focus_minutes, 75);
        assert_eq!(groups[0].completed_count, 1);
        assert_eq!(groups[1].group_id, standalone_id);
        assert_eq!(groups[1].member_count, 1);
    }

    #[test]
    fn test_group_progress_truncates_summed_minutes() {
        let parent_id = Uuid::new_v4();
        let mut first = make_summary(Some(parent_id), 20, TaskStatus::Completed);
        first.estimated_minutes = 50;
        let mut second = make_summary(Some(parent_id), 30, TaskStatus::Pending);
        second.estimated_minutes = 100;

        let groups = group_task_summaries(vec![first, second]);

        assert_eq!(groups[0].total_estimated_minutes, 150);
        // 50 of 150 minutes is 33.3%
        assert_eq!(groups[0].progress, 33);
    }

    #[test]
    fn test_group_progress_without_estimate() {
        let parent_id = Uuid::new_v4();
        let done = vec![
            make_summary(Some(parent_id), 10, TaskStatus::Completed),
            make_summary(Some(parent_id), 5, TaskStatus::Completed),
        ];
        let open = vec![
            make_summary(None, 10, TaskStatus::Completed),
            make_summary(None, 0, TaskStatus::Pending),
        ];

        assert_eq!(group_task_summaries(done)[0].progress, 100);

        let groups = group_task_summaries(open);
        let pending = groups.iter().find(|g| g.completed_count == 0).unwrap();
        assert_eq!(pending.progress, 0);
    }

    #[test]
    fn test_map_daily_sessions_fallbacks() {
        let task = make_task(None, None, None);
        let tasks: HashMap<Uuid, Task> = [(task.id, task.clone())].into_iter().collect();
        let mut sessions = vec![
            make_session(Some(task.id), 1500, at(1, 9)),
            make_session(None, 300, at(1, 10)),
        ];
        sessions[1].session_type = SessionType::ShortBreak;

        let rows = map_daily_sessions(&sessions, &tasks, &HashMap::new());

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].task_title, "Task");
        assert_eq!(rows[0].category_name, OTHERS_CATEGORY_NAME);
        assert_eq!(rows[0].actual_minutes, 25);
        assert_eq!(rows[0].started_at, "2024-01-01T09:00:00+00:00");
        assert_eq!(rows[1].task_title, UNKNOWN_TASK_TITLE);
        assert_eq!(rows[1].session_type, SessionType::ShortBreak);
    }

    #[test]
    fn test_rollup_fills_gaps() {
        let sessions = vec![
            make_session(None, 600, at(1, 9)),
            make_session(None, 1200, at(3, 9)),
            make_session(None, 1200, at(3, 15)),
        ];

        let days = rollup_by_period(
            &sessions,
            Granularity::Day,
            Tz::UTC,
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 3).unwrap(),
        );
        assert_eq!(days.len(), 3);
        assert_eq!(days[1].focus_minutes, 0);
        assert_eq!(days[2].focus_minutes, 40);
        assert_eq!(days[2].session_count, 2);

        let weeks = rollup_by_period(
            &sessions,
            Granularity::Week,
            Tz::UTC,
            NaiveDate::from_ymd_opt(2023, 12, 28).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 3).unwrap(),
        );
        assert_eq!(weeks.len(), 2);
        assert_eq!(weeks[0].period_start, NaiveDate::from_ymd_opt(2023, 12, 25).unwrap());
        assert_eq!(weeks[1].focus_minutes, 50);
    }

    #[test]
    fn test_rollup_uses_local_dates() {
        // 23:30 UTC on Jan 1 is already Jan 2 in Berlin
        let sessions = vec![make_session(None, 600, Utc.with_ymd_and_hms(2024, 1, 1, 23, 30, 0).unwrap())];

        let days = rollup_by_period(
            &sessions,
            Granularity::Day,
            chrono_tz::Europe::Berlin,
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
        );
        assert_eq!(days[0].focus_minutes, 0);
        assert_eq!(days[1].focus_minutes, 10);
    }

    #[test]
    fn test_local_day_start_and_timezone_parsing() {
        let berlin = parse_timezone("Europe/Berlin").unwrap();
        let start = local_day_start(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(), berlin);
        assert_eq!(start, Utc.with_ymd_and_hms(2024, 1, 1, 23, 0, 0).unwrap());

        assert!(matches!(
            parse_timezone("Mars/Olympus"),
            Err(AnalyticsError::InvalidTimezone(_))
        ));
    }

    #[actix_rt::test]
    async fn test_daily_report_end_to_end() {
        let pool = test_pool().await;
        let list = create_list(&pool, "alice", &CreateTaskListRequest { name: "Inbox".to_string() })
            .await
            .unwrap();
        let category = categories::create_category(
            &pool,
            "alice",
            &CreateCategoryRequest { name: "Work".to_string(), color: None },
        )
        .await
        .unwrap();

        let request = CreateTaskRequest {
            list_id: list.id,
            title: "Write report".to_string(),
            description: None,
            status: None,
            category_id: Some(category.id),
            estimated_pomodoros: 2,
            start_at: Some(at(2, 9)),
            end_at: None,
            all_day: false,
            is_recurring: false,
            recurrence: None,
            dates: Vec::new(),
            subtasks: Vec::new(),
        };
        let task = tasks::create_task(&pool, "alice", &request).await.unwrap();

        let record = |task_id, session_type, status, seconds, hour| RecordSessionRequest {
            task_id,
            session_type,
            status,
            planned_duration_seconds: 1500,
            actual_duration_seconds: seconds,
            started_at: Some(at(2, hour)),
            ended_at: Some(at(2, hour) + Duration::seconds(seconds)),
        };
        for request in [
            record(Some(task.id), SessionType::Focus, SessionStatus::Completed, 1500, 9),
            record(Some(task.id), SessionType::Focus, SessionStatus::Interrupted, 900, 10),
            record(None, SessionType::ShortBreak, SessionStatus::Completed, 300, 11),
        ] {
            focus_sessions::record_session(&pool, "alice", &request).await.unwrap();
        }
        daily_goals::set_goal(
            &pool,
            "alice",
            &SetDailyGoalRequest { date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(), goal_minutes: 80 },
        )
        .await
        .unwrap();

        let report = daily_report(
            &pool,
            "alice",
            NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            Tz::UTC,
            25,
        )
        .await
        .unwrap();

        assert_eq!(report.total_focus_minutes, 40);
        assert_eq!(report.goal_minutes, 80);
        assert_eq!(report.goal_achievement, 50.0);
        assert_eq!(report.scores.rhythm_quality, 50.0);
        assert_eq!(report.scores.volume_balance, 50.0);
        assert_eq!(report.scores.efficiency_score, 50.0);
        assert_eq!(report.scores.completion_rate, 0.0);
        assert_eq!(report.categories.len(), 1);
        assert_eq!(report.categories[0].name, "Work");
        assert_eq!(report.tasks.len(), 1);
        assert_eq!(report.tasks[0].members[0].progress, 80);
        assert_eq!(report.sessions.len(), 3);

        // Other users see nothing
        let empty = daily_report(
            &pool,
            "bob",
            NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            Tz::UTC,
            25,
        )
        .await
        .unwrap();
        assert_eq!(empty.total_focus_minutes, 0);
        assert!(empty.sessions.is_empty());
    }

    #[actix_rt::test]
    async fn test_period_report_rejects_bad_ranges() {
        let pool = test_pool().await;
        let from = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();

        assert!(matches!(
            period_report(&pool, "alice", from, from - Duration::days(1), Granularity::Day, Tz::UTC, 25).await,
            Err(AnalyticsError::InvalidRange)
        ));
        assert!(matches!(
            period_report(&pool, "alice", from, from + Duration::days(400), Granularity::Day, Tz::UTC, 25).await,
            Err(AnalyticsError::InvalidRange)
        ));

        let report = period_report(&pool, "alice", from, from + Duration::days(6), Granularity::Day, Tz::UTC, 25)
            .await
            .unwrap();
        assert_eq!(report.buckets.len(), 7);
        assert_eq!(report.scores.efficiency_score, 0.0);
    }
}
