//! Scoring formulas for the analytics dashboards. Pure functions, no I/O.

/// Share of sessions that ran to completion, in percent
pub fn rhythm_quality(completed: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    completed as f64 / total as f64 * 100.0
}

/// How close the actual focus time came to the goal, in percent.
///
/// Overshooting is penalized symmetrically: 150% of the goal scores the same
/// as 50%, and anything at or above 200% scores zero.
pub fn volume_balance(actual_minutes: f64, goal_minutes: f64) -> f64 {
    if goal_minutes <= 0.0 {
        return 0.0;
    }
    let achievement = actual_minutes / goal_minutes * 100.0;
    if achievement <= 100.0 {
        achievement
    } else {
        (200.0 - achievement).max(0.0)
    }
}

pub fn efficiency_score(rhythm_quality: f64, volume_balance: f64) -> f64 {
    (rhythm_quality + volume_balance) / 2.0
}

/// Task progress in percent, truncated toward zero
pub fn progress(focus_minutes: i64, estimated_minutes: i64, completed: bool) -> i32 {
    if estimated_minutes > 0 {
        (focus_minutes * 100 / estimated_minutes) as i32
    } else if completed {
        100
    } else {
        0
    }
}

pub fn completion_rate(completed: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    completed as f64 / total as f64 * 100.0
}
