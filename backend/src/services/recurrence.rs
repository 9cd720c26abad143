use chrono::{DateTime, Datelike, Duration, Months, NaiveDate, NaiveTime, TimeZone, Utc, Weekday};
use shared::{CreateTaskRequest, RecurrenceFrequency, RecurrenceRule};
use thiserror::Error;

/// Upper bound on the number of occurrences a single series can produce.
/// Applies to every rule, including ones without `count` or `until`.
pub const MAX_OCCURRENCES: usize = 365;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RecurrenceError {
    #[error("Recurrence interval must be at least 1")]
    InvalidInterval,
    #[error("Recurrence rule cannot have both count and until")]
    ConflictingBounds,
    #[error("Recurrence count must be at least 1")]
    InvalidCount,
    #[error("Recurrence rule requires a start date")]
    MissingStartDate,
    #[error("Custom recurrence requires at least one date")]
    EmptyCustomDates,
    #[error("Recurrence rule produces no occurrences")]
    NoOccurrences,
}

/// Scheduled timestamps for one materialized task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Occurrence {
    pub start_at: Option<DateTime<Utc>>,
    pub end_at: Option<DateTime<Utc>>,
}

pub fn validate_rule(rule: &RecurrenceRule) -> Result<(), RecurrenceError> {
    if rule.interval < 1 {
        return Err(RecurrenceError::InvalidInterval);
    }
    if rule.count.is_some() && rule.until.is_some() {
        return Err(RecurrenceError::ConflictingBounds);
    }
    if rule.count == Some(0) {
        return Err(RecurrenceError::InvalidCount);
    }
    if rule.frequency == RecurrenceFrequency::Custom && rule.occurs.is_empty() {
        return Err(RecurrenceError::EmptyCustomDates);
    }
    Ok(())
}

/// Expand a rule (or an explicit date list) into ordered occurrence dates.
///
/// Without a rule the explicit dates are returned as given; without either,
/// the start date alone (or nothing for an unscheduled task).
pub fn expand(
    rule: Option<&RecurrenceRule>,
    explicit_dates: &[NaiveDate],
    start: Option<NaiveDate>,
) -> Result<Vec<NaiveDate>, RecurrenceError> {
    let rule = match rule {
        Some(rule) => rule,
        None if !explicit_dates.is_empty() => {
            return Ok(explicit_dates.iter().copied().take(MAX_OCCURRENCES).collect());
        }
        None => return Ok(start.into_iter().collect()),
    };

    validate_rule(rule)?;

    let interval = rule.interval;
    let dates = match rule.frequency {
        RecurrenceFrequency::Custom => custom_dates(rule),
        RecurrenceFrequency::Daily => {
            let start = start.ok_or(RecurrenceError::MissingStartDate)?;
            step_days(start, interval as i64, rule)
        }
        RecurrenceFrequency::Weekly => {
            let start = start.ok_or(RecurrenceError::MissingStartDate)?;
            if rule.weekdays.is_empty() {
                step_days(start, 7 * interval as i64, rule)
            } else {
                weekly_on_days(start, rule)
            }
        }
        RecurrenceFrequency::Monthly => {
            let start = start.ok_or(RecurrenceError::MissingStartDate)?;
            step_months(start, interval, rule)
        }
        RecurrenceFrequency::Yearly => {
            let start = start.ok_or(RecurrenceError::MissingStartDate)?;
            step_months(start, interval.saturating_mul(12), rule)
        }
    };

    if dates.is_empty() {
        return Err(RecurrenceError::NoOccurrences);
    }

    Ok(dates)
}

/// Turn a creation request into the timestamps of every task to create.
/// Dates come from the expansion, time-of-day and duration from the request.
pub fn plan_occurrences(request: &CreateTaskRequest) -> Result<Vec<Occurrence>, RecurrenceError> {
    let start_date = request.start_at.map(|s| s.date_naive());
    let mut dates = expand(request.recurrence.as_ref(), &request.dates, start_date)?;
    // Ascending; the first occurrence becomes the parent
    dates.sort();

    if dates.is_empty() {
        return Ok(vec![Occurrence {
            start_at: None,
            end_at: request.end_at,
        }]);
    }

    let time_of_day = request.start_at.map(|s| s.time()).unwrap_or(NaiveTime::MIN);
    let span = match (request.start_at, request.end_at) {
        (Some(start), Some(end)) => Some(end - start),
        _ => None,
    };

    Ok(dates
        .into_iter()
        .map(|date| {
            let start_at = Utc.from_utc_datetime(&date.and_time(time_of_day));
            let end_at = match (span, request.end_at) {
                (Some(span), _) => Some(start_at + span),
                (None, Some(end)) => Some(Utc.from_utc_datetime(&date.and_time(end.time()))),
                (None, None) => None,
            };
            Occurrence {
                start_at: Some(start_at),
                end_at,
            }
        })
        .collect())
}

fn limit(rule: &RecurrenceRule) -> usize {
    rule.count
        .map(|count| (count as usize).min(MAX_OCCURRENCES))
        .unwrap_or(MAX_OCCURRENCES)
}

fn past_until(rule: &RecurrenceRule, date: NaiveDate) -> bool {
    rule.until.is_some_and(|until| date > until)
}

fn custom_dates(rule: &RecurrenceRule) -> Vec<NaiveDate> {
    let mut dates: Vec<NaiveDate> = rule
        .occurs
        .iter()
        .copied()
        .filter(|date| !past_until(rule, *date))
        .collect();
    dates.sort();
    dates.dedup();
    dates.truncate(limit(rule));
    dates
}

fn step_days(start: NaiveDate, step: i64, rule: &RecurrenceRule) -> Vec<NaiveDate> {
    let limit = limit(rule);
    let mut dates = Vec::new();

    for k in 0..limit as i64 {
        let candidate = match Duration::try_days(k * step).and_then(|d| start.checked_add_signed(d)) {
            Some(date) => date,
            None => break,
        };
        if past_until(rule, candidate) {
            break;
        }
        dates.push(candidate);
    }

    dates
}

fn step_months(start: NaiveDate, step: u32, rule: &RecurrenceRule) -> Vec<NaiveDate> {
    let limit = limit(rule);
    let mut dates = Vec::new();

    for k in 0..limit as u32 {
        // Always offset from the start so a clamped month doesn't shift later ones
        let candidate = match k
            .checked_mul(step)
            .and_then(|months| start.checked_add_months(Months::new(months)))
        {
            Some(date) => date,
            None => break,
        };
        if past_until(rule, candidate) {
            break;
        }
        dates.push(candidate);
    }

    dates
}

fn weekly_on_days(start: NaiveDate, rule: &RecurrenceRule) -> Vec<NaiveDate> {
    let limit = limit(rule);
    let mut weekdays: Vec<Weekday> = rule.weekdays.clone();
    weekdays.sort_by_key(|day| day.num_days_from_monday());
    weekdays.dedup();

    let first_week = start - Duration::days(start.weekday().num_days_from_monday() as i64);
    let block_days = 7 * rule.interval as i64;
    let mut dates = Vec::new();

    for block in 0.. {
        let week_start = match Duration::try_days(block * block_days)
            .and_then(|d| first_week.checked_add_signed(d))
        {
            Some(date) => date,
            None => break,
        };
        if past_until(rule, week_start) {
            break;
        }

        for day in &weekdays {
            let candidate =
                match week_start.checked_add_signed(Duration::days(day.num_days_from_monday() as i64)) {
                    Some(date) => date,
                    None => return dates,
                };
            if candidate < start {
                continue;
            }
            if past_until(rule, candidate) {
                return dates;
            }
            dates.push(candidate);
            if dates.len() >= limit {
                return dates;
            }
        }
    }

    dates
}
