use chrono::{Datelike, NaiveDate};

use crate::models::{slot_or_zero, EvaluationMode, WeekStart, MONTHS, WEEKS};
use crate::weekly;

/// Rightmost month carrying any non-zero goal or progress, or -1.
pub fn find_last_index_with_data(goals: &[Option<f64>], progress: &[Option<f64>]) -> i32 {
    let mut last = -1;
    for month in 0..MONTHS {
        if slot_or_zero(goals, month) != 0.0 || slot_or_zero(progress, month) != 0.0 {
            last = month as i32;
        }
    }
    last
}

/// Latest month index (0-11) eligible for scoring, -1 when nothing is
/// evaluable yet, 11 when the whole year counts.
pub fn resolve_limit_index(
    goals: &[Option<f64>],
    progress: &[Option<f64>],
    year: i32,
    mode: EvaluationMode,
    today: NaiveDate,
) -> i32 {
    if year > today.year() {
        return -1;
    }
    if year < today.year() {
        return (MONTHS - 1) as i32;
    }

    let current_month = today.month0() as i32;
    match mode {
        EvaluationMode::Definitive => current_month - 1,
        EvaluationMode::RealTime => {
            let mut limit = find_last_index_with_data(goals, progress).min(current_month);
            // The running month often has a goal captured before any progress;
            // stepping back keeps it from scoring as a miss.
            if limit == current_month
                && slot_or_zero(progress, limit as usize) == 0.0
                && slot_or_zero(goals, limit as usize) != 0.0
            {
                limit -= 1;
            }
            limit
        }
    }
}

/// Weekly analogue of [`resolve_limit_index`]: latest evaluable slot of the
/// 53-slot weekly series.
pub fn resolve_week_limit(
    year: i32,
    mode: EvaluationMode,
    today: NaiveDate,
    week_start: WeekStart,
) -> i32 {
    if year > today.year() {
        return -1;
    }
    if year < today.year() {
        return (WEEKS - 1) as i32;
    }

    let current_week = weekly::week_index_of(today, year, week_start);
    match mode {
        EvaluationMode::RealTime => current_week,
        EvaluationMode::Definitive => current_week - 1,
    }
}

/// Whether the resolved period is fully elapsed. Weekly evaluation is
/// definitive for its resolved weeks, so it always counts as closed.
pub fn is_period_closed(limit: i32, year: i32, today: NaiveDate, weekly: bool) -> bool {
    if weekly || year < today.year() {
        return true;
    }
    year == today.year() && limit < today.month0() as i32
}
