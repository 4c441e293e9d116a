use chrono::{Datelike, Duration, NaiveDate};

use crate::models::{slot, WeekStart, MONTHS, WEEKS};

/// One week of the year with its day-weighted spread across calendar months.
#[derive(Debug, Clone)]
pub struct WeekSpan {
    pub week_index: usize,
    pub start: NaiveDate,
    pub end: NaiveDate,
    /// Fraction of the week falling in each month, 1/7 per day. Days outside
    /// the target year are clamped to January or December so no weight is lost.
    pub month_weight: [f64; MONTHS],
}

/// How weekly values fold into a monthly slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeeklyFold {
    /// Raw accumulated total; a value split across a month boundary
    /// contributes its true partial amount to each month.
    Sum,
    /// Accumulated total divided by accumulated weight, normalizing for
    /// partial week coverage.
    Average,
}

fn start_of_week(date: NaiveDate, week_start: WeekStart) -> NaiveDate {
    let into_week =
        (date.weekday().num_days_from_sunday() as i64 - week_start.offset()).rem_euclid(7);
    date - Duration::days(into_week)
}

/// ISO-like week number (1-based), anchored to the week's fourth day the way
/// ISO 8601 anchors to Thursday, parameterized by the first day of the week.
pub fn week_number(date: NaiveDate, week_start: WeekStart) -> u32 {
    let midweek = start_of_week(date, week_start) + Duration::days(3);
    midweek.ordinal0() / 7 + 1
}

/// Slot index (0-based) of a date in the 53-slot weekly series of `year`.
/// Slot 0 is the week containing January 1; dates before that map to -1.
pub fn week_index_of(date: NaiveDate, year: i32, week_start: WeekStart) -> i32 {
    let Some(jan1) = NaiveDate::from_ymd_opt(year, 1, 1) else {
        return -1;
    };
    let first = start_of_week(jan1, week_start);
    let days = (start_of_week(date, week_start) - first).num_days();
    if days < 0 {
        -1
    } else {
        (days / 7).min((WEEKS - 1) as i64) as i32
    }
}

/// Ordered weeks touching `year`, capped at the 53 slots the series carries.
pub fn year_week_map(year: i32, week_start: WeekStart) -> Vec<WeekSpan> {
    let (Some(jan1), Some(dec31)) = (
        NaiveDate::from_ymd_opt(year, 1, 1),
        NaiveDate::from_ymd_opt(year, 12, 31),
    ) else {
        return Vec::new();
    };

    let mut spans = Vec::new();
    let mut start = start_of_week(jan1, week_start);
    let mut week_index = 0usize;

    while start <= dec31 && week_index < WEEKS {
        let mut month_weight = [0.0; MONTHS];
        for day_offset in 0..7 {
            let day = start + Duration::days(day_offset);
            let month = if day < jan1 {
                0
            } else if day > dec31 {
                MONTHS - 1
            } else {
                day.month0() as usize
            };
            month_weight[month] += 1.0 / 7.0;
        }
        spans.push(WeekSpan {
            week_index,
            start,
            end: start + Duration::days(6),
            month_weight,
        });
        start += Duration::days(7);
        week_index += 1;
    }

    spans
}

/// Fold a 53-slot weekly series into a 12-slot monthly series. `max_week`
/// cuts the series after the given slot (a negative cutoff keeps nothing).
/// A month no populated week touched yields None, never zero.
pub fn aggregate_weekly_to_monthly(
    series: &[Option<f64>],
    year: i32,
    week_start: WeekStart,
    max_week: Option<i32>,
    fold: WeeklyFold,
) -> [Option<f64>; MONTHS] {
    let mut total = [0.0; MONTHS];
    let mut weight = [0.0; MONTHS];

    for span in year_week_map(year, week_start) {
        if let Some(max) = max_week {
            if span.week_index as i32 > max {
                break;
            }
        }
        let Some(value) = slot(series, span.week_index) else {
            continue;
        };
        for (month, share) in span.month_weight.iter().enumerate() {
            if *share > 0.0 {
                total[month] += value * share;
                weight[month] += share;
            }
        }
    }

    let mut monthly = [None; MONTHS];
    for month in 0..MONTHS {
        if weight[month] > 0.0 {
            monthly[month] = Some(match fold {
                WeeklyFold::Sum => total[month],
                WeeklyFold::Average => total[month] / weight[month],
            });
        }
    }
    monthly
}
