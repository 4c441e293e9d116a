use chrono::{Datelike, NaiveDate};

use crate::formula::{evaluate_formula, SeriesPass};
use crate::models::{
    slot, slot_or_zero, ComplianceResult, Frequency, Indicator, IndicatorKind, IndicatorType,
    Status, Thresholds, EvaluationMode, MONTHS, MONTH_NAMES,
};
use crate::periods;
use crate::weekly::{aggregate_weekly_to_monthly, WeeklyFold};

/// Effective monthly goal/progress series after compound, formula and
/// weekly resolution.
#[derive(Debug, Clone)]
pub struct MonthlySeries {
    pub goals: Vec<Option<f64>>,
    pub progress: Vec<Option<f64>>,
}

/// Resolve an indicator's effective monthly series. Compound indicators sum
/// their children per period, formula indicators evaluate their expression
/// per period, weekly indicators fold their weekly series into months with
/// the cutoff resolved at week granularity.
pub fn resolve_series(
    indicator: &Indicator,
    all: &[Indicator],
    year: i32,
    mode: EvaluationMode,
    today: NaiveDate,
) -> MonthlySeries {
    match indicator.indicator_type {
        IndicatorType::Compound => {
            let children: Vec<&Indicator> = indicator
                .children
                .iter()
                .filter_map(|id| all.iter().find(|ind| ind.id == *id))
                .collect();
            let mut goals = vec![None; MONTHS];
            let mut progress = vec![None; MONTHS];
            for month in 0..MONTHS {
                goals[month] = sum_present(children.iter().map(|c| slot(&c.goals, month)));
                progress[month] = sum_present(children.iter().map(|c| slot(&c.progress, month)));
            }
            MonthlySeries { goals, progress }
        }
        IndicatorType::Formula => {
            let expression = indicator.expression.as_deref().unwrap_or("");
            let goals = (0..MONTHS)
                .map(|month| Some(evaluate_formula(expression, month, all, SeriesPass::Goal)))
                .collect();
            let progress = (0..MONTHS)
                .map(|month| Some(evaluate_formula(expression, month, all, SeriesPass::Progress)))
                .collect();
            MonthlySeries { goals, progress }
        }
        IndicatorType::Simple => {
            if indicator.frequency == Frequency::Weekly {
                let fold = match indicator.kind {
                    IndicatorKind::Accumulative => WeeklyFold::Sum,
                    IndicatorKind::Average => WeeklyFold::Average,
                };
                let cutoff = periods::resolve_week_limit(year, mode, today, indicator.week_start);
                let goals = aggregate_weekly_to_monthly(
                    &indicator.weekly_goals,
                    year,
                    indicator.week_start,
                    Some(cutoff),
                    fold,
                );
                let progress = aggregate_weekly_to_monthly(
                    &indicator.weekly_progress,
                    year,
                    indicator.week_start,
                    Some(cutoff),
                    fold,
                );
                MonthlySeries {
                    goals: goals.to_vec(),
                    progress: progress.to_vec(),
                }
            } else {
                MonthlySeries {
                    goals: indicator.goals.clone(),
                    progress: indicator.progress.clone(),
                }
            }
        }
    }
}

fn sum_present(values: impl Iterator<Item = Option<f64>>) -> Option<f64> {
    let mut sum = 0.0;
    let mut any = false;
    for value in values.flatten() {
        sum += value;
        any = true;
    }
    any.then_some(sum)
}

/// Percentage of goal attainment. For minimize goals the ratio inverts:
/// consuming less than the target scores above 100.
pub fn calculate_percentage(progress: f64, target: f64, lower_is_better: bool) -> f64 {
    if target == 0.0 && progress == 0.0 {
        // Explicit "no data", not a met goal.
        return 0.0;
    }
    if target == 0.0 {
        return if lower_is_better {
            0.0
        } else if progress > 0.0 {
            100.0
        } else {
            0.0
        };
    }
    let percentage = if lower_is_better {
        if progress == 0.0 {
            100.0
        } else {
            target / progress * 100.0
        }
    } else {
        progress / target * 100.0
    };
    if percentage.is_finite() {
        percentage
    } else {
        0.0
    }
}

/// Score one indicator against its thresholds for the given year and mode.
pub fn calculate_compliance(
    indicator: &Indicator,
    thresholds: &Thresholds,
    year: i32,
    mode: EvaluationMode,
    all: &[Indicator],
    today: NaiveDate,
) -> ComplianceResult {
    let series = resolve_series(indicator, all, year, mode, today);
    let limit = periods::resolve_limit_index(&series.goals, &series.progress, year, mode, today);
    if limit < 0 {
        return ComplianceResult::inactive();
    }

    let window = 0..=(limit as usize);
    let (progress, target) = match indicator.kind {
        IndicatorKind::Accumulative => (
            window
                .clone()
                .map(|month| slot_or_zero(&series.progress, month))
                .sum(),
            window
                .map(|month| slot_or_zero(&series.goals, month))
                .sum(),
        ),
        IndicatorKind::Average => {
            let captured: Vec<usize> = window
                .filter(|month| {
                    slot_or_zero(&series.progress, *month) != 0.0
                        || slot_or_zero(&series.goals, *month) != 0.0
                })
                .collect();
            if captured.is_empty() {
                (0.0, 0.0)
            } else {
                let count = captured.len() as f64;
                (
                    captured
                        .iter()
                        .map(|month| slot_or_zero(&series.progress, *month))
                        .sum::<f64>()
                        / count,
                    captured
                        .iter()
                        .map(|month| slot_or_zero(&series.goals, *month))
                        .sum::<f64>()
                        / count,
                )
            }
        }
    };

    let percentage = calculate_percentage(progress, target, indicator.lower_is_better());
    let active = target != 0.0 || progress != 0.0;
    let closed = periods::is_period_closed(
        limit,
        year,
        today,
        indicator.frequency == Frequency::Weekly,
    );
    let status = if !active {
        Status::Neutral
    } else if !closed {
        Status::InProgress
    } else {
        thresholds.status_for(percentage)
    };

    ComplianceResult {
        progress,
        target,
        percentage,
        status,
        active,
    }
}

/// Months where exactly one of goal and progress was captured. Advisory only.
pub fn missing_months_warning(goals: &[Option<f64>], progress: &[Option<f64>]) -> Option<String> {
    let months: Vec<&str> = (0..MONTHS)
        .filter(|month| {
            (slot_or_zero(goals, *month) != 0.0) != (slot_or_zero(progress, *month) != 0.0)
        })
        .map(|month| MONTH_NAMES[month])
        .collect();
    if months.is_empty() {
        None
    } else {
        Some(format!(
            "Incomplete capture (goal or progress missing) in {}",
            months.join(", ")
        ))
    }
}

/// Fully elapsed months with neither goal nor progress captured. Advisory only.
pub fn overdue_warning(
    goals: &[Option<f64>],
    progress: &[Option<f64>],
    year: i32,
    today: NaiveDate,
) -> Option<String> {
    let horizon = if year < today.year() {
        MONTHS
    } else if year > today.year() {
        0
    } else {
        today.month0() as usize
    };
    let months: Vec<&str> = (0..horizon)
        .filter(|month| {
            slot_or_zero(goals, *month) == 0.0 && slot_or_zero(progress, *month) == 0.0
        })
        .map(|month| MONTH_NAMES[month])
        .collect();
    if months.is_empty() {
        None
    } else {
        Some(format!("No capture for elapsed {}", months.join(", ")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Frequency, GoalDirection, IndicatorKind, WeekStart, WEEKS};

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn simple(goals: Vec<Option<f64>>, progress: Vec<Option<f64>>) -> Indicator {
        let mut ind = Indicator::new(1, "sales");
        ind.goals = goals;
        ind.progress = progress;
        ind
    }

    #[test]
    fn percentage_table() {
        assert_eq!(calculate_percentage(0.0, 0.0, false), 0.0);
        assert_eq!(calculate_percentage(0.0, 0.0, true), 0.0);
        assert_eq!(calculate_percentage(5.0, 0.0, false), 100.0);
        assert_eq!(calculate_percentage(5.0, 0.0, true), 0.0);
        assert_eq!(calculate_percentage(50.0, 100.0, false), 50.0);
        assert_eq!(calculate_percentage(150.0, 100.0, false), 150.0);
        // Minimize goals invert the ratio.
        assert_eq!(calculate_percentage(0.0, 100.0, true), 100.0);
        assert_eq!(calculate_percentage(50.0, 100.0, true), 200.0);
        assert_eq!(calculate_percentage(200.0, 100.0, true), 50.0);
    }

    #[test]
    fn all_null_indicator_is_neutral_and_inactive() {
        let ind = simple(vec![None; 12], vec![None; 12]);
        let result = calculate_compliance(
            &ind,
            &Thresholds::default(),
            2025,
            EvaluationMode::Definitive,
            &[],
            date(2026, 6, 15),
        );
        assert!(!result.active);
        assert_eq!(result.status, Status::Neutral);
        assert_eq!(result.percentage, 0.0);
    }

    #[test]
    fn future_year_is_inactive() {
        let ind = simple(vec![Some(10.0); 12], vec![Some(10.0); 12]);
        let result = calculate_compliance(
            &ind,
            &Thresholds::default(),
            2030,
            EvaluationMode::RealTime,
            &[],
            date(2026, 6, 15),
        );
        assert!(!result.active);
        assert_eq!(result.progress, 0.0);
        assert_eq!(result.target, 0.0);
    }

    #[test]
    fn accumulative_sums_only_populated_slots_in_past_year() {
        let ind = simple(
            vec![Some(10.0), Some(10.0), Some(10.0)],
            vec![Some(10.0), Some(20.0), None],
        );
        let result = calculate_compliance(
            &ind,
            &Thresholds::default(),
            2025,
            EvaluationMode::Definitive,
            &[],
            date(2026, 6, 15),
        );
        assert_eq!(result.progress, 30.0);
        assert_eq!(result.target, 30.0);
        assert_eq!(result.percentage, 100.0);
        assert_eq!(result.status, Status::OnTrack);
    }

    #[test]
    fn average_means_only_captured_months() {
        let mut ind = simple(
            vec![Some(80.0), Some(0.0), Some(90.0), None],
            vec![Some(70.0), Some(0.0), Some(95.0), None],
        );
        ind.kind = IndicatorKind::Average;
        let result = calculate_compliance(
            &ind,
            &Thresholds::default(),
            2025,
            EvaluationMode::Definitive,
            &[],
            date(2026, 6, 15),
        );
        assert!((result.progress - 82.5).abs() < 1e-9);
        assert!((result.target - 85.0).abs() < 1e-9);
    }

    #[test]
    fn minimize_goal_with_no_consumption_scores_100() {
        let mut ind = simple(vec![Some(100.0)], vec![Some(0.0)]);
        ind.direction = GoalDirection::Minimize;
        let result = calculate_compliance(
            &ind,
            &Thresholds::default(),
            2025,
            EvaluationMode::Definitive,
            &[],
            date(2026, 6, 15),
        );
        assert_eq!(result.percentage, 100.0);
        assert!(result.active);
        assert_eq!(result.status, Status::OnTrack);
    }

    #[test]
    fn open_period_reports_in_progress() {
        let mut goals = vec![None; 12];
        let mut progress = vec![None; 12];
        goals[5] = Some(10.0);
        progress[5] = Some(2.0);
        let ind = simple(goals, progress);
        let result = calculate_compliance(
            &ind,
            &Thresholds::default(),
            2026,
            EvaluationMode::RealTime,
            &[],
            date(2026, 6, 15),
        );
        assert!(result.active);
        assert_eq!(result.status, Status::InProgress);
    }

    #[test]
    fn thresholds_split_closed_periods_into_bands() {
        let thresholds = Thresholds {
            on_track: 90.0,
            at_risk: 70.0,
        };
        let today = date(2026, 6, 15);
        for (progress, expected) in [
            (95.0, Status::OnTrack),
            (75.0, Status::AtRisk),
            (40.0, Status::OffTrack),
        ] {
            let ind = simple(vec![Some(100.0)], vec![Some(progress)]);
            let result = calculate_compliance(
                &ind,
                &thresholds,
                2025,
                EvaluationMode::Definitive,
                &[],
                today,
            );
            assert_eq!(result.status, expected, "progress {progress}");
        }
    }

    #[test]
    fn compound_indicator_sums_children_per_period() {
        let mut a = simple(vec![Some(10.0), Some(10.0)], vec![Some(5.0), None]);
        a.id = 2;
        let mut b = simple(vec![Some(20.0), None], vec![Some(10.0), None]);
        b.id = 3;
        let mut parent = Indicator::new(1, "combined");
        parent.indicator_type = IndicatorType::Compound;
        parent.children = vec![2, 3, 99];
        let all = vec![parent.clone(), a, b];
        let series = resolve_series(&parent, &all, 2025, EvaluationMode::Definitive, date(2026, 1, 1));
        assert_eq!(series.goals[0], Some(30.0));
        assert_eq!(series.goals[1], Some(10.0));
        assert_eq!(series.progress[0], Some(15.0));
        // Both children null: stays null rather than zero.
        assert_eq!(series.progress[1], None);
        assert_eq!(series.goals[2], None);
    }

    #[test]
    fn formula_indicator_evaluates_per_pass() {
        let mut a = simple(vec![Some(100.0)], vec![Some(50.0)]);
        a.id = 2;
        let mut b = simple(vec![Some(4.0)], vec![Some(2.0)]);
        b.id = 3;
        let mut parent = Indicator::new(1, "ratio");
        parent.indicator_type = IndicatorType::Formula;
        parent.expression = Some("{id:2} / {id:3}".to_string());
        let all = vec![parent.clone(), a, b];
        let series = resolve_series(&parent, &all, 2025, EvaluationMode::Definitive, date(2026, 1, 1));
        assert_eq!(series.goals[0], Some(25.0));
        assert_eq!(series.progress[0], Some(25.0));
        // Null references divide to non-finite and normalize to zero.
        assert_eq!(series.progress[1], Some(0.0));
    }

    #[test]
    fn weekly_indicator_folds_before_scoring() {
        let mut ind = Indicator::new(1, "weekly output");
        ind.frequency = Frequency::Weekly;
        ind.week_start = WeekStart::Monday;
        ind.weekly_goals = vec![Some(10.0); WEEKS];
        ind.weekly_progress = vec![Some(10.0); WEEKS];
        let result = calculate_compliance(
            &ind,
            &Thresholds::default(),
            2025,
            EvaluationMode::Definitive,
            &[],
            date(2026, 6, 15),
        );
        assert!(result.active);
        assert_eq!(result.percentage, 100.0);
        // Weekly evaluation is definitive for resolved weeks.
        assert_eq!(result.status, Status::OnTrack);
    }

    #[test]
    fn warnings_flag_partial_and_missed_capture() {
        let goals = vec![Some(10.0), Some(10.0), None, Some(10.0)];
        let progress = vec![Some(8.0), None, None, Some(9.0)];
        let missing = missing_months_warning(&goals, &progress).unwrap();
        assert!(missing.contains("February"));
        assert!(!missing.contains("January"));

        let overdue = overdue_warning(&goals, &progress, 2026, date(2026, 6, 15)).unwrap();
        assert!(overdue.contains("March"));
        assert!(overdue.contains("May"));
        assert!(!overdue.contains("June"));
        assert!(overdue_warning(&goals, &progress, 2027, date(2026, 6, 15)).is_none());
    }
}
