use chrono::NaiveDate;

use crate::compliance::{calculate_compliance, calculate_percentage, resolve_series};
use crate::models::{
    round_to, slot_or_zero, EvaluationMode, Indicator, Thresholds, MONTHS,
};

/// Per-indicator contribution cap, so one runaway metric cannot drown the rest.
const PERCENTAGE_CAP: f64 = 200.0;

/// Weighted dashboard score across all active indicators, rounded to one
/// decimal. Inactive indicators are skipped entirely so they never dilute
/// the denominator; zero total weight scores 0.
pub fn weighted_score(
    indicators: &[Indicator],
    thresholds: &Thresholds,
    year: i32,
    mode: EvaluationMode,
    today: NaiveDate,
) -> f64 {
    let mut weighted = 0.0;
    let mut total_weight = 0.0;

    for indicator in indicators {
        let result = calculate_compliance(indicator, thresholds, year, mode, indicators, today);
        if !result.active {
            continue;
        }
        let weight = indicator.weight.unwrap_or(1.0);
        weighted += result.percentage.min(PERCENTAGE_CAP) * weight;
        total_weight += weight;
    }

    if total_weight == 0.0 {
        0.0
    } else {
        round_to(weighted / total_weight, 1)
    }
}

/// Month-by-month weighted average of each month's own percentage across the
/// indicators with data in that month. Months past the limit, and months no
/// indicator captured, are None.
pub fn monthly_trend(
    indicators: &[Indicator],
    year: i32,
    mode: EvaluationMode,
    limit: i32,
    today: NaiveDate,
) -> [Option<f64>; MONTHS] {
    let mut trend = [None; MONTHS];
    if limit < 0 {
        return trend;
    }

    let resolved: Vec<_> = indicators
        .iter()
        .map(|ind| (ind, resolve_series(ind, indicators, year, mode, today)))
        .collect();

    for (month, slot) in trend.iter_mut().enumerate().take(limit as usize + 1) {
        let mut weighted = 0.0;
        let mut total_weight = 0.0;
        for (indicator, series) in &resolved {
            let goal = slot_or_zero(&series.goals, month);
            let progress = slot_or_zero(&series.progress, month);
            if goal == 0.0 && progress == 0.0 {
                continue;
            }
            let weight = indicator.weight.unwrap_or(1.0);
            weighted += calculate_percentage(progress, goal, indicator.lower_is_better()) * weight;
            total_weight += weight;
        }
        if total_weight > 0.0 {
            *slot = Some(weighted / total_weight);
        }
    }

    trend
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::GoalDirection;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn indicator(id: i64, goal: f64, progress: f64, weight: Option<f64>) -> Indicator {
        let mut ind = Indicator::new(id, &format!("kpi {id}"));
        ind.goals = vec![Some(goal)];
        ind.progress = vec![Some(progress)];
        ind.weight = weight;
        ind
    }

    #[test]
    fn weights_shift_the_score() {
        let indicators = vec![
            indicator(1, 100.0, 50.0, Some(1.0)),
            indicator(2, 100.0, 100.0, Some(3.0)),
        ];
        let score = weighted_score(
            &indicators,
            &Thresholds::default(),
            2025,
            EvaluationMode::Definitive,
            date(2026, 6, 15),
        );
        // (50*1 + 100*3) / 4
        assert_eq!(score, 87.5);
    }

    #[test]
    fn inactive_indicators_do_not_dilute() {
        let indicators = vec![
            indicator(1, 100.0, 80.0, None),
            indicator(2, 0.0, 0.0, None),
        ];
        let score = weighted_score(
            &indicators,
            &Thresholds::default(),
            2025,
            EvaluationMode::Definitive,
            date(2026, 6, 15),
        );
        assert_eq!(score, 80.0);
    }

    #[test]
    fn all_inactive_scores_zero() {
        let indicators = vec![
            indicator(1, 0.0, 0.0, None),
            indicator(2, 0.0, 0.0, Some(5.0)),
        ];
        let score = weighted_score(
            &indicators,
            &Thresholds::default(),
            2025,
            EvaluationMode::Definitive,
            date(2026, 6, 15),
        );
        assert_eq!(score, 0.0);
        assert_eq!(
            weighted_score(
                &[],
                &Thresholds::default(),
                2025,
                EvaluationMode::Definitive,
                date(2026, 6, 15)
            ),
            0.0
        );
    }

    #[test]
    fn contributions_cap_at_200() {
        // 1000% raw attainment still counts as 200.
        let indicators = vec![
            indicator(1, 10.0, 100.0, Some(1.0)),
            indicator(2, 100.0, 100.0, Some(1.0)),
        ];
        let score = weighted_score(
            &indicators,
            &Thresholds::default(),
            2025,
            EvaluationMode::Definitive,
            date(2026, 6, 15),
        );
        assert_eq!(score, 150.0);
    }

    #[test]
    fn score_rounds_to_one_decimal() {
        let indicators = vec![
            indicator(1, 100.0, 33.0, None),
            indicator(2, 100.0, 33.0, None),
            indicator(3, 100.0, 34.0, None),
        ];
        let score = weighted_score(
            &indicators,
            &Thresholds::default(),
            2025,
            EvaluationMode::Definitive,
            date(2026, 6, 15),
        );
        assert_eq!(score, 33.3);
    }

    #[test]
    fn trend_skips_empty_months_and_respects_limit() {
        let mut a = Indicator::new(1, "a");
        a.goals = vec![Some(100.0), None, Some(100.0), Some(100.0)];
        a.progress = vec![Some(50.0), None, Some(100.0), Some(25.0)];
        let mut b = Indicator::new(2, "b");
        b.direction = GoalDirection::Minimize;
        b.goals = vec![Some(100.0), None, None];
        b.progress = vec![Some(50.0), None, None];

        let trend = monthly_trend(
            &[a, b],
            2025,
            EvaluationMode::Definitive,
            2,
            date(2026, 6, 15),
        );
        // Month 0: maximize 50%, minimize 200% -> 125 average.
        assert_eq!(trend[0], Some(125.0));
        assert_eq!(trend[1], None);
        assert_eq!(trend[2], Some(100.0));
        // Past the limit, even with data.
        assert_eq!(trend[3], None);
    }

    #[test]
    fn negative_limit_yields_all_null() {
        let trend = monthly_trend(
            &[indicator(1, 100.0, 50.0, None)],
            2027,
            EvaluationMode::RealTime,
            -1,
            date(2026, 6, 15),
        );
        assert!(trend.iter().all(Option::is_none));
    }
}
