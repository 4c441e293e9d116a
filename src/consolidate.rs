use std::collections::{HashMap, HashSet};

use chrono::{Datelike, NaiveDate};

use crate::models::{
    round_to, slot, AggregationSettings, AggregationStrategy, Dashboard, Indicator,
    IndicatorKind, MONTHS, WEEKS,
};

/// Floor weight for boards whose driver indicator carries no usable value,
/// so they are never silently zero-weighted out of the aggregate.
const DRIVER_FLOOR: f64 = 0.1;

/// Resolve one dashboard's weight under the configured strategy. Weights only
/// matter when averaging; accumulative series sum regardless.
pub fn dashboard_weight(
    dashboard: &Dashboard,
    settings: &AggregationSettings,
    today: NaiveDate,
) -> f64 {
    match settings.strategy {
        AggregationStrategy::Equal => 1.0,
        AggregationStrategy::Manual => dashboard
            .weight
            .or_else(|| settings.weights.get(&dashboard.title).copied())
            .unwrap_or(1.0),
        AggregationStrategy::IndicatorDriven => {
            let Some(driver) = settings.driver.as_deref() else {
                return DRIVER_FLOOR;
            };
            let wanted = driver.trim().to_lowercase();
            dashboard
                .indicators
                .iter()
                .find(|ind| ind.name.trim().to_lowercase() == wanted)
                .map(|ind| driver_value(ind, today))
                .unwrap_or(DRIVER_FLOOR)
        }
    }
}

/// Latest non-null, non-zero monthly progress of the driver indicator:
/// backward from the current month, then forward across the rest of the year.
fn driver_value(indicator: &Indicator, today: NaiveDate) -> f64 {
    let current = (today.month0() as usize).min(MONTHS - 1);
    for month in (0..=current).rev() {
        if let Some(value) = slot(&indicator.progress, month) {
            if value != 0.0 {
                return value;
            }
        }
    }
    for month in current + 1..MONTHS {
        if let Some(value) = slot(&indicator.progress, month) {
            if value != 0.0 {
                return value;
            }
        }
    }
    DRIVER_FLOOR
}

fn combine_series(
    sources: &[(f64, &Indicator)],
    pick: impl Fn(&Indicator) -> &[Option<f64>],
    kind: IndicatorKind,
    precision: u32,
    len: usize,
) -> Vec<Option<f64>> {
    (0..len)
        .map(|period| {
            let mut total = 0.0;
            let mut weight_sum = 0.0;
            let mut any = false;
            for (weight, indicator) in sources {
                let Some(value) = slot(pick(indicator), period) else {
                    continue;
                };
                any = true;
                match kind {
                    IndicatorKind::Accumulative => total += value,
                    IndicatorKind::Average => {
                        total += value * weight;
                        weight_sum += weight;
                    }
                }
            }
            if !any {
                return None;
            }
            match kind {
                IndicatorKind::Accumulative => Some(total),
                IndicatorKind::Average => {
                    if weight_sum == 0.0 {
                        None
                    } else {
                        Some(round_to(total / weight_sum, precision))
                    }
                }
            }
        })
        .collect()
}

/// Merge many dashboards into one synthetic aggregate. Indicators match by
/// case-insensitive trimmed name; the first-seen indicator supplies the
/// representative metadata (mismatched kind/direction across boards is an
/// open validation gap and resolves first-wins).
pub fn consolidate(
    dashboards: &[Dashboard],
    settings: &AggregationSettings,
    today: NaiveDate,
) -> Dashboard {
    let weights: Vec<f64> = dashboards
        .iter()
        .map(|dashboard| dashboard_weight(dashboard, settings, today))
        .collect();

    struct Group<'a> {
        representative: &'a Indicator,
        home_board: &'a str,
        sources: Vec<(f64, &'a Indicator)>,
        boards: HashSet<usize>,
    }

    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, Group> = HashMap::new();
    for (board, dashboard) in dashboards.iter().enumerate() {
        for indicator in &dashboard.indicators {
            let key = indicator.name.trim().to_lowercase();
            let group = groups.entry(key.clone()).or_insert_with(|| {
                order.push(key);
                Group {
                    representative: indicator,
                    home_board: &dashboard.title,
                    sources: Vec::new(),
                    boards: HashSet::new(),
                }
            });
            group.sources.push((weights[board], indicator));
            group.boards.insert(board);
        }
    }

    let mut indicators = Vec::with_capacity(order.len());
    for key in &order {
        let Some(group) = groups.remove(key) else {
            continue;
        };
        let mut merged = group.representative.clone();
        if dashboards.len() > 1 && group.boards.len() == 1 {
            merged.name = format!("{} ({})", merged.name.trim(), group.home_board);
        }
        let kind = merged.kind;
        let precision = settings.precision;
        merged.goals = combine_series(&group.sources, |i| &i.goals, kind, precision, MONTHS);
        merged.progress = combine_series(&group.sources, |i| &i.progress, kind, precision, MONTHS);
        if !merged.weekly_goals.is_empty() || !merged.weekly_progress.is_empty() {
            merged.weekly_goals =
                combine_series(&group.sources, |i| &i.weekly_goals, kind, precision, WEEKS);
            merged.weekly_progress =
                combine_series(&group.sources, |i| &i.weekly_progress, kind, precision, WEEKS);
        }
        indicators.push(merged);
    }

    let first = dashboards.first();
    Dashboard {
        id: -1,
        title: "Consolidated".to_string(),
        group: first.map(|d| d.group.clone()).unwrap_or_default(),
        area: first.map(|d| d.area.clone()).unwrap_or_default(),
        year: first.map(|d| d.year).unwrap_or_else(|| today.year()),
        indicators,
        thresholds: first.map(|d| d.thresholds).unwrap_or_default(),
        weight: None,
        aggregate: true,
    }
}
