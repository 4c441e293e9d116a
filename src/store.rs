use std::path::Path;

use anyhow::Context;

use crate::models::{
    Dashboard, Frequency, GoalDirection, Indicator, IndicatorKind, IndicatorType, Thresholds,
};

pub fn load_dashboards(path: &Path) -> anyhow::Result<Vec<Dashboard>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let dashboards: Vec<Dashboard> = serde_json::from_str(&raw)
        .with_context(|| format!("invalid dashboard document in {}", path.display()))?;
    Ok(dashboards)
}

pub fn write_dashboards(path: &Path, dashboards: &[Dashboard]) -> anyhow::Result<()> {
    let raw =
        serde_json::to_string_pretty(dashboards).context("failed to serialize dashboards")?;
    std::fs::write(path, raw).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

pub fn seed(path: &Path) -> anyhow::Result<()> {
    write_dashboards(path, &sample_dashboards())
}

fn months(values: &[f64]) -> Vec<Option<f64>> {
    values.iter().map(|v| Some(*v)).collect()
}

/// Realistic two-dashboard document for demos and smoke runs.
pub fn sample_dashboards() -> Vec<Dashboard> {
    let mut new_sales = Indicator::new(1, "New Sales");
    new_sales.unit = "deals".to_string();
    new_sales.goals = months(&[40.0, 40.0, 45.0, 45.0, 50.0, 50.0]);
    new_sales.progress = months(&[38.0, 44.0, 41.0, 47.0, 52.0]);

    let mut renewals = Indicator::new(2, "Renewals");
    renewals.unit = "deals".to_string();
    renewals.goals = months(&[20.0, 20.0, 20.0, 20.0, 20.0, 20.0]);
    renewals.progress = months(&[22.0, 19.0, 21.0, 18.0, 23.0]);

    let mut bookings = Indicator::new(3, "Total Bookings");
    bookings.unit = "deals".to_string();
    bookings.indicator_type = IndicatorType::Compound;
    bookings.children = vec![1, 2];

    let mut churn = Indicator::new(4, "Customer Churn");
    churn.unit = "%".to_string();
    churn.kind = IndicatorKind::Average;
    churn.direction = GoalDirection::Minimize;
    churn.goals = months(&[2.0, 2.0, 2.0, 2.0, 2.0, 2.0]);
    churn.progress = months(&[1.8, 2.1, 1.6, 1.9, 1.7]);
    churn.notes = vec![
        None,
        Some("Spike after the February price change".to_string()),
    ];

    let mut blended = Indicator::new(5, "Blended Deal Rate");
    blended.unit = "deals".to_string();
    blended.kind = IndicatorKind::Average;
    blended.indicator_type = IndicatorType::Formula;
    blended.expression = Some("({id:1} + {id:2}) / 2".to_string());

    let mut tickets = Indicator::new(6, "Tickets Closed");
    tickets.unit = "tickets".to_string();
    tickets.frequency = Frequency::Weekly;
    tickets.weekly_goals = vec![Some(30.0); 22];
    tickets.weekly_progress = vec![Some(28.0); 20];

    let mut headcount_north = Indicator::new(7, "Headcount");
    headcount_north.unit = "people".to_string();
    headcount_north.kind = IndicatorKind::Average;
    headcount_north.progress = months(&[120.0, 121.0, 121.0, 124.0, 124.0]);

    let north = Dashboard {
        id: 1,
        title: "Commercial North".to_string(),
        group: "Commercial".to_string(),
        area: "North".to_string(),
        year: 2026,
        indicators: vec![
            new_sales,
            renewals,
            bookings,
            churn,
            blended,
            tickets,
            headcount_north,
        ],
        thresholds: Thresholds {
            on_track: 90.0,
            at_risk: 70.0,
        },
        weight: Some(2.0),
        aggregate: false,
    };

    let mut new_sales_south = Indicator::new(11, "New Sales");
    new_sales_south.unit = "deals".to_string();
    new_sales_south.goals = months(&[25.0, 25.0, 25.0, 30.0, 30.0, 30.0]);
    new_sales_south.progress = months(&[24.0, 26.0, 20.0, 27.0, 31.0]);

    let mut churn_south = Indicator::new(12, "Customer Churn");
    churn_south.unit = "%".to_string();
    churn_south.kind = IndicatorKind::Average;
    churn_south.direction = GoalDirection::Minimize;
    churn_south.goals = months(&[2.5, 2.5, 2.5, 2.5, 2.5, 2.5]);
    churn_south.progress = months(&[2.4, 2.8, 2.2, 2.6, 2.3]);

    let mut headcount_south = Indicator::new(13, "Headcount");
    headcount_south.unit = "people".to_string();
    headcount_south.kind = IndicatorKind::Average;
    headcount_south.progress = months(&[45.0, 45.0, 47.0, 47.0, 48.0]);

    let south = Dashboard {
        id: 2,
        title: "Commercial South".to_string(),
        group: "Commercial".to_string(),
        area: "South".to_string(),
        year: 2026,
        indicators: vec![new_sales_south, churn_south, headcount_south],
        thresholds: Thresholds {
            on_track: 85.0,
            at_risk: 65.0,
        },
        weight: Some(1.0),
        aggregate: false,
    };

    vec![north, south]
}
