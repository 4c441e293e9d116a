use std::fmt::Write;

use chrono::{Datelike, NaiveDate};

use crate::compliance::{self, calculate_compliance, resolve_series};
use crate::models::{Dashboard, EvaluationMode, Frequency, Status, MONTHS, MONTH_NAMES};
use crate::score;
use crate::weekly;

pub fn status_counts(dashboard: &Dashboard, mode: EvaluationMode, today: NaiveDate) -> Vec<(Status, usize)> {
    let mut counts: Vec<(Status, usize)> = Vec::new();
    for indicator in &dashboard.indicators {
        let result = calculate_compliance(
            indicator,
            &dashboard.thresholds,
            dashboard.year,
            mode,
            &dashboard.indicators,
            today,
        );
        match counts.iter_mut().find(|(status, _)| *status == result.status) {
            Some((_, count)) => *count += 1,
            None => counts.push((result.status, 1)),
        }
    }
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts
}

pub fn build_report(dashboard: &Dashboard, mode: EvaluationMode, today: NaiveDate) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# KPI Scorecard Report");
    let _ = writeln!(
        output,
        "Generated for {} ({} targets, {} evaluation, as of {})",
        dashboard.title,
        dashboard.year,
        mode,
        today
    );
    if let Some(indicator) = dashboard
        .indicators
        .iter()
        .find(|i| i.frequency == Frequency::Weekly)
    {
        let week_start = indicator.week_start;
        let index = weekly::week_index_of(today, dashboard.year, week_start);
        if let Some(span) = weekly::year_week_map(dashboard.year, week_start)
            .into_iter()
            .find(|span| span.week_index as i32 == index)
        {
            let _ = writeln!(
                output,
                "Current capture week: week {} ({} through {})",
                weekly::week_number(today, week_start),
                span.start,
                span.end
            );
        }
    }
    let _ = writeln!(output);

    let overall = score::weighted_score(
        &dashboard.indicators,
        &dashboard.thresholds,
        dashboard.year,
        mode,
        today,
    );
    let _ = writeln!(output, "## Dashboard Score");
    let _ = writeln!(output, "Weighted compliance: {overall:.1}%");

    let _ = writeln!(output);
    let _ = writeln!(output, "## Status Mix");
    let counts = status_counts(dashboard, mode, today);
    if counts.is_empty() {
        let _ = writeln!(output, "No indicators on this dashboard.");
    } else {
        for (status, count) in counts {
            let _ = writeln!(output, "- {}: {} indicators", status.label(), count);
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Indicators");
    if dashboard.indicators.is_empty() {
        let _ = writeln!(output, "No indicators on this dashboard.");
    } else {
        for indicator in &dashboard.indicators {
            let result = calculate_compliance(
                indicator,
                &dashboard.thresholds,
                dashboard.year,
                mode,
                &dashboard.indicators,
                today,
            );
            let _ = writeln!(
                output,
                "- {}: {:.1}% ({}) with {:.2} of {:.2} {}",
                indicator.name,
                result.percentage,
                result.status.label(),
                result.progress,
                result.target,
                if indicator.unit.is_empty() {
                    "units"
                } else {
                    indicator.unit.as_str()
                }
            );
        }
    }

    let limit = if dashboard.year < today.year() {
        (MONTHS - 1) as i32
    } else if dashboard.year > today.year() {
        -1
    } else {
        today.month0() as i32
    };
    let trend = score::monthly_trend(&dashboard.indicators, dashboard.year, mode, limit, today);
    let _ = writeln!(output);
    let _ = writeln!(output, "## Monthly Trend");
    if trend.iter().all(Option::is_none) {
        let _ = writeln!(output, "No scored months yet.");
    } else {
        for (month, value) in trend.iter().enumerate() {
            if let Some(value) = value {
                let _ = writeln!(output, "- {}: {:.1}%", MONTH_NAMES[month], value);
            }
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Period Notes");
    let mut any_note = false;
    for indicator in &dashboard.indicators {
        for (month, note) in indicator.notes.iter().enumerate().take(MONTHS) {
            if let Some(note) = note.as_deref().filter(|n| !n.is_empty()) {
                let _ = writeln!(output, "- {} ({}): {}", indicator.name, MONTH_NAMES[month], note);
                any_note = true;
            }
        }
    }
    if !any_note {
        let _ = writeln!(output, "No period notes captured.");
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Warnings");
    let mut any_warning = false;
    for indicator in &dashboard.indicators {
        let series = resolve_series(
            indicator,
            &dashboard.indicators,
            dashboard.year,
            mode,
            today,
        );
        for warning in [
            compliance::missing_months_warning(&series.goals, &series.progress),
            compliance::overdue_warning(&series.goals, &series.progress, dashboard.year, today),
        ]
        .into_iter()
        .flatten()
        {
            let _ = writeln!(output, "- {}: {}", indicator.name, warning);
            any_warning = true;
        }
    }
    if !any_warning {
        let _ = writeln!(output, "Nothing flagged.");
    }

    output
}
