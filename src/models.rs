use std::collections::HashMap;
use std::fmt;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

pub const MONTHS: usize = 12;
pub const WEEKS: usize = 53;

pub const MONTH_NAMES: [&str; MONTHS] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndicatorKind {
    /// Period values sum across the elapsed window (e.g. total sales to date).
    #[default]
    Accumulative,
    /// Period values average across the elapsed window (e.g. a rate).
    Average,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GoalDirection {
    #[default]
    Maximize,
    Minimize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    #[default]
    Monthly,
    Weekly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeekStart {
    #[default]
    Monday,
    Sunday,
}

impl WeekStart {
    /// Days from Sunday to the first day of the week.
    pub fn offset(self) -> i64 {
        match self {
            WeekStart::Sunday => 0,
            WeekStart::Monday => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndicatorType {
    #[default]
    Simple,
    /// Series derived by summing the listed child indicators per period.
    Compound,
    /// Series derived from an arithmetic expression over other indicators.
    Formula,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum EvaluationMode {
    /// The current, still-open period may count once it carries data.
    #[default]
    RealTime,
    /// Only fully elapsed periods count.
    Definitive,
}

impl fmt::Display for EvaluationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EvaluationMode::RealTime => "real-time",
            EvaluationMode::Definitive => "definitive",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    OnTrack,
    AtRisk,
    OffTrack,
    InProgress,
    Neutral,
}

impl Status {
    pub fn label(self) -> &'static str {
        match self {
            Status::OnTrack => "on track",
            Status::AtRisk => "at risk",
            Status::OffTrack => "off track",
            Status::InProgress => "in progress",
            Status::Neutral => "neutral",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Thresholds {
    /// Percentage at or above which an indicator is on track.
    pub on_track: f64,
    /// Percentage at or above which an indicator is merely at risk;
    /// below this it is off track.
    pub at_risk: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Thresholds {
            on_track: 90.0,
            at_risk: 70.0,
        }
    }
}

impl Thresholds {
    pub fn status_for(&self, percentage: f64) -> Status {
        if percentage >= self.on_track {
            Status::OnTrack
        } else if percentage >= self.at_risk {
            Status::AtRisk
        } else {
            Status::OffTrack
        }
    }
}

/// One tracked KPI with its goal/progress time series. A `None` slot means
/// "no data captured for that period", which is never the same as a zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Indicator {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub unit: String,
    #[serde(default)]
    pub kind: IndicatorKind,
    #[serde(default)]
    pub direction: GoalDirection,
    #[serde(default)]
    pub frequency: Frequency,
    #[serde(default)]
    pub goals: Vec<Option<f64>>,
    #[serde(default)]
    pub progress: Vec<Option<f64>>,
    #[serde(default)]
    pub weekly_goals: Vec<Option<f64>>,
    #[serde(default)]
    pub weekly_progress: Vec<Option<f64>>,
    #[serde(default)]
    pub week_start: WeekStart,
    #[serde(default)]
    pub notes: Vec<Option<String>>,
    #[serde(default)]
    pub indicator_type: IndicatorType,
    /// Child indicator ids, used when `indicator_type` is compound.
    #[serde(default)]
    pub children: Vec<i64>,
    /// Arithmetic expression over `{id:N}` placeholders, used when
    /// `indicator_type` is formula.
    #[serde(default)]
    pub expression: Option<String>,
    /// Manual weight (0-100) relative to sibling indicators.
    #[serde(default)]
    pub weight: Option<f64>,
}

impl Indicator {
    pub fn new(id: i64, name: &str) -> Self {
        Indicator {
            id,
            name: name.to_string(),
            unit: String::new(),
            kind: IndicatorKind::default(),
            direction: GoalDirection::default(),
            frequency: Frequency::default(),
            goals: Vec::new(),
            progress: Vec::new(),
            weekly_goals: Vec::new(),
            weekly_progress: Vec::new(),
            week_start: WeekStart::default(),
            notes: Vec::new(),
            indicator_type: IndicatorType::default(),
            children: Vec::new(),
            expression: None,
            weight: None,
        }
    }

    pub fn lower_is_better(&self) -> bool {
        self.direction == GoalDirection::Minimize
    }
}

/// A named collection of indicators belonging to one organizational unit/year.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub group: String,
    #[serde(default)]
    pub area: String,
    pub year: i32,
    #[serde(default)]
    pub indicators: Vec<Indicator>,
    #[serde(default)]
    pub thresholds: Thresholds,
    /// Manual weight, used only under the manual consolidation strategy.
    #[serde(default)]
    pub weight: Option<f64>,
    /// Marks a synthesized consolidation result; never persisted or edited.
    #[serde(default)]
    pub aggregate: bool,
}

/// Derived per-indicator scoring output; recomputed on every call, never stored.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ComplianceResult {
    pub progress: f64,
    pub target: f64,
    pub percentage: f64,
    pub status: Status,
    /// True when the indicator had any non-zero data in its evaluable window.
    pub active: bool,
}

impl ComplianceResult {
    pub fn inactive() -> Self {
        ComplianceResult {
            progress: 0.0,
            target: 0.0,
            percentage: 0.0,
            status: Status::Neutral,
            active: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum AggregationStrategy {
    #[default]
    Equal,
    Manual,
    IndicatorDriven,
}

impl fmt::Display for AggregationStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AggregationStrategy::Equal => "equal",
            AggregationStrategy::Manual => "manual",
            AggregationStrategy::IndicatorDriven => "indicator-driven",
        })
    }
}

/// How many dashboards consolidate into one synthetic aggregate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregationSettings {
    #[serde(default)]
    pub strategy: AggregationStrategy,
    /// Name of the indicator whose latest progress drives dashboard weights
    /// under the indicator-driven strategy.
    #[serde(default)]
    pub driver: Option<String>,
    /// Per-dashboard weight overrides by title, for the manual strategy.
    #[serde(default)]
    pub weights: HashMap<String, f64>,
    /// Decimal places kept on averaged aggregate values.
    #[serde(default = "default_precision")]
    pub precision: u32,
}

impl Default for AggregationSettings {
    fn default() -> Self {
        AggregationSettings {
            strategy: AggregationStrategy::default(),
            driver: None,
            weights: HashMap::new(),
            precision: default_precision(),
        }
    }
}

fn default_precision() -> u32 {
    2
}

/// Slot access over a possibly short stored series; absent slots read as None.
pub fn slot(series: &[Option<f64>], index: usize) -> Option<f64> {
    series.get(index).copied().flatten()
}

/// Numeric value of a slot with "no data" coerced to zero.
pub fn slot_or_zero(series: &[Option<f64>], index: usize) -> f64 {
    slot(series, index).unwrap_or(0.0)
}

/// Round to a fixed number of decimal places.
pub fn round_to(value: f64, precision: u32) -> f64 {
    let factor = 10f64.powi(precision as i32);
    (value * factor).round() / factor
}
