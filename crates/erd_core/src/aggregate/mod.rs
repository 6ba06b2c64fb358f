use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use time::{Month, OffsetDateTime, PrimitiveDateTime};

use crate::classify::KeywordTable;
use crate::config::ActivityLogConfig;
use crate::domain::{
    Incident, IncidentSnapshot, ReportCategory, ReportStatus, ReportUrgency, ValidationWarning,
};
use crate::error::AppError;
use crate::normalize::timestamps::{parse_field, TimezonePolicy};

/// Warning codes that represent a missing/unparseable timestamp or an unreadable record.
pub const DATA_ERROR_CODES: [&str; 4] = [
    "DATA_INCIDENT_TS_UNPARSEABLE",
    "DATA_EVENT_TS_UNPARSEABLE",
    "DATA_RESPONSE_TS_UNPARSEABLE",
    "DATA_DOCUMENT_UNDECODABLE",
];

pub fn is_data_error(w: &ValidationWarning) -> bool {
    DATA_ERROR_CODES.contains(&w.code.as_str())
}

/// Calendar month used as the reporting window.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MonthKey {
    pub year: i32,
    /// 1..=12
    pub month: u8,
}

impl MonthKey {
    pub fn new(year: i32, month: u8) -> Result<Self, AppError> {
        if !(1..=12).contains(&month) {
            return Err(AppError::new("MONTH_INVALID", "Month must be between 1 and 12")
                .with_details(format!("month={month}")));
        }
        Ok(Self { year, month })
    }

    pub fn from_month(year: i32, month: Month) -> Self {
        Self {
            year,
            month: month as u8,
        }
    }

    /// Parse `YYYY-MM`.
    pub fn parse(raw: &str) -> Result<Self, AppError> {
        let invalid = || {
            AppError::new("MONTH_INVALID", "Month must be formatted as YYYY-MM")
                .with_details(format!("value={raw}"))
        };
        let (y, m) = raw.trim().split_once('-').ok_or_else(invalid)?;
        if y.len() != 4 || m.len() != 2 {
            return Err(invalid());
        }
        let year = y.parse::<i32>().map_err(|_| invalid())?;
        let month = m.parse::<u8>().map_err(|_| invalid())?;
        Self::new(year, month)
    }

    pub fn of(wall: PrimitiveDateTime) -> Self {
        Self::from_month(wall.year(), wall.month())
    }

    pub fn calendar_month(&self) -> Month {
        Month::try_from(self.month).unwrap_or(Month::January)
    }

    pub fn next(&self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    /// `[year-month-01T00:00:00, next-month-01T00:00:00)` on the wall clock.
    pub fn contains(&self, wall: PrimitiveDateTime) -> bool {
        Self::of(wall) == *self
    }

    /// `October 2025`
    pub fn label(&self) -> String {
        format!("{} {}", self.calendar_month(), self.year)
    }
}

impl fmt::Display for MonthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// Incident selected for a month, with its occurrence instant already resolved.
#[derive(Debug, Clone, Copy)]
pub struct SelectedIncident<'a> {
    pub incident: &'a Incident,
    pub occurred_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct MonthSelection<'a> {
    pub month: MonthKey,
    pub incidents: Vec<SelectedIncident<'a>>,
    pub warnings: Vec<ValidationWarning>,
}

/// Keep incidents whose occurrence wall clock falls inside `month`. Incidents with an
/// unparseable `dateTime` are excluded and reported as warnings.
pub fn select_month(
    incidents: &[Incident],
    month: MonthKey,
    policy: TimezonePolicy,
) -> MonthSelection<'_> {
    let mut warnings = Vec::new();
    let mut selected = Vec::new();

    for inc in incidents {
        let subject = format!("incident {} dateTime", inc.report_id);
        let Some(occurred_at) = parse_field(
            "DATA_INCIDENT_TS_UNPARSEABLE",
            &subject,
            &inc.date_time,
            &mut warnings,
        ) else {
            continue;
        };
        if month.contains(policy.wall_clock(occurred_at)) {
            selected.push(SelectedIncident {
                incident: inc,
                occurred_at,
            });
        }
    }

    tracing::debug!(
        month = %month,
        scanned = incidents.len(),
        selected = selected.len(),
        warnings = warnings.len(),
        "selected incidents for month"
    );

    MonthSelection {
        month,
        incidents: selected,
        warnings,
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyStats {
    pub total_reports: i64,
    pub resolved_cases: i64,
    /// 0..=100, rounded half up.
    pub completion_rate: i64,
    pub avg_response_time_minutes: i64,
}

// Half-up rounding of num/den for non-negative inputs.
fn round_ratio(num: i64, den: i64) -> i64 {
    if den <= 0 {
        return 0;
    }
    (2 * num + den) / (2 * den)
}

fn response_sample(
    sel: &SelectedIncident<'_>,
    keywords: &KeywordTable,
    warnings: &mut Vec<ValidationWarning>,
) -> Option<i64> {
    let inc = sel.incident;
    let (idx, event) = keywords.first_response(&inc.timeline)?;
    // Same subject as the timeline merge so a bad field is reported once per record.
    let subject = format!("incident {} timeline[{idx}]", inc.report_id);
    let responded_at = parse_field(
        "DATA_RESPONSE_TS_UNPARSEABLE",
        &subject,
        &event.time,
        warnings,
    )?;

    let diff = (responded_at - sel.occurred_at).whole_minutes();
    if diff < 0 {
        warnings.push(
            ValidationWarning::new(
                "DATA_RESPONSE_BEFORE_OCCURRENCE",
                format!(
                    "Response event for {} precedes the incident; excluded from response time",
                    inc.report_id
                ),
            )
            .with_details(format!("dateTime={}; event_time={}", inc.date_time, event.time)),
        );
        return None;
    }
    Some(diff)
}

/// Statistics over an already-selected month. Response time uses the first dispatch/on-site
/// entry of each timeline in stored order; negative delays are discarded.
pub fn compute_monthly_stats(
    selection: &[SelectedIncident<'_>],
    keywords: &KeywordTable,
    warnings: &mut Vec<ValidationWarning>,
) -> (MonthlyStats, i64) {
    let total_reports = selection.len() as i64;
    if total_reports == 0 {
        return (MonthlyStats::default(), 0);
    }

    let resolved_cases = selection
        .iter()
        .filter(|s| s.incident.status == ReportStatus::Resolved)
        .count() as i64;

    let mut sum_minutes: i64 = 0;
    let mut samples: i64 = 0;
    for sel in selection {
        if let Some(diff) = response_sample(sel, keywords, warnings) {
            sum_minutes += diff;
            samples += 1;
        }
    }

    let stats = MonthlyStats {
        total_reports,
        resolved_cases,
        completion_rate: round_ratio(100 * resolved_cases, total_reports),
        avg_response_time_minutes: if samples > 0 {
            round_ratio(sum_minutes, samples)
        } else {
            0
        },
    };
    (stats, samples)
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LabelCount {
    pub label: String,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MonthlySummary {
    pub month: MonthKey,
    pub month_label: String,
    pub stats: MonthlyStats,
    pub response_samples: i64,
    pub status_counts: Vec<LabelCount>,
    pub urgency_counts: Vec<LabelCount>,
    pub category_counts: Vec<LabelCount>,
    pub data_error_count: i64,
    pub warnings: Vec<ValidationWarning>,
}

fn counts_in_order<K: Ord + Copy>(
    order: &[K],
    keys: impl Iterator<Item = K>,
    label: impl Fn(K) -> &'static str,
) -> Vec<LabelCount> {
    let mut map: BTreeMap<K, i64> = order.iter().map(|k| (*k, 0)).collect();
    for k in keys {
        *map.entry(k).or_default() += 1;
    }
    order
        .iter()
        .map(|k| LabelCount {
            label: label(*k).to_string(),
            count: map.get(k).copied().unwrap_or(0),
        })
        .collect()
}

/// Build the month's statistics and breakdowns from a snapshot. Never fails: bad records are
/// skipped and counted.
pub fn summarize_month(
    snapshot: &IncidentSnapshot,
    month: MonthKey,
    config: &ActivityLogConfig,
) -> MonthlySummary {
    let selection = select_month(snapshot.incidents(), month, config.timezone);
    summarize_selection(snapshot, &selection, config)
}

pub(crate) fn summarize_selection(
    snapshot: &IncidentSnapshot,
    selection: &MonthSelection<'_>,
    config: &ActivityLogConfig,
) -> MonthlySummary {
    let mut warnings: Vec<ValidationWarning> = snapshot.load_warnings().to_vec();
    warnings.extend(selection.warnings.iter().cloned());

    let (stats, response_samples) =
        compute_monthly_stats(&selection.incidents, &config.keywords, &mut warnings);

    let incidents = || selection.incidents.iter().map(|s| s.incident);
    let status_counts = counts_in_order(&ReportStatus::ALL, incidents().map(|i| i.status), |k| {
        k.as_str()
    });
    let urgency_counts = counts_in_order(&ReportUrgency::ALL, incidents().map(|i| i.urgency), |k| {
        k.as_str()
    });
    let category_counts =
        counts_in_order(&ReportCategory::ALL, incidents().map(|i| i.category), |k| {
            k.as_str()
        });

    let data_error_count = warnings.iter().filter(|w| is_data_error(w)).count() as i64;
    if data_error_count > 0 {
        tracing::warn!(month = %selection.month, data_error_count, "records skipped during aggregation");
    }

    MonthlySummary {
        month: selection.month,
        month_label: selection.month.label(),
        stats,
        response_samples,
        status_counts,
        urgency_counts,
        category_counts,
        data_error_count,
        warnings,
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MonthCount {
    pub month: MonthKey,
    pub label: String,
    pub count: i64,
}

/// Incident totals per month across the whole collection, oldest month first.
pub fn monthly_report_counts(
    incidents: &[Incident],
    policy: TimezonePolicy,
) -> (Vec<MonthCount>, Vec<ValidationWarning>) {
    let mut warnings = Vec::new();
    let mut map: BTreeMap<MonthKey, i64> = BTreeMap::new();
    for inc in incidents {
        let subject = format!("incident {} dateTime", inc.report_id);
        if let Some(at) = parse_field(
            "DATA_INCIDENT_TS_UNPARSEABLE",
            &subject,
            &inc.date_time,
            &mut warnings,
        ) {
            *map.entry(MonthKey::of(policy.wall_clock(at))).or_default() += 1;
        }
    }
    let counts = map
        .into_iter()
        .map(|(month, count)| MonthCount {
            month,
            label: month.label(),
            count,
        })
        .collect();
    (counts, warnings)
}
