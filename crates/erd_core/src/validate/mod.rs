use serde::{Deserialize, Serialize};
use time::format_description;
use time::Date;

use crate::domain::{Incident, IncidentSnapshot, ValidationWarning};
use crate::normalize::timestamps::parse_timestamp;

/// Split `#RPT-<YYYYMMDD>-<CAT>-<seq>` into its parts when well formed.
fn parse_report_id(raw: &str) -> Option<(Date, &str, &str)> {
    let rest = raw.strip_prefix("#RPT-")?;
    let mut parts = rest.split('-');
    let (date, cat, seq) = (parts.next()?, parts.next()?, parts.next()?);
    if parts.next().is_some() {
        return None;
    }
    if date.len() != 8 || !date.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if cat.len() != 3 || !cat.bytes().all(|b| b.is_ascii_uppercase()) {
        return None;
    }
    if seq.is_empty() || !seq.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let items = format_description::parse("[year][month][day]").ok()?;
    let date = Date::parse(date, &items).ok()?;
    Some((date, cat, seq))
}

fn ts_warning(field: &str, raw: &str) -> ValidationWarning {
    ValidationWarning::new(
        "VALIDATION_TS_UNPARSEABLE",
        format!("Unparseable timestamp for {field}"),
    )
    .with_details(format!("value={raw}"))
}

/// Check one report document. Returns warnings only; nothing here rejects a report.
pub fn validate_incident(incident: &Incident) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();

    match parse_report_id(&incident.report_id) {
        None => warnings.push(
            ValidationWarning::new(
                "VALIDATION_REPORT_ID_FORMAT",
                "Report ID must look like #RPT-YYYYMMDD-CAT-seq",
            )
            .with_details(format!("report_id={}", incident.report_id)),
        ),
        Some((_, cat, _)) if cat != incident.category.report_code() => warnings.push(
            ValidationWarning::new(
                "VALIDATION_REPORT_ID_CATEGORY_MISMATCH",
                "Report ID category code does not match the report category",
            )
            .with_details(format!(
                "report_id={}; category={}",
                incident.report_id,
                incident.category.as_str()
            )),
        ),
        Some(_) => {}
    }

    let occurred = parse_timestamp(&incident.date_time).map(|p| p.instant);
    if occurred.is_none() {
        warnings.push(ts_warning("dateTime", &incident.date_time));
    }

    for (idx, ev) in incident.timeline.iter().enumerate() {
        let field = format!("timeline[{idx}].time");
        if ev.event.trim().is_empty() {
            warnings.push(
                ValidationWarning::new("VALIDATION_EVENT_EMPTY", "Timeline event text is empty")
                    .with_details(format!("index={idx}")),
            );
        }
        match parse_timestamp(&ev.time) {
            None => warnings.push(ts_warning(&field, &ev.time)),
            Some(p) => {
                if let Some(occurred) = occurred {
                    if p.instant < occurred {
                        warnings.push(
                            ValidationWarning::new(
                                "VALIDATION_EVENT_BEFORE_OCCURRENCE",
                                "Timeline event is timestamped before the incident occurred",
                            )
                            .with_details(format!(
                                "index={idx}; dateTime={}; time={}",
                                incident.date_time, ev.time
                            )),
                        );
                    }
                }
            }
        }
    }

    warnings
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IncidentValidationReportItem {
    pub id: String,
    pub report_id: String,
    pub title: String,
    pub warnings: Vec<ValidationWarning>,
}

/// Validate every report in the snapshot, ordered by report ID then id.
pub fn validate_snapshot(snapshot: &IncidentSnapshot) -> Vec<IncidentValidationReportItem> {
    let mut out: Vec<IncidentValidationReportItem> = snapshot
        .incidents()
        .iter()
        .map(|inc| IncidentValidationReportItem {
            id: inc.id.clone(),
            report_id: inc.report_id.clone(),
            title: inc.title.clone(),
            warnings: validate_incident(inc),
        })
        .collect();
    out.sort_by(|a, b| (&a.report_id, &a.id).cmp(&(&b.report_id, &b.id)));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::demo::demo_incidents;
    use crate::domain::{ReportCategory, TimelineEvent};

    #[test]
    fn demo_dataset_is_clean() {
        let snap = IncidentSnapshot::new(demo_incidents());
        for item in validate_snapshot(&snap) {
            assert!(item.warnings.is_empty(), "{}: {:?}", item.report_id, item.warnings);
        }
    }

    #[test]
    fn report_id_format_is_checked() {
        assert!(parse_report_id("#RPT-20251011-FIR-078").is_some());
        assert!(parse_report_id("RPT-20251011-FIR-078").is_none());
        assert!(parse_report_id("#RPT-20251399-FIR-078").is_none());
        assert!(parse_report_id("#RPT-20251011-fir-078").is_none());
        assert!(parse_report_id("#RPT-20251011-FIR-").is_none());
    }

    #[test]
    fn flags_category_mismatch_and_bad_events() {
        let mut inc = demo_incidents().remove(0);
        inc.category = ReportCategory::Crime;
        inc.timeline.push(TimelineEvent::new("soon", "  "));
        inc.timeline
            .push(TimelineEvent::new("2025-10-11T17:00:00+08:00", "Early dispatched entry"));

        let codes: Vec<String> = validate_incident(&inc).into_iter().map(|w| w.code).collect();
        assert!(codes.contains(&"VALIDATION_REPORT_ID_CATEGORY_MISMATCH".to_string()));
        assert!(codes.contains(&"VALIDATION_EVENT_EMPTY".to_string()));
        assert!(codes.contains(&"VALIDATION_TS_UNPARSEABLE".to_string()));
        assert!(codes.contains(&"VALIDATION_EVENT_BEFORE_OCCURRENCE".to_string()));
    }
}
