use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::aggregate::{MonthKey, MonthSelection};
use crate::domain::ValidationWarning;
use crate::normalize::timestamps::{clock_label, date_label, parse_field, TimezonePolicy};

pub const BANNER_RULE_WIDTH: usize = 30;
pub const DATE_RULE_WIDTH: usize = 17;

/// Timeline entry flattened out of its incident, carrying the parent's identity plus the
/// calendar labels the renderer must use verbatim.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AnnotatedEvent {
    pub report_id: String,
    pub title: String,
    /// Stored timestamp, unchanged.
    pub time: String,
    /// `October 11, 2025`
    pub date: String,
    /// `17:55`
    pub clock: String,
    pub event: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedEvent {
    pub at: OffsetDateTime,
    pub annotated: AnnotatedEvent,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedTimeline {
    pub month: MonthKey,
    /// Newest first.
    pub events: Vec<MergedEvent>,
    pub warnings: Vec<ValidationWarning>,
}

impl MergedTimeline {
    pub fn annotated(&self) -> Vec<AnnotatedEvent> {
        self.events.iter().map(|e| e.annotated.clone()).collect()
    }

    pub fn groups(&self) -> Vec<DateGroup> {
        let annotated = self.annotated();
        group_by_date(&annotated)
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

/// Flatten every timeline of the selected incidents into one list sorted by instant,
/// newest first. Entries whose time cannot be parsed are left out and reported.
///
/// Ties keep a deterministic order: report ID, then original position.
pub fn merge_month_timeline(selection: &MonthSelection<'_>, policy: TimezonePolicy) -> MergedTimeline {
    let mut warnings = Vec::new();
    let mut events = Vec::new();

    for sel in &selection.incidents {
        let inc = sel.incident;
        for (idx, ev) in inc.timeline.iter().enumerate() {
            let subject = format!("incident {} timeline[{idx}]", inc.report_id);
            let Some(at) = parse_field("DATA_EVENT_TS_UNPARSEABLE", &subject, &ev.time, &mut warnings)
            else {
                continue;
            };
            let wall = policy.wall_clock(at);
            events.push(MergedEvent {
                at,
                annotated: AnnotatedEvent {
                    report_id: inc.report_id.clone(),
                    title: inc.title.clone(),
                    time: ev.time.clone(),
                    date: date_label(wall.date()),
                    clock: clock_label(wall),
                    event: ev.event.clone(),
                    author: ev.author.clone(),
                },
            });
        }
    }

    events.sort_by(|a, b| {
        b.at
            .cmp(&a.at)
            .then_with(|| a.annotated.report_id.cmp(&b.annotated.report_id))
    });

    tracing::debug!(
        month = %selection.month,
        events = events.len(),
        skipped = warnings
            .iter()
            .filter(|w| w.code == "DATA_EVENT_TS_UNPARSEABLE")
            .count(),
        "merged month timeline"
    );

    MergedTimeline {
        month: selection.month,
        events,
        warnings,
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EventLine {
    pub clock: String,
    pub event: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IncidentGroup {
    pub report_id: String,
    pub title: String,
    pub lines: Vec<EventLine>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DateGroup {
    pub date: String,
    pub incidents: Vec<IncidentGroup>,
}

/// Group already-ordered events by date and then by source incident. Nothing is re-sorted:
/// dates and incidents appear in order of their first (most recent) event.
pub fn group_by_date(events: &[AnnotatedEvent]) -> Vec<DateGroup> {
    let mut groups: Vec<DateGroup> = Vec::new();
    let mut date_index: HashMap<&str, usize> = HashMap::new();

    for ev in events {
        let gi = *date_index.entry(ev.date.as_str()).or_insert_with(|| {
            groups.push(DateGroup {
                date: ev.date.clone(),
                incidents: Vec::new(),
            });
            groups.len() - 1
        });
        let group = &mut groups[gi];

        let line = EventLine {
            clock: ev.clock.clone(),
            event: ev.event.clone(),
        };
        match group
            .incidents
            .iter_mut()
            .find(|g| g.report_id == ev.report_id && g.title == ev.title)
        {
            Some(g) => g.lines.push(line),
            None => group.incidents.push(IncidentGroup {
                report_id: ev.report_id.clone(),
                title: ev.title.clone(),
                lines: vec![line],
            }),
        }
    }
    groups
}

pub fn banner(month_label: &str) -> String {
    format!(
        "Activity Log for {month_label}\n{}\n",
        "=".repeat(BANNER_RULE_WIDTH)
    )
}

/// Banner plus an explicit statement that the month had no activity.
pub fn no_activity_text(month_label: &str) -> String {
    let mut out = banner(month_label);
    out.push_str(&format!(
        "\nNo incident activity recorded for {month_label}.\n"
    ));
    out
}

/// Fixed-format plain text for grouped events.
pub fn render_grouped_text(month_label: &str, groups: &[DateGroup]) -> String {
    if groups.is_empty() {
        return no_activity_text(month_label);
    }

    let mut out = banner(month_label);
    for group in groups {
        out.push('\n');
        out.push_str(&group.date);
        out.push('\n');
        out.push_str(&"-".repeat(DATE_RULE_WIDTH));
        out.push('\n');
        for (i, inc) in group.incidents.iter().enumerate() {
            if i > 0 {
                out.push('\n');
            }
            out.push_str(&format!("Incident: {} - {}\n", inc.report_id, inc.title));
            for line in &inc.lines {
                out.push_str(&format!("  - {}: {}\n", line.clock, line.event));
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn ev(report_id: &str, title: &str, date: &str, clock: &str, text: &str) -> AnnotatedEvent {
        AnnotatedEvent {
            report_id: report_id.to_string(),
            title: title.to_string(),
            time: String::new(),
            date: date.to_string(),
            clock: clock.to_string(),
            event: text.to_string(),
            author: None,
        }
    }

    #[test]
    fn groups_by_date_then_incident_in_first_seen_order() {
        let events = vec![
            ev("#RPT-2", "Flood", "October 11, 2025", "18:00", "Boats dispatched."),
            ev("#RPT-1", "Fire", "October 11, 2025", "17:55", "Crew on site."),
            ev("#RPT-2", "Flood", "October 11, 2025", "17:50", "Report submitted."),
            ev("#RPT-1", "Fire", "October 10, 2025", "23:00", "Report submitted."),
        ];
        let groups = group_by_date(&events);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].date, "October 11, 2025");
        let ids: Vec<_> = groups[0].incidents.iter().map(|g| g.report_id.as_str()).collect();
        assert_eq!(ids, vec!["#RPT-2", "#RPT-1"]);
        assert_eq!(groups[0].incidents[0].lines.len(), 2);
        assert_eq!(groups[1].incidents[0].lines[0].clock, "23:00");
    }

    #[test]
    fn renders_fixed_format_text() {
        let events = vec![
            ev("#RPT-2", "Flood", "October 11, 2025", "18:00", "Boats dispatched."),
            ev("#RPT-1", "Fire", "October 11, 2025", "17:55", "Crew on site."),
            ev("#RPT-1", "Fire", "October 10, 2025", "23:00", "Report submitted."),
        ];
        let text = render_grouped_text("October 2025", &group_by_date(&events));
        let expected = "\
Activity Log for October 2025
==============================

October 11, 2025
-----------------
Incident: #RPT-2 - Flood
  - 18:00: Boats dispatched.

Incident: #RPT-1 - Fire
  - 17:55: Crew on site.

October 10, 2025
-----------------
Incident: #RPT-1 - Fire
  - 23:00: Report submitted.
";
        assert_eq!(text, expected);
    }

    #[test]
    fn empty_groups_render_no_activity() {
        let text = render_grouped_text("September 2025", &[]);
        assert!(text.starts_with("Activity Log for September 2025\n"));
        assert!(text.contains("No incident activity recorded for September 2025."));
    }
}
