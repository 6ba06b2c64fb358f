use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Lifecycle of a citizen report: For Review -> In Progress -> Resolved.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ReportStatus {
    #[serde(rename = "For Review")]
    ForReview,
    #[serde(rename = "In Progress")]
    InProgress,
    #[serde(rename = "Resolved")]
    Resolved,
}

impl ReportStatus {
    pub const ALL: [ReportStatus; 3] = [
        ReportStatus::ForReview,
        ReportStatus::InProgress,
        ReportStatus::Resolved,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ReportStatus::ForReview => "For Review",
            ReportStatus::InProgress => "In Progress",
            ReportStatus::Resolved => "Resolved",
        }
    }
}

impl fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ReportUrgency {
    High,
    Medium,
    Low,
}

impl ReportUrgency {
    pub const ALL: [ReportUrgency; 3] = [ReportUrgency::High, ReportUrgency::Medium, ReportUrgency::Low];

    pub fn as_str(self) -> &'static str {
        match self {
            ReportUrgency::High => "High",
            ReportUrgency::Medium => "Medium",
            ReportUrgency::Low => "Low",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ReportCategory {
    Fire,
    Emergency,
    Disaster,
    Crime,
    Other,
}

impl ReportCategory {
    pub const ALL: [ReportCategory; 5] = [
        ReportCategory::Fire,
        ReportCategory::Emergency,
        ReportCategory::Disaster,
        ReportCategory::Crime,
        ReportCategory::Other,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ReportCategory::Fire => "Fire",
            ReportCategory::Emergency => "Emergency",
            ReportCategory::Disaster => "Disaster",
            ReportCategory::Crime => "Crime",
            ReportCategory::Other => "Other",
        }
    }

    /// Three-letter code used inside report IDs (`#RPT-20251011-FIR-078`).
    pub fn report_code(self) -> &'static str {
        match self {
            ReportCategory::Fire => "FIR",
            ReportCategory::Emergency => "EMG",
            ReportCategory::Disaster => "DIS",
            ReportCategory::Crime => "CRM",
            ReportCategory::Other => "OTH",
        }
    }
}

/// One free-text entry on an incident timeline.
///
/// `time` is kept as the stored string; it is parsed at the point of use so a malformed
/// value becomes a data-quality warning rather than a decode failure of the whole report.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TimelineEvent {
    #[serde(default)]
    pub time: String,
    pub event: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_id: Option<String>,
}

impl TimelineEvent {
    pub fn new(time: impl Into<String>, event: impl Into<String>) -> Self {
        Self {
            time: time.into(),
            event: event.into(),
            author: None,
            author_id: None,
        }
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: String,
    pub author: String,
    #[serde(default)]
    pub author_id: String,
    pub text: String,
    pub timestamp: String,
}

/// Incident report document as stored in the `reports` collection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Incident {
    pub id: String,
    pub report_id: String,
    pub title: String,
    pub category: ReportCategory,
    #[serde(default)]
    pub location: String,
    /// Occurrence time; the month-bucketing key.
    #[serde(default)]
    pub date_time: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reporter_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reporter_contact: Option<String>,
    pub status: ReportStatus,
    pub urgency: ReportUrgency,
    #[serde(default)]
    pub assigned_departments: BTreeSet<String>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub timeline: Vec<TimelineEvent>,
    #[serde(default)]
    pub notes: Vec<Note>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ValidationWarning {
    pub code: String,
    pub message: String,
    pub details: Option<String>,
}

impl ValidationWarning {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

/// Read-only view of the incident collection taken at invocation time.
///
/// Documents that could not be decoded are skipped and recorded in `load_warnings`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IncidentSnapshot {
    incidents: Vec<Incident>,
    load_warnings: Vec<ValidationWarning>,
}

impl IncidentSnapshot {
    pub fn new(incidents: Vec<Incident>) -> Self {
        Self {
            incidents,
            load_warnings: Vec::new(),
        }
    }

    pub fn with_load_warnings(mut self, warnings: Vec<ValidationWarning>) -> Self {
        self.load_warnings = warnings;
        self
    }

    /// Decode a JSON array export of the collection. Elements that are not valid incident
    /// documents are skipped with a `DATA_DOCUMENT_UNDECODABLE` warning.
    pub fn from_json_str(json: &str) -> Result<Self, AppError> {
        let values: Vec<serde_json::Value> = serde_json::from_str(json).map_err(|e| {
            AppError::new("SNAPSHOT_DECODE_FAILED", "Incident export must be a JSON array")
                .with_details(e.to_string())
        })?;

        let mut incidents = Vec::with_capacity(values.len());
        let mut warnings = Vec::new();
        for (idx, value) in values.into_iter().enumerate() {
            let label = value
                .get("id")
                .and_then(|v| v.as_str())
                .map(|s| s.to_string())
                .unwrap_or_else(|| format!("index {idx}"));
            if let Some(inc) = decode_incident_value(value, &label, &mut warnings) {
                incidents.push(inc);
            }
        }
        Ok(Self::new(incidents).with_load_warnings(warnings))
    }

    pub fn incidents(&self) -> &[Incident] {
        &self.incidents
    }

    pub fn load_warnings(&self) -> &[ValidationWarning] {
        &self.load_warnings
    }

    pub fn len(&self) -> usize {
        self.incidents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.incidents.is_empty()
    }
}

/// Collection-read seam: anything that can hand the aggregator a full snapshot.
pub trait IncidentSource {
    fn read_snapshot(&self) -> Result<IncidentSnapshot, AppError>;
}

impl IncidentSource for IncidentSnapshot {
    fn read_snapshot(&self) -> Result<IncidentSnapshot, AppError> {
        Ok(self.clone())
    }
}

pub(crate) fn decode_incident_value(
    value: serde_json::Value,
    label: &str,
    warnings: &mut Vec<ValidationWarning>,
) -> Option<Incident> {
    match serde_json::from_value::<Incident>(value) {
        Ok(inc) => Some(inc),
        Err(e) => {
            tracing::warn!(document = label, error = %e, "skipping undecodable incident document");
            warnings.push(
                ValidationWarning::new(
                    "DATA_DOCUMENT_UNDECODABLE",
                    format!("Incident document {label} could not be decoded; skipped"),
                )
                .with_details(e.to_string()),
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_stored_document_shape() {
        let json = r##"{
            "id": "abc",
            "reportId": "#RPT-20251011-FIR-078",
            "title": "Residential Fire",
            "category": "Fire",
            "location": "Pablo Ocampo Street",
            "dateTime": "2025-10-11T17:33:00+08:00",
            "description": "Kitchen fire",
            "status": "In Progress",
            "urgency": "High",
            "assignedDepartments": ["dep-1", "dep-2", "dep-1"],
            "timeline": [
                { "time": "2025-10-11T17:33:00+08:00", "event": "Report submitted." }
            ]
        }"##;
        let inc: Incident = serde_json::from_str(json).expect("decode");
        assert_eq!(inc.status, ReportStatus::InProgress);
        assert_eq!(inc.assigned_departments.len(), 2);
        assert!(inc.notes.is_empty());
        assert_eq!(inc.timeline[0].author, None);
    }

    #[test]
    fn snapshot_skips_bad_documents_and_counts_them() {
        let json = r##"[
            {"id": "a", "reportId": "#RPT-20251001-CRM-001", "title": "Theft", "category": "Crime",
             "dateTime": "2025-10-01T10:00:00Z", "status": "Resolved", "urgency": "Low"},
            {"id": "b", "title": "missing most fields"}
        ]"##;
        let snap = IncidentSnapshot::from_json_str(json).expect("snapshot");
        assert_eq!(snap.len(), 1);
        assert_eq!(snap.load_warnings().len(), 1);
        assert_eq!(snap.load_warnings()[0].code, "DATA_DOCUMENT_UNDECODABLE");
    }

    #[test]
    fn snapshot_rejects_non_array_export() {
        let err = IncidentSnapshot::from_json_str("{}").expect_err("should fail");
        assert_eq!(err.code, "SNAPSHOT_DECODE_FAILED");
    }
}
