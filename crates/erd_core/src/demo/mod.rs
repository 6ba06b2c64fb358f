use rusqlite::Connection;

use crate::domain::{Incident, ReportCategory, ReportStatus, ReportUrgency, TimelineEvent};
use crate::error::AppError;
use crate::repo::upsert_incident;

#[allow(clippy::too_many_arguments)]
fn report(
    id: &str,
    report_id: &str,
    title: &str,
    category: ReportCategory,
    location: &str,
    date_time: &str,
    status: ReportStatus,
    urgency: ReportUrgency,
    departments: &[&str],
    timeline: &[(&str, &str)],
) -> Incident {
    Incident {
        id: id.to_string(),
        report_id: report_id.to_string(),
        title: title.to_string(),
        category,
        location: location.to_string(),
        date_time: date_time.to_string(),
        description: String::new(),
        reporter_name: None,
        reporter_contact: None,
        status,
        urgency,
        assigned_departments: departments.iter().map(|d| d.to_string()).collect(),
        images: Vec::new(),
        timeline: timeline
            .iter()
            .map(|(time, event)| TimelineEvent::new(*time, *event))
            .collect(),
        notes: Vec::new(),
        created_at: Some(date_time.to_string()),
        updated_at: Some(date_time.to_string()),
    }
}

/// Sanitized, deterministic October 2025 dataset (plus one September report) that makes the
/// monthly summary and activity log meaningful. All timestamps carry `+08:00`.
pub fn demo_incidents() -> Vec<Incident> {
    use ReportCategory::*;
    use ReportStatus::*;
    use ReportUrgency::*;

    vec![
        report(
            "report-078",
            "#RPT-20251011-FIR-078",
            "Residential Fire – Structure Fire Reported",
            Fire,
            "Pablo Ocampo Street, Makati City",
            "2025-10-11T17:33:00+08:00",
            InProgress,
            High,
            &["dep-1", "dep-2"],
            &[
                ("2025-10-11T17:33:00+08:00", "Report submitted by Maria Dela Cruz."),
                ("2025-10-11T17:36:00+08:00", "Acknowledged by Makati Fire Station and Barangay Fire Brigade."),
                ("2025-10-11T17:42:00+08:00", "Fire response units and EMTs dispatched."),
                ("2025-10-11T17:55:00+08:00", "Firefighters on site; active suppression operations in progress."),
            ],
        ),
        report(
            "report-077",
            "#RPT-20251011-FIR-077",
            "Residential Fire – Electrical Malfunction",
            Fire,
            "Zobel Roxas Street, Makati City",
            "2025-10-11T16:30:00+08:00",
            InProgress,
            High,
            &["dep-1"],
            &[
                ("2025-10-11T16:30:00+08:00", "Report submitted by citizen."),
                ("2025-10-11T16:33:00+08:00", "Acknowledged by Makati Fire Station and Barangay Fire Volunteers."),
                ("2025-10-11T16:38:00+08:00", "Fire response units and EMTs dispatched."),
                ("2025-10-11T16:50:00+08:00", "Responders on site; active suppression and containment efforts ongoing."),
            ],
        ),
        report(
            "report-075",
            "#RPT-20251010-FIR-075",
            "Residential Fire – Kitchen Fire",
            Fire,
            "P. Burgos Street, Barangay Poblacion, Makati City",
            "2025-10-10T22:45:00+08:00",
            Resolved,
            Medium,
            &["dep-1"],
            &[
                ("2025-10-10T22:45:00+08:00", "Report submitted by Liza Ramos."),
                ("2025-10-10T22:47:00+08:00", "Acknowledged by Makati Fire Station and Barangay Poblacion volunteers."),
                ("2025-10-10T22:55:00+08:00", "Fire units arrived; blaze under control."),
                ("2025-10-10T23:10:00+08:00", "Fire declared out; no injuries reported."),
            ],
        ),
        report(
            "report-074",
            "#RPT-20251010-FIR-074",
            "Residential Fire – Structure Fire Reported",
            Fire,
            "J.P. Rizal Extension, Barangay Olympia, Makati City",
            "2025-10-10T16:20:00+08:00",
            Resolved,
            Medium,
            &["dep-1", "dep-5"],
            &[
                ("2025-10-10T16:45:00+08:00", "Scene cleared; one resident treated for minor smoke inhalation."),
                ("2025-10-10T16:20:00+08:00", "Report submitted by Mark Dela Peña."),
                ("2025-10-10T16:23:00+08:00", "Fire response dispatched from Makati Fire Station."),
                ("2025-10-10T16:32:00+08:00", "Fire brought under control."),
            ],
        ),
        report(
            "report-012",
            "#RPT-20251003-EMG-012",
            "Vehicular Accident at Ayala Avenue",
            Emergency,
            "Ayala Avenue corner Paseo de Roxas",
            "2025-10-03T08:15:00+08:00",
            Resolved,
            High,
            &["dep-2", "dep-4"],
            &[
                ("2025-10-03T08:15:00+08:00", "C3 camera operator spotted the incident."),
                ("2025-10-03T08:17:00+08:00", "DRRMO ambulance and police dispatched."),
                ("2025-10-03T08:40:00+08:00", "Injured transported; lanes reopened."),
            ],
        ),
        report(
            "report-009",
            "#RPT-20251002-DIS-009",
            "Flash Flooding along Osmeña Highway",
            Disaster,
            "Osmeña Highway, Barangay Pio del Pilar",
            "2025-10-02T14:05:00+08:00",
            ForReview,
            Medium,
            &[],
            &[],
        ),
        report(
            "report-003",
            "#RPT-20250928-CRM-003",
            "Snatching Incident near Glorietta",
            Crime,
            "Ayala Center, Makati City",
            "2025-09-28T19:10:00+08:00",
            Resolved,
            Low,
            &["dep-4"],
            &[
                ("2025-09-28T19:10:00+08:00", "Report submitted by Andrea Lim."),
                ("2025-09-28T19:18:00+08:00", "Police mobile unit dispatched."),
            ],
        ),
    ]
}

/// Write the demo dataset into the store (whole-document replace per report).
pub fn seed_demo_dataset(conn: &Connection) -> Result<usize, AppError> {
    let incidents = demo_incidents();
    for inc in &incidents {
        upsert_incident(conn, inc)?;
    }
    tracing::info!(reports = incidents.len(), "seeded demo dataset");
    Ok(incidents.len())
}
