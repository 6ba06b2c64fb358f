use std::collections::BTreeSet;

use rusqlite::{Connection, OptionalExtension};
use time::OffsetDateTime;

use crate::domain::{
    decode_incident_value, Incident, IncidentSnapshot, IncidentSource, Note, ReportStatus,
    TimelineEvent, ValidationWarning,
};
use crate::error::AppError;
use crate::normalize::timestamps::canonical_rfc3339_utc;

/// Insert or fully replace the stored document for `incident.id` (last write wins).
pub fn upsert_incident(conn: &Connection, incident: &Incident) -> Result<(), AppError> {
    if incident.id.trim().is_empty() {
        return Err(AppError::new("STORE_INVALID_ID", "Incident id must not be empty"));
    }
    let doc_json = serde_json::to_string(incident).map_err(|e| {
        AppError::new("STORE_ENCODE_FAILED", "Failed to encode incident document")
            .with_details(e.to_string())
    })?;
    let updated_at = match incident.updated_at.clone() {
        Some(ts) => ts,
        None => canonical_rfc3339_utc(OffsetDateTime::now_utc())?,
    };

    conn.execute(
        r#"
      INSERT INTO reports(id, doc_json, updated_at) VALUES (?1, ?2, ?3)
      ON CONFLICT(id) DO UPDATE SET doc_json = excluded.doc_json, updated_at = excluded.updated_at
      "#,
        (&incident.id, &doc_json, &updated_at),
    )
    .map_err(|e| {
        AppError::new("DB_WRITE_FAILED", "Failed to write incident document")
            .with_details(format!("id={}; err={}", incident.id, e))
    })?;
    Ok(())
}

pub fn get_incident(conn: &Connection, id: &str) -> Result<Incident, AppError> {
    let doc: Option<String> = conn
        .query_row("SELECT doc_json FROM reports WHERE id = ?1", [id], |row| {
            row.get(0)
        })
        .optional()
        .map_err(|e| {
            AppError::new("DB_QUERY_FAILED", "Failed to query incident document")
                .with_details(e.to_string())
        })?;

    let doc = doc.ok_or_else(|| {
        AppError::new("STORE_NOT_FOUND", "Incident not found").with_details(format!("id={id}"))
    })?;

    serde_json::from_str(&doc).map_err(|e| {
        AppError::new("STORE_DOCUMENT_INVALID", "Stored incident document is invalid")
            .with_details(format!("id={id}; err={e}"))
    })
}

pub fn count_incidents(conn: &Connection) -> Result<i64, AppError> {
    conn.query_row("SELECT COUNT(*) FROM reports", [], |row| row.get(0))
        .map_err(|e| {
            AppError::new("DB_QUERY_FAILED", "Failed to count incidents")
                .with_details(e.to_string())
        })
}

/// Read every stored document. Undecodable documents are skipped and reported on the
/// snapshot instead of failing the read.
pub fn load_snapshot(conn: &Connection) -> Result<IncidentSnapshot, AppError> {
    let mut stmt = conn
        .prepare("SELECT id, doc_json FROM reports ORDER BY id ASC")
        .map_err(|e| {
            AppError::new("DB_QUERY_FAILED", "Failed to prepare reports query")
                .with_details(e.to_string())
        })?;

    let rows = stmt
        .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))
        .map_err(|e| {
            AppError::new("DB_QUERY_FAILED", "Failed to query reports").with_details(e.to_string())
        })?;

    let mut incidents = Vec::new();
    let mut warnings = Vec::new();
    for r in rows {
        let (id, doc) = r.map_err(|e| {
            AppError::new("DB_QUERY_FAILED", "Failed to read report row").with_details(e.to_string())
        })?;
        match serde_json::from_str::<serde_json::Value>(&doc) {
            Ok(value) => {
                if let Some(inc) = decode_incident_value(value, &id, &mut warnings) {
                    incidents.push(inc);
                }
            }
            Err(e) => {
                tracing::warn!(document = %id, error = %e, "skipping malformed report JSON");
                warnings.push(
                    ValidationWarning::new(
                        "DATA_DOCUMENT_UNDECODABLE",
                        format!("Incident document {id} is not valid JSON; skipped"),
                    )
                    .with_details(e.to_string()),
                );
            }
        }
    }

    Ok(IncidentSnapshot::new(incidents).with_load_warnings(warnings))
}

impl IncidentSource for Connection {
    fn read_snapshot(&self) -> Result<IncidentSnapshot, AppError> {
        load_snapshot(self)
    }
}

fn replace_with<F>(conn: &Connection, id: &str, at: OffsetDateTime, mutate: F) -> Result<Incident, AppError>
where
    F: FnOnce(&mut Incident),
{
    let mut incident = get_incident(conn, id)?;
    mutate(&mut incident);
    incident.updated_at = Some(canonical_rfc3339_utc(at)?);
    upsert_incident(conn, &incident)?;
    Ok(incident)
}

/// Append a timeline entry stamped with `at` (stored as RFC3339 UTC) and replace the
/// whole document.
pub fn append_timeline_event(
    conn: &Connection,
    id: &str,
    text: &str,
    author: Option<&str>,
    at: OffsetDateTime,
) -> Result<Incident, AppError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(AppError::new(
            "STORE_EVENT_EMPTY",
            "Timeline event cannot be empty",
        ));
    }
    let time = canonical_rfc3339_utc(at)?;
    let event = TimelineEvent {
        time,
        event: text.to_string(),
        author: author.map(|a| a.to_string()),
        author_id: None,
    };
    let updated = replace_with(conn, id, at, move |inc| inc.timeline.push(event))?;
    tracing::debug!(id, events = updated.timeline.len(), "appended timeline event");
    Ok(updated)
}

pub fn add_note(
    conn: &Connection,
    id: &str,
    note_id: &str,
    author: &str,
    author_id: &str,
    text: &str,
    at: OffsetDateTime,
) -> Result<Incident, AppError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(AppError::new("STORE_NOTE_EMPTY", "Note cannot be empty"));
    }
    let note = Note {
        id: note_id.to_string(),
        author: author.to_string(),
        author_id: author_id.to_string(),
        text: text.to_string(),
        timestamp: canonical_rfc3339_utc(at)?,
    };
    replace_with(conn, id, at, move |inc| inc.notes.push(note))
}

pub fn update_status(
    conn: &Connection,
    id: &str,
    status: ReportStatus,
    at: OffsetDateTime,
) -> Result<Incident, AppError> {
    replace_with(conn, id, at, |inc| inc.status = status)
}

/// Replace the assigned department set. Blank identifiers are dropped and duplicates collapse.
pub fn assign_departments<I, S>(
    conn: &Connection,
    id: &str,
    departments: I,
    at: OffsetDateTime,
) -> Result<Incident, AppError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let set: BTreeSet<String> = departments
        .into_iter()
        .map(|d| d.as_ref().trim().to_string())
        .filter(|d| !d.is_empty())
        .collect();
    replace_with(conn, id, at, move |inc| inc.assigned_departments = set)
}
