use std::sync::mpsc;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::aggregate::{is_data_error, select_month, summarize_selection, MonthKey, MonthlySummary};
use crate::config::ActivityLogConfig;
use crate::domain::{IncidentSnapshot, IncidentSource, ValidationWarning};
use crate::error::AppError;
use crate::export::activity_log_filename;
use crate::timeline::{
    group_by_date, merge_month_timeline, no_activity_text, render_grouped_text, AnnotatedEvent,
    MergedTimeline,
};

/// Payload handed to a text-generation adapter. `timeline` is already in final order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ActivityLogRequest {
    /// `October 2025`
    pub month: String,
    pub timeline: Vec<AnnotatedEvent>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ActivityLogResponse {
    pub log: String,
}

/// Pluggable formatter. Implementations render text only; they must not re-sort, regroup or
/// rewrite timestamps.
pub trait ActivityLogRenderer {
    fn render(&self, request: &ActivityLogRequest) -> Result<ActivityLogResponse, AppError>;
}

/// Deterministic renderer implementing the fixed plain-text layout.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextRenderer;

impl ActivityLogRenderer for PlainTextRenderer {
    fn render(&self, request: &ActivityLogRequest) -> Result<ActivityLogResponse, AppError> {
        let groups = group_by_date(&request.timeline);
        Ok(ActivityLogResponse {
            log: render_grouped_text(&request.month, &groups),
        })
    }
}

/// Everything computed before the adapter is involved. `summary` stays valid even when
/// generation later fails.
#[derive(Debug, Clone)]
pub struct PreparedActivityLog {
    pub summary: MonthlySummary,
    pub merged: MergedTimeline,
    pub request: ActivityLogRequest,
    /// Deadline for the renderer, taken from `ActivityLogConfig::generation_timeout_ms`.
    pub generation_timeout: Duration,
}

impl PreparedActivityLog {
    pub fn month(&self) -> MonthKey {
        self.summary.month
    }

    /// Aggregation warnings followed by timeline-merge warnings. A field already reported by
    /// the aggregation step is not reported again by the merge.
    pub fn warnings(&self) -> Vec<ValidationWarning> {
        self.summary
            .warnings
            .iter()
            .chain(self.merged.warnings.iter())
            .cloned()
            .collect()
    }

    pub fn data_error_count(&self) -> i64 {
        self.summary.data_error_count
            + self.merged.warnings.iter().filter(|w| is_data_error(w)).count() as i64
    }
}

pub fn prepare_monthly_activity_log(
    snapshot: &IncidentSnapshot,
    month: MonthKey,
    config: &ActivityLogConfig,
) -> PreparedActivityLog {
    let selection = select_month(snapshot.incidents(), month, config.timezone);
    let summary = summarize_selection(snapshot, &selection, config);
    let mut merged = merge_month_timeline(&selection, config.timezone);
    merged.warnings.retain(|w| {
        !summary
            .warnings
            .iter()
            .any(|seen| seen.message == w.message && seen.details == w.details)
    });
    let request = ActivityLogRequest {
        month: month.label(),
        timeline: merged.annotated(),
    };
    PreparedActivityLog {
        summary,
        merged,
        request,
        generation_timeout: config.generation_timeout(),
    }
}

pub fn prepare_from_source(
    source: &dyn IncidentSource,
    month: MonthKey,
    config: &ActivityLogConfig,
) -> Result<PreparedActivityLog, AppError> {
    let snapshot = source.read_snapshot()?;
    Ok(prepare_monthly_activity_log(&snapshot, month, config))
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LogOrigin {
    Renderer,
    NoActivity,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ActivityLog {
    pub month: MonthKey,
    pub filename: String,
    pub text: String,
    pub origin: LogOrigin,
}

fn no_activity_log(prepared: &PreparedActivityLog) -> ActivityLog {
    tracing::info!(month = %prepared.month(), "no timeline activity; emitting explicit empty log");
    ActivityLog {
        month: prepared.month(),
        filename: activity_log_filename(prepared.month()),
        text: no_activity_text(&prepared.request.month),
        origin: LogOrigin::NoActivity,
    }
}

fn accept_response(
    prepared: &PreparedActivityLog,
    result: Result<ActivityLogResponse, AppError>,
) -> Result<ActivityLog, AppError> {
    let response = result.map_err(|e| {
        if e.is_generation_failure() {
            e
        } else {
            AppError::generation_failed("Activity log renderer failed").with_details(e.to_string())
        }
    })?;
    if response.log.trim().is_empty() {
        return Err(AppError::generation_failed(
            "Activity log renderer returned an empty log",
        ));
    }
    Ok(ActivityLog {
        month: prepared.month(),
        filename: activity_log_filename(prepared.month()),
        text: response.log,
        origin: LogOrigin::Renderer,
    })
}

/// Render the prepared month. An empty timeline never reaches the renderer; it yields the
/// explicit no-activity text instead.
pub fn generate_activity_log(
    prepared: &PreparedActivityLog,
    renderer: &dyn ActivityLogRenderer,
) -> Result<ActivityLog, AppError> {
    if prepared.request.timeline.is_empty() {
        return Ok(no_activity_log(prepared));
    }
    let started = Instant::now();
    let result = renderer.render(&prepared.request);
    let out = accept_response(prepared, result);
    match &out {
        Ok(_) => tracing::info!(
            month = %prepared.month(),
            events = prepared.request.timeline.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "activity log generated"
        ),
        Err(e) => tracing::warn!(month = %prepared.month(), error = %e, "activity log generation failed"),
    }
    out
}

/// Same as [`generate_activity_log`] but the renderer runs on a worker thread and is
/// abandoned after the configured generation timeout. A late answer is dropped; source
/// incidents are never touched.
pub fn generate_activity_log_with_timeout(
    prepared: &PreparedActivityLog,
    renderer: Arc<dyn ActivityLogRenderer + Send + Sync>,
) -> Result<ActivityLog, AppError> {
    let timeout = prepared.generation_timeout;
    if prepared.request.timeline.is_empty() {
        return Ok(no_activity_log(prepared));
    }

    let (tx, rx) = mpsc::channel();
    let request = prepared.request.clone();
    std::thread::Builder::new()
        .name("activity-log-render".to_string())
        .spawn(move || {
            // Receiver may be gone after a timeout.
            let _ = tx.send(renderer.render(&request));
        })
        .map_err(|e| {
            AppError::generation_failed("Failed to start activity log renderer")
                .with_details(e.to_string())
        })?;

    match rx.recv_timeout(timeout) {
        Ok(result) => accept_response(prepared, result),
        Err(mpsc::RecvTimeoutError::Timeout) => {
            tracing::warn!(
                month = %prepared.month(),
                timeout_ms = timeout.as_millis() as u64,
                "activity log generation timed out"
            );
            Err(AppError::generation_timeout(timeout.as_millis()))
        }
        Err(mpsc::RecvTimeoutError::Disconnected) => Err(AppError::generation_failed(
            "Activity log renderer stopped without a result",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{LOG_GENERATION_FAILED, LOG_GENERATION_TIMEOUT};
    use std::cell::Cell;

    struct CountingRenderer {
        calls: Cell<u32>,
    }

    impl ActivityLogRenderer for CountingRenderer {
        fn render(&self, _request: &ActivityLogRequest) -> Result<ActivityLogResponse, AppError> {
            self.calls.set(self.calls.get() + 1);
            Ok(ActivityLogResponse {
                log: "unused".to_string(),
            })
        }
    }

    struct BlankRenderer;

    impl ActivityLogRenderer for BlankRenderer {
        fn render(&self, _request: &ActivityLogRequest) -> Result<ActivityLogResponse, AppError> {
            Ok(ActivityLogResponse { log: "  \n".to_string() })
        }
    }

    struct SlowRenderer;

    impl ActivityLogRenderer for SlowRenderer {
        fn render(&self, request: &ActivityLogRequest) -> Result<ActivityLogResponse, AppError> {
            std::thread::sleep(Duration::from_millis(500));
            PlainTextRenderer.render(request)
        }
    }

    fn october() -> MonthKey {
        MonthKey::new(2025, 10).expect("month")
    }

    fn prepared_demo() -> PreparedActivityLog {
        let snap = IncidentSnapshot::new(crate::demo::demo_incidents());
        prepare_monthly_activity_log(&snap, october(), &ActivityLogConfig::default())
    }

    #[test]
    fn empty_month_skips_renderer() {
        let snap = IncidentSnapshot::new(vec![]);
        let prepared = prepare_monthly_activity_log(&snap, october(), &ActivityLogConfig::default());
        let renderer = CountingRenderer { calls: Cell::new(0) };
        let log = generate_activity_log(&prepared, &renderer).expect("log");
        assert_eq!(renderer.calls.get(), 0);
        assert_eq!(log.origin, LogOrigin::NoActivity);
        assert_eq!(log.filename, "ActivityLog_October_2025.txt");
        assert!(log.text.contains("No incident activity recorded"));
    }

    #[test]
    fn blank_renderer_output_is_a_generation_failure() {
        let prepared = prepared_demo();
        let err = generate_activity_log(&prepared, &BlankRenderer).expect_err("blank");
        assert_eq!(err.code, LOG_GENERATION_FAILED);
        assert!(err.retryable);
        // Statistics remain deliverable.
        assert!(prepared.summary.stats.total_reports > 0);
    }

    #[test]
    fn slow_renderer_is_abandoned_after_deadline() {
        let config = ActivityLogConfig {
            generation_timeout_ms: 20,
            ..ActivityLogConfig::default()
        };
        let snap = IncidentSnapshot::new(crate::demo::demo_incidents());
        let prepared = prepare_monthly_activity_log(&snap, october(), &config);
        assert_eq!(prepared.generation_timeout, Duration::from_millis(20));

        let err = generate_activity_log_with_timeout(&prepared, Arc::new(SlowRenderer))
            .expect_err("timeout");
        assert_eq!(err.code, LOG_GENERATION_TIMEOUT);
        assert_eq!(err.details.as_deref(), Some("timeout_ms=20"));
        assert!(err.retryable);
    }

    #[test]
    fn renderer_within_deadline_succeeds() {
        let prepared = prepared_demo();
        assert_eq!(prepared.generation_timeout, Duration::from_secs(30));
        let log = generate_activity_log_with_timeout(&prepared, Arc::new(PlainTextRenderer))
            .expect("log");
        assert_eq!(log.origin, LogOrigin::Renderer);
        assert!(log.text.starts_with("Activity Log for October 2025\n"));
    }

    #[test]
    fn request_serializes_with_camel_case_fields() {
        let prepared = prepared_demo();
        let v = serde_json::to_value(&prepared.request).expect("json");
        assert_eq!(v["month"], "October 2025");
        assert!(v["timeline"][0].get("reportId").is_some());
    }
}
