use erd_core::activity_log::{ActivityLogRenderer, ActivityLogRequest, ActivityLogResponse};
use erd_core::error::AppError;
use serde::Deserialize;

use crate::llm::Llm;
use crate::prompts::{activity_log_prompt, events_json};

#[derive(Debug, Deserialize)]
struct RawLog {
    log: Option<String>,
}

/// Activity-log renderer backed by an [`Llm`]. The model only formats; ordering and grouping
/// come from the request as-is.
#[derive(Debug, Clone)]
pub struct LlmLogRenderer<L: Llm> {
    llm: L,
    model: String,
}

impl<L: Llm> LlmLogRenderer<L> {
    pub fn new(llm: L, model: impl Into<String>) -> Self {
        Self {
            llm,
            model: model.into(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn llm(&self) -> &L {
        &self.llm
    }
}

/// Validate the model output: a JSON object with a non-blank `log` that opens with the
/// month's banner line.
pub fn parse_log_response(raw: &str, month: &str) -> Result<ActivityLogResponse, AppError> {
    let parsed: RawLog = serde_json::from_str(raw.trim()).map_err(|e| {
        AppError::generation_failed("Model output is not a JSON object")
            .with_details(e.to_string())
    })?;
    let log = parsed
        .log
        .ok_or_else(|| AppError::generation_failed("Model output is missing the log field"))?;
    if log.trim().is_empty() {
        return Err(AppError::generation_failed("Model returned an empty log"));
    }

    let expected = format!("Activity Log for {month}");
    let first_line = log.trim_start().lines().next().unwrap_or_default().trim_end();
    if first_line != expected {
        return Err(
            AppError::generation_failed("Model log does not start with the month banner")
                .with_details(format!("expected={expected}; got={first_line}")),
        );
    }

    Ok(ActivityLogResponse { log })
}

impl<L: Llm> ActivityLogRenderer for LlmLogRenderer<L> {
    fn render(&self, request: &ActivityLogRequest) -> Result<ActivityLogResponse, AppError> {
        let prompt = activity_log_prompt(&request.month, &events_json(request)?);
        let raw = self.llm.generate(&self.model, &prompt).map_err(|e| {
            AppError::generation_failed("Text generation backend failed")
                .with_details(e.to_string())
        })?;
        parse_log_response(&raw, &request.month)
    }
}
