use erd_core::activity_log::ActivityLogRequest;
use erd_core::error::AppError;
use erd_core::timeline::{BANNER_RULE_WIDTH, DATE_RULE_WIDTH};

/// Serialize the already-ordered events for embedding in the prompt.
pub fn events_json(request: &ActivityLogRequest) -> Result<String, AppError> {
    serde_json::to_string_pretty(&request.timeline).map_err(|e| {
        AppError::new("AI_PROMPT_FAILED", "Failed to encode timeline for prompt")
            .with_details(e.to_string())
    })
}

pub fn activity_log_prompt(month: &str, events_json: &str) -> String {
    let banner_rule = "=".repeat(BANNER_RULE_WIDTH);
    let date_rule = "-".repeat(DATE_RULE_WIDTH);
    format!(
        r#"You are formatting the monthly Activity Log of a municipal emergency-response office for "{month}".

Rules (non-negotiable):
1) The events below are ALREADY sorted newest first. Keep them in exactly this order. Do not re-sort, merge, drop or invent events.
2) Use each event's "date" and "clock" fields verbatim. Do not convert or reformat timestamps.
3) Start a new date section whenever the "date" value changes; never repeat a date header.
4) Inside a date section, list events under their incident ("reportId" and "title") in the order they appear.
5) Copy the event text verbatim.

Layout:
Activity Log for {month}
{banner_rule}

<date>
{date_rule}
Incident: <reportId> - <title>
  - <clock>: <event>

Events (JSON):
{events_json}

Output:
- Return a single JSON object of the form {{"log": "<the full activity log text>"}}.
- The log MUST begin with the line "Activity Log for {month}".
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_carries_month_and_payload() {
        let p = activity_log_prompt("October 2025", "[{\"clock\":\"17:55\"}]");
        assert!(p.contains("Activity Log for October 2025"));
        assert!(p.contains("{\"log\":"));
        assert!(p.contains("\"clock\":\"17:55\""));
        assert!(p.contains(&"=".repeat(30)));
    }
}
