use serde::{Deserialize, Serialize};

use crate::domain::TimelineEvent;
use crate::error::AppError;

/// Tagged classification of free-text timeline entries.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Submission,
    Acknowledgment,
    Dispatch,
    OnSite,
    Other,
}

impl EventKind {
    /// Dispatch and on-site entries mark the end of the response-time window.
    pub fn is_response(self) -> bool {
        matches!(self, EventKind::Dispatch | EventKind::OnSite)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct KeywordRule {
    pub kind: EventKind,
    /// Case-sensitive substring.
    pub needle: String,
}

impl KeywordRule {
    pub fn new(kind: EventKind, needle: impl Into<String>) -> Self {
        Self {
            kind,
            needle: needle.into(),
        }
    }
}

/// Ordered rule table; the first rule whose needle occurs in the event text wins.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct KeywordTable {
    pub rules: Vec<KeywordRule>,
}

impl Default for KeywordTable {
    fn default() -> Self {
        // Response rules come first so "is response" means exactly
        // contains("dispatched") || contains("on site").
        Self {
            rules: vec![
                KeywordRule::new(EventKind::Dispatch, "dispatched"),
                KeywordRule::new(EventKind::OnSite, "on site"),
                KeywordRule::new(EventKind::Acknowledgment, "Acknowledged"),
                KeywordRule::new(EventKind::Submission, "submitted"),
                KeywordRule::new(EventKind::Submission, "Report received"),
            ],
        }
    }
}

impl KeywordTable {
    pub fn classify_text(&self, text: &str) -> EventKind {
        self.rules
            .iter()
            .find(|r| text.contains(r.needle.as_str()))
            .map(|r| r.kind)
            .unwrap_or(EventKind::Other)
    }

    pub fn classify(&self, event: &TimelineEvent) -> EventKind {
        self.classify_text(&event.event)
    }

    /// First entry in stored array order (not time order) classified as a response, with its
    /// index in the timeline.
    pub fn first_response<'a>(
        &self,
        timeline: &'a [TimelineEvent],
    ) -> Option<(usize, &'a TimelineEvent)> {
        timeline
            .iter()
            .enumerate()
            .find(|(_, e)| self.classify(e).is_response())
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if let Some(idx) = self.rules.iter().position(|r| r.needle.is_empty()) {
            return Err(
                AppError::new("CONFIG_INVALID", "Keyword rule needle must not be empty")
                    .with_details(format!("rule_index={idx}")),
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_table_matches_seed_wording() {
        let t = KeywordTable::default();
        assert_eq!(t.classify_text("Report submitted by Maria Dela Cruz."), EventKind::Submission);
        assert_eq!(
            t.classify_text("Acknowledged by Makati Fire Station."),
            EventKind::Acknowledgment
        );
        assert_eq!(t.classify_text("Fire response units and EMTs dispatched."), EventKind::Dispatch);
        assert_eq!(
            t.classify_text("Firefighters on site; suppression in progress."),
            EventKind::OnSite
        );
        assert_eq!(t.classify_text("Area cleared."), EventKind::Other);
    }

    #[test]
    fn matching_is_case_sensitive() {
        let t = KeywordTable::default();
        assert_eq!(t.classify_text("Dispatched BFP and DRRMO teams."), EventKind::Other);
        assert_eq!(t.classify_text("Crew On Site"), EventKind::Other);
    }

    #[test]
    fn response_rules_take_priority_over_acknowledgment() {
        let t = KeywordTable::default();
        assert_eq!(
            t.classify_text("Acknowledged; rescue boats dispatched."),
            EventKind::Dispatch
        );
    }

    #[test]
    fn first_response_uses_array_order() {
        let t = KeywordTable::default();
        let timeline = vec![
            TimelineEvent::new("2025-10-11T17:55:00+08:00", "Crew on site."),
            TimelineEvent::new("2025-10-11T17:42:00+08:00", "Units dispatched."),
        ];
        assert_eq!(t.first_response(&timeline).map(|(_, e)| e.event.as_str()), Some("Crew on site."));
    }

    #[test]
    fn empty_needle_is_rejected() {
        let t = KeywordTable {
            rules: vec![KeywordRule::new(EventKind::Dispatch, "")],
        };
        assert_eq!(t.validate().expect_err("invalid").code, "CONFIG_INVALID");
    }
}
